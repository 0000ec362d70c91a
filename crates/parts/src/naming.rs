//! Part id minting.

use uuid::Uuid;

use partstock_core::PartId;

/// Mint a fresh id for a part called `name`.
///
/// The id is `<slug>-<uuid>`: the slug keeps ids readable in logs and URLs, the
/// UUIDv7 suffix keeps two parts created with the same name at the same instant
/// apart.
pub fn mint_part_id(name: &str) -> PartId {
    mint_with(name, Uuid::now_v7())
}

fn mint_with(name: &str, suffix: Uuid) -> PartId {
    let slug = slugify(name);
    let suffix = suffix.simple();
    if slug.is_empty() {
        PartId::from(format!("part-{suffix}"))
    } else {
        PartId::from(format!("{slug}-{suffix}"))
    }
}

/// Lowercase, with runs of anything non-alphanumeric collapsed to one `-`.
fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_lowercases_and_collapses_separators() {
        assert_eq!(slugify("Bolt"), "bolt");
        assert_eq!(slugify("  Hex  Bolt / M8 "), "hex-bolt-m8");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn minted_ids_carry_slug_prefix() {
        let id = mint_with("Gadget Pro", Uuid::nil());
        assert_eq!(id.as_str(), "gadget-pro-00000000000000000000000000000000");
    }

    #[test]
    fn unnamed_slug_falls_back_to_part_prefix() {
        let id = mint_with("!!", Uuid::nil());
        assert!(id.as_str().starts_with("part-"));
    }

    #[test]
    fn same_name_yields_distinct_ids() {
        let a = mint_part_id("Bolt");
        let b = mint_part_id("Bolt");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("bolt-"));
    }
}
