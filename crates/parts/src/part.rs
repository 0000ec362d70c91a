use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partstock_core::{DomainError, DomainResult, Entity, PartId};

/// Kind of a part. Fixed at creation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartKind {
    /// Leaf item, received from outside.
    Raw,
    /// Built by consuming quantities of other parts.
    Assembled,
}

impl PartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartKind::Raw => "RAW",
            PartKind::Assembled => "ASSEMBLED",
        }
    }
}

impl core::fmt::Display for PartKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PartKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RAW" => Ok(PartKind::Raw),
            "ASSEMBLED" => Ok(PartKind::Assembled),
            other => Err(DomainError::validation(format!(
                "unsupported part type '{other}' (expected RAW or ASSEMBLED)"
            ))),
        }
    }
}

/// How many units of another part are needed to build one unit of an assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constituent {
    pub part_id: PartId,
    pub quantity: u32,
}

impl Constituent {
    pub fn new(part_id: impl Into<PartId>, quantity: u32) -> Self {
        Self {
            part_id: part_id.into(),
            quantity,
        }
    }
}

/// Request to register a new part definition.
///
/// `constituents` is optional because RAW parts ignore it; assemblies reject a
/// missing or empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPart {
    pub name: String,
    pub kind: PartKind,
    pub constituents: Option<Vec<Constituent>>,
}

impl NewPart {
    pub fn raw(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PartKind::Raw,
            constituents: None,
        }
    }

    pub fn assembled(name: impl Into<String>, constituents: Vec<Constituent>) -> Self {
        Self {
            name: name.into(),
            kind: PartKind::Assembled,
            constituents: Some(constituents),
        }
    }
}

/// A part record: identity, definition and on-hand stock.
///
/// Everything but `stock` is fixed for life. Constructors enforce the shape
/// rules, so a `Part` value never has a RAW kind with constituents or an
/// assembly without them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    id: PartId,
    name: String,
    kind: PartKind,
    stock: u64,
    constituents: Vec<Constituent>,
    created_at: DateTime<Utc>,
}

impl Part {
    /// A fresh raw part with zero stock.
    pub fn raw(id: PartId, name: impl Into<String>, created_at: DateTime<Utc>) -> DomainResult<Self> {
        let name = validate_name(name.into())?;
        Ok(Self {
            id,
            name,
            kind: PartKind::Raw,
            stock: 0,
            constituents: Vec::new(),
            created_at,
        })
    }

    /// A fresh assembly with zero stock. Constituent order is kept as given.
    ///
    /// Only checks the list's own shape; whether the referenced parts exist and
    /// whether the graph stays acyclic needs a store and is checked by the
    /// creation dispatcher.
    pub fn assembled(
        id: PartId,
        name: impl Into<String>,
        constituents: Vec<Constituent>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = validate_name(name.into())?;
        validate_constituents(&id, &constituents)?;
        Ok(Self {
            id,
            name,
            kind: PartKind::Assembled,
            stock: 0,
            constituents,
            created_at,
        })
    }

    /// Rebuild a part read back from storage.
    pub fn restore(
        id: PartId,
        name: String,
        kind: PartKind,
        stock: u64,
        constituents: Vec<Constituent>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        match kind {
            PartKind::Raw if !constituents.is_empty() => {
                return Err(DomainError::invariant(format!(
                    "raw part {id} has constituents"
                )));
            }
            PartKind::Assembled => validate_constituents(&id, &constituents)?,
            PartKind::Raw => {}
        }
        Ok(Self {
            id,
            name,
            kind,
            stock,
            constituents,
            created_at,
        })
    }

    /// Same definition with a different stock level (used by stores).
    pub fn with_stock(mut self, stock: u64) -> Self {
        self.stock = stock;
        self
    }

    pub fn id_typed(&self) -> &PartId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PartKind {
        self.kind
    }

    pub fn stock(&self) -> u64 {
        self.stock
    }

    pub fn constituents(&self) -> &[Constituent] {
        &self.constituents
    }

    pub fn constituent_ids(&self) -> impl Iterator<Item = &PartId> {
        self.constituents.iter().map(|c| &c.part_id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_assembly(&self) -> bool {
        self.kind == PartKind::Assembled
    }
}

impl Entity for Part {
    type Id = PartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_name(name: String) -> DomainResult<String> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(name)
}

fn validate_constituents(id: &PartId, constituents: &[Constituent]) -> DomainResult<()> {
    if constituents.is_empty() {
        return Err(DomainError::validation(
            "assembled parts must have constituent parts",
        ));
    }
    for c in constituents {
        if c.quantity == 0 {
            return Err(DomainError::validation(format!(
                "constituent {} must have quantity >= 1",
                c.part_id
            )));
        }
        if &c.part_id == id {
            return Err(DomainError::circular(format!("part {id} lists itself as a constituent")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn raw_part_starts_empty() {
        let part = Part::raw(PartId::from("bolt"), "Bolt", now()).unwrap();
        assert_eq!(part.kind(), PartKind::Raw);
        assert_eq!(part.stock(), 0);
        assert!(part.constituents().is_empty());
    }

    #[test]
    fn raw_part_rejects_blank_name() {
        let err = Part::raw(PartId::from("x"), "  ", now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn assembly_requires_constituents() {
        let err = Part::assembled(PartId::from("gadget"), "Gadget", vec![], now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn assembly_rejects_zero_quantity() {
        let err = Part::assembled(
            PartId::from("gadget"),
            "Gadget",
            vec![Constituent::new("bolt", 0)],
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn assembly_keeps_constituent_order() {
        let part = Part::assembled(
            PartId::from("gadget"),
            "Gadget",
            vec![Constituent::new("nut", 4), Constituent::new("bolt", 2)],
            now(),
        )
        .unwrap();
        let ids: Vec<&str> = part.constituent_ids().map(PartId::as_str).collect();
        assert_eq!(ids, vec!["nut", "bolt"]);
        assert_eq!(part.stock(), 0);
    }

    #[test]
    fn restore_rejects_raw_with_constituents() {
        let err = Part::restore(
            PartId::from("bolt"),
            "Bolt".to_string(),
            PartKind::Raw,
            3,
            vec![Constituent::new("nut", 1)],
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn kind_parses_wire_names_only() {
        assert_eq!("RAW".parse::<PartKind>().unwrap(), PartKind::Raw);
        assert_eq!("ASSEMBLED".parse::<PartKind>().unwrap(), PartKind::Assembled);
        assert!(matches!(
            "raw".parse::<PartKind>().unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[test]
    fn kind_serializes_screaming_case() {
        assert_eq!(serde_json::to_string(&PartKind::Assembled).unwrap(), "\"ASSEMBLED\"");
    }
}
