//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a part.
///
/// Ids are opaque strings assigned once at creation and never reused. The
/// value is kept as-is (no normalisation) so ids read back from storage compare
/// equal to the ones handed out.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(String);

impl PartId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PartId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PartId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PartId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<PartId> for String {
    fn from(value: PartId) -> Self {
        value.0
    }
}

impl AsRef<str> for PartId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for PartId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("PartId: must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_blank_ids() {
        assert!("   ".parse::<PartId>().is_err());
        assert_eq!("bolt".parse::<PartId>().unwrap().as_str(), "bolt");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = PartId::from("gadget-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"gadget-1\"");
    }
}
