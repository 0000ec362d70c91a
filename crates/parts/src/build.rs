//! Building assemblies: how much of each constituent a build consumes, and the
//! outcome reported back to callers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use partstock_core::{DomainError, DomainResult, PartId};

use crate::part::{Part, PartKind};

/// Units of one constituent consumed by a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub part_id: PartId,
    pub units: u64,
}

/// Stock movements for producing `quantity` units of an assembly.
///
/// Requirements keep the assembly's constituent order; the shortfall check
/// relies on it to name the first insufficient constituent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    target: PartId,
    quantity: u64,
    requirements: Vec<Requirement>,
}

impl BuildPlan {
    pub fn for_part(part: &Part, quantity: u64) -> DomainResult<Self> {
        if part.kind() != PartKind::Assembled {
            return Err(DomainError::validation(format!(
                "part {} is not an assembly",
                part.id_typed()
            )));
        }
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be >= 1"));
        }
        // Stores take signed deltas, so every amount must fit in i64.
        if i64::try_from(quantity).is_err() {
            return Err(DomainError::validation("quantity is too large"));
        }

        let mut requirements = Vec::with_capacity(part.constituents().len());
        for c in part.constituents() {
            let units = u64::from(c.quantity)
                .checked_mul(quantity)
                .filter(|u| i64::try_from(*u).is_ok())
                .ok_or_else(|| {
                    DomainError::validation(format!(
                        "building {quantity} units would need too many of {}",
                        c.part_id
                    ))
                })?;
            requirements.push(Requirement {
                part_id: c.part_id.clone(),
                units,
            });
        }

        Ok(Self {
            target: part.id_typed().clone(),
            quantity,
            requirements,
        })
    }

    pub fn target(&self) -> &PartId {
        &self.target
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Every record a build reads or writes: constituents, then the target.
    pub fn touched_ids(&self) -> Vec<PartId> {
        let mut ids: Vec<PartId> = self.requirements.iter().map(|r| r.part_id.clone()).collect();
        ids.push(self.target.clone());
        ids
    }

    /// First constituent, in list order, whose stock cannot cover its requirement.
    ///
    /// A constituent with no known stock counts as insufficient. Demand is
    /// accumulated per id, so a part listed twice must cover both lines.
    pub fn first_shortfall<F>(&self, stock_of: F) -> Option<&PartId>
    where
        F: Fn(&PartId) -> Option<u64>,
    {
        let mut demand: HashMap<&PartId, u64> = HashMap::new();
        self.requirements
            .iter()
            .find(|r| {
                let needed = demand.entry(&r.part_id).or_insert(0);
                *needed = needed.saturating_add(r.units);
                stock_of(&r.part_id).is_none_or(|on_hand| on_hand < *needed)
            })
            .map(|r| &r.part_id)
    }

    /// Signed stock deltas to apply once the build is known to be covered.
    pub fn deltas(&self) -> Vec<(PartId, i64)> {
        // Amounts were range-checked in `for_part`.
        let mut out: Vec<(PartId, i64)> = self
            .requirements
            .iter()
            .map(|r| (r.part_id.clone(), -(r.units as i64)))
            .collect();
        out.push((self.target.clone(), self.quantity as i64));
        out
    }
}

/// Result of an inventory adjustment.
///
/// Not having enough stock is an expected business outcome, so it is reported
/// as a value rather than an error. Serialises as `{"status":"SUCCESS"}` or
/// `{"status":"FAILED","message":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustOutcome {
    Success,
    Failed { message: String },
}

impl AdjustOutcome {
    pub fn insufficient(part_id: &PartId) -> Self {
        AdjustOutcome::Failed {
            message: format!("Insufficient quantity - {part_id}"),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AdjustOutcome::Success)
    }
}
