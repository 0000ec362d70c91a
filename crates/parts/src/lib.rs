//! Parts domain module (bill of materials).
//!
//! This crate contains business rules for raw and assembled parts, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). The
//! async orchestration that reads and writes a store lives in
//! `partstock-infra`.

pub mod build;
pub mod naming;
pub mod part;

pub use build::{AdjustOutcome, BuildPlan, Requirement};
pub use naming::mint_part_id;
pub use part::{Constituent, NewPart, Part, PartKind};
