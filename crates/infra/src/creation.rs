//! Per-kind construction of new parts.

use chrono::{DateTime, Utc};

use partstock_core::{DomainError, PartId};
use partstock_parts::{Constituent, NewPart, Part, PartKind};

use crate::error::ServiceResult;
use crate::graph::DependencyGraph;
use crate::part_store::PartStore;

/// Builds a `Part` value for a creation request, dispatching on its kind.
///
/// Nothing is written here: the caller inserts the returned part. The id is
/// assigned by the caller too.
#[derive(Debug)]
pub struct CreationDispatcher<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> CreationDispatcher<'a, S>
where
    S: PartStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn create(&self, id: PartId, request: NewPart, created_at: DateTime<Utc>) -> ServiceResult<Part> {
        match request.kind {
            // Raw parts ignore any constituents they were sent.
            PartKind::Raw => Ok(Part::raw(id, request.name, created_at)?),
            PartKind::Assembled => {
                let constituents = request.constituents.unwrap_or_default();
                self.create_assembly(id, request.name, constituents, created_at)
                    .await
            }
        }
    }

    async fn create_assembly(
        &self,
        id: PartId,
        name: String,
        constituents: Vec<Constituent>,
        created_at: DateTime<Utc>,
    ) -> ServiceResult<Part> {
        // Shape checks first (non-empty list, quantities, name): no store access needed.
        let part = Part::assembled(id, name, constituents, created_at)?;

        for c in part.constituents() {
            if self.store.find_by_id(&c.part_id).await?.is_none() {
                return Err(DomainError::not_found(c.part_id.clone()).into());
            }
        }

        let constituent_ids: Vec<PartId> = part.constituent_ids().cloned().collect();
        DependencyGraph::new(self.store)
            .ensure_acyclic(part.id_typed(), &constituent_ids)
            .await?;

        Ok(part)
    }
}
