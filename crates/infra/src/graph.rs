//! BOM dependency graph checks.
//!
//! Persisted parts always form a DAG (each part was checked when it was
//! created, and definitions never change afterwards). Adding a new assembly
//! can therefore only close a cycle by making the new part reachable from its
//! own proposed constituents, and that is the only thing checked here.

use std::collections::HashSet;

use tracing::debug;

use partstock_core::{DomainError, PartId};
use partstock_parts::PartKind;

use crate::error::ServiceResult;
use crate::part_store::PartStore;

/// Cycle checker over the constituent graph held by a [`PartStore`].
#[derive(Debug)]
pub struct DependencyGraph<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> DependencyGraph<'a, S>
where
    S: PartStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Fail with `CircularDependency` if `new_id` is reachable from any of
    /// `constituent_ids`.
    ///
    /// Depth-first, in constituent-list order, stopping at the first cycle.
    /// Each branch carries its own copy of the ids on its path, so shared
    /// sub-assemblies (diamonds) are walked once per path and are fine.
    pub async fn ensure_acyclic(&self, new_id: &PartId, constituent_ids: &[PartId]) -> ServiceResult<()> {
        // Pushed in reverse so pops follow list order.
        let mut stack: Vec<(PartId, HashSet<PartId>)> = constituent_ids
            .iter()
            .rev()
            .map(|id| (id.clone(), HashSet::new()))
            .collect();
        let mut visited = 0usize;

        while let Some((node, mut path)) = stack.pop() {
            visited += 1;

            if &node == new_id {
                return Err(DomainError::circular(format!(
                    "part {new_id} would depend on itself"
                ))
                .into());
            }
            if !path.insert(node.clone()) {
                // Only reachable if stored data already holds a cycle.
                return Err(DomainError::circular(format!(
                    "existing cycle through part {node}"
                ))
                .into());
            }

            let Some(part) = self.store.find_by_id(&node).await? else {
                continue;
            };
            if part.kind() != PartKind::Assembled {
                continue;
            }

            for child in part.constituents().iter().rev() {
                stack.push((child.part_id.clone(), path.clone()));
            }
        }

        debug!(part_id = %new_id, visited, "dependency graph is acyclic");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PartServiceError;
    use crate::part_store::InMemoryPartStore;
    use chrono::Utc;
    use partstock_parts::{Constituent, Part};

    fn id(s: &str) -> PartId {
        PartId::from(s)
    }

    async fn put_raw(store: &InMemoryPartStore, name: &str) {
        store
            .insert(Part::raw(id(name), name, Utc::now()).unwrap())
            .await
            .unwrap();
    }

    /// Inserts an assembly straight into the store, skipping creation checks.
    async fn put_assembly(store: &InMemoryPartStore, name: &str, children: &[&str]) {
        let constituents = children.iter().map(|c| Constituent::new(*c, 1)).collect();
        let part = Part::restore(
            id(name),
            name.to_string(),
            PartKind::Assembled,
            0,
            constituents,
            Utc::now(),
        )
        .unwrap();
        store.insert(part).await.unwrap();
    }

    fn is_cycle(err: &PartServiceError) -> bool {
        matches!(err, PartServiceError::Domain(DomainError::CircularDependency(_)))
    }

    #[tokio::test]
    async fn detects_cycle_back_to_new_id() {
        // A -> B -> C -> A, checking a new "A" built from B.
        let store = InMemoryPartStore::new();
        put_assembly(&store, "A", &["B"]).await;
        put_assembly(&store, "B", &["C"]).await;
        put_assembly(&store, "C", &["A"]).await;

        let err = DependencyGraph::new(&store)
            .ensure_acyclic(&id("A"), &[id("B")])
            .await
            .unwrap_err();
        assert!(is_cycle(&err));
    }

    #[tokio::test]
    async fn diamond_is_not_a_cycle() {
        // A -> B, A -> C, B -> D, C -> D
        let store = InMemoryPartStore::new();
        put_raw(&store, "D").await;
        put_assembly(&store, "B", &["D"]).await;
        put_assembly(&store, "C", &["D"]).await;

        DependencyGraph::new(&store)
            .ensure_acyclic(&id("A"), &[id("B"), id("C")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn raw_and_unknown_nodes_end_their_branch() {
        let store = InMemoryPartStore::new();
        put_raw(&store, "bolt").await;

        DependencyGraph::new(&store)
            .ensure_acyclic(&id("gadget"), &[id("bolt"), id("ghost")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn direct_self_reference_is_a_cycle() {
        let store = InMemoryPartStore::new();
        let err = DependencyGraph::new(&store)
            .ensure_acyclic(&id("gadget"), &[id("gadget")])
            .await
            .unwrap_err();
        assert!(is_cycle(&err));
    }

    #[tokio::test]
    async fn corrupt_stored_cycle_terminates() {
        // X <-> Y already cyclic in storage; the walk must still stop.
        let store = InMemoryPartStore::new();
        put_assembly(&store, "X", &["Y"]).await;
        put_assembly(&store, "Y", &["X"]).await;

        let err = DependencyGraph::new(&store)
            .ensure_acyclic(&id("new"), &[id("X")])
            .await
            .unwrap_err();
        assert!(is_cycle(&err));
    }

    #[tokio::test]
    async fn deep_shared_subassemblies_are_accepted() {
        // Each level uses the level below twice.
        let store = InMemoryPartStore::new();
        put_raw(&store, "L0").await;
        for level in 1..8 {
            let below = format!("L{}", level - 1);
            put_assembly(&store, &format!("L{level}"), &[below.as_str(), below.as_str()]).await;
        }

        DependencyGraph::new(&store)
            .ensure_acyclic(&id("top"), &[id("L7")])
            .await
            .unwrap();
    }
}
