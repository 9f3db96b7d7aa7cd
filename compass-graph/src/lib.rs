//! COMPASS Graph - Intent Graph Store
//!
//! Authoritative store of all intent nodes and their relationships; the
//! source of truth for "why does this exist". Nodes live in a flat
//! id-keyed map behind a `RwLock` and are handed out as clones, so context
//! queries can run concurrently with mutation and no caller can corrupt
//! the edge invariants from outside the linking API.
//!
//! Nodes are never removed. Cancellation is a status transition, which
//! keeps history available for audit and context retrieval.

use compass_core::{
    ArtifactRef, CompassResult, EntityId, GraphError, IntentNode, NodeKind, NodeStatus,
    Relationship, Timestamp,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

// ============================================================================
// NODE CONTEXT
// ============================================================================

/// One-hop neighborhood of a node: the node itself plus its direct
/// parents, children, related nodes, blockers, and artifact references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeContext {
    pub node: IntentNode,
    pub parents: Vec<IntentNode>,
    pub children: Vec<IntentNode>,
    pub related: Vec<IntentNode>,
    pub blockers: Vec<IntentNode>,
    pub artifacts: Vec<ArtifactRef>,
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Durable JSON form of the whole graph. Export is total and lossless;
/// import restores exactly what was exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub exported_at: Timestamp,
    pub nodes: Vec<IntentNode>,
}

// ============================================================================
// INTENT GRAPH
// ============================================================================

/// In-memory intent graph. Construct once per process and share via `Arc`.
#[derive(Debug, Default)]
pub struct IntentGraph {
    nodes: RwLock<HashMap<EntityId, IntentNode>>,
}

impl IntentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // FACTORIES
    // ========================================================================

    /// Create a goal node. Goals are live intents and start Active.
    /// A given-but-missing parent is an error and nothing is created.
    pub fn create_goal(
        &self,
        title: &str,
        parent_id: Option<EntityId>,
        rationale: &str,
    ) -> CompassResult<EntityId> {
        let node = IntentNode::new(NodeKind::Goal, title)
            .with_rationale(rationale)
            .with_status(NodeStatus::Active);
        self.insert_linked(node, parent_id)
    }

    /// Create a task node, auto-linked to its parent when given.
    pub fn create_task(
        &self,
        title: &str,
        parent_id: Option<EntityId>,
        rationale: &str,
    ) -> CompassResult<EntityId> {
        let node = IntentNode::new(NodeKind::Task, title).with_rationale(rationale);
        self.insert_linked(node, parent_id)
    }

    /// Create a decision node. Decisions are recorded as already-made
    /// facts, so status is forced to Completed. The rationale is expected
    /// non-empty but not validated here.
    pub fn create_decision(
        &self,
        title: &str,
        rationale: &str,
        alternatives_considered: Vec<String>,
    ) -> CompassResult<EntityId> {
        let node = IntentNode::new(NodeKind::Decision, title)
            .with_rationale(rationale)
            .with_status(NodeStatus::Completed)
            .with_metadata(serde_json::json!({
                "alternatives_considered": alternatives_considered,
            }));
        self.insert_linked(node, None)
    }

    /// Insert a pre-built node, linking it under a parent when given.
    /// The parent check happens before insertion: on a missing parent the
    /// node is not created at all.
    pub fn insert_linked(
        &self,
        node: IntentNode,
        parent_id: Option<EntityId>,
    ) -> CompassResult<EntityId> {
        let mut nodes = self.nodes.write().map_err(|_| GraphError::LockPoisoned)?;

        if nodes.contains_key(&node.node_id) {
            return Err(GraphError::DuplicateNode { id: node.node_id }.into());
        }
        if let Some(parent_id) = parent_id {
            if !nodes.contains_key(&parent_id) {
                return Err(GraphError::NodeNotFound { id: parent_id }.into());
            }
        }

        let node_id = node.node_id;
        let mut node = node;
        if let Some(parent_id) = parent_id {
            node.add_parent(parent_id);
            let parent = nodes
                .get_mut(&parent_id)
                .ok_or(GraphError::NodeNotFound { id: parent_id })?;
            parent.add_child(node_id);
            parent.touch();
        }
        nodes.insert(node_id, node);
        Ok(node_id)
    }

    // ========================================================================
    // LINKING
    // ========================================================================

    /// Link two nodes. Parent records `from` as parent of `to`; Blocks
    /// records `from` as blocking `to`; Related is symmetric. Both edge
    /// sets are updated under one write guard, so the symmetry invariant
    /// cannot be observed half-applied. Missing endpoints mutate nothing.
    pub fn link_nodes(
        &self,
        from: EntityId,
        to: EntityId,
        relationship: Relationship,
    ) -> CompassResult<()> {
        if from == to {
            return Err(GraphError::SelfLink { id: from }.into());
        }
        let mut nodes = self.nodes.write().map_err(|_| GraphError::LockPoisoned)?;
        if !nodes.contains_key(&from) {
            return Err(GraphError::NodeNotFound { id: from }.into());
        }
        if !nodes.contains_key(&to) {
            return Err(GraphError::NodeNotFound { id: to }.into());
        }

        match relationship {
            Relationship::Parent => {
                let child = nodes.get_mut(&to).expect("checked above");
                child.add_parent(from);
                child.touch();
                let parent = nodes.get_mut(&from).expect("checked above");
                parent.add_child(to);
                parent.touch();
            }
            Relationship::Blocks => {
                let blocked = nodes.get_mut(&to).expect("checked above");
                blocked.add_blocked_by(from);
                blocked.touch();
                let blocker = nodes.get_mut(&from).expect("checked above");
                blocker.add_blocks(to);
                blocker.touch();
            }
            Relationship::Related => {
                let a = nodes.get_mut(&from).expect("checked above");
                a.add_related(to);
                a.touch();
                let b = nodes.get_mut(&to).expect("checked above");
                b.add_related(from);
                b.touch();
            }
        }
        Ok(())
    }

    /// Add a file reference (optionally with the commit that realized it)
    /// to a node, connecting tasks to the code/docs that realize them.
    pub fn link_artifact(
        &self,
        node_id: EntityId,
        file_path: &str,
        commit: Option<&str>,
    ) -> CompassResult<()> {
        self.with_node_mut(node_id, |node| {
            let mut artifact = ArtifactRef::new(file_path);
            if let Some(commit) = commit {
                artifact = artifact.with_commit(commit);
            }
            node.add_artifact(artifact);
        })
    }

    /// Add an external identifier (commit hash, URL, ticket id) to a node.
    pub fn link_external(&self, node_id: EntityId, external_ref: &str) -> CompassResult<()> {
        self.with_node_mut(node_id, |node| node.add_external_ref(external_ref))
    }

    /// Tag a node.
    pub fn add_tag(&self, node_id: EntityId, tag: &str) -> CompassResult<()> {
        self.with_node_mut(node_id, |node| node.add_tag(tag))
    }

    /// Update a node's status.
    pub fn update_status(&self, node_id: EntityId, status: NodeStatus) -> CompassResult<()> {
        self.with_node_mut(node_id, |node| node.status = status)
    }

    /// Set or clear a node's assignee. Called by the coordinator; the
    /// coordinator's ownership map stays authoritative.
    pub fn assign(&self, node_id: EntityId, agent_id: Option<EntityId>) -> CompassResult<()> {
        self.with_node_mut(node_id, |node| node.assigned_to = agent_id)
    }

    fn with_node_mut<F>(&self, node_id: EntityId, f: F) -> CompassResult<()>
    where
        F: FnOnce(&mut IntentNode),
    {
        let mut nodes = self.nodes.write().map_err(|_| GraphError::LockPoisoned)?;
        let node = nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound { id: node_id })?;
        f(node);
        node.touch();
        Ok(())
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Get a node by id (cloned out).
    pub fn get(&self, node_id: EntityId) -> CompassResult<IntentNode> {
        let nodes = self.nodes.read().map_err(|_| GraphError::LockPoisoned)?;
        nodes
            .get(&node_id)
            .cloned()
            .ok_or_else(|| GraphError::NodeNotFound { id: node_id }.into())
    }

    /// Get a node plus its direct relationships.
    ///
    /// The depth parameter is part of the public contract but the
    /// traversal is one hop: any depth >= 1 behaves as 1. Multi-hop
    /// expansion is an extension point, not a current guarantee.
    pub fn get_context(&self, node_id: EntityId, _depth: usize) -> CompassResult<NodeContext> {
        let nodes = self.nodes.read().map_err(|_| GraphError::LockPoisoned)?;
        let node = nodes
            .get(&node_id)
            .cloned()
            .ok_or(GraphError::NodeNotFound { id: node_id })?;

        let resolve = |ids: &[EntityId]| -> Vec<IntentNode> {
            let mut resolved: Vec<IntentNode> =
                ids.iter().filter_map(|id| nodes.get(id).cloned()).collect();
            resolved.sort_by_key(|n| n.node_id);
            resolved
        };

        let context = NodeContext {
            parents: resolve(&node.parent_ids),
            children: resolve(&node.child_ids),
            related: resolve(&node.related_ids),
            blockers: resolve(&node.blocked_by_ids),
            artifacts: node.artifacts.clone(),
            node,
        };
        Ok(context)
    }

    /// All goal nodes with Active status, in creation order.
    pub fn active_goals(&self) -> CompassResult<Vec<IntentNode>> {
        self.filter(|n| n.kind == NodeKind::Goal && n.status == NodeStatus::Active)
    }

    /// All task nodes that are blocked: status Blocked OR a non-empty
    /// blocked-by set. A union, not a pure status filter.
    pub fn blocked_tasks(&self) -> CompassResult<Vec<IntentNode>> {
        self.filter(|n| n.kind == NodeKind::Task && n.is_blocked())
    }

    /// All nodes carrying the given tag.
    pub fn find_by_tag(&self, tag: &str) -> CompassResult<Vec<IntentNode>> {
        self.filter(|n| n.has_tag(tag))
    }

    /// All nodes referencing the given file path (exact string match).
    pub fn find_by_artifact(&self, path: &str) -> CompassResult<Vec<IntentNode>> {
        self.filter(|n| n.references_path(path))
    }

    /// Every node in the graph, in creation order.
    pub fn all(&self) -> CompassResult<Vec<IntentNode>> {
        self.filter(|_| true)
    }

    /// The n most recently updated nodes, newest first.
    pub fn recently_updated(&self, n: usize) -> CompassResult<Vec<IntentNode>> {
        let nodes = self.nodes.read().map_err(|_| GraphError::LockPoisoned)?;
        let mut all: Vec<IntentNode> = nodes.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.node_id.cmp(&a.node_id)));
        all.truncate(n);
        Ok(all)
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.read().map(|n| n.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // UUIDv7 ids are timestamp-sortable, so node_id order is creation order.
    fn filter<F>(&self, predicate: F) -> CompassResult<Vec<IntentNode>>
    where
        F: Fn(&IntentNode) -> bool,
    {
        let nodes = self.nodes.read().map_err(|_| GraphError::LockPoisoned)?;
        let mut matched: Vec<IntentNode> = nodes.values().filter(|n| predicate(n)).cloned().collect();
        matched.sort_by_key(|n| n.node_id);
        Ok(matched)
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Export the full graph. Total and lossless.
    pub fn export(&self) -> CompassResult<GraphSnapshot> {
        let nodes = self.nodes.read().map_err(|_| GraphError::LockPoisoned)?;
        let mut all: Vec<IntentNode> = nodes.values().cloned().collect();
        all.sort_by_key(|n| n.node_id);
        Ok(GraphSnapshot {
            exported_at: Utc::now(),
            nodes: all,
        })
    }

    /// Export as a JSON string.
    pub fn export_json(&self) -> CompassResult<String> {
        let snapshot = self.export()?;
        serde_json::to_string_pretty(&snapshot).map_err(|e| {
            GraphError::SnapshotFailed {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Replace the graph's contents with a snapshot.
    pub fn import(&self, snapshot: GraphSnapshot) -> CompassResult<()> {
        let mut nodes = self.nodes.write().map_err(|_| GraphError::LockPoisoned)?;
        nodes.clear();
        for node in snapshot.nodes {
            nodes.insert(node.node_id, node);
        }
        Ok(())
    }

    /// Restore from a JSON string produced by `export_json`.
    pub fn import_json(&self, json: &str) -> CompassResult<()> {
        let snapshot: GraphSnapshot = serde_json::from_str(json).map_err(|e| {
            GraphError::SnapshotFailed {
                reason: e.to_string(),
            }
        })?;
        self.import(snapshot)
    }
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_relationship() -> impl Strategy<Value = Relationship> {
        prop_oneof![
            Just(Relationship::Parent),
            Just(Relationship::Blocks),
            Just(Relationship::Related),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any sequence of link operations leaves every edge recorded on
        /// both endpoints.
        #[test]
        fn prop_link_symmetry_holds(
            links in prop::collection::vec((0usize..6, 0usize..6, arb_relationship()), 0..20)
        ) {
            let graph = IntentGraph::new();
            let ids: Vec<_> = (0..6)
                .map(|i| graph.create_task(&format!("task-{}", i), None, "").unwrap())
                .collect();

            for (from, to, relationship) in links {
                // self-links are rejected; skip them
                let _ = graph.link_nodes(ids[from], ids[to], relationship);
            }

            for &id in &ids {
                let node = graph.get(id).unwrap();
                for parent in &node.parent_ids {
                    prop_assert!(graph.get(*parent).unwrap().child_ids.contains(&id));
                }
                for child in &node.child_ids {
                    prop_assert!(graph.get(*child).unwrap().parent_ids.contains(&id));
                }
                for blocker in &node.blocked_by_ids {
                    prop_assert!(graph.get(*blocker).unwrap().blocks_ids.contains(&id));
                }
                for blocked in &node.blocks_ids {
                    prop_assert!(graph.get(*blocked).unwrap().blocked_by_ids.contains(&id));
                }
                for related in &node.related_ids {
                    prop_assert!(graph.get(*related).unwrap().related_ids.contains(&id));
                }
            }
        }

        /// Every blocks-target shows up in the blocked-tasks query.
        #[test]
        fn prop_blocks_targets_reported_blocked(
            pairs in prop::collection::vec((0usize..5, 0usize..5), 1..10)
        ) {
            let graph = IntentGraph::new();
            let ids: Vec<_> = (0..5)
                .map(|i| graph.create_task(&format!("task-{}", i), None, "").unwrap())
                .collect();

            let mut expected_blocked = Vec::new();
            for (from, to) in pairs {
                if graph.link_nodes(ids[from], ids[to], Relationship::Blocks).is_ok() {
                    expected_blocked.push(ids[to]);
                }
            }

            let blocked = graph.blocked_tasks().unwrap();
            for id in expected_blocked {
                prop_assert!(blocked.iter().any(|n| n.node_id == id));
            }
        }

        /// Export/import round-trips the node set exactly.
        #[test]
        fn prop_export_import_lossless(
            titles in prop::collection::vec("[a-z]{1,12}", 1..8)
        ) {
            let graph = IntentGraph::new();
            for title in &titles {
                graph.create_task(title, None, "").unwrap();
            }

            let snapshot = graph.export().unwrap();
            let restored = IntentGraph::new();
            restored.import(snapshot.clone()).unwrap();

            let snapshot_again = restored.export().unwrap();
            prop_assert_eq!(snapshot.nodes, snapshot_again.nodes);
        }
    }
}
