//! Intent node - the unit of the goal/task/decision graph
//!
//! Nodes hold relationship edges as id sets, not direct references, so the
//! graph can live in a flat id-keyed store with no ownership cycles. The
//! symmetric invariants (parent/child, blocks/blocked-by) are maintained by
//! the linking operations in `compass-graph`; the mutators here only guard
//! against duplicate entries.

use crate::{EntityId, NodeKind, NodeStatus, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to a file (and optionally the commit that touched it)
/// realizing a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub path: String,
    pub commit: Option<String>,
}

impl ArtifactRef {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            commit: None,
        }
    }

    pub fn with_commit(mut self, commit: &str) -> Self {
        self.commit = Some(commit.to_string());
        self
    }
}

/// A node in the intent graph: a goal, task, decision, question, note,
/// artifact, insight, or blocker, capturing both the "what" and the "why".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentNode {
    /// Unique identifier, immutable after creation
    pub node_id: EntityId,
    /// Kind discriminator
    pub kind: NodeKind,
    pub title: String,
    pub description: String,
    /// The "why" - mandatory for decisions, encouraged elsewhere.
    /// Not validated at the API level.
    pub rationale: String,
    pub status: NodeStatus,
    /// Higher = more urgent
    pub priority: i32,
    /// Estimated effort (arbitrary units)
    pub estimated_effort: Option<i32>,
    /// Actual effort once known
    pub actual_effort: Option<i32>,
    /// Agent currently assigned, if any
    pub assigned_to: Option<EntityId>,
    /// Who created this node (free-form)
    pub created_by: Option<String>,

    /// Back-references only; the graph store owns the nodes
    pub parent_ids: Vec<EntityId>,
    pub child_ids: Vec<EntityId>,
    /// Symmetric association
    pub related_ids: Vec<EntityId>,
    /// Nodes this node blocks
    pub blocks_ids: Vec<EntityId>,
    /// Nodes blocking this node
    pub blocked_by_ids: Vec<EntityId>,

    /// Linked file paths (with optional commits)
    pub artifacts: Vec<ArtifactRef>,
    /// External identifiers: commit hashes, URLs, ticket ids
    pub external_refs: Vec<String>,
    pub tags: Vec<String>,

    pub metadata: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl IntentNode {
    /// Create a new node of the given kind.
    pub fn new(kind: NodeKind, title: &str) -> Self {
        let now = Utc::now();
        Self {
            node_id: Uuid::now_v7(),
            kind,
            title: title.to_string(),
            description: String::new(),
            rationale: String::new(),
            status: NodeStatus::Pending,
            priority: 0,
            estimated_effort: None,
            actual_effort: None,
            assigned_to: None,
            created_by: None,
            parent_ids: Vec::new(),
            child_ids: Vec::new(),
            related_ids: Vec::new(),
            blocks_ids: Vec::new(),
            blocked_by_ids: Vec::new(),
            artifacts: Vec::new(),
            external_refs: Vec::new(),
            tags: Vec::new(),
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Set the rationale.
    pub fn with_rationale(mut self, rationale: &str) -> Self {
        self.rationale = rationale.to_string();
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the creator.
    pub fn with_created_by(mut self, created_by: &str) -> Self {
        self.created_by = Some(created_by.to_string());
        self
    }

    /// Set tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Refresh the updated_at stamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn add_parent(&mut self, id: EntityId) {
        if !self.parent_ids.contains(&id) {
            self.parent_ids.push(id);
        }
    }

    pub fn add_child(&mut self, id: EntityId) {
        if !self.child_ids.contains(&id) {
            self.child_ids.push(id);
        }
    }

    pub fn add_related(&mut self, id: EntityId) {
        if !self.related_ids.contains(&id) {
            self.related_ids.push(id);
        }
    }

    pub fn add_blocks(&mut self, id: EntityId) {
        if !self.blocks_ids.contains(&id) {
            self.blocks_ids.push(id);
        }
    }

    pub fn add_blocked_by(&mut self, id: EntityId) {
        if !self.blocked_by_ids.contains(&id) {
            self.blocked_by_ids.push(id);
        }
    }

    /// Add an artifact reference (deduplicated by path + commit).
    pub fn add_artifact(&mut self, artifact: ArtifactRef) {
        if !self.artifacts.contains(&artifact) {
            self.artifacts.push(artifact);
        }
    }

    pub fn add_external_ref(&mut self, external_ref: &str) {
        if !self.external_refs.iter().any(|r| r == external_ref) {
            self.external_refs.push(external_ref.to_string());
        }
    }

    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Check whether this node links the given file path.
    pub fn references_path(&self, path: &str) -> bool {
        self.artifacts.iter().any(|a| a.path == path)
    }

    /// A node counts as blocked if its status says so OR anything blocks
    /// it. Callers may set Blocked explicitly; queries use this union.
    pub fn is_blocked(&self) -> bool {
        self.status == NodeStatus::Blocked || !self.blocked_by_ids.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_new_defaults() {
        let node = IntentNode::new(NodeKind::Task, "Implement parser");

        assert_eq!(node.kind, NodeKind::Task);
        assert_eq!(node.title, "Implement parser");
        assert_eq!(node.status, NodeStatus::Pending);
        assert_eq!(node.priority, 0);
        assert!(node.parent_ids.is_empty());
        assert!(node.assigned_to.is_none());
    }

    #[test]
    fn test_edge_mutators_deduplicate() {
        let mut node = IntentNode::new(NodeKind::Task, "t");
        let other = Uuid::now_v7();

        node.add_parent(other);
        node.add_parent(other);
        assert_eq!(node.parent_ids.len(), 1);

        node.add_blocked_by(other);
        node.add_blocked_by(other);
        assert_eq!(node.blocked_by_ids.len(), 1);

        node.add_tag("auth");
        node.add_tag("auth");
        assert_eq!(node.tags.len(), 1);
    }

    #[test]
    fn test_is_blocked_union() {
        let mut node = IntentNode::new(NodeKind::Task, "t");
        assert!(!node.is_blocked());

        node.add_blocked_by(Uuid::now_v7());
        assert!(node.is_blocked());

        let mut explicit = IntentNode::new(NodeKind::Task, "t2");
        explicit.status = NodeStatus::Blocked;
        assert!(explicit.is_blocked());
    }

    #[test]
    fn test_artifact_dedup_and_lookup() {
        let mut node = IntentNode::new(NodeKind::Task, "t");
        node.add_artifact(ArtifactRef::new("src/auth.rs"));
        node.add_artifact(ArtifactRef::new("src/auth.rs"));
        node.add_artifact(ArtifactRef::new("src/auth.rs").with_commit("abc123"));

        assert_eq!(node.artifacts.len(), 2);
        assert!(node.references_path("src/auth.rs"));
        assert!(!node.references_path("src/other.rs"));
    }
}
