//! COMPASS Test Utilities
//!
//! Centralized test infrastructure for the COMPASS workspace:
//! - Proptest generators for entity types
//! - Pre-built fixtures for common scenarios
//! - The in-memory collaborator backends, re-exported for convenience

pub use compass_context::{InMemoryDocStore, InMemorySemanticIndex};

pub use compass_core::{
    AgentInfo, AgentRole, ArtifactRef, CollaborationSession, CompassError, CompassResult,
    ContextBundle, ContextItem, ContextItemKind, ContextSource, EntityId, Handoff, HandoffKind,
    HandoffStatus, IntentNode, NodeKind, NodeStatus, Relationship, SessionStatus, SyncStatus,
    Timestamp,
};

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for COMPASS entity types.

    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_uuid_v7() -> impl Strategy<Value = Uuid> {
        Just(()).prop_map(|_| Uuid::now_v7())
    }

    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-01-01 .. 2030-01-01
        (1_577_836_800i64..1_893_456_000i64)
            .prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now))
    }

    pub fn arb_node_kind() -> impl Strategy<Value = NodeKind> {
        prop_oneof![
            Just(NodeKind::Goal),
            Just(NodeKind::Task),
            Just(NodeKind::Decision),
            Just(NodeKind::Question),
            Just(NodeKind::Note),
            Just(NodeKind::Artifact),
            Just(NodeKind::Insight),
            Just(NodeKind::Blocker),
        ]
    }

    pub fn arb_node_status() -> impl Strategy<Value = NodeStatus> {
        prop_oneof![
            Just(NodeStatus::Pending),
            Just(NodeStatus::Active),
            Just(NodeStatus::Blocked),
            Just(NodeStatus::Completed),
            Just(NodeStatus::Cancelled),
        ]
    }

    pub fn arb_relationship() -> impl Strategy<Value = Relationship> {
        prop_oneof![
            Just(Relationship::Parent),
            Just(Relationship::Blocks),
            Just(Relationship::Related),
        ]
    }

    pub fn arb_agent_role() -> impl Strategy<Value = AgentRole> {
        prop_oneof![
            Just(AgentRole::Coordinator),
            Just(AgentRole::Coder),
            Just(AgentRole::Reviewer),
            Just(AgentRole::Researcher),
            Just(AgentRole::Documenter),
            Just(AgentRole::Tester),
            Just(AgentRole::Planner),
            Just(AgentRole::Executor),
        ]
    }

    pub fn arb_handoff_kind() -> impl Strategy<Value = HandoffKind> {
        prop_oneof![
            Just(HandoffKind::Sequential),
            Just(HandoffKind::Parallel),
            Just(HandoffKind::Review),
            Just(HandoffKind::Assist),
            Just(HandoffKind::Delegate),
        ]
    }

    pub fn arb_sync_status() -> impl Strategy<Value = SyncStatus> {
        prop_oneof![
            Just(SyncStatus::InSync),
            Just(SyncStatus::OutOfSync),
            Just(SyncStatus::NeedsReview),
            Just(SyncStatus::Unknown),
        ]
    }

    pub fn arb_artifact_ref() -> impl Strategy<Value = ArtifactRef> {
        ("[a-z]{1,8}/[a-z]{1,8}\\.(rs|py|md)", prop::option::of("[0-9a-f]{7}"))
            .prop_map(|(path, commit)| {
                let artifact = ArtifactRef::new(&path);
                match commit {
                    Some(c) => artifact.with_commit(&c),
                    None => artifact,
                }
            })
    }

    /// A standalone node with no edges; link through the graph API to
    /// keep the symmetry invariants intact.
    pub fn arb_intent_node() -> impl Strategy<Value = IntentNode> {
        (
            arb_node_kind(),
            "[a-zA-Z ]{1,32}",
            "[a-zA-Z ]{0,64}",
            arb_node_status(),
            -10i32..10,
            prop::collection::vec("[a-z]{1,8}", 0..4),
        )
            .prop_map(|(kind, title, rationale, status, priority, tags)| {
                IntentNode::new(kind, &title)
                    .with_rationale(&rationale)
                    .with_status(status)
                    .with_priority(priority)
                    .with_tags(tags)
            })
    }

    pub fn arb_agent_info() -> impl Strategy<Value = AgentInfo> {
        (
            "[a-z]{1,12}",
            arb_agent_role(),
            prop::collection::vec("[a-z]{1,8}", 0..4),
        )
            .prop_map(|(name, role, capabilities)| AgentInfo::new(&name, role, capabilities))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common testing scenarios.

    use super::*;
    use compass_context::{ContextEngine, DocStore, FileMetadata, SemanticIndex};
    use compass_graph::IntentGraph;
    use std::sync::Arc;

    /// Ids of the nodes created by `seeded_graph`.
    pub struct SeededGraph {
        pub graph: Arc<IntentGraph>,
        pub goal: EntityId,
        pub task: EntityId,
        pub subtask: EntityId,
        pub decision: EntityId,
        pub blocker: EntityId,
    }

    /// A small graph with one of every interesting edge: a goal with a
    /// task, a subtask under the task, a related decision, a blocker
    /// blocking the task, one artifact ("src/auth.rs") and one tag
    /// ("auth") on the task.
    pub fn seeded_graph() -> SeededGraph {
        let graph = Arc::new(IntentGraph::new());
        let goal = graph
            .create_goal("Ship authentication", None, "Customers need login")
            .unwrap();
        let task = graph
            .create_task("Implement session tokens", Some(goal), "First slice")
            .unwrap();
        let subtask = graph
            .create_task("Add token refresh", Some(task), "")
            .unwrap();
        let decision = graph
            .create_decision(
                "Use opaque tokens",
                "Simpler revocation story",
                vec!["JWT".to_string()],
            )
            .unwrap();
        let blocker = graph
            .create_task("Fix schema migration", None, "")
            .unwrap();
        graph.link_nodes(task, decision, Relationship::Related).unwrap();
        graph.link_nodes(blocker, task, Relationship::Blocks).unwrap();
        graph.link_artifact(task, "src/auth.rs", None).unwrap();
        graph.add_tag(task, "auth").unwrap();
        SeededGraph {
            graph,
            goal,
            task,
            subtask,
            decision,
            blocker,
        }
    }

    /// An index and doc store seeded to match `seeded_graph`: metadata
    /// for "src/auth.rs", a related "src/session.rs", and an in-sync
    /// "docs/auth.md".
    pub fn indexed_workspace() -> (Arc<InMemorySemanticIndex>, Arc<InMemoryDocStore>) {
        let index = Arc::new(InMemorySemanticIndex::new());
        index.index_file(
            FileMetadata::new("src/auth.rs", "Session token issuance and validation")
                .with_language("rust")
                .with_symbols(vec!["issue_token".to_string(), "validate".to_string()]),
        );
        index.index_file(FileMetadata::new("src/session.rs", "Session state"));
        index.declare_related("src/auth.rs", "src/session.rs");

        let docs = Arc::new(InMemoryDocStore::new());
        docs.add_doc("src/auth.rs", "docs/auth.md");
        docs.set_sync_status("docs/auth.md", SyncStatus::InSync);
        (index, docs)
    }

    /// The full read stack: seeded graph, seeded collaborators, and a
    /// context engine wired over them.
    pub fn engine_stack() -> (SeededGraph, Arc<ContextEngine>) {
        let seeded = seeded_graph();
        let (index, docs) = indexed_workspace();
        let engine = Arc::new(ContextEngine::new(
            Arc::clone(&seeded.graph),
            index as Arc<dyn SemanticIndex>,
            docs as Arc<dyn DocStore>,
        ));
        (seeded, engine)
    }

    /// An active coder agent.
    pub fn coder_agent(name: &str) -> AgentInfo {
        AgentInfo::new(name, AgentRole::Coder, vec!["rust".to_string()])
    }

    /// An active reviewer agent.
    pub fn reviewer_agent(name: &str) -> AgentInfo {
        AgentInfo::new(
            name,
            AgentRole::Reviewer,
            vec!["rust".to_string(), "review".to_string()],
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
