//! Enum types for COMPASS entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// INTENT GRAPH ENUMS
// ============================================================================

/// Kind discriminator for intent nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// High-level objective
    Goal,
    /// Concrete unit of work
    Task,
    /// A decision recorded as an already-made fact
    Decision,
    /// An open question
    Question,
    /// Free-form context note
    Note,
    /// A produced artifact (file, document, output)
    Artifact,
    /// A captured insight or learning
    Insight,
    /// An impediment tracked as its own node
    Blocker,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Goal => "goal",
            NodeKind::Task => "task",
            NodeKind::Decision => "decision",
            NodeKind::Question => "question",
            NodeKind::Note => "note",
            NodeKind::Artifact => "artifact",
            NodeKind::Insight => "insight",
            NodeKind::Blocker => "blocker",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "goal" => Ok(NodeKind::Goal),
            "task" => Ok(NodeKind::Task),
            "decision" => Ok(NodeKind::Decision),
            "question" => Ok(NodeKind::Question),
            "note" | "context" => Ok(NodeKind::Note),
            "artifact" => Ok(NodeKind::Artifact),
            "insight" => Ok(NodeKind::Insight),
            "blocker" => Ok(NodeKind::Blocker),
            _ => Err(format!("Invalid node kind: {}", s)),
        }
    }
}

/// Status of an intent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeStatus {
    #[default]
    Pending,
    Active,
    Blocked,
    Completed,
    Cancelled,
}

impl NodeStatus {
    /// Check if this is a terminal state. Cancellation is a status
    /// transition, never a removal from the graph.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Cancelled)
    }
}

/// Typed relationship between two intent nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relationship {
    /// `from` is a parent of `to`: recorded on both endpoints
    Parent,
    /// `from` blocks `to`: asymmetric pair, recorded on both endpoints
    Blocks,
    /// Symmetric association
    Related,
}

// ============================================================================
// AGENT / COORDINATION ENUMS
// ============================================================================

/// Role an agent plays in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    Coordinator,
    Coder,
    Reviewer,
    Researcher,
    Documenter,
    Tester,
    Planner,
    Executor,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Coordinator => "coordinator",
            AgentRole::Coder => "coder",
            AgentRole::Reviewer => "reviewer",
            AgentRole::Researcher => "researcher",
            AgentRole::Documenter => "documenter",
            AgentRole::Tester => "tester",
            AgentRole::Planner => "planner",
            AgentRole::Executor => "executor",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "coordinator" => Ok(AgentRole::Coordinator),
            "coder" => Ok(AgentRole::Coder),
            "reviewer" => Ok(AgentRole::Reviewer),
            "researcher" => Ok(AgentRole::Researcher),
            "documenter" => Ok(AgentRole::Documenter),
            "tester" => Ok(AgentRole::Tester),
            "planner" => Ok(AgentRole::Planner),
            "executor" => Ok(AgentRole::Executor),
            _ => Err(format!("Invalid agent role: {}", s)),
        }
    }
}

/// Kind of handoff between two agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandoffKind {
    /// Receiver continues where the sender stopped
    Sequential,
    /// Receiver works alongside the sender
    Parallel,
    /// Receiver reviews the sender's work
    Review,
    /// Receiver assists without taking over
    Assist,
    /// Sender delegates a sub-piece
    Delegate,
}

/// Status of a handoff operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandoffStatus {
    /// Handoff has been created, waiting for acceptance
    Pending,
    /// Handoff was accepted by the receiving agent; ownership transferred
    Accepted,
    /// Handoff was rejected by the receiving agent
    Rejected,
    /// Handoff has been completed
    Completed,
}

impl HandoffStatus {
    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandoffStatus::Rejected | HandoffStatus::Completed)
    }
}

impl fmt::Display for HandoffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandoffStatus::Pending => "pending",
            HandoffStatus::Accepted => "accepted",
            HandoffStatus::Rejected => "rejected",
            HandoffStatus::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

/// Status of a collaboration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Planning,
    Active,
    Completed,
    Cancelled,
}

// ============================================================================
// CONTEXT / COLLABORATOR ENUMS
// ============================================================================

/// Type tag for a context item surfaced to a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextItemKind {
    /// Parent goal of the subject
    Goal,
    /// A recorded decision related to the subject
    Decision,
    /// A task node (referencing task or query match)
    Task,
    /// File metadata for a linked artifact
    Artifact,
    /// Documentation associated with a linked file
    Documentation,
    /// Another node sharing tags with the subject
    SimilarTask,
    /// A file the semantic index declares related
    RelatedFile,
    /// A generic graph node matched by a free-text query
    Node,
}

/// Which subsystem produced a context item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextSource {
    IntentGraph,
    SemanticIndex,
    DocStore,
}

/// Sync status of a document relative to the code it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SyncStatus {
    InSync,
    OutOfSync,
    NeedsReview,
    #[default]
    Unknown,
}

// ============================================================================
// TESTS
// ============================================================================
