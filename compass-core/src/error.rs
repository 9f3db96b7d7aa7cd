//! Error types for COMPASS operations
//!
//! The reference behavior this core replaces favored silent no-ops for
//! missing ids. Here every failure is an explicit tagged result; callers
//! that want the old behavior can discard the error. No operation
//! partially mutates state before returning an error.

use crate::{EntityId, HandoffStatus};
use thiserror::Error;

/// Intent graph errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node not found: {id}")]
    NodeNotFound { id: EntityId },

    #[error("Node already exists: {id}")]
    DuplicateNode { id: EntityId },

    #[error("Cannot link node {id} to itself")]
    SelfLink { id: EntityId },

    #[error("Graph lock poisoned")]
    LockPoisoned,

    #[error("Snapshot serialization failed: {reason}")]
    SnapshotFailed { reason: String },
}

/// Context retrieval errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("Context cache lock poisoned")]
    LockPoisoned,
}

/// Agent coordination errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinationError {
    #[error("Agent not registered: {agent_id}")]
    AgentNotRegistered { agent_id: EntityId },

    #[error("Agent {agent_id} is busy with task {task_id}")]
    AgentBusy { agent_id: EntityId, task_id: EntityId },

    #[error("Task {task_id} is already owned by agent {owner}")]
    TaskAlreadyOwned { task_id: EntityId, owner: EntityId },

    #[error("Handoff not found: {handoff_id}")]
    HandoffNotFound { handoff_id: EntityId },

    #[error("Agent {agent_id} is not the recipient of handoff {handoff_id}")]
    WrongRecipient {
        handoff_id: EntityId,
        agent_id: EntityId,
    },

    #[error("Handoff {handoff_id} is in state {actual} but expected {expected}")]
    InvalidTransition {
        handoff_id: EntityId,
        expected: HandoffStatus,
        actual: HandoffStatus,
    },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: EntityId },

    #[error("Coordinator lock poisoned")]
    LockPoisoned,

    #[error("Snapshot serialization failed: {reason}")]
    SnapshotFailed { reason: String },
}

/// Master error type for all COMPASS errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompassError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    #[error("Coordination error: {0}")]
    Coordination(#[from] CoordinationError),
}

/// Result type alias for COMPASS operations.
pub type CompassResult<T> = Result<T, CompassError>;

// =============================================================================
// TESTS
// =============================================================================
