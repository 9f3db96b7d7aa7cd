//! Agent identity and handoffs

use crate::{AgentRole, ContextItem, EntityId, HandoffKind, HandoffStatus, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// AGENT IDENTITY
// ============================================================================

/// An agent in the coordination system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    /// Unique identifier for this agent
    pub agent_id: EntityId,
    /// Display name
    pub name: String,
    /// Role this agent plays
    pub role: AgentRole,
    /// Capabilities this agent has
    pub capabilities: Vec<String>,
    /// Task currently held - an agent holds zero or one task
    pub current_task_id: Option<EntityId>,
    /// Whether this agent is accepting work
    pub active: bool,
    /// Last heartbeat timestamp
    pub last_seen: Timestamp,
    pub metadata: Option<serde_json::Value>,
}

impl AgentInfo {
    /// Create a new active agent.
    pub fn new(name: &str, role: AgentRole, capabilities: Vec<String>) -> Self {
        Self {
            agent_id: Uuid::now_v7(),
            name: name.to_string(),
            role,
            capabilities,
            current_task_id: None,
            active: true,
            last_seen: Utc::now(),
            metadata: None,
        }
    }

    /// Set metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Update the heartbeat timestamp.
    pub fn heartbeat(&mut self) {
        self.last_seen = Utc::now();
    }

    /// Check if agent has a specific capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Check if agent has every capability in the given set.
    pub fn has_capabilities(&self, capabilities: &[String]) -> bool {
        capabilities.iter().all(|c| self.has_capability(c))
    }

    /// Active and holding no task.
    pub fn is_available(&self) -> bool {
        self.active && self.current_task_id.is_none()
    }
}

// ============================================================================
// HANDOFF
// ============================================================================

/// Context payload carried by a handoff: a snapshot of the task's context
/// bundle taken at creation time plus a free-text message. Never re-fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HandoffContext {
    pub items: Vec<ContextItem>,
    pub message: String,
}

/// A proposed transfer of task ownership between two agents.
///
/// Lifecycle: pending -> accepted | rejected, accepted -> completed.
/// Acceptance, not creation, is the point at which ownership transfers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handoff {
    pub handoff_id: EntityId,
    pub from_agent_id: EntityId,
    pub to_agent_id: EntityId,
    pub task_id: EntityId,
    pub kind: HandoffKind,
    pub context: HandoffContext,
    pub status: HandoffStatus,
    /// Free-text result recorded at completion
    pub result: Option<String>,
    pub created_at: Timestamp,
    pub accepted_at: Option<Timestamp>,
    pub rejected_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl Handoff {
    /// Create a new pending handoff.
    pub fn new(
        from_agent_id: EntityId,
        to_agent_id: EntityId,
        task_id: EntityId,
        kind: HandoffKind,
        message: &str,
    ) -> Self {
        Self {
            handoff_id: Uuid::now_v7(),
            from_agent_id,
            to_agent_id,
            task_id,
            kind,
            context: HandoffContext {
                items: Vec::new(),
                message: message.to_string(),
            },
            status: HandoffStatus::Pending,
            result: None,
            created_at: Utc::now(),
            accepted_at: None,
            rejected_at: None,
            completed_at: None,
        }
    }

    /// Attach the context snapshot.
    pub fn with_context_items(mut self, items: Vec<ContextItem>) -> Self {
        self.context.items = items;
        self
    }

    /// Accept the handoff.
    pub fn accept(&mut self) {
        self.status = HandoffStatus::Accepted;
        self.accepted_at = Some(Utc::now());
    }

    /// Reject the handoff.
    pub fn reject(&mut self, reason: &str) {
        self.status = HandoffStatus::Rejected;
        self.rejected_at = Some(Utc::now());
        self.result = Some(reason.to_string());
    }

    /// Complete the handoff.
    pub fn complete(&mut self, result: Option<String>) {
        self.status = HandoffStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.result = result;
    }
}

// ============================================================================
// TESTS
// ============================================================================
