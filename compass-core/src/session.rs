//! Collaboration sessions

use crate::{EntityId, SessionStatus, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Groups a goal with the agents and tasks working toward it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationSession {
    pub session_id: EntityId,
    /// Goal node this session pursues
    pub goal_id: EntityId,
    pub agent_ids: Vec<EntityId>,
    pub task_ids: Vec<EntityId>,
    pub status: SessionStatus,
    /// Optional coordinating agent
    pub coordinator_id: Option<EntityId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CollaborationSession {
    /// Create a new session in the planning state.
    pub fn new(goal_id: EntityId) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::now_v7(),
            goal_id,
            agent_ids: Vec::new(),
            task_ids: Vec::new(),
            status: SessionStatus::Planning,
            coordinator_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the coordinating agent.
    pub fn with_coordinator(mut self, coordinator_id: EntityId) -> Self {
        self.coordinator_id = Some(coordinator_id);
        self
    }

    pub fn add_agent(&mut self, agent_id: EntityId) {
        if !self.agent_ids.contains(&agent_id) {
            self.agent_ids.push(agent_id);
            self.updated_at = Utc::now();
        }
    }

    pub fn add_task(&mut self, task_id: EntityId) {
        if !self.task_ids.contains(&task_id) {
            self.task_ids.push(task_id);
            self.updated_at = Utc::now();
        }
    }

    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
