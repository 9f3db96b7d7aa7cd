//! COMPASS Coordinator - Agent Coordination
//!
//! Owns the agent registry, the task-to-agent ownership map, handoffs, and
//! collaboration sessions. It references intent node ids but never duplicates
//! node state; assignment changes are written back to the graph's
//! `assigned_to` field, with the ownership map staying authoritative.
//!
//! Central invariant: a task has at most one owner and an agent holds at
//! most one task, preserved under concurrent requests. All registry,
//! ownership, handoff, and session state sits behind one lock so every
//! check-then-mutate operation is a single critical section; compound
//! updates apply as one unit or not at all.

use compass_context::ContextEngine;
use compass_core::{
    AgentInfo, AgentRole, CollaborationSession, CompassResult, CoordinationError, EntityId,
    Handoff, HandoffKind, HandoffStatus, SessionStatus, Timestamp,
};
use compass_graph::IntentGraph;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Items of a task's context bundle snapshotted into a new handoff.
pub const HANDOFF_CONTEXT_ITEMS: usize = 5;

/// Description length above which a task warrants planning before execution.
pub const PLAN_DESCRIPTION_THRESHOLD: usize = 500;

/// Artifact extensions treated as source code for collaboration suggestions.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "ts", "go", "java", "c", "cpp", "h", "hpp", "rb", "cs",
];

// ============================================================================
// COLLABORATION PATTERNS
// ============================================================================

/// Heuristic collaboration shapes. Triggers are independent; zero, one, or
/// several may be suggested for the same task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollaborationPattern {
    /// The task has subtasks that could run concurrently
    Parallel,
    /// The description is long enough to warrant a planning pass first
    PlanAndExecute,
    /// Linked source files suggest pairing a coder with a reviewer
    CodeAndReview,
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// One ownership map entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipEntry {
    pub task_id: EntityId,
    pub agent_id: EntityId,
}

/// Durable JSON form of coordinator state: agents, sessions, and the
/// ownership map. Handoff history is runtime state and not exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorSnapshot {
    pub exported_at: Timestamp,
    pub agents: Vec<AgentInfo>,
    pub sessions: Vec<CollaborationSession>,
    pub ownership: Vec<OwnershipEntry>,
}

// ============================================================================
// COORDINATOR
// ============================================================================

#[derive(Debug, Default)]
struct CoordinatorState {
    agents: HashMap<EntityId, AgentInfo>,
    /// task id -> owning agent id
    ownership: HashMap<EntityId, EntityId>,
    handoffs: HashMap<EntityId, Handoff>,
    sessions: HashMap<EntityId, CollaborationSession>,
}

/// Agent coordinator. Construct once per process and share via `Arc`.
pub struct AgentCoordinator {
    graph: Arc<IntentGraph>,
    context: Arc<ContextEngine>,
    state: RwLock<CoordinatorState>,
}

impl AgentCoordinator {
    pub fn new(graph: Arc<IntentGraph>, context: Arc<ContextEngine>) -> Self {
        Self {
            graph,
            context,
            state: RwLock::new(CoordinatorState::default()),
        }
    }

    fn read(&self) -> CompassResult<std::sync::RwLockReadGuard<'_, CoordinatorState>> {
        self.state
            .read()
            .map_err(|_| CoordinationError::LockPoisoned.into())
    }

    fn write(&self) -> CompassResult<std::sync::RwLockWriteGuard<'_, CoordinatorState>> {
        self.state
            .write()
            .map_err(|_| CoordinationError::LockPoisoned.into())
    }

    // ========================================================================
    // AGENT REGISTRY
    // ========================================================================

    /// Register an agent. Idempotent by id: re-registering replaces the
    /// stored info but never disturbs an existing current-task assignment.
    pub fn register_agent(&self, info: AgentInfo) -> CompassResult<EntityId> {
        let mut state = self.write()?;
        let agent_id = info.agent_id;
        let mut info = info;
        if let Some(existing) = state.agents.get(&agent_id) {
            info.current_task_id = existing.current_task_id;
        }
        tracing::info!(agent_id = %agent_id, name = %info.name, role = ?info.role, "agent registered");
        state.agents.insert(agent_id, info);
        Ok(agent_id)
    }

    /// Get a registered agent (cloned out).
    pub fn get_agent(&self, agent_id: EntityId) -> CompassResult<AgentInfo> {
        let state = self.read()?;
        state
            .agents
            .get(&agent_id)
            .cloned()
            .ok_or_else(|| CoordinationError::AgentNotRegistered { agent_id }.into())
    }

    /// All registered agents, in id order.
    pub fn list_agents(&self) -> CompassResult<Vec<AgentInfo>> {
        let state = self.read()?;
        let mut agents: Vec<AgentInfo> = state.agents.values().cloned().collect();
        agents.sort_by_key(|a| a.agent_id);
        Ok(agents)
    }

    /// Refresh an agent's last-seen timestamp.
    pub fn heartbeat(&self, agent_id: EntityId) -> CompassResult<()> {
        let mut state = self.write()?;
        let agent = state
            .agents
            .get_mut(&agent_id)
            .ok_or(CoordinationError::AgentNotRegistered { agent_id })?;
        agent.heartbeat();
        Ok(())
    }

    /// Mark an agent active or inactive. Inactive agents keep any held
    /// task; there is no automatic reclamation (see `release_task`).
    pub fn set_agent_active(&self, agent_id: EntityId, active: bool) -> CompassResult<()> {
        let mut state = self.write()?;
        let agent = state
            .agents
            .get_mut(&agent_id)
            .ok_or(CoordinationError::AgentNotRegistered { agent_id })?;
        agent.active = active;
        Ok(())
    }

    /// First active, unoccupied agent matching the role and capability
    /// superset constraints. Scan order is id order, first match wins;
    /// callers needing a specific agent filter further themselves.
    pub fn find_available_agent(
        &self,
        required_role: Option<AgentRole>,
        required_capabilities: &[String],
    ) -> CompassResult<Option<AgentInfo>> {
        let state = self.read()?;
        let mut candidates: Vec<&AgentInfo> = state.agents.values().collect();
        candidates.sort_by_key(|a| a.agent_id);
        Ok(candidates
            .into_iter()
            .find(|a| {
                a.is_available()
                    && required_role.map_or(true, |r| a.role == r)
                    && a.has_capabilities(required_capabilities)
            })
            .cloned())
    }

    // ========================================================================
    // OWNERSHIP
    // ========================================================================

    /// Current owner of a task, if any.
    pub fn owner_of(&self, task_id: EntityId) -> CompassResult<Option<EntityId>> {
        let state = self.read()?;
        Ok(state.ownership.get(&task_id).copied())
    }

    /// Assign a task to an agent. Fails without mutating anything if the
    /// agent is unknown, the agent already holds a task, the task already
    /// has an owner, or the task node does not exist. Taking over an owned
    /// task goes through a handoff or `release_task`, never through
    /// reassignment. The ownership entry, the agent's current-task-id,
    /// and the graph's assignee field update as one unit.
    pub fn assign_task(&self, task_id: EntityId, agent_id: EntityId) -> CompassResult<()> {
        let mut state = self.write()?;
        let agent = state
            .agents
            .get(&agent_id)
            .ok_or(CoordinationError::AgentNotRegistered { agent_id })?;
        if let Some(held) = agent.current_task_id {
            return Err(CoordinationError::AgentBusy {
                agent_id,
                task_id: held,
            }
            .into());
        }
        if let Some(owner) = state.ownership.get(&task_id) {
            return Err(CoordinationError::TaskAlreadyOwned {
                task_id,
                owner: *owner,
            }
            .into());
        }

        // graph write goes first: if the node is missing, nothing changed
        self.graph.assign(task_id, Some(agent_id))?;

        state.ownership.insert(task_id, agent_id);
        if let Some(agent) = state.agents.get_mut(&agent_id) {
            agent.current_task_id = Some(task_id);
        }
        tracing::info!(task_id = %task_id, agent_id = %agent_id, "task assigned");
        Ok(())
    }

    /// Release a task from its owner, clearing the ownership entry, the
    /// owner's current-task-id, and the graph's assignee field. The escape
    /// hatch for work held by an agent that went inactive. No-op result
    /// is Ok when the task has no owner.
    pub fn release_task(&self, task_id: EntityId) -> CompassResult<()> {
        let mut state = self.write()?;
        let Some(owner) = state.ownership.remove(&task_id) else {
            return Ok(());
        };
        if let Some(agent) = state.agents.get_mut(&owner) {
            if agent.current_task_id == Some(task_id) {
                agent.current_task_id = None;
            }
        }
        self.graph.assign(task_id, None)?;
        tracing::info!(task_id = %task_id, agent_id = %owner, "task released");
        Ok(())
    }

    /// Resolve an ownership conflict between two contenders.
    ///
    /// Policy (a documented design choice, not a derived optimum): an
    /// existing recorded owner wins unconditionally; otherwise the agent
    /// owning fewer tasks wins; remaining ties go to `agent1`.
    pub fn resolve_conflict(
        &self,
        task_id: EntityId,
        agent1: EntityId,
        agent2: EntityId,
    ) -> CompassResult<EntityId> {
        let state = self.read()?;
        if let Some(owner) = state.ownership.get(&task_id) {
            tracing::warn!(task_id = %task_id, winner = %owner, "conflict resolved to existing owner");
            return Ok(*owner);
        }
        let owned = |agent: EntityId| state.ownership.values().filter(|a| **a == agent).count();
        let winner = if owned(agent2) < owned(agent1) {
            agent2
        } else {
            agent1
        };
        tracing::warn!(task_id = %task_id, winner = %winner, "conflict resolved by load");
        Ok(winner)
    }

    // ========================================================================
    // HANDOFFS
    // ========================================================================

    /// Propose transferring a task from one agent to another. The handoff
    /// starts pending and carries a snapshot of the task's context bundle
    /// (top items plus the message), taken now and never re-fetched.
    /// Ownership does not move until acceptance.
    pub fn create_handoff(
        &self,
        from_agent_id: EntityId,
        to_agent_id: EntityId,
        task_id: EntityId,
        kind: HandoffKind,
        message: &str,
    ) -> CompassResult<EntityId> {
        {
            let state = self.read()?;
            if !state.agents.contains_key(&from_agent_id) {
                return Err(CoordinationError::AgentNotRegistered {
                    agent_id: from_agent_id,
                }
                .into());
            }
            if !state.agents.contains_key(&to_agent_id) {
                return Err(CoordinationError::AgentNotRegistered {
                    agent_id: to_agent_id,
                }
                .into());
            }
        }

        // fails on a missing task node, before any state change
        let bundle = self.context.context_for_task(task_id)?;
        let handoff = Handoff::new(from_agent_id, to_agent_id, task_id, kind, message)
            .with_context_items(bundle.top_n(HANDOFF_CONTEXT_ITEMS));
        let handoff_id = handoff.handoff_id;

        let mut state = self.write()?;
        state.handoffs.insert(handoff_id, handoff);
        tracing::info!(
            handoff_id = %handoff_id,
            from = %from_agent_id,
            to = %to_agent_id,
            task_id = %task_id,
            kind = ?kind,
            "handoff created"
        );
        Ok(handoff_id)
    }

    /// Get a handoff (cloned out).
    pub fn get_handoff(&self, handoff_id: EntityId) -> CompassResult<Handoff> {
        let state = self.read()?;
        state
            .handoffs
            .get(&handoff_id)
            .cloned()
            .ok_or_else(|| CoordinationError::HandoffNotFound { handoff_id }.into())
    }

    /// Pending handoffs addressed to an agent, in id order.
    pub fn pending_handoffs_for(&self, agent_id: EntityId) -> CompassResult<Vec<Handoff>> {
        let state = self.read()?;
        let mut pending: Vec<Handoff> = state
            .handoffs
            .values()
            .filter(|h| h.to_agent_id == agent_id && h.status == HandoffStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|h| h.handoff_id);
        Ok(pending)
    }

    /// Accept a pending handoff. Only the addressed recipient may accept,
    /// and only from the pending state. A handoff goes stale once the
    /// task's recorded owner no longer matches its sender (released or
    /// reassigned in the meantime); accepting a stale handoff fails rather
    /// than displacing the current owner. On success this is the point at
    /// which ownership actually transfers: the task re-points to the
    /// acceptor, the sender's current-task-id clears if it still matches,
    /// and the graph assignee updates, all as one unit.
    pub fn accept_handoff(&self, handoff_id: EntityId, agent_id: EntityId) -> CompassResult<()> {
        let mut state = self.write()?;
        let handoff = state
            .handoffs
            .get(&handoff_id)
            .ok_or(CoordinationError::HandoffNotFound { handoff_id })?;
        if handoff.to_agent_id != agent_id {
            return Err(CoordinationError::WrongRecipient {
                handoff_id,
                agent_id,
            }
            .into());
        }
        if handoff.status != HandoffStatus::Pending {
            return Err(CoordinationError::InvalidTransition {
                handoff_id,
                expected: HandoffStatus::Pending,
                actual: handoff.status,
            }
            .into());
        }
        if let Some(owner) = state.ownership.get(&handoff.task_id) {
            if *owner != handoff.from_agent_id {
                return Err(CoordinationError::TaskAlreadyOwned {
                    task_id: handoff.task_id,
                    owner: *owner,
                }
                .into());
            }
        }
        let acceptor = state
            .agents
            .get(&agent_id)
            .ok_or(CoordinationError::AgentNotRegistered { agent_id })?;
        if let Some(held) = acceptor.current_task_id {
            if held != handoff.task_id {
                return Err(CoordinationError::AgentBusy {
                    agent_id,
                    task_id: held,
                }
                .into());
            }
        }

        let task_id = handoff.task_id;
        let from_agent_id = handoff.from_agent_id;
        self.graph.assign(task_id, Some(agent_id))?;

        let handoff = state
            .handoffs
            .get_mut(&handoff_id)
            .ok_or(CoordinationError::HandoffNotFound { handoff_id })?;
        handoff.accept();
        state.ownership.insert(task_id, agent_id);
        if let Some(sender) = state.agents.get_mut(&from_agent_id) {
            if sender.current_task_id == Some(task_id) {
                sender.current_task_id = None;
            }
        }
        if let Some(acceptor) = state.agents.get_mut(&agent_id) {
            acceptor.current_task_id = Some(task_id);
        }
        tracing::info!(handoff_id = %handoff_id, task_id = %task_id, agent_id = %agent_id, "handoff accepted");
        Ok(())
    }

    /// Reject a pending handoff. Only the addressed recipient may reject.
    /// Ownership never moved, so nothing else changes.
    pub fn reject_handoff(
        &self,
        handoff_id: EntityId,
        agent_id: EntityId,
        reason: &str,
    ) -> CompassResult<()> {
        let mut state = self.write()?;
        let handoff = state
            .handoffs
            .get_mut(&handoff_id)
            .ok_or(CoordinationError::HandoffNotFound { handoff_id })?;
        if handoff.to_agent_id != agent_id {
            return Err(CoordinationError::WrongRecipient {
                handoff_id,
                agent_id,
            }
            .into());
        }
        if handoff.status != HandoffStatus::Pending {
            return Err(CoordinationError::InvalidTransition {
                handoff_id,
                expected: HandoffStatus::Pending,
                actual: handoff.status,
            }
            .into());
        }
        handoff.reject(reason);
        tracing::info!(handoff_id = %handoff_id, agent_id = %agent_id, "handoff rejected");
        Ok(())
    }

    /// Complete an accepted handoff, recording the result. The recipient's
    /// current-task-id and the ownership entry clear only if they still
    /// reference the handoff's task, guarding against a stale handoff
    /// clearing a newer assignment.
    pub fn complete_handoff(
        &self,
        handoff_id: EntityId,
        result: Option<String>,
    ) -> CompassResult<()> {
        let mut state = self.write()?;
        let handoff = state
            .handoffs
            .get_mut(&handoff_id)
            .ok_or(CoordinationError::HandoffNotFound { handoff_id })?;
        if handoff.status != HandoffStatus::Accepted {
            return Err(CoordinationError::InvalidTransition {
                handoff_id,
                expected: HandoffStatus::Accepted,
                actual: handoff.status,
            }
            .into());
        }
        handoff.complete(result);
        let task_id = handoff.task_id;
        let to_agent_id = handoff.to_agent_id;

        if state.ownership.get(&task_id) == Some(&to_agent_id) {
            state.ownership.remove(&task_id);
            if let Some(agent) = state.agents.get_mut(&to_agent_id) {
                if agent.current_task_id == Some(task_id) {
                    agent.current_task_id = None;
                }
            }
            self.graph.assign(task_id, None)?;
        }
        tracing::info!(handoff_id = %handoff_id, task_id = %task_id, "handoff completed");
        Ok(())
    }

    // ========================================================================
    // SESSIONS
    // ========================================================================

    /// Create a collaboration session for a goal, in the planning state.
    pub fn create_session(
        &self,
        goal_id: EntityId,
        coordinator_id: Option<EntityId>,
    ) -> CompassResult<EntityId> {
        // the goal node must exist
        self.graph.get(goal_id)?;
        let mut session = CollaborationSession::new(goal_id);
        if let Some(coordinator_id) = coordinator_id {
            session = session.with_coordinator(coordinator_id);
        }
        let session_id = session.session_id;
        let mut state = self.write()?;
        state.sessions.insert(session_id, session);
        tracing::info!(session_id = %session_id, goal_id = %goal_id, "session created");
        Ok(session_id)
    }

    /// Get a session (cloned out).
    pub fn get_session(&self, session_id: EntityId) -> CompassResult<CollaborationSession> {
        let state = self.read()?;
        state
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| CoordinationError::SessionNotFound { session_id }.into())
    }

    /// Add a registered agent to a session.
    pub fn join_session(&self, session_id: EntityId, agent_id: EntityId) -> CompassResult<()> {
        let mut state = self.write()?;
        if !state.agents.contains_key(&agent_id) {
            return Err(CoordinationError::AgentNotRegistered { agent_id }.into());
        }
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or(CoordinationError::SessionNotFound { session_id })?;
        session.add_agent(agent_id);
        Ok(())
    }

    /// Track a task under a session.
    pub fn track_task(&self, session_id: EntityId, task_id: EntityId) -> CompassResult<()> {
        self.graph.get(task_id)?;
        let mut state = self.write()?;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or(CoordinationError::SessionNotFound { session_id })?;
        session.add_task(task_id);
        Ok(())
    }

    /// Transition a session's status.
    pub fn set_session_status(
        &self,
        session_id: EntityId,
        status: SessionStatus,
    ) -> CompassResult<()> {
        let mut state = self.write()?;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or(CoordinationError::SessionNotFound { session_id })?;
        session.set_status(status);
        Ok(())
    }

    // ========================================================================
    // SUGGESTIONS
    // ========================================================================

    /// Heuristic collaboration patterns for a task. Triggers fire
    /// independently; the result may be empty.
    pub fn suggest_collaboration(
        &self,
        task_id: EntityId,
    ) -> CompassResult<Vec<CollaborationPattern>> {
        let node = self.graph.get(task_id)?;
        let mut patterns = Vec::new();
        if !node.child_ids.is_empty() {
            patterns.push(CollaborationPattern::Parallel);
        }
        if node.description.len() > PLAN_DESCRIPTION_THRESHOLD {
            patterns.push(CollaborationPattern::PlanAndExecute);
        }
        let has_source = node.artifacts.iter().any(|a| {
            a.path
                .rsplit_once('.')
                .map(|(_, ext)| SOURCE_EXTENSIONS.contains(&ext))
                .unwrap_or(false)
        });
        if has_source {
            patterns.push(CollaborationPattern::CodeAndReview);
        }
        Ok(patterns)
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Export agents, sessions, and the ownership map, sorted by id.
    pub fn export(&self) -> CompassResult<CoordinatorSnapshot> {
        let state = self.read()?;
        let mut agents: Vec<AgentInfo> = state.agents.values().cloned().collect();
        agents.sort_by_key(|a| a.agent_id);
        let mut sessions: Vec<CollaborationSession> = state.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| s.session_id);
        let mut ownership: Vec<OwnershipEntry> = state
            .ownership
            .iter()
            .map(|(task_id, agent_id)| OwnershipEntry {
                task_id: *task_id,
                agent_id: *agent_id,
            })
            .collect();
        ownership.sort_by_key(|e| e.task_id);
        Ok(CoordinatorSnapshot {
            exported_at: Utc::now(),
            agents,
            sessions,
            ownership,
        })
    }

    /// Export as a JSON string.
    pub fn export_json(&self) -> CompassResult<String> {
        let snapshot = self.export()?;
        serde_json::to_string_pretty(&snapshot).map_err(|e| {
            CoordinationError::SnapshotFailed {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use compass_context::{InMemoryDocStore, InMemorySemanticIndex};
    use compass_core::{CompassError, GraphError};

    struct Fixture {
        graph: Arc<IntentGraph>,
        coordinator: AgentCoordinator,
    }

    fn fixture() -> Fixture {
        let graph = Arc::new(IntentGraph::new());
        let context = Arc::new(ContextEngine::new(
            Arc::clone(&graph),
            Arc::new(InMemorySemanticIndex::new()),
            Arc::new(InMemoryDocStore::new()),
        ));
        let coordinator = AgentCoordinator::new(Arc::clone(&graph), context);
        Fixture { graph, coordinator }
    }

    fn coder(name: &str) -> AgentInfo {
        AgentInfo::new(name, AgentRole::Coder, vec!["rust".to_string()])
    }

    #[test]
    fn test_register_idempotent_keeps_assignment() {
        let f = fixture();
        let agent = coder("alice");
        let agent_id = f.coordinator.register_agent(agent.clone()).unwrap();
        let task = f.graph.create_task("T", None, "").unwrap();
        f.coordinator.assign_task(task, agent_id).unwrap();

        // re-register with updated capabilities
        let mut updated = agent;
        updated.capabilities.push("sql".to_string());
        f.coordinator.register_agent(updated).unwrap();

        let stored = f.coordinator.get_agent(agent_id).unwrap();
        assert!(stored.has_capability("sql"));
        assert_eq!(stored.current_task_id, Some(task));
        assert_eq!(f.coordinator.owner_of(task).unwrap(), Some(agent_id));
    }

    #[test]
    fn test_assign_task_happy_path_writes_back_to_graph() {
        let f = fixture();
        let agent_id = f.coordinator.register_agent(coder("alice")).unwrap();
        let task = f.graph.create_task("T", None, "").unwrap();

        f.coordinator.assign_task(task, agent_id).unwrap();

        assert_eq!(f.coordinator.owner_of(task).unwrap(), Some(agent_id));
        assert_eq!(
            f.coordinator.get_agent(agent_id).unwrap().current_task_id,
            Some(task)
        );
        assert_eq!(f.graph.get(task).unwrap().assigned_to, Some(agent_id));
    }

    #[test]
    fn test_assign_task_unknown_agent() {
        let f = fixture();
        let task = f.graph.create_task("T", None, "").unwrap();

        let result = f.coordinator.assign_task(task, uuid::Uuid::now_v7());
        assert!(matches!(
            result,
            Err(CompassError::Coordination(
                CoordinationError::AgentNotRegistered { .. }
            ))
        ));
        assert_eq!(f.coordinator.owner_of(task).unwrap(), None);
    }

    #[test]
    fn test_assign_task_busy_agent_no_mutation() {
        let f = fixture();
        let agent_id = f.coordinator.register_agent(coder("alice")).unwrap();
        let t1 = f.graph.create_task("T1", None, "").unwrap();
        let t2 = f.graph.create_task("T2", None, "").unwrap();
        f.coordinator.assign_task(t1, agent_id).unwrap();

        let result = f.coordinator.assign_task(t2, agent_id);
        assert!(matches!(
            result,
            Err(CompassError::Coordination(CoordinationError::AgentBusy { .. }))
        ));
        assert_eq!(f.coordinator.owner_of(t2).unwrap(), None);
        assert_eq!(f.graph.get(t2).unwrap().assigned_to, None);
    }

    #[test]
    fn test_assign_task_missing_node_no_mutation() {
        let f = fixture();
        let agent_id = f.coordinator.register_agent(coder("alice")).unwrap();

        let result = f.coordinator.assign_task(uuid::Uuid::now_v7(), agent_id);
        assert!(matches!(
            result,
            Err(CompassError::Graph(GraphError::NodeNotFound { .. }))
        ));
        assert!(f
            .coordinator
            .get_agent(agent_id)
            .unwrap()
            .current_task_id
            .is_none());
    }

    #[test]
    fn test_assign_owned_task_to_second_agent_rejected() {
        // agent1 owns T; assigning T to a free agent2 fails and mutates
        // nothing on either side
        let f = fixture();
        let agent1 = f.coordinator.register_agent(coder("alice")).unwrap();
        let agent2 = f.coordinator.register_agent(coder("bob")).unwrap();
        let task = f.graph.create_task("T", None, "").unwrap();
        f.coordinator.assign_task(task, agent1).unwrap();

        let result = f.coordinator.assign_task(task, agent2);
        assert!(matches!(
            result,
            Err(CompassError::Coordination(
                CoordinationError::TaskAlreadyOwned { .. }
            ))
        ));
        assert_eq!(f.coordinator.owner_of(task).unwrap(), Some(agent1));
        assert_eq!(
            f.coordinator.get_agent(agent1).unwrap().current_task_id,
            Some(task)
        );
        assert!(f
            .coordinator
            .get_agent(agent2)
            .unwrap()
            .current_task_id
            .is_none());
        assert_eq!(f.graph.get(task).unwrap().assigned_to, Some(agent1));

        // conflict policy agrees: the recorded owner wins unconditionally
        let winner = f.coordinator.resolve_conflict(task, agent2, agent1).unwrap();
        assert_eq!(winner, agent1);
    }

    #[test]
    fn test_accept_handoff_stale_after_reassignment_rejected() {
        // handoff alice -> bob for T, then T is released and reassigned
        // to carol; bob's acceptance must not displace carol
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let bob = f.coordinator.register_agent(coder("bob")).unwrap();
        let carol = f.coordinator.register_agent(coder("carol")).unwrap();
        let task = f.graph.create_task("T", None, "").unwrap();
        f.coordinator.assign_task(task, alice).unwrap();

        let handoff_id = f
            .coordinator
            .create_handoff(alice, bob, task, HandoffKind::Sequential, "")
            .unwrap();
        f.coordinator.release_task(task).unwrap();
        f.coordinator.assign_task(task, carol).unwrap();

        let result = f.coordinator.accept_handoff(handoff_id, bob);
        assert!(matches!(
            result,
            Err(CompassError::Coordination(
                CoordinationError::TaskAlreadyOwned { .. }
            ))
        ));

        // carol's assignment is intact, bob is untouched, the handoff
        // stays pending
        assert_eq!(f.coordinator.owner_of(task).unwrap(), Some(carol));
        assert_eq!(
            f.coordinator.get_agent(carol).unwrap().current_task_id,
            Some(task)
        );
        assert!(f
            .coordinator
            .get_agent(bob)
            .unwrap()
            .current_task_id
            .is_none());
        assert_eq!(
            f.coordinator.get_handoff(handoff_id).unwrap().status,
            HandoffStatus::Pending
        );
    }

    #[test]
    fn test_release_task() {
        let f = fixture();
        let agent_id = f.coordinator.register_agent(coder("alice")).unwrap();
        let task = f.graph.create_task("T", None, "").unwrap();
        f.coordinator.assign_task(task, agent_id).unwrap();

        f.coordinator.release_task(task).unwrap();

        assert_eq!(f.coordinator.owner_of(task).unwrap(), None);
        assert!(f
            .coordinator
            .get_agent(agent_id)
            .unwrap()
            .current_task_id
            .is_none());
        assert_eq!(f.graph.get(task).unwrap().assigned_to, None);

        // releasing an unowned task is not an error
        f.coordinator.release_task(task).unwrap();
    }

    #[test]
    fn test_find_available_agent_filters() {
        let f = fixture();
        let busy = f.coordinator.register_agent(coder("busy")).unwrap();
        let task = f.graph.create_task("T", None, "").unwrap();
        f.coordinator.assign_task(task, busy).unwrap();

        let reviewer = AgentInfo::new("rev", AgentRole::Reviewer, vec!["rust".to_string()]);
        let reviewer_id = f.coordinator.register_agent(reviewer).unwrap();

        let found = f
            .coordinator
            .find_available_agent(Some(AgentRole::Reviewer), &["rust".to_string()])
            .unwrap();
        assert_eq!(found.unwrap().agent_id, reviewer_id);

        // busy agent is never eligible
        let none = f
            .coordinator
            .find_available_agent(Some(AgentRole::Coder), &[])
            .unwrap();
        assert!(none.is_none());

        // missing capability filters out
        let none = f
            .coordinator
            .find_available_agent(None, &["wasm".to_string()])
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_handoff_accept_transfers_ownership() {
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let bob = f.coordinator.register_agent(coder("bob")).unwrap();
        let task = f.graph.create_task("T", None, "").unwrap();
        f.coordinator.assign_task(task, alice).unwrap();

        let handoff_id = f
            .coordinator
            .create_handoff(alice, bob, task, HandoffKind::Review, "please review")
            .unwrap();

        // creation does not transfer ownership
        assert_eq!(f.coordinator.owner_of(task).unwrap(), Some(alice));
        let handoff = f.coordinator.get_handoff(handoff_id).unwrap();
        assert_eq!(handoff.status, HandoffStatus::Pending);
        assert_eq!(handoff.context.message, "please review");

        f.coordinator.accept_handoff(handoff_id, bob).unwrap();

        assert_eq!(f.coordinator.owner_of(task).unwrap(), Some(bob));
        assert_eq!(f.graph.get(task).unwrap().assigned_to, Some(bob));
        assert!(f
            .coordinator
            .get_agent(alice)
            .unwrap()
            .current_task_id
            .is_none());
        assert_eq!(
            f.coordinator.get_agent(bob).unwrap().current_task_id,
            Some(task)
        );

        // existing owner wins conflicts unconditionally
        let carol = f.coordinator.register_agent(coder("carol")).unwrap();
        let winner = f.coordinator.resolve_conflict(task, alice, carol).unwrap();
        assert_eq!(winner, bob);
    }

    #[test]
    fn test_handoff_context_snapshot_capped() {
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let bob = f.coordinator.register_agent(coder("bob")).unwrap();
        let goal = f.graph.create_goal("G", None, "").unwrap();
        let task = f.graph.create_task("T", Some(goal), "").unwrap();
        for i in 0..8 {
            let other = f.graph.create_task(&format!("o{}", i), None, "").unwrap();
            f.graph.add_tag(other, "x").unwrap();
        }
        f.graph.add_tag(task, "x").unwrap();

        let handoff_id = f
            .coordinator
            .create_handoff(alice, bob, task, HandoffKind::Sequential, "")
            .unwrap();
        let handoff = f.coordinator.get_handoff(handoff_id).unwrap();
        assert!(handoff.context.items.len() <= HANDOFF_CONTEXT_ITEMS);
        assert!(!handoff.context.items.is_empty());
    }

    #[test]
    fn test_handoff_wrong_recipient() {
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let bob = f.coordinator.register_agent(coder("bob")).unwrap();
        let carol = f.coordinator.register_agent(coder("carol")).unwrap();
        let task = f.graph.create_task("T", None, "").unwrap();

        let handoff_id = f
            .coordinator
            .create_handoff(alice, bob, task, HandoffKind::Delegate, "")
            .unwrap();

        let result = f.coordinator.accept_handoff(handoff_id, carol);
        assert!(matches!(
            result,
            Err(CompassError::Coordination(
                CoordinationError::WrongRecipient { .. }
            ))
        ));
        assert_eq!(f.coordinator.owner_of(task).unwrap(), None);
    }

    #[test]
    fn test_handoff_invalid_transitions() {
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let bob = f.coordinator.register_agent(coder("bob")).unwrap();
        let task = f.graph.create_task("T", None, "").unwrap();

        let handoff_id = f
            .coordinator
            .create_handoff(alice, bob, task, HandoffKind::Assist, "")
            .unwrap();

        // complete before accept fails
        let result = f.coordinator.complete_handoff(handoff_id, None);
        assert!(matches!(
            result,
            Err(CompassError::Coordination(
                CoordinationError::InvalidTransition { .. }
            ))
        ));

        f.coordinator.accept_handoff(handoff_id, bob).unwrap();

        // double accept fails
        let result = f.coordinator.accept_handoff(handoff_id, bob);
        assert!(matches!(
            result,
            Err(CompassError::Coordination(
                CoordinationError::InvalidTransition { .. }
            ))
        ));

        // unknown handoff id
        let result = f.coordinator.accept_handoff(uuid::Uuid::now_v7(), bob);
        assert!(matches!(
            result,
            Err(CompassError::Coordination(
                CoordinationError::HandoffNotFound { .. }
            ))
        ));
    }

    #[test]
    fn test_complete_handoff_clears_matching_assignment() {
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let bob = f.coordinator.register_agent(coder("bob")).unwrap();
        let task = f.graph.create_task("T", None, "").unwrap();

        let handoff_id = f
            .coordinator
            .create_handoff(alice, bob, task, HandoffKind::Sequential, "")
            .unwrap();
        f.coordinator.accept_handoff(handoff_id, bob).unwrap();
        f.coordinator
            .complete_handoff(handoff_id, Some("done".to_string()))
            .unwrap();

        let handoff = f.coordinator.get_handoff(handoff_id).unwrap();
        assert_eq!(handoff.status, HandoffStatus::Completed);
        assert_eq!(handoff.result.as_deref(), Some("done"));
        assert_eq!(f.coordinator.owner_of(task).unwrap(), None);
        assert!(f
            .coordinator
            .get_agent(bob)
            .unwrap()
            .current_task_id
            .is_none());
        assert_eq!(f.graph.get(task).unwrap().assigned_to, None);
    }

    #[test]
    fn test_complete_stale_handoff_keeps_newer_assignment() {
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let bob = f.coordinator.register_agent(coder("bob")).unwrap();
        let task = f.graph.create_task("T", None, "").unwrap();

        let handoff_id = f
            .coordinator
            .create_handoff(alice, bob, task, HandoffKind::Sequential, "")
            .unwrap();
        f.coordinator.accept_handoff(handoff_id, bob).unwrap();

        // ownership moved on after the handoff
        f.coordinator.release_task(task).unwrap();
        f.coordinator.assign_task(task, alice).unwrap();

        f.coordinator.complete_handoff(handoff_id, None).unwrap();

        // the newer assignment survives
        assert_eq!(f.coordinator.owner_of(task).unwrap(), Some(alice));
        assert_eq!(
            f.coordinator.get_agent(alice).unwrap().current_task_id,
            Some(task)
        );
    }

    #[test]
    fn test_reject_handoff() {
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let bob = f.coordinator.register_agent(coder("bob")).unwrap();
        let task = f.graph.create_task("T", None, "").unwrap();
        f.coordinator.assign_task(task, alice).unwrap();

        let handoff_id = f
            .coordinator
            .create_handoff(alice, bob, task, HandoffKind::Delegate, "")
            .unwrap();
        f.coordinator
            .reject_handoff(handoff_id, bob, "not my area")
            .unwrap();

        let handoff = f.coordinator.get_handoff(handoff_id).unwrap();
        assert_eq!(handoff.status, HandoffStatus::Rejected);
        assert_eq!(handoff.result.as_deref(), Some("not my area"));
        // ownership never moved
        assert_eq!(f.coordinator.owner_of(task).unwrap(), Some(alice));
    }

    #[test]
    fn test_pending_handoffs_for() {
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let bob = f.coordinator.register_agent(coder("bob")).unwrap();
        let t1 = f.graph.create_task("T1", None, "").unwrap();
        let t2 = f.graph.create_task("T2", None, "").unwrap();

        let h1 = f
            .coordinator
            .create_handoff(alice, bob, t1, HandoffKind::Review, "")
            .unwrap();
        let h2 = f
            .coordinator
            .create_handoff(alice, bob, t2, HandoffKind::Review, "")
            .unwrap();
        f.coordinator.reject_handoff(h2, bob, "busy").unwrap();

        let pending = f.coordinator.pending_handoffs_for(bob).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].handoff_id, h1);
        assert!(f.coordinator.pending_handoffs_for(alice).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_conflict_load_balance_and_tie() {
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let bob = f.coordinator.register_agent(coder("bob")).unwrap();
        let owned = f.graph.create_task("owned", None, "").unwrap();
        let contested = f.graph.create_task("contested", None, "").unwrap();

        // tie: both own zero, agent1 wins
        assert_eq!(
            f.coordinator.resolve_conflict(contested, alice, bob).unwrap(),
            alice
        );

        // alice now owns one task, bob owns none: bob wins
        f.coordinator.assign_task(owned, alice).unwrap();
        assert_eq!(
            f.coordinator.resolve_conflict(contested, alice, bob).unwrap(),
            bob
        );
    }

    #[test]
    fn test_sessions() {
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let goal = f.graph.create_goal("G", None, "").unwrap();
        let task = f.graph.create_task("T", Some(goal), "").unwrap();

        let session_id = f.coordinator.create_session(goal, Some(alice)).unwrap();
        f.coordinator.join_session(session_id, alice).unwrap();
        f.coordinator.track_task(session_id, task).unwrap();
        f.coordinator
            .set_session_status(session_id, SessionStatus::Active)
            .unwrap();

        let session = f.coordinator.get_session(session_id).unwrap();
        assert_eq!(session.goal_id, goal);
        assert_eq!(session.coordinator_id, Some(alice));
        assert_eq!(session.agent_ids, vec![alice]);
        assert_eq!(session.task_ids, vec![task]);
        assert_eq!(session.status, SessionStatus::Active);

        // unregistered agents cannot join
        let result = f.coordinator.join_session(session_id, uuid::Uuid::now_v7());
        assert!(matches!(
            result,
            Err(CompassError::Coordination(
                CoordinationError::AgentNotRegistered { .. }
            ))
        ));

        // sessions require an existing goal node
        let result = f.coordinator.create_session(uuid::Uuid::now_v7(), None);
        assert!(matches!(
            result,
            Err(CompassError::Graph(GraphError::NodeNotFound { .. }))
        ));
    }

    #[test]
    fn test_suggest_collaboration_triggers() {
        let f = fixture();
        let task = f.graph.create_task("T", None, "").unwrap();

        // nothing fires on a bare task
        assert!(f.coordinator.suggest_collaboration(task).unwrap().is_empty());

        // subtask triggers Parallel
        f.graph.create_task("sub", Some(task), "").unwrap();
        let patterns = f.coordinator.suggest_collaboration(task).unwrap();
        assert_eq!(patterns, vec![CollaborationPattern::Parallel]);

        // source artifact triggers CodeAndReview alongside
        f.graph.link_artifact(task, "src/main.rs", None).unwrap();
        let patterns = f.coordinator.suggest_collaboration(task).unwrap();
        assert!(patterns.contains(&CollaborationPattern::Parallel));
        assert!(patterns.contains(&CollaborationPattern::CodeAndReview));
        assert!(!patterns.contains(&CollaborationPattern::PlanAndExecute));
    }

    #[test]
    fn test_suggest_collaboration_long_description() {
        let f = fixture();
        let node = compass_core::IntentNode::new(compass_core::NodeKind::Task, "big")
            .with_description(&"x".repeat(PLAN_DESCRIPTION_THRESHOLD + 1));
        let task = f.graph.insert_linked(node, None).unwrap();

        let patterns = f.coordinator.suggest_collaboration(task).unwrap();
        assert_eq!(patterns, vec![CollaborationPattern::PlanAndExecute]);
    }

    #[test]
    fn test_suggest_collaboration_non_source_artifact() {
        let f = fixture();
        let task = f.graph.create_task("T", None, "").unwrap();
        f.graph.link_artifact(task, "notes/design.md", None).unwrap();

        assert!(f.coordinator.suggest_collaboration(task).unwrap().is_empty());
    }

    #[test]
    fn test_export_covers_agents_sessions_ownership() {
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let goal = f.graph.create_goal("G", None, "").unwrap();
        let task = f.graph.create_task("T", Some(goal), "").unwrap();
        f.coordinator.assign_task(task, alice).unwrap();
        let session_id = f.coordinator.create_session(goal, None).unwrap();

        let json = f.coordinator.export_json().unwrap();
        let snapshot: CoordinatorSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot.agents.len(), 1);
        assert_eq!(snapshot.agents[0].agent_id, alice);
        assert_eq!(snapshot.sessions.len(), 1);
        assert_eq!(snapshot.sessions[0].session_id, session_id);
        assert_eq!(
            snapshot.ownership,
            vec![OwnershipEntry {
                task_id: task,
                agent_id: alice,
            }]
        );
    }

    #[test]
    fn test_heartbeat_and_active_flag() {
        let f = fixture();
        let alice = f.coordinator.register_agent(coder("alice")).unwrap();
        let before = f.coordinator.get_agent(alice).unwrap().last_seen;

        f.coordinator.heartbeat(alice).unwrap();
        let after = f.coordinator.get_agent(alice).unwrap().last_seen;
        assert!(after >= before);

        f.coordinator.set_agent_active(alice, false).unwrap();
        assert!(!f.coordinator.get_agent(alice).unwrap().active);
        assert!(f
            .coordinator
            .find_available_agent(None, &[])
            .unwrap()
            .is_none());
    }
}
