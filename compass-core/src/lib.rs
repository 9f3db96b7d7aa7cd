//! COMPASS Core - Entity Types
//!
//! Pure data structures with no behavior beyond local lifecycle methods.
//! All other crates depend on this. This crate contains only data types,
//! enums, and the error taxonomy - no graph, retrieval, or coordination
//! logic.

pub mod agent;
pub mod context;
pub mod enums;
pub mod error;
pub mod identity;
pub mod node;
pub mod session;

pub use agent::{AgentInfo, Handoff, HandoffContext};
pub use context::{ContextBundle, ContextItem};
pub use enums::{
    AgentRole, ContextItemKind, ContextSource, HandoffKind, HandoffStatus, NodeKind, NodeStatus,
    Relationship, SessionStatus, SyncStatus,
};
pub use error::{CompassError, CompassResult, ContextError, CoordinationError, GraphError};
pub use identity::{EntityId, Timestamp};
pub use node::{ArtifactRef, IntentNode};
pub use session::CollaborationSession;
