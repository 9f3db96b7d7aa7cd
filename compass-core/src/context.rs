//! Context items and bundles
//!
//! Bundles are value objects: the engine returns a fresh or cached copy and
//! the caller owns it outright. Relevance scores are [0,1] ranking weights,
//! not probabilities.

use crate::{ContextItemKind, ContextSource, EntityId, Timestamp};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scored piece of information surfaced for a consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub item_id: EntityId,
    pub kind: ContextItemKind,
    pub title: String,
    pub content: String,
    /// Relevance in [0,1]; clamped on construction
    pub relevance: f64,
    /// Which subsystem produced this item
    pub source: ContextSource,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

impl ContextItem {
    /// Create a new item. Relevance is clamped into [0,1].
    pub fn new(
        kind: ContextItemKind,
        title: &str,
        content: &str,
        relevance: f64,
        source: ContextSource,
    ) -> Self {
        Self {
            item_id: Uuid::now_v7(),
            kind,
            title: title.to_string(),
            content: content.to_string(),
            relevance: relevance.clamp(0.0, 1.0),
            source,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Set metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A ranked snapshot of information relevant to a task, file, or query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBundle {
    /// Subject key: a node id string, file path, or query text
    pub subject: String,
    pub subject_title: String,
    /// Item order carries no meaning; use `top_n` for ranked views
    pub items: Vec<ContextItem>,
    pub assembled_at: Timestamp,
}

impl ContextBundle {
    pub fn new(subject: &str, subject_title: &str) -> Self {
        Self {
            subject: subject.to_string(),
            subject_title: subject_title.to_string(),
            items: Vec::new(),
            assembled_at: Utc::now(),
        }
    }

    pub fn push(&mut self, item: ContextItem) {
        self.items.push(item);
    }

    /// The top N items by relevance, descending. Ties keep insertion order.
    pub fn top_n(&self, n: usize) -> Vec<ContextItem> {
        let mut sorted = self.items.clone();
        sorted.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        sorted.truncate(n);
        sorted
    }

    /// All items of one kind, in insertion order.
    pub fn of_kind(&self, kind: ContextItemKind) -> Vec<&ContextItem> {
        self.items.iter().filter(|i| i.kind == kind).collect()
    }

    /// Whether this bundle was assembled within the given freshness window.
    pub fn is_fresh(&self, window: Duration) -> bool {
        Utc::now() - self.assembled_at < window
    }
}

// ============================================================================
// TESTS
// ============================================================================
