//! COMPASS Context - Context Retrieval Engine
//!
//! Given a subject (task id, file path, or free-text query), assembles a
//! ranked `ContextBundle` from the intent graph and the two read-only
//! collaborators (semantic index, doc store).
//!
//! The relevance weights below are design constants, not tunable inputs;
//! ranking parity depends on them being exact.

pub mod collaborators;

pub use collaborators::{
    DocStore, FileMetadata, InMemoryDocStore, InMemorySemanticIndex, SemanticIndex,
};

use compass_core::{
    CompassResult, ContextBundle, ContextError, ContextItem, ContextItemKind, ContextSource,
    EntityId, IntentNode, NodeKind, NodeStatus, Timestamp,
};
use compass_graph::IntentGraph;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

// ============================================================================
// RELEVANCE WEIGHTS (design constants)
// ============================================================================

/// Parent nodes of a task subject.
pub const PARENT_GOAL_RELEVANCE: f64 = 0.90;
/// Related nodes of a task subject whose kind is Decision.
pub const RELATED_DECISION_RELEVANCE: f64 = 0.85;
/// Linked file paths resolved through the semantic index. Direct links
/// are maximally relevant.
pub const LINKED_FILE_RELEVANCE: f64 = 0.95;
/// Documentation associated with a linked file.
pub const LINKED_DOC_RELEVANCE: f64 = 0.80;
/// Other nodes sharing a tag with the subject.
pub const SHARED_TAG_RELEVANCE: f64 = 0.60;
/// At most this many tag-sharing nodes per tag.
pub const MAX_TAG_NEIGHBORS: usize = 3;

/// Query-subject scoring: additive substring weights and inclusion floor.
pub const QUERY_TITLE_WEIGHT: f64 = 0.5;
pub const QUERY_DESCRIPTION_WEIGHT: f64 = 0.3;
pub const QUERY_RATIONALE_WEIGHT: f64 = 0.2;
pub const QUERY_SCORE_FLOOR: f64 = 0.3;

/// File-subject scoring.
pub const FILE_DIRECT_RELEVANCE: f64 = 1.0;
pub const FILE_REFERENCING_TASK_RELEVANCE: f64 = 0.9;
pub const FILE_DOC_RELEVANCE: f64 = 0.95;
pub const FILE_RELATED_RELEVANCE: f64 = 0.7;

/// Cached bundles younger than this are returned unchanged.
pub const CACHE_WINDOW_SECS: i64 = 300;

/// Workspace snapshot limits.
pub const SNAPSHOT_RECENT_FILES: usize = 5;
pub const SNAPSHOT_OUT_OF_SYNC_DOCS: usize = 3;

// ============================================================================
// ADVISORY TYPES
// ============================================================================

/// What a next-action suggestion is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestionKind {
    /// The task is blocked by other nodes
    ResolveBlockers,
    /// The task has no linked artifacts yet
    LinkArtifacts,
    /// The task has pending children
    FinishSubtasks,
    /// Docs for linked files are out of sync
    RefreshDocs,
}

/// A rule-based advisory flag. Multiple flags may fire for one task;
/// none is "the" recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSuggestion {
    pub kind: SuggestionKind,
    pub detail: String,
    /// Higher = more urgent
    pub priority: i32,
}

/// Inbox-style snapshot of what needs attention now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub active_goals: Vec<IntentNode>,
    pub blocked_tasks: Vec<IntentNode>,
    pub recent_files: Vec<FileMetadata>,
    pub out_of_sync_docs: Vec<String>,
    pub generated_at: Timestamp,
}

// ============================================================================
// CONTEXT ENGINE
// ============================================================================

/// Context retrieval engine. Construct once and share via `Arc`; all
/// methods take `&self`.
pub struct ContextEngine {
    graph: Arc<IntentGraph>,
    index: Arc<dyn SemanticIndex>,
    docs: Arc<dyn DocStore>,
    cache: RwLock<HashMap<String, ContextBundle>>,
}

impl ContextEngine {
    pub fn new(
        graph: Arc<IntentGraph>,
        index: Arc<dyn SemanticIndex>,
        docs: Arc<dyn DocStore>,
    ) -> Self {
        Self {
            graph,
            index,
            docs,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn cache_window() -> Duration {
        Duration::seconds(CACHE_WINDOW_SECS)
    }

    fn cached(&self, key: &str) -> CompassResult<Option<ContextBundle>> {
        let cache = self.cache.read().map_err(|_| ContextError::LockPoisoned)?;
        Ok(cache
            .get(key)
            .filter(|b| b.is_fresh(Self::cache_window()))
            .cloned())
    }

    fn store(&self, key: String, bundle: &ContextBundle) -> CompassResult<()> {
        let mut cache = self.cache.write().map_err(|_| ContextError::LockPoisoned)?;
        cache.insert(key, bundle.clone());
        Ok(())
    }

    /// Drop any cached bundle for the given subject key
    /// (`task:<id>`, `file:<path>`, or `query:<text>`).
    pub fn invalidate(&self, key: &str) -> CompassResult<()> {
        let mut cache = self.cache.write().map_err(|_| ContextError::LockPoisoned)?;
        cache.remove(key);
        Ok(())
    }

    /// Drop every cached bundle.
    pub fn clear_cache(&self) -> CompassResult<()> {
        let mut cache = self.cache.write().map_err(|_| ContextError::LockPoisoned)?;
        cache.clear();
        Ok(())
    }

    // ========================================================================
    // TASK SUBJECT
    // ========================================================================

    /// Ranked context for a task. Served from cache when a bundle younger
    /// than the freshness window exists; callers needing guaranteed-fresh
    /// context use `context_for_task_fresh`.
    pub fn context_for_task(&self, task_id: EntityId) -> CompassResult<ContextBundle> {
        let key = format!("task:{}", task_id);
        if let Some(bundle) = self.cached(&key)? {
            tracing::debug!(task_id = %task_id, "context cache hit");
            return Ok(bundle);
        }
        self.context_for_task_fresh(task_id)
    }

    /// Recompute the task bundle, bypassing and refreshing the cache.
    pub fn context_for_task_fresh(&self, task_id: EntityId) -> CompassResult<ContextBundle> {
        let bundle = self.assemble_task_bundle(task_id)?;
        self.store(format!("task:{}", task_id), &bundle)?;
        tracing::debug!(task_id = %task_id, items = bundle.items.len(), "assembled task context");
        Ok(bundle)
    }

    fn assemble_task_bundle(&self, task_id: EntityId) -> CompassResult<ContextBundle> {
        let node = self.graph.get(task_id)?;
        let mut bundle = ContextBundle::new(&format!("task:{}", task_id), &node.title);

        // 1. Parent nodes
        for parent_id in &node.parent_ids {
            if let Ok(parent) = self.graph.get(*parent_id) {
                bundle.push(
                    ContextItem::new(
                        ContextItemKind::Goal,
                        &parent.title,
                        &describe(&parent),
                        PARENT_GOAL_RELEVANCE,
                        ContextSource::IntentGraph,
                    )
                    .with_metadata(serde_json::json!({ "node_id": parent.node_id })),
                );
            }
        }

        // 2. Related decisions
        for related_id in &node.related_ids {
            if let Ok(related) = self.graph.get(*related_id) {
                if related.kind == NodeKind::Decision {
                    bundle.push(
                        ContextItem::new(
                            ContextItemKind::Decision,
                            &related.title,
                            &describe(&related),
                            RELATED_DECISION_RELEVANCE,
                            ContextSource::IntentGraph,
                        )
                        .with_metadata(serde_json::json!({ "node_id": related.node_id })),
                    );
                }
            }
        }

        // 3. Linked files via the semantic index
        for artifact in &node.artifacts {
            if let Some(metadata) = self.index.lookup(&artifact.path) {
                bundle.push(
                    ContextItem::new(
                        ContextItemKind::Artifact,
                        &metadata.path,
                        &metadata.summary,
                        LINKED_FILE_RELEVANCE,
                        ContextSource::SemanticIndex,
                    )
                    .with_metadata(serde_json::json!({ "language": metadata.language })),
                );
            }
        }

        // 4. Documentation for linked files
        for artifact in &node.artifacts {
            for doc_path in self.docs.docs_for(&artifact.path) {
                let status = self.docs.sync_status(&doc_path);
                bundle.push(
                    ContextItem::new(
                        ContextItemKind::Documentation,
                        &doc_path,
                        &format!("Documentation for {}", artifact.path),
                        LINKED_DOC_RELEVANCE,
                        ContextSource::DocStore,
                    )
                    .with_metadata(serde_json::json!({ "sync_status": status })),
                );
            }
        }

        // 5. Tag neighbors, up to MAX_TAG_NEIGHBORS per tag, subject excluded
        let mut seen: HashSet<EntityId> = HashSet::new();
        seen.insert(task_id);
        for tag in &node.tags {
            let mut taken = 0;
            for neighbor in self.graph.find_by_tag(tag)? {
                if taken >= MAX_TAG_NEIGHBORS {
                    break;
                }
                if !seen.insert(neighbor.node_id) {
                    continue;
                }
                taken += 1;
                bundle.push(
                    ContextItem::new(
                        ContextItemKind::SimilarTask,
                        &neighbor.title,
                        &describe(&neighbor),
                        SHARED_TAG_RELEVANCE,
                        ContextSource::IntentGraph,
                    )
                    .with_metadata(
                        serde_json::json!({ "node_id": neighbor.node_id, "shared_tag": tag }),
                    ),
                );
            }
        }

        Ok(bundle)
    }

    // ========================================================================
    // QUERY SUBJECT
    // ========================================================================

    /// Ranked context for a free-text query: additive substring scoring
    /// over title, description, and rationale; nodes scoring at or below
    /// the floor are excluded.
    pub fn context_for_query(&self, query: &str) -> CompassResult<ContextBundle> {
        let key = format!("query:{}", query);
        if let Some(bundle) = self.cached(&key)? {
            return Ok(bundle);
        }

        let needle = query.to_lowercase();
        let mut bundle = ContextBundle::new(&key, query);
        for node in self.graph.all()? {
            let mut score = 0.0;
            if node.title.to_lowercase().contains(&needle) {
                score += QUERY_TITLE_WEIGHT;
            }
            if node.description.to_lowercase().contains(&needle) {
                score += QUERY_DESCRIPTION_WEIGHT;
            }
            if node.rationale.to_lowercase().contains(&needle) {
                score += QUERY_RATIONALE_WEIGHT;
            }
            if score > QUERY_SCORE_FLOOR {
                bundle.push(
                    ContextItem::new(
                        kind_tag(node.kind),
                        &node.title,
                        &describe(&node),
                        score,
                        ContextSource::IntentGraph,
                    )
                    .with_metadata(serde_json::json!({ "node_id": node.node_id })),
                );
            }
        }

        self.store(key, &bundle)?;
        Ok(bundle)
    }

    // ========================================================================
    // FILE SUBJECT
    // ========================================================================

    /// Ranked context for a file path: direct metadata, referencing
    /// tasks, associated docs, and index-declared related files.
    pub fn context_for_file(&self, file_path: &str) -> CompassResult<ContextBundle> {
        let key = format!("file:{}", file_path);
        if let Some(bundle) = self.cached(&key)? {
            return Ok(bundle);
        }

        let mut bundle = ContextBundle::new(&key, file_path);

        if let Some(metadata) = self.index.lookup(file_path) {
            bundle.push(
                ContextItem::new(
                    ContextItemKind::Artifact,
                    &metadata.path,
                    &metadata.summary,
                    FILE_DIRECT_RELEVANCE,
                    ContextSource::SemanticIndex,
                )
                .with_metadata(serde_json::json!({ "language": metadata.language })),
            );
        }

        for task in self.graph.find_by_artifact(file_path)? {
            bundle.push(
                ContextItem::new(
                    ContextItemKind::Task,
                    &task.title,
                    &describe(&task),
                    FILE_REFERENCING_TASK_RELEVANCE,
                    ContextSource::IntentGraph,
                )
                .with_metadata(serde_json::json!({ "node_id": task.node_id })),
            );
        }

        for doc_path in self.docs.docs_for(file_path) {
            let status = self.docs.sync_status(&doc_path);
            bundle.push(
                ContextItem::new(
                    ContextItemKind::Documentation,
                    &doc_path,
                    &format!("Documentation for {}", file_path),
                    FILE_DOC_RELEVANCE,
                    ContextSource::DocStore,
                )
                .with_metadata(serde_json::json!({ "sync_status": status })),
            );
        }

        for related in self.index.related_files(file_path) {
            bundle.push(ContextItem::new(
                ContextItemKind::RelatedFile,
                &related,
                "",
                FILE_RELATED_RELEVANCE,
                ContextSource::SemanticIndex,
            ));
        }

        self.store(key, &bundle)?;
        Ok(bundle)
    }

    // ========================================================================
    // ADVISORY LAYER
    // ========================================================================

    /// Rule-based advisory flags for a task. Triggers are independent;
    /// zero, one, or several may fire. Result is sorted by priority
    /// descending for convenience only.
    pub fn suggest_next_actions(&self, task_id: EntityId) -> CompassResult<Vec<ActionSuggestion>> {
        let node = self.graph.get(task_id)?;
        let mut suggestions = Vec::new();

        if node.is_blocked() {
            suggestions.push(ActionSuggestion {
                kind: SuggestionKind::ResolveBlockers,
                detail: format!("Task is blocked by {} node(s)", node.blocked_by_ids.len()),
                priority: 100,
            });
        }

        let pending_children: Vec<EntityId> = node
            .child_ids
            .iter()
            .filter(|id| {
                self.graph
                    .get(**id)
                    .map(|c| c.status == NodeStatus::Pending)
                    .unwrap_or(false)
            })
            .copied()
            .collect();
        if !pending_children.is_empty() {
            suggestions.push(ActionSuggestion {
                kind: SuggestionKind::FinishSubtasks,
                detail: format!("{} child task(s) still pending", pending_children.len()),
                priority: 60,
            });
        }

        if node.artifacts.is_empty() {
            suggestions.push(ActionSuggestion {
                kind: SuggestionKind::LinkArtifacts,
                detail: "No artifacts linked yet".to_string(),
                priority: 50,
            });
        }

        let stale_docs: Vec<String> = node
            .artifacts
            .iter()
            .flat_map(|a| self.docs.docs_for(&a.path))
            .filter(|doc| self.docs.sync_status(doc) == compass_core::SyncStatus::OutOfSync)
            .collect();
        if !stale_docs.is_empty() {
            suggestions.push(ActionSuggestion {
                kind: SuggestionKind::RefreshDocs,
                detail: format!("{} doc(s) out of sync: {}", stale_docs.len(), stale_docs.join(", ")),
                priority: 40,
            });
        }

        suggestions.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(suggestions)
    }

    /// Single snapshot of what needs attention now: active goals, blocked
    /// tasks, recently modified files, out-of-sync docs.
    pub fn current_context(&self) -> CompassResult<WorkspaceSnapshot> {
        Ok(WorkspaceSnapshot {
            active_goals: self.graph.active_goals()?,
            blocked_tasks: self.graph.blocked_tasks()?,
            recent_files: self.index.recent_files(SNAPSHOT_RECENT_FILES),
            out_of_sync_docs: self.docs.out_of_sync(SNAPSHOT_OUT_OF_SYNC_DOCS),
            generated_at: Utc::now(),
        })
    }
}

/// Prefer the description; fall back to the rationale.
fn describe(node: &IntentNode) -> String {
    if !node.description.is_empty() {
        node.description.clone()
    } else {
        node.rationale.clone()
    }
}

fn kind_tag(kind: NodeKind) -> ContextItemKind {
    match kind {
        NodeKind::Goal => ContextItemKind::Goal,
        NodeKind::Task => ContextItemKind::Task,
        NodeKind::Decision => ContextItemKind::Decision,
        _ => ContextItemKind::Node,
    }
}

// ============================================================================
// TESTS
// ============================================================================
