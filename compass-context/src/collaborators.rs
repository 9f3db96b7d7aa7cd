//! Read-only collaborator seams: the Semantic Index and the Doc Store.
//!
//! The context engine consumes these through trait objects so callers can
//! inject whatever backs them. The in-memory implementations here are the
//! reference backends, used directly by tests and small deployments.

use compass_core::{SyncStatus, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Metadata the semantic index holds for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub path: String,
    /// One-paragraph summary of what the file does
    pub summary: String,
    pub language: Option<String>,
    /// Top-level symbols (functions, types) declared in the file
    pub symbols: Vec<String>,
    pub modified_at: Timestamp,
}

impl FileMetadata {
    pub fn new(path: &str, summary: &str) -> Self {
        Self {
            path: path.to_string(),
            summary: summary.to_string(),
            language: None,
            symbols: Vec::new(),
            modified_at: Utc::now(),
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }
}

/// File -> metadata lookup and text search over indexed files.
pub trait SemanticIndex: Send + Sync {
    /// Metadata for one file, if indexed.
    fn lookup(&self, file_path: &str) -> Option<FileMetadata>;

    /// Text search over indexed files, best matches first.
    fn search(&self, text: &str) -> Vec<FileMetadata>;

    /// Files the index declares related to the given one.
    fn related_files(&self, file_path: &str) -> Vec<String>;

    /// The most recently modified indexed files, newest first.
    fn recent_files(&self, limit: usize) -> Vec<FileMetadata>;
}

/// File -> associated-documentation lookup with per-doc sync status.
pub trait DocStore: Send + Sync {
    /// Documentation paths associated with a file.
    fn docs_for(&self, file_path: &str) -> Vec<String>;

    /// Sync status of one document.
    fn sync_status(&self, doc_path: &str) -> SyncStatus;

    /// Documents currently flagged out of sync, up to the limit.
    fn out_of_sync(&self, limit: usize) -> Vec<String>;
}

// ============================================================================
// IN-MEMORY SEMANTIC INDEX
// ============================================================================

/// In-memory semantic index keyed by file path.
#[derive(Debug, Default)]
pub struct InMemorySemanticIndex {
    files: RwLock<HashMap<String, FileMetadata>>,
    related: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemorySemanticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index or re-index a file.
    pub fn index_file(&self, metadata: FileMetadata) {
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files.insert(metadata.path.clone(), metadata);
    }

    /// Declare two files related (recorded symmetrically).
    pub fn declare_related(&self, a: &str, b: &str) {
        let mut related = self.related.write().unwrap_or_else(|e| e.into_inner());
        let forward = related.entry(a.to_string()).or_default();
        if !forward.iter().any(|p| p == b) {
            forward.push(b.to_string());
        }
        let backward = related.entry(b.to_string()).or_default();
        if !backward.iter().any(|p| p == a) {
            backward.push(a.to_string());
        }
    }

    fn match_score(metadata: &FileMetadata, needle: &str) -> usize {
        let mut score = 0;
        if metadata.path.to_lowercase().contains(needle) {
            score += 2;
        }
        if metadata.summary.to_lowercase().contains(needle) {
            score += 1;
        }
        if metadata
            .symbols
            .iter()
            .any(|s| s.to_lowercase().contains(needle))
        {
            score += 1;
        }
        score
    }
}

impl SemanticIndex for InMemorySemanticIndex {
    fn lookup(&self, file_path: &str) -> Option<FileMetadata> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files.get(file_path).cloned()
    }

    fn search(&self, text: &str) -> Vec<FileMetadata> {
        let needle = text.to_lowercase();
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        let mut scored: Vec<(usize, FileMetadata)> = files
            .values()
            .filter_map(|m| {
                let score = Self::match_score(m, &needle);
                (score > 0).then(|| (score, m.clone()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.path.cmp(&b.1.path)));
        scored.into_iter().map(|(_, m)| m).collect()
    }

    fn related_files(&self, file_path: &str) -> Vec<String> {
        let related = self.related.read().unwrap_or_else(|e| e.into_inner());
        related.get(file_path).cloned().unwrap_or_default()
    }

    fn recent_files(&self, limit: usize) -> Vec<FileMetadata> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<FileMetadata> = files.values().cloned().collect();
        all.sort_by(|a, b| b.modified_at.cmp(&a.modified_at).then_with(|| a.path.cmp(&b.path)));
        all.truncate(limit);
        all
    }
}

// ============================================================================
// IN-MEMORY DOC STORE
// ============================================================================

/// In-memory documentation store.
#[derive(Debug, Default)]
pub struct InMemoryDocStore {
    docs: RwLock<HashMap<String, Vec<String>>>,
    statuses: RwLock<HashMap<String, SyncStatus>>,
}

impl InMemoryDocStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a document with a file.
    pub fn add_doc(&self, file_path: &str, doc_path: &str) {
        let mut docs = self.docs.write().unwrap_or_else(|e| e.into_inner());
        let entry = docs.entry(file_path.to_string()).or_default();
        if !entry.iter().any(|d| d == doc_path) {
            entry.push(doc_path.to_string());
        }
    }

    /// Set a document's sync status.
    pub fn set_sync_status(&self, doc_path: &str, status: SyncStatus) {
        let mut statuses = self.statuses.write().unwrap_or_else(|e| e.into_inner());
        statuses.insert(doc_path.to_string(), status);
    }
}

impl DocStore for InMemoryDocStore {
    fn docs_for(&self, file_path: &str) -> Vec<String> {
        let docs = self.docs.read().unwrap_or_else(|e| e.into_inner());
        docs.get(file_path).cloned().unwrap_or_default()
    }

    fn sync_status(&self, doc_path: &str) -> SyncStatus {
        let statuses = self.statuses.read().unwrap_or_else(|e| e.into_inner());
        statuses.get(doc_path).copied().unwrap_or_default()
    }

    fn out_of_sync(&self, limit: usize) -> Vec<String> {
        let statuses = self.statuses.read().unwrap_or_else(|e| e.into_inner());
        let mut flagged: Vec<String> = statuses
            .iter()
            .filter(|(_, s)| **s == SyncStatus::OutOfSync)
            .map(|(p, _)| p.clone())
            .collect();
        flagged.sort();
        flagged.truncate(limit);
        flagged
    }
}

// ============================================================================
// TESTS
// ============================================================================
