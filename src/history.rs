// ============================================================================
// File: src/history.rs
// Session-scoped search history
// ============================================================================

use chrono::{DateTime, Local};
use serde::Deserialize;

/// One completed search, as shown in the history listing
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRecord {
    pub timestamp: DateTime<Local>,
    pub query: String,
    pub search_result: String,
    pub references: Option<String>,
}

impl SearchRecord {
    pub fn new(query: impl Into<String>, search_result: impl Into<String>, references: Option<String>) -> Self {
        Self {
            timestamp: Local::now(),
            query: query.into(),
            search_result: search_result.into(),
            references,
        }
    }
}

/// Whether a search that failed in transport still lands in the history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Skip,
    Persist,
}

/// Newest-first list of search records. Grows for the life of the session.
#[derive(Debug, Default)]
pub struct HistoryStore {
    records: Vec<SearchRecord>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: SearchRecord) {
        self.records.insert(0, entry);
    }

    pub fn all(&self) -> &[SearchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// State owned by one interactive session. Created when the session starts
/// and dropped when it ends; nothing here outlives the process.
#[derive(Debug)]
pub struct Session {
    pub history: HistoryStore,
    pub failure_policy: FailurePolicy,
    pub started_at: DateTime<Local>,
}

impl Session {
    pub fn new(failure_policy: FailurePolicy) -> Self {
        Self {
            history: HistoryStore::new(),
            failure_policy,
            started_at: Local::now(),
        }
    }
}
