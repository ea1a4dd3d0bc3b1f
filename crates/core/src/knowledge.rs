//! Crop knowledge lookup.
//!
//! The source of truth is a flat JSON object (`{"corn": "...", ...}`) that is
//! re-read on every lookup so edits to the file take effect without a restart.
//! The store is a trait so the request path can be exercised with an
//! in-memory mapping.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// Keywords suggested to the user when a lookup misses.
pub const EXAMPLE_KEYWORDS: &str = "corn, rice, wheat, avocado, or potatoes";

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("could not read knowledge file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse knowledge file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
}

/// Trims surrounding whitespace and lowercases, matching how keys are stored.
pub fn normalize_keyword(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Reply for a known keyword: `"Corn Info: <description>"`.
///
/// Expects an already-normalized (lowercase) keyword.
pub fn hit_reply(keyword: &str, description: &str) -> String {
    let mut chars = keyword.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{capitalized} Info: {description}")
}

/// Reply for an unknown keyword, echoing the original message text.
pub fn miss_reply(original: &str) -> String {
    format!("Sorry, I don't have data on '{original}'. Try asking about {EXAMPLE_KEYWORDS}.")
}

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Normalizes the key and returns the matching description, if any.
    async fn lookup(&self, key: &str) -> Result<Option<String>, KnowledgeError>;

    /// Health probe: verifies the backing mapping is currently readable.
    async fn probe(&self) -> Result<(), KnowledgeError> {
        self.lookup("").await.map(|_| ())
    }
}

/// Store backed by a JSON file, reloaded fresh on every lookup.
pub struct FileKnowledgeStore {
    path: PathBuf,
}

impl FileKnowledgeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<HashMap<String, String>, KnowledgeError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| KnowledgeError::ReadFile { path: self.path.clone(), source })?;
        serde_json::from_str(&raw)
            .map_err(|source| KnowledgeError::ParseFile { path: self.path.clone(), source })
    }
}

#[async_trait]
impl KnowledgeStore for FileKnowledgeStore {
    async fn lookup(&self, key: &str) -> Result<Option<String>, KnowledgeError> {
        let entries = self.load().await?;
        Ok(entries.get(&normalize_keyword(key)).cloned())
    }
}

/// Map-backed store for tests and local experimentation.
#[derive(Clone, Debug, Default)]
pub struct InMemoryKnowledgeStore {
    entries: HashMap<String, String>,
}

impl InMemoryKnowledgeStore {
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, value)| (normalize_keyword(&key), value))
                .collect(),
        }
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn lookup(&self, key: &str) -> Result<Option<String>, KnowledgeError> {
        Ok(self.entries.get(&normalize_keyword(key)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{
        hit_reply, miss_reply, normalize_keyword, FileKnowledgeStore, InMemoryKnowledgeStore,
        KnowledgeError, KnowledgeStore,
    };

    #[test]
    fn normalization_trims_and_lowercases() {
        assert_eq!(normalize_keyword("  Corn \n"), "corn");
        assert_eq!(normalize_keyword("WHEAT"), "wheat");
    }

    #[test]
    fn hit_reply_capitalizes_the_keyword() {
        assert_eq!(hit_reply("corn", "D"), "Corn Info: D");
        assert_eq!(hit_reply("sweet corn", "D"), "Sweet corn Info: D");
    }

    #[test]
    fn miss_reply_lists_the_example_keywords() {
        let reply = miss_reply("kale");
        assert!(reply.contains("'kale'"));
        assert!(reply.contains("corn, rice, wheat, avocado, or potatoes"));
    }

    #[tokio::test]
    async fn file_store_reads_the_mapping_per_lookup() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("crops.json");
        fs::write(&path, r#"{"corn": "A cereal grain."}"#).expect("write mapping");

        let store = FileKnowledgeStore::new(&path);
        let hit = store.lookup(" CORN ").await.expect("lookup");
        assert_eq!(hit.as_deref(), Some("A cereal grain."));

        // The file is authoritative on every call, not just the first.
        fs::write(&path, r#"{"corn": "Updated."}"#).expect("rewrite mapping");
        let hit = store.lookup("corn").await.expect("lookup after rewrite");
        assert_eq!(hit.as_deref(), Some("Updated."));

        let miss = store.lookup("kale").await.expect("lookup miss");
        assert_eq!(miss, None);
    }

    #[tokio::test]
    async fn file_store_reports_missing_file_as_read_error() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileKnowledgeStore::new(dir.path().join("absent.json"));

        let error = store.lookup("corn").await.expect_err("lookup should fail");
        assert!(matches!(error, KnowledgeError::ReadFile { .. }));
        assert!(store.probe().await.is_err());
    }

    #[tokio::test]
    async fn file_store_reports_malformed_mapping_as_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("crops.json");
        fs::write(&path, "not json").expect("write mapping");

        let store = FileKnowledgeStore::new(&path);
        let error = store.lookup("corn").await.expect_err("lookup should fail");
        assert!(matches!(error, KnowledgeError::ParseFile { .. }));
    }

    #[tokio::test]
    async fn in_memory_store_normalizes_both_sides() {
        let store = InMemoryKnowledgeStore::new([(" Corn ".to_string(), "D".to_string())]);
        let hit = store.lookup("CORN").await.expect("lookup");
        assert_eq!(hit.as_deref(), Some("D"));
        assert!(store.probe().await.is_ok());
    }
}
