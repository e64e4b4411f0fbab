#![forbid(unsafe_code)]

//! Tables by language id.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::TableError;
use crate::table::UdlTable;

/// Loaded transition tables, keyed by [`UdlTable::language`].
#[derive(Debug, Default, Clone)]
pub struct UdlRegistry {
    tables: FxHashMap<String, Arc<UdlTable>>,
}

impl UdlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `table`, replacing any table for the same language.
    pub fn insert(&mut self, table: UdlTable) -> Arc<UdlTable> {
        let table = Arc::new(table);
        if self
            .tables
            .insert(table.language().to_owned(), Arc::clone(&table))
            .is_some()
        {
            lexkit_core::debug!(language = table.language(), "udl table replaced");
        }
        table
    }

    /// Parse, validate and add a JSON table.
    pub fn load_json(&mut self, json: &str) -> Result<Arc<UdlTable>, TableError> {
        match UdlTable::from_json(json) {
            Ok(table) => Ok(self.insert(table)),
            Err(err) => {
                lexkit_core::warn!(error = %err, "udl table rejected");
                Err(err)
            }
        }
    }

    /// Read and add the JSON table at `path`.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<Arc<UdlTable>, TableError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| {
            lexkit_core::warn!(path = %path.display(), error = %err, "udl table unreadable");
            TableError::from(err)
        })?;
        self.load_json(&json)
    }

    pub fn get(&self, language: &str) -> Option<Arc<UdlTable>> {
        self.tables.get(language).cloned()
    }

    pub fn contains(&self, language: &str) -> bool {
        self.tables.contains_key(language)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Registered language ids, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableErrorKind;
    use tracing_test::traced_test;

    const SAMPLE: &str = include_str!("../tests/data/minitpl.json");

    #[test]
    fn load_and_lookup() {
        let mut registry = UdlRegistry::new();
        assert!(registry.is_empty());
        let table = registry.load_json(SAMPLE).unwrap();
        assert_eq!(table.language(), "MiniTemplate");
        assert!(registry.contains("MiniTemplate"));
        assert!(registry.get("minitemplate").is_none());
        assert_eq!(registry.languages(), vec!["MiniTemplate"]);
        registry.load_json(SAMPLE).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    #[traced_test]
    fn rejected_table_is_logged_and_not_added() {
        let mut registry = UdlRegistry::new();
        let err = registry.load_json(r#"{"language": "x", "families": {}, "states": []}"#).unwrap_err();
        assert_eq!(err.kind, TableErrorKind::Empty);
        assert!(registry.is_empty());
        assert!(logs_contain("udl table rejected"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut registry = UdlRegistry::new();
        let err = registry.load_file("/nonexistent/lexkit/table.json").unwrap_err();
        assert_eq!(err.kind, TableErrorKind::Io);
    }

    #[test]
    fn loads_table_from_disk() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/minitpl.json");
        let mut registry = UdlRegistry::new();
        registry.load_file(path).unwrap();
        assert!(registry.contains("MiniTemplate"));
    }
}
