//! Optional reference dataset attached to a request.
//!
//! The dataset is whatever JSON document happens to sit next to the service
//! (an employee directory by default). It is loaded per request, never
//! cached, and may be shrunk when it is too large to send.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A reference dataset in its raw serialized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDataset {
    raw: String,
}

impl ReferenceDataset {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The serialized form, exactly as loaded.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Length of the serialized form in characters.
    pub fn char_len(&self) -> usize {
        self.raw.chars().count()
    }

    /// Shrinks the dataset according to `rule`.
    ///
    /// Returns `None` when the dataset is not structurally reducible: it is
    /// not JSON, or it has no record array under `rule.records_key`.
    pub fn reduce(&self, rule: &ReductionRule) -> Option<String> {
        let parsed: Value = serde_json::from_str(&self.raw).ok()?;
        let records = parsed.get(&rule.records_key)?.as_array()?;

        let slim: Vec<Value> = records
            .iter()
            .take(rule.max_records)
            .map(|record| {
                let mut kept = Map::new();
                for field in &rule.keep_fields {
                    if let Some(value) = record.get(field) {
                        kept.insert(field.clone(), value.clone());
                    }
                }
                Value::Object(kept)
            })
            .collect();

        let mut root = Map::new();
        root.insert(rule.records_key.clone(), Value::Array(slim));
        serde_json::to_string(&Value::Object(root)).ok()
    }
}

/// How to shrink an oversized dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionRule {
    /// Top-level key holding the record array.
    pub records_key: String,
    /// Fields kept on each record (identifier, display name, contact).
    pub keep_fields: Vec<String>,
    /// Number of leading records kept.
    pub max_records: usize,
}

impl Default for ReductionRule {
    fn default() -> Self {
        Self {
            records_key: "employees".to_string(),
            keep_fields: vec!["eid".to_string(), "name".to_string(), "email".to_string()],
            max_records: 10,
        }
    }
}

/// Source of the reference dataset, consulted once per request.
pub trait DatasetLoader {
    /// Returns the dataset, or `None` when there is none to include.
    fn load(&self) -> Option<ReferenceDataset>;
}

impl<F> DatasetLoader for F
where
    F: Fn() -> Option<ReferenceDataset>,
{
    fn load(&self) -> Option<ReferenceDataset> {
        self()
    }
}

/// A loader that never yields a dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDataset;

impl DatasetLoader for NoDataset {
    fn load(&self) -> Option<ReferenceDataset> {
        None
    }
}

/// Reads the dataset from a file on every call.
#[derive(Debug, Clone)]
pub struct FileDatasetLoader {
    path: PathBuf,
}

impl FileDatasetLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetLoader for FileDatasetLoader {
    fn load(&self) -> Option<ReferenceDataset> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "reference dataset not present");
            return None;
        }

        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Some(ReferenceDataset::new(raw)),
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "failed to read reference dataset"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn employees(count: usize) -> String {
        let records: Vec<Value> = (0..count)
            .map(|i| {
                json!({
                    "eid": format!("E{i:03}"),
                    "name": format!("Employee {i}"),
                    "email": format!("e{i}@example.com"),
                    "projects": [{"project_id": i, "project_name": "Apollo"}],
                })
            })
            .collect();
        json!({ "employees": records }).to_string()
    }

    #[test]
    fn test_reduce_keeps_first_records_and_fields() {
        let dataset = ReferenceDataset::new(employees(25));
        let reduced = dataset.reduce(&ReductionRule::default()).unwrap();
        let parsed: Value = serde_json::from_str(&reduced).unwrap();

        let records = parsed["employees"].as_array().unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0]["eid"], "E000");
        for record in records {
            let keys: Vec<&String> = record.as_object().unwrap().keys().collect();
            assert_eq!(keys.len(), 3);
            assert!(record.get("projects").is_none());
        }
    }

    #[test]
    fn test_reduce_omits_missing_fields() {
        let dataset = ReferenceDataset::new(r#"{"employees":[{"eid":"E1"},7]}"#);
        let reduced = dataset.reduce(&ReductionRule::default()).unwrap();
        assert_eq!(reduced, r#"{"employees":[{"eid":"E1"},{}]}"#);
    }

    #[test]
    fn test_reduce_not_reducible() {
        let rule = ReductionRule::default();
        assert!(ReferenceDataset::new("not json").reduce(&rule).is_none());
        assert!(ReferenceDataset::new(r#"{"staff":[]}"#).reduce(&rule).is_none());
        assert!(ReferenceDataset::new(r#"{"employees":{}}"#).reduce(&rule).is_none());
        assert!(ReferenceDataset::new("[1,2,3]").reduce(&rule).is_none());
    }

    #[test]
    fn test_file_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("employees.json");

        let loader = FileDatasetLoader::new(&path);
        assert!(loader.load().is_none());

        std::fs::write(&path, employees(1)).unwrap();
        let dataset = loader.load().unwrap();
        assert!(dataset.raw().contains("E000"));
    }

    #[test]
    fn test_closure_loader() {
        let loader = || Some(ReferenceDataset::new("{}"));
        assert_eq!(loader.load().unwrap().raw(), "{}");
        assert!(NoDataset.load().is_none());
    }
}
