//! JSON file backend

use super::traits::{NodeStore, StorageError, StorageResult};
use crate::graph::{Node, NodeRecord};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Node store backed by a single pretty-printed JSON array.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so readers never observe a truncated store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl NodeStore for JsonFileStore {
    fn load(&self) -> StorageResult<Vec<NodeRecord>> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| {
            StorageError::SourceUnavailable {
                path: self.path.clone(),
                source,
            }
        })?;
        serde_json::from_str(&text).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, nodes: &[Node]) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(nodes)?;
        let tmp = self.temp_path();
        let write_err = |source| StorageError::Write {
            path: self.path.clone(),
            source,
        };

        let mut file = std::fs::File::create(&tmp).map_err(write_err)?;
        file.write_all(json.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;

        tracing::debug!(path = %self.path.display(), nodes = nodes.len(), "store saved");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Category, NodeId};
    use tempfile::TempDir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("kb.json"));
        let topic = Node::topic("Communication");
        let sub = Node::subtopic("Email Etiquette", topic.id.clone());

        store.save(&[topic.clone(), sub.clone()]).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id.as_ref(), Some(&topic.id));
        assert_eq!(loaded[1].parent_id.as_ref(), Some(&topic.id));
        assert_eq!(loaded[1].category, Category::Subtopic);
        assert!(!dir.path().join("kb.json.tmp").exists());
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        let err = store.load().unwrap_err();
        assert!(err.is_not_found());
        assert!(store.load_or_empty().unwrap().is_empty());
    }

    #[test]
    fn non_list_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(&path, r#"{"title": "not a list"}"#).unwrap();
        let store = JsonFileStore::new(&path);

        assert!(matches!(store.load(), Err(StorageError::Corrupt { .. })));
        // corrupt is not the same as missing
        assert!(store.load_or_empty().is_err());
    }

    #[test]
    fn legacy_records_load_without_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(
            &path,
            r#"[
                {"category": "TOPIC", "title": "Communication", "body": "", "parent_category": null},
                {"category": "SUBTOPIC", "title": "Email", "body": "", "parent_category": "Communication"}
            ]"#,
        )
        .unwrap();

        let records = JsonFileStore::new(&path).load().unwrap();
        assert!(records[0].id.is_none());
        assert_eq!(records[0].legacy_parent, Some(None));
        assert_eq!(records[1].legacy_parent, Some(Some("Communication".to_string())));
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(
            &path,
            r#"[{"id": "n1", "category": "TOPIC", "title": "T", "body": "", "parent_id": null, "tags": ["web"]}]"#,
        )
        .unwrap();
        let store = JsonFileStore::new(&path);

        let record = store.load().unwrap().remove(0);
        let node = Node {
            id: NodeId::from_string("n1"),
            category: record.category,
            title: record.title,
            body: record.body,
            parent_id: record.parent_id,
            metadata: record.metadata,
            extra: record.extra,
        };
        store.save(&[node]).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["tags"], serde_json::json!(["web"]));
        assert!(raw[0].get("metadata").is_none());
    }
}
