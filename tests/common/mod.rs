//! Shared helpers for integration tests

#![allow(dead_code)]

use kbweave::{Category, JsonFileStore, NodeStore};
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory holding an ontology file and a store path
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(self.path("knowledge_base.json"))
    }

    pub fn ontology(&self, value: serde_json::Value) -> PathBuf {
        self.write("ontology.json", &value.to_string())
    }
}

/// Raw JSON array currently on disk
pub fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).expect("read store")).expect("parse store")
}

pub fn count_in(store: &JsonFileStore, category: Category) -> usize {
    store
        .load()
        .expect("load store")
        .iter()
        .filter(|r| r.category == category)
        .count()
}

/// A completion reply satisfying the schema for `category`
pub fn reply(category: Category, challenges: &[&str]) -> String {
    let mut value = json!({
        "challenges": challenges,
        "strategies": ["Agree on written follow-ups"],
        "examples": ["A meeting ends without clear owners"],
        "action_steps": ["Send a recap within a day"]
    });
    match category {
        Category::Topic => value["importance"] = json!("Shapes every working relationship."),
        Category::Subtopic => value["relation_to_parent"] = json!("A concrete channel of the parent topic."),
    }
    value.to_string()
}
