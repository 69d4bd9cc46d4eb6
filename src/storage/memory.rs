//! In-memory backend for tests

use super::traits::{NodeStore, StorageResult};
use crate::graph::{Node, NodeRecord};
use std::sync::Mutex;

/// Node store held in memory. Counts saves so checkpointing can be observed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<NodeRecord>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        Self {
            records: Mutex::new(nodes.into_iter().map(NodeRecord::from).collect()),
            saves: Mutex::new(0),
        }
    }

    pub fn with_records(records: Vec<NodeRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            saves: Mutex::new(0),
        }
    }

    /// Number of `save` calls so far
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl NodeStore for MemoryStore {
    fn load(&self) -> StorageResult<Vec<NodeRecord>> {
        Ok(self.records.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, nodes: &[Node]) -> StorageResult<()> {
        *self.records.lock().unwrap_or_else(|e| e.into_inner()) =
            nodes.iter().cloned().map(NodeRecord::from).collect();
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}
