//! Authoring-time ontology: the nested tree nodes are synchronized against

use crate::graph::{Category, Node, NodeId};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One entry of the ontology tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OntologyItem {
    /// Items without a name are skipped during flattening
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subtopics: Vec<OntologyItem>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<OntologyItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<OntologyItem>>::deserialize(deserializer)?.unwrap_or_default())
}

impl OntologyItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            subtopics: Vec::new(),
        }
    }

    pub fn with_subtopic(mut self, item: OntologyItem) -> Self {
        self.subtopics.push(item);
        self
    }
}

/// Errors loading the ontology source
#[derive(Debug, Error)]
pub enum OntologyError {
    #[error("ontology source unavailable: {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ontology source {} is not a list of items: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read the root item list from a JSON file
pub fn load_ontology(path: impl AsRef<Path>) -> Result<Vec<OntologyItem>, OntologyError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| OntologyError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| OntologyError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Flatten the tree depth-first into fresh nodes.
///
/// Each named item yields one node with a new id and empty body; a parent
/// always precedes its descendants in the output. Depth is unbounded.
pub fn flatten(items: &[OntologyItem]) -> Vec<Node> {
    let mut out = Vec::new();
    flatten_into(items, None, &mut out);
    out
}

fn flatten_into(items: &[OntologyItem], parent: Option<&NodeId>, out: &mut Vec<Node>) {
    for item in items {
        let Some(title) = item.name.as_deref().filter(|n| !n.is_empty()) else {
            tracing::debug!("skipping unnamed ontology item");
            continue;
        };

        let category = if parent.is_some() {
            Category::Subtopic
        } else {
            Category::Topic
        };
        let node = Node::new(category, title, parent.cloned());
        let id = node.id.clone();
        out.push(node);

        if !item.subtopics.is_empty() {
            flatten_into(&item.subtopics, Some(&id), out);
        }
    }
}
