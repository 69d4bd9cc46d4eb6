//! Node representation in the knowledge graph

use crate::content::Content;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for a node
///
/// Serializes as a plain string. Freshly minted ids are UUIDv4, but any
/// string found in the store is accepted since the web layer may write its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new random NodeId (UUID-based)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a NodeId from an existing string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Node category. Topics are roots, subtopics always have a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Topic,
    Subtopic,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Topic => "TOPIC",
            Category::Subtopic => "SUBTOPIC",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `(title, parent_id)` pair that must be unique within a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub title: String,
    pub parent_id: Option<NodeId>,
}

impl IdentityKey {
    pub fn new(title: impl Into<String>, parent_id: Option<NodeId>) -> Self {
        Self {
            title: title.into(),
            parent_id,
        }
    }
}

/// Fields the core does not own (added by the web layer). Kept verbatim.
pub type ExtraFields = BTreeMap<String, serde_json::Value>;

/// A node in the knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub category: Category,
    pub title: String,
    /// Rendered display text. Empty means not yet generated.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    /// Structured content, present once generation succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Content>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Node {
    /// Create a root topic with a fresh id and empty body
    pub fn topic(title: impl Into<String>) -> Self {
        Self::new(Category::Topic, title, None)
    }

    /// Create a subtopic under `parent` with a fresh id and empty body
    pub fn subtopic(title: impl Into<String>, parent: NodeId) -> Self {
        Self::new(Category::Subtopic, title, Some(parent))
    }

    pub fn new(category: Category, title: impl Into<String>, parent_id: Option<NodeId>) -> Self {
        Self {
            id: NodeId::new(),
            category,
            title: title.into(),
            body: String::new(),
            parent_id,
            metadata: None,
            extra: ExtraFields::new(),
        }
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(self.title.clone(), self.parent_id.clone())
    }

    pub fn is_generated(&self) -> bool {
        !self.body.is_empty()
    }

    /// Attach generated content and its rendering
    pub fn with_content(mut self, body: impl Into<String>, content: Content) -> Self {
        self.body = body.into();
        self.metadata = Some(content);
        self
    }
}

/// Lenient on-disk form of a node.
///
/// Older stores may lack `id` and may carry the parent as a title in
/// `parent_category`. Records are turned into [`Node`]s by
/// [`crate::sync::migrate_legacy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    pub category: Category,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Content>,
    /// Legacy parent reference by title.
    ///
    /// `None` = field absent, `Some(None)` = explicit null, `Some(Some(t))` = title.
    #[serde(
        rename = "parent_category",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_parent: Option<Option<String>>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl From<Node> for NodeRecord {
    fn from(node: Node) -> Self {
        Self {
            id: Some(node.id),
            category: node.category,
            title: node.title,
            body: node.body,
            parent_id: node.parent_id,
            metadata: node.metadata,
            legacy_parent: None,
            extra: node.extra,
        }
    }
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
