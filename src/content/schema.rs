//! Structured content shapes and their validation
//!
//! Each category has its own content struct. Both share the four list
//! sections, which must be non-empty; a completion that parses but leaves a
//! list empty is rejected the same way as one that does not parse at all.

use crate::graph::Category;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Generated content for a `TOPIC` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TopicContent {
    #[schemars(description = "Why this topic matters for the target audience")]
    pub importance: String,
    #[schemars(description = "Key challenges faced in this area", length(min = 1))]
    pub challenges: Vec<String>,
    #[schemars(description = "Specific strategies and solutions", length(min = 1))]
    pub strategies: Vec<String>,
    #[schemars(description = "Clear examples and scenarios", length(min = 1))]
    pub examples: Vec<String>,
    #[schemars(description = "Actionable steps for improvement", length(min = 1))]
    pub action_steps: Vec<String>,
}

/// Generated content for a `SUBTOPIC` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtopicContent {
    #[schemars(description = "How this specific aspect relates to the broader parent topic")]
    pub relation_to_parent: String,
    #[schemars(description = "Particular challenges faced with this subtopic", length(min = 1))]
    pub challenges: Vec<String>,
    #[schemars(description = "Specific strategies and techniques for this aspect", length(min = 1))]
    pub strategies: Vec<String>,
    #[schemars(description = "Real-world examples and scenarios", length(min = 1))]
    pub examples: Vec<String>,
    #[schemars(description = "Step-by-step guidance for improvement", length(min = 1))]
    pub action_steps: Vec<String>,
}

/// A node's `metadata` record.
///
/// Stored untagged: the shape itself says which variant it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Topic(TopicContent),
    Subtopic(SubtopicContent),
    /// Metadata written by someone else in a shape we don't know. Kept as-is.
    Unrecognized(serde_json::Value),
}

impl Content {
    pub fn category(&self) -> Option<Category> {
        match self {
            Content::Topic(_) => Some(Category::Topic),
            Content::Subtopic(_) => Some(Category::Subtopic),
            Content::Unrecognized(_) => None,
        }
    }

    pub fn challenges(&self) -> Option<&[String]> {
        self.sections().map(|s| s.challenges)
    }

    /// The narrative field and list sections, if the shape is known
    pub fn sections(&self) -> Option<Sections<'_>> {
        match self {
            Content::Topic(c) => Some(c.sections()),
            Content::Subtopic(c) => Some(c.sections()),
            Content::Unrecognized(_) => None,
        }
    }
}

impl From<TopicContent> for Content {
    fn from(c: TopicContent) -> Self {
        Content::Topic(c)
    }
}

impl From<SubtopicContent> for Content {
    fn from(c: SubtopicContent) -> Self {
        Content::Subtopic(c)
    }
}

/// Borrowed view of a content record in display order
#[derive(Debug, Clone, Copy)]
pub struct Sections<'a> {
    pub narrative_label: &'static str,
    pub narrative: &'a str,
    pub challenges: &'a [String],
    pub strategies: &'a [String],
    pub examples: &'a [String],
    pub action_steps: &'a [String],
}

impl<'a> Sections<'a> {
    fn lists(&self) -> [(&'static str, &'a [String]); 4] {
        [
            ("challenges", self.challenges),
            ("strategies", self.strategies),
            ("examples", self.examples),
            ("action_steps", self.action_steps),
        ]
    }
}

/// Errors raised when a completion does not satisfy the content schema
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("no JSON object found in completion: {snippet}")]
    NoJson { snippet: String },

    #[error("{category} content does not match schema: {source}")]
    Malformed {
        category: Category,
        #[source]
        source: serde_json::Error,
    },

    #[error("{category} content field `{field}` must contain at least one entry")]
    EmptyField {
        category: Category,
        field: &'static str,
    },
}

/// A content shape bound to one node category
pub trait ContentSchema: DeserializeOwned + JsonSchema + Into<Content> {
    const CATEGORY: Category;

    fn sections(&self) -> Sections<'_>;

    /// Reject any empty list section
    fn validate(&self) -> Result<(), ValidationError> {
        for (field, items) in self.sections().lists() {
            if items.is_empty() {
                return Err(ValidationError::EmptyField {
                    category: Self::CATEGORY,
                    field,
                });
            }
        }
        Ok(())
    }
}

impl ContentSchema for TopicContent {
    const CATEGORY: Category = Category::Topic;

    fn sections(&self) -> Sections<'_> {
        Sections {
            narrative_label: "Importance",
            narrative: &self.importance,
            challenges: &self.challenges,
            strategies: &self.strategies,
            examples: &self.examples,
            action_steps: &self.action_steps,
        }
    }
}

impl ContentSchema for SubtopicContent {
    const CATEGORY: Category = Category::Subtopic;

    fn sections(&self) -> Sections<'_> {
        Sections {
            narrative_label: "Relation to Parent Topic",
            narrative: &self.relation_to_parent,
            challenges: &self.challenges,
            strategies: &self.strategies,
            examples: &self.examples,
            action_steps: &self.action_steps,
        }
    }
}

/// Parse raw completion text into validated content for `category`
pub fn parse_content(category: Category, raw: &str) -> Result<Content, ValidationError> {
    match category {
        Category::Topic => parse_as::<TopicContent>(raw),
        Category::Subtopic => parse_as::<SubtopicContent>(raw),
    }
}

fn parse_as<T: ContentSchema>(raw: &str) -> Result<Content, ValidationError> {
    let value = extract_json(raw).ok_or_else(|| ValidationError::NoJson {
        snippet: raw.chars().take(200).collect(),
    })?;
    let content: T = serde_json::from_value(value).map_err(|source| ValidationError::Malformed {
        category: T::CATEGORY,
        source,
    })?;
    content.validate()?;
    Ok(content.into())
}

/// Instructions embedded in the prompt describing the expected JSON shape
pub fn format_instructions(category: Category) -> String {
    let schema = match category {
        Category::Topic => schemars::schema_for!(TopicContent),
        Category::Subtopic => schemars::schema_for!(SubtopicContent),
    };
    let rendered = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!(
        "The output should be formatted as a JSON instance that conforms to the JSON schema below. \
         Every list must contain at least one entry. Respond with the JSON object only.\n\n```\n{}\n```",
        rendered
    )
}

/// Extract a JSON object from completion text.
///
/// Tries, in order: the whole text, a fenced code block, then the span from
/// the first `{` to the last `}`.
pub(crate) fn extract_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();

    if let Some(v) = parse_object(trimmed) {
        return Some(v);
    }

    let fenced = if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        after.find("```").map(|end| &after[..end])
    } else if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        after.find("```").map(|end| &after[..end])
    } else {
        None
    };
    if let Some(v) = fenced.and_then(|block| parse_object(block.trim())) {
        return Some(v);
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => parse_object(&trimmed[start..=end]),
        _ => None,
    }
}

fn parse_object(text: &str) -> Option<serde_json::Value> {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .filter(|v| v.is_object())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn topic_json() -> serde_json::Value {
        json!({
            "importance": "Clear communication reduces friction.",
            "challenges": ["Ambiguous requests"],
            "strategies": ["Ask clarifying questions"],
            "examples": ["A vague email from a manager"],
            "action_steps": ["Write down expectations"]
        })
    }

    #[test]
    fn valid_topic_parses() {
        let content = parse_content(Category::Topic, &topic_json().to_string()).unwrap();
        assert_eq!(content.category(), Some(Category::Topic));
        assert_eq!(content.challenges().unwrap(), ["Ambiguous requests"]);
    }

    #[test]
    fn empty_challenges_rejected() {
        let mut payload = topic_json();
        payload["challenges"] = json!([]);
        let err = parse_content(Category::Topic, &payload.to_string()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::EmptyField { field: "challenges", .. }
        ));
    }

    #[test]
    fn wrong_variant_is_malformed() {
        // topic payload lacks `relation_to_parent`
        let err = parse_content(Category::Subtopic, &topic_json().to_string()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Malformed { category: Category::Subtopic, .. }
        ));
    }

    #[test]
    fn prose_without_json_rejected() {
        let err = parse_content(Category::Topic, "I cannot help with that.").unwrap_err();
        assert!(matches!(err, ValidationError::NoJson { .. }));
    }

    #[test]
    fn fenced_json_is_extracted() {
        let text = format!("Here you go:\n```json\n{}\n```\nAnything else?", topic_json());
        assert!(parse_content(Category::Topic, &text).is_ok());
    }

    #[test]
    fn brace_span_is_extracted() {
        let text = format!("Sure! {} Hope this helps.", topic_json());
        assert!(parse_content(Category::Topic, &text).is_ok());
    }

    #[test]
    fn untagged_metadata_picks_shape() {
        let sub: Content = serde_json::from_value(json!({
            "relation_to_parent": "Part of it",
            "challenges": ["a"], "strategies": ["b"], "examples": ["c"], "action_steps": ["d"]
        }))
        .unwrap();
        assert_eq!(sub.category(), Some(Category::Subtopic));

        let odd: Content = serde_json::from_value(json!({"notes": "hand edited"})).unwrap();
        assert!(matches!(odd, Content::Unrecognized(_)));
        assert!(odd.sections().is_none());
    }

    #[test]
    fn format_instructions_name_every_field() {
        let topic = format_instructions(Category::Topic);
        for field in ["importance", "challenges", "strategies", "examples", "action_steps"] {
            assert!(topic.contains(field), "missing {}", field);
        }
        let sub = format_instructions(Category::Subtopic);
        assert!(sub.contains("relation_to_parent"));
        assert!(!sub.contains("importance"));
    }
}
