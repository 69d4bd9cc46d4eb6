//! Display rendering of validated content

use super::schema::{Content, Sections};

/// Render content into the node's display body.
///
/// Returns `None` for metadata whose shape is not recognized.
pub fn render(content: &Content) -> Option<String> {
    content.sections().map(render_sections)
}

pub fn render_sections(s: Sections<'_>) -> String {
    format!(
        "{}:\n{}\n\nKey Challenges:\n{}\nStrategies:\n{}\nExamples:\n{}\nAction Steps:\n{}",
        s.narrative_label,
        s.narrative,
        bullets(s.challenges),
        bullets(s.strategies),
        bullets(s.examples),
        bullets(s.action_steps),
    )
}

fn bullets(items: &[String]) -> String {
    items.iter().map(|item| format!("- {}\n", item)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{SubtopicContent, TopicContent};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn topic_renders_in_fixed_order() {
        let content = Content::Topic(TopicContent {
            importance: "It matters.".into(),
            challenges: strings(&["c1", "c2"]),
            strategies: strings(&["s1"]),
            examples: strings(&["e1"]),
            action_steps: strings(&["a1"]),
        });
        let body = render(&content).unwrap();
        assert_eq!(
            body,
            "Importance:\nIt matters.\n\n\
             Key Challenges:\n- c1\n- c2\n\n\
             Strategies:\n- s1\n\n\
             Examples:\n- e1\n\n\
             Action Steps:\n- a1\n"
        );
    }

    #[test]
    fn subtopic_uses_relation_label() {
        let content = Content::Subtopic(SubtopicContent {
            relation_to_parent: "A facet of the parent.".into(),
            challenges: strings(&["c"]),
            strategies: strings(&["s"]),
            examples: strings(&["e"]),
            action_steps: strings(&["a"]),
        });
        let body = render(&content).unwrap();
        assert!(body.starts_with("Relation to Parent Topic:\nA facet of the parent.\n\n"));
        assert!(body.ends_with("Action Steps:\n- a\n"));
    }

    #[test]
    fn unrecognized_metadata_does_not_render() {
        let content = Content::Unrecognized(serde_json::json!({"x": 1}));
        assert!(render(&content).is_none());
    }
}
