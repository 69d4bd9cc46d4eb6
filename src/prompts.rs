//! Prompt templates for content generation

/// Default audience the generated material is written for
pub const DEFAULT_AUDIENCE: &str = "autistic professionals in corporate settings";

/// System prompt used when none is configured
pub fn content_system_prompt(audience: &str) -> String {
    format!(
        "You are a helpful assistant writing practical guidance for {}. \
         Keep each entry concise and specific, and always answer with the requested JSON structure.",
        audience
    )
}

pub fn topic_prompt(title: &str, format_instructions: &str, audience: &str) -> String {
    format!(
        "Generate structured information about the topic.

{format_instructions}

Topic: {title}

Focus on:
1. The importance of this topic for {audience}
2. Key challenges that might arise in this area
3. Specific strategies and solutions
4. Clear examples and scenarios
5. Actionable steps for improvement

Ensure each section is detailed and specific to the needs of {audience}."
    )
}

pub fn subtopic_prompt(
    title: &str,
    parent_title: &str,
    format_instructions: &str,
    audience: &str,
) -> String {
    format!(
        "Generate structured information about the subtopic within its parent topic.

{format_instructions}

Parent Topic: {parent_title}
Subtopic: {title}

Focus on:
1. How this specific aspect relates to the parent topic
2. Particular challenges that might arise
3. Specific strategies and techniques
4. Real-world examples and scenarios
5. Step-by-step guidance

Ensure each section is detailed and specific to the needs of {audience}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtopic_prompt_names_parent() {
        let prompt = subtopic_prompt("Email Etiquette", "Communication", "{schema}", DEFAULT_AUDIENCE);
        assert!(prompt.contains("Parent Topic: Communication"));
        assert!(prompt.contains("Subtopic: Email Etiquette"));
        assert!(prompt.contains("{schema}"));
    }
}
