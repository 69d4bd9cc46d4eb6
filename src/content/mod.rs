//! Generated content: schema, validation and rendering

mod render;
mod schema;

pub use render::{render, render_sections};
pub use schema::{
    format_instructions, parse_content, Content, ContentSchema, Sections, SubtopicContent,
    TopicContent, ValidationError,
};
