//! kbweave: ontology-synchronized knowledge graph with generated content
//!
//! A hierarchical knowledge graph (topics and nested subtopics) is stored
//! as a flat list of nodes with parent pointers. Three independent batch
//! passes work on that list:
//!
//! - **sync**: reconcile the store with an authoring-time ontology tree
//! - **dedup**: collapse nodes sharing a title into a candidate collection
//! - **generate**: fill empty nodes with schema-validated content from a
//!   chat-completion service, checkpointing after every node
//!
//! # Example
//!
//! ```
//! use kbweave::{sync, OntologyItem};
//!
//! let ontology = vec![OntologyItem::named("Communication")
//!     .with_subtopic(OntologyItem::named("Email Etiquette"))];
//! let (graph, report) = sync::synchronize(Vec::new(), &ontology);
//! assert_eq!(report.added, 2);
//! assert!(graph.check_consistency().is_empty());
//! ```

pub mod config;
pub mod content;
pub mod dedup;
mod graph;
pub mod llm;
pub mod ontology;
pub mod pipeline;
pub mod prompts;
pub mod storage;
pub mod sync;

pub use config::{Config, ConfigError};
pub use content::{Content, SubtopicContent, TopicContent, ValidationError};
pub use dedup::{deduplicate, DedupReport};
pub use graph::{Category, ExtraFields, IdentityKey, KnowledgeGraph, Node, NodeId, NodeRecord, Violation};
pub use llm::{ChatMessage, CompletionClient, CompletionError, MockClient, OpenAiClient};
pub use ontology::{OntologyError, OntologyItem};
pub use pipeline::{GenerationError, GenerationPipeline, GenerationReport, PipelineError, Throttle};
pub use storage::{JsonFileStore, MemoryStore, NodeStore, StorageError, StorageResult};
pub use sync::{SyncError, SyncReport, Synchronizer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
