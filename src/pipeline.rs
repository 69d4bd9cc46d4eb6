//! Content generation pipeline
//!
//! Fills in `body` and `metadata` for every node that has no body yet.
//! Topics are processed before subtopics so a subtopic prompt can name its
//! parent. For each eligible node:
//!
//! 1. Build the prompt (system message, format instructions, title, parent title)
//! 2. Call the completion client
//! 3. Parse and validate the reply against the node's content schema
//! 4. Render the display body
//! 5. Write both into the node and save the whole store (per-node checkpoint)
//! 6. Pause before the next request
//!
//! Failures are isolated to their node: the node stays empty and is picked
//! up again on the next run. Only a failing store aborts the run.

use crate::content::{self, Content, ValidationError};
use crate::graph::{Category, KnowledgeGraph, Node, NodeId};
use crate::llm::{ChatMessage, CompletionClient, CompletionError};
use crate::prompts;
use crate::storage::{NodeStore, StorageError};
use crate::sync;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a single node could not be generated
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Request(#[from] CompletionError),

    #[error("parent of node {node} cannot be resolved{}", .parent.as_ref().map(|p| format!(" (parent_id {})", p)).unwrap_or_default())]
    DanglingReference { node: NodeId, parent: Option<NodeId> },
}

/// Errors that abort a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("generation failed for {id}: {source}")]
    Generation {
        id: NodeId,
        #[source]
        source: GenerationError,
    },
}

/// Fixed delay applied after each successful generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    delay: Duration,
}

impl Throttle {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

/// Tunables for a pipeline run
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub throttle: Throttle,
    /// Overrides the built-in system prompt
    pub system_prompt: Option<String>,
    pub audience: String,
    /// Maximum number of completion calls in one run
    pub limit: Option<usize>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            throttle: Throttle::default(),
            system_prompt: None,
            audience: prompts::DEFAULT_AUDIENCE.to_string(),
            limit: None,
        }
    }
}

/// A node that failed during a run
#[derive(Debug)]
pub struct NodeFailure {
    pub id: NodeId,
    pub title: String,
    pub error: GenerationError,
}

/// Summary of a pipeline run
#[derive(Debug)]
pub struct GenerationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub generated: Vec<NodeId>,
    /// Nodes skipped because their body was already populated
    pub skipped: usize,
    pub failures: Vec<NodeFailure>,
    /// True when the run stopped at the configured limit
    pub limited: bool,
}

impl GenerationReport {
    fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            generated: Vec::new(),
            skipped: 0,
            failures: Vec::new(),
            limited: false,
        }
    }
}

pub struct GenerationPipeline {
    client: Arc<dyn CompletionClient>,
    store: Arc<dyn NodeStore>,
    options: GenerationOptions,
}

impl GenerationPipeline {
    pub fn new(client: Arc<dyn CompletionClient>, store: Arc<dyn NodeStore>) -> Self {
        Self {
            client,
            store,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Load the store and fill every empty node.
    ///
    /// A missing or corrupt store aborts before any request is made.
    pub async fn run(&self) -> Result<GenerationReport, PipelineError> {
        let (mut graph, _) = sync::load_graph(self.store.as_ref())?;
        Ok(self.run_on(&mut graph).await?)
    }

    /// Fill every empty node of an already loaded graph, checkpointing
    /// through the store after each success.
    pub async fn run_on(&self, graph: &mut KnowledgeGraph) -> Result<GenerationReport, StorageError> {
        let mut report = GenerationReport::start();
        let mut attempts = 0usize;

        'phases: for category in [Category::Topic, Category::Subtopic] {
            tracing::info!(category = %category, "processing nodes");

            for id in graph.ids_in(category) {
                let Some(node) = graph.get(&id) else {
                    continue;
                };
                if node.is_generated() {
                    tracing::debug!(title = %node.title, "skipping, already has content");
                    report.skipped += 1;
                    continue;
                }

                let messages = match self.build_messages(graph, node) {
                    Ok(m) => m,
                    Err(error) => {
                        tracing::warn!(title = %node.title, %error, "skipping node");
                        report.failures.push(NodeFailure {
                            id: id.clone(),
                            title: node.title.clone(),
                            error,
                        });
                        continue;
                    }
                };

                if self.options.limit.is_some_and(|limit| attempts >= limit) {
                    tracing::info!(attempts, "generation limit reached");
                    report.limited = true;
                    break 'phases;
                }
                attempts += 1;

                let title = node.title.clone();
                tracing::info!(title = %title, category = %category, "generating content");
                match self.generate(category, &messages).await {
                    Ok((body, content)) => {
                        if let Some(node) = graph.get_mut(&id) {
                            node.body = body;
                            node.metadata = Some(content);
                        }
                        self.store.save(graph.nodes())?;
                        tracing::info!(title = %title, "content generated and saved");
                        report.generated.push(id);
                        self.options.throttle.pause().await;
                    }
                    Err(error) => {
                        tracing::warn!(title = %title, %error, "generation failed");
                        report.failures.push(NodeFailure { id, title, error });
                    }
                }
            }
        }

        report.finished_at = Utc::now();
        tracing::info!(
            generated = report.generated.len(),
            skipped = report.skipped,
            failed = report.failures.len(),
            "content generation complete"
        );
        Ok(report)
    }

    /// Generate content for one node even if it already has a body.
    pub async fn regenerate(&self, id: &NodeId) -> Result<Node, PipelineError> {
        let (mut graph, _) = sync::load_graph(self.store.as_ref())?;
        let node = graph
            .get(id)
            .ok_or_else(|| PipelineError::NodeNotFound(id.clone()))?;
        let category = node.category;

        let wrap = |source| PipelineError::Generation {
            id: id.clone(),
            source,
        };
        let messages = self.build_messages(&graph, node).map_err(wrap)?;
        let (body, content) = self.generate(category, &messages).await.map_err(wrap)?;

        let node = graph
            .get_mut(id)
            .ok_or_else(|| PipelineError::NodeNotFound(id.clone()))?;
        node.body = body;
        node.metadata = Some(content);
        let updated = node.clone();

        self.store.save(graph.nodes())?;
        tracing::info!(title = %updated.title, "content regenerated and saved");
        Ok(updated)
    }

    fn build_messages(
        &self,
        graph: &KnowledgeGraph,
        node: &Node,
    ) -> Result<Vec<ChatMessage>, GenerationError> {
        let audience = self.options.audience.as_str();
        let instructions = content::format_instructions(node.category);

        let prompt = match node.category {
            Category::Topic => prompts::topic_prompt(&node.title, &instructions, audience),
            Category::Subtopic => {
                let parent = graph.parent_of(node).ok_or_else(|| GenerationError::DanglingReference {
                    node: node.id.clone(),
                    parent: node.parent_id.clone(),
                })?;
                prompts::subtopic_prompt(&node.title, &parent.title, &instructions, audience)
            }
        };

        let system = self
            .options
            .system_prompt
            .clone()
            .unwrap_or_else(|| prompts::content_system_prompt(audience));
        Ok(vec![ChatMessage::system(system), ChatMessage::user(prompt)])
    }

    async fn generate(
        &self,
        category: Category,
        messages: &[ChatMessage],
    ) -> Result<(String, Content), GenerationError> {
        let raw = self
            .client
            .complete(messages, self.options.temperature)
            .await?;
        let content = content::parse_content(category, &raw)?;
        let body = content::render(&content).unwrap_or_default();
        Ok((body, content))
    }
}
