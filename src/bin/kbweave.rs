//! kbweave CLI: ontology sync, deduplication and content generation.
//!
//! Usage:
//!   kbweave sync [--dry-run]
//!   kbweave dedup [--apply]
//!   kbweave generate [--regenerate ID] [--limit N]
//!   kbweave check
//!   kbweave tree

use clap::{Parser, Subcommand};
use kbweave::{
    dedup, sync, Config, GenerationPipeline, JsonFileStore, KnowledgeGraph, Node, NodeId,
    OpenAiClient, Synchronizer,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "kbweave",
    version,
    about = "Ontology-synchronized knowledge graph with generated content"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Path to the knowledge base JSON file (overrides config)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// More output (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add nodes for ontology items not yet in the knowledge base
    Sync {
        /// Path to the ontology JSON file (overrides config)
        #[arg(long)]
        ontology: Option<PathBuf>,
        /// Report what would change without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Collapse nodes sharing a title into a candidate file
    Dedup {
        /// Candidate output path (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Replace the knowledge base with the candidate afterwards
        #[arg(long)]
        apply: bool,
    },
    /// Generate content for nodes without a body
    Generate {
        /// Regenerate this node even if it already has content
        #[arg(long, value_name = "ID")]
        regenerate: Option<String>,
        /// Stop after this many completion requests
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Report consistency violations in the knowledge base
    Check,
    /// Print the topic tree
    Tree,
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_graph(store: &JsonFileStore) -> Result<KnowledgeGraph, String> {
    sync::load_graph(store)
        .map(|(graph, _)| graph)
        .map_err(|e| format!("Failed to load knowledge base: {}", e))
}

fn cmd_sync(config: &Config, store: &JsonFileStore, ontology: Option<PathBuf>, dry_run: bool) -> i32 {
    let ontology = ontology.unwrap_or_else(|| config.ontology_path.clone());
    match Synchronizer::new(store).dry_run(dry_run).run(&ontology) {
        Ok(report) => {
            let m = &report.migration;
            if !m.is_noop() {
                println!(
                    "Migrated legacy records: {} ids assigned, {} parents resolved, {} unresolved",
                    m.ids_assigned, m.parents_resolved, m.parents_unresolved
                );
            }
            println!(
                "{} ontology items already present, {} added, {} nodes total{}",
                report.matched,
                report.added,
                report.total,
                if dry_run { " (dry run)" } else { "" }
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Synchronization skipped; knowledge base left untouched.");
            1
        }
    }
}

fn cmd_dedup(config: &Config, store: &JsonFileStore, output: Option<PathBuf>, apply: bool) -> i32 {
    let candidate = JsonFileStore::new(output.unwrap_or_else(|| config.dedup_output_path.clone()));
    let report = match dedup::run_dedup(store, &candidate) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    println!("Original node count: {}", report.original);
    println!("Deduplicated node count: {}", report.kept);
    println!("Duplicates removed: {}", report.removed);
    if report.reparented > 0 {
        println!("Nodes re-parented after merging duplicates: {}", report.reparented);
    }
    if report.promoted > 0 {
        println!("Subtopics promoted to topics: {}", report.promoted);
    }

    if !apply {
        println!(
            "Candidate written to {}; rerun with --apply to replace {}",
            candidate.path().display(),
            store.path().display()
        );
        return 0;
    }
    match dedup::apply_candidate(&candidate, store) {
        Ok(n) => {
            println!("Applied candidate ({} nodes) to {}", n, store.path().display());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_generate(
    config: &Config,
    store: JsonFileStore,
    regenerate: Option<String>,
    limit: Option<usize>,
) -> i32 {
    let settings = match config.openai_settings() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let client = match OpenAiClient::new(settings) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut options = config.generation_options();
    options.limit = limit;
    let pipeline = GenerationPipeline::new(Arc::new(client), Arc::new(store)).with_options(options);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        if let Some(id) = regenerate {
            return match pipeline.regenerate(&NodeId::from_string(id)).await {
                Ok(node) => {
                    println!("Regenerated '{}' ({})", node.title, node.id);
                    0
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            };
        }

        match pipeline.run().await {
            Ok(report) => {
                println!(
                    "Generated {}, skipped {} already populated, {} failed{}",
                    report.generated.len(),
                    report.skipped,
                    report.failures.len(),
                    if report.limited { " (limit reached)" } else { "" }
                );
                for failure in &report.failures {
                    println!("  failed: '{}' ({}): {}", failure.title, failure.id, failure.error);
                }
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        }
    })
}

fn cmd_check(store: &JsonFileStore) -> i32 {
    let graph = match load_graph(store) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let violations = graph.check_consistency();
    if violations.is_empty() {
        println!("{} nodes, no violations.", graph.len());
        return 0;
    }
    for violation in &violations {
        println!("{}", violation);
    }
    println!("{} nodes, {} violations.", graph.len(), violations.len());
    1
}

fn print_subtree(graph: &KnowledgeGraph, node: &Node, depth: usize) {
    let marker = if node.is_generated() { "*" } else { " " };
    println!("{}{} {}", "  ".repeat(depth), marker, node.title);
    for child in graph.children_of(&node.id) {
        print_subtree(graph, child, depth + 1);
    }
}

fn cmd_tree(store: &JsonFileStore) -> i32 {
    let graph = match load_graph(store) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if graph.is_empty() {
        println!("Knowledge base is empty.");
        return 0;
    }
    for root in graph.roots() {
        print_subtree(&graph, root, 0);
    }
    let generated = graph.nodes().iter().filter(|n| n.is_generated()).count();
    println!("{}/{} nodes have content (*)", generated, graph.len());
    0
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    let store = JsonFileStore::new(config.store_path.clone());

    let code = match cli.command {
        Commands::Sync { ontology, dry_run } => cmd_sync(&config, &store, ontology, dry_run),
        Commands::Dedup { output, apply } => cmd_dedup(&config, &store, output, apply),
        Commands::Generate { regenerate, limit } => cmd_generate(&config, store, regenerate, limit),
        Commands::Check => cmd_check(&store),
        Commands::Tree => cmd_tree(&store),
    };
    std::process::exit(code);
}
