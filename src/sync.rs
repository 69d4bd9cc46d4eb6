//! Ontology synchronization
//!
//! Reconciles the authoring-time ontology tree with the flat node store:
//!
//! 1. Legacy migration: records without `id` get one; a legacy
//!    `parent_category` title is resolved to the first node with that title
//!    (collection order) and rewritten as `parent_id`.
//! 2. The ontology is flattened depth-first into fresh nodes.
//! 3. Each flattened node is matched against existing nodes by identity key
//!    `(title, parent_id)`. A match is recorded so that the node's ontology
//!    children are keyed against the existing parent id; only unmatched nodes
//!    are appended.
//!
//! Running the pass twice against the same ontology adds nothing the second
//! time. Existing nodes are never removed, and `body`/`metadata` are never
//! touched.

use crate::graph::{KnowledgeGraph, Node, NodeId, NodeRecord};
use crate::ontology::{self, OntologyError, OntologyItem};
use crate::storage::{NodeStore, StorageError, StorageResult};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors that abort a synchronization pass before anything is written
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What legacy migration changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Records that had no `id` and received a fresh one
    pub ids_assigned: usize,
    /// Legacy parent titles rewritten as `parent_id` (including explicit nulls)
    pub parents_resolved: usize,
    /// Legacy parent titles that matched no node
    pub parents_unresolved: usize,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.ids_assigned == 0 && self.parents_resolved == 0 && self.parents_unresolved == 0
    }
}

/// Outcome of a synchronization pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub migration: MigrationReport,
    /// Ontology items already represented in the store
    pub matched: usize,
    /// Nodes appended for ontology items not yet represented
    pub added: usize,
    /// Node count after the pass
    pub total: usize,
}

/// Turn stored records into canonical nodes.
pub fn migrate_legacy(records: Vec<NodeRecord>) -> (Vec<Node>, MigrationReport) {
    let mut report = MigrationReport::default();

    let ids: Vec<NodeId> = records
        .iter()
        .map(|r| match &r.id {
            Some(id) => id.clone(),
            None => {
                report.ids_assigned += 1;
                NodeId::new()
            }
        })
        .collect();

    // title -> ids of the records carrying it, in collection order
    let mut by_title: HashMap<&str, Vec<&NodeId>> = HashMap::new();
    for (record, id) in records.iter().zip(&ids) {
        by_title.entry(record.title.as_str()).or_default().push(id);
    }

    let resolved: Vec<Option<Option<NodeId>>> = records
        .iter()
        .zip(&ids)
        .map(|(record, id)| match &record.legacy_parent {
            None => None,
            Some(None) => {
                report.parents_resolved += 1;
                Some(None)
            }
            Some(Some(title)) => match by_title
                .get(title.as_str())
                .and_then(|candidates| candidates.iter().find(|&&p| p != id))
            {
                Some(parent) => {
                    report.parents_resolved += 1;
                    Some(Some((*parent).clone()))
                }
                None => {
                    report.parents_unresolved += 1;
                    tracing::warn!(
                        node = %id,
                        title = %record.title,
                        parent_title = %title,
                        "legacy parent reference matches no node; leaving parent_id unchanged"
                    );
                    None
                }
            },
        })
        .collect();

    let nodes = records
        .into_iter()
        .zip(ids)
        .zip(resolved)
        .map(|((record, id), parent)| Node {
            id,
            category: record.category,
            title: record.title,
            body: record.body,
            parent_id: parent.unwrap_or(record.parent_id),
            metadata: record.metadata,
            extra: record.extra,
        })
        .collect();

    (nodes, report)
}

/// Append nodes for ontology items not yet represented.
///
/// Returns `(matched, added)`.
pub fn merge_ontology(graph: &mut KnowledgeGraph, items: &[OntologyItem]) -> (usize, usize) {
    let mut keys = graph.identity_index();
    // flattened id -> id the item is represented by in the graph
    let mut canonical: HashMap<NodeId, NodeId> = HashMap::new();
    let (mut matched, mut added) = (0, 0);

    for mut node in ontology::flatten(items) {
        if let Some(parent) = node.parent_id.take() {
            node.parent_id = Some(canonical.get(&parent).cloned().unwrap_or(parent));
        }

        let key = node.identity_key();
        match keys.get(&key) {
            Some(existing) => {
                canonical.insert(node.id.clone(), existing.clone());
                matched += 1;
            }
            None => {
                tracing::info!(title = %node.title, id = %node.id, category = %node.category, "adding node");
                keys.insert(key, node.id.clone());
                canonical.insert(node.id.clone(), node.id.clone());
                graph.push(node);
                added += 1;
            }
        }
    }

    (matched, added)
}

/// Migrate `records` and merge the ontology into them
pub fn synchronize(records: Vec<NodeRecord>, items: &[OntologyItem]) -> (KnowledgeGraph, SyncReport) {
    let (nodes, migration) = migrate_legacy(records);
    let mut graph = KnowledgeGraph::from_nodes(nodes);
    let (matched, added) = merge_ontology(&mut graph, items);
    let report = SyncReport {
        migration,
        matched,
        added,
        total: graph.len(),
    };
    (graph, report)
}

/// Load the store and migrate any legacy records
pub fn load_graph(store: &dyn NodeStore) -> StorageResult<(KnowledgeGraph, MigrationReport)> {
    let (nodes, migration) = migrate_legacy(store.load()?);
    if !migration.is_noop() {
        tracing::info!(
            ids_assigned = migration.ids_assigned,
            parents_resolved = migration.parents_resolved,
            "migrated legacy records"
        );
    }
    Ok((KnowledgeGraph::from_nodes(nodes), migration))
}

/// Runs a full synchronization pass against a store
pub struct Synchronizer<'a> {
    store: &'a dyn NodeStore,
    dry_run: bool,
}

impl<'a> Synchronizer<'a> {
    pub fn new(store: &'a dyn NodeStore) -> Self {
        Self {
            store,
            dry_run: false,
        }
    }

    /// Compute the report without saving
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Synchronize against the ontology file at `ontology_path`.
    ///
    /// The ontology is read first; if it is missing or corrupt the store is
    /// not touched. A missing store starts empty, a corrupt one aborts.
    pub fn run(&self, ontology_path: &Path) -> Result<SyncReport, SyncError> {
        tracing::info!(path = %ontology_path.display(), "loading ontology");
        let items = ontology::load_ontology(ontology_path)?;

        tracing::info!(store = %self.store.describe(), "loading knowledge base");
        let records = self.store.load_or_empty()?;

        let (graph, report) = synchronize(records, &items);

        if report.added == 0 {
            tracing::info!("knowledge base is up to date with the ontology");
        } else {
            tracing::info!(added = report.added, "added new nodes from the ontology");
        }

        if self.dry_run {
            tracing::info!("dry run, not saving");
        } else {
            self.store.save(graph.nodes())?;
        }
        Ok(report)
    }
}
