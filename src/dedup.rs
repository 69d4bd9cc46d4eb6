//! Title-based deduplication
//!
//! Nodes are grouped by `title` alone, which is coarser than the identity
//! key used by sync. From each group the first member carrying `metadata`
//! survives, or the first member if none does. Ties break on collection
//! order.
//!
//! Discarded nodes are merged into their survivor and the result is still a
//! forest. Children of a discarded node move under its survivor. A survivor
//! that sat below one of its own discarded duplicates takes the place of the
//! topmost such duplicate; if that place is the root level the survivor
//! becomes a `TOPIC`.
//!
//! The result is a candidate collection. It is written to a separate file
//! and only replaces the canonical store when explicitly applied.

use crate::graph::{Category, KnowledgeGraph, Node, NodeId};
use crate::storage::{NodeStore, StorageResult};
use crate::sync;
use std::collections::{HashMap, HashSet};

/// Outcome of a deduplication pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupReport {
    pub original: usize,
    pub kept: usize,
    pub removed: usize,
    /// Survivors whose `parent_id` changed because a duplicate was merged away
    pub reparented: usize,
    /// Subtopics that took a discarded topic's place and became topics
    pub promoted: usize,
}

/// Collapse nodes sharing a title. Output order follows each title's first
/// appearance.
pub fn deduplicate(nodes: Vec<Node>) -> (Vec<Node>, DedupReport) {
    let original = nodes.len();

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (pos, node) in nodes.iter().enumerate() {
        groups
            .entry(node.title.as_str())
            .or_insert_with(|| {
                order.push(node.title.as_str());
                Vec::new()
            })
            .push(pos);
    }

    // discarded id -> surviving id
    let mut replaced: HashMap<NodeId, NodeId> = HashMap::new();
    let mut keep: Vec<usize> = Vec::with_capacity(order.len());
    for title in &order {
        let members = &groups[title];
        let winner = members
            .iter()
            .copied()
            .find(|&pos| nodes[pos].metadata.is_some())
            .unwrap_or(members[0]);
        if members.len() > 1 {
            tracing::debug!(title = %title, duplicates = members.len() - 1, "collapsing duplicates");
        }
        for &pos in members {
            if pos != winner {
                replaced.insert(nodes[pos].id.clone(), nodes[winner].id.clone());
            }
        }
        keep.push(winner);
    }

    // parent links of the input, discarded nodes included
    let mut parents: HashMap<NodeId, Option<NodeId>> = HashMap::with_capacity(original);
    for node in &nodes {
        parents
            .entry(node.id.clone())
            .or_insert_with(|| node.parent_id.clone());
    }

    let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
    let mut kept: Vec<Node> = keep
        .into_iter()
        .filter_map(|pos| slots[pos].take())
        .collect();

    let mut links: HashMap<NodeId, Option<NodeId>> = kept
        .iter()
        .map(|node| (node.id.clone(), merged_parent(node, &parents, &replaced)))
        .collect();

    // Merging duplicates from different branches can still close a loop.
    // Break it by moving the node under its nearest original ancestor that
    // does not lead back to it.
    for node in &kept {
        let looped = reaches(
            links.get(&node.id).and_then(Option::as_ref),
            &node.id,
            &links,
        );
        if !looped {
            continue;
        }
        let fallback = ancestors(node, &parents)
            .into_iter()
            .map(|id| resolve(id, &replaced))
            .find(|candidate| *candidate != node.id && !reaches(Some(candidate), &node.id, &links));
        tracing::warn!(title = %node.title, id = %node.id, "merged duplicates formed a parent cycle; re-parenting");
        links.insert(node.id.clone(), fallback);
    }

    let (mut reparented, mut promoted) = (0, 0);
    for node in &mut kept {
        let link = links.get(&node.id).cloned().flatten();
        if link == node.parent_id {
            continue;
        }
        if link.is_none() && node.category == Category::Subtopic {
            node.category = Category::Topic;
            promoted += 1;
        }
        node.parent_id = link;
        reparented += 1;
    }

    let report = DedupReport {
        original,
        kept: kept.len(),
        removed: original - kept.len(),
        reparented,
        promoted,
    };
    (kept, report)
}

/// The parent a kept node ends up with once discarded duplicates are gone.
fn merged_parent(
    node: &Node,
    parents: &HashMap<NodeId, Option<NodeId>>,
    replaced: &HashMap<NodeId, NodeId>,
) -> Option<NodeId> {
    let mut base = node.parent_id.clone();
    let mut seen = HashSet::new();
    let mut cursor = node.parent_id.clone();
    while let Some(id) = cursor {
        if !seen.insert(id.clone()) {
            break;
        }
        let next = parents.get(&id).cloned().flatten();
        // an ancestor merged into this very node: take its place
        if replaced.get(&id) == Some(&node.id) {
            base = next.clone();
        }
        cursor = next;
    }
    base.map(|id| resolve(id, replaced))
}

fn resolve(id: NodeId, replaced: &HashMap<NodeId, NodeId>) -> NodeId {
    replaced.get(&id).cloned().unwrap_or(id)
}

/// Input ancestors of `node`, nearest first
fn ancestors(node: &Node, parents: &HashMap<NodeId, Option<NodeId>>) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = Vec::new();
    let mut cursor = node.parent_id.clone();
    while let Some(id) = cursor {
        if id == node.id || out.contains(&id) {
            break;
        }
        cursor = parents.get(&id).cloned().flatten();
        out.push(id);
    }
    out
}

/// Whether following `links` from `start` arrives at `target`
fn reaches<'a>(
    start: Option<&'a NodeId>,
    target: &NodeId,
    links: &'a HashMap<NodeId, Option<NodeId>>,
) -> bool {
    let mut seen = HashSet::new();
    let mut cursor = start;
    while let Some(id) = cursor {
        if id == target {
            return true;
        }
        if !seen.insert(id) {
            return false;
        }
        cursor = links.get(id).and_then(Option::as_ref);
    }
    false
}

/// Deduplicate `source` and write the candidate collection to `candidate`.
///
/// `source` is only read. Use [`apply_candidate`] to promote the result.
pub fn run_dedup(source: &dyn NodeStore, candidate: &dyn NodeStore) -> StorageResult<DedupReport> {
    let (graph, _) = sync::load_graph(source)?;
    let (nodes, report) = deduplicate(graph.into_nodes());

    let violations = KnowledgeGraph::from_nodes(nodes.clone()).check_consistency();
    for violation in &violations {
        tracing::warn!(%violation, "candidate is inconsistent");
    }

    candidate.save(&nodes)?;
    tracing::info!(
        original = report.original,
        kept = report.kept,
        removed = report.removed,
        candidate = %candidate.describe(),
        "deduplication complete"
    );
    Ok(report)
}

/// Replace the canonical store with a previously written candidate
pub fn apply_candidate(candidate: &dyn NodeStore, canonical: &dyn NodeStore) -> StorageResult<usize> {
    let (graph, _) = sync::load_graph(candidate)?;
    canonical.save(graph.nodes())?;
    tracing::info!(nodes = graph.len(), store = %canonical.describe(), "candidate applied");
    Ok(graph.len())
}
