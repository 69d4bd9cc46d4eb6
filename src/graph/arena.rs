//! KnowledgeGraph: flat node arena indexed by id
//!
//! The tree is never materialized. Parent links are `NodeId`s resolved by
//! lookup, so the forest shape is an invariant checked by
//! [`KnowledgeGraph::check_consistency`] rather than guaranteed by the type.

use super::node::{Category, IdentityKey, Node, NodeId};
use std::collections::{HashMap, HashSet};

/// A consistency violation found in a node collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// `parent_id` points at no node in the collection
    DanglingReference { node: NodeId, parent: NodeId },
    /// Following parent links from `node` loops back on itself
    Cycle { node: NodeId },
    /// Two nodes share a `(title, parent_id)` key
    DuplicateIdentity { title: String, parent: Option<NodeId> },
    /// Two nodes share an id
    DuplicateId { id: NodeId },
    /// A TOPIC with a parent or a SUBTOPIC without one
    CategoryMismatch { node: NodeId, category: Category },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::DanglingReference { node, parent } => {
                write!(f, "node {} references missing parent {}", node, parent)
            }
            Violation::Cycle { node } => write!(f, "node {} is part of a parent cycle", node),
            Violation::DuplicateIdentity { title, parent } => match parent {
                Some(p) => write!(f, "duplicate identity key ('{}', {})", title, p),
                None => write!(f, "duplicate identity key ('{}', null)", title),
            },
            Violation::DuplicateId { id } => write!(f, "duplicate node id {}", id),
            Violation::CategoryMismatch { node, category } => {
                write!(f, "node {} has category {} inconsistent with its parent link", node, category)
            }
        }
    }
}

/// The knowledge graph as an ordered arena of nodes.
///
/// Collection order is preserved; it is the tie-break for every
/// "first match wins" policy in sync and dedup.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    nodes: Vec<Node>,
    /// id -> position in `nodes` (first occurrence wins on duplicate ids)
    index: HashMap<NodeId, usize>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut index = HashMap::with_capacity(nodes.len());
        for (pos, node) in nodes.iter().enumerate() {
            index.entry(node.id.clone()).or_insert(pos);
        }
        Self { nodes, index }
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        match self.index.get(id) {
            Some(&pos) => self.nodes.get_mut(pos),
            None => None,
        }
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Append a node. The caller is responsible for identity-key uniqueness.
    pub fn push(&mut self, node: Node) {
        self.index.entry(node.id.clone()).or_insert(self.nodes.len());
        self.nodes.push(node);
    }

    /// Resolve a node's parent by lookup
    pub fn parent_of(&self, node: &Node) -> Option<&Node> {
        node.parent_id.as_ref().and_then(|p| self.get(p))
    }

    /// Ids of nodes in the given category, in collection order
    pub fn ids_in(&self, category: Category) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.category == category)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Direct children of `id`, in collection order
    pub fn children_of<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parent_id.as_ref() == Some(id))
    }

    /// Nodes with no parent link, in collection order
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.parent_id.is_none())
    }

    /// Identity key -> id of the first node carrying it
    pub fn identity_index(&self) -> HashMap<IdentityKey, NodeId> {
        let mut keys = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            keys.entry(node.identity_key()).or_insert_with(|| node.id.clone());
        }
        keys
    }

    /// Number of parent hops from `id` to its root.
    ///
    /// Returns `None` when the chain is dangling or cyclic.
    pub fn depth(&self, id: &NodeId) -> Option<usize> {
        let mut current = self.get(id)?;
        let mut seen = HashSet::new();
        let mut depth = 0;
        while let Some(parent) = &current.parent_id {
            if !seen.insert(current.id.clone()) {
                return None;
            }
            current = self.get(parent)?;
            depth += 1;
        }
        Some(depth)
    }

    /// Check the forest invariants: unique ids, unique identity keys,
    /// resolvable parents, no cycles, category consistent with parent link.
    pub fn check_consistency(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(&node.id) {
                violations.push(Violation::DuplicateId { id: node.id.clone() });
            }
            if !keys.insert(node.identity_key()) {
                violations.push(Violation::DuplicateIdentity {
                    title: node.title.clone(),
                    parent: node.parent_id.clone(),
                });
            }
            let mismatched = match node.category {
                Category::Topic => node.parent_id.is_some(),
                Category::Subtopic => node.parent_id.is_none(),
            };
            if mismatched {
                violations.push(Violation::CategoryMismatch {
                    node: node.id.clone(),
                    category: node.category,
                });
            }
        }

        for node in &self.nodes {
            let Some(parent) = &node.parent_id else {
                continue;
            };
            if !self.contains(parent) {
                violations.push(Violation::DanglingReference {
                    node: node.id.clone(),
                    parent: parent.clone(),
                });
            } else if self.depth(&node.id).is_none() {
                violations.push(Violation::Cycle { node: node.id.clone() });
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level() -> (KnowledgeGraph, NodeId, NodeId) {
        let topic = Node::topic("Communication");
        let sub = Node::subtopic("Email Etiquette", topic.id.clone());
        let (tid, sid) = (topic.id.clone(), sub.id.clone());
        (KnowledgeGraph::from_nodes(vec![topic, sub]), tid, sid)
    }

    #[test]
    fn parent_resolves_by_lookup() {
        let (graph, tid, sid) = two_level();
        let sub = graph.get(&sid).unwrap();
        assert_eq!(graph.parent_of(sub).unwrap().id, tid);
        assert_eq!(graph.depth(&sid), Some(1));
        assert_eq!(graph.depth(&tid), Some(0));
    }

    #[test]
    fn consistent_forest_has_no_violations() {
        let (graph, _, _) = two_level();
        assert!(graph.check_consistency().is_empty());
    }

    #[test]
    fn dangling_parent_is_reported() {
        let orphan = Node::subtopic("Orphan", NodeId::from_string("missing"));
        let graph = KnowledgeGraph::from_nodes(vec![orphan]);
        let violations = graph.check_consistency();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::DanglingReference { .. })));
    }

    #[test]
    fn cycle_is_reported_and_depth_is_none() {
        let mut a = Node::subtopic("A", NodeId::from_string("b"));
        a.id = NodeId::from_string("a");
        let mut b = Node::subtopic("B", NodeId::from_string("a"));
        b.id = NodeId::from_string("b");
        let graph = KnowledgeGraph::from_nodes(vec![a, b]);

        assert_eq!(graph.depth(&NodeId::from_string("a")), None);
        let cycles = graph
            .check_consistency()
            .into_iter()
            .filter(|v| matches!(v, Violation::Cycle { .. }))
            .count();
        assert_eq!(cycles, 2);
    }

    #[test]
    fn duplicate_identity_and_category_mismatch() {
        let t1 = Node::topic("Same");
        let t2 = Node::topic("Same");
        let mut stray = Node::topic("Stray");
        stray.parent_id = Some(t1.id.clone());
        let graph = KnowledgeGraph::from_nodes(vec![t1, t2, stray]);

        let violations = graph.check_consistency();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::DuplicateIdentity { title, .. } if title == "Same")));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::CategoryMismatch { category: Category::Topic, .. })));
    }

    #[test]
    fn identity_index_keeps_first_occurrence() {
        let first = Node::topic("Dup");
        let second = Node::topic("Dup");
        let first_id = first.id.clone();
        let graph = KnowledgeGraph::from_nodes(vec![first, second]);
        let index = graph.identity_index();
        assert_eq!(index.len(), 1);
        assert_eq!(index[&IdentityKey::new("Dup", None)], first_id);
    }

    #[test]
    fn push_and_children() {
        let (mut graph, tid, _) = two_level();
        graph.push(Node::subtopic("Meetings", tid.clone()));
        let titles: Vec<_> = graph.children_of(&tid).map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Email Etiquette", "Meetings"]);
        assert_eq!(graph.roots().count(), 1);
    }
}
