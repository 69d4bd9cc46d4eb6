//! Core graph data structures

mod arena;
mod node;


pub use arena::{KnowledgeGraph, Violation};
pub use node::{Category, ExtraFields, IdentityKey, Node, NodeId, NodeRecord};
