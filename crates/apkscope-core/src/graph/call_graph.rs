//! Reverse call graph backed by petgraph::DiGraph.
//!
//! Nodes live in the graph arena and are addressed by `NodeIndex`; edges point from a
//! callee to each of its callers, so the outgoing neighbours of a node answer
//! "who calls me".

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

/// A `(class, method)` pair identified by its qualified signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallGraphNode {
    pub class_name: String,
    pub method_name: String,
    /// `"<class_name>.<method_name>"`; overloads collapse onto one signature.
    pub full_signature: String,
}

impl CallGraphNode {
    pub fn new(class_name: &str, method_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            full_signature: signature(class_name, method_name),
        }
    }
}

/// Build the node identity for a class/method pair.
pub fn signature(class_name: &str, method_name: &str) -> String {
    format!("{class_name}.{method_name}")
}

/// Arena of call-graph nodes with an O(1) signature index.
#[derive(Debug, Default)]
pub struct CallGraph {
    graph: DiGraph<CallGraphNode, ()>,
    id_index: HashMap<String, NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the node for a class/method pair. The first writer of a
    /// signature defines the node.
    pub fn ensure_node(&mut self, class_name: &str, method_name: &str) -> NodeIndex {
        let sig = signature(class_name, method_name);
        if let Some(&idx) = self.id_index.get(&sig) {
            idx
        } else {
            let idx = self.graph.add_node(CallGraphNode::new(class_name, method_name));
            self.id_index.insert(sig, idx);
            idx
        }
    }

    pub fn get_node_index(&self, full_signature: &str) -> Option<NodeIndex> {
        self.id_index.get(full_signature).copied()
    }

    pub fn has_node(&self, full_signature: &str) -> bool {
        self.id_index.contains_key(full_signature)
    }

    /// Node data for an index handed out by this graph.
    pub fn node(&self, idx: NodeIndex) -> &CallGraphNode {
        &self.graph[idx]
    }

    /// Record that `caller` invokes `callee`. Self-edges and duplicates are ignored;
    /// returns whether a new edge was added.
    pub fn add_caller(&mut self, callee: NodeIndex, caller: NodeIndex) -> bool {
        if callee == caller || self.graph.find_edge(callee, caller).is_some() {
            return false;
        }
        self.graph.add_edge(callee, caller, ());
        true
    }

    /// Callers of a node, in node creation order.
    pub fn callers(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut callers: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        callers.sort();
        callers
    }

    /// Methods this node was found calling, in node creation order.
    pub fn callees(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut callees: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        callees.sort();
        callees
    }

    /// All node indices in creation order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_deduplicate_by_signature() {
        let mut g = CallGraph::new();
        let a = g.ensure_node("com.example.A", "foo");
        let again = g.ensure_node("com.example.A", "foo");
        assert_eq!(a, again);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.node(a).full_signature, "com.example.A.foo");
        assert!(g.has_node("com.example.A.foo"));
    }

    #[test]
    fn signature_is_case_sensitive() {
        let mut g = CallGraph::new();
        let lower = g.ensure_node("A", "run");
        let upper = g.ensure_node("A", "Run");
        assert_ne!(lower, upper);
    }

    #[test]
    fn caller_edges_point_from_callee() {
        let mut g = CallGraph::new();
        let callee = g.ensure_node("A", "foo");
        let caller = g.ensure_node("B", "bar");
        assert!(g.add_caller(callee, caller));
        assert!(!g.add_caller(callee, caller));
        assert_eq!(g.callers(callee), vec![caller]);
        assert_eq!(g.callees(caller), vec![callee]);
        assert!(g.callers(caller).is_empty());
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn self_edges_are_ignored() {
        let mut g = CallGraph::new();
        let a = g.ensure_node("A", "foo");
        assert!(!g.add_caller(a, a));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn cycles_are_representable() {
        let mut g = CallGraph::new();
        let a = g.ensure_node("A", "ping");
        let b = g.ensure_node("B", "pong");
        g.add_caller(a, b);
        g.add_caller(b, a);
        assert_eq!(g.callers(a), vec![b]);
        assert_eq!(g.callers(b), vec![a]);
    }
}
