//! Constraint provenance graph using petgraph
//!
//! Nodes are feature ids (or the printable provenance of constraints that
//! have no source feature). Each edge is a constraint, pointing from the
//! feature that asserted it to the feature it restricts. Walking incoming
//! edges from a failing id explains how the solver got there.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use plinth_core::types::TargetConstraint;

/// Graph of constraints keyed by the feature ids they connect
#[derive(Debug, Default)]
pub struct ProvenanceGraph {
    /// Underlying directed graph
    graph: DiGraph<String, TargetConstraint>,
    /// Map from label to NodeIndex for fast lookups
    node_map: HashMap<String, NodeIndex>,
}

impl ProvenanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a set of constraints
    pub fn from_constraints<'a, I>(constraints: I) -> Self
    where
        I: IntoIterator<Item = &'a TargetConstraint>,
    {
        let mut graph = Self::new();
        for constraint in constraints {
            graph.add_constraint(constraint);
        }
        graph
    }

    fn node(&mut self, label: &str) -> NodeIndex {
        if let Some(index) = self.node_map.get(label) {
            return *index;
        }
        let index = self.graph.add_node(label.to_string());
        self.node_map.insert(label.to_string(), index);
        index
    }

    /// Add a constraint edge; identical constraints are stored once
    pub fn add_constraint(&mut self, constraint: &TargetConstraint) {
        let source = match constraint.source.source_logical_id() {
            Some(id) => id.to_string(),
            None => constraint.source.source_path_string(),
        };
        let from = self.node(&source);
        let to = self.node(&constraint.target_id);

        if self.graph.edges_connecting(from, to).any(|edge| edge.weight() == constraint) {
            return;
        }
        self.graph.add_edge(from, to, constraint.clone());
    }

    pub fn contains(&self, label: &str) -> bool {
        self.node_map.contains_key(label)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn constraint_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Render the tree of constraints leading to each root.
    ///
    /// `describe` annotates a node label, e.g. with the version chosen for
    /// it. Nodes already printed are not expanded a second time.
    pub fn render<F>(&self, roots: &[&str], describe: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = String::new();
        let mut visited = HashSet::new();
        for root in roots {
            if let Some(index) = self.node_map.get(*root) {
                self.render_node(*index, 0, &describe, &mut visited, &mut out);
            }
        }
        out.truncate(out.trim_end().len());
        out
    }

    fn render_node<F>(
        &self,
        index: NodeIndex,
        depth: usize,
        describe: &F,
        visited: &mut HashSet<NodeIndex>,
        out: &mut String,
    ) where
        F: Fn(&str) -> Option<String>,
    {
        let label = &self.graph[index];
        let indent = "  ".repeat(depth);
        let _ = match describe(label) {
            Some(description) => writeln!(out, "{}{} {}", indent, label, description),
            None => writeln!(out, "{}{}", indent, label),
        };

        if !visited.insert(index) {
            return;
        }

        let mut incoming: Vec<_> = self.graph.edges_directed(index, Direction::Incoming).collect();
        incoming.sort_by(|a, b| a.weight().cmp(b.weight()));

        for edge in incoming {
            let constraint = edge.weight();
            let optional = if constraint.required { "" } else { " (optional)" };
            let _ = writeln!(
                out,
                "{}  <- requires {}{} from {}",
                indent, constraint.range, optional, constraint.source
            );
            self.render_node(edge.source(), depth + 2, describe, visited, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_core::types::{ConstraintSource, Range};

    fn constraint(source: &str, target_id: &str, range: &str) -> TargetConstraint {
        TargetConstraint::new(
            ConstraintSource::Feature(source.parse().unwrap()),
            target_id,
            range.parse::<Range>().unwrap(),
        )
    }

    #[test]
    fn test_graph_creation() {
        let graph = ProvenanceGraph::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.constraint_count(), 0);
    }

    #[test]
    fn test_duplicate_constraints_stored_once() {
        let c = constraint("a 1.0.0", "b", "[1.0.0,2.0.0)");
        let graph = ProvenanceGraph::from_constraints([&c, &c]);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.constraint_count(), 1);
        assert!(graph.contains("a"));
        assert!(graph.contains("b"));
    }

    #[test]
    fn test_render_walks_back_to_roots() {
        let ab = constraint("a 1.0.0", "b", "[1.0.0,2.0.0)");
        let bc = constraint("b 1.0.0", "c", "[1.0.0,)");
        let graph = ProvenanceGraph::from_constraints([&ab, &bc]);

        let rendered = graph.render(&["c"], |id| match id {
            "a" => Some("starting 1.0.0".to_string()),
            "b" => Some("chosen 1.0.0".to_string()),
            _ => None,
        });

        let expected = "\
c
  <- requires [1.0.0,) from b 1.0.0
    b chosen 1.0.0
      <- requires [1.0.0,2.0.0) from a 1.0.0
        a starting 1.0.0";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_render_terminates_on_cycles() {
        let ab = constraint("a 1.0.0", "b", "[1.0.0,)");
        let ba = constraint("b 1.0.0", "a", "[1.0.0,)");
        let graph = ProvenanceGraph::from_constraints([&ab, &ba]);

        let rendered = graph.render(&["a"], |_| None);
        assert_eq!(rendered.lines().count(), 5);
    }

    #[test]
    fn test_sourceless_constraints_use_provenance_label() {
        let c = TargetConstraint::new(ConstraintSource::Url("site.xml".into()), "b", Range::any());
        let graph = ProvenanceGraph::from_constraints([&c]);
        assert!(graph.contains("site.xml"));
        assert_eq!(graph.render(&["missing"], |_| None), "");
    }
}
