//! Bounded-depth reverse call-graph construction.
//!
//! Starting from the resolved targets, every class whose text mentions the current
//! method name is scanned for callers; each caller found is recorded and scanned in
//! turn until the depth bound is reached. Class scanning fans out over rayon, and the
//! results are merged serially in corpus order.

use std::collections::HashSet;

use log::{debug, info};
use petgraph::graph::NodeIndex;
use rayon::prelude::*;

use super::edges::{EdgeDetector, TargetMatcher};
use super::resolver::{resolve_targets, MethodRef, Resolution};
use crate::config::{AnalysisConfig, ClassUnit, ExportedComponent};
use crate::corpus::Corpus;
use crate::error::Result;
use crate::graph::{CallGraph, CallGraphNode};

/// An entry point, annotated with the exported component declaring its class.
#[derive(Debug, Clone)]
pub struct EntryPoint {
    pub node: NodeIndex,
    pub exported: Option<ExportedComponent>,
}

/// Outcome of one build.
#[derive(Debug)]
pub struct CallGraphResult {
    pub success: bool,
    pub message: String,
    pub graph: CallGraph,
    pub targets: Vec<NodeIndex>,
    pub entry_points: Vec<EntryPoint>,
    /// Similar method names, populated only when nothing resolved.
    pub suggestions: Vec<String>,
}

impl CallGraphResult {
    fn not_found(message: String, suggestions: Vec<String>) -> Self {
        Self {
            success: false,
            message,
            graph: CallGraph::new(),
            targets: Vec::new(),
            entry_points: Vec::new(),
            suggestions,
        }
    }

    pub fn target_nodes(&self) -> Vec<&CallGraphNode> {
        self.targets.iter().map(|&idx| self.graph.node(idx)).collect()
    }

    pub fn entry_point_nodes(&self) -> Vec<&CallGraphNode> {
        self.entry_points
            .iter()
            .map(|e| self.graph.node(e.node))
            .collect()
    }

    pub fn is_target(&self, idx: NodeIndex) -> bool {
        self.targets.contains(&idx)
    }
}

/// State shared across every target of one build.
#[derive(Default)]
struct Traversal {
    graph: CallGraph,
    visited: HashSet<NodeIndex>,
}

/// Reverse call-graph builder over a read-only corpus.
pub struct CallGraphBuilder<'a> {
    corpus: &'a Corpus,
    components: &'a [ExportedComponent],
    detector: EdgeDetector,
    max_depth: usize,
    suggestion_limit: usize,
    parallel: bool,
}

impl<'a> CallGraphBuilder<'a> {
    pub fn new(corpus: &'a Corpus) -> Self {
        let defaults = AnalysisConfig::default();
        Self {
            corpus,
            components: &[],
            detector: EdgeDetector::default(),
            max_depth: defaults.max_depth,
            suggestion_limit: defaults.suggestion_limit,
            parallel: defaults.parallel,
        }
    }

    /// Builder taking depth, suggestion cap, parallelism and confirmers from `config`.
    pub fn with_config(corpus: &'a Corpus, config: &AnalysisConfig) -> Result<Self> {
        Ok(Self {
            corpus,
            components: &[],
            detector: EdgeDetector::new(&config.confirmers)?,
            max_depth: config.max_depth,
            suggestion_limit: config.suggestion_limit,
            parallel: config.parallel,
        })
    }

    /// Exported components used to annotate entry points.
    pub fn components(mut self, components: &'a [ExportedComponent]) -> Self {
        self.components = components;
        self
    }

    pub fn detector(mut self, detector: EdgeDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = limit;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Resolve `query` and build the reverse call graph of every match.
    pub fn build(&self, query: &str) -> CallGraphResult {
        match resolve_targets(query, self.corpus, self.suggestion_limit) {
            Resolution::Targets(targets) => self.build_from(&targets),
            Resolution::Suggestions(suggestions) => {
                info!(
                    "No method matches '{}' ({} suggestions)",
                    query,
                    suggestions.len()
                );
                CallGraphResult::not_found(format!("Method not found: {query}"), suggestions)
            }
        }
    }

    /// Build the reverse call graph of already-resolved targets.
    pub fn build_from(&self, targets: &[MethodRef]) -> CallGraphResult {
        if targets.is_empty() {
            return CallGraphResult::not_found("No target methods given".to_string(), Vec::new());
        }

        let mut ctx = Traversal::default();
        let target_nodes: Vec<NodeIndex> = targets
            .iter()
            .map(|t| ctx.graph.ensure_node(&t.class_name, &t.method_name))
            .collect();

        for &target in &target_nodes {
            debug!("Tracing callers of {}", ctx.graph.node(target).full_signature);
            self.find_callers(&mut ctx, target, 0);
        }

        let target_set: HashSet<NodeIndex> = target_nodes.iter().copied().collect();
        let entry_points: Vec<EntryPoint> = ctx
            .graph
            .node_indices()
            .filter(|idx| !target_set.contains(idx) && ctx.graph.callers(*idx).is_empty())
            .map(|node| EntryPoint {
                node,
                exported: self.exported_component_for(ctx.graph.node(node)),
            })
            .collect();

        info!(
            "Call graph: {} targets, {} nodes, {} edges, {} entry points",
            target_nodes.len(),
            ctx.graph.node_count(),
            ctx.graph.edge_count(),
            entry_points.len()
        );

        CallGraphResult {
            success: true,
            message: "Call graph generated successfully".to_string(),
            graph: ctx.graph,
            targets: target_nodes,
            entry_points,
            suggestions: Vec::new(),
        }
    }

    fn find_callers(&self, ctx: &mut Traversal, node: NodeIndex, depth: usize) {
        if depth >= self.max_depth || !ctx.visited.insert(node) {
            return;
        }

        let method = ctx.graph.node(node).method_name.clone();
        for (caller_class, caller_method) in self.scan_callers(&method) {
            let caller = ctx.graph.ensure_node(caller_class, caller_method);
            if caller == node {
                continue;
            }
            ctx.graph.add_caller(node, caller);
            self.find_callers(ctx, caller, depth + 1);
        }
    }

    /// Every `(class, method)` in the corpus whose body calls `method`, in corpus
    /// order.
    fn scan_callers(&self, method: &str) -> Vec<(&'a str, &'a str)> {
        let Some(matcher) = self.detector.matcher(method) else {
            return Vec::new();
        };
        let classes = self.corpus.classes();
        let per_class: Vec<Vec<(&'a str, &'a str)>> = if self.parallel {
            classes
                .par_iter()
                .map(|class| callers_in(class, &matcher))
                .collect()
        } else {
            classes.iter().map(|class| callers_in(class, &matcher)).collect()
        };
        per_class.into_iter().flatten().collect()
    }

    fn exported_component_for(&self, node: &CallGraphNode) -> Option<ExportedComponent> {
        self.components
            .iter()
            .find(|c| node.full_signature.starts_with(&format!("{}.", c.name)))
            .cloned()
    }
}

fn callers_in<'c>(class: &'c ClassUnit, matcher: &TargetMatcher) -> Vec<(&'c str, &'c str)> {
    if !class.source.contains(matcher.method()) {
        return Vec::new();
    }
    class
        .methods
        .iter()
        .filter(|m| matcher.calls_target(&class.source, m))
        .map(|m| (class.full_name.as_str(), m.as_str()))
        .collect()
}

/// Build a call graph for `query` with default settings.
pub fn build_call_graph(
    query: &str,
    corpus: &Corpus,
    components: &[ExportedComponent],
) -> CallGraphResult {
    CallGraphBuilder::new(corpus).components(components).build(query)
}
