//! Call-graph reports: JSON serialisation and text rendering.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::Utc;
use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::analysis::CallGraphResult;
use crate::config::ExportedComponent;
use crate::error::{AnalysisError, Result};

/// Caller trees are cut off below this many levels.
const TREE_DEPTH_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NodeOutput {
    pub signature: String,
    pub class_name: String,
    pub method_name: String,
    pub callers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EntryPointOutput {
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported: Option<ExportedComponent>,
}

/// One level of the caller hierarchy below a target.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallerTree {
    pub signature: String,
    /// Already shown earlier in this tree; its callers are not repeated.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recursive: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub callers: Vec<CallerTree>,
}

/// Serializable view of a [`CallGraphResult`].
#[derive(Debug, Clone, Serialize)]
pub struct CallGraphReport {
    pub query: String,
    pub success: bool,
    pub message: String,
    pub targets: Vec<String>,
    pub entry_points: Vec<EntryPointOutput>,
    pub caller_trees: Vec<CallerTree>,
    pub nodes: Vec<NodeOutput>,
    pub suggestions: Vec<String>,
    pub stats: HashMap<String, serde_json::Value>,
    pub metadata: HashMap<String, serde_json::Value>,
}

fn caller_tree(
    result: &CallGraphResult,
    idx: NodeIndex,
    depth: usize,
    shown: &mut HashSet<NodeIndex>,
) -> CallerTree {
    let signature = result.graph.node(idx).full_signature.clone();
    if !shown.insert(idx) {
        return CallerTree {
            signature,
            recursive: true,
            callers: Vec::new(),
        };
    }
    let callers = if depth < TREE_DEPTH_LIMIT {
        result
            .graph
            .callers(idx)
            .into_iter()
            .map(|caller| caller_tree(result, caller, depth + 1, shown))
            .collect()
    } else {
        Vec::new()
    };
    CallerTree {
        signature,
        recursive: false,
        callers,
    }
}

/// One caller tree per target.
pub fn caller_trees(result: &CallGraphResult) -> Vec<CallerTree> {
    result
        .targets
        .iter()
        .map(|&target| caller_tree(result, target, 0, &mut HashSet::new()))
        .collect()
}

/// Build the report for a finished build of `query` over `input_path`.
pub fn build_report(query: &str, result: &CallGraphResult, input_path: &str) -> CallGraphReport {
    let graph = &result.graph;

    let nodes: Vec<NodeOutput> = graph
        .node_indices()
        .map(|idx| {
            let node = graph.node(idx);
            NodeOutput {
                signature: node.full_signature.clone(),
                class_name: node.class_name.clone(),
                method_name: node.method_name.clone(),
                callers: graph
                    .callers(idx)
                    .into_iter()
                    .map(|c| graph.node(c).full_signature.clone())
                    .collect(),
            }
        })
        .collect();

    let entry_points: Vec<EntryPointOutput> = result
        .entry_points
        .iter()
        .map(|e| EntryPointOutput {
            signature: graph.node(e.node).full_signature.clone(),
            exported: e.exported.clone(),
        })
        .collect();

    let exported_entries = entry_points.iter().filter(|e| e.exported.is_some()).count();

    let mut stats = HashMap::new();
    stats.insert("nodes".to_string(), serde_json::json!(graph.node_count()));
    stats.insert("edges".to_string(), serde_json::json!(graph.edge_count()));
    stats.insert("targets".to_string(), serde_json::json!(result.targets.len()));
    stats.insert(
        "entry_points".to_string(),
        serde_json::json!(entry_points.len()),
    );
    stats.insert(
        "exported_entry_points".to_string(),
        serde_json::json!(exported_entries),
    );

    let mut metadata = HashMap::new();
    metadata.insert(
        "input_path".to_string(),
        serde_json::Value::String(input_path.to_string()),
    );
    metadata.insert(
        "generated_at".to_string(),
        serde_json::Value::String(Utc::now().to_rfc3339()),
    );
    metadata.insert(
        "apkscope_version".to_string(),
        serde_json::Value::String(env!("CARGO_PKG_VERSION").to_string()),
    );

    CallGraphReport {
        query: query.to_string(),
        success: result.success,
        message: result.message.clone(),
        targets: result
            .target_nodes()
            .iter()
            .map(|n| n.full_signature.clone())
            .collect(),
        entry_points,
        caller_trees: caller_trees(result),
        nodes,
        suggestions: result.suggestions.clone(),
        stats,
        metadata,
    }
}

fn render_tree(tree: &CallerTree, depth: usize, out: &mut String) {
    for i in 0..depth {
        out.push_str(if i + 1 == depth { "└── " } else { "    " });
    }
    out.push_str(&tree.signature);
    if tree.recursive {
        out.push_str(" [RECURSIVE]");
    }
    out.push('\n');
    for caller in &tree.callers {
        render_tree(caller, depth + 1, out);
    }
}

/// Render every target's caller hierarchy, callers indented below their callee.
pub fn render_call_tree(result: &CallGraphResult) -> String {
    let mut out = String::new();
    for tree in caller_trees(result) {
        render_tree(&tree, 0, &mut out);
    }
    out
}

/// Write any serialisable report as pretty JSON, creating parent directories.
pub fn write_output<T: Serialize>(report: &T, output_path: impl AsRef<Path>) -> Result<()> {
    let output_path = output_path.as_ref();
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AnalysisError::io(parent, e))?;
    }
    let json =
        serde_json::to_string_pretty(report).map_err(|e| AnalysisError::json(output_path, e))?;
    std::fs::write(output_path, json).map_err(|e| AnalysisError::io(output_path, e))
}
