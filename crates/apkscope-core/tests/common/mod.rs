//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use apkscope_core::analysis::CallGraphResult;
use apkscope_core::config::AnalysisConfig;
use apkscope_core::corpus::{load_corpus, Corpus};
use apkscope_core::session::AnalysisSession;

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

pub const APP: &str = "decompiled_app";

pub fn fixture_config(name: &str) -> AnalysisConfig {
    AnalysisConfig {
        input_path: fixture_path(name).to_string_lossy().to_string(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

pub fn load_fixture(name: &str) -> Corpus {
    load_corpus(fixture_path(name), &AnalysisConfig::default()).unwrap()
}

pub fn open_fixture(name: &str) -> AnalysisSession {
    apkscope_core::pipeline::run_pipeline(&fixture_config(name), None).unwrap()
}

pub fn fixture_source(name: &str, rel: &str) -> String {
    std::fs::read_to_string(fixture_path(name).join(rel)).unwrap()
}

// ---------------------------------------------------------------------------
// Call-graph inspection
// ---------------------------------------------------------------------------

/// All node signatures, sorted.
pub fn node_signatures(result: &CallGraphResult) -> Vec<String> {
    let mut sigs: Vec<String> = result
        .graph
        .node_indices()
        .map(|i| result.graph.node(i).full_signature.clone())
        .collect();
    sigs.sort();
    sigs
}

/// Entry-point signatures, sorted.
pub fn entry_signatures(result: &CallGraphResult) -> Vec<String> {
    let mut sigs: Vec<String> = result
        .entry_point_nodes()
        .iter()
        .map(|n| n.full_signature.clone())
        .collect();
    sigs.sort();
    sigs
}

/// Caller signatures of `signature`, in graph order.
pub fn callers_of(result: &CallGraphResult, signature: &str) -> Vec<String> {
    let Some(idx) = result.graph.get_node_index(signature) else {
        return Vec::new();
    };
    result
        .graph
        .callers(idx)
        .into_iter()
        .map(|c| result.graph.node(c).full_signature.clone())
        .collect()
}
