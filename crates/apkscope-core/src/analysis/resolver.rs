//! Resolve a user method query to call-graph targets.

use std::collections::HashSet;

use serde::Serialize;

use crate::corpus::Corpus;
use crate::graph::call_graph::signature;

/// A method of a corpus class, identified by name only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MethodRef {
    pub class_name: String,
    pub method_name: String,
}

impl MethodRef {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }

    pub fn signature(&self) -> String {
        signature(&self.class_name, &self.method_name)
    }
}

/// Outcome of resolving a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every matching method, in corpus order, one per signature.
    Targets(Vec<MethodRef>),
    /// No match; similar method names to offer instead.
    Suggestions(Vec<String>),
}

fn matches_query(method: &str, full_signature: &str, query: &str) -> bool {
    method == query
        || full_signature.ends_with(&format!(".{query}"))
        || (query.contains('.') && full_signature.ends_with(query))
}

/// Resolve `query` (bare name, `Class.method`, or any qualified suffix) against the
/// corpus. Falls back to at most `limit` suggestions.
pub fn resolve_targets(query: &str, corpus: &Corpus, limit: usize) -> Resolution {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for class in corpus.classes() {
        for method in &class.methods {
            let full_signature = signature(&class.full_name, method);
            if matches_query(method, &full_signature, query) && seen.insert(full_signature) {
                targets.push(MethodRef::new(&class.full_name, method));
            }
        }
    }

    if targets.is_empty() {
        Resolution::Suggestions(similar_methods(query, corpus, limit))
    } else {
        Resolution::Targets(targets)
    }
}

/// Distinct method names containing `query`, case-insensitively, in corpus order.
pub fn similar_methods(query: &str, corpus: &Corpus, limit: usize) -> Vec<String> {
    let needle = query.to_lowercase();
    let mut seen = HashSet::new();
    let mut suggestions = Vec::new();

    'classes: for class in corpus.classes() {
        for method in &class.methods {
            if suggestions.len() >= limit {
                break 'classes;
            }
            if method.to_lowercase().contains(&needle) && seen.insert(method.as_str()) {
                suggestions.push(method.clone());
            }
        }
    }
    suggestions
}
