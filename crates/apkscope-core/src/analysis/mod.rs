//! Heuristic analysis over reconstructed source text.

pub mod builder;
pub mod edges;
pub mod locator;
pub mod manifest;
pub mod resolver;

pub use builder::{build_call_graph, CallGraphBuilder, CallGraphResult, EntryPoint};
pub use edges::{has_call_edge, EdgeDetector, TargetMatcher};
pub use locator::extract_method_body;
pub use manifest::{classify, Manifest};
pub use resolver::{resolve_targets, MethodRef, Resolution};
