//! apkscope core: heuristic analysis over decompiled Android applications.
//!
//! This crate holds the analysis logic: manifest attack-surface classification, method
//! body location, call-edge detection, reverse call-graph construction and target
//! resolution, plus the corpus loader and session queries the presentation layers use.

pub mod analysis;
pub mod config;
pub mod corpus;
pub mod error;
pub mod graph;
pub mod output;
pub mod pipeline;
pub mod session;

pub use error::{AnalysisError, Result};
