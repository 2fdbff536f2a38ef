//! Error types for apkscope analysis.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors surfaced by the analysis core.
///
/// Heuristic misses (a method body that cannot be located, a caller that does not
/// match) are never errors; they show up as `None` or "no edge" results instead.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The corpus carries no `AndroidManifest.xml` resource.
    #[error("AndroidManifest.xml not loaded")]
    NoManifest,

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Method not found: {method} in class {class}")]
    MethodNotFound { class: String, method: String },

    #[error("Resource file not found: {0}")]
    ResourceNotFound(String),

    /// The manifest is not well-formed XML.
    #[error("Error parsing manifest: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The manifest parsed but its element structure is broken.
    #[error("Error parsing manifest: {0}")]
    MalformedManifest(String),

    /// A confirming heuristic carries a pattern that does not compile.
    #[error("invalid pattern for '{method}': {source}")]
    InvalidPattern {
        method: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AnalysisError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub fn method_not_found(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            class: class.into(),
            method: method.into(),
        }
    }
}
