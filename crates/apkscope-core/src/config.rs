//! Core data types and configuration for apkscope analysis.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Kind of manifest-declared Android component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Activity,
    Service,
    Receiver,
    Provider,
}

impl ComponentType {
    /// All component kinds, in the order the manifest is classified.
    pub const ALL: [ComponentType; 4] = [
        ComponentType::Activity,
        ComponentType::Service,
        ComponentType::Receiver,
        ComponentType::Provider,
    ];

    /// The manifest element tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Service => "service",
            Self::Receiver => "receiver",
            Self::Provider => "provider",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "activity" => Some(Self::Activity),
            "service" => Some(Self::Service),
            "receiver" => Some(Self::Receiver),
            "provider" => Some(Self::Provider),
            _ => None,
        }
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A manifest component reachable by other applications or the system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportedComponent {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    /// Fully qualified class name.
    pub name: String,
    /// Guarding permission, empty when none is declared.
    #[serde(default)]
    pub permission: String,
    pub exported: bool,
    /// One human-readable descriptor per `intent-filter`.
    #[serde(default)]
    pub intent_filters: Vec<String>,
}

impl std::fmt::Display for ExportedComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Type: {}", self.component_type)?;
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Exported: {}", self.exported)?;
        if !self.permission.is_empty() {
            writeln!(f, "Permission: {}", self.permission)?;
        }
        if !self.intent_filters.is_empty() {
            writeln!(f, "Intent Filters:")?;
            for filter in &self.intent_filters {
                writeln!(f, "  - {filter}")?;
            }
        }
        Ok(())
    }
}

/// A decompiled class as handed over by the decompiler. Read-only to the analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassUnit {
    pub full_name: String,
    pub simple_name: String,
    #[serde(default)]
    pub package: String,
    /// Method names in declaration order; overloads appear once per declaration.
    #[serde(default)]
    pub methods: Vec<String>,
    /// `(type, name)` pairs in declaration order.
    #[serde(default)]
    pub fields: Vec<(String, String)>,
    /// Reconstructed source text.
    #[serde(default)]
    pub source: String,
}

/// A raw resource file of the decompiled application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Original name, `/`-separated and relative to the resource root.
    pub name: String,
    pub content: String,
}

/// A confirming call heuristic: when the target method name matches `method`,
/// a caller body matching `pattern` also counts as an edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmerRule {
    /// Regex matched against the whole target method name.
    pub method: String,
    /// Regex searched for in the caller's body.
    pub pattern: String,
}

/// The built-in confirmer table.
pub fn default_confirmers() -> Vec<ConfirmerRule> {
    vec![ConfirmerRule {
        method: "loadUrl".to_string(),
        pattern: r"(?i)\bwebView\w*\.loadUrl\s*\(".to_string(),
    }]
}

/// Configuration for an analysis session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Decompiler output directory or JSON corpus dump.
    #[serde(default)]
    pub input_path: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
    /// Fan class scanning out over the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_confirmers")]
    pub confirmers: Vec<ConfirmerRule>,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub quiet: bool,
}

fn default_max_depth() -> usize {
    5
}
fn default_suggestion_limit() -> usize {
    10
}
fn default_parallel() -> bool {
    true
}
fn default_max_file_size() -> u64 {
    2_000_000
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            max_depth: default_max_depth(),
            suggestion_limit: default_suggestion_limit(),
            parallel: default_parallel(),
            exclude_patterns: Vec::new(),
            max_file_size: default_max_file_size(),
            confirmers: default_confirmers(),
            verbose: false,
            quiet: false,
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| AnalysisError::json(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_type_roundtrip() {
        for ct in ComponentType::ALL {
            assert_eq!(ComponentType::from_str_value(ct.as_str()), Some(ct));
        }
        assert_eq!(ComponentType::from_str_value("Activity"), None);
        assert_eq!(ComponentType::from_str_value("activity-alias"), None);
    }

    #[test]
    fn analysis_config_defaults() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.max_depth, 5);
        assert_eq!(cfg.suggestion_limit, 10);
        assert!(cfg.parallel);
        assert_eq!(cfg.confirmers.len(), 1);
        assert_eq!(cfg.confirmers[0].method, "loadUrl");
    }

    #[test]
    fn partial_config_json_fills_defaults() {
        let cfg: AnalysisConfig = serde_json::from_str(r#"{"max_depth": 3}"#).unwrap();
        assert_eq!(cfg.max_depth, 3);
        assert_eq!(cfg.suggestion_limit, 10);
        assert_eq!(cfg.confirmers, default_confirmers());
    }

    #[test]
    fn config_from_missing_file_is_io_error() {
        let err = AnalysisConfig::from_file("/nonexistent/apkscope.json").unwrap_err();
        assert!(matches!(err, AnalysisError::Io { .. }));
    }

    #[test]
    fn exported_component_serialization() {
        let comp = ExportedComponent {
            component_type: ComponentType::Receiver,
            name: "com.example.Boot".to_string(),
            permission: String::new(),
            exported: true,
            intent_filters: vec!["Action: android.intent.action.BOOT_COMPLETED".to_string()],
        };
        let json = serde_json::to_string(&comp).unwrap();
        assert!(json.contains("\"type\":\"receiver\""));
        assert!(json.contains("BOOT_COMPLETED"));
    }

    #[test]
    fn exported_component_display_skips_empty_permission() {
        let comp = ExportedComponent {
            component_type: ComponentType::Activity,
            name: "com.example.Main".to_string(),
            permission: String::new(),
            exported: true,
            intent_filters: Vec::new(),
        };
        let text = comp.to_string();
        assert!(text.contains("Type: activity"));
        assert!(!text.contains("Permission"));
        assert!(!text.contains("Intent Filters"));
    }
}
