//! Heuristic call-edge detection over method text.

use regex::Regex;

use super::locator::extract_method_body;
use crate::config::{default_confirmers, ConfirmerRule};
use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone)]
struct CompiledRule {
    method: Regex,
    pattern: Regex,
}

/// Decides whether a caller's body invokes a target method.
///
/// Checks, in order: a plain `name(` occurrence, a qualified `receiver.name(` call,
/// then any confirming rule whose method pattern matches the target name.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    rules: Vec<CompiledRule>,
}

impl EdgeDetector {
    /// Compile a confirmer table. Rule method patterns match the whole target name.
    pub fn new(confirmers: &[ConfirmerRule]) -> Result<Self> {
        let mut rules = Vec::with_capacity(confirmers.len());
        for rule in confirmers {
            let invalid = |source| AnalysisError::InvalidPattern {
                method: rule.method.clone(),
                source,
            };
            let method = Regex::new(&format!("^(?:{})$", rule.method)).map_err(invalid)?;
            let pattern = Regex::new(&rule.pattern).map_err(invalid)?;
            rules.push(CompiledRule { method, pattern });
        }
        Ok(Self { rules })
    }

    /// Matcher for one target method name, or `None` if no pattern can be built.
    pub fn matcher(&self, method: &str) -> Option<TargetMatcher> {
        if method.is_empty() {
            return None;
        }
        let qualified = Regex::new(&format!(r"\b\w+\.{}\s*\(", regex::escape(method))).ok()?;
        Some(TargetMatcher {
            method: method.to_string(),
            call_token: format!("{method}("),
            qualified,
            confirmers: self
                .rules
                .iter()
                .filter(|r| r.method.is_match(method))
                .map(|r| r.pattern.clone())
                .collect(),
        })
    }

    /// Whether `caller_method` in `caller_source` calls the method named by
    /// `target_signature` (`Class.method`; the part after the last `.` is used).
    pub fn has_call_edge(
        &self,
        caller_source: &str,
        caller_method: &str,
        target_signature: &str,
    ) -> bool {
        let method = target_method_name(target_signature);
        self.matcher(method)
            .is_some_and(|m| m.calls_target(caller_source, caller_method))
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new(&default_confirmers()).unwrap_or(Self { rules: Vec::new() })
    }
}

/// Compiled checks for a single target name.
#[derive(Debug, Clone)]
pub struct TargetMatcher {
    method: String,
    call_token: String,
    qualified: Regex,
    confirmers: Vec<Regex>,
}

impl TargetMatcher {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn matches_body(&self, body: &str) -> bool {
        body.contains(&self.call_token)
            || self.qualified.is_match(body)
            || self.confirmers.iter().any(|p| p.is_match(body))
    }

    /// Locate `caller_method` in `caller_source` and test its body. A body that
    /// cannot be located means no edge.
    pub fn calls_target(&self, caller_source: &str, caller_method: &str) -> bool {
        extract_method_body(caller_source, caller_method).is_some_and(|body| self.matches_body(body))
    }
}

fn target_method_name(signature: &str) -> &str {
    signature.rsplit('.').next().unwrap_or(signature)
}

/// [`EdgeDetector::has_call_edge`] with the built-in confirmer table.
pub fn has_call_edge(caller_source: &str, caller_method: &str, target_signature: &str) -> bool {
    EdgeDetector::default().has_call_edge(caller_source, caller_method, target_signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_call_is_an_edge() {
        assert!(has_call_edge("public void foo(){ bar(); }", "foo", "A.bar"));
    }

    #[test]
    fn qualified_call_with_spacing_is_an_edge() {
        let src = "public void sync() { repo.upload  (); }";
        let detector = EdgeDetector::default();
        let matcher = detector.matcher("upload").unwrap();
        assert!(!src.contains("upload("));
        assert!(matcher.calls_target(src, "sync"));
    }

    #[test]
    fn unrelated_body_is_not_an_edge() {
        assert!(!has_call_edge("public void foo(){ baz(); }", "foo", "A.bar"));
    }

    #[test]
    fn missing_caller_body_is_not_an_edge() {
        assert!(!has_call_edge("public void foo(){ bar(); }", "missing", "A.bar"));
        assert!(!has_call_edge("void foo(){ bar(); }", "foo", "A.bar"));
    }

    #[test]
    fn webview_confirmer_applies_to_load_url_only() {
        let detector = EdgeDetector::default();
        let load_url = detector.matcher("loadUrl").unwrap();
        let load_data = detector.matcher("loadData").unwrap();
        // Only the case-insensitive confirmer catches this spelling.
        let body = "webview.LOADURL(page);";
        assert!(load_url.matches_body(body));
        assert!(!load_data.matches_body(body));
    }

    #[test]
    fn custom_confirmer_rules_extend_detection() {
        let detector = EdgeDetector::new(&[ConfirmerRule {
            method: "exec|start".to_string(),
            pattern: r"Runtime\.getRuntime\(\)".to_string(),
        }])
        .unwrap();
        let body = "Process p = Runtime.getRuntime().exec_all(cmd);";
        assert!(detector.matcher("exec").unwrap().matches_body(body));
        assert!(!detector.matcher("execute").unwrap().matches_body(body));
    }

    #[test]
    fn invalid_confirmer_pattern_is_reported() {
        let err = EdgeDetector::new(&[ConfirmerRule {
            method: "loadUrl".to_string(),
            pattern: "(".to_string(),
        }])
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidPattern { ref method, .. } if method == "loadUrl"));
    }
}
