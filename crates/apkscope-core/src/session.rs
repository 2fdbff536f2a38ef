//! Query surface over one loaded application.
//!
//! A session owns the corpus and the classified manifest. Presentation layers (the
//! CLI today) go through it for every lookup and for call-graph builds.

use std::collections::{BTreeMap, HashMap};

use log::warn;
use serde::Serialize;

use crate::analysis::manifest::Manifest;
use crate::analysis::{extract_method_body, CallGraphBuilder, CallGraphResult, EdgeDetector};
use crate::config::{AnalysisConfig, ClassUnit, ComponentType, ExportedComponent};
use crate::corpus::Corpus;
use crate::error::{AnalysisError, Result};
use crate::graph::call_graph::signature;

/// Summary of the loaded application.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApkInfo {
    pub input_path: String,
    pub package_name: Option<String>,
    pub total_classes: usize,
    pub total_resources: usize,
    pub exported_components: usize,
    pub main_activity: Option<String>,
}

/// Everything known about one class.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClassDetails {
    pub full_name: String,
    pub package: String,
    pub method_count: usize,
    pub field_count: usize,
    pub methods: Vec<String>,
    pub fields: Vec<String>,
    pub source_code: String,
}

#[derive(Debug)]
enum ManifestState {
    Missing,
    Invalid(String),
    Parsed(Manifest),
}

/// A loaded application ready for querying.
#[derive(Debug)]
pub struct AnalysisSession {
    config: AnalysisConfig,
    corpus: Corpus,
    manifest: ManifestState,
    detector: EdgeDetector,
    timings: HashMap<String, f64>,
}

impl AnalysisSession {
    /// Build a session over `corpus`. A missing or malformed manifest does not fail
    /// the session; manifest queries report it instead.
    pub fn new(corpus: Corpus, config: AnalysisConfig) -> Result<Self> {
        let detector = EdgeDetector::new(&config.confirmers)?;
        let manifest = match corpus.manifest() {
            None => {
                warn!("No AndroidManifest.xml in corpus; component queries are unavailable");
                ManifestState::Missing
            }
            Some(xml) => match Manifest::parse(xml) {
                Ok(manifest) => ManifestState::Parsed(manifest),
                Err(e) => {
                    warn!("{e}");
                    ManifestState::Invalid(e.to_string())
                }
            },
        };
        Ok(Self {
            config,
            corpus,
            manifest,
            detector,
            timings: HashMap::new(),
        })
    }

    pub(crate) fn with_timings(mut self, timings: HashMap<String, f64>) -> Self {
        self.timings = timings;
        self
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Seconds spent per load phase.
    pub fn timings(&self) -> &HashMap<String, f64> {
        &self.timings
    }

    fn manifest(&self) -> Result<&Manifest> {
        match &self.manifest {
            ManifestState::Parsed(m) => Ok(m),
            ManifestState::Missing => Err(AnalysisError::NoManifest),
            ManifestState::Invalid(msg) => Err(AnalysisError::MalformedManifest(msg.clone())),
        }
    }

    // -----------------------------------------------------------------------
    // Application
    // -----------------------------------------------------------------------

    pub fn apk_info(&self) -> ApkInfo {
        let manifest = self.manifest().ok();
        ApkInfo {
            input_path: self.config.input_path.clone(),
            package_name: manifest.map(|m| m.package.clone()),
            total_classes: self.corpus.len(),
            total_resources: self.corpus.resources().len(),
            exported_components: manifest.map_or(0, |m| m.components.len()),
            main_activity: manifest.and_then(|m| m.main_activity.clone()),
        }
    }

    /// Raw manifest text.
    pub fn android_manifest(&self) -> Result<&str> {
        self.corpus.manifest().ok_or(AnalysisError::NoManifest)
    }

    pub fn package_name(&self) -> Result<&str> {
        Ok(&self.manifest()?.package)
    }

    /// The launcher activity, if the manifest declares one.
    pub fn main_activity(&self) -> Result<Option<&str>> {
        Ok(self.manifest()?.main_activity.as_deref())
    }

    // -----------------------------------------------------------------------
    // Classes and methods
    // -----------------------------------------------------------------------

    /// Every class name, sorted.
    pub fn all_classes(&self) -> Vec<&str> {
        self.corpus
            .classes()
            .iter()
            .map(|c| c.full_name.as_str())
            .collect()
    }

    pub fn class(&self, class_name: &str) -> Result<&ClassUnit> {
        self.corpus
            .find_class(class_name)
            .ok_or_else(|| AnalysisError::ClassNotFound(class_name.to_string()))
    }

    pub fn class_source(&self, class_name: &str) -> Result<&str> {
        Ok(&self.class(class_name)?.source)
    }

    pub fn class_details(&self, class_name: &str) -> Result<ClassDetails> {
        let class = self.class(class_name)?;
        Ok(ClassDetails {
            full_name: class.full_name.clone(),
            package: class.package.clone(),
            method_count: class.methods.len(),
            field_count: class.fields.len(),
            methods: qualified_methods(class),
            fields: field_descriptors(class),
            source_code: class.source.clone(),
        })
    }

    /// `Class.method` for every declared method, overloads repeated.
    pub fn methods_of_class(&self, class_name: &str) -> Result<Vec<String>> {
        Ok(qualified_methods(self.class(class_name)?))
    }

    /// `"<type> <name>"` for every declared field.
    pub fn fields_of_class(&self, class_name: &str) -> Result<Vec<String>> {
        Ok(field_descriptors(self.class(class_name)?))
    }

    /// Source text of a method, located heuristically in its class.
    pub fn method_source(&self, class_name: &str, method_name: &str) -> Result<&str> {
        let class = self.class(class_name)?;
        extract_method_body(&class.source, method_name)
            .ok_or_else(|| AnalysisError::method_not_found(class_name, method_name))
    }

    /// Classes matching `query` exactly, by simple name, by suffix, or by
    /// case-insensitive substring of the full or simple name.
    pub fn search_classes(&self, query: &str) -> Vec<&ClassUnit> {
        let needle = query.to_lowercase();
        let suffix = format!(".{query}");
        self.corpus
            .classes()
            .iter()
            .filter(|c| {
                c.full_name == query
                    || c.simple_name == query
                    || c.full_name.ends_with(&suffix)
                    || c.full_name.to_lowercase().contains(&needle)
                    || c.simple_name.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Methods whose name contains `query`, grouped by class.
    pub fn search_methods(&self, query: &str) -> BTreeMap<String, Vec<String>> {
        let mut results = BTreeMap::new();
        for class in self.corpus.classes() {
            let methods: Vec<String> = class
                .methods
                .iter()
                .filter(|m| m.contains(query))
                .map(|m| signature(&class.full_name, m))
                .collect();
            if !methods.is_empty() {
                results.insert(class.full_name.clone(), methods);
            }
        }
        results
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    pub fn exported_components(&self) -> Result<&[ExportedComponent]> {
        Ok(&self.manifest()?.components)
    }

    pub fn exported_by_type(&self) -> Result<BTreeMap<ComponentType, Vec<&ExportedComponent>>> {
        let mut grouped: BTreeMap<ComponentType, Vec<&ExportedComponent>> = BTreeMap::new();
        for component in self.exported_components()? {
            grouped
                .entry(component.component_type)
                .or_default()
                .push(component);
        }
        Ok(grouped)
    }

    // -----------------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------------

    /// Every resource name, sorted.
    pub fn resource_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .corpus
            .resources()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn resource(&self, name: &str) -> Result<&str> {
        self.corpus
            .find_resource(name)
            .map(|r| r.content.as_str())
            .ok_or_else(|| AnalysisError::ResourceNotFound(name.to_string()))
    }

    // -----------------------------------------------------------------------
    // Call graph
    // -----------------------------------------------------------------------

    /// Reverse call graph for `query`, entry points annotated with exported
    /// components when the manifest is available.
    pub fn call_graph(&self, query: &str) -> CallGraphResult {
        let components = self.exported_components().unwrap_or(&[]);
        CallGraphBuilder::new(&self.corpus)
            .detector(self.detector.clone())
            .components(components)
            .max_depth(self.config.max_depth)
            .suggestion_limit(self.config.suggestion_limit)
            .parallel(self.config.parallel)
            .build(query)
    }
}

fn qualified_methods(class: &ClassUnit) -> Vec<String> {
    class
        .methods
        .iter()
        .map(|m| signature(&class.full_name, m))
        .collect()
}

fn field_descriptors(class: &ClassUnit) -> Vec<String> {
    class
        .fields
        .iter()
        .map(|(ty, name)| format!("{ty} {name}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceEntry;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.demo">
  <application>
    <activity android:name=".Home">
      <intent-filter>
        <action android:name="android.intent.action.MAIN"/>
        <category android:name="android.intent.category.LAUNCHER"/>
      </intent-filter>
    </activity>
  </application>
</manifest>"#;

    fn home() -> ClassUnit {
        ClassUnit {
            full_name: "com.demo.Home".to_string(),
            simple_name: "Home".to_string(),
            package: "com.demo".to_string(),
            methods: vec!["onStart".to_string(), "refresh".to_string()],
            fields: vec![("int".to_string(), "count".to_string())],
            source: "public class Home {\n    protected void onStart() {\n        refresh();\n    }\n\n    private void refresh() {\n    }\n}".to_string(),
        }
    }

    fn session(resources: Vec<ResourceEntry>) -> AnalysisSession {
        AnalysisSession::new(Corpus::new(vec![home()], resources), AnalysisConfig::default()).unwrap()
    }

    fn manifest_resource(content: &str) -> ResourceEntry {
        ResourceEntry {
            name: "AndroidManifest.xml".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn apk_info_summarises_manifest() {
        let s = session(vec![manifest_resource(MANIFEST)]);
        let info = s.apk_info();
        assert_eq!(info.package_name.as_deref(), Some("com.demo"));
        assert_eq!(info.total_classes, 1);
        assert_eq!(info.exported_components, 1);
        assert_eq!(info.main_activity.as_deref(), Some("com.demo.Home"));
    }

    #[test]
    fn missing_manifest_is_a_typed_error() {
        let s = session(Vec::new());
        assert!(matches!(s.android_manifest(), Err(AnalysisError::NoManifest)));
        assert!(matches!(s.exported_components(), Err(AnalysisError::NoManifest)));
        assert_eq!(s.apk_info().package_name, None);
    }

    #[test]
    fn malformed_manifest_fails_only_manifest_queries() {
        let s = session(vec![manifest_resource("<manifest><application>")]);
        assert!(matches!(
            s.exported_components(),
            Err(AnalysisError::MalformedManifest(_))
        ));
        assert_eq!(s.all_classes(), vec!["com.demo.Home"]);
        assert!(s.call_graph("refresh").success);
    }

    #[test]
    fn class_queries() {
        let s = session(Vec::new());
        assert_eq!(
            s.methods_of_class("com.demo.Home").unwrap(),
            vec!["com.demo.Home.onStart", "com.demo.Home.refresh"]
        );
        assert_eq!(s.fields_of_class("com.demo.Home").unwrap(), vec!["int count"]);
        let details = s.class_details("com.demo.Home").unwrap();
        assert_eq!(details.method_count, 2);
        assert_eq!(details.field_count, 1);
        assert!(matches!(
            s.class_source("com.demo.Away"),
            Err(AnalysisError::ClassNotFound(_))
        ));
    }

    #[test]
    fn method_source_reports_missing_method() {
        let s = session(Vec::new());
        assert!(s
            .method_source("com.demo.Home", "onStart")
            .unwrap()
            .contains("refresh();"));
        let err = s.method_source("com.demo.Home", "onStop").unwrap_err();
        assert_eq!(err.to_string(), "Method not found: onStop in class com.demo.Home");
    }

    #[test]
    fn searches() {
        let s = session(Vec::new());
        assert_eq!(s.search_classes("home").len(), 1);
        assert_eq!(s.search_classes("Home").len(), 1);
        assert!(s.search_classes("Away").is_empty());
        let methods = s.search_methods("fresh");
        assert_eq!(methods["com.demo.Home"], vec!["com.demo.Home.refresh"]);
    }

    #[test]
    fn resources_are_sorted_and_typed() {
        let s = session(vec![
            manifest_resource(MANIFEST),
            ResourceEntry {
                name: "res/layout/main.xml".to_string(),
                content: "<LinearLayout/>".to_string(),
            },
        ]);
        assert_eq!(s.resource_names(), vec!["AndroidManifest.xml", "res/layout/main.xml"]);
        assert_eq!(s.resource("res/layout/main.xml").unwrap(), "<LinearLayout/>");
        assert!(matches!(
            s.resource("res/raw/none"),
            Err(AnalysisError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn call_graph_annotates_exported_entry_points() {
        let s = session(vec![manifest_resource(MANIFEST)]);
        let result = s.call_graph("refresh");
        assert!(result.success);
        assert_eq!(result.entry_points.len(), 1);
        let entry = &result.entry_points[0];
        assert_eq!(result.graph.node(entry.node).full_signature, "com.demo.Home.onStart");
        assert_eq!(entry.exported.as_ref().map(|c| c.name.as_str()), Some("com.demo.Home"));
    }
}
