//! The decompiled class set and raw resources an analysis session runs over.

use serde::{Deserialize, Serialize};

use crate::config::{ClassUnit, ResourceEntry};

pub mod java;
pub mod loader;

pub use loader::load_corpus;

/// Resource name the manifest is looked up by.
pub const MANIFEST_NAME: &str = "AndroidManifest.xml";

/// Order-stable, read-only set of classes and resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    #[serde(default)]
    classes: Vec<ClassUnit>,
    #[serde(default)]
    resources: Vec<ResourceEntry>,
}

impl Corpus {
    /// Build a corpus; classes are ordered by full name.
    pub fn new(mut classes: Vec<ClassUnit>, resources: Vec<ResourceEntry>) -> Self {
        classes.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Self { classes, resources }
    }

    /// Parse a JSON corpus dump (`{"classes": [...], "resources": [...]}`).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let raw: Corpus = serde_json::from_str(json)?;
        Ok(Self::new(raw.classes, raw.resources))
    }

    pub fn classes(&self) -> &[ClassUnit] {
        &self.classes
    }

    pub fn resources(&self) -> &[ResourceEntry] {
        &self.resources
    }

    pub fn find_class(&self, full_name: &str) -> Option<&ClassUnit> {
        self.classes.iter().find(|c| c.full_name == full_name)
    }

    pub fn find_resource(&self, name: &str) -> Option<&ResourceEntry> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Manifest text, matched by exact resource name.
    pub fn manifest(&self) -> Option<&str> {
        self.find_resource(MANIFEST_NAME).map(|r| r.content.as_str())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
