//! Manifest classification: which declared components are reachable from outside
//! the application.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::config::{ComponentType, ExportedComponent};
use crate::error::{AnalysisError, Result};

const ATTR_NAME: &str = "android:name";
const ATTR_EXPORTED: &str = "android:exported";
const ATTR_PERMISSION: &str = "android:permission";

const ACTION_MAIN: &str = "android.intent.action.MAIN";
const CATEGORY_LAUNCHER: &str = "android.intent.category.LAUNCHER";

// ---------------------------------------------------------------------------
// Element tree
// ---------------------------------------------------------------------------

/// Minimal owned element tree. Attribute keys keep their prefix (`android:name`).
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(quick_xml::Error::from)?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    /// Attribute value, empty when absent.
    fn attr(&self, key: &str) -> &str {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Descendant elements named `name`, in document order. Excludes `self`.
    fn descendants<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_named(name, found);
        }
    }

    /// Like [`descendants`](Self::descendants) but also considers `self`.
    fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        if self.name == name {
            found.push(self);
        }
        self.collect_named(name, &mut found);
        found
    }
}

fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    AnalysisError::MalformedManifest("unexpected closing tag".to_string())
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(_) | Event::CData(_) if stack.is_empty() => {
                return Err(AnalysisError::MalformedManifest(
                    "text outside the root element".to_string(),
                ));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(AnalysisError::MalformedManifest(format!(
            "unclosed element <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| AnalysisError::MalformedManifest("document has no root element".to_string()))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(AnalysisError::MalformedManifest(
            "multiple root elements".to_string(),
        ));
    }
    *root = Some(element);
    Ok(())
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Qualify a manifest component name against the application package.
///
/// `.Main` and `Main` both become `<package>.Main`; dotted names are kept as-is.
pub fn resolve_component_name(name: &str, package: &str) -> String {
    if name.starts_with('.') {
        format!("{package}{name}")
    } else if !name.contains('.') {
        format!("{package}.{name}")
    } else {
        name.to_string()
    }
}

fn describe_intent_filter(filter: &Element) -> String {
    let mut clauses = Vec::new();

    for action in filter.descendants("action") {
        let name = action.attr(ATTR_NAME);
        if !name.is_empty() {
            clauses.push(format!("Action: {name}"));
        }
    }
    for category in filter.descendants("category") {
        let name = category.attr(ATTR_NAME);
        if !name.is_empty() {
            clauses.push(format!("Category: {name}"));
        }
    }
    for data in filter.descendants("data") {
        let parts: Vec<String> = ["scheme", "host", "path", "mimeType"]
            .iter()
            .filter_map(|key| {
                let value = data.attr(&format!("android:{key}"));
                (!value.is_empty()).then(|| format!("{key}={value}"))
            })
            .collect();
        if !parts.is_empty() {
            clauses.push(format!("Data: {}", parts.join(" ")));
        }
    }

    clauses.join(", ")
}

fn analyze_component(
    element: &Element,
    component_type: ComponentType,
    package: &str,
) -> Option<ExportedComponent> {
    let filters = element.descendants("intent-filter");
    let exported = match element.attr(ATTR_EXPORTED) {
        "true" => true,
        "false" => false,
        // Implicit export: any intent filter makes the component reachable.
        _ => !filters.is_empty(),
    };
    if !exported {
        return None;
    }

    Some(ExportedComponent {
        component_type,
        name: resolve_component_name(element.attr(ATTR_NAME), package),
        permission: element.attr(ATTR_PERMISSION).to_string(),
        exported,
        intent_filters: filters
            .into_iter()
            .map(describe_intent_filter)
            .filter(|d| !d.is_empty())
            .collect(),
    })
}

fn exported_components(root: &Element, package: &str) -> Vec<ExportedComponent> {
    let mut components = Vec::new();
    for component_type in ComponentType::ALL {
        for element in root.find_all(component_type.as_str()) {
            if let Some(component) = analyze_component(element, component_type, package) {
                components.push(component);
            }
        }
    }
    components
}

fn main_activity_of(root: &Element, package: &str) -> Option<String> {
    for activity in root.find_all(ComponentType::Activity.as_str()) {
        for filter in activity.descendants("intent-filter") {
            let has_main = filter
                .descendants("action")
                .iter()
                .any(|a| a.attr(ATTR_NAME) == ACTION_MAIN);
            let has_launcher = filter
                .descendants("category")
                .iter()
                .any(|c| c.attr(ATTR_NAME) == CATEGORY_LAUNCHER);
            if has_main && has_launcher {
                return Some(resolve_component_name(activity.attr(ATTR_NAME), package));
            }
        }
    }
    None
}

/// Classify every exported `activity`, `service`, `receiver` and `provider` in the
/// manifest, grouped by type in that order and in document order within a type.
///
/// Malformed XML fails the whole call.
pub fn classify(manifest_xml: &str, package_name: &str) -> Result<Vec<ExportedComponent>> {
    let root = parse_document(manifest_xml)?;
    Ok(exported_components(&root, package_name))
}

/// The `package` attribute of the manifest root, empty when absent.
pub fn manifest_package(manifest_xml: &str) -> Result<String> {
    let root = parse_document(manifest_xml)?;
    Ok(root.attr("package").to_string())
}

/// The first activity with a filter declaring both the MAIN action and the
/// LAUNCHER category.
pub fn find_main_activity(manifest_xml: &str, package_name: &str) -> Result<Option<String>> {
    let root = parse_document(manifest_xml)?;
    Ok(main_activity_of(&root, package_name))
}

/// Everything the session needs from a manifest, from a single parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub package: String,
    pub components: Vec<ExportedComponent>,
    pub main_activity: Option<String>,
}

impl Manifest {
    /// Parse and classify a manifest, taking the package from its root element.
    pub fn parse(manifest_xml: &str) -> Result<Self> {
        let root = parse_document(manifest_xml)?;
        let package = root.attr("package").to_string();
        Ok(Self {
            components: exported_components(&root, &package),
            main_activity: main_activity_of(&root, &package),
            package,
        })
    }
}
