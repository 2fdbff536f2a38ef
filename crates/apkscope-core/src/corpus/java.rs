//! Java class skeleton extraction for decompiled sources.
//!
//! The decompiler hands us reconstructed `.java` text. Tree-sitter recovers the
//! structural skeleton (package, type declarations, method and field names); the
//! analysis itself still runs over the raw text.

use tree_sitter::{Language, Node, Parser};

use crate::config::ClassUnit;

fn is_type_declaration(node_type: &str) -> bool {
    matches!(
        node_type,
        "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration"
    )
}

fn node_text(node: &Node, source: &[u8]) -> Option<String> {
    node.utf8_text(source).ok().map(|s| s.to_string())
}

fn get_name(node: &Node, source: &[u8]) -> Option<String> {
    node.child_by_field_name("name")
        .and_then(|n| node_text(&n, source))
}

fn package_name(root: &Node, source: &[u8]) -> String {
    for i in 0..root.child_count() {
        let Some(child) = root.child(i) else {
            continue;
        };
        if child.kind() != "package_declaration" {
            continue;
        }
        for j in 0..child.child_count() {
            if let Some(c) = child.child(j) {
                if c.kind() == "scoped_identifier" || c.kind() == "identifier" {
                    return node_text(&c, source).unwrap_or_default();
                }
            }
        }
    }
    String::new()
}

/// Members of one type body. Nested type declarations are returned for the caller
/// to turn into their own class units.
#[derive(Default)]
struct Members<'tree> {
    methods: Vec<String>,
    fields: Vec<(String, String)>,
    nested: Vec<Node<'tree>>,
}

fn collect_members<'tree>(body: &Node<'tree>, source: &[u8], members: &mut Members<'tree>) {
    for i in 0..body.child_count() {
        let Some(child) = body.child(i) else {
            continue;
        };
        match child.kind() {
            "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
                if let Some(name) = get_name(&child, source) {
                    members.methods.push(name);
                }
            }
            "field_declaration" | "constant_declaration" => {
                let field_type = child
                    .child_by_field_name("type")
                    .and_then(|t| node_text(&t, source))
                    .unwrap_or_default();
                for j in 0..child.child_count() {
                    if let Some(declarator) = child.child(j) {
                        if declarator.kind() == "variable_declarator" {
                            if let Some(name) = get_name(&declarator, source) {
                                members.fields.push((field_type.clone(), name));
                            }
                        }
                    }
                }
            }
            // Enum constants come first; regular members sit in a nested block.
            "enum_body_declarations" => collect_members(&child, source, members),
            kind if is_type_declaration(kind) => members.nested.push(child),
            _ => {}
        }
    }
}

fn walk_type(
    decl: &Node,
    text: &str,
    package: &str,
    outer: Option<&str>,
    class_source: String,
    units: &mut Vec<ClassUnit>,
) {
    let source = text.as_bytes();
    let Some(simple_name) = get_name(decl, source) else {
        return;
    };
    let full_name = match outer {
        Some(o) => format!("{o}.{simple_name}"),
        None if package.is_empty() => simple_name.clone(),
        None => format!("{package}.{simple_name}"),
    };

    let mut members = Members::default();
    if let Some(body) = decl.child_by_field_name("body") {
        collect_members(&body, source, &mut members);
    }
    let Members {
        methods,
        fields,
        nested,
    } = members;

    units.push(ClassUnit {
        full_name: full_name.clone(),
        simple_name,
        package: package.to_string(),
        methods,
        fields,
        source: class_source,
    });

    for inner in nested {
        let inner_source = text[inner.byte_range()].to_string();
        walk_type(&inner, text, package, Some(&full_name), inner_source, units);
    }
}

/// Extract one class unit per type declaration in a Java source file.
///
/// Top-level types carry the file header (package and imports) followed by their
/// declaration; nested named types are emitted as `Outer.Inner` with their own
/// declaration text. Anonymous classes stay part of the enclosing method.
pub fn extract_classes(text: &str) -> Vec<ClassUnit> {
    let mut parser = Parser::new();
    let language: Language = tree_sitter_java::LANGUAGE.into();
    if parser.set_language(&language).is_err() {
        return Vec::new();
    }
    let Some(tree) = parser.parse(text, None) else {
        return Vec::new();
    };

    let root = tree.root_node();
    let source = text.as_bytes();
    let package = package_name(&root, source);

    let top_level: Vec<Node> = (0..root.child_count())
        .filter_map(|i| root.child(i))
        .filter(|c| is_type_declaration(c.kind()))
        .collect();
    let header_end = top_level.first().map(|n| n.start_byte()).unwrap_or(0);

    let mut units = Vec::new();
    for decl in &top_level {
        let range = decl.byte_range();
        let class_source = if range.start == header_end {
            text[..range.end].to_string()
        } else {
            format!("{}{}", &text[..header_end], &text[range])
        };
        walk_type(decl, text, &package, None, class_source, &mut units);
    }
    units
}
