//! Call-graph construction over the decompiled fixture.

mod common;

use apkscope_core::analysis::{
    build_call_graph, resolve_targets, CallGraphBuilder, MethodRef, Resolution,
};
use apkscope_core::config::ComponentType;
use common::*;
use pretty_assertions::assert_eq;

#[test]
fn upload_traces_back_to_service_and_receiver() {
    let session = open_fixture(APP);
    let result = session.call_graph("upload");
    assert!(result.success);
    assert_eq!(
        node_signatures(&result),
        vec![
            "com.example.notes.data.NoteRepository.persist",
            "com.example.notes.data.NoteRepository.save",
            "com.example.notes.data.NoteRepository.sync",
            "com.example.notes.data.NoteRepository.upload",
            "com.example.notes.share.ShareReceiver.onReceive",
            "com.example.notes.sync.SyncService.onStartCommand",
        ]
    );
    assert_eq!(
        entry_signatures(&result),
        vec![
            "com.example.notes.share.ShareReceiver.onReceive",
            "com.example.notes.sync.SyncService.onStartCommand",
        ]
    );
    assert_eq!(
        callers_of(&result, "com.example.notes.data.NoteRepository.upload"),
        vec![
            "com.example.notes.data.NoteRepository.sync",
            "com.example.notes.data.NoteRepository.persist",
        ]
    );
}

#[test]
fn only_exported_entry_points_are_annotated() {
    let session = open_fixture(APP);
    let result = session.call_graph("upload");
    for entry in &result.entry_points {
        let sig = &result.graph.node(entry.node).full_signature;
        if sig.contains("ShareReceiver") {
            let component = entry.exported.as_ref().unwrap();
            assert_eq!(component.component_type, ComponentType::Receiver);
        } else {
            // SyncService is declared with exported="false".
            assert!(entry.exported.is_none());
        }
    }
}

#[test]
fn activity_entry_points() {
    let session = open_fixture(APP);
    let result = session.call_graph("BrowserActivity.openLink");
    assert_eq!(
        entry_signatures(&result),
        vec!["com.example.notes.BrowserActivity.onNewIntent"]
    );

    let result = session.call_graph("showHelp");
    assert_eq!(
        entry_signatures(&result),
        vec!["com.example.notes.MainActivity.onCreate"]
    );
    let exported = result.entry_points[0].exported.as_ref().unwrap();
    assert_eq!(exported.name, "com.example.notes.MainActivity");
}

#[test]
fn no_entry_point_has_a_recorded_caller() {
    let session = open_fixture(APP);
    for query in ["upload", "save", "openLink", "showHelp", "contentUri"] {
        let result = session.call_graph(query);
        for entry in &result.entry_points {
            assert!(result.graph.callers(entry.node).is_empty());
            assert!(!result.is_target(entry.node));
        }
    }
}

#[test]
fn unresolved_query_fails_with_suggestions() {
    let corpus = load_fixture(APP);
    let result = build_call_graph("xyz123", &corpus, &[]);
    assert!(!result.success);
    assert_eq!(result.message, "Method not found: xyz123");
    assert!(result.suggestions.is_empty());

    let result = build_call_graph("ON", &corpus, &[]);
    assert!(!result.success);
    assert!(result.suggestions.len() <= 10);
    assert!(result
        .suggestions
        .iter()
        .all(|s| s.to_lowercase().contains("on")));
    assert!(result.suggestions.contains(&"onReceive".to_string()));
}

#[test]
fn nested_class_targets_resolve() {
    let corpus = load_fixture(APP);
    assert_eq!(
        resolve_targets("Contract.contentUri", &corpus, 10),
        Resolution::Targets(vec![MethodRef::new(
            "com.example.notes.data.NotesProvider.Contract",
            "contentUri"
        )])
    );
}

#[test]
fn shallow_depth_cuts_the_chain() {
    let corpus = load_fixture(APP);
    let result = CallGraphBuilder::new(&corpus).max_depth(1).build("upload");
    assert_eq!(
        entry_signatures(&result),
        vec![
            "com.example.notes.data.NoteRepository.persist",
            "com.example.notes.data.NoteRepository.sync",
        ]
    );
}
