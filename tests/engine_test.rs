//! Integration tests for the engine over a vault directory on disk
//!
//! These tests verify end-to-end behavior using the public API:
//! - Vault loading, stub synthesis and fatal load errors
//! - Note and schema writes persisted as flat files
//! - Dangling reference detection and rename link rewriting
//!
//! Tests focus on observable behavior: engine results and file contents.

mod common;

use arbor_core::{
    config::{EngineConfig, CONFIG_FILE_NAME},
    engine::{Engine, EngineState},
    event::EngineEvent,
    note::Note,
    schema::{Schema, SchemaModule},
    ArborError,
};
use common::create_test_vault;
use std::fs;
use tempfile::TempDir;
use test_log::test;
use tokio::sync::mpsc::unbounded_channel;

fn engine_for(vault: &std::path::Path) -> Engine {
    Engine::for_config(EngineConfig::for_vault(vault).unwrap())
}

#[test(tokio::test)]
async fn test_stub_synthesized_for_missing_parent() {
    let temp_dir = TempDir::new().unwrap();
    let vault = create_test_vault(&temp_dir, &[("foo.ch1.md", "# Chapter 1\n")]);
    let engine = engine_for(&vault);

    let report = engine.init().await.unwrap();
    assert_eq!(report.notes, 3);
    assert_eq!(report.stubs, 1);
    assert!(engine.get_note("foo").unwrap().stub);
    assert!(!vault.join("foo.md").exists(), "stubs are never written");
}

#[test(tokio::test)]
async fn test_missing_root_note() {
    let temp_dir = TempDir::new().unwrap();
    let vault = create_test_vault(&temp_dir, &[("foo.md", "foo")]);
    fs::remove_file(vault.join("root.md")).unwrap();

    let engine = engine_for(&vault);
    assert_eq!(engine.init().await.unwrap_err(), ArborError::NoRootNoteFound);
    assert_eq!(engine.state(), EngineState::Failed);
}

#[test(tokio::test)]
async fn test_missing_root_schema() {
    let temp_dir = TempDir::new().unwrap();
    let vault = create_test_vault(&temp_dir, &[]);
    fs::remove_file(vault.join("root.schema.yml")).unwrap();

    let engine = engine_for(&vault);
    assert_eq!(engine.init().await.unwrap_err(), ArborError::NoSchemaFound);
}

#[test(tokio::test)]
async fn test_hidden_files_and_directories_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let vault = create_test_vault(&temp_dir, &[(".draft.md", "---\nid: [broken\n")]);
    fs::create_dir(vault.join("assets")).unwrap();
    fs::write(vault.join("assets").join("nested.md"), "ignored").unwrap();

    let engine = engine_for(&vault);
    let report = engine.init().await.unwrap();
    assert_eq!(report.notes, 1);
}

#[test(tokio::test)]
async fn test_config_file_changes_note_extension() {
    let temp_dir = TempDir::new().unwrap();
    let vault = create_test_vault(&temp_dir, &[]);
    fs::write(vault.join(CONFIG_FILE_NAME), "note_ext = \"markdown\"\n").unwrap();
    fs::rename(vault.join("root.md"), vault.join("root.markdown")).unwrap();
    fs::write(vault.join("ignored.md"), "not a note here").unwrap();

    let engine = engine_for(&vault);
    assert_eq!(engine.init().await.unwrap().notes, 1);
    engine.write_note(Note::new("fresh")).await.unwrap();
    assert!(vault.join("fresh.markdown").exists());
}

#[test(tokio::test)]
async fn test_write_note_promotes_stub_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let vault = create_test_vault(&temp_dir, &[("foo.ch1.md", "leaf\n")]);
    let engine = engine_for(&vault);
    engine.init().await.unwrap();
    let stub = engine.get_note("foo").unwrap();

    let written = engine
        .write_note(Note::new("foo").with_body("# Foo\n"))
        .await
        .unwrap();
    assert_eq!(written.id, stub.id);
    assert!(!written.stub);

    let text = fs::read_to_string(vault.join("foo.md")).unwrap();
    assert!(text.starts_with("---\n"));
    assert!(text.ends_with("---\n# Foo\n"));

    // a fresh engine sees the same identity
    let reloaded = engine_for(&vault);
    reloaded.init().await.unwrap();
    assert_eq!(reloaded.get_note("foo").unwrap().id, stub.id);
    assert_eq!(reloaded.notes().unwrap().iter().filter(|n| n.stub).count(), 0);
}

#[test(tokio::test)]
async fn test_write_schema_on_top_of_loaded_modules() {
    let temp_dir = TempDir::new().unwrap();
    let foo = "version: 1\nschemas:\n- id: foo\n  parent: root\n  children: [one]\n- id: one\n";
    let vault = create_test_vault(&temp_dir, &[("foo.schema.yml", foo)]);
    let engine = engine_for(&vault);
    assert_eq!(engine.init().await.unwrap().schema_modules, 2);

    let mut bar = SchemaModule::with_root("bar");
    bar.add_child("bar", Schema::new("two"));
    engine.write_schema(bar.clone()).await.unwrap();

    let modules = engine.schema_modules().unwrap();
    assert_eq!(modules.len(), 3);
    assert!(modules
        .iter()
        .all(|m| m.len() == if m.root == "root" { 1 } else { 2 }));
    assert!(vault.join("bar.schema.yml").exists());

    assert_eq!(
        engine.write_schema(bar).await.unwrap_err(),
        ArborError::DuplicateModuleRoot("bar".into())
    );

    let reloaded = engine_for(&vault);
    assert_eq!(reloaded.init().await.unwrap().schema_modules, 3);
}

#[test(tokio::test)]
async fn test_dangling_references_across_files() {
    let temp_dir = TempDir::new().unwrap();
    let vault = create_test_vault(
        &temp_dir,
        &[
            ("existingnote.md", "exists\n"),
            ("a.md", "[[NonExistentNote]] [[ExistingNote]]\n"),
            ("a.b.md", "[[NonExistentNote]] [[other|Missing.Two]]\n"),
        ],
    );
    let engine = engine_for(&vault);
    let report = engine.init().await.unwrap();
    assert_eq!(report.dangling, 2);

    let cache = engine.cache().unwrap();
    assert_eq!(cache.dangling, vec!["NonExistentNote", "Missing.Two"]);
    assert_eq!(
        engine.dangling_in(vault.join("a.b.md")).unwrap(),
        vec!["Missing.Two", "NonExistentNote"]
    );

    engine.write_note(Note::new("nonexistentnote")).await.unwrap();
    assert_eq!(engine.cache().unwrap().dangling, vec!["Missing.Two"]);

    // files added behind the engine's back show up on an explicit refresh
    fs::write(vault.join("late.md"), "[[ghost]]\n").unwrap();
    assert_eq!(engine.cache().unwrap().files.len(), 5);
    let refreshed = engine.refresh_cache().await.unwrap();
    assert_eq!(refreshed.dangling, vec!["ghost", "Missing.Two"]);
    assert_eq!(refreshed.files.len(), 6);
}

#[test(tokio::test)]
async fn test_rename_rewrites_links_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let vault = create_test_vault(
        &temp_dir,
        &[
            ("ideas.old.md", "---\nid: idea\ntitle: Old\n---\nthe idea\n"),
            ("journal.md", "- [[ideas.old]]\n- [[that idea|Ideas.Old]]\n"),
            ("todo.md", "- [[journal]]\n"),
        ],
    );
    let todo_before = fs::metadata(vault.join("todo.md"))
        .unwrap()
        .modified()
        .unwrap();
    let (tx, mut rx) = unbounded_channel();
    let engine = engine_for(&vault).with_events(tx);
    engine.init().await.unwrap();

    let report = engine.rename_note("ideas.old", "ideas.new").await.unwrap();
    assert_eq!(report.replacements, 2);
    assert_eq!(report.files, vec![vault.join("journal.md")]);
    assert_eq!(
        fs::read_to_string(vault.join("journal.md")).unwrap(),
        "- [[ideas.new]]\n- [[that idea|ideas.new]]\n"
    );
    assert_eq!(
        fs::metadata(vault.join("todo.md")).unwrap().modified().unwrap(),
        todo_before
    );
    assert!(!vault.join("ideas.old.md").exists());
    assert_eq!(engine.get_note("ideas.new").unwrap().id, "idea");
    assert!(engine.get_note("ideas.old").is_err());
    assert_eq!(
        engine.get_note("journal").unwrap().body,
        "- [[ideas.new]]\n- [[that idea|ideas.new]]\n"
    );

    let mut rewritten = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let EngineEvent::LinksRewritten(path, count) = event {
            rewritten.push((path, count));
        }
    }
    assert_eq!(rewritten, vec![(vault.join("journal.md"), 2)]);
}

#[test(tokio::test)]
async fn test_bad_frontmatter_fails_init() {
    let temp_dir = TempDir::new().unwrap();
    let vault = create_test_vault(&temp_dir, &[("broken.md", "---\ntitle: never closed\n")]);
    let engine = engine_for(&vault);
    match engine.init().await {
        Err(ArborError::BadParseForNote { path, .. }) => assert!(path.ends_with("broken.md")),
        other => panic!("expected a parse failure, got {other:?}"),
    }
    assert_eq!(engine.notes().unwrap_err(), ArborError::NotReady);
}
