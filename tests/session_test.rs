//! Tests for Session: presentation commands and document persistence

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use idforest::application::services::{HighlightScope, Session};
use idforest::application::ApplicationError;
use idforest::domain::{Document, HierarchyEntry, IdentityId, IdentityTreeModel};
use idforest::infrastructure::traits::{FileSystem, Prompt, RealFileSystem};
use idforest::util::testing;

/// Prompt answering from a queue; an exhausted queue means "cancel".
struct ScriptedPrompt {
    answers: Mutex<Vec<Option<String>>>,
}

impl ScriptedPrompt {
    fn new(answers: &[Option<&str>]) -> Self {
        let mut answers: Vec<Option<String>> =
            answers.iter().map(|a| a.map(str::to_string)).collect();
        answers.reverse();
        Self {
            answers: Mutex::new(answers),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&self, _label: &str) -> Result<Option<String>, String> {
        Ok(self.answers.lock().unwrap().pop().flatten())
    }
}

/// In-memory filesystem that can be told to fail writes.
#[derive(Default)]
struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
    fail_writes: bool,
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn ensure_parent(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

fn session_with(fs: Arc<dyn FileSystem>, answers: &[Option<&str>]) -> Session {
    testing::init_test_setup();
    Session::with_model(
        IdentityTreeModel::with_seed(11),
        fs,
        Arc::new(ScriptedPrompt::new(answers)),
    )
}

// ============================================================
// Commands
// ============================================================

#[test]
fn given_prompted_name_when_adding_without_selection_then_creates_root() {
    // Arrange
    let mut session = session_with(Arc::new(MemoryFileSystem::default()), &[Some("Alice")]);

    // Act
    let added = session.add(None).unwrap();

    // Assert
    assert_eq!(added.len(), 1);
    assert_eq!(session.model().roots(), added.as_slice());
    assert_eq!(session.model().node(added[0]).unwrap().label(), "Alice");
}

#[test]
fn given_alice_scenario_when_driving_session_then_highlights_follow_counts() {
    let mut session = session_with(Arc::new(MemoryFileSystem::default()), &[]);
    let alice = session.add(Some("Alice")).unwrap()[0];
    session.select(&[alice]).unwrap();

    let copy = session.instance_selected().unwrap()[0];
    assert!(session.is_highlighted(alice));
    assert!(session.is_highlighted(copy));

    session.select(&[alice]).unwrap();
    let evicted = session.delete_selected().unwrap();
    assert!(evicted.is_empty());
    session.select(&[copy]).unwrap();
    assert!(!session.is_highlighted(copy));
    assert_eq!(session.model().snapshot_identities().len(), 1);

    let evicted = session.delete_selected().unwrap();
    assert_eq!(evicted.len(), 1);
    assert!(session.model().snapshot_identities().is_empty());
}

#[test]
fn given_instances_when_renaming_via_prompt_then_all_labels_updated() {
    let mut session = session_with(Arc::new(MemoryFileSystem::default()), &[Some("Bob2")]);
    let bob = session.add(Some("Bob")).unwrap()[0];
    session.select(&[bob]).unwrap();
    let copy = session.instance_selected().unwrap()[0];

    let synced = session.rename(copy, None).unwrap();

    assert_eq!(synced.len(), 2);
    assert_eq!(session.model().node(bob).unwrap().label(), "Bob2");
    assert_eq!(session.model().node(copy).unwrap().label(), "Bob2");
}

#[test]
fn given_unrelated_shared_identity_when_selection_scope_then_not_highlighted() {
    let mut session = session_with(Arc::new(MemoryFileSystem::default()), &[]);
    let a = session.add(Some("A")).unwrap()[0];
    let b = session.add(Some("B")).unwrap()[0];
    session.select(&[a]).unwrap();
    let a_copy = session.instance_selected().unwrap()[0];

    session.select(&[b]).unwrap();

    assert!(!session.is_highlighted(a));
    assert!(!session.is_highlighted(a_copy));
    assert_eq!(session.scope(), HighlightScope::Selection);
}

// ============================================================
// Persistence
// ============================================================

#[test]
fn given_forest_when_saving_and_loading_then_round_trips() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested/forest.json");
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let mut session = session_with(fs.clone(), &[]);
    let root = session.add(Some("Root")).unwrap()[0];
    session.select(&[root]).unwrap();
    let kid = session.add(Some("Kid")).unwrap()[0];
    session.select(&[kid]).unwrap();
    session.instance_selected().unwrap();
    let saved = session.to_document().unwrap();

    // Act
    session.save(&path).unwrap();
    let mut reloaded = session_with(fs, &[]);
    reloaded.load(&path).unwrap();

    // Assert
    assert_eq!(reloaded.to_document().unwrap(), saved);
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(raw["nodes"][0]["class_name"], "Person");
    assert_eq!(raw["hierarchy"][0]["children"][0]["children"], serde_json::json!([]));
}

#[test]
fn given_missing_file_when_loading_then_empty_forest() {
    let mut session = session_with(Arc::new(MemoryFileSystem::default()), &[]);
    session.add(Some("stale")).unwrap();

    session.load(Path::new("/nowhere/forest.json")).unwrap();

    assert!(session.model().is_empty());
    assert!(session.selection().is_empty());
}

#[test]
fn given_broken_json_when_loading_then_invalid_document() {
    let fs = Arc::new(MemoryFileSystem::default());
    fs.write(Path::new("forest.json"), "{ not json").unwrap();
    let mut session = session_with(fs, &[]);

    let result = session.load(Path::new("forest.json"));

    assert!(matches!(result, Err(ApplicationError::InvalidDocument { .. })));
}

#[test]
fn given_failing_filesystem_when_saving_then_error_surfaced() {
    let fs = Arc::new(MemoryFileSystem {
        fail_writes: true,
        ..MemoryFileSystem::default()
    });
    let mut session = session_with(fs, &[]);
    session.add(Some("x")).unwrap();

    let result = session.save(Path::new("forest.json"));

    assert!(matches!(result, Err(ApplicationError::OperationFailed { .. })));
}

#[test]
fn given_legacy_document_when_loading_then_builds_forest() {
    let fs = Arc::new(MemoryFileSystem::default());
    let legacy = r#"{
        "nodes": [
            {"class_name": "Person", "name": "Ann", "age": 12, "uid": "0b7d6a0e-6f3a-4d55-9f55-3c5c1b0d9a10"}
        ],
        "hierarchy": [
            {"uid": "0b7d6a0e-6f3a-4d55-9f55-3c5c1b0d9a10", "children": [
                {"uid": "0b7d6a0e-6f3a-4d55-9f55-3c5c1b0d9a10", "children": []}
            ]}
        ]
    }"#;
    fs.write(Path::new("legacy.json"), legacy).unwrap();
    let mut session = session_with(fs, &[]).with_scope(HighlightScope::Forest);

    session.load(Path::new("legacy.json")).unwrap();

    assert_eq!(session.model().len(), 2);
    assert_eq!(session.model().identity_count(), 1);
    assert_eq!(session.highlighted().len(), 2);
    let doc: Document = session.to_document().unwrap();
    assert_eq!(doc.nodes[0].age, 12);
}

#[test]
fn given_document_with_unknown_identity_when_loading_then_session_keeps_state() {
    // Arrange
    let fs = Arc::new(MemoryFileSystem::default());
    let mut session = session_with(fs.clone(), &[]);
    let root = session.add(Some("Root")).unwrap()[0];
    session.select(&[root]).unwrap();
    session.instance_selected().unwrap();
    session.select(&[root]).unwrap();
    let before = session.to_document().unwrap();
    let mut broken = before.clone();
    broken.hierarchy.push(HierarchyEntry {
        id: IdentityId::new(),
        children: vec![],
    });
    fs.write(Path::new("broken.json"), &broken.to_json().unwrap())
        .unwrap();

    // Act
    let result = session.load(Path::new("broken.json"));

    // Assert
    assert!(matches!(result, Err(ApplicationError::InvalidDocument { .. })));
    assert_eq!(session.to_document().unwrap(), before);
    assert_eq!(session.selection(), &[root]);
    assert!(session.is_highlighted(root));
}
