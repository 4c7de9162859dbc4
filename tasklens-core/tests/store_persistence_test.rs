//! Persistence tests for TaskStore

use tasklens_core::{Error, ImageRef, TaskFilter, TaskStore};
use tempfile::TempDir;

#[test]
fn test_open_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = TaskStore::open(dir.path().join("tasks.json")).unwrap();
    assert!(store.is_empty());
    // Nothing is written until the first mutation
    assert!(!dir.path().join("tasks.json").exists());
}

#[test]
fn test_every_mutation_is_persisted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("tasks.json");

    let mut store = TaskStore::open(&path).unwrap();
    let milk = store.add("buy milk").unwrap();
    let run = store.add("go for a run").unwrap();
    store.toggle(milk.id).unwrap();
    store
        .update_image(run.id, Some(ImageRef::DataUrl("data:image/png;base64,AAAA".to_string())))
        .unwrap();
    assert!(path.exists());

    let reopened = TaskStore::open(&path).unwrap();
    assert_eq!(reopened.tasks(), store.tasks());
    assert!(reopened.get(milk.id).unwrap().completed);
    assert!(reopened.get(run.id).unwrap().has_proof());
    assert_eq!(reopened.filtered(TaskFilter::Active).len(), 1);
}

#[test]
fn test_delete_and_clear_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");

    let mut store = TaskStore::open(&path).unwrap();
    let a = store.add("a").unwrap();
    let b = store.add("b").unwrap();
    let c = store.add("c").unwrap();
    store.delete(a.id).unwrap();
    store.toggle(b.id).unwrap();
    assert_eq!(store.clear_completed().unwrap(), 1);

    let reopened = TaskStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.tasks()[0].id, c.id);
}

#[test]
fn test_no_temp_file_left_behind() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");

    let mut store = TaskStore::open(&path).unwrap();
    store.add("tidy").unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["tasks.json".to_string()]);
}

#[test]
fn test_corrupt_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    std::fs::write(&path, "{ not json").unwrap();

    match TaskStore::open(&path) {
        Err(Error::Deserialization(msg)) => assert!(msg.contains("tasks.json")),
        Err(other) => panic!("Expected Deserialization error, got {}", other),
        Ok(_) => panic!("Expected Deserialization error"),
    }
}

#[test]
fn test_blank_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    std::fs::write(&path, "\n").unwrap();

    let store = TaskStore::open(&path).unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_failed_write_rolls_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");

    let mut store = TaskStore::open(&path).unwrap();
    // A directory where the data file should be makes the final rename fail
    std::fs::create_dir(&path).unwrap();

    assert!(store.add("lost").is_err());
    assert!(store.is_empty());
}

#[test]
fn test_linked_photo_is_stored_as_absolute_path() {
    // Relative to the working directory, like a path typed on the command line
    let work = tempfile::tempdir_in(".").unwrap();
    let relative = work.path().join("photo.png");
    assert!(relative.is_relative());
    std::fs::write(&relative, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    let mut store = TaskStore::open(&path).unwrap();
    let task = store.add("receipt").unwrap();
    store
        .update_image(task.id, Some(ImageRef::link_file(&relative).unwrap()))
        .unwrap();

    let reopened = TaskStore::open(&path).unwrap();
    match &reopened.get(task.id).unwrap().proof_image {
        Some(ImageRef::Path(stored)) => {
            assert!(stored.is_absolute());
            assert!(stored.is_file());
            assert_eq!(stored, &relative.canonicalize().unwrap());
        }
        other => panic!("Expected linked path, got {:?}", other),
    }
}
