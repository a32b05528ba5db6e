use super::*;

fn entry(key: &str, category: &str, tags: &[&str]) -> MemoryEntry {
    MemoryEntry::new(key, format!("content of {key}"), category)
        .with_tags(tags.iter().map(|t| t.to_string()).collect())
        .with_source("test")
}

#[tokio::test]
async fn test_record_persists_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = JsonMemoryStore::default_path(dir.path());

    let store = JsonMemoryStore::open(&path, 10).await.unwrap();
    store.record(entry("a", "task", &["coder"])).await.unwrap();
    store.record(entry("b", "pattern", &[])).await.unwrap();
    assert!(path.exists());

    let reopened = JsonMemoryStore::open(&path, 10).await.unwrap();
    let keys: Vec<String> = reopened.entries().await.into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec!["a", "b"]);
}

#[tokio::test]
async fn test_oldest_evicted_at_cap() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonMemoryStore::open(dir.path().join("m.json"), 2).await.unwrap();
    for key in ["one", "two", "three"] {
        store.record(entry(key, "task", &[])).await.unwrap();
    }

    let keys: Vec<String> = store.entries().await.into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec!["two", "three"]);
}

#[tokio::test]
async fn test_same_key_replaces() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonMemoryStore::open(dir.path().join("m.json"), 10).await.unwrap();
    store.record(entry("k", "task", &[])).await.unwrap();
    store
        .record(MemoryEntry::new("k", "updated", "task"))
        .await
        .unwrap();

    let entries = store.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content, "updated");
}

#[tokio::test]
async fn test_context_scoping() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonMemoryStore::open(dir.path().join("m.json"), 10).await.unwrap();
    store.record(entry("fix-login", "task", &["coder"])).await.unwrap();
    store.record(entry("style", "pattern", &[])).await.unwrap();

    let coder = store.load_context("coder").await.unwrap();
    assert!(coder.starts_with("## Memory\n"));
    assert!(coder.contains("[task] fix-login"));
    assert!(!coder.contains("style"));

    let all = store.load_context("").await.unwrap();
    assert!(all.contains("fix-login") && all.contains("style"));

    assert_eq!(store.load_context("nobody").await.unwrap(), "");
}

#[tokio::test]
async fn test_corrupt_file_treated_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("m.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = JsonMemoryStore::open(&path, 10).await.unwrap();
    assert!(store.entries().await.is_empty());
}
