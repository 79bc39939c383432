use crate::helpers::*;
use canopy::Error;
use canopy::TreeStore;
use canopy::backend::{FlatBackend, InMemoryBackend};

#[test]
fn test_in_memory_basic_operations() {
    let mut backend = InMemoryBackend::new();
    assert!(backend.is_empty());
    assert!(!backend.contains_key("k"));
    assert_eq!(backend.get("k"), None);

    backend.set("k", "v");
    assert!(backend.contains_key("k"));
    assert_eq!(backend.get("k").as_deref(), Some("v"));
    assert_eq!(backend.len(), 1);

    backend.set("k", "v2");
    assert_eq!(backend.get("k").as_deref(), Some("v2"));
    assert_eq!(backend.len(), 1);

    backend.delete("k");
    assert!(!backend.contains_key("k"));
    // Deleting an absent key is a no-op.
    backend.delete("k");
}

#[test]
fn test_save_and_load_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file = dir.path().join("state.json");

    {
        let store = setup_store();
        store.set_value(&path(&["a", "b"]), "1").expect("set failed");
        store.set_value(&path(&["a", "c"]), "2").expect("set failed");
        let backend = store.backend();
        backend
            .as_any()
            .downcast_ref::<InMemoryBackend>()
            .expect("not an InMemoryBackend")
            .save_to_file(&file)
            .expect("save failed");
    }

    // A store over the reloaded backend sees the same tree.
    let reloaded = InMemoryBackend::load_from_file(&file).expect("load failed");
    let store = TreeStore::new(Box::new(reloaded));
    assert_eq!(
        store.get_value(&path(&["a", "b"])).expect("get failed"),
        Some("1".to_string())
    );
    let mut children = store.children(&path(&["a"])).expect("children failed");
    children.sort();
    assert_eq!(children, vec!["b".to_string(), "c".to_string()]);
}

#[test]
fn test_load_missing_file_is_empty() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let backend =
        InMemoryBackend::load_from_file(dir.path().join("absent.json")).expect("load failed");
    assert!(backend.is_empty());
}

#[test]
fn test_encrypted_store_round_trip() {
    let store = TreeStore::with_encryption(
        Box::new(InMemoryBackend::new()),
        Box::new(Base64Obfuscator),
    );
    store.set_value(&path(&["a", "b"]), "secret").expect("set failed");

    assert_eq!(
        store.get_value(&path(&["a", "b"])).expect("get failed"),
        Some("secret".to_string())
    );
    assert_eq!(
        store.children(&path(&["a"])).expect("children failed"),
        vec!["b".to_string()]
    );

    // Nothing readable leaks into the backend: neither the encoded path
    // keys nor the tagged records appear in the clear.
    let backend = store.backend();
    let in_memory = backend
        .as_any()
        .downcast_ref::<InMemoryBackend>()
        .expect("not an InMemoryBackend");
    for key in in_memory.all_keys() {
        assert!(!key.contains("\"a\""), "plaintext key stored: {key}");
        let value = in_memory.get(&key).expect("key listed but missing");
        assert!(!value.contains("secret"), "plaintext value stored");
    }
}

#[test]
fn test_encrypted_delete_and_compaction() {
    let store = TreeStore::with_encryption(
        Box::new(InMemoryBackend::new()),
        Box::new(Base64Obfuscator),
    );
    store.set_value(&path(&["a", "b", "c"]), "1").expect("set failed");
    store.delete(&path(&["a", "b", "c"])).expect("delete failed");

    assert!(!store.contains(&path(&["a"])).expect("contains failed"));
    let backend = store.backend();
    let in_memory = backend
        .as_any()
        .downcast_ref::<InMemoryBackend>()
        .expect("not an InMemoryBackend");
    assert!(in_memory.is_empty());
}

#[test]
fn test_broken_provider_fails_fast() {
    let store = TreeStore::with_encryption(
        Box::new(InMemoryBackend::new()),
        Box::new(BrokenProvider),
    );

    assert!(matches!(
        store.set_value(&path(&["a"]), "1"),
        Err(Error::EncryptionConfig(_))
    ));
    assert!(matches!(
        store.contains(&path(&["a"])),
        Err(Error::EncryptionConfig(_))
    ));
    assert!(matches!(
        store.get_value(&path(&["a"])),
        Err(Error::EncryptionConfig(_))
    ));
}
