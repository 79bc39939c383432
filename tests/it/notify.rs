use crate::helpers::*;
use canopy::TreePath;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const SETTLE: Duration = Duration::from_secs(5);

/// Subscribes with a collector and returns the shared seen-paths map.
fn collect_changes(store: &canopy::TreeStore) -> Arc<Mutex<HashMap<TreePath, usize>>> {
    let seen: Arc<Mutex<HashMap<TreePath, usize>>> = Arc::new(Mutex::new(HashMap::new()));
    let sink = Arc::clone(&seen);
    store.changes().subscribe(move |changed| {
        *sink.lock().entry(changed.clone()).or_insert(0) += 1;
    });
    seen
}

#[test]
fn test_set_notifies_every_mutated_path() {
    let store = setup_store();
    let seen = collect_changes(&store);

    store.set_value(&path(&["a", "b", "c"]), "1").expect("set failed");
    assert!(store.changes().wait_idle(SETTLE), "dispatcher never drained");

    let seen = seen.lock();
    // Two materialized ancestors plus the leaf, exactly once each.
    assert_eq!(seen.len(), 3);
    assert_eq!(seen.get(&path(&["a"])), Some(&1));
    assert_eq!(seen.get(&path(&["a", "b"])), Some(&1));
    assert_eq!(seen.get(&path(&["a", "b", "c"])), Some(&1));
}

#[test]
fn test_unchanged_ancestors_not_notified() {
    let store = setup_store();
    store.set_value(&path(&["a", "b"]), "1").expect("set failed");
    store.changes().wait_idle(SETTLE);

    let seen = collect_changes(&store);
    // The parent already lists "c"'s sibling chain; only the new leaf and
    // the rewritten parent change.
    store.set_value(&path(&["a", "c"]), "2").expect("set failed");
    assert!(store.changes().wait_idle(SETTLE));
    {
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.get(&path(&["a"])), Some(&1));
        assert_eq!(seen.get(&path(&["a", "c"])), Some(&1));
    }

    // Overwriting an existing leaf touches only the leaf.
    store.set_value(&path(&["a", "c"]), "3").expect("set failed");
    assert!(store.changes().wait_idle(SETTLE));
    assert_eq!(seen.lock().get(&path(&["a", "c"])), Some(&2));
    assert_eq!(seen.lock().len(), 2);
}

#[test]
fn test_delete_notifies_subtree_and_compacted_ancestors() {
    let store = setup_store();
    store.set_value(&path(&["a", "b", "x"]), "1").expect("set failed");
    store.set_value(&path(&["a", "b", "y"]), "2").expect("set failed");
    store.changes().wait_idle(SETTLE);

    let seen = collect_changes(&store);
    store.delete(&path(&["a", "b"])).expect("delete failed");
    assert!(store.changes().wait_idle(SETTLE));

    let seen = seen.lock();
    // x and y removed, then b, then the emptied a.
    assert_eq!(seen.len(), 4);
    for p in [
        path(&["a", "b", "x"]),
        path(&["a", "b", "y"]),
        path(&["a", "b"]),
        path(&["a"]),
    ] {
        assert_eq!(seen.get(&p), Some(&1), "missing notification for {p}");
    }
}

#[test]
fn test_panicking_subscriber_is_isolated() {
    let store = setup_store();

    store.changes().subscribe(|_changed| {
        panic!("subscriber failure");
    });
    let seen = collect_changes(&store);

    store.set_value(&path(&["a"]), "1").expect("set failed");
    store.set_value(&path(&["b"]), "2").expect("set failed");
    assert!(store.changes().wait_idle(SETTLE), "panic halted drainage");

    let seen = seen.lock();
    assert_eq!(seen.get(&path(&["a"])), Some(&1));
    assert_eq!(seen.get(&path(&["b"])), Some(&1));
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let store = setup_store();
    let seen: Arc<Mutex<Vec<TreePath>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = store
        .changes()
        .subscribe(move |changed| sink.lock().push(changed.clone()));

    store.set_value(&path(&["a"]), "1").expect("set failed");
    assert!(store.changes().wait_idle(SETTLE));
    assert_eq!(seen.lock().len(), 1);

    store.changes().unsubscribe(id);
    store.set_value(&path(&["b"]), "2").expect("set failed");
    assert!(store.changes().wait_idle(SETTLE));
    assert_eq!(seen.lock().len(), 1);
}

#[test]
fn test_failed_delete_notifies_nothing() {
    let store = setup_store();
    let seen = collect_changes(&store);

    store.delete(&path(&["never", "existed"])).expect("delete failed");
    assert!(store.changes().wait_idle(SETTLE));
    assert!(seen.lock().is_empty());
}
