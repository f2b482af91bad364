use super::*;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "cardsmith_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn exercise(store: &dyn BlobStore) {
    assert!(store.is_supported());
    store.put("a", vec![1, 2, 3], "a.png").unwrap();
    store.put("b", vec![4], "b.png").unwrap();
    store.put("a", vec![9, 9], "a2.png").unwrap();

    let a = store.get("a").unwrap().unwrap();
    assert_eq!(a.bytes, vec![9, 9]);
    assert_eq!(a.name, "a2.png");
    assert_eq!(a.size, 2);
    assert!(store.get("missing").unwrap().is_none());

    let mut ids: Vec<String> = store.list().unwrap().into_iter().map(|r| r.id).collect();
    ids.sort();
    assert_eq!(ids, ["a", "b"]);

    assert!(store.delete("b").unwrap());
    assert!(!store.delete("b").unwrap());
    store.clear().unwrap();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn memory_store_round_trips() {
    exercise(&MemoryBlobStore::new());
}

#[test]
fn dir_store_round_trips_and_persists() {
    let tmp = temp_dir("dir_store");
    exercise(&DirBlobStore::open(&tmp).unwrap());

    let store = DirBlobStore::open(&tmp).unwrap();
    store.put("kept", vec![7; 16], "k.jpg").unwrap();
    let reopened = DirBlobStore::open(&tmp).unwrap();
    assert_eq!(reopened.get("kept").unwrap().unwrap().bytes, vec![7; 16]);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn path_like_ids_are_rejected() {
    let store = MemoryBlobStore::new();
    for id in ["", "..", "a/b", "x\\y"] {
        assert!(matches!(
            store.put(id, vec![1], "n"),
            Err(CardError::Validation(_))
        ));
    }
}

#[test]
fn unsupported_store_fails_fast() {
    let store = UnsupportedBlobStore;
    assert!(!store.is_supported());
    assert!(matches!(
        store.put("a", vec![], "a"),
        Err(CardError::Storage(_))
    ));
    assert!(store.get("a").is_err());
    assert!(store.list().is_err());
}
