use photostrip::{PhotoStore, StoredFormat};

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "photostrip_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn put_then_get_round_trips() {
    let tmp = temp_dir("store_round_trip");
    let store = PhotoStore::open(&tmp).unwrap();

    let bytes = b"pretend this is a png".to_vec();
    let stored = store.put(&bytes, StoredFormat::Png).unwrap();
    assert_eq!(stored.id.len(), 16);
    assert!(stored.path.ends_with(format!("{}.png", stored.id)));
    assert_eq!(stored.format.mime_type(), "image/png");

    let back = store.get(&stored.id).unwrap();
    assert_eq!(back, bytes);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn put_is_write_once_idempotent() {
    let tmp = temp_dir("store_idempotent");
    let store = PhotoStore::open(&tmp).unwrap();

    let bytes = vec![7u8; 64];
    let first = store.put(&bytes, StoredFormat::Jpeg).unwrap();
    let second = store.put(&bytes, StoredFormat::Jpeg).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.path, second.path);

    let files: Vec<_> = std::fs::read_dir(&tmp).unwrap().collect();
    assert_eq!(files.len(), 1);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn distinct_content_gets_distinct_ids() {
    let tmp = temp_dir("store_distinct");
    let store = PhotoStore::open(&tmp).unwrap();

    let a = store.put(b"print a", StoredFormat::Png).unwrap();
    let b = store.put(b"print b", StoredFormat::Png).unwrap();
    assert_ne!(a.id, b.id);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn get_rejects_malformed_and_unknown_ids() {
    let tmp = temp_dir("store_bad_ids");
    let store = PhotoStore::open(&tmp).unwrap();

    assert!(store.get("../../etc/passwd").is_err());
    assert!(store.get("0123456789ABCDEF").is_err());
    // Well-formed but absent.
    assert!(store.get("0123456789abcdef").is_err());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn empty_payload_is_refused() {
    let tmp = temp_dir("store_empty");
    let store = PhotoStore::open(&tmp).unwrap();
    assert!(store.put(&[], StoredFormat::Png).is_err());
    std::fs::remove_dir_all(&tmp).ok();
}
