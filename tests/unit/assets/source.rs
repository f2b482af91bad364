use super::*;
use crate::assets::blob::MemoryBlobStore;

#[test]
fn parses_each_reference_kind() {
    assert_eq!(
        ImageRef::parse("stored:abc").unwrap(),
        ImageRef::Stored("abc".to_owned())
    );
    assert_eq!(
        ImageRef::parse("indexeddb:abc").unwrap(),
        ImageRef::Stored("abc".to_owned()),
        "legacy prefix"
    );
    assert_eq!(
        ImageRef::parse("img/./a.png").unwrap(),
        ImageRef::Path("img/a.png".to_owned())
    );
    assert_eq!(
        ImageRef::parse("img\\b.png").unwrap(),
        ImageRef::Path("img/b.png".to_owned())
    );
    assert!(matches!(
        ImageRef::parse("https://example.com/a.png").unwrap(),
        ImageRef::Remote(_)
    ));
    assert!(ImageRef::parse("stored:").is_err());
}

#[test]
fn unsafe_paths_are_rejected() {
    for bad in ["/etc/passwd", "../up.png", "a/../../b.png", "C:/x.png", "", "./"] {
        assert!(ImageRef::parse(bad).is_err(), "{bad}");
    }
}

#[test]
fn data_urls_decode_base64_and_percent_payloads() {
    let ImageRef::DataUrl { mime, bytes } = ImageRef::parse("data:image/png;base64,AQID").unwrap()
    else {
        panic!("expected data URL");
    };
    assert_eq!(mime, "image/png");
    assert_eq!(bytes, vec![1, 2, 3]);

    let ImageRef::DataUrl { mime, bytes } =
        ImageRef::parse("data:image/svg+xml,%3Csvg%3E%zz").unwrap()
    else {
        panic!("expected data URL");
    };
    assert_eq!(mime, "image/svg+xml");
    assert_eq!(bytes, b"<svg>%zz".to_vec());

    assert!(ImageRef::parse("data:image/png;base64,@@@").is_err());
    assert!(ImageRef::parse("data:image/png;base64").is_err());
}

#[test]
fn resolver_fetches_from_blobs_and_files() {
    let blobs = Arc::new(MemoryBlobStore::new());
    blobs.put("logo", vec![5, 6], "logo.png").unwrap();

    let root = std::env::temp_dir().join(format!("cardsmith_resolver_{}", std::process::id()));
    std::fs::create_dir_all(root.join("img")).unwrap();
    std::fs::write(root.join("img/a.bin"), [9u8; 3]).unwrap();

    let resolver = ImageResolver::new()
        .with_assets_root(&root)
        .with_blob_store(blobs);
    assert_eq!(resolver.fetch_str(&stored_reference("logo")).unwrap(), vec![5, 6]);
    assert_eq!(resolver.fetch_str("img/a.bin").unwrap(), vec![9, 9, 9]);
    assert!(matches!(
        resolver.fetch_str("stored:nope"),
        Err(CardError::Storage(_))
    ));
    assert!(resolver.fetch_str("img/missing.png").is_err());
    assert!(resolver.fetch_str("https://example.com/x.png").is_err());

    let bare = ImageResolver::new();
    assert!(bare.fetch_str("stored:logo").is_err());

    std::fs::remove_dir_all(&root).ok();
}
