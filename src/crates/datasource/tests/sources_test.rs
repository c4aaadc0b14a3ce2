//! Tests for the always-available data sources and the adapter factory.

use datasource::{
    connect, ContentSource, DataSource, JsonFileSource, JsonFileStoreConfig, S3StoreConfig,
    SourceError, SourceKind, StoreConfig,
};
use std::io::Write;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) {
    let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
}

fn json_store(dir: &TempDir) -> StoreConfig {
    StoreConfig::JsonFile(JsonFileStoreConfig {
        base_path: Some(dir.path().to_string_lossy().into_owned()),
    })
}

#[tokio::test]
async fn test_content_source_returns_query() {
    let source = connect(SourceKind::Content, &StoreConfig::Content).await.unwrap();
    assert_eq!(source.kind(), SourceKind::Content);
    assert_eq!(source.fetch("hello world").await.unwrap(), "hello world");
    source.close().await.unwrap();
    source.close().await.unwrap();
}

#[tokio::test]
async fn test_json_file_single_object() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "doc.json", r#"{"title": "T", "body": "the body"}"#);

    let source = connect(SourceKind::JsonFile, &json_store(&dir)).await.unwrap();
    assert_eq!(source.fetch("doc.json").await.unwrap(), "the body");
}

#[tokio::test]
async fn test_json_file_collection() {
    let dir = TempDir::new().unwrap();
    write_file(
        &dir,
        "items.json",
        r#"[{"content": "first"}, {"message": "second"}, {"id": 3}]"#,
    );

    let source = JsonFileSource::initialize(&json_store(&dir)).unwrap();
    let text = source.fetch("items.json").await.unwrap();
    assert_eq!(text, "first\n\nsecond\n\n{\n  \"id\": 3\n}");
}

#[tokio::test]
async fn test_json_file_absolute_path_without_base() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "a.json", r#"{"text": "abs"}"#);
    let path = dir.path().join("a.json");

    let source = JsonFileSource::initialize(&StoreConfig::JsonFile(JsonFileStoreConfig::default()))
        .unwrap();
    assert_eq!(source.fetch(path.to_str().unwrap()).await.unwrap(), "abs");
}

#[tokio::test]
async fn test_json_file_missing() {
    let dir = TempDir::new().unwrap();
    let source = JsonFileSource::initialize(&json_store(&dir)).unwrap();
    let err = source.fetch("nope.json").await.unwrap_err();
    assert!(matches!(err, SourceError::NotFound(_)));
}

#[tokio::test]
async fn test_json_file_malformed() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "bad.json", "{not json");
    let source = JsonFileSource::initialize(&json_store(&dir)).unwrap();
    let err = source.fetch("bad.json").await.unwrap_err();
    assert!(matches!(err, SourceError::Parse(_)));
}

#[tokio::test]
async fn test_initialize_rejects_wrong_variant() {
    let err = ContentSource::initialize(&StoreConfig::JsonFile(JsonFileStoreConfig::default()))
        .unwrap_err();
    assert!(matches!(err, SourceError::InvalidConfig(_)));

    let err = JsonFileSource::initialize(&StoreConfig::Content).unwrap_err();
    assert!(matches!(err, SourceError::InvalidConfig(_)));
}

#[tokio::test]
async fn test_connect_rejects_kind_mismatch() {
    let err = connect(SourceKind::JsonFile, &StoreConfig::Content)
        .await
        .err()
        .unwrap();
    assert!(err.is_config_error());
}

#[cfg(not(feature = "s3"))]
#[tokio::test]
async fn test_connect_backend_without_feature() {
    let config = StoreConfig::S3(S3StoreConfig {
        region: "us-east-1".to_string(),
        bucket: "docs".to_string(),
        access_key: None,
        secret_key: None,
        endpoint_url: None,
    });
    let err = connect(SourceKind::S3, &config).await.err().unwrap();
    assert!(matches!(
        err,
        SourceError::Unsupported { kind: SourceKind::S3, feature: "s3" }
    ));
}

#[tokio::test]
async fn test_connect_missing_required_field() {
    let config = StoreConfig::S3(S3StoreConfig {
        region: "us-east-1".to_string(),
        bucket: String::new(),
        access_key: None,
        secret_key: None,
        endpoint_url: None,
    });
    let err = connect(SourceKind::S3, &config).await.err().unwrap();
    assert!(matches!(err, SourceError::InvalidConfig(msg) if msg.contains("bucket")));
}
