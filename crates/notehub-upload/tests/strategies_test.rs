//! Upload strategies against a mocked storage REST API.
//!
//! Run with: `cargo test -p notehub-upload --test strategies_test`

use bytes::Bytes;
use mockito::{Matcher, Server, ServerGuard};
use notehub_core::models::{FileKind, UserIdentity};
use notehub_core::{Config, NoteError, SessionProvider, StorageBackend};
use notehub_storage::{ObjectStorage, SupabaseStorage};
use notehub_upload::{
    MultipartFormStrategy, NativeSdkStrategy, PresignedPutStrategy, StaticSession, StrategyError,
    UploadPayload, UploadStrategy, UploadStrategyChain,
};
use std::sync::Arc;
use std::time::Duration;

const OBJECT_PATH: &str = "/storage/v1/object/notes/u1/1700000000000_photo.png";

fn session() -> Arc<dyn SessionProvider> {
    Arc::new(StaticSession::signed_in(UserIdentity::new("u1"), "user-token"))
}

fn payload() -> UploadPayload {
    UploadPayload {
        data: Bytes::from_static(b"fake png body for upload"),
        storage_path: "u1/1700000000000_photo.png".into(),
        content_type: "image/png".into(),
        file_kind: FileKind::Image,
    }
}

fn storage(server: &ServerGuard) -> Arc<dyn ObjectStorage> {
    Arc::new(
        SupabaseStorage::new(
            format!("{}/storage/v1", server.url()),
            "notes",
            "anon-key",
            session(),
            Duration::from_secs(5),
        )
        .unwrap(),
    )
}

fn multipart(server: &ServerGuard) -> MultipartFormStrategy {
    MultipartFormStrategy::new(
        format!("{}/storage/v1", server.url()),
        "notes",
        "anon-key",
        session(),
        storage(server),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn public_url(server: &ServerGuard) -> String {
    format!(
        "{}/storage/v1/object/public/notes/u1/1700000000000_photo.png",
        server.url()
    )
}

#[tokio::test]
async fn test_native_strategy_posts_raw_bytes() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", OBJECT_PATH)
        .match_header("authorization", "Bearer user-token")
        .match_header("apikey", "anon-key")
        .match_header("content-type", "image/png")
        .match_header("x-upsert", "false")
        .with_status(200)
        .with_body(r#"{"Key":"notes/u1/1700000000000_photo.png"}"#)
        .create_async()
        .await;

    let url = NativeSdkStrategy::new(storage(&server))
        .upload(&payload())
        .await
        .unwrap();

    assert_eq!(url, public_url(&server));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_multipart_strategy_sends_form_with_file_part() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", OBJECT_PATH)
        .match_header("authorization", "Bearer user-token")
        .match_header("apikey", "anon-key")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".into()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="cacheControl""#.into()),
            Matcher::Regex(r#"name="file"; filename="1700000000000_photo.png""#.into()),
            Matcher::Regex("Content-Type: image/png".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"Key":"notes/u1/1700000000000_photo.png"}"#)
        .create_async()
        .await;

    let url = multipart(&server).upload(&payload()).await.unwrap();

    assert_eq!(url, public_url(&server));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_multipart_strategy_classifies_failures() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", OBJECT_PATH)
        .with_status(415)
        .with_body(r#"{"error":"invalid_mime_type"}"#)
        .create_async()
        .await;

    let err = multipart(&server).upload(&payload()).await.unwrap_err();
    assert!(err.is_terminal(), "415 should be terminal, got {:?}", err);

    let mut server = Server::new_async().await;
    server
        .mock("POST", OBJECT_PATH)
        .with_status(503)
        .create_async()
        .await;

    let err = multipart(&server).upload(&payload()).await.unwrap_err();
    assert!(err.is_retryable(), "503 should be retryable, got {:?}", err);
}

#[tokio::test]
async fn test_presigned_strategy_signs_then_puts_without_auth() {
    let mut server = Server::new_async().await;
    let sign = server
        .mock(
            "POST",
            "/storage/v1/object/upload/sign/notes/u1/1700000000000_photo.png",
        )
        .match_header("authorization", "Bearer user-token")
        .with_status(200)
        .with_body(r#"{"url":"/object/upload/sign/notes/u1/1700000000000_photo.png?token=signed-abc"}"#)
        .create_async()
        .await;
    let put = server
        .mock(
            "PUT",
            "/storage/v1/object/upload/sign/notes/u1/1700000000000_photo.png",
        )
        .match_query(Matcher::UrlEncoded("token".into(), "signed-abc".into()))
        .match_header("authorization", Matcher::Missing)
        .match_header("content-type", "image/png")
        .with_status(200)
        .create_async()
        .await;

    let strategy =
        PresignedPutStrategy::new(storage(&server), Duration::from_secs(600), Duration::from_secs(5))
            .unwrap();
    let url = strategy.upload(&payload()).await.unwrap();

    assert_eq!(url, public_url(&server));
    sign.assert_async().await;
    put.assert_async().await;
}

#[tokio::test]
async fn test_presigned_strategy_unavailable_without_signing() {
    let dir = tempfile::tempdir().unwrap();
    let local: Arc<dyn ObjectStorage> = Arc::new(
        notehub_storage::LocalStorage::new(dir.path(), "http://localhost/notes".to_string())
            .await
            .unwrap(),
    );

    let err = PresignedPutStrategy::new(local, Duration::from_secs(600), Duration::from_secs(5))
        .unwrap()
        .upload(&payload())
        .await
        .unwrap_err();

    assert!(matches!(err, StrategyError::Unavailable(_)));
}

fn chain_config(server: &ServerGuard) -> Config {
    let mut config = Config::new(server.url(), "anon-key");
    config.storage_backend = StorageBackend::Supabase;
    config.retry_base_delay_ms = 1;
    config.network_timeout_secs = 5;
    config
}

#[tokio::test]
async fn test_standard_chain_falls_back_to_multipart() {
    let mut server = Server::new_async().await;
    let native = server
        .mock("POST", OBJECT_PATH)
        .match_header("content-type", "image/png")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;
    let multipart = server
        .mock("POST", OBJECT_PATH)
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data".into()),
        )
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let config = chain_config(&server);
    let chain = UploadStrategyChain::standard(&config, storage(&server), session()).unwrap();
    assert_eq!(
        chain.strategy_names(),
        vec!["native_sdk", "multipart_form", "presigned_put"]
    );

    let p = payload();
    let result = chain
        .upload(p.data, &p.storage_path, &p.content_type, p.file_kind)
        .await
        .unwrap();

    assert_eq!(result.remote_url, public_url(&server));
    native.assert_async().await;
    multipart.assert_async().await;
}

#[tokio::test]
async fn test_standard_chain_stops_on_rejection() {
    let mut server = Server::new_async().await;
    let native = server
        .mock("POST", OBJECT_PATH)
        .match_header("content-type", "image/png")
        .with_status(413)
        .with_body(r#"{"error":"Payload too large"}"#)
        .expect(1)
        .create_async()
        .await;
    let multipart = server
        .mock("POST", OBJECT_PATH)
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data".into()),
        )
        .expect(0)
        .create_async()
        .await;

    let config = chain_config(&server);
    let chain = UploadStrategyChain::standard(&config, storage(&server), session()).unwrap();

    let p = payload();
    let err = chain
        .upload(p.data, &p.storage_path, &p.content_type, p.file_kind)
        .await
        .unwrap_err();

    assert!(matches!(err, NoteError::UploadExhausted { strategies: 1, .. }));
    native.assert_async().await;
    multipart.assert_async().await;
}
