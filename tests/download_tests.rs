//! Mock HTTP tests for the artifact download boundary.

use neon_dream::download::{artifact_filename, DownloadError, Downloader};
use neon_dream::session::{MediaItem, MediaKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_save_streams_remote_video_to_disk() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/videos/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let item = MediaItem::new(
        MediaKind::Video,
        format!("{}/videos/clip.mp4?key=test-key", mock_server.uri()),
        "a floating city".to_string(),
    );

    let dir = tempfile::tempdir().unwrap();
    let dest = Downloader::new().save(&item, dir.path()).await.unwrap();

    assert_eq!(
        dest.file_name().unwrap().to_str().unwrap(),
        artifact_filename(&item)
    );
    assert!(dest.to_string_lossy().ends_with(".mp4"));
    assert_eq!(std::fs::read(&dest).unwrap(), b"mp4-bytes");
}

#[tokio::test]
async fn test_save_surfaces_http_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/videos/missing.mp4"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let item = MediaItem::new(
        MediaKind::Video,
        format!("{}/videos/missing.mp4", mock_server.uri()),
        "a floating city".to_string(),
    );

    let dir = tempfile::tempdir().unwrap();
    let result = Downloader::new().save(&item, dir.path()).await;

    match result {
        Err(DownloadError::Api(message)) => {
            assert!(message.contains("404"));
            assert!(message.contains("gone"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_save_creates_missing_directories() {
    let item = MediaItem::new(
        MediaKind::Image,
        neon_dream::data_uri::encode("image/png", b"pixels"),
        "a floating city".to_string(),
    );

    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("exports").join("today");
    let dest = Downloader::new().save(&item, &nested).await.unwrap();

    assert!(dest.starts_with(&nested));
    assert_eq!(std::fs::read(&dest).unwrap(), b"pixels");
}
