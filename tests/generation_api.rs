//! Generation API client tests against a local mock server.

use assert_matches::assert_matches;
use clipforge::config::GenerationConfig;
use clipforge::stage::{ImageToVideo, Stage, StageError, StageParams, TextToImage};
use clipforge_av::{ArtifactKind, ScratchDir};
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> GenerationConfig {
    GenerationConfig {
        api_key: Some("sk-test".to_string()),
        text_to_image_url: format!("{}/generation", server.uri()),
        image_to_video_url: Some(format!("{}/video", server.uri())),
        video_to_music_url: Some(format!("{}/music", server.uri())),
        ..GenerationConfig::default()
    }
}

#[tokio::test]
async fn text_to_image_downloads_hosted_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generation"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "qwen-image"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": {
                "results": [{"url": format!("{}/hosted/image.png", server.uri())}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hosted/image.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = tempdir().unwrap();
    let scratch = ScratchDir::create(temp.path().join("run")).unwrap();
    let stage = TextToImage::new(&config_for(&server)).unwrap();

    let artifact = stage
        .invoke(
            &scratch,
            &[],
            &StageParams::default().with_prompt("rainy neon street"),
        )
        .await
        .unwrap();

    assert_eq!(artifact.kind(), ArtifactKind::Image);
    assert_eq!(artifact.path().file_name().unwrap(), "frame.png");
    assert_eq!(std::fs::read(artifact.path()).unwrap(), b"png-bytes");
}

#[tokio::test]
async fn text_to_image_rejects_non_success_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generation"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let temp = tempdir().unwrap();
    let scratch = ScratchDir::create(temp.path().join("run")).unwrap();
    let stage = TextToImage::new(&config_for(&server)).unwrap();

    let err = stage
        .invoke(&scratch, &[], &StageParams::default().with_prompt("x"))
        .await
        .unwrap_err();
    assert_matches!(err, StageError::ExternalCall(msg) if msg.contains("429"));

    // No partial output artifact may exist.
    assert!(!scratch.root().join("frame.png").exists());
}

#[tokio::test]
async fn text_to_image_rejects_response_without_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": {"results": []}
        })))
        .mount(&server)
        .await;

    let temp = tempdir().unwrap();
    let scratch = ScratchDir::create(temp.path().join("run")).unwrap();
    let stage = TextToImage::new(&config_for(&server)).unwrap();

    let err = stage
        .invoke(&scratch, &[], &StageParams::default().with_prompt("x"))
        .await
        .unwrap_err();
    assert_matches!(err, StageError::ExternalCall(_));
}

#[tokio::test]
async fn text_to_image_requires_prompt() {
    let server = MockServer::start().await;
    let temp = tempdir().unwrap();
    let scratch = ScratchDir::create(temp.path().join("run")).unwrap();
    let stage = TextToImage::new(&config_for(&server)).unwrap();

    let err = stage
        .invoke(&scratch, &[], &StageParams::default())
        .await
        .unwrap_err();
    assert_matches!(err, StageError::MissingParam("prompt"));
}

#[tokio::test]
async fn text_to_image_requires_api_key() {
    let config = GenerationConfig::default();
    assert_matches!(
        TextToImage::new(&config),
        Err(StageError::MissingParam("generation.api_key"))
    );
}

#[tokio::test]
async fn image_to_video_writes_returned_bytes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/video"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"duration_secs": 8})))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = tempdir().unwrap();
    let scratch = ScratchDir::create(temp.path().join("run")).unwrap();

    // Source still the stage animates.
    let image = scratch
        .allocate(ArtifactKind::Image, "frame.png", "text_to_image")
        .unwrap();
    std::fs::write(image.path(), b"png-bytes").unwrap();

    let stage = ImageToVideo::new(&config_for(&server), 8).unwrap();
    let artifact = stage
        .invoke(
            &scratch,
            &[image],
            &StageParams::default().with_prompt("animate it"),
        )
        .await
        .unwrap();

    assert_eq!(artifact.kind(), ArtifactKind::Video);
    assert_eq!(artifact.path().file_name().unwrap(), "anim.mp4");
    assert_eq!(std::fs::read(artifact.path()).unwrap(), b"mp4-bytes");
}

#[tokio::test]
async fn image_to_video_requires_image_input() {
    let server = MockServer::start().await;
    let temp = tempdir().unwrap();
    let scratch = ScratchDir::create(temp.path().join("run")).unwrap();

    let stage = ImageToVideo::new(&config_for(&server), 8).unwrap();
    let err = stage
        .invoke(&scratch, &[], &StageParams::default())
        .await
        .unwrap_err();
    assert_matches!(
        err,
        StageError::MissingInput {
            expected: ArtifactKind::Image
        }
    );
}
