//! End-to-end provider-shape tests against mock backends
//!
//! One test per backend shape exercising the full submit → poll → extract
//! workflow, plus submission failure classification.

use imagegen_probe::{
    Artifact, ArtifactKind, CancellationToken, Error, GenerationRequest, HttpDiagnostic,
    JobStatus, PollConfig, ProbeClient, Provider, ProviderConfig, SubmissionError, SubmitOutcome,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_poll() -> PollConfig {
    PollConfig {
        max_attempts: 5,
        interval: Duration::from_millis(10),
        initial_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_replicate_compat_full_flow() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(
            "/replicate/v1/models/black-forest-labs/flux-dev/predictions",
        ))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "input": {"prompt": "a sunset", "num_outputs": 1, "seed": 42}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "task-1",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/replicate/v1/predictions/task-1"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "status": "SUCCESS",
                "data": {"output": ["http://x/img.png"]}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ProviderConfig::new(
        Provider::ReplicateCompat,
        "sk-test",
        server.uri(),
        "black-forest-labs/flux-dev",
    );
    let mut request = GenerationRequest::new("a sunset");
    request.seed = Some(42);

    let client = ProbeClient::new();
    let outcome = client
        .generate(&request, &provider, &fast_poll(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.result.status, JobStatus::Succeeded);
    let artifact = outcome.artifact.unwrap();
    assert_eq!(artifact.kind(), ArtifactKind::UrlReference);
    assert!(matches!(
        artifact,
        Artifact::UrlReference(url) if url.as_str() == "http://x/img.png"
    ));
}

#[tokio::test]
async fn test_flux_native_full_flow() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/flux-dev"))
        // Raw key, no scheme prefix
        .and(header("Authorization", "sk-raw"))
        .and(body_partial_json(json!({
            "prompt": "a poster",
            "webhook_url": "",
            "webhook_secret": "",
            "safety_tolerance": 2,
            "output_format": "png"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-9"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/get_result"))
        .and(query_param("id", "job-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Ready",
            "result": {"sample": "http://y/img.jpg", "seed": 42}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        ProviderConfig::new(Provider::FluxNative, "sk-raw", server.uri(), "flux-dev");
    let client = ProbeClient::new();
    let outcome = client
        .generate(
            &GenerationRequest::new("a poster"),
            &provider,
            &fast_poll(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.result.status, JobStatus::Succeeded);
    assert!(matches!(
        outcome.artifact.unwrap(),
        Artifact::UrlReference(url) if url.as_str() == "http://y/img.jpg"
    ));
}

#[tokio::test]
async fn test_bfl_direct_uses_server_supplied_polling_url() {
    let server = MockServer::start().await;

    // The polling endpoint deliberately does not follow any template the
    // client could reconstruct from the job id
    let polling_url = format!("{}/regional/eu1/poll?ticket=opaque-7", server.uri());

    Mock::given(method("POST"))
        .and(path("/flux-2-pro"))
        .and(header("x-key", "bfl-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "task-7",
            "polling_url": polling_url,
            "cost": 0.06,
            "output_mp": 0.79
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/regional/eu1/poll"))
        .and(query_param("ticket", "opaque-7"))
        .and(header("x-key", "bfl-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Ready",
            "result": {"images": [{"url": "http://z/img.webp"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ProviderConfig::new(Provider::BflDirect, "bfl-key", server.uri(), "flux-2-pro");
    let client = ProbeClient::new();

    let outcome = client
        .submit(&GenerationRequest::new("bold typography"), &provider)
        .await
        .unwrap();
    let handle = match outcome {
        SubmitOutcome::Job(handle) => handle,
        SubmitOutcome::Completed(_) => panic!("BFL is asynchronous"),
    };
    assert_eq!(handle.id, "task-7");
    assert_eq!(handle.cost, Some(0.06));
    assert_eq!(handle.output_mp, Some(0.79));

    let result = client
        .poll(&handle, &provider, &fast_poll(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.status, JobStatus::Succeeded);
    assert!(matches!(
        imagegen_probe::extract(&result).unwrap(),
        Artifact::UrlReference(url) if url.as_str() == "http://z/img.webp"
    ));
}

#[tokio::test]
async fn test_gemini_multimodal_is_synchronous() {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;

    let server = MockServer::start().await;
    let encoded = BASE64.encode(b"generated image bytes");

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
        .and(header("Authorization", "sk-gem"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": encoded}}
            ]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ProviderConfig::new(
        Provider::GeminiMultimodal,
        "sk-gem",
        server.uri(),
        "gemini-2.5-flash-image",
    );
    let client = ProbeClient::new();
    let outcome = client
        .generate(
            &GenerationRequest::new("a nano banana dish"),
            &provider,
            &fast_poll(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // No GET was mounted; any poll attempt would have failed the mock server
    assert_eq!(outcome.result.status, JobStatus::Succeeded);

    let dir = tempfile::tempdir().unwrap();
    let artifact = outcome.artifact.unwrap();
    let written = artifact
        .save(&dir.path().join("gemini_output.dat"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(written.extension().and_then(|e| e.to_str()), Some("png"));
    assert_eq!(std::fs::read(&written).unwrap(), b"generated image bytes");
}

#[tokio::test]
async fn test_submission_unauthorized_is_classified() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        ProviderConfig::new(Provider::FluxNative, "bad-key", server.uri(), "flux-dev");
    let err = ProbeClient::new()
        .submit(&GenerationRequest::new("a sunset"), &provider)
        .await
        .unwrap_err();

    match err {
        Error::Submission(SubmissionError::Http {
            status, diagnostic, ..
        }) => {
            assert_eq!(status, 401);
            assert_eq!(diagnostic, HttpDiagnostic::Unauthorized);
        }
        other => panic!("expected HTTP submission error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_submission_network_failure() {
    // Nothing listens here
    let provider = ProviderConfig::new(
        Provider::FluxNative,
        "key",
        "http://127.0.0.1:9",
        "flux-dev",
    );
    let err = ProbeClient::new()
        .submit(&GenerationRequest::new("a sunset"), &provider)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Submission(SubmissionError::Network { .. })
    ));
}

#[tokio::test]
async fn test_submission_response_without_job_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let provider =
        ProviderConfig::new(Provider::FluxNative, "key", server.uri(), "flux-dev");
    let err = ProbeClient::new()
        .submit(&GenerationRequest::new("a sunset"), &provider)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Submission(SubmissionError::UnexpectedBody { .. })
    ));
}
