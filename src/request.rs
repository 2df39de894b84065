//! Provider-specific request construction and submission
//!
//! Each backend encodes the same submit step with a different endpoint
//! template, body schema, and auth header style. [`build_submission`] is the
//! pure construction half (unit-testable without a server); [`submit`] makes
//! the single outbound call and yields either a [`JobHandle`] to poll or,
//! for the synchronous multimodal shape, a terminal [`PollResult`] directly.

use crate::config::ProviderConfig;
use crate::error::{truncate_body, HttpDiagnostic, Result, SubmissionError};
use crate::extract::mime_for_extension;
use crate::lookup::{lookup, lookup_first, lookup_str};
use crate::status::normalize;
use crate::types::{GenerationRequest, JobHandle, PollResult, Provider};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Map, Value};
use url::Url;

/// Outcome of a submission
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Job accepted; poll the handle until terminal
    Job(JobHandle),
    /// Provider is synchronous; generation already finished
    Completed(PollResult),
}

/// A fully constructed submission, ready to send
#[derive(Clone, Debug)]
pub struct Submission {
    /// Resolved submission endpoint
    pub endpoint: Url,
    /// Headers to attach (auth and content negotiation)
    pub headers: Vec<(&'static str, String)>,
    /// JSON request body
    pub body: Value,
}

/// Construct the provider-specific submission for a request.
///
/// Reads the attached input image for multimodal image-to-image requests;
/// the file handle is released before this returns, on every path.
pub async fn build_submission(
    request: &GenerationRequest,
    config: &ProviderConfig,
) -> Result<Submission> {
    let endpoint = submit_endpoint(config)?;
    let body = match config.provider {
        Provider::ReplicateCompat => replicate_body(request),
        Provider::FluxNative => flux_native_body(request),
        Provider::BflDirect => bfl_body(request),
        Provider::GeminiMultimodal => multimodal_body(request).await?,
    };
    Ok(Submission {
        endpoint,
        headers: auth_headers(config),
        body,
    })
}

/// Submit a generation request: one outbound HTTP call.
///
/// Transport failures map to [`SubmissionError::Network`], non-2xx responses
/// to [`SubmissionError::Http`] with a truncated body. There is no automatic
/// resubmission.
pub async fn submit(
    http: &reqwest::Client,
    request: &GenerationRequest,
    config: &ProviderConfig,
) -> Result<SubmitOutcome> {
    let submission = build_submission(request, config).await?;
    let endpoint = submission.endpoint.to_string();

    tracing::debug!(
        provider = %config.provider,
        endpoint = %endpoint,
        width = request.width,
        height = request.height,
        "submitting generation request"
    );

    let mut call = http
        .post(submission.endpoint.clone())
        .json(&submission.body)
        .timeout(config.submit_timeout);
    for (name, value) in &submission.headers {
        call = call.header(*name, value);
    }

    let response = call.send().await.map_err(|source| SubmissionError::Network {
        provider: config.provider,
        endpoint: endpoint.clone(),
        source,
    })?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        let code = status.as_u16();
        tracing::warn!(
            provider = %config.provider,
            endpoint = %endpoint,
            status = code,
            "submission rejected"
        );
        return Err(SubmissionError::Http {
            provider: config.provider,
            endpoint,
            status: code,
            diagnostic: HttpDiagnostic::classify(code, &body),
            body: truncate_body(&body),
        }
        .into());
    }

    let raw: Value =
        serde_json::from_str(&body).map_err(|e| SubmissionError::UnexpectedBody {
            provider: config.provider,
            endpoint: endpoint.clone(),
            reason: format!("response is not valid JSON: {e}"),
        })?;

    if config.provider.is_synchronous() {
        let result = normalize(config.provider, &raw);
        tracing::info!(
            provider = %config.provider,
            status = %result.status,
            "synchronous generation finished"
        );
        return Ok(SubmitOutcome::Completed(result));
    }

    let handle = handle_from_response(config, &endpoint, &raw)?;
    tracing::info!(
        provider = %config.provider,
        job_id = %handle.id,
        cost = handle.cost,
        "job submitted"
    );
    Ok(SubmitOutcome::Job(handle))
}

/// Resolve the polling endpoint for a job handle.
///
/// A server-supplied polling URL always wins and is used verbatim; otherwise
/// the endpoint is constructed from the job id per provider template.
pub fn poll_endpoint(handle: &JobHandle, config: &ProviderConfig) -> Result<Url> {
    if let Some(url) = &handle.polling_url {
        return Ok(url.clone());
    }
    let url = match handle.provider {
        Provider::ReplicateCompat => Url::parse(&format!(
            "{}/replicate/v1/predictions/{}",
            config.base(),
            handle.id
        ))?,
        Provider::FluxNative => {
            let mut url = Url::parse(&format!("{}/v1/get_result", config.base()))?;
            url.query_pairs_mut().append_pair("id", &handle.id);
            url
        }
        // BFL handles always carry a polling URL; enforced at submission
        Provider::BflDirect | Provider::GeminiMultimodal => {
            return Err(crate::error::PollError::NoPollEndpoint {
                provider: handle.provider,
            }
            .into())
        }
    };
    Ok(url)
}

/// Auth headers for both submission and polling calls
pub(crate) fn auth_headers(config: &ProviderConfig) -> Vec<(&'static str, String)> {
    match config.provider {
        Provider::ReplicateCompat => {
            vec![("Authorization", format!("Bearer {}", config.api_key))]
        }
        // Raw key, no scheme prefix
        Provider::FluxNative | Provider::GeminiMultimodal => {
            vec![("Authorization", config.api_key.clone())]
        }
        Provider::BflDirect => vec![
            ("accept", "application/json".to_string()),
            ("x-key", config.api_key.clone()),
        ],
    }
}

fn submit_endpoint(config: &ProviderConfig) -> Result<Url> {
    let url = match config.provider {
        Provider::ReplicateCompat => format!(
            "{}/replicate/v1/models/{}/predictions",
            config.base(),
            config.model
        ),
        Provider::FluxNative => format!("{}/v1/{}", config.base(), config.model),
        Provider::BflDirect => format!("{}/{}", config.base(), config.model),
        Provider::GeminiMultimodal => format!(
            "{}/v1beta/models/{}:generateContent",
            config.base(),
            config.model
        ),
    };
    Ok(Url::parse(&url)?)
}

/// Request fields nested under `input`, one output per job
fn replicate_body(request: &GenerationRequest) -> Value {
    let mut input = Map::new();
    input.insert("prompt".into(), json!(request.prompt));
    input.insert("width".into(), json!(request.width));
    input.insert("height".into(), json!(request.height));
    input.insert("num_outputs".into(), json!(1));
    if let Some(seed) = request.seed {
        input.insert("seed".into(), json!(seed));
    }
    json!({ "input": input })
}

/// Flat body with always-present defaulted fields
fn flux_native_body(request: &GenerationRequest) -> Value {
    let mut body = Map::new();
    body.insert("prompt".into(), json!(request.prompt));
    body.insert("width".into(), json!(request.width));
    body.insert("height".into(), json!(request.height));
    if let Some(seed) = request.seed {
        body.insert("seed".into(), json!(seed));
    }
    body.insert("webhook_url".into(), json!(""));
    body.insert("webhook_secret".into(), json!(""));
    body.insert("safety_tolerance".into(), json!(2));
    body.insert("output_format".into(), json!("png"));
    Value::Object(body)
}

fn bfl_body(request: &GenerationRequest) -> Value {
    let mut body = Map::new();
    body.insert("prompt".into(), json!(request.prompt));
    body.insert("width".into(), json!(request.width));
    body.insert("height".into(), json!(request.height));
    if let Some(seed) = request.seed {
        body.insert("seed".into(), json!(seed));
    }
    if let Some(steps) = request.extras.steps {
        body.insert("steps".into(), json!(steps));
    }
    if let Some(guidance) = request.extras.guidance {
        body.insert("guidance".into(), json!(guidance));
    }
    body.insert("safety_tolerance".into(), json!(2));
    body.insert("output_format".into(), json!("png"));
    Value::Object(body)
}

/// Message-part list: one text part, one optional inline-image part
async fn multimodal_body(request: &GenerationRequest) -> Result<Value> {
    let mut parts = vec![json!({ "text": request.prompt })];
    let mut content = Map::new();

    if let Some(path) = &request.extras.input_image {
        let bytes = tokio::fs::read(path).await?;
        let mime = mime_for_extension(path);
        parts.push(json!({
            "inline_data": {
                "mime_type": mime,
                "data": BASE64.encode(&bytes),
            }
        }));
        // Image-to-image requests declare the sender role explicitly
        content.insert("role".into(), json!("user"));
    }
    content.insert("parts".into(), json!(parts));

    let mut generation_config = Map::new();
    generation_config.insert("responseModalities".into(), json!(["IMAGE"]));
    if let Some(aspect_ratio) = &request.extras.aspect_ratio {
        generation_config.insert("aspectRatio".into(), json!(aspect_ratio));
    }

    Ok(json!({
        "contents": [content],
        "generationConfig": generation_config,
    }))
}

/// Build a job handle from a 2xx asynchronous submission response
fn handle_from_response(
    config: &ProviderConfig,
    endpoint: &str,
    raw: &Value,
) -> Result<JobHandle> {
    let id = lookup_first(raw, &["id", "data.id", "request_id"])
        .and_then(Value::as_str)
        .ok_or_else(|| SubmissionError::UnexpectedBody {
            provider: config.provider,
            endpoint: endpoint.to_string(),
            reason: "no job id in response".to_string(),
        })?
        .to_string();

    let polling_url = match lookup_str(raw, "polling_url") {
        Some(s) => Some(
            Url::parse(s).map_err(|e| SubmissionError::UnexpectedBody {
                provider: config.provider,
                endpoint: endpoint.to_string(),
                reason: format!("unparseable polling_url {s:?}: {e}"),
            })?,
        ),
        None => None,
    };

    // The BFL shape supplies the poll endpoint and it must be used verbatim;
    // a response without one cannot be polled
    if config.provider == Provider::BflDirect && polling_url.is_none() {
        return Err(SubmissionError::UnexpectedBody {
            provider: config.provider,
            endpoint: endpoint.to_string(),
            reason: "no polling_url in response".to_string(),
        }
        .into());
    }

    Ok(JobHandle {
        provider: config.provider,
        id,
        polling_url,
        cost: lookup(raw, "cost").and_then(Value::as_f64),
        output_mp: lookup(raw, "output_mp").and_then(Value::as_f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: Provider) -> ProviderConfig {
        let model = match provider {
            Provider::ReplicateCompat => "black-forest-labs/flux-dev",
            Provider::FluxNative => "flux-dev",
            Provider::BflDirect => "flux-2-pro",
            Provider::GeminiMultimodal => "gemini-2.5-flash-image",
        };
        ProviderConfig::new(provider, "sk-test", "https://api.example.com", model)
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            seed: Some(42),
            ..GenerationRequest::new("a sunset over mountains")
        }
    }

    #[tokio::test]
    async fn test_replicate_submission_shape() {
        let submission = build_submission(&request(), &config(Provider::ReplicateCompat))
            .await
            .unwrap();
        assert_eq!(
            submission.endpoint.as_str(),
            "https://api.example.com/replicate/v1/models/black-forest-labs/flux-dev/predictions"
        );
        assert_eq!(
            submission.headers,
            vec![("Authorization", "Bearer sk-test".to_string())]
        );
        assert_eq!(submission.body["input"]["prompt"], "a sunset over mountains");
        assert_eq!(submission.body["input"]["num_outputs"], 1);
        assert_eq!(submission.body["input"]["seed"], 42);
        // Nothing at the top level besides the input wrapper
        assert!(submission.body.get("prompt").is_none());
    }

    #[tokio::test]
    async fn test_flux_native_submission_shape() {
        let submission = build_submission(&request(), &config(Provider::FluxNative))
            .await
            .unwrap();
        assert_eq!(
            submission.endpoint.as_str(),
            "https://api.example.com/v1/flux-dev"
        );
        // Raw key, no Bearer prefix
        assert_eq!(
            submission.headers,
            vec![("Authorization", "sk-test".to_string())]
        );
        assert_eq!(submission.body["prompt"], "a sunset over mountains");
        assert_eq!(submission.body["webhook_url"], "");
        assert_eq!(submission.body["webhook_secret"], "");
        assert_eq!(submission.body["safety_tolerance"], 2);
        assert_eq!(submission.body["output_format"], "png");
    }

    #[tokio::test]
    async fn test_bfl_submission_shape() {
        let mut req = request();
        req.extras.steps = Some(50);
        req.extras.guidance = Some(4.5);
        let submission = build_submission(&req, &config(Provider::BflDirect))
            .await
            .unwrap();
        assert_eq!(
            submission.endpoint.as_str(),
            "https://api.example.com/flux-2-pro"
        );
        assert!(submission
            .headers
            .contains(&("x-key", "sk-test".to_string())));
        assert_eq!(submission.body["steps"], 50);
        assert_eq!(submission.body["guidance"], 4.5);
        assert_eq!(submission.body["safety_tolerance"], 2);
    }

    #[tokio::test]
    async fn test_bfl_omits_unset_tuning_fields() {
        let mut req = request();
        req.seed = None;
        let submission = build_submission(&req, &config(Provider::BflDirect))
            .await
            .unwrap();
        assert!(submission.body.get("seed").is_none());
        assert!(submission.body.get("steps").is_none());
        assert!(submission.body.get("guidance").is_none());
    }

    #[tokio::test]
    async fn test_multimodal_text_only_shape() {
        let mut req = request();
        req.extras.aspect_ratio = Some("16:9".to_string());
        let submission = build_submission(&req, &config(Provider::GeminiMultimodal))
            .await
            .unwrap();
        assert_eq!(
            submission.endpoint.as_str(),
            "https://api.example.com/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
        let parts = submission.body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["text"], "a sunset over mountains");
        assert_eq!(
            submission.body["generationConfig"]["responseModalities"][0],
            "IMAGE"
        );
        assert_eq!(submission.body["generationConfig"]["aspectRatio"], "16:9");
        // Text-only requests carry no role
        assert!(submission.body["contents"][0].get("role").is_none());
    }

    #[tokio::test]
    async fn test_multimodal_attaches_input_image() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("input.png");
        std::fs::write(&image_path, b"fake png bytes").unwrap();

        let mut req = request();
        req.extras.input_image = Some(image_path);
        let submission = build_submission(&req, &config(Provider::GeminiMultimodal))
            .await
            .unwrap();

        let content = &submission.body["contents"][0];
        assert_eq!(content["role"], "user");
        let parts = content["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(
            parts[1]["inline_data"]["data"],
            BASE64.encode(b"fake png bytes")
        );
    }

    #[tokio::test]
    async fn test_multimodal_missing_input_image_fails() {
        let mut req = request();
        req.extras.input_image = Some("/nonexistent/input.png".into());
        let err = build_submission(&req, &config(Provider::GeminiMultimodal))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }

    #[test]
    fn test_poll_endpoint_templates() {
        let handle = JobHandle {
            provider: Provider::ReplicateCompat,
            id: "task-123".to_string(),
            polling_url: None,
            cost: None,
            output_mp: None,
        };
        let url = poll_endpoint(&handle, &config(Provider::ReplicateCompat)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/replicate/v1/predictions/task-123"
        );

        let handle = JobHandle {
            provider: Provider::FluxNative,
            ..handle
        };
        let url = poll_endpoint(&handle, &config(Provider::FluxNative)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/get_result?id=task-123"
        );
    }

    #[test]
    fn test_poll_endpoint_server_supplied_wins() {
        let handle = JobHandle {
            provider: Provider::BflDirect,
            id: "task-123".to_string(),
            polling_url: Some(Url::parse("https://eu.api.example.com/v1/get_result?id=task-123").unwrap()),
            cost: Some(0.04),
            output_mp: Some(0.79),
        };
        // Used verbatim, never reconstructed from the id
        let url = poll_endpoint(&handle, &config(Provider::BflDirect)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://eu.api.example.com/v1/get_result?id=task-123"
        );
    }

    #[test]
    fn test_handle_requires_id() {
        let raw = serde_json::json!({"status": "queued"});
        let err = handle_from_response(&config(Provider::ReplicateCompat), "ep", &raw)
            .unwrap_err();
        assert!(err.to_string().contains("no job id"));
    }

    #[test]
    fn test_bfl_handle_requires_polling_url() {
        let raw = serde_json::json!({"id": "task-123"});
        let err = handle_from_response(&config(Provider::BflDirect), "ep", &raw).unwrap_err();
        assert!(err.to_string().contains("polling_url"));

        let raw = serde_json::json!({
            "id": "task-123",
            "polling_url": "https://api.example.com/v1/get_result?id=task-123",
            "cost": 0.06,
            "output_mp": 1.0
        });
        let handle = handle_from_response(&config(Provider::BflDirect), "ep", &raw).unwrap();
        assert_eq!(handle.cost, Some(0.06));
        assert_eq!(handle.output_mp, Some(1.0));
    }
}
