//! High-level probe client
//!
//! Ties the submit → poll → extract triad together for one job at a time.
//! The workflow is strictly sequential: one job in flight, one outstanding
//! network call, blocking sleeps between poll attempts.

use crate::config::{PollConfig, ProviderConfig};
use crate::error::Result;
use crate::extract::extract;
use crate::poll;
use crate::request::{self, SubmitOutcome};
use crate::types::{Artifact, GenerationRequest, JobHandle, JobStatus, PollResult};
use tokio_util::sync::CancellationToken;

/// Final outcome of a generation workflow
///
/// FAILED and TIMEOUT are valid outcomes, not errors: the poll result is
/// returned for reporting and `artifact` is simply absent.
#[derive(Debug)]
pub struct GenerationOutcome {
    /// The terminal poll result
    pub result: PollResult,
    /// The extracted artifact; present exactly when the job succeeded
    pub artifact: Option<Artifact>,
}

/// Client for probing asynchronous image-generation backends
///
/// Owns a single HTTP client reused across calls. Construct one per process
/// and pass provider/poll configuration into each operation.
///
/// # Example
///
/// ```no_run
/// use imagegen_probe::{
///     CancellationToken, GenerationRequest, PollConfig, ProbeClient, Provider, ProviderConfig,
/// };
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = ProbeClient::new();
///     let provider = ProviderConfig::new(
///         Provider::ReplicateCompat,
///         "sk-...",
///         "https://api.example.com",
///         "black-forest-labs/flux-dev",
///     );
///
///     let request = GenerationRequest::new("a sunset over mountains, photorealistic");
///     let outcome = client
///         .generate(&request, &provider, &PollConfig::default(), &CancellationToken::new())
///         .await?;
///
///     if let Some(artifact) = outcome.artifact {
///         artifact.save(std::path::Path::new("output.png")).await?;
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct ProbeClient {
    http: reqwest::Client,
}

impl ProbeClient {
    /// Create a client with a default HTTP client
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client reusing an existing `reqwest::Client`
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Submit a generation request.
    ///
    /// Returns a [`SubmitOutcome::Job`] handle to poll, or
    /// [`SubmitOutcome::Completed`] for synchronous providers.
    pub async fn submit(
        &self,
        request: &GenerationRequest,
        provider: &ProviderConfig,
    ) -> Result<SubmitOutcome> {
        request::submit(&self.http, request, provider).await
    }

    /// Poll a submitted job until terminal, budget exhaustion, or
    /// cancellation
    pub async fn poll(
        &self,
        handle: &JobHandle,
        provider: &ProviderConfig,
        config: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<PollResult> {
        poll::poll(&self.http, handle, provider, config, cancel).await
    }

    /// Run the full submit → poll → extract workflow for one job.
    ///
    /// The artifact is extracted exactly when the terminal result is
    /// succeeded; failed and timed-out jobs come back with the poll result
    /// alone.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        provider: &ProviderConfig,
        config: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        let result = match self.submit(request, provider).await? {
            SubmitOutcome::Completed(result) => result,
            SubmitOutcome::Job(handle) => {
                self.poll(&handle, provider, config, cancel).await?
            }
        };

        let artifact = if result.status == JobStatus::Succeeded {
            Some(extract(&result)?)
        } else {
            None
        };
        Ok(GenerationOutcome { result, artifact })
    }
}
