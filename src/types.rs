//! Core types for imagegen-probe

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Backend provider tag selecting the request shape, auth style, and status
/// vocabulary used for a job.
///
/// Every provider speaks the same three-step protocol (submit, poll, fetch)
/// but encodes it differently. The tag is the single point of dispatch; there
/// are no per-provider client types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// Replicate-compatible aggregator endpoint. Model identifier is part of
    /// the submission path, request fields are nested under `input`, auth is
    /// `Authorization: Bearer <key>`.
    ReplicateCompat,
    /// Native Flux API. Flat submission body with always-present defaulted
    /// fields, raw key in the `Authorization` header (no scheme prefix),
    /// polling via `get_result?id=`.
    FluxNative,
    /// Black Forest Labs direct API. Key travels in a dedicated `x-key`
    /// header, and the submission response carries an absolute polling URL
    /// that must be used verbatim.
    BflDirect,
    /// Gemini-style multimodal `generateContent` endpoint. Synchronous end to
    /// end; the artifact arrives base64-encoded in the submission response
    /// and the polling phase is never entered.
    GeminiMultimodal,
}

impl Provider {
    /// Stable provider name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Provider::ReplicateCompat => "replicate-compat",
            Provider::FluxNative => "flux-native",
            Provider::BflDirect => "bfl-direct",
            Provider::GeminiMultimodal => "gemini-multimodal",
        }
    }

    /// Returns true if this provider completes at submission time and never
    /// enters the polling phase
    pub fn is_synchronous(&self) -> bool {
        matches!(self, Provider::GeminiMultimodal)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical job status
///
/// Every provider-specific status vocabulary is normalized into this
/// machine. Once a poll result reaches a terminal state, no further
/// transition is issued for that job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted but not yet started
    Pending,
    /// Generation in progress
    Running,
    /// Finished successfully; an artifact can be extracted
    Succeeded,
    /// Finished unsuccessfully (provider-reported failure, not a transport
    /// error)
    Failed,
    /// Poll attempt budget exhausted without a terminal provider state.
    /// Produced only by the scheduler, never by a provider token.
    Timeout,
    /// Status field absent or carrying an unrecognized token. Treated as
    /// non-terminal; polling continues.
    Unknown,
}

impl JobStatus {
    /// Returns true for states that end the poll loop
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Timeout
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Timeout => "timeout",
            JobStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A single image-generation request
///
/// Built once per invocation and consumed by submission. Provider-specific
/// tuning knobs live in [`RequestExtras`]; fields a provider does not
/// understand are simply not sent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Text prompt
    pub prompt: String,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Deterministic seed (omitted from the request body when None)
    pub seed: Option<u64>,
    /// Provider-specific extra parameters
    #[serde(default)]
    pub extras: RequestExtras,
}

impl GenerationRequest {
    /// Create a request with a prompt and the default 1024x768 canvas
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: 1024,
            height: 768,
            seed: None,
            extras: RequestExtras::default(),
        }
    }
}

/// Provider-specific tuning parameters
///
/// All optional; a field is serialized only when set and only for providers
/// that accept it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestExtras {
    /// Guidance scale (flex-style models)
    pub guidance: Option<f64>,
    /// Inference step count (flex-style models)
    pub steps: Option<u32>,
    /// Aspect ratio hint, e.g. "16:9" (multimodal providers)
    pub aspect_ratio: Option<String>,
    /// Local image to attach to a multimodal request (image-to-image). The
    /// MIME type is inferred from the file extension.
    pub input_image: Option<PathBuf>,
}

/// Opaque handle for a submitted job
///
/// Created only from a 2xx submission response and immutable afterwards.
#[derive(Clone, Debug)]
pub struct JobHandle {
    /// Provider the job was submitted to
    pub provider: Provider,
    /// Provider-assigned job id
    pub id: String,
    /// Server-supplied absolute polling endpoint. When present it is used
    /// verbatim; when absent the poll endpoint is constructed from the id.
    pub polling_url: Option<Url>,
    /// Credit cost reported at submission, when the provider surfaces one
    pub cost: Option<f64>,
    /// Output size in megapixels reported at submission, when surfaced
    pub output_mp: Option<f64>,
}

/// Outcome of one status fetch, normalized into the canonical state machine
#[derive(Clone, Debug)]
pub struct PollResult {
    /// Provider that produced the payload
    pub provider: Provider,
    /// Canonical status
    pub status: JobStatus,
    /// Human-readable progress label, when the provider surfaces one.
    /// Not every backend reports progress; absence is normal.
    pub progress: Option<String>,
    /// Generation-duration note scraped from provider logs, when present
    pub duration_note: Option<String>,
    /// Raw provider payload, retained for extraction and diagnostics
    pub raw: Value,
}

impl PollResult {
    pub(crate) fn new(provider: Provider, status: JobStatus, raw: Value) -> Self {
        Self {
            provider,
            status,
            progress: None,
            duration_note: None,
            raw,
        }
    }

    /// Returns true if no further polling will occur for this job
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Artifact kind discriminant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Artifact referenced by a resolvable URL
    UrlReference,
    /// Artifact embedded in the response as decoded bytes
    InlineBinary,
}

/// The produced artifact, materialized from a succeeded poll result
///
/// Write-once: created exactly once at the terminal succeeded transition and
/// immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub enum Artifact {
    /// Remote reference to the generated image
    UrlReference(Url),
    /// Decoded inline payload
    InlineBinary {
        /// Decoded image bytes
        bytes: Vec<u8>,
        /// MIME type declared by the provider
        mime_type: String,
        /// File extension inferred from the MIME type, with leading dot
        extension: &'static str,
    },
}

impl Artifact {
    /// Artifact kind discriminant
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::UrlReference(_) => ArtifactKind::UrlReference,
            Artifact::InlineBinary { .. } => ArtifactKind::InlineBinary,
        }
    }
}
