//! # imagegen-probe
//!
//! Client library for asynchronous, job-based image-generation APIs.
//!
//! Every supported backend speaks the same three-step protocol — submit a
//! generation request, poll a status endpoint until terminal, retrieve the
//! artifact — but each encodes it with a different transport shape, auth
//! header, status vocabulary, and payload nesting. This crate unifies the
//! submit/poll/extract triad behind one canonical state machine while
//! keeping provider-specific nuance (server-supplied polling URLs, inline
//! base64 payloads, warm-up delays) intact.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or key loading, purely a Rust crate for
//!   embedding; configuration is passed explicitly into each operation
//! - **One state machine** - Provider status vocabularies normalize into a
//!   single canonical enum; unknown tokens keep polling instead of failing
//! - **Failure is not an error** - Provider-reported FAILED and scheduler
//!   TIMEOUT are valid outcomes surfaced for reporting, distinct from
//!   transport and HTTP failures
//! - **Bounded and cancellable** - Every poll loop has an attempt budget,
//!   every call a timeout, and a cancellation token is honored between
//!   iterations
//!
//! ## Quick Start
//!
//! ```no_run
//! use imagegen_probe::{
//!     CancellationToken, GenerationRequest, PollConfig, ProbeClient, Provider, ProviderConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ProbeClient::new();
//!     let provider = ProviderConfig::new(
//!         Provider::BflDirect,
//!         std::env::var("BFL_API_KEY")?,
//!         "https://api.bfl.ai/v1",
//!         "flux-2-pro",
//!     );
//!
//!     let mut request = GenerationRequest::new("a sunset over mountains, 85mm lens");
//!     request.seed = Some(42);
//!
//!     let poll = PollConfig {
//!         initial_delay: std::time::Duration::from_secs(3),
//!         ..PollConfig::default()
//!     };
//!
//!     let outcome = client
//!         .generate(&request, &provider, &poll, &CancellationToken::new())
//!         .await?;
//!     println!("terminal status: {}", outcome.result.status);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// High-level probe client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Artifact extraction
pub mod extract;
/// Ordered JSON field lookup
pub mod lookup;
/// Bounded polling scheduler
pub mod poll;
/// Provider-specific request construction and submission
pub mod request;
/// Status normalization
pub mod status;
/// Core types
pub mod types;

pub use client::{GenerationOutcome, ProbeClient};
pub use config::{PollConfig, ProviderConfig};
pub use error::{
    Error, ExtractionError, HttpDiagnostic, PollError, Result, SubmissionError,
};
pub use extract::{extension_for_mime, extract};
pub use request::{build_submission, submit, SubmitOutcome, Submission};
pub use status::normalize;
pub use types::{
    Artifact, ArtifactKind, GenerationRequest, JobHandle, JobStatus, PollResult, Provider,
    RequestExtras,
};

// Re-exported so callers don't need a direct tokio-util dependency
pub use tokio_util::sync::CancellationToken;
