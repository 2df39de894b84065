//! Error types for imagegen-probe
//!
//! The taxonomy separates transport/HTTP failures from valid negative
//! outcomes: a provider-reported FAILED status and a scheduler TIMEOUT are
//! ordinary poll results, not errors. Every failure variant carries the
//! provider, the endpoint, and (for HTTP failures) the status code and a
//! truncated response body, so nothing is silently discarded.

use crate::types::{JobStatus, Provider};
use std::fmt;
use thiserror::Error;

/// Result type alias for imagegen-probe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum number of response-body bytes kept in error messages
const BODY_PREFIX_LIMIT: usize = 200;

/// Main error type for imagegen-probe
#[derive(Debug, Error)]
pub enum Error {
    /// Submission to the provider failed; the job was never created
    #[error("submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// A status fetch failed; the poll loop was aborted
    #[error("poll error: {0}")]
    Poll(#[from] PollError),

    /// A terminal success payload did not yield an artifact
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// The caller cancelled the job between poll iterations
    #[error("cancelled after {attempts} poll attempt(s)")]
    Cancelled {
        /// Number of status fetches completed before cancellation
        attempts: u32,
    },

    /// I/O error (artifact persistence, input-image reads)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Submission failure
///
/// Submission failures abort the job immediately; there is no automatic
/// resubmission.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Transport-level failure before an HTTP status was received
    #[error("network failure submitting to {provider} at {endpoint}: {source}")]
    Network {
        /// Provider the submission targeted
        provider: Provider,
        /// Endpoint the submission targeted
        endpoint: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// Provider answered with a non-2xx status
    #[error("{provider} rejected submission at {endpoint}: {diagnostic}")]
    Http {
        /// Provider the submission targeted
        provider: Provider,
        /// Endpoint the submission targeted
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Truncated response body
        body: String,
        /// Human-facing classification of the status code
        diagnostic: HttpDiagnostic,
    },

    /// Provider accepted the submission but the response body was not usable
    /// (unparseable JSON, missing job id, missing required polling URL)
    #[error("unexpected submission response from {provider} at {endpoint}: {reason}")]
    UnexpectedBody {
        /// Provider the submission targeted
        provider: Provider,
        /// Endpoint the submission targeted
        endpoint: String,
        /// What was wrong with the body
        reason: String,
    },
}

/// Status-fetch failure
///
/// Any fetch failure aborts the whole poll loop; only "not yet terminal" is
/// retried, never a fetch error.
#[derive(Debug, Error)]
pub enum PollError {
    /// Transport-level failure during a status fetch
    #[error("network failure polling {provider} at {endpoint}: {source}")]
    Network {
        /// Provider being polled
        provider: Provider,
        /// Polling endpoint
        endpoint: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// Provider answered a status fetch with a non-2xx status
    #[error("{provider} poll at {endpoint} failed: {diagnostic}")]
    Http {
        /// Provider being polled
        provider: Provider,
        /// Polling endpoint
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Truncated response body
        body: String,
        /// Human-facing classification of the status code
        diagnostic: HttpDiagnostic,
    },

    /// The handle belongs to a synchronous provider that has no polling
    /// endpoint
    #[error("{provider} is synchronous and has no poll endpoint")]
    NoPollEndpoint {
        /// The synchronous provider
        provider: Provider,
    },
}

/// Artifact extraction failure
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Extraction was attempted on a result that did not succeed. Artifacts
    /// exist only at the terminal succeeded transition.
    #[error("cannot extract an artifact from a {status} {provider} result")]
    NotSucceeded {
        /// Provider that produced the result
        provider: Provider,
        /// The result's actual status
        status: JobStatus,
    },

    /// No recognized artifact field was present in the terminal payload
    #[error("no recognized artifact field in {provider} payload")]
    NotFound {
        /// Provider that produced the payload
        provider: Provider,
    },

    /// An artifact field was present but could not be materialized
    #[error("malformed artifact payload from {provider}: {reason}")]
    Malformed {
        /// Provider that produced the payload
        provider: Provider,
        /// What could not be decoded
        reason: String,
    },
}

/// Human-facing classification of a non-2xx HTTP status
///
/// Purely diagnostic: surfaced in error messages to speed up key and
/// endpoint troubleshooting, never used to drive control flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HttpDiagnostic {
    /// 401: key invalid or missing
    Unauthorized,
    /// 403: key valid but lacks access
    Forbidden,
    /// 404: wrong endpoint or model
    NotFound,
    /// Any other non-2xx status
    Unknown {
        /// HTTP status code
        status: u16,
        /// Truncated response body
        body_prefix: String,
    },
}

impl HttpDiagnostic {
    /// Classify a non-2xx status code
    pub fn classify(status: u16, body: &str) -> Self {
        match status {
            401 => HttpDiagnostic::Unauthorized,
            403 => HttpDiagnostic::Forbidden,
            404 => HttpDiagnostic::NotFound,
            _ => HttpDiagnostic::Unknown {
                status,
                body_prefix: truncate_body(body),
            },
        }
    }
}

impl fmt::Display for HttpDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpDiagnostic::Unauthorized => write!(f, "401 Unauthorized (invalid key)"),
            HttpDiagnostic::Forbidden => write!(f, "403 Forbidden (no access)"),
            HttpDiagnostic::NotFound => write!(f, "404 Not Found (wrong endpoint)"),
            HttpDiagnostic::Unknown {
                status,
                body_prefix,
            } => write!(f, "HTTP {status}: {body_prefix}"),
        }
    }
}

/// Truncate a response body to a diagnosable prefix, respecting char
/// boundaries
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= BODY_PREFIX_LIMIT {
        return body.to_string();
    }
    let mut end = BODY_PREFIX_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
