//! Artifact extraction from terminal success payloads
//!
//! Two strategies, tried in order against the retained raw payload: a fixed
//! ordered list of known URL field paths, then a scan of multimodal response
//! parts for an inline base64 payload. The MIME→extension mapping is total;
//! unrecognized types fall back to `.png` rather than erroring.

use crate::error::{Error, ExtractionError, Result};
use crate::lookup::{field_dual, lookup, lookup_first};
use crate::types::{Artifact, JobStatus, PollResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use std::path::{Path, PathBuf};
use url::Url;

/// Known artifact URL locations, in lookup order
const URL_PATHS: &[&str] = &[
    "data.data.output.0",
    "output.0",
    "result.sample",
    "result.images.0.url",
];

/// Extract the artifact from a succeeded poll result.
///
/// Idempotent: repeated calls on the same result yield an identical
/// artifact. Fails with [`ExtractionError::NotSucceeded`] for any
/// non-succeeded result, [`ExtractionError::NotFound`] when no recognized
/// field is present, and [`ExtractionError::Malformed`] when a field is
/// present but cannot be materialized.
pub fn extract(result: &PollResult) -> Result<Artifact> {
    if result.status != JobStatus::Succeeded {
        return Err(ExtractionError::NotSucceeded {
            provider: result.provider,
            status: result.status,
        }
        .into());
    }

    if let Some(value) = lookup_first(&result.raw, URL_PATHS) {
        let url_str = value.as_str().ok_or_else(|| ExtractionError::Malformed {
            provider: result.provider,
            reason: "artifact URL field is not a string".to_string(),
        })?;
        let url = Url::parse(url_str).map_err(|e| ExtractionError::Malformed {
            provider: result.provider,
            reason: format!("unparseable artifact URL {url_str:?}: {e}"),
        })?;
        tracing::debug!(provider = %result.provider, url = %url, "extracted URL artifact");
        return Ok(Artifact::UrlReference(url));
    }

    if let Some(artifact) = extract_inline(result)? {
        return Ok(artifact);
    }

    Err(ExtractionError::NotFound {
        provider: result.provider,
    }
    .into())
}

/// Scan multimodal response parts for an inline base64 payload
fn extract_inline(result: &PollResult) -> Result<Option<Artifact>> {
    let parts = match lookup(&result.raw, "candidates.0.content.parts") {
        Some(Value::Array(parts)) => parts,
        _ => return Ok(None),
    };

    for part in parts {
        let Some(inline) = field_dual(part, "inlineData", "inline_data") else {
            continue;
        };
        let mime_type = field_dual(inline, "mimeType", "mime_type")
            .and_then(Value::as_str)
            .unwrap_or("image/png")
            .to_string();
        let data = inline
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| ExtractionError::Malformed {
                provider: result.provider,
                reason: "inline part has no data field".to_string(),
            })?;
        let bytes = BASE64
            .decode(data)
            .map_err(|e| ExtractionError::Malformed {
                provider: result.provider,
                reason: format!("undecodable base64 payload: {e}"),
            })?;
        let extension = extension_for_mime(&mime_type);
        tracing::debug!(
            provider = %result.provider,
            mime_type = %mime_type,
            size = bytes.len(),
            "extracted inline binary artifact"
        );
        return Ok(Some(Artifact::InlineBinary {
            bytes,
            mime_type,
            extension,
        }));
    }

    Ok(None)
}

/// Map a declared MIME type to a file extension.
///
/// Total: unrecognized types default to `.png`, never an error.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/webp" => ".webp",
        _ => ".png",
    }
}

/// Infer the MIME type of a local image from its file extension.
/// Used when attaching an input image to a multimodal request.
pub(crate) fn mime_for_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

impl Artifact {
    /// Persist an inline binary artifact to `dest`, substituting the
    /// inferred extension for any existing suffix.
    ///
    /// Returns the final path written. URL references have nothing to
    /// persist locally and yield `Ok(None)`; downloading them is a caller
    /// concern. The output file handle is released on every exit path.
    pub async fn save(&self, dest: &Path) -> Result<Option<PathBuf>> {
        match self {
            Artifact::UrlReference(_) => Ok(None),
            Artifact::InlineBinary {
                bytes, extension, ..
            } => {
                let path = dest.with_extension(extension.trim_start_matches('.'));
                tokio::fs::write(&path, bytes).await.map_err(Error::Io)?;
                tracing::info!(path = %path.display(), size = bytes.len(), "artifact saved");
                Ok(Some(path))
            }
        }
    }
}
