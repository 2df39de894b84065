//! Status normalization
//!
//! Each backend reports job progress with its own vocabulary and nesting.
//! `normalize` maps every recognized token into the canonical
//! [`JobStatus`](crate::types::JobStatus) machine; anything unrecognized or
//! absent becomes `Unknown`, which is non-terminal — the scheduler keeps
//! polling instead of failing on a vocabulary surprise.

use crate::lookup::{field_dual, lookup, lookup_first, lookup_str};
use crate::types::{JobStatus, PollResult, Provider};
use serde_json::Value;

/// Normalize a raw provider status payload into a [`PollResult`]
pub fn normalize(provider: Provider, raw: &Value) -> PollResult {
    let status = match provider {
        Provider::ReplicateCompat => replicate_status(raw),
        Provider::FluxNative | Provider::BflDirect => flat_status(raw),
        Provider::GeminiMultimodal => multimodal_status(raw),
    };

    if status == JobStatus::Unknown {
        tracing::debug!(
            provider = %provider,
            "unrecognized or missing status token, treating as non-terminal"
        );
    }

    let mut result = PollResult::new(provider, status, raw.clone());
    result.progress = progress_label(raw);
    result.duration_note = duration_note(raw);
    result
}

/// Replicate-compatible aggregators wrap the real status under `data`, with
/// a flat vendor-native layout as fallback for pass-through responses.
fn replicate_status(raw: &Value) -> JobStatus {
    if let Some(token) = lookup_str(raw, "data.status") {
        return match token {
            "SUCCESS" => JobStatus::Succeeded,
            "FAILED" | "FAILURE" => JobStatus::Failed,
            "GENERATING" | "IN_PROGRESS" | "PROCESSING" => JobStatus::Running,
            "NOT_START" | "QUEUED" | "PENDING" | "SUBMITTED" => JobStatus::Pending,
            _ => JobStatus::Unknown,
        };
    }
    match lookup_str(raw, "status") {
        Some("succeeded") | Some("completed") => JobStatus::Succeeded,
        Some("failed") | Some("canceled") => JobStatus::Failed,
        Some("processing") => JobStatus::Running,
        Some("starting") | Some("queued") => JobStatus::Pending,
        _ => JobStatus::Unknown,
    }
}

/// Flat `Ready`-sentinel vocabulary shared by the native Flux and BFL direct
/// shapes. Moderation verdicts are terminal failures; "Task not found" is
/// deliberately non-terminal (the job may not be visible yet right after
/// submission).
fn flat_status(raw: &Value) -> JobStatus {
    match lookup_str(raw, "status") {
        Some("Ready") => JobStatus::Succeeded,
        Some("Error") | Some("Failed") => JobStatus::Failed,
        Some("Request Moderated") | Some("Content Moderated") => JobStatus::Failed,
        Some("Processing") => JobStatus::Running,
        Some("Pending") | Some("Queued") => JobStatus::Pending,
        _ => JobStatus::Unknown,
    }
}

/// The multimodal path is synchronous: the submission response either
/// carries a candidate or the generation failed.
fn multimodal_status(raw: &Value) -> JobStatus {
    match lookup(raw, "candidates.0") {
        Some(_) => JobStatus::Succeeded,
        None => JobStatus::Failed,
    }
}

/// Progress label under either naming convention, at either nesting level.
/// Numeric progress values are formatted as-is.
fn progress_label(raw: &Value) -> Option<String> {
    let value = lookup_first(raw, &["data.progress", "progress"])
        .or_else(|| field_dual(raw, "progressPercent", "progress_percent"))?;
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Scrape a "Generation took …" line out of provider logs when present
fn duration_note(raw: &Value) -> Option<String> {
    let logs = lookup_first(raw, &["data.data.logs", "logs"])?.as_str()?;
    logs.lines()
        .find(|line| line.contains("Generation took"))
        .map(|line| line.trim().to_string())
}
