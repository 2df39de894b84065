//! Bounded polling scheduler
//!
//! Drives repeated status fetches through the normalizer until a terminal
//! state is produced or the attempt budget runs out. Strictly sequential:
//! one outstanding fetch at a time, fixed sleeps between non-terminal
//! results. Budget exhaustion is a valid outcome (a `Timeout` poll result),
//! distinct from a fetch failure, which aborts the loop outright.

use crate::config::{PollConfig, ProviderConfig};
use crate::error::{truncate_body, Error, HttpDiagnostic, PollError, Result};
use crate::request::{auth_headers, poll_endpoint};
use crate::status::normalize;
use crate::types::{JobHandle, JobStatus, PollResult};
use serde_json::Value;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Poll a job until terminal, budget exhaustion, or cancellation.
///
/// Performs at most `config.max_attempts` status fetches and returns the
/// first terminal [`PollResult`] as soon as one is produced. If the budget
/// is exhausted, returns a result with [`JobStatus::Timeout`] carrying the
/// last raw payload seen. A transport or HTTP failure on any single attempt
/// aborts the whole poll; only "not yet terminal" is retried.
///
/// The cancellation token is checked between iterations and during sleeps;
/// cancellation yields [`Error::Cancelled`] with the number of fetches
/// already performed.
pub async fn poll(
    http: &reqwest::Client,
    handle: &JobHandle,
    provider: &ProviderConfig,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<PollResult> {
    let endpoint = poll_endpoint(handle, provider)?;

    tracing::debug!(
        provider = %handle.provider,
        job_id = %handle.id,
        endpoint = %endpoint,
        max_attempts = config.max_attempts,
        "starting poll loop"
    );

    // Some backends need a warm-up before the first status check means
    // anything
    if !config.initial_delay.is_zero() {
        wait_or_cancel(config.initial_delay, cancel, 0).await?;
    }

    let mut last_raw: Option<Value> = None;
    for attempt in 1..=config.max_attempts {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                attempts: attempt - 1,
            });
        }

        let result = fetch_status(http, &endpoint, handle, provider, config).await?;
        tracing::debug!(
            provider = %handle.provider,
            job_id = %handle.id,
            attempt,
            max_attempts = config.max_attempts,
            status = %result.status,
            progress = result.progress.as_deref(),
            "poll attempt"
        );

        if result.is_terminal() {
            tracing::info!(
                provider = %handle.provider,
                job_id = %handle.id,
                status = %result.status,
                attempts = attempt,
                "job reached terminal state"
            );
            return Ok(result);
        }

        last_raw = Some(result.raw);
        if attempt < config.max_attempts {
            wait_or_cancel(config.interval, cancel, attempt).await?;
        }
    }

    tracing::warn!(
        provider = %handle.provider,
        job_id = %handle.id,
        attempts = config.max_attempts,
        "poll budget exhausted"
    );
    Ok(PollResult::new(
        handle.provider,
        JobStatus::Timeout,
        last_raw.unwrap_or(Value::Null),
    ))
}

/// One status fetch: GET the poll endpoint, classify failures, normalize
/// the payload
async fn fetch_status(
    http: &reqwest::Client,
    endpoint: &Url,
    handle: &JobHandle,
    provider: &ProviderConfig,
    config: &PollConfig,
) -> Result<PollResult> {
    let mut call = http.get(endpoint.clone()).timeout(config.request_timeout);
    for (name, value) in auth_headers(provider) {
        call = call.header(name, value);
    }

    let response = call.send().await.map_err(|source| PollError::Network {
        provider: handle.provider,
        endpoint: endpoint.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(PollError::Http {
            provider: handle.provider,
            endpoint: endpoint.to_string(),
            status: code,
            diagnostic: HttpDiagnostic::classify(code, &body),
            body: truncate_body(&body),
        }
        .into());
    }

    let raw: Value = response.json().await.map_err(|source| PollError::Network {
        provider: handle.provider,
        endpoint: endpoint.to_string(),
        source,
    })?;
    Ok(normalize(handle.provider, &raw))
}

/// Sleep for `duration` unless cancelled first
async fn wait_or_cancel(
    duration: std::time::Duration,
    cancel: &CancellationToken,
    attempts: u32,
) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled { attempts }),
        _ = sleep(duration) => Ok(()),
    }
}
