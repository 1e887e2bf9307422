//! Time authority offset probe
//!
//! Queries an external time service once and reports how far the local clock
//! is behind it. The request runs on a worker thread with its own tokio
//! runtime; the result comes back through a calloop channel so the event loop
//! never blocks on the network.

use std::thread;
use std::time::Duration;

use calloop::channel::{sync_channel, Channel, SyncSender};
use chrono::DateTime;
use reqwest::StatusCode;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, EpochMillis, SystemClock};
use crate::error::{ProbeError, ProbeResult};

/// Public time service returning `utc_datetime`
pub const DEFAULT_TIME_URL: &str = "https://worldtimeapi.org/api/timezone/UTC";

/// Observable probe state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeState {
    /// Authoritative time minus local time, from the last successful probe
    pub offset_millis: i64,
    /// A request is in flight
    pub loading: bool,
    /// Message from the last failed probe
    pub error: Option<String>,
}

/// Tracks the outcome of offset probes
#[derive(Debug, Default)]
pub struct TimeOffsetProbe {
    state: ProbeState,
}

impl TimeOffsetProbe {
    /// Probe with zero offset and nothing in flight
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a request as started and clear the previous error
    pub fn begin(&mut self) {
        self.state.loading = true;
        self.state.error = None;
    }

    /// Record a probe result; failures keep the previous offset
    pub fn finish(&mut self, result: ProbeResult<i64>) {
        match result {
            Ok(offset) => {
                info!(offset_ms = offset, "Clock offset measured");
                self.state.offset_millis = offset;
            }
            Err(e) => {
                warn!(error = %e, "Clock offset probe failed");
                self.state.error = Some(e.to_string());
            }
        }
        self.state.loading = false;
    }

    /// Current probe state
    pub fn state(&self) -> &ProbeState {
        &self.state
    }

    /// Offset from the last successful probe
    pub fn offset_millis(&self) -> i64 {
        self.state.offset_millis
    }
}

/// Offset implied by a time service response body
pub fn offset_from_body(body: &serde_json::Value, local_now: EpochMillis) -> ProbeResult<i64> {
    let utc_datetime = body
        .get("utc_datetime")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProbeError::InvalidResponse("missing utc_datetime".to_string()))?;

    let server = DateTime::parse_from_rfc3339(utc_datetime).map_err(|e| {
        ProbeError::InvalidResponse(format!("bad utc_datetime '{}': {}", utc_datetime, e))
    })?;

    Ok(server.timestamp_millis() - local_now)
}

/// Query `url` once and compute the offset against `clock`
///
/// Local time is read before the request is sent, so the offset includes
/// the request latency.
pub async fn query_offset<C: Clock>(
    client: &reqwest::Client,
    url: &str,
    clock: &C,
) -> ProbeResult<i64> {
    let local_now = clock.now_millis();

    debug!(url = %url, "Sending time authority request");
    let response = client.get(url).send().await?;

    let status = response.status();
    if status != StatusCode::OK {
        warn!(status = %status, "Time authority returned error status");
        return Err(ProbeError::RequestFailed(status.as_u16()));
    }

    let body: serde_json::Value = response.json().await?;
    offset_from_body(&body, local_now)
}

/// Runs offset probes off the event loop
pub struct OffsetService {
    sender: SyncSender<ProbeResult<i64>>,
    /// Receives probe results; insert into the event loop
    pub channel: Channel<ProbeResult<i64>>,
}

impl OffsetService {
    /// Create a new service with channel for result communication
    pub fn new() -> Self {
        let (sender, channel) = sync_channel(1);
        Self { sender, channel }
    }

    /// Probe `url` once on a background thread
    pub fn start_probe(&self, url: String, timeout: Duration) {
        let sender = self.sender.clone();

        info!(url = %url, timeout_secs = timeout.as_secs(), "Starting clock offset probe");

        thread::spawn(move || {
            let result = probe_blocking(&url, timeout);
            if sender.send(result).is_err() {
                error!("Offset channel disconnected, dropping probe result");
            }
        });
    }
}

impl Default for OffsetService {
    fn default() -> Self {
        Self::new()
    }
}

fn probe_blocking(url: &str, timeout: Duration) -> ProbeResult<i64> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ProbeError::Transport(format!("Failed to create async runtime: {}", e)))?;

    let client = reqwest::Client::builder().timeout(timeout).build()?;
    rt.block_on(query_offset(&client, url, &SystemClock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_offset_from_body() {
        // 2025-01-01T00:00:01.500Z
        let body = json!({ "utc_datetime": "2025-01-01T00:00:01.500000+00:00" });
        let local = 1_735_689_600_000;
        assert_eq!(offset_from_body(&body, local), Ok(1_500));
    }

    #[test]
    fn test_offset_can_be_negative() {
        let body = json!({ "utc_datetime": "2025-01-01T00:00:00Z" });
        assert_eq!(offset_from_body(&body, 1_735_689_600_250), Ok(-250));
    }

    #[test]
    fn test_missing_or_non_string_field() {
        for body in [json!({}), json!({ "utc_datetime": 17 }), json!([1, 2])] {
            assert!(matches!(
                offset_from_body(&body, 0),
                Err(ProbeError::InvalidResponse(_))
            ));
        }
    }

    #[test]
    fn test_unparseable_timestamp() {
        let body = json!({ "utc_datetime": "not-a-date" });
        assert!(matches!(
            offset_from_body(&body, 0),
            Err(ProbeError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_probe_state_transitions() {
        let mut probe = TimeOffsetProbe::new();
        probe.begin();
        assert!(probe.state().loading);

        probe.finish(Ok(320));
        assert_eq!(
            probe.state(),
            &ProbeState {
                offset_millis: 320,
                loading: false,
                error: None,
            }
        );

        probe.begin();
        probe.finish(Err(ProbeError::RequestFailed(503)));
        assert_eq!(probe.offset_millis(), 320);
        assert!(!probe.state().loading);
        assert_eq!(probe.state().error.as_deref(), Some("request failed (HTTP 503)"));

        probe.begin();
        assert_eq!(probe.state().error, None);
    }

    #[test]
    fn test_offset_service_creation() {
        let service = OffsetService::new();
        drop(service);
    }
}
