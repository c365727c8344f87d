//! HTTP plumbing shared by the network-backed providers.

use std::time::Duration;

use reqwest::{Error as ReqwestError, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::ports::PortError;

/// Timeout applied to provider requests when none is configured.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Send `req` with `timeout` applied and decode the JSON body.
///
/// A `404` maps to [`PortError::NotFound`]; other non-success statuses map to
/// [`PortError::Status`].
///
/// # Errors
///
/// Returns a [`PortError`] when the request fails, times out, is answered
/// with a non-success status, or the body is not the expected JSON.
pub async fn fetch_json<T: DeserializeOwned>(
    req: RequestBuilder,
    timeout: Duration,
) -> Result<T, PortError> {
    let response = req
        .timeout(timeout)
        .send()
        .await
        .map_err(|err| classify(err, timeout))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(PortError::NotFound);
    }
    if !status.is_success() {
        return Err(PortError::Status(status.as_u16()));
    }

    response.json().await.map_err(|err| {
        if err.is_decode() {
            PortError::Decode(err.to_string())
        } else {
            classify(err, timeout)
        }
    })
}

fn classify(err: ReqwestError, timeout: Duration) -> PortError {
    if err.is_timeout() {
        PortError::Timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
    } else {
        PortError::Network(err)
    }
}
