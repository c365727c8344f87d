//! Traits describing provider capabilities and shared error types.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{ProviderMeta, ProviderStatus, TrackingQuery, TrackingResult};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to provider backends.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The provider did not answer within the configured timeout.
    #[error("Request timed out after {0} ms")]
    Timeout(u64),
    /// The provider answered with a non-success HTTP status.
    #[error("Provider responded with HTTP status {0}")]
    Status(u16),
    /// The provider has no record of the tracking number.
    #[error("Tracking number not found")]
    NotFound,
    /// The provider response could not be decoded.
    #[error("Invalid provider response: {0}")]
    Decode(String),
    /// The provider reported an error in its response body.
    #[error("Provider error: {0}")]
    Provider(String),
    /// Required configuration such as an API key is absent.
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),
}

impl PortError {
    /// Whether this error indicates a deployment misconfiguration rather than
    /// a transient provider condition.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, PortError::MissingConfiguration(_))
    }
}

#[derive(thiserror::Error, Debug)]
/// Errors that cross the tracking service boundary.
pub enum TrackError {
    /// The query was rejected before any provider was tried.
    #[error("Invalid tracking query: {0}")]
    InvalidQuery(String),
    /// A provider was invoked in a state it cannot serve.
    #[error("Provider failure: {0}")]
    Port(#[from] PortError),
}

#[async_trait]
/// Capability contract every tracking source implements.
pub trait TrackingPort: Send + Sync {
    /// Metadata describing this provider.
    fn meta(&self) -> &ProviderMeta;

    /// Names of required configuration values that are absent.
    fn missing_configuration(&self) -> Vec<&'static str>;

    /// Whether the provider needs a credential to operate.
    fn requires_credential(&self) -> bool {
        true
    }

    /// Whether all required configuration is present.
    fn available(&self) -> bool {
        self.missing_configuration().is_empty()
    }

    /// Configuration-derived status, computed without any network call.
    fn status(&self) -> ProviderStatus {
        let meta = self.meta();
        let missing = self.missing_configuration();
        ProviderStatus {
            name: meta.id.clone(),
            display_name: meta.name.clone(),
            kind: meta.kind,
            available: missing.is_empty(),
            is_live: meta.is_live(),
            requires_credential: self.requires_credential(),
            missing: missing.into_iter().map(str::to_owned).collect(),
        }
    }

    /// Fail with [`PortError::MissingConfiguration`] unless the provider is
    /// fully configured.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::MissingConfiguration`] naming the absent keys.
    fn ensure_configured(&self) -> Result<(), PortError> {
        let missing = self.missing_configuration();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PortError::MissingConfiguration(format!(
                "{} requires {}",
                self.meta().id,
                missing.join(", ")
            )))
        }
    }

    /// Look up a shipment. Provider-side problems such as "not found",
    /// timeouts or outages come back as [`TrackingResult::Failure`].
    ///
    /// # Errors
    ///
    /// Returns [`PortError::MissingConfiguration`] when called on a provider
    /// that is not configured.
    async fn attempt(&self, query: &TrackingQuery) -> Result<TrackingResult, PortError>;
}

#[async_trait]
/// Receives every final lookup result, e.g. for audit logging or notifications.
pub trait TrackingObserver: Send + Sync {
    /// Record a finished lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the downstream collaborator rejects the record.
    async fn record(&self, query: &TrackingQuery, result: &TrackingResult) -> Result<(), PortError>;
}
