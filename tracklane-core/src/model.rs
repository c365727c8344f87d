//! Canonical tracking data structures shared by every provider.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::TrackError;

/// Source reported on the failure synthesized once every provider is exhausted.
pub const MULTI_PROVIDER_SOURCE: &str = "Multi-Provider";

/// Placeholder for required descriptive fields a provider did not report.
pub const UNKNOWN: &str = "Unknown";

/// Longest tracking number accepted by [`TrackingQuery::validated`].
pub const MAX_TRACKING_NUMBER_LEN: usize = 64;

/// Built-in tracking providers, listed in the default attempt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Providers {
    /// Offline dataset bundled with the service.
    Mock,
    /// Maersk track and trace API.
    Maersk,
    /// `ShipsGo` container tracking service.
    ShipsGo,
    /// `TrackingMore` multi-carrier service.
    TrackingMore,
}

impl Providers {
    /// Every built-in provider in the default attempt order.
    pub const ALL: [Self; 4] = [Self::Mock, Self::Maersk, Self::ShipsGo, Self::TrackingMore];
}

impl fmt::Display for Providers {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            Providers::Mock => "mock",
            Providers::Maersk => "maersk",
            Providers::ShipsGo => "shipsgo",
            Providers::TrackingMore => "trackingmore",
        };
        write!(formatter, "{slug}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier for a tracking provider, also used as the `source` of its results.
pub struct ProviderId(pub String);

impl ProviderId {
    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<Providers> for ProviderId {
    fn from(provider: Providers) -> Self {
        ProviderId(provider.to_string())
    }
}

impl From<&str> for ProviderId {
    fn from(raw: &str) -> Self {
        ProviderId(raw.trim().to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Where a provider gets its data from.
pub enum ProviderKind {
    /// Local dataset, no network.
    Offline,
    /// A single carrier's own API.
    Carrier,
    /// Third-party container tracking aggregator.
    Aggregator,
    /// Generic multi-carrier parcel and freight service.
    MultiCarrier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Static metadata describing a provider.
pub struct ProviderMeta {
    /// Unique identifier.
    pub id: ProviderId,
    /// Human-friendly name.
    pub name: String,
    /// Kind of data source.
    pub kind: ProviderKind,
}

impl ProviderMeta {
    /// Whether results from this provider come from a live network call.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.kind != ProviderKind::Offline
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Transport mode hint supplied by the caller.
pub enum ShipmentType {
    /// Full container ocean freight.
    Ocean,
    /// Air freight.
    Air,
    /// Less-than-container-load ocean freight.
    Lcl,
    /// Not specified.
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Input of a single tracking lookup.
pub struct TrackingQuery {
    /// Carrier-issued tracking, container or booking number.
    pub tracking_number: String,
    /// Provider to try before the configured order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_provider: Option<ProviderId>,
    /// Carrier code hint forwarded to providers that accept one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_hint: Option<String>,
    /// Transport mode hint.
    #[serde(default)]
    pub shipment_type: ShipmentType,
}

impl TrackingQuery {
    /// Build a query for `tracking_number` without hints.
    #[must_use]
    pub fn new<S: Into<String>>(tracking_number: S) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            preferred_provider: None,
            carrier_hint: None,
            shipment_type: ShipmentType::Unknown,
        }
    }

    /// Ask for `provider` to be attempted first.
    #[must_use]
    pub fn with_preferred_provider<P: Into<ProviderId>>(mut self, provider: P) -> Self {
        self.preferred_provider = Some(provider.into());
        self
    }

    /// Attach a carrier code hint.
    #[must_use]
    pub fn with_carrier_hint<S: Into<String>>(mut self, hint: S) -> Self {
        self.carrier_hint = Some(hint.into());
        self
    }

    /// Attach a shipment type hint.
    #[must_use]
    pub fn with_shipment_type(mut self, shipment_type: ShipmentType) -> Self {
        self.shipment_type = shipment_type;
        self
    }

    /// Return a cleaned copy of the query: trimmed, upper-cased tracking
    /// number and blank hints dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::InvalidQuery`] when the tracking number is empty,
    /// longer than [`MAX_TRACKING_NUMBER_LEN`], or contains characters other
    /// than ASCII letters, digits and `-`.
    pub fn validated(&self) -> Result<Self, TrackError> {
        let number = self.tracking_number.trim();
        if number.is_empty() {
            return Err(TrackError::InvalidQuery(
                "trackingNumber must not be empty".to_owned(),
            ));
        }
        if number.len() > MAX_TRACKING_NUMBER_LEN {
            return Err(TrackError::InvalidQuery(format!(
                "trackingNumber is longer than {MAX_TRACKING_NUMBER_LEN} characters"
            )));
        }
        if let Some(bad) = number
            .chars()
            .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '-'))
        {
            return Err(TrackError::InvalidQuery(format!(
                "trackingNumber contains unsupported character {bad:?}"
            )));
        }

        Ok(Self {
            tracking_number: number.to_ascii_uppercase(),
            preferred_provider: self
                .preferred_provider
                .as_ref()
                .map(|id| ProviderId::from(id.as_str()))
                .filter(|id| !id.0.is_empty()),
            carrier_hint: self
                .carrier_hint
                .as_deref()
                .map(str::trim)
                .filter(|hint| !hint.is_empty())
                .map(str::to_owned),
            shipment_type: self.shipment_type,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Category of a timeline event.
pub enum EventType {
    /// Generic or unmapped event.
    #[default]
    Event,
    /// Vessel arrived or container discharged.
    VesselArrival,
    /// Vessel departed.
    VesselDeparture,
    /// Gate in or gate out at a terminal.
    Gate,
    /// Container loaded on a vessel or aircraft.
    Load,
    /// Cargo received by the carrier.
    CargoReceived,
    /// Customs released the cargo.
    CustomsCleared,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One entry of a shipment timeline.
pub struct TrackingEvent {
    /// Event category.
    #[serde(rename = "type")]
    pub kind: EventType,
    /// Provider status text.
    pub status: String,
    /// Where the event happened.
    pub location: String,
    /// ISO 8601 sort key. Always populated.
    pub timestamp: String,
    /// Display date, or `Invalid Date`.
    pub date: String,
    /// Display time, or `Invalid Date`.
    pub time: String,
    /// Vessel or flight name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel: Option<String>,
    /// Voyage or flight number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voyage: Option<String>,
    /// Number of pieces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pieces: Option<u32>,
    /// Volume in cubic metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Weight in kilograms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Planned date as reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_date: Option<String>,
    /// Actual date as reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Events grouped under one location of the timeline.
pub struct TimelineLocation {
    /// City or port name.
    pub location: String,
    /// Terminal name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    /// Events recorded at this location.
    #[serde(default)]
    pub events: Vec<TrackingEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Normalized shipment snapshot produced by every provider.
pub struct TrackingData {
    /// Shipment, bill of lading or container number.
    pub shipment_number: String,
    /// Current status text.
    pub status: String,
    /// Container number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_number: Option<String>,
    /// Container size/type code such as `40HC`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_type: Option<String>,
    /// Origin location.
    pub origin: String,
    /// Destination location.
    pub destination: String,
    /// Port of loading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_of_loading: Option<String>,
    /// Port of discharge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_of_discharge: Option<String>,
    /// Estimated arrival at destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_arrival: Option<DateTime<Utc>>,
    /// Estimated departure from origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_departure: Option<DateTime<Utc>>,
    /// Last known location.
    pub last_location: String,
    /// Locations with their events, in provider order.
    #[serde(default)]
    pub timeline: Vec<TimelineLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One provider that was tried and failed.
pub struct ProviderAttempt {
    /// Provider identifier.
    pub source: String,
    /// Failure reason reported by the provider.
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
/// Successful lookup.
pub struct TrackingSuccess {
    /// Normalized shipment snapshot.
    pub data: TrackingData,
    /// Provider that produced the data.
    pub source: String,
    /// Whether the data came from a live provider call.
    pub is_live_data: bool,
    /// When the live data was fetched.
    pub scraped_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
/// Failed lookup.
pub struct TrackingFailure {
    /// Human-readable reason.
    pub error: String,
    /// Provider that failed, or [`MULTI_PROVIDER_SOURCE`].
    pub source: String,
    /// Providers skipped because they are not configured.
    pub fallback_options: Vec<String>,
    /// Providers tried before giving up.
    pub attempts: Vec<ProviderAttempt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireResult", try_from = "WireResult")]
/// Outcome of a lookup, serialized with a boolean `success` tag.
pub enum TrackingResult {
    /// Data was found.
    Success(TrackingSuccess),
    /// No data was found.
    Failure(TrackingFailure),
}

impl TrackingResult {
    /// Success from a live provider call fetched at `scraped_at`.
    #[must_use]
    pub fn live(data: TrackingData, source: &ProviderId, scraped_at: DateTime<Utc>) -> Self {
        TrackingResult::Success(TrackingSuccess {
            data,
            source: source.0.clone(),
            is_live_data: true,
            scraped_at: Some(scraped_at),
        })
    }

    /// Success served from local data.
    #[must_use]
    pub fn offline(data: TrackingData, source: &ProviderId) -> Self {
        TrackingResult::Success(TrackingSuccess {
            data,
            source: source.0.clone(),
            is_live_data: false,
            scraped_at: None,
        })
    }

    /// Failure reported by a single provider.
    #[must_use]
    pub fn failure<E: fmt::Display>(source: &ProviderId, error: E) -> Self {
        TrackingResult::Failure(TrackingFailure {
            error: error.to_string(),
            source: source.0.clone(),
            fallback_options: Vec::new(),
            attempts: Vec::new(),
        })
    }

    /// Whether this is the success variant.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, TrackingResult::Success(_))
    }

    /// Provider the result is attributed to.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            TrackingResult::Success(success) => &success.source,
            TrackingResult::Failure(failure) => &failure.source,
        }
    }

    /// Tracking data, if the lookup succeeded.
    #[must_use]
    pub fn data(&self) -> Option<&TrackingData> {
        match self {
            TrackingResult::Success(success) => Some(&success.data),
            TrackingResult::Failure(_) => None,
        }
    }

    /// Failure reason, if the lookup failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            TrackingResult::Success(_) => None,
            TrackingResult::Failure(failure) => Some(&failure.error),
        }
    }

    /// Whether the data came from a live provider call.
    #[must_use]
    pub fn is_live_data(&self) -> bool {
        match self {
            TrackingResult::Success(success) => success.is_live_data,
            TrackingResult::Failure(_) => false,
        }
    }
}

// Flat JSON shape of TrackingResult.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResult {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<TrackingData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    source: String,
    #[serde(default)]
    is_live_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scraped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fallback_options: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attempts: Vec<ProviderAttempt>,
}

impl From<TrackingResult> for WireResult {
    fn from(result: TrackingResult) -> Self {
        match result {
            TrackingResult::Success(success) => WireResult {
                success: true,
                data: Some(success.data),
                error: None,
                source: success.source,
                is_live_data: success.is_live_data,
                scraped_at: success.scraped_at,
                fallback_options: Vec::new(),
                attempts: Vec::new(),
            },
            TrackingResult::Failure(failure) => WireResult {
                success: false,
                data: None,
                error: Some(failure.error),
                source: failure.source,
                is_live_data: false,
                scraped_at: None,
                fallback_options: failure.fallback_options,
                attempts: failure.attempts,
            },
        }
    }
}

impl TryFrom<WireResult> for TrackingResult {
    type Error = String;

    fn try_from(wire: WireResult) -> Result<Self, Self::Error> {
        if wire.success {
            let data = wire
                .data
                .ok_or_else(|| "successful result without data".to_owned())?;
            Ok(TrackingResult::Success(TrackingSuccess {
                data,
                source: wire.source,
                is_live_data: wire.is_live_data,
                scraped_at: wire.scraped_at,
            }))
        } else {
            let error = wire
                .error
                .ok_or_else(|| "failed result without error".to_owned())?;
            Ok(TrackingResult::Failure(TrackingFailure {
                error,
                source: wire.source,
                fallback_options: wire.fallback_options,
                attempts: wire.attempts,
            }))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Configuration-derived availability of one provider.
pub struct ProviderStatus {
    /// Provider identifier.
    pub name: ProviderId,
    /// Human-friendly name.
    pub display_name: String,
    /// Kind of data source.
    pub kind: ProviderKind,
    /// Whether all required configuration is present.
    pub available: bool,
    /// Whether results come from live network calls.
    pub is_live: bool,
    /// Whether the provider needs a credential at all.
    pub requires_credential: bool,
    /// Configuration keys that are missing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Availability of every registered provider.
pub struct ProviderStatusReport {
    /// One entry per registered provider, in registration order.
    pub providers: Vec<ProviderStatus>,
    /// Number of registered providers.
    pub total_providers: usize,
    /// Number of providers with complete configuration.
    pub available_providers: usize,
}

impl ProviderStatusReport {
    /// Summarize a list of statuses.
    #[must_use]
    pub fn from_statuses(providers: Vec<ProviderStatus>) -> Self {
        let available_providers = providers.iter().filter(|status| status.available).count();
        Self {
            total_providers: providers.len(),
            available_providers,
            providers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Settled outcome of one lookup inside a batch.
pub struct BatchOutcome {
    /// Tracking number as submitted.
    pub tracking_number: String,
    /// Result, when the lookup completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TrackingResult>,
    /// Error, when the lookup was rejected or hit a configuration error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    /// Settle a lookup outcome.
    #[must_use]
    pub fn settle(tracking_number: String, outcome: Result<TrackingResult, TrackError>) -> Self {
        match outcome {
            Ok(result) => Self {
                tracking_number,
                result: Some(result),
                error: None,
            },
            Err(err) => Self {
                tracking_number,
                result: None,
                error: Some(err.to_string()),
            },
        }
    }

    /// Whether the lookup produced tracking data.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.result.as_ref().is_some_and(TrackingResult::is_success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Summary of a batch lookup.
pub struct BatchReport {
    /// Number of lookups.
    pub total: usize,
    /// Lookups that produced tracking data.
    pub succeeded: usize,
    /// Lookups that did not.
    pub failed: usize,
    /// Per-lookup outcomes in input order.
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    /// Count successes and failures over `outcomes`.
    #[must_use]
    pub fn from_outcomes(outcomes: Vec<BatchOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|outcome| outcome.succeeded()).count();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn validated_query_is_trimmed_and_uppercased() {
        let query = TrackingQuery::new("  maeu1234567 ")
            .with_preferred_provider(" Maersk ")
            .with_carrier_hint("   ");

        let cleaned = query.validated().expect("valid query");

        assert_eq!(cleaned.tracking_number, "MAEU1234567");
        assert_eq!(cleaned.preferred_provider, Some(ProviderId::from(Providers::Maersk)));
        assert_eq!(cleaned.carrier_hint, None);
    }

    #[test]
    fn empty_and_malformed_numbers_are_rejected() {
        let too_long = "X".repeat(MAX_TRACKING_NUMBER_LEN + 1);
        for raw in ["", "   ", "ABC 123", "ABC/123", too_long.as_str()] {
            let err = TrackingQuery::new(raw).validated().expect_err("must be rejected");
            assert!(matches!(err, TrackError::InvalidQuery(_)), "{raw:?} gave {err}");
        }
    }

    #[test]
    fn query_deserializes_from_camel_case() {
        let query: TrackingQuery = serde_json::from_value(json!({
            "trackingNumber": "MAEU1234567",
            "preferredProvider": "shipsgo",
            "shipmentType": "lcl"
        }))
        .expect("query json");

        assert_eq!(query.preferred_provider, Some(ProviderId::from(Providers::ShipsGo)));
        assert_eq!(query.shipment_type, ShipmentType::Lcl);
        assert_eq!(query.carrier_hint, None);
    }

    #[test]
    fn failure_serializes_with_success_tag_and_omits_empty_fields() {
        let result = TrackingResult::failure(&ProviderId::from(Providers::Maersk), "boom");

        let value = serde_json::to_value(&result).expect("serialize");

        assert_eq!(
            value,
            json!({
                "success": false,
                "error": "boom",
                "source": "maersk",
                "isLiveData": false
            })
        );
    }

    #[test]
    fn success_without_data_is_rejected() {
        let parsed = serde_json::from_value::<TrackingResult>(json!({
            "success": true,
            "source": "mock",
            "isLiveData": false
        }));

        assert!(parsed.is_err(), "success without data must not parse");
    }
}
