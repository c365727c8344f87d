//! Provider implementation for the TrackingMore multi-carrier API (v4).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use tracklane_core::{
    http::{DEFAULT_PROVIDER_TIMEOUT, fetch_json},
    model::{
        EventType, ProviderId, ProviderKind, ProviderMeta, Providers, TimelineLocation,
        TrackingData, TrackingEvent, TrackingQuery, TrackingResult, UNKNOWN,
    },
    normalize,
    ports::{PortError, TrackingPort},
};

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://api.trackingmore.com";

const META_OK: u16 = 200;

/// Envelope of every v4 response.
#[derive(Debug, Deserialize)]
struct Envelope {
    meta: Meta,
    #[serde(default)]
    data: Vec<Tracking>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    code: u16,
    #[serde(default)]
    message: String,
}

/// Tracking record from /v4/trackings/get
#[derive(Debug, Clone, Deserialize)]
pub struct Tracking {
    tracking_number: Option<String>,
    delivery_status: Option<String>,
    origin_country: Option<String>,
    destination_country: Option<String>,
    latest_event: Option<String>,
    latest_checkpoint_time: Option<String>,
    origin_info: Option<CarrierInfo>,
    destination_info: Option<CarrierInfo>,
}

/// Checkpoints reported by the origin or destination carrier.
#[derive(Debug, Clone, Deserialize)]
struct CarrierInfo {
    #[serde(default)]
    trackinfo: Vec<Checkpoint>,
}

#[derive(Debug, Clone, Deserialize)]
struct Checkpoint {
    checkpoint_date: Option<String>,
    tracking_detail: Option<String>,
    location: Option<String>,
    checkpoint_delivery_status: Option<String>,
}

/// Settings for the TrackingMore provider.
#[derive(Debug, Clone)]
pub struct TrackingMoreSettings {
    /// API key. The provider is unavailable without it.
    pub api_key: Option<String>,
    /// API host, without trailing slash.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for TrackingMoreSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

/// Tracking implementation for TrackingMore.
pub struct TrackingMorePort {
    client: Client,
    meta: ProviderMeta,
    settings: TrackingMoreSettings,
}

impl TrackingMorePort {
    /// Create a new port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, settings: TrackingMoreSettings) -> Self {
        Self {
            client,
            meta: provider_meta(),
            settings,
        }
    }

    async fn fetch(&self, query: &TrackingQuery, api_key: &str) -> Result<TrackingData, PortError> {
        let base = self.settings.base_url.trim_end_matches('/');
        let mut params = vec![("tracking_numbers", query.tracking_number.clone())];
        if let Some(courier) = normalize::non_blank(query.carrier_hint.as_deref()) {
            params.push(("courier_code", courier.to_lowercase()));
        }

        let req = self
            .client
            .get(format!("{base}/v4/trackings/get"))
            .query(&params)
            .header("Tracking-Api-Key", api_key);

        let envelope = fetch_json::<Envelope>(req, self.settings.timeout).await?;
        if envelope.meta.code != META_OK {
            return Err(PortError::Provider(format!(
                "{} ({})",
                envelope.meta.message, envelope.meta.code
            )));
        }

        let tracking = envelope
            .data
            .into_iter()
            .find(|tracking| {
                tracking
                    .tracking_number
                    .as_deref()
                    .is_none_or(|number| number.eq_ignore_ascii_case(&query.tracking_number))
            })
            .ok_or(PortError::NotFound)?;

        if is_untracked(&tracking) {
            return Err(PortError::NotFound);
        }
        Ok(normalize_tracking(&tracking, &query.tracking_number))
    }
}

#[async_trait]
impl TrackingPort for TrackingMorePort {
    fn meta(&self) -> &ProviderMeta {
        &self.meta
    }

    fn missing_configuration(&self) -> Vec<&'static str> {
        if normalize::non_blank(self.settings.api_key.as_deref()).is_some() {
            Vec::new()
        } else {
            vec!["api_key"]
        }
    }

    async fn attempt(&self, query: &TrackingQuery) -> Result<TrackingResult, PortError> {
        self.ensure_configured()?;
        let api_key = self.settings.api_key.as_deref().unwrap_or_default().trim();

        match self.fetch(query, api_key).await {
            Ok(data) => Ok(TrackingResult::live(data, &self.meta.id, Utc::now())),
            Err(err) => {
                debug!(tracking_number = %query.tracking_number, error = %err, "trackingmore lookup failed");
                Ok(TrackingResult::failure(&self.meta.id, err))
            }
        }
    }
}

/// Build the TrackingMore provider.
#[must_use]
pub fn port(client: Client, settings: TrackingMoreSettings) -> Arc<dyn TrackingPort> {
    Arc::new(TrackingMorePort::new(client, settings))
}

fn provider_meta() -> ProviderMeta {
    ProviderMeta {
        id: ProviderId::from(Providers::TrackingMore),
        name: String::from("TrackingMore"),
        kind: ProviderKind::MultiCarrier,
    }
}

fn checkpoints(tracking: &Tracking) -> impl Iterator<Item = &Checkpoint> {
    [&tracking.origin_info, &tracking.destination_info]
        .into_iter()
        .flatten()
        .flat_map(|info| info.trackinfo.iter())
}

// TrackingMore creates a record for any number it is asked about.
fn is_untracked(tracking: &Tracking) -> bool {
    let status = tracking.delivery_status.as_deref().unwrap_or_default();
    (status.is_empty() || status.eq_ignore_ascii_case("notfound")) && checkpoints(tracking).next().is_none()
}

/// Human-readable form of a TrackingMore delivery status slug.
fn status_label(slug: &str) -> String {
    match slug.trim().to_lowercase().as_str() {
        "pending" => "Pending".to_owned(),
        "notfound" => "Not Found".to_owned(),
        "inforeceived" => "Info Received".to_owned(),
        "transit" => "In Transit".to_owned(),
        "pickup" => "Out for Delivery".to_owned(),
        "delivered" => "Delivered".to_owned(),
        "undelivered" => "Delivery Failed".to_owned(),
        "exception" => "Exception".to_owned(),
        "expired" => "Expired".to_owned(),
        _ => normalize::or_unknown(Some(slug)),
    }
}

fn event_kind(checkpoint: &Checkpoint) -> EventType {
    let detail = checkpoint.tracking_detail.as_deref().unwrap_or_default();
    match normalize::classify_event(detail) {
        EventType::Event
            if checkpoint
                .checkpoint_delivery_status
                .as_deref()
                .is_some_and(|status| status.eq_ignore_ascii_case("inforeceived")) =>
        {
            EventType::CargoReceived
        }
        kind => kind,
    }
}

fn checkpoint_event(kind: EventType, detail: Option<&str>, location: Option<&str>, date: Option<&str>) -> TrackingEvent {
    let time = normalize::event_time(date, None);
    TrackingEvent {
        kind,
        status: normalize::or_unknown(detail),
        location: normalize::or_unknown(location),
        timestamp: time.timestamp,
        date: time.date,
        time: time.time,
        vessel: None,
        voyage: None,
        pieces: None,
        volume: None,
        weight: None,
        planned_date: time.planned,
        actual_date: time.actual,
    }
}

/// Map a TrackingMore record onto the canonical model.
///
/// Checkpoints from the origin and destination carriers are merged, sorted
/// oldest first, and grouped into consecutive runs at the same location.
/// Records without checkpoints fall back to the latest event summary.
#[must_use]
pub fn normalize_tracking(tracking: &Tracking, tracking_number: &str) -> TrackingData {
    let mut events: Vec<TrackingEvent> = checkpoints(tracking)
        .map(|checkpoint| {
            checkpoint_event(
                event_kind(checkpoint),
                checkpoint.tracking_detail.as_deref(),
                checkpoint.location.as_deref(),
                checkpoint.checkpoint_date.as_deref(),
            )
        })
        .collect();
    events.sort_by(|left, right| left.timestamp.cmp(&right.timestamp));
    events.dedup();

    if events.is_empty() {
        if let Some(latest) = normalize::non_blank(tracking.latest_event.as_deref()) {
            events.push(checkpoint_event(
                normalize::classify_event(latest),
                Some(latest),
                None,
                tracking.latest_checkpoint_time.as_deref(),
            ));
        }
    }

    let last_location = events
        .iter()
        .rev()
        .map(|event| event.location.as_str())
        .find(|location| *location != UNKNOWN)
        .map(str::to_owned);

    let mut timeline: Vec<TimelineLocation> = Vec::new();
    for event in events {
        match timeline.last_mut() {
            Some(stop) if stop.location == event.location => stop.events.push(event),
            _ => timeline.push(TimelineLocation {
                location: event.location.clone(),
                terminal: None,
                events: vec![event],
            }),
        }
    }

    let status = normalize::non_blank(tracking.delivery_status.as_deref())
        .map(status_label)
        .or_else(|| normalize::owned(tracking.latest_event.as_deref()));

    TrackingData {
        shipment_number: normalize::owned(tracking.tracking_number.as_deref())
            .unwrap_or_else(|| tracking_number.to_owned()),
        status: normalize::or_unknown(status.as_deref()),
        container_number: None,
        container_type: None,
        origin: normalize::or_unknown(tracking.origin_country.as_deref()),
        destination: normalize::or_unknown(tracking.destination_country.as_deref()),
        port_of_loading: None,
        port_of_discharge: None,
        estimated_arrival: None,
        estimated_departure: None,
        last_location: normalize::or_unknown(last_location.as_deref()),
        timeline,
    }
}
