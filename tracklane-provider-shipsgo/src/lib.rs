//! Provider implementation for the ShipsGo container tracking service.
//!
//! ShipsGo answers with a single summary record per container: ports of
//! loading and discharge plus four milestone dates. The timeline is built from
//! those milestones, grouped under the two ports.

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
        TrackingData, TrackingEvent, TrackingQuery, TrackingResult,
    },
    normalize,
    ports::{PortError, TrackingPort},
};

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://shipsgo.com/api/v1.1";

const SUCCESS_MESSAGE: &str = "success";

/// Body of /ContainerService/GetContainerInfo. The service wraps the record
/// in an array for container numbers and returns it bare for BL lookups.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContainerInfoResponse {
    Many(Vec<ContainerInfo>),
    One(Box<ContainerInfo>),
}

/// Container summary record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInfo {
    message: Option<String>,
    container_number: Option<String>,
    #[serde(rename = "BLReferenceNo")]
    bl_reference_no: Option<String>,
    status: Option<String>,
    container_type: Option<String>,
    pol: Option<String>,
    from_country: Option<String>,
    pod: Option<String>,
    to_country: Option<String>,
    #[serde(rename = "ETA")]
    eta: Option<String>,
    loading_date: Option<Milestone>,
    departure_date: Option<Milestone>,
    arrival_date: Option<Milestone>,
    discharge_date: Option<Milestone>,
    vessel: Option<String>,
    vessel_voyage: Option<String>,
}

/// Date of a voyage milestone, either planned or actual.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Milestone {
    date: Option<String>,
    #[serde(default)]
    is_actual: bool,
}

impl Milestone {
    fn split(milestone: Option<&Self>) -> (Option<&str>, Option<&str>) {
        match milestone {
            Some(Self { date, is_actual: true }) => (date.as_deref(), None),
            Some(Self { date, is_actual: false }) => (None, date.as_deref()),
            None => (None, None),
        }
    }
}

/// Settings for the ShipsGo provider.
#[derive(Debug, Clone)]
pub struct ShipsGoSettings {
    /// Account auth code. The provider is unavailable without it.
    pub auth_code: Option<String>,
    /// API root, without trailing slash.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ShipsGoSettings {
    fn default() -> Self {
        Self {
            auth_code: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

/// Tracking implementation for ShipsGo.
pub struct ShipsGoPort {
    client: Client,
    meta: ProviderMeta,
    settings: ShipsGoSettings,
}

impl ShipsGoPort {
    /// Create a new port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, settings: ShipsGoSettings) -> Self {
        Self {
            client,
            meta: provider_meta(),
            settings,
        }
    }

    async fn fetch(&self, tracking_number: &str, auth_code: &str) -> Result<TrackingData, PortError> {
        let base = self.settings.base_url.trim_end_matches('/');
        let req = self
            .client
            .get(format!("{base}/ContainerService/GetContainerInfo/"))
            .query(&[("authCode", auth_code), ("requestId", tracking_number)]);

        let record = match fetch_json::<ContainerInfoResponse>(req, self.settings.timeout).await? {
            ContainerInfoResponse::Many(records) => records.into_iter().next(),
            ContainerInfoResponse::One(record) => Some(*record),
        }
        .ok_or(PortError::NotFound)?;

        check_message(&record)?;
        Ok(normalize_info(&record, tracking_number))
    }
}

#[async_trait]
impl TrackingPort for ShipsGoPort {
    fn meta(&self) -> &ProviderMeta {
        &self.meta
    }

    fn missing_configuration(&self) -> Vec<&'static str> {
        if normalize::non_blank(self.settings.auth_code.as_deref()).is_some() {
            Vec::new()
        } else {
            vec!["auth_code"]
        }
    }

    async fn attempt(&self, query: &TrackingQuery) -> Result<TrackingResult, PortError> {
        self.ensure_configured()?;
        let auth_code = self.settings.auth_code.as_deref().unwrap_or_default().trim();

        match self.fetch(&query.tracking_number, auth_code).await {
            Ok(data) => Ok(TrackingResult::live(data, &self.meta.id, Utc::now())),
            Err(err) => {
                debug!(tracking_number = %query.tracking_number, error = %err, "shipsgo lookup failed");
                Ok(TrackingResult::failure(&self.meta.id, err))
            }
        }
    }
}

/// Build the ShipsGo provider.
#[must_use]
pub fn port(client: Client, settings: ShipsGoSettings) -> Arc<dyn TrackingPort> {
    Arc::new(ShipsGoPort::new(client, settings))
}

fn provider_meta() -> ProviderMeta {
    ProviderMeta {
        id: ProviderId::from(Providers::ShipsGo),
        name: String::from("ShipsGo"),
        kind: ProviderKind::Aggregator,
    }
}

// ShipsGo reports lookup problems in `Message` with a 200 status.
fn check_message(record: &ContainerInfo) -> Result<(), PortError> {
    match normalize::non_blank(record.message.as_deref()) {
        None => Ok(()),
        Some(message) if message.eq_ignore_ascii_case(SUCCESS_MESSAGE) => Ok(()),
        Some(message) if message.to_lowercase().contains("not found") => Err(PortError::NotFound),
        Some(message) if record.container_number.is_none() => Err(PortError::Provider(message.to_owned())),
        Some(_) => Ok(()),
    }
}

fn milestone_event(
    kind: EventType,
    status: &str,
    location: &str,
    milestone: Option<&Milestone>,
    vessel: (Option<&str>, Option<&str>),
) -> Option<TrackingEvent> {
    let (actual, planned) = Milestone::split(milestone);
    if normalize::non_blank(actual.or(planned)).is_none() {
        return None;
    }

    let time = normalize::event_time(actual, planned);
    Some(TrackingEvent {
        kind,
        status: status.to_owned(),
        location: location.to_owned(),
        timestamp: time.timestamp,
        date: time.date,
        time: time.time,
        vessel: normalize::owned(vessel.0),
        voyage: normalize::owned(vessel.1),
        pieces: None,
        volume: None,
        weight: None,
        planned_date: time.planned,
        actual_date: time.actual,
    })
}

/// Map a ShipsGo record onto the canonical model.
#[must_use]
pub fn normalize_info(info: &ContainerInfo, tracking_number: &str) -> TrackingData {
    let origin = normalize::join_location(&[info.pol.as_deref(), info.from_country.as_deref()]);
    let destination = normalize::join_location(&[info.pod.as_deref(), info.to_country.as_deref()]);
    let origin_name = normalize::or_unknown(origin.as_deref());
    let destination_name = normalize::or_unknown(destination.as_deref());
    let vessel = (info.vessel.as_deref(), info.vessel_voyage.as_deref());

    let departure_events: Vec<TrackingEvent> = [
        milestone_event(EventType::Load, "Loaded on vessel", &origin_name, info.loading_date.as_ref(), vessel),
        milestone_event(
            EventType::VesselDeparture,
            "Vessel departure",
            &origin_name,
            info.departure_date.as_ref(),
            vessel,
        ),
    ]
    .into_iter()
    .flatten()
    .collect();
    let arrival_events: Vec<TrackingEvent> = [
        milestone_event(
            EventType::VesselArrival,
            "Vessel arrival",
            &destination_name,
            info.arrival_date.as_ref(),
            vessel,
        ),
        milestone_event(
            EventType::Event,
            "Discharged from vessel",
            &destination_name,
            info.discharge_date.as_ref(),
            vessel,
        ),
    ]
    .into_iter()
    .flatten()
    .collect();

    let reached_destination = arrival_events.iter().any(|event| event.actual_date.is_some());
    let last_location = if reached_destination { destination } else { origin };

    let mut timeline = Vec::with_capacity(2);
    if !departure_events.is_empty() {
        timeline.push(TimelineLocation {
            location: origin_name.clone(),
            terminal: None,
            events: departure_events,
        });
    }
    if !arrival_events.is_empty() {
        timeline.push(TimelineLocation {
            location: destination_name.clone(),
            terminal: None,
            events: arrival_events,
        });
    }

    let (departure_actual, departure_planned) = Milestone::split(info.departure_date.as_ref());
    let (arrival_actual, arrival_planned) = Milestone::split(info.arrival_date.as_ref());

    TrackingData {
        shipment_number: normalize::owned(info.bl_reference_no.as_deref())
            .or_else(|| normalize::owned(info.container_number.as_deref()))
            .unwrap_or_else(|| tracking_number.to_owned()),
        status: normalize::or_unknown(info.status.as_deref()),
        container_number: normalize::owned(info.container_number.as_deref()),
        container_type: normalize::owned(info.container_type.as_deref()),
        origin: origin_name,
        destination: destination_name,
        port_of_loading: normalize::owned(info.pol.as_deref()),
        port_of_discharge: normalize::owned(info.pod.as_deref()),
        estimated_arrival: normalize::optional_timestamp(info.eta.as_deref())
            .or_else(|| normalize::optional_timestamp(arrival_planned.or(arrival_actual))),
        estimated_departure: normalize::optional_timestamp(departure_planned.or(departure_actual)),
        last_location: normalize::or_unknown(last_location.as_deref()),
        timeline,
    }
}
