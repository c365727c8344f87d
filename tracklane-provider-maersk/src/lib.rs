//! Provider implementation for Maersk using the track and trace API.

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
pub const DEFAULT_BASE_URL: &str = "https://api.maersk.com";

const DEFAULT_OPERATOR: &str = "MAEU";

// Maersk group operator codes accepted by the API.
const OPERATORS: [&str; 5] = ["MAEU", "MAEI", "SEAU", "SEJJ", "MCPU"];

/// Response from /synergy/tracking/{number}
#[derive(Debug, Deserialize)]
pub struct TrackingResponse {
    tpdoc_num: Option<String>,
    origin: Option<Place>,
    destination: Option<Place>,
    #[serde(default)]
    containers: Vec<Container>,
}

/// Origin or destination place.
#[derive(Debug, Deserialize)]
struct Place {
    terminal: Option<String>,
    city: Option<String>,
    country: Option<String>,
}

/// Single container of a transport document.
#[derive(Debug, Deserialize)]
struct Container {
    container_num: Option<String>,
    container_size: Option<String>,
    container_type: Option<String>,
    iso_code: Option<String>,
    status: Option<String>,
    eta_final_delivery: Option<String>,
    #[serde(default)]
    locations: Vec<Location>,
}

/// Location visited by a container.
#[derive(Debug, Deserialize)]
struct Location {
    terminal: Option<String>,
    city: Option<String>,
    country: Option<String>,
    #[serde(default)]
    events: Vec<Event>,
}

/// Activity recorded at a location.
#[derive(Debug, Deserialize)]
struct Event {
    activity: Option<String>,
    #[serde(default)]
    stempty: bool,
    vessel_name: Option<String>,
    voyage_num: Option<String>,
    expected_time: Option<String>,
    actual_time: Option<String>,
    event_time: Option<String>,
    event_time_type: Option<String>, // "ACTUAL" or "EXPECTED"
}

/// Settings for the Maersk provider.
#[derive(Debug, Clone)]
pub struct MaerskSettings {
    /// API consumer key. The provider is unavailable without it.
    pub consumer_key: Option<String>,
    /// API host, without trailing slash.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for MaerskSettings {
    fn default() -> Self {
        Self {
            consumer_key: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

/// Tracking implementation for Maersk.
pub struct MaerskPort {
    client: Client,
    meta: ProviderMeta,
    settings: MaerskSettings,
}

impl MaerskPort {
    /// Create a new port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, settings: MaerskSettings) -> Self {
        Self {
            client,
            meta: provider_meta(),
            settings,
        }
    }

    async fn fetch(&self, query: &TrackingQuery, consumer_key: &str) -> Result<TrackingData, PortError> {
        let operator = operator_for(query.carrier_hint.as_deref());
        let base = self.settings.base_url.trim_end_matches('/');

        let req = self
            .client
            .get(format!("{base}/synergy/tracking/{}", query.tracking_number))
            .query(&[("operator", operator)])
            .header("Consumer-Key", consumer_key);

        let resp = fetch_json::<TrackingResponse>(req, self.settings.timeout).await?;
        if resp.containers.is_empty() {
            return Err(PortError::NotFound);
        }

        Ok(normalize_response(resp, &query.tracking_number))
    }
}

#[async_trait]
impl TrackingPort for MaerskPort {
    fn meta(&self) -> &ProviderMeta {
        &self.meta
    }

    fn missing_configuration(&self) -> Vec<&'static str> {
        if normalize::non_blank(self.settings.consumer_key.as_deref()).is_some() {
            Vec::new()
        } else {
            vec!["consumer_key"]
        }
    }

    async fn attempt(&self, query: &TrackingQuery) -> Result<TrackingResult, PortError> {
        self.ensure_configured()?;
        let consumer_key = self.settings.consumer_key.as_deref().unwrap_or_default().trim();

        match self.fetch(query, consumer_key).await {
            Ok(data) => Ok(TrackingResult::live(data, &self.meta.id, Utc::now())),
            Err(err) => {
                debug!(tracking_number = %query.tracking_number, error = %err, "maersk lookup failed");
                Ok(TrackingResult::failure(&self.meta.id, err))
            }
        }
    }
}

/// Build the Maersk provider.
#[must_use]
pub fn port(client: Client, settings: MaerskSettings) -> Arc<dyn TrackingPort> {
    Arc::new(MaerskPort::new(client, settings))
}

fn provider_meta() -> ProviderMeta {
    ProviderMeta {
        id: ProviderId::from(Providers::Maersk),
        name: String::from("Maersk"),
        kind: ProviderKind::Carrier,
    }
}

fn operator_for(hint: Option<&str>) -> &'static str {
    hint.and_then(|code| {
        OPERATORS
            .into_iter()
            .find(|operator| operator.eq_ignore_ascii_case(code.trim()))
    })
    .unwrap_or(DEFAULT_OPERATOR)
}

/// Map Maersk activity codes onto event categories.
fn map_activity(activity: &str) -> EventType {
    let code = activity.trim().to_uppercase();

    match code.as_str() {
        "LOAD" => EventType::Load,
        "DISCHARG" | "CONTAINER ARRIVAL" => EventType::VesselArrival,
        "CONTAINER DEPARTURE" => EventType::VesselDeparture,
        "CUSTOMS RELEASE" => EventType::CustomsCleared,
        "RECEIVE" | "CARGO RECEIVED" => EventType::CargoReceived,
        _ if code.starts_with("GATE") => EventType::Gate,
        _ => EventType::Event,
    }
}

fn status_text(activity: Option<&str>, empty: bool) -> String {
    let activity = normalize::or_unknown(activity);
    if empty {
        format!("{activity} (empty)")
    } else {
        activity
    }
}

/// Map a Maersk response onto the canonical model. Picks the container
/// matching `tracking_number`, or the first one for document searches.
#[must_use]
pub fn normalize_response(resp: TrackingResponse, tracking_number: &str) -> TrackingData {
    let TrackingResponse {
        tpdoc_num,
        origin,
        destination,
        containers,
    } = resp;

    let index = containers
        .iter()
        .position(|container| {
            container
                .container_num
                .as_deref()
                .is_some_and(|number| number.eq_ignore_ascii_case(tracking_number))
        })
        .unwrap_or(0);
    let container = containers.into_iter().nth(index);

    let place = |place: Option<&Place>| {
        place.and_then(|place| normalize::join_location(&[place.city.as_deref(), place.country.as_deref()]))
    };

    let mut port_of_loading = None;
    let mut port_of_discharge = None;
    let mut estimated_departure = None;
    let mut last_actual: Option<(String, String)> = None;
    let mut timeline = Vec::new();

    let (container_number, container_type, status, eta, locations) = match container {
        Some(container) => (
            normalize::owned(container.container_num.as_deref()),
            normalize::owned(container.iso_code.as_deref()).or_else(|| {
                normalize::join_location(&[
                    container.container_size.as_deref(),
                    container.container_type.as_deref(),
                ])
                .map(|joined| joined.replace(", ", " "))
            }),
            container.status,
            container.eta_final_delivery,
            container.locations,
        ),
        None => (None, None, None, None, Vec::new()),
    };

    for stop in locations {
        let location = normalize::or_unknown(
            normalize::join_location(&[stop.city.as_deref(), stop.country.as_deref()]).as_deref(),
        );
        let mut events = Vec::with_capacity(stop.events.len());

        for event in stop.events {
            let is_actual = event
                .event_time_type
                .as_deref()
                .is_some_and(|kind| kind.eq_ignore_ascii_case("ACTUAL"));
            let actual = event
                .actual_time
                .as_deref()
                .or(if is_actual { event.event_time.as_deref() } else { None });
            let planned = event
                .expected_time
                .as_deref()
                .or(if is_actual { None } else { event.event_time.as_deref() });
            let time = normalize::event_time(actual, planned);
            let kind = map_activity(event.activity.as_deref().unwrap_or_default());

            match kind {
                EventType::Load if port_of_loading.is_none() => port_of_loading = Some(location.clone()),
                EventType::VesselArrival => port_of_discharge = Some(location.clone()),
                EventType::VesselDeparture if estimated_departure.is_none() => {
                    estimated_departure = normalize::optional_timestamp(planned.or(actual));
                }
                _ => {}
            }
            if normalize::non_blank(actual).is_some()
                && last_actual
                    .as_ref()
                    .is_none_or(|(timestamp, _)| *timestamp <= time.timestamp)
            {
                last_actual = Some((time.timestamp.clone(), location.clone()));
            }

            events.push(TrackingEvent {
                kind,
                status: status_text(event.activity.as_deref(), event.stempty),
                location: location.clone(),
                timestamp: time.timestamp,
                date: time.date,
                time: time.time,
                vessel: normalize::owned(event.vessel_name.as_deref()),
                voyage: normalize::owned(event.voyage_num.as_deref()),
                pieces: None,
                volume: None,
                weight: None,
                planned_date: time.planned,
                actual_date: time.actual,
            });
        }

        timeline.push(TimelineLocation {
            location,
            terminal: normalize::owned(stop.terminal.as_deref()),
            events,
        });
    }

    let origin_text = place(origin.as_ref());
    let last_location = last_actual
        .map(|(_, location)| location)
        .or_else(|| origin_text.clone());

    TrackingData {
        shipment_number: normalize::owned(tpdoc_num.as_deref())
            .unwrap_or_else(|| tracking_number.to_owned()),
        status: normalize::or_unknown(status.as_deref()),
        container_number,
        container_type,
        origin: normalize::or_unknown(origin_text.as_deref()),
        destination: normalize::or_unknown(place(destination.as_ref()).as_deref()),
        port_of_loading: port_of_loading
            .or_else(|| origin.as_ref().and_then(|place| normalize::owned(place.terminal.as_deref()))),
        port_of_discharge: port_of_discharge.or_else(|| {
            destination
                .as_ref()
                .and_then(|place| normalize::owned(place.terminal.as_deref()))
        }),
        estimated_arrival: normalize::optional_timestamp(eta.as_deref()),
        estimated_departure,
        last_location: normalize::or_unknown(last_location.as_deref()),
        timeline,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tracklane_core::normalize::INVALID_DATE;

    use super::*;

    fn sample() -> serde_json::Value {
        json!({
            "tpdoc_num": "MAEU1234567",
            "origin": { "terminal": "Yangshan Phase IV", "city": "Shanghai", "country": "China" },
            "destination": { "terminal": "APMT Maasvlakte II", "city": "Rotterdam", "country": "Netherlands" },
            "containers": [{
                "container_num": "MSKU9070323",
                "container_size": "40",
                "container_type": "Dry",
                "status": "IN-PROGRESS",
                "eta_final_delivery": "2024-04-08T06:00:00.000",
                "locations": [
                    {
                        "terminal": "Yangshan Phase IV",
                        "city": "Shanghai",
                        "country": "China",
                        "events": [
                            { "activity": "GATE-IN", "stempty": false, "event_time": "2024-02-28T09:12:00.000", "event_time_type": "ACTUAL" },
                            { "activity": "LOAD", "vessel_name": "MAERSK EMDEN", "voyage_num": "409W", "actual_time": "2024-03-01T22:40:00.000" },
                            { "activity": "CONTAINER DEPARTURE", "vessel_name": "MAERSK EMDEN", "voyage_num": "409W", "expected_time": "2024-03-02T18:00:00.000", "actual_time": "2024-03-02T19:30:00.000" }
                        ]
                    },
                    {
                        "terminal": "APMT Maasvlakte II",
                        "city": "Rotterdam",
                        "country": "Netherlands",
                        "events": [
                            { "activity": "DISCHARG", "expected_time": "2024-04-08T06:00:00.000", "event_time_type": "EXPECTED" },
                            { "activity": "TRANSSHIPMENT HOLD", "expected_time": "garbage" }
                        ]
                    }
                ]
            }]
        })
    }

    fn parse(value: serde_json::Value) -> TrackingResponse {
        serde_json::from_value(value).expect("maersk payload")
    }

    #[test]
    fn normalizes_locations_and_events() {
        let data = normalize_response(parse(sample()), "MAEU1234567");

        assert_eq!(data.shipment_number, "MAEU1234567");
        assert_eq!(data.container_number.as_deref(), Some("MSKU9070323"));
        assert_eq!(data.container_type.as_deref(), Some("40 Dry"));
        assert_eq!(data.origin, "Shanghai, China");
        assert_eq!(data.destination, "Rotterdam, Netherlands");
        assert_eq!(data.port_of_loading.as_deref(), Some("Shanghai, China"));
        assert_eq!(data.port_of_discharge.as_deref(), Some("Rotterdam, Netherlands"));
        assert_eq!(data.last_location, "Shanghai, China");
        assert_eq!(
            data.estimated_departure.map(normalize::to_iso).as_deref(),
            Some("2024-03-02T18:00:00Z")
        );

        let shanghai = &data.timeline[0];
        assert_eq!(shanghai.terminal.as_deref(), Some("Yangshan Phase IV"));
        let kinds: Vec<EventType> = shanghai.events.iter().map(|event| event.kind).collect();
        assert_eq!(kinds, [EventType::Gate, EventType::Load, EventType::VesselDeparture]);
        assert_eq!(shanghai.events[0].timestamp, "2024-02-28T09:12:00Z");
        assert_eq!(shanghai.events[1].vessel.as_deref(), Some("MAERSK EMDEN"));
    }

    #[test]
    fn planned_only_and_unparsable_events_are_kept() {
        let data = normalize_response(parse(sample()), "MAEU1234567");
        let rotterdam = &data.timeline[1];

        let discharge = &rotterdam.events[0];
        assert_eq!(discharge.kind, EventType::VesselArrival);
        assert_eq!(discharge.actual_date, None);
        assert_eq!(discharge.planned_date.as_deref(), Some("2024-04-08T06:00:00Z"));

        let hold = &rotterdam.events[1];
        assert_eq!(hold.kind, EventType::Event);
        assert_eq!(hold.date, INVALID_DATE);
        assert_eq!(hold.timestamp, "garbage");
    }

    #[test]
    fn container_search_picks_matching_container() {
        let mut value = sample();
        value["containers"]
            .as_array_mut()
            .expect("containers")
            .insert(0, json!({ "container_num": "MSKU0000001", "status": "COMPLETE" }));

        let data = normalize_response(parse(value), "msku9070323");

        assert_eq!(data.container_number.as_deref(), Some("MSKU9070323"));
        assert_eq!(data.status, "IN-PROGRESS");
    }

    #[test]
    fn sparse_payload_omits_absent_fields() {
        let data = normalize_response(parse(json!({ "containers": [{}] })), "MAEU7654321");

        assert_eq!(data.shipment_number, "MAEU7654321");
        assert_eq!(data.container_number, None);
        assert_eq!(data.estimated_arrival, None);
        assert_eq!(data.origin, "Unknown");
        assert!(data.timeline.is_empty(), "timeline defaults to empty");
    }

    #[test]
    fn same_payload_normalizes_identically() {
        let first = normalize_response(parse(sample()), "MAEU1234567");
        let second = normalize_response(parse(sample()), "MAEU1234567");

        assert_eq!(first, second);
    }

    #[test]
    fn carrier_hint_selects_group_operator() {
        assert_eq!(operator_for(Some("sealand ")), DEFAULT_OPERATOR);
        assert_eq!(operator_for(Some("seau")), "SEAU");
        assert_eq!(operator_for(None), "MAEU");
    }

    #[test]
    fn activities_map_to_event_types() {
        assert_eq!(map_activity("GATE-OUT"), EventType::Gate);
        assert_eq!(map_activity("discharg"), EventType::VesselArrival);
        assert_eq!(map_activity("CUSTOMS RELEASE"), EventType::CustomsCleared);
        assert_eq!(map_activity("STRIPPING"), EventType::Event);
    }
}
