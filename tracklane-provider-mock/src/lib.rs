//! Provider serving shipments from an offline dataset, used for demos and tests.

use std::collections::HashMap;
use std::fs;
use std::io::Error as IoError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Error as JsonError;
use tracing::{debug, warn};

use tracklane_core::{
    model::{
        ProviderId, ProviderKind, ProviderMeta, Providers, TimelineLocation, TrackingData,
        TrackingEvent, TrackingQuery, TrackingResult,
    },
    normalize,
    ports::{PortError, TrackingPort},
};

const BUILTIN_DATASET: &str = include_str!("../data/shipments.json");

#[derive(thiserror::Error, Debug)]
/// Errors raised while loading a dataset.
pub enum DatasetError {
    /// The dataset file could not be read.
    #[error("Failed to read dataset {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: IoError,
    },
    /// The dataset is not valid JSON of the expected shape.
    #[error("Invalid dataset: {0}")]
    Parse(#[from] JsonError),
}

/// Record as stored in a dataset file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockShipment {
    tracking_number: String,
    status: Option<String>,
    container_number: Option<String>,
    container_type: Option<String>,
    origin: Option<String>,
    destination: Option<String>,
    port_of_loading: Option<String>,
    port_of_discharge: Option<String>,
    eta: Option<String>,
    etd: Option<String>,
    last_location: Option<String>,
    #[serde(default)]
    timeline: Vec<MockLocation>,
}

#[derive(Debug, Clone, Deserialize)]
struct MockLocation {
    location: Option<String>,
    terminal: Option<String>,
    #[serde(default)]
    events: Vec<MockEvent>,
}

#[derive(Debug, Clone, Deserialize)]
struct MockEvent {
    #[serde(rename = "type", default)]
    tag: String,
    status: Option<String>,
    location: Option<String>,
    actual: Option<String>,
    planned: Option<String>,
    vessel: Option<String>,
    voyage: Option<String>,
    pieces: Option<u32>,
    volume: Option<f64>,
    weight: Option<f64>,
}

/// Settings for the offline provider.
#[derive(Debug, Clone, Default)]
pub struct MockSettings {
    /// Whether the provider takes part in lookups.
    pub enabled: bool,
    /// Extra records merged over the built-in dataset.
    pub dataset_path: Option<PathBuf>,
}

/// Offline provider answering from an in-memory map.
pub struct MockPort {
    meta: ProviderMeta,
    enabled: bool,
    records: HashMap<String, TrackingData>,
}

impl MockPort {
    /// Create a provider over the given records.
    #[must_use]
    pub fn new(enabled: bool, shipments: Vec<MockShipment>) -> Self {
        let mut port = Self {
            meta: provider_meta(),
            enabled,
            records: HashMap::new(),
        };
        port.insert_all(shipments);
        port
    }

    /// Create a provider over the dataset bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Parse`] if the bundled dataset is malformed.
    pub fn builtin(enabled: bool) -> Result<Self, DatasetError> {
        Ok(Self::new(enabled, parse_dataset(BUILTIN_DATASET)?))
    }

    /// Merge records from a JSON dataset file, replacing records with the
    /// same tracking number.
    ///
    /// # Errors
    ///
    /// Returns a [`DatasetError`] when the file cannot be read or parsed.
    pub fn load_file(mut self, path: &Path) -> Result<Self, DatasetError> {
        let contents = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let shipments = parse_dataset(&contents)?;
        debug!(path = %path.display(), records = shipments.len(), "loaded mock dataset");
        self.insert_all(shipments);
        Ok(self)
    }

    /// Number of tracking numbers the provider can answer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert_all(&mut self, shipments: Vec<MockShipment>) {
        for shipment in shipments {
            let key = shipment.tracking_number.trim().to_ascii_uppercase();
            self.records.insert(key, normalize_shipment(shipment));
        }
    }
}

#[async_trait]
impl TrackingPort for MockPort {
    fn meta(&self) -> &ProviderMeta {
        &self.meta
    }

    fn missing_configuration(&self) -> Vec<&'static str> {
        if self.enabled {
            Vec::new()
        } else {
            vec!["providers.mock.enabled"]
        }
    }

    fn requires_credential(&self) -> bool {
        false
    }

    async fn attempt(&self, query: &TrackingQuery) -> Result<TrackingResult, PortError> {
        self.ensure_configured()?;

        let key = query.tracking_number.to_ascii_uppercase();
        Ok(match self.records.get(&key) {
            Some(data) => TrackingResult::offline(data.clone(), &self.meta.id),
            None => TrackingResult::failure(&self.meta.id, "Tracking number not found in mock dataset"),
        })
    }
}

/// Build the offline provider from settings.
///
/// # Errors
///
/// Returns a [`DatasetError`] when the configured dataset cannot be loaded.
pub fn port(settings: &MockSettings) -> Result<Arc<dyn TrackingPort>, DatasetError> {
    let mut port = MockPort::builtin(settings.enabled)?;
    if let Some(path) = settings.dataset_path.as_deref() {
        port = port.load_file(path)?;
    }
    if port.is_empty() {
        warn!("mock dataset is empty, every lookup will fall through");
    }
    debug!(enabled = settings.enabled, records = port.len(), "mock provider ready");
    Ok(Arc::new(port))
}

/// Parse a dataset document: a JSON array of shipments.
///
/// # Errors
///
/// Returns [`DatasetError::Parse`] when the document is malformed.
pub fn parse_dataset(contents: &str) -> Result<Vec<MockShipment>, DatasetError> {
    Ok(serde_json::from_str(contents)?)
}

fn provider_meta() -> ProviderMeta {
    ProviderMeta {
        id: ProviderId::from(Providers::Mock),
        name: String::from("Offline dataset"),
        kind: ProviderKind::Offline,
    }
}

/// Map a dataset record onto the canonical model.
#[must_use]
pub fn normalize_shipment(shipment: MockShipment) -> TrackingData {
    let timeline = shipment
        .timeline
        .into_iter()
        .map(|stop| {
            let location = normalize::or_unknown(stop.location.as_deref());
            let events = stop
                .events
                .into_iter()
                .map(|event| {
                    let time = normalize::event_time(event.actual.as_deref(), event.planned.as_deref());
                    TrackingEvent {
                        kind: normalize::event_type_from_tag(&event.tag),
                        status: normalize::or_unknown(event.status.as_deref()),
                        location: normalize::owned(event.location.as_deref())
                            .unwrap_or_else(|| location.clone()),
                        timestamp: time.timestamp,
                        date: time.date,
                        time: time.time,
                        vessel: normalize::owned(event.vessel.as_deref()),
                        voyage: normalize::owned(event.voyage.as_deref()),
                        pieces: event.pieces,
                        volume: event.volume,
                        weight: event.weight,
                        planned_date: time.planned,
                        actual_date: time.actual,
                    }
                })
                .collect();
            TimelineLocation {
                location,
                terminal: normalize::owned(stop.terminal.as_deref()),
                events,
            }
        })
        .collect();

    TrackingData {
        shipment_number: shipment.tracking_number.trim().to_ascii_uppercase(),
        status: normalize::or_unknown(shipment.status.as_deref()),
        container_number: normalize::owned(shipment.container_number.as_deref()),
        container_type: normalize::owned(shipment.container_type.as_deref()),
        origin: normalize::or_unknown(shipment.origin.as_deref()),
        destination: normalize::or_unknown(shipment.destination.as_deref()),
        port_of_loading: normalize::owned(shipment.port_of_loading.as_deref()),
        port_of_discharge: normalize::owned(shipment.port_of_discharge.as_deref()),
        estimated_arrival: normalize::optional_timestamp(shipment.eta.as_deref()),
        estimated_departure: normalize::optional_timestamp(shipment.etd.as_deref()),
        last_location: normalize::or_unknown(shipment.last_location.as_deref()),
        timeline,
    }
}
