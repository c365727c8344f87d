//! Helpers provider normalizers use to map raw payloads onto [`TrackingData`].
//!
//! Everything here is pure: the same input always yields the same output, and
//! unparsable dates never raise. Display strings degrade to [`INVALID_DATE`]
//! while the canonical timestamp falls back to the next usable field.
//!
//! [`TrackingData`]: crate::model::TrackingData

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::model::{EventType, UNKNOWN};

/// Marker used for display dates and times that cannot be parsed.
pub const INVALID_DATE: &str = "Invalid Date";

/// Timestamp used when a provider reports no time at all for an event.
pub const EPOCH_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

const DISPLAY_DATE_FORMAT: &str = "%d %b %Y";
const DISPLAY_TIME_FORMAT: &str = "%H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a provider timestamp. Accepts RFC 3339 and the common naive
/// `date`/`date time` layouts, which are read as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Canonical ISO form of a timestamp.
#[must_use]
pub fn to_iso(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Display date such as `05 Mar 2024`, or [`INVALID_DATE`].
#[must_use]
pub fn display_date(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp).map_or_else(
        || INVALID_DATE.to_owned(),
        |parsed| parsed.format(DISPLAY_DATE_FORMAT).to_string(),
    )
}

/// Display time such as `14:30`, or [`INVALID_DATE`].
#[must_use]
pub fn display_time(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp).map_or_else(
        || INVALID_DATE.to_owned(),
        |parsed| parsed.format(DISPLAY_TIME_FORMAT).to_string(),
    )
}

/// Resolved timing fields of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTime {
    /// Sort key, always populated.
    pub timestamp: String,
    /// Display date of the most authoritative field.
    pub date: String,
    /// Display time of the most authoritative field.
    pub time: String,
    /// Planned date, canonicalized when parsable.
    pub planned: Option<String>,
    /// Actual date, canonicalized when parsable.
    pub actual: Option<String>,
}

/// Resolve an event's timing from its actual and planned fields.
///
/// The actual time wins over the planned one. The sort key is the first of
/// the two that parses, then the raw text of the first present one, then
/// [`EPOCH_TIMESTAMP`]. Display strings follow the most authoritative present
/// field and become [`INVALID_DATE`] when it does not parse.
#[must_use]
pub fn event_time(actual: Option<&str>, planned: Option<&str>) -> EventTime {
    let actual = non_blank(actual);
    let planned = non_blank(planned);
    let primary = actual.or(planned);

    let timestamp = actual
        .and_then(parse_timestamp)
        .or_else(|| planned.and_then(parse_timestamp))
        .map(to_iso)
        .or_else(|| primary.map(str::to_owned))
        .unwrap_or_else(|| EPOCH_TIMESTAMP.to_owned());

    EventTime {
        timestamp,
        date: display_date(primary),
        time: display_time(primary),
        planned: planned.map(canonical_or_raw),
        actual: actual.map(canonical_or_raw),
    }
}

/// Parse an optional field into a timestamp, dropping blanks and garbage.
#[must_use]
pub fn optional_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    non_blank(raw).and_then(parse_timestamp)
}

/// Trimmed value, or `None` for absent or blank input.
#[must_use]
pub fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

/// Owned trimmed value, or `None` for absent or blank input.
#[must_use]
pub fn owned(raw: Option<&str>) -> Option<String> {
    non_blank(raw).map(str::to_owned)
}

/// Owned trimmed value, or [`UNKNOWN`].
#[must_use]
pub fn or_unknown(raw: Option<&str>) -> String {
    non_blank(raw).unwrap_or(UNKNOWN).to_owned()
}

/// Join non-blank location parts, e.g. city and country, with `", "`.
#[must_use]
pub fn join_location(parts: &[Option<&str>]) -> Option<String> {
    let present: Vec<&str> = parts.iter().filter_map(|part| non_blank(*part)).collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join(", "))
    }
}

/// Best-effort event category from free-text status descriptions.
/// Anything unrecognised is a plain [`EventType::Event`].
#[must_use]
pub fn classify_event(description: &str) -> EventType {
    let text = description.to_lowercase();

    if text.contains("customs") && (text.contains("clear") || text.contains("releas")) {
        EventType::CustomsCleared
    } else if text.contains("gate") {
        EventType::Gate
    } else if text.contains("discharg") || text.contains("arriv") || text.contains("berth") {
        EventType::VesselArrival
    } else if text.contains("depart") || text.contains("sail") {
        EventType::VesselDeparture
    } else if text.contains("load") && !text.contains("unload") {
        EventType::Load
    } else if text.contains("receiv") || text.contains("accepted") {
        EventType::CargoReceived
    } else {
        EventType::Event
    }
}

/// Map a canonical kebab-case tag such as `vessel-arrival` onto
/// [`EventType`]. Unknown tags become [`EventType::Event`].
#[must_use]
pub fn event_type_from_tag(tag: &str) -> EventType {
    match tag.trim().to_lowercase().replace('_', "-").as_str() {
        "vessel-arrival" => EventType::VesselArrival,
        "vessel-departure" => EventType::VesselDeparture,
        "gate" => EventType::Gate,
        "load" => EventType::Load,
        "cargo-received" => EventType::CargoReceived,
        "customs-cleared" => EventType::CustomsCleared,
        _ => EventType::Event,
    }
}

fn canonical_or_raw(raw: &str) -> String {
    parse_timestamp(raw).map_or_else(|| raw.to_owned(), to_iso)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_layouts_as_utc() {
        for raw in [
            "2024-03-05T14:30:00Z",
            "2024-03-05T16:30:00+02:00",
            "2024-03-05T14:30:00",
            "2024-03-05T14:30:00.000",
            "2024-03-05 14:30:00",
            "2024-03-05 14:30",
        ] {
            let parsed = parse_timestamp(raw).map(to_iso);
            assert_eq!(parsed.as_deref(), Some("2024-03-05T14:30:00Z"), "layout {raw}");
        }

        assert_eq!(
            parse_timestamp("2024-03-05").map(to_iso).as_deref(),
            Some("2024-03-05T00:00:00Z")
        );
        assert_eq!(parse_timestamp("next tuesday"), None);
        assert_eq!(parse_timestamp("   "), None);
    }

    #[test]
    fn actual_time_wins_over_planned() {
        let time = event_time(Some("2024-03-06T08:00:00"), Some("2024-03-05T08:00:00"));

        assert_eq!(time.timestamp, "2024-03-06T08:00:00Z");
        assert_eq!(time.date, "06 Mar 2024");
        assert_eq!(time.time, "08:00");
        assert_eq!(time.actual.as_deref(), Some("2024-03-06T08:00:00Z"));
        assert_eq!(time.planned.as_deref(), Some("2024-03-05T08:00:00Z"));
    }

    #[test]
    fn unparsable_actual_degrades_display_but_keeps_planned_timestamp() {
        let time = event_time(Some("not a date"), Some("2024-03-05 10:15"));

        assert_eq!(time.timestamp, "2024-03-05T10:15:00Z");
        assert_eq!(time.date, INVALID_DATE);
        assert_eq!(time.time, INVALID_DATE);
        assert_eq!(time.actual.as_deref(), Some("not a date"));
    }

    #[test]
    fn timestamp_is_always_populated() {
        let garbage = event_time(None, Some("TBA"));
        assert_eq!(garbage.timestamp, "TBA");
        assert_eq!(garbage.date, INVALID_DATE);

        let nothing = event_time(None, Some("  "));
        assert_eq!(nothing.timestamp, EPOCH_TIMESTAMP);
        assert_eq!(nothing.planned, None);
        assert_eq!(nothing.time, INVALID_DATE);
    }

    #[test]
    fn classifies_common_descriptions() {
        assert_eq!(classify_event("Gate in empty"), EventType::Gate);
        assert_eq!(classify_event("Loaded on vessel"), EventType::Load);
        assert_eq!(classify_event("Unloaded from vessel"), EventType::Event);
        assert_eq!(classify_event("Vessel departure"), EventType::VesselDeparture);
        assert_eq!(classify_event("Discharged at POD"), EventType::VesselArrival);
        assert_eq!(classify_event("Customs released"), EventType::CustomsCleared);
        assert_eq!(classify_event("Cargo received at CFS"), EventType::CargoReceived);
        assert_eq!(classify_event("Container inspected"), EventType::Event);
    }

    #[test]
    fn unknown_tags_fall_back_to_generic_event() {
        assert_eq!(event_type_from_tag("vessel_departure"), EventType::VesselDeparture);
        assert_eq!(event_type_from_tag("Customs-Cleared"), EventType::CustomsCleared);
        assert_eq!(event_type_from_tag("transshipment"), EventType::Event);
    }

    #[test]
    fn blank_parts_are_omitted() {
        assert_eq!(
            join_location(&[Some("Rotterdam"), Some(" "), Some("NL")]).as_deref(),
            Some("Rotterdam, NL")
        );
        assert_eq!(join_location(&[None, Some("")]), None);
        assert_eq!(owned(Some("  ")), None);
        assert_eq!(or_unknown(None), UNKNOWN);
    }
}
