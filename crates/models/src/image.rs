use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::coordinates::Coordinates;
use crate::errors::ModelError;

/// One photo attached to a trip.
///
/// `uri` is an opaque reference handed out by the platform image picker; the
/// image bytes never pass through the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub uri: String,
    #[serde(default)]
    pub note: String,
    /// Held at millisecond precision, the precision it is stored with.
    #[serde(with = "date_format")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl ImageEntry {
    pub fn new(uri: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self { uri: uri.into(), note: String::new(), date: stored_precision(date), coordinates: None }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }
}

/// A picked photo that has not been committed to a trip yet.
///
/// Mirrors the add-image flow: pick, then note (or skip), then date (or skip).
/// Skipping the note leaves it empty; skipping the date stamps the current time.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageDraft {
    uri: String,
    coordinates: Option<Coordinates>,
    note: String,
    date: Option<DateTime<Utc>>,
}

impl ImageDraft {
    /// Start a draft from a picker result. An empty uri means the picker was cancelled.
    pub fn new(uri: impl Into<String>) -> Result<Self, ModelError> {
        let uri = uri.into();
        if uri.trim().is_empty() {
            return Err(ModelError::Validation("image uri must not be empty".into()));
        }
        Ok(Self { uri, coordinates: None, note: String::new(), date: None })
    }

    /// Start a draft pinned at a map location.
    pub fn at(uri: impl Into<String>, coordinates: Coordinates) -> Result<Self, ModelError> {
        let mut draft = Self::new(uri)?;
        draft.coordinates = Some(coordinates);
        Ok(draft)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn skip_note(mut self) -> Self {
        self.note.clear();
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(stored_precision(date));
        self
    }

    pub fn skip_date(mut self) -> Self {
        self.date = Some(stored_precision(Utc::now()));
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Build the entry; a draft that never got a date is stamped now.
    pub fn finish(self) -> ImageEntry {
        ImageEntry {
            uri: self.uri,
            note: self.note,
            date: self.date.unwrap_or_else(|| stored_precision(Utc::now())),
            coordinates: self.coordinates,
        }
    }
}

/// Cut a timestamp to the millisecond precision the date codec writes, so a
/// reloaded entry equals the one in memory.
pub fn stored_precision(date: DateTime<Utc>) -> DateTime<Utc> {
    date.trunc_subsecs(3)
}

/// Dates are written as RFC 3339 with millisecond precision. Older blobs may
/// hold a bare `YYYY-MM-DD` or epoch milliseconds, both are accepted on read.
mod date_format {
    use std::fmt;

    use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

    use super::stored_precision;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        deserializer.deserialize_any(DateVisitor)
    }

    struct DateVisitor;

    impl<'de> Visitor<'de> for DateVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an RFC 3339 timestamp, a YYYY-MM-DD date or epoch milliseconds")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
                return Ok(stored_precision(dt.with_timezone(&Utc)));
            }
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
                .ok_or_else(|| E::custom(format!("unrecognised date: {v}")))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            DateTime::from_timestamp_millis(v).ok_or_else(|| E::custom(format!("timestamp out of range: {v}")))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            let v = i64::try_from(v).map_err(|_| E::custom(format!("timestamp out of range: {v}")))?;
            self.visit_i64(v)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            if !v.is_finite() {
                return Err(E::custom("timestamp is not a finite number"));
            }
            self.visit_i64(v.trunc() as i64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(json: &str) -> Result<ImageEntry, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn date_is_written_as_iso_string() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        let json = serde_json::to_value(ImageEntry::new("file:///a.jpg", date)).unwrap();
        assert_eq!(json["date"], "2024-05-01T10:30:00.000Z");
        assert_eq!(json["note"], "");
        assert!(json.get("coordinates").is_none());
    }

    #[test]
    fn date_accepts_legacy_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        let iso = parse(r#"{"uri":"a","note":"","date":"2024-05-01T02:00:00+02:00"}"#).unwrap();
        assert_eq!(iso.date, expected);

        let day = parse(r#"{"uri":"a","note":"","date":"2024-05-01"}"#).unwrap();
        assert_eq!(day.date, expected);

        let millis = parse(&format!(r#"{{"uri":"a","date":{}}}"#, expected.timestamp_millis())).unwrap();
        assert_eq!(millis.date, expected);
        // missing note defaults to empty
        assert_eq!(millis.note, "");
    }

    #[test]
    fn garbage_date_is_rejected() {
        assert!(parse(r#"{"uri":"a","note":"","date":"yesterday"}"#).is_err());
        assert!(parse(r#"{"uri":"a","note":"","date":true}"#).is_err());
    }

    #[test]
    fn draft_flow_with_note_and_date() {
        let date = Utc.with_ymd_and_hms(2023, 8, 14, 0, 0, 0).unwrap();
        let pin = Coordinates::point(41.9, 12.5);
        let entry = ImageDraft::at("file:///rome.jpg", pin)
            .unwrap()
            .with_note("Colosseum")
            .with_date(date)
            .finish();
        assert_eq!(entry.uri, "file:///rome.jpg");
        assert_eq!(entry.note, "Colosseum");
        assert_eq!(entry.date, date);
        assert_eq!(entry.coordinates, Some(pin));
    }

    #[test]
    fn draft_skips_fall_back_to_defaults() {
        let before = Utc::now();
        let entry = ImageDraft::new("file:///x.jpg")
            .unwrap()
            .with_note("typo")
            .skip_note()
            .skip_date()
            .finish();
        assert_eq!(entry.note, "");
        assert!(entry.date >= before);
        assert!(entry.coordinates.is_none());
    }

    #[test]
    fn stamped_dates_survive_a_reload() {
        let entry = ImageDraft::new("file:///now.jpg").unwrap().skip_note().skip_date().finish();
        assert_eq!(entry.date.timestamp_subsec_nanos() % 1_000_000, 0);
        let reloaded: ImageEntry = serde_json::from_value(serde_json::to_value(&entry).unwrap()).unwrap();
        assert_eq!(reloaded, entry);

        let unset = ImageDraft::new("file:///later.jpg").unwrap().finish();
        let reloaded: ImageEntry = serde_json::from_value(serde_json::to_value(&unset).unwrap()).unwrap();
        assert_eq!(reloaded, unset);
    }

    #[test]
    fn sub_millisecond_precision_is_dropped_on_entry() {
        let precise = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap() + chrono::Duration::nanoseconds(123_456_789);
        assert_eq!(ImageEntry::new("a", precise).date.timestamp_subsec_nanos(), 123_000_000);
        assert_eq!(ImageDraft::new("a").unwrap().with_date(precise).finish().date.timestamp_subsec_nanos(), 123_000_000);

        let parsed = parse(r#"{"uri":"a","date":"2024-05-01T10:30:00.123456789Z"}"#).unwrap();
        assert_eq!(parsed.date.timestamp_subsec_nanos(), 123_000_000);
        assert_eq!(serde_json::to_value(&parsed).unwrap()["date"], "2024-05-01T10:30:00.123Z");
    }

    #[test]
    fn cancelled_pick_is_rejected() {
        assert!(matches!(ImageDraft::new("  "), Err(ModelError::Validation(_))));
    }
}
