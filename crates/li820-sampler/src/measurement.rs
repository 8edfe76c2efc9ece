use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value stored in `co2` and `h2o` when a frame could not be decoded.
pub const SENTINEL: f64 = -1.0;

/// One analyzer sample.
///
/// Always fully populated: a frame that fails to decode still yields a record,
/// with [`SENTINEL`] in both numeric fields. `captured_at` and `site` come from
/// the sampler, never from the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// CO2 concentration in ppm.
    pub co2: f64,
    /// H2O concentration in ppt.
    pub h2o: f64,
    #[serde(rename = "at")]
    pub captured_at: DateTime<Utc>,
    pub site: String,
}

impl Measurement {
    pub fn new(co2: f64, h2o: f64, captured_at: DateTime<Utc>, site: impl Into<String>) -> Self {
        Self {
            co2,
            h2o,
            captured_at,
            site: site.into(),
        }
    }

    /// The record produced for an undecodable frame.
    pub fn sentinel(captured_at: DateTime<Utc>, site: impl Into<String>) -> Self {
        Self::new(SENTINEL, SENTINEL, captured_at, site)
    }

    /// Whether this record stands in for a frame that failed to decode.
    pub fn is_sentinel(&self) -> bool {
        self.co2 == SENTINEL && self.h2o == SENTINEL
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789)
    }

    #[test]
    fn json_has_exactly_wire_keys() {
        let record = Measurement::new(412.5, 1.2, at(), "site-A");
        let value = serde_json::to_value(&record).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["at", "co2", "h2o", "site"]);
    }

    #[test]
    fn json_encoding_is_compact_rfc3339() {
        let record = Measurement::new(412.5, 1.2, at(), "site-A");
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"co2":412.5,"h2o":1.2,"at":"2026-10-16T12:00:00.123456789Z","site":"site-A"}"#
        );
    }

    #[test]
    fn json_decodes_back() {
        let json = r#"{"co2":-1.0,"h2o":-1.0,"at":"2026-10-16T12:00:00Z","site":"glbrc"}"#;
        let record: Measurement = serde_json::from_str(json).unwrap();
        assert!(record.is_sentinel());
        assert_eq!(record.site, "glbrc");
    }

    #[test]
    fn sentinel_requires_both_fields() {
        assert!(Measurement::sentinel(at(), "s").is_sentinel());
        assert!(!Measurement::new(-1.0, 0.5, at(), "s").is_sentinel());
        assert!(!Measurement::new(400.0, -1.0, at(), "s").is_sentinel());
    }
}
