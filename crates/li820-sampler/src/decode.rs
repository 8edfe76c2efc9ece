use chrono::{DateTime, Utc};
use li820_frame::FrameTag;
use roxmltree::{Document, Node};
use tracing::warn;

use crate::error::DecodeError;
use crate::measurement::Measurement;
use crate::session::SessionConfig;

/// Numeric fields read from one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub co2: f64,
    pub h2o: f64,
}

/// Parse the `co2` and `h2o` values out of one frame.
///
/// The outer element must be `tag`. The two fields may sit at any depth below
/// it; the analyzer nests them in `<data>`, but flat frames parse too.
pub fn parse_reading(frame: &str, tag: &FrameTag) -> Result<Reading, DecodeError> {
    let doc = Document::parse(frame).map_err(|err| DecodeError::Malformed(err.to_string()))?;
    let root = doc.root_element();

    let found = root.tag_name().name();
    if found != tag.as_str() {
        return Err(DecodeError::TagMismatch {
            expected: tag.to_string(),
            found: found.to_string(),
        });
    }

    Ok(Reading {
        co2: number_field(root, "co2")?,
        h2o: number_field(root, "h2o")?,
    })
}

fn number_field(root: Node<'_, '_>, field: &'static str) -> Result<f64, DecodeError> {
    let node = root
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == field)
        .ok_or(DecodeError::MissingField(field))?;

    let raw = node.text().unwrap_or_default().trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(DecodeError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Decode a frame into a record stamped with the current time.
pub fn decode(frame: &str, config: &SessionConfig) -> Measurement {
    decode_at(frame, config, Utc::now())
}

/// Decode a frame into a record stamped with `captured_at`.
///
/// Never fails: an undecodable frame logs one warning and yields the sentinel
/// record.
pub fn decode_at(frame: &str, config: &SessionConfig, captured_at: DateTime<Utc>) -> Measurement {
    match parse_reading(frame, &config.frame_tag) {
        Ok(reading) => Measurement::new(reading.co2, reading.h2o, captured_at, config.site.as_str()),
        Err(err) => {
            warn!(error = %err, frame_len = frame.len(), site = %config.site, "failed to decode frame");
            Measurement::sentinel(captured_at, config.site.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn warnings(&self) -> usize {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes)
                .lines()
                .filter(|line| line.contains("WARN"))
                .count()
        }
    }

    fn decode_logged(frame: &str) -> (Measurement, CapturedLogs) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let record = tracing::subscriber::with_default(subscriber, || {
            decode_at(frame, &config(), Utc::now())
        });
        (record, logs)
    }

    fn config() -> SessionConfig {
        SessionConfig::new(FrameTag::new("li820").unwrap(), "site-A")
    }

    fn tag() -> FrameTag {
        FrameTag::new("li820").unwrap()
    }

    #[test]
    fn flat_frame() {
        let reading =
            parse_reading("<li820><co2>412.5</co2><h2o>1.2</h2o></li820>", &tag()).unwrap();
        assert_eq!(reading, Reading { co2: 412.5, h2o: 1.2 });
    }

    #[test]
    fn nested_analyzer_frame() {
        let frame = "<li820><data><celltemp>5.1464300e1</celltemp><cellpres>9.7279129e1</cellpres>\
                     <co2>7.2311115e2</co2><co2abs>8.4527921e-2</co2abs><h2o>1.0935912e1</h2o>\
                     <ivolt>1.8393555e1</ivolt></data></li820>";
        let reading = parse_reading(frame, &tag()).unwrap();
        assert!((reading.co2 - 723.11115).abs() < 1e-9);
        assert!((reading.h2o - 10.935912).abs() < 1e-9);
    }

    #[test]
    fn whitespace_around_values() {
        let reading =
            parse_reading("<li820>\n  <co2> 400 </co2>\n  <h2o>\t2.5\n</h2o>\n</li820>", &tag())
                .unwrap();
        assert_eq!(reading, Reading { co2: 400.0, h2o: 2.5 });
    }

    #[test]
    fn rejects_other_model() {
        let err = parse_reading("<li840><co2>1</co2><h2o>2</h2o></li840>", &tag()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TagMismatch {
                expected: "li820".into(),
                found: "li840".into()
            }
        );
    }

    #[test]
    fn rejects_missing_field() {
        let err = parse_reading("<li820><co2>1</co2></li820>", &tag()).unwrap_err();
        assert_eq!(err, DecodeError::MissingField("h2o"));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = parse_reading("<li820><co2>bad</co2><h2o>1</h2o></li820>", &tag()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNumber { field: "co2", .. }));

        let err = parse_reading("<li820><co2>NaN</co2><h2o>1</h2o></li820>", &tag()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNumber { field: "co2", .. }));

        let err = parse_reading("<li820><co2>1</co2><h2o>inf</h2o></li820>", &tag()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNumber { field: "h2o", .. }));
    }

    #[test]
    fn rejects_malformed_xml() {
        let err = parse_reading("<li820><co2>1</h2o></li820>", &tag()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn decode_stamps_site_and_time() {
        let before = Utc::now();
        let record = decode("<li820><co2>412.5</co2><h2o>1.2</h2o></li820>", &config());
        assert_eq!(record.co2, 412.5);
        assert_eq!(record.h2o, 1.2);
        assert_eq!(record.site, "site-A");
        assert!(record.captured_at >= before);
    }

    #[test]
    fn failures_yield_sentinel() {
        for frame in [
            "<li820><co2>bad</co2></li820>",
            "<li840><co2>1</co2><h2o>2</h2o></li840>",
            "<li820></li820>",
            "not xml at all",
            "",
        ] {
            let record = decode(frame, &config());
            assert!(record.is_sentinel(), "{frame:?} should decode to the sentinel");
            assert_eq!(record.site, "site-A");
        }
    }

    #[test]
    fn timestamps_never_decrease() {
        let frame = "<li820><co2>1</co2><h2o>2</h2o></li820>";
        let first = decode(frame, &config());
        let second = decode(frame, &config());
        assert!(second.captured_at >= first.captured_at);
    }

    #[test]
    fn decode_at_uses_given_time() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let record = decode_at("<li820><co2>1</co2><h2o>2</h2o></li820>", &config(), at);
        assert_eq!(record.captured_at, at);
    }

    #[test]
    fn failed_decode_emits_one_warning() {
        let (record, logs) = decode_logged("<li820><co2>bad</co2></li820>");
        assert!(record.is_sentinel());
        assert_eq!(logs.warnings(), 1);
    }

    #[test]
    fn successful_decode_emits_no_warning() {
        let (record, logs) = decode_logged("<li820><co2>412.5</co2><h2o>1.2</h2o></li820>");
        assert_eq!(record.co2, 412.5);
        assert_eq!(logs.warnings(), 0);
    }
}
