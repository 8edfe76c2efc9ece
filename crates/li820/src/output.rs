use std::io::IsTerminal;

use chrono::SecondsFormat;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use li820_sampler::Measurement;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print records in `format`. JSON gets one compact record per line, the wire
/// encoding subscribers see.
pub fn print_measurements(records: &[Measurement], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                println!(
                    "{}",
                    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => println!("{}", measurement_table(records)),
        OutputFormat::Pretty => {
            for record in records {
                println!("{}", pretty_line(record));
            }
        }
    }
}

fn measurement_table(records: &[Measurement]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["CAPTURED", "SITE", "CO2 (ppm)", "H2O (ppt)", "STATUS"]);
    for record in records {
        table.add_row(vec![
            timestamp(record),
            record.site.clone(),
            format!("{:.2}", record.co2),
            format!("{:.3}", record.h2o),
            status(record).to_string(),
        ]);
    }
    table
}

fn pretty_line(record: &Measurement) -> String {
    format!(
        "at={} site={} co2={} h2o={} status={}",
        timestamp(record),
        record.site,
        record.co2,
        record.h2o,
        status(record)
    )
}

fn timestamp(record: &Measurement) -> String {
    record
        .captured_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn status(record: &Measurement) -> &'static str {
    if record.is_sentinel() {
        "decode-failed"
    } else {
        "ok"
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 250_000_000).unwrap()
    }

    #[test]
    fn table_lists_every_record() {
        let records = [
            Measurement::new(412.5, 1.2, at(), "glbrc"),
            Measurement::sentinel(at(), "glbrc"),
        ];
        let rendered = measurement_table(&records).to_string();
        assert!(rendered.contains("CO2 (ppm)"));
        assert!(rendered.contains("412.50"));
        assert!(rendered.contains("decode-failed"));
        assert!(rendered.contains("2023-11-14T22:13:20.250Z"));
    }

    #[test]
    fn pretty_line_fields() {
        let line = pretty_line(&Measurement::new(412.5, 1.2, at(), "site-A"));
        assert_eq!(
            line,
            "at=2023-11-14T22:13:20.250Z site=site-A co2=412.5 h2o=1.2 status=ok"
        );
    }
}
