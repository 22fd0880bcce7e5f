//! Metric decoding: focus, guiding and pointing figures parsed out of the
//! display text of metric extracts.
//!
//! Focus and guiding lines carry `KEY=value` tokens, e.g.
//! `Focus Done - Pos=33734 HFD=6.428524 Temperature=6.4 Focus Time=01:57 Filter=R`
//! and `GUIDING Stats - RMS Error (RA=0.664 - DEC=0.656)`. Pointing lines end
//! with a fixed-width angle followed by `[DMS]`.
use crate::extract::ExtractRecord;
use crate::matchers::Category;
use crate::writer::{self, OutputKind, WriteError};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Column headers of the metrics table and CSV file.
pub const METRICS_HEADERS: [&str; 9] = [
    "Time Stamp",
    "Filter",
    "HFD",
    "Temp",
    "Pos",
    "Time",
    "Ra",
    "Dec",
    "Pointing",
];

const POINTING_MARKER: &str = "[DMS]";
/// Width template of the pointing angle that precedes the marker.
const POINTING_TEMPLATE: &str = "00° 00' 00\"";

/// Errors decoding one metric extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    MissingField { field: &'static str },
    NotNumeric { field: &'static str, value: String },
    MarkerNotFound,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::MissingField { field } => write!(f, "missing {field} field"),
            DecodeError::NotNumeric { field, value } => {
                write!(f, "{field} value '{value}' is not numeric")
            }
            DecodeError::MarkerNotFound => {
                write!(f, "no pointing angle before {POINTING_MARKER} marker")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// One row of the metrics table. Only the fields of the source category are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogMetric {
    pub timestamp: String,
    pub focus_filter: String,
    pub focus_hfd: String,
    pub focus_temperature: String,
    pub focus_pos: String,
    pub focus_time: String,
    pub guiding_ra: String,
    pub guiding_dec: String,
    pub slew_pointing: String,
}

impl LogMetric {
    /// Decode an extract according to its category. Non-metric categories
    /// yield a row with only the timestamp set.
    pub fn decode(extract: &ExtractRecord) -> Result<Self, DecodeError> {
        let text = extract.display_text();
        let mut metric = LogMetric {
            timestamp: extract.timestamp().to_string(),
            ..Default::default()
        };

        match extract.category() {
            Category::MetricF => {
                let fields = key_values(text);
                metric.focus_filter = optional(&fields, "FILTER");
                metric.focus_hfd = two_decimals(&fields, "HFD")?;
                metric.focus_temperature = optional(&fields, "TEMPERATURE");
                metric.focus_pos = optional(&fields, "POS");
                metric.focus_time = optional(&fields, "TIME");
            }
            Category::MetricG => {
                let fields = key_values(text);
                metric.guiding_ra = two_decimals(&fields, "RA")?;
                metric.guiding_dec = two_decimals(&fields, "DEC")?;
            }
            Category::MetricP => {
                metric.slew_pointing = pointing_angle(text)?;
            }
            _ => {}
        }

        Ok(metric)
    }

    pub fn to_csv_line(&self) -> String {
        self.columns().join(",")
    }

    /// Values in [`METRICS_HEADERS`] order.
    pub fn columns(&self) -> [&str; 9] {
        [
            &self.timestamp,
            &self.focus_filter,
            &self.focus_hfd,
            &self.focus_temperature,
            &self.focus_pos,
            &self.focus_time,
            &self.guiding_ra,
            &self.guiding_dec,
            &self.slew_pointing,
        ]
    }
}

/// Decode every extract in order, skipping the ones that fail.
pub fn decode_all<'a, I>(extracts: I) -> Vec<LogMetric>
where
    I: IntoIterator<Item = &'a ExtractRecord>,
{
    extracts
        .into_iter()
        .filter_map(|extract| match LogMetric::decode(extract) {
            Ok(metric) => Some(metric),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    line = %extract.raw_line(),
                    "skipping undecodable metric"
                );
                None
            }
        })
        .collect()
}

/// Header line followed by one CSV line per metric.
pub fn csv_lines(metrics: &[LogMetric]) -> Vec<String> {
    std::iter::once(METRICS_HEADERS.join(","))
        .chain(metrics.iter().map(LogMetric::to_csv_line))
        .collect()
}

pub fn save_metrics(metrics: &[LogMetric], path: &Path) -> Result<(), WriteError> {
    writer::write_lines(path, &csv_lines(metrics), OutputKind::Metrics)?;
    tracing::info!(file = %path.display(), rows = metrics.len(), "saved metrics");
    Ok(())
}

/// Split `text` into upper-cased `KEY=value` pairs. Parentheses count as
/// whitespace. The first occurrence of a key wins.
fn key_values(text: &str) -> HashMap<String, String> {
    let spaced = text.replace(['(', ')'], " ");
    let mut map = HashMap::new();
    for token in spaced.split_whitespace().filter(|t| t.contains('=')) {
        let mut parts = token.split('=');
        let key = parts.next().unwrap_or_default().to_uppercase();
        let value = parts.next().unwrap_or_default().to_string();
        map.entry(key).or_insert(value);
    }
    map
}

fn optional(fields: &HashMap<String, String>, key: &str) -> String {
    fields.get(key).cloned().unwrap_or_default()
}

fn two_decimals(
    fields: &HashMap<String, String>,
    key: &'static str,
) -> Result<String, DecodeError> {
    let raw = fields
        .get(key)
        .ok_or(DecodeError::MissingField { field: key })?;
    let not_numeric = || DecodeError::NotNumeric {
        field: key,
        value: raw.clone(),
    };
    let value: f64 = raw.trim().parse().map_err(|_| not_numeric())?;
    if !value.is_finite() {
        return Err(not_numeric());
    }
    Ok(round_half_up(value))
}

/// Two decimal places, rounding half away from zero on the shortest decimal
/// form of `value` (so `0.475` gives `0.48`).
fn round_half_up(value: f64) -> String {
    let text = value.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(2))
        .map(|b| b - b'0')
        .collect();

    if frac_part.as_bytes().get(2).is_some_and(|&d| d >= b'5') {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, 1);
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let to_text = |ds: &[u8]| -> String { ds.iter().map(|d| char::from(b'0' + d)).collect() };
    let split = digits.len() - 2;
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{}.{}", to_text(&digits[..split]), to_text(&digits[split..]))
}

/// The fixed-width angle string immediately before the `[DMS]` marker.
fn pointing_angle(text: &str) -> Result<String, DecodeError> {
    let end_byte = text.find(POINTING_MARKER).ok_or(DecodeError::MarkerNotFound)?;
    let head: Vec<char> = text[..end_byte].chars().collect();
    let width = POINTING_TEMPLATE.chars().count();
    let start = head
        .len()
        .checked_sub(width)
        .ok_or(DecodeError::MarkerNotFound)?;
    Ok(head[start..].iter().collect())
}
