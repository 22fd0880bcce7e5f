//! Voyager timestamp formats: the `yyyy_MM_dd` file prefix, the leading
//! `yyyy/MM/dd HH:mm:ss <millis>` stamp on every log line, and the short
//! `HH:mm:ss.SSS =>` stamp shown against each extract.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::path::Path;

/// Session start and end hour.
const NOON_HOUR: i64 = 12;

pub const FILE_DATE_FORMAT: &str = "%Y_%m_%d";
/// Character length of a `yyyy_MM_dd` prefix.
pub const FILE_DATE_LEN: usize = 10;

pub const LOG_LINE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
pub const DISPLAY_FORMAT: &str = "%H:%M:%S%.3f";

/// Marker appended to every display timestamp.
pub const POINTER: &str = " =>";

/// Noon on the session start date.
pub fn session_noon(start_date: NaiveDate) -> NaiveDateTime {
    start_date.and_time(NaiveTime::MIN) + Duration::hours(NOON_HOUR)
}

/// True if `t` lies strictly inside the 24 hours following start-date noon.
pub fn in_session_window(t: NaiveDateTime, start_date: NaiveDate) -> bool {
    let start = session_noon(start_date);
    t > start && t < start + Duration::days(1)
}

/// Parse the leading `date time millis` tokens of a log line.
///
/// Returns `None` for anything that does not carry a complete stamp: fewer
/// than three tokens, a bad date or time, or a non-numeric third token.
pub fn parse_line_timestamp(line: &str) -> Option<NaiveDateTime> {
    let mut tokens = line.split_whitespace();
    let date = tokens.next()?;
    let time = tokens.next()?;
    let millis: f64 = tokens.next()?.parse().ok()?;
    if !millis.is_finite() {
        return None;
    }

    let base = NaiveDateTime::parse_from_str(&format!("{date} {time}"), LOG_LINE_FORMAT).ok()?;
    base.checked_add_signed(Duration::nanoseconds((millis * 1e6) as i64))
}

/// Format a stamp the way Voyager writes it at the start of a log line,
/// without the millisecond token.
pub fn log_line_stamp(t: NaiveDateTime) -> String {
    t.format(LOG_LINE_FORMAT).to_string()
}

/// Short stamp shown in the extracts table, e.g. `18:17:03.723 =>`.
pub fn display_stamp(t: NaiveDateTime) -> String {
    format!("{}{POINTER}", t.format(DISPLAY_FORMAT))
}

/// Inverse of [`display_stamp`], returning the time of day.
pub fn parse_display_stamp(stamp: &str) -> Option<NaiveTime> {
    let bare = stamp.replace(POINTER, "");
    NaiveTime::parse_from_str(bare.trim(), DISPLAY_FORMAT).ok()
}

/// Date embedded in the first ten characters of a file's base name.
pub fn file_date(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let prefix: String = name.chars().take(FILE_DATE_LEN).collect();
    if prefix.chars().count() < FILE_DATE_LEN {
        return None;
    }
    NaiveDate::parse_from_str(&prefix, FILE_DATE_FORMAT).ok()
}

/// `yyyy_MM_dd` prefix for a date.
pub fn file_date_prefix(date: NaiveDate) -> String {
    date.format(FILE_DATE_FORMAT).to_string()
}
