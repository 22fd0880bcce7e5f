//! Time-windowed reading of Voyager log, extracts and comments files.
//!
//! Only lines whose leading stamp falls strictly between start-date noon and
//! next-day noon survive. Files are read in the order given and their lines
//! concatenated; nothing is re-sorted.
use crate::timestamps;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// A file that could not be read. Non-fatal: the remaining files are still read.
#[derive(Debug)]
pub struct ReadWarning {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl std::fmt::Display for ReadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error reading Voyager log file: {}", self.path.display())
    }
}

impl std::error::Error for ReadWarning {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// In-window lines from every readable file, plus one warning per unreadable file.
#[derive(Debug, Default)]
pub struct SessionLines {
    pub lines: Vec<String>,
    pub warnings: Vec<ReadWarning>,
}

/// Read each file in turn, keeping the lines stamped inside the session window.
pub fn read_session_lines(paths: &[PathBuf], start_date: NaiveDate) -> SessionLines {
    let mut out = SessionLines::default();

    for path in paths {
        match read_window(path, start_date) {
            Ok(lines) => {
                tracing::debug!(
                    file = %path.display(),
                    kept = lines.len(),
                    "read session lines"
                );
                out.lines.extend(lines);
            }
            Err(e) => {
                tracing::warn!(error = %e, file = %path.display(), "failed to read log file");
                out.warnings.push(ReadWarning {
                    path: path.clone(),
                    source: e,
                });
            }
        }
    }

    out
}

/// Lines of a single file whose stamp lies inside the session window.
///
/// Bytes that are not valid UTF-8 are replaced rather than failing the file.
pub fn read_window(path: &Path, start_date: NaiveDate) -> std::io::Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text
        .lines()
        .filter(|line| is_in_window(line, start_date))
        .map(str::to_string)
        .collect())
}

fn is_in_window(line: &str, start_date: NaiveDate) -> bool {
    timestamps::parse_line_timestamp(line.trim())
        .is_some_and(|t| timestamps::in_session_window(t, start_date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 12, 11).unwrap()
    }

    #[test]
    fn keeps_only_in_window_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2021_12_11_Voyager.log");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Voyager log header").unwrap();
        writeln!(f, "2021/12/11 11:59:59 999 - before session").unwrap();
        writeln!(f, "2021/12/11 12:00:00 000 - exactly noon").unwrap();
        writeln!(f, "2021/12/11 12:00:00 001 - just after noon").unwrap();
        writeln!(f, "2021/12/11 18:17:03 723 - INFO  - [Sky] - Astronomical Night Start").unwrap();
        writeln!(f, "2021/12/11 18:17:04 bad - unparsable millis").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "2021/12/12 11:59:59 999 - last moment").unwrap();
        writeln!(f, "2021/12/12 12:00:00 000 - next noon").unwrap();
        drop(f);

        let lines = read_window(&path, start()).unwrap();
        assert_eq!(
            lines,
            vec![
                "2021/12/11 12:00:00 001 - just after noon",
                "2021/12/11 18:17:03 723 - INFO  - [Sky] - Astronomical Night Start",
                "2021/12/12 11:59:59 999 - last moment",
            ]
        );
    }

    #[test]
    fn concatenates_files_in_order() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("2021_12_11_Voyager.log");
        let second = dir.path().join("2021_12_12_Voyager.log");
        std::fs::write(
            &first,
            "2021/12/11 20:00:00 000 - a\r\n2021/12/11 21:00:00 000 - b\r\n",
        )
        .unwrap();
        std::fs::write(
            &second,
            "2021/12/12 01:00:00 000 - c\n2021/12/12 13:00:00 000 - out of window\n",
        )
        .unwrap();

        let out = read_session_lines(&[first, second], start());
        assert!(out.warnings.is_empty());
        assert_eq!(
            out.lines,
            vec![
                "2021/12/11 20:00:00 000 - a",
                "2021/12/11 21:00:00 000 - b",
                "2021/12/12 01:00:00 000 - c",
            ]
        );
    }

    #[test]
    fn second_file_without_window_lines_adds_nothing() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("2021_12_11_Voyager.log");
        let second = dir.path().join("2021_12_12_Voyager.log");
        std::fs::write(&first, "2021/12/11 20:00:00 000 - a\n").unwrap();
        std::fs::write(&second, "2021/12/12 18:00:00 000 - next session\n").unwrap();

        let both = read_session_lines(&[first.clone(), second], start());
        let alone = read_session_lines(&[first], start());
        assert_eq!(both.lines, alone.lines);
    }

    #[test]
    fn missing_file_is_warning_and_others_still_read() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("2021_12_10_Voyager.log");
        let present = dir.path().join("2021_12_11_Voyager.log");
        std::fs::write(&present, "2021/12/11 20:00:00 000 - kept\n").unwrap();

        let out = read_session_lines(&[missing.clone(), present], start());
        assert_eq!(out.lines, vec!["2021/12/11 20:00:00 000 - kept"]);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].path, missing);
        assert!(out.warnings[0]
            .to_string()
            .starts_with("Error reading Voyager log file:"));
    }

    #[test]
    fn invalid_utf8_does_not_fail_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2021_12_11_Voyager.log");
        let mut bytes = b"2021/12/11 20:00:00 000 - temp 5".to_vec();
        bytes.push(0xB0);
        bytes.extend_from_slice(b"C\n");
        std::fs::write(&path, bytes).unwrap();

        let lines = read_window(&path, start()).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("2021/12/11 20:00:00 000 - temp 5"));
    }
}
