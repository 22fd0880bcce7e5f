//! Line-oriented output files: extracts, comments, metrics and the matcher catalog.
//!
//! Uses atomic write pattern: write to temp file then rename, so a failed
//! save never leaves a half-written file behind.
use std::path::{Path, PathBuf};

/// Which output a write belongs to; used in user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Extracts,
    Comments,
    Metrics,
    Matchers,
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputKind::Extracts => write!(f, "extracts"),
            OutputKind::Comments => write!(f, "comments"),
            OutputKind::Metrics => write!(f, "metrics"),
            OutputKind::Matchers => write!(f, "csv"),
        }
    }
}

/// A single output file that could not be written.
#[derive(Debug)]
pub struct WriteError {
    pub kind: OutputKind,
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl std::fmt::Display for WriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Error writing Voyager {} file: {}",
            self.kind,
            self.path.display()
        )
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Overwrite `path` with one line per item, each newline-terminated.
pub fn write_lines<S: AsRef<str>>(
    path: &Path,
    lines: &[S],
    kind: OutputKind,
) -> Result<(), WriteError> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
    }

    let err = |source| WriteError {
        kind,
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    std::fs::write(&tmp_path, content.as_bytes()).map_err(err)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err(e));
    }

    tracing::debug!(file = %path.display(), lines = lines.len(), %kind, "wrote output file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_newline_terminated_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.log");
        write_lines(&path, &["a", "b"], OutputKind::Extracts).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn overwrites_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.log");
        std::fs::write(&path, "old content\n").unwrap();

        write_lines(&path, &[String::from("new")], OutputKind::Comments).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn empty_list_writes_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.log");
        write_lines::<&str>(&path, &[], OutputKind::Extracts).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn missing_folder_reports_kind_and_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("2021_12_11_Voyager.metrics.csv");
        let err = write_lines(&path, &["x"], OutputKind::Metrics).unwrap_err();
        assert_eq!(err.kind, OutputKind::Metrics);
        assert_eq!(err.path, path);
        assert!(err
            .to_string()
            .starts_with("Error writing Voyager metrics file:"));
    }
}
