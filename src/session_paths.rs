//! Derives every file path belonging to one observing session from a single
//! user-selected file.
//!
//! Voyager names its logs `yyyy_MM_dd_Voyager.log`. A session runs from noon
//! on the stamped date to noon the next day, so it can span the stamped log
//! and the next day's log. Extracts, comments and metrics for the session
//! live in a fixed extracts folder under the same date stamp.

use crate::timestamps;
use chrono::{Duration, Local, NaiveDate};
use std::path::{Path, PathBuf};

pub const LOG_FILE_STUB: &str = "_Voyager.log";
pub const EXTRACTS_FILE_STUB: &str = "_Voyager.extracts.log";
pub const COMMENTS_FILE_STUB: &str = "_Voyager.comments.log";
pub const METRICS_FILE_STUB: &str = "_Voyager.metrics.csv";

/// A path plus what was observed on disk when it was last set.
///
/// `base_name` is empty unless the file exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAttributes {
    path: Option<PathBuf>,
    exists: bool,
    base_name: String,
}

impl FileAttributes {
    /// Replace the path and re-check the file on disk.
    pub fn update_path(&mut self, path: Option<PathBuf>) {
        self.exists = path.as_deref().is_some_and(Path::exists);
        self.base_name = match (&path, self.exists) {
            (Some(p), true) => p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            _ => String::new(),
        };
        self.path = path;
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }
}

/// Errors produced while resolving session paths.
#[derive(Debug)]
pub enum PathError {
    /// The selected file's name does not start with a `yyyy_MM_dd` stamp.
    InvalidDatePrefix { file: String },
    /// The extracts folder could not be created.
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::InvalidDatePrefix { file } => {
                write!(f, "Log file has invalid Voyager date format: {file}")
            }
            PathError::CreateDir { path, source } => {
                write!(
                    f,
                    "failed to create extracts folder {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for PathError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PathError::InvalidDatePrefix { .. } => None,
            PathError::CreateDir { source, .. } => Some(source),
        }
    }
}

/// The full set of paths for the session currently open.
///
/// Replaced wholesale by [`SessionPaths::update_log_paths`] or
/// [`SessionPaths::update_extracts_paths`]; a failed update leaves it untouched.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    extracts_dir: PathBuf,
    start_file: FileAttributes,
    end_file: FileAttributes,
    extracts_file: FileAttributes,
    comments_file: FileAttributes,
    metrics_file: FileAttributes,
    log_paths: Vec<PathBuf>,
    start_date: NaiveDate,
    label: String,
}

impl SessionPaths {
    /// Create an empty path set rooted at `extracts_dir`, creating the folder
    /// if it does not exist yet.
    pub fn new(extracts_dir: impl Into<PathBuf>) -> Result<Self, PathError> {
        let extracts_dir = extracts_dir.into();
        if !extracts_dir.exists() {
            std::fs::create_dir_all(&extracts_dir).map_err(|e| PathError::CreateDir {
                path: extracts_dir.clone(),
                source: e,
            })?;
            tracing::info!(path = %extracts_dir.display(), "created log extracts folder");
        }

        Ok(Self {
            extracts_dir,
            start_file: FileAttributes::default(),
            end_file: FileAttributes::default(),
            extracts_file: FileAttributes::default(),
            comments_file: FileAttributes::default(),
            metrics_file: FileAttributes::default(),
            log_paths: Vec::new(),
            start_date: Local::now().date_naive(),
            label: String::new(),
        })
    }

    /// Resolve a session from a Voyager log file such as
    /// `2021_12_04_VoyagerAdvanced.log`.
    ///
    /// The start file becomes `<date>_Voyager.log` in the selected folder and
    /// the end file the next day's log beside it. Input files are the start
    /// file plus the end file when it exists. The comments path is cleared.
    ///
    /// Returns `Ok(false)` when `dialog_file` is empty (selection cancelled).
    pub fn update_log_paths(&mut self, dialog_file: &str) -> Result<bool, PathError> {
        let Some((selected, date)) = parse_dialog_file(dialog_file)? else {
            return Ok(false);
        };
        let folder = parent_folder(&selected);

        self.start_date = date;
        self.start_file
            .update_path(Some(stamped_path(&folder, date, LOG_FILE_STUB)));
        self.end_file.update_path(Some(stamped_path(
            &folder,
            date + Duration::days(1),
            LOG_FILE_STUB,
        )));
        self.extracts_file
            .update_path(Some(stamped_path(&self.extracts_dir, date, EXTRACTS_FILE_STUB)));
        self.metrics_file
            .update_path(Some(stamped_path(&self.extracts_dir, date, METRICS_FILE_STUB)));
        self.comments_file.update_path(None);

        self.log_paths.clear();
        self.log_paths.extend(self.start_file.path().map(Path::to_path_buf));
        if self.end_file.exists() {
            self.log_paths.extend(self.end_file.path().map(Path::to_path_buf));
        }

        self.label = if self.end_file.base_name().is_empty() {
            self.start_file.base_name().to_string()
        } else {
            format!(
                "{} + {}",
                self.start_file.base_name(),
                self.end_file.base_name()
            )
        };

        tracing::debug!(
            start_date = %self.start_date,
            inputs = self.log_paths.len(),
            "resolved log session paths"
        );
        Ok(true)
    }

    /// Resolve a session from a saved extracts file such as
    /// `2021_12_04_Voyager.extracts.log`.
    ///
    /// Comments and metrics paths sit beside the extracts file. Input files
    /// are the comments file, if it exists, followed by the extracts file.
    /// Start and end log paths are cleared.
    ///
    /// Returns `Ok(false)` when `dialog_file` is empty (selection cancelled).
    pub fn update_extracts_paths(&mut self, dialog_file: &str) -> Result<bool, PathError> {
        let Some((selected, date)) = parse_dialog_file(dialog_file)? else {
            return Ok(false);
        };
        let folder = parent_folder(&selected);

        self.start_date = date;
        self.start_file.update_path(None);
        self.end_file.update_path(None);
        self.extracts_file
            .update_path(Some(stamped_path(&folder, date, EXTRACTS_FILE_STUB)));
        self.comments_file
            .update_path(Some(stamped_path(&folder, date, COMMENTS_FILE_STUB)));
        self.metrics_file
            .update_path(Some(stamped_path(&folder, date, METRICS_FILE_STUB)));

        self.log_paths.clear();
        if self.comments_file.exists() {
            self.log_paths
                .extend(self.comments_file.path().map(Path::to_path_buf));
        }
        self.log_paths
            .extend(self.extracts_file.path().map(Path::to_path_buf));

        self.label = self.extracts_file.base_name().to_string();

        tracing::debug!(
            start_date = %self.start_date,
            inputs = self.log_paths.len(),
            "resolved extracts session paths"
        );
        Ok(true)
    }

    /// Date component of the session stamp; the session starts at noon.
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Ordered input files for the time-windowed reader.
    pub fn log_paths(&self) -> &[PathBuf] {
        &self.log_paths
    }

    /// Names of the files in play, e.g. `a_Voyager.log + b_Voyager.log`.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn extracts_dir(&self) -> &Path {
        &self.extracts_dir
    }

    pub fn start_file(&self) -> &FileAttributes {
        &self.start_file
    }

    pub fn end_file(&self) -> &FileAttributes {
        &self.end_file
    }

    pub fn extracts_file(&self) -> &FileAttributes {
        &self.extracts_file
    }

    pub fn comments_file(&self) -> &FileAttributes {
        &self.comments_file
    }

    pub fn metrics_file(&self) -> &FileAttributes {
        &self.metrics_file
    }
}

fn parse_dialog_file(dialog_file: &str) -> Result<Option<(PathBuf, NaiveDate)>, PathError> {
    let trimmed = dialog_file.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let path = PathBuf::from(trimmed);
    match timestamps::file_date(&path) {
        Some(date) => Ok(Some((path, date))),
        None => {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| trimmed.to_string());
            tracing::warn!(file = %file, "selected file has no valid date prefix");
            Err(PathError::InvalidDatePrefix { file })
        }
    }
}

fn parent_folder(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn stamped_path(folder: &Path, date: NaiveDate, stub: &str) -> PathBuf {
    folder.join(format!("{}{stub}", timestamps::file_date_prefix(date)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_creates_extracts_folder() {
        let dir = tempdir().unwrap();
        let extracts = dir.path().join("log").join("extracts");
        assert!(!extracts.exists());

        let paths = SessionPaths::new(&extracts).unwrap();
        assert!(extracts.is_dir());
        assert_eq!(paths.extracts_dir(), extracts.as_path());
        assert!(paths.log_paths().is_empty());

        // Second construction with the folder already present is fine
        SessionPaths::new(&extracts).unwrap();
    }

    #[test]
    fn log_flow_without_next_day_file() {
        let dir = tempdir().unwrap();
        let logs = dir.path();
        let start = logs.join("2021_12_11_Voyager.log");
        std::fs::write(&start, "").unwrap();

        let mut paths = SessionPaths::new(logs.join("extracts")).unwrap();
        assert!(paths.update_log_paths(start.to_str().unwrap()).unwrap());

        assert_eq!(paths.start_date(), date(2021, 12, 11));
        assert_eq!(paths.start_file().path(), Some(start.as_path()));
        assert!(paths.start_file().exists());
        assert_eq!(
            paths.end_file().path(),
            Some(logs.join("2021_12_12_Voyager.log").as_path())
        );
        assert!(!paths.end_file().exists());
        assert_eq!(paths.end_file().base_name(), "");
        assert_eq!(
            paths.extracts_file().path(),
            Some(
                logs.join("extracts")
                    .join("2021_12_11_Voyager.extracts.log")
                    .as_path()
            )
        );
        assert_eq!(
            paths.metrics_file().path(),
            Some(
                logs.join("extracts")
                    .join("2021_12_11_Voyager.metrics.csv")
                    .as_path()
            )
        );
        assert!(paths.comments_file().path().is_none());
        assert_eq!(paths.log_paths(), &[start]);
        assert_eq!(paths.label(), "2021_12_11_Voyager.log");
    }

    #[test]
    fn log_flow_appends_existing_next_day_file() {
        let dir = tempdir().unwrap();
        let logs = dir.path();
        let start = logs.join("2021_12_31_Voyager.log");
        let end = logs.join("2022_01_01_Voyager.log");
        std::fs::write(&start, "").unwrap();
        std::fs::write(&end, "").unwrap();

        let mut paths = SessionPaths::new(logs.join("extracts")).unwrap();
        assert!(paths.update_log_paths(start.to_str().unwrap()).unwrap());

        assert_eq!(paths.log_paths(), &[start, end]);
        assert_eq!(
            paths.label(),
            "2021_12_31_Voyager.log + 2022_01_01_Voyager.log"
        );
    }

    #[test]
    fn log_flow_normalises_selected_suffix() {
        let dir = tempdir().unwrap();
        let logs = dir.path();
        let selected = logs.join("2021_12_04_VoyagerAdvanced.log");

        let mut paths = SessionPaths::new(logs.join("extracts")).unwrap();
        assert!(paths.update_log_paths(selected.to_str().unwrap()).unwrap());
        assert_eq!(
            paths.start_file().path(),
            Some(logs.join("2021_12_04_Voyager.log").as_path())
        );
    }

    #[test]
    fn cancelled_selection_is_noop() {
        let dir = tempdir().unwrap();
        let mut paths = SessionPaths::new(dir.path().join("extracts")).unwrap();
        let before = paths.start_date();

        assert!(!paths.update_log_paths("").unwrap());
        assert!(!paths.update_extracts_paths("   ").unwrap());
        assert_eq!(paths.start_date(), before);
        assert!(paths.log_paths().is_empty());
    }

    #[test]
    fn invalid_prefix_leaves_state_untouched() {
        let dir = tempdir().unwrap();
        let logs = dir.path();
        let good = logs.join("2021_12_11_Voyager.log");
        std::fs::write(&good, "").unwrap();

        let mut paths = SessionPaths::new(logs.join("extracts")).unwrap();
        paths.update_log_paths(good.to_str().unwrap()).unwrap();

        let bad = logs.join("Voyager_2021.log");
        let err = paths.update_log_paths(bad.to_str().unwrap()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Log file has invalid Voyager date format: Voyager_2021.log"
        );
        assert_eq!(paths.start_date(), date(2021, 12, 11));
        assert_eq!(paths.log_paths(), &[good]);
    }

    #[test]
    fn extracts_flow_with_and_without_comments() {
        let dir = tempdir().unwrap();
        let extracts_dir = dir.path().join("extracts");
        let mut paths = SessionPaths::new(&extracts_dir).unwrap();

        let extracts = extracts_dir.join("2021_12_11_Voyager.extracts.log");
        let comments = extracts_dir.join("2021_12_11_Voyager.comments.log");
        std::fs::write(&extracts, "").unwrap();

        assert!(paths
            .update_extracts_paths(extracts.to_str().unwrap())
            .unwrap());
        assert_eq!(paths.log_paths(), &[extracts.clone()]);
        assert_eq!(paths.comments_file().path(), Some(comments.as_path()));
        assert!(!paths.comments_file().exists());
        assert_eq!(
            paths.metrics_file().path(),
            Some(extracts_dir.join("2021_12_11_Voyager.metrics.csv").as_path())
        );
        assert_eq!(paths.label(), "2021_12_11_Voyager.extracts.log");

        std::fs::write(&comments, "").unwrap();
        paths
            .update_extracts_paths(extracts.to_str().unwrap())
            .unwrap();
        assert_eq!(paths.log_paths(), &[comments, extracts]);
    }

    #[test]
    fn extracts_flow_replaces_previous_log_session() {
        let dir = tempdir().unwrap();
        let logs = dir.path();
        let start = logs.join("2021_12_11_Voyager.log");
        std::fs::write(&start, "").unwrap();
        std::fs::write(logs.join("2021_12_12_Voyager.log"), "").unwrap();

        let mut paths = SessionPaths::new(logs.join("extracts")).unwrap();
        paths.update_log_paths(start.to_str().unwrap()).unwrap();
        assert!(paths.end_file().exists());

        let extracts = logs.join("extracts").join("2022_03_01_Voyager.extracts.log");
        std::fs::write(&extracts, "").unwrap();
        paths
            .update_extracts_paths(extracts.to_str().unwrap())
            .unwrap();

        assert_eq!(paths.start_date(), date(2022, 3, 1));
        assert!(paths.start_file().path().is_none());
        assert!(paths.end_file().path().is_none());
        assert!(!paths.end_file().exists());
        assert_eq!(paths.start_file().base_name(), "");
        assert_eq!(paths.log_paths(), &[extracts]);
    }

    #[test]
    fn file_attributes_track_disk_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.log");

        let mut attrs = FileAttributes::default();
        attrs.update_path(Some(path.clone()));
        assert!(!attrs.exists());
        assert_eq!(attrs.base_name(), "");

        std::fs::write(&path, "x").unwrap();
        attrs.update_path(Some(path.clone()));
        assert!(attrs.exists());
        assert_eq!(attrs.base_name(), "a.log");

        attrs.update_path(None);
        assert!(attrs.path().is_none());
        assert!(!attrs.exists());
        assert_eq!(attrs.base_name(), "");
    }
}
