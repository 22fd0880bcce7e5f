//! Session state behind the command line: one open session, the matcher
//! catalog and its extracts, plus the `handle_*` entry points per subcommand.
use crate::config::ViewerConfig;
use crate::extract::ExtractRecord;
use crate::extractor::Extractor;
use crate::matchers::{Category, MatcherCatalog};
use crate::metrics::{self, LogMetric, METRICS_HEADERS};
use crate::reader::ReadWarning;
use crate::session_paths::{PathError, SessionPaths, EXTRACTS_FILE_STUB, LOG_FILE_STUB};
use crate::timestamps;
use crate::writer::WriteError;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::path::{Path, PathBuf};

const ANSI_RESET: &str = "\x1b[0m";

/// How a session is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// A primary Voyager log; the next day's log is picked up if present.
    Log,
    /// A previously saved extracts file plus its comments file.
    Extracts,
}

/// Bulk enablement presets for the matcher catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Selection {
    All,
    None,
    Warnings,
    Metrics,
}

pub struct Viewer {
    paths: SessionPaths,
    catalog: MatcherCatalog,
    catalog_file: PathBuf,
    extractor: Extractor,
}

impl Viewer {
    /// Load the catalog and prepare the extracts folder. A missing catalog is fatal.
    pub fn open(config: &ViewerConfig) -> Result<Self, String> {
        let catalog_file = config.paths.matchers_file.clone();
        let catalog = MatcherCatalog::load(&catalog_file).map_err(|e| {
            tracing::error!(file = %catalog_file.display(), "matcher catalog unavailable");
            e.to_string()
        })?;
        Self::with_catalog(config, catalog, catalog_file)
    }

    pub fn with_catalog(
        config: &ViewerConfig,
        catalog: MatcherCatalog,
        catalog_file: PathBuf,
    ) -> Result<Self, String> {
        let paths = SessionPaths::new(config.extracts_dir()).map_err(|e| e.to_string())?;
        Ok(Self {
            paths,
            catalog,
            catalog_file,
            extractor: Extractor::new(),
        })
    }

    /// Resolve the session for `file` and compile its extracts.
    ///
    /// Returns `Ok(None)` when `file` is blank and nothing changed, otherwise
    /// the files that could not be read.
    pub fn import(
        &mut self,
        source: SessionSource,
        file: &str,
    ) -> Result<Option<Vec<ReadWarning>>, PathError> {
        let updated = match source {
            SessionSource::Log => self.paths.update_log_paths(file)?,
            SessionSource::Extracts => self.paths.update_extracts_paths(file)?,
        };
        if !updated {
            return Ok(None);
        }

        Ok(Some(
            self.extractor
                .compile_from_files(&self.paths, &self.catalog),
        ))
    }

    pub fn add_comment(&mut self, text: &str) -> bool {
        self.extractor
            .add_user_comment(text, self.paths.start_date(), &self.catalog)
    }

    pub fn save_extracts(&self) -> Vec<WriteError> {
        self.extractor.save(&self.paths, &self.catalog)
    }

    /// Decoded metric view; undecodable records are skipped.
    pub fn metrics(&self) -> Vec<LogMetric> {
        metrics::decode_all(self.extractor.metric_view(&self.catalog))
    }

    /// Write the metrics CSV for the open session and return its path.
    pub fn save_metrics(&self, metrics: &[LogMetric]) -> Result<PathBuf, String> {
        let path = self
            .paths
            .metrics_file()
            .path()
            .ok_or_else(|| "No session open; nothing to save.".to_string())?;
        metrics::save_metrics(metrics, path).map_err(|e| e.to_string())?;
        Ok(path.to_path_buf())
    }

    pub fn select(&mut self, selection: Selection) {
        match selection {
            Selection::All => self.catalog.select_all(),
            Selection::None => self.catalog.deselect_all(),
            Selection::Warnings => self.catalog.select_warnings(),
            Selection::Metrics => self.catalog.select_metrics(),
        }
    }

    /// Set the enabled flag of the `n`th persisted rule (1-based).
    pub fn toggle(&mut self, n: usize, enabled: bool) -> Result<(), String> {
        let index = self
            .catalog
            .persisted_index(n)
            .ok_or_else(|| format!("No matcher at position {n}"))?;
        self.catalog.set_enabled(index, enabled);
        Ok(())
    }

    pub fn save_catalog(&self) -> Result<(), String> {
        self.catalog
            .save(&self.catalog_file)
            .map_err(|e| e.to_string())
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    pub fn catalog(&self) -> &MatcherCatalog {
        &self.catalog
    }

    pub fn table(&self) -> Vec<&ExtractRecord> {
        self.extractor.table_view(&self.catalog)
    }

    /// Every compiled record, including those of disabled rules.
    pub fn total_extracts(&self) -> usize {
        self.extractor.all().len()
    }

    pub fn report(&self) -> SessionReport<'_> {
        let end_file = self.paths.end_file();
        SessionReport {
            label: self.paths.label(),
            start_date: self.paths.start_date(),
            start_file: self.paths.start_file().path(),
            end_file: end_file.path().filter(|_| end_file.exists()),
            extracts_file: self.paths.extracts_file().path(),
            comments_file: self.paths.comments_file().path(),
            extracts_dir: self.paths.extracts_dir(),
            total: self.total_extracts(),
            records: self.table(),
        }
    }
}

/// JSON view of an open session.
#[derive(Debug, Serialize)]
pub struct SessionReport<'a> {
    pub label: &'a str,
    pub start_date: NaiveDate,
    pub start_file: Option<&'a Path>,
    pub end_file: Option<&'a Path>,
    pub extracts_file: Option<&'a Path>,
    pub comments_file: Option<&'a Path>,
    pub extracts_dir: &'a Path,
    pub total: usize,
    pub records: Vec<&'a ExtractRecord>,
}

/// e.g. `3 of 5 extracts shown, 18:17:03 to 06:12:00.`
fn summary(shown: &[&ExtractRecord], total: usize) -> String {
    let times: Vec<NaiveTime> = shown
        .iter()
        .filter(|r| !r.is_comment())
        .filter_map(|r| timestamps::parse_display_stamp(r.timestamp()))
        .collect();
    match (times.first(), times.last()) {
        (Some(first), Some(last)) => format!(
            "{} of {total} extracts shown, {} to {}.",
            shown.len(),
            first.format("%H:%M:%S"),
            last.format("%H:%M:%S")
        ),
        _ => format!("{} of {total} extracts shown.", shown.len()),
    }
}

fn paint(text: &str, category: Category, color: bool) -> String {
    if color {
        format!("{}{text}{ANSI_RESET}", category.color().ansi())
    } else {
        text.to_string()
    }
}

/// One row per record: timestamp, category and display text.
pub fn render_extracts(records: &[&ExtractRecord], color: bool) -> Vec<String> {
    records
        .iter()
        .map(|r| {
            let row = format!("{} {:<10} {}", r.timestamp(), r.category(), r.display_text());
            paint(&row, r.category(), color)
        })
        .collect()
}

pub fn render_metrics(metrics: &[LogMetric]) -> Vec<String> {
    let widths = [16, 6, 6, 6, 7, 6, 6, 6, 11];
    let row = |cells: [&str; 9]| -> String {
        cells
            .iter()
            .zip(widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join(" ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![row(METRICS_HEADERS)];
    lines.push("-".repeat(widths.iter().sum::<usize>() + widths.len() - 1));
    lines.extend(metrics.iter().map(|m| row(m.columns())));
    lines
}

pub fn render_catalog(catalog: &MatcherCatalog, color: bool) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<4} {:<3} {:<10} {:<40} PRESET",
        "#", "ON", "TYPE", "MATCH"
    )];
    lines.push("-".repeat(90));
    for (n, rule) in catalog.persisted_rules().enumerate() {
        let on = if rule.enabled { "x" } else { "" };
        let row = format!(
            "{:<4} {:<3} {:<10} {:<40} {}",
            n + 1,
            on,
            rule.category,
            rule.match_text,
            rule.preset_text
        );
        lines.push(paint(&row, rule.category, color));
    }
    lines
}

/// Options shared by `extract` and `reopen`.
#[derive(Debug, Default)]
pub struct SessionOptions<'a> {
    pub comments: &'a [String],
    pub save: bool,
    pub json: bool,
}

fn open_session(
    config: &ViewerConfig,
    source: SessionSource,
    file: &Path,
) -> Result<Viewer, String> {
    let mut viewer = Viewer::open(config)?;
    let warnings = viewer
        .import(source, &file.to_string_lossy())
        .map_err(|e| e.to_string())?;
    for w in warnings.unwrap_or_default() {
        eprintln!("Warning: {w}");
    }
    Ok(viewer)
}

/// Handle `voyager-extract extract` and `voyager-extract reopen`.
pub fn handle_session(
    config: &ViewerConfig,
    source: SessionSource,
    file: &Path,
    opts: &SessionOptions,
) -> Result<(), String> {
    let mut viewer = open_session(config, source, file)?;

    for text in opts.comments {
        if !viewer.add_comment(text) {
            eprintln!("Warning: ignoring empty comment.");
        }
    }

    let table = viewer.table();
    if opts.json {
        let json = serde_json::to_string_pretty(&viewer.report())
            .map_err(|e| format!("Failed to serialize extracts: {e}"))?;
        println!("{json}");
    } else {
        println!("Session: {}", viewer.paths().label());
        println!("{}", "-".repeat(90));
        for line in render_extracts(&table, config.output.color) {
            println!("{line}");
        }
        println!("{}", summary(&table, viewer.total_extracts()));
    }

    if opts.save {
        let errors = viewer.save_extracts();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(messages.join("\n"));
        }
        if let Some(path) = viewer.paths().extracts_file().path() {
            eprintln!("Saved extracts to {}.", path.display());
        }
    }

    Ok(())
}

/// Handle `voyager-extract metrics`.
pub fn handle_metrics(
    config: &ViewerConfig,
    source: SessionSource,
    file: &Path,
    save: bool,
) -> Result<(), String> {
    let viewer = open_session(config, source, file)?;
    let metrics = viewer.metrics();

    if metrics.is_empty() {
        println!("No metrics found in {}.", viewer.paths().label());
    } else {
        for line in render_metrics(&metrics) {
            println!("{line}");
        }
    }

    if save {
        let path = viewer.save_metrics(&metrics)?;
        println!("Saved {} metrics to {}.", metrics.len(), path.display());
    }
    Ok(())
}

/// Handle `voyager-extract matchers list`.
pub fn handle_matchers_list(config: &ViewerConfig) -> Result<(), String> {
    let catalog = MatcherCatalog::load(&config.paths.matchers_file).map_err(|e| e.to_string())?;
    for line in render_catalog(&catalog, config.output.color) {
        println!("{line}");
    }
    Ok(())
}

/// Handle `voyager-extract matchers select`.
pub fn handle_matchers_select(config: &ViewerConfig, selection: Selection) -> Result<(), String> {
    let mut viewer = Viewer::open(config)?;
    viewer.select(selection);
    viewer.save_catalog()?;
    let enabled = viewer
        .catalog()
        .persisted_rules()
        .filter(|r| r.enabled)
        .count();
    println!(
        "Saved {} ({enabled} matchers enabled).",
        config.paths.matchers_file.display()
    );
    Ok(())
}

/// Handle `voyager-extract matchers toggle`.
pub fn handle_matchers_toggle(config: &ViewerConfig, n: usize, enabled: bool) -> Result<(), String> {
    let mut viewer = Viewer::open(config)?;
    viewer.toggle(n, enabled)?;
    viewer.save_catalog()?;
    let state = if enabled { "enabled" } else { "disabled" };
    println!("Matcher {n} {state}.");
    Ok(())
}

/// Files in `dir` whose names end with `stub`, sorted by name.
pub fn find_session_files(dir: &Path, stub: &str) -> Result<Vec<PathBuf>, String> {
    let pattern = format!(
        "{}/*{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(stub)
    );
    let entries =
        glob::glob(&pattern).map_err(|e| format!("Invalid search pattern {pattern}: {e}"))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Handle `voyager-extract sessions`.
pub fn handle_sessions(config: &ViewerConfig) -> Result<(), String> {
    let sections = [
        ("Logs", config.paths.logs_dir.clone(), LOG_FILE_STUB),
        ("Extracts", config.extracts_dir(), EXTRACTS_FILE_STUB),
    ];
    for (title, dir, stub) in sections {
        let files = find_session_files(&dir, stub)?;
        println!("{title} ({}):", dir.display());
        if files.is_empty() {
            println!("  (none)");
        }
        for f in files {
            let name = f.file_name().map(|n| n.to_string_lossy().to_string());
            println!("  {}", name.unwrap_or_default());
        }
    }
    Ok(())
}
