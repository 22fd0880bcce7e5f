//! Matcher catalog: the user-editable, ordered list of substring rules that
//! decides which Voyager log lines become extracts.
//!
//! The catalog is stored as `VoyagerLogViewer.csv`: one header line, then
//! `flag,matchText,presetText,category` per rule. Embedded commas are not
//! escaped. Order matters: a line is classified by the first rule that
//! matches it, so users put specific rules ahead of general ones.
use crate::writer::{self, OutputKind, WriteError};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const CSV_DELIMITER: char = ',';
pub const CSV_HEADER: &str = "Select, Match Message, Preset Message, Type";
const NFIELDS: usize = 4;

/// Marks the start of the message text in a Voyager log line.
pub const LOG_DELIMITER: &str = "] -";
/// Separates the leading stamp from the message in a log line.
const STAMP_SEPARATOR: &str = " - ";

/// Match text of the synthetic rule that catches user comments.
pub const COMMENT_MATCH_TEXT: &str = "User Comment";

/// Where the catalog file can be downloaded if it is missing.
const CATALOG_SOURCE_URL: &str = "https://github.com/richardflee/logviewer_for_voyager";

/// Display color bound to each category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    LightGray,
    Green,
    Pink,
    Yellow,
    Orange,
    Red,
    White,
    Cyan,
}

impl Color {
    /// ANSI foreground escape for terminal tables.
    pub fn ansi(self) -> &'static str {
        match self {
            Color::LightGray => "\x1b[38;5;250m",
            Color::Green => "\x1b[32m",
            Color::Pink => "\x1b[38;5;218m",
            Color::Yellow => "\x1b[33m",
            Color::Orange => "\x1b[38;5;208m",
            Color::Red => "\x1b[31m",
            Color::White => "\x1b[97m",
            Color::Cyan => "\x1b[36m",
        }
    }
}

/// Message category of a rule, and of every extract it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Timestamp,
    Info,
    Event,
    Warning,
    Emergency,
    Critical,
    Highlight,
    Comment,
    /// Focus run result.
    MetricF,
    /// Guiding RMS statistics.
    MetricG,
    /// Residual pointing error after a precise slew.
    MetricP,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Timestamp,
        Category::Info,
        Category::Event,
        Category::Warning,
        Category::Emergency,
        Category::Critical,
        Category::Highlight,
        Category::Comment,
        Category::MetricF,
        Category::MetricG,
        Category::MetricP,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Timestamp => "TIMESTAMP",
            Category::Info => "INFO",
            Category::Event => "EVENT",
            Category::Warning => "WARNING",
            Category::Emergency => "EMERGENCY",
            Category::Critical => "CRITICAL",
            Category::Highlight => "HIGHLIGHT",
            Category::Comment => "COMMENT",
            Category::MetricF => "METRIC_F",
            Category::MetricG => "METRIC_G",
            Category::MetricP => "METRIC_P",
        }
    }

    /// Parse a category name, ignoring case. Unknown names fall back to `INFO`.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        match Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(text))
        {
            Some(c) => c,
            None => {
                tracing::debug!(category = %text, "unknown matcher category, using INFO");
                Category::Info
            }
        }
    }

    pub fn color(self) -> Color {
        match self {
            Category::Timestamp | Category::Comment => Color::LightGray,
            Category::Info => Color::Green,
            Category::Event => Color::Pink,
            Category::Warning => Color::Yellow,
            Category::Emergency => Color::Orange,
            Category::Critical => Color::Red,
            Category::Highlight => Color::White,
            Category::MetricF | Category::MetricG | Category::MetricP => Color::Cyan,
        }
    }

    pub fn is_warning(self) -> bool {
        matches!(
            self,
            Category::Warning | Category::Emergency | Category::Critical
        )
    }

    pub fn is_metric(self) -> bool {
        matches!(
            self,
            Category::MetricF | Category::MetricG | Category::MetricP
        )
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One catalog rule. Only `enabled` changes after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRule {
    pub enabled: bool,
    pub match_text: String,
    pub preset_text: String,
    pub category: Category,
}

impl MatchRule {
    pub fn new(
        enabled: bool,
        match_text: impl Into<String>,
        preset_text: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            enabled,
            match_text: match_text.into(),
            preset_text: preset_text.into(),
            category,
        }
    }

    /// The always-enabled rule that classifies user comment lines.
    pub fn comment_rule() -> Self {
        Self::new(true, COMMENT_MATCH_TEXT, "", Category::Comment)
    }

    /// Parse `flag,matchText,presetText,category`. A flag of `0` disables the
    /// rule; anything else enables it. Returns `None` for short lines.
    pub fn from_csv_line(line: &str) -> Option<Self> {
        let mut fields: Vec<&str> = line.split(CSV_DELIMITER).collect();
        // Trailing empty fields do not count towards the minimum
        while fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        if fields.len() < NFIELDS {
            return None;
        }

        Some(Self {
            enabled: fields[0].trim() != "0",
            match_text: fields[1].trim().to_string(),
            preset_text: fields[2].trim().to_string(),
            category: Category::from_text(fields[3]),
        })
    }

    pub fn to_csv_line(&self) -> String {
        let flag = if self.enabled { "1" } else { "0" };
        [
            flag,
            self.match_text.trim(),
            self.preset_text.trim(),
            self.category.as_str(),
        ]
        .join(",")
    }

    /// Case-insensitive substring test against a full log line.
    pub fn matches(&self, line: &str) -> bool {
        line.to_lowercase()
            .contains(&self.match_text.to_lowercase())
    }

    /// Text to show for a matched line: the preset text if set, otherwise the
    /// last segment of the line after the `] -` delimiter. A line without the
    /// delimiter shows the message after its leading stamp.
    pub fn display_text(&self, line: &str) -> String {
        if !self.preset_text.trim().is_empty() {
            return self.preset_text.clone();
        }
        let mut segments: Vec<&str> = line.split(LOG_DELIMITER).collect();
        while segments.last().is_some_and(|s| s.is_empty()) {
            segments.pop();
        }
        match segments.as_slice() {
            [] => String::new(),
            [only] => only
                .split_once(STAMP_SEPARATOR)
                .map_or(*only, |(_, message)| message)
                .trim()
                .to_string(),
            [.., last] => last.trim().to_string(),
        }
    }

    pub fn is_comment_rule(&self) -> bool {
        self.category == Category::Comment
    }

    pub fn is_warning_rule(&self) -> bool {
        self.category.is_warning()
    }

    pub fn is_metric_rule(&self) -> bool {
        self.category.is_metric()
    }
}

/// Errors reading or writing the catalog file.
#[derive(Debug)]
pub enum CatalogError {
    /// The catalog could not be read. Extraction is impossible without it.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Write(WriteError),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Read { path, .. } => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                let folder = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                write!(
                    f,
                    "Failed to read Voyager csv file:\n {}\n\n\
                     Download a copy of {} from github repo:\n     {}\n\n\
                     and save in working folder:\n     {}",
                    path.display(),
                    file_name,
                    CATALOG_SOURCE_URL,
                    folder.display()
                )
            }
            CatalogError::Write(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Read { source, .. } => Some(source),
            CatalogError::Write(e) => Some(e),
        }
    }
}

/// Ordered rule list with the synthetic comment rule always first.
#[derive(Debug, Clone)]
pub struct MatcherCatalog {
    rules: Vec<MatchRule>,
}

impl MatcherCatalog {
    /// Build a catalog from persisted rules, prepending the comment rule.
    pub fn from_rules(rules: Vec<MatchRule>) -> Self {
        let mut all = Vec::with_capacity(rules.len() + 1);
        all.push(MatchRule::comment_rule());
        all.extend(rules);
        Self { rules: all }
    }

    /// Parse catalog file content. The first line is a header and is skipped.
    pub fn parse(content: &str) -> Self {
        let rules = content
            .lines()
            .skip(1)
            .filter_map(MatchRule::from_csv_line)
            .collect();
        Self::from_rules(rules)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let catalog = Self::parse(&content);
        tracing::info!(
            file = %path.display(),
            rules = catalog.persisted_rules().count(),
            "loaded matcher catalog"
        );
        Ok(catalog)
    }

    /// Header plus one line per persisted rule. Comment rules are dropped.
    pub fn to_csv_lines(&self) -> Vec<String> {
        std::iter::once(CSV_HEADER.to_string())
            .chain(self.persisted_rules().map(MatchRule::to_csv_line))
            .collect()
    }

    /// Overwrite the catalog file with the current rules and enabled flags.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        writer::write_lines(path, &self.to_csv_lines(), OutputKind::Matchers)
            .map_err(CatalogError::Write)?;
        tracing::info!(file = %path.display(), "saved matcher catalog");
        Ok(())
    }

    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    /// Rules that are written back to the catalog file.
    pub fn persisted_rules(&self) -> impl Iterator<Item = &MatchRule> {
        self.rules.iter().filter(|r| !r.is_comment_rule())
    }

    /// Index of the first rule that matches `line`, scanning in catalog order.
    ///
    /// Disabled rules still classify; enablement only filters views.
    pub fn classify(&self, line: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.matches(line))
    }

    /// Index of the comment rule that user comments are attributed to.
    pub fn comment_rule_index(&self) -> usize {
        self.rules
            .iter()
            .position(MatchRule::is_comment_rule)
            .unwrap_or(0)
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.rules.get(index).is_some_and(|r| r.enabled)
    }

    /// Set one rule's enabled flag. Returns false if `index` is out of range.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> bool {
        match self.rules.get_mut(index) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Catalog index of the `n`th persisted rule (1-based, file order).
    pub fn persisted_index(&self, n: usize) -> Option<usize> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_comment_rule())
            .nth(n.checked_sub(1)?)
            .map(|(i, _)| i)
    }

    pub fn select_all(&mut self) {
        self.rules.iter_mut().for_each(|r| r.enabled = true);
    }

    /// Disable every rule except comment rules.
    pub fn deselect_all(&mut self) {
        self.for_each_persisted(|r| r.enabled = false);
    }

    /// Enable exactly the warning, emergency and critical rules.
    pub fn select_warnings(&mut self) {
        self.for_each_persisted(|r| r.enabled = r.is_warning_rule());
    }

    /// Enable exactly the metric rules.
    pub fn select_metrics(&mut self) {
        self.for_each_persisted(|r| r.enabled = r.is_metric_rule());
    }

    fn for_each_persisted(&mut self, f: impl FnMut(&mut MatchRule)) {
        self.rules
            .iter_mut()
            .filter(|r| !r.is_comment_rule())
            .for_each(f);
    }
}
