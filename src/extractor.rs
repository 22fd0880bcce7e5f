//! Extraction engine: classifies session lines against the matcher catalog
//! and exposes filtered views of the resulting records.
//!
//! Views are computed on every call from the current rule enablement, so
//! toggling a rule never touches the records themselves.
use crate::extract::ExtractRecord;
use crate::matchers::MatcherCatalog;
use crate::reader::{self, ReadWarning};
use crate::session_paths::SessionPaths;
use crate::writer::{self, OutputKind, WriteError};
use chrono::NaiveDate;

#[derive(Debug, Default)]
pub struct Extractor {
    all: Vec<ExtractRecord>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the session's input files and rebuild every record.
    ///
    /// Unreadable files are returned as warnings; records from the files that
    /// could be read replace the previous set regardless.
    pub fn compile_from_files(
        &mut self,
        paths: &SessionPaths,
        catalog: &MatcherCatalog,
    ) -> Vec<ReadWarning> {
        let read = reader::read_session_lines(paths.log_paths(), paths.start_date());
        self.compile_lines(&read.lines, catalog);
        read.warnings
    }

    /// Classify each line by the first matching rule; unmatched lines are dropped.
    pub fn compile_lines<S: AsRef<str>>(&mut self, lines: &[S], catalog: &MatcherCatalog) {
        let all: Vec<ExtractRecord> = lines
            .iter()
            .map(AsRef::as_ref)
            .filter_map(|line| {
                let index = catalog.classify(line)?;
                ExtractRecord::from_line(line, index, &catalog.rules()[index])
            })
            .collect();

        tracing::info!(
            lines = lines.len(),
            extracts = all.len(),
            "compiled log extracts"
        );
        self.all = all;
    }

    /// Every record, enabled or not.
    pub fn all(&self) -> &[ExtractRecord] {
        &self.all
    }

    /// Comments plus records whose rule is enabled.
    pub fn table_view<'a>(&'a self, catalog: &MatcherCatalog) -> Vec<&'a ExtractRecord> {
        self.all
            .iter()
            .filter(|r| r.is_comment() || catalog.is_enabled(r.rule()))
            .collect()
    }

    /// Non-comment records whose rule is enabled; these go to the extracts file.
    pub fn selected_view<'a>(&'a self, catalog: &MatcherCatalog) -> Vec<&'a ExtractRecord> {
        self.all
            .iter()
            .filter(|r| !r.is_comment() && catalog.is_enabled(r.rule()))
            .collect()
    }

    /// Metric records whose rule is enabled.
    pub fn metric_view<'a>(&'a self, catalog: &MatcherCatalog) -> Vec<&'a ExtractRecord> {
        self.all
            .iter()
            .filter(|r| r.is_metric() && catalog.is_enabled(r.rule()))
            .collect()
    }

    pub fn comments_view(&self) -> Vec<&ExtractRecord> {
        self.all.iter().filter(|r| r.is_comment()).collect()
    }

    /// Add a user comment after the last existing comment. Blank text is ignored.
    ///
    /// Returns true if a comment was added.
    pub fn add_user_comment(
        &mut self,
        text: &str,
        start_date: NaiveDate,
        catalog: &MatcherCatalog,
    ) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        let record = ExtractRecord::from_comment(text, start_date, catalog.comment_rule_index());
        let pos = self
            .all
            .iter()
            .rposition(ExtractRecord::is_comment)
            .map_or(0, |i| i + 1);
        self.all.insert(pos, record);
        tracing::debug!(position = pos, "added user comment");
        true
    }

    /// Write the comments view to the comments file and the selected view to
    /// the extracts file. Each write is attempted independently.
    pub fn save(&self, paths: &SessionPaths, catalog: &MatcherCatalog) -> Vec<WriteError> {
        let mut errors = Vec::new();

        let comments: Vec<&str> = self
            .comments_view()
            .into_iter()
            .map(ExtractRecord::raw_line)
            .collect();
        match paths.comments_file().path() {
            Some(path) => {
                if let Err(e) = writer::write_lines(path, &comments, OutputKind::Comments) {
                    tracing::warn!(error = %e.source, file = %path.display(), "failed to save comments");
                    errors.push(e);
                }
            }
            None if !comments.is_empty() => {
                tracing::warn!(
                    comments = comments.len(),
                    "session has no comments file; comments not saved"
                );
            }
            None => {}
        }

        let selected: Vec<&str> = self
            .selected_view(catalog)
            .into_iter()
            .map(ExtractRecord::raw_line)
            .collect();
        if let Some(path) = paths.extracts_file().path() {
            if let Err(e) = writer::write_lines(path, &selected, OutputKind::Extracts) {
                tracing::warn!(error = %e.source, file = %path.display(), "failed to save extracts");
                errors.push(e);
            }
        }

        errors
    }
}
