//! A single extracted log record: a matched log line, or a user comment
//! written in the same line layout so it can be re-read like a log line.
use crate::matchers::{Category, MatchRule, COMMENT_MATCH_TEXT, LOG_DELIMITER};
use crate::timestamps;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Text between the stamp and the comment body in a synthesized comment line.
pub fn comment_stub() -> String {
    format!("000 - COMMENT - [{COMMENT_MATCH_TEXT}{LOG_DELIMITER}")
}

/// Immutable once built. `rule` is the index of the source rule in the
/// catalog that was active when the record was created.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractRecord {
    timestamp: String,
    display_text: String,
    category: Category,
    raw_line: String,
    #[serde(skip)]
    rule: usize,
}

impl ExtractRecord {
    /// Build a record from a matched log line and the rule that matched it.
    ///
    /// Returns `None` if the line carries no parsable stamp.
    pub fn from_line(line: &str, rule_index: usize, rule: &MatchRule) -> Option<Self> {
        let t = timestamps::parse_line_timestamp(line.trim())?;
        Some(Self {
            timestamp: timestamps::display_stamp(t),
            display_text: rule.display_text(line),
            category: rule.category,
            raw_line: line.to_string(),
            rule: rule_index,
        })
    }

    /// Build a user comment stamped one second after session-start noon.
    ///
    /// Line breaks become spaces so the comment stays a single log line.
    pub fn from_comment(text: &str, start_date: NaiveDate, comment_rule: usize) -> Self {
        let t = timestamps::session_noon(start_date) + Duration::seconds(1);
        let single_line = text.replace(['\r', '\n'], " ");
        let text = single_line.trim();
        Self {
            timestamp: timestamps::display_stamp(t),
            display_text: text.to_string(),
            category: Category::Comment,
            raw_line: format!(
                "{} {} {}",
                timestamps::log_line_stamp(t),
                comment_stub(),
                text
            ),
            rule: comment_rule,
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn raw_line(&self) -> &str {
        &self.raw_line
    }

    pub fn rule(&self) -> usize {
        self.rule
    }

    pub fn is_comment(&self) -> bool {
        self.category == Category::Comment
    }

    pub fn is_metric(&self) -> bool {
        self.category.is_metric()
    }
}

// Value equality on the displayed fields; the source rule is not compared.
impl PartialEq for ExtractRecord {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && self.display_text == other.display_text
            && self.category == other.category
            && self.raw_line == other.raw_line
    }
}

impl Eq for ExtractRecord {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::MatcherCatalog;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 12, 11).unwrap()
    }

    #[test]
    fn matched_line_without_preset() {
        let rule = MatchRule::new(true, "Astronomical Night Start", "", Category::Warning);
        let line = "2021/12/11 18:17:03 723 - Astronomical Night Start";
        let record = ExtractRecord::from_line(line, 3, &rule).unwrap();

        assert_eq!(record.timestamp(), "18:17:03.723 =>");
        assert_eq!(record.display_text(), "Astronomical Night Start");
        assert_eq!(record.category(), Category::Warning);
        assert_eq!(record.raw_line(), line);
        assert_eq!(record.rule(), 3);
        assert!(!record.is_comment());
    }

    #[test]
    fn unstamped_line_is_rejected() {
        let rule = MatchRule::new(true, "x", "", Category::Info);
        assert!(ExtractRecord::from_line("x marks the spot", 1, &rule).is_none());
    }

    #[test]
    fn comment_line_round_trips_through_catalog() {
        let record = ExtractRecord::from_comment("  Clouds rolling in  ", start(), 0);
        assert_eq!(record.timestamp(), "12:00:01.000 =>");
        assert_eq!(record.display_text(), "Clouds rolling in");
        assert_eq!(record.category(), Category::Comment);
        assert_eq!(
            record.raw_line(),
            "2021/12/11 12:00:01 000 - COMMENT - [User Comment] - Clouds rolling in"
        );

        // Re-read as if from the comments file
        let catalog = MatcherCatalog::from_rules(vec![]);
        let index = catalog.classify(record.raw_line()).unwrap();
        let reread =
            ExtractRecord::from_line(record.raw_line(), index, &catalog.rules()[index]).unwrap();
        assert_eq!(reread, record);
    }

    #[test]
    fn multiline_comment_is_flattened() {
        let record = ExtractRecord::from_comment("line one\r\nline two\n", start(), 0);
        assert_eq!(record.display_text(), "line one  line two");
        assert_eq!(record.raw_line().lines().count(), 1);
        assert!(record.raw_line().ends_with("[User Comment] - line one  line two"));
    }

    #[test]
    fn equality_ignores_source_rule() {
        let rule = MatchRule::new(true, "Start", "", Category::Event);
        let line = "2021/12/11 18:17:03 723 - Start";
        let a = ExtractRecord::from_line(line, 1, &rule).unwrap();
        let b = ExtractRecord::from_line(line, 2, &rule).unwrap();
        assert_eq!(a, b);

        let other = MatchRule::new(true, "Start", "", Category::Info);
        let c = ExtractRecord::from_line(line, 1, &other).unwrap();
        assert_ne!(a, c);
    }
}
