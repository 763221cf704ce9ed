//! Execution result models
//!
//! Defines statuses, captured log messages and the result tree produced by
//! running a suite.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::logger::LogLevel;

/// Execution status of a suite, test or keyword
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pass,
    Fail,
    Skip,
    NotRun,
}

impl Status {
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Pass => "✓",
            Status::Fail => "✗",
            Status::Skip => "○",
            Status::NotRun => "-",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Pass)
    }

    /// Lowercase name, used as CSS class in HTML output
    pub fn css_class(&self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Fail => "fail",
            Status::Skip => "skip",
            Status::NotRun => "not-run",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pass => write!(f, "PASS"),
            Status::Fail => write!(f, "FAIL"),
            Status::Skip => write!(f, "SKIP"),
            Status::NotRun => write!(f, "NOT RUN"),
        }
    }
}

/// A message captured while a keyword ran
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl LogMessage {
    pub fn new(level: LogLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            text: text.into(),
        }
    }
}

/// Result of a single keyword call, including nested user keyword calls
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeywordResult {
    /// Name as written in the body
    pub name: String,
    /// Library or suite that provided the keyword, if it was resolved
    pub owner: Option<String>,
    pub args: Vec<String>,
    pub assign: Vec<String>,
    pub status: Status,
    pub message: Option<String>,
    pub messages: Vec<LogMessage>,
    pub start_time: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
    pub children: Vec<KeywordResult>,
}

impl KeywordResult {
    /// Placeholder for a call skipped after an earlier failure
    pub fn not_run(name: &str, args: &[String], assign: &[String]) -> Self {
        Self {
            name: name.to_string(),
            owner: None,
            args: args.to_vec(),
            assign: assign.to_vec(),
            status: Status::NotRun,
            message: None,
            messages: Vec::new(),
            start_time: None,
            elapsed_ms: 0,
            children: Vec::new(),
        }
    }

    /// Full name in `Owner.Keyword` form when the owner is known
    pub fn full_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Visit this result and every nested child
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a KeywordResult)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

impl fmt::Display for KeywordResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.full_name(),
            self.elapsed_ms
        )?;
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Result of a single test execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub doc: Option<String>,
    pub tags: Vec<String>,
    pub status: Status,
    pub message: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub keywords: Vec<KeywordResult>,
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.name,
            self.elapsed_ms
        )?;
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Pass/fail/skip counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StatusCounts {
    fn record(&mut self, status: Status) {
        match status {
            Status::Pass => self.passed += 1,
            Status::Fail => self.failed += 1,
            Status::Skip => self.skipped += 1,
            Status::NotRun => {}
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Totals for a suite run, overall and per tag
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub by_tag: BTreeMap<String, StatusCounts>,
}

impl Statistics {
    pub fn from_tests(tests: &[TestResult]) -> Self {
        let mut overall = StatusCounts::default();
        let mut by_tag: BTreeMap<String, StatusCounts> = BTreeMap::new();

        for test in tests {
            overall.record(test.status);
            for tag in &test.tags {
                by_tag
                    .entry(tag.to_lowercase())
                    .or_default()
                    .record(test.status);
            }
        }

        Self {
            total: tests.len(),
            passed: overall.passed,
            failed: overall.failed,
            skipped: overall.skipped,
            by_tag,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }
}

/// Result of running a whole suite
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuiteResult {
    pub name: String,
    pub doc: Option<String>,
    pub status: Status,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub tests: Vec<TestResult>,
    /// Execution errors and warnings collected during the run
    pub errors: Vec<LogMessage>,
    pub statistics: Statistics,
}

impl SuiteResult {
    pub fn new(
        name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        tests: Vec<TestResult>,
    ) -> Self {
        let statistics = Statistics::from_tests(&tests);
        let status = suite_status(&statistics);
        let elapsed_ms = (end_time - start_time).num_milliseconds().max(0) as u64;

        Self {
            name: name.into(),
            doc: None,
            status,
            start_time,
            end_time,
            elapsed_ms,
            tests,
            errors: Vec::new(),
            statistics,
        }
    }

    pub fn with_doc(mut self, doc: Option<String>) -> Self {
        self.doc = doc;
        self
    }

    pub fn with_errors(mut self, errors: Vec<LogMessage>) -> Self {
        self.errors = errors;
        self
    }

    pub fn is_all_passed(&self) -> bool {
        self.statistics.failed == 0
    }

    pub fn failed_tests(&self) -> impl Iterator<Item = &TestResult> {
        self.tests.iter().filter(|t| t.status == Status::Fail)
    }
}

impl fmt::Display for SuiteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Suite: {}", self.name)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for test in &self.tests {
            writeln!(f, "  {test}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {}",
            self.statistics.total,
            self.statistics.passed,
            self.statistics.failed,
            self.statistics.skipped
        )?;
        writeln!(
            f,
            "Status: {} | Duration: {}ms",
            self.status, self.elapsed_ms
        )
    }
}

/// FAIL if anything failed, PASS if anything passed, otherwise SKIP
fn suite_status(stats: &Statistics) -> Status {
    if stats.failed > 0 {
        Status::Fail
    } else if stats.passed > 0 {
        Status::Pass
    } else {
        Status::Skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_result(name: &str, status: Status, tags: &[&str]) -> TestResult {
        let now = Utc::now();
        TestResult {
            name: name.to_string(),
            doc: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            status,
            message: None,
            start_time: now,
            end_time: now,
            elapsed_ms: 5,
            keywords: Vec::new(),
        }
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Pass.to_string(), "PASS");
        assert_eq!(Status::NotRun.to_string(), "NOT RUN");
        assert!(Status::Pass.is_success());
        assert!(!Status::Skip.is_success());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&Status::NotRun).unwrap(), "\"NOT_RUN\"");
        let status: Status = serde_json::from_str("\"FAIL\"").unwrap();
        assert_eq!(status, Status::Fail);
    }

    #[test]
    fn test_suite_summary() {
        let now = Utc::now();
        let results = vec![
            test_result("a", Status::Pass, &["dns"]),
            test_result("b", Status::Fail, &["dns", "ntp"]),
            test_result("c", Status::Skip, &[]),
        ];

        let suite = SuiteResult::new("Suite", now, now, results);
        assert_eq!(suite.status, Status::Fail);
        assert_eq!(suite.statistics.total, 3);
        assert_eq!(suite.statistics.passed, 1);
        assert_eq!(suite.statistics.failed, 1);
        assert_eq!(suite.statistics.skipped, 1);
        assert_eq!(suite.statistics.by_tag["dns"].total(), 2);
        assert_eq!(suite.statistics.by_tag["ntp"].failed, 1);
        assert_eq!(suite.failed_tests().count(), 1);
    }

    #[test]
    fn test_empty_suite_is_skipped() {
        let now = Utc::now();
        let suite = SuiteResult::new("Empty", now, now, Vec::new());
        assert_eq!(suite.status, Status::Skip);
        assert_eq!(suite.statistics.pass_rate(), 0.0);
        assert!(suite.is_all_passed());
    }

    #[test]
    fn test_keyword_walk() {
        let mut parent = KeywordResult::not_run("Outer", &[], &[]);
        parent
            .children
            .push(KeywordResult::not_run("Inner", &[], &[]));
        let mut names = Vec::new();
        parent.walk(&mut |kw| names.push(kw.name.as_str()));
        assert_eq!(names, vec!["Outer", "Inner"]);
    }
}
