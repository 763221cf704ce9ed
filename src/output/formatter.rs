//! Output formatters for suite results
//!
//! Provides console table, JSON, CSV and one-line summary formats.

use anyhow::{Context, Result};

use crate::models::{Status, SuiteResult, TestResult};

const WIDTH: usize = 78;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a whole suite run
    pub fn format_suite(&self, suite: &SuiteResult) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(self.format_suite_table(suite)),
            OutputFormat::Json => {
                serde_json::to_string(suite).context("Failed to serialize results")
            }
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(suite).context("Failed to serialize results")
            }
            OutputFormat::Csv => self.format_suite_csv(suite),
            OutputFormat::Summary => Ok(self.format_suite_brief(suite)),
        }
    }

    /// One console line for a finished test
    pub fn format_test(&self, test: &TestResult) -> String {
        let status = format!("| {} |", self.status_label(test.status));
        let visible = test.status.to_string().len() + 4;
        let name_width = WIDTH.saturating_sub(visible + 1);
        format!("{:<name_width$} {}", truncate(&test.name, name_width), status)
    }

    fn status_label(&self, status: Status) -> String {
        if !self.colorize {
            return status.to_string();
        }
        let color = match status {
            Status::Pass => "32",
            Status::Fail => "31",
            Status::Skip => "33",
            Status::NotRun => "90",
        };
        format!("\x1b[{color}m{status}\x1b[0m")
    }

    fn format_suite_table(&self, suite: &SuiteResult) -> String {
        let heavy = "=".repeat(WIDTH);
        let light = "-".repeat(WIDTH);
        let mut output = String::new();

        output.push_str(&format!("{heavy}\n{}\n", suite.name));
        if let Some(doc) = &suite.doc {
            output.push_str(&format!(":: {doc}\n"));
        }
        output.push_str(&format!("{heavy}\n"));

        for test in &suite.tests {
            output.push_str(&self.format_test(test));
            output.push('\n');
            if let Some(message) = &test.message {
                output.push_str(message);
                output.push('\n');
            }
            output.push_str(&format!("{light}\n"));
        }

        let stats = &suite.statistics;
        let plural = if stats.total == 1 { "test" } else { "tests" };
        let label = format!("| {} |", self.status_label(suite.status));
        let visible = suite.status.to_string().len() + 4;
        let name_width = WIDTH.saturating_sub(visible + 1);
        output.push_str(&format!(
            "{:<name_width$} {}\n",
            truncate(&suite.name, name_width),
            label
        ));
        output.push_str(&format!(
            "{} {}, {} passed, {} failed, {} skipped\n",
            stats.total, plural, stats.passed, stats.failed, stats.skipped
        ));
        output.push_str(&format!("{heavy}\n"));

        for error in &suite.errors {
            output.push_str(&format!("[ {} ] {}\n", error.level, error.text));
        }

        output
    }

    fn format_suite_csv(&self, suite: &SuiteResult) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["test_name", "status", "elapsed_ms", "tags", "message"])?;

        for test in &suite.tests {
            writer.write_record([
                test.name.clone(),
                test.status.to_string(),
                test.elapsed_ms.to_string(),
                test.tags.join(";"),
                test.message.clone().unwrap_or_default(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to finish CSV output: {e}"))?;
        String::from_utf8(bytes).context("CSV output was not valid UTF-8")
    }

    fn format_suite_brief(&self, suite: &SuiteResult) -> String {
        format!(
            "{} {} - {}/{} passed ({:.1}%) in {}ms",
            suite.status.symbol(),
            suite.name,
            suite.statistics.passed,
            suite.statistics.total,
            suite.statistics.pass_rate(),
            suite.elapsed_ms
        )
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_result(name: &str, status: Status, message: Option<&str>) -> TestResult {
        let now = Utc::now();
        TestResult {
            name: name.to_string(),
            doc: None,
            tags: vec!["dns".to_string(), "network".to_string()],
            status,
            message: message.map(str::to_string),
            start_time: now,
            end_time: now,
            elapsed_ms: 12,
            keywords: Vec::new(),
        }
    }

    fn suite() -> SuiteResult {
        let now = Utc::now();
        SuiteResult::new(
            "Testing Connectivity to Servers",
            now,
            now,
            vec![
                test_result("Testing DNS Servers", Status::Pass, None),
                test_result("Testing NTP Servers", Status::Fail, Some("1 != 0, really")),
            ],
        )
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("TABLE"), Some(OutputFormat::Table));
        assert_eq!(
            OutputFormat::from_str("json-pretty"),
            Some(OutputFormat::JsonPretty)
        );
        assert_eq!(OutputFormat::from_str("unknown"), None);
    }

    #[test]
    fn test_formatter_creation() {
        let formatter = ResultFormatter::new(OutputFormat::Json).no_color();
        assert_eq!(formatter.format, OutputFormat::Json);
        assert!(!formatter.colorize);
    }

    #[test]
    fn test_table_output() {
        let output = ResultFormatter::new(OutputFormat::Table)
            .no_color()
            .format_suite(&suite())
            .unwrap();
        let dns_line = output
            .lines()
            .find(|l| l.starts_with("Testing DNS Servers"))
            .unwrap();
        assert!(dns_line.ends_with("| PASS |"));
        assert_eq!(dns_line.chars().count(), WIDTH);
        assert!(output.contains("2 tests, 1 passed, 1 failed, 0 skipped"));
        assert!(output.contains("1 != 0, really"));
    }

    #[test]
    fn test_csv_quotes_fields() {
        let output = ResultFormatter::new(OutputFormat::Csv)
            .format_suite(&suite())
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "test_name,status,elapsed_ms,tags,message");
        assert_eq!(lines[1], "Testing DNS Servers,PASS,12,dns;network,");
        assert_eq!(
            lines[2],
            "Testing NTP Servers,FAIL,12,dns;network,\"1 != 0, really\""
        );
    }

    #[test]
    fn test_json_and_summary() {
        let json = ResultFormatter::new(OutputFormat::Json)
            .format_suite(&suite())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "FAIL");

        let brief = ResultFormatter::new(OutputFormat::Summary)
            .format_suite(&suite())
            .unwrap();
        assert!(brief.contains("1/2 passed (50.0%)"));
    }
}
