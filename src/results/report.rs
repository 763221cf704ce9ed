//! Report generation for suite results
//!
//! Renders the summary report and the detailed log from a result artifact.
//! The report is also available as text and Markdown for the terminal.

use std::fmt::{self, Write};
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::{KeywordResult, LogMessage, Status, SuiteResult, TestResult};
use crate::results::output::{read_artifact, ResultArtifact};

pub const DEFAULT_REPORT_PATH: &str = "report.html";
pub const DEFAULT_LOG_PATH: &str = "log.html";

/// Where the report and log go; `None` skips that file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportOptions {
    pub report: Option<PathBuf>,
    pub log: Option<PathBuf>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            report: Some(PathBuf::from(DEFAULT_REPORT_PATH)),
            log: Some(PathBuf::from(DEFAULT_LOG_PATH)),
        }
    }
}

impl ReportOptions {
    pub fn new(report: Option<PathBuf>, log: Option<PathBuf>) -> Self {
        Self { report, log }
    }

    /// `{prefix}-report.html` and `{prefix}-log.html`
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            report: Some(PathBuf::from(format!("{prefix}-report.html"))),
            log: Some(PathBuf::from(format!("{prefix}-log.html"))),
        }
    }

    /// Resolve relative paths against `base`
    pub fn in_dir(self, base: &Path) -> Self {
        Self {
            report: self.report.map(|p| base.join(p)),
            log: self.log.map(|p| base.join(p)),
        }
    }

    pub fn without_log(mut self) -> Self {
        self.log = None;
        self
    }
}

/// Files actually written by `ReportWriter::write_results`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WrittenReports {
    pub report: Option<PathBuf>,
    pub log: Option<PathBuf>,
}

/// Writes HTML report and log files for an artifact on disk
pub struct ReportWriter {
    artifact_path: PathBuf,
}

impl ReportWriter {
    pub fn new(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_path: artifact_path.into(),
        }
    }

    pub fn write_results(&self, options: &ReportOptions) -> Result<WrittenReports> {
        let artifact = read_artifact(&self.artifact_path)?;
        let generator = ReportGenerator::new(&artifact);
        let mut written = WrittenReports::default();

        if let Some(log) = &options.log {
            write_file(log, &generator.log()?)?;
            info!("Log: {}", log.display());
            written.log = Some(log.clone());
        }

        if let Some(report) = &options.report {
            let link = options.log.as_deref().map(|log| log_link(report, log));
            let html = generator.report(ReportFormat::Html, link.as_deref())?;
            write_file(report, &html)?;
            info!("Report: {}", report.display());
            written.report = Some(report.clone());
        }

        Ok(written)
    }
}

/// Link from the report to the log, relative to the report's directory
fn log_link(report: &Path, log: &Path) -> String {
    let cwd = std::env::current_dir().unwrap_or_default();
    let from = normalize_path(&cwd.join(report.parent().unwrap_or(Path::new(""))));
    let to = normalize_path(&cwd.join(log));
    match relative_path(&from, &to) {
        Some(relative) => relative
            .iter()
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        None => to.display().to_string(),
    }
}

/// Lexically drop `.` and fold `..` into the preceding component
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if normalized.file_name().is_some() => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// `to` as seen from the directory `from`; `None` when their roots differ
fn relative_path(from: &Path, to: &Path) -> Option<PathBuf> {
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let rooted = matches!(to.first(), Some(Component::Prefix(_) | Component::RootDir));
    if common == 0 && rooted {
        return None;
    }

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    relative.extend(&to[common..]);
    Some(relative)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Report generator
pub struct ReportGenerator<'a> {
    artifact: &'a ResultArtifact,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(artifact: &'a ResultArtifact) -> Self {
        Self { artifact }
    }

    fn suite(&self) -> &'a SuiteResult {
        &self.artifact.suite
    }

    /// Summary report; HTML test names link into `log_link` when given
    pub fn report(&self, format: ReportFormat, log_link: Option<&str>) -> Result<String> {
        let mut output = String::new();
        match format {
            ReportFormat::Text => self.format_text_report(&mut output)?,
            ReportFormat::Markdown => self.format_markdown_report(&mut output)?,
            ReportFormat::Html => self.format_html_report(&mut output, log_link)?,
        }
        Ok(output)
    }

    /// Detailed HTML log with every keyword and message
    pub fn log(&self) -> Result<String> {
        let mut output = String::new();
        self.format_html_log(&mut output)?;
        Ok(output)
    }

    fn format_text_report(&self, output: &mut String) -> fmt::Result {
        let suite = self.suite();
        let stats = &suite.statistics;

        writeln!(output, "\n{:=^70}", " Test Report ")?;
        writeln!(output)?;
        writeln!(output, "Suite: {}", suite.name)?;
        if let Some(doc) = &suite.doc {
            writeln!(output, "Documentation: {doc}")?;
        }
        writeln!(output, "Status: {}", suite.status)?;
        writeln!(output, "Started: {}", format_datetime(&suite.start_time))?;
        writeln!(output, "Finished: {}", format_datetime(&suite.end_time))?;
        writeln!(output, "Elapsed: {}ms", suite.elapsed_ms)?;
        writeln!(output)?;

        writeln!(output, "{:-^70}", " Statistics ")?;
        writeln!(
            output,
            "Total: {}  Pass: {}  Fail: {}  Skip: {}  ({:.1}% passed)",
            stats.total,
            stats.passed,
            stats.failed,
            stats.skipped,
            stats.pass_rate()
        )?;
        for (tag, counts) in &stats.by_tag {
            writeln!(
                output,
                "  {:<20} {:>4} pass {:>4} fail {:>4} skip",
                truncate(tag, 20),
                counts.passed,
                counts.failed,
                counts.skipped
            )?;
        }

        writeln!(output, "\n{:-^70}", " Tests ")?;
        writeln!(output, "{:<40} {:>8} {:>10}", "Test", "Status", "Time(ms)")?;
        writeln!(output, "{:-<70}", "")?;
        for test in &suite.tests {
            writeln!(
                output,
                "{:<40} {:>8} {:>10}",
                truncate(&test.name, 40),
                test.status.to_string(),
                test.elapsed_ms
            )?;
            if let Some(message) = &test.message {
                writeln!(output, "    {message}")?;
            }
        }

        if !suite.errors.is_empty() {
            writeln!(output, "\n{:-^70}", " Execution Errors ")?;
            for error in &suite.errors {
                writeln!(output, "[{}] {}", error.level, error.text)?;
            }
        }

        writeln!(output, "\n{:=^70}", "")
    }

    fn format_markdown_report(&self, output: &mut String) -> fmt::Result {
        let suite = self.suite();
        let stats = &suite.statistics;

        writeln!(output, "# {} Report\n", suite.name)?;
        writeln!(output, "## Summary\n")?;
        writeln!(output, "| Property | Value |")?;
        writeln!(output, "|----------|-------|")?;
        writeln!(output, "| Status | **{}** |", suite.status)?;
        writeln!(output, "| Started | {} |", format_datetime(&suite.start_time))?;
        writeln!(output, "| Finished | {} |", format_datetime(&suite.end_time))?;
        writeln!(output, "| Elapsed | {}ms |", suite.elapsed_ms)?;
        writeln!(output, "| Generator | {} |", self.artifact.generator)?;

        writeln!(output, "\n## Statistics\n")?;
        writeln!(output, "| | Total | Pass | Fail | Skip |")?;
        writeln!(output, "|---|-------|------|------|------|")?;
        writeln!(
            output,
            "| All Tests | {} | {} | {} | {} |",
            stats.total, stats.passed, stats.failed, stats.skipped
        )?;
        for (tag, counts) in &stats.by_tag {
            writeln!(
                output,
                "| `{}` | {} | {} | {} | {} |",
                escape_markdown_cell(tag),
                counts.total(),
                counts.passed,
                counts.failed,
                counts.skipped
            )?;
        }

        writeln!(output, "\n## Tests\n")?;
        writeln!(output, "| Test | Status | Message | Elapsed |")?;
        writeln!(output, "|------|--------|---------|---------|")?;
        for test in &suite.tests {
            writeln!(
                output,
                "| {} | {} | {} | {}ms |",
                escape_markdown_cell(&test.name),
                test.status,
                escape_markdown_cell(test.message.as_deref().unwrap_or("")),
                test.elapsed_ms
            )?;
        }

        if !suite.errors.is_empty() {
            writeln!(output, "\n## Execution Errors\n")?;
            for error in &suite.errors {
                writeln!(output, "- **{}** {}", error.level, error.text)?;
            }
        }

        Ok(())
    }

    fn format_html_report(&self, output: &mut String, log_link: Option<&str>) -> fmt::Result {
        let suite = self.suite();
        let stats = &suite.statistics;

        write_html_head(output, &format!("{} Report", suite.name))?;
        writeln!(
            output,
            r#"<body>
    <div class="container">
        <h1>{name} Report</h1>
        <div class="banner {class}">{status}: {passed} of {total} tests passed</div>"#,
            name = escape_html(&suite.name),
            class = suite.status.css_class(),
            status = suite.status,
            passed = stats.passed,
            total = stats.total
        )?;

        if let Some(doc) = &suite.doc {
            writeln!(output, "        <p>{}</p>", escape_html(doc))?;
        }

        writeln!(
            output,
            r#"
        <h2>Summary</h2>
        <div class="stat-card"><div class="stat-value">{}</div><div class="stat-label">Total</div></div>
        <div class="stat-card"><div class="stat-value pass">{}</div><div class="stat-label">Pass</div></div>
        <div class="stat-card"><div class="stat-value fail">{}</div><div class="stat-label">Fail</div></div>
        <div class="stat-card"><div class="stat-value skip">{}</div><div class="stat-label">Skip</div></div>
        <div class="stat-card"><div class="stat-value">{}ms</div><div class="stat-label">Elapsed</div></div>
        <table>
            <tr><th>Started</th><td>{}</td></tr>
            <tr><th>Finished</th><td>{}</td></tr>
            <tr><th>Generator</th><td>{}</td></tr>
        </table>"#,
            stats.total,
            stats.passed,
            stats.failed,
            stats.skipped,
            suite.elapsed_ms,
            format_datetime(&suite.start_time),
            format_datetime(&suite.end_time),
            escape_html(&self.artifact.generator)
        )?;

        writeln!(
            output,
            r#"
        <h2>Statistics by Tag</h2>
        <table>
            <tr><th>Tag</th><th>Total</th><th>Pass</th><th>Fail</th><th>Skip</th></tr>"#
        )?;
        if stats.by_tag.is_empty() {
            writeln!(output, r#"            <tr><td colspan="5">No tags</td></tr>"#)?;
        }
        for (tag, counts) in &stats.by_tag {
            writeln!(
                output,
                "            <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(tag),
                counts.total(),
                counts.passed,
                counts.failed,
                counts.skipped
            )?;
        }
        writeln!(output, "        </table>")?;

        writeln!(
            output,
            r#"
        <h2>Test Details</h2>
        <table>
            <tr><th>Test</th><th>Tags</th><th>Status</th><th>Message</th><th>Elapsed</th></tr>"#
        )?;
        for (index, test) in suite.tests.iter().enumerate() {
            let name = escape_html(&test.name);
            let name = match log_link {
                Some(link) => format!(
                    r##"<a href="{}#{}">{}</a>"##,
                    escape_html(link),
                    test_anchor(index),
                    name
                ),
                None => name,
            };
            writeln!(
                output,
                r#"            <tr><td>{}</td><td>{}</td><td class="{}">{}</td><td>{}</td><td>{}ms</td></tr>"#,
                name,
                escape_html(&test.tags.join(", ")),
                test.status.css_class(),
                test.status,
                escape_html(test.message.as_deref().unwrap_or("")),
                test.elapsed_ms
            )?;
        }
        writeln!(output, "        </table>")?;

        if !suite.errors.is_empty() {
            writeln!(
                output,
                r#"        <p class="fail">{} execution errors, see the log for details.</p>"#,
                suite.errors.len()
            )?;
        }

        writeln!(
            output,
            r#"    </div>
</body>
</html>"#
        )
    }

    fn format_html_log(&self, output: &mut String) -> fmt::Result {
        let suite = self.suite();

        write_html_head(output, &format!("{} Log", suite.name))?;
        writeln!(
            output,
            r#"<body>
    <div class="container">
        <h1>{} Log</h1>
        <div class="banner {}">{} - {}ms</div>"#,
            escape_html(&suite.name),
            suite.status.css_class(),
            suite.status,
            suite.elapsed_ms
        )?;

        writeln!(output, "        <h2>Execution Errors</h2>")?;
        if suite.errors.is_empty() {
            writeln!(output, "        <p>None</p>")?;
        } else {
            write_messages(output, &suite.errors)?;
        }

        writeln!(output, "        <h2>Tests</h2>")?;
        for (index, test) in suite.tests.iter().enumerate() {
            write_test(output, index, test)?;
        }

        writeln!(
            output,
            r#"    </div>
</body>
</html>"#
        )
    }
}

fn write_test(output: &mut String, index: usize, test: &TestResult) -> fmt::Result {
    writeln!(
        output,
        r#"        <div class="test" id="{}">
            <h3><span class="{}">{}</span> {}</h3>"#,
        test_anchor(index),
        test.status.css_class(),
        test.status,
        escape_html(&test.name)
    )?;
    if let Some(doc) = &test.doc {
        writeln!(output, "            <p>{}</p>", escape_html(doc))?;
    }
    if !test.tags.is_empty() {
        writeln!(
            output,
            "            <p>Tags: {}</p>",
            escape_html(&test.tags.join(", "))
        )?;
    }
    if let Some(message) = &test.message {
        writeln!(
            output,
            r#"            <p class="message">{}</p>"#,
            escape_html(message)
        )?;
    }
    writeln!(
        output,
        "            <p>Start: {} / Elapsed: {}ms</p>",
        format_datetime(&test.start_time),
        test.elapsed_ms
    )?;

    for keyword in &test.keywords {
        write_keyword(output, keyword)?;
    }
    writeln!(output, "        </div>")
}

fn write_keyword(output: &mut String, keyword: &KeywordResult) -> fmt::Result {
    let mut signature = String::new();
    if !keyword.assign.is_empty() {
        signature.push_str(&keyword.assign.join(", "));
        signature.push_str(" = ");
    }
    signature.push_str(&keyword.full_name());
    for arg in &keyword.args {
        signature.push_str("    ");
        signature.push_str(arg);
    }

    let open = if keyword.status == Status::Fail { " open" } else { "" };
    writeln!(
        output,
        r#"<details class="keyword"{}><summary><span class="{}">{}</span> <code>{}</code> <small>{}ms</small></summary>"#,
        open,
        keyword.status.css_class(),
        keyword.status,
        escape_html(&signature),
        keyword.elapsed_ms
    )?;

    if let Some(message) = &keyword.message {
        writeln!(output, r#"<p class="message">{}</p>"#, escape_html(message))?;
    }
    if !keyword.messages.is_empty() {
        write_messages(output, &keyword.messages)?;
    }
    for child in &keyword.children {
        write_keyword(output, child)?;
    }

    writeln!(output, "</details>")
}

fn write_messages(output: &mut String, messages: &[LogMessage]) -> fmt::Result {
    writeln!(output, "<table class=\"messages\">")?;
    for message in messages {
        writeln!(
            output,
            r#"<tr><td>{}</td><td class="level-{}">{}</td><td>{}</td></tr>"#,
            message.timestamp.format("%H:%M:%S%.3f"),
            message.level.to_string().to_lowercase(),
            message.level,
            escape_html(&message.text)
        )?;
    }
    writeln!(output, "</table>")
}

fn write_html_head(output: &mut String, title: &str) -> fmt::Result {
    writeln!(
        output,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; background: #f5f5f5; }}
        .container {{ max-width: 1200px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px; }}
        h2 {{ color: #555; margin-top: 30px; }}
        table {{ width: 100%; border-collapse: collapse; margin: 20px 0; }}
        th, td {{ padding: 8px 12px; text-align: left; border-bottom: 1px solid #ddd; }}
        th {{ background: #007bff; color: white; }}
        .banner {{ padding: 16px; border-radius: 8px; color: white; font-size: 20px; font-weight: bold; }}
        .banner.pass {{ background: #28a745; color: white; }}
        .banner.fail {{ background: #dc3545; color: white; }}
        .banner.skip {{ background: #e0a800; color: white; }}
        .pass {{ color: #28a745; font-weight: bold; }}
        .fail {{ color: #dc3545; font-weight: bold; }}
        .skip {{ color: #e0a800; font-weight: bold; }}
        .not-run {{ color: #888; }}
        .stat-card {{ display: inline-block; background: #f8f9fa; padding: 20px; margin: 10px; border-radius: 8px; min-width: 120px; text-align: center; }}
        .stat-value {{ font-size: 24px; font-weight: bold; color: #007bff; }}
        .stat-label {{ color: #666; font-size: 14px; }}
        .test {{ border-top: 1px solid #ddd; padding: 10px 0; }}
        .keyword {{ margin: 4px 0 4px 20px; }}
        .message {{ white-space: pre-wrap; }}
        .messages td {{ font-family: monospace; padding: 4px 8px; }}
        .level-warn {{ color: #e0a800; }}
        .level-error {{ color: #dc3545; }}
    </style>
</head>"#,
        escape_html(title)
    )
}

fn test_anchor(index: usize) -> String {
    format!("t{}", index + 1)
}

/// Report output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Markdown,
    Html,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            "html" | "htm" => Some(ReportFormat::Html),
            _ => None,
        }
    }
}

/// Escape text for HTML element content and attribute values
pub fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Keep a value inside one Markdown table cell
fn escape_markdown_cell(s: &str) -> String {
    s.replace('|', "\\|").replace("\r\n", "<br>").replace('\n', "<br>")
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
