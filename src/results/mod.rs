//! Result artifact and report generation
//!
//! A run is stored once as a JSON artifact; the HTML report and log are
//! rendered from that artifact.

mod output;
mod report;

pub use output::{read_artifact, write_artifact, EnvironmentInfo, ResultArtifact, SCHEMA_VERSION};
pub use report::{
    escape_html, ReportFormat, ReportGenerator, ReportOptions, ReportWriter, WrittenReports,
    DEFAULT_LOG_PATH, DEFAULT_REPORT_PATH,
};
