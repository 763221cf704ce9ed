//! Run a suite, write its artifact, then render the report and log

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::executor::{RunOptions, SuiteRunner};
use crate::keywords::LibraryRegistry;
use crate::models::{Suite, SuiteResult};
use crate::results::{ReportOptions, ReportWriter, WrittenReports};

/// Output locations for one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub output: PathBuf,
    pub reports: ReportOptions,
}

impl ArtifactPaths {
    pub fn new(output: impl Into<PathBuf>, reports: ReportOptions) -> Self {
        Self {
            output: output.into(),
            reports,
        }
    }

    /// `{prefix}-output.json`, `{prefix}-report.html` and `{prefix}-log.html`
    pub fn prefixed(prefix: &str) -> Self {
        Self {
            output: PathBuf::from(format!("{prefix}-output.json")),
            reports: ReportOptions::with_prefix(prefix),
        }
    }

    /// Resolve relative paths against `base`
    pub fn in_dir(self, base: &Path) -> Self {
        Self {
            output: base.join(self.output),
            reports: self.reports.in_dir(base),
        }
    }
}

/// Highest exit code a run reports; larger failure counts are capped here
pub const MAX_EXIT_CODE: usize = 250;

/// Process exit code for a run with `failed` failing tests
pub fn exit_code(failed: usize) -> i32 {
    failed.min(MAX_EXIT_CODE) as i32
}

/// Everything a pipeline run produced
#[derive(Debug)]
pub struct PipelineOutcome {
    pub result: SuiteResult,
    pub output: PathBuf,
    pub reports: WrittenReports,
}

/// Run `suite` and write every artifact named in `paths`
///
/// `options` supplies the execution settings; its output path is replaced
/// by `paths.output`.
pub async fn run_pipeline(
    suite: &Suite,
    paths: &ArtifactPaths,
    registry: LibraryRegistry,
    options: &RunOptions,
) -> Result<PipelineOutcome> {
    let options = options.clone().with_output(&paths.output);
    let result = SuiteRunner::new(registry, options)
        .run_and_write(suite)
        .await?;

    let reports = ReportWriter::new(&paths.output).write_results(&paths.reports)?;
    info!(
        "Finished '{}' with status {}",
        result.name, result.status
    );

    Ok(PipelineOutcome {
        result,
        output: paths.output.clone(),
        reports,
    })
}
