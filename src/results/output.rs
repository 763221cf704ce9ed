//! Result artifact storage
//!
//! The artifact is the machine-readable record of one suite run, stored as
//! pretty-printed JSON. Reports are always rendered from an artifact.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

use crate::models::SuiteResult;

/// Artifact format version written by this build
pub const SCHEMA_VERSION: &str = "1";

/// Stored suite run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultArtifact {
    pub schema_version: String,

    /// Tool name and version that produced the artifact
    pub generator: String,

    pub generated_at: DateTime<Utc>,

    pub environment: EnvironmentInfo,

    pub suite: SuiteResult,
}

/// Where the run happened
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub os: String,
    pub arch: String,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

impl ResultArtifact {
    pub fn new(suite: SuiteResult) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generator: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            generated_at: Utc::now(),
            environment: EnvironmentInfo::default(),
            suite,
        }
    }
}

/// Write `suite` as an artifact at `path`, creating parent directories
pub fn write_artifact(path: &Path, suite: &SuiteResult) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let artifact = ResultArtifact::new(suite.clone());
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &artifact).context("Failed to write output")?;

    info!("Saved results to {}", path.display());
    Ok(())
}

/// Load an artifact, rejecting unknown schema versions
pub fn read_artifact(path: &Path) -> Result<ResultArtifact> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open output file {}", path.display()))?;
    let reader = BufReader::new(file);
    let artifact: ResultArtifact =
        serde_json::from_reader(reader).context("Failed to parse output")?;

    if artifact.schema_version != SCHEMA_VERSION {
        bail!(
            "Unsupported output schema version '{}' in {} (expected '{}')",
            artifact.schema_version,
            path.display(),
            SCHEMA_VERSION
        );
    }

    debug!("Loaded results from {}", path.display());
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use tempfile::tempdir;

    fn empty_suite() -> SuiteResult {
        let now = Utc::now();
        SuiteResult::new("Empty", now, now, Vec::new())
    }

    #[test]
    fn test_empty_suite_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output").join("run-output.json");

        write_artifact(&path, &empty_suite()).unwrap();
        let artifact = read_artifact(&path).unwrap();

        assert_eq!(artifact.schema_version, SCHEMA_VERSION);
        assert!(artifact.generator.starts_with("dynamic-suite"));
        assert_eq!(artifact.suite.name, "Empty");
        assert_eq!(artifact.suite.status, Status::Skip);
        assert!(artifact.suite.tests.is_empty());
    }

    #[test]
    fn test_rejects_unknown_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("old.json");

        let mut artifact = ResultArtifact::new(empty_suite());
        artifact.schema_version = "0".to_string();
        fs::write(&path, serde_json::to_string(&artifact).unwrap()).unwrap();

        let err = read_artifact(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported output schema version"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(read_artifact(&dir.path().join("missing.json")).is_err());
    }
}
