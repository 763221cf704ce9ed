//! Runnable walkthroughs of programmatic suite building
//!
//! Each tutorial builds one suite in memory and names where its output,
//! report and log go. They progress from a single logged message to
//! generated tests that call a suite-defined keyword.

use std::path::Path;

use anyhow::{Context, Result};
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::info;

use crate::executor::RunOptions;
use crate::generate::{default_servers, CheckStyle, ConnectivitySuite};
use crate::keywords::LibraryRegistry;
use crate::models::{BodyOwner, BuildError, Suite};
use crate::pipeline::{run_pipeline, ArtifactPaths, PipelineOutcome};
use crate::results::ReportOptions;

pub const TACO_SUITE_NAME: &str = "My Very Simple Test Suite";
pub const TACO_TYPES: &[&str] = &["Fish", "Chicken", "Vegetarian"];

/// A named, runnable example
#[derive(Clone, Copy, Debug)]
pub struct Tutorial {
    pub id: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    build: fn() -> Result<Suite, BuildError>,
    paths: fn() -> ArtifactPaths,
}

impl Tutorial {
    pub fn build(&self) -> Result<Suite, BuildError> {
        (self.build)()
    }

    /// Output paths relative to the run's base directory
    pub fn paths(&self) -> ArtifactPaths {
        (self.paths)()
    }
}

static TUTORIALS: [Tutorial; 6] = [
    Tutorial {
        id: "01-core-concept",
        title: "Core concept",
        summary: "Build a suite with one test that logs a message, run it, write report and log",
        build: core_concept,
        paths: core_concept_paths,
    },
    Tutorial {
        id: "02-organized-output",
        title: "Organized output",
        summary: "Same suite, with every artifact under one output prefix",
        build: core_concept,
        paths: organized_output_paths,
    },
    Tutorial {
        id: "03-dynamic-test-args",
        title: "Dynamic test arguments",
        summary: "Pick the logged taco type at random when the suite is built",
        build: dynamic_test_args,
        paths: dynamic_test_args_paths,
    },
    Tutorial {
        id: "04-dynamic-tests",
        title: "Dynamic tests",
        summary: "Generate one test per server group and one log call per address",
        build: dynamic_tests,
        paths: dynamic_tests_paths,
    },
    Tutorial {
        id: "05-import-resources",
        title: "Import resources",
        summary: "Import OperatingSystem and ping every address inline",
        build: import_resources,
        paths: import_resources_paths,
    },
    Tutorial {
        id: "06-create-keyword",
        title: "Create a keyword",
        summary: "Define 'Test Connection To' once and call it per address",
        build: create_keyword,
        paths: create_keyword_paths,
    },
];

/// Every tutorial, in order
pub fn all() -> &'static [Tutorial] {
    &TUTORIALS
}

/// Look up a tutorial by full id or by its number (`4`, `04`)
pub fn find(id: &str) -> Option<&'static Tutorial> {
    let id = id.trim().to_lowercase();
    TUTORIALS.iter().find(|t| {
        t.id == id
            || t
                .id
                .split('-')
                .next()
                .and_then(|n| n.parse::<u32>().ok())
                .is_some_and(|n| id.parse::<u32>().ok() == Some(n))
    })
}

/// Build, run and report one tutorial with paths resolved against `base_dir`
pub async fn run_tutorial(
    tutorial: &Tutorial,
    base_dir: &Path,
    registry: LibraryRegistry,
    options: &RunOptions,
) -> Result<PipelineOutcome> {
    info!("Running tutorial {} - {}", tutorial.id, tutorial.title);
    let suite = tutorial
        .build()
        .with_context(|| format!("Failed to build tutorial {}", tutorial.id))?;
    let paths = tutorial.paths().in_dir(base_dir);
    run_pipeline(&suite, &paths, registry, options).await
}

fn taco_suite(taco: &str) -> Result<Suite, BuildError> {
    let mut suite = Suite::new(TACO_SUITE_NAME);
    suite
        .add_test("Taco Time")?
        .body_mut()
        .add_keyword("Log", [format!("{taco} tacos are the best tacos.")])?;
    Ok(suite)
}

fn core_concept() -> Result<Suite, BuildError> {
    taco_suite("Fish")
}

fn core_concept_paths() -> ArtifactPaths {
    ArtifactPaths::new("01-core-concept-run-output.json", ReportOptions::default())
}

fn organized_output_paths() -> ArtifactPaths {
    ArtifactPaths::prefixed("output/02-organized-output-suite-run")
}

fn dynamic_test_args() -> Result<Suite, BuildError> {
    dynamic_test_args_with(&mut rand::rng())
}

/// Taco suite with the taco type drawn from `rng`
pub fn dynamic_test_args_with<R: Rng + ?Sized>(rng: &mut R) -> Result<Suite, BuildError> {
    let taco = TACO_TYPES.choose(rng).copied().unwrap_or(TACO_TYPES[0]);
    taco_suite(taco)
}

fn dynamic_test_args_paths() -> ArtifactPaths {
    ArtifactPaths::prefixed("output/03-dynamic-test-args")
}

fn connectivity(style: CheckStyle) -> Result<Suite, BuildError> {
    ConnectivitySuite::default()
        .style(style)
        .build(&default_servers())
}

fn dynamic_tests() -> Result<Suite, BuildError> {
    connectivity(CheckStyle::Log)
}

fn dynamic_tests_paths() -> ArtifactPaths {
    ArtifactPaths::prefixed("output/04-dynamic-tests")
}

fn import_resources() -> Result<Suite, BuildError> {
    connectivity(CheckStyle::Inline)
}

fn import_resources_paths() -> ArtifactPaths {
    ArtifactPaths::prefixed("output/05-import-resources")
}

fn create_keyword() -> Result<Suite, BuildError> {
    connectivity(CheckStyle::Keyword)
}

fn create_keyword_paths() -> ArtifactPaths {
    ArtifactPaths::prefixed("output/06-create-keyword")
}
