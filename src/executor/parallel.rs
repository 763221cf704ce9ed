//! Parallel test execution
//!
//! Runs the tests of one suite concurrently inside the calling task. A
//! semaphore bounds how many tests are in flight.

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::runner::Execution;
use crate::models::{Test, TestResult};

/// Parallel test executor
#[derive(Clone, Copy, Debug)]
pub struct ParallelExecutor {
    max_concurrent: usize,
}

impl ParallelExecutor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run `tests` concurrently; results keep the order of `tests`
    pub(crate) async fn run_tests<'a>(
        &self,
        execution: &Execution<'a>,
        tests: &'a [Test],
    ) -> Vec<TestResult> {
        info!(
            "Running {} tests in parallel (max {} concurrent)",
            tests.len(),
            self.max_concurrent
        );

        let semaphore = Semaphore::new(self.max_concurrent);
        let runs = tests.iter().map(|test| {
            let semaphore = &semaphore;
            async move {
                // The semaphore is never closed, so acquiring only waits
                let _permit = semaphore.acquire().await.ok();
                debug!("Starting parallel execution of '{}'", test.name());
                let result = execution.run_test(test).await;
                info!("  {}", result);
                result
            }
        });

        join_all(runs).await
    }
}
