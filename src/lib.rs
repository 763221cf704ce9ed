//! Dynamic Suite - build keyword-driven test suites in code
//!
//! A suite is built in memory (tests, keyword calls, suite keywords and
//! library imports), run against keyword libraries, and recorded as a JSON
//! result artifact from which an HTML report and log are rendered.
//!
//! ```no_run
//! use dynamic_suite::executor::{RunOptions, SuiteRunner};
//! use dynamic_suite::keywords::LibraryRegistry;
//! use dynamic_suite::models::{BodyOwner, Suite};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let mut suite = Suite::new("My Very Simple Test Suite");
//! suite
//!     .add_test("Taco Time")?
//!     .body_mut()
//!     .add_keyword("Log", ["Fish tacos are the best tacos."])?;
//!
//! let runner = SuiteRunner::new(LibraryRegistry::standard(), RunOptions::new("output.json"));
//! let result = runner.run_and_write(&suite).await?;
//! assert_eq!(result.statistics.total, 1);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod executor;
pub mod generate;
pub mod keywords;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod results;
pub mod tutorials;
pub mod utils;
