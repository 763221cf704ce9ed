//! Suite execution engine
//!
//! Provides sequential and parallel test execution, keyword resolution and
//! variable scopes.

mod parallel;
mod resolver;
mod runner;
pub mod variables;

pub use parallel::ParallelExecutor;
pub use resolver::{Invocable, KeywordResolver};
pub use runner::{RunOptions, SuiteRunner, DEFAULT_MAX_CONCURRENT, MAX_KEYWORD_DEPTH};
pub use variables::VariableScope;
