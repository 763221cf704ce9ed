//! Data models
//!
//! The suite tree that callers build and the result tree that execution
//! produces.

mod suite;
mod test_result;
pub mod variable;

pub use suite::{
    Body, BodyOwner, BuildError, KeywordCall, KeywordDefinition, NameKind, Parameter,
    ResourceImport, Suite, Test,
};
pub use test_result::{
    KeywordResult, LogMessage, Statistics, Status, StatusCounts, SuiteResult, TestResult,
};
