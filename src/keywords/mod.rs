//! Keyword libraries
//!
//! A library is a named collection of keywords implemented in Rust. Suites
//! make a library available by importing it by name; `BuiltIn` is always
//! available.
//!
//! Keyword, library and variable names are matched after normalization:
//! case is ignored, and so are spaces and underscores, so `Run and Return Rc`
//! and `run_and_return_rc` name the same keyword.

mod builtin;
mod operating_system;

pub use builtin::BuiltIn;
pub use operating_system::OperatingSystem;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::models::LogMessage;
use crate::utils::LogLevel;

/// Name of the library that is always in scope
pub const BUILTIN_LIBRARY: &str = "BuiltIn";

/// Normalize a keyword, library or variable name for matching
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Value returned by a keyword
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReturnValue {
    None,
    Scalar(String),
    Multiple(Vec<String>),
}

impl fmt::Display for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnValue::None => write!(f, "None"),
            ReturnValue::Scalar(value) => write!(f, "{value}"),
            ReturnValue::Multiple(values) => {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
                write!(f, "[{}]", quoted.join(", "))
            }
        }
    }
}

/// Keyword execution errors
///
/// These never abort a run; they are recorded on the keyword and the test.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeywordError {
    #[error("{0}")]
    Failed(String),

    #[error("{0}")]
    Skipped(String),

    #[error("Keyword '{keyword}' expected {expected} arguments, got {got}.")]
    ArgumentCount {
        keyword: String,
        expected: String,
        got: usize,
    },

    #[error("No keyword with name '{0}' found.")]
    NotFound(String),

    #[error("Multiple keywords with name '{name}' found. Give the full name of the keyword you want to use: {}", .candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },

    #[error("Variable '{0}' not found.")]
    VariableNotFound(String),

    #[error("Cannot set variables: {0}")]
    Assignment(String),

    #[error("Keyword timeout {0} seconds exceeded.")]
    Timeout(f64),

    #[error("Maximum limit of started keywords exceeded.")]
    RecursionLimit,
}

impl KeywordError {
    pub fn is_skip(&self) -> bool {
        matches!(self, KeywordError::Skipped(_))
    }
}

/// Per-call context handed to library keywords
#[derive(Debug, Default)]
pub struct KeywordContext {
    messages: Vec<LogMessage>,
}

impl KeywordContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a message into the result tree and mirror it to tracing
    pub fn log(&mut self, level: LogLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            LogLevel::Trace => trace!("{}", text),
            LogLevel::Debug => debug!("{}", text),
            LogLevel::Info => info!("{}", text),
            LogLevel::Warn => warn!("{}", text),
            LogLevel::Error => error!("{}", text),
        }
        self.messages.push(LogMessage::new(level, text));
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.log(LogLevel::Info, text);
    }

    pub fn messages(&self) -> &[LogMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<LogMessage> {
        self.messages
    }
}

/// A named collection of keywords
#[async_trait]
pub trait Library: Send + Sync {
    /// Name used to import the library
    fn name(&self) -> &str;

    /// Display names of every keyword the library provides
    fn keyword_names(&self) -> &[&'static str];

    /// Display name for a normalized keyword name
    fn keyword_name(&self, normalized: &str) -> Option<&'static str> {
        self.keyword_names()
            .iter()
            .copied()
            .find(|k| normalize_name(k) == normalized)
    }

    fn has_keyword(&self, normalized: &str) -> bool {
        self.keyword_name(normalized).is_some()
    }

    /// Run a keyword; `name` is already normalized and `args` already resolved
    async fn run_keyword(
        &self,
        name: &str,
        args: &[String],
        ctx: &mut KeywordContext,
    ) -> Result<ReturnValue, KeywordError>;
}

/// Check an argument count against an inclusive range
pub fn expect_args(
    keyword: &str,
    args: &[String],
    min: usize,
    max: Option<usize>,
) -> Result<(), KeywordError> {
    let too_few = args.len() < min;
    let too_many = max.is_some_and(|max| args.len() > max);
    if too_few || too_many {
        let expected = match max {
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{min} to {max}"),
            None => format!("at least {min}"),
        };
        return Err(KeywordError::ArgumentCount {
            keyword: keyword.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

/// Libraries that suites may import, keyed by normalized name
#[derive(Clone)]
pub struct LibraryRegistry {
    libraries: HashMap<String, Arc<dyn Library>>,
}

impl LibraryRegistry {
    /// Registry with no libraries at all, not even BuiltIn
    pub fn empty() -> Self {
        Self {
            libraries: HashMap::new(),
        }
    }

    /// Registry with BuiltIn and OperatingSystem
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(BuiltIn));
        registry.register(Arc::new(OperatingSystem));
        registry
    }

    /// Register a library, returning any library it replaced
    pub fn register(&mut self, library: Arc<dyn Library>) -> Option<Arc<dyn Library>> {
        self.libraries
            .insert(normalize_name(library.name()), library)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Library>> {
        self.libraries.get(&normalize_name(name)).cloned()
    }

    pub fn builtin(&self) -> Option<Arc<dyn Library>> {
        self.get(BUILTIN_LIBRARY)
    }

    /// Library names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .libraries
            .values()
            .map(|l| l.name().to_string())
            .collect();
        names.sort();
        names
    }
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for LibraryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryRegistry")
            .field("libraries", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Run and Return Rc"), "runandreturnrc");
        assert_eq!(normalize_name("run_and_return_rc"), "runandreturnrc");
        assert_eq!(normalize_name("OperatingSystem.Run"), "operatingsystem.run");
    }

    #[test]
    fn test_return_value_display() {
        assert_eq!(ReturnValue::None.to_string(), "None");
        assert_eq!(ReturnValue::Scalar("0".into()).to_string(), "0");
        assert_eq!(
            ReturnValue::Multiple(vec!["0".into(), "ok".into()]).to_string(),
            "['0', 'ok']"
        );
    }

    #[test]
    fn test_expect_args() {
        let args = vec!["a".to_string(), "b".to_string()];
        assert!(expect_args("Kw", &args, 1, Some(2)).is_ok());
        assert!(expect_args("Kw", &args, 0, None).is_ok());

        let err = expect_args("Kw", &args, 1, Some(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Keyword 'Kw' expected 1 arguments, got 2."
        );
        let err = expect_args("Kw", &args, 3, None).unwrap_err();
        assert!(err.to_string().contains("at least 3"));
    }

    #[test]
    fn test_standard_registry() {
        let registry = LibraryRegistry::standard();
        assert_eq!(registry.names(), vec!["BuiltIn", "OperatingSystem"]);
        assert!(registry.get("operating system").is_some());
        assert!(registry.builtin().is_some());
        assert!(registry.get("Collections").is_none());
        assert!(LibraryRegistry::empty().builtin().is_none());
    }

    #[test]
    fn test_ambiguous_message() {
        let err = KeywordError::Ambiguous {
            name: "Run".into(),
            candidates: vec!["A.Run".into(), "B.Run".into()],
        };
        assert!(err.to_string().ends_with("A.Run, B.Run"));
    }

    #[test]
    fn test_context_collects_messages() {
        let mut ctx = KeywordContext::new();
        ctx.info("hello");
        ctx.log(LogLevel::Warn, "careful");
        assert_eq!(ctx.messages().len(), 2);
        assert_eq!(ctx.messages()[1].level, LogLevel::Warn);
    }
}
