//! Suite data model
//!
//! An in-memory tree of tests, user keyword definitions and library imports.
//! Building never touches the filesystem and never resolves keyword names;
//! resolution is left to the executor.

use std::fmt;

use thiserror::Error;

use crate::keywords::normalize_name;
use crate::models::variable;

/// Errors raised while building a suite
///
/// A failed build operation never mutates the suite.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("{kind} '{name}' already exists in suite '{suite}'")]
    DuplicateName {
        kind: NameKind,
        name: String,
        suite: String,
    },

    #[error("{0} name cannot be empty")]
    EmptyName(NameKind),

    #[error("Invalid variable '{0}': expected scalar syntax like '${{name}}'")]
    InvalidVariable(String),

    #[error("Parameter '{param}' is declared more than once in keyword '{keyword}'")]
    DuplicateParameter { keyword: String, param: String },

    #[error("Non-default parameter '{param}' follows a default parameter in keyword '{keyword}'")]
    NonDefaultAfterDefault { keyword: String, param: String },
}

/// What kind of named item a build error refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameKind {
    Test,
    Keyword,
    Library,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameKind::Test => write!(f, "Test"),
            NameKind::Keyword => write!(f, "Keyword"),
            NameKind::Library => write!(f, "Library"),
        }
    }
}

/// A single keyword invocation inside a test or keyword body
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordCall {
    pub name: String,
    pub args: Vec<String>,
    pub assign: Vec<String>,
}

impl KeywordCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            assign: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn assign<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assign.extend(targets.into_iter().map(Into::into));
        self
    }

    /// Check the call and normalize its assignment targets
    fn validated(mut self) -> Result<Self, BuildError> {
        if self.name.trim().is_empty() {
            return Err(BuildError::EmptyName(NameKind::Keyword));
        }
        self.assign = self
            .assign
            .iter()
            .map(|target| {
                variable::assignment_target(target)
                    .ok_or_else(|| BuildError::InvalidVariable(target.clone()))
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }
}

impl fmt::Display for KeywordCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for target in &self.assign {
            write!(f, "{target}=    ")?;
        }
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, "    {arg}")?;
        }
        Ok(())
    }
}

/// Ordered sequence of keyword calls
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Body {
    calls: Vec<KeywordCall>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call to `name` with positional arguments
    pub fn add_keyword<I, S>(
        &mut self,
        name: impl Into<String>,
        args: I,
    ) -> Result<&mut KeywordCall, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(KeywordCall::new(name).args(args))
    }

    /// Append a call whose return value is captured into `assign`
    pub fn add_keyword_with_assign<I, S, A, T>(
        &mut self,
        name: impl Into<String>,
        args: I,
        assign: A,
    ) -> Result<&mut KeywordCall, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        A: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.push(KeywordCall::new(name).args(args).assign(assign))
    }

    /// Append a prepared call
    pub fn push(&mut self, call: KeywordCall) -> Result<&mut KeywordCall, BuildError> {
        let call = call.validated()?;
        self.calls.push(call);
        let last = self.calls.len() - 1;
        Ok(&mut self.calls[last])
    }

    pub fn calls(&self) -> &[KeywordCall] {
        &self.calls
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeywordCall> {
        self.calls.iter()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

impl<'a> IntoIterator for &'a Body {
    type Item = &'a KeywordCall;
    type IntoIter = std::slice::Iter<'a, KeywordCall>;

    fn into_iter(self) -> Self::IntoIter {
        self.calls.iter()
    }
}

/// Anything that owns a keyword body
pub trait BodyOwner {
    fn body(&self) -> &Body;
    fn body_mut(&mut self) -> &mut Body;
}

/// A test case
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Test {
    name: String,
    pub doc: Option<String>,
    pub tags: Vec<String>,
    pub body: Body,
}

impl Test {
    fn new(name: String) -> Self {
        Self {
            name,
            doc: None,
            tags: Vec::new(),
            body: Body::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_doc(&mut self, doc: impl Into<String>) -> &mut Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        let tag = tag.into();
        if !self.tags.iter().any(|t| normalize_name(t) == normalize_name(&tag)) {
            self.tags.push(tag);
        }
        self
    }
}

impl BodyOwner for Test {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

/// A formal parameter of a user keyword
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    /// Placeholder, e.g. `${ip}`
    pub name: String,
    /// Default value expression, may reference earlier parameters
    pub default: Option<String>,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.default {
            Some(default) => write!(f, "{}={}", self.name, default),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A reusable keyword defined inside the suite
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordDefinition {
    name: String,
    params: Vec<Parameter>,
    returns: Vec<String>,
    pub doc: Option<String>,
    pub body: Body,
}

impl KeywordDefinition {
    fn new(name: String, params: Vec<Parameter>) -> Self {
        Self {
            name,
            params,
            returns: Vec::new(),
            doc: None,
            body: Body::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn returns(&self) -> &[String] {
        &self.returns
    }

    /// Declare value expressions handed back to the caller after the body runs
    pub fn set_returns<I, S>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returns = values.into_iter().map(Into::into).collect();
        self
    }

    /// Number of arguments accepted, as (minimum, maximum)
    pub fn arity(&self) -> (usize, usize) {
        let required = self.params.iter().filter(|p| p.default.is_none()).count();
        (required, self.params.len())
    }
}

impl BodyOwner for KeywordDefinition {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

/// A library made available to the suite
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceImport {
    pub library: String,
}

/// Top-level suite
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suite {
    name: String,
    pub doc: Option<String>,
    imports: Vec<ResourceImport>,
    keywords: Vec<KeywordDefinition>,
    tests: Vec<Test>,
}

impl Suite {
    /// Create an empty suite
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            imports: Vec::new(),
            keywords: Vec::new(),
            tests: Vec::new(),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a new test; names are compared after normalization
    pub fn add_test(&mut self, name: impl Into<String>) -> Result<&mut Test, BuildError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BuildError::EmptyName(NameKind::Test));
        }
        if self.test(&name).is_some() {
            return Err(BuildError::DuplicateName {
                kind: NameKind::Test,
                name,
                suite: self.name.clone(),
            });
        }

        self.tests.push(Test::new(name));
        let last = self.tests.len() - 1;
        Ok(&mut self.tests[last])
    }

    /// Import a keyword library by name; importing the same library twice is a no-op
    pub fn add_library_import(&mut self, library: impl Into<String>) -> Result<(), BuildError> {
        let library = library.into();
        if library.trim().is_empty() {
            return Err(BuildError::EmptyName(NameKind::Library));
        }
        let normalized = normalize_name(&library);
        if !self
            .imports
            .iter()
            .any(|i| normalize_name(&i.library) == normalized)
        {
            self.imports.push(ResourceImport { library });
        }
        Ok(())
    }

    /// Define a reusable keyword with formal parameters like `${ip}` or `${count}=1`
    pub fn define_keyword<I, S>(
        &mut self,
        name: impl Into<String>,
        params: I,
    ) -> Result<&mut KeywordDefinition, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BuildError::EmptyName(NameKind::Keyword));
        }
        if self.keyword(&name).is_some() {
            return Err(BuildError::DuplicateName {
                kind: NameKind::Keyword,
                name,
                suite: self.name.clone(),
            });
        }

        let params = parse_parameters(&name, params)?;
        self.keywords.push(KeywordDefinition::new(name, params));
        let last = self.keywords.len() - 1;
        Ok(&mut self.keywords[last])
    }

    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    pub fn keywords(&self) -> &[KeywordDefinition] {
        &self.keywords
    }

    pub fn imports(&self) -> &[ResourceImport] {
        &self.imports
    }

    /// Look up a test by normalized name
    pub fn test(&self, name: &str) -> Option<&Test> {
        let normalized = normalize_name(name);
        self.tests.iter().find(|t| normalize_name(&t.name) == normalized)
    }

    pub fn test_mut(&mut self, name: &str) -> Option<&mut Test> {
        let normalized = normalize_name(name);
        self.tests
            .iter_mut()
            .find(|t| normalize_name(&t.name) == normalized)
    }

    /// Look up a user keyword by normalized name
    pub fn keyword(&self, name: &str) -> Option<&KeywordDefinition> {
        let normalized = normalize_name(name);
        self.keywords
            .iter()
            .find(|k| normalize_name(&k.name) == normalized)
    }
}

fn parse_parameters<I, S>(keyword: &str, params: I) -> Result<Vec<Parameter>, BuildError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut parsed: Vec<Parameter> = Vec::new();

    for raw in params {
        let raw = raw.into();
        let (name, default) = variable::split_parameter(&raw);
        if !variable::is_scalar(name) {
            return Err(BuildError::InvalidVariable(raw.clone()));
        }
        if parsed
            .iter()
            .any(|p| normalize_name(&p.name) == normalize_name(name))
        {
            return Err(BuildError::DuplicateParameter {
                keyword: keyword.to_string(),
                param: name.to_string(),
            });
        }
        if default.is_none() && parsed.iter().any(|p| p.default.is_some()) {
            return Err(BuildError::NonDefaultAfterDefault {
                keyword: keyword.to_string(),
                param: name.to_string(),
            });
        }
        parsed.push(Parameter {
            name: name.to_string(),
            default: default.map(str::to_string),
        });
    }

    Ok(parsed)
}
