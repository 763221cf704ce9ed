//! Suite execution runner
//!
//! Runs a built suite against a library registry and produces a
//! `SuiteResult`. Keyword failures are recorded in the result tree and never
//! abort the run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use futures::future::BoxFuture;
use tracing::{debug, error, info};

use super::parallel::ParallelExecutor;
use super::resolver::{Invocable, KeywordResolver};
use super::variables::VariableScope;
use crate::keywords::{KeywordContext, KeywordError, Library, LibraryRegistry, ReturnValue};
use crate::models::{
    KeywordCall, KeywordDefinition, KeywordResult, LogMessage, Status, Suite, SuiteResult, Test,
    TestResult,
};
use crate::results::write_artifact;
use crate::utils::{LogLevel, Timer};

/// Maximum number of nested keywords started at once
pub const MAX_KEYWORD_DEPTH: usize = 100;

/// Default concurrency for parallel runs
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// How a suite run is carried out and where its artifact goes
#[derive(Clone, Debug, PartialEq)]
pub struct RunOptions {
    pub output: PathBuf,
    pub parallel: bool,
    pub max_concurrent: usize,
    pub keyword_timeout: Option<Duration>,
}

impl RunOptions {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            parallel: false,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            keyword_timeout: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Run tests concurrently, at most `max_concurrent` at a time
    pub fn with_parallel(mut self, max_concurrent: usize) -> Self {
        self.parallel = true;
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_keyword_timeout(mut self, timeout: Duration) -> Self {
        self.keyword_timeout = Some(timeout);
        self
    }
}

/// Runs suites
pub struct SuiteRunner {
    registry: LibraryRegistry,
    options: RunOptions,
}

impl SuiteRunner {
    pub fn new(registry: LibraryRegistry, options: RunOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run every test in the suite
    pub async fn run(&self, suite: &Suite) -> SuiteResult {
        let timer = Timer::start(format!("suite '{}'", suite.name()));
        let start_time = Utc::now();
        info!(
            "Starting suite '{}' with {} tests",
            suite.name(),
            suite.test_count()
        );

        let (resolver, import_errors) = KeywordResolver::new(suite, &self.registry);
        let mut errors: Vec<LogMessage> = import_errors
            .into_iter()
            .map(|message| {
                error!("{}", message);
                LogMessage::new(LogLevel::Error, message)
            })
            .collect();

        let execution = Execution {
            resolver,
            keyword_timeout: self.options.keyword_timeout,
        };

        let tests = if self.options.parallel && suite.test_count() > 1 {
            ParallelExecutor::new(self.options.max_concurrent)
                .run_tests(&execution, suite.tests())
                .await
        } else {
            let mut results = Vec::with_capacity(suite.test_count());
            for test in suite.tests() {
                let result = execution.run_test(test).await;
                info!("  {}", result);
                results.push(result);
            }
            results
        };

        for test in &tests {
            for keyword in &test.keywords {
                keyword.walk(&mut |k: &KeywordResult| {
                    errors.extend(k.messages.iter().filter(|m| m.level.is_problem()).cloned());
                });
            }
        }

        let result = SuiteResult::new(suite.name(), start_time, Utc::now(), tests)
            .with_doc(suite.doc.clone())
            .with_errors(errors);

        timer.stop();
        info!(
            "Suite '{}' finished: {} - Pass: {}/{} ({:.1}%)",
            result.name,
            result.status,
            result.statistics.passed,
            result.statistics.total,
            result.statistics.pass_rate()
        );

        result
    }

    /// Run the suite and write the result artifact to the configured output
    pub async fn run_and_write(&self, suite: &Suite) -> Result<SuiteResult> {
        let result = self.run(suite).await;
        write_artifact(&self.options.output, &result)?;
        Ok(result)
    }

    pub fn output(&self) -> &Path {
        &self.options.output
    }
}

/// State shared by every test of one run
pub(crate) struct Execution<'a> {
    resolver: KeywordResolver<'a>,
    keyword_timeout: Option<Duration>,
}

impl<'a> Execution<'a> {
    pub(crate) async fn run_test(&self, test: &'a Test) -> TestResult {
        let timer = Timer::start(format!("test '{}'", test.name()));
        let start_time = Utc::now();
        debug!("Starting test '{}'", test.name());

        let mut scope = VariableScope::new(self.resolver.suite_name(), Some(test.name()));
        let mut keywords = Vec::with_capacity(test.body.len());
        let mut status = Status::Pass;
        let mut message = None;

        if test.body.is_empty() {
            status = Status::Fail;
            message = Some("Test cannot be empty.".to_string());
        }

        for call in &test.body {
            if status != Status::Pass {
                keywords.push(KeywordResult::not_run(&call.name, &call.args, &call.assign));
                continue;
            }

            let result = self.run_call(call, &mut scope, 0).await;
            if matches!(result.status, Status::Fail | Status::Skip) {
                status = result.status;
                message = result.message.clone();
            }
            keywords.push(result);
        }

        TestResult {
            name: test.name().to_string(),
            doc: test.doc.clone(),
            tags: test.tags.clone(),
            status,
            message,
            start_time,
            end_time: Utc::now(),
            elapsed_ms: timer.stop(),
            keywords,
        }
    }

    fn run_call<'b>(
        &'b self,
        call: &'b KeywordCall,
        scope: &'b mut VariableScope,
        depth: usize,
    ) -> BoxFuture<'b, KeywordResult>
    where
        'a: 'b,
    {
        Box::pin(async move {
            let timer = Timer::start(call.name.clone());
            let start_time = Utc::now();
            let mut ctx = KeywordContext::new();
            let mut children = Vec::new();

            let (owner, outcome) = self
                .invoke(call, scope, depth, &mut ctx, &mut children)
                .await;

            let (status, message) = match outcome {
                Ok(()) => (Status::Pass, None),
                Err(e) if e.is_skip() => (Status::Skip, Some(e.to_string())),
                Err(e) => {
                    debug!("Keyword '{}' failed: {}", call.name, e);
                    (Status::Fail, Some(e.to_string()))
                }
            };

            KeywordResult {
                name: call.name.clone(),
                owner,
                args: call.args.clone(),
                assign: call.assign.clone(),
                status,
                message,
                messages: ctx.into_messages(),
                start_time: Some(start_time),
                elapsed_ms: timer.stop(),
                children,
            }
        })
    }

    /// Resolve and run one call; returns the owner it resolved to
    async fn invoke(
        &self,
        call: &KeywordCall,
        scope: &mut VariableScope,
        depth: usize,
        ctx: &mut KeywordContext,
        children: &mut Vec<KeywordResult>,
    ) -> (Option<String>, Result<(), KeywordError>) {
        if depth >= MAX_KEYWORD_DEPTH {
            return (None, Err(KeywordError::RecursionLimit));
        }

        let invocable = match scope
            .replace(&call.name)
            .and_then(|name| self.resolver.resolve(&name))
        {
            Ok(invocable) => invocable,
            Err(e) => return (None, Err(e)),
        };

        let owner = invocable.owner(self.resolver.suite_name()).to_string();
        let outcome = self
            .execute(invocable, call, scope, depth, ctx, children)
            .await;
        (Some(owner), outcome)
    }

    async fn execute(
        &self,
        invocable: Invocable<'a>,
        call: &KeywordCall,
        scope: &mut VariableScope,
        depth: usize,
        ctx: &mut KeywordContext,
        children: &mut Vec<KeywordResult>,
    ) -> Result<(), KeywordError> {
        let args = call
            .args
            .iter()
            .map(|arg| scope.replace(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let value = match invocable {
            Invocable::Library { library, keyword } => {
                self.run_library_keyword(library.as_ref(), &keyword, &args, ctx)
                    .await?
            }
            Invocable::User(definition) => {
                self.run_user_keyword(definition, args, scope, depth, children)
                    .await?
            }
        };

        if !call.assign.is_empty() {
            ctx.info(format!("{} = {}", call.assign.join(", "), value));
        }
        scope.assign(&call.assign, value)
    }

    async fn run_library_keyword(
        &self,
        library: &dyn Library,
        keyword: &str,
        args: &[String],
        ctx: &mut KeywordContext,
    ) -> Result<ReturnValue, KeywordError> {
        match self.keyword_timeout {
            Some(limit) => tokio::time::timeout(limit, library.run_keyword(keyword, args, ctx))
                .await
                .map_err(|_| KeywordError::Timeout(limit.as_secs_f64()))?,
            None => library.run_keyword(keyword, args, ctx).await,
        }
    }

    async fn run_user_keyword(
        &self,
        definition: &'a KeywordDefinition,
        args: Vec<String>,
        caller: &VariableScope,
        depth: usize,
        children: &mut Vec<KeywordResult>,
    ) -> Result<ReturnValue, KeywordError> {
        let (min, max) = definition.arity();
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min} to {max}")
            };
            return Err(KeywordError::ArgumentCount {
                keyword: definition.name().to_string(),
                expected,
                got: args.len(),
            });
        }

        if definition.body.is_empty() {
            return Err(KeywordError::Failed(
                "User keyword cannot be empty.".to_string(),
            ));
        }

        let mut local = caller.child();
        let mut args = args.into_iter();
        for param in definition.params() {
            let value = match args.next() {
                Some(value) => value,
                None => local.replace(param.default.as_deref().unwrap_or_default())?,
            };
            local.set(&param.name, value)?;
        }

        let mut failure = None;
        for call in &definition.body {
            if failure.is_some() {
                children.push(KeywordResult::not_run(&call.name, &call.args, &call.assign));
                continue;
            }

            let result = self.run_call(call, &mut local, depth + 1).await;
            let message = result.message.clone().unwrap_or_default();
            match result.status {
                Status::Fail => failure = Some(KeywordError::Failed(message)),
                Status::Skip => failure = Some(KeywordError::Skipped(message)),
                _ => {}
            }
            children.push(result);
        }

        if let Some(err) = failure {
            return Err(err);
        }

        match definition.returns() {
            [] => Ok(ReturnValue::None),
            [single] => Ok(ReturnValue::Scalar(local.replace(single)?)),
            many => Ok(ReturnValue::Multiple(
                many.iter()
                    .map(|value| local.replace(value))
                    .collect::<Result<_, _>>()?,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BodyOwner, StatusCounts};
    use tempfile::tempdir;

    fn runner() -> SuiteRunner {
        SuiteRunner::new(LibraryRegistry::standard(), RunOptions::new("unused.json"))
    }

    fn taco_suite() -> Suite {
        let mut suite = Suite::new("My Very Simple Test Suite");
        suite
            .add_test("Taco Time")
            .unwrap()
            .body_mut()
            .add_keyword("Log", ["Fish tacos are the best tacos."])
            .unwrap();
        suite
    }

    #[tokio::test]
    async fn test_single_log_passes() {
        let result = runner().run(&taco_suite()).await;
        assert_eq!(result.status, Status::Pass);
        assert_eq!(result.statistics.passed, 1);

        let keyword = &result.tests[0].keywords[0];
        assert_eq!(keyword.owner.as_deref(), Some("BuiltIn"));
        assert_eq!(keyword.messages[0].text, "Fish tacos are the best tacos.");
    }

    #[tokio::test]
    async fn test_empty_suite_is_skip() {
        let result = runner().run(&Suite::new("Nothing")).await;
        assert_eq!(result.status, Status::Skip);
        assert_eq!(result.statistics.total, 0);
    }

    #[tokio::test]
    async fn test_empty_test_fails() {
        let mut suite = Suite::new("Suite");
        suite.add_test("Empty").unwrap();
        let result = runner().run(&suite).await;
        assert_eq!(result.tests[0].status, Status::Fail);
        assert_eq!(
            result.tests[0].message.as_deref(),
            Some("Test cannot be empty.")
        );
    }

    #[tokio::test]
    async fn test_first_failure_marks_rest_not_run() {
        let mut suite = Suite::new("Suite");
        let body = suite.add_test("Failing").unwrap().body_mut();
        body.add_keyword("Log", ["before"]).unwrap();
        body.add_keyword("Fail", ["boom"]).unwrap();
        body.add_keyword("Log", ["after"]).unwrap();

        let result = runner().run(&suite).await;
        let test = &result.tests[0];
        assert_eq!(test.status, Status::Fail);
        assert_eq!(test.message.as_deref(), Some("boom"));
        let statuses: Vec<Status> = test.keywords.iter().map(|k| k.status).collect();
        assert_eq!(statuses, vec![Status::Pass, Status::Fail, Status::NotRun]);
        assert_eq!(result.status, Status::Fail);
    }

    #[tokio::test]
    async fn test_skip_marks_test_skipped() {
        let mut suite = Suite::new("Suite");
        suite
            .add_test("Later")
            .unwrap()
            .body_mut()
            .add_keyword("Skip", ["not ready"])
            .unwrap();
        let result = runner().run(&suite).await;
        assert_eq!(result.tests[0].status, Status::Skip);
        assert_eq!(result.status, Status::Skip);
    }

    #[tokio::test]
    async fn test_unbound_variable_fails_at_run_time() {
        let mut suite = Suite::new("Suite");
        suite
            .add_test("Unbound")
            .unwrap()
            .body_mut()
            .add_keyword("Log", ["${ip}"])
            .unwrap();
        let result = runner().run(&suite).await;
        assert_eq!(
            result.tests[0].message.as_deref(),
            Some("Variable '${ip}' not found.")
        );
    }

    #[tokio::test]
    async fn test_unknown_keyword_and_import() {
        let mut suite = Suite::new("Suite");
        suite.add_library_import("Collections").unwrap();
        suite
            .add_test("Missing")
            .unwrap()
            .body_mut()
            .add_keyword("Append To List", ["x"])
            .unwrap();

        let result = runner().run(&suite).await;
        assert_eq!(
            result.tests[0].message.as_deref(),
            Some("No keyword with name 'Append To List' found.")
        );
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].text.contains("Collections"));
    }

    #[tokio::test]
    async fn test_user_keyword_defaults_and_returns() {
        let mut suite = Suite::new("Suite");
        let keyword = suite
            .define_keyword("Make Greeting", ["${name}", "${greeting}=Hello"])
            .unwrap();
        keyword
            .body
            .add_keyword_with_assign("Catenate", ["${greeting}", "${name}"], ["${text}"])
            .unwrap();
        keyword.set_returns(["${text}"]);

        let body = suite.add_test("Greets").unwrap().body_mut();
        body.add_keyword_with_assign("Make Greeting", ["World"], ["${a}"])
            .unwrap();
        body.add_keyword_with_assign("Make Greeting", ["World", "Bye"], ["${b}"])
            .unwrap();
        body.add_keyword("Should Be Equal", ["${a}", "Hello World"])
            .unwrap();
        body.add_keyword("Should Be Equal", ["${b}", "Bye World"])
            .unwrap();
        body.add_keyword("Make Greeting", Vec::<String>::new()).unwrap();

        let result = runner().run(&suite).await;
        let test = &result.tests[0];
        let statuses: Vec<Status> = test.keywords.iter().map(|k| k.status).collect();
        assert_eq!(
            statuses,
            vec![
                Status::Pass,
                Status::Pass,
                Status::Pass,
                Status::Pass,
                Status::Fail
            ]
        );
        assert_eq!(test.keywords[0].owner.as_deref(), Some("Suite"));
        assert_eq!(test.keywords[0].children.len(), 1);
        assert_eq!(
            test.message.as_deref(),
            Some("Keyword 'Make Greeting' expected 1 to 2 arguments, got 0.")
        );
    }

    #[tokio::test]
    async fn test_user_keyword_locals_do_not_leak() {
        let mut suite = Suite::new("Suite");
        suite
            .define_keyword("Peek", Vec::<String>::new())
            .unwrap()
            .body
            .add_keyword("Log", ["${secret}"])
            .unwrap();

        let body = suite.add_test("Leak").unwrap().body_mut();
        body.add_keyword_with_assign("Set Variable", ["hidden"], ["${secret}"])
            .unwrap();
        body.add_keyword("Peek", Vec::<String>::new()).unwrap();

        let result = runner().run(&suite).await;
        assert_eq!(
            result.tests[0].message.as_deref(),
            Some("Variable '${secret}' not found.")
        );
    }

    #[tokio::test]
    async fn test_recursion_limit() {
        let mut suite = Suite::new("Suite");
        suite
            .define_keyword("Forever", Vec::<String>::new())
            .unwrap()
            .body
            .add_keyword("Forever", Vec::<String>::new())
            .unwrap();
        suite
            .add_test("Recurse")
            .unwrap()
            .body_mut()
            .add_keyword("Forever", Vec::<String>::new())
            .unwrap();

        let result = runner().run(&suite).await;
        assert_eq!(
            result.tests[0].message.as_deref(),
            Some("Maximum limit of started keywords exceeded.")
        );
    }

    #[tokio::test]
    async fn test_warnings_collected_into_errors() {
        let mut suite = Suite::new("Suite");
        suite
            .add_test("Warns")
            .unwrap()
            .body_mut()
            .add_keyword("Log", ["careful", "WARN"])
            .unwrap();
        let result = runner().run(&suite).await;
        assert_eq!(result.status, Status::Pass);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].level, LogLevel::Warn);
    }

    #[tokio::test]
    async fn test_keyword_timeout() {
        let mut suite = Suite::new("Suite");
        suite
            .add_test("Slow")
            .unwrap()
            .body_mut()
            .add_keyword("Sleep", ["2s"])
            .unwrap();

        let options =
            RunOptions::new("unused.json").with_keyword_timeout(Duration::from_millis(50));
        let result = SuiteRunner::new(LibraryRegistry::standard(), options)
            .run(&suite)
            .await;
        assert_eq!(
            result.tests[0].message.as_deref(),
            Some("Keyword timeout 0.05 seconds exceeded.")
        );
    }

    #[tokio::test]
    async fn test_parallel_keeps_suite_order() {
        let mut suite = Suite::new("Suite");
        for (name, delay) in [("First", "60ms"), ("Second", "10ms"), ("Third", "0ms")] {
            suite
                .add_test(name)
                .unwrap()
                .body_mut()
                .add_keyword("Sleep", [delay])
                .unwrap();
        }

        let options = RunOptions::new("unused.json").with_parallel(3);
        let result = SuiteRunner::new(LibraryRegistry::standard(), options)
            .run(&suite)
            .await;
        let names: Vec<&str> = result.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
        assert!(result.is_all_passed());
    }

    #[tokio::test]
    async fn test_tags_counted() {
        let mut suite = taco_suite();
        suite.test_mut("Taco Time").unwrap().add_tag("Food");
        let result = runner().run(&suite).await;
        assert_eq!(
            result.statistics.by_tag.get("food"),
            Some(&StatusCounts {
                passed: 1,
                failed: 0,
                skipped: 0
            })
        );
    }

    #[tokio::test]
    async fn test_run_and_write_creates_artifact() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("nested").join("run-output.json");
        let runner = SuiteRunner::new(LibraryRegistry::standard(), RunOptions::new(&output));

        let result = runner.run_and_write(&taco_suite()).await.unwrap();
        assert_eq!(result.status, Status::Pass);
        assert!(output.is_file());
        assert_eq!(runner.output(), output.as_path());
    }
}
