//! BuiltIn keyword library
//!
//! Logging, assertions and small conversions. Always in scope.

use std::time::Duration;

use async_trait::async_trait;

use super::{expect_args, KeywordContext, KeywordError, Library, ReturnValue, BUILTIN_LIBRARY};
use crate::utils::LogLevel;

const KEYWORDS: &[&str] = &[
    "Log",
    "Log Many",
    "No Operation",
    "Fail",
    "Skip",
    "Should Be Equal",
    "Should Not Be Equal",
    "Should Be Equal As Integers",
    "Should Be Equal As Strings",
    "Should Contain",
    "Should Not Contain",
    "Set Variable",
    "Catenate",
    "Convert To Integer",
    "Sleep",
];

/// The always-available standard library
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltIn;

#[async_trait]
impl Library for BuiltIn {
    fn name(&self) -> &str {
        BUILTIN_LIBRARY
    }

    fn keyword_names(&self) -> &[&'static str] {
        KEYWORDS
    }

    async fn run_keyword(
        &self,
        name: &str,
        args: &[String],
        ctx: &mut KeywordContext,
    ) -> Result<ReturnValue, KeywordError> {
        match name {
            "log" => {
                expect_args("Log", args, 1, Some(2))?;
                let level = match args.get(1) {
                    Some(raw) => parse_level(raw)?,
                    None => LogLevel::Info,
                };
                ctx.log(level, args[0].clone());
                Ok(ReturnValue::None)
            }
            "logmany" => {
                for message in args {
                    ctx.info(message.clone());
                }
                Ok(ReturnValue::None)
            }
            "nooperation" => {
                expect_args("No Operation", args, 0, Some(0))?;
                Ok(ReturnValue::None)
            }
            "fail" => {
                expect_args("Fail", args, 0, Some(1))?;
                Err(KeywordError::Failed(
                    args.first()
                        .cloned()
                        .unwrap_or_else(|| "AssertionError".to_string()),
                ))
            }
            "skip" => {
                expect_args("Skip", args, 0, Some(1))?;
                Err(KeywordError::Skipped(
                    args.first()
                        .cloned()
                        .unwrap_or_else(|| "Skipped with Skip keyword.".to_string()),
                ))
            }
            "shouldbeequal" | "shouldbeequalasstrings" => {
                expect_args("Should Be Equal", args, 2, Some(3))?;
                let (first, second) = (&args[0], &args[1]);
                check(first == second, args.get(2), || format!("{first} != {second}"))
            }
            "shouldnotbeequal" => {
                expect_args("Should Not Be Equal", args, 2, Some(3))?;
                let (first, second) = (&args[0], &args[1]);
                check(first != second, args.get(2), || format!("{first} == {second}"))
            }
            "shouldbeequalasintegers" => {
                expect_args("Should Be Equal As Integers", args, 2, Some(3))?;
                let first = parse_integer(&args[0])?;
                let second = parse_integer(&args[1])?;
                check(first == second, args.get(2), || format!("{first} != {second}"))
            }
            "shouldcontain" => {
                expect_args("Should Contain", args, 2, Some(3))?;
                let (container, item) = (&args[0], &args[1]);
                check(container.contains(item.as_str()), args.get(2), || {
                    format!("'{container}' does not contain '{item}'")
                })
            }
            "shouldnotcontain" => {
                expect_args("Should Not Contain", args, 2, Some(3))?;
                let (container, item) = (&args[0], &args[1]);
                check(!container.contains(item.as_str()), args.get(2), || {
                    format!("'{container}' contains '{item}'")
                })
            }
            "setvariable" => Ok(match args {
                [] => ReturnValue::Scalar(String::new()),
                [value] => ReturnValue::Scalar(value.clone()),
                values => ReturnValue::Multiple(values.to_vec()),
            }),
            "catenate" => {
                let (separator, parts) = match args.split_first() {
                    Some((first, rest)) if first.starts_with("SEPARATOR=") => {
                        (&first["SEPARATOR=".len()..], rest)
                    }
                    _ => (" ", args),
                };
                Ok(ReturnValue::Scalar(parts.join(separator)))
            }
            "converttointeger" => {
                expect_args("Convert To Integer", args, 1, Some(1))?;
                Ok(ReturnValue::Scalar(parse_integer(&args[0])?.to_string()))
            }
            "sleep" => {
                expect_args("Sleep", args, 1, Some(2))?;
                let duration = parse_duration(&args[0])?;
                tokio::time::sleep(duration).await;
                ctx.info(format!("Slept {}", format_duration(duration)));
                if let Some(reason) = args.get(1) {
                    ctx.info(reason.clone());
                }
                Ok(ReturnValue::None)
            }
            other => Err(KeywordError::NotFound(other.to_string())),
        }
    }
}

/// Pass when `ok`, otherwise fail with the custom message or the default one
fn check(
    ok: bool,
    custom: Option<&String>,
    default: impl FnOnce() -> String,
) -> Result<ReturnValue, KeywordError> {
    if ok {
        Ok(ReturnValue::None)
    } else {
        Err(KeywordError::Failed(
            custom.cloned().unwrap_or_else(default),
        ))
    }
}

fn parse_level(raw: &str) -> Result<LogLevel, KeywordError> {
    let value = raw.strip_prefix("level=").unwrap_or(raw);
    LogLevel::from_str(value)
        .ok_or_else(|| KeywordError::Failed(format!("Invalid log level '{value}'.")))
}

/// Parse an integer, accepting `0x`, `0o` and `0b` prefixes
pub(crate) fn parse_integer(raw: &str) -> Result<i64, KeywordError> {
    let text = raw.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let lower = digits.to_lowercase();
    let (radix, digits) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest.to_string())
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest.to_string())
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest.to_string())
    } else {
        (10, lower)
    };

    let value = i64::from_str_radix(&digits, radix)
        .map_err(|_| KeywordError::Failed(format!("'{raw}' cannot be converted to an integer.")))?;
    Ok(if negative { -value } else { value })
}

/// Parse `1.5`, `500ms`, `2s`, `2 seconds`, `1m` or `1h`
fn parse_duration(raw: &str) -> Result<Duration, KeywordError> {
    let invalid = || KeywordError::Failed(format!("Invalid time string '{raw}'."));
    let text = raw.trim().to_lowercase();

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let value: f64 = number.parse().map_err(|_| invalid())?;

    let multiplier = match unit.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "ms" | "millis" | "millisecond" | "milliseconds" => 0.001,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "h" | "hour" | "hours" => 3600.0,
        _ => return Err(invalid()),
    };

    Duration::try_from_secs_f64(value * multiplier).map_err(|_| invalid())
}

fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{millis} milliseconds")
    } else {
        format!("{} seconds", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    async fn run(name: &str, values: &[&str]) -> Result<ReturnValue, KeywordError> {
        let mut ctx = KeywordContext::new();
        BuiltIn.run_keyword(name, &args(values), &mut ctx).await
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("0").unwrap(), 0);
        assert_eq!(parse_integer(" 42 ").unwrap(), 42);
        assert_eq!(parse_integer("-7").unwrap(), -7);
        assert_eq!(parse_integer("0xFF").unwrap(), 255);
        assert_eq!(parse_integer("0b101").unwrap(), 5);
        assert_eq!(parse_integer("0o17").unwrap(), 15);
        assert!(parse_integer("abc").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1.5").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2 seconds").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert!(parse_duration("soon").is_err());
    }

    #[tokio::test]
    async fn test_log_captures_message() {
        let mut ctx = KeywordContext::new();
        BuiltIn
            .run_keyword("log", &args(&["Fish tacos", "level=WARN"]), &mut ctx)
            .await
            .unwrap();
        assert_eq!(ctx.messages()[0].text, "Fish tacos");
        assert_eq!(ctx.messages()[0].level, LogLevel::Warn);

        let err = run("log", &["x", "LOUD"]).await.unwrap_err();
        assert_eq!(err, KeywordError::Failed("Invalid log level 'LOUD'.".into()));
    }

    #[tokio::test]
    async fn test_integer_comparison() {
        assert!(run("shouldbeequalasintegers", &["0", "0"]).await.is_ok());
        assert!(run("shouldbeequalasintegers", &["0x10", "16"]).await.is_ok());

        let err = run("shouldbeequalasintegers", &["1", "0"]).await.unwrap_err();
        assert_eq!(err.to_string(), "1 != 0");

        let err = run("shouldbeequalasintegers", &["1", "0", "ping failed"])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "ping failed");
    }

    #[tokio::test]
    async fn test_log_many_logs_each_argument() {
        let mut ctx = KeywordContext::new();
        let value = BuiltIn
            .run_keyword("logmany", &args(&["Fish", "tacos"]), &mut ctx)
            .await
            .unwrap();
        assert_eq!(value, ReturnValue::None);

        let texts: Vec<&str> = ctx.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Fish", "tacos"]);
        assert!(ctx.messages().iter().all(|m| m.level == LogLevel::Info));
    }

    #[tokio::test]
    async fn test_convert_to_integer() {
        assert_eq!(
            run("converttointeger", &[" 42 "]).await.unwrap(),
            ReturnValue::Scalar("42".into())
        );
        assert_eq!(
            run("converttointeger", &["0x1F"]).await.unwrap(),
            ReturnValue::Scalar("31".into())
        );
        assert!(run("converttointeger", &["taco"]).await.is_err());
        assert!(matches!(
            run("converttointeger", &[]).await.unwrap_err(),
            KeywordError::ArgumentCount { got: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_string_comparison() {
        assert!(run("shouldbeequalasstrings", &["taco", "taco"]).await.is_ok());

        let err = run("shouldbeequalasstrings", &["1", "01"]).await.unwrap_err();
        assert_eq!(err.to_string(), "1 != 01");

        let err = run("shouldbeequalasstrings", &["a", "b", "not a taco"])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "not a taco");
    }

    #[tokio::test]
    async fn test_contains() {
        assert!(run("shouldcontain", &["tacos", "aco"]).await.is_ok());
        let err = run("shouldnotcontain", &["tacos", "aco"]).await.unwrap_err();
        assert_eq!(err.to_string(), "'tacos' contains 'aco'");
    }

    #[tokio::test]
    async fn test_fail_and_skip() {
        assert_eq!(
            run("fail", &[]).await.unwrap_err(),
            KeywordError::Failed("AssertionError".into())
        );
        assert!(run("skip", &["not today"]).await.unwrap_err().is_skip());
    }

    #[tokio::test]
    async fn test_set_variable_and_catenate() {
        assert_eq!(
            run("setvariable", &["a"]).await.unwrap(),
            ReturnValue::Scalar("a".into())
        );
        assert_eq!(
            run("setvariable", &["a", "b"]).await.unwrap(),
            ReturnValue::Multiple(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            run("catenate", &["Fish", "tacos"]).await.unwrap(),
            ReturnValue::Scalar("Fish tacos".into())
        );
        assert_eq!(
            run("catenate", &["SEPARATOR=-", "a", "b"]).await.unwrap(),
            ReturnValue::Scalar("a-b".into())
        );
    }

    #[tokio::test]
    async fn test_argument_count_checked() {
        let err = run("nooperation", &["extra"]).await.unwrap_err();
        assert!(matches!(err, KeywordError::ArgumentCount { got: 1, .. }));
    }

    #[tokio::test]
    async fn test_sleep() {
        let mut ctx = KeywordContext::new();
        BuiltIn
            .run_keyword("sleep", &args(&["10ms"]), &mut ctx)
            .await
            .unwrap();
        assert_eq!(ctx.messages()[0].text, "Slept 10 milliseconds");
    }
}
