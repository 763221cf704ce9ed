//! OperatingSystem keyword library
//!
//! Runs shell commands and inspects the filesystem and environment.
//! Suites must import it before use.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{expect_args, KeywordContext, KeywordError, Library, ReturnValue};

const LIBRARY_NAME: &str = "OperatingSystem";

const KEYWORDS: &[&str] = &[
    "Run",
    "Run And Return Rc",
    "Run And Return Rc And Output",
    "File Should Exist",
    "File Should Not Exist",
    "Directory Should Exist",
    "Create File",
    "Get File",
    "Remove File",
    "Create Directory",
    "Get Environment Variable",
];

/// Rc reported when a process was terminated by a signal
const SIGNAL_RC: i32 = -1;

/// Process and filesystem keywords
#[derive(Clone, Copy, Debug, Default)]
pub struct OperatingSystem;

#[async_trait]
impl Library for OperatingSystem {
    fn name(&self) -> &str {
        LIBRARY_NAME
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
            "run" => {
                expect_args("Run", args, 1, Some(1))?;
                let (_, output) = run_command(&args[0], ctx).await?;
                Ok(ReturnValue::Scalar(output))
            }
            "runandreturnrc" => {
                expect_args("Run And Return Rc", args, 1, Some(1))?;
                let (rc, _) = run_command(&args[0], ctx).await?;
                Ok(ReturnValue::Scalar(rc.to_string()))
            }
            "runandreturnrcandoutput" => {
                expect_args("Run And Return Rc And Output", args, 1, Some(1))?;
                let (rc, output) = run_command(&args[0], ctx).await?;
                Ok(ReturnValue::Multiple(vec![rc.to_string(), output]))
            }
            "fileshouldexist" => {
                expect_args("File Should Exist", args, 1, Some(2))?;
                let path = Path::new(&args[0]);
                if path.is_file() {
                    ctx.info(format!("File '{}' exists.", args[0]));
                    Ok(ReturnValue::None)
                } else {
                    Err(failure(args.get(1), format!("File '{}' does not exist.", args[0])))
                }
            }
            "fileshouldnotexist" => {
                expect_args("File Should Not Exist", args, 1, Some(2))?;
                if Path::new(&args[0]).is_file() {
                    Err(failure(args.get(1), format!("File '{}' exists.", args[0])))
                } else {
                    Ok(ReturnValue::None)
                }
            }
            "directoryshouldexist" => {
                expect_args("Directory Should Exist", args, 1, Some(2))?;
                if Path::new(&args[0]).is_dir() {
                    Ok(ReturnValue::None)
                } else {
                    Err(failure(
                        args.get(1),
                        format!("Directory '{}' does not exist.", args[0]),
                    ))
                }
            }
            "createfile" => {
                expect_args("Create File", args, 1, Some(2))?;
                let path = Path::new(&args[0]);
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| io_failure("create directory", parent, e))?;
                }
                let content = args.get(1).map(String::as_str).unwrap_or("");
                tokio::fs::write(path, content)
                    .await
                    .map_err(|e| io_failure("write file", path, e))?;
                ctx.info(format!("Created file '{}'.", args[0]));
                Ok(ReturnValue::None)
            }
            "getfile" => {
                expect_args("Get File", args, 1, Some(1))?;
                let path = Path::new(&args[0]);
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| io_failure("read file", path, e))?;
                ctx.info(format!("Getting file '{}'.", args[0]));
                Ok(ReturnValue::Scalar(content))
            }
            "removefile" => {
                expect_args("Remove File", args, 1, Some(1))?;
                let path = Path::new(&args[0]);
                if path.is_file() {
                    tokio::fs::remove_file(path)
                        .await
                        .map_err(|e| io_failure("remove file", path, e))?;
                    ctx.info(format!("Removed file '{}'.", args[0]));
                } else {
                    ctx.info(format!("File '{}' does not exist.", args[0]));
                }
                Ok(ReturnValue::None)
            }
            "createdirectory" => {
                expect_args("Create Directory", args, 1, Some(1))?;
                let path = Path::new(&args[0]);
                tokio::fs::create_dir_all(path)
                    .await
                    .map_err(|e| io_failure("create directory", path, e))?;
                ctx.info(format!("Created directory '{}'.", args[0]));
                Ok(ReturnValue::None)
            }
            "getenvironmentvariable" => {
                expect_args("Get Environment Variable", args, 1, Some(2))?;
                match (std::env::var(&args[0]), args.get(1)) {
                    (Ok(value), _) => Ok(ReturnValue::Scalar(value)),
                    (Err(_), Some(default)) => Ok(ReturnValue::Scalar(default.clone())),
                    (Err(_), None) => Err(KeywordError::Failed(format!(
                        "Environment variable '{}' does not exist.",
                        args[0]
                    ))),
                }
            }
            other => Err(KeywordError::NotFound(other.to_string())),
        }
    }
}

/// Run `command` through the platform shell with stderr merged into stdout
async fn run_command(
    command: &str,
    ctx: &mut KeywordContext,
) -> Result<(i32, String), KeywordError> {
    ctx.info(format!("Running command '{command} 2>&1'."));

    // Group the command so the redirect covers every stage of it
    let mut process = if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(format!("({command}) 2>&1"));
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(format!("{{ {command}\n}} 2>&1"));
        cmd
    };

    let output = process
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| KeywordError::Failed(format!("Running command '{command}' failed: {e}")))?;

    let rc = output.status.code().unwrap_or(SIGNAL_RC);
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }

    debug!("Command '{}' finished with rc {}", command, rc);
    Ok((rc, text))
}

fn failure(custom: Option<&String>, default: String) -> KeywordError {
    KeywordError::Failed(custom.cloned().unwrap_or(default))
}

fn io_failure(action: &str, path: &Path, error: std::io::Error) -> KeywordError {
    KeywordError::Failed(format!(
        "Failed to {action} '{}': {error}",
        path.display()
    ))
}
