//! Process plumbing for the `aws` command-line tool.

use crate::error::{AwsError, AwsResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};
use tracing::debug;

/// Raw result of one invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `aws <args>`. Swapped for a scripted runner in tests.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> AwsResult<CommandOutput>;
}

/// Spawns the real CLI with a timeout.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    command_timeout: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            program: std::env::var("AWS_CLI_PATH").unwrap_or_else(|_| "aws".to_string()),
            command_timeout: Duration::from_secs(300),
        }
    }
}

impl ProcessRunner {
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.command_timeout = Duration::from_secs(seconds);
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, args: &[String]) -> AwsResult<CommandOutput> {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(args).kill_on_drop(true);

        let output = timeout(self.command_timeout, cmd.output())
            .await
            .map_err(|_| AwsError::Timeout(self.command_timeout))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AwsError::CliNotFound(self.program.clone())
                } else {
                    AwsError::Io(e)
                }
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Region-scoped handle on the CLI. Cheap to clone.
#[derive(Clone)]
pub struct AwsCli {
    runner: Arc<dyn CommandRunner>,
    region: Option<String>,
    profile: Option<String>,
}

impl AwsCli {
    pub fn new(region: impl Into<String>) -> Self {
        Self::with_runner(Arc::new(ProcessRunner::default())).with_region(region)
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner, region: None, profile: None }
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Run a command and return its stdout; a non-zero exit is classified from stderr.
    pub async fn call(&self, args: &[&str]) -> AwsResult<String> {
        let mut full: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
        if let Some(region) = &self.region {
            full.extend(["--region".to_string(), region.clone()]);
        }
        if let Some(profile) = &self.profile {
            full.extend(["--profile".to_string(), profile.clone()]);
        }
        full.extend(["--output".to_string(), "json".to_string()]);

        debug!(command = %full.join(" "), "running aws");
        let output = self.runner.run(&full).await?;
        if !output.success {
            return Err(AwsError::from_stderr(&output.stderr));
        }
        Ok(output.stdout)
    }

    /// Run a command and decode its JSON stdout.
    pub async fn call_json<T: DeserializeOwned>(&self, args: &[&str]) -> AwsResult<T> {
        let stdout = self.call(args).await?;
        let body = if stdout.trim().is_empty() { "{}" } else { stdout.as_str() };
        serde_json::from_str(body).map_err(|e| AwsError::ParseError(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned outputs in order and records every argument list.
    #[derive(Default)]
    pub struct ScriptedRunner {
        pub calls: Mutex<Vec<Vec<String>>>,
        pub replies: Mutex<VecDeque<CommandOutput>>,
    }

    impl ScriptedRunner {
        pub fn reply_ok(self, stdout: &str) -> Self {
            self.replies.lock().unwrap().push_back(CommandOutput {
                success: true,
                stdout: stdout.to_string(),
                stderr: String::new(),
            });
            self
        }

        pub fn reply_err(self, stderr: &str) -> Self {
            self.replies.lock().unwrap().push_back(CommandOutput {
                success: false,
                stdout: String::new(),
                stderr: stderr.to_string(),
            });
            self
        }

        pub fn call(&self, n: usize) -> Vec<String> {
            self.calls.lock().unwrap()[n].clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, args: &[String]) -> AwsResult<CommandOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
        }
    }
}
