// src/recipe/kitchen/runner.rs

//! Subprocess execution for build steps
//!
//! Strategies describe each external tool call as an [`Invocation`] and hand
//! it to a [`CommandRunner`]. [`SystemRunner`] spawns real processes;
//! [`RecordingRunner`] only records them, which backs `plan` dry runs and the
//! ordering tests.

use crate::error::{Error, Result};
use crate::recipe::kitchen::environment::BuildEnvironment;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use tracing::debug;

/// One external tool call
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Short step name used in logs and errors ("autoreconf", "configure")
    pub step: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BuildEnvironment,
}

impl Invocation {
    pub fn new(
        step: impl Into<String>,
        program: impl Into<PathBuf>,
        env: &BuildEnvironment,
    ) -> Self {
        Self {
            step: step.into(),
            program: program.into(),
            args: Vec::new(),
            env: env.clone(),
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

    pub fn cwd(&self) -> &Path {
        self.env.cwd()
    }

    /// Program and arguments as one shell-like line
    pub fn command_line(&self) -> String {
        let mut line = quote(&self.program.to_string_lossy());
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote(arg));
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.step, self.command_line())
    }
}

fn quote(s: &str) -> String {
    if !s.is_empty() && !s.contains([' ', '"', '\'', '\t']) {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}

/// Captured result of a successful invocation
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes invocations
///
/// Implementations must return [`Error::Build`] for a non-zero exit.
pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Runs invocations as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        debug!("Running {}", invocation);

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        invocation.env.apply(&mut command);

        let output = command.output().map_err(|e| Error::Build {
            step: invocation.step.clone(),
            code: None,
            stderr: format!("failed to spawn {}: {}", invocation.program.display(), e),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            if !stdout.is_empty() {
                debug!("{} stdout:\n{}", invocation.step, stdout);
            }
            return Err(Error::Build {
                step: invocation.step.clone(),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

/// Records invocations without running anything
///
/// Each call succeeds with empty output unless a canned response was
/// registered for its step with [`RecordingRunner::respond`] or a failure
/// with [`RecordingRunner::fail_step`].
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    responses: Mutex<Vec<(String, CommandOutput)>>,
    failures: Mutex<Vec<(String, i32)>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `stdout` for invocations of `step`
    pub fn respond(&self, step: &str, stdout: &str) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push((
                step.to_string(),
                CommandOutput {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
            ));
        }
    }

    /// Make invocations of `step` exit with `code`
    pub fn fail_step(&self, step: &str, code: i32) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push((step.to_string(), code));
        }
    }

    /// Everything recorded so far, in call order
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Step names recorded so far, in call order
    pub fn steps(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.step).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        debug!("Recording {}", invocation);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }

        let failure = self
            .failures
            .lock()
            .ok()
            .and_then(|f| f.iter().find(|(s, _)| *s == invocation.step).map(|(_, c)| *c));
        if let Some(code) = failure {
            return Err(Error::Build {
                step: invocation.step.clone(),
                code: Some(code),
                stderr: String::new(),
            });
        }

        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|r| r.iter().find(|(s, _)| *s == invocation.step).map(|(_, o)| o.clone()));
        Ok(response.unwrap_or_default())
    }
}
