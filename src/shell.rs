//! Shell command execution on emulated nodes.
//!
//! Every command targets either the host or one network namespace and is a
//! single `sh -c` line. A [`CommandRunner`] decides what happens to it:
//! [`SystemRunner`] executes it, [`RecordingRunner`] only records it, which
//! backs `--dry-run` and the tests.

use log::{debug, trace, warn};
use std::fmt;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};

/// Errors raised while running shell commands
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// One shell line, optionally scoped to a network namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub namespace: Option<String>,
    pub line: String,
}

impl ShellCommand {
    /// Program and arguments that execute this command
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::new();
        if let Some(ns) = &self.namespace {
            argv.extend(["ip", "netns", "exec", ns.as_str()].map(String::from));
        }
        argv.extend(["sh".to_string(), "-c".to_string(), self.line.clone()]);
        argv
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "[{}] {}", ns, self.line),
            None => write!(f, "[host] {}", self.line),
        }
    }
}

/// Executes shell commands
pub trait CommandRunner: fmt::Debug {
    /// Run to completion and return stdout; a non-zero exit is an error
    fn run(&self, command: &ShellCommand) -> Result<String, ShellError>;

    /// Start in the background without waiting
    fn spawn_detached(&self, command: &ShellCommand) -> Result<(), ShellError>;
}

/// Runs commands on the local system.
///
/// Detached launchers are kept until they exit. They are reaped before each
/// new spawn, on [`SystemRunner::reap`] and when the runner is dropped.
#[derive(Debug, Default)]
pub struct SystemRunner {
    children: Mutex<Vec<Child>>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect exited detached children and return how many still run
    pub fn reap(&self) -> usize {
        let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
        children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                trace!("detached pid {} exited with {}", child.id(), status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("Cannot poll detached pid {}: {}", child.id(), e);
                false
            }
        });
        children.len()
    }
}

impl Drop for SystemRunner {
    fn drop(&mut self) {
        let running = self.reap();
        if running > 0 {
            debug!("{} detached launchers still running", running);
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ShellCommand) -> Result<String, ShellError> {
        let argv = command.argv();
        trace!("exec {:?}", argv);
        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .map_err(|source| ShellError::Spawn {
                command: command.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ShellError::Failed {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn spawn_detached(&self, command: &ShellCommand) -> Result<(), ShellError> {
        self.reap();
        let argv = command.argv();
        trace!("spawn {:?}", argv);
        let child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ShellError::Spawn {
                command: command.to_string(),
                source,
            })?;
        self.children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(child);
        Ok(())
    }
}

/// Records commands instead of running them.
///
/// `run` answers with the first canned response whose prefix matches the
/// command line, or an empty string.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<ShellCommand>>,
    responses: Vec<(String, String)>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, line_prefix: &str, output: &str) -> Self {
        self.responses.push((line_prefix.to_string(), output.to_string()));
        self
    }

    pub fn commands(&self) -> Vec<ShellCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded command lines, optionally restricted to one namespace
    pub fn lines_in(&self, namespace: Option<&str>) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.namespace.as_deref() == namespace)
            .map(|c| c.line)
            .collect()
    }

    fn record(&self, command: &ShellCommand) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &ShellCommand) -> Result<String, ShellError> {
        self.record(command);
        let response = self
            .responses
            .iter()
            .find(|(prefix, _)| command.line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();
        Ok(response)
    }

    fn spawn_detached(&self, command: &ShellCommand) -> Result<(), ShellError> {
        self.record(command);
        Ok(())
    }
}

/// Shell handle of one emulated node
#[derive(Debug, Clone)]
pub struct NodeShell {
    name: String,
    namespace: Option<String>,
    runner: Arc<dyn CommandRunner>,
}

impl NodeShell {
    /// Shell of the machine running the lab
    pub fn host(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            name: "host".to_string(),
            namespace: None,
            runner,
        }
    }

    /// Shell inside the network namespace `name`
    pub fn in_namespace(name: &str, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            name: name.to_string(),
            namespace: Some(name.to_string()),
            runner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn command(&self, line: &str) -> ShellCommand {
        ShellCommand {
            namespace: self.namespace.clone(),
            line: line.to_string(),
        }
    }

    /// Run `line` and return its stdout
    pub fn cmd(&self, line: &str) -> Result<String, ShellError> {
        debug!("{}: {}", self.name, line);
        self.runner.run(&self.command(line))
    }

    /// Start `line` in the background
    pub fn spawn(&self, line: &str) -> Result<(), ShellError> {
        debug!("{} (detached): {}", self.name, line);
        self.runner.spawn_detached(&self.command(line))
    }
}
