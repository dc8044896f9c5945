//! Default port implementations.

use crate::ports::{ProcessOutput, ProcessPort};
use anyhow::Context;
use camino::Utf8Path;
use std::process::Command;
use std::sync::Mutex;
use tracing::debug;

/// Spawns real child processes via `std::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct ShellProcessPort;

impl ProcessPort for ShellProcessPort {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Utf8Path,
    ) -> anyhow::Result<ProcessOutput> {
        debug!(program, ?args, cwd = cwd.as_str(), "spawning child process");
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .with_context(|| format!("spawn {} in {}", program, cwd))?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// One recorded invocation, for assertions in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: String,
}

/// In-memory process port for embedding and testing.
///
/// Records every invocation and succeeds by default; invocations whose
/// program or any argument contains a configured marker fail with the
/// associated exit code.
#[derive(Debug, Default)]
pub struct ScriptedProcessPort {
    invocations: Mutex<Vec<Invocation>>,
    failures: Vec<(String, i32)>,
}

impl ScriptedProcessPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any invocation mentioning `marker` with `exit_code`.
    pub fn fail_matching(mut self, marker: impl Into<String>, exit_code: i32) -> Self {
        self.failures.push((marker.into(), exit_code));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().expect("lock invocations").clone()
    }
}

impl ProcessPort for ScriptedProcessPort {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Utf8Path,
    ) -> anyhow::Result<ProcessOutput> {
        self.invocations
            .lock()
            .expect("lock invocations")
            .push(Invocation {
                program: program.to_string(),
                args: args.to_vec(),
                cwd: cwd.to_string(),
            });

        for (marker, code) in &self.failures {
            let hit = program.contains(marker.as_str())
                || args.iter().any(|a| a.contains(marker.as_str()));
            if hit {
                return Ok(ProcessOutput {
                    exit_code: Some(*code),
                    stdout: Vec::new(),
                    stderr: format!("scripted failure for '{marker}'").into_bytes(),
                });
            }
        }

        Ok(ProcessOutput {
            exit_code: Some(0),
            stdout: b"ok".to_vec(),
            stderr: Vec::new(),
        })
    }
}
