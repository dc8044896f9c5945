//! Port traits abstracting all external-tool I/O away from the pipeline.

use camino::Utf8Path;

/// Captured outcome of one child-process invocation.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, for log capture.
    pub fn combined(&self) -> Vec<u8> {
        let mut out = self.stdout.clone();
        out.extend_from_slice(&self.stderr);
        out
    }
}

/// External-tool invocation boundary.
///
/// Every generator, toolchain, and stub-script call goes through this trait
/// as a blocking child-process call with a captured exit status. No state
/// is shared between calls, which keeps per-target failures isolated and
/// retries deterministic.
pub trait ProcessPort {
    fn run(&self, program: &str, args: &[String], cwd: &Utf8Path)
    -> anyhow::Result<ProcessOutput>;
}
