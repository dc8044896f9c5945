use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Stage names reserved by the pipeline itself. Downstream commands use
/// their configured names.
pub mod stage {
    pub const GENERATE: &str = "generate";
    pub const STUBS: &str = "stubs";
}

/// Terminal state of one module × stage unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl UnitStatus {
    pub fn is_failed(self) -> bool {
        matches!(self, UnitStatus::Failed)
    }
}

/// Per-module, per-stage outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub module: String,

    /// "generate", "stubs", or a downstream command name.
    pub stage: String,

    pub status: UnitStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Human-readable failure or skip reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Captured stdout/stderr, when the stage ran an external tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<Utf8PathBuf>,
}

impl RunResult {
    pub fn succeeded(module: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            stage: stage.into(),
            status: UnitStatus::Succeeded,
            exit_code: Some(0),
            reason: None,
            log: None,
        }
    }

    pub fn failed(
        module: impl Into<String>,
        stage: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            stage: stage.into(),
            status: UnitStatus::Failed,
            exit_code: None,
            reason: Some(reason.into()),
            log: None,
        }
    }

    pub fn skipped(
        module: impl Into<String>,
        stage: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            stage: stage.into(),
            status: UnitStatus::Skipped,
            exit_code: None,
            reason: Some(reason.into()),
            log: None,
        }
    }
}

/// Aggregate of every unit outcome in one orchestration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineRun {
    #[serde(default)]
    pub results: Vec<RunResult>,

    /// Non-fatal assembly warnings (module registered but output missing).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl PipelineRun {
    pub fn push(&mut self, result: RunResult) {
        self.results.push(result);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn failed_count(&self) -> u64 {
        self.results.iter().filter(|r| r.status.is_failed()).count() as u64
    }

    pub fn skipped_count(&self) -> u64 {
        self.results
            .iter()
            .filter(|r| r.status == UnitStatus::Skipped)
            .count() as u64
    }

    pub fn succeeded_count(&self) -> u64 {
        self.results
            .iter()
            .filter(|r| r.status == UnitStatus::Succeeded)
            .count() as u64
    }

    /// Overall success is the conjunction of all unit outcomes: failed iff
    /// any unit failed; skips alone do not fail the pipeline.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn unit(&self, module: &str, stage: &str) -> Option<&RunResult> {
        self.results
            .iter()
            .find(|r| r.module == module && r.stage == stage)
    }
}
