use serde::{Deserialize, Serialize};

/// Trigger semantics relative to the prior step.
///
/// - `OnSuccess`: depends-on — skipped when the prior step failed or was
///   itself skipped.
/// - `Always`: finalized-by — runs once its trigger point is reached,
///   regardless of the prior outcome. Used for cleanup/reporting steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    #[default]
    OnSuccess,
    Always,
}

/// A named downstream verification/build action.
///
/// The argv is a template; `{module}`, `{package_dir}`, `{workspace_dir}`
/// and `{manifest}` are substituted per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,

    /// Command line: program followed by arguments.
    pub command: Vec<String>,

    /// Name of the command this one is ordered after. `None` means the
    /// command runs first, directly after workspace assembly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,

    #[serde(default)]
    pub trigger: Trigger,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            after: None,
            trigger: Trigger::OnSuccess,
        }
    }

    pub fn after(mut self, prior: impl Into<String>) -> Self {
        self.after = Some(prior.into());
        self
    }

    pub fn always(mut self) -> Self {
        self.trigger = Trigger::Always;
        self
    }
}
