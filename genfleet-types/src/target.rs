use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One schema-to-package generation unit.
///
/// `module` doubles as the output directory name and the workspace member
/// key, so it must be unique across the registry and must be a valid
/// filesystem / package-manifest identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationTarget {
    /// Schema entry-point identifier, e.g. "com.example.simple#SimpleService".
    pub entry: String,

    /// Module name; output directory and generated package name.
    pub module: String,

    /// Schema import files, in order. May be empty.
    #[serde(default)]
    pub imports: Vec<String>,

    /// Raw JSON fragment merged into this target's generation configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_config: Option<String>,

    /// Generate the target but keep it out of the assembled workspace.
    #[serde(default)]
    pub exclude_from_workspace: bool,
}

impl GenerationTarget {
    pub fn new(entry: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            module: module.into(),
            imports: vec![],
            extra_config: None,
            exclude_from_workspace: false,
        }
    }

    pub fn with_imports(mut self, imports: Vec<String>) -> Self {
        self.imports = imports;
        self
    }

    pub fn with_extra_config(mut self, fragment: impl Into<String>) -> Self {
        self.extra_config = Some(fragment.into());
        self
    }

    /// Module name with dashes replaced, as expected by stub tooling.
    pub fn module_underscored(&self) -> String {
        self.module.replace('-', "_")
    }
}

/// Fatal registry validation error. Raised before any generation side effect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidTargetError {
    #[error("duplicate module name '{module}' in target registry")]
    DuplicateModule { module: String },

    #[error("target '{module}' has an empty schema entry point")]
    EmptyEntryPoint { module: String },

    #[error("target entry '{entry}' has an empty module name")]
    EmptyModule { entry: String },

    #[error("target '{module}': extra config fragment is not a JSON object: {message}")]
    BadConfigFragment { module: String, message: String },
}
