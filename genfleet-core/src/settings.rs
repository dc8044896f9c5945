//! Clap-free settings for the orchestration pipeline.

use camino::Utf8PathBuf;
use genfleet_types::command::CommandSpec;

/// How the external code generator is invoked.
///
/// The argv is a template; `{manifest}`, `{module}` and `{output_root}`
/// are substituted per target.
#[derive(Debug, Clone)]
pub struct GeneratorSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for GeneratorSpec {
    fn default() -> Self {
        Self {
            program: "schema-codegen".to_string(),
            args: vec![
                "--manifest".to_string(),
                "{manifest}".to_string(),
                "--module".to_string(),
                "{module}".to_string(),
                "--output".to_string(),
                "{output_root}".to_string(),
            ],
        }
    }
}

/// Settings for one orchestration run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Root of the project the registry lives in.
    pub project_root: Utf8PathBuf,

    /// Where generated outputs and the workspace manifest land.
    pub build_root: Utf8PathBuf,

    /// Where the manifest artifact, report, and captured logs are written.
    pub artifacts_dir: Utf8PathBuf,

    /// Generator plugin name; also the per-target output subdirectory.
    pub plugin: String,

    /// Base generation configuration shared by all targets.
    pub base_config: serde_json::Value,

    pub generator: GeneratorSpec,

    /// Downstream verification commands, in configuration order.
    pub commands: Vec<CommandSpec>,

    /// Stub-extraction script; `None` disables the stage.
    pub stub_script: Option<Utf8PathBuf>,

    /// Raw TOML appended to the workspace manifest (shared build settings,
    /// e.g. profile definitions).
    pub workspace_extra: Option<String>,

    /// Rewrite mtimes of content-unchanged files after generation.
    pub normalize_timestamps: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            project_root: Utf8PathBuf::from("."),
            build_root: Utf8PathBuf::from("build"),
            artifacts_dir: Utf8PathBuf::from("artifacts/genfleet"),
            plugin: "rust-server-codegen".to_string(),
            base_config: serde_json::Value::Object(serde_json::Map::new()),
            generator: GeneratorSpec::default(),
            commands: default_commands(),
            stub_script: None,
            workspace_extra: None,
            normalize_timestamps: true,
        }
    }
}

impl PipelineSettings {
    /// Fixed run-scoped location of the manifest artifact.
    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.artifacts_dir.join("manifest.json")
    }

    pub fn logs_dir(&self) -> Utf8PathBuf {
        self.artifacts_dir.join("logs")
    }

    /// A target's generated-output directory.
    pub fn package_dir(&self, module: &str) -> Utf8PathBuf {
        self.build_root.join(module).join(&self.plugin)
    }
}

/// The stock verification sequence: build, test, then docs and lint which
/// both run even when tests fail, so a broken test run still yields lint
/// and doc information.
pub fn default_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new(
            "build",
            vec!["cargo".into(), "build".into(), "-p".into(), "{module}".into()],
        ),
        CommandSpec::new(
            "test",
            vec!["cargo".into(), "test".into(), "-p".into(), "{module}".into()],
        )
        .after("build"),
        CommandSpec::new(
            "doc",
            vec![
                "cargo".into(),
                "doc".into(),
                "--no-deps".into(),
                "-p".into(),
                "{module}".into(),
            ],
        )
        .after("test")
        .always(),
        CommandSpec::new(
            "clippy",
            vec!["cargo".into(), "clippy".into(), "-p".into(), "{module}".into()],
        )
        .after("test")
        .always(),
    ]
}
