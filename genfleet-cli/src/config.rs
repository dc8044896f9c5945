//! Configuration file loading for genfleet.
//!
//! Discovers and loads `genfleet.toml` from the project root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use genfleet_core::settings::{GeneratorSpec, PipelineSettings, default_commands};
use genfleet_types::command::CommandSpec;
use genfleet_types::target::GenerationTarget;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "genfleet.toml";

/// Top-level configuration from genfleet.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenfleetConfig {
    /// Pipeline settings (paths, plugin, normalization).
    pub settings: SettingsConfig,

    /// Generator invocation override.
    pub generator: Option<GeneratorConfig>,

    /// The target registry, in configuration order.
    pub targets: Vec<GenerationTarget>,

    /// Downstream commands. Empty means the stock build/test/doc/clippy
    /// sequence.
    pub commands: Vec<CommandSpec>,
}

/// Settings section of the config. Every field is optional; relative paths
/// are resolved against the project root.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub build_root: Option<Utf8PathBuf>,

    pub artifacts_dir: Option<Utf8PathBuf>,

    /// Generator plugin name; also the per-target output subdirectory.
    pub plugin: Option<String>,

    /// Base generation configuration shared by all targets, as a TOML table.
    pub base_config: Option<toml::Value>,

    /// Stub-extraction script. Absent means the stage is disabled.
    pub stub_script: Option<Utf8PathBuf>,

    /// Raw TOML appended to the assembled workspace manifest.
    pub workspace_extra: Option<String>,

    pub normalize_timestamps: Option<bool>,
}

/// Generator section of the config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub program: String,

    /// Argv template; absent keeps the default template.
    pub args: Option<Vec<String>>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let spec = GeneratorSpec::default();
        Self {
            program: spec.program,
            args: None,
        }
    }
}

/// Discover the genfleet.toml config file.
///
/// Returns `None` if no config file is found at the project root.
pub fn discover_config(project_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = project_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a genfleet.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<GenfleetConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<GenfleetConfig> {
    let config: GenfleetConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the project root, or return default if not found.
pub fn load_or_default(project_root: &Utf8Path) -> anyhow::Result<GenfleetConfig> {
    match discover_config(project_root) {
        Some(path) => load_config(&path),
        None => Ok(GenfleetConfig::default()),
    }
}

/// CLI overrides for the settings section. CLI takes precedence over the
/// config file, which takes precedence over defaults.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub build_root: Option<Utf8PathBuf>,
    pub artifacts_dir: Option<Utf8PathBuf>,
    pub plugin: Option<String>,
    pub stub_script: Option<Utf8PathBuf>,
    pub no_normalize: bool,
}

/// Resolve the effective pipeline settings from config file and CLI.
pub fn resolve_settings(
    project_root: &Utf8Path,
    config: &GenfleetConfig,
    overrides: &SettingsOverrides,
) -> anyhow::Result<PipelineSettings> {
    let defaults = PipelineSettings::default();

    let build_root = overrides
        .build_root
        .as_deref()
        .or(config.settings.build_root.as_deref())
        .map(|p| resolve_path(project_root, p))
        .unwrap_or_else(|| project_root.join(&defaults.build_root));

    let artifacts_dir = overrides
        .artifacts_dir
        .as_deref()
        .or(config.settings.artifacts_dir.as_deref())
        .map(|p| resolve_path(project_root, p))
        .unwrap_or_else(|| project_root.join(&defaults.artifacts_dir));

    let plugin = overrides
        .plugin
        .clone()
        .or_else(|| config.settings.plugin.clone())
        .unwrap_or(defaults.plugin);

    let base_config = match &config.settings.base_config {
        Some(table) => serde_json::to_value(table).context("convert base_config to JSON")?,
        None => defaults.base_config,
    };

    let generator = match &config.generator {
        Some(section) => GeneratorSpec {
            program: section.program.clone(),
            args: section
                .args
                .clone()
                .unwrap_or_else(|| GeneratorSpec::default().args),
        },
        None => defaults.generator,
    };

    let commands = if config.commands.is_empty() {
        default_commands()
    } else {
        config.commands.clone()
    };

    let stub_script = overrides
        .stub_script
        .as_deref()
        .or(config.settings.stub_script.as_deref())
        .map(|p| resolve_path(project_root, p));

    let normalize_timestamps = if overrides.no_normalize {
        false
    } else {
        config
            .settings
            .normalize_timestamps
            .unwrap_or(defaults.normalize_timestamps)
    };

    Ok(PipelineSettings {
        project_root: project_root.to_path_buf(),
        build_root,
        artifacts_dir,
        plugin,
        base_config,
        generator,
        commands,
        stub_script,
        workspace_extra: config.settings.workspace_extra.clone(),
        normalize_timestamps,
    })
}

fn resolve_path(project_root: &Utf8Path, p: &Utf8Path) -> Utf8PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        project_root.join(p)
    }
}
