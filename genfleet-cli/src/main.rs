mod config;

use anyhow::Context;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use config::SettingsOverrides;
use genfleet_core::adapters::ShellProcessPort;
use genfleet_core::commands::{self, ModuleDisposition};
use genfleet_core::pipeline;
use genfleet_core::settings::PipelineSettings;
use genfleet_core::{assemble, driver, mtime, stubs};
use genfleet_manifest::{build_manifest, read_manifest, write_manifest};
use genfleet_types::manifest::Manifest;
use genfleet_types::report::{
    PipelineReport, ReportCounts, ReportRunInfo, ReportStatus, ReportToolInfo, ReportVerdict,
};
use genfleet_types::run::PipelineRun;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
    name = "genfleet",
    version,
    about = "Orchestrates schema code generation, workspace assembly, and verification."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build and write the generation manifest from the target registry.
    Manifest(CommonArgs),
    /// Run the external generator for every registered target.
    Generate(CommonArgs),
    /// Scan generated output and write the workspace manifest.
    Assemble(CommonArgs),
    /// Run the configured commands against every workspace member.
    Run(CommonArgs),
    /// Run the stub-extraction script against every generated target.
    Stubs(CommonArgs),
    /// Run the whole pipeline end to end.
    Pipeline(CommonArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Project root holding genfleet.toml (default: current directory).
    #[arg(long, default_value = ".")]
    project_root: Utf8PathBuf,

    /// Config file path (default: <project_root>/genfleet.toml).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Build root for generated output (default: <project_root>/build).
    #[arg(long)]
    build_root: Option<Utf8PathBuf>,

    /// Artifacts directory for manifest, logs, and report
    /// (default: <project_root>/artifacts/genfleet).
    #[arg(long)]
    artifacts_dir: Option<Utf8PathBuf>,

    /// Generator plugin name.
    #[arg(long)]
    plugin: Option<String>,

    /// Stub-extraction script path.
    #[arg(long)]
    stub_script: Option<Utf8PathBuf>,

    /// Disable timestamp normalization after generation.
    #[arg(long, default_value_t = false)]
    no_normalize: bool,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(true) => ExitCode::from(0),
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(1)
        }
    }
}

fn real_main() -> anyhow::Result<bool> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Manifest(args) => cmd_manifest(args),
        Command::Generate(args) => cmd_generate(args),
        Command::Assemble(args) => cmd_assemble(args),
        Command::Run(args) => cmd_run(args),
        Command::Stubs(args) => cmd_stubs(args),
        Command::Pipeline(args) => cmd_pipeline(args),
    }
}

/// Load the config file and resolve effective settings, CLI winning.
fn load(args: &CommonArgs) -> anyhow::Result<(config::GenfleetConfig, PipelineSettings)> {
    let file_config = match &args.config {
        Some(path) => config::load_config(path).context("load config file")?,
        None => config::load_or_default(&args.project_root).context("load genfleet.toml")?,
    };
    let overrides = SettingsOverrides {
        build_root: args.build_root.clone(),
        artifacts_dir: args.artifacts_dir.clone(),
        plugin: args.plugin.clone(),
        stub_script: args.stub_script.clone(),
        no_normalize: args.no_normalize,
    };
    let settings = config::resolve_settings(&args.project_root, &file_config, &overrides)?;
    Ok((file_config, settings))
}

/// The manifest for this invocation, always rebuilt from the registry so
/// that config edits take effect immediately. A leftover artifact from a
/// prior run is only consulted to warn about staleness.
fn current_manifest(
    settings: &PipelineSettings,
    file_config: &config::GenfleetConfig,
) -> anyhow::Result<Manifest> {
    let manifest = build_manifest(
        &file_config.targets,
        &settings.plugin,
        &settings.base_config,
    )?;

    let path = settings.manifest_path();
    if path.exists()
        && let Ok(recorded) = read_manifest(&path)
        && recorded.modules().ne(manifest.modules())
    {
        warn!(
            "manifest artifact at {} is stale; using the current registry",
            path
        );
    }

    Ok(manifest)
}

fn cmd_manifest(args: CommonArgs) -> anyhow::Result<bool> {
    let (file_config, settings) = load(&args)?;

    let manifest = build_manifest(&file_config.targets, &settings.plugin, &settings.base_config)?;
    write_manifest(&manifest, &settings.manifest_path())?;

    info!(
        entries = manifest.entries.len(),
        "wrote manifest to {}",
        settings.manifest_path()
    );
    println!("{}", settings.manifest_path());
    Ok(true)
}

fn cmd_generate(args: CommonArgs) -> anyhow::Result<bool> {
    let (file_config, settings) = load(&args)?;
    let started = Utc::now();

    let manifest = build_manifest(&file_config.targets, &settings.plugin, &settings.base_config)?;
    write_manifest(&manifest, &settings.manifest_path())?;

    let port = ShellProcessPort;
    let outcome = driver::run_generation(&settings, &manifest, &port)?;

    let mut run = PipelineRun::default();
    run.results.extend(outcome.results);
    finish_stage(run, &settings, started)
}

fn cmd_assemble(args: CommonArgs) -> anyhow::Result<bool> {
    let (file_config, settings) = load(&args)?;

    let manifest = current_manifest(&settings, &file_config)?;
    let outcome = assemble::assemble_workspace(&settings, &manifest)?;

    if settings.normalize_timestamps {
        mtime::normalize_timestamps(&settings.build_root)?;
    }

    for module in &outcome.missing {
        warn!(module = module.as_str(), "no generated output; excluded from workspace");
    }
    info!(
        members = outcome.members.len(),
        changed = outcome.changed,
        "wrote workspace manifest to {}",
        outcome.manifest_path
    );
    for member in &outcome.members {
        println!("{member}");
    }
    Ok(true)
}

fn cmd_run(args: CommonArgs) -> anyhow::Result<bool> {
    let (file_config, settings) = load(&args)?;
    let started = Utc::now();

    let manifest = current_manifest(&settings, &file_config)?;
    let generated = driver::discover_generated(&settings, &manifest);

    let modules: Vec<(String, ModuleDisposition)> = manifest
        .entries
        .iter()
        .filter(|e| !e.exclude_from_workspace)
        .map(|entry| {
            let disposition = if generated.contains(&entry.module) {
                ModuleDisposition::Ready
            } else {
                ModuleDisposition::Degraded {
                    reason: "no generated output".to_string(),
                }
            };
            (entry.module.clone(), disposition)
        })
        .collect();

    let port = ShellProcessPort;
    let results = commands::run_commands(&settings, &settings.commands, &modules, &port)?;

    let mut run = PipelineRun::default();
    run.results.extend(results);
    finish_stage(run, &settings, started)
}

fn cmd_stubs(args: CommonArgs) -> anyhow::Result<bool> {
    let (file_config, settings) = load(&args)?;
    let started = Utc::now();

    if settings.stub_script.is_none() {
        info!("no stub script configured; nothing to do");
        return Ok(true);
    }

    let manifest = current_manifest(&settings, &file_config)?;
    let generated = driver::discover_generated(&settings, &manifest);

    let port = ShellProcessPort;
    let results = stubs::run_stub_extraction(&settings, &manifest, &generated, &port)?;

    let mut run = PipelineRun::default();
    run.results.extend(results);
    finish_stage(run, &settings, started)
}

fn cmd_pipeline(args: CommonArgs) -> anyhow::Result<bool> {
    let (file_config, settings) = load(&args)?;

    let port = ShellProcessPort;
    let outcome = pipeline::run_pipeline(&settings, &file_config.targets, &port, tool_info())?;

    info!(
        status = ?outcome.report.verdict.status,
        succeeded = outcome.report.verdict.counts.succeeded,
        failed = outcome.report.verdict.counts.failed,
        skipped = outcome.report.verdict.counts.skipped,
        "pipeline finished; report in {}",
        settings.artifacts_dir
    );
    Ok(outcome.is_success())
}

/// Write report artifacts for a single-stage invocation and map the run to
/// an exit status: non-zero iff at least one unit failed.
fn finish_stage(
    run: PipelineRun,
    settings: &PipelineSettings,
    started: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let report = report_from_run(run, started);
    pipeline::write_report_artifacts(&report, &settings.artifacts_dir)?;

    info!(
        status = ?report.verdict.status,
        succeeded = report.verdict.counts.succeeded,
        failed = report.verdict.counts.failed,
        skipped = report.verdict.counts.skipped,
        "report in {}",
        settings.artifacts_dir
    );
    Ok(report.results.is_success())
}

fn report_from_run(run: PipelineRun, started: DateTime<Utc>) -> PipelineReport {
    let ended = Utc::now();
    let counts = ReportCounts {
        succeeded: run.succeeded_count(),
        failed: run.failed_count(),
        skipped: run.skipped_count(),
    };

    let status = if counts.failed > 0 {
        ReportStatus::Fail
    } else if !run.warnings.is_empty() || counts.skipped > 0 {
        ReportStatus::Warn
    } else {
        ReportStatus::Pass
    };

    let mut reasons = Vec::new();
    if counts.failed > 0 {
        reasons.push("unit_failures".to_string());
    }

    PipelineReport {
        schema: genfleet_types::schema::GENFLEET_REPORT_V1.to_string(),
        tool: tool_info(),
        run: ReportRunInfo {
            run_id: Uuid::new_v4().to_string(),
            started_at: started.to_rfc3339(),
            ended_at: Some(ended.to_rfc3339()),
            duration_ms: Some((ended - started).num_milliseconds().max(0) as u64),
        },
        verdict: ReportVerdict {
            status,
            counts,
            reasons,
        },
        results: run,
        data: None,
    }
}

fn tool_info() -> ReportToolInfo {
    ReportToolInfo {
        name: "genfleet".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: None,
    }
}
