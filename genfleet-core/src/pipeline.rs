//! The full orchestration pipeline, extracted from the CLI.
//!
//! Manifest → generation → assembly → timestamp normalization → commands →
//! stub extraction → report. Registry validation is the only fatal step;
//! everything after it records per-unit outcomes and keeps going, so one
//! broken target never hides information about its siblings.

use crate::commands::{self, ModuleDisposition};
use crate::ports::ProcessPort;
use crate::settings::PipelineSettings;
use crate::{assemble, driver, mtime, stubs};
use anyhow::Context;
use camino::Utf8Path;
use chrono::Utc;
use fs_err as fs;
use genfleet_manifest::{build_manifest, write_manifest};
use genfleet_render::render_report_md;
use genfleet_types::report::{
    PipelineReport, ReportCounts, ReportRunInfo, ReportStatus, ReportToolInfo, ReportVerdict,
};
use genfleet_types::run::{PipelineRun, stage};
use genfleet_types::target::{GenerationTarget, InvalidTargetError};
use tracing::info;
use uuid::Uuid;

/// Error type for pipeline results. Exit code semantics: a fatal error
/// aborts before side effects; per-unit failures are report data, not
/// errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidTarget(#[from] InvalidTargetError),

    #[error("invalid command configuration: {0}")]
    InvalidCommands(#[from] crate::graph::GraphError),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

/// Outcome of `run_pipeline`.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub report: PipelineReport,
}

impl PipelineOutcome {
    /// The process exit code is non-zero iff at least one unit failed.
    pub fn is_success(&self) -> bool {
        self.report.results.is_success()
    }
}

/// Run the whole orchestration: every stage, every target.
pub fn run_pipeline(
    settings: &PipelineSettings,
    targets: &[GenerationTarget],
    process: &dyn ProcessPort,
    tool: ReportToolInfo,
) -> Result<PipelineOutcome, PipelineError> {
    let started = Utc::now();
    let run_id = Uuid::new_v4().to_string();
    info!(run_id = run_id.as_str(), targets = targets.len(), "starting pipeline");

    // Fatal validation happens before any side effect: the registry and
    // the command wiring (unknown `after` references, cycles) are both
    // configuration errors, not run outcomes.
    let manifest = build_manifest(targets, &settings.plugin, &settings.base_config)?;
    crate::graph::from_commands(&settings.commands)?.execution_order()?;

    write_manifest(&manifest, &settings.manifest_path()).map_err(PipelineError::Internal)?;

    let mut run = PipelineRun::default();

    let generation = driver::run_generation(settings, &manifest, process)?;
    run.results.extend(generation.results.iter().cloned());

    let assembly = assemble::assemble_workspace(settings, &manifest)?;
    for module in &assembly.missing {
        run.warn(format!(
            "module '{module}' has no generated output; downstream commands skipped"
        ));
    }

    if settings.normalize_timestamps {
        mtime::normalize_timestamps(&settings.build_root)?;
    }

    let modules = module_dispositions(&manifest, &generation, &assembly);
    let command_results = commands::run_commands(settings, &settings.commands, &modules, process)?;
    run.results.extend(command_results);

    let stub_results = stubs::run_stub_extraction(settings, &manifest, &generation.generated, process)?;
    run.results.extend(stub_results);

    let report = build_report(run, tool, run_id, started, &assembly);
    write_report_artifacts(&report, &settings.artifacts_dir)?;

    Ok(PipelineOutcome { report })
}

/// Workspace members run commands; registered modules without output are
/// degraded with the reason generation recorded. Excluded targets get no
/// downstream commands at all.
fn module_dispositions(
    manifest: &genfleet_types::manifest::Manifest,
    generation: &driver::GenerationOutcome,
    assembly: &assemble::AssemblyOutcome,
) -> Vec<(String, ModuleDisposition)> {
    manifest
        .entries
        .iter()
        .filter(|e| !e.exclude_from_workspace)
        .map(|entry| {
            let member = assembly
                .members
                .iter()
                .any(|m| m.starts_with(&format!("{}/", entry.module)));
            let disposition = if member {
                ModuleDisposition::Ready
            } else {
                let reason = generation
                    .results
                    .iter()
                    .find(|r| r.module == entry.module && r.stage == stage::GENERATE)
                    .and_then(|r| r.reason.clone())
                    .unwrap_or_else(|| "no generated output".to_string());
                ModuleDisposition::Degraded {
                    reason: format!("generation failed: {reason}"),
                }
            };
            (entry.module.clone(), disposition)
        })
        .collect()
}

fn build_report(
    run: PipelineRun,
    tool: ReportToolInfo,
    run_id: String,
    started: chrono::DateTime<Utc>,
    assembly: &assemble::AssemblyOutcome,
) -> PipelineReport {
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
    if !run.warnings.is_empty() {
        reasons.push("missing_outputs".to_string());
    }

    let data = serde_json::json!({
        "genfleet": {
            "workspace": {
                "manifest": assembly.manifest_path.as_str(),
                "members": assembly.members,
                "changed": assembly.changed,
            }
        }
    });

    PipelineReport {
        schema: genfleet_types::schema::GENFLEET_REPORT_V1.to_string(),
        tool,
        run: ReportRunInfo {
            run_id,
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
        data: Some(data),
    }
}

/// Write `report.json` and `report.md` to the artifacts directory.
pub fn write_report_artifacts(report: &PipelineReport, out_dir: &Utf8Path) -> anyhow::Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir))?;

    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    fs::write(out_dir.join("report.json"), json)
        .with_context(|| format!("write {}", out_dir.join("report.json")))?;

    fs::write(out_dir.join("report.md"), render_report_md(report))
        .with_context(|| format!("write {}", out_dir.join("report.md")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ProcessOutput;
    use camino::Utf8PathBuf;
    use genfleet_types::command::CommandSpec;
    use genfleet_types::run::UnitStatus;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Fake generator + toolchain: generator invocations create the
    /// expected output directory; command/stub invocations succeed unless
    /// an argument matches a configured failure marker.
    struct FakeToolchain {
        build_root: Utf8PathBuf,
        plugin: String,
        fail_generation_for: Vec<String>,
        fail_matching: Vec<(String, i32)>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl FakeToolchain {
        fn new(settings: &PipelineSettings) -> Self {
            Self {
                build_root: settings.build_root.clone(),
                plugin: settings.plugin.clone(),
                fail_generation_for: vec![],
                fail_matching: vec![],
                calls: Mutex::new(vec![]),
            }
        }

        fn fail_generation_for(mut self, module: &str) -> Self {
            self.fail_generation_for.push(module.to_string());
            self
        }

        fn fail_matching(mut self, marker: &str, code: i32) -> Self {
            self.fail_matching.push((marker.to_string(), code));
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().expect("lock calls").len()
        }

        fn fail(code: i32) -> ProcessOutput {
            ProcessOutput {
                exit_code: Some(code),
                stdout: Vec::new(),
                stderr: b"boom".to_vec(),
            }
        }

        fn ok() -> ProcessOutput {
            ProcessOutput {
                exit_code: Some(0),
                stdout: b"ok".to_vec(),
                stderr: Vec::new(),
            }
        }
    }

    impl ProcessPort for FakeToolchain {
        fn run(
            &self,
            program: &str,
            args: &[String],
            _cwd: &camino::Utf8Path,
        ) -> anyhow::Result<ProcessOutput> {
            self.calls
                .lock()
                .expect("lock calls")
                .push((program.to_string(), args.to_vec()));

            if program == "schema-codegen" {
                let module = args
                    .iter()
                    .position(|a| a == "--module")
                    .and_then(|i| args.get(i + 1))
                    .cloned()
                    .unwrap_or_default();
                if self.fail_generation_for.contains(&module) {
                    return Ok(Self::fail(1));
                }
                let dir = self.build_root.join(&module).join(&self.plugin);
                fs::create_dir_all(&dir).expect("mkdir output");
                fs::write(dir.join("Cargo.toml"), "[package]\n").expect("write package manifest");
                return Ok(Self::ok());
            }

            for (marker, code) in &self.fail_matching {
                if args.iter().any(|a| a.contains(marker.as_str())) {
                    return Ok(Self::fail(*code));
                }
            }
            Ok(Self::ok())
        }
    }

    fn sandbox() -> (TempDir, PipelineSettings) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let settings = PipelineSettings {
            project_root: root.clone(),
            build_root: root.join("build"),
            artifacts_dir: root.join("artifacts"),
            commands: vec![
                CommandSpec::new(
                    "build",
                    vec!["cargo".into(), "build".into(), "-p".into(), "{module}".into()],
                ),
                CommandSpec::new(
                    "test",
                    vec!["cargo".into(), "test".into(), "-p".into(), "{module}".into()],
                )
                .after("build"),
            ],
            ..Default::default()
        };
        (temp, settings)
    }

    fn registry() -> Vec<GenerationTarget> {
        vec![
            GenerationTarget::new("com.x#Simple", "simple"),
            GenerationTarget::new("com.y#Ebs", "ebs"),
        ]
    }

    fn tool() -> ReportToolInfo {
        ReportToolInfo {
            name: "genfleet".into(),
            version: "0.0.0-test".into(),
            commit: None,
        }
    }

    #[test]
    fn both_targets_succeeding_yields_a_pass_report() {
        let (_temp, settings) = sandbox();
        let port = FakeToolchain::new(&settings);

        let outcome = run_pipeline(&settings, &registry(), &port, tool()).expect("pipeline");
        assert!(outcome.is_success());
        assert_eq!(outcome.report.verdict.status, ReportStatus::Pass);

        // 2 generate + 4 command units.
        assert_eq!(outcome.report.results.results.len(), 6);
        assert!(
            outcome
                .report
                .results
                .results
                .iter()
                .all(|r| r.status == UnitStatus::Succeeded)
        );

        // The manifest artifact has exactly the two registered entries.
        let manifest = genfleet_manifest::read_manifest(&settings.manifest_path()).expect("manifest");
        assert_eq!(manifest.modules().collect::<Vec<_>>(), vec!["simple", "ebs"]);

        // The workspace lists both members.
        let workspace =
            fs::read_to_string(settings.build_root.join("Cargo.toml")).expect("workspace");
        assert!(workspace.contains(&format!("simple/{}", settings.plugin)));
        assert!(workspace.contains(&format!("ebs/{}", settings.plugin)));
    }

    #[test]
    fn generation_failure_isolates_the_failing_target() {
        let (_temp, settings) = sandbox();
        let port = FakeToolchain::new(&settings).fail_generation_for("ebs");

        let outcome = run_pipeline(&settings, &registry(), &port, tool()).expect("pipeline");
        assert!(!outcome.is_success());
        assert_eq!(outcome.report.verdict.status, ReportStatus::Fail);

        // The workspace lists only the surviving member.
        let workspace =
            fs::read_to_string(settings.build_root.join("Cargo.toml")).expect("workspace");
        assert!(workspace.contains("simple/"));
        assert!(!workspace.contains("ebs/"));

        let results = &outcome.report.results;
        assert_eq!(
            results.unit("ebs", stage::GENERATE).expect("unit").status,
            UnitStatus::Failed
        );
        for command in ["build", "test"] {
            assert_eq!(
                results.unit("ebs", command).expect("unit").status,
                UnitStatus::Skipped
            );
            assert_eq!(
                results.unit("simple", command).expect("unit").status,
                UnitStatus::Succeeded
            );
        }
        assert!(results.warnings.iter().any(|w| w.contains("ebs")));
    }

    #[test]
    fn duplicate_modules_abort_before_any_side_effect() {
        let (_temp, settings) = sandbox();
        let port = FakeToolchain::new(&settings);
        let mut targets = registry();
        targets.push(GenerationTarget::new("com.z#Other", "simple"));

        let err = run_pipeline(&settings, &targets, &port, tool()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTarget(_)));

        assert!(!settings.manifest_path().exists());
        assert!(!settings.build_root.exists());
        assert_eq!(port.call_count(), 0);
    }

    #[test]
    fn bad_command_wiring_aborts_before_any_side_effect() {
        let (_temp, mut settings) = sandbox();
        // "test" is ordered after a command that does not exist.
        settings.commands = vec![
            CommandSpec::new("build", vec!["cargo".into(), "build".into()]),
            CommandSpec::new("test", vec!["cargo".into(), "test".into()]).after("bulid"),
        ];
        let port = FakeToolchain::new(&settings);

        let err = run_pipeline(&settings, &registry(), &port, tool()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidCommands(_)));

        assert!(!settings.manifest_path().exists());
        assert!(!settings.build_root.exists());
        assert!(!settings.artifacts_dir.join("report.json").exists());
        assert_eq!(port.call_count(), 0);
    }

    #[test]
    fn finalized_by_command_still_runs_when_tests_fail() {
        let (_temp, mut settings) = sandbox();
        settings.commands.push(
            CommandSpec::new("doc", vec!["cargo".into(), "doc".into(), "{module}".into()])
                .after("test")
                .always(),
        );
        // Every `cargo test` invocation fails.
        let port = FakeToolchain::new(&settings).fail_matching("test", 101);

        let outcome = run_pipeline(&settings, &registry(), &port, tool()).expect("pipeline");
        assert!(!outcome.is_success());

        for module in ["simple", "ebs"] {
            let results = &outcome.report.results;
            assert_eq!(
                results.unit(module, "test").expect("unit").status,
                UnitStatus::Failed
            );
            assert_eq!(
                results.unit(module, "doc").expect("unit").status,
                UnitStatus::Succeeded
            );
        }
    }

    #[test]
    fn stub_extraction_runs_per_generated_target() {
        let (_temp, mut settings) = sandbox();
        settings.stub_script = Some(settings.project_root.join("stubgen.sh"));
        let port = FakeToolchain::new(&settings).fail_generation_for("ebs");

        let outcome = run_pipeline(&settings, &registry(), &port, tool()).expect("pipeline");
        let results = &outcome.report.results;
        assert_eq!(
            results.unit("simple", stage::STUBS).expect("unit").status,
            UnitStatus::Succeeded
        );
        assert_eq!(
            results.unit("ebs", stage::STUBS).expect("unit").status,
            UnitStatus::Skipped
        );
    }

    #[test]
    fn report_artifacts_are_written() {
        let (_temp, settings) = sandbox();
        let port = FakeToolchain::new(&settings);

        run_pipeline(&settings, &registry(), &port, tool()).expect("pipeline");

        let json =
            fs::read_to_string(settings.artifacts_dir.join("report.json")).expect("report.json");
        let parsed: PipelineReport = serde_json::from_str(&json).expect("parse report");
        assert_eq!(parsed.schema, genfleet_types::schema::GENFLEET_REPORT_V1);

        let md = fs::read_to_string(settings.artifacts_dir.join("report.md")).expect("report.md");
        assert!(md.contains("# genfleet report"));
    }

    #[test]
    fn excluded_target_is_generated_but_gets_no_commands() {
        let (_temp, settings) = sandbox();
        let port = FakeToolchain::new(&settings);
        let mut targets = registry();
        targets[1].exclude_from_workspace = true;

        let outcome = run_pipeline(&settings, &targets, &port, tool()).expect("pipeline");
        let results = &outcome.report.results;

        assert_eq!(
            results.unit("ebs", stage::GENERATE).expect("unit").status,
            UnitStatus::Succeeded
        );
        assert!(results.unit("ebs", "build").is_none());

        let workspace =
            fs::read_to_string(settings.build_root.join("Cargo.toml")).expect("workspace");
        assert!(!workspace.contains("ebs/"));
    }
}
