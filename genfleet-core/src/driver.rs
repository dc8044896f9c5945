//! Generation driver: one external generator invocation per target.
//!
//! Each target owns its own output subdirectory, so a failed generation
//! cannot corrupt a sibling's output; failures are recorded per target and
//! the remaining targets proceed.

use crate::ports::ProcessPort;
use crate::settings::PipelineSettings;
use crate::template;
use anyhow::Context;
use camino::Utf8PathBuf;
use fs_err as fs;
use genfleet_types::manifest::Manifest;
use genfleet_types::run::{RunResult, stage};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Outcome of the generation stage.
#[derive(Debug, Default)]
pub struct GenerationOutcome {
    pub results: Vec<RunResult>,

    /// Modules whose output directory and package manifest exist.
    pub generated: BTreeSet<String>,
}

/// Run the generator for every manifest entry.
pub fn run_generation(
    settings: &PipelineSettings,
    manifest: &Manifest,
    process: &dyn ProcessPort,
) -> anyhow::Result<GenerationOutcome> {
    let manifest_path = settings.manifest_path();
    let logs_dir = settings.logs_dir();
    fs::create_dir_all(&logs_dir).with_context(|| format!("create {}", logs_dir))?;
    fs::create_dir_all(&settings.build_root)
        .with_context(|| format!("create {}", settings.build_root))?;

    let mut outcome = GenerationOutcome::default();
    for entry in &manifest.entries {
        let module = entry.module.as_str();
        let vars = [
            ("manifest", manifest_path.as_str()),
            ("module", module),
            ("output_root", settings.build_root.as_str()),
        ];
        let args = template::render_args(&settings.generator.args, &vars);

        let output = process.run(&settings.generator.program, &args, &settings.project_root);
        let log = write_log(&logs_dir, module, stage::GENERATE, &output)?;

        let mut result = match output {
            Ok(out) if out.success() => {
                // The generator must leave a self-contained package behind.
                let package_manifest = settings.package_dir(module).join("Cargo.toml");
                if package_manifest.exists() {
                    info!(module, "generated");
                    outcome.generated.insert(module.to_string());
                    RunResult::succeeded(module, stage::GENERATE)
                } else {
                    warn!(module, %package_manifest, "generator exited 0 but wrote no package manifest");
                    RunResult::failed(
                        module,
                        stage::GENERATE,
                        format!("missing generated package manifest {package_manifest}"),
                    )
                }
            }
            Ok(out) => {
                warn!(module, exit_code = ?out.exit_code, "generation failed");
                let mut r = RunResult::failed(
                    module,
                    stage::GENERATE,
                    format!("generator exited with {:?}", out.exit_code),
                );
                r.exit_code = out.exit_code;
                r
            }
            Err(e) => {
                warn!(module, error = %e, "generator could not be spawned");
                RunResult::failed(module, stage::GENERATE, format!("{e:#}"))
            }
        };
        result.log = log;
        outcome.results.push(result);
    }

    Ok(outcome)
}

/// Capture combined stdout/stderr next to the other artifacts. Spawn
/// errors have no output to capture.
pub(crate) fn write_log(
    logs_dir: &camino::Utf8Path,
    module: &str,
    stage: &str,
    output: &anyhow::Result<crate::ports::ProcessOutput>,
) -> anyhow::Result<Option<Utf8PathBuf>> {
    let Ok(out) = output else {
        return Ok(None);
    };
    let path = logs_dir.join(format!("{module}.{stage}.log"));
    fs::write(&path, out.combined()).with_context(|| format!("write {}", path))?;
    Ok(Some(path))
}

/// Check which manifest modules actually have generated output on disk.
/// Used when the verification stages run without a fresh generation pass.
pub fn discover_generated(settings: &PipelineSettings, manifest: &Manifest) -> BTreeSet<String> {
    manifest
        .modules()
        .filter(|m| settings.package_dir(m).join("Cargo.toml").exists())
        .map(|m| m.to_string())
        .collect()
}
