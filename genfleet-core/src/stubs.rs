//! Stub extractor driver: interface-stub generation per target, for
//! consumption by a different-language caller.

use crate::driver::write_log;
use crate::ports::ProcessPort;
use crate::settings::PipelineSettings;
use anyhow::Context;
use fs_err as fs;
use genfleet_types::manifest::Manifest;
use genfleet_types::run::{RunResult, stage};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Run the stub-extraction script once per generated target.
///
/// Invocation contract: `script <module-name> <package-manifest-path>
/// <output-directory>`, with dashes in the module name flattened to
/// underscores. A failing target is recorded and extraction continues.
pub fn run_stub_extraction(
    settings: &PipelineSettings,
    manifest: &Manifest,
    generated: &BTreeSet<String>,
    process: &dyn ProcessPort,
) -> anyhow::Result<Vec<RunResult>> {
    let Some(script) = &settings.stub_script else {
        return Ok(Vec::new());
    };

    let logs_dir = settings.logs_dir();
    fs::create_dir_all(&logs_dir).with_context(|| format!("create {}", logs_dir))?;

    let mut results = Vec::new();
    for entry in &manifest.entries {
        let module = entry.module.as_str();
        if !generated.contains(module) {
            results.push(RunResult::skipped(
                module,
                stage::STUBS,
                "no generated output",
            ));
            continue;
        }

        let package_dir = settings.package_dir(module);
        let args = vec![
            module.replace('-', "_"),
            package_dir.join("Cargo.toml").to_string(),
            package_dir.to_string(),
        ];

        let output = process.run(script.as_str(), &args, &settings.build_root);
        let log = write_log(&logs_dir, module, stage::STUBS, &output)?;

        let mut result = match output {
            Ok(out) if out.success() => {
                info!(module, "extracted stubs");
                RunResult::succeeded(module, stage::STUBS)
            }
            Ok(out) => {
                warn!(module, exit_code = ?out.exit_code, "stub extraction failed");
                let mut r = RunResult::failed(
                    module,
                    stage::STUBS,
                    format!("stub script exited with {:?}", out.exit_code),
                );
                r.exit_code = out.exit_code;
                r
            }
            Err(e) => {
                warn!(module, error = %e, "stub script could not be spawned");
                RunResult::failed(module, stage::STUBS, format!("{e:#}"))
            }
        };
        result.log = log;
        results.push(result);
    }

    Ok(results)
}
