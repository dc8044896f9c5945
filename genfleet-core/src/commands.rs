//! Command orchestrator: the downstream verification sequence, run per
//! workspace member.
//!
//! Each (module × command) pair is its own unit: a failure is recorded and
//! contributes to overall pipeline failure, but never halts sibling modules
//! or finalized-by commands.

use crate::driver::write_log;
use crate::graph::{self, Decision};
use crate::ports::ProcessPort;
use crate::settings::PipelineSettings;
use crate::template;
use anyhow::Context;
use fs_err as fs;
use genfleet_types::command::CommandSpec;
use genfleet_types::run::{RunResult, UnitStatus};
use std::collections::HashMap;
use tracing::{info, warn};

/// A module eligible for downstream commands, or the reason it is not.
#[derive(Debug, Clone)]
pub enum ModuleDisposition {
    /// Module is a workspace member; commands run.
    Ready,
    /// Generation failed or output went missing; every command is skipped
    /// with this reason.
    Degraded { reason: String },
}

/// Run every configured command against every module, in graph order.
///
/// Returns one [`RunResult`] per (module × command) pair.
pub fn run_commands(
    settings: &PipelineSettings,
    specs: &[CommandSpec],
    modules: &[(String, ModuleDisposition)],
    process: &dyn ProcessPort,
) -> anyhow::Result<Vec<RunResult>> {
    let graph = graph::from_commands(specs).context("wire command graph")?;
    let order = graph.execution_order().context("order commands")?;

    let logs_dir = settings.logs_dir();
    fs::create_dir_all(&logs_dir).with_context(|| format!("create {}", logs_dir))?;
    let manifest_path = settings.manifest_path();

    let mut results = Vec::new();
    for (module, disposition) in modules {
        if let ModuleDisposition::Degraded { reason } = disposition {
            for spec in specs {
                results.push(RunResult::skipped(module, &spec.name, reason.clone()));
            }
            continue;
        }

        let package_dir = settings.package_dir(module);
        let vars = [
            ("module", module.as_str()),
            ("package_dir", package_dir.as_str()),
            ("workspace_dir", settings.build_root.as_str()),
            ("manifest", manifest_path.as_str()),
        ];

        let mut states: HashMap<usize, UnitStatus> = HashMap::new();
        for &node in &order {
            let spec = &specs[node];

            if let Decision::Skip { reason } = graph.decide(node, &states) {
                states.insert(node, UnitStatus::Skipped);
                results.push(RunResult::skipped(module, &spec.name, reason));
                continue;
            }

            let (program, args) = match spec.command.split_first() {
                Some((program, rest)) => (
                    template::render(program, &vars),
                    template::render_args(rest, &vars),
                ),
                None => {
                    states.insert(node, UnitStatus::Failed);
                    results.push(RunResult::failed(module, &spec.name, "empty command line"));
                    continue;
                }
            };

            let output = process.run(&program, &args, &settings.build_root);
            let log = write_log(&logs_dir, module, &spec.name, &output)?;

            let mut result = match output {
                Ok(out) if out.success() => {
                    info!(module, command = spec.name.as_str(), "command succeeded");
                    RunResult::succeeded(module, &spec.name)
                }
                Ok(out) => {
                    warn!(module, command = spec.name.as_str(), exit_code = ?out.exit_code, "command failed");
                    let mut r = RunResult::failed(
                        module,
                        &spec.name,
                        format!("exited with {:?}", out.exit_code),
                    );
                    r.exit_code = out.exit_code;
                    r
                }
                Err(e) => {
                    warn!(module, command = spec.name.as_str(), error = %e, "command could not be spawned");
                    RunResult::failed(module, &spec.name, format!("{e:#}"))
                }
            };
            result.log = log;
            states.insert(node, result.status);
            results.push(result);
        }
    }

    Ok(results)
}
