//! Target registry validation and manifest generation.
//!
//! The manifest is the single configuration artifact the external code
//! generator consumes. Construction is deterministic: identical registries
//! produce byte-identical manifests (entry order follows registry order).

mod merge;

pub use merge::merge_config;

use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use genfleet_types::manifest::{Manifest, ManifestEntry};
use genfleet_types::target::{GenerationTarget, InvalidTargetError};
use std::collections::BTreeSet;
use tracing::debug;

/// Validate the registry before any generation side effect.
///
/// Module names are workspace member keys and directory names; a collision
/// corrupts the assembled workspace, so duplicates are fatal.
pub fn validate_registry(targets: &[GenerationTarget]) -> Result<(), InvalidTargetError> {
    let mut seen = BTreeSet::new();
    for target in targets {
        if target.module.trim().is_empty() {
            return Err(InvalidTargetError::EmptyModule {
                entry: target.entry.clone(),
            });
        }
        if target.entry.trim().is_empty() {
            return Err(InvalidTargetError::EmptyEntryPoint {
                module: target.module.clone(),
            });
        }
        if !seen.insert(target.module.as_str()) {
            return Err(InvalidTargetError::DuplicateModule {
                module: target.module.clone(),
            });
        }
    }
    Ok(())
}

/// Build the manifest from a validated registry.
///
/// `base_config` applies to every target; a target's `extra_config`
/// fragment is deep-merged on top (see [`merge_config`]).
pub fn build_manifest(
    targets: &[GenerationTarget],
    plugin: &str,
    base_config: &serde_json::Value,
) -> Result<Manifest, InvalidTargetError> {
    validate_registry(targets)?;

    let mut manifest = Manifest::new(plugin);
    for target in targets {
        let config = match &target.extra_config {
            Some(fragment) => {
                let fragment: serde_json::Value =
                    serde_json::from_str(fragment).map_err(|e| {
                        InvalidTargetError::BadConfigFragment {
                            module: target.module.clone(),
                            message: e.to_string(),
                        }
                    })?;
                if !fragment.is_object() {
                    return Err(InvalidTargetError::BadConfigFragment {
                        module: target.module.clone(),
                        message: "fragment must be a JSON object".to_string(),
                    });
                }
                merge_config(base_config, &fragment)
            }
            None => base_config.clone(),
        };

        manifest.entries.push(ManifestEntry {
            module: target.module.clone(),
            entry: target.entry.clone(),
            imports: target.imports.clone(),
            plugin: plugin.to_string(),
            config,
            exclude_from_workspace: target.exclude_from_workspace,
        });
    }

    debug!(entries = manifest.entries.len(), "built manifest");
    Ok(manifest)
}

/// Write the manifest artifact to its fixed run-scoped location.
pub fn write_manifest(manifest: &Manifest, path: &Utf8Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create parent dir for {}", path))?;
    }
    let json = serde_json::to_string_pretty(manifest).context("serialize manifest")?;
    fs::write(path, json).with_context(|| format!("write {}", path))?;
    Ok(())
}

/// Read a manifest artifact back from disk.
pub fn read_manifest(path: &Utf8Path) -> anyhow::Result<Manifest> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path))
}
