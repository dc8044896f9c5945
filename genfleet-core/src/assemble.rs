//! Workspace assembler: one top-level manifest referencing every generated
//! package as a member.

use crate::settings::PipelineSettings;
use anyhow::Context;
use camino::Utf8PathBuf;
use fs_err as fs;
use genfleet_types::manifest::Manifest;
use toml_edit::{Array, DocumentMut, value};
use tracing::{debug, info, warn};

/// Outcome of workspace assembly.
#[derive(Debug)]
pub struct AssemblyOutcome {
    /// Member paths (`<module>/<plugin>`) written to the workspace manifest.
    pub members: Vec<String>,

    /// Registered modules whose generated output was missing. Degraded to
    /// skipped downstream, never fatal.
    pub missing: Vec<String>,

    pub manifest_path: Utf8PathBuf,

    /// False when the rendered manifest matched the file already on disk.
    pub changed: bool,
}

/// Scan the build root and write `<build-root>/Cargo.toml`.
///
/// Idempotent: an unchanged member set and settings leave the file
/// untouched, preserving its mtime for downstream incremental builds.
pub fn assemble_workspace(
    settings: &PipelineSettings,
    manifest: &Manifest,
) -> anyhow::Result<AssemblyOutcome> {
    let mut members = Vec::new();
    let mut missing = Vec::new();

    for entry in &manifest.entries {
        let package_manifest = settings.package_dir(&entry.module).join("Cargo.toml");
        if !package_manifest.exists() {
            if !entry.exclude_from_workspace {
                warn!(module = entry.module.as_str(), "no generated output; excluding from workspace");
                missing.push(entry.module.clone());
            }
            continue;
        }
        if entry.exclude_from_workspace {
            debug!(module = entry.module.as_str(), "generated but excluded from workspace");
            continue;
        }
        members.push(format!("{}/{}", entry.module, manifest.plugin));
    }

    let rendered = render_workspace_manifest(&members, settings.workspace_extra.as_deref())?;
    let manifest_path = settings.build_root.join("Cargo.toml");

    let existing = match fs::read_to_string(&manifest_path) {
        Ok(s) => Some(s),
        Err(_) => None,
    };
    let changed = existing.as_deref() != Some(rendered.as_str());
    if changed {
        fs::create_dir_all(&settings.build_root)
            .with_context(|| format!("create {}", settings.build_root))?;
        fs::write(&manifest_path, &rendered).with_context(|| format!("write {}", manifest_path))?;
        info!(members = members.len(), %manifest_path, "wrote workspace manifest");
    } else {
        debug!(%manifest_path, "workspace manifest unchanged");
    }

    Ok(AssemblyOutcome {
        members,
        missing,
        manifest_path,
        changed,
    })
}

fn render_workspace_manifest(
    members: &[String],
    workspace_extra: Option<&str>,
) -> anyhow::Result<String> {
    let mut doc = DocumentMut::new();

    let mut member_array = Array::new();
    for member in members {
        member_array.push(member.as_str());
    }
    doc["workspace"]["members"] = value(member_array);
    doc["workspace"]["resolver"] = value("2");

    if let Some(extra) = workspace_extra {
        let extra_doc: DocumentMut = extra
            .parse()
            .context("parse workspace_extra as TOML")?;
        for (key, item) in extra_doc.iter() {
            doc[key] = item.clone();
        }
    }

    Ok(doc.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use genfleet_manifest::build_manifest;
    use genfleet_types::target::GenerationTarget;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, PipelineSettings) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let settings = PipelineSettings {
            project_root: root.clone(),
            build_root: root.join("build"),
            artifacts_dir: root.join("artifacts"),
            ..Default::default()
        };
        (temp, settings)
    }

    fn fake_output(settings: &PipelineSettings, module: &str) {
        let dir = settings.package_dir(module);
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("Cargo.toml"), "[package]\n").expect("write manifest");
    }

    fn manifest_for(settings: &PipelineSettings, targets: Vec<GenerationTarget>) -> Manifest {
        build_manifest(&targets, &settings.plugin, &serde_json::json!({})).expect("manifest")
    }

    #[test]
    fn members_are_exactly_the_existing_outputs() {
        let (_temp, settings) = sandbox();
        let manifest = manifest_for(
            &settings,
            vec![
                GenerationTarget::new("com.x#Simple", "simple"),
                GenerationTarget::new("com.y#Ebs", "ebs"),
            ],
        );
        fake_output(&settings, "simple");

        let outcome = assemble_workspace(&settings, &manifest).expect("assemble");
        assert_eq!(
            outcome.members,
            vec![format!("simple/{}", settings.plugin)]
        );
        assert_eq!(outcome.missing, vec!["ebs".to_string()]);

        let written = fs::read_to_string(&outcome.manifest_path).expect("read");
        assert!(written.contains("simple"));
        assert!(!written.contains("ebs"));
        assert!(written.contains("resolver = \"2\""));
    }

    #[test]
    fn excluded_targets_are_not_members_and_not_missing() {
        let (_temp, settings) = sandbox();
        let mut target = GenerationTarget::new("com.x#Simple", "simple");
        target.exclude_from_workspace = true;
        let manifest = manifest_for(&settings, vec![target]);
        fake_output(&settings, "simple");

        let outcome = assemble_workspace(&settings, &manifest).expect("assemble");
        assert!(outcome.members.is_empty());
        assert!(outcome.missing.is_empty());
    }

    #[test]
    fn reassembly_without_changes_leaves_file_untouched() {
        let (_temp, settings) = sandbox();
        let manifest = manifest_for(
            &settings,
            vec![GenerationTarget::new("com.x#Simple", "simple")],
        );
        fake_output(&settings, "simple");

        let first = assemble_workspace(&settings, &manifest).expect("assemble");
        assert!(first.changed);
        let mtime_before = fs::metadata(&first.manifest_path)
            .expect("metadata")
            .modified()
            .expect("mtime");

        std::thread::sleep(Duration::from_millis(20));
        let second = assemble_workspace(&settings, &manifest).expect("assemble");
        assert!(!second.changed);
        let mtime_after = fs::metadata(&second.manifest_path)
            .expect("metadata")
            .modified()
            .expect("mtime");
        assert_eq!(mtime_before, mtime_after);
    }

    #[test]
    fn workspace_extra_is_appended() {
        let (_temp, settings) = sandbox();
        let settings = PipelineSettings {
            workspace_extra: Some("[profile.release]\ndebug = true\n".to_string()),
            ..settings
        };
        let manifest = manifest_for(
            &settings,
            vec![GenerationTarget::new("com.x#Simple", "simple")],
        );
        fake_output(&settings, "simple");

        let outcome = assemble_workspace(&settings, &manifest).expect("assemble");
        let written = fs::read_to_string(&outcome.manifest_path).expect("read");
        assert!(written.contains("[profile.release]"));
        assert!(written.contains("debug = true"));
    }

    #[test]
    fn invalid_workspace_extra_is_an_error() {
        let (_temp, settings) = sandbox();
        let settings = PipelineSettings {
            workspace_extra: Some("not [ valid toml".to_string()),
            ..settings
        };
        let manifest = manifest_for(
            &settings,
            vec![GenerationTarget::new("com.x#Simple", "simple")],
        );
        fake_output(&settings, "simple");

        assert!(assemble_workspace(&settings, &manifest).is_err());
    }
}
