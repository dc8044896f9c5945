//! Timestamp normalizer.
//!
//! Generators rewrite every output file on every run, even when content is
//! identical, which defeats timestamp-based incremental rebuilds downstream.
//! This pass hashes every file under the build root against the previous
//! run's recorded state: content-identical files get their prior mtime
//! restored, content-changed files keep their fresh mtime (strictly newer
//! than any restored sibling) and are re-recorded.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use genfleet_hash::sha256_file;
use glob::glob;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Directory under the build root holding normalizer state.
pub const STATE_DIR: &str = ".genfleet";
const STATE_FILE: &str = "mtimes.json";

/// Downstream commands run cargo against the assembled workspace, so the
/// build root accumulates a `target/` output tree. It is not generated
/// content and must not be hashed or recorded.
const CARGO_TARGET_DIR: &str = "target";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MtimeState {
    #[serde(default)]
    files: BTreeMap<String, FileStamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileStamp {
    sha256: String,
    mtime_secs: u64,
    mtime_nanos: u32,
}

/// Counts from one normalization pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizeOutcome {
    /// Files whose prior mtime was restored (content unchanged).
    pub restored: u64,
    /// Files recorded fresh (new or content changed).
    pub refreshed: u64,
}

/// Normalize mtimes under the build root.
///
/// Tolerates a missing or corrupt state file and partially-written outputs
/// from interrupted runs: anything unrecorded or unreadable is simply
/// treated as changed.
pub fn normalize_timestamps(build_root: &Utf8Path) -> anyhow::Result<NormalizeOutcome> {
    let state_path = build_root.join(STATE_DIR).join(STATE_FILE);
    let previous = load_state(&state_path);

    let mut next = MtimeState::default();
    let mut outcome = NormalizeOutcome::default();

    for path in walk_files(build_root)? {
        let rel = path
            .strip_prefix(build_root)
            .unwrap_or(&path)
            .as_str()
            .replace('\\', "/");

        let hash = match sha256_file(path.as_std_path()) {
            Ok(h) => h,
            Err(e) => {
                debug!(path = path.as_str(), error = %e, "skipping unreadable file");
                continue;
            }
        };

        match previous.files.get(&rel) {
            Some(stamp) if stamp.sha256 == hash => {
                restore_mtime(&path, stamp)
                    .with_context(|| format!("restore mtime of {}", path))?;
                next.files.insert(rel, stamp.clone());
                outcome.restored += 1;
            }
            _ => {
                let mtime = current_mtime(&path)?;
                next.files.insert(
                    rel,
                    FileStamp {
                        sha256: hash,
                        mtime_secs: mtime.0,
                        mtime_nanos: mtime.1,
                    },
                );
                outcome.refreshed += 1;
            }
        }
    }

    save_state(&state_path, &next)?;
    info!(
        restored = outcome.restored,
        refreshed = outcome.refreshed,
        "normalized timestamps"
    );
    Ok(outcome)
}

fn walk_files(build_root: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let pattern = build_root.join("**").join("*");
    let mut out = Vec::new();
    for entry in glob(pattern.as_str()).context("glob build root")? {
        let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
        let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
            continue;
        };
        if !path.is_file() {
            continue;
        }
        let rel = path.strip_prefix(build_root).unwrap_or(&path);
        let top = rel.components().next().map(|c| c.as_str());
        if matches!(top, Some(STATE_DIR) | Some(CARGO_TARGET_DIR)) {
            continue;
        }
        out.push(path);
    }
    // Deterministic order matters for reproducible state files.
    out.sort();
    Ok(out)
}

fn load_state(path: &Utf8Path) -> MtimeState {
    match fs::read_to_string(path) {
        Ok(s) => match serde_json::from_str(&s) {
            Ok(state) => state,
            Err(e) => {
                debug!(path = path.as_str(), error = %e, "corrupt mtime state; treating all files as changed");
                MtimeState::default()
            }
        },
        Err(_) => MtimeState::default(),
    }
}

fn save_state(path: &Utf8Path, state: &MtimeState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
    }
    let json = serde_json::to_string_pretty(state).context("serialize mtime state")?;
    fs::write(path, json).with_context(|| format!("write {}", path))?;
    Ok(())
}

fn restore_mtime(path: &Utf8Path, stamp: &FileStamp) -> anyhow::Result<()> {
    let time = UNIX_EPOCH + Duration::new(stamp.mtime_secs, stamp.mtime_nanos);
    let file = std::fs::OpenOptions::new()
        .append(true)
        .open(path.as_std_path())
        .with_context(|| format!("open {}", path))?;
    file.set_modified(time)
        .with_context(|| format!("set mtime of {}", path))?;
    Ok(())
}

fn current_mtime(path: &Utf8Path) -> anyhow::Result<(u64, u32)> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("stat {}", path))?;
    let since_epoch = modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    Ok((since_epoch.as_secs(), since_epoch.subsec_nanos()))
}

/// Read back a file's mtime, for tests and diagnostics.
pub fn file_mtime(path: &Utf8Path) -> anyhow::Result<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("stat {}", path))
}
