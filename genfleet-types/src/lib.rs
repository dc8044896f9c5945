//! Shared DTOs (schemas-as-code) for the genfleet workspace.
//!
//! # Design constraints
//! - These types are intended to be serialized to disk.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod command;
pub mod manifest;
pub mod report;
pub mod run;
pub mod target;

/// Schema identifiers.
pub mod schema {
    pub const GENFLEET_MANIFEST_V1: &str = "genfleet.manifest.v1";
    pub const GENFLEET_REPORT_V1: &str = "genfleet.report.v1";
}
