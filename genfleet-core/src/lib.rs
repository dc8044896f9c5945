//! Embeddable orchestration engine for genfleet.
//!
//! Provides a clap-free, I/O-abstracted entry point suitable for linking
//! into a larger build host or driving from the CLI.
//!
//! # Port traits
//!
//! External tools are reached through the port traits in [`ports`]:
//! - [`ProcessPort`](ports::ProcessPort) — spawn the generator, toolchain
//!   commands, and the stub-extraction script
//!
//! The [`adapters`] module provides the default shell-backed implementation
//! plus an in-memory scripted port for tests.
//!
//! # Entry points
//!
//! - [`run_pipeline`](pipeline::run_pipeline) — the whole orchestration
//! - Stage functions: [`driver::run_generation`], [`assemble::assemble_workspace`],
//!   [`mtime::normalize_timestamps`], [`commands::run_commands`],
//!   [`stubs::run_stub_extraction`]

pub mod adapters;
pub mod assemble;
pub mod commands;
pub mod driver;
pub mod graph;
pub mod mtime;
pub mod pipeline;
pub mod ports;
pub mod settings;
pub mod stubs;

mod template;

// Re-export registry/manifest entry points so embedders don't need
// genfleet-manifest directly.
pub use genfleet_manifest::{build_manifest, validate_registry, write_manifest};
