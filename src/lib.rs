//! # rbuild - C/C++/assembly build engine
//!
//! rbuild turns a resolved target description into a linked artifact:
//! it decides which sources are stale, compiles them (optionally in
//! parallel), captures and reports tool output, resolves link order and
//! runs the linker.
//!
//! ## Quick Start
//!
//! ```bash
//! # Build the default targets of rbuild.toml
//! rbuild
//!
//! # Build one target with 8 workers, echoing every command
//! rbuild kernel --jobs 8 --verbose
//! ```
//!
//! ## Module Organization
//!
//! - [`build`] - Build coordinator, job scheduler and cleanup
//! - [`config`] - Project and target descriptors, run options
//! - [`driver`] - Compiler and linker drivers
//! - [`toolchain`] - Driver factory for named toolchains
//! - [`process`] - Subprocess execution and output capture

/// Build coordinator, job scheduler and cleanup.
pub mod build;

/// Modification-time cache for staleness checks.
pub mod cache;

/// Project descriptor parsing (`rbuild.toml` / `rbuild.json`).
pub mod config;

/// Makefile-style dependency record parser.
pub mod depfile;

/// Compiler and linker drivers.
pub mod driver;

/// Error types.
pub mod error;

/// Subprocess execution with output capture.
pub mod process;

/// Toolchain name to driver mapping.
pub mod toolchain;

/// Terminal output helpers.
pub mod ui;
