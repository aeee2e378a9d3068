//! Embeddable core library for stubfix.
//!
//! Provides a clap-free, I/O-abstracted entry point for patching a directory of generated stubs.
//!
//! # Port traits
//!
//! I/O that varies between hosts sits behind the traits in [`ports`]:
//! - [`DiagnosticSource`](ports::DiagnosticSource): checker output for one stub file
//! - [`WritePort`](ports::WritePort): write files and create directories
//!
//! The [`adapters`] module provides the subprocess and filesystem implementations.
//!
//! # Entry points
//!
//! - [`process_module`](pipeline::process_module): fix one module's text in memory
//! - [`run_batch`](pipeline::run_batch): fix every discovered stub and build the run report
//! - [`write_artifacts`](pipeline::write_artifacts): write `report.json`, `report.md` and `patch.diff`

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

// Re-export the rule table so embedders don't need stubfix-domain directly.
pub use stubfix_domain::RuleTable;
