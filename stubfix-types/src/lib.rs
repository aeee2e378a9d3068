//! Shared DTOs (schemas-as-code) for the stubfix workspace.
//!
//! # Design constraints
//! - Report types are serialized to disk; prefer adding optional fields over changing semantics.
//! - Rule types double as the on-disk rule table format (TOML).

pub mod diagnostic;
pub mod report;
pub mod rule;

/// Schema identifiers.
pub mod schema {
    pub const STUBFIX_REPORT_V1: &str = "stubfix.report.v1";
}
