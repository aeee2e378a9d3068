//! Domain logic: turn checker diagnostics and the rule table into edits on a stub tree.
//!
//! This crate owns *what* gets fixed and where. Reading and printing stub text is the
//! `stubfix-syntax` crate; running the checker and writing files is `stubfix-core`.

mod classifier;
mod consistency;
mod context;
mod custom;
mod error;
mod fix;
mod matcher;
mod rewriter;
mod rules;

pub use classifier::{Classification, classify};
pub use consistency::unresolved;
pub use context::{FileContext, TraversalContext};
pub use custom::{CustomFix, apply_custom_fixes, custom_fixes};
pub use error::DomainError;
pub use fix::{FixIntent, FixTarget, IntentPool};
pub use matcher::{Mismatch, check, find_match, is_satisfied};
pub use rewriter::{Pending, RewriteOptions, RewriteOutcome, rewrite};
pub use rules::{ModuleRules, RuleTable};
