//! Error types for stubfix-domain.
//!
//! Every variant is fatal for the module being processed. Rules or fixes that simply did not
//! apply are not errors; they come back as unresolved fixes.

use stubfix_syntax::ParseError;
use stubfix_types::diagnostic::Category;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Two different fixes point at the same line or the same node.
    #[error("{module}: ambiguous fix target {target}: {first} vs {second}")]
    AmbiguousFixTarget {
        module: String,
        target: String,
        first: String,
        second: String,
    },

    /// A class header can only take an override suppression.
    #[error("{module}: cannot fix class {class} for {category}")]
    UnsupportedClassFix {
        module: String,
        class: String,
        category: Category,
    },

    /// A function matched a rule and also carries a diagnostic fix.
    #[error("{module}: {target} matches a rule and carries a diagnostic fix")]
    ConflictingFixes { module: String, target: String },

    /// An edit needs an anchor statement the module does not have.
    #[error("{module}: no anchor for {what}")]
    MissingAnchor { module: String, what: String },

    #[error("invalid rule table: {message}")]
    RuleTable { message: String },

    #[error("{module}: {source}")]
    Syntax {
        module: String,
        #[source]
        source: ParseError,
    },
}

impl DomainError {
    pub(crate) fn ambiguous(
        module: &str,
        target: impl Into<String>,
        first: impl ToString,
        second: impl ToString,
    ) -> Self {
        DomainError::AmbiguousFixTarget {
            module: module.to_string(),
            target: target.into(),
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub(crate) fn missing_anchor(module: &str, what: impl Into<String>) -> Self {
        DomainError::MissingAnchor {
            module: module.to_string(),
            what: what.into(),
        }
    }
}
