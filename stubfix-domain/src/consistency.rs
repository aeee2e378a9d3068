//! End-of-module accounting: everything that was asked for but never applied.

use stubfix_types::diagnostic::DiagnosticRecord;
use stubfix_types::report::{UnresolvedFix, UnresolvedKind};
use tracing::error;

use crate::fix::FixIntent;
use crate::rewriter::Pending;

/// Turns leftovers of classification and rewriting into report entries, one per item.
pub fn unresolved(
    module: &str,
    pending: &Pending,
    unplaced: &[DiagnosticRecord],
    unsupported: &[DiagnosticRecord],
) -> Vec<UnresolvedFix> {
    let mut out = Vec::new();

    for rule in &pending.rules {
        let description = format!("rule {} did not match", rule.qualified_name());
        out.push(entry(module, UnresolvedKind::Rule, description));
    }
    for member in &pending.members {
        let description = format!(
            "member statements for {} were not added ({} statement(s))",
            member.class,
            member.statements.len()
        );
        out.push(entry(module, UnresolvedKind::MemberRule, description));
    }
    for intent in &pending.intents {
        out.push(entry(module, UnresolvedKind::Intent, describe(intent)));
    }
    for record in unplaced {
        let description = format!(
            "line {}: no class or function for {}",
            record.line, record.raw_message
        );
        out.push(entry(module, UnresolvedKind::Diagnostic, description));
    }
    for record in unsupported {
        let description = format!("line {}: unsupported {}", record.line, record.raw_message);
        out.push(entry(module, UnresolvedKind::Diagnostic, description));
    }

    for fix in &out {
        error!(module = %fix.module, kind = ?fix.kind, "unresolved: {}", fix.description);
    }
    out
}

fn describe(intent: &FixIntent) -> String {
    match intent {
        FixIntent::AddImport(_) => format!("{} was not applied", intent),
        _ => format!("{} was not consumed", intent),
    }
}

fn entry(module: &str, kind: UnresolvedKind, description: String) -> UnresolvedFix {
    UnresolvedFix {
        module: module.to_string(),
        kind,
        description,
    }
}
