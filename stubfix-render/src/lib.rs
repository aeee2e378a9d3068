//! Rendering helpers (markdown) for human-readable artifacts.

use stubfix_types::report::{EditKind, FileReport, FileStatus, RunReport, UnresolvedKind};

pub fn render_report_md(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str("# stubfix report\n\n");
    let counts = &report.verdict.counts;
    out.push_str(&format!(
        "- Verdict: `{}`\n",
        report.verdict.status.as_str()
    ));
    out.push_str(&format!(
        "- Files: {} (changed {}, failed {})\n",
        counts.files, counts.changed, counts.failed
    ));
    out.push_str(&format!(
        "- Unresolved fixes: {}\n- Unrecognized diagnostics: {}\n",
        counts.unresolved, counts.unrecognized
    ));
    if report.run.dry_run {
        out.push_str("- Mode: dry run\n");
    }
    if let Some(ms) = report.run.duration_ms {
        out.push_str(&format!("- Duration: {} ms\n", ms));
    }
    for reason in &report.verdict.reasons {
        out.push_str(&format!("- Reason: {}\n", reason));
    }
    out.push('\n');

    out.push_str("## Files\n\n");
    if report.files.is_empty() {
        out.push_str("_No stub files processed._\n");
        return out;
    }

    for file in &report.files {
        render_file(file, &mut out);
    }
    out
}

fn render_file(file: &FileReport, out: &mut String) {
    out.push_str(&format!("### {}\n\n", file.path));
    out.push_str(&format!("- Module: `{}`\n", file.module));
    out.push_str(&format!("- Status: `{}`\n", status_label(file.status)));
    if let Some(change) = &file.change {
        out.push_str(&format!(
            "- Bytes: {} → {}\n",
            change.bytes_before, change.bytes_after
        ));
    }
    if let Some(error) = &file.error {
        out.push_str(&format!("- Error: {}\n", error));
    }

    if !file.applied.is_empty() {
        out.push_str("\n**Applied**\n\n");
        for edit in &file.applied {
            match &edit.detail {
                Some(detail) => out.push_str(&format!(
                    "- `{}` {}: {}\n",
                    edit_label(edit.kind),
                    edit.target,
                    detail
                )),
                None => out.push_str(&format!("- `{}` {}\n", edit_label(edit.kind), edit.target)),
            }
        }
    }

    if !file.unresolved.is_empty() {
        out.push_str("\n**Unresolved**\n\n");
        for fix in &file.unresolved {
            out.push_str(&format!(
                "- `{}` {}\n",
                unresolved_label(fix.kind),
                fix.description
            ));
        }
    }

    if !file.unrecognized.is_empty() {
        out.push_str("\n**Unrecognized diagnostics**\n\n");
        for d in &file.unrecognized {
            out.push_str(&format!("- line {}: {}\n", d.line, d.raw_message));
        }
    }

    out.push('\n');
}

fn status_label(s: FileStatus) -> &'static str {
    match s {
        FileStatus::Unchanged => "unchanged",
        FileStatus::Changed => "changed",
        FileStatus::Failed => "failed",
    }
}

fn edit_label(k: EditKind) -> &'static str {
    match k {
        EditKind::Annotation => "annotation",
        EditKind::Comment => "comment",
        EditKind::RemoveFunction => "remove_function",
        EditKind::RemoveDecorator => "remove_decorator",
        EditKind::AddImport => "add_import",
        EditKind::TypeAlias => "type_alias",
        EditKind::AddMembers => "add_members",
        EditKind::CustomReplace => "custom_replace",
    }
}

fn unresolved_label(k: UnresolvedKind) -> &'static str {
    match k {
        UnresolvedKind::Rule => "rule",
        UnresolvedKind::MemberRule => "member_rule",
        UnresolvedKind::Intent => "intent",
        UnresolvedKind::Diagnostic => "diagnostic",
    }
}
