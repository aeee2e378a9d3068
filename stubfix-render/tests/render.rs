use pretty_assertions::assert_eq;
use stubfix_render::render_report_md;
use stubfix_types::diagnostic::UnrecognizedDiagnostic;
use stubfix_types::report::{
    AppliedEdit, Counts, EditKind, FileChange, FileReport, FileStatus, RunInfo, RunReport,
    ToolInfo, UnresolvedFix, UnresolvedKind, Verdict, VerdictStatus,
};
use stubfix_types::schema::STUBFIX_REPORT_V1;

fn report(files: Vec<FileReport>, status: VerdictStatus, counts: Counts) -> RunReport {
    RunReport {
        schema: STUBFIX_REPORT_V1.to_string(),
        tool: ToolInfo {
            name: "stubfix".to_string(),
            version: None,
            commit: None,
        },
        run: RunInfo {
            dry_run: true,
            ..RunInfo::default()
        },
        verdict: Verdict {
            status,
            counts,
            reasons: Vec::new(),
        },
        files,
    }
}

#[test]
fn empty_run_renders_placeholder() {
    let md = render_report_md(&report(Vec::new(), VerdictStatus::Pass, Counts::default()));
    assert_eq!(
        md,
        "# stubfix report\n\n\
         - Verdict: `pass`\n\
         - Files: 0 (changed 0, failed 0)\n\
         - Unresolved fixes: 0\n\
         - Unrecognized diagnostics: 0\n\
         - Mode: dry run\n\n\
         ## Files\n\n\
         _No stub files processed._\n"
    );
}

#[test]
fn file_sections_list_edits_and_leftovers() {
    let mut file = FileReport::new("PyQt6-stubs/QtWidgets.pyi".into(), "QtWidgets");
    file.status = FileStatus::Changed;
    file.change = Some(FileChange {
        sha256_before: "a".repeat(64),
        sha256_after: "b".repeat(64),
        bytes_before: 120,
        bytes_after: 141,
    });
    file.applied.push(AppliedEdit {
        kind: EditKind::Annotation,
        target: "QLineEdit.setText".to_string(),
        detail: Some("a0: typing.Optional[str]".to_string()),
    });
    file.applied.push(AppliedEdit {
        kind: EditKind::RemoveFunction,
        target: "QFoo.f".to_string(),
        detail: None,
    });
    file.unresolved.push(UnresolvedFix {
        module: "QtWidgets".to_string(),
        kind: UnresolvedKind::Rule,
        description: "rule QLabel.setText did not match".to_string(),
    });
    file.unrecognized.push(UnrecognizedDiagnostic {
        line: 12,
        raw_message: "Missing return statement".to_string(),
    });

    let counts = Counts {
        files: 1,
        changed: 1,
        failed: 0,
        unresolved: 1,
        unrecognized: 1,
    };
    let md = render_report_md(&report(vec![file], VerdictStatus::Warn, counts));

    assert!(md.contains("- Verdict: `warn`\n"));
    assert!(md.contains("### PyQt6-stubs/QtWidgets.pyi\n\n- Module: `QtWidgets`\n- Status: `changed`\n- Bytes: 120 → 141\n"));
    assert!(md.contains("- `annotation` QLineEdit.setText: a0: typing.Optional[str]\n"));
    assert!(md.contains("- `remove_function` QFoo.f\n"));
    assert!(md.contains("**Unresolved**\n\n- `rule` rule QLabel.setText did not match\n"));
    assert!(md.contains("- line 12: Missing return statement\n"));
}

#[test]
fn failed_files_show_their_error() {
    let mut file = FileReport::new("stubs/sip.pyi".into(), "sip");
    file.status = FileStatus::Failed;
    file.error = Some("sip: no anchor for PYQT_SLOT".to_string());
    let counts = Counts {
        files: 1,
        failed: 1,
        ..Counts::default()
    };
    let md = render_report_md(&report(vec![file], VerdictStatus::Fail, counts));
    assert!(md.contains("- Status: `failed`\n- Error: sip: no anchor for PYQT_SLOT\n"));
}
