use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use stubfix_types::diagnostic::{Category, DiagnosticRecord};
use stubfix_types::report::{
    AppliedEdit, EditKind, FileReport, FileStatus, RunInfo, RunReport, ToolInfo, UnresolvedFix,
    UnresolvedKind, Verdict, VerdictStatus,
};
use stubfix_types::rule::{MemberRule, Rule};

#[test]
fn category_serializes_snake_case() {
    let v = serde_json::to_value(Category::OverrideIncompatible).expect("serialize");
    assert_eq!(v, serde_json::json!("override_incompatible"));
    assert_eq!(Category::NameNotDefined.to_string(), "name_not_defined");
}

#[test]
fn diagnostic_record_omits_absent_fields() {
    let record = DiagnosticRecord {
        line: 12,
        column: None,
        category: Category::StaticMismatch,
        raw_message: "Overload does not consistently use the \"@staticmethod\" decorator on all function signatures.".to_string(),
        extracted_name: None,
        code: None,
    };
    let value = serde_json::to_value(&record).expect("serialize");
    assert!(value.get("column").is_none());
    assert!(value.get("extracted_name").is_none());
    assert!(value.get("code").is_none());
    assert_eq!(value["line"], serde_json::json!(12));
}

#[test]
fn rule_uses_table_field_names() {
    let json = serde_json::json!({
        "module": "QtWidgets",
        "class": "QLineEdit",
        "method": "setText",
        "params": [
            { "name": "a0", "current": "str", "desired": "typing.Optional[str]" }
        ]
    });
    let rule: Rule = serde_json::from_value(json).expect("deserialize");
    assert_eq!(rule.class.as_deref(), Some("QLineEdit"));
    assert!(!rule.static_method);
    assert_eq!(rule.parameters.len(), 1);
    assert_eq!(rule.parameters[0].current_annotation.as_deref(), Some("str"));
    assert_eq!(rule.parameters[0].desired_annotation, "typing.Optional[str]");
    assert_eq!(rule.qualified_name(), "QLineEdit.setText");
}

#[test]
fn rule_without_class_is_module_level() {
    let json = serde_json::json!({
        "module": "QtCore",
        "method": "qVersion",
        "static": true,
        "returns": "str",
        "params": []
    });
    let rule: Rule = serde_json::from_value(json).expect("deserialize");
    assert!(rule.class.is_none());
    assert!(rule.static_method);
    assert_eq!(rule.return_override.as_deref(), Some("str"));
    assert_eq!(rule.qualified_name(), "qVersion");
}

#[test]
fn variadic_specs_are_star_prefixed() {
    let json = serde_json::json!({
        "module": "QtCore",
        "class": "QObject",
        "method": "emit",
        "params": [
            { "name": "*args", "current": "typing.Any", "desired": "object" },
            { "name": "a0", "desired": "int" }
        ]
    });
    let rule: Rule = serde_json::from_value(json).expect("deserialize");
    let names: Vec<&str> = rule.variadic_specs().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["*args"]);
}

#[test]
fn member_rule_roundtrips() {
    let rule = MemberRule {
        module: "QtCore".to_string(),
        class: "QObject".to_string(),
        statements: vec!["destroyed: typing.ClassVar[pyqtSignal]".to_string()],
    };
    let value = serde_json::to_value(&rule).expect("serialize");
    let back: MemberRule = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back, rule);
}

#[test]
fn file_report_omits_empty_sections() {
    let report = FileReport::new(Utf8PathBuf::from("PyQt6-stubs/QtCore.pyi"), "QtCore");
    let value = serde_json::to_value(&report).expect("serialize");
    assert_eq!(value["status"], serde_json::json!("unchanged"));
    assert!(value.get("applied").is_none());
    assert!(value.get("unresolved").is_none());
    assert!(value.get("error").is_none());
    assert!(value.get("change").is_none());
}

#[test]
fn run_report_serializes_verdict_and_files() {
    let mut file = FileReport::new(Utf8PathBuf::from("QtWidgets.pyi"), "QtWidgets");
    file.status = FileStatus::Changed;
    file.applied.push(AppliedEdit {
        kind: EditKind::Annotation,
        target: "QLineEdit.setText".to_string(),
        detail: Some("a0: typing.Optional[str]".to_string()),
    });
    file.unresolved.push(UnresolvedFix {
        module: "QtWidgets".to_string(),
        kind: UnresolvedKind::Rule,
        description: "QLabel.setText".to_string(),
    });

    let report = RunReport {
        schema: stubfix_types::schema::STUBFIX_REPORT_V1.to_string(),
        tool: ToolInfo {
            name: "stubfix".to_string(),
            version: Some("0.1.0".to_string()),
            commit: None,
        },
        run: RunInfo::default(),
        verdict: Verdict {
            status: VerdictStatus::Warn,
            ..Default::default()
        },
        files: vec![file],
    };

    let value = serde_json::to_value(&report).expect("serialize");
    assert_eq!(value["schema"], serde_json::json!("stubfix.report.v1"));
    assert_eq!(value["verdict"]["status"], serde_json::json!("warn"));
    assert_eq!(value["files"][0]["status"], serde_json::json!("changed"));
    assert_eq!(value["files"][0]["applied"][0]["kind"], serde_json::json!("annotation"));
    assert_eq!(value["files"][0]["unresolved"][0]["kind"], serde_json::json!("rule"));
    assert!(value["tool"].get("commit").is_none());
}
