//! Loading and validating rule tables.

use std::collections::BTreeSet;

use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use stubfix_domain::{IntentPool, RewriteOptions, RuleTable, rewrite};
use stubfix_syntax::parse_module;

#[test]
fn builtin_rules_have_unique_shapes() {
    let table = RuleTable::builtin().unwrap();
    let mut seen = BTreeSet::new();
    for rule in table.rules() {
        let shape: Vec<_> = rule
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.current_annotation.clone()))
            .collect();
        assert!(
            seen.insert((rule.module.clone(), rule.qualified_name(), rule.static_method, shape)),
            "duplicate rule {}.{}",
            rule.module,
            rule.qualified_name()
        );
    }
}

#[test]
fn builtin_aliases_are_single_statements() {
    let table = RuleTable::builtin().unwrap();
    for alias in table.rules().iter().filter_map(|r| r.injected_type_alias.as_deref()) {
        assert!(!alias.contains('\n'), "{alias}");
        assert!(alias.contains(" = "), "{alias}");
    }
}

#[test]
fn module_pools_only_hold_their_module() {
    let table = RuleTable::builtin().unwrap();
    for module in table.modules() {
        let pool = table.for_module(module);
        assert!(!pool.is_empty());
        assert!(pool.rules.iter().all(|r| r.module == module));
        assert!(pool.members.iter().all(|m| m.module == module));
    }
    assert!(table.for_module("QtBluetooth").is_empty());
}

#[test]
fn tables_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("rules.toml")).unwrap();
    std::fs::write(
        &path,
        r#"
[[rule]]
module = "QtGui"
class = "QAction"
method = "setText"
params = [{ name = "text", current = "str", desired = "typing.Optional[str]" }]

[[member]]
module = "QtGui"
class = "QAction"
statements = ["def __bool__(self) -> bool: ..."]
"#,
    )
    .unwrap();

    let table = RuleTable::from_path(&path).unwrap();
    assert_eq!(table.rules().len(), 1);
    assert_eq!(table.members().len(), 1);
    assert_eq!(table.modules().into_iter().collect::<Vec<_>>(), vec!["QtGui"]);
}

#[test]
fn unreadable_tables_name_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("missing.toml")).unwrap();
    let err = RuleTable::from_path(&path).unwrap_err();
    assert!(format!("{err:#}").contains("missing.toml"));
}

#[test]
fn member_rules_need_statements() {
    let err = RuleTable::parse("[[member]]\nmodule = \"QtCore\"\nclass = \"pyqtSignal\"\nstatements = []\n")
        .unwrap_err();
    assert!(err.to_string().contains("without statements"));
}

#[test]
fn builtin_rules_fix_the_generated_signatures() {
    let table = RuleTable::builtin().unwrap();
    let cases = [
        (
            "QtWidgets",
            "class QLineEdit(QWidget):\n    def setText(self, a0: str) -> None: ...\n",
            "class QLineEdit(QWidget):\n    def setText(self, a0: typing.Optional[str]) -> None: ...\n",
        ),
        (
            "sip",
            "class voidptr:\n    def setwriteable(self, bool) -> None: ...\n",
            "class voidptr:\n    def setwriteable(self, bool: bool) -> None: ...\n",
        ),
    ];
    assert_eq!(table.rules().len(), cases.len());

    for (module, before, after) in cases {
        let mut tree = parse_module(before).unwrap();
        let outcome = rewrite(
            module,
            &mut tree,
            IntentPool::default(),
            table.for_module(module),
            &RewriteOptions::default(),
        )
        .unwrap();
        assert_eq!(tree.render(), after, "{module}");
        assert!(outcome.pending.is_empty(), "{module}");
    }
}
