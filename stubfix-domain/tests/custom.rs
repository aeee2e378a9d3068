//! Compiled-in whole-signature replacements.

use pretty_assertions::assert_eq;
use stubfix_domain::{apply_custom_fixes, custom_fixes};
use stubfix_syntax::parse_module;
use stubfix_types::report::EditKind;

fn apply(module: &str, source: &str) -> (String, usize) {
    let mut tree = parse_module(source).unwrap();
    let applied = apply_custom_fixes(module, &mut tree).unwrap();
    assert!(applied.iter().all(|e| e.kind == EditKind::CustomReplace));
    (tree.render(), applied.len())
}

#[test]
fn registry_covers_known_fixes() {
    let names: Vec<&str> = custom_fixes().iter().map(|f| f.name).collect();
    assert_eq!(
        names,
        vec![
            "pyqtslot_decorator",
            "qlineedit_settext_none",
            "voidptr_asarray_array",
            "voidptr_setwriteable_bool",
        ]
    );
}

#[test]
fn voidptr_methods_are_replaced_in_place() {
    let source = "\
class voidptr:
    def __init__(self, addr: typing.Any, size: int = -1, writeable: bool = True) -> None: ...
    def asarray(self, size: int = -1) -> array: ...
    def setwriteable(self, bool) -> None: ...
    def asstring(self, size: int = -1) -> bytes: ...
";
    let (text, applied) = apply("sip", source);
    assert_eq!(
        text,
        "\
class voidptr:
    def __init__(self, addr: typing.Any, size: int = -1, writeable: bool = True) -> None: ...
    def asarray(self, size: int = -1) -> array[int]: ...
    def setwriteable(self, bool: bool) -> None: ...
    def asstring(self, size: int = -1) -> bytes: ...
"
    );
    assert_eq!(applied, 2);

    let (again, applied) = apply("sip", &text);
    assert_eq!(again, text);
    assert_eq!(applied, 0);
}

#[test]
fn pyqt_slot_overloads_collapse_into_the_replacement() {
    let source = "\
import typing

@typing.overload
def pyqtSlot(*types, name: typing.Optional[str] = ...) -> typing.Callable[..., typing.Optional[str]]: ...
@typing.overload
def pyqtSlot(*types, revision: int = ...) -> typing.Callable[..., typing.Any]: ...

def pyqtRemoveInputHook() -> None: ...
";
    let (text, applied) = apply("QtCore", source);
    assert_eq!(applied, 1);
    assert!(text.starts_with("import typing\n\nT = typing.TypeVar('T')\nFuncT = typing.Callable[..., T]\n@typing.overload\ndef pyqtSlot(*types: typing.Any) -> "));
    assert_eq!(text.matches("def pyqtSlot(").count(), 12);
    assert!(!text.contains("typing.Optional[str] = ..."));
    assert!(text.ends_with("\ndef pyqtRemoveInputHook() -> None: ...\n"));

    let (again, applied) = apply("QtCore", &text);
    assert_eq!(again, text);
    assert_eq!(applied, 0);
}

#[test]
fn fixes_are_scoped_by_module_and_class() {
    let source = "class QLabel(QFrame):\n    def setText(self, a0: str) -> None: ...\n";
    assert_eq!(apply("QtWidgets", source), (source.to_string(), 0));

    let source = "class QLineEdit(QWidget):\n    def setText(self, a0: str) -> None: ...\n";
    assert_eq!(apply("QtGui", source), (source.to_string(), 0));

    let (text, applied) = apply("QtWidgets", source);
    assert_eq!(applied, 1);
    assert_eq!(
        text,
        "class QLineEdit(QWidget):\n    def setText(self, a0: typing.Optional[str]) -> None: ...\n"
    );
}
