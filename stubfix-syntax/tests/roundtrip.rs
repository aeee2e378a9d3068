//! Parse/render behavior of the stub syntax tree.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use stubfix_syntax::{NodeKind, ParseError, StubModule, canonical_annotation, parse_module};

const QTWIDGETS: &str = r#"# The PEP 484 type hints stub file for the QtWidgets module.
#
# Generated by SIP 6.7.12

import enum
import typing

import PyQt6.sip

from PyQt6 import QtCore
from PyQt6 import QtGui

# Convenient type aliases.
PYQT_SIGNAL = typing.Union[QtCore.pyqtSignal, QtCore.pyqtBoundSignal]
PYQT_SLOT = typing.Union[typing.Callable[..., Any], QtCore.pyqtBoundSignal]


class QLineEdit(QWidget):

    class ActionPosition(enum.Enum):
        LeadingPosition = ... # type: QLineEdit.ActionPosition
        TrailingPosition = ... # type: QLineEdit.ActionPosition

    @typing.overload
    def __init__(self, parent: typing.Optional[QWidget] = ...) -> None: ...
    @typing.overload
    def __init__(self, contents: typing.Optional[str], parent: typing.Optional[QWidget] = ...) -> None: ...

    def setText(self, a0: str) -> None: ...
    @staticmethod
    def tr(sourceText: str, disambiguation: typing.Optional[str] = ..., n: int = ...) -> str: ...
    def inputMethodQuery(self, property: QtCore.Qt.InputMethodQuery) -> typing.Any: ...  # type: ignore[override]
    def connect(self,
                a: int,
                *args: typing.Any) -> None: ...


def qDrawShadeLine(painter: typing.Optional[QtGui.QPainter], x1: int, y1: int, sunken: bool = ...) -> None: ...
if sys.version_info >= (3, 8):
    def modern() -> None: ...
"#;

fn line_of(source: &str, needle: &str) -> u32 {
    source
        .lines()
        .position(|l| l.contains(needle))
        .map(|i| i as u32 + 1)
        .expect("needle present")
}

fn find_function(module: &StubModule, name: &str) -> Vec<stubfix_syntax::NodeId> {
    module
        .statements()
        .into_iter()
        .filter(|s| module.function(s.id).is_some_and(|f| f.name == name))
        .map(|s| s.id)
        .collect()
}

#[test]
fn unedited_module_renders_identically() {
    let module = parse_module(QTWIDGETS).unwrap();
    assert_eq!(module.render(), QTWIDGETS);
}

#[test]
fn crlf_source_renders_identically() {
    let crlf = QTWIDGETS.replace('\n', "\r\n");
    let module = parse_module(&crlf).unwrap();
    assert_eq!(module.newline(), "\r\n");
    assert_eq!(module.render(), crlf);
}

#[test]
fn statements_know_their_class() {
    let module = parse_module(QTWIDGETS).unwrap();
    let set_text = find_function(&module, "setText");
    assert_eq!(set_text.len(), 1);
    let statement = module
        .statements()
        .into_iter()
        .find(|s| s.id == set_text[0])
        .unwrap();
    let class = module.class(statement.class.unwrap()).unwrap();
    assert_eq!(class.name, "QLineEdit");

    let free = find_function(&module, "qDrawShadeLine");
    let statement = module
        .statements()
        .into_iter()
        .find(|s| s.id == free[0])
        .unwrap();
    assert_eq!(statement.class, None);
    assert_eq!(statement.owner, None);

    assert_eq!(find_function(&module, "__init__").len(), 2);
    assert_eq!(find_function(&module, "modern").len(), 1);
}

#[test]
fn spans_cover_decorators_and_headers() {
    let module = parse_module(QTWIDGETS).unwrap();
    let tr = find_function(&module, "tr")[0];
    let function = module.function(tr).unwrap();
    let def_line = line_of(QTWIDGETS, "def tr(");
    assert_eq!(module.span(tr).unwrap().start, def_line);
    let decorator = function.decorators[0];
    assert_eq!(module.span(decorator).unwrap().start, def_line - 1);
    assert!(module.decorator(decorator).unwrap().is_staticmethod());

    let connect = find_function(&module, "connect")[0];
    let span = module.span(connect).unwrap();
    assert_eq!(span.end - span.start, 2);
    assert_eq!(module.function(connect).unwrap().arity(), 3);
}

#[test]
fn annotation_edit_changes_only_that_parameter() {
    let mut module = parse_module(QTWIDGETS).unwrap();
    let id = find_function(&module, "setText")[0];
    let function = module.function_mut(id).unwrap();
    function
        .param_mut("a0")
        .unwrap()
        .set_annotation("typing.Optional[str]");

    let expected = QTWIDGETS.replace(
        "def setText(self, a0: str) -> None: ...",
        "def setText(self, a0: typing.Optional[str]) -> None: ...",
    );
    assert_eq!(module.render(), expected);
}

#[test]
fn variadic_and_return_edits() {
    let mut module = parse_module(QTWIDGETS).unwrap();
    let id = find_function(&module, "connect")[0];
    let function = module.function_mut(id).unwrap();
    function.param_mut("*args").unwrap().set_annotation("PYQT_SLOT");
    function.set_return_annotation("bool");

    let rendered = module.render();
    assert!(rendered.contains("                *args: PYQT_SLOT) -> bool: ...\n"));
}

#[test]
fn ignore_comments_merge() {
    let mut module = parse_module(QTWIDGETS).unwrap();
    let id = find_function(&module, "inputMethodQuery")[0];
    let trailing = module.function_mut(id).unwrap().suite.trailing_mut();
    assert!(trailing.add_ignore("misc"));
    assert!(!trailing.add_ignore("override"));

    let id = find_function(&module, "setText")[0];
    assert!(module
        .function_mut(id)
        .unwrap()
        .suite
        .trailing_mut()
        .add_ignore("override"));

    let rendered = module.render();
    assert!(rendered.contains("-> typing.Any: ...  # type: ignore[override, misc]\n"));
    assert!(rendered.contains("def setText(self, a0: str) -> None: ...  # type: ignore[override]\n"));
}

#[test]
fn removing_a_function_drops_its_decorators() {
    let mut module = parse_module(QTWIDGETS).unwrap();
    let first = find_function(&module, "__init__")[0];
    module.remove(first);

    let rendered = module.render();
    assert!(!rendered.contains("parent: typing.Optional[QWidget] = ...) -> None: ...\n    @typing.overload"));
    assert_eq!(rendered.matches("@typing.overload").count(), 1);
    assert_eq!(find_function(&module, "__init__").len(), 1);
}

#[test]
fn fragments_replace_statements() {
    let mut module = parse_module(QTWIDGETS).unwrap();
    let id = find_function(&module, "setText")[0];
    let owner = module
        .statements()
        .into_iter()
        .find(|s| s.id == id)
        .and_then(|s| s.owner);

    let new = module
        .parse_fragment("def setText(self, a0: typing.Optional[str]) -> None: ...", "    ")
        .unwrap();
    assert_eq!(new.len(), 1);
    assert_eq!(module.span(new[0]), None);
    assert!(module.replace(owner, id, &new));

    let rendered = module.render();
    assert!(rendered.contains("\n    def setText(self, a0: typing.Optional[str]) -> None: ...\n"));
    assert!(!rendered.contains("a0: str) -> None"));
}

#[test]
fn inserted_imports_follow_layout() {
    let mut module = parse_module("from PyQt6 import (\n    QtCore,\n    QtGui,\n)\n").unwrap();
    let id = module.body()[0];
    let import = module.import_from_mut(id).unwrap();
    assert!(import.binds("QtGui"));
    import.push_name("sip");
    assert_eq!(
        module.render(),
        "from PyQt6 import (\n    QtCore,\n    QtGui,\n    sip,\n)\n"
    );

    let mut module = parse_module("from PyQt6 import QtCore\n").unwrap();
    let id = module.body()[0];
    module.import_from_mut(id).unwrap().push_name("QtGui");
    assert_eq!(module.render(), "from PyQt6 import QtCore, QtGui\n");
}

#[test]
fn assignments_are_recognized() {
    let module = parse_module(QTWIDGETS).unwrap();
    let targets: Vec<&str> = module
        .body()
        .iter()
        .filter_map(|&id| match &module.node(id).kind {
            NodeKind::Assign { target, .. } => Some(target.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(targets, vec!["PYQT_SIGNAL", "PYQT_SLOT"]);
}

#[test]
fn structural_errors() {
    assert_eq!(
        parse_module("class A:\n").unwrap_err(),
        ParseError::ExpectedIndent { line: 2 }
    );
    assert_eq!(
        parse_module("x = 1\n    y = 2\n").unwrap_err(),
        ParseError::UnexpectedIndent { line: 2 }
    );
    assert_eq!(
        parse_module("  x = 1\ny = 2\n").unwrap_err(),
        ParseError::Dedent { line: 2 }
    );
    assert_eq!(
        parse_module("@typing.overload\nx = 1\n").unwrap_err(),
        ParseError::DanglingDecorator { line: 1 }
    );
}

#[test]
fn comments_between_decorator_and_def_are_kept() {
    let source = "\
class QFoo:
    @typing.overload
    # note

    def f(self) -> None: ...
    @typing.overload
    def f(self, a: int) -> None: ...
";
    let module = parse_module(source).unwrap();
    assert_eq!(module.render(), source);

    let first = find_function(&module, "f")[0];
    let function = module.function(first).unwrap();
    assert_eq!(function.decorators.len(), 1);
    assert_eq!(
        module.span(function.decorators[0]).map(|s| (s.start, s.end)),
        Some((2, 2))
    );

    assert_eq!(
        parse_module("@typing.overload\n# note\nx = 1\n").unwrap_err(),
        ParseError::DanglingDecorator { line: 1 }
    );
}

#[test]
fn canonical_form_ignores_quote_style() {
    assert_eq!(
        canonical_annotation("typing.Optional['QWidget']"),
        canonical_annotation("typing.Optional[\"QWidget\"]")
    );
}

const LINES: &[&str] = &[
    "\n",
    "# comment\n",
    "x = 1\n",
    "from PyQt6 import QtCore, QtGui\n",
    "from PyQt6 import (QtCore,\n    QtGui)\n",
    "def f(a, b: int = ..., *args, **kw) -> None: ...\n",
    "@typing.overload\ndef g(self) -> int: ...  # type: ignore[misc]\n",
    "class A(B): ...\n",
    "class C:\n    def m(self, /, *, k: str='x') -> None: ...\n\n    y: int\n",
    "if sys.platform == 'win32':\n    def w() -> None: ...\n",
    "s = '''multi\nline'''\n",
];

const SPACINGS: &[&str] = &[",", ", ", " ,  "];

proptest! {
    #[test]
    fn any_sequence_of_statements_round_trips(
        picks in prop::collection::vec(prop::sample::select(LINES), 0..12),
        param in prop::string::string_regex("[a-z]{1,6}(: [a-z]{1,6})?( = \\.\\.\\.)?").unwrap(),
        spacing in prop::sample::select(SPACINGS),
    ) {
        let mut source: String = picks.concat();
        source.push_str(&format!("def h(self{}{}) -> None: ...\n", spacing, param));
        let module = parse_module(&source).unwrap();
        prop_assert_eq!(module.render(), source);
    }
}
