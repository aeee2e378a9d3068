//! Whole-signature replacements that the rule table cannot express.
//!
//! Runs as its own pass over an already rewritten tree. A fix replaces the first function with the
//! registered name in a scope and drops the other same-named functions there, so one entry can
//! stand for a full overload set.

use std::collections::{BTreeMap, BTreeSet};

use stubfix_syntax::{NodeId, StubModule};
use stubfix_types::report::{AppliedEdit, EditKind};
use tracing::{debug, info};

use crate::error::DomainError;
use crate::rewriter::normalized;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomFix {
    pub name: &'static str,
    pub module: &'static str,
    pub class: Option<&'static str>,
    pub method: &'static str,
    /// Statements written in place of the function, unindented.
    pub replacement: &'static [&'static str],
}

impl CustomFix {
    pub fn qualified_name(&self) -> String {
        match self.class {
            Some(class) => format!("{}.{}.{}", self.module, class, self.method),
            None => format!("{}.{}", self.module, self.method),
        }
    }
}

const PYQT_SLOT: &[&str] = &[
    "T = typing.TypeVar('T')",
    "FuncT = typing.Callable[..., T]",
    "@typing.overload\ndef pyqtSlot(*types: typing.Any) -> typing.Callable[[FuncT[T]], FuncT[T]]: ...",
    "@typing.overload\ndef pyqtSlot(*types: typing.Any, name: str) -> typing.Callable[[FuncT[T]], FuncT[T]]: ...",
    "@typing.overload\ndef pyqtSlot(*types: typing.Any, result: typing.Type[T]) -> typing.Callable[[FuncT[T]], FuncT[T]]: ...",
    "@typing.overload\ndef pyqtSlot(*types: typing.Any, result: str) -> typing.Callable[[FuncT[T]], FuncT[T]]: ...",
    "@typing.overload\ndef pyqtSlot(*types: typing.Any, revision: int) -> typing.Callable[[FuncT[T]], FuncT[T]]: ...",
    "@typing.overload\ndef pyqtSlot(*types: typing.Any, name: str, result: typing.Type[T]) -> typing.Callable[[FuncT[T]], FuncT[T]]: ...",
    "@typing.overload\ndef pyqtSlot(*types: typing.Any, name: str, result: str) -> typing.Callable[[FuncT[T]], FuncT[T]]: ...",
    "@typing.overload\ndef pyqtSlot(*types: typing.Any, name: str, revision: int) -> typing.Callable[[FuncT[T]], FuncT[T]]: ...",
    "@typing.overload\ndef pyqtSlot(*types: typing.Any, result: typing.Type[T], revision: int) -> typing.Callable[[FuncT[T]], FuncT[T]]: ...",
    "@typing.overload\ndef pyqtSlot(*types: typing.Any, result: str, revision: int) -> typing.Callable[[FuncT[T]], FuncT[T]]: ...",
    "@typing.overload\ndef pyqtSlot(*types: typing.Any, name: str, result: typing.Type[T], revision: int) -> typing.Callable[[FuncT[T]], FuncT[T]]: ...",
    "@typing.overload\ndef pyqtSlot(*types: typing.Any, name: str, result: str, revision: int) -> typing.Callable[[FuncT[T]], FuncT[T]]: ...",
];

static CUSTOM_FIXES: &[CustomFix] = &[
    CustomFix {
        name: "pyqtslot_decorator",
        module: "QtCore",
        class: None,
        method: "pyqtSlot",
        replacement: PYQT_SLOT,
    },
    CustomFix {
        name: "qlineedit_settext_none",
        module: "QtWidgets",
        class: Some("QLineEdit"),
        method: "setText",
        replacement: &["def setText(self, a0: typing.Optional[str]) -> None: ..."],
    },
    CustomFix {
        name: "voidptr_asarray_array",
        module: "sip",
        class: Some("voidptr"),
        method: "asarray",
        replacement: &["def asarray(self, size: int = -1) -> array[int]: ..."],
    },
    CustomFix {
        name: "voidptr_setwriteable_bool",
        module: "sip",
        class: Some("voidptr"),
        method: "setwriteable",
        replacement: &["def setwriteable(self, bool: bool) -> None: ..."],
    },
];

/// The compiled-in registry, in application order.
pub fn custom_fixes() -> &'static [CustomFix] {
    CUSTOM_FIXES
}

/// Applies every registered fix for `module` to `tree`.
pub fn apply_custom_fixes(module: &str, tree: &mut StubModule) -> Result<Vec<AppliedEdit>, DomainError> {
    apply_fixes(module, tree, CUSTOM_FIXES)
}

pub(crate) fn apply_fixes(
    module: &str,
    tree: &mut StubModule,
    fixes: &[CustomFix],
) -> Result<Vec<AppliedEdit>, DomainError> {
    let mut applied = Vec::new();
    for fix in fixes.iter().filter(|f| f.module == module) {
        for (owner, functions) in find_functions(tree, fix) {
            if let Some(edit) = apply_fix(module, tree, fix, owner, &functions)? {
                applied.push(edit);
            }
        }
    }
    Ok(applied)
}

/// Functions named like `fix`, grouped by the block holding them.
fn find_functions(tree: &StubModule, fix: &CustomFix) -> BTreeMap<Option<NodeId>, Vec<NodeId>> {
    let mut scopes: BTreeMap<Option<NodeId>, Vec<NodeId>> = BTreeMap::new();
    for statement in tree.statements() {
        let Some(function) = tree.function(statement.id) else {
            continue;
        };
        let class = statement
            .class
            .and_then(|c| tree.class(c))
            .map(|c| c.name.as_str());
        if function.name == fix.method && class == fix.class {
            scopes.entry(statement.owner).or_default().push(statement.id);
        }
    }
    scopes
}

fn apply_fix(
    module: &str,
    tree: &mut StubModule,
    fix: &CustomFix,
    owner: Option<NodeId>,
    functions: &[NodeId],
) -> Result<Option<AppliedEdit>, DomainError> {
    let Some(&first) = functions.first() else {
        return Ok(None);
    };

    let wanted: BTreeSet<String> = fix.replacement.iter().map(|s| normalized(s)).collect();
    let done = functions
        .iter()
        .all(|&id| wanted.contains(&normalized(&tree.render_node(id))));
    if done {
        debug!(module, fix = fix.name, "custom fix already applied");
        return Ok(None);
    }

    let indent = tree
        .function(first)
        .map(|f| f.indent.clone())
        .unwrap_or_default();
    let ids = tree
        .parse_fragment(&fix.replacement.join("\n"), &indent)
        .map_err(|source| DomainError::Syntax {
            module: module.to_string(),
            source,
        })?;
    if !tree.replace(owner, first, &ids) {
        return Err(DomainError::missing_anchor(module, fix.qualified_name()));
    }
    for &id in &functions[1..] {
        tree.remove(id);
    }

    let target = match fix.class {
        Some(class) => format!("{}.{}", class, fix.method),
        None => fix.method.to_string(),
    };
    info!(module, fix = fix.name, replaced = functions.len(), "applied custom fix");
    Ok(Some(AppliedEdit {
        kind: EditKind::CustomReplace,
        target,
        detail: Some(fix.name.to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_are_unique() {
        let names: BTreeSet<&str> = custom_fixes().iter().map(|f| f.name).collect();
        assert_eq!(names.len(), custom_fixes().len());
    }

    #[test]
    fn every_replacement_parses() {
        for fix in custom_fixes() {
            let text = fix.replacement.join("\n") + "\n";
            assert!(
                stubfix_syntax::parse_module(&text).is_ok(),
                "{} does not parse",
                fix.name
            );
        }
    }
}
