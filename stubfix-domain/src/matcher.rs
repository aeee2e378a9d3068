//! Decides whether a rule applies to a function.

use stubfix_syntax::{FunctionDef, Param, ParamKind, canonical_annotation};
use stubfix_types::rule::Rule;
use tracing::debug;

/// Why a rule does not apply to a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    Class,
    Method,
    Arity { expected: usize, actual: usize },
    Parameter { name: String },
    Variadic { name: String },
}

/// Checks `rule` against `function` in the innermost open class `class`.
pub fn check(rule: &Rule, class: Option<&str>, function: &FunctionDef) -> Result<(), Mismatch> {
    check_shape(rule, class, function)?;
    for param in editable_params(rule, function) {
        let name = param.spec_name();
        let matches = rule
            .parameters
            .iter()
            .find(|s| s.name == name)
            .is_some_and(|spec| same_annotation(spec.current_annotation.as_deref(), param));
        if !matches {
            return Err(Mismatch::Parameter { name });
        }
    }
    Ok(())
}

/// Whether `function` already carries everything `rule` would write.
pub fn is_satisfied(rule: &Rule, class: Option<&str>, function: &FunctionDef) -> bool {
    if check_shape(rule, class, function).is_err() {
        return false;
    }
    let params_done = editable_params(rule, function).all(|param| {
        let name = param.spec_name();
        rule.parameters
            .iter()
            .find(|s| s.name == name)
            .is_some_and(|spec| same_annotation(Some(spec.desired_annotation.as_str()), param))
    });
    let returns_done = match &rule.return_override {
        Some(expected) => function.returns.as_ref().is_some_and(|r| {
            canonical_annotation(expected) == canonical_annotation(&r.annotation)
        }),
        None => true,
    };
    params_done && returns_done
}

fn check_shape(rule: &Rule, class: Option<&str>, function: &FunctionDef) -> Result<(), Mismatch> {
    if rule.class.as_deref() != class {
        return Err(Mismatch::Class);
    }
    if rule.method != function.name {
        return Err(Mismatch::Method);
    }

    let expected = if rule.static_method {
        rule.parameters.len()
    } else {
        rule.parameters.len() + 1
    };
    let actual = function.arity();
    if actual != expected {
        return Err(Mismatch::Arity { expected, actual });
    }

    for spec in rule.variadic_specs() {
        if !function.params().any(|p| p.spec_name() == spec.name) {
            return Err(Mismatch::Variadic {
                name: spec.name.clone(),
            });
        }
    }
    for param in function
        .params()
        .filter(|p| matches!(p.kind, ParamKind::VarArgs | ParamKind::KwArgs))
    {
        let name = param.spec_name();
        if !rule.parameters.iter().any(|s| s.name == name) {
            return Err(Mismatch::Variadic { name });
        }
    }
    Ok(())
}

/// Index of the rule in `pool` that applies to `function`, if any.
pub fn find_match(pool: &[Rule], class: Option<&str>, function: &FunctionDef) -> Option<usize> {
    let mut found = None;
    for (index, rule) in pool.iter().enumerate() {
        match check(rule, class, function) {
            Ok(()) => {
                if found.is_none() {
                    found = Some(index);
                    if !cfg!(debug_assertions) {
                        break;
                    }
                } else {
                    debug_assert!(
                        false,
                        "several rules match {}: {:?} and {}",
                        function.name,
                        found.map(|i| pool[i].qualified_name()),
                        rule.qualified_name()
                    );
                }
            }
            Err(Mismatch::Class | Mismatch::Method) => {}
            Err(reason) => {
                debug!(rule = %rule.qualified_name(), ?reason, "rule does not match");
            }
        }
    }
    found
}

/// Parameters the rule edits. An instance rule skips the first positional parameter,
/// whatever the receiver is called.
pub(crate) fn editable_params<'f>(
    rule: &Rule,
    function: &'f FunctionDef,
) -> impl Iterator<Item = &'f Param> {
    let skip = usize::from(!rule.static_method);
    function.params().skip(skip)
}

fn same_annotation(expected: Option<&str>, param: &Param) -> bool {
    match (expected, param.annotation_expr()) {
        (None, None) => true,
        (Some(expected), Some(actual)) => {
            canonical_annotation(expected) == canonical_annotation(actual)
        }
        _ => false,
    }
}
