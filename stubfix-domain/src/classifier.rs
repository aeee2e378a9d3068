//! Turns diagnostic records into fix intents keyed to tree nodes.
//!
//! Records are placed by line: a line inside a class header targets the class, a line inside a
//! decorator targets that decorator, and a line inside a `def` header targets the function.
//! Records that land nowhere are returned as unplaced.

use std::collections::{BTreeMap, BTreeSet};

use stubfix_syntax::{NodeId, NodeKind, Statement, StubModule};
use stubfix_types::diagnostic::{Category, DiagnosticRecord};
use tracing::debug;

use crate::context::FileContext;
use crate::error::DomainError;
use crate::fix::{FixIntent, FixTarget, IntentPool};

#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub intents: IntentPool,
    /// Fixable records whose line is not inside any class, decorator or function header.
    pub unplaced: Vec<DiagnosticRecord>,
    /// Records the fixer has no edit for.
    pub unsupported: Vec<DiagnosticRecord>,
}

pub fn classify(
    tree: &StubModule,
    records: &[DiagnosticRecord],
    ctx: &mut FileContext,
) -> Result<Classification, DomainError> {
    let module = ctx.module().to_string();
    let mut out = Classification::default();

    let mut names = BTreeSet::new();
    let mut by_line: BTreeMap<u32, &DiagnosticRecord> = BTreeMap::new();
    for record in records {
        match record.category {
            Category::NameNotDefined => {
                let Some(name) = record.extracted_name.as_deref() else {
                    continue;
                };
                if name.contains('.') {
                    debug!(module = %module, name, "skipping dotted undefined name");
                    continue;
                }
                if !is_qt_module(name) {
                    debug!(module = %module, name, "undefined name is not a Qt module");
                    out.unsupported.push(record.clone());
                    continue;
                }
                if ctx.mark_import(name) {
                    names.insert(name.to_string());
                }
            }
            Category::UnusedIgnore => out.unsupported.push(record.clone()),
            category => match by_line.get(&record.line) {
                Some(existing) if existing.category != category => {
                    return Err(DomainError::ambiguous(
                        &module,
                        format!("line {}", record.line),
                        existing.category,
                        category,
                    ));
                }
                Some(_) => {}
                None => {
                    by_line.insert(record.line, record);
                }
            },
        }
    }
    if !names.is_empty() {
        insert(&mut out.intents, &module, FixIntent::AddImport(names))?;
    }

    let statements = tree.statements();
    let mut placed: BTreeSet<u32> = BTreeSet::new();

    for statement in &statements {
        match &tree.node(statement.id).kind {
            NodeKind::Class(class) => {
                let hits = lines_in(tree, statement.id, &by_line);
                if hits.is_empty() {
                    continue;
                }
                for (line, category) in hits {
                    if category != Category::OverrideIncompatible {
                        return Err(DomainError::UnsupportedClassFix {
                            module: module.clone(),
                            class: class.name.clone(),
                            category,
                        });
                    }
                    placed.insert(line);
                }
                let target = FixTarget::new(statement.id, label(tree, statement, &class.name));
                insert(&mut out.intents, &module, FixIntent::AnnotateOverride(target))?;
            }
            NodeKind::Function(function) => {
                let mut hits: Vec<(NodeId, u32, Category)> = Vec::new();
                for &decorator in &function.decorators {
                    for (line, category) in lines_in(tree, decorator, &by_line) {
                        hits.push((decorator, line, category));
                    }
                }
                for (line, category) in lines_in(tree, statement.id, &by_line) {
                    hits.push((statement.id, line, category));
                }
                let Some(&(first_node, _, category)) = hits.first() else {
                    continue;
                };
                let name = label(tree, statement, &function.name);
                if let Some(&(_, _, other)) = hits.iter().find(|(_, _, c)| *c != category) {
                    return Err(DomainError::ambiguous(&module, name, category, other));
                }
                placed.extend(hits.iter().map(|(_, line, _)| *line));

                let intent = match category {
                    Category::OverloadUnreachable => {
                        FixIntent::RemoveOverload(FixTarget::new(statement.id, name))
                    }
                    Category::OverrideIncompatible => {
                        FixIntent::AnnotateOverride(target_for(tree, first_node, statement.id, name))
                    }
                    Category::StaticMismatch => FixIntent::MarkStaticMismatch(target_for(
                        tree,
                        first_node,
                        statement.id,
                        name,
                    )),
                    Category::NameNotDefined | Category::UnusedIgnore => continue,
                };
                debug!(module = %module, intent = %intent, "classified");
                insert(&mut out.intents, &module, intent)?;
            }
            _ => {}
        }
    }

    cascade(tree, &statements, &module, &mut out.intents)?;

    out.unplaced = by_line
        .into_iter()
        .filter(|(line, _)| !placed.contains(line))
        .map(|(_, record)| record.clone())
        .collect();
    Ok(out)
}

/// Emits `RemoveUnmatchedSignature` for an overload decorator left alone by removals.
fn cascade(
    tree: &StubModule,
    statements: &[Statement],
    module: &str,
    intents: &mut IntentPool,
) -> Result<(), DomainError> {
    let mut scopes: BTreeMap<Option<NodeId>, Vec<&Statement>> = BTreeMap::new();
    for statement in statements {
        if tree.function(statement.id).is_some() {
            scopes.entry(statement.owner).or_default().push(statement);
        }
    }

    let mut found = Vec::new();
    for functions in scopes.values() {
        let removed_names: BTreeSet<&str> = functions
            .iter()
            .filter(|s| matches!(intents.get(s.id), Some(FixIntent::RemoveOverload(_))))
            .filter_map(|s| tree.function(s.id).map(|f| f.name.as_str()))
            .collect();

        for name in removed_names {
            let remaining: Vec<&&Statement> = functions
                .iter()
                .filter(|s| tree.function(s.id).is_some_and(|f| f.name == name))
                .filter(|s| !matches!(intents.get(s.id), Some(FixIntent::RemoveOverload(_))))
                .collect();
            let [survivor] = remaining.as_slice() else {
                continue;
            };
            let Some(function) = tree.function(survivor.id) else {
                continue;
            };
            let overload = function
                .decorators
                .iter()
                .copied()
                .find(|&d| tree.decorator(d).is_some_and(|d| d.is_overload()));
            if let Some(decorator) = overload {
                let name = format!("{}@overload", label(tree, survivor, &function.name));
                found.push(FixIntent::RemoveUnmatchedSignature(FixTarget::new(
                    decorator, name,
                )));
            }
        }
    }

    for intent in found {
        debug!(module = %module, intent = %intent, "cascade");
        insert(intents, module, intent)?;
    }
    Ok(())
}

/// `QtCore`, `QtGui`, `QtWidgets` and the like: the only names the package import can supply.
fn is_qt_module(name: &str) -> bool {
    name.strip_prefix("Qt")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn insert(intents: &mut IntentPool, module: &str, intent: FixIntent) -> Result<(), DomainError> {
    intents.insert(intent).map_err(|(existing, new)| {
        let target = new
            .target()
            .map(|t| t.label.clone())
            .unwrap_or_default();
        DomainError::ambiguous(module, target, existing.kind_name(), new.kind_name())
    })
}

fn lines_in(
    tree: &StubModule,
    id: NodeId,
    by_line: &BTreeMap<u32, &DiagnosticRecord>,
) -> Vec<(u32, Category)> {
    let Some(span) = tree.span(id) else {
        return Vec::new();
    };
    by_line
        .range(span.start..=span.end)
        .map(|(line, record)| (*line, record.category))
        .collect()
}

fn target_for(tree: &StubModule, hit: NodeId, function: NodeId, name: String) -> FixTarget {
    if hit != function
        && let Some(decorator) = tree.decorator(hit)
    {
        return FixTarget::new(hit, format!("{}@{}", name, decorator.expr.trim()));
    }
    FixTarget::new(function, name)
}

fn label(tree: &StubModule, statement: &Statement, name: &str) -> String {
    match statement.class.and_then(|c| tree.class(c)) {
        Some(class) => format!("{}.{}", class.name, name),
        None => name.to_string(),
    }
}
