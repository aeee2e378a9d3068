use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use stubfix_syntax::NodeId;

/// Node a fix applies to, plus a readable name for logs and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixTarget {
    pub node: NodeId,
    pub label: String,
}

impl FixTarget {
    pub fn new(node: NodeId, label: impl Into<String>) -> Self {
        Self {
            node,
            label: label.into(),
        }
    }
}

/// A fix derived from checker diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixIntent {
    /// Names to append to the root package import.
    AddImport(BTreeSet<String>),
    /// `# type: ignore[override]` on a function or decorator, `[misc]` on a class header.
    AnnotateOverride(FixTarget),
    /// Drop an overload variant that can never be selected.
    RemoveOverload(FixTarget),
    /// `# type: ignore[misc]` for an overload set mixing static and instance variants.
    MarkStaticMismatch(FixTarget),
    /// Drop an overload decorator left on the last remaining variant.
    RemoveUnmatchedSignature(FixTarget),
}

impl FixIntent {
    pub fn target(&self) -> Option<&FixTarget> {
        match self {
            FixIntent::AddImport(_) => None,
            FixIntent::AnnotateOverride(t)
            | FixIntent::RemoveOverload(t)
            | FixIntent::MarkStaticMismatch(t)
            | FixIntent::RemoveUnmatchedSignature(t) => Some(t),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FixIntent::AddImport(_) => "add_import",
            FixIntent::AnnotateOverride(_) => "annotate_override",
            FixIntent::RemoveOverload(_) => "remove_overload",
            FixIntent::MarkStaticMismatch(_) => "mark_static_mismatch",
            FixIntent::RemoveUnmatchedSignature(_) => "remove_unmatched_signature",
        }
    }
}

impl fmt::Display for FixIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixIntent::AddImport(names) => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                write!(f, "add_import({})", names.join(", "))
            }
            other => match other.target() {
                Some(target) => write!(f, "{}({})", other.kind_name(), target.label),
                None => f.write_str(other.kind_name()),
            },
        }
    }
}

/// Pending intents of one module. At most one intent per node.
#[derive(Debug, Clone, Default)]
pub struct IntentPool {
    import: Option<BTreeSet<String>>,
    by_node: BTreeMap<NodeId, FixIntent>,
}

impl IntentPool {
    /// Adds an intent. A node-targeted intent for an already claimed node is handed back.
    pub fn insert(&mut self, intent: FixIntent) -> Result<(), (FixIntent, FixIntent)> {
        match intent {
            FixIntent::AddImport(names) => {
                self.import.get_or_insert_with(BTreeSet::new).extend(names);
                Ok(())
            }
            other => {
                let Some(node) = other.target().map(|t| t.node) else {
                    return Ok(());
                };
                match self.by_node.get(&node) {
                    Some(existing) if *existing == other => Ok(()),
                    Some(existing) => Err((existing.clone(), other)),
                    None => {
                        self.by_node.insert(node, other);
                        Ok(())
                    }
                }
            }
        }
    }

    pub fn get(&self, node: NodeId) -> Option<&FixIntent> {
        self.by_node.get(&node)
    }

    pub fn take(&mut self, node: NodeId) -> Option<FixIntent> {
        self.by_node.remove(&node)
    }

    /// Puts back an intent the caller could not apply.
    pub fn restore(&mut self, intent: FixIntent) {
        if let Some(node) = intent.target().map(|t| t.node) {
            self.by_node.insert(node, intent);
        }
    }

    pub fn pending_import(&self) -> Option<&BTreeSet<String>> {
        self.import.as_ref()
    }

    pub fn take_import(&mut self) -> Option<BTreeSet<String>> {
        self.import.take()
    }

    pub fn len(&self) -> usize {
        self.by_node.len() + usize::from(self.import.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining intents, import first, then in node order.
    pub fn into_remaining(self) -> Vec<FixIntent> {
        self.import
            .map(FixIntent::AddImport)
            .into_iter()
            .chain(self.by_node.into_values())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FixIntent> {
        self.by_node.values()
    }
}
