//! Single traversal that applies intents and rules to a parsed stub.
//!
//! Every intent and rule is applied at most once. A rule that no function matched but some
//! function already satisfies is dropped after the traversal. Whatever is still pending is
//! handed back in [`RewriteOutcome::pending`] for the consistency check.

use stubfix_syntax::{NodeId, NodeKind, StubModule};
use stubfix_types::report::{AppliedEdit, EditKind};
use stubfix_types::rule::{MemberRule, Rule};
use tracing::{debug, info};

use crate::context::TraversalContext;
use crate::error::DomainError;
use crate::fix::{FixIntent, IntentPool};
use crate::matcher::{editable_params, find_match, is_satisfied};
use crate::rules::ModuleRules;

const OVERRIDE_CODE: &str = "override";
const MISC_CODE: &str = "misc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Package whose `from <root> import ...` statement receives missing names.
    pub root_package: String,
    /// Module-level assignment target after which type aliases are inserted.
    pub marker: String,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            root_package: "PyQt6".to_string(),
            marker: "PYQT_SLOT".to_string(),
        }
    }
}

/// Fixes and rules left over after a traversal.
#[derive(Debug, Clone, Default)]
pub struct Pending {
    pub rules: Vec<Rule>,
    pub members: Vec<MemberRule>,
    pub intents: Vec<FixIntent>,
}

impl Pending {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.members.is_empty() && self.intents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len() + self.members.len() + self.intents.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RewriteOutcome {
    pub applied: Vec<AppliedEdit>,
    pub pending: Pending,
}

pub fn rewrite(
    module: &str,
    tree: &mut StubModule,
    intents: IntentPool,
    rules: ModuleRules,
    options: &RewriteOptions,
) -> Result<RewriteOutcome, DomainError> {
    let mut rewriter = Rewriter {
        module,
        options,
        tree,
        ctx: TraversalContext::default(),
        intents,
        rules: rules.rules,
        members: rules.members,
        satisfied: Vec::new(),
        marker: None,
        aliases: Vec::new(),
        applied: Vec::new(),
    };

    rewriter.visit_block(None)?;
    rewriter.drop_satisfied_rules();

    if rewriter.intents.pending_import().is_some() {
        return Err(DomainError::missing_anchor(
            module,
            format!("from {} import ...", options.root_package),
        ));
    }
    rewriter.insert_aliases()?;

    Ok(RewriteOutcome {
        applied: rewriter.applied,
        pending: Pending {
            rules: rewriter.rules,
            members: rewriter.members,
            intents: rewriter.intents.into_remaining(),
        },
    })
}

/// Text with every line stripped, used to compare statements regardless of indentation.
pub(crate) fn normalized(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

enum Visit {
    Import,
    Marker,
    Class(String),
    Function,
    Compound,
    Skip,
}

struct Rewriter<'a> {
    module: &'a str,
    options: &'a RewriteOptions,
    tree: &'a mut StubModule,
    ctx: TraversalContext,
    intents: IntentPool,
    rules: Vec<Rule>,
    members: Vec<MemberRule>,
    /// Rules some function already carries; only dropped if nothing matched them.
    satisfied: Vec<Rule>,
    /// Most recent marker assignment seen at module level.
    marker: Option<NodeId>,
    /// Aliases to insert, with the marker they follow, unique by text.
    aliases: Vec<(NodeId, String)>,
    applied: Vec<AppliedEdit>,
}

impl Rewriter<'_> {
    fn visit_block(&mut self, owner: Option<NodeId>) -> Result<(), DomainError> {
        let ids = self.tree.block(owner).to_vec();
        for id in ids {
            if self.tree.is_removed(id) {
                continue;
            }
            let visit = match &self.tree.node(id).kind {
                NodeKind::ImportFrom(_) => Visit::Import,
                NodeKind::Assign { target, .. }
                    if owner.is_none() && *target == self.options.marker =>
                {
                    Visit::Marker
                }
                NodeKind::Class(class) => Visit::Class(class.name.clone()),
                NodeKind::Function(_) => Visit::Function,
                NodeKind::Compound { .. } => Visit::Compound,
                _ => Visit::Skip,
            };
            match visit {
                Visit::Import => self.visit_import(id),
                Visit::Marker => self.marker = Some(id),
                Visit::Class(name) => self.visit_class(id, &name)?,
                Visit::Function => self.visit_function(id)?,
                Visit::Compound => self.visit_block(Some(id))?,
                Visit::Skip => {}
            }
        }
        Ok(())
    }

    fn record(&mut self, kind: EditKind, target: &str, detail: Option<String>) {
        info!(
            module = %self.module,
            node = %target,
            ?kind,
            detail = detail.as_deref().unwrap_or(""),
            "applied"
        );
        self.applied.push(AppliedEdit {
            kind,
            target: target.to_string(),
            detail,
        });
    }

    fn visit_import(&mut self, id: NodeId) {
        if self.intents.pending_import().is_none() {
            return;
        }
        let root = self.options.root_package.as_str();
        let is_anchor = matches!(
            &self.tree.node(id).kind,
            NodeKind::ImportFrom(import) if import.module == root && !import.is_star()
        );
        if !is_anchor {
            return;
        }
        let names = self.intents.take_import().unwrap_or_default();
        let Some(import) = self.tree.import_from_mut(id) else {
            return;
        };
        let mut added = Vec::new();
        for name in &names {
            if !import.binds(name) {
                import.push_name(name);
                added.push(name.as_str());
            }
        }
        if added.is_empty() {
            debug!(module = %self.module, "imports already present");
            return;
        }
        let detail = added.join(", ");
        let target = format!("from {} import", root);
        self.record(EditKind::AddImport, &target, Some(detail));
    }

    fn visit_class(&mut self, id: NodeId, name: &str) -> Result<(), DomainError> {
        let label = self.ctx.qualify(name);
        self.ctx.push_class(name);

        if let Some(intent) = self.intents.take(id) {
            match intent {
                FixIntent::AnnotateOverride(_) => {
                    if let Some(class) = self.tree.class_mut(id)
                        && class.suite.trailing_mut().add_ignore(MISC_CODE)
                    {
                        self.record(EditKind::Comment, &label, Some(ignore_comment(MISC_CODE)));
                    }
                }
                other => self.intents.restore(other),
            }
        }

        self.visit_block(Some(id))?;
        self.apply_members(id, name, &label)?;
        self.ctx.pop_class();
        Ok(())
    }

    fn apply_members(&mut self, class_id: NodeId, name: &str, label: &str) -> Result<(), DomainError> {
        let Some(pos) = self.members.iter().position(|m| m.class == name) else {
            return Ok(());
        };
        let body = self.tree.block(Some(class_id)).to_vec();
        let last_method = body
            .iter()
            .rev()
            .copied()
            .find(|&c| !self.tree.is_removed(c) && self.tree.function(c).is_some());
        let Some(anchor) = last_method else {
            debug!(module = %self.module, class = name, "no method to anchor member statements");
            return Ok(());
        };

        let member = self.members.remove(pos);
        let existing: Vec<String> = body
            .iter()
            .filter(|&&c| !self.tree.is_removed(c))
            .map(|&c| normalized(&self.tree.render_node(c)))
            .collect();
        let missing: Vec<&str> = member
            .statements
            .iter()
            .map(String::as_str)
            .filter(|s| !existing.contains(&normalized(s)))
            .collect();
        if missing.is_empty() {
            debug!(module = %self.module, class = name, "member statements already present");
            return Ok(());
        }

        let indent = self
            .tree
            .function(anchor)
            .map(|f| f.indent.clone())
            .unwrap_or_default();
        let ids = self
            .tree
            .parse_fragment(&missing.join("\n"), &indent)
            .map_err(|source| DomainError::Syntax {
                module: self.module.to_string(),
                source,
            })?;
        self.tree.insert_after(Some(class_id), anchor, &ids);
        self.record(EditKind::AddMembers, label, Some(missing.join("; ")));
        Ok(())
    }

    fn visit_function(&mut self, id: NodeId) -> Result<(), DomainError> {
        let Some(function) = self.tree.function(id) else {
            return Ok(());
        };
        let name = function.name.clone();
        let decorators = function.decorators.clone();
        let label = self.ctx.qualify(&name);

        let matched = find_match(&self.rules, self.ctx.class(), function).is_some();
        if matched && decorators.iter().any(|&d| self.intents.get(d).is_some()) {
            return Err(DomainError::ConflictingFixes {
                module: self.module.to_string(),
                target: label,
            });
        }

        for decorator in decorators {
            if let Some(intent) = self.intents.take(decorator) {
                self.apply_decorator_intent(decorator, intent, &label);
            }
        }

        self.ctx.push_function(&name);
        let result = self.apply_to_function(id, &label);
        self.ctx.pop_function();
        result
    }

    fn apply_to_function(&mut self, id: NodeId, label: &str) -> Result<(), DomainError> {
        let Some(function) = self.tree.function(id) else {
            return Ok(());
        };
        let class = self.ctx.class();
        let matched = find_match(&self.rules, class, function);
        if matched.is_none() {
            for rule in self.rules.iter().filter(|r| is_satisfied(r, class, function)) {
                if !self.satisfied.contains(rule) {
                    self.satisfied.push(rule.clone());
                }
            }
        }

        match (matched, self.intents.take(id)) {
            (Some(_), Some(_)) => Err(DomainError::ConflictingFixes {
                module: self.module.to_string(),
                target: label.to_string(),
            }),
            (Some(index), None) => {
                let rule = self.rules.remove(index);
                self.apply_rule(id, &rule, label)
            }
            (None, Some(intent)) => {
                self.apply_function_intent(id, intent, label);
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }

    fn drop_satisfied_rules(&mut self) {
        let satisfied = std::mem::take(&mut self.satisfied);
        let module = self.module;
        self.rules.retain(|rule| {
            let done = satisfied.contains(rule);
            if done {
                debug!(module = %module, rule = %rule.qualified_name(), "rule already applied");
            }
            !done
        });
    }

    fn apply_rule(&mut self, id: NodeId, rule: &Rule, label: &str) -> Result<(), DomainError> {
        let Some(function) = self.tree.function_mut(id) else {
            return Ok(());
        };
        let names: Vec<String> = editable_params(rule, function)
            .map(|p| p.spec_name())
            .collect();

        let mut changes = Vec::new();
        for name in names {
            let Some(spec) = rule.parameters.iter().find(|s| s.name == name) else {
                continue;
            };
            if let Some(param) = function.param_mut(&name)
                && param.annotation_expr() != Some(spec.desired_annotation.as_str())
            {
                param.set_annotation(&spec.desired_annotation);
                changes.push(format!("{}: {}", name, spec.desired_annotation));
            }
        }
        if let Some(returns) = &rule.return_override
            && function.returns.as_ref().map(|r| r.annotation.as_str()) != Some(returns.as_str())
        {
            function.set_return_annotation(returns);
            changes.push(format!("-> {}", returns));
        }
        if changes.is_empty() {
            debug!(module = %self.module, node = %label, "rule leaves the signature as it is");
        } else {
            self.record(EditKind::Annotation, label, Some(changes.join(", ")));
        }

        if let Some(alias) = &rule.injected_type_alias {
            let Some(marker) = self.marker else {
                return Err(DomainError::missing_anchor(
                    self.module,
                    format!("{} assignment before {}", self.options.marker, label),
                ));
            };
            if !self.aliases.iter().any(|(_, a)| a == alias) {
                self.aliases.push((marker, alias.clone()));
            }
        }
        Ok(())
    }

    fn apply_function_intent(&mut self, id: NodeId, intent: FixIntent, label: &str) {
        let code = match &intent {
            FixIntent::AnnotateOverride(_) => OVERRIDE_CODE,
            FixIntent::MarkStaticMismatch(_) => MISC_CODE,
            FixIntent::RemoveOverload(_) => {
                self.tree.remove(id);
                self.record(EditKind::RemoveFunction, label, None);
                return;
            }
            FixIntent::AddImport(_) | FixIntent::RemoveUnmatchedSignature(_) => {
                self.intents.restore(intent);
                return;
            }
        };
        let changed = self
            .tree
            .function_mut(id)
            .is_some_and(|f| f.suite.trailing_mut().add_ignore(code));
        if changed {
            self.record(EditKind::Comment, label, Some(ignore_comment(code)));
        }
    }

    fn apply_decorator_intent(&mut self, id: NodeId, intent: FixIntent, label: &str) {
        let code = match &intent {
            FixIntent::AnnotateOverride(_) => OVERRIDE_CODE,
            FixIntent::MarkStaticMismatch(_) => MISC_CODE,
            FixIntent::RemoveUnmatchedSignature(target) => {
                self.tree.remove(id);
                let target = target.label.clone();
                self.record(EditKind::RemoveDecorator, &target, None);
                return;
            }
            FixIntent::AddImport(_) | FixIntent::RemoveOverload(_) => {
                self.intents.restore(intent);
                return;
            }
        };
        let changed = self
            .tree
            .decorator_mut(id)
            .is_some_and(|d| d.trailing.add_ignore(code));
        if changed {
            self.record(EditKind::Comment, label, Some(ignore_comment(code)));
        }
    }

    fn insert_aliases(&mut self) -> Result<(), DomainError> {
        let aliases = std::mem::take(&mut self.aliases);
        let mut last_for_marker: Vec<(NodeId, NodeId)> = Vec::new();

        for (marker, alias) in aliases {
            let wanted = normalized(&alias);
            let present = self
                .tree
                .body()
                .iter()
                .any(|&id| !self.tree.is_removed(id) && normalized(&self.tree.render_node(id)) == wanted);
            if present {
                debug!(module = %self.module, alias = %alias, "type alias already present");
                continue;
            }

            let ids = self
                .tree
                .parse_fragment(&alias, "")
                .map_err(|source| DomainError::Syntax {
                    module: self.module.to_string(),
                    source,
                })?;
            let anchor = last_for_marker
                .iter()
                .find(|(m, _)| *m == marker)
                .map(|(_, last)| *last)
                .unwrap_or(marker);
            if !self.tree.insert_after(None, anchor, &ids) {
                return Err(DomainError::missing_anchor(self.module, &self.options.marker));
            }
            if let Some(&last) = ids.last() {
                last_for_marker.retain(|(m, _)| *m != marker);
                last_for_marker.push((marker, last));
            }
            let target = self.options.marker.clone();
            self.record(EditKind::TypeAlias, &target, Some(alias));
        }
        Ok(())
    }
}

fn ignore_comment(code: &str) -> String {
    format!("# type: ignore[{}]", code)
}
