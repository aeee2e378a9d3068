//! Declarative rule table.
//!
//! The built-in table ships as TOML next to this crate and is compiled in. Alternative tables can
//! be loaded from a string or a file with the same format.

use std::collections::BTreeSet;

use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use stubfix_types::rule::{MemberRule, Rule};
use tracing::debug;

use crate::error::DomainError;

const BUILTIN_RULES: &str = include_str!("../rules/annotation_rules.toml");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    #[serde(default, rename = "rule")]
    rules: Vec<Rule>,

    #[serde(default, rename = "member")]
    members: Vec<MemberRule>,
}

/// Rules of one module, in table order. Built fresh for every file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRules {
    pub rules: Vec<Rule>,
    pub members: Vec<MemberRule>,
}

impl ModuleRules {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.members.is_empty()
    }
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>, members: Vec<MemberRule>) -> Result<Self, DomainError> {
        let table = Self { rules, members };
        table.validate()?;
        Ok(table)
    }

    pub fn builtin() -> Result<Self, DomainError> {
        Self::parse(BUILTIN_RULES)
    }

    pub fn parse(text: &str) -> Result<Self, DomainError> {
        let table: RuleTable = toml::from_str(text).map_err(|e| DomainError::RuleTable {
            message: e.to_string(),
        })?;
        table.validate()?;
        debug!(
            rules = table.rules.len(),
            members = table.members.len(),
            "loaded rule table"
        );
        Ok(table)
    }

    pub fn from_path(path: &Utf8Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
        Self::parse(&text).with_context(|| format!("parse rule table {}", path))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn members(&self) -> &[MemberRule] {
        &self.members
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.members.is_empty()
    }

    /// Module names with at least one rule or member rule, sorted.
    pub fn modules(&self) -> BTreeSet<&str> {
        self.rules
            .iter()
            .map(|r| r.module.as_str())
            .chain(self.members.iter().map(|m| m.module.as_str()))
            .collect()
    }

    pub fn for_module(&self, module: &str) -> ModuleRules {
        ModuleRules {
            rules: self
                .rules
                .iter()
                .filter(|r| r.module == module)
                .cloned()
                .collect(),
            members: self
                .members
                .iter()
                .filter(|m| m.module == module)
                .cloned()
                .collect(),
        }
    }

    fn validate(&self) -> Result<(), DomainError> {
        let invalid = |message: String| DomainError::RuleTable { message };
        let mut seen = BTreeSet::new();

        for rule in &self.rules {
            let name = format!("{}.{}", rule.module, rule.qualified_name());
            if rule.module.is_empty() || rule.method.is_empty() {
                return Err(invalid(format!("{}: empty module or method", name)));
            }
            let mut params = BTreeSet::new();
            for spec in &rule.parameters {
                if spec.name.trim_start_matches('*').is_empty() {
                    return Err(invalid(format!("{}: empty parameter name", name)));
                }
                if !params.insert(spec.name.as_str()) {
                    return Err(invalid(format!("{}: duplicate parameter {}", name, spec.name)));
                }
            }
            // Two rules with the same shape would both match the same function.
            let shape: Vec<(&str, Option<&str>)> = rule
                .parameters
                .iter()
                .map(|p| (p.name.as_str(), p.current_annotation.as_deref()))
                .collect();
            let key = (
                rule.module.as_str(),
                rule.class.as_deref(),
                rule.method.as_str(),
                rule.static_method,
                shape,
            );
            if !seen.insert(key) {
                return Err(invalid(format!("{}: duplicate rule", name)));
            }
        }

        for member in &self.members {
            if member.statements.is_empty() {
                return Err(invalid(format!(
                    "{}.{}: member rule without statements",
                    member.module, member.class
                )));
            }
        }
        Ok(())
    }
}
