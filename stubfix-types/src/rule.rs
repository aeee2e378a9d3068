//! Declarative signature corrections.
//!
//! These types are deserialized straight from the rule table, so field names are part of the
//! table format.

use serde::{Deserialize, Serialize};

/// A signature correction for one function in one module.
///
/// Each rule applies at most once per module. True overload variants that need the same fix are
/// listed as separate rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Stub module name, e.g. `QtWidgets`.
    pub module: String,

    /// Enclosing class; `None` targets module-level functions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    pub method: String,

    #[serde(default, rename = "params")]
    pub parameters: Vec<ParamSpec>,

    /// Replacement return annotation.
    #[serde(default, rename = "returns", skip_serializing_if = "Option::is_none")]
    pub return_override: Option<String>,

    /// Static rules have no implicit receiver in the arity count.
    #[serde(default, rename = "static")]
    pub static_method: bool,

    /// Statement inserted once after the module's marker assignment when this rule matches.
    #[serde(default, rename = "type_alias", skip_serializing_if = "Option::is_none")]
    pub injected_type_alias: Option<String>,
}

impl Rule {
    /// `Class.method` or bare `method` for module-level rules.
    pub fn qualified_name(&self) -> String {
        match &self.class {
            Some(class) => format!("{}.{}", class, self.method),
            None => self.method.clone(),
        }
    }

    /// Star-prefixed spec names (`*args`, `**kwargs`).
    pub fn variadic_specs(&self) -> impl Iterator<Item = &ParamSpec> {
        self.parameters.iter().filter(|p| p.is_variadic())
    }
}

/// Expected current annotation and replacement for one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name; variadics carry their `*` or `**` prefix.
    pub name: String,

    /// Annotation the stub is expected to carry now. `None` means unannotated.
    #[serde(default, rename = "current", skip_serializing_if = "Option::is_none")]
    pub current_annotation: Option<String>,

    #[serde(rename = "desired")]
    pub desired_annotation: String,
}

impl ParamSpec {
    pub fn is_variadic(&self) -> bool {
        self.name.starts_with('*')
    }
}

/// Statements appended to a class body after its last method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRule {
    pub module: String,
    pub class: String,
    pub statements: Vec<String>,
}
