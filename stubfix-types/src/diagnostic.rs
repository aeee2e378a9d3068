use serde::{Deserialize, Serialize};

/// Closed set of checker diagnostics the fixer knows how to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// `Name "X" is not defined`.
    NameNotDefined,
    /// Overload set mixes `@staticmethod` and instance signatures.
    StaticMismatch,
    /// Liskov violation against a base class (valid in C++, only suppressible here).
    OverrideIncompatible,
    /// An overload variant shadowed by an earlier, broader one.
    OverloadUnreachable,
    /// A `# type: ignore` comment the checker no longer needs.
    UnusedIgnore,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::NameNotDefined => "name_not_defined",
            Category::StaticMismatch => "static_mismatch",
            Category::OverrideIncompatible => "override_incompatible",
            Category::OverloadUnreachable => "overload_unreachable",
            Category::UnusedIgnore => "unused_ignore",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One categorised `error:` line from the checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// 1-based line in the stub file the checker ran against.
    pub line: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,

    pub category: Category,

    /// Message text with any trailing `[code]` suffix removed.
    pub raw_message: String,

    /// The undefined name for `NameNotDefined`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_name: Option<String>,

    /// Checker error code, e.g. `override` or `misc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// An `error:` line whose message matched no known category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrecognizedDiagnostic {
    pub line: u32,
    pub raw_message: String,
}
