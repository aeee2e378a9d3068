use std::collections::BTreeSet;

/// State that lives for one stub file and is passed explicitly through classification.
#[derive(Debug, Clone)]
pub struct FileContext {
    module: String,
    fixed_imports: BTreeSet<(String, String)>,
}

impl FileContext {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            fixed_imports: BTreeSet::new(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Records that `name` is being imported into this module. Returns `false` if it already was.
    pub fn mark_import(&mut self, name: &str) -> bool {
        self.fixed_imports
            .insert((self.module.clone(), name.to_string()))
    }

    pub fn is_import_fixed(&self, name: &str) -> bool {
        self.fixed_imports
            .contains(&(self.module.clone(), name.to_string()))
    }
}

/// Class and function names open at the current point of a traversal.
#[derive(Debug, Clone, Default)]
pub struct TraversalContext {
    classes: Vec<String>,
    functions: Vec<String>,
}

impl TraversalContext {
    pub fn push_class(&mut self, name: &str) {
        self.classes.push(name.to_string());
    }

    pub fn pop_class(&mut self) {
        self.classes.pop();
    }

    pub fn push_function(&mut self, name: &str) {
        self.functions.push(name.to_string());
    }

    pub fn pop_function(&mut self) {
        self.functions.pop();
    }

    /// Innermost open class; `None` at module level.
    pub fn class(&self) -> Option<&str> {
        self.classes.last().map(String::as_str)
    }

    pub fn function(&self) -> Option<&str> {
        self.functions.last().map(String::as_str)
    }

    /// `Class.method` for the innermost function, or `name` qualified by the open class.
    pub fn qualify(&self, name: &str) -> String {
        match self.class() {
            Some(class) => format!("{}.{}", class, name),
            None => name.to_string(),
        }
    }
}
