//! Clap-free settings for the fix pipeline.

use camino::Utf8PathBuf;

/// Settings for [`run_batch`](crate::pipeline::run_batch).
#[derive(Debug, Clone)]
pub struct FixSettings {
    /// Directory holding the generated `.pyi` files.
    pub stubs_dir: Utf8PathBuf,
    /// Module stems to process; empty means every discovered stub.
    pub modules: Vec<String>,
    pub out_dir: Utf8PathBuf,

    // Rewriting
    pub root_package: String,
    pub marker: String,

    // Checker
    pub checker_program: String,
    pub checker_args: Vec<String>,

    /// Leave stub files untouched and only emit artifacts.
    pub dry_run: bool,
}

impl Default for FixSettings {
    fn default() -> Self {
        Self {
            stubs_dir: Utf8PathBuf::from("PyQt6-stubs"),
            modules: Vec::new(),
            out_dir: Utf8PathBuf::from("artifacts/stubfix"),
            root_package: "PyQt6".to_string(),
            marker: "PYQT_SLOT".to_string(),
            checker_program: "mypy".to_string(),
            checker_args: vec!["--warn-unused-ignores".to_string()],
            dry_run: true,
        }
    }
}
