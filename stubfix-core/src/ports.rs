//! Port traits abstracting I/O away from the pipeline.

use camino::Utf8Path;

/// Source of checker diagnostics for a stub file.
pub trait DiagnosticSource {
    /// Raw checker output for `stub`, or `None` when there is nothing to parse.
    fn diagnostics(&self, stub: &Utf8Path) -> anyhow::Result<Option<String>>;
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
