//! Default port implementations.

use std::collections::BTreeMap;
use std::process::Command;

use crate::ports::{DiagnosticSource, WritePort};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::debug;

/// Runs the checker as a subprocess on each stub file.
#[derive(Debug, Clone)]
pub struct MypyChecker {
    pub program: String,
    pub args: Vec<String>,
}

impl MypyChecker {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl DiagnosticSource for MypyChecker {
    fn diagnostics(&self, stub: &Utf8Path) -> anyhow::Result<Option<String>> {
        debug!(program = %self.program, stub = %stub, "running checker");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(stub.as_str())
            .output()
            .with_context(|| format!("run {} on {}", self.program, stub))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.starts_with("Success") {
            debug!(stub = %stub, "checker reported no issues");
            return Ok(None);
        }
        // mypy exits 1 when it found errors and 2 when it could not run.
        match output.status.code() {
            Some(0) | Some(1) => Ok(Some(stdout)),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                anyhow::bail!(
                    "{} failed on {} ({}): {}",
                    self.program,
                    stub,
                    output.status,
                    stderr.trim()
                )
            }
        }
    }
}

/// Reads previously captured checker output from `<dir>/<stem>.txt`.
#[derive(Debug, Clone)]
pub struct CapturedDiagnostics {
    pub dir: Utf8PathBuf,
}

impl CapturedDiagnostics {
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }
}

impl DiagnosticSource for CapturedDiagnostics {
    fn diagnostics(&self, stub: &Utf8Path) -> anyhow::Result<Option<String>> {
        let Some(stem) = stub.file_stem() else {
            return Ok(None);
        };
        let path = self.dir.join(format!("{}.txt", stem));
        if !path.is_file() {
            debug!(path = %path, "no captured diagnostics");
            return Ok(None);
        }
        let text = fs::read_to_string(&path).with_context(|| format!("read {}", path))?;
        Ok(Some(text))
    }
}

/// Applies only the rule table and custom fixes.
#[derive(Debug, Clone, Default)]
pub struct NoDiagnostics;

impl DiagnosticSource for NoDiagnostics {
    fn diagnostics(&self, _stub: &Utf8Path) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

/// In-memory checker output keyed by module stem, for embedding and testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDiagnostics {
    by_module: BTreeMap<String, String>,
}

impl InMemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, module: impl Into<String>, output: impl Into<String>) -> Self {
        self.by_module.insert(module.into(), output.into());
        self
    }
}

impl DiagnosticSource for InMemoryDiagnostics {
    fn diagnostics(&self, stub: &Utf8Path) -> anyhow::Result<Option<String>> {
        Ok(stub
            .file_stem()
            .and_then(|stem| self.by_module.get(stem))
            .cloned())
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}
