//! The fix pipeline, extracted from the CLI.
//!
//! [`process_module`] is pure: text in, text out. [`run_batch`] drives it over a stub directory
//! and performs checker calls and writes through the port traits.

use std::time::Instant;

use crate::ports::{DiagnosticSource, WritePort};
use crate::settings::FixSettings;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use diffy::PatchFormatter;
use fs_err as fs;
use glob::glob;
use sha2::{Digest, Sha256};
use stubfix_diagnostics::{DiagnosticError, ParsedDiagnostics, parse_diagnostics};
use stubfix_domain::{
    DomainError, FileContext, RewriteOptions, RuleTable, apply_custom_fixes, classify, rewrite,
    unresolved,
};
use stubfix_render::render_report_md;
use stubfix_syntax::{ParseError, parse_module};
use stubfix_types::diagnostic::UnrecognizedDiagnostic;
use stubfix_types::report::{
    AppliedEdit, Counts, FileChange, FileReport, FileStatus, RunInfo, RunReport, ToolInfo,
    UnresolvedFix, Verdict, VerdictStatus,
};
use tracing::{debug, error, info};

/// Error type for batch results. Per-file failures are not tool errors; they land in the report.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

/// Why one stub file could not be fixed.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("checker output: {0}")]
    Diagnostics(#[from] DiagnosticError),

    #[error("parse stub: {0}")]
    Syntax(#[from] ParseError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{0:#}")]
    Io(#[from] anyhow::Error),
}

/// Result of fixing one module in memory.
#[derive(Debug, Clone, Default)]
pub struct ModuleOutcome {
    pub output: String,
    pub applied: Vec<AppliedEdit>,
    pub unresolved: Vec<UnresolvedFix>,
    pub unrecognized: Vec<UnrecognizedDiagnostic>,
}

/// Fixes one module's source text.
///
/// `diagnostics` is raw checker output for this exact source; `None` applies only the rule table
/// and the custom fixes.
pub fn process_module(
    module: &str,
    source: &str,
    diagnostics: Option<&str>,
    rules: &RuleTable,
    options: &RewriteOptions,
) -> Result<ModuleOutcome, FileError> {
    let parsed = match diagnostics {
        Some(text) => parse_diagnostics(text)?,
        None => ParsedDiagnostics::default(),
    };
    let mut tree = parse_module(source)?;

    let mut ctx = FileContext::new(module);
    let classification = classify(&tree, &parsed.records, &mut ctx)?;
    debug!(
        module,
        intents = classification.intents.len(),
        unplaced = classification.unplaced.len(),
        "classified diagnostics"
    );

    let outcome = rewrite(
        module,
        &mut tree,
        classification.intents,
        rules.for_module(module),
        options,
    )?;
    let unresolved = unresolved(
        module,
        &outcome.pending,
        &classification.unplaced,
        &classification.unsupported,
    );

    let mut applied = outcome.applied;
    applied.extend(apply_custom_fixes(module, &mut tree)?);

    Ok(ModuleOutcome {
        output: tree.render(),
        applied,
        unresolved,
        unrecognized: parsed.unrecognized,
    })
}

/// Stub files under `dir`, sorted. Dunder stems are skipped; a non-empty `modules` keeps only
/// those stems.
pub fn discover_stubs(dir: &Utf8Path, modules: &[String]) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let pattern = dir.join("*.pyi");
    let pattern_str = pattern.as_str();
    debug!(pattern = %pattern_str, "scanning for stub files");

    let mut out = Vec::new();
    for entry in glob(pattern_str).context("glob *.pyi")? {
        let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
        let path = Utf8PathBuf::from_path_buf(path)
            .map_err(|p| anyhow::anyhow!("non-utf8 path: {}", p.display()))?;
        let Some(stem) = path.file_stem() else {
            continue;
        };
        if stem.starts_with("__") {
            debug!(path = %path, "skipping dunder stub");
            continue;
        }
        if !modules.is_empty() && !modules.iter().any(|m| m == stem) {
            debug!(path = %path, "not selected");
            continue;
        }
        out.push(path);
    }

    // Deterministic order matters.
    out.sort();
    Ok(out)
}

/// Outcome of `run_batch`.
pub struct BatchOutcome {
    pub report: RunReport,
    pub patch: String,
}

impl BatchOutcome {
    /// 0 clean, 2 unresolved fixes, 1 when any file failed.
    pub fn exit_code(&self) -> u8 {
        match self.report.verdict.status {
            VerdictStatus::Pass => 0,
            VerdictStatus::Warn => 2,
            VerdictStatus::Fail => 1,
        }
    }
}

/// Fixes every selected stub under `settings.stubs_dir`.
///
/// A failing file is recorded in the report and does not stop the batch. Files are only written
/// when `settings.dry_run` is off.
pub fn run_batch(
    settings: &FixSettings,
    rules: &RuleTable,
    source: &dyn DiagnosticSource,
    writer: &dyn WritePort,
    tool: ToolInfo,
) -> Result<BatchOutcome, ToolError> {
    let started_at = Utc::now();
    let clock = Instant::now();
    let options = RewriteOptions {
        root_package: settings.root_package.clone(),
        marker: settings.marker.clone(),
    };

    let stubs = discover_stubs(&settings.stubs_dir, &settings.modules)?;
    info!(count = stubs.len(), dir = %settings.stubs_dir, "fixing stubs");

    let mut files = Vec::new();
    let mut patch = String::new();
    let formatter = PatchFormatter::new();

    for path in stubs {
        let module = path.file_stem().unwrap_or_default().to_string();
        let mut report = FileReport::new(path.clone(), module.clone());

        match fix_file(&path, &module, rules, source, &options) {
            Ok((before, outcome)) => {
                report.applied = outcome.applied;
                report.unresolved = outcome.unresolved;
                report.unrecognized = outcome.unrecognized;

                if outcome.output != before {
                    report.status = FileStatus::Changed;
                    report.change = Some(FileChange {
                        sha256_before: sha256_hex(before.as_bytes()),
                        sha256_after: sha256_hex(outcome.output.as_bytes()),
                        bytes_before: before.len() as u64,
                        bytes_after: outcome.output.len() as u64,
                    });
                    append_patch(&mut patch, &formatter, &path, &before, &outcome.output);

                    if !settings.dry_run {
                        writer.write_file(&path, outcome.output.as_bytes())?;
                        info!(path = %path, "wrote stub");
                    }
                }
            }
            Err(err) => {
                error!(path = %path, "{}", err);
                report.status = FileStatus::Failed;
                report.error = Some(err.to_string());
            }
        }
        files.push(report);
    }

    let ended_at = Utc::now();
    let report = RunReport {
        schema: stubfix_types::schema::STUBFIX_REPORT_V1.to_string(),
        tool,
        run: RunInfo {
            started_at: Some(started_at),
            ended_at: Some(ended_at),
            duration_ms: Some(clock.elapsed().as_millis() as u64),
            dry_run: settings.dry_run,
        },
        verdict: verdict_for(&files),
        files,
    };

    Ok(BatchOutcome { report, patch })
}

fn fix_file(
    path: &Utf8Path,
    module: &str,
    rules: &RuleTable,
    source: &dyn DiagnosticSource,
    options: &RewriteOptions,
) -> Result<(String, ModuleOutcome), FileError> {
    let before = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
    let diagnostics = source
        .diagnostics(path)
        .with_context(|| format!("diagnostics for {}", path))?;
    let outcome = process_module(module, &before, diagnostics.as_deref(), rules, options)?;
    Ok((before, outcome))
}

fn verdict_for(files: &[FileReport]) -> Verdict {
    let counts = Counts {
        files: files.len() as u64,
        changed: count(files, |f| f.status == FileStatus::Changed),
        failed: count(files, |f| f.status == FileStatus::Failed),
        unresolved: files.iter().map(|f| f.unresolved.len() as u64).sum(),
        unrecognized: files.iter().map(|f| f.unrecognized.len() as u64).sum(),
    };

    let mut reasons = Vec::new();
    if counts.failed > 0 {
        reasons.push("files_failed".to_string());
    }
    if counts.unresolved > 0 {
        reasons.push("unresolved_fixes".to_string());
    }

    let status = if counts.failed > 0 {
        VerdictStatus::Fail
    } else if counts.unresolved > 0 {
        VerdictStatus::Warn
    } else {
        VerdictStatus::Pass
    };

    Verdict {
        status,
        counts,
        reasons,
    }
}

fn count(files: &[FileReport], pred: impl Fn(&FileReport) -> bool) -> u64 {
    files.iter().filter(|f| pred(f)).count() as u64
}

fn append_patch(
    out: &mut String,
    formatter: &PatchFormatter,
    path: &Utf8Path,
    old: &str,
    new: &str,
) {
    out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
    out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));
    let patch = diffy::create_patch(old, new);
    out.push_str(&formatter.fmt_patch(&patch).to_string());
    if !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Write all run artifacts to the output directory.
pub fn write_artifacts(
    outcome: &BatchOutcome,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;

    let report_json =
        serde_json::to_string_pretty(&outcome.report).context("serialize report")?;
    writer.write_file(&out_dir.join("report.json"), report_json.as_bytes())?;

    let report_md = render_report_md(&outcome.report);
    writer.write_file(&out_dir.join("report.md"), report_md.as_bytes())?;

    writer.write_file(&out_dir.join("patch.diff"), outcome.patch.as_bytes())?;
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
