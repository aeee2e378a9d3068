mod config;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use config::{ConfigMerger, FixOverrides};
use std::process::ExitCode;
use stubfix_core::RuleTable;
use stubfix_core::adapters::{CapturedDiagnostics, FsWritePort, MypyChecker, NoDiagnostics};
use stubfix_core::pipeline::{run_batch, write_artifacts};
use stubfix_core::ports::DiagnosticSource;
use stubfix_domain::custom_fixes;
use stubfix_types::report::ToolInfo;
use stubfix_types::rule::Rule;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Parser)]
#[command(
    name = "stubfix",
    version,
    about = "Diagnostic-driven patcher for generated PyQt6 type stubs."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fix stub files from checker diagnostics and the rule table (default: dry-run).
    Fix(FixArgs),
    /// List the signature and member rules of the rule table.
    ListRules(ListRulesArgs),
    /// List the compiled-in custom fixes.
    ListCustom(ListCustomArgs),
}

#[derive(Debug, Parser)]
struct FixArgs {
    /// Stub files or module names to fix (default: every stub in the stubs directory).
    files: Vec<String>,

    /// Repository root holding stubfix.toml (default: current directory).
    #[arg(long, default_value = ".")]
    repo_root: Utf8PathBuf,

    /// Directory with the generated .pyi files (default: <repo_root>/PyQt6-stubs).
    #[arg(long)]
    stubs_dir: Option<Utf8PathBuf>,

    /// Read captured checker output from <dir>/<module>.txt instead of running the checker.
    #[arg(long, conflicts_with = "no_checker")]
    diagnostics_dir: Option<Utf8PathBuf>,

    /// Skip the checker; apply only the rule table and custom fixes.
    #[arg(long, default_value_t = false)]
    no_checker: bool,

    /// Rule table to use instead of the built-in one.
    #[arg(long)]
    rules: Option<Utf8PathBuf>,

    /// Output directory for stubfix artifacts (default: <repo_root>/artifacts/stubfix).
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    /// Write fixed stubs to disk. If omitted, runs a dry-run and only emits artifacts.
    #[arg(long, default_value_t = false)]
    apply: bool,

    /// Log traversal decisions.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Parser)]
struct ListRulesArgs {
    /// Only list rules for this module.
    #[arg(long)]
    module: Option<String>,

    /// Rule table to use instead of the built-in one.
    #[arg(long)]
    rules: Option<Utf8PathBuf>,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct ListCustomArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(1)
        }
    }
}

fn real_main() -> anyhow::Result<u8> {
    let cli = Cli::parse();

    let verbose = matches!(&cli.cmd, Command::Fix(args) if args.verbose);
    let filter = if verbose {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::DEBUG.into())
            .from_env_lossy()
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Fix(args) => cmd_fix(args),
        Command::ListRules(args) => cmd_list_rules(args).map(|()| 0),
        Command::ListCustom(args) => cmd_list_custom(args).map(|()| 0),
    }
}

fn cmd_fix(args: FixArgs) -> anyhow::Result<u8> {
    let repo_root = args.repo_root;

    // Load config file and merge with CLI arguments
    let file_config = config::load_or_default(&repo_root).context("load stubfix.toml config")?;
    let settings = ConfigMerger::new(file_config).merge_fix_args(
        &repo_root,
        FixOverrides {
            stubs_dir: args.stubs_dir,
            out_dir: args.out_dir,
            modules: args.files.iter().map(|f| module_name(f)).collect(),
            apply: args.apply,
        },
    );
    debug!(
        "merged config: stubs_dir={}, out_dir={}, modules={:?}, dry_run={}",
        settings.stubs_dir, settings.out_dir, settings.modules, settings.dry_run
    );

    let rules = load_rules(args.rules.as_deref())?;

    let source: Box<dyn DiagnosticSource> = if args.no_checker {
        Box::new(NoDiagnostics)
    } else if let Some(dir) = args.diagnostics_dir {
        Box::new(CapturedDiagnostics::new(dir))
    } else {
        Box::new(MypyChecker::new(
            settings.checker_program.clone(),
            settings.checker_args.clone(),
        ))
    };

    let writer = FsWritePort;
    let outcome = run_batch(&settings, &rules, source.as_ref(), &writer, tool_info())
        .context("fix stubs")?;
    write_artifacts(&outcome, &settings.out_dir, &writer)
        .with_context(|| format!("write artifacts to {}", settings.out_dir))?;

    let counts = &outcome.report.verdict.counts;
    println!(
        "{} file(s): {} changed, {} failed, {} unresolved fix(es), {} unrecognized diagnostic(s)",
        counts.files, counts.changed, counts.failed, counts.unresolved, counts.unrecognized
    );
    if settings.dry_run && counts.changed > 0 {
        println!("dry-run: no stub files were modified (use --apply to write changes)");
    }
    println!("verdict: {}", outcome.report.verdict.status.as_str());

    info!("wrote report to {}", settings.out_dir);
    Ok(outcome.exit_code())
}

fn cmd_list_rules(args: ListRulesArgs) -> anyhow::Result<()> {
    let table = load_rules(args.rules.as_deref())?;
    let wanted = |module: &str| args.module.as_deref().is_none_or(|m| m == module);

    let rules: Vec<&Rule> = table.rules().iter().filter(|r| wanted(&r.module)).collect();
    let members: Vec<_> = table
        .members()
        .iter()
        .filter(|m| wanted(&m.module))
        .collect();

    match args.format {
        OutputFormat::Text => {
            println!("Signature rules:\n");
            println!("  {:<12} {:<40} CHANGES", "MODULE", "TARGET");
            println!("  {:<12} {:<40} -------", "------", "------");
            for rule in &rules {
                println!(
                    "  {:<12} {:<40} {}",
                    rule.module,
                    rule.qualified_name(),
                    describe_rule(rule)
                );
            }
            println!();
            println!("Member rules:\n");
            for member in &members {
                println!(
                    "  {:<12} {:<40} {} statement(s)",
                    member.module,
                    member.class,
                    member.statements.len()
                );
            }
        }
        OutputFormat::Json => {
            let out = serde_json::json!({
                "rules": rules,
                "members": members,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn cmd_list_custom(args: ListCustomArgs) -> anyhow::Result<()> {
    match args.format {
        OutputFormat::Text => {
            println!("Custom fixes:\n");
            println!("  {:<28} {:<12} TARGET", "NAME", "MODULE");
            println!("  {:<28} {:<12} ------", "----", "------");
            for fix in custom_fixes() {
                println!(
                    "  {:<28} {:<12} {}",
                    fix.name,
                    fix.module,
                    fix.qualified_name()
                );
            }
        }
        OutputFormat::Json => {
            let fixes: Vec<_> = custom_fixes()
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "name": f.name,
                        "module": f.module,
                        "class": f.class,
                        "method": f.method,
                        "statements": f.replacement.len(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&fixes)?);
        }
    }
    Ok(())
}

fn load_rules(path: Option<&Utf8Path>) -> anyhow::Result<RuleTable> {
    match path {
        Some(path) => RuleTable::from_path(path),
        None => RuleTable::builtin().context("load built-in rule table"),
    }
}

/// `QtCore`, `QtCore.pyi` and `PyQt6-stubs/QtCore.pyi` all select the `QtCore` module.
fn module_name(arg: &str) -> String {
    let path = Utf8Path::new(arg);
    match path.extension() {
        Some("pyi") => path.file_stem().unwrap_or(arg).to_string(),
        _ => arg.to_string(),
    }
}

fn describe_rule(rule: &Rule) -> String {
    let mut parts: Vec<String> = rule
        .parameters
        .iter()
        .map(|p| format!("{}: {}", p.name, p.desired_annotation))
        .collect();
    if let Some(returns) = &rule.return_override {
        parts.push(format!("-> {}", returns));
    }
    if rule.static_method {
        parts.push("static".to_string());
    }
    if rule.injected_type_alias.is_some() {
        parts.push("+alias".to_string());
    }
    parts.join(", ")
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "stubfix".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        commit: None,
    }
}
