//! Configuration file loading for stubfix.
//!
//! Discovers and loads `stubfix.toml` from the repository root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use stubfix_core::settings::FixSettings;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "stubfix.toml";

/// Top-level configuration from stubfix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StubfixConfig {
    /// Where the stubs live and how they are anchored.
    pub stubs: StubsConfig,

    /// Type checker invocation.
    pub checker: CheckerConfig,

    /// Artifact output.
    pub output: OutputConfig,
}

/// Stubs section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StubsConfig {
    /// Stub directory, relative to the repository root.
    pub dir: Option<Utf8PathBuf>,

    /// Package named in the `from <package> import` anchor.
    pub root_package: Option<String>,

    /// Statement after which type aliases are inserted.
    pub marker: Option<String>,
}

/// Checker section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
}

/// Output section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Artifact directory, relative to the repository root.
    pub dir: Option<Utf8PathBuf>,
}

/// Discover the stubfix.toml config file.
///
/// Returns `None` if no config file is found in the repository root.
pub fn discover_config(repo_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = repo_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a stubfix.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<StubfixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<StubfixConfig> {
    let config: StubfixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from repo root, or return default if not found.
pub fn load_or_default(repo_root: &Utf8Path) -> anyhow::Result<StubfixConfig> {
    match discover_config(repo_root) {
        Some(path) => load_config(&path),
        None => Ok(StubfixConfig::default()),
    }
}

/// Values given on the `fix` command line.
#[derive(Debug, Clone, Default)]
pub struct FixOverrides {
    pub stubs_dir: Option<Utf8PathBuf>,
    pub out_dir: Option<Utf8PathBuf>,
    pub modules: Vec<String>,
    pub apply: bool,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: StubfixConfig,
}

impl ConfigMerger {
    pub fn new(config: StubfixConfig) -> Self {
        Self { config }
    }

    /// Merge with fix command CLI arguments.
    ///
    /// CLI paths are taken as given; config and default paths are joined onto `repo_root`.
    pub fn merge_fix_args(self, repo_root: &Utf8Path, cli: FixOverrides) -> FixSettings {
        let defaults = FixSettings::default();
        let StubfixConfig {
            stubs,
            checker,
            output,
        } = self.config;

        let stubs_dir = cli
            .stubs_dir
            .unwrap_or_else(|| repo_root.join(stubs.dir.unwrap_or(defaults.stubs_dir)));
        let out_dir = cli
            .out_dir
            .unwrap_or_else(|| repo_root.join(output.dir.unwrap_or(defaults.out_dir)));

        FixSettings {
            stubs_dir,
            modules: cli.modules,
            out_dir,
            root_package: stubs.root_package.unwrap_or(defaults.root_package),
            marker: stubs.marker.unwrap_or(defaults.marker),
            checker_program: checker.program.unwrap_or(defaults.checker_program),
            checker_args: checker.args.unwrap_or(defaults.checker_args),
            dry_run: !cli.apply,
        }
    }
}
