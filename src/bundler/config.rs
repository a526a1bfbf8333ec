// Bundler options - defaults, bundler.toml overrides and CLI overrides

use crate::bundler::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default name of the options file looked up in the working directory
pub const OPTIONS_FILE: &str = "bundler.toml";

/// Options captured when a `Bundler` is built
///
/// Never mutated afterwards; layered overrides are applied with
/// [`BundlerOptions::merge`] before construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BundlerOptions {
    /// Root searched for component entry points (`**/index.js`)
    pub base_path: PathBuf,

    /// Filesystem base the loader `paths` resolve against
    pub base_url: String,

    /// Logical prefix of ledger entries (`bundles/components/header`)
    pub bundles_base_url: String,

    /// Output root for bundles and source maps
    pub dest: PathBuf,

    /// Loader configuration file (`System.config({...})`)
    pub system_js_config: PathBuf,

    /// Project manifest holding `jspm.dependencies`
    pub manifest: PathBuf,

    pub source_maps: bool,

    pub minify: bool,

    pub css_optimize: bool,

    /// Rewrite source-map `sources` relative to each bundle's directory
    pub relative_source_maps: bool,

    /// Seed the ledger from the configuration file instead of starting empty
    pub keep_existing_bundles: bool,

    /// Indentation unit used when saving the loader configuration
    pub tab: String,

    /// Engine executable (name on PATH or path)
    pub engine: String,
}

impl Default for BundlerOptions {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("build"),
            base_url: ".".to_string(),
            bundles_base_url: "bundles".to_string(),
            dest: PathBuf::from("build/bundles"),
            system_js_config: PathBuf::from("config/system.js"),
            manifest: PathBuf::from("package.json"),
            source_maps: true,
            minify: true,
            css_optimize: false,
            relative_source_maps: false,
            keep_existing_bundles: false,
            tab: "  ".to_string(),
            engine: "systemjs-engine".to_string(),
        }
    }
}

impl BundlerOptions {
    /// Shallow-merge `overrides` onto these options
    pub fn merge(self, overrides: PartialOptions) -> Self {
        Self {
            base_path: overrides.base_path.unwrap_or(self.base_path),
            base_url: overrides.base_url.unwrap_or(self.base_url),
            bundles_base_url: overrides.bundles_base_url.unwrap_or(self.bundles_base_url),
            dest: overrides.dest.unwrap_or(self.dest),
            system_js_config: overrides.system_js_config.unwrap_or(self.system_js_config),
            manifest: overrides.manifest.unwrap_or(self.manifest),
            source_maps: overrides.source_maps.unwrap_or(self.source_maps),
            minify: overrides.minify.unwrap_or(self.minify),
            css_optimize: overrides.css_optimize.unwrap_or(self.css_optimize),
            relative_source_maps: overrides
                .relative_source_maps
                .unwrap_or(self.relative_source_maps),
            keep_existing_bundles: overrides
                .keep_existing_bundles
                .unwrap_or(self.keep_existing_bundles),
            tab: overrides.tab.unwrap_or(self.tab),
            engine: overrides.engine.unwrap_or(self.engine),
        }
    }
}

/// A layer of option overrides; unset fields keep the lower layer's value
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialOptions {
    pub base_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub bundles_base_url: Option<String>,
    pub dest: Option<PathBuf>,
    pub system_js_config: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub source_maps: Option<bool>,
    pub minify: Option<bool>,
    pub css_optimize: Option<bool>,
    pub relative_source_maps: Option<bool>,
    pub keep_existing_bundles: Option<bool>,
    pub tab: Option<String>,
    pub engine: Option<String>,
}

impl PartialOptions {
    /// Parse bundler.toml from a file path
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let parsed: PartialOptions = toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        parsed.expand_paths()
    }

    /// Parse bundler.toml from a string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: PartialOptions = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: "<string>".into(),
            error: e.to_string(),
        })?;
        parsed.expand_paths()
    }

    /// Expand `~` and `$VARS` in path-valued fields
    fn expand_paths(mut self) -> Result<Self, ConfigError> {
        for field in [
            &mut self.base_path,
            &mut self.dest,
            &mut self.system_js_config,
            &mut self.manifest,
        ] {
            if let Some(path) = field.take() {
                *field = Some(expand(&path)?);
            }
        }
        Ok(self)
    }
}

fn expand(path: &Path) -> Result<PathBuf, ConfigError> {
    let raw = path.to_string_lossy();
    shellexpand::full(&raw)
        .map(|expanded| PathBuf::from(expanded.into_owned()))
        .map_err(|e| ConfigError::Invalid(format!("{}: {}", path.display(), e)))
}
