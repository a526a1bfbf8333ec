// Loader configuration state - the parsed `System.config({...})` mapping and the bundle ledger

pub mod format;
pub mod parse;

pub use format::render_config;
pub use parse::parse_config_source;

use crate::bundler::error::ConfigError;
use crate::bundler::classify::normalize_path;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Loader configuration held in memory for one bundling session
///
/// Entries keep the order they had in the file so that saving rewrites the
/// file with minimal churn. The recognized keys (`map`, `paths`, `buildCSS`,
/// `bundles`) get typed accessors; everything else is carried verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoaderConfig {
    entries: Map<String, Value>,
}

impl LoaderConfig {
    pub fn from_entries(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Parse configuration text
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        parse_config_source(source).map(Self::from_entries)
    }

    /// Read and parse the configuration file at `path`
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;

        let config = Self::parse(&source)?;
        tracing::debug!(
            path = %path.display(),
            keys = config.entries.len(),
            "Loaded loader configuration"
        );
        Ok(config)
    }

    /// Serialize and write the configuration to `path`
    pub async fn save(&self, path: &Path, tab: &str) -> Result<(), ConfigError> {
        let text = render_config(self, tab)?;
        tokio::fs::write(path, text)
            .await
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                error: e.to_string(),
            })
    }

    pub fn entries(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Whether CSS plugin resources may be bundled (`buildCSS`)
    pub fn build_css(&self) -> bool {
        match self.entries.get("buildCSS") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Null) | None => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(_) => true,
        }
    }

    /// Raw `map` entry for a package name or location
    pub fn map_entry(&self, name: &str) -> Option<&Value> {
        self.entries.get("map")?.as_object()?.get(name)
    }

    /// Location a package name maps to, if it maps to a plain location
    pub fn location_of(&self, name: &str) -> Option<&str> {
        self.map_entry(name)?.as_str()
    }

    /// Sub-mappings declared for a location (`map["npm:a@1"] = { dep: "npm:b@2" }`)
    pub fn sub_mappings(&self, location: &str) -> Vec<&str> {
        match self.map_entry(location) {
            Some(Value::Object(nested)) => nested.values().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// `paths` aliases in declaration order
    pub fn paths(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .get("paths")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|paths| paths.iter())
            .filter_map(|(alias, target)| Some((alias.as_str(), target.as_str()?)))
    }

    /// Ledger entries: bundle id and the modules it holds
    pub fn bundles(&self) -> impl Iterator<Item = (&str, Vec<&str>)> {
        self.entries
            .get("bundles")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|bundles| bundles.iter())
            .map(|(id, modules)| {
                let names = modules
                    .as_array()
                    .map(|list| list.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                (id.as_str(), names)
            })
    }

    pub fn has_bundle(&self, id: &str) -> bool {
        self.entries
            .get("bundles")
            .and_then(Value::as_object)
            .is_some_and(|bundles| bundles.contains_key(id))
    }

    /// Whether any ledger entry already holds `module`
    pub fn is_bundled(&self, module: &str) -> bool {
        self.bundles()
            .any(|(_, modules)| modules.iter().any(|m| *m == module))
    }

    /// Record a written bundle in the ledger
    pub fn register_bundle(&mut self, id: impl Into<String>, modules: &[String]) {
        let list = Value::Array(modules.iter().cloned().map(Value::String).collect());
        let bundles = self
            .entries
            .entry("bundles")
            .or_insert_with(|| Value::Object(Map::new()));
        if !bundles.is_object() {
            *bundles = Value::Object(Map::new());
        }
        if let Value::Object(bundles) = bundles {
            bundles.insert(id.into(), list);
        }
    }

    /// Start a fresh ledger, keeping the key's position in the file
    pub fn clear_bundles(&mut self) {
        self.entries
            .insert("bundles".to_string(), Value::Object(Map::new()));
    }

    /// Configuration handed to the engine
    ///
    /// The ledger is emptied, `baseURL` is set to `base_url`, and every `paths`
    /// target that is not already a `file:` URL is made absolute against it.
    pub fn engine_config(&self, base_url: &str) -> Self {
        let mut config = self.clone();
        config.clear_bundles();
        config.set("baseURL", Value::String(base_url.to_string()));

        let protocol = if cfg!(windows) { "file:///" } else { "file://" };
        if let Some(Value::Object(paths)) = config.entries.get_mut("paths") {
            for target in paths.values_mut() {
                let Some(location) = target.as_str() else {
                    continue;
                };
                if location.starts_with("file:") {
                    continue;
                }
                let joined = Path::new(base_url).join(location);
                let absolute = std::path::absolute(&joined).unwrap_or(joined);
                *target = Value::String(format!(
                    "{protocol}{}",
                    normalize_path(&absolute.to_string_lossy())
                ));
            }
        }
        config
    }

    /// Resolve a loader location (`npm:lodash@4.17.4`) to a filesystem path
    /// through the `paths` aliases, relative to `base_url`
    ///
    /// The most specific (longest) matching alias wins. A `*` in an alias
    /// captures the remainder and is substituted into the target.
    pub fn resolve_location(&self, location: &str, base_url: &Path) -> Option<PathBuf> {
        let mut best: Option<(usize, String)> = None;

        for (alias, target) in self.paths() {
            let resolved = match alias.split_once('*') {
                Some((prefix, suffix)) => location
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_suffix(suffix))
                    .map(|captured| target.replacen('*', captured, 1)),
                None => (alias == location).then(|| target.to_string()),
            };

            if let Some(resolved) = resolved {
                let specificity = alias.len();
                if best.as_ref().is_none_or(|(len, _)| specificity > *len) {
                    best = Some((specificity, resolved));
                }
            }
        }

        let (_, resolved) = best?;
        let resolved = resolved
            .strip_prefix("file:///")
            .map(|rest| if cfg!(windows) { rest.to_string() } else { format!("/{rest}") })
            .or_else(|| resolved.strip_prefix("file://").map(str::to_string))
            .unwrap_or(resolved);

        Some(base_url.join(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: Value) -> LoaderConfig {
        match value {
            Value::Object(entries) => LoaderConfig::from_entries(entries),
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn build_css_defaults_to_false() {
        assert!(!LoaderConfig::default().build_css());
        assert!(config(json!({"buildCSS": true})).build_css());
        assert!(!config(json!({"buildCSS": false})).build_css());
    }

    #[test]
    fn map_lookups() {
        let state = config(json!({
            "map": {
                "lodash": "npm:lodash@4.17.4",
                "npm:a@1": {"b": "npm:b@2", "c": "npm:c@3"}
            }
        }));

        assert_eq!(state.location_of("lodash"), Some("npm:lodash@4.17.4"));
        assert_eq!(state.location_of("npm:a@1"), None);
        assert_eq!(state.sub_mappings("npm:a@1"), vec!["npm:b@2", "npm:c@3"]);
        assert!(state.sub_mappings("lodash").is_empty());
    }

    #[test]
    fn ledger_register_and_lookup() {
        let mut state = LoaderConfig::default();
        assert!(!state.is_bundled("a.js"));

        state.register_bundle("bundles/header", &["a.js".to_string(), "b.js".to_string()]);

        assert!(state.has_bundle("bundles/header"));
        assert!(state.is_bundled("b.js"));
        assert!(!state.is_bundled("c.js"));

        state.clear_bundles();
        assert!(!state.is_bundled("a.js"));
        assert_eq!(state.get("bundles"), Some(&json!({})));
    }

    #[test]
    fn engine_config_rewrites_paths() {
        let state = config(json!({
            "paths": {
                "npm:*": "jspm_packages/npm/*",
                "remote:*": "file:///srv/remote/*"
            },
            "bundles": {"bundles/x": ["x.js"]}
        }));

        let engine = state.engine_config("/project");

        assert_eq!(engine.get("baseURL"), Some(&json!("/project")));
        assert_eq!(engine.get("bundles"), Some(&json!({})));
        let paths: Vec<_> = engine.paths().collect();
        assert_eq!(paths[1], ("remote:*", "file:///srv/remote/*"));
        assert!(paths[0].1.starts_with("file://"));
        assert!(paths[0].1.ends_with("/project/jspm_packages/npm/*"));

        // the session state itself is untouched
        assert!(state.is_bundled("x.js"));
    }

    #[test]
    fn resolve_location_prefers_longest_alias() {
        let state = config(json!({
            "paths": {
                "*": "src/*",
                "npm:*": "jspm_packages/npm/*"
            }
        }));

        assert_eq!(
            state.resolve_location("npm:lodash@4.17.4", Path::new(".")),
            Some(PathBuf::from("./jspm_packages/npm/lodash@4.17.4"))
        );
        assert_eq!(
            state.resolve_location("app/main", Path::new("/p")),
            Some(PathBuf::from("/p/src/app/main"))
        );
    }

    #[test]
    fn resolve_location_without_match() {
        let state = config(json!({"paths": {"npm:*": "jspm_packages/npm/*"}}));
        assert_eq!(state.resolve_location("github:x/y", Path::new(".")), None);
    }
}
