// Bundle persistence - output naming, file writes and ledger registration

use crate::bundler::classify::{navigate_up, normalize_path};
use crate::bundler::config::BundlerOptions;
use crate::bundler::error::BundlerError;
use crate::bundler::graph::Bundle;
use crate::bundler::loader::LoaderConfig;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

/// Where a bundle for a given root lands and how the ledger names it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleTarget {
    /// Ledger id (`bundles/components/header`)
    pub id: String,

    /// Directory the bundle and its map are written to
    pub dir: PathBuf,

    /// Bundle file name (`header.js`)
    pub filename: String,
}

impl BundleTarget {
    /// Derive the output location for a component or bundle root
    ///
    /// `components/header` becomes `<dest>/components/header.js`; the project
    /// root `.` becomes `<dest>/index.js`.
    pub fn for_root(root: &str, options: &BundlerOptions) -> Self {
        let root = normalize_path(root);
        let root = root.trim_end_matches('/');

        if root.is_empty() || root == "." {
            return Self {
                id: format!("{}/index", options.bundles_base_url),
                dir: options.dest.clone(),
                filename: "index.js".to_string(),
            };
        }

        let parent = navigate_up(root);
        let basename = root.rsplit('/').next().unwrap_or(root);
        let dir = if parent.is_empty() {
            options.dest.clone()
        } else {
            options.dest.join(parent)
        };

        Self {
            id: format!("{}/{}", options.bundles_base_url, root),
            dir,
            filename: format!("{basename}.js"),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }

    pub fn map_filename(&self) -> String {
        format!("{}.map", self.filename)
    }
}

/// Write `bundle` for `root` and record it in the ledger
///
/// Returns `Ok(None)` without touching the filesystem or the ledger when the
/// bundle holds no modules.
pub async fn save_bundle(
    root: &str,
    bundle: Bundle,
    options: &BundlerOptions,
    state: &mut LoaderConfig,
) -> Result<Option<BundleTarget>, BundlerError> {
    if bundle.is_empty() {
        return Ok(None);
    }

    let target = BundleTarget::for_root(root, options);
    tokio::fs::create_dir_all(&target.dir)
        .await
        .map_err(|e| BundlerError::write(&target.dir, e))?;

    let mut source = bundle.source;

    if options.source_maps {
        match bundle.source_map {
            Some(map) => {
                let map = if options.relative_source_maps {
                    let prefix = relative_prefix(&target.dir, Path::new(&options.base_url));
                    rewrite_sources(&map, &prefix)?
                } else {
                    map
                };

                let map_path = target.dir.join(target.map_filename());
                tokio::fs::write(&map_path, map)
                    .await
                    .map_err(|e| BundlerError::write(&map_path, e))?;

                source.push_str("\n\n//# sourceMappingURL=");
                source.push_str(&target.map_filename());
            }
            None => {
                tracing::warn!(root, "Engine returned no source map");
            }
        }
    }

    let path = target.path();
    tokio::fs::write(&path, source)
        .await
        .map_err(|e| BundlerError::write(&path, e))?;

    state.register_bundle(target.id.clone(), &bundle.modules);
    Ok(Some(target))
}

/// Prefix relative source-map entries so they resolve from the bundle's directory
pub fn rewrite_sources(map: &str, prefix: &str) -> Result<String, BundlerError> {
    let mut parsed: Value = serde_json::from_str(map)
        .map_err(|e| BundlerError::SourceMap(e.to_string()))?;

    if let Some(Value::Array(sources)) = parsed.get_mut("sources") {
        for source in sources.iter_mut() {
            if let Some(path) = source.as_str() {
                if !path.starts_with('/') && !path.contains(':') {
                    *source = Value::String(format!("{prefix}{path}"));
                }
            }
        }
    }

    serde_json::to_string(&parsed)
        .map_err(|e| BundlerError::SourceMap(e.to_string()))
}

/// `/`-separated path leading from `from_dir` to `to_dir`, with a trailing `/`
pub fn relative_prefix(from_dir: &Path, to_dir: &Path) -> String {
    let from = absolute_dir(from_dir);
    let to = absolute_dir(to_dir);

    let Some(relative) = pathdiff::diff_paths(&to, &from) else {
        return format!("{}/", normalize_path(&to.to_string_lossy()).trim_end_matches('/'));
    };

    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if segments.is_empty() {
        String::new()
    } else {
        format!("{}/", segments.join("/"))
    }
}

fn absolute_dir(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    absolute
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(dest: &Path) -> BundlerOptions {
        BundlerOptions {
            dest: dest.to_path_buf(),
            ..Default::default()
        }
    }

    fn bundle(modules: &[&str]) -> Bundle {
        Bundle {
            source: "System.register([], function() {});".to_string(),
            source_map: Some(r#"{"version":3,"sources":["components/header/index.js"],"mappings":""}"#.to_string()),
            modules: modules.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn target_for_component_root() {
        let target = BundleTarget::for_root("components/header", &options(Path::new("out")));
        assert_eq!(target.id, "bundles/components/header");
        assert_eq!(target.path(), PathBuf::from("out/components/header.js"));
        assert_eq!(target.map_filename(), "header.js.map");
    }

    #[test]
    fn target_for_project_root() {
        let target = BundleTarget::for_root(".", &options(Path::new("out")));
        assert_eq!(target.id, "bundles/index");
        assert_eq!(target.path(), PathBuf::from("out/index.js"));
    }

    #[test]
    fn target_for_flat_name() {
        let target = BundleTarget::for_root("lodash+react", &options(Path::new("out")));
        assert_eq!(target.id, "bundles/lodash+react");
        assert_eq!(target.path(), PathBuf::from("out/lodash+react.js"));
    }

    #[test]
    fn target_normalizes_windows_separators() {
        let target = BundleTarget::for_root("components\\header", &options(Path::new("out")));
        assert_eq!(target.id, "bundles/components/header");
    }

    #[tokio::test]
    async fn empty_bundle_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("bundles");
        let mut state = LoaderConfig::default();

        let result = save_bundle("components/a", bundle(&[]), &options(&dest), &mut state)
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(!dest.exists());
        assert!(!state.has_bundle("bundles/components/a"));
    }

    #[tokio::test]
    async fn bundle_and_map_written_and_registered() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("bundles");
        let mut state = LoaderConfig::default();

        let target = save_bundle(
            "components/header",
            bundle(&["components/header/index.js"]),
            &options(&dest),
            &mut state,
        )
        .await
        .unwrap()
        .unwrap();

        let source = std::fs::read_to_string(target.path()).unwrap();
        assert!(source.ends_with("\n\n//# sourceMappingURL=header.js.map"));
        assert!(dest.join("components/header.js.map").exists());
        assert!(state.is_bundled("components/header/index.js"));
        assert!(state.has_bundle("bundles/components/header"));
    }

    #[tokio::test]
    async fn source_maps_disabled_skips_map() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("bundles");
        let mut state = LoaderConfig::default();
        let opts = BundlerOptions {
            source_maps: false,
            ..options(&dest)
        };

        let target = save_bundle("lodash", bundle(&["npm:lodash@4.17.4.js"]), &opts, &mut state)
            .await
            .unwrap()
            .unwrap();

        let source = std::fs::read_to_string(target.path()).unwrap();
        assert!(!source.contains("sourceMappingURL"));
        assert!(!dest.join("lodash.js.map").exists());
    }

    #[test]
    fn relative_prefix_between_dirs() {
        assert_eq!(
            relative_prefix(Path::new("/p/build/bundles/components"), Path::new("/p")),
            "../../../"
        );
        assert_eq!(relative_prefix(Path::new("/p/out"), Path::new("/p/src")), "../src/");
        assert_eq!(relative_prefix(Path::new("/p"), Path::new("/p")), "");
    }

    #[test]
    fn relative_prefix_ignores_current_dir_components() {
        assert_eq!(
            relative_prefix(Path::new("/p/./out/bundles"), Path::new("/p/.")),
            "../../"
        );
    }

    #[test]
    fn invalid_source_map_is_reported() {
        let result = rewrite_sources("not json", "../");
        assert!(matches!(result, Err(BundlerError::SourceMap(_))));
    }

    #[test]
    fn rewrite_sources_prefixes_relative_entries_only() {
        let map = r#"{"version":3,"sources":["a/b.js","/abs/c.js","npm:x@1/y.js"],"mappings":""}"#;
        let rewritten: Value = serde_json::from_str(&rewrite_sources(map, "../../").unwrap()).unwrap();
        assert_eq!(
            rewritten["sources"],
            serde_json::json!(["../../a/b.js", "/abs/c.js", "npm:x@1/y.js"])
        );
    }
}
