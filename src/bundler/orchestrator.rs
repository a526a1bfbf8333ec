// Bundle orchestrator - trace, filter, compile and persist per operation

use crate::bundler::classify::{navigate_up, normalize_path, ENTRY_FILE};
use crate::bundler::config::BundlerOptions;
use crate::bundler::engine::{trace_expression, CommandEngine, ModuleEngine};
use crate::bundler::error::BundlerError;
use crate::bundler::events::{BundleEvent, BundleObserver};
use crate::bundler::filters::{
    filter_already_bundled, filter_plugins, filter_subpackages, filter_vendor_imports,
    filter_vendors,
};
use crate::bundler::graph::{merge_graphs, CompileOptions, DependencyGraph};
use crate::bundler::loader::{render_config, LoaderConfig};
use crate::bundler::manifest::PackageManifest;
use crate::bundler::persist::{save_bundle, BundleTarget};
use futures::future::join_all;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Components and vendor packages combined into one bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleSpec {
    /// Component roots (`components/header`)
    pub components: Vec<String>,

    /// Vendor package names as declared in `map`
    pub packages: Vec<String>,
}

/// One bundling session over a loader configuration
///
/// The loader configuration, and with it the bundle ledger, lives behind an
/// async mutex. Traces run without it. Each pipeline takes the lock before
/// its already-bundled check and keeps it until the new bundle is
/// registered, so concurrent pipelines never emit the same module twice.
pub struct Bundler {
    options: BundlerOptions,
    engine: Arc<dyn ModuleEngine>,
    state: Mutex<LoaderConfig>,
    observer: Option<Arc<dyn BundleObserver>>,
}

impl Bundler {
    /// Create a bundler over an already loaded configuration
    ///
    /// The ledger starts empty unless `keep_existing_bundles` is set.
    pub fn new(options: BundlerOptions, engine: Arc<dyn ModuleEngine>, mut config: LoaderConfig) -> Self {
        if !options.keep_existing_bundles {
            config.clear_bundles();
        }

        Self {
            options,
            engine,
            state: Mutex::new(config),
            observer: None,
        }
    }

    /// Load the configuration file and locate the engine executable
    pub async fn from_options(options: BundlerOptions) -> Result<Self, BundlerError> {
        let config = LoaderConfig::load(&options.system_js_config).await?;
        let engine = CommandEngine::new(&options.engine, &config.engine_config(&options.base_url))?;
        tracing::debug!(engine = %engine.engine_path().display(), "Using engine");

        Ok(Self::new(options, Arc::new(engine), config))
    }

    pub fn with_observer(mut self, observer: Arc<dyn BundleObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn options(&self) -> &BundlerOptions {
        &self.options
    }

    /// Snapshot of the current loader configuration
    pub async fn state(&self) -> LoaderConfig {
        self.state.lock().await.clone()
    }

    /// Loader configuration as it would be saved
    pub async fn render_state(&self) -> Result<String, BundlerError> {
        let state = self.state.lock().await;
        Ok(render_config(&state, &self.options.tab)?)
    }

    /// Bundle the component whose entry point is `entry` (`components/header/index.js`)
    pub async fn bundle_component(&self, entry: &str) -> Result<Option<BundleTarget>, BundlerError> {
        let result = self.bundle_component_inner(entry).await;
        self.finish("bundle_component", result)
    }

    /// Bundle several component roots into one bundle saved as `save_as`
    pub async fn bundle_components(
        &self,
        components: &[String],
        save_as: &str,
    ) -> Result<Option<BundleTarget>, BundlerError> {
        let result = self.bundle_group(components, &[], save_as).await;
        self.finish("bundle_components", result)
    }

    /// Bundle components together with vendor packages, saved as `save_as`
    pub async fn bundle(
        &self,
        spec: &BundleSpec,
        save_as: &str,
    ) -> Result<Option<BundleTarget>, BundlerError> {
        let result = self
            .bundle_group(&spec.components, &spec.packages, save_as)
            .await;
        self.finish("bundle", result)
    }

    /// Bundle one vendor package and everything it maps to
    pub async fn bundle_package(&self, name: &str) -> Result<Option<BundleTarget>, BundlerError> {
        let result = self.bundle_packages_inner(&[name.to_string()], None).await;
        self.finish("bundle_package", result)
    }

    /// Bundle vendor packages together, saved as `save_as` or the names joined with `+`
    pub async fn bundle_packages(
        &self,
        names: &[String],
        save_as: Option<&str>,
    ) -> Result<Option<BundleTarget>, BundlerError> {
        let result = self.bundle_packages_inner(names, save_as).await;
        self.finish("bundle_packages", result)
    }

    /// Bundle every component under the source root that has no bundle yet
    pub async fn bundle_remaining_components(&self) -> Result<Vec<BundleTarget>, BundlerError> {
        let result = self.bundle_remaining_components_inner().await;
        self.finish("bundle_remaining_components", result)
    }

    /// Bundle every declared jspm dependency that is installed and has no bundle yet
    pub async fn bundle_remaining_packages(&self) -> Result<Vec<BundleTarget>, BundlerError> {
        let result = self.bundle_remaining_packages_inner().await;
        self.finish("bundle_remaining_packages", result)
    }

    /// Write the loader configuration, ledger included, back to its file
    pub async fn save_config(&self) -> Result<PathBuf, BundlerError> {
        let result = self.save_config_inner().await;
        let path = self.finish("save_config", result)?;
        self.emit(BundleEvent::ConfigSaved { path: path.clone() });
        Ok(path)
    }

    async fn save_config_inner(&self) -> Result<PathBuf, BundlerError> {
        let path = &self.options.system_js_config;
        let state = self.state.lock().await;
        state.save(path, &self.options.tab).await?;
        Ok(path.clone())
    }

    async fn bundle_component_inner(&self, entry: &str) -> Result<Option<BundleTarget>, BundlerError> {
        let entry = normalize_path(entry);
        let root = component_root(&entry);

        let graph = self.engine.trace(&entry).await?;

        let mut state = self.state.lock().await;
        let graph = self.component_filters(graph, &root, &state).await;
        self.compile_and_save(&root, graph, &mut state).await
    }

    async fn bundle_group(
        &self,
        components: &[String],
        packages: &[String],
        save_as: &str,
    ) -> Result<Option<BundleTarget>, BundlerError> {
        let roots: Vec<String> = components.iter().map(|c| root_name(c)).collect();

        let traces = settle_all(
            roots
                .iter()
                .map(|root| async move { Ok(self.engine.trace(&entry_of(root)).await?) }),
        )
        .await?;

        let vendor = if packages.is_empty() {
            None
        } else {
            Some(self.engine.trace(&trace_expression(packages)).await?)
        };

        let mut state = self.state.lock().await;
        let mut merged = DependencyGraph::new();
        for (root, graph) in roots.iter().zip(traces) {
            let graph = self.component_filters(graph, root, &state).await;
            merged = merge_graphs(merged, graph);
        }
        if let Some(graph) = vendor {
            let graph = filter_vendors(graph, packages, &state);
            let graph = filter_already_bundled(graph, &state);
            merged = merge_graphs(merged, graph);
        }

        self.compile_and_save(save_as, merged, &mut state).await
    }

    async fn bundle_packages_inner(
        &self,
        names: &[String],
        save_as: Option<&str>,
    ) -> Result<Option<BundleTarget>, BundlerError> {
        let root = save_as.map_or_else(|| names.join("+"), str::to_string);

        let graph = self.engine.trace(&trace_expression(names)).await?;

        let mut state = self.state.lock().await;
        let graph = filter_vendors(graph, names, &state);
        let graph = filter_already_bundled(graph, &state);
        self.compile_and_save(&root, graph, &mut state).await
    }

    async fn bundle_remaining_components_inner(&self) -> Result<Vec<BundleTarget>, BundlerError> {
        let entries = self.discover_entry_points()?;

        let pending: Vec<String> = {
            let state = self.state.lock().await;
            entries
                .into_iter()
                .filter(|entry| {
                    let id = BundleTarget::for_root(&component_root(entry), &self.options).id;
                    !state.has_bundle(&id)
                })
                .collect()
        };
        tracing::debug!(count = pending.len(), "Remaining components");

        let written = settle_all(pending.iter().map(|entry| self.bundle_component_inner(entry))).await?;
        Ok(written.into_iter().flatten().collect())
    }

    async fn bundle_remaining_packages_inner(&self) -> Result<Vec<BundleTarget>, BundlerError> {
        let manifest = PackageManifest::from_file(&self.options.manifest).await?;
        let declared = manifest.jspm_dependencies(&self.options.manifest)?;

        let mut pending = Vec::new();
        {
            let state = self.state.lock().await;
            for name in declared {
                let id = BundleTarget::for_root(&name, &self.options).id;
                if state.has_bundle(&id) {
                    continue;
                }

                let Some(main) = main_file(&state, &name, Path::new(&self.options.base_url)) else {
                    self.emit(BundleEvent::PackageSkipped {
                        name,
                        reason: "no location in map/paths".to_string(),
                    });
                    continue;
                };

                if matches!(tokio::fs::try_exists(&main).await, Ok(true)) {
                    pending.push(name);
                } else {
                    self.emit(BundleEvent::PackageSkipped {
                        name,
                        reason: format!("{} not installed", main.display()),
                    });
                }
            }
        }
        tracing::debug!(count = pending.len(), "Remaining packages");

        let written = settle_all(
            pending
                .iter()
                .map(|name| self.bundle_packages_inner(std::slice::from_ref(name), None)),
        )
        .await?;
        Ok(written.into_iter().flatten().collect())
    }

    /// Entry points under the source root, relative to it, in sorted order
    fn discover_entry_points(&self) -> Result<Vec<String>, BundlerError> {
        let base = &self.options.base_path;
        let pattern = base.join("**").join(ENTRY_FILE);
        let pattern = pattern.to_string_lossy();

        let paths = glob::glob(&pattern)
            .map_err(|e| BundlerError::Discovery(format!("{pattern}: {e}")))?;

        let mut entries = Vec::new();
        for path in paths {
            let path = path.map_err(|e| BundlerError::Discovery(e.to_string()))?;
            let relative = path.strip_prefix(base).unwrap_or(&path);
            entries.push(normalize_path(&relative.to_string_lossy()));
        }
        entries.sort();
        Ok(entries)
    }

    async fn component_filters(
        &self,
        graph: DependencyGraph,
        root: &str,
        state: &LoaderConfig,
    ) -> DependencyGraph {
        let graph = filter_already_bundled(graph, state);
        let graph = filter_vendor_imports(graph);
        let graph = filter_subpackages(graph, root, &self.options.base_path).await;
        filter_plugins(graph, state)
    }

    async fn compile_and_save(
        &self,
        root: &str,
        graph: DependencyGraph,
        state: &mut LoaderConfig,
    ) -> Result<Option<BundleTarget>, BundlerError> {
        if graph.is_empty() {
            self.emit(BundleEvent::BundleSkipped {
                root: root.to_string(),
            });
            return Ok(None);
        }

        let bundle = self.engine.compile(&graph, self.compile_options()).await?;
        let modules = bundle.modules.len();

        match save_bundle(root, bundle, &self.options, state).await? {
            Some(target) => {
                self.emit(BundleEvent::BundleWritten {
                    id: target.id.clone(),
                    path: target.path(),
                    modules,
                });
                Ok(Some(target))
            }
            None => {
                self.emit(BundleEvent::BundleSkipped {
                    root: root.to_string(),
                });
                Ok(None)
            }
        }
    }

    fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            source_maps: self.options.source_maps,
            minify: self.options.minify,
            css_optimize: self.options.css_optimize,
        }
    }

    fn emit(&self, event: BundleEvent) {
        if let Some(observer) = &self.observer {
            observer.record_event(&event);
        }
    }

    /// Report a failed operation to the observer, then hand the result back
    fn finish<T>(&self, operation: &str, result: Result<T, BundlerError>) -> Result<T, BundlerError> {
        if let Err(error) = &result {
            self.emit(BundleEvent::Failed {
                operation: operation.to_string(),
                error: error.to_string(),
            });
        }
        result
    }
}

/// Component root of an entry point; `.` for the project root
fn component_root(entry: &str) -> String {
    match navigate_up(entry) {
        "" => ".".to_string(),
        dir => dir.to_string(),
    }
}

fn root_name(component: &str) -> String {
    let root = normalize_path(component);
    match root.trim_end_matches('/') {
        "" => ".".to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn entry_of(root: &str) -> String {
    if root == "." {
        ENTRY_FILE.to_string()
    } else {
        format!("{root}/{ENTRY_FILE}")
    }
}

/// On-disk main file of a package: its `map` location resolved through `paths`, plus `.js`
fn main_file(state: &LoaderConfig, name: &str, base_url: &Path) -> Option<PathBuf> {
    let location = state.location_of(name)?;
    let resolved = state.resolve_location(location, base_url)?;
    let mut main = resolved.into_os_string();
    main.push(".js");
    Some(PathBuf::from(main))
}

/// Drive every unit to completion, then report the first failure
///
/// A failing unit never cancels its siblings: a pipeline that is already
/// compiling still writes and registers its bundle.
async fn settle_all<T, F>(units: impl IntoIterator<Item = F>) -> Result<Vec<T>, BundlerError>
where
    F: Future<Output = Result<T, BundlerError>>,
{
    join_all(units).await.into_iter().collect()
}
