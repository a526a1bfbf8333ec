// Dependency-tree bundler for SystemJS/jspm projects
//
// Traces each component's import graph through an external engine, filters
// the graph down to what belongs in that component's bundle, compiles it and
// records the result in the loader configuration's `bundles` ledger.

pub mod classify;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod filters;
pub mod graph;
pub mod loader;
pub mod manifest;
pub mod orchestrator;
pub mod persist;

pub use config::{BundlerOptions, PartialOptions, OPTIONS_FILE};
pub use engine::{CommandEngine, ModuleEngine};
pub use error::{BundlerError, ConfigError, EngineError, ManifestError};
pub use events::{BundleEvent, BundleObserver, RecordingObserver, TracingObserver};
pub use graph::{Bundle, CompileOptions, DependencyGraph, DependencyRecord};
pub use loader::LoaderConfig;
pub use orchestrator::{BundleSpec, Bundler};
pub use persist::BundleTarget;
