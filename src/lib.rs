pub mod bundler;

pub use bundler::{BundleSpec, Bundler, BundlerError, BundlerOptions, LoaderConfig, ModuleEngine};
