// Engine interface - trace module graphs and compile them into bundles

pub mod command;

pub use command::CommandEngine;

use crate::bundler::error::EngineError;
use crate::bundler::graph::{Bundle, CompileOptions, DependencyGraph};
use async_trait::async_trait;

/// External graph-resolution and code-generation engine
///
/// The bundler never parses modules itself. It asks the engine for the graph
/// reachable from a trace expression, filters it, and hands the subset back
/// for compilation.
#[async_trait]
pub trait ModuleEngine: Send + Sync {
    /// Trace `expression` (one module, or several joined with ` + `)
    async fn trace(&self, expression: &str) -> Result<DependencyGraph, EngineError>;

    /// Compile exactly the modules in `graph`
    async fn compile(
        &self,
        graph: &DependencyGraph,
        options: CompileOptions,
    ) -> Result<Bundle, EngineError>;
}

/// Trace expression combining several modules or packages
pub fn trace_expression<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" + ")
}
