// Dependency graph and bundle types exchanged with the engine

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single traced module
///
/// Only `name` is interpreted here. Everything else the engine attaches
/// (deps, source, metadata) is carried through untouched so the compile step
/// receives exactly what the trace produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// Normalized import path, possibly with a plugin marker (`!`) and/or a
    /// registry scheme (`npm:`)
    pub name: String,

    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl DependencyRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: Map::new(),
        }
    }
}

/// Traced module graph keyed by import path
pub type DependencyGraph = IndexMap<String, DependencyRecord>;

/// Output of compiling a graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub source: String,

    #[serde(default)]
    pub source_map: Option<String>,

    /// Modules that actually made it into `source`
    #[serde(default)]
    pub modules: Vec<String>,
}

impl Bundle {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Options forwarded to the engine's compile step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    pub source_maps: bool,
    pub minify: bool,
    pub css_optimize: bool,
}

/// Build a graph from records, keyed by their names
pub fn graph_from<I>(records: I) -> DependencyGraph
where
    I: IntoIterator<Item = DependencyRecord>,
{
    records
        .into_iter()
        .map(|record| (record.name.clone(), record))
        .collect()
}

/// Merge `other` into `base`; on a key collision the later graph wins
pub fn merge_graphs(mut base: DependencyGraph, other: DependencyGraph) -> DependencyGraph {
    base.extend(other);
    base
}
