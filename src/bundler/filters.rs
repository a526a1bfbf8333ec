// Tree filters - subset selections over a traced dependency graph
//
// Each filter consumes a graph and returns the subset that survives. The
// orchestrator chains them in a fixed order per operation.

use crate::bundler::classify::{
    is_descendant_package_of, is_foreign_package, is_vendor_reference, PLUGIN_MARKER,
};
use crate::bundler::graph::DependencyGraph;
use crate::bundler::loader::LoaderConfig;
use std::collections::BTreeSet;
use std::path::Path;

/// Package identifier of the CSS loader plugin
pub const CSS_PLUGIN: &str = "plugin-css@";

/// Drop every module some ledger entry already holds
pub fn filter_already_bundled(graph: DependencyGraph, state: &LoaderConfig) -> DependencyGraph {
    let bundled: BTreeSet<&str> = state
        .bundles()
        .flat_map(|(_, modules)| modules)
        .collect();

    if bundled.is_empty() {
        return graph;
    }

    let before = graph.len();
    let kept: DependencyGraph = graph
        .into_iter()
        .filter(|(_, record)| !bundled.contains(record.name.as_str()))
        .collect();
    tracing::debug!(before, after = kept.len(), "filter_already_bundled");
    kept
}

/// Drop CSS-plugin resources unless `buildCSS` is set
pub fn filter_plugins(graph: DependencyGraph, state: &LoaderConfig) -> DependencyGraph {
    if state.build_css() {
        return graph;
    }

    graph
        .into_iter()
        .filter(|(_, record)| !is_css_plugin_resource(&record.name))
        .collect()
}

/// A plugin marker positioned before the CSS plugin's package identifier
fn is_css_plugin_resource(name: &str) -> bool {
    match (name.find(PLUGIN_MARKER), name.find(CSS_PLUGIN)) {
        (Some(marker), Some(plugin)) => marker < plugin,
        _ => false,
    }
}

/// Keep only modules that belong to the component rooted at `root`
///
/// Modules in nested components and in sibling components are dropped; both
/// are bundled on their own.
pub async fn filter_subpackages(
    graph: DependencyGraph,
    root: &str,
    source_root: &Path,
) -> DependencyGraph {
    let before = graph.len();
    let mut kept = DependencyGraph::with_capacity(before);

    for (key, record) in graph {
        let foreign = is_descendant_package_of(&record.name, root, source_root).await
            || is_foreign_package(&record.name, root, source_root).await;
        if !foreign {
            kept.insert(key, record);
        }
    }

    tracing::debug!(root, before, after = kept.len(), "filter_subpackages");
    kept
}

/// Keep only local (non-registry) modules
pub fn filter_vendor_imports(graph: DependencyGraph) -> DependencyGraph {
    graph
        .into_iter()
        .filter(|(_, record)| !is_vendor_reference(&record.name))
        .collect()
}

/// Keep only modules of the `keepers` packages and whatever they map to
pub fn filter_vendors(
    graph: DependencyGraph,
    keepers: &[String],
    state: &LoaderConfig,
) -> DependencyGraph {
    let locations = keeper_locations(keepers, state);
    tracing::debug!(keepers = ?keepers, locations = ?locations, "filter_vendors");

    graph
        .into_iter()
        .filter(|(_, record)| {
            locations
                .iter()
                .any(|location| record.name.starts_with(location.as_str()))
        })
        .collect()
}

/// Resolve package names to loader locations and expand them to a fixed point
///
/// A name missing from `map` is taken as a location itself. Each location whose
/// `map` entry is an object contributes the locations of its own dependencies,
/// until no new location turns up.
pub fn keeper_locations(keepers: &[String], state: &LoaderConfig) -> BTreeSet<String> {
    let mut locations: BTreeSet<String> = keepers
        .iter()
        .map(|name| {
            state
                .location_of(name)
                .map_or_else(|| name.clone(), str::to_string)
        })
        .collect();

    let mut pending: Vec<String> = locations.iter().cloned().collect();
    while let Some(location) = pending.pop() {
        for dependency in state.sub_mappings(&location) {
            if locations.insert(dependency.to_string()) {
                pending.push(dependency.to_string());
            }
        }
    }

    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::graph::{graph_from, DependencyRecord};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn graph(names: &[&str]) -> DependencyGraph {
        graph_from(names.iter().map(|name| DependencyRecord::new(*name)))
    }

    fn names(graph: &DependencyGraph) -> Vec<&str> {
        graph.values().map(|r| r.name.as_str()).collect()
    }

    fn state(value: Value) -> LoaderConfig {
        match value {
            Value::Object(entries) => LoaderConfig::from_entries(entries),
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn already_bundled_modules_are_dropped() {
        let mut ledger = LoaderConfig::default();
        ledger.register_bundle("bundles/a", &["m.js".to_string()]);

        let kept = filter_already_bundled(graph(&["m.js", "n.js"]), &ledger);
        assert_eq!(names(&kept), ["n.js"]);
    }

    #[test]
    fn css_plugin_resources_dropped_unless_enabled() {
        let input = graph(&[
            "components/a/style.css!npm:plugin-css@0.1.20",
            "components/a/tpl.html!npm:plugin-text@0.0.4",
            "npm:plugin-css@0.1.20.js",
            "components/a/index.js",
        ]);

        let kept = filter_plugins(input.clone(), &LoaderConfig::default());
        assert_eq!(
            names(&kept),
            [
                "components/a/tpl.html!npm:plugin-text@0.0.4",
                "npm:plugin-css@0.1.20.js",
                "components/a/index.js"
            ]
        );

        let kept = filter_plugins(input, &state(json!({"buildCSS": true})));
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn vendor_imports_dropped() {
        let kept = filter_vendor_imports(graph(&[
            "components/a/index.js",
            "npm:lodash@4.17.4/index.js",
            "components/a/style.css!npm:plugin-css@0.1.20",
        ]));
        assert_eq!(
            names(&kept),
            [
                "components/a/index.js",
                "components/a/style.css!npm:plugin-css@0.1.20"
            ]
        );
    }

    #[test]
    fn vendors_transitive_closure() {
        let config = state(json!({
            "map": {
                "A": "loc/A",
                "B": "loc/B",
                "loc/A": {"x": "loc/B"}
            }
        }));

        let kept = filter_vendors(
            graph(&["loc/A/index.js", "loc/B/index.js", "loc/C/index.js"]),
            &["A".to_string()],
            &config,
        );
        assert_eq!(names(&kept), ["loc/A/index.js", "loc/B/index.js"]);
    }

    #[test]
    fn keeper_locations_reach_fixed_point_on_cycles() {
        let config = state(json!({
            "map": {
                "a": "npm:a@1",
                "npm:a@1": {"b": "npm:b@1"},
                "npm:b@1": {"a": "npm:a@1", "c": "npm:c@1"}
            }
        }));

        let locations = keeper_locations(&["a".to_string()], &config);
        assert_eq!(
            locations.into_iter().collect::<Vec<_>>(),
            ["npm:a@1", "npm:b@1", "npm:c@1"]
        );
    }

    #[test]
    fn unmapped_keeper_is_its_own_location() {
        let locations = keeper_locations(&["github:x/y@1".to_string()], &LoaderConfig::default());
        assert!(locations.contains("github:x/y@1"));
    }

    #[tokio::test]
    async fn subpackages_and_siblings_dropped() {
        let tmp = TempDir::new().unwrap();
        for dir in ["components/header", "components/header/icon", "components/footer"] {
            std::fs::create_dir_all(tmp.path().join(dir)).unwrap();
            std::fs::write(tmp.path().join(dir).join("index.js"), "").unwrap();
        }

        let kept = filter_subpackages(
            graph(&[
                "components/header/index.js",
                "components/header/logo.js",
                "components/header/icon/index.js",
                "components/footer/index.js",
            ]),
            "components/header",
            tmp.path(),
        )
        .await;

        assert_eq!(
            names(&kept),
            ["components/header/index.js", "components/header/logo.js"]
        );
    }
}
