// Path classification for module import paths
//
// Import paths are `/`-separated loader names such as
// `components/header/index.js`, `npm:lodash@4.17.4/index.js` or
// `components/header/style.css!npm:plugin-css@0.1.20`.

use std::path::Path;

/// Separator between a resource and the loader plugin that processes it
pub const PLUGIN_MARKER: char = '!';

/// Separator between a registry scheme and a package (`npm:lodash`)
pub const SCHEME_MARKER: char = ':';

/// File whose presence marks a directory as an independent component
pub const ENTRY_FILE: &str = "index.js";

/// Normalize Windows separators to `/`
pub fn normalize_path(value: &str) -> String {
    value.replace('\\', "/")
}

/// Drop the last `/`-separated segment; a path without separators becomes empty
pub fn navigate_up(path: &str) -> &str {
    path.rfind('/').map_or("", |idx| &path[..idx])
}

/// Substring before the plugin marker, or the path unchanged
pub fn strip_plugin_suffix(path: &str) -> &str {
    path.split_once(PLUGIN_MARKER)
        .map_or(path, |(resource, _)| resource)
}

/// Whether `path` points into a registry package rather than local source
pub fn is_vendor_reference(path: &str) -> bool {
    strip_plugin_suffix(path).contains(SCHEME_MARKER)
}

/// Whether `child` lies under `root`
///
/// The project root `.` contains everything; otherwise the match is on whole
/// segments, so `components/headerbar` is not inside `components/header`.
pub fn is_within(child: &str, root: &str) -> bool {
    if root.is_empty() || root == "." {
        return true;
    }
    match child.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn root_len(root: &str) -> usize {
    if root == "." {
        0
    } else {
        root.len()
    }
}

async fn has_entry_point(source_root: &Path, dir: &str) -> bool {
    if dir.is_empty() {
        return false;
    }
    let candidate = source_root.join(dir).join(ENTRY_FILE);
    matches!(tokio::fs::try_exists(&candidate).await, Ok(true))
}

/// Whether `child` sits in a nested component of `root`
///
/// Walks up from the child's directory and stops before reaching `root`
/// itself. Any directory on the way that has its own `index.js` (under
/// `source_root`) roots another component.
pub async fn is_descendant_package_of(child: &str, root: &str, source_root: &Path) -> bool {
    if !is_within(child, root) {
        return false;
    }

    let boundary = root_len(root);
    let mut dir = navigate_up(strip_plugin_suffix(child));

    while dir.len() > boundary {
        if has_entry_point(source_root, dir).await {
            return true;
        }
        dir = navigate_up(dir);
    }

    false
}

/// Whether `child` belongs to a component outside `root`
///
/// Walks every ancestor directory of a child that is not under `root` and
/// reports the first one that has its own `index.js`.
pub async fn is_foreign_package(child: &str, root: &str, source_root: &Path) -> bool {
    if is_within(child, root) {
        return false;
    }

    let mut dir = strip_plugin_suffix(child);

    while dir.contains('/') {
        dir = navigate_up(dir);
        if has_entry_point(source_root, dir).await {
            return true;
        }
    }

    false
}
