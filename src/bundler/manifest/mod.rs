// Project manifest parsing (package.json jspm section)

use crate::bundler::error::ManifestError;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

/// The parts of package.json the bundler reads
#[derive(Debug, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub jspm: Option<JspmSection>,
}

/// `jspm` section of package.json
#[derive(Debug, Deserialize, Default)]
pub struct JspmSection {
    /// Package name -> version/location specifier (`npm:lodash@^4.17.4`)
    #[serde(default)]
    pub dependencies: Option<IndexMap<String, String>>,
}

impl PackageManifest {
    /// Parse package.json from a file path
    pub async fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ManifestError::Io {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;

        serde_json::from_str(&content).map_err(|e| ManifestError::Json {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse package.json from a string
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(content).map_err(|e| ManifestError::Json {
            path: "<string>".into(),
            error: e.to_string(),
        })
    }

    /// Names declared in `jspm.dependencies`, in declaration order
    pub fn jspm_dependencies(&self, path: &Path) -> Result<Vec<String>, ManifestError> {
        self.jspm
            .as_ref()
            .and_then(|jspm| jspm.dependencies.as_ref())
            .map(|deps| deps.keys().cloned().collect())
            .ok_or_else(|| ManifestError::MissingDependencies {
                path: path.to_path_buf(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_MANIFEST: &str = r#"{
  "name": "storefront",
  "version": "1.0.0",
  "jspm": {
    "dependencies": {
      "lodash": "npm:lodash@^4.17.4",
      "react": "npm:react@^15.4.2",
      "css": "github:systemjs/plugin-css@^0.1.20"
    },
    "devDependencies": {
      "babel": "npm:babel-core@^5.8.24"
    }
  }
}"#;

    #[test]
    fn parse_valid_manifest() {
        let manifest = PackageManifest::from_str(VALID_MANIFEST).expect("Should parse manifest");

        assert_eq!(manifest.name.as_deref(), Some("storefront"));
        let deps = manifest
            .jspm_dependencies(Path::new("package.json"))
            .unwrap();
        assert_eq!(deps, ["lodash", "react", "css"]);
    }

    #[test]
    fn missing_jspm_section_is_an_error() {
        let manifest = PackageManifest::from_str(r#"{"name": "plain"}"#).unwrap();
        let result = manifest.jspm_dependencies(Path::new("package.json"));
        assert!(matches!(result, Err(ManifestError::MissingDependencies { .. })));
    }

    #[test]
    fn parse_invalid_json() {
        let result = PackageManifest::from_str("{ \"jspm\": ");
        assert!(matches!(result, Err(ManifestError::Json { .. })));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let result = PackageManifest::from_file(Path::new("/nonexistent/package.json")).await;
        assert!(matches!(result, Err(ManifestError::Io { .. })));
    }
}
