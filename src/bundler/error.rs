// Error types for the bundler

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for bundling operations
///
/// This is the primary error type returned by `Bundler` operations.
/// Individual error types are exposed through `From` conversions.
#[derive(Debug, Error)]
pub enum BundlerError {
    #[error("Engine failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Loader configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("I/O error on {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Entry point discovery failed: {0}")]
    Discovery(String),

    #[error("Invalid source map: {0}")]
    SourceMap(String),
}

impl BundlerError {
    /// Attach the offending path to an I/O failure
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by the trace/compile engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(
        "engine '{0}' not found. Install the SystemJS engine bridge or set `engine` \
         in bundler.toml."
    )]
    NotFound(String),

    #[error("Trace of '{expression}' failed: {message}")]
    Trace { expression: String, message: String },

    #[error("Compile failed: {0}")]
    Compile(String),

    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
}

/// Errors reading or writing the loader configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Unsupported value at offset {offset}: {message}")]
    Unsupported { offset: usize, message: String },

    #[error("TOML parsing error in {path}: {error}")]
    Toml { path: PathBuf, error: String },

    #[error("No System.config(...) call found")]
    MissingConfigCall,

    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}

/// Errors reading the project manifest (package.json)
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("I/O error reading {path}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("JSON parsing error in {path}: {error}")]
    Json { path: PathBuf, error: String },

    #[error("{path} has no jspm.dependencies section")]
    MissingDependencies { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            EngineError::Compile("unexpected token".to_string()).to_string(),
            "Compile failed: unexpected token"
        );

        assert_eq!(
            ConfigError::Unsupported {
                offset: 12,
                message: "expression is not a literal value".to_string()
            }
            .to_string(),
            "Unsupported value at offset 12: expression is not a literal value"
        );

        assert_eq!(
            BundlerError::SourceMap("expected value".to_string()).to_string(),
            "Invalid source map: expected value"
        );

        assert!(EngineError::NotFound("systemjs-engine".to_string())
            .to_string()
            .contains("bundler.toml"));

        assert_eq!(
            ManifestError::MissingDependencies {
                path: PathBuf::from("package.json")
            }
            .to_string(),
            "package.json has no jspm.dependencies section"
        );
    }

    #[test]
    fn from_conversions_work() {
        let engine_err: BundlerError = EngineError::Compile("x".to_string()).into();
        assert!(matches!(engine_err, BundlerError::Engine(_)));

        let config_err: BundlerError = ConfigError::MissingConfigCall.into();
        assert!(matches!(config_err, BundlerError::Config(_)));

        let manifest_err: BundlerError = ManifestError::MissingDependencies {
            path: PathBuf::from("package.json"),
        }
        .into();
        assert!(matches!(manifest_err, BundlerError::Manifest(_)));
    }

    #[test]
    fn write_error_names_path() {
        let err = BundlerError::write(
            "build/bundles/header.js",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "I/O error on build/bundles/header.js: denied"
        );
    }
}
