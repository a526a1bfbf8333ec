// Engine bridge - drives an external SystemJS builder process over JSON

use super::ModuleEngine;
use crate::bundler::error::EngineError;
use crate::bundler::graph::{Bundle, CompileOptions, DependencyGraph};
use crate::bundler::loader::LoaderConfig;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use which::which;

/// Request written to the engine's stdin
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EngineRequest<'a> {
    config: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    expression: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<&'a DependencyGraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<CompileOptions>,
}

/// Engine backed by an external executable
///
/// The executable is invoked once per call as `<engine> trace` or
/// `<engine> bundle`. It reads one JSON request on stdin (the loader
/// configuration plus the trace expression or the tree to compile) and
/// answers with one JSON document on stdout: the traced tree, or
/// `{ "source", "sourceMap", "modules" }`. A non-zero exit is a failure and
/// its stderr becomes the error message.
pub struct CommandEngine {
    /// Path to the engine executable
    engine_path: PathBuf,

    /// Loader configuration prepared for the engine
    config: Value,
}

impl CommandEngine {
    /// Create an engine by looking `program` up on PATH
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` if the executable cannot be found.
    pub fn new(program: &str, config: &LoaderConfig) -> Result<Self, EngineError> {
        let engine_path = which(program).map_err(|_| EngineError::NotFound(program.to_string()))?;
        Ok(Self::with_engine_path(engine_path, config))
    }

    /// Create an engine with a specific executable path
    ///
    /// This is useful for testing or when the engine is not in PATH.
    pub fn with_engine_path(engine_path: PathBuf, config: &LoaderConfig) -> Self {
        Self {
            engine_path,
            config: Value::Object(config.entries().clone()),
        }
    }

    pub fn engine_path(&self) -> &Path {
        &self.engine_path
    }

    async fn run(&self, command: &str, request: &EngineRequest<'_>) -> Result<Vec<u8>, String> {
        let payload = serde_json::to_vec(request).map_err(|e| e.to_string())?;

        let mut cmd = Command::new(&self.engine_path);
        cmd.arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("Failed to execute {}: {}", self.engine_path.display(), e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| format!("Failed to send request: {}", e))?;
            // dropping stdin closes the pipe so the engine sees EOF
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| format!("Failed to wait for engine: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("engine exited with {}: {}", output.status, stderr.trim()));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl ModuleEngine for CommandEngine {
    async fn trace(&self, expression: &str) -> Result<DependencyGraph, EngineError> {
        let request = EngineRequest {
            config: &self.config,
            expression: Some(expression),
            tree: None,
            options: None,
        };

        let stdout = self
            .run("trace", &request)
            .await
            .map_err(|message| EngineError::Trace {
                expression: expression.to_string(),
                message,
            })?;

        let graph: DependencyGraph = serde_json::from_slice(&stdout)
            .map_err(|e| EngineError::InvalidResponse(format!("trace output: {}", e)))?;
        tracing::debug!(expression, modules = graph.len(), "Traced");
        Ok(graph)
    }

    async fn compile(
        &self,
        graph: &DependencyGraph,
        options: CompileOptions,
    ) -> Result<Bundle, EngineError> {
        let request = EngineRequest {
            config: &self.config,
            expression: None,
            tree: Some(graph),
            options: Some(options),
        };

        let stdout = self
            .run("bundle", &request)
            .await
            .map_err(EngineError::Compile)?;

        serde_json::from_slice(&stdout)
            .map_err(|e| EngineError::InvalidResponse(format!("bundle output: {}", e)))
    }
}
