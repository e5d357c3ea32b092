//! Script execution with sanitized arguments under a timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use crate::observability::metrics;
use crate::scripts::launcher::{exit_code, RunError};
use crate::scripts::registry::ScriptRegistry;
use crate::scripts::sanitize::build_args;
use crate::scripts::target::preview;
use crate::scripts::{DispatchResult, ScriptError};

/// Launches registry targets and classifies their outcome.
#[derive(Debug, Clone)]
pub struct ProcessDispatcher {
    registry: Arc<ScriptRegistry>,
    timeout: Duration,
}

impl ProcessDispatcher {
    pub fn new(registry: Arc<ScriptRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run with the configured timeout.
    pub async fn run(
        &self,
        name: &str,
        parameters: Map<String, Value>,
    ) -> Result<DispatchResult, ScriptError> {
        self.run_with_timeout(name, parameters, self.timeout).await
    }

    /// Run `name` with `--key=value` arguments built from `parameters`.
    ///
    /// A non-zero exit is a successful dispatch with `success == false`.
    /// Only bad names, missing files, timeouts and launch errors fail.
    pub async fn run_with_timeout(
        &self,
        name: &str,
        parameters: Map<String, Value>,
        timeout: Duration,
    ) -> Result<DispatchResult, ScriptError> {
        let (path, _) = self.registry.resolve(name).await?;
        let args = build_args(&parameters)?;
        let launcher = self.registry.launcher();

        tracing::info!(command = %launcher.describe(&path, &args), "Executing script");

        let start = Instant::now();
        let output = match launcher.run_bounded(&path, &args, timeout).await {
            Ok(output) => output,
            Err(RunError::TimedOut(limit)) => {
                tracing::error!(script = %name, timeout_secs = limit.as_secs(), "Script execution timed out");
                metrics::record_dispatch("timeout", start.elapsed());
                return Err(ScriptError::Timeout(limit));
            }
            Err(RunError::Spawn(e)) | Err(RunError::Wait(e)) => {
                tracing::error!(script = %name, error = %e, "Error executing script");
                metrics::record_dispatch("launch_failure", start.elapsed());
                return Err(ScriptError::LaunchFailure(e));
            }
        };

        let return_code = exit_code(&output);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        tracing::info!(
            script = %name,
            return_code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Script execution completed"
        );
        if !stdout.is_empty() {
            tracing::info!(preview = %preview(&stdout), "Script output preview");
        }
        if !stderr.is_empty() {
            tracing::error!(stderr = %stderr, "Script errors");
        }

        let outcome = if return_code == 0 { "success" } else { "failure" };
        metrics::record_dispatch(outcome, start.elapsed());

        Ok(DispatchResult::new(
            name.to_string(),
            parameters,
            return_code,
            stdout,
            stderr,
        ))
    }
}
