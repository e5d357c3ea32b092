//! Process launching shared by the registry (help text) and the dispatcher.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Why a bounded run produced no output.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("process timed out after {0:?}")]
    TimedOut(Duration),
}

/// Builds commands for targets in one directory.
#[derive(Debug, Clone)]
pub struct Launcher {
    interpreter: Option<String>,
    working_dir: PathBuf,
}

impl Launcher {
    /// An empty interpreter executes targets directly.
    pub fn new(interpreter: &str, working_dir: impl Into<PathBuf>) -> Self {
        let interpreter = interpreter.trim();
        Self {
            interpreter: (!interpreter.is_empty()).then(|| interpreter.to_string()),
            working_dir: working_dir.into(),
        }
    }

    /// Program and leading arguments for a target, for logging.
    pub fn describe(&self, target: &Path, args: &[String]) -> String {
        let mut parts = Vec::with_capacity(args.len() + 2);
        if let Some(interpreter) = &self.interpreter {
            parts.push(interpreter.clone());
        }
        parts.push(target.display().to_string());
        parts.extend(args.iter().cloned());
        parts.join(" ")
    }

    /// Arguments go through the argument vector; no shell is involved.
    pub fn command(&self, target: &Path, args: &[String]) -> Command {
        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(target);
                cmd
            }
            None => Command::new(target),
        };
        cmd.args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run to completion or until `limit` elapses.
    ///
    /// On timeout the wait future is dropped, which kills the child through
    /// `kill_on_drop`.
    pub async fn run_bounded(
        &self,
        target: &Path,
        args: &[String],
        limit: Duration,
    ) -> Result<Output, RunError> {
        let child = self.command(target, args).spawn().map_err(RunError::Spawn)?;

        match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(result) => result.map_err(RunError::Wait),
            Err(_elapsed) => Err(RunError::TimedOut(limit)),
        }
    }
}

/// Exit code, or -1 when the process was terminated by a signal.
pub fn exit_code(output: &Output) -> i32 {
    output.status.code().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_with_interpreter() {
        let launcher = Launcher::new("python3", "/srv");
        assert_eq!(
            launcher.describe(Path::new("/srv/a.py"), &["--x=1".to_string()]),
            "python3 /srv/a.py --x=1"
        );
    }

    #[test]
    fn test_describe_direct() {
        let launcher = Launcher::new("  ", "/srv");
        assert_eq!(launcher.describe(Path::new("/srv/a.sh"), &[]), "/srv/a.sh");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_bounded_times_out() {
        let launcher = Launcher::new("sh", std::env::temp_dir());
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow.sh");
        std::fs::write(&script, "sleep 30\n").unwrap();

        let start = std::time::Instant::now();
        let err = launcher
            .run_bounded(&script, &[], Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::TimedOut(_)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_run_bounded_spawn_failure() {
        let launcher = Launcher::new("", std::env::temp_dir());
        let err = launcher
            .run_bounded(Path::new("/definitely/missing/binary"), &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Spawn(_)));
    }
}
