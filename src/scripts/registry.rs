//! Discovery of executable targets and their help text.

use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use futures_util::future::join_all;

use crate::config::ScriptsConfig;
use crate::scripts::launcher::Launcher;
use crate::scripts::sanitize::validate_name;
use crate::scripts::{ScriptError, ScriptTarget};

/// Enumerates and describes targets in a single directory.
#[derive(Debug, Clone)]
pub struct ScriptRegistry {
    directory: PathBuf,
    extension: Option<String>,
    help_flag: String,
    help_timeout: Duration,
    launcher: Launcher,
}

impl ScriptRegistry {
    pub fn new(config: &ScriptsConfig) -> Self {
        // Targets run with the directory as their working dir, so paths
        // handed to the launcher must not be relative.
        let directory = std::path::absolute(&config.directory)
            .unwrap_or_else(|_| PathBuf::from(&config.directory));
        let extension = config.extension.trim().trim_start_matches('.');
        Self {
            launcher: Launcher::new(&config.interpreter, directory.clone()),
            directory,
            extension: (!extension.is_empty()).then(|| extension.to_string()),
            help_flag: config.help_flag.clone(),
            help_timeout: Duration::from_secs(config.help_timeout_secs),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    /// Validate `name` and resolve it to an existing file.
    ///
    /// The name check happens before the filesystem is touched.
    pub async fn resolve(&self, name: &str) -> Result<(PathBuf, std::fs::Metadata), ScriptError> {
        validate_name(name)?;

        let path = self.directory.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok((path, meta)),
            Ok(_) | Err(_) => {
                tracing::error!(path = %path.display(), "Script not found");
                Err(ScriptError::NotFound(name.to_string()))
            }
        }
    }

    fn has_extension(&self, path: &Path) -> bool {
        match &self.extension {
            Some(ext) => path.extension().is_some_and(|e| e == ext.as_str()),
            None => true,
        }
    }

    /// Every file with the recognized extension, sorted by name, with help
    /// text where the target provides it.
    pub async fn list(&self) -> Result<Vec<ScriptTarget>, ScriptError> {
        let mut found = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !meta.is_file() || !self.has_extension(&path) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            found.push((name, path, meta));
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));

        let targets = join_all(
            found
                .into_iter()
                .map(|(name, path, meta)| self.describe_resolved(name, path, meta)),
        )
        .await;

        tracing::info!(count = targets.len(), "Listed scripts");
        Ok(targets)
    }

    /// Metadata and help text for one target.
    pub async fn describe(&self, name: &str) -> Result<ScriptTarget, ScriptError> {
        let (path, meta) = self.resolve(name).await?;
        Ok(self.describe_resolved(name.to_string(), path, meta).await)
    }

    async fn describe_resolved(
        &self,
        name: String,
        path: PathBuf,
        meta: std::fs::Metadata,
    ) -> ScriptTarget {
        let help_text = self.help_text(&path).await;
        ScriptTarget {
            name,
            path: path.display().to_string(),
            size: meta.len(),
            help_text,
            modified_time: modified_secs(&meta),
        }
    }

    /// Best effort: any failure is logged and yields `None`.
    pub async fn help_text(&self, path: &Path) -> Option<String> {
        let args = [self.help_flag.clone()];
        match self.launcher.run_bounded(path, &args, self.help_timeout).await {
            Ok(output) => {
                let text = String::from_utf8_lossy(&output.stdout).into_owned();
                (!text.is_empty()).then_some(text)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not get help text");
                None
            }
        }
    }
}

fn modified_secs(meta: &std::fs::Metadata) -> Option<f64> {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
}
