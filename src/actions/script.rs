//! Replayable transcript of executed browser steps
//!
//! One JSON object per line: `{"task", "steps", "recorded_at"}`.

use super::BrowserStep;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

#[derive(Debug, Serialize)]
struct ScriptEntry<'a> {
    task: &'a str,
    steps: &'a [BrowserStep],
    recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ScriptRecorder {
    path: PathBuf,
}

impl ScriptRecorder {
    /// Create (or truncate) the script file
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tokio::fs::write(&path, b"").await?;
        info!(path = %path.display(), "Recording test script");
        Ok(Self { path })
    }

    pub async fn append(&self, task: &str, steps: &[BrowserStep]) -> Result<()> {
        let entry = ScriptEntry {
            task,
            steps,
            recorded_at: Utc::now(),
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
