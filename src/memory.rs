//! Long-term memory - a single free-text document per workspace
//!
//! Read at context-build time, overwritten wholesale by the
//! `update_memory` tool. Last write wins.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::core::{CortexError, Result};

/// Read/write access to the memory blob
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Current content, empty if nothing was written yet
    async fn read(&self) -> Result<String>;

    /// Replace the content
    async fn write(&self, content: &str) -> Result<()>;
}

/// Memory stored as a markdown file inside the workspace
#[derive(Debug, Clone)]
pub struct FileMemoryStore {
    path: PathBuf,
}

impl FileMemoryStore {
    /// Store at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<workspace>/.cortex/MEMORY.md`
    pub fn for_workspace(workspace: &Path) -> Self {
        Self::new(workspace.join(".cortex").join("MEMORY.md"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MemoryStore for FileMemoryStore {
    async fn read(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(CortexError::memory(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Readers never observe a half-written file
        let tmp = self.path.with_extension("md.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            CortexError::memory(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!(path = %self.path.display(), bytes = content.len(), "memory updated");
        Ok(())
    }
}

/// Process-local memory, for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct InMemoryStore {
    content: RwLock<String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: RwLock::new(content.into()),
        }
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn read(&self) -> Result<String> {
        Ok(self.content.read().await.clone())
    }

    async fn write(&self, content: &str) -> Result<()> {
        *self.content.write().await = content.to_string();
        Ok(())
    }
}
