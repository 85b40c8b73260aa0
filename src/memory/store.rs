//! JSON persistence for the memory tree.
//!
//! The tree is written whole, as one pretty-printed [`NodeRecord`].
//! Saves go through a temp file and a rename, and the previous file is kept
//! as `.bak` so a torn or corrupt primary can still be recovered. A primary
//! that no longer parses is moved aside to `.corrupt` rather than rotated
//! over a good backup.

use super::node::MemoryNode;
use super::record::NodeRecord;
use crate::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// File-backed store for one memory tree
#[derive(Debug, Clone)]
pub struct MemoryStore {
    path: PathBuf,
}

impl MemoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    pub fn corrupt_path(&self) -> PathBuf {
        self.path.with_extension("json.corrupt")
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Write the whole tree rooted at `root`.
    pub async fn save(&self, root: &MemoryNode) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(&NodeRecord::from(root))?;

        if self.path.exists() {
            match read_record(&self.path).await {
                Ok(_) => {
                    fs::copy(&self.path, self.backup_path()).await?;
                }
                Err(e) => {
                    warn!(
                        "Existing {} is unreadable ({}), keeping it as {}",
                        self.path.display(),
                        e,
                        self.corrupt_path().display()
                    );
                    fs::rename(&self.path, self.corrupt_path()).await?;
                }
            }
        }

        let tmp = self.tmp_path();
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        fs::rename(&tmp, &self.path).await?;

        info!("Memory saved -> {}", self.path.display());
        Ok(())
    }

    /// Load the persisted tree, falling back to the backup when the primary
    /// cannot be parsed. Returns `None` when nothing has been saved yet.
    pub async fn load(&self) -> Result<Option<MemoryNode>> {
        if !self.path.exists() {
            debug!("No memory file at {}", self.path.display());
            return Ok(None);
        }

        match read_record(&self.path).await {
            Ok(record) => Ok(Some(MemoryNode::from(record))),
            Err(primary_err) => {
                let backup = self.backup_path();
                if !backup.exists() {
                    return Err(primary_err);
                }
                warn!(
                    "Failed to load {} ({}), trying backup",
                    self.path.display(),
                    primary_err
                );
                let record = read_record(&backup).await?;
                Ok(Some(MemoryNode::from(record)))
            }
        }
    }
}

async fn read_record(path: &Path) -> Result<NodeRecord> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}
