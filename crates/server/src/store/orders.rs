//! Filesystem-backed order store.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use fluffy_bites_core::Order;

/// Errors from the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid order id: {0}")]
    InvalidId(String),
}

/// Keyed store of completed orders, one JSON file per order.
///
/// Writes go through a temp file in the same directory followed by a rename,
/// so a file is only ever observed whole. Concurrent or redelivered writes
/// for the same session id serialize at the rename - last write wins, which
/// is safe because the payload for a given session id is deterministic.
#[derive(Debug, Clone)]
pub struct OrderStore {
    dir: PathBuf,
}

impl OrderStore {
    /// Open (and create if needed) the order directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory the store writes into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist an order under its session id, overwriting any previous
    /// version of the same order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the id is unusable as a file name or the
    /// write fails.
    pub fn save(&self, order: &Order) -> Result<(), StoreError> {
        let path = self.path_for(&order.id)?;
        let json = serde_json::to_vec_pretty(order)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        Ok(())
    }

    /// Load one order by session id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on an invalid id, a missing file, or an
    /// undecodable document.
    pub fn load(&self, id: &str) -> Result<Order, StoreError> {
        let path = self.path_for(id)?;
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Whether an order exists for this session id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.path_for(id).map(|p| p.exists()).unwrap_or(false)
    }

    /// Load every stored order, newest first by persistence timestamp.
    ///
    /// Undecodable files are skipped with a warning rather than failing the
    /// whole listing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be read.
    pub fn list(&self) -> Result<Vec<Order>, StoreError> {
        let mut orders = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match std::fs::read(&path).map_err(StoreError::from).and_then(|b| {
                serde_json::from_slice::<Order>(&b).map_err(StoreError::from)
            }) {
                Ok(order) => orders.push(order),
                Err(error) => {
                    tracing::warn!(?path, %error, "skipping undecodable order file");
                }
            }
        }

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Map a session id to its file path, rejecting ids that would escape
    /// the order directory.
    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        if id.is_empty()
            || !id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}
