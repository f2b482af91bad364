//! Keyed storage for uploaded image bytes, referenced from documents as `stored:<id>`.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Mutex, RwLock},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{CardError, CardResult};

/// One stored blob with its metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobRecord {
    pub id: String,
    pub bytes: Vec<u8>,
    /// Original file name.
    pub name: String,
    pub size: u64,
    pub timestamp_ms: u64,
}

/// Blob storage backend.
///
/// Implementations are shared across threads; every method takes `&self`.
pub trait BlobStore: Send + Sync {
    /// `false` for backends that cannot store anything in this environment.
    fn is_supported(&self) -> bool {
        true
    }

    /// Insert or replace the blob stored under `id`.
    fn put(&self, id: &str, bytes: Vec<u8>, name: &str) -> CardResult<()>;

    fn get(&self, id: &str) -> CardResult<Option<BlobRecord>>;

    /// Returns whether anything was removed.
    fn delete(&self, id: &str) -> CardResult<bool>;

    fn list(&self) -> CardResult<Vec<BlobRecord>>;

    fn clear(&self) -> CardResult<()>;
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn validate_id(id: &str) -> CardResult<()> {
    let ok = !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(CardError::validation(format!("invalid blob id '{id}'")))
    }
}

fn poisoned() -> CardError {
    CardError::storage("blob store lock poisoned")
}

/// Store for environments without blob storage. Every operation fails fast.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedBlobStore;

impl UnsupportedBlobStore {
    fn fail<T>(&self) -> CardResult<T> {
        tracing::warn!("blob store unsupported");
        Err(CardError::storage("blob store unsupported"))
    }
}

impl BlobStore for UnsupportedBlobStore {
    fn is_supported(&self) -> bool {
        false
    }

    fn put(&self, _id: &str, _bytes: Vec<u8>, _name: &str) -> CardResult<()> {
        self.fail()
    }

    fn get(&self, _id: &str) -> CardResult<Option<BlobRecord>> {
        self.fail()
    }

    fn delete(&self, _id: &str) -> CardResult<bool> {
        self.fail()
    }

    fn list(&self) -> CardResult<Vec<BlobRecord>> {
        self.fail()
    }

    fn clear(&self) -> CardResult<()> {
        self.fail()
    }
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, BlobRecord>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, id: &str, bytes: Vec<u8>, name: &str) -> CardResult<()> {
        validate_id(id)?;
        let record = BlobRecord {
            id: id.to_owned(),
            size: bytes.len() as u64,
            bytes,
            name: name.to_owned(),
            timestamp_ms: now_ms(),
        };
        self.blobs
            .write()
            .map_err(|_| poisoned())?
            .insert(id.to_owned(), record);
        Ok(())
    }

    fn get(&self, id: &str) -> CardResult<Option<BlobRecord>> {
        Ok(self.blobs.read().map_err(|_| poisoned())?.get(id).cloned())
    }

    fn delete(&self, id: &str) -> CardResult<bool> {
        Ok(self
            .blobs
            .write()
            .map_err(|_| poisoned())?
            .remove(id)
            .is_some())
    }

    fn list(&self) -> CardResult<Vec<BlobRecord>> {
        let mut out: Vec<BlobRecord> = self
            .blobs
            .read()
            .map_err(|_| poisoned())?
            .values()
            .cloned()
            .collect();
        out.sort_by(|a, b| a.timestamp_ms.cmp(&b.timestamp_ms).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    fn clear(&self) -> CardResult<()> {
        self.blobs.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobMeta {
    id: String,
    name: String,
    size: u64,
    timestamp_ms: u64,
}

/// One file per blob under `root`, plus an `index.json` with names and timestamps.
#[derive(Debug)]
pub struct DirBlobStore {
    root: PathBuf,
    index_lock: Mutex<()>,
}

const INDEX_FILE: &str = "index.json";

impl DirBlobStore {
    /// Open (creating if needed) a blob directory.
    pub fn open(root: impl Into<PathBuf>) -> CardResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create blob dir '{}'", root.display()))?;
        Ok(Self {
            root,
            index_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.bin"))
    }

    fn read_index(&self) -> CardResult<Vec<BlobMeta>> {
        let path = self.root.join(INDEX_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("read blob index '{}'", path.display()))?;
        match serde_json::from_str(&text) {
            Ok(index) => Ok(index),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "corrupt blob index, starting empty");
                Ok(Vec::new())
            }
        }
    }

    fn write_index(&self, index: &[BlobMeta]) -> CardResult<()> {
        let path = self.root.join(INDEX_FILE);
        let text = serde_json::to_string_pretty(index)?;
        std::fs::write(&path, text)
            .with_context(|| format!("write blob index '{}'", path.display()))?;
        Ok(())
    }

    fn load(&self, meta: BlobMeta) -> CardResult<Option<BlobRecord>> {
        let path = self.blob_path(&meta.id);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(BlobRecord {
                id: meta.id,
                bytes,
                name: meta.name,
                size: meta.size,
                timestamp_ms: meta.timestamp_ms,
            })),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(id = %meta.id, "indexed blob is missing on disk");
                Ok(None)
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("read blob '{}'", path.display()))
                .into()),
        }
    }
}

impl BlobStore for DirBlobStore {
    fn put(&self, id: &str, bytes: Vec<u8>, name: &str) -> CardResult<()> {
        validate_id(id)?;
        let _guard = self.index_lock.lock().map_err(|_| poisoned())?;
        let path = self.blob_path(id);
        std::fs::write(&path, &bytes)
            .with_context(|| format!("write blob '{}'", path.display()))?;
        let mut index = self.read_index()?;
        index.retain(|m| m.id != id);
        index.push(BlobMeta {
            id: id.to_owned(),
            name: name.to_owned(),
            size: bytes.len() as u64,
            timestamp_ms: now_ms(),
        });
        self.write_index(&index)
    }

    fn get(&self, id: &str) -> CardResult<Option<BlobRecord>> {
        validate_id(id)?;
        let _guard = self.index_lock.lock().map_err(|_| poisoned())?;
        match self.read_index()?.into_iter().find(|m| m.id == id) {
            Some(meta) => self.load(meta),
            None => Ok(None),
        }
    }

    fn delete(&self, id: &str) -> CardResult<bool> {
        validate_id(id)?;
        let _guard = self.index_lock.lock().map_err(|_| poisoned())?;
        let mut index = self.read_index()?;
        let before = index.len();
        index.retain(|m| m.id != id);
        let removed = index.len() != before;
        if removed {
            self.write_index(&index)?;
        }
        let path = self.blob_path(id);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("remove blob '{}'", path.display()))?;
        }
        Ok(removed)
    }

    fn list(&self) -> CardResult<Vec<BlobRecord>> {
        let _guard = self.index_lock.lock().map_err(|_| poisoned())?;
        let mut out = Vec::new();
        for meta in self.read_index()? {
            if let Some(record) = self.load(meta)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn clear(&self) -> CardResult<()> {
        let _guard = self.index_lock.lock().map_err(|_| poisoned())?;
        for meta in self.read_index()? {
            let path = self.blob_path(&meta.id);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("remove blob '{}'", path.display()))?;
            }
        }
        self.write_index(&[])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/blob.rs"]
mod tests;
