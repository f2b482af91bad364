//! Image references as they appear in documents, and resolving them to encoded bytes.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use base64::Engine as _;

use crate::{
    assets::blob::BlobStore,
    foundation::error::{CardError, CardResult},
};

pub const STORED_PREFIX: &str = "stored:";
/// Older documents reference stored blobs with this prefix.
pub const LEGACY_STORED_PREFIX: &str = "indexeddb:";

/// Parsed form of a layer `src` or `bgImage` string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageRef {
    /// Blob store id.
    Stored(String),
    /// Inline `data:` URL payload.
    DataUrl { mime: String, bytes: Vec<u8> },
    /// Normalized path relative to the resolver's asset root.
    Path(String),
    /// `http(s)://` and other URLs. Recognized but never fetched.
    Remote(String),
}

/// Build the document reference for a stored blob id.
pub fn stored_reference(id: &str) -> String {
    format!("{STORED_PREFIX}{id}")
}

impl ImageRef {
    pub fn parse(s: &str) -> CardResult<Self> {
        let s = s.trim();
        if let Some(id) = s
            .strip_prefix(STORED_PREFIX)
            .or_else(|| s.strip_prefix(LEGACY_STORED_PREFIX))
        {
            if id.is_empty() {
                return Err(CardError::validation("stored image reference has no id"));
            }
            return Ok(Self::Stored(id.to_owned()));
        }
        if let Some(rest) = s.strip_prefix("data:") {
            return parse_data_url(rest);
        }
        if s.contains("://") || s.starts_with("blob:") {
            return Ok(Self::Remote(s.to_owned()));
        }
        Ok(Self::Path(normalize_rel_path(s)?))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Stored(_) => "stored",
            Self::DataUrl { .. } => "data-url",
            Self::Path(_) => "path",
            Self::Remote(_) => "remote",
        }
    }
}

fn parse_data_url(rest: &str) -> CardResult<ImageRef> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| CardError::validation("data URL has no payload"))?;
    let mut parts = meta.split(';');
    let mime = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let is_base64 = parts.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| CardError::decode(format!("invalid base64 in data URL: {e}")))?
    } else {
        percent_decode(payload)
    };
    Ok(ImageRef::DataUrl {
        mime: if mime.is_empty() {
            "text/plain".to_owned()
        } else {
            mime
        },
        bytes,
    })
}

fn percent_decode(s: &str) -> Vec<u8> {
    fn hex(b: u8) -> Option<u8> {
        (b as char).to_digit(16).map(|d| d as u8)
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2]))
        {
            out.push((hi << 4) | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

/// Normalize and validate asset-root-relative paths.
///
/// Uses `/` separators, drops `.` segments, rejects absolute paths and `..`.
pub(crate) fn normalize_rel_path(source: &str) -> CardResult<String> {
    let s = source.replace('\\', "/");
    if s.is_empty() {
        return Err(CardError::validation("image path must be non-empty"));
    }
    if s.starts_with('/') || s.as_bytes().get(1) == Some(&b':') {
        return Err(CardError::validation("image paths must be relative"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(CardError::validation("image paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(CardError::validation("image path must contain a file name"));
    }
    Ok(out.join("/"))
}

/// Turns [`ImageRef`]s into encoded image bytes.
#[derive(Clone, Default)]
pub struct ImageResolver {
    assets_root: Option<PathBuf>,
    blobs: Option<Arc<dyn BlobStore>>,
}

impl std::fmt::Debug for ImageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResolver")
            .field("assets_root", &self.assets_root)
            .field("blobs", &self.blobs.is_some())
            .finish()
    }
}

impl ImageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assets_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets_root = Some(root.into());
        self
    }

    pub fn with_blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(store);
        self
    }

    pub fn assets_root(&self) -> Option<&Path> {
        self.assets_root.as_deref()
    }

    pub fn fetch(&self, image: &ImageRef) -> CardResult<Vec<u8>> {
        match image {
            ImageRef::Stored(id) => {
                let store = self
                    .blobs
                    .as_ref()
                    .ok_or_else(|| CardError::storage("no blob store configured"))?;
                if !store.is_supported() {
                    return Err(CardError::storage("blob store unsupported"));
                }
                store
                    .get(id)?
                    .map(|r| r.bytes)
                    .ok_or_else(|| CardError::storage(format!("no stored image '{id}'")))
            }
            ImageRef::DataUrl { bytes, .. } => Ok(bytes.clone()),
            ImageRef::Path(rel) => {
                let root = self
                    .assets_root
                    .as_ref()
                    .ok_or_else(|| CardError::storage("no asset root configured"))?;
                let path = root.join(rel);
                Ok(std::fs::read(&path)
                    .with_context(|| format!("read image '{}'", path.display()))?)
            }
            ImageRef::Remote(url) => Err(CardError::storage(format!(
                "remote image '{url}' cannot be fetched"
            ))),
        }
    }

    /// Parse and fetch a raw reference string.
    pub fn fetch_str(&self, reference: &str) -> CardResult<Vec<u8>> {
        self.fetch(&ImageRef::parse(reference)?)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
