//! Decoded images keyed by their document reference.
//!
//! Resolution is an explicit step: [`ImageCache::sync`] tracks what the document references and
//! [`ImageCache::resolve_pending`] decodes what is missing. Renderers only ever read.

use std::{
    collections::{HashMap, hash_map::Entry as Slot},
    sync::Arc,
};

use rayon::prelude::*;

use crate::{
    assets::{
        decode::{DecodedImage, decode_image},
        source::ImageResolver,
    },
    foundation::error::CardResult,
    layout::metrics::ImageDimensions,
    model::state::EditorState,
};

pub const DEFAULT_MAX_DECODE_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug, PartialEq)]
pub enum ImageStatus {
    /// Not referenced, never seen.
    Absent,
    /// Referenced and waiting for [`ImageCache::resolve_pending`].
    Pending,
    Ready(Arc<DecodedImage>),
    /// Fetch or decode failed `attempts` times.
    Failed { attempts: u32 },
}

#[derive(Clone, Debug)]
enum Entry {
    Pending { attempts: u32 },
    Ready(Arc<DecodedImage>),
    Failed { attempts: u32, error: String },
}

/// What [`ImageCache::sync`] changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: usize,
    pub evicted: usize,
    pub retried: usize,
}

impl SyncReport {
    pub fn has_pending_work(&self) -> bool {
        self.added > 0 || self.retried > 0
    }
}

#[derive(Clone, Debug)]
pub struct ImageCache {
    entries: HashMap<String, Entry>,
    max_attempts: u32,
    decodes: u64,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DECODE_ATTEMPTS)
    }
}

impl ImageCache {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            entries: HashMap::new(),
            max_attempts: max_attempts.max(1),
            decodes: 0,
        }
    }

    /// Align the cache with the images `state` references.
    ///
    /// Unreferenced entries are evicted, new references become pending, and failed entries
    /// with attempts left are queued for another try.
    pub fn sync(&mut self, state: &EditorState) -> SyncReport {
        let wanted = state.referenced_images();
        let mut report = SyncReport::default();

        self.entries.retain(|key, _| {
            let keep = wanted.contains(key);
            if !keep {
                tracing::debug!(%key, "evicting unreferenced image");
                report.evicted += 1;
            }
            keep
        });

        let max_attempts = self.max_attempts;
        for key in wanted {
            match self.entries.entry(key) {
                Slot::Vacant(slot) => {
                    slot.insert(Entry::Pending { attempts: 0 });
                    report.added += 1;
                }
                Slot::Occupied(mut slot) => {
                    if let Entry::Failed { attempts, .. } = slot.get()
                        && *attempts < max_attempts
                    {
                        let attempts = *attempts;
                        slot.insert(Entry::Pending { attempts });
                        report.retried += 1;
                    }
                }
            }
        }
        report
    }

    /// Fetch and decode every pending image in parallel. Returns how many became ready.
    #[tracing::instrument(skip_all, fields(pending = tracing::field::Empty))]
    pub fn resolve_pending(&mut self, resolver: &ImageResolver) -> usize {
        let pending: Vec<(String, u32)> = self
            .entries
            .iter()
            .filter_map(|(k, e)| match e {
                Entry::Pending { attempts } => Some((k.clone(), *attempts)),
                _ => None,
            })
            .collect();
        tracing::Span::current().record("pending", pending.len());
        if pending.is_empty() {
            return 0;
        }

        let results: Vec<(String, u32, CardResult<DecodedImage>)> = pending
            .into_par_iter()
            .map(|(key, attempts)| {
                let decoded = resolver.fetch_str(&key).and_then(|b| decode_image(&b));
                (key, attempts, decoded)
            })
            .collect();

        let mut ready = 0;
        for (key, attempts, result) in results {
            self.decodes += 1;
            let entry = match result {
                Ok(img) => {
                    ready += 1;
                    Entry::Ready(Arc::new(img))
                }
                Err(err) => {
                    tracing::warn!(%key, error = %err, "image failed to load");
                    Entry::Failed {
                        attempts: attempts + 1,
                        error: err.to_string(),
                    }
                }
            };
            self.entries.insert(key, entry);
        }
        ready
    }

    /// Register an already decoded image as ready.
    pub fn insert_decoded(&mut self, key: impl Into<String>, image: DecodedImage) {
        self.entries
            .insert(key.into(), Entry::Ready(Arc::new(image)));
    }

    pub fn status(&self, key: &str) -> ImageStatus {
        match self.entries.get(key) {
            None => ImageStatus::Absent,
            Some(Entry::Pending { .. }) => ImageStatus::Pending,
            Some(Entry::Ready(img)) => ImageStatus::Ready(Arc::clone(img)),
            Some(Entry::Failed { attempts, .. }) => ImageStatus::Failed {
                attempts: *attempts,
            },
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<DecodedImage>> {
        match self.entries.get(key) {
            Some(Entry::Ready(img)) => Some(Arc::clone(img)),
            _ => None,
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(Entry::Pending { .. }))
    }

    pub fn has_pending(&self) -> bool {
        self.entries
            .values()
            .any(|e| matches!(e, Entry::Pending { .. }))
    }

    /// Last failure message for `key`.
    pub fn error(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(Entry::Failed { error, .. }) => Some(error),
            _ => None,
        }
    }

    /// Keys of ready images, sorted.
    pub fn ready_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, e)| matches!(e, Entry::Ready(_)))
            .map(|(k, _)| k.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Number of fetch+decode attempts performed so far.
    pub fn decode_count(&self) -> u64 {
        self.decodes
    }
}

impl ImageDimensions for ImageCache {
    fn dimensions(&self, key: &str) -> Option<(u32, u32)> {
        self.get(key).map(|img| (img.width, img.height))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
