//! Named document snapshots kept in one JSON file, with the brand kit saved beside them.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    foundation::error::{CardError, CardResult},
    model::state::{BrandKit, EditorState},
    store::reconcile::reconcile,
};

/// One saved template. `state` is kept untyped so older files still load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub name: String,
    pub state: Value,
}

const BRAND_KIT_FILE: &str = "brand-kit.json";

/// File-backed template list, stored as `[{ "name": .., "state": .. }]` in save order.
///
/// The brand kit lives in `brand-kit.json` in the same directory.
#[derive(Clone, Debug)]
pub struct TemplateStore {
    path: PathBuf,
}

impl TemplateStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records. A missing or corrupt file is an empty list.
    pub fn records(&self) -> CardResult<Vec<TemplateRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read templates '{}'", self.path.display()))?;
        match serde_json::from_str(&text) {
            Ok(records) => Ok(records),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "corrupt template file, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn write(&self, records: &[TemplateRecord]) -> CardResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create template dir '{}'", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("write templates '{}'", self.path.display()))?;
        Ok(())
    }

    /// Save `state` under `name`, replacing any template of the same name. The replacement
    /// moves to the end of the list.
    pub fn save(&self, name: &str, state: &EditorState) -> CardResult<()> {
        if name.trim().is_empty() {
            return Err(CardError::validation("template name must not be empty"));
        }
        let mut records = self.records()?;
        records.retain(|r| r.name != name);
        records.push(TemplateRecord {
            name: name.to_owned(),
            state: serde_json::to_value(state)?,
        });
        self.write(&records)
    }

    /// Load and reconcile a template.
    pub fn load(&self, name: &str) -> CardResult<Option<EditorState>> {
        Ok(self
            .records()?
            .into_iter()
            .find(|r| r.name == name)
            .map(|r| reconcile(r.state)))
    }

    pub fn list(&self) -> CardResult<Vec<String>> {
        Ok(self.records()?.into_iter().map(|r| r.name).collect())
    }

    pub fn brand_kit_path(&self) -> PathBuf {
        match self.path.parent() {
            Some(dir) => dir.join(BRAND_KIT_FILE),
            None => PathBuf::from(BRAND_KIT_FILE),
        }
    }

    /// The saved brand kit. A missing or corrupt file gives the default kit.
    pub fn load_brand_kit(&self) -> CardResult<BrandKit> {
        let path = self.brand_kit_path();
        if !path.exists() {
            return Ok(BrandKit::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("read brand kit '{}'", path.display()))?;
        match serde_json::from_str(&text) {
            Ok(kit) => Ok(kit),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "corrupt brand kit, using defaults");
                Ok(BrandKit::default())
            }
        }
    }

    pub fn save_brand_kit(&self, kit: &BrandKit) -> CardResult<()> {
        let path = self.brand_kit_path();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create template dir '{}'", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(kit)?;
        std::fs::write(&path, text)
            .with_context(|| format!("write brand kit '{}'", path.display()))?;
        Ok(())
    }

    pub fn delete(&self, name: &str) -> CardResult<bool> {
        let mut records = self.records()?;
        let before = records.len();
        records.retain(|r| r.name != name);
        if records.len() == before {
            return Ok(false);
        }
        self.write(&records)?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/persist/template.rs"]
mod tests;
