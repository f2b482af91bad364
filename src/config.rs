//! Editor defaults with environment overrides.

use std::path::PathBuf;

use crate::{
    assets::cache::DEFAULT_MAX_DECODE_ATTEMPTS,
    interact::controller::{DEFAULT_GRID_DENSITY, SnapMode},
    render::compositor::CompositorOpts,
};

pub const ENV_GRID_DENSITY: &str = "CARDSMITH_GRID_DENSITY";
pub const ENV_MAX_DECODE_ATTEMPTS: &str = "CARDSMITH_MAX_DECODE_ATTEMPTS";
pub const ENV_ASSETS_ROOT: &str = "CARDSMITH_ASSETS_ROOT";

#[derive(Clone, Debug, PartialEq)]
pub struct EditorConfig {
    /// Snap grid cells per canvas edge.
    pub grid_density: u32,
    pub snap: SnapMode,
    pub max_decode_attempts: u32,
    /// Gaussian sigma per pixel of shadow blur radius.
    pub shadow_sigma_scale: f64,
    /// Root for relative image paths.
    pub assets_root: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_density: DEFAULT_GRID_DENSITY,
            snap: SnapMode::None,
            max_decode_attempts: DEFAULT_MAX_DECODE_ATTEMPTS,
            shadow_sigma_scale: CompositorOpts::default().shadow_sigma_scale,
            assets_root: None,
        }
    }
}

fn positive_u32(name: &str, raw: Option<String>) -> Option<u32> {
    let raw = raw?;
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!(var = name, value = %raw, "ignoring invalid value");
            None
        }
    }
}

impl EditorConfig {
    /// Defaults overridden by `CARDSMITH_*` variables. Invalid values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`EditorConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(n) = positive_u32(ENV_GRID_DENSITY, lookup(ENV_GRID_DENSITY)) {
            cfg.grid_density = n;
        }
        if let Some(n) = positive_u32(ENV_MAX_DECODE_ATTEMPTS, lookup(ENV_MAX_DECODE_ATTEMPTS)) {
            cfg.max_decode_attempts = n;
        }
        if let Some(root) = lookup(ENV_ASSETS_ROOT).filter(|s| !s.trim().is_empty()) {
            cfg.assets_root = Some(PathBuf::from(root));
        }
        cfg
    }

    pub fn with_grid_density(mut self, density: u32) -> Self {
        self.grid_density = density.max(1);
        self
    }

    pub fn with_snap(mut self, snap: SnapMode) -> Self {
        self.snap = snap;
        self
    }

    pub fn with_max_decode_attempts(mut self, attempts: u32) -> Self {
        self.max_decode_attempts = attempts.max(1);
        self
    }

    pub fn with_shadow_sigma_scale(mut self, scale: f64) -> Self {
        if scale.is_finite() && scale >= 0.0 {
            self.shadow_sigma_scale = scale;
        }
        self
    }

    pub fn with_assets_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets_root = Some(root.into());
        self
    }

    pub fn compositor_opts(&self) -> CompositorOpts {
        CompositorOpts {
            shadow_sigma_scale: self.shadow_sigma_scale,
            ..CompositorOpts::default()
        }
    }

    pub fn controller(&self) -> crate::interact::controller::InteractionController {
        crate::interact::controller::InteractionController::new(self.snap, self.grid_density)
    }

    pub fn image_cache(&self) -> crate::assets::cache::ImageCache {
        crate::assets::cache::ImageCache::new(self.max_decode_attempts)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
