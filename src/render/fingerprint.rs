use xxhash_rust::xxh3::{Xxh3, xxh3_64_with_seed};

use crate::{
    foundation::{core::Surface, math::Fnv1a64},
    model::state::EditorState,
};

const XXH3_SEED: u64 = 0x8b5a_d4a0_c7d8_e9f1;

/// Identity of an emitted frame: the pixels, the state that produced them and the set of
/// images that were available. Any difference means observers must hear about it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameSignature {
    pub pixels: u64,
    pub state: u64,
    pub images: u64,
}

impl FrameSignature {
    pub fn compute(surface: &Surface, state: &EditorState, ready_images: &[&str]) -> Self {
        Self {
            pixels: fingerprint_pixels(surface),
            state: fingerprint_state(state),
            images: fingerprint_image_keys(ready_images),
        }
    }
}

pub fn fingerprint_pixels(surface: &Surface) -> u64 {
    let mut h = Xxh3::with_seed(XXH3_SEED);
    h.update(&surface.width.to_le_bytes());
    h.update(&surface.height.to_le_bytes());
    h.update(&surface.data);
    h.digest()
}

/// Hash of the serialized state. Field order is fixed by the type, so equal states hash equal.
pub fn fingerprint_state(state: &EditorState) -> u64 {
    match serde_json::to_vec(state) {
        Ok(bytes) => xxh3_64_with_seed(&bytes, XXH3_SEED),
        Err(err) => {
            tracing::warn!(error = %err, "state did not serialize for fingerprinting");
            0
        }
    }
}

/// Order-sensitive; callers pass sorted keys.
pub fn fingerprint_image_keys(keys: &[&str]) -> u64 {
    let mut h = Fnv1a64::new_default();
    h.write_u64(keys.len() as u64);
    for k in keys {
        h.write_str(k);
    }
    h.finish()
}

#[cfg(test)]
#[path = "../../tests/unit/render/fingerprint.rs"]
mod tests;
