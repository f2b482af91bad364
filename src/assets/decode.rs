use std::sync::Arc;

use anyhow::Context;

use crate::foundation::{
    error::{CardError, CardResult},
    math::premultiply_rgba8_in_place,
};

/// Decoded raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl DecodedImage {
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height.max(1))
    }
}

/// Largest raster edge produced from an SVG's intrinsic size.
const MAX_SVG_DIM: u32 = 8192;

/// Heuristic sniff: XML prolog or an `<svg` root after leading whitespace/BOM.
pub fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let t = text.trim_start_matches('\u{feff}').trim_start();
    t.starts_with("<svg") || (t.starts_with("<?xml") && text.contains("<svg"))
}

/// Decode PNG/JPEG/GIF/WebP/... or SVG bytes.
pub fn decode_image(bytes: &[u8]) -> CardResult<DecodedImage> {
    if bytes.is_empty() {
        return Err(CardError::decode("image data is empty"));
    }
    if looks_like_svg(bytes) {
        return decode_svg(bytes);
    }
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(CardError::decode("image has zero size"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(DecodedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Rasterize an SVG at its intrinsic size, clamped to [`MAX_SVG_DIM`].
pub fn decode_svg(bytes: &[u8]) -> CardResult<DecodedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;

    let size = tree.size();
    let (w, h) = (size.width(), size.height());
    if !w.is_finite() || !h.is_finite() || w <= 0.0 || h <= 0.0 {
        return Err(CardError::decode("svg has invalid width/height"));
    }
    let scale = (MAX_SVG_DIM as f32 / w.max(h)).min(1.0);
    let width = ((w * scale).ceil() as u32).max(1);
    let height = ((h * scale).ceil() as u32).max(1);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CardError::decode("failed to allocate svg pixmap"))?;
    let xform = resvg::tiny_skia::Transform::from_scale(width as f32 / w, height as f32 / h);
    resvg::render(&tree, xform, &mut pixmap.as_mut());

    Ok(DecodedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixmap.data().to_vec()),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
