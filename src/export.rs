//! Encoding a painted surface to PNG or JPEG at a target size.
//!
//! Export only resamples the existing frame; layers are never re-rendered at the target size.

use std::io::Cursor;

use anyhow::Context;

use crate::{
    foundation::{
        core::Surface,
        error::{CardError, CardResult},
        math::unpremultiply_rgba8_in_place,
    },
    model::{
        canvas::ExportFormat,
        layer::Layer,
        state::EditorState,
    },
    render::raster::{flatten_onto_in_place, resize_rgba8_premul},
};

const DEFAULT_JPEG_QUALITY: f64 = 0.9;
const FALLBACK_FILE_STEM: &str = "og-image";
const MAX_SLUG_CHARS: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ExportEncoding {
    /// `transparent: false` flattens onto white.
    Png { transparent: bool },
    /// `quality` in `0..=1`; always flattened onto white.
    Jpeg { quality: f64 },
}

impl ExportEncoding {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png { .. } => ExportFormat::Png.extension(),
            Self::Jpeg { .. } => ExportFormat::Jpeg.extension(),
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png { .. } => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }
}

/// Target sizes offered for one-click export. Each carries the file stem used when the document
/// has no usable text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExportPreset {
    /// The canvas size.
    #[default]
    Canvas,
    /// 1200x600 (2:1).
    Twitter,
    /// 1200x628 (1.91:1).
    Facebook,
}

impl ExportPreset {
    pub fn size(self, state: &EditorState) -> (u32, u32) {
        match self {
            Self::Canvas => (state.canvas.canvas_width, state.canvas.canvas_height),
            Self::Twitter => (1200, 600),
            Self::Facebook => (1200, 628),
        }
    }

    pub fn base_name(self) -> &'static str {
        match self {
            Self::Canvas => FALLBACK_FILE_STEM,
            Self::Twitter => "twitter-share",
            Self::Facebook => "facebook-share",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportOptions {
    pub width: u32,
    pub height: u32,
    pub format: ExportEncoding,
    pub preset: ExportPreset,
}

impl ExportOptions {
    /// Canvas size and the export preferences stored in `state`.
    pub fn from_state(state: &EditorState) -> Self {
        Self::for_preset(state, ExportPreset::Canvas)
    }

    /// The preset's size with the export preferences stored in `state`.
    pub fn for_preset(state: &EditorState, preset: ExportPreset) -> Self {
        let format = match state.export.export_format {
            ExportFormat::Png => ExportEncoding::Png {
                transparent: state.export.include_transparency,
            },
            ExportFormat::Jpeg => ExportEncoding::Jpeg {
                quality: state.export.jpeg_quality,
            },
        };
        let (width, height) = preset.size(state);
        Self {
            width,
            height,
            format,
            preset,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Encoded image bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

fn jpeg_quality_percent(quality: f64) -> u8 {
    let q = if quality.is_finite() && quality > 0.0 && quality <= 1.0 {
        quality
    } else {
        DEFAULT_JPEG_QUALITY
    };
    (q * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Scale `surface` to the requested size and encode it.
pub fn export_surface(surface: &Surface, opts: &ExportOptions) -> CardResult<ExportedImage> {
    if opts.width == 0 || opts.height == 0 {
        return Err(CardError::validation(format!(
            "export size must be non-empty, got {}x{}",
            opts.width, opts.height
        )));
    }
    let mut rgba = resize_rgba8_premul(
        &surface.data,
        surface.width,
        surface.height,
        opts.width,
        opts.height,
    )?;

    let flatten = match opts.format {
        ExportEncoding::Png { transparent } => !transparent,
        ExportEncoding::Jpeg { .. } => true,
    };
    if flatten {
        flatten_onto_in_place(&mut rgba, [255, 255, 255]);
    } else {
        unpremultiply_rgba8_in_place(&mut rgba);
    }

    let img = image::RgbaImage::from_raw(opts.width, opts.height, rgba)
        .ok_or_else(|| CardError::validation("export buffer size mismatch"))?;
    let mut bytes = Vec::new();
    match opts.format {
        ExportEncoding::Png { .. } => {
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
                .context("encode png")?;
        }
        ExportEncoding::Jpeg { quality } => {
            let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut bytes,
                jpeg_quality_percent(quality),
            );
            encoder.encode_image(&rgb).context("encode jpeg")?;
        }
    }
    tracing::debug!(
        width = opts.width,
        height = opts.height,
        mime = opts.format.mime(),
        bytes = bytes.len(),
        "exported image"
    );
    Ok(ExportedImage {
        bytes,
        mime: opts.format.mime(),
        width: opts.width,
        height: opts.height,
    })
}

/// Lowercase, whitespace runs to `-`, drop everything but ASCII word characters and `-`,
/// collapse and trim dashes, cap at 50 characters.
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut dashed = String::with_capacity(lower.len());
    let mut in_space = false;
    for ch in lower.trim().chars() {
        if ch.is_whitespace() {
            if !in_space {
                dashed.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            dashed.push(ch);
        }
    }

    let mut collapsed = String::with_capacity(dashed.len());
    for ch in dashed.chars() {
        if ch == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(ch);
    }
    collapsed
        .trim_matches('-')
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect()
}

/// `{slug}_{w}x{h}.{ext}` for the file `opts` would produce.
///
/// The slug comes from the first visible text layer, else the preset's base name.
pub fn export_file_name(state: &EditorState, opts: &ExportOptions) -> String {
    let base = opts.preset.base_name();
    let content = state.layers.iter().find_map(|l| match l {
        Layer::Text(t) if t.base.is_visible => Some(t.content.as_str()),
        _ => None,
    });
    let slug = slugify(content.unwrap_or(base));
    let stem = if slug.is_empty() { base } else { slug.as_str() };
    format!(
        "{stem}_{}x{}.{}",
        opts.width,
        opts.height,
        opts.format.extension()
    )
}

#[cfg(test)]
#[path = "../tests/unit/export/export.rs"]
mod tests;
