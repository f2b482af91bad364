//! Layer geometry shared by painting and hit-testing.
//!
//! Everything here is a pure function of layer state, the canvas, a text measurer and the known
//! image dimensions. The compositor and the interaction controller both go through
//! [`layer_bounds`] and [`layer_transform`], so the painted box and the hit box are the same box.

use std::collections::HashMap;

use crate::{
    foundation::core::{Affine, Point, Rect, Size},
    model::{
        canvas::CanvasState,
        defaults::{CANVAS_PADDING, LOGO_CANVAS_PADDING},
        layer::{CornerPosition, Layer, LogoLayer, TextAlign, TextLayer, VerticalAlign},
    },
};

/// Font description handed to a [`TextMeasure`].
#[derive(Clone, Debug, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub weight: f32,
    pub size: f64,
    pub italic: bool,
    pub letter_spacing: f64,
}

impl FontSpec {
    pub fn for_layer(layer: &TextLayer) -> Self {
        Self {
            family: layer.font_family.clone(),
            weight: layer.weight_value(),
            size: sanitize_font_size(layer.font_size),
            italic: layer.italic,
            letter_spacing: if layer.letter_spacing.is_finite() {
                layer.letter_spacing
            } else {
                0.0
            },
        }
    }
}

pub(crate) fn sanitize_font_size(size: f64) -> f64 {
    if size.is_finite() && size > 0.0 { size } else { 1.0 }
}

/// Maps a string and font to a pixel width.
///
/// Width is the sum of glyph advances plus `letter_spacing` between consecutive characters. A
/// character is a shaping cluster: a base letter with its combining marks counts once.
pub trait TextMeasure {
    fn measure(&mut self, text: &str, font: &FontSpec) -> f64;
}

/// Every character advances `advance_em * size`. Deterministic, font-free.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedAdvanceMeasure {
    pub advance_em: f64,
}

impl Default for FixedAdvanceMeasure {
    fn default() -> Self {
        Self { advance_em: 0.6 }
    }
}

impl TextMeasure for FixedAdvanceMeasure {
    fn measure(&mut self, text: &str, font: &FontSpec) -> f64 {
        let n = text.chars().count();
        if n == 0 {
            return 0.0;
        }
        n as f64 * self.advance_em * font.size + (n - 1) as f64 * font.letter_spacing
    }
}

/// Native pixel dimensions of decoded images, keyed by image reference.
pub trait ImageDimensions {
    fn dimensions(&self, key: &str) -> Option<(u32, u32)>;
}

impl ImageDimensions for HashMap<String, (u32, u32)> {
    fn dimensions(&self, key: &str) -> Option<(u32, u32)> {
        self.get(key).copied()
    }
}

/// No image is known; logos have no geometry.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoImages;

impl ImageDimensions for NoImages {
    fn dimensions(&self, _key: &str) -> Option<(u32, u32)> {
        None
    }
}

/// Wrapped lines of a text layer with their measured widths and the block's content box.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub line_widths: Vec<f64>,
    pub size: Size,
    pub origin: Point,
}

impl TextBlock {
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.origin, self.size)
    }

    /// Distance between consecutive line tops.
    pub fn line_advance(layer: &TextLayer) -> f64 {
        sanitize_font_size(layer.font_size) * line_height_multiplier(layer)
    }
}

fn line_height_multiplier(layer: &TextLayer) -> f64 {
    if layer.line_height_multiplier.is_finite() {
        layer.line_height_multiplier
    } else {
        1.2
    }
}

/// Wrap boundary: explicit width, else derived from the canvas and alignment; never below the
/// font size.
pub fn max_line_width(layer: &TextLayer, canvas_width: f64) -> f64 {
    let font_size = sanitize_font_size(layer.font_size);
    let derived = match (layer.width, layer.text_align) {
        (Some(w), _) if w.is_finite() && w > 0.0 => w,
        (_, TextAlign::Left) => canvas_width - layer.base.x - CANVAS_PADDING,
        (_, TextAlign::Center | TextAlign::Right) => canvas_width - 2.0 * CANVAS_PADDING,
    };
    if derived.is_finite() {
        derived.max(font_size)
    } else {
        font_size
    }
}

/// Greedy word wrap on single spaces. A word is never split; a line always takes at least one.
pub fn wrapped_lines(
    layer: &TextLayer,
    canvas_width: f64,
    measure: &mut dyn TextMeasure,
) -> Vec<String> {
    let mut words = layer.content.split(' ');
    let first = match words.next() {
        Some(w) if !w.is_empty() => w,
        _ => return Vec::new(),
    };

    let font = FontSpec::for_layer(layer);
    let max_width = max_line_width(layer, canvas_width);

    let mut lines = Vec::new();
    let mut current = first.to_owned();
    for word in words {
        let candidate = format!("{current} {word}");
        if current.is_empty() || measure.measure(&candidate, &font) < max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_owned()));
        }
    }
    lines.push(current);
    lines
}

/// Lines, widths and the aligned content box of a text layer.
pub fn text_block(
    layer: &TextLayer,
    canvas_width: f64,
    measure: &mut dyn TextMeasure,
) -> TextBlock {
    let lines = wrapped_lines(layer, canvas_width, measure);
    let font = FontSpec::for_layer(layer);
    let line_widths: Vec<f64> = lines.iter().map(|l| measure.measure(l, &font)).collect();
    let width = line_widths.iter().copied().fold(0.0, f64::max);
    let height = text_block_height(layer, lines.len());
    let size = Size::new(width, height);
    let origin = text_origin(layer, size);
    TextBlock {
        lines,
        line_widths,
        size,
        origin,
    }
}

/// `(lines - 1) * fontSize * lineHeight + fontSize`.
pub fn text_block_height(layer: &TextLayer, line_count: usize) -> f64 {
    let fs = sanitize_font_size(layer.font_size);
    line_count.saturating_sub(1) as f64 * fs * line_height_multiplier(layer) + fs
}

fn text_origin(layer: &TextLayer, size: Size) -> Point {
    let x = match layer.text_align {
        TextAlign::Left => layer.base.x,
        TextAlign::Center => layer.base.x - size.width / 2.0,
        TextAlign::Right => layer.base.x - size.width,
    };
    let y = match layer.vertical_align {
        VerticalAlign::Top => layer.base.y,
        VerticalAlign::Middle => layer.base.y - size.height / 2.0,
        VerticalAlign::Bottom => layer.base.y - size.height,
    };
    Point::new(x, y)
}

/// Rendered logo size, or `None` while the logo image's dimensions are unknown.
pub fn logo_size(logo: &LogoLayer, images: &dyn ImageDimensions) -> Option<Size> {
    let src = logo.src.as_deref().filter(|s| !s.is_empty())?;
    let (w, h) = images.dimensions(src)?;
    if w == 0 || h == 0 {
        return None;
    }
    let aspect = f64::from(w) / f64::from(h);
    Some(Size::new(logo.size, logo.size / aspect))
}

fn logo_origin(logo: &LogoLayer, size: Size, canvas: &CanvasState) -> Point {
    if logo.is_freely_positioned {
        return Point::new(logo.base.x, logo.base.y);
    }
    let (cw, ch) = canvas.size();
    let left = LOGO_CANVAS_PADDING;
    let top = LOGO_CANVAS_PADDING;
    let right = cw - size.width - LOGO_CANVAS_PADDING;
    let bottom = ch - size.height - LOGO_CANVAS_PADDING;
    match logo.corner_position {
        CornerPosition::TopLeft => Point::new(left, top),
        CornerPosition::TopRight => Point::new(right, top),
        CornerPosition::BottomLeft => Point::new(left, bottom),
        CornerPosition::BottomRight => Point::new(right, bottom),
    }
}

/// Top-left of a layer's content box given its content size.
///
/// This is the only place the anchor conventions live: text anchors shift with alignment, logos
/// follow their corner unless freely positioned, images use `(x, y)` directly.
pub fn resolve_content_origin(layer: &Layer, size: Size, canvas: &CanvasState) -> Point {
    match layer {
        Layer::Text(t) => text_origin(t, size),
        Layer::Logo(l) => logo_origin(l, size, canvas),
        Layer::Image(i) => Point::new(i.base.x, i.base.y),
    }
}

/// Inputs needed to derive geometry for any layer.
pub struct LayoutInputs<'a> {
    pub canvas: &'a CanvasState,
    pub images: &'a dyn ImageDimensions,
}

/// Unrotated content box of a layer, or `None` when it has nothing to occupy space.
pub fn layer_bounds(
    layer: &Layer,
    inputs: &LayoutInputs<'_>,
    measure: &mut dyn TextMeasure,
) -> Option<Rect> {
    let rect = match layer {
        Layer::Text(t) => {
            let block = text_block(t, f64::from(inputs.canvas.canvas_width), measure);
            if block.lines.is_empty() {
                return None;
            }
            block.bounds()
        }
        Layer::Logo(l) => {
            let size = logo_size(l, inputs.images)?;
            Rect::from_origin_size(resolve_content_origin(layer, size, inputs.canvas), size)
        }
        Layer::Image(i) => {
            let size = Size::new(i.width.max(0.0), i.height.max(0.0));
            Rect::from_origin_size(resolve_content_origin(layer, size, inputs.canvas), size)
        }
    };
    rect.is_finite().then_some(rect)
}

/// Rotation by `rotation` degrees (clockwise on a y-down canvas) about the box center.
pub fn layer_transform(layer: &Layer, bounds: Rect) -> Affine {
    let deg = layer.base().rotation;
    if !deg.is_finite() || deg == 0.0 {
        return Affine::IDENTITY;
    }
    Affine::rotate_about(deg.to_radians(), bounds.center())
}

/// Point-in-rotated-rectangle, edges inclusive.
pub fn rotated_box_contains(bounds: Rect, rotation_deg: f64, point: Point) -> bool {
    let c = bounds.center();
    let (dx, dy) = (point.x - c.x, point.y - c.y);
    let theta = if rotation_deg.is_finite() {
        -rotation_deg.to_radians()
    } else {
        0.0
    };
    let (s, co) = theta.sin_cos();
    let rx = dx * co - dy * s;
    let ry = dx * s + dy * co;
    let hw = bounds.width() / 2.0;
    let hh = bounds.height() / 2.0;
    // Tolerate float noise from the round trip through sin/cos.
    const EPS: f64 = 1e-9;
    rx >= -hw - EPS && rx <= hw + EPS && ry >= -hh - EPS && ry <= hh + EPS
}

#[cfg(test)]
#[path = "../../tests/unit/layout/metrics.rs"]
mod tests;
