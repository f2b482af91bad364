use std::collections::HashMap;

use crate::{
    foundation::error::{CardError, CardResult},
    layout::metrics::{FixedAdvanceMeasure, FontSpec, TextMeasure},
};

/// Parley brush. Layouts only provide glyph positions; color is applied when painting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ShapeOnly;

/// Font bytes registered under a family alias (e.g. `"Inter"`).
#[derive(Clone)]
struct RegisteredFont {
    /// Family name as reported by the font itself.
    family_name: String,
    data: vello_cpu::peniko::FontData,
}

/// One glyph positioned on a single shaped line, relative to the line's left edge and top.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedGlyph {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// A shaped single line of text.
#[derive(Clone)]
pub struct ShapedLine {
    pub glyphs: Vec<PlacedGlyph>,
    /// Distance from the line top to its baseline.
    pub baseline: f32,
    /// Total line height reported by the shaper.
    pub height: f32,
    pub width: f32,
    pub font_size: f32,
    pub(crate) font: vello_cpu::peniko::FontData,
}

/// Parley-backed text shaping and measurement over explicitly registered fonts.
///
/// Families are looked up by alias (case-insensitive). Unknown families fall back to the first
/// registered font. With no font registered at all, measurement falls back to a fixed
/// 0.6 em-per-character estimate and nothing can be shaped.
pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<ShapeOnly>,
    families: HashMap<String, RegisteredFont>,
    fallback: Option<RegisteredFont>,
    estimate: FixedAdvanceMeasure,
    warned_missing: bool,
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            families: HashMap::new(),
            fallback: None,
            estimate: FixedAdvanceMeasure::default(),
            warned_missing: false,
        }
    }

    /// Register font bytes. The font answers to its own family name and to `alias`, if given.
    ///
    /// Returns the family name reported by the font.
    pub fn register_font(&mut self, bytes: Vec<u8>, alias: Option<&str>) -> CardResult<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| CardError::validation("no font families registered from font bytes"))?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| CardError::validation("registered font family has no name"))?
            .to_string();

        let font = RegisteredFont {
            family_name: family_name.clone(),
            data: vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0),
        };
        self.families
            .insert(family_name.to_ascii_lowercase(), font.clone());
        if let Some(alias) = alias {
            self.families.insert(alias.to_ascii_lowercase(), font.clone());
        }
        if self.fallback.is_none() {
            self.fallback = Some(font);
        }
        tracing::debug!(family = %family_name, alias = ?alias, "registered font");
        Ok(family_name)
    }

    /// Read and register a font file.
    pub fn register_font_file(
        &mut self,
        path: &std::path::Path,
        alias: Option<&str>,
    ) -> CardResult<String> {
        let bytes = std::fs::read(path)
            .map_err(|e| CardError::storage(format!("read font {}: {e}", path.display())))?;
        self.register_font(bytes, alias)
    }

    pub fn has_fonts(&self) -> bool {
        self.fallback.is_some()
    }

    fn resolve(&self, family: &str) -> Option<RegisteredFont> {
        self.families
            .get(&family.to_ascii_lowercase())
            .or(self.fallback.as_ref())
            .cloned()
    }

    /// Shape `text` on one line. Clusters advance by their glyph advances plus `letter_spacing`.
    ///
    /// Returns `None` when no font is available or the text is empty.
    pub fn shape_line(&mut self, text: &str, font: &FontSpec) -> Option<ShapedLine> {
        if text.is_empty() {
            return None;
        }
        let Some(registered) = self.resolve(&font.family) else {
            if !self.warned_missing {
                tracing::warn!(family = %font.family, "no fonts registered; text is not drawn");
                self.warned_missing = true;
            }
            return None;
        };

        let size_px = font.size as f32;
        let spacing = font.letter_spacing as f32;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(
                registered.family_name.clone(),
            )),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(font.weight),
        ));
        if font.italic {
            builder.push_default(parley::style::StyleProperty::FontStyle(
                parley::style::FontStyle::Italic,
            ));
        }
        builder.push_default(parley::style::StyleProperty::Brush(ShapeOnly));

        let mut layout: parley::Layout<ShapeOnly> = builder.build(text);
        layout.break_all_lines(None);

        let mut glyphs = Vec::new();
        let mut baseline = 0.0f32;
        let mut height = 0.0f32;
        let mut pen = 0.0f32;
        let mut first = true;
        for line in layout.lines() {
            let metrics = line.metrics();
            height = height.max(metrics.line_height);
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                baseline = run.baseline();
                // One gap per cluster; a base letter and its combining marks share a cluster.
                for cluster in run.run().visual_clusters() {
                    if !first {
                        pen += spacing;
                    }
                    first = false;
                    for g in cluster.glyphs() {
                        glyphs.push(PlacedGlyph {
                            id: g.id,
                            x: pen + g.x,
                            y: baseline - g.y,
                        });
                        pen += g.advance;
                    }
                }
            }
        }

        Some(ShapedLine {
            glyphs,
            baseline,
            height,
            width: pen,
            font_size: size_px,
            font: registered.data,
        })
    }
}

impl TextMeasure for TextEngine {
    fn measure(&mut self, text: &str, font: &FontSpec) -> f64 {
        if !self.has_fonts() {
            return self.estimate.measure(text, font);
        }
        match self.shape_line(text, font) {
            Some(line) => f64::from(line.width),
            None => 0.0,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/text.rs"]
mod tests;
