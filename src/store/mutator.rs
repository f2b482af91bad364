//! Layer store operations on [`EditorState`].
//!
//! Every operation either applies completely or returns an error and leaves the state untouched.

use serde::Deserialize;

use crate::{
    foundation::{
        core::Point,
        error::{CardError, CardResult},
    },
    model::{
        canvas::BackgroundType,
        defaults::{FALLBACK_IMAGE_ASPECT, new_image_layer, new_text_layer},
        layer::{CornerPosition, Layer, LayerId, LayerKind, Shadow, TextAlign, VerticalAlign},
        lenient::double_option,
        state::{BrandKit, BrandSlot, EditorState},
    },
};

/// Fields every layer kind accepts.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonPatch {
    pub name: Option<String>,
    pub z_index: Option<i64>,
    pub is_visible: Option<bool>,
    pub opacity: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub rotation: Option<f64>,
    pub is_locked: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShadowPatch {
    pub enabled: Option<bool>,
    pub color: Option<String>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    pub blur_radius: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextPatch {
    pub content: Option<String>,
    pub font_family: Option<String>,
    pub font_weight: Option<String>,
    pub font_size: Option<f64>,
    pub text_color: Option<String>,
    pub letter_spacing: Option<f64>,
    pub line_height_multiplier: Option<f64>,
    pub text_align: Option<TextAlign>,
    pub vertical_align: Option<VerticalAlign>,
    /// `Some(None)` clears a fixed width.
    #[serde(deserialize_with = "double_option")]
    pub width: Option<Option<f64>>,
    pub text_shadow: Option<ShadowPatch>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogoPatch {
    /// `Some(None)` clears the logo image.
    #[serde(deserialize_with = "double_option")]
    pub src: Option<Option<String>>,
    pub size: Option<f64>,
    pub corner_position: Option<CornerPosition>,
    pub is_freely_positioned: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImagePatch {
    pub src: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub original_aspect_ratio: Option<f64>,
    pub border_radius: Option<f64>,
    pub shadow: Option<ShadowPatch>,
}

/// Type-specific part of a [`LayerPatch`]. Must match the target layer's kind.
#[derive(Clone, Debug, PartialEq)]
pub enum KindPatch {
    Text(TextPatch),
    Logo(LogoPatch),
    Image(ImagePatch),
}

impl KindPatch {
    pub fn kind(&self) -> LayerKind {
        match self {
            Self::Text(_) => LayerKind::Text,
            Self::Logo(_) => LayerKind::Logo,
            Self::Image(_) => LayerKind::Image,
        }
    }
}

/// Partial update of one layer. The layer's id and type never change through a patch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerPatch {
    pub common: CommonPatch,
    pub specific: Option<KindPatch>,
}

impl LayerPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            common: CommonPatch {
                x: Some(x),
                y: Some(y),
                ..CommonPatch::default()
            },
            specific: None,
        }
    }

    pub fn text(patch: TextPatch) -> Self {
        Self {
            common: CommonPatch::default(),
            specific: Some(KindPatch::Text(patch)),
        }
    }

    pub fn logo(patch: LogoPatch) -> Self {
        Self {
            common: CommonPatch::default(),
            specific: Some(KindPatch::Logo(patch)),
        }
    }

    pub fn image(patch: ImagePatch) -> Self {
        Self {
            common: CommonPatch::default(),
            specific: Some(KindPatch::Image(patch)),
        }
    }

    /// Build a patch from an untyped JSON object aimed at a layer of `target` kind.
    ///
    /// A `"type"` field naming another kind is an invalid mutation. `"id"` is ignored.
    pub fn from_json(value: &serde_json::Value, target: LayerKind) -> CardResult<Self> {
        if !value.is_object() {
            return Err(CardError::validation("layer patch must be a JSON object"));
        }
        if let Some(ty) = value.get("type") {
            let requested: LayerKind = serde_json::from_value(ty.clone())
                .map_err(|e| CardError::invalid_mutation(format!("unknown layer type: {e}")))?;
            if requested != target {
                return Err(CardError::invalid_mutation(format!(
                    "cannot change layer type from {target} to {requested}"
                )));
            }
        }
        let common: CommonPatch = serde_json::from_value(value.clone())?;
        let specific = match target {
            LayerKind::Text => KindPatch::Text(serde_json::from_value(value.clone())?),
            LayerKind::Logo => KindPatch::Logo(serde_json::from_value(value.clone())?),
            LayerKind::Image => KindPatch::Image(serde_json::from_value(value.clone())?),
        };
        Ok(Self {
            common,
            specific: Some(specific),
        })
    }
}

/// A single shadow property, applied to whichever shadow the layer kind carries.
#[derive(Clone, Debug, PartialEq)]
pub enum ShadowField {
    Enabled(bool),
    Color(String),
    OffsetX(f64),
    OffsetY(f64),
    BlurRadius(f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageDimension {
    Width(f64),
    Height(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Layer property a brand color can be applied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrandTarget {
    TextColor,
    Shadow,
}

/// Canvas property a brand color can be applied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CanvasBrandTarget {
    BgColor,
    Gradient1,
    Gradient2,
}

fn apply_shadow_patch(shadow: &mut Shadow, patch: ShadowPatch) {
    if let Some(v) = patch.enabled {
        shadow.enabled = v;
    }
    if let Some(v) = patch.color {
        shadow.color = v;
    }
    if let Some(v) = patch.offset_x {
        shadow.offset_x = v;
    }
    if let Some(v) = patch.offset_y {
        shadow.offset_y = v;
    }
    if let Some(v) = patch.blur_radius {
        shadow.blur_radius = v;
    }
}

fn apply_patch(layer: &mut Layer, patch: LayerPatch) {
    let c = patch.common;
    let base = layer.base_mut();
    if let Some(v) = c.name {
        base.name = v;
    }
    if let Some(v) = c.z_index {
        base.z_index = v;
    }
    if let Some(v) = c.is_visible {
        base.is_visible = v;
    }
    if let Some(v) = c.opacity {
        base.opacity = v;
    }
    if let Some(v) = c.x {
        base.x = v;
    }
    if let Some(v) = c.y {
        base.y = v;
    }
    if let Some(v) = c.rotation {
        base.rotation = v;
    }
    if let Some(v) = c.is_locked {
        base.is_locked = Some(v);
    }

    match (layer, patch.specific) {
        (Layer::Text(t), Some(KindPatch::Text(p))) => {
            if let Some(v) = p.content {
                t.content = v;
            }
            if let Some(v) = p.font_family {
                t.font_family = v;
            }
            if let Some(v) = p.font_weight {
                t.font_weight = v;
            }
            if let Some(v) = p.font_size {
                t.font_size = v;
            }
            if let Some(v) = p.text_color {
                t.text_color = v;
            }
            if let Some(v) = p.letter_spacing {
                t.letter_spacing = v;
            }
            if let Some(v) = p.line_height_multiplier {
                t.line_height_multiplier = v;
            }
            if let Some(v) = p.text_align {
                t.text_align = v;
            }
            if let Some(v) = p.vertical_align {
                t.vertical_align = v;
            }
            if let Some(v) = p.width {
                t.width = v;
            }
            if let Some(v) = p.text_shadow {
                apply_shadow_patch(&mut t.text_shadow, v);
            }
            if let Some(v) = p.italic {
                t.italic = v;
            }
            if let Some(v) = p.underline {
                t.underline = v;
            }
        }
        (Layer::Logo(l), Some(KindPatch::Logo(p))) => {
            if let Some(v) = p.src {
                l.src = v;
            }
            if let Some(v) = p.size {
                l.size = v;
            }
            if let Some(v) = p.corner_position {
                l.corner_position = v;
            }
            if let Some(v) = p.is_freely_positioned {
                l.is_freely_positioned = v;
            }
        }
        (Layer::Image(i), Some(KindPatch::Image(p))) => {
            if let Some(v) = p.src {
                i.src = v;
            }
            if let Some(v) = p.width {
                i.width = v;
            }
            if let Some(v) = p.height {
                i.height = v;
            }
            if let Some(v) = p.original_aspect_ratio {
                i.original_aspect_ratio = v;
            }
            if let Some(v) = p.border_radius {
                i.border_radius = v;
            }
            if let Some(v) = p.shadow {
                apply_shadow_patch(&mut i.shadow, v);
            }
        }
        // Kind mismatches are rejected before we get here.
        _ => {}
    }
}

impl EditorState {
    fn layer_or_unknown(&mut self, id: &LayerId) -> CardResult<&mut Layer> {
        self.layer_mut(id)
            .ok_or_else(|| CardError::unknown_layer(id.as_str()))
    }

    fn next_z(&self) -> i64 {
        self.max_z().map_or(0, |z| z + 1)
    }

    fn push_selected(&mut self, layer: Layer) -> LayerId {
        let id = layer.id().clone();
        self.layers.push(layer);
        self.selected_layer_id = Some(id.clone());
        id
    }

    /// Add a layer of `kind` one above the current top and select it.
    ///
    /// For text, `initial` is the content; for images it is the image reference. A second logo
    /// cannot be added.
    pub fn add_layer(&mut self, kind: LayerKind, initial: Option<&str>) -> CardResult<LayerId> {
        let z = self.next_z();
        let layer = match kind {
            LayerKind::Text => Layer::Text(new_text_layer(initial.unwrap_or(""), z, &self.canvas)),
            LayerKind::Image => {
                let src = initial
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| CardError::validation("image layer needs an image reference"))?;
                Layer::Image(new_image_layer(src, FALLBACK_IMAGE_ASPECT, z, &self.canvas))
            }
            LayerKind::Logo => {
                tracing::warn!("rejected adding a second logo layer");
                return Err(CardError::invalid_mutation(
                    "the document already has its logo layer",
                ));
            }
        };
        Ok(self.push_selected(layer))
    }

    pub fn add_text_layer(&mut self, content: &str) -> LayerId {
        let z = self.next_z();
        let mut layer = new_text_layer(content, z, &self.canvas);
        layer.base.name = format!("Text {}", self.count_kind(LayerKind::Text) + 1);
        self.push_selected(Layer::Text(layer))
    }

    /// Add an image layer 200px wide with height from the native aspect ratio.
    pub fn add_image_layer(
        &mut self,
        src: &str,
        native_width: u32,
        native_height: u32,
    ) -> CardResult<LayerId> {
        if src.is_empty() {
            return Err(CardError::validation("image layer needs an image reference"));
        }
        if native_width == 0 || native_height == 0 {
            return Err(CardError::validation("image has zero size"));
        }
        let aspect = f64::from(native_width) / f64::from(native_height);
        let z = self.next_z();
        let mut layer = new_image_layer(src, aspect, z, &self.canvas);
        layer.base.name = format!("Image {}", self.count_kind(LayerKind::Image) + 1);
        Ok(self.push_selected(Layer::Image(layer)))
    }

    /// Merge `patch` into layer `id`. A patch for another layer kind is rejected unchanged.
    pub fn update_layer(&mut self, id: &LayerId, patch: LayerPatch) -> CardResult<()> {
        let layer = self.layer_or_unknown(id)?;
        if let Some(specific) = &patch.specific
            && specific.kind() != layer.kind()
        {
            tracing::warn!(
                layer = %id,
                from = %layer.kind(),
                to = %specific.kind(),
                "rejected layer type change"
            );
            return Err(CardError::invalid_mutation(format!(
                "cannot change layer type from {} to {}",
                layer.kind(),
                specific.kind()
            )));
        }
        apply_patch(layer, patch);
        Ok(())
    }

    /// [`EditorState::update_layer`] from an untyped JSON object.
    pub fn update_layer_json(&mut self, id: &LayerId, value: &serde_json::Value) -> CardResult<()> {
        let kind = self
            .layer(id)
            .map(Layer::kind)
            .ok_or_else(|| CardError::unknown_layer(id.as_str()))?;
        let patch = LayerPatch::from_json(value, kind).inspect_err(|e| {
            tracing::warn!(layer = %id, error = %e, "rejected layer patch");
        })?;
        self.update_layer(id, patch)
    }

    /// Set one shadow property: `textShadow` on text, `shadow` on images.
    pub fn update_shadow_field(&mut self, id: &LayerId, field: ShadowField) -> CardResult<()> {
        let layer = self.layer_or_unknown(id)?;
        let kind = layer.kind();
        let Some(shadow) = layer.shadow_mut() else {
            tracing::warn!(layer = %id, %kind, "layer has no shadow");
            return Err(CardError::invalid_mutation(format!(
                "{kind} layers have no shadow"
            )));
        };
        match field {
            ShadowField::Enabled(v) => shadow.enabled = v,
            ShadowField::Color(v) => shadow.color = v,
            ShadowField::OffsetX(v) => shadow.offset_x = v,
            ShadowField::OffsetY(v) => shadow.offset_y = v,
            ShadowField::BlurRadius(v) => shadow.blur_radius = v,
        }
        Ok(())
    }

    /// Resize an image layer along one axis, deriving the other from `originalAspectRatio`.
    pub fn resize_image(&mut self, id: &LayerId, dimension: ImageDimension) -> CardResult<()> {
        let layer = self.layer_or_unknown(id)?;
        let Layer::Image(img) = layer else {
            return Err(CardError::invalid_mutation("only image layers can be resized"));
        };
        let ratio = if img.original_aspect_ratio.is_finite() && img.original_aspect_ratio > 0.0 {
            img.original_aspect_ratio
        } else {
            FALLBACK_IMAGE_ASPECT
        };
        match dimension {
            ImageDimension::Width(w) if w.is_finite() && w > 0.0 => {
                img.width = w;
                img.height = w / ratio;
            }
            ImageDimension::Height(h) if h.is_finite() && h > 0.0 => {
                img.height = h;
                img.width = h * ratio;
            }
            _ => return Err(CardError::validation("image dimensions must be positive")),
        }
        Ok(())
    }

    /// Remove a layer and hand it back. The logo is protected.
    ///
    /// If the removed layer was selected, the topmost remaining layer becomes selected.
    pub fn delete_layer(&mut self, id: &LayerId) -> CardResult<Layer> {
        let idx = self
            .position_of(id)
            .ok_or_else(|| CardError::unknown_layer(id.as_str()))?;
        if self.layers[idx].kind() == LayerKind::Logo {
            tracing::warn!(layer = %id, "rejected deleting the logo layer");
            return Err(CardError::invalid_mutation(
                "the logo layer cannot be deleted; hide it or clear its image instead",
            ));
        }
        let removed = self.layers.remove(idx);
        if self.selected_layer_id.as_ref() == Some(id) {
            self.selected_layer_id = self.topmost().map(|l| l.id().clone());
        }
        Ok(removed)
    }

    pub fn select_layer(&mut self, id: Option<&LayerId>) -> CardResult<()> {
        if let Some(id) = id
            && self.layer(id).is_none()
        {
            return Err(CardError::unknown_layer(id.as_str()));
        }
        self.selected_layer_id = id.cloned();
        Ok(())
    }

    pub fn toggle_visibility(&mut self, id: &LayerId) -> CardResult<bool> {
        let base = self.layer_or_unknown(id)?.base_mut();
        base.is_visible = !base.is_visible;
        Ok(base.is_visible)
    }

    pub fn set_layer_position(&mut self, id: &LayerId, position: Point) -> CardResult<()> {
        let base = self.layer_or_unknown(id)?.base_mut();
        base.x = position.x;
        base.y = position.y;
        Ok(())
    }

    pub fn toggle_italic(&mut self, id: &LayerId) -> CardResult<bool> {
        match self.layer_or_unknown(id)? {
            Layer::Text(t) => {
                t.italic = !t.italic;
                Ok(t.italic)
            }
            _ => Err(CardError::invalid_mutation("only text layers can be italic")),
        }
    }

    pub fn toggle_underline(&mut self, id: &LayerId) -> CardResult<bool> {
        match self.layer_or_unknown(id)? {
            Layer::Text(t) => {
                t.underline = !t.underline;
                Ok(t.underline)
            }
            _ => Err(CardError::invalid_mutation(
                "only text layers can be underlined",
            )),
        }
    }

    fn has_z_ties(&self) -> bool {
        let mut zs: Vec<i64> = self.layers.iter().map(Layer::z_index).collect();
        zs.sort_unstable();
        zs.windows(2).any(|w| w[0] == w[1])
    }

    /// Renumber `zIndex` to `min, min+1, ..` in current paint order.
    fn renumber_dense_from_min(&mut self) {
        let Some(min) = self.layers.iter().map(Layer::z_index).min() else {
            return;
        };
        let order: Vec<LayerId> = self.paint_order().iter().map(|l| l.id().clone()).collect();
        for (i, id) in order.iter().enumerate() {
            if let Some(layer) = self.layer_mut(id) {
                layer.base_mut().z_index = min + i as i64;
            }
        }
    }

    /// Swap paint order with the nearest neighbor in `direction`.
    ///
    /// Tied `zIndex` values (legacy documents) are first made unique, keeping the current
    /// visual order, so the move always makes progress and leaves no duplicates. Moving the
    /// top layer up or the bottom layer down is a no-op.
    pub fn move_layer(&mut self, id: &LayerId, direction: MoveDirection) -> CardResult<()> {
        if self.layer(id).is_none() {
            return Err(CardError::unknown_layer(id.as_str()));
        }
        if self.has_z_ties() {
            tracing::debug!("renumbering tied zIndex values before move");
            self.renumber_dense_from_min();
        }

        let order: Vec<(LayerId, i64)> = self
            .paint_order()
            .iter()
            .map(|l| (l.id().clone(), l.z_index()))
            .collect();
        let Some(pos) = order.iter().position(|(lid, _)| lid == id) else {
            return Err(CardError::unknown_layer(id.as_str()));
        };
        let neighbor = match direction {
            MoveDirection::Up => order.get(pos + 1),
            MoveDirection::Down => pos.checked_sub(1).and_then(|p| order.get(p)),
        };
        let Some((neighbor_id, neighbor_z)) = neighbor.cloned() else {
            return Ok(());
        };
        let own_z = order[pos].1;
        if let Some(l) = self.layer_mut(id) {
            l.base_mut().z_index = neighbor_z;
        }
        if let Some(l) = self.layer_mut(&neighbor_id) {
            l.base_mut().z_index = own_z;
        }
        Ok(())
    }

    /// Move the entry at display index `from` (topmost first) to `to`, then renumber densely
    /// from the current maximum downwards.
    pub fn reorder_layers(&mut self, from: usize, to: usize) -> CardResult<()> {
        let n = self.layers.len();
        if from >= n || to >= n {
            return Err(CardError::validation(format!(
                "reorder indices {from} -> {to} out of range for {n} layers"
            )));
        }
        if from == to {
            return Ok(());
        }
        let mut order = self.display_ids();
        let moved = order.remove(from);
        order.insert(to, moved);
        let max = self.max_z().unwrap_or(0);
        for (i, id) in order.iter().enumerate() {
            if let Some(layer) = self.layer_mut(id) {
                layer.base_mut().z_index = max - i as i64;
            }
        }
        Ok(())
    }

    /// Switching away from an image background drops the image reference; `bgColor` stays.
    ///
    /// Returns the dropped reference so a stored blob can be released.
    pub fn set_background_type(&mut self, background: BackgroundType) -> Option<String> {
        self.canvas.background_type = background;
        if background != BackgroundType::Image {
            return self.canvas.bg_image.take();
        }
        None
    }

    pub fn set_background_image(&mut self, src: Option<String>) {
        self.canvas.bg_image = src.filter(|s| !s.is_empty());
    }

    pub fn clear_background_image(&mut self) -> Option<String> {
        self.canvas.bg_image.take()
    }

    pub fn set_canvas_size(&mut self, width: u32, height: u32) -> CardResult<()> {
        if width == 0 || height == 0 || width > u32::from(u16::MAX) || height > u32::from(u16::MAX)
        {
            return Err(CardError::validation(format!(
                "canvas size {width}x{height} must be within 1..=65535"
            )));
        }
        self.canvas.canvas_width = width;
        self.canvas.canvas_height = height;
        Ok(())
    }

    /// Apply a brand color to a text color or a shadow color.
    pub fn apply_brand_color(
        &mut self,
        kit: &BrandKit,
        id: &LayerId,
        target: BrandTarget,
        slot: BrandSlot,
    ) -> CardResult<()> {
        let color = kit.color(slot).to_owned();
        match (self.layer_or_unknown(id)?, target) {
            (Layer::Text(t), BrandTarget::TextColor) => {
                t.text_color = color;
                Ok(())
            }
            (layer, BrandTarget::TextColor) => Err(CardError::invalid_mutation(format!(
                "{} layers have no text color",
                layer.kind()
            ))),
            (layer, BrandTarget::Shadow) => match layer.shadow_mut() {
                Some(shadow) => {
                    shadow.color = color;
                    Ok(())
                }
                None => Err(CardError::invalid_mutation(format!(
                    "{} layers have no shadow",
                    layer.kind()
                ))),
            },
        }
    }

    /// Brand colors on the canvas. Gradient stops only change while the gradient is active.
    pub fn apply_brand_color_to_canvas(&mut self, kit: &BrandKit, target: CanvasBrandTarget) {
        let gradient_active = self.canvas.background_type == BackgroundType::Gradient;
        match target {
            CanvasBrandTarget::BgColor => self.canvas.bg_color = kit.color1.clone(),
            CanvasBrandTarget::Gradient1 if gradient_active => {
                self.canvas.gradient.color1 = kit.color1.clone();
            }
            CanvasBrandTarget::Gradient2 if gradient_active => {
                self.canvas.gradient.color2 = kit.color2.clone();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/mutator.rs"]
mod tests;
