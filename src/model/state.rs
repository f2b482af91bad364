use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{
    canvas::{CanvasState, ExportSettings},
    layer::{Layer, LayerId, LayerKind, LogoLayer, TextLayer},
};

/// The whole editable document: canvas settings, layers and the current selection.
///
/// Serializes to the flat JSON shape used by persisted documents and templates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    #[serde(flatten)]
    pub canvas: CanvasState,
    pub layers: Vec<Layer>,
    pub selected_layer_id: Option<LayerId>,
    #[serde(flatten)]
    pub export: ExportSettings,
}

impl Default for EditorState {
    fn default() -> Self {
        crate::model::defaults::initial_state()
    }
}

impl EditorState {
    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layer_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    pub fn position_of(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selected_layer_id.as_ref().and_then(|id| self.layer(id))
    }

    pub fn logo(&self) -> Option<&LogoLayer> {
        self.layers.iter().find_map(|l| match l {
            Layer::Logo(logo) => Some(logo),
            _ => None,
        })
    }

    pub fn first_text(&self) -> Option<&TextLayer> {
        self.layers.iter().find_map(|l| match l {
            Layer::Text(t) => Some(t),
            _ => None,
        })
    }

    pub fn count_kind(&self, kind: LayerKind) -> usize {
        self.layers.iter().filter(|l| l.kind() == kind).count()
    }

    pub fn max_z(&self) -> Option<i64> {
        self.layers.iter().map(Layer::z_index).max()
    }

    /// Layers in paint order: ascending `zIndex`, ties kept in storage order.
    pub fn paint_order(&self) -> Vec<&Layer> {
        let mut out: Vec<&Layer> = self.layers.iter().collect();
        out.sort_by_key(|l| l.z_index());
        out
    }

    /// Layers topmost first; exactly the reverse of [`EditorState::paint_order`].
    pub fn display_order(&self) -> Vec<&Layer> {
        let mut out = self.paint_order();
        out.reverse();
        out
    }

    pub fn display_ids(&self) -> Vec<LayerId> {
        self.display_order()
            .into_iter()
            .map(|l| l.id().clone())
            .collect()
    }

    pub fn topmost(&self) -> Option<&Layer> {
        self.display_order().into_iter().next()
    }

    /// Every image reference the document currently needs decoded.
    pub fn referenced_images(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self
            .layers
            .iter()
            .filter_map(|l| l.image_src().map(str::to_owned))
            .collect();
        if let Some(bg) = self.canvas.active_bg_image() {
            out.insert(bg.to_owned());
        }
        out
    }

    /// Repair a dangling selection: text layer, else first layer, else none.
    pub fn heal_selection(&mut self) {
        let valid = self
            .selected_layer_id
            .as_ref()
            .is_some_and(|id| self.layer(id).is_some());
        if valid {
            return;
        }
        self.selected_layer_id = self
            .first_text()
            .map(|t| t.base.id.clone())
            .or_else(|| self.layers.first().map(|l| l.id().clone()));
    }
}

/// Two brand colors that can be applied to text or shadow colors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandKit {
    pub color1: String,
    pub color2: String,
}

impl Default for BrandKit {
    fn default() -> Self {
        Self {
            color1: crate::model::defaults::BRAND_RED.to_owned(),
            color2: "#111111".to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrandSlot {
    Primary,
    Secondary,
}

impl BrandKit {
    pub fn color(&self, slot: BrandSlot) -> &str {
        match slot {
            BrandSlot::Primary => &self.color1,
            BrandSlot::Secondary => &self.color2,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/state.rs"]
mod tests;
