//! The canonical document and its change subscriptions.

use serde_json::Value;

use crate::{
    foundation::{
        core::Point,
        error::{CardError, CardResult},
    },
    interact::controller::{InteractionController, InteractionState, PointerAction, PositionChange},
    layout::metrics::{ImageDimensions, TextMeasure},
    model::{
        canvas::BackgroundType,
        layer::{Layer, LayerId, LayerKind},
        state::{BrandKit, BrandSlot, EditorState},
    },
    store::{
        mutator::{
            BrandTarget, CanvasBrandTarget, ImageDimension, LayerPatch, MoveDirection, ShadowField,
        },
        reconcile::{reconcile, reconcile_str},
    },
};

pub type ChangeListener = Box<dyn FnMut(&EditorState)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Owns the [`EditorState`]. Every successful mutation that changes the state bumps the
/// revision and notifies subscribers once; failed or no-op mutations notify nobody.
pub struct Document {
    state: EditorState,
    brand_kit: BrandKit,
    revision: u64,
    listeners: Vec<(SubscriptionId, ChangeListener)>,
    next_subscription: u64,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("state", &self.state)
            .field("brand_kit", &self.brand_kit)
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(EditorState::default())
    }
}

impl Document {
    pub fn new(mut state: EditorState) -> Self {
        state.heal_selection();
        Self {
            state,
            brand_kit: BrandKit::default(),
            revision: 0,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Load a persisted document, reconciling it against the defaults.
    pub fn from_value(value: Value) -> Self {
        Self::new(reconcile(value))
    }

    pub fn from_json_str(text: &str) -> Self {
        Self::new(reconcile_str(text))
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn to_value(&self) -> CardResult<Value> {
        Ok(serde_json::to_value(&self.state)?)
    }

    pub fn to_json_string(&self) -> CardResult<String> {
        Ok(serde_json::to_string_pretty(&self.state)?)
    }

    pub fn brand_kit(&self) -> &BrandKit {
        &self.brand_kit
    }

    pub fn set_brand_kit(&mut self, kit: BrandKit) {
        self.brand_kit = kit;
    }

    pub fn subscribe(&mut self, listener: ChangeListener) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        self.revision += 1;
        for (_, listener) in &mut self.listeners {
            listener(&self.state);
        }
    }

    /// Replace the whole state (e.g. loading a template). Always reconciled.
    pub fn replace(&mut self, state: EditorState) -> CardResult<()> {
        let reconciled = reconcile(serde_json::to_value(&state)?);
        if reconciled != self.state {
            self.state = reconciled;
            self.notify();
        }
        Ok(())
    }

    /// Run `op` against the state. On success a dangling selection is healed and subscribers
    /// are notified if anything changed; on error the state is restored.
    pub fn mutate<R>(
        &mut self,
        op: impl FnOnce(&mut EditorState) -> CardResult<R>,
    ) -> CardResult<R> {
        let before = self.state.clone();
        let out = op(&mut self.state);
        match out {
            Ok(value) => {
                let dangling = self
                    .state
                    .selected_layer_id
                    .as_ref()
                    .is_some_and(|id| self.state.layer(id).is_none());
                if dangling {
                    self.state.heal_selection();
                }
                if self.state != before {
                    self.notify();
                }
                Ok(value)
            }
            Err(err) => {
                self.state = before;
                Err(err)
            }
        }
    }

    pub fn add_layer(&mut self, kind: LayerKind, initial: Option<&str>) -> CardResult<LayerId> {
        self.mutate(|s| s.add_layer(kind, initial))
    }

    /// Run an edit that cannot fail. Subscribers hear about it only if the state changed.
    fn apply<R>(&mut self, op: impl FnOnce(&mut EditorState) -> R) -> R {
        let before = self.state.clone();
        let out = op(&mut self.state);
        if self.state != before {
            self.notify();
        }
        out
    }

    pub fn add_text_layer(&mut self, content: &str) -> LayerId {
        self.apply(|s| s.add_text_layer(content))
    }

    pub fn add_image_layer(&mut self, src: &str, width: u32, height: u32) -> CardResult<LayerId> {
        self.mutate(|s| s.add_image_layer(src, width, height))
    }

    pub fn update_layer(&mut self, id: &LayerId, patch: LayerPatch) -> CardResult<()> {
        self.mutate(|s| s.update_layer(id, patch))
    }

    pub fn update_layer_json(&mut self, id: &LayerId, patch: &Value) -> CardResult<()> {
        self.mutate(|s| s.update_layer_json(id, patch))
    }

    pub fn update_shadow_field(&mut self, id: &LayerId, field: ShadowField) -> CardResult<()> {
        self.mutate(|s| s.update_shadow_field(id, field))
    }

    pub fn resize_image(&mut self, id: &LayerId, dimension: ImageDimension) -> CardResult<()> {
        self.mutate(|s| s.resize_image(id, dimension))
    }

    pub fn delete_layer(&mut self, id: &LayerId) -> CardResult<Layer> {
        self.mutate(|s| s.delete_layer(id))
    }

    pub fn select_layer(&mut self, id: Option<&LayerId>) -> CardResult<()> {
        self.mutate(|s| s.select_layer(id))
    }

    pub fn toggle_visibility(&mut self, id: &LayerId) -> CardResult<bool> {
        self.mutate(|s| s.toggle_visibility(id))
    }

    pub fn toggle_italic(&mut self, id: &LayerId) -> CardResult<bool> {
        self.mutate(|s| s.toggle_italic(id))
    }

    pub fn toggle_underline(&mut self, id: &LayerId) -> CardResult<bool> {
        self.mutate(|s| s.toggle_underline(id))
    }

    pub fn set_layer_position(&mut self, id: &LayerId, position: Point) -> CardResult<()> {
        self.mutate(|s| s.set_layer_position(id, position))
    }

    pub fn move_layer(&mut self, id: &LayerId, direction: MoveDirection) -> CardResult<()> {
        self.mutate(|s| s.move_layer(id, direction))
    }

    pub fn reorder_layers(&mut self, from: usize, to: usize) -> CardResult<()> {
        self.mutate(|s| s.reorder_layers(from, to))
    }

    /// Returns the image reference dropped by leaving an image background.
    pub fn set_background_type(&mut self, background: BackgroundType) -> Option<String> {
        self.apply(|s| s.set_background_type(background))
    }

    pub fn set_background_image(&mut self, src: Option<String>) {
        self.apply(|s| s.set_background_image(src));
    }

    pub fn clear_background_image(&mut self) -> Option<String> {
        self.apply(|s| s.clear_background_image())
    }

    pub fn set_canvas_size(&mut self, width: u32, height: u32) -> CardResult<()> {
        self.mutate(|s| s.set_canvas_size(width, height))
    }

    pub fn apply_brand_color(
        &mut self,
        id: &LayerId,
        target: BrandTarget,
        slot: BrandSlot,
    ) -> CardResult<()> {
        let kit = self.brand_kit.clone();
        self.mutate(|s| s.apply_brand_color(&kit, id, target, slot))
    }

    pub fn apply_brand_color_to_canvas(&mut self, target: CanvasBrandTarget) {
        let kit = self.brand_kit.clone();
        self.apply(|s| s.apply_brand_color_to_canvas(&kit, target));
    }

    /// Route a pointer press through `controller`: selects a hit layer or starts a drag.
    ///
    /// Dragging a corner-anchored logo pins it as freely positioned where it is drawn.
    pub fn apply_pointer_down(
        &mut self,
        controller: &mut InteractionController,
        point: Point,
        images: &dyn ImageDimensions,
        measure: &mut dyn TextMeasure,
    ) -> CardResult<PointerAction> {
        let action = controller.pointer_down(point, &self.state, images, measure);
        match &action {
            PointerAction::Select(id) => self.select_layer(Some(id))?,
            PointerAction::DragStarted(id) => {
                if let InteractionState::Dragging { original, .. } = controller.state() {
                    let at = *original;
                    self.mutate(|s| detach_logo(s, id, at))?;
                }
            }
            PointerAction::None => {}
        }
        Ok(action)
    }

    pub fn apply_pointer_move(
        &mut self,
        controller: &mut InteractionController,
        point: Point,
        images: &dyn ImageDimensions,
        measure: &mut dyn TextMeasure,
    ) -> CardResult<Option<PositionChange>> {
        let change = controller.pointer_move(point, &self.state, images, measure);
        if let Some(change) = &change {
            self.set_layer_position(&change.layer_id, change.position)?;
        }
        Ok(change)
    }

    pub fn apply_pointer_up(&mut self, controller: &mut InteractionController) {
        controller.pointer_up();
    }
}

fn detach_logo(state: &mut EditorState, id: &LayerId, at: Point) -> CardResult<()> {
    match state.layer_mut(id) {
        Some(Layer::Logo(logo)) if !logo.is_freely_positioned => {
            logo.is_freely_positioned = true;
            logo.base.x = at.x;
            logo.base.y = at.y;
            Ok(())
        }
        Some(_) => Ok(()),
        None => Err(CardError::unknown_layer(id.as_str())),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/document.rs"]
mod tests;
