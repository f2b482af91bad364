//! Pointer-driven selection and dragging.
//!
//! The controller never mutates the document. It reads the same geometry the compositor paints
//! with and reports what the pointer did; [`crate::store::document::Document`] applies it.

use serde::{Deserialize, Serialize};

use crate::{
    foundation::core::{Point, Rect, Size},
    layout::metrics::{
        ImageDimensions, LayoutInputs, TextMeasure, layer_bounds, rotated_box_contains,
    },
    model::{
        layer::{Layer, LayerId},
        state::EditorState,
    },
};

/// Grid axes a drag snaps to. `Vertical` snaps x to vertical grid lines, `Horizontal` snaps y.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapMode {
    #[default]
    None,
    Vertical,
    Horizontal,
    Both,
}

impl SnapMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "vertical" => Some(Self::Vertical),
            "horizontal" => Some(Self::Horizontal),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    fn snaps_x(self) -> bool {
        matches!(self, Self::Vertical | Self::Both)
    }

    fn snaps_y(self) -> bool {
        matches!(self, Self::Horizontal | Self::Both)
    }
}

pub const DEFAULT_GRID_DENSITY: u32 = 5;

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionState {
    Idle,
    /// The pointer is over the selected layer.
    Hovering(LayerId),
    /// `grab` is where the pointer went down; `original` is the layer position at that moment.
    Dragging {
        layer_id: LayerId,
        grab: Point,
        original: Point,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum PointerAction {
    None,
    /// A layer other than the selected one was hit. No drag starts.
    Select(LayerId),
    DragStarted(LayerId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PositionChange {
    pub layer_id: LayerId,
    pub position: Point,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cursor {
    Default,
    Move,
}

/// Rescale a pointer position on a displayed (possibly resized) canvas into canvas pixels.
pub fn to_canvas_point(display_point: Point, display_size: Size, canvas_size: Size) -> Point {
    let scale = |canvas: f64, display: f64| {
        if display > 0.0 && display.is_finite() {
            canvas / display
        } else {
            1.0
        }
    };
    Point::new(
        display_point.x * scale(canvas_size.width, display_size.width),
        display_point.y * scale(canvas_size.height, display_size.height),
    )
}

fn hits(
    layer: &Layer,
    state: &EditorState,
    point: Point,
    images: &dyn ImageDimensions,
    measure: &mut dyn TextMeasure,
) -> Option<Rect> {
    if !layer.is_visible() {
        return None;
    }
    let inputs = LayoutInputs {
        canvas: &state.canvas,
        images,
    };
    let bounds = layer_bounds(layer, &inputs, measure)?;
    rotated_box_contains(bounds, layer.base().rotation, point)
        .then_some(bounds)
}

/// Topmost visible layer whose rotated box contains `point`.
pub fn hit_test(
    state: &EditorState,
    point: Point,
    images: &dyn ImageDimensions,
    measure: &mut dyn TextMeasure,
) -> Option<LayerId> {
    state
        .display_order()
        .into_iter()
        .find(|l| hits(l, state, point, images, measure).is_some())
        .map(|l| l.id().clone())
}

/// Position a drag starts from: the anchor, or the rendered origin for a corner-anchored logo.
fn drag_origin(layer: &Layer, bounds: Rect) -> Point {
    match layer {
        Layer::Logo(logo) if !logo.is_freely_positioned => bounds.origin(),
        other => Point::new(other.base().x, other.base().y),
    }
}

#[derive(Clone, Debug)]
pub struct InteractionController {
    state: InteractionState,
    snap: SnapMode,
    grid_density: u32,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(SnapMode::None, DEFAULT_GRID_DENSITY)
    }
}

impl InteractionController {
    pub fn new(snap: SnapMode, grid_density: u32) -> Self {
        Self {
            state: InteractionState::Idle,
            snap,
            grid_density,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn snap(&self) -> SnapMode {
        self.snap
    }

    pub fn set_snap(&mut self, snap: SnapMode) {
        self.snap = snap;
    }

    pub fn grid_density(&self) -> u32 {
        self.grid_density
    }

    pub fn set_grid_density(&mut self, density: u32) {
        self.grid_density = density;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, InteractionState::Dragging { .. })
    }

    /// Select a hit layer, or start dragging it when it is already selected.
    pub fn pointer_down(
        &mut self,
        point: Point,
        state: &EditorState,
        images: &dyn ImageDimensions,
        measure: &mut dyn TextMeasure,
    ) -> PointerAction {
        for layer in state.display_order() {
            let Some(bounds) = hits(layer, state, point, images, measure) else {
                continue;
            };
            let id = layer.id().clone();
            if state.selected_layer_id.as_ref() != Some(&id) {
                self.state = InteractionState::Idle;
                return PointerAction::Select(id);
            }
            self.state = InteractionState::Dragging {
                layer_id: id.clone(),
                grab: point,
                original: drag_origin(layer, bounds),
            };
            return PointerAction::DragStarted(id);
        }
        self.state = InteractionState::Idle;
        PointerAction::None
    }

    /// Drag the grabbed layer, or refresh the hover state over the selected layer.
    pub fn pointer_move(
        &mut self,
        point: Point,
        state: &EditorState,
        images: &dyn ImageDimensions,
        measure: &mut dyn TextMeasure,
    ) -> Option<PositionChange> {
        if let InteractionState::Dragging {
            layer_id,
            grab,
            original,
        } = &self.state
        {
            let position = self.snap_point(
                Point::new(
                    original.x + (point.x - grab.x),
                    original.y + (point.y - grab.y),
                ),
                state,
            );
            return Some(PositionChange {
                layer_id: layer_id.clone(),
                position,
            });
        }

        self.state = state
            .selected_layer()
            .filter(|l| hits(l, state, point, images, measure).is_some())
            .map_or(InteractionState::Idle, |l| {
                InteractionState::Hovering(l.id().clone())
            });
        None
    }

    /// End any drag. Positions already reported stay applied.
    pub fn pointer_up(&mut self) {
        self.state = InteractionState::Idle;
    }

    pub fn cursor(&self) -> Cursor {
        match self.state {
            InteractionState::Idle => Cursor::Default,
            InteractionState::Hovering(_) | InteractionState::Dragging { .. } => Cursor::Move,
        }
    }

    fn snap_point(&self, p: Point, state: &EditorState) -> Point {
        if self.snap == SnapMode::None || self.grid_density == 0 {
            return p;
        }
        let (cw, ch) = state.canvas.size();
        let density = f64::from(self.grid_density);
        let snap = |v: f64, spacing: f64| (v / spacing).round() * spacing;
        Point::new(
            if self.snap.snaps_x() { snap(p.x, cw / density) } else { p.x },
            if self.snap.snaps_y() { snap(p.y, ch / density) } else { p.y },
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/interact/controller.rs"]
mod tests;
