//! Default layers, the initial document, id generation and layout constants.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::{
    canvas::{CanvasState, ExportSettings},
    layer::{
        CornerPosition, ImageLayer, Layer, LayerBase, LayerId, LayerKind, LogoLayer, Shadow,
        TextAlign, TextLayer, VerticalAlign,
    },
    state::EditorState,
};

pub const BRAND_RED: &str = "#FF3B30";
/// Margin used when deriving text wrap widths.
pub const CANVAS_PADDING: f64 = 80.0;
/// Margin between a corner-anchored logo and the canvas edge.
pub const LOGO_CANVAS_PADDING: f64 = 20.0;
pub const CANVAS_BASE_WIDTH: u32 = 1200;
pub const CANVAS_BASE_HEIGHT: u32 = 630;

pub const DEFAULT_IMAGE_WIDTH: f64 = 200.0;
/// Aspect ratio assumed for image layers whose ratio was never recorded.
pub const FALLBACK_IMAGE_ASPECT: f64 = 1.6;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `{prefix}-{unix_ms}-{counter}`; the counter is process-wide so ids never repeat.
pub fn generate_id(prefix: &str) -> LayerId {
    let n = ID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    let ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    LayerId(format!("{prefix}-{ms}-{n}"))
}

fn base(kind: LayerKind, name: &str, z_index: i64, x: f64, y: f64) -> LayerBase {
    LayerBase {
        id: generate_id(kind.id_prefix()),
        name: name.to_owned(),
        z_index,
        is_visible: true,
        opacity: 1.0,
        x,
        y,
        rotation: 0.0,
        is_locked: None,
    }
}

pub fn default_text_layer() -> TextLayer {
    TextLayer {
        base: base(LayerKind::Text, "Headline", 1, CANVAS_PADDING, CANVAS_PADDING),
        content: "Hello".to_owned(),
        font_family: "Inter".to_owned(),
        font_weight: "900".to_owned(),
        font_size: 90.0,
        text_color: "#111111".to_owned(),
        letter_spacing: 0.0,
        line_height_multiplier: 1.2,
        text_align: TextAlign::Left,
        vertical_align: VerticalAlign::Bottom,
        width: None,
        text_shadow: Shadow::default(),
        italic: false,
        underline: false,
    }
}

pub fn default_logo_layer() -> LogoLayer {
    let w = f64::from(CANVAS_BASE_WIDTH);
    let h = f64::from(CANVAS_BASE_HEIGHT);
    LogoLayer {
        base: base(
            LayerKind::Logo,
            "Logo",
            2,
            w - 150.0 - LOGO_CANVAS_PADDING,
            h - 50.0 - LOGO_CANVAS_PADDING,
        ),
        src: None,
        size: 150.0,
        corner_position: CornerPosition::BottomRight,
        is_freely_positioned: false,
    }
}

/// A fresh text layer placed a tenth into the canvas, top-left aligned.
pub fn new_text_layer(content: &str, z_index: i64, canvas: &CanvasState) -> TextLayer {
    let mut layer = default_text_layer();
    layer.base.name = "Text".to_owned();
    layer.base.z_index = z_index;
    layer.base.x = (f64::from(canvas.canvas_width) / 10.0).round();
    layer.base.y = (f64::from(canvas.canvas_height) / 10.0).round();
    layer.content = if content.is_empty() {
        "New text layer".to_owned()
    } else {
        content.to_owned()
    };
    layer.font_size = 48.0;
    layer.font_weight = "700".to_owned();
    layer.vertical_align = VerticalAlign::Top;
    layer
}

/// An image layer sized to the default width at the given aspect ratio (width / height).
pub fn new_image_layer(src: &str, aspect: f64, z_index: i64, canvas: &CanvasState) -> ImageLayer {
    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        FALLBACK_IMAGE_ASPECT
    };
    let (w, h) = canvas.size();
    ImageLayer {
        base: base(
            LayerKind::Image,
            "Image",
            z_index,
            w / 2.0 - 100.0,
            h / 2.0 - 50.0,
        ),
        src: src.to_owned(),
        width: DEFAULT_IMAGE_WIDTH,
        height: DEFAULT_IMAGE_WIDTH / aspect,
        original_aspect_ratio: aspect,
        border_radius: 0.0,
        shadow: Shadow::default(),
    }
}

/// Default layer of a kind, used as the merge base during reconciliation.
pub fn default_layer(kind: LayerKind, canvas: &CanvasState) -> Layer {
    match kind {
        LayerKind::Text => Layer::Text(default_text_layer()),
        LayerKind::Logo => Layer::Logo(default_logo_layer()),
        LayerKind::Image => Layer::Image(new_image_layer("", FALLBACK_IMAGE_ASPECT, 0, canvas)),
    }
}

pub fn initial_state() -> EditorState {
    let text = default_text_layer();
    let selected = text.base.id.clone();
    EditorState {
        canvas: CanvasState::default(),
        layers: vec![Layer::Text(text), Layer::Logo(default_logo_layer())],
        selected_layer_id: Some(selected),
        export: ExportSettings::default(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/defaults.rs"]
mod tests;
