//! Turning untyped, possibly stale or hand-edited JSON into a valid [`EditorState`].
//!
//! Loading never fails: unknown fields are ignored, fields that do not deserialize keep their
//! defaults, and the document invariants (one text layer present on load, exactly one logo,
//! a valid selection) are restored.

use std::collections::HashSet;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::model::{
    canvas::{CanvasState, ExportFormat, ExportSettings, GradientState, ImageFilters, OverlayState},
    defaults::{
        DEFAULT_IMAGE_WIDTH, FALLBACK_IMAGE_ASPECT, default_layer, default_logo_layer,
        default_text_layer, generate_id, initial_state,
    },
    layer::{Layer, LayerId, LayerKind, Shadow},
    state::EditorState,
};

const CANVAS_KEYS: &[&str] = &[
    "backgroundType",
    "bgColor",
    "bgImage",
    "canvasWidth",
    "canvasHeight",
];

/// Parse and reconcile a persisted document. Unparsable text yields the initial state.
pub fn reconcile_str(text: &str) -> EditorState {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => reconcile(value),
        Err(err) => {
            tracing::warn!(error = %err, "unparsable document, starting from defaults");
            initial_state()
        }
    }
}

/// Merge a loaded document onto the defaults and restore every document invariant.
///
/// Reconciling an already valid state returns it unchanged.
#[tracing::instrument(skip_all)]
pub fn reconcile(value: Value) -> EditorState {
    let Value::Object(obj) = value else {
        tracing::warn!("document is not a JSON object, starting from defaults");
        return initial_state();
    };

    let canvas = reconcile_canvas(&obj);
    let export = reconcile_export(&obj);

    let mut layers = match obj.get("layers") {
        Some(Value::Array(raw)) => {
            let mut seen = HashSet::new();
            raw.iter()
                .filter_map(|l| reconcile_layer(l, &canvas, &mut seen))
                .collect()
        }
        Some(other) => {
            tracing::warn!(found = %json_kind(other), "layers is not an array, using defaults");
            initial_state().layers
        }
        None => initial_state().layers,
    };
    ensure_required_layers(&mut layers);

    let selected_layer_id = match obj.get("selectedLayerId") {
        Some(Value::String(s)) if !s.is_empty() => Some(LayerId::new(s.as_str())),
        _ => None,
    };

    let mut state = EditorState {
        canvas,
        layers,
        selected_layer_id,
        export,
    };
    state.heal_selection();
    state
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Number or numeric string, as a loose JSON number coercion would read it.
fn coerce_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// A present, non-zero number; missing, zero and garbage all count as unset.
fn truthy_number(v: Option<&Value>) -> Option<f64> {
    v.and_then(coerce_number).filter(|n| *n != 0.0)
}

/// Apply `overrides` onto `base` one key at a time, skipping keys whose value would not
/// deserialize. `null` counts as absent.
fn merge_valid<T>(base: T, overrides: &Map<String, Value>, keys: Option<&[&str]>, what: &str) -> T
where
    T: Serialize + DeserializeOwned,
{
    let Ok(Value::Object(mut current)) = serde_json::to_value(&base) else {
        return base;
    };
    let mut out = base;
    for (key, value) in overrides {
        if value.is_null() || keys.is_some_and(|k| !k.contains(&key.as_str())) {
            continue;
        }
        let mut candidate = current.clone();
        candidate.insert(key.clone(), value.clone());
        match serde_json::from_value::<T>(Value::Object(candidate.clone())) {
            Ok(parsed) => {
                current = candidate;
                out = parsed;
            }
            Err(err) => {
                tracing::warn!(%what, field = %key, error = %err, "ignoring invalid field");
            }
        }
    }
    out
}

fn nested_object<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    obj.get(key).and_then(Value::as_object)
}

fn reconcile_canvas(obj: &Map<String, Value>) -> CanvasState {
    let defaults = CanvasState::default();
    let mut canvas = merge_valid(defaults.clone(), obj, Some(CANVAS_KEYS), "canvas");

    if let Some(gradient) = nested_object(obj, "gradient") {
        canvas.gradient = merge_valid(GradientState::default(), gradient, None, "gradient");
    }
    if let Some(overlay) = nested_object(obj, "overlay") {
        canvas.overlay = merge_valid(OverlayState::default(), overlay, None, "overlay");
    }

    let filters = nested_object(obj, "bgImageFilters");
    let filter = |key: &str, fallback: f64| {
        filters
            .and_then(|f| f.get(key))
            .and_then(coerce_number)
            .unwrap_or(fallback)
    };
    canvas.bg_image_filters = ImageFilters {
        blur: filter("blur", ImageFilters::NEUTRAL.blur),
        brightness: filter("brightness", ImageFilters::NEUTRAL.brightness),
        contrast: filter("contrast", ImageFilters::NEUTRAL.contrast),
    };

    let max = u32::from(u16::MAX);
    if !(1..=max).contains(&canvas.canvas_width) || !(1..=max).contains(&canvas.canvas_height) {
        tracing::warn!(
            width = canvas.canvas_width,
            height = canvas.canvas_height,
            "canvas size out of range, using defaults"
        );
        canvas.canvas_width = defaults.canvas_width;
        canvas.canvas_height = defaults.canvas_height;
    }
    canvas.bg_image = canvas.bg_image.filter(|s| !s.is_empty());
    canvas
}

fn reconcile_export(obj: &Map<String, Value>) -> ExportSettings {
    let defaults = ExportSettings::default();
    let export_format = obj
        .get("exportFormat")
        .and_then(|v| serde_json::from_value::<ExportFormat>(v.clone()).ok())
        .unwrap_or(defaults.export_format);
    let jpeg_quality = truthy_number(obj.get("jpegQuality"))
        .map(|q| q.clamp(0.0, 1.0))
        .filter(|q| *q > 0.0)
        .unwrap_or(defaults.jpeg_quality);
    let include_transparency = obj
        .get("includeTransparency")
        .and_then(Value::as_bool)
        .unwrap_or(defaults.include_transparency);
    ExportSettings {
        export_format,
        jpeg_quality,
        include_transparency,
    }
}

fn shadow_key(kind: LayerKind) -> Option<&'static str> {
    match kind {
        LayerKind::Text => Some("textShadow"),
        LayerKind::Image => Some("shadow"),
        LayerKind::Logo => None,
    }
}

/// Deep-merge one stored layer onto the default layer of its type.
///
/// Fields are taken one at a time: a field that does not deserialize keeps its default and the
/// rest of the layer survives. Only non-objects and unknown types are dropped.
fn reconcile_layer(
    raw: &Value,
    canvas: &CanvasState,
    seen: &mut HashSet<LayerId>,
) -> Option<Layer> {
    let Some(incoming) = raw.as_object() else {
        tracing::warn!(found = %json_kind(raw), "dropping non-object layer");
        return None;
    };
    let kind = match incoming
        .get("type")
        .and_then(|t| serde_json::from_value::<LayerKind>(t.clone()).ok())
    {
        Some(kind) => kind,
        None => {
            tracing::warn!(layer_type = ?incoming.get("type"), "dropping layer of unknown type");
            return None;
        }
    };

    let mut overrides = incoming.clone();
    overrides.remove("type");
    if let Some(key) = shadow_key(kind) {
        match overrides.remove(key) {
            Some(Value::Object(from)) => {
                let shadow = merge_valid(Shadow::default(), &from, None, "shadow");
                if let Ok(value) = serde_json::to_value(shadow) {
                    overrides.insert(key.to_owned(), value);
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => tracing::warn!(%kind, field = %key, "ignoring non-object shadow"),
        }
    }

    if kind == LayerKind::Image {
        let ratio = truthy_number(incoming.get("originalAspectRatio"))
            .filter(|r| *r > 0.0)
            .unwrap_or(FALLBACK_IMAGE_ASPECT);
        let width = truthy_number(incoming.get("width")).unwrap_or(DEFAULT_IMAGE_WIDTH);
        let height = truthy_number(incoming.get("height")).unwrap_or(width / ratio);
        overrides.insert("originalAspectRatio".to_owned(), Value::from(ratio));
        overrides.insert("width".to_owned(), Value::from(width));
        overrides.insert("height".to_owned(), Value::from(height));
    }

    let mut layer = merge_valid(default_layer(kind, canvas), &overrides, None, kind.as_str());

    let id = layer.id();
    if id.as_str().is_empty() || seen.contains(id) {
        layer.base_mut().id = generate_id(kind.id_prefix());
    }
    seen.insert(layer.id().clone());
    Some(layer)
}

/// At least one text layer (prepended) and exactly one logo (the first one wins).
fn ensure_required_layers(layers: &mut Vec<Layer>) {
    let mut logo_seen = false;
    layers.retain(|l| {
        if l.kind() != LayerKind::Logo {
            return true;
        }
        if logo_seen {
            tracing::warn!(layer = %l.id(), "dropping extra logo layer");
            return false;
        }
        logo_seen = true;
        true
    });

    if !layers.iter().any(|l| l.kind() == LayerKind::Text) {
        layers.insert(0, Layer::Text(default_text_layer()));
    }
    if !logo_seen {
        layers.push(Layer::Logo(default_logo_layer()));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/reconcile.rs"]
mod tests;
