use std::{cell::Cell, rc::Rc};

use super::*;
use crate::{
    layout::metrics::{LayoutInputs, layer_bounds},
    model::{
        canvas::{BackgroundType, GradientType},
        defaults::initial_state,
        layer::{LayerId, VerticalAlign},
    },
};

const FONT: &str = "tests/data/fonts/DejaVuSans.ttf";

fn solid_image(width: u32, height: u32, px: [u8; 4]) -> DecodedImage {
    DecodedImage {
        width,
        height,
        rgba8_premul: Arc::new(px.repeat((width * height) as usize)),
    }
}

fn pixel(c: &Compositor, x: u32, y: u32) -> [u8; 4] {
    c.surface().unwrap().pixel(x, y).unwrap().to_array()
}

fn close(a: [u8; 4], b: [u8; 4], tol: u8) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= tol)
}

fn counter(c: &mut Compositor) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let seen = Rc::clone(&count);
    c.subscribe(Box::new(move |_, _| seen.set(seen.get() + 1)));
    count
}

/// A document with the text layer hidden so pixels only come from what each test adds.
fn bare_state() -> EditorState {
    let mut state = initial_state();
    for layer in &mut state.layers {
        if let Layer::Text(t) = layer {
            t.base.is_visible = false;
        }
    }
    state
}

fn add_red_image(state: &mut EditorState, cache: &mut ImageCache) -> LayerId {
    cache.insert_decoded("red", solid_image(2, 1, [255, 0, 0, 255]));
    let id = state.add_image_layer("red", 2, 1).unwrap();
    state
        .set_layer_position(&id, Point::new(100.0, 100.0))
        .unwrap();
    id
}

fn image_mut<'a>(state: &'a mut EditorState, id: &LayerId) -> &'a mut ImageLayer {
    match state.layer_mut(id) {
        Some(Layer::Image(i)) => i,
        other => panic!("expected image layer, got {other:?}"),
    }
}

#[test]
fn solid_background_and_redundant_frames() {
    let state = bare_state();
    let cache = ImageCache::default();
    let mut text = TextEngine::new();
    let mut c = Compositor::default();
    let emitted = counter(&mut c);

    let out = c.render(&state, &cache, &mut text).unwrap();
    assert_eq!(out, RenderOutcome::Painted { changed: true });
    let surface = c.surface().unwrap();
    assert_eq!((surface.width, surface.height), (1200, 630));
    assert_eq!(pixel(&c, 5, 5), [248, 248, 248, 255]);
    assert_eq!(emitted.get(), 1);

    let out = c.render(&state, &cache, &mut text).unwrap();
    assert_eq!(out, RenderOutcome::Painted { changed: false });
    assert_eq!(emitted.get(), 1);

    let mut changed = state.clone();
    changed.canvas.bg_color = "#000000".to_owned();
    c.render(&changed, &cache, &mut text).unwrap();
    assert_eq!(pixel(&c, 5, 5), [0, 0, 0, 255]);
    assert_eq!(emitted.get(), 2);
}

#[test]
fn pending_background_paints_placeholder_without_emitting() {
    let mut state = bare_state();
    state.set_background_type(BackgroundType::Image);
    state.set_background_image(Some("bg".to_owned()));
    let mut cache = ImageCache::default();
    cache.sync(&state);
    let mut text = TextEngine::new();
    let mut c = Compositor::default();
    let emitted = counter(&mut c);

    assert_eq!(
        c.render(&state, &cache, &mut text).unwrap(),
        RenderOutcome::Loading
    );
    assert_eq!(emitted.get(), 0);
    assert_eq!(pixel(&c, 5, 5), [248, 248, 248, 255]);
    assert!(pixel(&c, 600, 315)[0] < 200, "loading dot missing");

    cache.insert_decoded("bg", solid_image(4, 4, [0, 0, 255, 255]));
    assert_eq!(
        c.render(&state, &cache, &mut text).unwrap(),
        RenderOutcome::Painted { changed: true }
    );
    assert_eq!(emitted.get(), 1);
    assert!(close(pixel(&c, 600, 315), [0, 0, 255, 255], 1));
}

#[test]
fn failed_background_falls_back_to_color_without_overlay() {
    let mut state = bare_state();
    state.set_background_type(BackgroundType::Image);
    state.set_background_image(Some("stored:gone".to_owned()));
    state.canvas.overlay.opacity = 1.0;
    let mut cache = ImageCache::new(1);
    cache.sync(&state);
    cache.resolve_pending(&crate::assets::source::ImageResolver::new());

    let mut c = Compositor::default();
    let out = c.render(&state, &cache, &mut TextEngine::new()).unwrap();
    assert_eq!(out, RenderOutcome::Painted { changed: true });
    assert_eq!(pixel(&c, 600, 315), [248, 248, 248, 255]);
}

#[test]
fn gradient_takes_overlay() {
    let mut state = bare_state();
    state.set_background_type(BackgroundType::Gradient);
    state.canvas.gradient.kind = GradientType::Radial;
    let cache = ImageCache::default();
    let mut c = Compositor::default();

    c.render(&state, &cache, &mut TextEngine::new()).unwrap();
    let before = pixel(&c, 600, 315);
    assert_ne!(before, [248, 248, 248, 255]);

    state.canvas.overlay.color = "#00FF00".to_owned();
    state.canvas.overlay.opacity = 1.0;
    c.render(&state, &cache, &mut TextEngine::new()).unwrap();
    assert!(close(pixel(&c, 600, 315), [0, 255, 0, 255], 1));
}

#[test]
fn image_layer_is_clipped_to_rounded_corners() {
    let mut state = bare_state();
    let mut cache = ImageCache::default();
    let id = add_red_image(&mut state, &mut cache);
    image_mut(&mut state, &id).border_radius = 50.0;

    let mut c = Compositor::default();
    c.render(&state, &cache, &mut TextEngine::new()).unwrap();
    assert!(close(pixel(&c, 200, 150), [255, 0, 0, 255], 1));
    assert!(close(pixel(&c, 102, 102), [248, 248, 248, 255], 1));
    assert!(close(pixel(&c, 90, 150), [248, 248, 248, 255], 1));
}

#[test]
fn opacity_and_visibility() {
    let mut state = bare_state();
    let mut cache = ImageCache::default();
    let id = add_red_image(&mut state, &mut cache);
    image_mut(&mut state, &id).base.opacity = 0.5;

    let mut c = Compositor::default();
    c.render(&state, &cache, &mut TextEngine::new()).unwrap();
    assert!(close(pixel(&c, 200, 150), [252, 124, 124, 255], 3));

    state.toggle_visibility(&id).unwrap();
    c.render(&state, &cache, &mut TextEngine::new()).unwrap();
    assert_eq!(pixel(&c, 200, 150), [248, 248, 248, 255]);
}

#[test]
fn rotation_pivots_on_the_box_center() {
    let mut state = bare_state();
    let mut cache = ImageCache::default();
    let id = add_red_image(&mut state, &mut cache);
    image_mut(&mut state, &id).base.rotation = 90.0;

    let mut c = Compositor::default();
    c.render(&state, &cache, &mut TextEngine::new()).unwrap();
    // 200x100 box centered on (200,150) turns into 100x200.
    assert!(close(pixel(&c, 200, 60), [255, 0, 0, 255], 1));
    assert!(close(pixel(&c, 110, 150), [248, 248, 248, 255], 1));
}

#[test]
fn image_shadow_is_painted_beneath() {
    let mut state = bare_state();
    let mut cache = ImageCache::default();
    let id = add_red_image(&mut state, &mut cache);
    let shadow = &mut image_mut(&mut state, &id).shadow;
    shadow.enabled = true;
    shadow.offset_x = 20.0;
    shadow.offset_y = 20.0;
    shadow.blur_radius = 0.0;

    let mut c = Compositor::default();
    c.render(&state, &cache, &mut TextEngine::new()).unwrap();
    assert!(pixel(&c, 310, 210)[0] < 30);
    assert!(close(pixel(&c, 200, 150), [255, 0, 0, 255], 1));
}

#[test]
fn huge_blur_values_still_render() {
    let mut state = bare_state();
    state.set_canvas_size(64, 32).unwrap();
    let mut cache = ImageCache::default();
    let id = add_red_image(&mut state, &mut cache);
    state.set_layer_position(&id, Point::new(8.0, 8.0)).unwrap();
    let shadow = &mut image_mut(&mut state, &id).shadow;
    shadow.enabled = true;
    shadow.blur_radius = 1e10;

    let mut c = Compositor::default();
    let out = c.render(&state, &cache, &mut TextEngine::new()).unwrap();
    assert_eq!(out, RenderOutcome::Painted { changed: true });
    assert!(close(pixel(&c, 40, 20), [255, 0, 0, 255], 1));

    state.set_background_type(BackgroundType::Image);
    state.set_background_image(Some("bg".to_owned()));
    state.canvas.bg_image_filters.blur = 2e8;
    cache.insert_decoded("bg", solid_image(4, 4, [0, 0, 255, 255]));
    let out = c.render(&state, &cache, &mut TextEngine::new()).unwrap();
    assert_eq!(out, RenderOutcome::Painted { changed: true });
    let corner = pixel(&c, 1, 1);
    assert!(corner[0] < 10 && corner[2] > 60, "{corner:?}");
}

#[test]
fn corner_logo_is_drawn_at_its_anchor() {
    let mut state = bare_state();
    let mut cache = ImageCache::default();
    cache.insert_decoded("logo", solid_image(10, 5, [0, 0, 255, 255]));
    for layer in &mut state.layers {
        if let Layer::Logo(l) = layer {
            l.src = Some("logo".to_owned());
        }
    }

    let mut c = Compositor::default();
    c.render(&state, &cache, &mut TextEngine::new()).unwrap();
    // 150x75 at (1030, 535).
    assert!(close(pixel(&c, 1100, 570), [0, 0, 255, 255], 1));
    assert_eq!(pixel(&c, 1020, 570), [248, 248, 248, 255]);
}

#[test]
fn pending_layer_images_are_omitted() {
    let mut state = bare_state();
    state.add_image_layer("stored:later", 2, 1).unwrap();
    let mut cache = ImageCache::default();
    cache.sync(&state);
    let mut c = Compositor::default();
    let out = c.render(&state, &cache, &mut TextEngine::new()).unwrap();
    assert_eq!(out, RenderOutcome::Painted { changed: true });
    assert_eq!(pixel(&c, 600, 315), [248, 248, 248, 255]);
}

#[test]
fn impossible_canvas_is_an_error() {
    let mut state = bare_state();
    state.canvas.canvas_width = 0;
    let err = Compositor::default()
        .render(&state, &ImageCache::default(), &mut TextEngine::new())
        .unwrap_err();
    assert!(matches!(err, CardError::Validation(_)));
}

fn dark_pixels(c: &Compositor, area: Rect) -> usize {
    let s = c.surface().unwrap();
    let x0 = area.x0.max(0.0) as u32;
    let y0 = area.y0.max(0.0) as u32;
    let x1 = (area.x1.min(f64::from(s.width))) as u32;
    let y1 = (area.y1.min(f64::from(s.height))) as u32;
    (y0..y1)
        .flat_map(|y| (x0..x1).map(move |x| (x, y)))
        .filter(|&(x, y)| s.pixel(x, y).is_some_and(|p| p.r < 128))
        .count()
}

#[test]
fn text_is_drawn_inside_its_bounds() {
    let mut text = TextEngine::new();
    text.register_font_file(std::path::Path::new(FONT), Some("Inter")).unwrap();

    let mut state = initial_state();
    state.canvas.bg_color = "#FFFFFF".to_owned();
    let id = state.first_text().unwrap().base.id.clone();
    if let Some(Layer::Text(t)) = state.layer_mut(&id) {
        t.vertical_align = VerticalAlign::Top;
        t.text_color = "#000000".to_owned();
    }
    let cache = ImageCache::default();
    let mut c = Compositor::default();
    c.render(&state, &cache, &mut text).unwrap();

    let layer = state.layer(&id).unwrap();
    let inputs = LayoutInputs {
        canvas: &state.canvas,
        images: &cache,
    };
    let bounds = layer_bounds(layer, &inputs, &mut text).unwrap();
    let inside = dark_pixels(&c, bounds);
    assert!(inside > 100, "only {inside} dark pixels");
    let below = Rect::new(bounds.x0, bounds.y1 + 10.0, bounds.x1, bounds.y1 + 60.0);
    assert_eq!(dark_pixels(&c, below), 0);

    if let Some(Layer::Text(t)) = state.layer_mut(&id) {
        t.text_shadow.enabled = true;
        t.text_shadow.offset_y = 60.0;
        t.text_shadow.blur_radius = 0.0;
    }
    c.render(&state, &cache, &mut text).unwrap();
    assert!(dark_pixels(&c, below) > 0);
}
