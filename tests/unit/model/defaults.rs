use super::*;

#[test]
fn generated_ids_are_unique_and_prefixed() {
    let a = generate_id("text");
    let b = generate_id("text");
    assert_ne!(a, b);
    assert!(a.as_str().starts_with("text-"));
    assert_eq!(a.as_str().split('-').count(), 3);
}

#[test]
fn initial_state_has_text_and_logo() {
    let state = initial_state();
    assert_eq!(state.count_kind(LayerKind::Text), 1);
    assert_eq!(state.count_kind(LayerKind::Logo), 1);
    assert_eq!(
        state.selected_layer().map(Layer::kind),
        Some(LayerKind::Text)
    );
    let logo = state.logo().unwrap();
    assert!(logo.src.is_none());
    assert!(!logo.is_freely_positioned);
}

#[test]
fn image_layer_height_follows_aspect() {
    let canvas = CanvasState::default();
    let img = new_image_layer("a.png", 2.0, 3, &canvas);
    assert_eq!(img.width, 200.0);
    assert_eq!(img.height, 100.0);
    assert_eq!(img.base.x, 500.0);
    assert_eq!(img.base.y, 265.0);

    let fallback = new_image_layer("a.png", f64::NAN, 3, &canvas);
    assert_eq!(fallback.original_aspect_ratio, FALLBACK_IMAGE_ASPECT);
}

#[test]
fn new_text_layer_sits_a_tenth_in() {
    let canvas = CanvasState::default();
    let t = new_text_layer("", 4, &canvas);
    assert_eq!((t.base.x, t.base.y), (120.0, 63.0));
    assert_eq!(t.content, "New text layer");
    assert_eq!(t.base.z_index, 4);
}
