use std::{cell::RefCell, rc::Rc};

use super::*;
use crate::layout::metrics::{FixedAdvanceMeasure, NoImages};

fn counting(doc: &mut Document) -> Rc<RefCell<u32>> {
    let count = Rc::new(RefCell::new(0));
    let c = Rc::clone(&count);
    doc.subscribe(Box::new(move |_| *c.borrow_mut() += 1));
    count
}

#[test]
fn successful_changes_notify_once() {
    let mut doc = Document::default();
    let count = counting(&mut doc);
    let id = doc.add_text_layer("hello");
    assert_eq!(*count.borrow(), 1);
    doc.toggle_visibility(&id).unwrap();
    assert_eq!(*count.borrow(), 2);
    assert_eq!(doc.revision(), 2);
}

#[test]
fn failed_and_noop_mutations_stay_silent() {
    let mut doc = Document::default();
    let count = counting(&mut doc);
    let logo = doc.state().logo().unwrap().base.id.clone();
    assert!(doc.delete_layer(&logo).is_err());
    // The logo is already on top.
    doc.move_layer(&logo, MoveDirection::Up).unwrap();
    doc.reorder_layers(0, 0).unwrap();
    assert_eq!(*count.borrow(), 0);
    assert_eq!(doc.revision(), 0);
}

#[test]
fn unsubscribe_stops_notifications() {
    let mut doc = Document::default();
    let count = Rc::new(RefCell::new(0));
    let c = Rc::clone(&count);
    let sub = doc.subscribe(Box::new(move |_| *c.borrow_mut() += 1));
    assert!(doc.unsubscribe(sub));
    assert!(!doc.unsubscribe(sub));
    doc.add_text_layer("x");
    assert_eq!(*count.borrow(), 0);
}

#[test]
fn mutate_rolls_back_on_error() {
    let mut doc = Document::default();
    let before = doc.state().clone();
    let result: CardResult<()> = doc.mutate(|s| {
        s.canvas.bg_color = "#000000".to_owned();
        Err(CardError::validation("nope"))
    });
    assert!(result.is_err());
    assert_eq!(doc.state(), &before);
}

#[test]
fn background_edits_notify_only_on_change() {
    let mut doc = Document::default();
    let count = counting(&mut doc);
    doc.set_background_type(BackgroundType::Image);
    doc.set_background_image(Some("bg.png".to_owned()));
    assert_eq!(*count.borrow(), 2);

    doc.set_background_image(Some("bg.png".to_owned()));
    assert_eq!(*count.borrow(), 2);

    let dropped = doc.set_background_type(BackgroundType::Solid);
    assert_eq!(dropped.as_deref(), Some("bg.png"));
    assert_eq!(*count.borrow(), 3);
    assert_eq!(doc.clear_background_image(), None);
    assert_eq!(*count.borrow(), 3);

    doc.apply_brand_color_to_canvas(CanvasBrandTarget::Gradient1);
    assert_eq!(*count.borrow(), 3, "gradient stops are inactive");
    doc.apply_brand_color_to_canvas(CanvasBrandTarget::BgColor);
    assert_eq!(*count.borrow(), 4);
}

#[test]
fn loading_always_reconciles() {
    let doc = Document::from_json_str(r#"{"layers": [{"type": "image", "src": "a.png"}]}"#);
    assert_eq!(doc.state().count_kind(LayerKind::Logo), 1);
    assert_eq!(doc.state().count_kind(LayerKind::Text), 1);
    assert!(doc.state().selected_layer().is_some());
    let again = Document::from_value(doc.to_value().unwrap());
    assert_eq!(again.state(), doc.state());
}

#[test]
fn brand_kit_colors_flow_through() {
    let mut doc = Document::default();
    doc.set_brand_kit(BrandKit {
        color1: "#00FF00".to_owned(),
        color2: "#0000FF".to_owned(),
    });
    let text = doc.state().first_text().unwrap().base.id.clone();
    doc.apply_brand_color(&text, BrandTarget::TextColor, BrandSlot::Secondary)
        .unwrap();
    doc.apply_brand_color_to_canvas(CanvasBrandTarget::BgColor);
    assert_eq!(doc.state().first_text().unwrap().text_color, "#0000FF");
    assert_eq!(doc.state().canvas.bg_color, "#00FF00");
}

#[test]
fn pointer_flow_selects_then_drags() {
    let mut doc = Document::default();
    let id = doc.add_text_layer("Hi");
    doc.select_layer(None).unwrap();
    let mut ctl = InteractionController::default();
    let mut m = FixedAdvanceMeasure::default();
    // New text layers sit at (120, 63) top-left aligned, 48px: box 57.6 x 48.
    let inside = Point::new(130.0, 80.0);

    let action = doc
        .apply_pointer_down(&mut ctl, inside, &NoImages, &mut m)
        .unwrap();
    assert_eq!(action, PointerAction::Select(id.clone()));
    assert_eq!(doc.state().selected_layer_id.as_ref(), Some(&id));

    let action = doc
        .apply_pointer_down(&mut ctl, inside, &NoImages, &mut m)
        .unwrap();
    assert_eq!(action, PointerAction::DragStarted(id.clone()));
    doc.apply_pointer_move(&mut ctl, Point::new(140.0, 90.0), &NoImages, &mut m)
        .unwrap();
    doc.apply_pointer_up(&mut ctl);

    let base = doc.state().layer(&id).unwrap().base();
    assert_eq!((base.x, base.y), (130.0, 73.0));
    assert!(!ctl.is_dragging());
}

#[test]
fn dragging_a_corner_logo_pins_it_in_place() {
    let mut doc = Document::default();
    let logo = doc.state().logo().unwrap().base.id.clone();
    doc.update_layer_json(&logo, &serde_json::json!({"src": "logo.png"}))
        .unwrap();
    doc.select_layer(Some(&logo)).unwrap();
    let images: std::collections::HashMap<String, (u32, u32)> =
        [("logo.png".to_owned(), (150, 150))].into();
    let mut ctl = InteractionController::default();
    let mut m = FixedAdvanceMeasure::default();

    // 150x150 at bottom-right: origin (1030, 460).
    doc.apply_pointer_down(&mut ctl, Point::new(1100.0, 500.0), &images, &mut m)
        .unwrap();
    let Some(Layer::Logo(l)) = doc.state().layer(&logo) else {
        panic!("expected logo");
    };
    assert!(l.is_freely_positioned);
    assert_eq!((l.base.x, l.base.y), (1030.0, 460.0));

    doc.apply_pointer_move(&mut ctl, Point::new(1090.0, 490.0), &images, &mut m)
        .unwrap();
    let base = doc.state().layer(&logo).unwrap().base();
    assert_eq!((base.x, base.y), (1020.0, 450.0));
}
