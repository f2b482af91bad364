use super::*;
use crate::model::{
    defaults::{default_logo_layer, default_text_layer, new_image_layer},
    layer::LogoLayer,
};

fn text(content: &str) -> TextLayer {
    let mut t = default_text_layer();
    t.content = content.to_owned();
    t.font_size = 10.0;
    t
}

fn fixed() -> FixedAdvanceMeasure {
    // 10px font -> 10px per char.
    FixedAdvanceMeasure { advance_em: 1.0 }
}

#[test]
fn fixed_measure_adds_spacing_between_chars() {
    let mut m = fixed();
    let mut font = FontSpec::for_layer(&text("x"));
    font.letter_spacing = 2.0;
    assert_eq!(m.measure("abc", &font), 30.0 + 4.0);
    assert_eq!(m.measure("", &font), 0.0);
}

#[test]
fn empty_content_has_no_lines_and_no_bounds() {
    let layer = Layer::Text(text(""));
    let canvas = CanvasState::default();
    let inputs = LayoutInputs {
        canvas: &canvas,
        images: &NoImages,
    };
    assert!(layer_bounds(&layer, &inputs, &mut fixed()).is_none());
}

#[test]
fn wraps_greedily_at_fixed_width() {
    let mut t = text("aa bb cc dd");
    t.width = Some(60.0);
    // "aa bb" = 50 < 60, "aa bb cc" = 80
    let lines = wrapped_lines(&t, 1200.0, &mut fixed());
    assert_eq!(lines, vec!["aa bb", "cc dd"]);
}

#[test]
fn wrapped_lines_never_exceed_width_unless_single_word() {
    let mut t = text("a bbbbbbbbbbbb cc ddd eeee f gggggg hh i jjjjjjjjjjjjjjjjj k");
    for width in [10.0, 25.0, 40.0, 55.0, 90.0, 130.0] {
        t.width = Some(width);
        let mut m = fixed();
        let font = FontSpec::for_layer(&t);
        let lines = wrapped_lines(&t, 1200.0, &mut m);
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, t.content, "no word is split or dropped");
        for line in &lines {
            let w = m.measure(line, &font);
            assert!(
                w < width || !line.contains(' '),
                "line {line:?} is {w}px wide at max {width}"
            );
        }
    }
}

#[test]
fn derived_width_depends_on_alignment_and_floors_at_font_size() {
    let mut t = text("x");
    t.base.x = 100.0;
    assert_eq!(max_line_width(&t, 1200.0), 1200.0 - 100.0 - 80.0);
    t.text_align = TextAlign::Center;
    assert_eq!(max_line_width(&t, 1200.0), 1200.0 - 160.0);
    t.text_align = TextAlign::Left;
    t.base.x = 1190.0;
    assert_eq!(max_line_width(&t, 1200.0), 10.0);
}

#[test]
fn text_box_shifts_with_alignment() {
    let mut t = text("abcd efgh");
    t.width = Some(50.0);
    t.line_height_multiplier = 1.5;
    t.base.x = 200.0;
    t.base.y = 100.0;
    t.text_align = TextAlign::Center;
    t.vertical_align = VerticalAlign::Middle;
    let block = text_block(&t, 1200.0, &mut fixed());
    assert_eq!(block.lines.len(), 2);
    assert_eq!(block.size.width, 40.0);
    assert_eq!(block.size.height, 10.0 * 1.5 + 10.0);
    assert_eq!(block.origin, Point::new(180.0, 100.0 - 12.5));

    t.text_align = TextAlign::Right;
    t.vertical_align = VerticalAlign::Bottom;
    let block = text_block(&t, 1200.0, &mut fixed());
    assert_eq!(block.origin, Point::new(160.0, 75.0));
}

fn logo_with_src() -> LogoLayer {
    let mut l = default_logo_layer();
    l.src = Some("logo.png".to_owned());
    l
}

#[test]
fn logo_corner_positions_use_margin() {
    let canvas = CanvasState::default();
    let mut dims = HashMap::new();
    dims.insert("logo.png".to_owned(), (300u32, 100u32));
    let inputs = LayoutInputs {
        canvas: &canvas,
        images: &dims,
    };

    let mut logo = logo_with_src();
    let r = layer_bounds(&Layer::Logo(logo.clone()), &inputs, &mut fixed()).unwrap();
    assert_eq!(r, Rect::new(1030.0, 560.0, 1180.0, 610.0));

    logo.corner_position = CornerPosition::TopLeft;
    let r = layer_bounds(&Layer::Logo(logo.clone()), &inputs, &mut fixed()).unwrap();
    assert_eq!(r.origin(), Point::new(20.0, 20.0));

    logo.is_freely_positioned = true;
    logo.base.x = 7.0;
    logo.base.y = 9.0;
    let r = layer_bounds(&Layer::Logo(logo), &inputs, &mut fixed()).unwrap();
    assert_eq!(r.origin(), Point::new(7.0, 9.0));
}

#[test]
fn logo_without_image_has_no_geometry() {
    let canvas = CanvasState::default();
    let inputs = LayoutInputs {
        canvas: &canvas,
        images: &NoImages,
    };
    assert!(layer_bounds(&Layer::Logo(default_logo_layer()), &inputs, &mut fixed()).is_none());
    assert!(layer_bounds(&Layer::Logo(logo_with_src()), &inputs, &mut fixed()).is_none());
}

#[test]
fn image_bounds_are_stored_box() {
    let canvas = CanvasState::default();
    let mut img = new_image_layer("a.png", 2.0, 1, &canvas);
    img.base.x = 10.0;
    img.base.y = 20.0;
    let inputs = LayoutInputs {
        canvas: &canvas,
        images: &NoImages,
    };
    let r = layer_bounds(&Layer::Image(img), &inputs, &mut fixed()).unwrap();
    assert_eq!(r, Rect::new(10.0, 20.0, 210.0, 120.0));
}

#[test]
fn rotated_containment_matches_transform() {
    let bounds = Rect::new(0.0, 0.0, 200.0, 50.0);
    assert!(rotated_box_contains(bounds, 0.0, Point::new(199.0, 49.0)));
    assert!(!rotated_box_contains(bounds, 0.0, Point::new(201.0, 25.0)));

    let canvas = CanvasState::default();
    let mut img = new_image_layer("a.png", 4.0, 1, &canvas);
    img.base.x = 0.0;
    img.base.y = 0.0;
    img.base.rotation = 30.0;
    let layer = Layer::Image(img);
    let corner = layer_transform(&layer, bounds) * Point::new(200.0, 50.0);
    assert!(rotated_box_contains(bounds, 30.0, corner));
    assert!(!rotated_box_contains(bounds, 30.0, Point::new(200.0, 50.0)));
}
