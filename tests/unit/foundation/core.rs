use super::*;

#[test]
fn premul_scales_color_channels() {
    let c = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(c.a, 128);
    assert_eq!(c.r, 128);
    assert_eq!(c.g, 64);
    assert_eq!(c.b, 0);
}

#[test]
fn surface_rejects_empty_and_oversized() {
    assert!(Surface::new(0, 10).is_err());
    assert!(Surface::new(10, 0).is_err());
    assert!(Surface::new(70_000, 1).is_err());
}

#[test]
fn surface_pixel_bounds() {
    let s = Surface::new(2, 2).unwrap();
    assert_eq!(s.data.len(), 16);
    assert_eq!(s.pixel(1, 1), Some(Rgba8Premul::transparent()));
    assert_eq!(s.pixel(2, 0), None);
}
