use super::*;

#[test]
fn fnv_is_stable_for_same_input() {
    let mut a = Fnv1a64::new_default();
    let mut b = Fnv1a64::new_default();
    a.write_str("layer");
    b.write_str("layer");
    assert_eq!(a.finish(), b.finish());

    let mut c = Fnv1a64::new_default();
    c.write_str("layex");
    assert_ne!(a.finish(), c.finish());
}

#[test]
fn premultiply_round_trips_opaque_and_zero_alpha() {
    let mut px = vec![200u8, 100, 50, 255, 9, 9, 9, 0];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[..4], &[200, 100, 50, 255]);
    assert_eq!(&px[4..], &[0, 0, 0, 0]);
}

#[test]
fn unpremultiply_restores_half_alpha_approximately() {
    let mut px = vec![200u8, 100, 50, 128];
    premultiply_rgba8_in_place(&mut px);
    unpremultiply_rgba8_in_place(&mut px);
    assert!((i32::from(px[0]) - 200).abs() <= 2);
    assert!((i32::from(px[1]) - 100).abs() <= 2);
    assert_eq!(px[3], 128);
}

#[test]
fn finite_or_replaces_nan() {
    assert_eq!(finite_or(f64::NAN, 100.0), 100.0);
    assert_eq!(finite_or(3.0, 100.0), 3.0);
}
