use std::collections::HashMap;

use super::*;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn defaults() {
    let cfg = EditorConfig::default();
    assert_eq!(cfg.grid_density, 5);
    assert_eq!(cfg.snap, SnapMode::None);
    assert_eq!(cfg.max_decode_attempts, 3);
    assert_eq!(cfg.shadow_sigma_scale, 0.5);
    assert!(cfg.assets_root.is_none());
    assert_eq!(EditorConfig::from_lookup(lookup(&[])), cfg);
}

#[test]
fn env_overrides_and_invalid_values() {
    let cfg = EditorConfig::from_lookup(lookup(&[
        (ENV_GRID_DENSITY, "10"),
        (ENV_MAX_DECODE_ATTEMPTS, " 7 "),
        (ENV_ASSETS_ROOT, "/srv/assets"),
    ]));
    assert_eq!(cfg.grid_density, 10);
    assert_eq!(cfg.max_decode_attempts, 7);
    assert_eq!(cfg.assets_root, Some(PathBuf::from("/srv/assets")));

    let cfg = EditorConfig::from_lookup(lookup(&[
        (ENV_GRID_DENSITY, "0"),
        (ENV_MAX_DECODE_ATTEMPTS, "lots"),
        (ENV_ASSETS_ROOT, "  "),
    ]));
    assert_eq!(cfg, EditorConfig::default());
}

#[test]
fn builders_clamp() {
    let cfg = EditorConfig::default()
        .with_grid_density(0)
        .with_max_decode_attempts(0)
        .with_shadow_sigma_scale(f64::NAN)
        .with_snap(SnapMode::Both)
        .with_assets_root("a");
    assert_eq!(cfg.grid_density, 1);
    assert_eq!(cfg.max_decode_attempts, 1);
    assert_eq!(cfg.shadow_sigma_scale, 0.5);
    assert_eq!(cfg.compositor_opts().shadow_sigma_scale, 0.5);
    assert_eq!(cfg.controller().snap(), SnapMode::Both);
    assert_eq!(cfg.controller().grid_density(), 1);
}
