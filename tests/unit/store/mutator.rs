use super::*;

fn logo_id(state: &EditorState) -> LayerId {
    state.logo().unwrap().base.id.clone()
}

fn text_id(state: &EditorState) -> LayerId {
    state.first_text().unwrap().base.id.clone()
}

fn zs(state: &EditorState) -> Vec<i64> {
    state.layers.iter().map(Layer::z_index).collect()
}

#[test]
fn add_layer_goes_on_top_and_is_selected() {
    let mut state = EditorState::default();
    let id = state.add_layer(LayerKind::Text, Some("Second")).unwrap();
    assert_eq!(state.layer(&id).unwrap().z_index(), 3);
    assert_eq!(state.selected_layer_id.as_ref(), Some(&id));
    assert_eq!(state.topmost().unwrap().id(), &id);

    let mut empty = EditorState::default();
    empty.layers.clear();
    let id = empty.add_layer(LayerKind::Text, None).unwrap();
    assert_eq!(empty.layer(&id).unwrap().z_index(), 0);
}

#[test]
fn second_logo_and_srcless_image_are_rejected() {
    let mut state = EditorState::default();
    assert!(matches!(
        state.add_layer(LayerKind::Logo, None),
        Err(CardError::InvalidMutation(_))
    ));
    assert!(state.add_layer(LayerKind::Image, None).is_err());
    assert_eq!(state.layers.len(), 2);
}

#[test]
fn update_merges_fields_without_touching_others() {
    let mut state = EditorState::default();
    let id = text_id(&state);
    state
        .update_layer(
            &id,
            LayerPatch::text(TextPatch {
                content: Some("Changed".to_owned()),
                text_shadow: Some(ShadowPatch {
                    enabled: Some(true),
                    ..ShadowPatch::default()
                }),
                ..TextPatch::default()
            }),
        )
        .unwrap();
    let Layer::Text(t) = state.layer(&id).unwrap() else {
        panic!("text layer changed kind");
    };
    assert_eq!(t.content, "Changed");
    assert!(t.text_shadow.enabled);
    assert_eq!(t.text_shadow.blur_radius, 4.0);
    assert_eq!(t.font_size, 90.0);
}

#[test]
fn type_change_is_rejected_without_state_change() {
    let mut state = EditorState::default();
    let id = text_id(&state);
    let before = state.clone();

    let err = state
        .update_layer(&id, LayerPatch::logo(LogoPatch::default()))
        .unwrap_err();
    assert!(matches!(err, CardError::InvalidMutation(_)));

    let err = state
        .update_layer_json(&id, &serde_json::json!({"type": "image", "x": 5}))
        .unwrap_err();
    assert!(matches!(err, CardError::InvalidMutation(_)));
    assert_eq!(state, before);
}

#[test]
fn json_patch_ignores_id_and_applies_fields() {
    let mut state = EditorState::default();
    let id = text_id(&state);
    state
        .update_layer_json(
            &id,
            &serde_json::json!({"id": "hijack", "type": "text", "x": 5, "italic": true, "width": 300}),
        )
        .unwrap();
    let Layer::Text(t) = state.layer(&id).unwrap() else {
        panic!("text layer changed kind");
    };
    assert_eq!(t.base.x, 5.0);
    assert!(t.italic);
    assert_eq!(t.width, Some(300.0));

    state
        .update_layer_json(&id, &serde_json::json!({"width": null}))
        .unwrap();
    let Layer::Text(t) = state.layer(&id).unwrap() else {
        panic!("text layer changed kind");
    };
    assert_eq!(t.width, None);
}

#[test]
fn unknown_layer_is_an_error() {
    let mut state = EditorState::default();
    let err = state
        .update_layer(&LayerId::from("nope"), LayerPatch::position(1.0, 2.0))
        .unwrap_err();
    assert!(matches!(err, CardError::UnknownLayer(_)));
}

#[test]
fn shadow_field_targets_the_kind_specific_shadow() {
    let mut state = EditorState::default();
    let t = text_id(&state);
    state
        .update_shadow_field(&t, ShadowField::BlurRadius(9.0))
        .unwrap();
    let img = state.add_image_layer("a.png", 400, 200).unwrap();
    state
        .update_shadow_field(&img, ShadowField::Color("#FF0000".to_owned()))
        .unwrap();

    assert_eq!(state.layer(&t).unwrap().shadow().unwrap().blur_radius, 9.0);
    assert_eq!(state.layer(&img).unwrap().shadow().unwrap().color, "#FF0000");
    let logo = logo_id(&state);
    assert!(
        state
            .update_shadow_field(&logo, ShadowField::Enabled(true))
            .is_err()
    );
}

#[test]
fn image_resize_keeps_aspect_ratio() {
    let mut state = EditorState::default();
    let id = state.add_image_layer("wide.png", 400, 200).unwrap();

    state.resize_image(&id, ImageDimension::Width(100.0)).unwrap();
    let Layer::Image(img) = state.layer(&id).unwrap() else {
        panic!("expected image");
    };
    assert_eq!((img.width, img.height), (100.0, 50.0));

    state.resize_image(&id, ImageDimension::Height(100.0)).unwrap();
    let Layer::Image(img) = state.layer(&id).unwrap() else {
        panic!("expected image");
    };
    assert_eq!((img.width, img.height), (200.0, 100.0));

    assert!(state.resize_image(&id, ImageDimension::Width(0.0)).is_err());
}

#[test]
fn logo_cannot_be_deleted() {
    let mut state = EditorState::default();
    let before = state.clone();
    let logo = logo_id(&state);
    assert!(matches!(
        state.delete_layer(&logo),
        Err(CardError::InvalidMutation(_))
    ));
    assert_eq!(state, before);
}

#[test]
fn deleting_selected_layer_selects_topmost_remaining() {
    let mut state = EditorState::default();
    let a = state.add_text_layer("a");
    let b = state.add_text_layer("b");
    state.select_layer(Some(&a)).unwrap();
    let removed = state.delete_layer(&a).unwrap();
    assert_eq!(removed.id(), &a);
    assert_eq!(state.selected_layer_id.as_ref(), Some(&b));

    // Deleting an unselected layer leaves the selection alone.
    let t = text_id(&state);
    state.delete_layer(&t).unwrap();
    assert_eq!(state.selected_layer_id.as_ref(), Some(&b));
}

#[test]
fn move_up_resolves_ties_into_unique_increasing_z() {
    let mut state = EditorState::default();
    let img = state.add_image_layer("a.png", 10, 10).unwrap();
    let t = text_id(&state);
    for l in &mut state.layers {
        if l.id() == &t || l.id() == &img {
            l.base_mut().z_index = 3;
        }
    }
    state.move_layer(&t, MoveDirection::Up).unwrap();

    let mut z = zs(&state);
    z.sort_unstable();
    z.dedup();
    assert_eq!(z.len(), state.layers.len(), "zIndex values are unique");

    let t_z = state.layer(&t).unwrap().z_index();
    let img_z = state.layer(&img).unwrap().z_index();
    assert!(t_z > img_z);
}

#[test]
fn move_swaps_with_neighbor_and_stops_at_edges() {
    let mut state = EditorState::default();
    let t = text_id(&state);
    let logo = logo_id(&state);
    state.move_layer(&t, MoveDirection::Up).unwrap();
    assert_eq!(state.layer(&t).unwrap().z_index(), 2);
    assert_eq!(state.layer(&logo).unwrap().z_index(), 1);

    let before = state.clone();
    state.move_layer(&t, MoveDirection::Up).unwrap();
    assert_eq!(state, before);
    state.move_layer(&logo, MoveDirection::Down).unwrap();
    assert_eq!(state, before);
}

#[test]
fn reorder_matches_remove_and_insert_on_display_order() {
    let mut state = EditorState::default();
    state.add_text_layer("a");
    state.add_image_layer("b.png", 4, 3).unwrap();
    state.add_text_layer("c");

    for (from, to) in [(0, 3), (3, 0), (1, 2), (2, 1), (0, 1)] {
        let mut expected = state.display_ids();
        let moved = expected.remove(from);
        expected.insert(to, moved);
        let max = state.max_z().unwrap();

        state.reorder_layers(from, to).unwrap();
        assert_eq!(state.display_ids(), expected);
        let top_down: Vec<i64> = state.display_order().iter().map(|l| l.z_index()).collect();
        let dense: Vec<i64> = (0..state.layers.len() as i64).map(|i| max - i).collect();
        assert_eq!(top_down, dense);
    }
    assert!(state.reorder_layers(0, 9).is_err());
}

#[test]
fn switching_away_from_image_background_clears_reference_only() {
    let mut state = EditorState::default();
    state.canvas.bg_color = "#123456".to_owned();
    state.set_background_type(BackgroundType::Image);
    state.set_background_image(Some("stored:bg".to_owned()));

    let dropped = state.set_background_type(BackgroundType::Solid);
    assert_eq!(dropped.as_deref(), Some("stored:bg"));
    assert_eq!(state.canvas.bg_image, None);
    assert_eq!(state.canvas.bg_color, "#123456");
}

#[test]
fn brand_colors_apply_by_target() {
    let mut state = EditorState::default();
    let kit = BrandKit::default();
    let t = text_id(&state);
    state
        .apply_brand_color(&kit, &t, BrandTarget::TextColor, BrandSlot::Primary)
        .unwrap();
    state
        .apply_brand_color(&kit, &t, BrandTarget::Shadow, BrandSlot::Secondary)
        .unwrap();
    let Layer::Text(text) = state.layer(&t).unwrap() else {
        panic!("expected text");
    };
    assert_eq!(text.text_color, "#FF3B30");
    assert_eq!(text.text_shadow.color, "#111111");

    let logo = logo_id(&state);
    assert!(
        state
            .apply_brand_color(&kit, &logo, BrandTarget::TextColor, BrandSlot::Primary)
            .is_err()
    );

    state.apply_brand_color_to_canvas(&kit, CanvasBrandTarget::Gradient1);
    assert_eq!(state.canvas.gradient.color1, "#E0E7FF");
    state.set_background_type(BackgroundType::Gradient);
    state.apply_brand_color_to_canvas(&kit, CanvasBrandTarget::Gradient1);
    assert_eq!(state.canvas.gradient.color1, "#FF3B30");
}

#[test]
fn logo_survives_any_operation_sequence() {
    let mut state = EditorState::default();
    let mut seed = 0x2545_F491_4F6C_DD1Du64;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed
    };

    for _ in 0..500 {
        let ids: Vec<LayerId> = state.layers.iter().map(|l| l.id().clone()).collect();
        let pick = ids[(next() as usize) % ids.len()].clone();
        let _ = match next() % 6 {
            0 => state.add_layer(LayerKind::Text, Some("x")).map(|_| ()),
            1 => state.add_image_layer("i.png", 3, 2).map(|_| ()),
            2 => state.delete_layer(&pick).map(|_| ()),
            3 => state.move_layer(&pick, MoveDirection::Up),
            4 => state.move_layer(&pick, MoveDirection::Down),
            _ => state.update_layer(&pick, LayerPatch::position(1.0, 1.0)),
        };
        assert_eq!(state.count_kind(LayerKind::Logo), 1);
        if let Some(sel) = &state.selected_layer_id {
            assert!(state.layer(sel).is_some());
        }
    }

    let logo = logo_id(&state);
    let before = state.layers.clone();
    let _ = state.delete_layer(&logo);
    assert_eq!(state.layers, before);
}

#[test]
fn canvas_size_is_validated() {
    let mut state = EditorState::default();
    assert!(state.set_canvas_size(0, 10).is_err());
    assert!(state.set_canvas_size(70_000, 10).is_err());
    state.set_canvas_size(1080, 1080).unwrap();
    assert_eq!(state.canvas.size(), (1080.0, 1080.0));
}
