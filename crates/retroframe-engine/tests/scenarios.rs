//! End-to-end frames on the recording backend.

use retroframe_engine::coords::{ClipRect, Color32, Rect, Size, Vec2i};
use retroframe_engine::core::Engine;
use retroframe_engine::paint::Paint;
use retroframe_engine::render::{
    BackendCall, FlushReason, RecordingBackend, SpriteFlags, SpriteSheetDesc,
};
use retroframe_engine::HardwareConfig;

fn engine() -> Engine<RecordingBackend> {
    Engine::new(RecordingBackend::new(), HardwareConfig::default()).unwrap()
}

fn begin(e: &mut Engine<RecordingBackend>) {
    e.begin_frame();
    e.start_render().unwrap();
    e.renderer_mut().backend_mut().clear_calls();
}

// ── tile map ──────────────────────────────────────────────────────────────

#[test]
fn single_tile_builds_one_chunk_mesh() {
    let mut e = engine();
    let rgba = vec![255u8; 64 * 64 * 4];
    e.renderer_mut()
        .sprite_sheet_setup(
            0,
            &SpriteSheetDesc {
                size: Size::new(64, 64),
                sprite_size: Size::new(8, 8),
                rgba: &rgba,
                palettize: false,
            },
        )
        .unwrap();
    e.layer_sprite_sheet_set(0, Some(0)).unwrap();
    e.tilemap_mut()
        .sprite_set(0, 0, 0, 5, Color32::WHITE, 0, SpriteFlags::empty());

    begin(&mut e);
    e.draw_map_layer(0, Vec2i::zero());
    e.frame_end();

    assert_eq!(e.tilemap().meshes_generated(), 1);
    assert_eq!(e.tilemap().active_chunks(), 1);

    let mesh = e.tilemap().chunk_mesh(0, 0, 0).unwrap();
    assert_eq!(mesh.vertices.len(), 4);
    assert_eq!(mesh.indices.len(), 6);
    // Sprite 5 on an 8-column sheet of 8x8 cells starts at (40, 0).
    let uvs: Vec<[f32; 2]> = mesh.vertices.iter().map(|v| v.uv).collect();
    assert_eq!(uvs, vec![[40.0, 0.0], [48.0, 0.0], [48.0, 8.0], [40.0, 8.0]]);

    let backend = e.renderer().backend();
    assert_eq!(backend.draw_count(), 1);
    assert_eq!(backend.draws().next().map(|d| d.vertices.len()), Some(4));
}

// ── batching ──────────────────────────────────────────────────────────────

#[test]
fn full_batch_flushes_once_before_the_overflowing_pixel() {
    let mut e = engine();
    begin(&mut e);

    for i in 0..512 {
        e.renderer_mut()
            .draw_pixel(Vec2i::new(i % 480, i / 480), Paint::Indexed(1));
    }
    assert_eq!(e.renderer().backend().draw_count(), 0);

    e.renderer_mut().draw_pixel(Vec2i::new(10, 10), Paint::Indexed(2));

    let backend = e.renderer().backend();
    assert_eq!(backend.draws_with_reason(FlushReason::BatchFull), 1);
    assert_eq!(backend.draw_count(), 1);
    assert_eq!(backend.draws().next().map(|d| d.vertices.len()), Some(2048));
    assert_eq!(e.renderer().batch().current_vertex(), 4);

    e.frame_end();
    assert_eq!(e.renderer().backend().draws_with_reason(FlushReason::FrameEnd), 1);
}

// ── clipping ──────────────────────────────────────────────────────────────

#[test]
fn clip_change_flushes_before_new_geometry() {
    let mut e = engine();
    begin(&mut e);

    e.renderer_mut()
        .draw_rect_fill(Rect::new(0, 0, 16, 16), Paint::Indexed(1));
    e.renderer_mut().clip_set(Rect::new(8, 8, 32, 32));
    assert_eq!(
        e.renderer().backend().draws_with_reason(FlushReason::ClipChange),
        1
    );

    e.renderer_mut()
        .draw_rect_fill(Rect::new(10, 10, 4, 4), Paint::Indexed(2));
    e.frame_end();

    let draws: Vec<_> = e.renderer().backend().draws().cloned().collect();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].reason, FlushReason::ClipChange);
    assert_eq!(draws[0].clip, ClipRect::full(Size::new(480, 270)));
    assert_eq!(draws[0].vertices.len(), 4);
    // frame_end restores the full clip, which flushes the clipped geometry first.
    assert_eq!(draws[1].reason, FlushReason::ClipChange);
    assert_eq!(draws[1].clip, ClipRect::new(8, 8, 39, 39));
    assert_eq!(draws[1].vertices.len(), 4);
}

#[test]
fn clip_to_disjoint_rect_flushes_geometry_under_the_old_clip() {
    let mut e = engine();
    begin(&mut e);

    e.renderer_mut().clip_set(Rect::new(0, 0, 20, 20));
    e.renderer_mut()
        .draw_rect_fill(Rect::new(4, 4, 8, 8), Paint::Indexed(1));
    assert_eq!(e.renderer().backend().draw_count(), 0);

    e.renderer_mut().clip_set(Rect::new(100, 100, 20, 20));

    let draws: Vec<_> = e.renderer().backend().draws().cloned().collect();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].reason, FlushReason::ClipChange);
    assert_eq!(draws[0].clip, ClipRect::new(0, 0, 19, 19));
    assert_eq!(draws[0].vertices.len(), 4);

    // Inside the old clip, outside the new one.
    e.renderer_mut()
        .draw_rect_fill(Rect::new(4, 4, 8, 8), Paint::Indexed(2));
    assert_eq!(e.renderer().batch().current_vertex(), 0);

    e.renderer_mut()
        .draw_rect_fill(Rect::new(104, 104, 8, 8), Paint::Indexed(2));
    assert_eq!(e.renderer().batch().current_vertex(), 4);
    assert_eq!(e.renderer().backend().draw_count(), 1);
}

// ── effects ───────────────────────────────────────────────────────────────

#[test]
fn effect_split_composites_two_layers() {
    use retroframe_engine::effects::EffectKind;

    let mut e = engine();
    begin(&mut e);
    e.renderer_mut()
        .draw_rect_fill(Rect::new(0, 0, 480, 270), Paint::Indexed(3));
    e.effects_mut().set_intensity(EffectKind::Desaturation, 1.0);
    e.effect_apply_now().unwrap();
    e.effects_mut().reset(EffectKind::Desaturation);
    e.frame_end();

    let layers = e.present_layers();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].params.get(EffectKind::Desaturation).intensity, 1.0);
    assert_eq!(layers[1].params.get(EffectKind::Desaturation).intensity, 0.0);
    assert_ne!(layers[0].surface, layers[1].surface);
}

#[test]
fn repeated_splits_reuse_the_same_front_buffers() {
    let mut e = engine();
    let mut first_frame = Vec::new();

    for frame in 0..3 {
        begin(&mut e);
        for _ in 0..3 {
            e.renderer_mut()
                .draw_rect_fill(Rect::new(0, 0, 8, 8), Paint::Indexed(1));
            e.effect_apply_now().unwrap();
        }
        e.frame_end();

        let surfaces: Vec<_> = e.present_layers().iter().map(|l| l.surface).collect();
        assert_eq!(surfaces.len(), 4);
        let mut distinct = surfaces.clone();
        distinct.sort_by_key(|s| s.0);
        distinct.dedup();
        assert_eq!(distinct.len(), 4);

        if frame == 0 {
            first_frame = surfaces;
        } else {
            assert_eq!(surfaces, first_frame);
            let created = e
                .renderer()
                .backend()
                .calls()
                .iter()
                .filter(|c| matches!(c, BackendCall::CreateSurface { .. }))
                .count();
            assert_eq!(created, 0);
        }
    }
}
