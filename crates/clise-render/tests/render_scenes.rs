use clise_core::elements::{PathPoint, Padding};
use clise_core::{Element, ElementId, ElementKind, PerformanceConfig, Viewport};
use clise_render::{DrawCommand, RecordingSurface, RenderContext, SceneRenderer, Surface};
use kurbo::{Rect, Size, Vec2};
use std::cell::RefCell;
use std::rc::Rc;

fn mixed_scene(count: usize) -> Vec<Element> {
    (0..count)
        .map(|i| {
            let x = (i % 10) as f64 * 70.0;
            let y = (i / 10) as f64 * 70.0;
            let element = match i % 6 {
                0 => Element::rect(x, y, 40.0, 30.0).with_fill("#3b82f6"),
                1 => Element::ellipse(x, y, 30.0, 30.0).with_fill("#22c55e"),
                2 => Element::line(x, y, x + 40.0, y + 20.0),
                3 => Element::text(x, y, "label"),
                4 => Element::path(
                    x,
                    y,
                    vec![PathPoint::new(0.0, 0.0), PathPoint::new(20.0, 0.0), PathPoint::new(10.0, 20.0)],
                    true,
                )
                .with_fill("#f97316"),
                _ => Element::frame(x, y, 60.0, 60.0),
            };
            element.with_id(format!("e{i}"))
        })
        .collect()
}

#[test]
fn frames_render_before_other_elements() {
    let _ = env_logger::builder().is_test(true).try_init();
    let elements = mixed_scene(50);
    let mut renderer = SceneRenderer::default();
    let mut surface = RecordingSurface::new();
    let ctx = RenderContext::new(&elements, Viewport::default(), Size::new(800.0, 600.0));
    renderer.render(Some(&mut surface as &mut dyn Surface), &ctx);

    let labels = surface.group_labels();
    assert_eq!(labels.len(), 50);
    let frame_ids: Vec<&str> = elements.iter().filter(|e| e.is_frame()).map(|e| e.id.as_str()).collect();
    assert_eq!(&labels[..frame_ids.len()], frame_ids.as_slice());
    let others: Vec<&str> = elements.iter().filter(|e| !e.is_frame()).map(|e| e.id.as_str()).collect();
    assert_eq!(&labels[frame_ids.len()..], others.as_slice());

    // the whole frame sits inside one save scope
    assert!(matches!(surface.commands().first(), Some(DrawCommand::Save)));
    assert!(matches!(surface.commands().last(), Some(DrawCommand::Flush)));
    assert_eq!(surface.transform(), kurbo::Affine::IDENTITY);
}

fn padded_frame() -> Element {
    let mut frame = Element::frame(0.0, 0.0, 200.0, 100.0).with_id("frame");
    if let ElementKind::Frame(props) = &mut frame.kind {
        props.clip_content = true;
        props.padding = Padding {
            top: 10.0,
            ..Padding::default()
        };
    }
    frame
}

fn clip_of(surface: &RecordingSurface, id: &str) -> Option<Rect> {
    let commands = surface.group(id)?;
    let clip = commands.iter().position(|c| matches!(c, DrawCommand::ClipRect(_)))?;
    let first_draw = commands.iter().position(DrawCommand::is_draw)?;
    assert!(clip < first_draw, "clip must precede the element's draws");
    match &commands[clip] {
        DrawCommand::ClipRect(rect) => Some(*rect),
        _ => None,
    }
}

#[test]
fn children_are_clipped_to_padded_frame() {
    let elements = vec![
        padded_frame(),
        Element::rect(20.0, 20.0, 50.0, 50.0)
            .with_fill("#ff0000")
            .with_id("inside")
            .with_parent("frame"),
        // dragged out of the frame but still parented to it
        Element::rect(400.0, 300.0, 50.0, 50.0)
            .with_fill("#00ff00")
            .with_id("outside")
            .with_parent("frame"),
    ];
    let selection: Vec<ElementId> = vec!["outside".into()];
    let mut renderer = SceneRenderer::default();
    let mut surface = RecordingSurface::new();
    let ctx = RenderContext::new(&elements, Viewport::default(), Size::new(800.0, 600.0)).with_selection(&selection);
    renderer.render(Some(&mut surface as &mut dyn Surface), &ctx);

    let content = Rect::new(0.0, 10.0, 200.0, 100.0);
    assert_eq!(clip_of(&surface, "inside"), Some(content));
    assert_eq!(clip_of(&surface, "outside"), Some(content));

    // selection handles are drawn inside the same clip scope
    let outside = surface.group("outside").unwrap_or_default();
    let rects = outside.iter().filter(|c| matches!(c, DrawCommand::Rect { .. })).count();
    assert!(rects > 2);
    assert!(matches!(outside.last(), Some(DrawCommand::Restore)));
}

#[test]
fn large_scene_is_culled_through_the_quadtree() {
    let elements: Vec<Element> = (0..25_000)
        .map(|i| {
            let x = (i % 160) as f64 * 50.0;
            let y = (i / 160) as f64 * 50.0;
            Element::rect(x, y, 10.0, 10.0).with_fill("#64748b").with_id(format!("r{i}"))
        })
        .collect();
    let frames = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&frames);
    let mut renderer = SceneRenderer::new(PerformanceConfig::default())
        .with_metrics_sink(move |m: &clise_render::FrameMetrics| sink.borrow_mut().push(*m));
    let viewport = Viewport::new(Vec2::new(0.0, 0.0), 2.0);
    let ctx = RenderContext::new(&elements, viewport, Size::new(800.0, 600.0));

    let mut surface = RecordingSurface::new();
    renderer.render(Some(&mut surface as &mut dyn Surface), &ctx);
    assert_eq!(renderer.performance().rebuild_count(), 1);

    let stats = renderer.get_performance_stats();
    assert_eq!(stats.total_elements, 25_000);
    assert!(stats.visible_elements > 0);
    assert!(stats.visible_elements < 25_000 / 20, "visible {}", stats.visible_elements);
    assert_eq!(stats.culled_elements, 25_000 - stats.visible_elements);
    assert!(stats.quadtree_stats.is_some());
    assert!(renderer.performance().last_metrics().is_some());

    // unchanged content does not rebuild the index
    let mut surface = RecordingSurface::new();
    renderer.render(Some(&mut surface as &mut dyn Surface), &ctx);
    assert_eq!(renderer.performance().rebuild_count(), 1);

    let frames = frames.borrow();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].element_count, 25_000);
    assert_eq!(frames[1].visible_count, stats.visible_elements);
    assert_eq!(surface.group_labels().len(), stats.visible_elements);
}

#[test]
fn json_config_patch_enables_batching() {
    let elements: Vec<Element> = (0..4)
        .map(|i| Element::rect(i as f64 * 20.0, 0.0, 10.0, 10.0).with_fill("#ff0000").with_id(format!("r{i}")))
        .collect();
    let patch: clise_core::PerformanceConfigPatch = serde_json::from_value(serde_json::json!({
        "enableBatching": true,
    }))
    .unwrap();
    let mut renderer = SceneRenderer::default();
    renderer.update_performance_config(&patch);
    assert!(renderer.performance().config().enable_batching);

    let mut surface = RecordingSurface::new();
    let ctx = RenderContext::new(&elements, Viewport::default(), Size::new(800.0, 600.0));
    renderer.render(Some(&mut surface as &mut dyn Surface), &ctx);
    assert_eq!(surface.group_labels(), vec!["batch:r0"]);
    assert_eq!(surface.draw_count(), 4);
}
