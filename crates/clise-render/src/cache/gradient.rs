//! Gradient shader construction.

use super::color::ColorCache;
use clise_core::{GradientDef, GradientKind};
use kurbo::{Point, Rect, Vec2};
use peniko::{
    Color, ColorStop, Extend, Gradient, GradientKind as ShaderKind, LinearGradientPosition,
    RadialGradientPosition,
};

/// Resolve `def` against `bounds` into a shader.
///
/// `opacity` multiplies every stop's own opacity. Returns `None` when the
/// gradient has no colors or the bounds are degenerate.
pub fn build_gradient(def: &GradientDef, bounds: Rect, opacity: f64, colors: &mut ColorCache) -> Option<Gradient> {
    let bounds = bounds.abs();
    if !(bounds.width().is_finite() && bounds.height().is_finite()) {
        return None;
    }
    let (kind, stops) = match def.kind {
        GradientKind::Linear => (linear_position(def.angle, bounds), resolve_stops(def, opacity, colors)),
        GradientKind::Radial => {
            let center = Point::new(
                bounds.x0 + def.center_x * bounds.width(),
                bounds.y0 + def.center_y * bounds.height(),
            );
            let radius = def.radius.max(0.0) * bounds.width().max(bounds.height());
            (
                ShaderKind::Radial(RadialGradientPosition::new_two_point(center, 0.0, center, radius as f32)),
                resolve_stops(def, opacity, colors),
            )
        }
        GradientKind::Mesh => mesh_approximation(def, bounds, opacity, colors)?,
    };
    if stops.is_empty() {
        return None;
    }
    Some(Gradient {
        kind,
        extend: Extend::Pad,
        stops: stops.as_slice().into(),
        ..Gradient::default()
    })
}

/// Endpoints of a linear gradient at `angle` degrees spanning `bounds`.
///
/// The gradient line passes through the box center and is long enough that
/// the first and last stops land on the box corners.
fn linear_position(angle: f64, bounds: Rect) -> ShaderKind {
    let radians = angle.to_radians();
    let dir = Vec2::new(radians.cos(), radians.sin());
    let half = (bounds.width() * dir.x.abs() + bounds.height() * dir.y.abs()) / 2.0;
    let center = bounds.center();
    ShaderKind::Linear(LinearGradientPosition::new(center - dir * half, center + dir * half))
}

fn resolve_stops(def: &GradientDef, opacity: f64, colors: &mut ColorCache) -> Vec<ColorStop> {
    let mut stops: Vec<(f32, Color)> = def
        .stops
        .iter()
        .map(|stop| {
            let offset = if stop.offset.is_finite() { stop.offset.clamp(0.0, 1.0) } else { 0.0 };
            (offset as f32, colors.color(&stop.color, stop.opacity * opacity))
        })
        .collect();
    stops.sort_by(|a, b| a.0.total_cmp(&b.0));
    finish_stops(stops)
}

fn finish_stops(mut stops: Vec<(f32, Color)>) -> Vec<ColorStop> {
    // A single stop paints a flat color.
    if let [(_, color)] = stops.as_slice() {
        let color = *color;
        stops = vec![(0.0, color), (1.0, color)];
    }
    stops.into_iter().map(ColorStop::from).collect()
}

/// Mesh gradients are drawn as a radial falloff from the first mesh point
/// through the others, ordered by distance.
fn mesh_approximation(
    def: &GradientDef,
    bounds: Rect,
    opacity: f64,
    colors: &mut ColorCache,
) -> Option<(ShaderKind, Vec<ColorStop>)> {
    let to_world = |x: f64, y: f64| Point::new(bounds.x0 + x * bounds.width(), bounds.y0 + y * bounds.height());
    let first = def.mesh_points.first()?;
    let center = to_world(first.x, first.y);
    let mut points: Vec<(f64, &str, f64)> = def
        .mesh_points
        .iter()
        .map(|p| (to_world(p.x, p.y).distance(center), p.color.as_str(), p.opacity))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    let reach = points
        .last()
        .map(|p| p.0)
        .filter(|d| *d > 0.0)
        .unwrap_or_else(|| def.radius.max(0.0) * bounds.width().max(bounds.height()));
    let stops = points
        .into_iter()
        .map(|(distance, color, stop_opacity)| {
            let offset = if reach > 0.0 { distance / reach } else { 0.0 };
            (offset as f32, colors.color(color, stop_opacity * opacity))
        })
        .collect();
    Some((
        ShaderKind::Radial(RadialGradientPosition::new_two_point(center, 0.0, center, reach as f32)),
        finish_stops(stops),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clise_core::GradientStop;
    use clise_core::elements::MeshPoint;

    fn stop(color: &str, offset: f64) -> GradientStop {
        GradientStop {
            color: color.into(),
            offset,
            opacity: 1.0,
        }
    }

    #[test]
    fn test_linear_zero_angle_runs_left_to_right() {
        let mut colors = ColorCache::new();
        let def = GradientDef::linear(0.0, vec![stop("#000", 0.0), stop("#fff", 1.0)]);
        let gradient = build_gradient(&def, Rect::new(0.0, 0.0, 100.0, 50.0), 1.0, &mut colors);
        let Some(Gradient {
            kind: ShaderKind::Linear(pos),
            ..
        }) = gradient
        else {
            panic!("expected linear gradient");
        };
        assert!((pos.start.x - 0.0).abs() < 1e-9);
        assert!((pos.end.x - 100.0).abs() < 1e-9);
        assert!((pos.start.y - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_stops_sorted_and_opacity_applied() {
        let mut colors = ColorCache::new();
        let def = GradientDef::linear(90.0, vec![stop("#ffffff", 1.0), stop("#ff0000", 0.0)]);
        let gradient = build_gradient(&def, Rect::new(0.0, 0.0, 10.0, 10.0), 0.5, &mut colors);
        let stops = gradient.map(|g| g.stops.as_slice().to_vec()).unwrap_or_default();
        assert_eq!(stops.len(), 2);
        assert!(stops[0].offset < stops[1].offset);
        let [r, g, b, a] = stops[0].color.components;
        assert!((r - 1.0).abs() < 1e-3 && g.abs() < 1e-3 && b.abs() < 1e-3);
        assert!((a - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_empty_gradient_has_no_shader() {
        let mut colors = ColorCache::new();
        let def = GradientDef::linear(0.0, Vec::new());
        assert!(build_gradient(&def, Rect::new(0.0, 0.0, 10.0, 10.0), 1.0, &mut colors).is_none());
    }

    #[test]
    fn test_mesh_is_radial_from_first_point() {
        let mut colors = ColorCache::new();
        let mut def = GradientDef::linear(0.0, Vec::new());
        def.kind = GradientKind::Mesh;
        def.mesh_points = vec![
            MeshPoint {
                x: 0.0,
                y: 0.0,
                color: "#ff0000".into(),
                opacity: 1.0,
            },
            MeshPoint {
                x: 1.0,
                y: 0.0,
                color: "#0000ff".into(),
                opacity: 1.0,
            },
        ];
        let gradient = build_gradient(&def, Rect::new(0.0, 0.0, 100.0, 100.0), 1.0, &mut colors);
        assert!(matches!(
            gradient.map(|g| g.kind),
            Some(ShaderKind::Radial(pos)) if (pos.end_radius - 100.0).abs() < 1e-3
        ));
    }
}
