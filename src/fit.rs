use nalgebra::Rotation2;

use crate::{
    hull::convex_hull,
    rotated_box::{Point2D, RotatedBox},
};

/// Relative area difference below which two candidate rectangles count as a tie.
const AREA_TOLERANCE: f32 = 1e-5;

/// Minimum-area rectangle enclosing `points`.
///
/// Every hull edge direction is tried as the rectangle orientation; the first edge with
/// the smallest enclosing area wins, areas within rounding noise counting as equal.
/// Fewer than 3 points, or a hull without an edge, fall back to the axis-aligned
/// bounding box.
pub fn min_area_rect(points: &[Point2D]) -> RotatedBox {
    if points.len() < 3 {
        return RotatedBox::axis_aligned(points);
    }

    let hull = convex_hull(points);
    if hull.len() < 2 {
        return RotatedBox::axis_aligned(&hull);
    }

    let mut best: Option<(f32, RotatedBox)> = None;
    for (i, p1) in hull.iter().enumerate() {
        let p2 = hull[(i + 1) % hull.len()];
        let angle = (p2.y - p1.y).atan2(p2.x - p1.x);
        let (rect, area) = edge_aligned_rect(&hull, angle);
        let improves = best.as_ref().map_or(true, |(min_area, _)| {
            area < *min_area - AREA_TOLERANCE * min_area.max(1.0)
        });
        if improves {
            best = Some((area, rect));
        }
    }

    best.map(|(_, rect)| rect)
        .unwrap_or_else(|| RotatedBox::axis_aligned(&hull))
}

fn edge_aligned_rect(hull: &[Point2D], angle: f32) -> (RotatedBox, f32) {
    let to_local = Rotation2::new(-angle);
    let (min_x, min_y, max_x, max_y) = hull.iter().map(|p| to_local * p.to_vector()).fold(
        (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
        |(min_x, min_y, max_x, max_y), v| {
            (min_x.min(v.x), min_y.min(v.y), max_x.max(v.x), max_y.max(v.y))
        },
    );

    let local_center = Point2D::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
    let center = Point2D::from_vector(to_local.inverse() * local_center.to_vector());
    let (width, height) = (max_x - min_x, max_y - min_y);
    (RotatedBox::new(center, width, height, angle), width * height)
}
