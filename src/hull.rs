use crate::rotated_box::Point2D;

/// Convex hull by Andrew's monotone chain.
///
/// Returns the hull counter-clockwise (in a y-up frame) starting from the point with the
/// smallest x, with collinear points removed. Inputs of fewer than 3 points are returned
/// as given.
pub fn convex_hull(points: &[Point2D]) -> Vec<Point2D> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower = half_hull(sorted.iter());
    let mut upper = half_hull(sorted.iter().rev());

    lower.pop();
    upper.pop();
    lower.append(&mut upper);
    lower
}

fn half_hull<'a>(points: impl Iterator<Item = &'a Point2D>) -> Vec<Point2D> {
    let mut chain: Vec<Point2D> = Vec::new();
    for &p in points {
        while chain.len() >= 2 && cross(chain[chain.len() - 2], chain[chain.len() - 1], p) <= 0.0 {
            chain.pop();
        }
        chain.push(p);
    }
    chain
}

/// Z component of `(a - o) x (b - o)`.
#[inline]
pub(crate) fn cross(o: Point2D, a: Point2D, b: Point2D) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f32, f32)]) -> Vec<Point2D> {
        coords.iter().map(|&(x, y)| Point2D::new(x, y)).collect()
    }

    #[test]
    fn square_drops_interior_point() {
        let hull = convex_hull(&pts(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (0.5, 0.5),
        ]));
        assert_eq!(
            hull,
            pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])
        );
    }

    #[test]
    fn collinear_points_are_removed() {
        let hull = convex_hull(&pts(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]));
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point2D::new(1.0, 0.0)));
    }

    #[test]
    fn line_collapses_to_endpoints() {
        let hull = convex_hull(&pts(&[(0.0, 0.0), (3.0, 0.0), (1.0, 0.0), (2.0, 0.0)]));
        assert_eq!(hull, pts(&[(0.0, 0.0), (3.0, 0.0)]));
    }

    #[test]
    fn fewer_than_three_points_pass_through() {
        let input = pts(&[(4.0, 1.0), (0.0, 0.0)]);
        assert_eq!(convex_hull(&input), input);
        assert!(convex_hull(&[]).is_empty());
    }

    #[test]
    fn duplicates_do_not_repeat() {
        let hull = convex_hull(&pts(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]));
        assert_eq!(hull, pts(&[(1.0, 1.0)]));
    }

    #[test]
    fn hull_turns_left() {
        let hull = convex_hull(&pts(&[
            (0.0, 0.0),
            (4.0, 1.0),
            (5.0, 5.0),
            (1.0, 4.0),
            (2.0, 2.0),
            (3.0, 3.0),
        ]));
        let n = hull.len();
        for i in 0..n {
            assert!(cross(hull[i], hull[(i + 1) % n], hull[(i + 2) % n]) > 0.0);
        }
    }
}
