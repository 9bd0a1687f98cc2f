use geo::{Coord, LineString, Polygon};
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub(crate) fn to_vector(self) -> Vector2<f32> {
        Vector2::new(self.x, self.y)
    }

    pub(crate) fn from_vector(v: Vector2<f32>) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Point2D> for Coord<f32> {
    fn from(point: Point2D) -> Self {
        Coord {
            x: point.x,
            y: point.y,
        }
    }
}

impl From<Coord<f32>> for Point2D {
    fn from(coord: Coord<f32>) -> Self {
        Self::new(coord.x, coord.y)
    }
}

/// A rectangle rotated by `angle` radians around its center.
///
/// The four polygon vertices are kept in sync with the shape fields: all fields are
/// private and every mutation rebuilds the polygon. Vertex order, in the box's own
/// frame, is top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedBox {
    center: Point2D,
    width: f32,
    height: f32,
    angle: f32,
    polygon: [Point2D; 4],
}

impl RotatedBox {
    /// Negative extents are clamped to zero.
    pub fn new(center: Point2D, width: f32, height: f32, angle: f32) -> Self {
        let width = width.max(0.0);
        let height = height.max(0.0);
        Self {
            center,
            width,
            height,
            angle,
            polygon: corners(center, width, height, angle),
        }
    }

    /// Axis-aligned box covering `points`, or a zero box at the origin when empty.
    pub fn axis_aligned(points: &[Point2D]) -> Self {
        if points.is_empty() {
            return Self::new(Point2D::default(), 0.0, 0.0, 0.0);
        }
        let (min_x, min_y, max_x, max_y) = points.iter().fold(
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        );
        Self::new(
            Point2D::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
            max_x - min_x,
            max_y - min_y,
            0.0,
        )
    }

    pub fn center(&self) -> Point2D {
        self.center
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Radians, counter-clockwise positive with y pointing down.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn longer_side(&self) -> f32 {
        self.width.max(self.height)
    }

    pub fn polygon(&self) -> [Point2D; 4] {
        self.polygon
    }

    /// Grows both sides by `2 * padding`, keeping the center and angle.
    pub fn expand(&mut self, padding: f32) {
        *self = Self::new(
            self.center,
            self.width + 2.0 * padding,
            self.height + 2.0 * padding,
            self.angle,
        );
    }

    /// Whether `point` lies inside or within `tolerance` of the box edges.
    pub fn contains(&self, point: Point2D, tolerance: f32) -> bool {
        let local = Rotation2::new(-self.angle) * (point.to_vector() - self.center.to_vector());
        local.x.abs() <= self.width / 2.0 + tolerance
            && local.y.abs() <= self.height / 2.0 + tolerance
    }

    pub fn to_geo(&self) -> Polygon<f32> {
        polygon_to_geo(&self.polygon)
    }
}

pub(crate) fn polygon_to_geo(points: &[Point2D]) -> Polygon<f32> {
    let exterior = points.iter().copied().map(Coord::from).collect::<Vec<_>>();
    Polygon::new(LineString::new(exterior), vec![])
}

fn corners(center: Point2D, width: f32, height: f32, angle: f32) -> [Point2D; 4] {
    let rotation = Rotation2::new(angle);
    let center = center.to_vector();
    let (hw, hh) = (width / 2.0, height / 2.0);
    [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
        .map(|(x, y)| Point2D::from_vector(center + rotation * Vector2::new(x, y)))
}

/// Size-adaptive padding: `longer_side * ratio`, bounded to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddingPolicy {
    pub ratio: f32,
    pub min: f32,
    pub max: f32,
}

impl PaddingPolicy {
    pub fn padding_for(&self, rect: &RotatedBox) -> f32 {
        (rect.longer_side() * self.ratio).min(self.max).max(self.min)
    }

    pub fn apply(&self, rect: &mut RotatedBox) -> f32 {
        let padding = self.padding_for(rect);
        rect.expand(padding);
        padding
    }
}

impl Default for PaddingPolicy {
    fn default() -> Self {
        Self {
            ratio: 0.1,
            min: 5.0,
            max: 30.0,
        }
    }
}
