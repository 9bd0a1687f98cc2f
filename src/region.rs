use ndarray::{Array2, ArrayView2, Axis};
use tracing::instrument;

use crate::rotated_box::Point2D;

/// Neighbour visit order for the 8-connected fill. Region point order depends on it.
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Per-pixel text probability map produced by the detection model, indexed `[y, x]`.
#[derive(Debug, Clone)]
pub struct ProbabilityMap {
    data: Array2<f32>,
}

impl ProbabilityMap {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Builds a map from row-major scores. Returns `None` if `scores.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, scores: Vec<f32>) -> Option<Self> {
        Array2::from_shape_vec((height, width), scores)
            .ok()
            .map(Self::new)
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn view(&self) -> ArrayView2<f32> {
        self.data.view()
    }

    pub fn score(&self, x: usize, y: usize) -> f32 {
        self.data[[y, x]]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelCoordinate {
    pub x: usize,
    pub y: usize,
}

impl From<PixelCoordinate> for Point2D {
    fn from(pixel: PixelCoordinate) -> Self {
        Point2D::new(pixel.x as f32, pixel.y as f32)
    }
}

/// An 8-connected set of above-threshold pixels, in fill order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub pixels: Vec<PixelCoordinate>,
}

impl Region {
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn points(&self) -> Vec<Point2D> {
        self.pixels.iter().copied().map(Point2D::from).collect()
    }
}

/// Splits the map into 8-connected components of pixels scoring above `threshold`.
///
/// Components are discovered in row-major order. Components smaller than `min_size`
/// pixels are dropped. An empty map yields no regions.
#[instrument(level = "debug", skip(map), fields(width = map.width(), height = map.height()))]
pub fn extract(map: &ProbabilityMap, threshold: f32, min_size: usize) -> Vec<Region> {
    if map.is_empty() {
        return Vec::new();
    }

    let (height, width) = (map.height(), map.width());
    let mut visited = Array2::<bool>::from_elem((height, width), false);
    let mut stack = Vec::new();
    let mut regions = Vec::new();
    let mut dropped = 0;

    for y in 0..height {
        for x in 0..width {
            if visited[[y, x]] || map.score(x, y) <= threshold {
                continue;
            }
            let pixels = flood_fill(map, threshold, &mut visited, &mut stack, x, y);
            if pixels.len() < min_size {
                dropped += 1;
                continue;
            }
            regions.push(Region { pixels });
        }
    }

    log::debug!(
        "Extracted {} regions above {threshold}, dropped {dropped} smaller than {min_size} pixels",
        regions.len()
    );
    regions
}

fn flood_fill(
    map: &ProbabilityMap,
    threshold: f32,
    visited: &mut Array2<bool>,
    stack: &mut Vec<PixelCoordinate>,
    start_x: usize,
    start_y: usize,
) -> Vec<PixelCoordinate> {
    let (height, width) = (map.height(), map.width());
    let mut pixels = Vec::new();

    visited[[start_y, start_x]] = true;
    stack.push(PixelCoordinate {
        x: start_x,
        y: start_y,
    });

    while let Some(pixel) = stack.pop() {
        pixels.push(pixel);

        for (dx, dy) in NEIGHBOURS {
            let (Some(nx), Some(ny)) = (
                pixel.x.checked_add_signed(dx),
                pixel.y.checked_add_signed(dy),
            ) else {
                continue;
            };
            if nx >= width || ny >= height || visited[[ny, nx]] || map.score(nx, ny) <= threshold {
                continue;
            }
            visited[[ny, nx]] = true;
            stack.push(PixelCoordinate { x: nx, y: ny });
        }
    }

    pixels
}
