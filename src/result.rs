use geo::Polygon;
use serde::{Deserialize, Serialize};

use crate::{
    orientation::Orientation,
    rotated_box::{polygon_to_geo, Point2D},
};

/// A recognized piece of text and where it was found, in source image coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedText {
    pub text: String,
    pub confidence: f32,
    /// Padded rotated box, top-left, top-right, bottom-right, bottom-left.
    pub polygon: [Point2D; 4],
    /// The region of the image that was cropped for recognition.
    pub bounds: AxisRect,
    pub orientation: Orientation,
    pub character_scores: Vec<f32>,
}

impl LocatedText {
    pub fn to_geo(&self) -> Polygon<f32> {
        polygon_to_geo(&self.polygon)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub confidence: f32,
    pub character_scores: Vec<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AxisRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
