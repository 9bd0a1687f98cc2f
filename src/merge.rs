use geo::{Area, Polygon};
use geo_clipper::Clipper;
use tracing::instrument;

use crate::{fit::min_area_rect, rotated_box::RotatedBox};

/// Fixed-point scale for clipper, which works on integer coordinates.
const CLIPPER_FACTOR: f32 = 1024.0;

/// Intersection over union of two polygons; 0 when the union is empty.
pub fn iou(a: &Polygon<f32>, b: &Polygon<f32>) -> f32 {
    let union = a.union(b, CLIPPER_FACTOR).unsigned_area();
    if union <= f32::EPSILON {
        return 0.0;
    }
    a.intersection(b, CLIPPER_FACTOR).unsigned_area() / union
}

/// Folds each box into the first earlier box it overlaps by more than `threshold` IoU.
///
/// A merged box is the minimum-area rectangle around both boxes' corners and keeps the
/// discovery index of the earlier box. Output stays in discovery order.
#[instrument(level = "debug", skip(boxes), fields(boxes = boxes.len()))]
pub fn merge_overlapping(
    boxes: Vec<(usize, RotatedBox)>,
    threshold: f32,
) -> Vec<(usize, RotatedBox)> {
    let mut kept: Vec<(usize, RotatedBox)> = Vec::with_capacity(boxes.len());

    for (index, rect) in boxes {
        let polygon = rect.to_geo();
        let overlapping = kept
            .iter()
            .position(|(_, other)| iou(&other.to_geo(), &polygon) > threshold);

        match overlapping {
            Some(position) => {
                let (kept_index, other) = &mut kept[position];
                let corners = [other.polygon(), rect.polygon()].concat();
                *other = min_area_rect(&corners);
                log::debug!("Merged region {index} into region {kept_index}");
            }
            None => kept.push((index, rect)),
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotated_box::Point2D;

    fn square(x: f32, y: f32, side: f32) -> RotatedBox {
        RotatedBox::new(Point2D::new(x, y), side, side, 0.0)
    }

    #[test]
    fn iou_of_identical_and_disjoint() {
        let a = square(10.0, 10.0, 10.0).to_geo();
        let b = square(50.0, 50.0, 10.0).to_geo();
        assert!((iou(&a, &a) - 1.0).abs() < 1e-3);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = square(10.0, 10.0, 10.0).to_geo();
        let b = square(15.0, 10.0, 10.0).to_geo();
        // 50 / 150
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn overlapping_boxes_merge_into_earlier() {
        let boxes = vec![
            (0, square(10.0, 10.0, 10.0)),
            (1, square(40.0, 40.0, 10.0)),
            (2, square(12.0, 10.0, 10.0)),
        ];
        let merged = merge_overlapping(boxes, 0.3);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].0, 0);
        assert_eq!(merged[1].0, 1);
        assert!((merged[0].1.area() - 120.0).abs() < 1e-2);
    }

    #[test]
    fn light_overlap_is_kept_apart() {
        let boxes = vec![(0, square(10.0, 10.0, 10.0)), (1, square(18.0, 10.0, 10.0))];
        assert_eq!(merge_overlapping(boxes, 0.3).len(), 2);
    }
}
