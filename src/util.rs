use image::{DynamicImage, Pixel, Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_polygon_mut, point::Point};
use ndarray::Array3;
use tracing::instrument;

use crate::{rotated_box::Point2D, AxisRect, LocatedText};

#[instrument(level = "debug", skip(image))]
pub(crate) fn subtract_mean_normalize(
    image: &DynamicImage,
    mean_vals: &[f32; 3],
    norm_vals: &[f32; 3],
) -> Array3<f32> {
    let mut image = image.to_rgb32f();
    let norm = Rgb::<f32>(*norm_vals);
    let mean_vals = Rgb::<f32>(*mean_vals).map2(&norm, |c1, c2| c1 * c2);
    for pixel in image.pixels_mut() {
        *pixel = pixel
            .map2(&norm, |c1, c2| c1 * c2)
            .map2(&mean_vals, |c1, c2| c1 - c2);
    }
    Array3::<f32>::from_shape_fn(
        (3, image.height() as usize, image.width() as usize),
        |(ch, y, x)| image.get_pixel(x as u32, y as u32).channels()[ch],
    )
}

#[cfg(feature = "debug")]
pub(crate) fn to_luma_image(data: ndarray::ArrayView2<f32>) -> Option<image::GrayImage> {
    use ndarray::Axis;

    let height = data.len_of(Axis(0));
    let width = data.len_of(Axis(1));
    let pixel_data = data
        .axis_iter(Axis(0))
        .flat_map(|it| it.into_iter())
        .map(|p| (p.clamp(0.0, 1.0) * 255.0) as u8)
        .collect::<Vec<u8>>();
    image::ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
}

/// Detection input size: the longer side capped at `max_side_len`, both sides floored
/// to a multiple of 32 (minimum 32).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub width: u32,
    pub height: u32,
}

pub fn plan_detection_resize(width: u32, height: u32, max_side_len: u32) -> ResizePlan {
    let aspect_ratio = width as f32 / height.max(1) as f32;
    let (mut target_width, mut target_height) = if aspect_ratio >= 1.0 {
        let width = width.min(max_side_len);
        let height = (width as f32 / aspect_ratio) as u32;
        (width, height)
    } else {
        let height = height.min(max_side_len);
        let width = (height as f32 * aspect_ratio) as u32;
        (width, height)
    };
    if target_width % 32 != 0 {
        let new_width = (target_width / 32 * 32).max(32);
        log::debug!(
            "Target width of {target_width} wasn't a multiple of 32, flooring to {new_width}."
        );
        target_width = new_width;
    }
    if target_height % 32 != 0 {
        let new_height = (target_height / 32 * 32).max(32);
        log::debug!(
            "Target height of {target_height} wasn't a multiple of 32, flooring to {new_height}."
        );
        target_height = new_height;
    }
    log::debug!("Detection input resized from (w: {width}, h: {height}) to (w: {target_width}, h: {target_height}).");
    ResizePlan {
        width: target_width,
        height: target_height,
    }
}

/// Bounding rectangle of `polygon`, widened to whole pixels and clamped to the image.
pub fn crop_rect(polygon: &[Point2D], image_width: u32, image_height: u32) -> AxisRect {
    let (min_x, min_y, max_x, max_y) = polygon.iter().fold(
        (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
        |(min_x, min_y, max_x, max_y), p| {
            (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
        },
    );
    if polygon.is_empty() {
        return AxisRect::default();
    }

    let clamp = |v: f32, limit: u32| v.max(0.0).min(limit as f32) as u32;
    let x0 = clamp(min_x.floor(), image_width);
    let y0 = clamp(min_y.floor(), image_height);
    let x1 = clamp(max_x.ceil(), image_width);
    let y1 = clamp(max_y.ceil(), image_height);
    log::trace!("Crop of {polygon:?} is ({x0}, {y0})..({x1}, {y1})");
    AxisRect {
        x: x0,
        y: y0,
        width: x1.saturating_sub(x0),
        height: y1.saturating_sub(y0),
    }
}

/// Copy of `image` with every result's polygon outlined.
pub fn draw_results(image: &DynamicImage, results: &[LocatedText], color: Rgb<u8>) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for result in results {
        let points = result
            .polygon
            .iter()
            .map(|p| Point::new(p.x, p.y))
            .collect::<Vec<_>>();
        // imageproc rejects closed or degenerate outlines.
        if points.first() == points.last() {
            continue;
        }
        draw_hollow_polygon_mut(&mut canvas, &points, color);
    }
    canvas
}
