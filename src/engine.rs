use std::convert::Infallible;

use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array2, Array3};

use crate::{ctc::CharacterVocabulary, region::ProbabilityMap, util::subtract_mean_normalize, AxisRect};

/// The image operations the pipeline and model wrappers need.
pub trait ImageBuffer: Sized + Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// `rect` is always within bounds and non-empty.
    fn crop(&self, rect: AxisRect) -> Result<Self, Self::Error>;

    fn resize(&self, width: u32, height: u32) -> Result<Self, Self::Error>;

    fn rotate180(&self) -> Result<Self, Self::Error>;

    /// `[3, height, width]` tensor of `(pixel * norm) - (mean * norm)`, pixels in `[0, 1]`.
    fn to_tensor(&self, mean: &[f32; 3], norm: &[f32; 3]) -> Array3<f32>;
}

impl ImageBuffer for DynamicImage {
    type Error = Infallible;

    fn width(&self) -> u32 {
        DynamicImage::width(self)
    }

    fn height(&self) -> u32 {
        DynamicImage::height(self)
    }

    fn crop(&self, rect: AxisRect) -> Result<Self, Self::Error> {
        Ok(self.crop_imm(rect.x, rect.y, rect.width, rect.height))
    }

    fn resize(&self, width: u32, height: u32) -> Result<Self, Self::Error> {
        Ok(self.resize_exact(width, height, FilterType::Nearest))
    }

    fn rotate180(&self) -> Result<Self, Self::Error> {
        Ok(DynamicImage::rotate180(self))
    }

    fn to_tensor(&self, mean: &[f32; 3], norm: &[f32; 3]) -> Array3<f32> {
        subtract_mean_normalize(self, mean, norm)
    }
}

/// Model inference behind the pipeline.
///
/// Implementations own their preprocessing; the pipeline only hands over images and
/// consumes raw outputs. Calls are synchronous and may happen from several worker
/// threads at once.
pub trait InferenceEngine<I: ImageBuffer>: Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Text probability map. It may be smaller than `image`; boxes are scaled back.
    fn run_detection(&self, image: &I) -> Result<ProbabilityMap, Self::Error>;

    /// Two class scores, index 1 meaning "rotated by 180 degrees".
    fn run_classification(&self, image: &I) -> Result<Vec<f32>, Self::Error>;

    /// `[timesteps, classes]` recognizer scores, class 0 being the CTC blank.
    fn run_recognition(&self, image: &I) -> Result<Array2<f32>, Self::Error>;

    fn vocabulary(&self) -> &CharacterVocabulary;
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    #[test]
    fn dynamic_image_crop_and_rotate() {
        let mut canvas = RgbImage::new(4, 3);
        canvas.put_pixel(1, 1, Rgb([255, 0, 0]));
        let image = DynamicImage::ImageRgb8(canvas);

        let crop = ImageBuffer::crop(
            &image,
            AxisRect {
                x: 1,
                y: 1,
                width: 2,
                height: 2,
            },
        )
        .unwrap();
        assert_eq!((ImageBuffer::width(&crop), ImageBuffer::height(&crop)), (2, 2));
        assert_eq!(crop.to_rgb8().get_pixel(0, 0), &Rgb([255, 0, 0]));

        let rotated = ImageBuffer::rotate180(&crop).unwrap();
        assert_eq!(rotated.to_rgb8().get_pixel(1, 1), &Rgb([255, 0, 0]));
    }

    #[test]
    fn tensor_is_channel_first() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 2, Rgb([255, 0, 255])));
        let tensor = image.to_tensor(&[0.5, 0.5, 0.5], &[2.0, 2.0, 2.0]);
        assert_eq!(tensor.dim(), (3, 2, 5));
        assert!((tensor[[0, 1, 4]] - 1.0).abs() < 1e-6);
        assert!((tensor[[1, 0, 0]] + 1.0).abs() < 1e-6);
    }
}
