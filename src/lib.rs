mod angle_net;
mod crnn_net;
pub mod ctc;
mod dbnet;
pub mod engine;
mod error;
pub mod fit;
pub mod hull;
pub mod merge;
pub mod onnx;
mod options;
pub mod orientation;
pub mod region;
mod result;
pub mod rotated_box;
pub mod util;

use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use tracing::instrument;

pub use ctc::CharacterVocabulary;
pub use engine::{ImageBuffer, InferenceEngine};
pub use error::*;
pub use onnx::{ExecutionProvider, OnnxEngine, OnnxEngineBuilder};
pub use options::PipelineConfig;
pub use orientation::Orientation;
pub use region::ProbabilityMap;
pub use result::*;
pub use rotated_box::{PaddingPolicy, Point2D, RotatedBox};

pub use ort as runtime;

use crate::{
    ctc::decode, fit::min_area_rect, merge::merge_overlapping, orientation::classify,
    region::extract, util::crop_rect,
};

pub struct TextSpotterBuilder {
    config: PipelineConfig,
    threads: usize,
}

impl TextSpotterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Worker threads for per-region work. 1 keeps everything on the calling thread.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[instrument(skip(self, engine))]
    pub fn build<E>(self, engine: E) -> Result<TextSpotter<E>, OcrError> {
        self.config.validate()?;
        let pool = if self.threads > 1 {
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(self.threads)
                    .thread_name(|i| format!("textspot-{i}"))
                    .build()?,
            )
        } else {
            None
        };
        Ok(TextSpotter {
            engine,
            config: self.config,
            pool,
        })
    }
}

impl Default for TextSpotterBuilder {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            threads: 1,
        }
    }
}

/// Detection, orientation and recognition post-processing over an [`InferenceEngine`].
pub struct TextSpotter<E> {
    engine: E,
    config: PipelineConfig,
    pool: Option<ThreadPool>,
}

/// A padded box ready for cropping, in image coordinates.
struct Candidate {
    index: usize,
    polygon: [Point2D; 4],
}

impl<E> TextSpotter<E> {
    pub fn builder() -> TextSpotterBuilder {
        TextSpotterBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Fitted and padded boxes for every region of `map`, in map coordinates.
    ///
    /// Each box carries the discovery index of its region. Boxes are merged first when
    /// a merge threshold is configured.
    #[instrument(skip(self, map), level = "debug")]
    pub fn locate(&self, map: &ProbabilityMap) -> Vec<(usize, RotatedBox)> {
        let regions = extract(map, self.config.det_threshold, self.config.min_region_size);
        let boxes = regions
            .iter()
            .enumerate()
            .map(|(index, region)| {
                let mut rect = min_area_rect(&region.points());
                let padding = self.config.padding.apply(&mut rect);
                log::trace!("Region {index}: {} pixels, padding {padding}", region.len());
                (index, rect)
            })
            .collect::<Vec<_>>();

        match self.config.merge_iou_threshold {
            Some(threshold) => merge_overlapping(boxes, threshold),
            None => boxes,
        }
    }

    /// Runs the whole pipeline on `image`.
    ///
    /// Results are in region discovery order. Regions whose crop is empty or whose
    /// recognition confidence is below the configured threshold are left out. Any
    /// collaborator failure fails the whole call.
    #[instrument(skip(self, image))]
    pub fn recognize<I>(&self, image: &I) -> Result<Vec<LocatedText>, OcrError>
    where
        I: ImageBuffer,
        E: InferenceEngine<I>,
    {
        let map = self
            .engine
            .run_detection(image)
            .map_err(OcrError::detection)?;
        if map.is_empty() {
            log::debug!("Detection returned an empty probability map");
            return Ok(Vec::new());
        }

        #[cfg(feature = "debug")]
        if let Some(luma) = util::to_luma_image(map.view()) {
            if let Err(e) = luma.save("probability_map.png") {
                log::warn!("Failed to save probability map: {e}");
            }
        }

        let scale_x = image.width() as f32 / map.width() as f32;
        let scale_y = image.height() as f32 / map.height() as f32;
        let candidates = self
            .locate(&map)
            .into_iter()
            .map(|(index, rect)| Candidate {
                index,
                polygon: rect
                    .polygon()
                    .map(|p| Point2D::new(p.x * scale_x, p.y * scale_y)),
            })
            .collect::<Vec<_>>();

        let outcomes = match &self.pool {
            Some(pool) => pool.install(|| {
                candidates
                    .par_iter()
                    .map(|candidate| self.read_region(image, candidate))
                    .collect::<Result<Vec<_>, _>>()
            })?,
            None => candidates
                .iter()
                .map(|candidate| self.read_region(image, candidate))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let results = outcomes.into_iter().flatten().collect::<Vec<_>>();
        log::debug!(
            "Accepted {} of {} candidate regions",
            results.len(),
            candidates.len()
        );
        Ok(results)
    }

    #[instrument(level = "trace", skip(self, image, candidate), fields(region = candidate.index))]
    fn read_region<I>(&self, image: &I, candidate: &Candidate) -> Result<Option<LocatedText>, OcrError>
    where
        I: ImageBuffer,
        E: InferenceEngine<I>,
    {
        let index = candidate.index;
        let bounds = crop_rect(&candidate.polygon, image.width(), image.height());
        if bounds.is_empty() {
            log::debug!("Region {index} crops to nothing, skipping");
            return Ok(None);
        }
        let mut crop = image
            .crop(bounds)
            .map_err(|e| OcrError::image(index, e))?;

        let mut orientation = Orientation::Upright;
        if self.config.classify {
            let scores = self
                .engine
                .run_classification(&crop)
                .map_err(|e| OcrError::classification(index, e))?;
            orientation = classify(&scores, self.config.cls_threshold);
            if orientation == Orientation::Rotated180 {
                crop = crop.rotate180().map_err(|e| OcrError::image(index, e))?;
            }
        }

        let scores = self
            .engine
            .run_recognition(&crop)
            .map_err(|e| OcrError::recognition(index, e))?;
        let line = decode(scores.view(), self.engine.vocabulary());

        // NaN confidence is rejected too.
        let accepted = line.confidence >= self.config.rec_score_threshold;
        if !accepted {
            log::debug!(
                "Region {index} rejected: {:?} scored {} < {}",
                line.text,
                line.confidence,
                self.config.rec_score_threshold
            );
            return Ok(None);
        }

        Ok(Some(LocatedText {
            text: line.text,
            confidence: line.confidence,
            polygon: candidate.polygon,
            bounds,
            orientation,
            character_scores: line.character_scores,
        }))
    }
}
