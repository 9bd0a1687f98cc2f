use std::path::PathBuf;

use ndarray::Axis;
use ort::{inputs, Session};
use tracing::instrument;

use crate::{
    engine::ImageBuffer,
    onnx::{first_output, OnnxError, SessionSettings, TensorRtProfile},
    region::ProbabilityMap,
    util::plan_detection_resize,
};

const MEAN_VALUES: [f32; 3] = [0.485, 0.456, 0.406];
const NORM_VALUES: [f32; 3] = [1.0 / 0.229, 1.0 / 0.224, 1.0 / 0.225];

/// DB text detection model.
pub struct DbNet {
    session: Session,
    max_side_len: u32,
}

impl DbNet {
    #[instrument(level = "debug", skip(settings))]
    pub(crate) fn init(
        path: PathBuf,
        settings: &SessionSettings,
        max_side_len: u32,
    ) -> ort::Result<Self> {
        let profile = TensorRtProfile {
            min_shape: "1x3x32x32".into(),
            opt_shape: format!("1x3x{max_side_len}x{max_side_len}"),
            max_shape: format!("1x3x{max_side_len}x{max_side_len}"),
        };
        let session = settings
            .session_builder(&path, profile)?
            .commit_from_file(&path)?;

        log::debug!("DB inputs: {:?}", session.inputs);
        log::debug!("DB outputs: {:?}", session.outputs);

        Ok(Self {
            session,
            max_side_len,
        })
    }

    /// Probability map at the resized detection resolution.
    #[instrument(skip(self, image), level = "debug")]
    pub fn predict<I: ImageBuffer>(&self, image: &I) -> Result<ProbabilityMap, OnnxError> {
        let plan = plan_detection_resize(image.width(), image.height(), self.max_side_len);
        let resized = image
            .resize(plan.width, plan.height)
            .map_err(|e| OnnxError::Image(e.into()))?;
        let input_values = resized
            .to_tensor(&MEAN_VALUES, &NORM_VALUES)
            .insert_axis(Axis(0));

        let outputs = self.session.run(inputs!["x" => input_values]?)?;
        let pred = first_output(&outputs)?;

        let (height, width) = match pred.shape() {
            &[1, 1, height, width] => (height, width),
            other => return Err(OnnxError::UnexpectedShape(other.to_vec())),
        };
        let pred = pred
            .into_shape((height, width))
            .map_err(|_| OnnxError::UnexpectedShape(vec![1, 1, height, width]))?;

        log::trace!("Detection map is {width}x{height}");
        Ok(ProbabilityMap::new(pred))
    }
}
