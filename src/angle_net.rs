use std::path::PathBuf;

use ndarray::Axis;
use ort::{inputs, Session};
use tracing::instrument;

use crate::{
    engine::ImageBuffer,
    onnx::{first_output, OnnxError, SessionSettings, TensorRtProfile},
};

const DEST_WIDTH: u32 = 192;
const DEST_HEIGHT: u32 = 48;

const MEAN_VALUES: [f32; 3] = [0.5, 0.5, 0.5];
const NORM_VALUES: [f32; 3] = [2.0, 2.0, 2.0];

/// Text line orientation classifier (0 or 180 degrees).
pub struct AngleNet {
    session: Session,
}

impl AngleNet {
    #[instrument(level = "debug", skip(settings))]
    pub(crate) fn init(path: PathBuf, settings: &SessionSettings) -> ort::Result<Self> {
        let shape = format!("1x3x{DEST_HEIGHT}x{DEST_WIDTH}");
        let profile = TensorRtProfile {
            min_shape: shape.clone(),
            opt_shape: shape.clone(),
            max_shape: shape,
        };
        let session = settings
            .session_builder(&path, profile)?
            .commit_from_file(&path)?;

        log::debug!("Angle session inputs: {:?}", session.inputs);
        log::debug!("Angle session outputs: {:?}", session.outputs);

        Ok(Self { session })
    }

    /// Raw class scores for one crop.
    #[instrument(level = "trace", skip(self, image))]
    pub fn predict<I: ImageBuffer>(&self, image: &I) -> Result<Vec<f32>, OnnxError> {
        let image = image
            .resize(DEST_WIDTH, DEST_HEIGHT)
            .map_err(|e| OnnxError::Image(e.into()))?;
        let input_values = image
            .to_tensor(&MEAN_VALUES, &NORM_VALUES)
            .insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => input_values]?)?;
        let output = first_output(&outputs)?;

        Ok(output.iter().copied().collect())
    }
}
