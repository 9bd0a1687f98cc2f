use std::path::PathBuf;

use ndarray::{Array2, Axis};
use ort::{inputs, Session};
use tracing::instrument;

use crate::{
    engine::ImageBuffer,
    onnx::{first_output, OnnxError, SessionSettings, TensorRtProfile},
};

const DEST_HEIGHT: u32 = 48;
const MIN_WIDTH: u32 = 32;
const MAX_WIDTH: u32 = 1280;

const MEAN_VALUES: [f32; 3] = [0.5, 0.5, 0.5];
const NORM_VALUES: [f32; 3] = [2.0, 2.0, 2.0];

/// CRNN text recognizer producing per-timestep class scores.
pub struct CrnnNet {
    session: Session,
}

impl CrnnNet {
    #[instrument(level = "debug", skip(settings))]
    pub(crate) fn init(model_path: PathBuf, settings: &SessionSettings) -> ort::Result<Self> {
        let profile = TensorRtProfile {
            min_shape: format!("1x3x{DEST_HEIGHT}x{MIN_WIDTH}"),
            opt_shape: format!("1x3x{DEST_HEIGHT}x320"),
            max_shape: format!("1x3x{DEST_HEIGHT}x{MAX_WIDTH}"),
        };
        let session = settings
            .session_builder(&model_path, profile)?
            .commit_from_file(&model_path)?;

        log::debug!("CRNN Inputs: {:?}", session.inputs);
        log::debug!("CRNN Outputs: {:?}", session.outputs);

        Ok(Self { session })
    }

    /// `[timesteps, classes]` scores for one crop, resized to the model height.
    #[instrument(level = "trace", skip(self, image))]
    pub fn predict<I: ImageBuffer>(&self, image: &I) -> Result<Array2<f32>, OnnxError> {
        let scale = DEST_HEIGHT as f32 / image.height().max(1) as f32;
        let dest_width = ((image.width() as f32 * scale) as u32).clamp(MIN_WIDTH, MAX_WIDTH);
        let image = image
            .resize(dest_width, DEST_HEIGHT)
            .map_err(|e| OnnxError::Image(e.into()))?;

        let tensor_values = image
            .to_tensor(&MEAN_VALUES, &NORM_VALUES)
            .insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => tensor_values]?)?;
        let output = first_output(&outputs)?;

        log::trace!("Output tensor size: {:?}", output.dim());
        let (timesteps, classes) = match output.shape() {
            &[1, timesteps, classes] => (timesteps, classes),
            other => return Err(OnnxError::UnexpectedShape(other.to_vec())),
        };
        output
            .into_shape((timesteps, classes))
            .map_err(|_| OnnxError::UnexpectedShape(vec![1, timesteps, classes]))
    }
}
