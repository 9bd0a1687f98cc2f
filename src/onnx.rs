use std::path::PathBuf;

use ndarray::Array2;
use ort::{ExecutionProviderDispatch, GraphOptimizationLevel, Session, SessionBuilder};
use thiserror::Error;
use tracing::instrument;

use crate::{
    angle_net::AngleNet, crnn_net::CrnnNet, ctc::CharacterVocabulary, dbnet::DbNet,
    engine::{ImageBuffer, InferenceEngine},
    region::ProbabilityMap,
    OcrError,
};

#[derive(Debug, Error)]
pub enum OnnxError {
    #[error(transparent)]
    Ort(#[from] ort::Error),

    #[error("model produced no outputs")]
    MissingOutput,

    #[error("unexpected output shape {0:?}")]
    UnexpectedShape(Vec<usize>),

    #[error("no orientation classifier model was loaded")]
    NoClassifier,

    #[error("image preprocessing failed")]
    Image(#[source] crate::BoxError),
}

/// PP-OCR detection, orientation and recognition models on ONNX Runtime.
pub struct OnnxEngine {
    det_model: DbNet,
    cls_model: Option<AngleNet>,
    rec_model: CrnnNet,
    vocabulary: CharacterVocabulary,
}

impl<I: ImageBuffer> InferenceEngine<I> for OnnxEngine {
    type Error = OnnxError;

    fn run_detection(&self, image: &I) -> Result<ProbabilityMap, OnnxError> {
        self.det_model.predict(image)
    }

    fn run_classification(&self, image: &I) -> Result<Vec<f32>, OnnxError> {
        self.cls_model
            .as_ref()
            .ok_or(OnnxError::NoClassifier)?
            .predict(image)
    }

    fn run_recognition(&self, image: &I) -> Result<Array2<f32>, OnnxError> {
        self.rec_model.predict(image)
    }

    fn vocabulary(&self) -> &CharacterVocabulary {
        &self.vocabulary
    }
}

impl OnnxEngine {
    pub fn builder() -> OnnxEngineBuilder {
        OnnxEngineBuilder::new()
    }

    pub fn has_classifier(&self) -> bool {
        self.cls_model.is_some()
    }
}

pub struct OnnxEngineBuilder {
    threads: usize,
    det_path: Option<PathBuf>,
    cls_path: Option<PathBuf>,
    rec_paths: Option<(PathBuf, PathBuf)>,
    max_side_len: u32,
    use_space_char: bool,
    cache_path: Option<PathBuf>,
    execution_providers: Vec<ExecutionProvider>,
}

impl OnnxEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn det_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.det_path = Some(path.into());
        self
    }

    pub fn cls_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.cls_path = Some(path.into());
        self
    }

    pub fn rec_model(
        mut self,
        model_path: impl Into<PathBuf>,
        keys_path: impl Into<PathBuf>,
    ) -> Self {
        self.rec_paths = Some((model_path.into(), keys_path.into()));
        self
    }

    pub fn max_side_len(mut self, max_side_len: u32) -> Self {
        self.max_side_len = max_side_len;
        self
    }

    /// Append a space entry to the vocabulary.
    pub fn use_space_char(mut self, use_space_char: bool) -> Self {
        self.use_space_char = use_space_char;
        self
    }

    pub fn with_engine_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn with_execution_providers(
        mut self,
        providers: impl IntoIterator<Item = ExecutionProvider>,
    ) -> Self {
        self.execution_providers = providers.into_iter().collect();
        self
    }

    #[instrument(skip(self))]
    pub fn build(mut self) -> Result<OnnxEngine, OcrError> {
        let det_path = self
            .det_path
            .take()
            .unwrap_or_else(|| "models/ch_PP-OCRv4_det_infer.onnx".into());
        let (rec_path, keys_path) = self.rec_paths.take().unwrap_or_else(|| {
            (
                "models/ch_PP-OCRv4_rec_infer.onnx".into(),
                "models/ppocr_keys_v1.txt".into(),
            )
        });
        let settings = SessionSettings {
            threads: self.threads,
            providers: self.execution_providers.clone(),
            cache_path: self.cache_path.clone(),
        };

        let det_model = DbNet::init(det_path, &settings, self.max_side_len)?;
        let cls_model = self
            .cls_path
            .take()
            .map(|path| AngleNet::init(path, &settings))
            .transpose()?;
        let rec_model = CrnnNet::init(rec_path, &settings)?;
        let vocabulary = CharacterVocabulary::load(keys_path, self.use_space_char)?;

        Ok(OnnxEngine {
            det_model,
            cls_model,
            rec_model,
            vocabulary,
        })
    }
}

impl Default for OnnxEngineBuilder {
    fn default() -> Self {
        Self {
            threads: 4,
            det_path: None,
            cls_path: None,
            rec_paths: None,
            max_side_len: 960,
            use_space_char: false,
            cache_path: None,
            execution_providers: DEFAULT_PROVIDERS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Default,
    #[cfg(feature = "tensorrt")]
    TensorRT,
    #[cfg(feature = "coreml")]
    CoreML,
    #[cfg(feature = "cuda")]
    Cuda,
    #[cfg(feature = "directml")]
    DirectML,
}

const DEFAULT_PROVIDERS: &[ExecutionProvider] = &[
    #[cfg(feature = "tensorrt")]
    ExecutionProvider::TensorRT,
    #[cfg(feature = "coreml")]
    ExecutionProvider::CoreML,
    #[cfg(feature = "directml")]
    ExecutionProvider::DirectML,
    #[cfg(feature = "cuda")]
    ExecutionProvider::Cuda,
    ExecutionProvider::Default,
];

#[derive(Debug, Clone)]
pub(crate) struct SessionSettings {
    pub threads: usize,
    pub providers: Vec<ExecutionProvider>,
    #[cfg_attr(not(feature = "tensorrt"), allow(dead_code))]
    pub cache_path: Option<PathBuf>,
}

/// TensorRT optimisation profile for the model input `x`.
#[cfg_attr(not(feature = "tensorrt"), allow(dead_code))]
pub(crate) struct TensorRtProfile {
    pub min_shape: String,
    pub opt_shape: String,
    pub max_shape: String,
}

impl SessionSettings {
    /// Session builder shared by the three models.
    #[cfg_attr(not(feature = "tensorrt"), allow(unused_variables))]
    pub fn session_builder(
        &self,
        model_path: &std::path::Path,
        profile: TensorRtProfile,
    ) -> ort::Result<SessionBuilder> {
        #[cfg(feature = "directml")]
        let parallel = !self.providers.contains(&ExecutionProvider::DirectML);
        #[cfg(not(feature = "directml"))]
        let parallel = true;

        let providers = self
            .providers
            .iter()
            .filter_map(|provider| -> Option<ExecutionProviderDispatch> {
                match provider {
                    ExecutionProvider::Default => None,
                    #[cfg(feature = "tensorrt")]
                    ExecutionProvider::TensorRT => Some(setup_tensorrt(
                        self.cache_path.clone().unwrap_or_else(|| {
                            model_path
                                .parent()
                                .map(|dir| dir.join(".cache"))
                                .unwrap_or_else(|| PathBuf::from(".cache"))
                        }),
                        &profile,
                    )),
                    #[cfg(feature = "coreml")]
                    ExecutionProvider::CoreML => {
                        Some(ort::CoreMLExecutionProvider::default().build())
                    }
                    #[cfg(feature = "cuda")]
                    ExecutionProvider::Cuda => Some(ort::CUDAExecutionProvider::default().build()),
                    #[cfg(feature = "directml")]
                    ExecutionProvider::DirectML => {
                        Some(ort::DirectMLExecutionProvider::default().build())
                    }
                }
            })
            .collect::<Vec<_>>();

        Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_memory_pattern(parallel)?
            .with_parallel_execution(parallel)?
            .with_inter_threads(self.threads)?
            .with_intra_threads(self.threads)?
            .with_execution_providers(providers)
    }
}

#[cfg(feature = "tensorrt")]
fn setup_tensorrt(cache_path: PathBuf, profile: &TensorRtProfile) -> ExecutionProviderDispatch {
    use ort::TensorRTExecutionProvider;

    TensorRTExecutionProvider::default()
        .with_profile_min_shapes(format!("x:{}", profile.min_shape))
        .with_profile_max_shapes(format!("x:{}", profile.max_shape))
        .with_profile_opt_shapes(format!("x:{}", profile.opt_shape))
        .with_engine_cache(true)
        .with_engine_cache_path(cache_path.to_string_lossy())
        .with_timing_cache(true)
        .with_builder_optimization_level(5)
        .with_detailed_build_log(true)
        .build()
}

/// First output of a session run, as an owned dynamic-rank array.
pub(crate) fn first_output(
    outputs: &ort::SessionOutputs,
) -> Result<ndarray::ArrayD<f32>, OnnxError> {
    let (_, value) = outputs.first_key_value().ok_or(OnnxError::MissingOutput)?;
    Ok(value.try_extract_tensor::<f32>()?.to_owned())
}
