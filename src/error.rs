use std::path::PathBuf;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("detection model failed")]
    Detection(#[source] BoxError),

    #[error("orientation classifier failed on region {region}")]
    Classification {
        region: usize,
        #[source]
        source: BoxError,
    },

    #[error("recognition model failed on region {region}")]
    Recognition {
        region: usize,
        #[source]
        source: BoxError,
    },

    #[error("image buffer failed on region {region}")]
    Image {
        region: usize,
        #[source]
        source: BoxError,
    },

    #[error("model session error")]
    Model(#[from] ort::Error),

    #[error("failed to read vocabulary {}", path.display())]
    Vocabulary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

impl OcrError {
    pub(crate) fn detection(source: impl Into<BoxError>) -> Self {
        Self::Detection(source.into())
    }

    pub(crate) fn classification(region: usize, source: impl Into<BoxError>) -> Self {
        Self::Classification {
            region,
            source: source.into(),
        }
    }

    pub(crate) fn recognition(region: usize, source: impl Into<BoxError>) -> Self {
        Self::Recognition {
            region,
            source: source.into(),
        }
    }

    pub(crate) fn image(region: usize, source: impl Into<BoxError>) -> Self {
        Self::Image {
            region,
            source: source.into(),
        }
    }
}
