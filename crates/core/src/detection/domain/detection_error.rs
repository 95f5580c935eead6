use thiserror::Error;

use crate::shared::model_resolver::ModelResolveError;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("face detection failed: {0}")]
    Inference(String),
    #[error("face detector stopped before delivering a result")]
    Disconnected,
    #[error("failed to load detection model: {0}")]
    Model(String),
    #[error(transparent)]
    Resolve(#[from] ModelResolveError),
}

