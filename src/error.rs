use sea_orm::DbErr;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("transient storage error: {0}")]
    TransientStorage(#[from] DbErr),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("model fit failed: {0}")]
    ModelFit(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
