use {
    thiserror::Error,
    crate::entity::AuxiliaryLabel,
};

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures raised synchronously by the pipeline stages. None of them are retried:
/// they describe malformed inputs or stages invoked in the wrong order.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input shape error: {0}")]
    InputShape(String),

    #[error("auxiliary model for {0} has not been fitted")]
    UnfittedModel(AuxiliaryLabel),

    #[error("vocabulary has not been built")]
    VocabularyNotBuilt,

    #[error("vocabulary has already been built")]
    VocabularyAlreadyBuilt,

    #[error("solver error: {0}")]
    Solver(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn input_shape(message: impl Into<String>) -> Self {
        PipelineError::InputShape(message.into())
    }
}
