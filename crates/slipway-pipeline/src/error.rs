use slipway_buffer::BufferError;

/// Errors that can occur while creating or using a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Buffer-level error (invalid geometry at create, or a closed buffer).
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    /// The configuration cannot describe a working pipeline.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// A processing unit thread could not be started.
    #[error("failed to start {unit} unit: {source}")]
    Spawn {
        unit: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
