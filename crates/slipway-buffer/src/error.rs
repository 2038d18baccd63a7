/// Errors that can occur in buffer operations.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// The requested capacity cannot hold any data.
    #[error("buffer capacity too small ({capacity} bytes, min {min})")]
    InvalidCapacity { capacity: usize, min: usize },

    /// The trigger level is larger than the buffer can ever hold.
    #[error("trigger level {trigger_level} exceeds buffer capacity {capacity}")]
    InvalidTriggerLevel {
        trigger_level: usize,
        capacity: usize,
    },

    /// The buffer has been closed.
    #[error("buffer closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, BufferError>;
