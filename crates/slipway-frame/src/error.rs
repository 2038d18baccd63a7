/// Errors that can occur while reading or writing SLIP frames.
///
/// Framing itself never fails: oversized packets are truncated and unknown
/// escape sequences are decoded leniently. Only the underlying stream can
/// produce an error.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before another complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
