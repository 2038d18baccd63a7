use std::time::Duration;

use crate::error::Result;

/// A bounded byte FIFO without message boundaries.
///
/// Timeouts follow one convention across the crate: `None` blocks until the
/// operation can make progress, `Some(Duration::ZERO)` never blocks.
pub trait ByteChannel: Send + Sync {
    /// Write as many bytes as fit, waiting up to `timeout` for more space.
    ///
    /// Returns the number of bytes written, which may be less than
    /// `data.len()` when the timeout expires.
    fn send(&self, data: &[u8], timeout: Option<Duration>) -> Result<usize>;

    /// Read up to `buf.len()` bytes, waiting up to `timeout` for data.
    fn receive(&self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize>;

    /// Wake every blocked caller and fail all later operations.
    fn close(&self);
}

/// A bounded FIFO that preserves message boundaries.
///
/// Delivery is all-or-nothing in both directions: a message is either
/// stored whole or not at all, and a receive either returns the whole next
/// message or leaves it pending.
pub trait MessageChannel: Send + Sync {
    /// Store `message` whole, waiting up to `timeout` for room.
    ///
    /// Returns `message.len()` on success and `0` otherwise.
    fn send(&self, message: &[u8], timeout: Option<Duration>) -> Result<usize>;

    /// Receive the next message into `buf`.
    ///
    /// Returns `0` without consuming anything if the next message is longer
    /// than `buf`, or if `timeout` expires while the channel is empty.
    fn receive(&self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize>;

    /// Length of the next pending message, or `0` when none is pending.
    fn next_length(&self) -> usize;

    /// Wake every blocked caller and fail all later operations.
    fn close(&self);
}
