//! Receive a message of unknown length into an exactly-sized allocation.

use std::time::Duration;

use bytes::Bytes;
use tracing::{trace, warn};

use crate::error::Result;
use crate::traits::MessageChannel;

/// Receive the next message from `channel` without a worst-case buffer.
///
/// A one-byte receive is attempted first. It blocks (up to `timeout`) until a
/// message is pending, and either returns a one-byte message whole or leaves
/// a longer message untouched. In the latter case the pending length is
/// queried, exactly that many bytes are allocated, and the message is
/// received with the same timeout.
///
/// An empty result means nothing was received: the timeout expired, the
/// allocation failed, or the message itself was empty. These cases cannot be
/// told apart, so channels used with this helper should not carry
/// zero-length messages.
///
/// Errors are reserved for a closed channel.
pub fn receive_dynamic<C>(channel: &C, timeout: Option<Duration>) -> Result<Bytes>
where
    C: MessageChannel + ?Sized,
{
    let mut probe = [0u8; 1];
    if channel.receive(&mut probe, timeout)? == 1 {
        let Some(mut buf) = allocate(1) else {
            return Ok(Bytes::new());
        };
        buf.push(probe[0]);
        return Ok(Bytes::from(buf));
    }

    let length = channel.next_length();
    if length == 0 {
        return Ok(Bytes::new());
    }

    let Some(mut buf) = allocate(length) else {
        return Ok(Bytes::new());
    };
    buf.resize(length, 0);

    let received = channel.receive(&mut buf, timeout)?;
    buf.truncate(received);
    trace!(length = received, "received dynamically sized message");
    Ok(Bytes::from(buf))
}

fn allocate(length: usize) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    match buf.try_reserve_exact(length) {
        Ok(()) => Some(buf),
        Err(err) => {
            warn!(length, error = %err, "message allocation failed");
            None
        }
    }
}
