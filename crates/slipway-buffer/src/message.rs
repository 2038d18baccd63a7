use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{BufferError, Result};
use crate::traits::MessageChannel;
use crate::wait::{deadline, wait_until};

/// Bytes of bookkeeping stored alongside every message.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Bounded FIFO of discrete messages.
///
/// Capacity is counted in bytes: each stored message consumes its own length
/// plus [`LENGTH_PREFIX_SIZE`].
pub struct MessageBuffer {
    state: Mutex<MessageState>,
    readable: Condvar,
    writable: Condvar,
    capacity: usize,
}

struct MessageState {
    messages: VecDeque<Bytes>,
    used: usize,
    closed: bool,
}

fn stored_size(len: usize) -> usize {
    len + LENGTH_PREFIX_SIZE
}

impl MessageBuffer {
    /// Create a message buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity <= LENGTH_PREFIX_SIZE {
            return Err(BufferError::InvalidCapacity {
                capacity,
                min: LENGTH_PREFIX_SIZE + 1,
            });
        }

        Ok(Self {
            state: Mutex::new(MessageState {
                messages: VecDeque::new(),
                used: 0,
                closed: false,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
            capacity,
        })
    }

    /// Capacity in bytes, length prefixes included.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest message this buffer can ever accept.
    pub fn max_message_len(&self) -> usize {
        self.capacity - LENGTH_PREFIX_SIZE
    }

    /// Number of messages waiting.
    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    /// Returns true if no message is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free space in bytes.
    pub fn available(&self) -> usize {
        self.capacity - self.lock().used
    }

    /// Returns true once [`MessageChannel::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, MessageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MessageChannel for MessageBuffer {
    fn send(&self, message: &[u8], timeout: Option<Duration>) -> Result<usize> {
        let cost = stored_size(message.len());
        if cost > self.capacity {
            trace!(
                len = message.len(),
                capacity = self.capacity,
                "message larger than buffer, refused"
            );
            return Ok(0);
        }

        let deadline = deadline(timeout);
        let mut state = self.lock();

        loop {
            if state.closed {
                return Err(BufferError::Closed);
            }

            if self.capacity - state.used >= cost {
                state.messages.push_back(Bytes::copy_from_slice(message));
                state.used += cost;
                self.readable.notify_one();
                return Ok(message.len());
            }

            let (guard, expired) = wait_until(&self.writable, state, deadline);
            state = guard;
            if expired {
                return Ok(0);
            }
        }
    }

    fn receive(&self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize> {
        let deadline = deadline(timeout);
        let mut state = self.lock();

        loop {
            if state.closed {
                return Err(BufferError::Closed);
            }

            if state
                .messages
                .front()
                .is_some_and(|next| next.len() > buf.len())
            {
                return Ok(0);
            }

            if let Some(message) = state.messages.pop_front() {
                let len = message.len();
                buf[..len].copy_from_slice(&message);
                state.used -= stored_size(len);
                self.writable.notify_one();
                return Ok(len);
            }

            let (guard, expired) = wait_until(&self.readable, state, deadline);
            state = guard;
            if expired {
                return Ok(0);
            }
        }
    }

    fn next_length(&self) -> usize {
        self.lock().messages.front().map_or(0, Bytes::len)
    }

    fn close(&self) {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            debug!(
                capacity = self.capacity,
                pending = state.messages.len(),
                "message buffer closed"
            );
        }
        self.readable.notify_all();
        self.writable.notify_all();
    }
}

impl std::fmt::Debug for MessageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
