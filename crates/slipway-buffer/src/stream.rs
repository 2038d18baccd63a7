use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::error::{BufferError, Result};
use crate::traits::ByteChannel;
use crate::wait::{deadline, wait_until};

/// Bounded byte FIFO with a receive trigger level.
///
/// A receiver that finds the buffer empty sleeps until at least
/// `trigger_level` bytes are buffered (or its timeout expires). A receiver
/// that finds any bytes buffered returns them straight away. Raising the
/// trigger level trades latency for fewer wake-ups.
pub struct StreamBuffer {
    state: Mutex<StreamState>,
    readable: Condvar,
    writable: Condvar,
    capacity: usize,
    trigger_level: usize,
}

struct StreamState {
    bytes: VecDeque<u8>,
    closed: bool,
}

impl StreamBuffer {
    /// Create a stream buffer holding at most `capacity` bytes.
    ///
    /// A trigger level of zero behaves like one.
    pub fn new(capacity: usize, trigger_level: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(BufferError::InvalidCapacity { capacity, min: 1 });
        }
        let trigger_level = trigger_level.max(1);
        if trigger_level > capacity {
            return Err(BufferError::InvalidTriggerLevel {
                trigger_level,
                capacity,
            });
        }

        Ok(Self {
            state: Mutex::new(StreamState {
                bytes: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
            capacity,
            trigger_level,
        })
    }

    /// Maximum number of bytes the buffer holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes that must be buffered before a sleeping receiver is woken.
    pub fn trigger_level(&self) -> usize {
        self.trigger_level
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.lock().bytes.len()
    }

    /// Returns true if no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once [`ByteChannel::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ByteChannel for StreamBuffer {
    fn send(&self, data: &[u8], timeout: Option<Duration>) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        let deadline = deadline(timeout);
        let mut state = self.lock();
        let mut written = 0usize;

        loop {
            if state.closed {
                return Err(BufferError::Closed);
            }

            let space = self.capacity - state.bytes.len();
            let n = space.min(data.len() - written);
            if n > 0 {
                state.bytes.extend(&data[written..written + n]);
                written += n;
                if state.bytes.len() >= self.trigger_level {
                    self.readable.notify_one();
                }
            }

            if written == data.len() {
                return Ok(written);
            }

            let (guard, expired) = wait_until(&self.writable, state, deadline);
            state = guard;
            if expired {
                return Ok(written);
            }
        }
    }

    fn receive(&self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let deadline = deadline(timeout);
        let mut state = self.lock();

        if state.bytes.is_empty() {
            loop {
                if state.closed || state.bytes.len() >= self.trigger_level {
                    break;
                }
                let (guard, expired) = wait_until(&self.readable, state, deadline);
                state = guard;
                if expired {
                    break;
                }
            }
        }

        if state.closed {
            return Err(BufferError::Closed);
        }

        let n = state.bytes.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(state.bytes.drain(..n)) {
            *slot = byte;
        }
        if n > 0 {
            self.writable.notify_one();
        }

        Ok(n)
    }

    fn close(&self) {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            debug!(
                capacity = self.capacity,
                buffered = state.bytes.len(),
                "stream buffer closed"
            );
        }
        self.readable.notify_all();
        self.writable.notify_all();
    }
}

impl std::fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("capacity", &self.capacity)
            .field("trigger_level", &self.trigger_level)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Instant;

    use super::*;

    const SHORT: Option<Duration> = Some(Duration::from_millis(50));

    #[test]
    fn send_then_receive() {
        let buffer = StreamBuffer::new(16, 1).unwrap();
        assert_eq!(buffer.send(b"hello", None).unwrap(), 5);

        let mut out = [0u8; 16];
        let n = buffer.receive(&mut out, None).unwrap();
        assert_eq!(&out[..n], b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn receive_respects_caller_buffer_length() {
        let buffer = StreamBuffer::new(16, 1).unwrap();
        buffer.send(b"abcdef", None).unwrap();

        let mut out = [0u8; 4];
        assert_eq!(buffer.receive(&mut out, None).unwrap(), 4);
        assert_eq!(&out, b"abcd");
        assert_eq!(buffer.receive(&mut out, None).unwrap(), 2);
        assert_eq!(&out[..2], b"ef");
    }

    #[test]
    fn send_writes_partially_on_timeout() {
        let buffer = StreamBuffer::new(4, 1).unwrap();
        let written = buffer.send(b"abcdef", Some(Duration::ZERO)).unwrap();
        assert_eq!(written, 4);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn receive_times_out_on_empty_buffer() {
        let buffer = StreamBuffer::new(8, 1).unwrap();
        let mut out = [0u8; 8];

        let start = Instant::now();
        assert_eq!(buffer.receive(&mut out, SHORT).unwrap(), 0);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn zero_timeout_polls_without_blocking() {
        let buffer = StreamBuffer::new(8, 1).unwrap();
        let mut out = [0u8; 8];
        assert_eq!(buffer.receive(&mut out, Some(Duration::ZERO)).unwrap(), 0);
    }

    #[test]
    fn trigger_level_delays_wakeup() {
        let buffer = Arc::new(StreamBuffer::new(8, 4).unwrap());
        let (tx, rx) = mpsc::channel();

        let reader = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut out = [0u8; 8];
                let n = buffer.receive(&mut out, None).unwrap();
                tx.send(out[..n].to_vec()).unwrap();
            })
        };

        thread::sleep(Duration::from_millis(50));
        buffer.send(b"ab", None).unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        buffer.send(b"cd", None).unwrap();
        let got = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(got, b"abcd");

        reader.join().unwrap();
    }

    #[test]
    fn trigger_level_timeout_returns_what_arrived() {
        let buffer = Arc::new(StreamBuffer::new(8, 4).unwrap());

        let reader = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut out = [0u8; 8];
                let n = buffer
                    .receive(&mut out, Some(Duration::from_millis(200)))
                    .unwrap();
                out[..n].to_vec()
            })
        };

        thread::sleep(Duration::from_millis(20));
        buffer.send(b"x", None).unwrap();

        assert_eq!(reader.join().unwrap(), b"x");
    }

    #[test]
    fn buffered_bytes_below_trigger_level_return_immediately() {
        let buffer = StreamBuffer::new(8, 4).unwrap();
        buffer.send(b"z", None).unwrap();

        let mut out = [0u8; 8];
        assert_eq!(buffer.receive(&mut out, None).unwrap(), 1);
        assert_eq!(out[0], b'z');
    }

    #[test]
    fn blocked_sender_resumes_after_drain() {
        let buffer = Arc::new(StreamBuffer::new(4, 1).unwrap());
        buffer.send(b"full", None).unwrap();

        let writer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || buffer.send(b"more", None).unwrap())
        };

        thread::sleep(Duration::from_millis(20));
        let mut collected = Vec::new();
        let mut out = [0u8; 4];
        while collected.len() < 8 {
            let n = buffer
                .receive(&mut out, Some(Duration::from_secs(2)))
                .unwrap();
            assert!(n > 0, "writer never resumed");
            collected.extend_from_slice(&out[..n]);
        }

        assert_eq!(writer.join().unwrap(), 4);
        assert_eq!(collected, b"fullmore");
    }

    #[test]
    fn close_wakes_blocked_receiver() {
        let buffer = Arc::new(StreamBuffer::new(8, 1).unwrap());

        let reader = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut out = [0u8; 1];
                buffer.receive(&mut out, None)
            })
        };

        thread::sleep(Duration::from_millis(20));
        buffer.close();

        assert!(matches!(reader.join().unwrap(), Err(BufferError::Closed)));
        assert!(buffer.is_closed());
        assert!(matches!(buffer.send(b"x", None), Err(BufferError::Closed)));
    }

    #[test]
    fn close_wakes_blocked_sender() {
        let buffer = Arc::new(StreamBuffer::new(2, 1).unwrap());
        buffer.send(b"xx", None).unwrap();

        let writer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || buffer.send(b"y", None))
        };

        thread::sleep(Duration::from_millis(20));
        buffer.close();

        assert!(matches!(writer.join().unwrap(), Err(BufferError::Closed)));
    }

    #[test]
    fn rejects_invalid_geometry() {
        assert!(matches!(
            StreamBuffer::new(0, 1),
            Err(BufferError::InvalidCapacity { .. })
        ));
        assert!(matches!(
            StreamBuffer::new(4, 5),
            Err(BufferError::InvalidTriggerLevel { .. })
        ));
        assert_eq!(StreamBuffer::new(4, 0).unwrap().trigger_level(), 1);
    }
}
