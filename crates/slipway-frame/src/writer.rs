use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{encode_frame, max_frame_len, FrameConfig};
use crate::error::{FrameError, Result};

/// Writes SLIP frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(max_frame_len(config.max_packet_len)),
            config,
        }
    }

    /// Encode and write one packet, then flush.
    ///
    /// Packets longer than the configured maximum are truncated. Empty
    /// packets are skipped without touching the stream. Returns the number
    /// of packet bytes that were framed.
    pub fn send(&mut self, packet: &[u8]) -> Result<usize> {
        if packet.is_empty() {
            return Ok(0);
        }

        let len = packet.len().min(self.config.max_packet_len);
        if len < packet.len() {
            trace!(
                len = packet.len(),
                max = self.config.max_packet_len,
                "packet truncated before framing"
            );
        }

        self.buf.clear();
        encode_frame(&packet[..len], &mut self.buf);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()?;
        Ok(len)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum packet length for subsequent encoding.
    pub fn set_max_packet_len(&mut self, max_packet_len: usize) {
        self.config.max_packet_len = max_packet_len;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::codec::{END, ESC, ESC_END, ESC_ESC};

    fn written(writer: FrameWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn write_single_packet() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(writer.send(b"hi").unwrap(), 2);
        assert_eq!(written(writer), [END, b'h', b'i', END]);
    }

    #[test]
    fn write_escapes_reserved_bytes() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&[END, ESC]).unwrap();
        assert_eq!(written(writer), [END, ESC, ESC_END, ESC, ESC_ESC, END]);
    }

    #[test]
    fn empty_packet_writes_nothing() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(writer.send(&[]).unwrap(), 0);
        assert!(written(writer).is_empty());
    }

    #[test]
    fn oversized_packet_truncated() {
        let cfg = FrameConfig { max_packet_len: 3 };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        assert_eq!(writer.send(b"abcdef").unwrap(), 3);
        assert_eq!(written(writer), [END, b'a', b'b', b'c', END]);
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(b"x").unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.set_max_packet_len(8);
        assert_eq!(writer.config().max_packet_len, 8);

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = RetryOnceWriter::new(ErrorKind::Interrupted);
        let mut writer = FrameWriter::new(writer_impl);
        writer.send(b"retry").unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data, [END, b'r', b'e', b't', b'r', b'y', END]);
    }

    #[test]
    fn handles_would_block_write_and_flush() {
        let writer_impl = RetryOnceWriter::new(ErrorKind::WouldBlock);
        let mut writer = FrameWriter::new(writer_impl);
        writer.send(b"retry").unwrap();

        let inner = writer.into_inner();
        assert!(!inner.data.is_empty());
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn written_bytes_decode() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&[0x00, END, 0xff]).unwrap();

        let mut framed = crate::reader::FrameReader::new(Cursor::new(written(writer)));
        let packet = framed.read_packet().unwrap();
        assert_eq!(packet.as_ref(), &[0x00, END, 0xff]);
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Fails the first write and the first flush with `kind`.
    struct RetryOnceWriter {
        kind: ErrorKind,
        wrote_once: bool,
        flushed_once: bool,
        data: Vec<u8>,
    }

    impl RetryOnceWriter {
        fn new(kind: ErrorKind) -> Self {
            Self {
                kind,
                wrote_once: false,
                flushed_once: false,
                data: Vec::new(),
            }
        }
    }

    impl Write for RetryOnceWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(self.kind));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flushed_once {
                self.flushed_once = true;
                return Err(std::io::Error::from(self.kind));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
