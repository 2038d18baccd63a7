use bytes::{Bytes, BytesMut};
use tokio_util::codec;
use tracing::trace;

use crate::codec::{encode_frame, FrameConfig};
use crate::decoder::Decoder;
use crate::error::FrameError;

/// SLIP codec for `tokio_util::codec::{FramedRead, FramedWrite, Framed}`.
///
/// Decoding produces one `Bytes` per non-empty frame. Encoding truncates
/// packets to the configured maximum and skips empty packets entirely.
#[derive(Debug)]
pub struct SlipCodec {
    decoder: Decoder,
    config: FrameConfig,
}

impl SlipCodec {
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            decoder: Decoder::with_max_packet_len(config.max_packet_len),
            config,
        }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn encode_packet(&self, packet: &[u8], dst: &mut BytesMut) {
        if packet.is_empty() {
            return;
        }
        let len = packet.len().min(self.config.max_packet_len);
        if len < packet.len() {
            trace!(
                len = packet.len(),
                max = self.config.max_packet_len,
                "packet truncated before framing"
            );
        }
        encode_frame(&packet[..len], dst);
    }
}

impl Default for SlipCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl codec::Decoder for SlipCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.decoder.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(packet) = self.decoder.decode(src) {
            return Ok(Some(packet));
        }
        // Unterminated tail at EOF is line noise.
        self.decoder.reset();
        Ok(None)
    }
}

impl codec::Encoder<Bytes> for SlipCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode_packet(&item, dst);
        Ok(())
    }
}

impl<'a> codec::Encoder<&'a [u8]> for SlipCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode_packet(item, dst);
        Ok(())
    }
}
