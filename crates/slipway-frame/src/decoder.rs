use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::codec::{DEFAULT_MAX_PACKET_LEN, END, ESC, ESC_END, ESC_ESC};

/// Position of the decoder within an escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Between escape sequences.
    Normal,
    /// The previous byte was `ESC`.
    Escaped,
}

/// Incremental SLIP decoder.
///
/// Bytes are fed one at a time (or from a buffer) and a packet is produced
/// whenever an `END` closes a non-empty accumulation. Repeated or leading
/// `END` bytes are empty frame boundaries and produce nothing.
///
/// Decoding never fails:
/// - bytes beyond the maximum packet length are dropped, but escape
///   sequences in the dropped tail are still consumed so the next frame
///   starts cleanly
/// - `ESC` followed by anything other than `ESC_END` or `ESC_ESC` decodes
///   to that byte verbatim, including when it is `END`
#[derive(Debug)]
pub struct Decoder {
    state: DecodeState,
    packet: BytesMut,
    max_packet_len: usize,
    dropped: usize,
}

impl Decoder {
    /// Create a decoder with the default maximum packet length.
    pub fn new() -> Self {
        Self::with_max_packet_len(DEFAULT_MAX_PACKET_LEN)
    }

    /// Create a decoder that keeps at most `max_packet_len` bytes per packet.
    pub fn with_max_packet_len(max_packet_len: usize) -> Self {
        Self {
            state: DecodeState::Normal,
            packet: BytesMut::with_capacity(max_packet_len),
            max_packet_len,
            dropped: 0,
        }
    }

    /// Feed one wire byte.
    pub fn decode_byte(&mut self, byte: u8) -> Option<Bytes> {
        match self.state {
            DecodeState::Normal => match byte {
                END => return self.finish(),
                ESC => self.state = DecodeState::Escaped,
                _ => self.push(byte),
            },
            DecodeState::Escaped => {
                self.state = DecodeState::Normal;
                self.push(match byte {
                    ESC_END => END,
                    ESC_ESC => ESC,
                    other => other,
                });
            }
        }
        None
    }

    /// Consume bytes from `src` until a packet completes.
    ///
    /// Bytes after the completed packet stay in `src`. When no packet
    /// completes, `src` is drained and the partial packet is retained here.
    pub fn decode(&mut self, src: &mut BytesMut) -> Option<Bytes> {
        let mut consumed = 0usize;
        let mut packet = None;
        for &byte in src.iter() {
            consumed += 1;
            if let Some(done) = self.decode_byte(byte) {
                packet = Some(done);
                break;
            }
        }
        src.advance(consumed);
        packet
    }

    /// Discard any partial packet and return to [`DecodeState::Normal`].
    pub fn reset(&mut self) {
        self.state = DecodeState::Normal;
        self.packet.clear();
        self.dropped = 0;
    }

    /// Current escape state.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Bytes accumulated for the packet in progress.
    pub fn pending_len(&self) -> usize {
        self.packet.len()
    }

    /// Maximum packet length kept by this decoder.
    pub fn max_packet_len(&self) -> usize {
        self.max_packet_len
    }

    /// Change the maximum packet length for subsequent bytes.
    pub fn set_max_packet_len(&mut self, max_packet_len: usize) {
        self.max_packet_len = max_packet_len;
    }

    fn push(&mut self, byte: u8) {
        if self.packet.len() < self.max_packet_len {
            self.packet.put_u8(byte);
        } else {
            self.dropped += 1;
        }
    }

    fn finish(&mut self) -> Option<Bytes> {
        if self.dropped > 0 {
            trace!(
                kept = self.packet.len(),
                dropped = self.dropped,
                "packet exceeded maximum length, truncated"
            );
            self.dropped = 0;
        }
        if self.packet.is_empty() {
            return None;
        }
        let packet = Bytes::copy_from_slice(&self.packet);
        self.packet.clear();
        Some(packet)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut Decoder, input: &[u8]) -> Vec<Vec<u8>> {
        input
            .iter()
            .filter_map(|&byte| decoder.decode_byte(byte))
            .map(|packet| packet.to_vec())
            .collect()
    }

    #[test]
    fn simple_decode() {
        const INPUT: [u8; 7] = [0xc0, 0x01, 0x02, 0x03, 0x04, 0x05, 0xc0];
        let mut decoder = Decoder::new();
        assert_eq!(
            decode_all(&mut decoder, &INPUT),
            vec![vec![0x01, 0x02, 0x03, 0x04, 0x05]]
        );
        assert_eq!(decoder.state(), DecodeState::Normal);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn repeated_terminators_emit_nothing() {
        let mut decoder = Decoder::new();
        assert!(decode_all(&mut decoder, &[END; 8]).is_empty());
    }

    #[test]
    fn leading_terminator_is_optional() {
        let mut decoder = Decoder::new();
        assert_eq!(decode_all(&mut decoder, &[0x41, 0x42, END]), vec![b"AB".to_vec()]);
    }

    /// Ensure that [ESC, ESC_END] -> [END]
    #[test]
    fn decode_esc_then_esc_end_sequence() {
        let mut decoder = Decoder::new();
        assert_eq!(
            decode_all(&mut decoder, &[0xc0, 0xdb, 0xdc, 0xc0]),
            vec![vec![0xc0]]
        );
    }

    /// Ensure that [ESC, ESC_ESC] -> [ESC]
    #[test]
    fn decode_esc_then_esc_esc_sequence() {
        let mut decoder = Decoder::new();
        assert_eq!(
            decode_all(&mut decoder, &[0xc0, 0x01, 0xdb, 0xdd, 0x03, 0xc0]),
            vec![vec![0x01, 0xdb, 0x03]]
        );
    }

    #[test]
    fn unknown_escape_keeps_byte() {
        let mut decoder = Decoder::new();
        assert_eq!(
            decode_all(&mut decoder, &[END, 0x01, ESC, 0x41, 0x02, END]),
            vec![vec![0x01, 0x41, 0x02]]
        );
    }

    #[test]
    fn escaped_end_does_not_close_frame() {
        let mut decoder = Decoder::new();
        assert_eq!(
            decode_all(&mut decoder, &[END, 0x01, ESC, END, 0x02, END]),
            vec![vec![0x01, END, 0x02]]
        );
    }

    #[test]
    fn escaped_escape_keeps_byte() {
        let mut decoder = Decoder::new();
        assert_eq!(
            decode_all(&mut decoder, &[END, ESC, ESC, 0x01, END]),
            vec![vec![ESC, 0x01]]
        );
    }

    #[test]
    fn overflow_truncates_and_keeps_decoding() {
        let mut decoder = Decoder::with_max_packet_len(4);
        let input = [END, 1, 2, 3, 4, 5, 6, ESC, ESC_END, 7, END, 8, 9, END];
        assert_eq!(
            decode_all(&mut decoder, &input),
            vec![vec![1, 2, 3, 4], vec![8, 9]]
        );
    }

    #[test]
    fn escape_in_dropped_tail_is_consumed() {
        let mut decoder = Decoder::with_max_packet_len(2);
        // Without consuming ESC, the following ESC_END would be appended to
        // the next packet as a literal byte.
        let input = [END, 1, 2, ESC, ESC_END, END, 3, END];
        assert_eq!(
            decode_all(&mut decoder, &input),
            vec![vec![1, 2], vec![3]]
        );
    }

    #[test]
    fn multi_part_decode() {
        const INPUT_1: [u8; 6] = [0xc0, 0x01, 0x02, 0x03, 0x04, 0xdb];
        const INPUT_2: [u8; 6] = [0xdc, 0x06, 0x07, 0x08, 0x09, 0xc0];
        let mut decoder = Decoder::new();

        assert!(decode_all(&mut decoder, &INPUT_1).is_empty());
        assert_eq!(decoder.state(), DecodeState::Escaped);
        assert_eq!(decoder.pending_len(), 4);

        assert_eq!(
            decode_all(&mut decoder, &INPUT_2),
            vec![vec![0x01, 0x02, 0x03, 0x04, 0xc0, 0x06, 0x07, 0x08, 0x09]]
        );
    }

    #[test]
    fn decode_leaves_trailing_bytes() {
        let mut decoder = Decoder::new();
        let mut src = BytesMut::from(&[END, 0x01, END, 0x02, END][..]);

        let first = decoder.decode(&mut src).unwrap();
        assert_eq!(first.as_ref(), &[0x01]);
        assert_eq!(src.as_ref(), &[0x02, END]);

        let second = decoder.decode(&mut src).unwrap();
        assert_eq!(second.as_ref(), &[0x02]);
        assert!(src.is_empty());
        assert!(decoder.decode(&mut src).is_none());
    }

    #[test]
    fn reset_discards_partial_packet() {
        let mut decoder = Decoder::new();
        decode_all(&mut decoder, &[END, 0x01, 0x02, ESC]);
        decoder.reset();

        assert_eq!(decoder.state(), DecodeState::Normal);
        assert_eq!(decoder.pending_len(), 0);
        assert_eq!(decode_all(&mut decoder, &[ESC_END, END]), vec![vec![ESC_END]]);
    }
}
