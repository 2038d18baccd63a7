use bytes::{BufMut, BytesMut};

/// Frame delimiter (TERMINATOR).
pub const END: u8 = 0xC0;

/// Escape introducer.
pub const ESC: u8 = 0xDB;

/// Second byte of an escaped `END`.
pub const ESC_END: u8 = 0xDC;

/// Second byte of an escaped `ESC`.
pub const ESC_ESC: u8 = 0xDD;

/// Default maximum packet length in bytes.
pub const DEFAULT_MAX_PACKET_LEN: usize = 255;

/// Configuration for SLIP framing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Packets longer than this are truncated on encode and on decode.
    pub max_packet_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_packet_len: DEFAULT_MAX_PACKET_LEN,
        }
    }
}

/// Worst-case wire size of a packet of `packet_len` bytes.
pub fn max_frame_len(packet_len: usize) -> usize {
    2 * packet_len + 2
}

/// Exact wire size of `packet` once framed.
pub fn encoded_len(packet: &[u8]) -> usize {
    packet
        .iter()
        .map(|&byte| if matches!(byte, END | ESC) { 2 } else { 1 })
        .sum::<usize>()
        + 2
}

/// Encode one packet as a SLIP frame.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────────────────┬──────┐
/// │ END  │ payload, END → ESC ESC_END       │ END  │
/// │ 0xC0 │          ESC → ESC ESC_ESC       │ 0xC0 │
/// └──────┴──────────────────────────────────┴──────┘
/// ```
///
/// The leading `END` flushes any line noise the receiver has accumulated.
/// No length limit is applied here.
pub fn encode_frame(packet: &[u8], dst: &mut BytesMut) {
    dst.reserve(encoded_len(packet));
    dst.put_u8(END);
    for &byte in packet {
        match byte {
            END => dst.put_slice(&[ESC, ESC_END]),
            ESC => dst.put_slice(&[ESC, ESC_ESC]),
            _ => dst.put_u8(byte),
        }
    }
    dst.put_u8(END);
}
