//! SLIP (RFC 1055) framing for byte-oriented links.
//!
//! Every packet travels as:
//! - a leading `END` (0xC0) that flushes receiver-side line noise
//! - the payload, with `END` sent as `ESC ESC_END` and `ESC` as `ESC ESC_ESC`
//! - a closing `END`
//!
//! Decoding is incremental and infallible. Oversized packets are truncated
//! rather than rejected.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::SlipCodec;
pub use codec::{
    encode_frame, encoded_len, max_frame_len, FrameConfig, DEFAULT_MAX_PACKET_LEN, END, ESC,
    ESC_END, ESC_ESC,
};
pub use decoder::{DecodeState, Decoder};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
