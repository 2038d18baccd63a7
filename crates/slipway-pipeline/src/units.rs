//! Processing loops run by the pipeline's two unit threads.
//!
//! Each loop blocks on its input buffer without a timeout and exits once a
//! buffer reports it has been closed.

use bytes::BytesMut;
use slipway_buffer::{ByteChannel, MessageChannel};
use slipway_frame::{encode_frame, max_frame_len, Decoder};
use tracing::{debug, trace};

/// Wire bytes pulled from the RX stream per receive.
const RX_CHUNK_LEN: usize = 64;

/// Decode raw bytes from `input` into packets on `output`.
pub(crate) fn run_decoder<B, M>(input: &B, output: &M, max_packet_len: usize)
where
    B: ByteChannel + ?Sized,
    M: MessageChannel + ?Sized,
{
    debug!(max_packet_len, "decoder unit started");
    let mut decoder = Decoder::with_max_packet_len(max_packet_len);
    let mut chunk = [0u8; RX_CHUNK_LEN];

    loop {
        let read = match input.receive(&mut chunk, None) {
            Ok(n) => n,
            Err(err) => {
                debug!(error = %err, "decoder unit stopping");
                return;
            }
        };

        for &byte in &chunk[..read] {
            let Some(packet) = decoder.decode_byte(byte) else {
                continue;
            };
            match output.send(&packet, None) {
                Ok(0) => trace!(len = packet.len(), "decoded packet did not fit, dropped"),
                Ok(len) => trace!(len, "decoded packet"),
                Err(err) => {
                    debug!(error = %err, "decoder unit stopping");
                    return;
                }
            }
        }
    }
}

/// Encode packets from `input` into SLIP frames on `output`.
pub(crate) fn run_encoder<M, B>(input: &M, output: &B, max_packet_len: usize)
where
    M: MessageChannel + ?Sized,
    B: ByteChannel + ?Sized,
{
    debug!(max_packet_len, "encoder unit started");
    let mut packet = vec![0u8; max_packet_len];
    let mut frame = BytesMut::with_capacity(max_frame_len(max_packet_len));

    loop {
        let len = match input.receive(&mut packet, None) {
            Ok(n) => n,
            Err(err) => {
                debug!(error = %err, "encoder unit stopping");
                return;
            }
        };
        if len == 0 {
            continue;
        }

        frame.clear();
        encode_frame(&packet[..len], &mut frame);
        match output.send(&frame, None) {
            Ok(_) => trace!(len, wire_len = frame.len(), "encoded packet"),
            Err(err) => {
                debug!(error = %err, "encoder unit stopping");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use slipway_buffer::{MessageBuffer, StreamBuffer};
    use slipway_frame::{END, ESC, ESC_END};

    use super::*;

    const WAIT: Option<Duration> = Some(Duration::from_secs(2));

    #[test]
    fn decoder_unit_emits_packets_and_stops_on_close() {
        let input = Arc::new(StreamBuffer::new(64, 1).unwrap());
        let output = Arc::new(MessageBuffer::new(64).unwrap());

        let unit = {
            let input = Arc::clone(&input);
            let output = Arc::clone(&output);
            thread::spawn(move || run_decoder(&*input, &*output, 8))
        };

        input
            .send(&[END, 0x01, ESC, ESC_END, END, END, 0x02, END], WAIT)
            .unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(output.receive(&mut buf, WAIT).unwrap(), 2);
        assert_eq!(&buf[..2], &[0x01, END]);
        assert_eq!(output.receive(&mut buf, WAIT).unwrap(), 1);
        assert_eq!(buf[0], 0x02);

        input.close();
        unit.join().unwrap();
    }

    #[test]
    fn decoder_unit_drops_packets_the_buffer_cannot_hold() {
        let input = Arc::new(StreamBuffer::new(64, 1).unwrap());
        // 8 bytes of capacity holds a 4-byte packet, never a 5-byte one.
        let output = Arc::new(MessageBuffer::new(8).unwrap());

        let unit = {
            let input = Arc::clone(&input);
            let output = Arc::clone(&output);
            thread::spawn(move || run_decoder(&*input, &*output, 32))
        };

        input
            .send(&[END, 1, 2, 3, 4, 5, END, 6, END], WAIT)
            .unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(output.receive(&mut buf, WAIT).unwrap(), 1);
        assert_eq!(buf[0], 6);

        output.close();
        input.close();
        unit.join().unwrap();
    }

    #[test]
    fn encoder_unit_frames_packets_and_stops_on_close() {
        let input = Arc::new(MessageBuffer::new(64).unwrap());
        let output = Arc::new(StreamBuffer::new(64, 1).unwrap());

        let unit = {
            let input = Arc::clone(&input);
            let output = Arc::clone(&output);
            thread::spawn(move || run_encoder(&*input, &*output, 8))
        };

        input.send(&[0x01, END], WAIT).unwrap();

        let mut wire = Vec::new();
        let mut buf = [0u8; 16];
        while wire.len() < 5 {
            let n = output.receive(&mut buf, WAIT).unwrap();
            assert!(n > 0, "timed out waiting for frame");
            wire.extend_from_slice(&buf[..n]);
        }
        assert_eq!(wire, [END, 0x01, ESC, ESC_END, END]);

        input.close();
        unit.join().unwrap();
    }
}
