use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use slipway_buffer::{
    receive_dynamic, ByteChannel, MessageBuffer, MessageChannel, StreamBuffer, LENGTH_PREFIX_SIZE,
};
use tracing::{debug, trace, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::units::{run_decoder, run_encoder};

const DECODER_UNIT: &str = "slip-rx";
const ENCODER_UNIT: &str = "slip-tx";

/// A running SLIP pipeline.
///
/// Owns four bounded buffers and the two unit threads that connect them:
///
/// ```text
/// feed_input ──▶ [RX stream] ──▶ decoder ──▶ [RX messages] ──▶ receive
/// send       ──▶ [TX messages] ──▶ encoder ──▶ [TX stream] ──▶ drain_output
/// ```
///
/// Every entry point takes an `Option<Duration>` timeout (`None` blocks
/// indefinitely). A timeout is reported as a short byte count, never as an
/// error. Dropping the pipeline tears it down the same way as
/// [`destroy`](Self::destroy).
pub struct Pipeline {
    config: PipelineConfig,
    rx_stream: Arc<StreamBuffer>,
    rx_messages: Arc<MessageBuffer>,
    tx_messages: Arc<MessageBuffer>,
    tx_stream: Arc<StreamBuffer>,
    decoder_unit: Option<JoinHandle<()>>,
    encoder_unit: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Create a pipeline with the given buffer geometry and default limits.
    pub fn create(buffer_size: usize, trigger_level: usize) -> Result<Self> {
        Self::with_config(PipelineConfig::new(buffer_size, trigger_level))
    }

    /// Create a pipeline and start both units.
    ///
    /// Fails on invalid buffer geometry or if a unit thread cannot be
    /// spawned. Nothing is left running on failure.
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        if config.max_packet_len == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_packet_len must be at least 1".to_string(),
            ));
        }

        let rx_stream = Arc::new(StreamBuffer::new(config.buffer_size, config.trigger_level)?);
        let rx_messages = Arc::new(MessageBuffer::new(config.buffer_size)?);
        let tx_messages = Arc::new(MessageBuffer::new(config.buffer_size)?);
        let tx_stream = Arc::new(StreamBuffer::new(config.buffer_size, config.trigger_level)?);

        if config.max_packet_len + LENGTH_PREFIX_SIZE > config.buffer_size {
            warn!(
                buffer_size = config.buffer_size,
                max_packet_len = config.max_packet_len,
                "buffer cannot hold a full-length packet; long packets will be dropped"
            );
        }

        let mut pipeline = Self {
            config,
            rx_stream,
            rx_messages,
            tx_messages,
            tx_stream,
            decoder_unit: None,
            encoder_unit: None,
        };

        // On error `pipeline` drops here, which stops any unit already running.
        pipeline.decoder_unit = Some(pipeline.spawn_decoder()?);
        pipeline.encoder_unit = Some(pipeline.spawn_encoder()?);

        debug!(
            buffer_size = pipeline.config.buffer_size,
            trigger_level = pipeline.config.trigger_level,
            max_packet_len = pipeline.config.max_packet_len,
            stack_size = pipeline.config.unit_stack_size(),
            "pipeline created"
        );
        Ok(pipeline)
    }

    /// Stop both units and release the buffers.
    pub fn destroy(self) {
        drop(self);
    }

    /// Receive one decoded packet into `buf`.
    ///
    /// Returns 0 on timeout, or without consuming anything when the next
    /// packet is longer than `buf`.
    pub fn receive(&self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize> {
        Ok(self.rx_messages.receive(buf, timeout)?)
    }

    /// Receive one decoded packet into an exactly sized buffer.
    ///
    /// An empty result means nothing was received (timeout or allocation
    /// failure).
    pub fn receive_dynamic(&self, timeout: Option<Duration>) -> Result<Bytes> {
        Ok(receive_dynamic(&*self.rx_messages, timeout)?)
    }

    /// Inject raw wire bytes for the decoder. Returns the count accepted.
    pub fn feed_input(&self, bytes: &[u8], timeout: Option<Duration>) -> Result<usize> {
        Ok(self.rx_stream.send(bytes, timeout)?)
    }

    /// Queue one packet for encoding.
    ///
    /// Empty packets return 0 immediately. Packets longer than
    /// `max_packet_len` are truncated. Returns the number of packet bytes
    /// queued, or 0 if the timeout expired first. Also returns 0 without
    /// waiting when the packet plus its length prefix can never fit in the
    /// TX message buffer.
    pub fn send(&self, packet: &[u8], timeout: Option<Duration>) -> Result<usize> {
        if packet.is_empty() {
            return Ok(0);
        }

        let len = packet.len().min(self.config.max_packet_len);
        if len < packet.len() {
            trace!(
                len = packet.len(),
                max = self.config.max_packet_len,
                "packet truncated before queueing"
            );
        }
        Ok(self.tx_messages.send(&packet[..len], timeout)?)
    }

    /// Read encoded wire bytes produced by the encoder.
    pub fn drain_output(&self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize> {
        Ok(self.tx_stream.receive(buf, timeout)?)
    }

    /// Configuration the pipeline was created with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn spawn_decoder(&self) -> Result<JoinHandle<()>> {
        let input = Arc::clone(&self.rx_stream);
        let output = Arc::clone(&self.rx_messages);
        let max_packet_len = self.config.max_packet_len;
        self.spawn_unit(DECODER_UNIT, move || {
            run_decoder(&*input, &*output, max_packet_len)
        })
    }

    fn spawn_encoder(&self) -> Result<JoinHandle<()>> {
        let input = Arc::clone(&self.tx_messages);
        let output = Arc::clone(&self.tx_stream);
        let max_packet_len = self.config.max_packet_len;
        self.spawn_unit(ENCODER_UNIT, move || {
            run_encoder(&*input, &*output, max_packet_len)
        })
    }

    fn spawn_unit<F>(&self, unit: &'static str, body: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        thread::Builder::new()
            .name(unit.to_string())
            .stack_size(self.config.unit_stack_size())
            .spawn(body)
            .map_err(|source| PipelineError::Spawn { unit, source })
    }

    fn shutdown(&mut self) {
        self.rx_stream.close();
        self.rx_messages.close();
        self.tx_messages.close();
        self.tx_stream.close();

        for (unit, handle) in [
            (DECODER_UNIT, self.decoder_unit.take()),
            (ENCODER_UNIT, self.encoder_unit.take()),
        ] {
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    warn!(unit, "unit panicked before teardown");
                }
            }
        }
        debug!("pipeline destroyed");
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("rx_stream", &self.rx_stream)
            .field("rx_messages", &self.rx_messages)
            .field("tx_messages", &self.tx_messages)
            .field("tx_stream", &self.tx_stream)
            .finish()
    }
}
