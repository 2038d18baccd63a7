use slipway_frame::DEFAULT_MAX_PACKET_LEN;

/// Default capacity of each of the four pipeline buffers, in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default stream buffer trigger level.
pub const DEFAULT_TRIGGER_LEVEL: usize = 1;

/// Default fixed part of each unit's stack allowance.
pub const DEFAULT_MIN_STACK_SIZE: usize = 64 * 1024;

/// Configuration for a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity of each buffer in bytes. Message buffers spend
    /// [`LENGTH_PREFIX_SIZE`](slipway_buffer::LENGTH_PREFIX_SIZE) bytes of
    /// this per queued packet.
    pub buffer_size: usize,
    /// Bytes that must be buffered before a blocked stream reader wakes.
    pub trigger_level: usize,
    /// Packets are truncated to this many bytes on send and on decode.
    pub max_packet_len: usize,
    /// Fixed stack allowance per unit, before the packet-length share.
    pub min_stack_size: usize,
}

impl PipelineConfig {
    /// Default configuration with explicit buffer geometry.
    pub fn new(buffer_size: usize, trigger_level: usize) -> Self {
        Self {
            buffer_size,
            trigger_level,
            ..Self::default()
        }
    }

    /// Stack size given to each unit thread.
    pub fn unit_stack_size(&self) -> usize {
        self.min_stack_size.saturating_add(self.max_packet_len)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            trigger_level: DEFAULT_TRIGGER_LEVEL,
            max_packet_len: DEFAULT_MAX_PACKET_LEN,
            min_stack_size: DEFAULT_MIN_STACK_SIZE,
        }
    }
}
