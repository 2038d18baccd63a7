use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use slipway_pipeline::{
    Pipeline, PipelineConfig, DEFAULT_BUFFER_SIZE, DEFAULT_MIN_STACK_SIZE, DEFAULT_TRIGGER_LEVEL,
};

use crate::exit::{pipeline_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod envinfo;
pub mod listen;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one packet into a SLIP frame.
    Encode(EncodeArgs),
    /// Decode SLIP frames into packets.
    Decode(DecodeArgs),
    /// Read a serial device and print decoded packets.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

/// Buffer geometry and timing shared by pipeline-backed commands.
#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// Capacity of each pipeline buffer in bytes.
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,
    /// Bytes buffered before a blocked stream reader wakes.
    #[arg(long, default_value_t = DEFAULT_TRIGGER_LEVEL)]
    pub trigger_level: usize,
    /// Packets are truncated to this many bytes.
    #[arg(long, default_value_t = slipway_frame::DEFAULT_MAX_PACKET_LEN)]
    pub max_packet_len: usize,
    /// Per-operation timeout (e.g. 500ms, 2s).
    #[arg(long, default_value = "500ms")]
    pub timeout: String,
}

impl PipelineArgs {
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            buffer_size: self.buffer_size,
            trigger_level: self.trigger_level,
            max_packet_len: self.max_packet_len,
            min_stack_size: DEFAULT_MIN_STACK_SIZE,
        }
    }

    pub fn timeout(&self) -> CliResult<Duration> {
        parse_duration(&self.timeout)
    }

    pub fn start(&self) -> CliResult<Pipeline> {
        Pipeline::with_config(self.config())
            .map_err(|err| pipeline_error("pipeline create failed", err))
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload (whitespace ignored).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex-encoded wire bytes (whitespace ignored).
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read wire bytes from file. Default: stdin.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial device (or any readable file).
    pub device: PathBuf,
    /// Exit after receiving N packets.
    #[arg(long)]
    pub count: Option<usize>,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }

    #[test]
    fn pipeline_args_map_onto_config() {
        let args = PipelineArgs {
            buffer_size: 64,
            trigger_level: 4,
            max_packet_len: 32,
            timeout: "1s".to_string(),
        };
        let config = args.config();
        assert_eq!(config.buffer_size, 64);
        assert_eq!(config.trigger_level, 4);
        assert_eq!(config.max_packet_len, 32);
        assert_eq!(config.unit_stack_size(), DEFAULT_MIN_STACK_SIZE + 32);
    }
}
