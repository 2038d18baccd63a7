use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::exit::{CliError, CliResult, DATA_INVALID};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    schema_id: &'a str,
    index: usize,
    size: usize,
    payload_hex: String,
    payload: String,
    source: &'a str,
    timestamp: String,
}

/// Print one decoded packet.
pub fn print_packet(index: usize, packet: &[u8], source: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                schema_id: "slipway/cli/v1/packet-decoded",
                index,
                size: packet.len(),
                payload_hex: hex::encode(packet),
                payload: payload_preview(packet),
                source,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "SIZE", "SOURCE", "HEX", "PAYLOAD"])
                .add_row(vec![
                    index.to_string(),
                    packet.len().to_string(),
                    source.to_string(),
                    hex::encode(packet),
                    payload_preview(packet),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "packet={} size={} source={} hex={} payload={}",
                index,
                packet.len(),
                source,
                hex::encode(packet),
                payload_preview(packet)
            );
        }
        OutputFormat::Raw => {
            print_raw(packet);
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    schema_id: &'a str,
    packet_size: usize,
    frame_size: usize,
    truncated: bool,
    frame_hex: String,
}

/// Print one encoded frame.
pub fn print_frame(frame: &[u8], packet_size: usize, truncated: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                schema_id: "slipway/cli/v1/frame-encoded",
                packet_size,
                frame_size: frame.len(),
                truncated,
                frame_hex: hex::encode(frame),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PACKET", "FRAME", "TRUNCATED", "HEX"])
                .add_row(vec![
                    packet_size.to_string(),
                    frame.len().to_string(),
                    truncated.to_string(),
                    hex::encode(frame),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "packet={} frame={} truncated={} hex={}",
                packet_size,
                frame.len(),
                truncated,
                hex::encode(frame)
            );
        }
        OutputFormat::Raw => {
            print_raw(frame);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Parse hex input, ignoring whitespace and an optional `0x` prefix.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input.split_whitespace().collect();
    let digits = digits.strip_prefix("0x").unwrap_or(&digits);
    hex::decode(digits).map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex: {err}")))
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
