use std::fs;

use slipway_frame::encoded_len;
use slipway_pipeline::Pipeline;
use tracing::warn;

use crate::cmd::EncodeArgs;
use crate::exit::{io_error, pipeline_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{parse_hex, print_frame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    if payload.is_empty() {
        return Err(CliError::new(
            USAGE,
            "nothing to encode: provide --data, --hex, or --file with a non-empty packet",
        ));
    }

    let timeout = args.pipeline.timeout()?;
    let pipeline = args.pipeline.start()?;

    let queued = pipeline
        .send(&payload, Some(timeout))
        .map_err(|err| pipeline_error("send failed", err))?;
    if queued == 0 {
        return Err(CliError::new(
            TIMEOUT,
            "send timed out: packet does not fit the pipeline buffer",
        ));
    }
    let truncated = queued < payload.len();
    if truncated {
        warn!(
            len = payload.len(),
            max = pipeline.config().max_packet_len,
            "packet truncated"
        );
    }

    let frame = drain_frame(&pipeline, encoded_len(&payload[..queued]), timeout)?;
    pipeline.destroy();

    print_frame(&frame, queued, truncated, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

fn drain_frame(
    pipeline: &Pipeline,
    frame_len: usize,
    timeout: std::time::Duration,
) -> CliResult<Vec<u8>> {
    let mut frame = vec![0u8; frame_len];
    let mut filled = 0usize;
    while filled < frame_len {
        let n = pipeline
            .drain_output(&mut frame[filled..], Some(timeout))
            .map_err(|err| pipeline_error("drain failed", err))?;
        if n == 0 {
            return Err(CliError::new(TIMEOUT, "timed out waiting for encoded output"));
        }
        filled += n;
    }
    Ok(frame)
}
