use std::fs;
use std::io::Read;
use std::thread;
use std::time::Duration;

use slipway_pipeline::Pipeline;
use tracing::debug;

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, pipeline_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{parse_hex, print_packet, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let (wire, source) = resolve_input(&args)?;
    let timeout = args.pipeline.timeout()?;
    let pipeline = args.pipeline.start()?;

    let printed = thread::scope(|scope| -> CliResult<usize> {
        let feeder = thread::Builder::new()
            .name("slip-feed".to_string())
            .spawn_scoped(scope, || feed_all(&pipeline, &wire, timeout))
            .map_err(|err| io_error("failed to start input feeder", err))?;

        let mut printed = 0usize;
        loop {
            // Sampled before the receive so the decoder gets a full timeout
            // after the last input byte.
            let fed = feeder.is_finished();
            let packet = pipeline
                .receive_dynamic(Some(timeout))
                .map_err(|err| pipeline_error("receive failed", err))?;
            if packet.is_empty() {
                if fed {
                    break;
                }
                continue;
            }
            print_packet(printed, &packet, &source, format);
            printed += 1;
        }

        feeder
            .join()
            .map_err(|_| CliError::new(INTERNAL, "input feeder panicked"))??;
        Ok(printed)
    })?;

    debug!(packets = printed, bytes = wire.len(), "decode finished");
    pipeline.destroy();
    Ok(SUCCESS)
}

fn resolve_input(args: &DecodeArgs) -> CliResult<(Vec<u8>, String)> {
    if let Some(hex) = &args.hex {
        return Ok((parse_hex(hex)?, "hex".to_string()));
    }
    if let Some(path) = &args.file {
        let wire = fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return Ok((wire, path.display().to_string()));
    }

    let mut wire = Vec::new();
    std::io::stdin()
        .read_to_end(&mut wire)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok((wire, "stdin".to_string()))
}

fn feed_all(pipeline: &Pipeline, wire: &[u8], timeout: Duration) -> CliResult<()> {
    let mut offset = 0usize;
    while offset < wire.len() {
        let n = pipeline
            .feed_input(&wire[offset..], Some(timeout))
            .map_err(|err| pipeline_error("feed failed", err))?;
        if n == 0 {
            return Err(CliError::new(TIMEOUT, "timed out feeding input"));
        }
        offset += n;
    }
    Ok(())
}
