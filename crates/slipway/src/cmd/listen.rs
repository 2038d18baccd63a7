use std::fs::File;
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use slipway_pipeline::Pipeline;
use tracing::{debug, info};

use crate::cmd::ListenArgs;
use crate::exit::{io_error, pipeline_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_packet, OutputFormat};

const DEVICE_CHUNK_LEN: usize = 256;

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = args.pipeline.timeout()?;
    let device = File::open(&args.device).map_err(|err| {
        io_error(&format!("failed opening {}", args.device.display()), err)
    })?;
    let pipeline = Arc::new(args.pipeline.start()?);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let reader = {
        let pipeline = Arc::clone(&pipeline);
        thread::Builder::new()
            .name("slip-device".to_string())
            .spawn(move || pump(device, &pipeline))
            .map_err(|err| io_error("failed to start device reader", err))?
    };

    let source = args.device.display().to_string();
    info!(device = %source, "listening");

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let at_eof = reader.is_finished();
        let packet = pipeline
            .receive_dynamic(Some(timeout))
            .map_err(|err| pipeline_error("receive failed", err))?;
        if packet.is_empty() {
            if at_eof {
                break;
            }
            continue;
        }

        print_packet(printed, &packet, &source, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    if reader.is_finished() {
        reader
            .join()
            .map_err(|_| CliError::new(INTERNAL, "device reader panicked"))??;
    }

    match Arc::try_unwrap(pipeline) {
        Ok(pipeline) => pipeline.destroy(),
        // A blocking device read cannot be interrupted; process exit ends it.
        Err(_) => debug!("device reader still blocked at exit"),
    }

    debug!(packets = printed, "listen finished");
    Ok(SUCCESS)
}

/// Copy bytes from `source` into the pipeline until EOF.
fn pump<R: Read>(mut source: R, pipeline: &Pipeline) -> CliResult<()> {
    let mut chunk = [0u8; DEVICE_CHUNK_LEN];
    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => {
                debug!("device reached EOF");
                return Ok(());
            }
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error("device read failed", err)),
        };
        pipeline
            .feed_input(&chunk[..n], None)
            .map_err(|err| pipeline_error("feed failed", err))?;
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
