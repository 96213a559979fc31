//! Host runner - read loop, housekeeping tick and output writer

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::{Flow, Host};
use crate::config::Settings;
use fext_core::prelude::*;

/// Period of the widget housekeeping tick
pub const HOUSEKEEPING_INTERVAL: Duration = Duration::from_millis(50);

/// Run the host on the process stdin/stdout
pub async fn run_stdio(settings: Settings) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("fext host starting on stdio");
    info!(
        "interval={}s max_count={} auto_start={}",
        settings.service.interval, settings.service.max_count, settings.service.auto_start
    );
    info!("═══════════════════════════════════════════════════════");

    let result = run(
        &settings,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    info!("fext host exiting");
    result
}

/// Run the host until EOF on `reader` or a `shutdown` request.
///
/// The service is disposed before returning, and every queued line is
/// written to `writer` first.
pub async fn run<R, W>(settings: &Settings, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_lines(out_rx, writer));

    let host = Host::new(settings, out_tx)?;
    let read_result = read_loop(&host, reader).await;

    host.shutdown();
    // Listeners hold the remaining senders; dropping the host closes the
    // channel so the writer drains and exits.
    drop(host);

    let write_result = match writer_task.await {
        Ok(result) => result,
        Err(e) => Err(Error::protocol(format!("writer task failed: {}", e))),
    };

    read_result.and(write_result)
}

async fn read_loop<R>(host: &Host, reader: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut housekeeping = tokio::time::interval(HOUSEKEEPING_INTERVAL);
    housekeeping.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if host.handle_line(&line) == Flow::Shutdown {
                        break;
                    }
                }
                Ok(None) => {
                    info!("Input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    return Err(e.into());
                }
            },
            _ = housekeeping.tick() => {
                host.advance(super::clock_now());
            }
        }
    }

    Ok(())
}

/// Write queued lines, one JSON object per line, flushing each
async fn write_lines<W>(mut rx: mpsc::UnboundedReceiver<String>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
