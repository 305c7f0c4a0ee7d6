//! Subcommand implementations.
//!
//! Each command drives an open [`Transport`] and writes frame payloads to
//! `out`, one per line. Logs go to stderr through `tracing`.

use std::io::Write;

use anyhow::{Context, Result, bail};
use electrum_network::{Transport, TransportError};
use electrum_protocol::Frame;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::request::{build_request, response_id, terminated};

/// Send one request and print the response carrying its id.
///
/// Frames with another id (subscription notifications) are skipped.
pub async fn call(
    transport: &mut Transport,
    id: u64,
    method: &str,
    params: &[String],
    out: &mut impl Write,
) -> Result<()> {
    let request = build_request(id, method, params).context("encoding request")?;
    transport.send(&request).await?;

    loop {
        let frame = transport
            .recv()
            .await
            .with_context(|| format!("waiting for response to {}", method))?;

        if response_id(frame.payload()) == Some(id) {
            return print_frame(&frame, out);
        }

        debug!("Skipping unrelated frame: {}", frame);
    }
}

/// Send every line, then print as many frames as lines were sent.
pub async fn raw(transport: &mut Transport, lines: &[String], out: &mut impl Write) -> Result<()> {
    for line in lines {
        transport.send(&terminated(line)).await?;
    }

    for received in 0..lines.len() {
        match transport.recv().await {
            Ok(frame) => print_frame(&frame, out)?,
            Err(e) => bail!("stream ended after {} of {} frames: {}", received, lines.len(), e),
        }
    }

    Ok(())
}

/// Forward input lines and print incoming frames until either side ends.
///
/// Returns the number of lines forwarded.
pub async fn interactive<R>(
    transport: &mut Transport,
    input: R,
    out: &mut impl Write,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut forwarded = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("reading input")? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    transport.send(&terminated(&line)).await?;
                    forwarded += 1;
                }
                None => {
                    debug!("Input closed");
                    return Ok(forwarded);
                }
            },
            frame = transport.recv() => match frame {
                Ok(frame) => print_frame(&frame, out)?,
                Err(TransportError::ConnectionClosed) => {
                    info!("Server closed the connection");
                    return Ok(forwarded);
                }
                Err(e) => return Err(e.into()),
            },
        }
    }
}

fn print_frame(frame: &Frame, out: &mut impl Write) -> Result<()> {
    out.write_all(frame.payload())?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
