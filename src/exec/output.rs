// src/exec/output.rs

//! Relaying child stdout/stderr to the console.
//!
//! With [`OutputMode::Inherit`] the child writes straight to our streams and
//! nothing happens here. With [`OutputMode::Prefixed`] both pipes are read
//! line by line and each line is written with a `[module.action]` prefix.
//! Lines from concurrently running members interleave freely.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::types::OutputMode;

/// How long relays may keep draining after the process exits. Grandchildren
/// that inherited the pipes can hold them open indefinitely.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

pub(crate) fn configure_stdio(cmd: &mut Command, mode: OutputMode) {
    match mode {
        OutputMode::Inherit => {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        OutputMode::Prefixed => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
    }
}

/// Line relays attached to one child process.
pub(crate) struct OutputRelay {
    handles: Vec<JoinHandle<()>>,
}

impl OutputRelay {
    /// Take the child's pipes (if any) and start relaying them.
    pub(crate) fn attach(child: &mut Child, label: &str) -> Self {
        let mut handles = Vec::new();

        if let Some(stdout) = child.stdout.take() {
            handles.push(spawn_relay(stdout, label.to_string(), Stream::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            handles.push(spawn_relay(stderr, format!("{label} ERR"), Stream::Stderr));
        }

        Self { handles }
    }

    /// Let the relays flush what the process already wrote.
    pub(crate) async fn finish(self) {
        for mut handle in self.handles {
            if tokio::time::timeout(DRAIN_TIMEOUT, &mut handle).await.is_err() {
                debug!("output relay still open after process exit; detaching");
                handle.abort();
            }
        }
    }

    /// Stop relaying immediately.
    pub(crate) fn abort(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

fn spawn_relay<R>(reader: R, prefix: String, stream: Stream) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if let Err(e) = write_line(stream, &prefix, &buf).await {
                        // e.g. our stdout was closed by `| head`
                        debug!(prefix = %prefix, error = %e, "console closed; stopping output relay");
                        break;
                    }
                }
                Err(e) => {
                    debug!(prefix = %prefix, error = %e, "error reading child output");
                    break;
                }
            }
        }
    })
}

/// Write `[prefix] line` with the line decoded lossily, so non-UTF-8 output
/// is shown with replacement characters instead of ending the relay.
async fn write_line(stream: Stream, prefix: &str, raw: &[u8]) -> std::io::Result<()> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_end_matches(['\n', '\r']);
    let line = format!("[{prefix}] {text}\n");

    match stream {
        Stream::Stdout => {
            let mut out = tokio::io::stdout();
            out.write_all(line.as_bytes()).await?;
            out.flush().await
        }
        Stream::Stderr => {
            let mut err = tokio::io::stderr();
            err.write_all(line.as_bytes()).await?;
            err.flush().await
        }
    }
}
