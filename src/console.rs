//! Console channel: one transcript per stdin line, outcome on stdout.
//!
//! Stands in for the speech recogniser: whatever it would have heard is typed
//! (or piped) in. Owns the single [`Assistant`] session. Runs until the
//! `shutdown` token is cancelled (Ctrl-C) or stdin is closed.

use std::io::Write as _;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::assistant::Assistant;
use crate::error::AppError;
use crate::runtime::{Component, ComponentFuture};

pub struct ConsoleChannel {
    channel_id: String,
    assistant: Assistant,
}

impl ConsoleChannel {
    pub fn new(channel_id: impl Into<String>, assistant: Assistant) -> Self {
        Self { channel_id: channel_id.into(), assistant }
    }
}

impl Component for ConsoleChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        let ConsoleChannel { channel_id, assistant } = *self;
        Box::pin(async move {
            println!("─────────────────────────────────");
            println!(" voxdesk console  (Ctrl-C to quit)");
            println!("─────────────────────────────────");
            let stdin = BufReader::new(tokio::io::stdin());
            run_console(channel_id, assistant, stdin, std::io::stdout(), shutdown).await
        })
    }
}

/// Drive `assistant` from `input` lines, writing each outcome to `out`.
pub async fn run_console<R, W>(
    channel_id: String,
    mut assistant: Assistant,
    input: R,
    mut out: W,
    shutdown: CancellationToken,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: std::io::Write,
{
    info!(%channel_id, "console channel started");
    let mut lines = input.lines();

    loop {
        write!(out, "> ")?;
        out.flush()?;

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!(%channel_id, "console channel shutting down");
                break;
            }

            line = lines.next_line() => {
                match line {
                    Err(e) => {
                        warn!(%channel_id, "console read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!(%channel_id, "console stdin closed");
                        break;
                    }
                    Ok(Some(input)) => {
                        let transcript = input.trim();
                        if transcript.is_empty() {
                            continue;
                        }
                        debug!(%channel_id, %transcript, "console received transcript");
                        let outcome = assistant.handle_transcript(transcript).await;
                        writeln!(out, "{outcome}")?;
                    }
                }
            }
        }
    }

    writeln!(out)?;
    out.flush()?;
    Ok(())
}
