//! CLI channel: stdin commands in, stdout notifications out, for local runs.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{InboundMessage, MessageId, MessageStream, Notifier};
use crate::error::ChannelError;

/// Sender identity attached to lines typed on stdin.
pub const CLI_SENDER: &str = "local-operator";

/// A simple CLI channel that reads from stdin and writes to stdout.
#[derive(Default)]
pub struct CliChannel {
    sent: AtomicU64,
}

impl CliChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start reading stdin. Each non-empty line becomes one inbound message.
    pub fn start(&self) -> MessageStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let msg = InboundMessage::new("cli", CLI_SENDER, line);
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Box::pin(stream)
    }
}

#[async_trait]
impl Notifier for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn send(&self, text: &str) -> Result<MessageId, ChannelError> {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        println!("\n{}\n", text);
        eprint!("> ");
        Ok(MessageId(format!("cli-{n}")))
    }
}
