//! Conversions between the formatter core and LSP types.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tower_lsp::Client;
use tower_lsp::lsp_types::{self, MessageType, Position, Range};

use crate::edits;
use crate::output::OutputSink;

/// Method name used for dynamic formatter registration.
pub const FORMATTING_METHOD: &str = "textDocument/formatting";

/// Registration id of the formatter; one registration at a time.
pub const FORMATTING_REGISTRATION_ID: &str = "mesonfmt-formatting";

/// Language id of meson build files.
pub const MESON_LANGUAGE_ID: &str = "meson";

pub fn to_lsp_position(position: edits::Position) -> Position {
    Position {
        line: position.line,
        character: position.character,
    }
}

pub fn to_lsp_text_edit(edit: &edits::TextEdit) -> lsp_types::TextEdit {
    lsp_types::TextEdit {
        range: Range {
            start: to_lsp_position(edit.range.start),
            end: to_lsp_position(edit.range.end),
        },
        new_text: edit.new_text.clone(),
    }
}

/// Where [`ClientSink`] delivers its messages.
#[async_trait]
pub trait MessageTarget: Send + Sync + 'static {
    /// `window/logMessage`
    async fn log(&self, line: String);

    /// `window/showMessage` as an error
    async fn show(&self, line: String);
}

#[async_trait]
impl MessageTarget for Client {
    async fn log(&self, line: String) {
        self.log_message(MessageType::LOG, line).await;
    }

    async fn show(&self, line: String) {
        self.show_message(MessageType::ERROR, line).await;
    }
}

enum ClientMessage {
    Log(String),
    Show(String),
}

/// [`OutputSink`] writing to the client's log, and raising the last line
/// as a message on `show`.
///
/// Messages reach the client in the order they were produced, through a
/// single forwarding task.
pub struct ClientSink {
    tx: mpsc::UnboundedSender<ClientMessage>,
    last_line: Mutex<Option<String>>,
}

impl ClientSink {
    pub fn new(client: Client) -> Self {
        Self::with_target(client)
    }

    /// Sink forwarding to `target`. Without a Tokio runtime, lines only go
    /// to the `log` facade.
    pub fn with_target<T: MessageTarget>(target: T) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    while let Some(message) = rx.recv().await {
                        match message {
                            ClientMessage::Log(line) => target.log(line).await,
                            ClientMessage::Show(line) => target.show(line).await,
                        }
                    }
                });
            }
            Err(_) => log::warn!("No async runtime; formatter messages are not sent to the client"),
        }

        Self {
            tx,
            last_line: Mutex::new(None),
        }
    }

    fn send(&self, message: ClientMessage) {
        if self.tx.send(message).is_err() {
            log::debug!("Client message dropped: forwarding task is gone");
        }
    }
}

impl OutputSink for ClientSink {
    fn append_line(&self, line: &str) {
        log::info!("{line}");
        if let Ok(mut last) = self.last_line.lock() {
            *last = Some(line.to_string());
        }
        self.send(ClientMessage::Log(line.to_string()));
    }

    fn show(&self, _preserve_focus: bool) {
        let Some(line) = self.last_line.lock().ok().and_then(|l| l.clone()) else {
            return;
        };
        self.send(ClientMessage::Show(line));
    }
}
