//! User-facing messages.
//!
//! Failures inside the session protocol do not bubble up to a screen; they
//! are turned into short messages and delivered through a [`MessageSink`]
//! the host hands in.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

/// A message to show the user once.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct UiMessage {
    /// Per-sender sequence number, starting at 1.
    pub id: u64,
    /// Text to display.
    pub text: String,
}

/// Receives messages for display.
#[uniffi::export(with_foreign)]
pub trait MessageSink: Send + Sync {
    /// Shows `message`. Must not block.
    fn show(&self, message: UiMessage);
}

/// A [`MessageSink`] feeding an unbounded tokio channel.
pub struct ChannelMessageSink {
    sender: mpsc::UnboundedSender<UiMessage>,
}

impl ChannelMessageSink {
    /// Creates the sink and the receiving half.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl MessageSink for ChannelMessageSink {
    fn show(&self, message: UiMessage) {
        if self.sender.send(message).is_err() {
            log::debug!("message receiver dropped");
        }
    }
}

/// Numbers messages and forwards them to a sink.
pub(crate) struct Messenger {
    sink: Arc<dyn MessageSink>,
    next_id: AtomicU64,
}

impl Messenger {
    pub(crate) fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            sink,
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn send(&self, text: impl Into<String>) {
        let message = UiMessage {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            text: text.into(),
        };
        log::debug!("ui message #{}: {}", message.id, message.text);
        self.sink.show(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_numbered() {
        let (sink, mut receiver) = ChannelMessageSink::channel();
        let messenger = Messenger::new(Arc::new(sink));
        messenger.send("first");
        messenger.send(String::from("second"));

        let first = receiver.try_recv().unwrap();
        let second = receiver.try_recv().unwrap();
        assert_eq!((first.id, first.text.as_str()), (1, "first"));
        assert_eq!((second.id, second.text.as_str()), (2, "second"));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (sink, receiver) = ChannelMessageSink::channel();
        drop(receiver);
        sink.show(UiMessage {
            id: 1,
            text: "lost".to_string(),
        });
    }
}
