//! Update stream from the coordinator to the UI.
//!
//! - Push based, never polled for state
//! - Unbounded: the coordinator must never block on a slow consumer
//! - `tokio::select!` friendly

use crate::pipeline::events::Update;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Receiving side of coordinator updates.
pub struct UpdateStream {
    receiver: mpsc::UnboundedReceiver<Update>,
}

impl UpdateStream {
    /// Create a connected stream/sender pair.
    pub fn new() -> (Self, UpdateSender) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { receiver }, UpdateSender { sender })
    }

    /// Next update without waiting, if one is queued.
    pub fn try_next(&mut self) -> Option<Update> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for UpdateStream {
    type Item = Update;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Sending side held by the coordinator.
#[derive(Clone)]
pub struct UpdateSender {
    sender: mpsc::UnboundedSender<Update>,
}

impl UpdateSender {
    /// Publish an update. Returns false once the stream has been dropped.
    pub fn send(&self, update: Update) -> bool {
        self.sender.send(update).is_ok()
    }

    /// Whether the receiving side is gone
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Revision;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_receives_updates_in_order() {
        let (mut stream, sender) = UpdateStream::new();
        for _ in 0..3 {
            assert!(sender.send(Update::VerificationPending {
                revision: Revision::ZERO
            }));
        }
        drop(sender);

        let received: Vec<_> = (&mut stream).collect().await;
        assert_eq!(received.len(), 3);
    }

    #[tokio::test]
    async fn test_stream_closes_when_sender_dropped() {
        let (mut stream, sender) = UpdateStream::new();
        drop(sender);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_send_after_stream_dropped() {
        let (stream, sender) = UpdateStream::new();
        drop(stream);
        assert!(sender.is_closed());
        assert!(!sender.send(Update::VerificationPending {
            revision: Revision::ZERO
        }));
    }

    #[tokio::test]
    async fn test_try_next() {
        let (mut stream, sender) = UpdateStream::new();
        assert!(stream.try_next().is_none());
        sender.send(Update::VerificationPending {
            revision: Revision::ZERO,
        });
        assert!(stream.try_next().is_some());
    }
}
