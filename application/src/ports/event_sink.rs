//! Event sink port
//!
//! The orchestrator reports everything it does as a stream of
//! [`DeliberationEvent`]s written to an [`EventSink`]. The sink is
//! write-only: the orchestrator never reads back what it emitted.

use council_domain::DeliberationEvent;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Destination for deliberation events
///
/// `emit` is synchronous and infallible; a sink whose consumer went away
/// simply drops events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DeliberationEvent);
}

/// Sink backed by an unbounded channel, paired with an [`EventStream`]
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<DeliberationEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, EventStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, EventStream::new(receiver))
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: DeliberationEvent) {
        // Receiver dropped: nobody is listening any more
        let _ = self.sender.send(event);
    }
}

/// Receiving end of a deliberation's event stream
///
/// Ends when the deliberation finishes and its sink is dropped.
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<DeliberationEvent>,
}

impl EventStream {
    pub fn new(receiver: mpsc::UnboundedReceiver<DeliberationEvent>) -> Self {
        Self { receiver }
    }

    /// Next event, or `None` once the stream has ended
    pub async fn recv(&mut self) -> Option<DeliberationEvent> {
        self.receiver.recv().await
    }

    /// Consume the stream and collect every remaining event
    pub async fn collect_all(mut self) -> Vec<DeliberationEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.receiver.recv().await {
            events.push(event);
        }
        events
    }
}

impl Stream for EventStream {
    type Item = DeliberationEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, stream) = ChannelEventSink::new();
        sink.emit(DeliberationEvent::Stage1Start { models: vec![] });
        sink.emit(DeliberationEvent::Complete);
        drop(sink);

        let names: Vec<&str> = stream.collect_all().await.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["stage1_start", "complete"]);
    }

    #[tokio::test]
    async fn test_stream_impl() {
        let (sink, mut stream) = ChannelEventSink::new();
        sink.emit(DeliberationEvent::Complete);
        drop(sink);

        assert_eq!(stream.next().await, Some(DeliberationEvent::Complete));
        assert_eq!(stream.next().await, None);
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_silent() {
        let (sink, stream) = ChannelEventSink::new();
        drop(stream);
        sink.emit(DeliberationEvent::Complete);
    }
}
