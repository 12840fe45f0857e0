//! The event stream handed to a run's caller.

use codeflow_core::ToolEvent;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Ordered progress events of one run.
///
/// Ends after the run's `done` or `error` event. Dropping the stream tells
/// the run to stop at its next emit.
pub struct EventStream {
    inner: ReceiverStream<ToolEvent>,
}

impl EventStream {
    pub(crate) fn new(rx: mpsc::Receiver<ToolEvent>) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
        }
    }

    /// Next event, or `None` once the run is over.
    pub async fn recv(&mut self) -> Option<ToolEvent> {
        self.inner.next().await
    }

    /// Drain every remaining event.
    pub async fn collect_all(mut self) -> Vec<ToolEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }
}

impl Stream for EventStream {
    type Item = ToolEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ToolEvent>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
