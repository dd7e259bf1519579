use bytes::Bytes;
use futures::stream::Stream;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Adapts the relay's event stream into a response body and notices when the
/// client goes away before the upstream stream finished.
///
/// Dropping this drops the inner stream, which drops the upstream response
/// and closes the outbound connection.
pub struct DisconnectStream<S> {
    stream: S,
    completed: bool,
    request_id: String,
    model: String,
}

impl<S> DisconnectStream<S> {
    pub fn new(stream: S, request_id: String, model: String) -> Self {
        Self {
            stream,
            completed: false,
            request_id,
            model,
        }
    }
}

impl<S> Stream for DisconnectStream<S>
where
    S: Stream<Item = String> + Unpin,
{
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.stream).poll_next(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Ok(Bytes::from(event)))),
            Poll::Ready(None) => {
                self.completed = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S> Drop for DisconnectStream<S> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::info!(
                request_id = %self.request_id,
                model = %self.model,
                "Client disconnected before stream completed"
            );
        }
    }
}
