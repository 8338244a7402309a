use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use duet_foundation::InferenceError;

use crate::model::TokenChunk;

/// Shared slot a driver fills when generation ends in an unrecoverable
/// error. The consumer reads it after the token channel closes.
pub(crate) type FailureSlot = Arc<Mutex<Option<InferenceError>>>;

/// Aborts the wrapped task when dropped, so a cancelled driver takes its
/// spawned model calls down with it.
pub(crate) struct AbortOnDrop<T>(pub JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Non-blocking poll result, see [`ResponseStream::try_next`].
#[derive(Debug)]
pub enum TokenPoll {
    Ready(TokenChunk),
    Pending,
    Finished,
}

/// Consumer handle for one response. Dropping it (or calling
/// [`cancel`](Self::cancel), e.g. on barge-in) aborts the driver and every
/// model task it owns.
pub struct ResponseStream {
    rx: mpsc::Receiver<TokenChunk>,
    driver: JoinHandle<()>,
    failure: FailureSlot,
}

impl ResponseStream {
    pub(crate) fn new(
        rx: mpsc::Receiver<TokenChunk>,
        driver: JoinHandle<()>,
        failure: FailureSlot,
    ) -> Self {
        Self {
            rx,
            driver,
            failure,
        }
    }

    /// Next chunk, or None once the response is complete or cancelled.
    pub async fn next(&mut self) -> Option<TokenChunk> {
        self.rx.recv().await
    }

    pub fn cancel(&mut self) {
        self.driver.abort();
        self.rx.close();
    }

    /// Poll without waiting, for callers that must not block on generation.
    pub fn try_next(&mut self) -> TokenPoll {
        use tokio::sync::mpsc::error::TryRecvError;
        match self.rx.try_recv() {
            Ok(chunk) => TokenPoll::Ready(chunk),
            Err(TryRecvError::Empty) => TokenPoll::Pending,
            Err(TryRecvError::Disconnected) => TokenPoll::Finished,
        }
    }

    /// Terminal generation error, if the driver gave up after its retry.
    /// Meaningful once the stream has finished; a stream that ends without
    /// an error here completed normally.
    pub fn take_error(&self) -> Option<InferenceError> {
        self.failure.lock().take()
    }

    /// Drain the rest of the stream into one string, test and
    /// short-response convenience.
    pub async fn collect_text(mut self) -> String {
        let mut parts = Vec::new();
        while let Some(chunk) = self.next().await {
            parts.push(chunk.text);
        }
        parts.join(" ")
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
