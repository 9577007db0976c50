//! Upload progress reporting
//!
//! Progress flows from the request body stream to an [`UploadObserver`].
//! The body is split into chunks; each time the transport asks for the next
//! chunk the previous one counts as sent. 100% is reported only once the
//! stream is exhausted, i.e. the whole body has been handed to the
//! transport.

use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

/// Default body chunk size
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Receives upload progress and completion from an [`crate::services::UploadSession`]
pub trait UploadObserver: Send + Sync {
    /// Integer percent, 0-100; non-decreasing during one transmission and
    /// reset to 0 when the submission ends
    fn on_progress(&self, percent: u8);

    /// Called exactly once when a submission is accepted
    fn on_accepted(&self, _result_location: &str) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl UploadObserver for NoopObserver {
    fn on_progress(&self, _percent: u8) {}
}

/// Observer bound to a view lifetime
///
/// Once the token is cancelled (the view was torn down) every callback is a
/// no-op; the operation itself keeps running to completion.
#[derive(Clone)]
pub struct ObserverHandle {
    inner: Arc<dyn UploadObserver>,
    cancel: CancellationToken,
}

impl ObserverHandle {
    pub fn new(inner: Arc<dyn UploadObserver>, cancel: CancellationToken) -> Self {
        Self { inner, cancel }
    }

    /// Handle that is never cancelled
    pub fn detached(inner: Arc<dyn UploadObserver>) -> Self {
        Self::new(inner, CancellationToken::new())
    }

    pub fn noop() -> Self {
        Self::detached(Arc::new(NoopObserver))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn progress(&self, percent: u8) {
        if !self.is_cancelled() {
            self.inner.on_progress(percent);
        }
    }

    pub(crate) fn accepted(&self, result_location: &str) {
        if self.is_cancelled() {
            tracing::debug!("View closed, dropping accepted notification");
            return;
        }
        self.inner.on_accepted(result_location);
    }
}

/// Converts bytes sent into a monotonic integer percentage
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    sent: u64,
    last: u8,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            sent: 0,
            last: 0,
        }
    }

    /// Record `bytes` more sent; never reaches 100 before [`Self::finish`]
    pub fn advance(&mut self, bytes: u64) -> u8 {
        self.sent = self.sent.saturating_add(bytes).min(self.total);
        let percent = if self.total == 0 {
            0
        } else {
            ((self.sent as f64 * 100.0 / self.total as f64).round() as u8).min(99)
        };
        self.last = self.last.max(percent);
        self.last
    }

    /// Whole body transferred
    pub fn finish(&mut self) -> u8 {
        self.last = 100;
        self.last
    }

    pub fn percent(&self) -> u8 {
        self.last
    }
}

/// Progress callback invoked by [`ProgressBody`]
pub type ReportFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Request body stream that reports progress at every chunk boundary
pub struct ProgressBody {
    data: Vec<u8>,
    offset: usize,
    chunk_size: usize,
    pending: usize,
    tracker: ProgressTracker,
    report: ReportFn,
    finished: bool,
}

impl ProgressBody {
    pub fn new(data: Vec<u8>, chunk_size: usize, report: ReportFn) -> Self {
        let total = data.len() as u64;
        Self {
            data,
            offset: 0,
            chunk_size: chunk_size.max(1),
            pending: 0,
            tracker: ProgressTracker::new(total),
            report,
            finished: false,
        }
    }
}

impl Stream for ProgressBody {
    type Item = Result<Vec<u8>, std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.pending > 0 {
            let percent = this.tracker.advance(this.pending as u64);
            this.pending = 0;
            (this.report)(percent);
        }

        if this.offset < this.data.len() {
            let end = (this.offset + this.chunk_size).min(this.data.len());
            let chunk = this.data[this.offset..end].to_vec();
            this.pending = chunk.len();
            this.offset = end;
            return Poll::Ready(Some(Ok(chunk)));
        }

        if !this.finished {
            this.finished = true;
            (this.report)(this.tracker.finish());
        }
        Poll::Ready(None)
    }
}
