//! Work queue with in-flight accounting and a one-shot drain signal
//!
//! The queue tracks two counters: entries waiting (`pending`) and entries
//! handed out but not yet finished (`in_flight`). The drain signal fires the
//! first time both are zero after at least one entry was finished. Children
//! must be enqueued before their parent is finished, so a parent that is
//! still in flight keeps the queue from draining.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::crawl::key::PendingEntry;

/// Counters reported when the queue drains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    /// Number of entries finished over the lifetime of the queue
    pub processed: usize,
}

/// Resolves once, when the queue has drained
///
/// Yields `None` if the queue was closed or dropped before draining.
#[derive(Debug)]
pub struct Drained(oneshot::Receiver<DrainSummary>);

impl Future for Drained {
    type Output = Option<DrainSummary>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx).map(Result::ok)
    }
}

#[derive(Debug)]
pub struct WorkQueue {
    pending: VecDeque<PendingEntry>,
    in_flight: usize,
    processed: usize,
    limit: usize,
    closed: bool,
    drained: Option<oneshot::Sender<DrainSummary>>,
}

impl WorkQueue {
    /// Create a queue that hands out at most `limit` entries at a time
    ///
    /// A limit of zero is clamped to one.
    pub fn new(limit: usize) -> (Self, Drained) {
        let (tx, rx) = oneshot::channel();
        let queue = Self {
            pending: VecDeque::new(),
            in_flight: 0,
            processed: 0,
            limit: limit.max(1),
            closed: false,
            drained: Some(tx),
        };
        (queue, Drained(rx))
    }

    /// Append an entry. Ignored once the queue is closed.
    pub fn enqueue(&mut self, entry: PendingEntry) {
        if self.closed {
            trace!("Queue closed, dropping {}", entry.key);
            return;
        }
        self.pending.push_back(entry);
    }

    /// Take the next entry if the in-flight limit allows it
    ///
    /// Every entry returned here must be reported back with [`finish`](Self::finish).
    pub fn next_ready(&mut self) -> Option<PendingEntry> {
        if self.in_flight >= self.limit {
            return None;
        }
        let entry = self.pending.pop_front()?;
        self.in_flight += 1;
        Some(entry)
    }

    /// Report that an entry returned by `next_ready` is done
    pub fn finish(&mut self) {
        debug_assert!(self.in_flight > 0, "finish called without an entry in flight");
        self.in_flight = self.in_flight.saturating_sub(1);
        self.processed += 1;
        self.signal_if_drained();
    }

    /// Stop accepting work and discard pending entries
    ///
    /// The drain signal will not fire after this.
    pub fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
        self.drained = None;
    }

    fn signal_if_drained(&mut self) {
        if !self.pending.is_empty() || self.in_flight > 0 || self.processed == 0 {
            return;
        }
        if let Some(tx) = self.drained.take() {
            debug!("Work queue drained after {} entries", self.processed);
            let _ = tx.send(DrainSummary {
                processed: self.processed,
            });
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    /// True once the drain signal has fired
    pub fn is_drained(&self) -> bool {
        self.drained.is_none() && !self.closed
    }
}
