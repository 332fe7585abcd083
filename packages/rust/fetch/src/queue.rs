//! Origin-throttled fetch queue.
//!
//! Every task is bound to a logical origin (see [`OriginResolver`]). The
//! queue guarantees:
//!
//! - at most `concurrency` tasks run at once, across all origins;
//! - at most one task per origin runs at a time, in submission order;
//! - after a task completes, its origin stays idle for `cooldown`;
//! - origins do not wait on each other beyond the global ceiling.
//!
//! Each origin has a lane with a ticket counter. A ticket is taken when the
//! task is *submitted* (synchronously), so FIFO order is submission order no
//! matter when the returned future is first polled. Failures are the task's
//! own output and never block the lane. A future that is dropped before its
//! turn is skipped.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use specindex_shared::FetchConfig;
use tokio::sync::{Semaphore, watch};
use tokio::time::Instant;
use tracing::trace;

use crate::origin::OriginResolver;

// ---------------------------------------------------------------------------
// Lanes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LaneState {
    next_ticket: u64,
    last_done: Option<Instant>,
    /// Tickets whose futures were dropped before being served.
    abandoned: BTreeSet<u64>,
}

/// Per-origin serialization point.
struct Lane {
    /// Ticket currently allowed to run. Only modified under `state`.
    serving: watch::Sender<u64>,
    state: Mutex<LaneState>,
}

impl Lane {
    fn new() -> Self {
        Self {
            serving: watch::Sender::new(0),
            state: Mutex::new(LaneState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LaneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A ticket on a lane. Dropping it hands the lane to the next live ticket.
struct Turn {
    lane: Arc<Lane>,
    ticket: u64,
    started: bool,
}

impl Turn {
    fn take(lane: Arc<Lane>) -> Self {
        let ticket = {
            let mut state = lane.lock();
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            ticket
        };
        Self {
            lane,
            ticket,
            started: false,
        }
    }

    async fn wait(&self) {
        let mut rx = self.lane.serving.subscribe();
        // The sender lives in the lane we hold, so the channel cannot close.
        let _ = rx.wait_for(|serving| *serving == self.ticket).await;
    }
}

impl Drop for Turn {
    fn drop(&mut self) {
        let mut state = self.lane.lock();
        if self.started {
            state.last_done = Some(Instant::now());
        }

        let serving = *self.lane.serving.borrow();
        if serving == self.ticket {
            let mut next = self.ticket + 1;
            while state.abandoned.remove(&next) {
                next += 1;
            }
            self.lane.serving.send_replace(next);
        } else if serving < self.ticket {
            state.abandoned.insert(self.ticket);
        }
    }
}

// ---------------------------------------------------------------------------
// FetchQueue
// ---------------------------------------------------------------------------

/// Bounded, per-origin serialized task queue.
pub struct FetchQueue {
    semaphore: Arc<Semaphore>,
    lanes: Mutex<HashMap<String, Arc<Lane>>>,
    cooldown: Duration,
    origins: OriginResolver,
}

impl FetchQueue {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            lanes: Mutex::new(HashMap::new()),
            cooldown: config.cooldown,
            origins: OriginResolver::new(&config.origin_groups),
        }
    }

    /// Logical origin `url` is serialized on.
    pub fn origin_of(&self, url: &str) -> String {
        self.origins.origin_of(url)
    }

    /// Number of origins seen so far.
    pub fn origin_count(&self) -> usize {
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lane(&self, origin: &str) -> Arc<Lane> {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            lanes
                .entry(origin.to_string())
                .or_insert_with(|| Arc::new(Lane::new())),
        )
    }

    /// Enqueue `task` on the origin of `url`.
    ///
    /// The position in the origin's FIFO is fixed when this is called. The
    /// returned future resolves to the task's own output once it has run, and
    /// borrows neither the queue nor `url`.
    pub fn submit<F, T>(&self, url: &str, task: F) -> impl Future<Output = T> + use<F, T>
    where
        F: Future<Output = T>,
    {
        let origin = self.origin_of(url);
        let mut turn = Turn::take(self.lane(&origin));
        let semaphore = Arc::clone(&self.semaphore);
        let cooldown = self.cooldown;

        async move {
            turn.wait().await;

            let last_done = turn.lane.lock().last_done;
            if let Some(last_done) = last_done {
                tokio::time::sleep_until(last_done + cooldown).await;
            }

            let _permit = semaphore.acquire().await.expect("semaphore closed");
            turn.started = true;
            trace!(origin = %origin, ticket = turn.ticket, "fetch task started");

            task.await
        }
    }
}
