//! FIFO admission control for downloads.
//!
//! Jobs queue in arrival order. A job is admitted once it reaches the head
//! of the queue, the active count is under the configured limit, and no
//! other run for the same track id is in flight. The returned guard releases
//! the slot on drop, so every exit path of a download frees its slot.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;
use tracing::{debug, trace};

struct Ticket {
    seq: u64,
    track_id: String,
}

#[derive(Default)]
struct State {
    queue: VecDeque<Ticket>,
    active: HashSet<String>,
    next_seq: u64,
}

struct Inner {
    state: Mutex<State>,
    notify: Notify,
    limit: usize,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("scheduler state poisoned")
    }
}

/// Shared admission gate; clone-cheap via `Arc`.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(concurrent_limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                notify: Notify::new(),
                limit: concurrent_limit.max(1),
            }),
        }
    }

    /// Queue up and wait for admission.
    ///
    /// Fairness is strict: only the head of the queue is ever admitted, so a
    /// blocked head (duplicate track id still active) holds later arrivals
    /// back rather than letting them overtake.
    pub async fn admit(&self, track_id: &str) -> RunGuard {
        let seq = {
            let mut state = self.inner.state();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.queue.push_back(Ticket {
                seq,
                track_id: track_id.to_string(),
            });
            seq
        };
        let mut ticket = QueuedTicket {
            inner: Arc::clone(&self.inner),
            seq,
            admitted: false,
        };
        trace!(track_id, seq, "queued");

        loop {
            // Arm before checking so a release between the check and the
            // await cannot be missed.
            let notified = self.inner.notify.notified();
            {
                let mut state = self.inner.state();
                let at_head = state.queue.front().map(|t| t.seq) == Some(seq);
                if at_head
                    && state.active.len() < self.inner.limit
                    && !state.active.contains(track_id)
                {
                    state.queue.pop_front();
                    state.active.insert(track_id.to_string());
                    ticket.admitted = true;
                    debug!(track_id, active = state.active.len(), "admitted");
                    drop(state);
                    // The new head may be admissible right away.
                    self.inner.notify.notify_waiters();
                    return RunGuard {
                        inner: Arc::clone(&self.inner),
                        track_id: track_id.to_string(),
                    };
                }
            }
            notified.await;
        }
    }

    #[cfg(test)]
    fn active_count(&self) -> usize {
        self.inner.state().active.len()
    }
}

/// Removes an unadmitted ticket if the admission future is dropped, so a
/// cancelled job cannot wedge the queue.
struct QueuedTicket {
    inner: Arc<Inner>,
    seq: u64,
    admitted: bool,
}

impl Drop for QueuedTicket {
    fn drop(&mut self) {
        if !self.admitted {
            let mut state = self.inner.state();
            state.queue.retain(|ticket| ticket.seq != self.seq);
            drop(state);
            self.inner.notify.notify_waiters();
        }
    }
}

/// An admitted run's slot. Dropping it releases the slot and wakes waiters.
pub struct RunGuard {
    inner: Arc<Inner>,
    track_id: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut state = self.inner.state();
        state.active.remove(&self.track_id);
        drop(state);
        self.inner.notify.notify_waiters();
    }
}
