//! Autosave scheduling: trailing-edge debounce with a single in-flight save.
//!
//! The scheduler holds one pending-snapshot slot and one deadline. Each
//! [`notify`](AutosaveScheduler::notify) overwrites the slot and pushes the
//! deadline out by the quiet period. [`poll`](AutosaveScheduler::poll) hands
//! out the slot once the deadline passes, but never while a previous save is
//! still in flight; a deadline that passes during a save fires as soon as
//! that save completes.
//!
//! Failed saves are not retried. The snapshot was taken out of the slot
//! when it fired, so only a later edit schedules another attempt.
//!
//! Time is passed in by the caller so the runtime can drive it from its own
//! clock.

use crate::session::DocumentSnapshot;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
pub struct AutosaveScheduler {
    quiet_period: Duration,
    pending: Option<DocumentSnapshot>,
    deadline: Option<Instant>,
    in_flight: Option<u64>,
    flush_requested: bool,
}

impl AutosaveScheduler {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: None,
            deadline: None,
            in_flight: None,
            flush_requested: false,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Replace the pending snapshot and restart the quiet period.
    pub fn notify(&mut self, now: Instant, snapshot: DocumentSnapshot) {
        if let Some(pending) = self.pending.as_ref() {
            if pending.revision > snapshot.revision {
                debug!(
                    pending = pending.revision,
                    offered = snapshot.revision,
                    "dropping stale autosave snapshot"
                );
                return;
            }
        }
        self.pending = Some(snapshot);
        self.deadline = Some(now + self.quiet_period);
    }

    /// Skip the rest of the quiet period for the pending snapshot.
    ///
    /// # Returns
    /// `false` when there is nothing pending to flush.
    pub fn flush_now(&mut self) -> bool {
        if self.pending.is_none() {
            return false;
        }
        self.flush_requested = true;
        true
    }

    /// Take the pending snapshot if it is due and no save is in flight.
    ///
    /// The returned snapshot is marked in flight until
    /// [`complete`](Self::complete) is called with its revision.
    pub fn poll(&mut self, now: Instant) -> Option<DocumentSnapshot> {
        if self.in_flight.is_some() {
            return None;
        }
        let due = self.flush_requested || self.deadline.is_some_and(|deadline| now >= deadline);
        if !due {
            return None;
        }
        let snapshot = self.pending.take()?;
        self.deadline = None;
        self.flush_requested = false;
        self.in_flight = Some(snapshot.revision);
        debug!(revision = snapshot.revision, "autosave due");
        Some(snapshot)
    }

    /// Record that the in-flight save for `revision` finished (either way).
    pub fn complete(&mut self, revision: u64) {
        if self.in_flight == Some(revision) {
            self.in_flight = None;
        } else {
            debug!(
                revision,
                in_flight = ?self.in_flight,
                "completion for a save that is not in flight"
            );
        }
    }

    /// When the runtime should next call [`poll`](Self::poll); `None` while a
    /// save is in flight or nothing is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.in_flight.is_some() || self.pending.is_none() {
            return None;
        }
        self.deadline
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    /// Nothing pending and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.is_none() && self.in_flight.is_none()
    }
}
