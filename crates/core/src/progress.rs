//! Progress accounting
//!
//! [`ProgressState`] is the single owned counter set for one pipeline run.
//! Renderers wrap it and implement [`ProgressSink`]; the executor reports
//! deltas through [`ProgressSink::update`] and never touches the totals
//! directly.
//!
//! Bytes of the job currently streaming are kept apart from completed
//! bytes. They are shown while the job runs and dropped if it fails, so
//! the completed counters only ever grow and end up equal to the sum of
//! the jobs that finished.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::Error;

/// Point-in-time view of the counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Objects fully transferred
    pub objects: u64,
    /// Bytes of fully transferred objects
    pub bytes: u64,
    /// Bytes received so far for the object in flight
    pub in_flight_bytes: u64,
    /// Expected bytes of every object started so far
    pub total_bytes: u64,
    pub elapsed_secs: f64,
}

impl ProgressSnapshot {
    /// Bytes to show on a live display
    pub fn displayed_bytes(&self) -> u64 {
        self.bytes + self.in_flight_bytes
    }
}

#[derive(Debug, Clone)]
pub struct ProgressState {
    objects: u64,
    bytes: u64,
    in_flight: u64,
    total_bytes: u64,
    start: Instant,
}

impl ProgressState {
    pub fn new() -> Self {
        Self {
            objects: 0,
            bytes: 0,
            in_flight: 0,
            total_bytes: 0,
            start: Instant::now(),
        }
    }

    pub fn add_total(&mut self, bytes: u64) {
        self.total_bytes = self.total_bytes.saturating_add(bytes);
    }

    /// Byte deltas accumulate against the in-flight object; an object delta
    /// commits them.
    pub fn apply(&mut self, delta_bytes: u64, delta_objects: u64) {
        self.in_flight = self.in_flight.saturating_add(delta_bytes);
        if delta_objects > 0 {
            self.objects += delta_objects;
            self.bytes = self.bytes.saturating_add(self.in_flight);
            self.in_flight = 0;
        }
    }

    /// Forget bytes of an object that did not complete
    pub fn abandon_in_flight(&mut self) {
        self.in_flight = 0;
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            objects: self.objects,
            bytes: self.bytes,
            in_flight_bytes: self.in_flight,
            total_bytes: self.total_bytes,
            elapsed_secs: self.elapsed().as_secs_f64(),
        }
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives progress for one pipeline run
pub trait ProgressSink: Send {
    /// Grow the expected total when a transfer starts
    fn add_total(&mut self, bytes: u64);

    /// Report newly transferred bytes and completed objects
    fn update(&mut self, delta_bytes: u64, delta_objects: u64);

    fn snapshot(&self) -> ProgressSnapshot;

    /// Render the last snapshot. Called exactly once per run, with the
    /// error that ended it, if any.
    fn render_final(&mut self, error: Option<&Error>);
}

/// Silent sink for quiet and JSON modes: same counters, no output
#[derive(Debug, Default)]
pub struct Accounter {
    state: ProgressState,
    finished: bool,
}

impl Accounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl ProgressSink for Accounter {
    fn add_total(&mut self, bytes: u64) {
        self.state.add_total(bytes);
    }

    fn update(&mut self, delta_bytes: u64, delta_objects: u64) {
        self.state.apply(delta_bytes, delta_objects);
    }

    fn snapshot(&self) -> ProgressSnapshot {
        self.state.snapshot()
    }

    fn render_final(&mut self, error: Option<&Error>) {
        self.state.abandon_in_flight();
        self.finished = true;
        let snap = self.state.snapshot();
        tracing::debug!(
            objects = snap.objects,
            bytes = snap.bytes,
            elapsed_secs = snap.elapsed_secs,
            failed = error.is_some(),
            "Transfer accounting finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_commits_on_object() {
        let mut state = ProgressState::new();
        state.add_total(30);
        state.apply(10, 0);
        state.apply(5, 0);

        let mid = state.snapshot();
        assert_eq!(mid.objects, 0);
        assert_eq!(mid.bytes, 0);
        assert_eq!(mid.displayed_bytes(), 15);

        state.apply(0, 1);
        let done = state.snapshot();
        assert_eq!(done.objects, 1);
        assert_eq!(done.bytes, 15);
        assert_eq!(done.in_flight_bytes, 0);
        assert_eq!(done.total_bytes, 30);
    }

    #[test]
    fn test_abandon_keeps_completed() {
        let mut state = ProgressState::new();
        state.apply(10, 1);
        state.apply(7, 0);
        state.abandon_in_flight();

        let snap = state.snapshot();
        assert_eq!(snap.objects, 1);
        assert_eq!(snap.bytes, 10);
        assert_eq!(snap.displayed_bytes(), 10);
    }

    #[test]
    fn test_accounter_final_render() {
        let mut sink = Accounter::new();
        sink.update(20, 1);
        sink.update(3, 0);
        assert!(!sink.is_finished());

        sink.render_final(Some(&Error::AccessDenied("a/b/c".into())));
        assert!(sink.is_finished());
        assert_eq!(sink.snapshot().bytes, 20);
        assert_eq!(sink.snapshot().in_flight_bytes, 0);
    }
}
