//! Structured solve events for external collectors.
//!
//! Workers emit one event per row update and the aggregator emits one per
//! completed sweep, so the full solve can be observed (or asserted on, in
//! tests) without interleaving print statements with the algorithm.

use crate::SolveOutcome;
use std::sync::mpsc::Sender;

/// Events emitted while a distributed solve runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SolverEvent {
    /// A worker computed and published a new value for one of its rows.
    RowUpdated {
        sweep: usize,
        worker: usize,
        row: usize,
        value: f64,
        error: f64,
    },

    /// The aggregator collected every row error for a sweep.
    SweepCompleted { sweep: usize, max_error: f64 },

    /// The decision broadcast ended the solve on all workers.
    Finished {
        outcome: SolveOutcome,
        sweeps: usize,
    },
}

/// Shared handle used by workers to push events to the collector.
///
/// A disconnected collector is ignored: observability must never stall or
/// abort the solve.
#[derive(Clone)]
pub struct EventSink {
    sender: Option<Sender<SolverEvent>>,
}

impl EventSink {
    /// Sink that forwards every event to `sender`
    pub fn new(sender: Sender<SolverEvent>) -> Self {
        EventSink {
            sender: Some(sender),
        }
    }

    /// Sink that drops every event
    pub fn disabled() -> Self {
        EventSink { sender: None }
    }

    pub(crate) fn emit(&self, event: SolverEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{EventSink, SolverEvent};
    use std::sync::mpsc;

    #[test]
    fn sink_forwards_events() {
        let (tx, rx) = mpsc::channel();
        let sink = EventSink::new(tx);
        sink.emit(SolverEvent::SweepCompleted {
            sweep: 3,
            max_error: 0.25,
        });
        assert_eq!(
            rx.recv().unwrap(),
            SolverEvent::SweepCompleted {
                sweep: 3,
                max_error: 0.25
            }
        );
    }

    #[test]
    fn disabled_sink_is_silent() {
        let sink = EventSink::disabled();
        sink.emit(SolverEvent::SweepCompleted {
            sweep: 1,
            max_error: 1.0,
        });
    }

    #[test]
    fn dropped_collector_does_not_abort() {
        let (tx, rx) = mpsc::channel();
        let sink = EventSink::new(tx);
        drop(rx);
        sink.emit(SolverEvent::SweepCompleted {
            sweep: 1,
            max_error: 1.0,
        });
    }
}
