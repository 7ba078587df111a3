//! Message passing between workers.
//!
//! Every pair of workers is connected by a pair of rendezvous channels, so a
//! row publication is a collective event: the owner's send to a peer only
//! completes when that peer takes the value, and a peer's receive only
//! completes when the owner publishes. Error reports travel on a separate
//! bounded channel into the aggregator, which waits for every report before
//! it aggregates; reports are never fire-and-forget.

use crate::events::{EventSink, SolverEvent};
use crate::{SolveOutcome, SolverError};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

/// Rank of the aggregator worker
pub const ROOT: usize = 0;

/// Verdict broadcast by the aggregator at the end of every sweep
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decision {
    /// Start the next sweep
    Continue,
    /// End the solve on every worker
    Stop(SolveOutcome),
}

enum Message {
    Value { row: usize, value: f64 },
    Decision(Decision),
}

/// One worker's endpoints into the solve
///
/// Carries the worker's rank, the worker count, and the channel handles the
/// worker is allowed to touch. Components receive this value explicitly;
/// there is no ambient communicator.
pub struct WorkerContext {
    rank: usize,
    size: usize,
    txs: Vec<SyncSender<Message>>, // txs[peer]: messages towards peer
    rxs: Vec<Receiver<Message>>,   // rxs[peer]: messages from peer
    report_tx: Option<SyncSender<(usize, f64)>>, // towards the aggregator
    report_rx: Option<Receiver<(usize, f64)>>,   // aggregator only
    events: EventSink,
}

impl WorkerContext {
    /// Builds the fully connected mesh for a solve
    ///
    /// # Input
    ///
    /// * `workers` -- number of workers (≥ 1)
    /// * `report_capacity` -- bound on in-flight error reports; must be at
    ///   least the number of rows owned by non-aggregator workers so that a
    ///   report never blocks a sweep
    /// * `events` -- sink cloned into every context
    pub fn mesh(workers: usize, report_capacity: usize, events: EventSink) -> Vec<WorkerContext> {
        let mut txs: Vec<Vec<SyncSender<Message>>> = (0..workers).map(|_| Vec::new()).collect();
        let mut rxs: Vec<Vec<Receiver<Message>>> = (0..workers).map(|_| Vec::new()).collect();
        for from in 0..workers {
            for to in 0..workers {
                // rendezvous: a send completes only when the peer receives
                let (tx, rx) = sync_channel(0);
                txs[from].push(tx);
                rxs[to].push(rx);
            }
        }
        let (report_tx, report_rx) = sync_channel(report_capacity);
        let mut report_rx = Some(report_rx);
        txs.into_iter()
            .zip(rxs)
            .enumerate()
            .map(|(rank, (txs, rxs))| WorkerContext {
                rank,
                size: workers,
                txs,
                rxs,
                report_tx: if rank == ROOT { None } else { Some(report_tx.clone()) },
                report_rx: if rank == ROOT { report_rx.take() } else { None },
                events: events.clone(),
            })
            .collect()
    }

    /// This worker's rank
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Total number of workers
    pub fn size(&self) -> usize {
        self.size
    }

    /// Disseminates a freshly computed row value to every peer
    ///
    /// Blocks until each peer has accepted the value.
    pub fn publish(&self, row: usize, value: f64) -> Result<(), SolverError> {
        for peer in 0..self.size {
            if peer == self.rank {
                continue;
            }
            self.txs[peer]
                .send(Message::Value { row, value })
                .map_err(|_| SolverError::Disconnected { worker: peer })?;
        }
        Ok(())
    }

    /// Waits for the owner of `row` to publish its new value
    pub fn receive(&self, owner: usize, row: usize) -> Result<f64, SolverError> {
        match self.rxs[owner].recv() {
            Ok(Message::Value { row: published, value }) => {
                debug_assert_eq!(published, row, "publications must arrive in row order");
                Ok(value)
            }
            Ok(Message::Decision(_)) => Err(SolverError::Protocol(
                "expected a row publication, found a decision",
            )),
            Err(_) => Err(SolverError::Disconnected { worker: owner }),
        }
    }

    /// Sends one owned row's error magnitude to the aggregator
    pub fn report(&self, row: usize, magnitude: f64) -> Result<(), SolverError> {
        let tx = self
            .report_tx
            .as_ref()
            .ok_or(SolverError::Protocol("the aggregator does not report to itself"))?;
        tx.send((row, magnitude))
            .map_err(|_| SolverError::Disconnected { worker: ROOT })
    }

    /// Waits for `expected` error reports and stores them by row
    ///
    /// Aggregator only. Returns only once every outstanding report has
    /// arrived, so the caller can never aggregate a partial error vector.
    pub fn collect(&self, expected: usize, errors: &mut [f64]) -> Result<(), SolverError> {
        let rx = self
            .report_rx
            .as_ref()
            .ok_or(SolverError::Protocol("only the aggregator collects error reports"))?;
        for _ in 0..expected {
            let (row, magnitude) = rx.recv().map_err(|_| {
                SolverError::Protocol("error reports ended before the sweep was aggregated")
            })?;
            errors[row] = magnitude;
        }
        Ok(())
    }

    /// Broadcasts the end-of-sweep decision to every peer (aggregator only)
    pub fn announce(&self, decision: Decision) -> Result<(), SolverError> {
        for peer in 0..self.size {
            if peer == self.rank {
                continue;
            }
            self.txs[peer]
                .send(Message::Decision(decision))
                .map_err(|_| SolverError::Disconnected { worker: peer })?;
        }
        Ok(())
    }

    /// Waits for the aggregator's end-of-sweep decision
    pub fn await_decision(&self) -> Result<Decision, SolverError> {
        match self.rxs[ROOT].recv() {
            Ok(Message::Decision(decision)) => Ok(decision),
            Ok(Message::Value { .. }) => Err(SolverError::Protocol(
                "expected a decision, found a row publication",
            )),
            Err(_) => Err(SolverError::Disconnected { worker: ROOT }),
        }
    }

    pub(crate) fn emit(&self, event: SolverEvent) {
        self.events.emit(event);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
