//! Distributed SOR iteration engine and solve loop.
//!
//! Each worker owns the rows `rank, rank + P, rank + 2P, …` and updates them
//! in increasing global order:
//!
//! ```text
//!                                ⎛                                              ⎞
//!   x[i] = (1 − w)·x[i]  +  w · ⎜ b[i] − Σ a[i][j]·x[j]  −  Σ a[i][j]·x[j]     ⎟ / a[i][i]
//!                                ⎝        j>i (previous)     j<i (latest)       ⎠
//! ```
//!
//! The sum over higher columns uses the previous sweep's values; the sum over
//! lower columns uses the freshest published values, so the sweep behaves
//! like a sequential Gauss-Seidel pass even though rows are spread over
//! independently scheduled workers. Row ownership is cyclic with stride `P`,
//! which means any lower column a row still needs sits at most `P − 1` rows
//! back and has already been published by the time the owner asks for it.

use crate::events::{EventSink, SolverEvent};
use crate::{Decision, LinearSystem, RowPartition, SorParams, SolverError, WorkerContext, ROOT};
use russell_lab::Vector;
use std::thread;

/// How a solve ended
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SolveOutcome {
    /// The largest per-row change dropped to the tolerance or below
    Converged,
    /// The sweep cap was reached before the tolerance
    MaxSweepsExceeded,
}

/// Result of a completed solve
pub struct SolveReport {
    /// Final iterate of the solution vector
    pub x: Vector,
    /// Number of sweeps performed
    pub sweeps: usize,
    /// Largest per-row change of the final sweep
    pub max_error: f64,
    pub outcome: SolveOutcome,
}

/// Convergence verdict for one finished sweep
fn decide(max_error: f64, sweep: usize, params: &SorParams) -> Decision {
    if max_error <= params.tolerance {
        Decision::Stop(SolveOutcome::Converged)
    } else if sweep >= params.max_sweeps {
        Decision::Stop(SolveOutcome::MaxSweepsExceeded)
    } else {
        Decision::Continue
    }
}

/// Updates this worker's owned rows for one sweep
///
/// Publishes every new value immediately after computing it, reports the
/// row's error magnitude, and finally drains the publications of all
/// higher-indexed foreign rows so the sweep ends with a complete replica of
/// the solution vector on every worker.
fn run_sweep(
    ctx: &WorkerContext,
    system: &LinearSystem,
    partition: &RowPartition,
    relax: f64,
    sweep: usize,
    x: &mut Vector,
    errors: &mut [f64],
) -> Result<(), SolverError> {
    let n = system.dim();
    let workers = ctx.size();
    let rank = ctx.rank();
    let a = system.matrix();
    let b = system.rhs();
    for row in partition.rows_of(rank) {
        let old = x[row];

        // higher columns still hold the previous sweep's values
        let mut acc = b[row];
        for j in (row + 1)..n {
            acc -= a.get(row, j) * x[j];
        }

        // lower columns use the latest values; anything inside the wavefront
        // window of size P has not been seen yet and arrives from its owner
        for j in 0..row {
            if row - j < workers {
                let owner = partition.owner(j);
                if owner != rank {
                    x[j] = ctx.receive(owner, j)?;
                }
            }
            acc -= a.get(row, j) * x[j];
        }

        let value = (1.0 - relax) * old + relax * acc / a.get(row, row);
        x[row] = value;
        ctx.publish(row, value)?;

        let magnitude = (old - value).abs();
        errors[row] = magnitude;
        if rank != ROOT {
            ctx.report(row, magnitude)?;
        }
        ctx.emit(SolverEvent::RowUpdated {
            sweep,
            worker: rank,
            row,
            value,
            error: magnitude,
        });
    }

    // remaining foreign rows past the last owned one
    let resume = match partition.last_row_of(rank) {
        Some(last) => last + 1,
        None => 0,
    };
    for j in resume..n {
        x[j] = ctx.receive(partition.owner(j), j)?;
    }
    Ok(())
}

/// One worker's whole solve: sweeps until the aggregator says stop
///
/// Only the aggregator (rank 0) returns a report; every other worker returns
/// `None` after the final decision broadcast, so all workers leave the loop
/// on the same sweep.
fn worker_main(
    ctx: WorkerContext,
    system: &LinearSystem,
    params: &SorParams,
) -> Result<Option<SolveReport>, SolverError> {
    let n = system.dim();
    let rank = ctx.rank();
    let partition = RowPartition::new(n, ctx.size());
    log::debug!(
        "worker {}/{} starting with {} owned rows",
        rank,
        ctx.size(),
        partition.count_of(rank)
    );
    let mut x = Vector::new(n);
    let mut errors = vec![0.0; n];
    let mut max_error = 0.0;
    let mut sweep = 1;
    loop {
        run_sweep(&ctx, system, &partition, params.relax, sweep, &mut x, &mut errors)?;
        let decision = if rank == ROOT {
            let foreign = n - partition.count_of(ROOT);
            ctx.collect(foreign, &mut errors)?;
            max_error = errors.iter().fold(0.0, |acc: f64, e| acc.max(*e));
            ctx.emit(SolverEvent::SweepCompleted { sweep, max_error });
            let decision = decide(max_error, sweep, params);
            ctx.announce(decision)?;
            decision
        } else {
            ctx.await_decision()?
        };
        match decision {
            Decision::Continue => sweep += 1,
            Decision::Stop(outcome) => {
                log::debug!("worker {} finished after {} sweeps", rank, sweep);
                if rank != ROOT {
                    return Ok(None);
                }
                ctx.emit(SolverEvent::Finished { outcome, sweeps: sweep });
                return Ok(Some(SolveReport {
                    x,
                    sweeps: sweep,
                    max_error,
                    outcome,
                }));
            }
        }
    }
}

/// Solves `A ⋅ x = b` with a fixed set of cooperating workers
///
/// # Input
///
/// * `system` -- the (validated) linear system, replicated read-only
/// * `params` -- relaxation factor, tolerance, and sweep cap
/// * `workers` -- number of workers (≥ 1); surplus workers beyond the
///   system dimension only follow the publications
/// * `events` -- sink for structured solve events
///
/// The diagonal is checked before any worker starts, so a singular pivot
/// aborts the run uniformly instead of leaving workers mid-protocol.
pub fn solve(
    system: &LinearSystem,
    params: &SorParams,
    workers: usize,
    events: EventSink,
) -> Result<SolveReport, SolverError> {
    params.validate()?;
    if workers < 1 {
        return Err(SolverError::InvalidParameter("workers must be ≥ 1"));
    }
    system.check_pivots()?;
    let mut contexts = WorkerContext::mesh(workers, system.dim(), events);
    let root = contexts.remove(0);
    thread::scope(|scope| {
        let handles: Vec<_> = contexts
            .into_iter()
            .map(|ctx| scope.spawn(move || worker_main(ctx, system, params)))
            .collect();
        let root_result = worker_main(root, system, params);
        let mut failure: Option<SolverError> = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(_)) => (),
                Ok(Err(e)) => failure = failure.or(Some(e)),
                Err(_) => {
                    failure = failure.or(Some(SolverError::Protocol("a worker panicked mid-solve")))
                }
            }
        }
        match (root_result, failure) {
            (Ok(Some(report)), None) => Ok(report),
            (_, Some(e)) => Err(e),
            (Err(e), None) => Err(e),
            (Ok(None), None) => Err(SolverError::Protocol("the aggregator produced no report")),
        }
    })
}

/// Solves `A ⋅ x = b` on a single thread (reference implementation)
///
/// Performs exactly the sweeps of the distributed solver, in the same
/// arithmetic order, without any message exchange. A distributed run with
/// one worker must reproduce this result bit for bit.
pub fn solve_sequential(system: &LinearSystem, params: &SorParams) -> Result<SolveReport, SolverError> {
    params.validate()?;
    system.check_pivots()?;
    let n = system.dim();
    let a = system.matrix();
    let b = system.rhs();
    let mut x = Vector::new(n);
    let mut sweep = 1;
    loop {
        let mut max_error = 0.0f64;
        for row in 0..n {
            let old = x[row];
            let mut acc = b[row];
            for j in (row + 1)..n {
                acc -= a.get(row, j) * x[j];
            }
            for j in 0..row {
                acc -= a.get(row, j) * x[j];
            }
            let value = (1.0 - params.relax) * old + params.relax * acc / a.get(row, row);
            x[row] = value;
            max_error = max_error.max((old - value).abs());
        }
        match decide(max_error, sweep, params) {
            Decision::Continue => sweep += 1,
            Decision::Stop(outcome) => {
                return Ok(SolveReport {
                    x,
                    sweeps: sweep,
                    max_error,
                    outcome,
                })
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
