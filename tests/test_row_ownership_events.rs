use distributed_sor::{solve, EventSink, LinearSystem, SolveOutcome, SolverEvent, SorParams};
use std::sync::mpsc;

#[test]
fn each_row_is_written_once_per_sweep_by_its_owner() -> Result<(), distributed_sor::SolverError> {
    let (n, workers) = (8, 3);
    let system = LinearSystem::generate(n, 1234567890)?;
    let params = SorParams::new(1.0, 1e-8)?;
    let (tx, rx) = mpsc::channel();
    let report = solve(&system, &params, workers, EventSink::new(tx))?;
    assert_eq!(report.outcome, SolveOutcome::Converged);

    let mut writes = vec![vec![0usize; n]; report.sweeps + 1];
    let mut completed_sweeps = 0;
    let mut finished = None;
    for event in rx.try_iter() {
        match event {
            SolverEvent::RowUpdated { sweep, worker, row, error, .. } => {
                assert_eq!(worker, row % workers, "row {} updated by a non-owner", row);
                assert!(error >= 0.0);
                assert!((1..=report.sweeps).contains(&sweep));
                writes[sweep][row] += 1;
            }
            SolverEvent::SweepCompleted { sweep, max_error } => {
                assert_eq!(sweep, completed_sweeps + 1);
                assert!(max_error.is_finite());
                completed_sweeps += 1;
            }
            SolverEvent::Finished { outcome, sweeps } => {
                finished = Some((outcome, sweeps));
            }
        }
    }
    for sweep in 1..=report.sweeps {
        assert_eq!(writes[sweep], vec![1usize; n], "sweep {} wrote rows unevenly", sweep);
    }
    assert_eq!(completed_sweeps, report.sweeps);
    assert_eq!(finished, Some((SolveOutcome::Converged, report.sweeps)));
    Ok(())
}
