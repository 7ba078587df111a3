use distributed_sor::{
    solve, write_solution_file, EventSink, LinearSystem, SolveOutcome, SolverError, SorParams,
};
use russell_lab::Stopwatch;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "distributed_sor", about = "Solves A·x = b with distributed SOR workers")]
struct Options {
    /// File with the augmented linear system [A | b]; generates a random
    /// system when absent
    #[structopt(short = "c", long = "system")]
    system: Option<PathBuf>,

    /// File to write the solution to; the result is only printed when absent
    #[structopt(short = "o", long = "output")]
    output: Option<PathBuf>,

    /// System dimension n
    #[structopt(short = "n", long = "size", default_value = "8")]
    size: usize,

    /// Relaxation factor w
    #[structopt(short = "w", long = "relax", default_value = "1.5")]
    relax: f64,

    /// Convergence tolerance on the largest per-row change
    #[structopt(short = "e", long = "tolerance", default_value = "1e-7")]
    tolerance: f64,

    /// Number of workers
    #[structopt(short = "p", long = "workers", default_value = "4")]
    workers: usize,

    /// Upper bound on the number of sweeps
    #[structopt(long = "max-sweeps", default_value = "1000")]
    max_sweeps: usize,

    /// Seed for the synthetic system generator
    #[structopt(long = "seed", default_value = "1234567890")]
    seed: u64,
}

fn main() -> Result<(), SolverError> {
    // initialize logging
    env_logger::init();

    // parse command line arguments
    let opt = Options::from_args();
    let params = SorParams::new(opt.relax, opt.tolerance)?.with_max_sweeps(opt.max_sweeps)?;

    // load or generate the linear system
    let system = match &opt.system {
        Some(path) => LinearSystem::from_file(path, opt.size)?,
        None => LinearSystem::generate(opt.size, opt.seed)?,
    };
    log::info!(
        "n = {}, w = {}, tolerance = {:e}, workers = {}",
        system.dim(),
        opt.relax,
        opt.tolerance,
        opt.workers
    );

    // start stopwatch
    let mut stopwatch = Stopwatch::new("");

    // perform the solution
    let report = solve(&system, &params, opt.workers, EventSink::disabled())?;

    // message
    stopwatch.stop();
    match report.outcome {
        SolveOutcome::Converged => {
            println!(
                "converged after {} sweeps, max error = {:e}",
                report.sweeps, report.max_error
            );
        }
        SolveOutcome::MaxSweepsExceeded => {
            println!(
                "reached the limit of {} sweeps, max error = {:e}",
                report.sweeps, report.max_error
            );
        }
    }
    log::info!("max residual = {:e}", system.max_residual(&report.x));
    println!("elapsed time = {}", stopwatch);

    // persist or print the solution (the summary above survives a failed write)
    let digits = params.solution_digits();
    if let Some(path) = &opt.output {
        write_solution_file(path, &report.x, digits)?;
    } else {
        let mut stdout = std::io::stdout();
        distributed_sor::write_solution(&mut stdout, &report.x, digits).map_err(|e| {
            SolverError::OutputWrite {
                path: "stdout".to_string(),
                source: e,
            }
        })?;
    }
    Ok(())
}
