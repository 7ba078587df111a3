use crate::SolverError;

/// Tuning knobs for one SOR solve, identical on every worker.
///
/// The relaxation factor blends the previous iterate with the freshly
/// computed Gauss-Seidel value:
///
/// ```text
/// x_new = (1 - w) * x_old + w * x_gs
/// ```
///
/// `w = 1` reduces SOR to plain Gauss-Seidel. Convergence is declared when
/// the largest per-row change of a sweep drops to `tolerance` or below;
/// `max_sweeps` bounds the loop when the tolerance is unreachable.
#[derive(Clone, Copy, Debug)]
pub struct SorParams {
    pub relax: f64,
    pub tolerance: f64,
    pub max_sweeps: usize,
}

impl SorParams {
    /// Allocates parameters with the default sweep cap
    ///
    /// # Input
    ///
    /// * `relax` -- relaxation factor, must lie in (0, 2)
    /// * `tolerance` -- convergence threshold, must be positive
    pub fn new(relax: f64, tolerance: f64) -> Result<Self, SolverError> {
        let params = SorParams {
            relax,
            tolerance,
            max_sweeps: 1000,
        };
        params.validate()?;
        Ok(params)
    }

    /// Replaces the sweep cap
    pub fn with_max_sweeps(mut self, max_sweeps: usize) -> Result<Self, SolverError> {
        self.max_sweeps = max_sweeps;
        self.validate()?;
        Ok(self)
    }

    /// Checks the parameter ranges
    pub fn validate(&self) -> Result<(), SolverError> {
        if !(self.relax > 0.0 && self.relax < 2.0) {
            return Err(SolverError::InvalidParameter(
                "relaxation factor must lie in (0, 2)",
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(SolverError::InvalidParameter("tolerance must be positive"));
        }
        if self.max_sweeps < 1 {
            return Err(SolverError::InvalidParameter("max_sweeps must be ≥ 1"));
        }
        Ok(())
    }

    /// Number of fractional digits for serializing the solution
    ///
    /// Derived from the tolerance: `digits = floor(|log10(tolerance)|)`
    pub fn solution_digits(&self) -> usize {
        f64::log10(self.tolerance).abs().floor() as usize
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
