use crate::SolverError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use russell_lab::{Matrix, Vector};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Largest magnitude of generated right-hand side and diagonal entries
const PARAM_ABS_MAX: i64 = 100;

/// Diagonal magnitude of generated tridiagonal systems
const TRI_DIAG: i64 = 10_000;

/// Holds a dense linear system `A ⋅ x = b`
///
/// The matrix and right-hand side are read-only for the whole lifetime of a
/// solve; every worker reads the same replica and nobody writes it.
pub struct LinearSystem {
    a: Matrix, // (n × n) coefficient matrix
    b: Vector, // (n) right-hand side
}

impl LinearSystem {
    /// Allocates a new instance from its parts
    ///
    /// # Input
    ///
    /// * `a` -- square coefficient matrix (n × n, n ≥ 1)
    /// * `b` -- right-hand side of matching dimension
    pub fn new(a: Matrix, b: Vector) -> Result<Self, SolverError> {
        let (nrow, ncol) = a.dims();
        if nrow < 1 {
            return Err(SolverError::InvalidParameter("system dimension must be ≥ 1"));
        }
        if nrow != ncol {
            return Err(SolverError::InvalidParameter("coefficient matrix must be square"));
        }
        if b.dim() != nrow {
            return Err(SolverError::InvalidParameter(
                "right-hand side dimension must match the matrix",
            ));
        }
        Ok(LinearSystem { a, b })
    }

    /// Generates a random diagonally dominant system
    ///
    /// `b[i]` and the (nonzero) diagonal are drawn from `[-100, 100]`, and
    /// every off-diagonal entry is bounded by `|a[i][i]| / (n - 1) - 1`,
    /// which keeps each row strictly diagonally dominant. The same seed
    /// reproduces the same system on every worker and every run.
    pub fn generate(n: usize, seed: u64) -> Result<Self, SolverError> {
        if n < 1 {
            return Err(SolverError::InvalidParameter("system dimension must be ≥ 1"));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut a = Matrix::new(n, n);
        let mut b = Vector::new(n);
        for i in 0..n {
            b[i] = rng.gen_range(-PARAM_ABS_MAX..=PARAM_ABS_MAX) as f64;
            let mut diag = 0;
            while diag == 0 {
                diag = rng.gen_range(-PARAM_ABS_MAX..=PARAM_ABS_MAX);
            }
            a.set(i, i, diag as f64);
            let spread = if n > 1 {
                (diag.abs() / (n as i64 - 1) - 1).max(0)
            } else {
                0
            };
            for j in 0..n {
                if i != j {
                    a.set(i, j, rng.gen_range(-spread..=spread) as f64);
                }
            }
        }
        LinearSystem::new(a, b)
    }

    /// Generates a tridiagonal diagonally dominant system
    ///
    /// Constant diagonal `10000` with sub/super-diagonal entries of
    /// `-(10000 - 1) / 2`; only the right-hand side is random. Useful for
    /// large, well-behaved fixtures.
    pub fn generate_tridiagonal(n: usize, seed: u64) -> Result<Self, SolverError> {
        if n < 1 {
            return Err(SolverError::InvalidParameter("system dimension must be ≥ 1"));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let off = -((TRI_DIAG - 1) / 2) as f64;
        let mut a = Matrix::new(n, n);
        let mut b = Vector::new(n);
        for i in 0..n {
            b[i] = rng.gen_range(-TRI_DIAG..=TRI_DIAG) as f64;
            a.set(i, i, TRI_DIAG as f64);
            if i > 0 {
                a.set(i, i - 1, off);
            }
            if i + 1 < n {
                a.set(i, i + 1, off);
            }
        }
        LinearSystem::new(a, b)
    }

    /// Reads an augmented system `[A | b]` with a declared dimension
    ///
    /// One row per line, whitespace-separated numeric tokens, the last token
    /// being the row's entry in `b`. Fewer rows than `n`, extra rows, or a
    /// row without exactly `n + 1` tokens is malformed.
    pub fn read_augmented<R: BufRead>(reader: R, n: usize) -> Result<Self, SolverError> {
        if n < 1 {
            return Err(SolverError::InvalidParameter("system dimension must be ≥ 1"));
        }
        let mut a = Matrix::new(n, n);
        let mut b = Vector::new(n);
        let mut row = 0;
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| SolverError::MalformedInput {
                line: idx + 1,
                reason: format!("read failure: {}", e),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            if row == n {
                return Err(SolverError::MalformedInput {
                    line: idx + 1,
                    reason: format!("expected {} rows, found more", n),
                });
            }
            let mut tokens = 0;
            for token in line.split_whitespace() {
                let value: f64 = token.parse().map_err(|_| SolverError::MalformedInput {
                    line: idx + 1,
                    reason: format!("cannot parse '{}' as a number", token),
                })?;
                match tokens {
                    t if t < n => a.set(row, t, value),
                    t if t == n => b[row] = value,
                    _ => {
                        return Err(SolverError::MalformedInput {
                            line: idx + 1,
                            reason: format!("expected {} tokens per row, found more", n + 1),
                        })
                    }
                }
                tokens += 1;
            }
            if tokens != n + 1 {
                return Err(SolverError::MalformedInput {
                    line: idx + 1,
                    reason: format!("expected {} tokens per row, found {}", n + 1, tokens),
                });
            }
            row += 1;
        }
        if row != n {
            return Err(SolverError::MalformedInput {
                line: row,
                reason: format!("expected {} rows, found {}", n, row),
            });
        }
        LinearSystem::new(a, b)
    }

    /// Reads an augmented system from a file path
    pub fn from_file<P: AsRef<Path>>(path: P, n: usize) -> Result<Self, SolverError> {
        let file = File::open(&path).map_err(|e| SolverError::InputNotFound {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        LinearSystem::read_augmented(BufReader::new(file), n)
    }

    /// System dimension n
    pub fn dim(&self) -> usize {
        self.b.dim()
    }

    /// Coefficient matrix A
    pub fn matrix(&self) -> &Matrix {
        &self.a
    }

    /// Right-hand side b
    pub fn rhs(&self) -> &Vector {
        &self.b
    }

    /// Rejects any zero diagonal entry before a solve starts
    ///
    /// The check is deterministic over the replicated matrix, so every
    /// worker reaches the same verdict without exchanging a single message.
    pub fn check_pivots(&self) -> Result<(), SolverError> {
        for row in 0..self.dim() {
            if self.a.get(row, row) == 0.0 {
                return Err(SolverError::SingularPivot { row });
            }
        }
        Ok(())
    }

    /// Largest absolute component of the residual `A ⋅ x - b`
    pub fn max_residual(&self, x: &Vector) -> f64 {
        let n = self.dim();
        let mut worst = 0.0;
        for i in 0..n {
            let mut acc = -self.b[i];
            for j in 0..n {
                acc += self.a.get(i, j) * x[j];
            }
            worst = f64::max(worst, acc.abs());
        }
        worst
    }
}

/// Writes a solution vector as one line of fixed-precision values
pub fn write_solution<W: Write>(writer: &mut W, x: &Vector, digits: usize) -> std::io::Result<()> {
    let formatted: Vec<String> = x.as_data().iter().map(|v| format!("{:.*}", digits, v)).collect();
    writeln!(writer, "{}", formatted.join(" "))
}

/// Writes a solution vector to a file path
pub fn write_solution_file<P: AsRef<Path>>(path: P, x: &Vector, digits: usize) -> Result<(), SolverError> {
    let wrap = |e| SolverError::OutputWrite {
        path: path.as_ref().display().to_string(),
        source: e,
    };
    let mut file = File::create(&path).map_err(wrap)?;
    write_solution(&mut file, x, digits).map_err(wrap)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{write_solution, LinearSystem};
    use crate::SolverError;
    use russell_lab::{Matrix, Vector};
    use std::io::Cursor;

    #[test]
    fn new_rejects_mismatched_parts() {
        assert!(LinearSystem::new(Matrix::new(2, 3), Vector::new(2)).is_err());
        assert!(LinearSystem::new(Matrix::new(3, 3), Vector::new(2)).is_err());
        assert!(LinearSystem::new(Matrix::new(0, 0), Vector::new(0)).is_err());
        assert!(LinearSystem::new(Matrix::new(2, 2), Vector::new(2)).is_ok());
    }

    #[test]
    fn read_augmented_works() {
        let text = "10 1 0 1\n\
                    1 10 1 2\n\
                    0 1 10 3\n";
        let system = LinearSystem::read_augmented(Cursor::new(text), 3).unwrap();
        assert_eq!(system.dim(), 3);
        assert_eq!(system.matrix().get(0, 0), 10.0);
        assert_eq!(system.matrix().get(1, 2), 1.0);
        assert_eq!(system.rhs().as_data(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn read_augmented_skips_blank_lines() {
        let text = "\n2 0 5\n\n0 2 6\n\n";
        let system = LinearSystem::read_augmented(Cursor::new(text), 2).unwrap();
        assert_eq!(system.rhs().as_data(), &[5.0, 6.0]);
    }

    #[test]
    fn read_augmented_rejects_missing_rows() {
        let text = "1 0 1\n0 1 2\n";
        let res = LinearSystem::read_augmented(Cursor::new(text), 3);
        assert!(matches!(res, Err(SolverError::MalformedInput { .. })));
    }

    #[test]
    fn read_augmented_rejects_short_row() {
        let text = "1 0 1\n0 1\n";
        let res = LinearSystem::read_augmented(Cursor::new(text), 2);
        assert!(matches!(
            res,
            Err(SolverError::MalformedInput { line: 2, .. })
        ));
    }

    #[test]
    fn read_augmented_rejects_extra_tokens_and_rows() {
        let long_row = "1 0 1 7\n0 1 2\n";
        assert!(LinearSystem::read_augmented(Cursor::new(long_row), 2).is_err());
        let extra_row = "1 0 1\n0 1 2\n3 3 3\n";
        assert!(LinearSystem::read_augmented(Cursor::new(extra_row), 2).is_err());
    }

    #[test]
    fn read_augmented_rejects_bad_token() {
        let text = "1 zero 1\n0 1 2\n";
        let res = LinearSystem::read_augmented(Cursor::new(text), 2);
        assert!(matches!(
            res,
            Err(SolverError::MalformedInput { line: 1, .. })
        ));
    }

    #[test]
    fn from_file_reports_missing_path() {
        let res = LinearSystem::from_file("/no/such/system.txt", 3);
        assert!(matches!(res, Err(SolverError::InputNotFound { .. })));
    }

    #[test]
    fn generate_is_deterministic_and_dominant() {
        let first = LinearSystem::generate(8, 1234567890).unwrap();
        let second = LinearSystem::generate(8, 1234567890).unwrap();
        let other = LinearSystem::generate(8, 42).unwrap();
        let mut same = true;
        let mut differs = false;
        for i in 0..8 {
            for j in 0..8 {
                same = same && first.matrix().get(i, j) == second.matrix().get(i, j);
                differs = differs || first.matrix().get(i, j) != other.matrix().get(i, j);
            }
        }
        assert!(same);
        assert!(differs);
        for i in 0..8 {
            let diag = first.matrix().get(i, i).abs();
            assert!(diag > 0.0);
            let off: f64 = (0..8)
                .filter(|&j| j != i)
                .map(|j| first.matrix().get(i, j).abs())
                .sum();
            assert!(off < diag);
        }
    }

    #[test]
    fn generate_tridiagonal_works() {
        let system = LinearSystem::generate_tridiagonal(5, 1).unwrap();
        let a = system.matrix();
        for i in 0..5 {
            assert_eq!(a.get(i, i), 10_000.0);
            for j in 0..5 {
                if j + 1 < i || j > i + 1 {
                    assert_eq!(a.get(i, j), 0.0);
                }
            }
        }
        assert_eq!(a.get(1, 0), -4999.0);
        assert_eq!(a.get(1, 2), -4999.0);
        assert_eq!(a.get(0, 4), 0.0);
    }

    #[test]
    fn check_pivots_finds_zero_diagonal() {
        let mut a = Matrix::new(2, 2);
        a.set(0, 0, 1.0);
        let system = LinearSystem::new(a, Vector::new(2)).unwrap();
        assert!(matches!(
            system.check_pivots(),
            Err(SolverError::SingularPivot { row: 1 })
        ));
    }

    #[test]
    fn max_residual_works() {
        let a = Matrix::from(&[[2.0, 0.0], [0.0, 4.0]]);
        let b = Vector::from(&[2.0, 4.0]);
        let system = LinearSystem::new(a, b).unwrap();
        let exact = Vector::from(&[1.0, 1.0]);
        assert_eq!(system.max_residual(&exact), 0.0);
        let off = Vector::from(&[1.0, 1.5]);
        assert_eq!(system.max_residual(&off), 2.0);
    }

    #[test]
    fn write_solution_respects_digits() {
        let x = Vector::from(&[1.25, -0.5]);
        let mut out = Vec::new();
        write_solution(&mut out, &x, 4).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1.2500 -0.5000\n");
        let mut out = Vec::new();
        write_solution(&mut out, &x, 0).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1 -0\n");
    }
}
