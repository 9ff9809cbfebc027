//! Binary integer program solver port and its good_lp adapter.
//!
//! The driver only talks to [`Solver`]; [`GoodLpSolver`] is the default
//! implementation. It uses the pure-Rust microlp backend unless the crate is
//! built with the `highs` feature.

use good_lp::{constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel};

#[cfg(feature = "highs")]
use good_lp::solvers::highs::highs as backend;
#[cfg(not(feature = "highs"))]
use good_lp::solvers::microlp::microlp as backend;

use crate::constraints::{LinearConstraint, Sense};

/// A maximization problem over binary variables.
#[derive(Debug, Clone)]
pub struct IlpProblem<'a> {
    /// Objective coefficient per variable. The solver maximizes `c * x`.
    pub objective: Vec<f64>,
    pub constraints: Vec<&'a LinearConstraint>,
}

impl<'a> IlpProblem<'a> {
    pub fn new(objective: Vec<f64>) -> Self {
        Self {
            objective,
            constraints: Vec::new(),
        }
    }

    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }

    pub fn with(mut self, constraints: impl IntoIterator<Item = &'a LinearConstraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }
}

/// Termination status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    Optimal,
    Infeasible,
}

#[derive(Debug, Clone)]
pub struct IlpSolution {
    /// Value per variable, rounded to 0.0 or 1.0.
    pub values: Vec<f64>,
    pub objective: f64,
    pub status: SolutionStatus,
}

impl IlpSolution {
    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    /// Indices of variables set to 1.
    pub fn selected(&self) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.5)
            .map(|(i, _)| i)
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("{solver} solver failed: {message}")]
    Backend {
        solver: &'static str,
        message: String,
    },

    #[error("solver returned an unusable solution: {0}")]
    InvalidSolution(String),
}

/// Binary ILP solver.
///
/// Implementations must be thread-safe so independent optimizations can run
/// on separate threads.
pub trait Solver: Send + Sync {
    /// Solver name for logging.
    fn name(&self) -> &'static str;

    /// Maximize the problem's objective. An infeasible problem is a normal
    /// outcome reported through [`SolutionStatus::Infeasible`], not an error.
    fn solve_ilp(&self, problem: &IlpProblem<'_>) -> Result<IlpSolution, SolverError>;
}

/// good_lp-backed solver.
#[derive(Debug, Default, Clone)]
pub struct GoodLpSolver;

impl GoodLpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for GoodLpSolver {
    fn name(&self) -> &'static str {
        if cfg!(feature = "highs") {
            "highs"
        } else {
            "microlp"
        }
    }

    fn solve_ilp(&self, problem: &IlpProblem<'_>) -> Result<IlpSolution, SolverError> {
        let n = problem.num_vars();
        if n == 0 {
            let feasible = problem
                .constraints
                .iter()
                .all(|c| c.is_satisfied(&[], 1e-9));
            return Ok(IlpSolution {
                values: vec![],
                objective: 0.0,
                status: if feasible {
                    SolutionStatus::Optimal
                } else {
                    SolutionStatus::Infeasible
                },
            });
        }

        let mut vars = variables!();
        let var_list: Vec<_> = (0..n)
            .map(|_| vars.add(variable().integer().min(0.0).max(1.0)))
            .collect();

        let objective: Expression = var_list
            .iter()
            .zip(problem.objective.iter())
            .map(|(v, c)| *c * *v)
            .sum();

        let mut model = vars.maximise(&objective).using(backend);

        for row in &problem.constraints {
            let lhs: Expression = row
                .terms
                .iter()
                .filter(|(i, _)| *i < n)
                .map(|(i, c)| *c * var_list[*i])
                .sum();
            let rhs = row.rhs;
            model = match row.sense {
                Sense::LessEqual => model.with(constraint!(lhs <= rhs)),
                Sense::GreaterEqual => model.with(constraint!(lhs >= rhs)),
                Sense::Equal => model.with(constraint!(lhs == rhs)),
            };
        }

        match model.solve() {
            Ok(solution) => {
                let values: Vec<f64> = var_list
                    .iter()
                    .map(|v| if solution.value(*v) > 0.5 { 1.0 } else { 0.0 })
                    .collect();
                let objective = values
                    .iter()
                    .zip(problem.objective.iter())
                    .map(|(v, c)| v * c)
                    .sum();
                Ok(IlpSolution {
                    values,
                    objective,
                    status: SolutionStatus::Optimal,
                })
            }
            Err(ResolutionError::Infeasible) | Err(ResolutionError::Unbounded) => Ok(IlpSolution {
                values: vec![0.0; n],
                objective: 0.0,
                status: SolutionStatus::Infeasible,
            }),
            Err(e) => Err(SolverError::Backend {
                solver: self.name(),
                message: e.to_string(),
            }),
        }
    }
}
