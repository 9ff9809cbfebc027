// Lineup optimizer: constraint builder, ILP solver port, diversification
// loop and showdown captain selection.

pub mod captain;
pub mod constraints;
pub mod diversification;
pub mod driver;
pub mod solver;

#[cfg(test)]
mod testutil;

pub use captain::{apply_captain, captain_diversity_warning, select_captain, CaptainError};
pub use constraints::{build, build_for_template, BuildError, BuildOptions, ConstraintSet};
pub use diversification::DiversificationState;
pub use driver::{optimize, OptimizeError, OptimizerOptions};
pub use solver::{GoodLpSolver, IlpProblem, IlpSolution, SolutionStatus, Solver, SolverError};
