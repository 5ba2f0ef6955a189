pub mod convergence;
pub mod output;

pub use convergence::{ConvergedReason, Convergence, SolveStats};
pub use output::{write_psi, write_psi_file};
