//! schur-sweep: Schur-complement boundary coupling for distributed transport sweeps
//!
//! A discrete-ordinates sweep on a partitioned mesh needs the angular flux
//! entering each partition from its neighbours. Instead of re-sweeping until
//! the partitions agree, this crate treats the incoming inter-partition flux as
//! the unknown of a linear system `(I − S) x = b`, where applying `S` means
//! "sweep every partition and exchange the outgoing side flux", and solves it
//! matrix-free with GMRES.
//!
//! Layout:
//! - [`schur`]: boundary vector layout, the Schur operators and the two drivers
//! - [`exchange`]: per-neighbour packet exchange of side flux
//! - [`solver`], [`context`]: GMRES/Richardson and the Krylov solver context
//! - [`mesh`], [`transport`]: collaborator traits plus a Cartesian reference
//!   mesh and step sweep kernel
//! - [`parallel`]: serial, thread and MPI communicators

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod data;
pub mod error;
pub mod exchange;
pub mod mesh;
pub mod schur;
pub mod solver;
pub mod transport;
pub mod utils;

// Re-exports for convenience
pub use crate::config::{InnerMethod, SchurOptions, SourceIterationOptions};
pub use crate::context::{KrylovSolver, SolverKind};
pub use crate::core::{assemble_dense, FnOperator, Operator};
pub use crate::data::{PsiBoundData, PsiData};
pub use crate::error::SchurError;
pub use crate::exchange::CommSides;
pub use crate::mesh::{CartesianMesh, FaceNeighbor, PartitionMesh, Quadrature};
pub use crate::parallel::{Comm, PointToPoint, SerialComm, ThreadComm};
pub use crate::schur::{BoundaryLayout, OuterReport, SchurOuterSweeper, SchurSweeper, SolveReport};
pub use crate::solver::{LinearSolver, SourceIteration};
pub use crate::transport::{StepTransport, Sweeper, Transport};

// Re-export SolveStats at the crate root for convenience
pub use crate::utils::convergence::SolveStats;
