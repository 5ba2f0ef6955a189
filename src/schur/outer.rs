//! Outer Schur driver: one boundary solve for the whole problem, with the
//! scattering source converged inside every operator application.

use log::{info, warn};

use super::boundary::BoundaryLayout;
use super::operator::{Coupling, SchurOuterOperator};
use crate::config::SchurOptions;
use crate::context::KrylovSolver;
use crate::data::{PsiBoundData, PsiData};
use crate::error::SchurError;
use crate::exchange::CommSides;
use crate::mesh::PartitionMesh;
use crate::parallel::{PointToPoint, SerialComm};
use crate::solver::SourceIteration;
use crate::transport::{new_psi, new_psi_bound, BoundarySweep, Transport};

/// Summary of one [`SchurOuterSweeper::solve`].
#[derive(Debug, Clone, PartialEq)]
pub struct OuterReport {
    pub krylov_iterations: usize,
    pub residual_norm: f64,
    pub converged: bool,
    /// Inner source iterations of the initial source sweep.
    pub initial_source_iterations: usize,
    /// Inner source iterations of each operator application, in order.
    pub operator_source_iterations: Vec<usize>,
    /// Inner source iterations of the reconstruction.
    pub final_source_iterations: usize,
}

pub struct SchurOuterSweeper<M, T, C> {
    mesh: M,
    transport: T,
    comm: C,
    comm_sides: CommSides,
    layout: BoundaryLayout,
    inner: SourceIteration,
    krylov: KrylovSolver,
    psi: PsiData,
    psi_bound: PsiBoundData,
    source: PsiData,
}

impl<M, T, C> SchurOuterSweeper<M, T, C>
where
    M: PartitionMesh,
    T: Transport,
    C: PointToPoint,
{
    pub fn new(mesh: M, transport: T, comm: C, options: SchurOptions) -> Result<Self, SchurError> {
        options.validate()?;
        let n_groups = transport.n_groups();
        let comm_sides = CommSides::new(&mesh, n_groups);
        let layout = BoundaryLayout::new(&mesh, n_groups)?;
        let krylov = KrylovSolver::new(layout.len(), options.dd_tol, options.dd_max_iters)
            .with_restart(options.restart)
            .with_kind(options.solver);
        let psi = new_psi(&mesh, n_groups);
        let source = PsiData::zeros_like(&psi);
        let psi_bound = new_psi_bound(&mesh, n_groups);
        Ok(Self {
            mesh,
            transport,
            comm,
            comm_sides,
            layout,
            inner: SourceIteration::new(&options.source_iteration),
            krylov,
            psi,
            psi_bound,
            source,
        })
    }

    fn inner_iterate(&mut self) -> Result<usize, SchurError> {
        let mut sweeper = BoundarySweep::new(&self.transport, &self.psi_bound);
        self.inner
            .iterate(&mut sweeper, &self.transport, &SerialComm, &mut self.psi, &self.source)
    }

    pub fn solve(&mut self) -> Result<OuterReport, SchurError> {
        let root = self.comm.rank() == 0;

        // Init
        self.transport.problem_source(&mut self.source);
        self.psi.set_to_value(0.0);
        self.psi_bound.set_to_value(0.0);
        self.transport.apply_inflow(&mut self.psi_bound);

        // Source sweep
        if root {
            info!("    Sweeping Source");
        }
        let initial_source_iterations = self.inner_iterate()?;
        self.comm_sides
            .comm_sides(&self.mesh, &self.comm, &self.psi, &mut self.psi_bound)?;
        self.layout.write_vector(&self.psi_bound, self.krylov.rhs_mut())?;
        if root {
            info!("    Source Swept");
        }

        // Boundary solve
        self.psi_bound.set_to_value(0.0);
        self.psi.set_to_value(0.0);
        self.source.set_to_value(0.0);
        if root {
            info!("    Starting Krylov Solve on Boundary");
        }
        let coupling = Coupling {
            mesh: &self.mesh,
            transport: &self.transport,
            comm: &self.comm,
            comm_sides: &self.comm_sides,
            layout: &self.layout,
        };
        let mut op = SchurOuterOperator::new(coupling, &self.inner, &mut self.psi, &mut self.psi_bound);
        let stats = self.krylov.solve(&mut op, &self.comm)?;
        let operator_source_iterations = op.into_inner_counts();
        if root {
            info!("    Krylov iterations: {} with Rnorm: {:e}", stats.iterations, stats.final_residual);
            if !stats.converged {
                warn!("    boundary solve stopped after {} iterations", stats.iterations);
            }
        }

        // Reconstruction
        self.layout.read_vector(self.krylov.solution(), &mut self.psi_bound)?;
        self.transport.apply_inflow(&mut self.psi_bound);
        self.transport.problem_source(&mut self.source);
        self.psi.set_to_value(0.0);
        let final_source_iterations = self.inner_iterate()?;

        let report = OuterReport {
            krylov_iterations: stats.iterations,
            residual_norm: stats.final_residual,
            converged: stats.converged,
            initial_source_iterations,
            operator_source_iterations,
            final_source_iterations,
        };
        if root {
            info!(
                "    Source iterations: initial {}, per application {:?}, final {}",
                report.initial_source_iterations, report.operator_source_iterations, report.final_source_iterations
            );
        }
        Ok(report)
    }

    /// Flux of the last `solve`.
    pub fn psi(&self) -> &PsiData {
        &self.psi
    }

    /// Side flux used by the last reconstruction.
    pub fn boundary_solution(&self) -> &PsiBoundData {
        &self.psi_bound
    }

    pub fn layout(&self) -> &BoundaryLayout {
        &self.layout
    }

    pub fn mesh(&self) -> &M {
        &self.mesh
    }
}
