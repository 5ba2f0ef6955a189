//! Plain Schur driver: every sweep of the outer source iteration is a coupled
//! solve of all partitions through the boundary Schur complement.

use log::{info, warn};

use super::boundary::BoundaryLayout;
use super::operator::{Coupling, SchurOperator};
use crate::config::SchurOptions;
use crate::context::KrylovSolver;
use crate::data::{PsiBoundData, PsiData};
use crate::error::SchurError;
use crate::exchange::CommSides;
use crate::mesh::PartitionMesh;
use crate::parallel::PointToPoint;
use crate::solver::SourceIteration;
use crate::transport::{new_psi, new_psi_bound, Sweeper, Transport};

/// Summary of one [`SchurSweeper::solve`].
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    /// Outer source iterations (coupled sweeps requested by the iteration).
    pub source_iterations: usize,
    /// Partition sweeps performed: `2 + krylov iterations` per coupled sweep.
    pub work_units: usize,
    /// Krylov iterations summed over all coupled sweeps.
    pub krylov_iterations: usize,
    /// Residual norm of the last boundary solve.
    pub residual_norm: f64,
    /// Every boundary solve met its tolerance.
    pub converged: bool,
}

/// Mutable part of the plain driver that survives between coupled sweeps.
struct SweepState {
    krylov: KrylovSolver,
    psi_bound_prev: PsiBoundData,
    work_units: usize,
    krylov_iterations: usize,
    residual_norm: f64,
    converged: bool,
}

impl SweepState {
    fn reset_counters(&mut self) {
        self.work_units = 0;
        self.krylov_iterations = 0;
        self.residual_norm = 0.0;
        self.converged = true;
    }
}

pub struct SchurSweeper<M, T, C> {
    mesh: M,
    transport: T,
    comm: C,
    options: SchurOptions,
    comm_sides: CommSides,
    layout: BoundaryLayout,
    state: SweepState,
    psi: PsiData,
}

impl<M, T, C> SchurSweeper<M, T, C>
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
        let state = SweepState {
            krylov,
            psi_bound_prev: new_psi_bound(&mesh, n_groups),
            work_units: 0,
            krylov_iterations: 0,
            residual_norm: 0.0,
            converged: true,
        };
        let psi = new_psi(&mesh, n_groups);
        Ok(Self { mesh, transport, comm, options, comm_sides, layout, state, psi })
    }

    /// Converge the problem source through the outer source iteration, with
    /// this driver as the sweeper.
    pub fn solve(&mut self) -> Result<SolveReport, SchurError> {
        let n_groups = self.transport.n_groups();
        self.state.reset_counters();
        let mut source = new_psi(&self.mesh, n_groups);
        self.transport.problem_source(&mut source);
        self.psi.set_to_value(0.0);

        let iteration = SourceIteration::new(&self.options.source_iteration);
        let mut coupled = CoupledSweep {
            coupling: Coupling {
                mesh: &self.mesh,
                transport: &self.transport,
                comm: &self.comm,
                comm_sides: &self.comm_sides,
                layout: &self.layout,
            },
            state: &mut self.state,
        };
        let its = iteration.iterate(&mut coupled, &self.transport, &self.comm, &mut self.psi, &source)?;

        let report = SolveReport {
            source_iterations: its,
            work_units: self.state.work_units,
            krylov_iterations: self.state.krylov_iterations,
            residual_norm: self.state.residual_norm,
            converged: self.state.converged,
        };
        if self.comm.rank() == 0 {
            info!("Num source iters: {}", report.source_iterations);
            info!("Work units: {}", report.work_units);
        }
        Ok(report)
    }

    /// Flux of the last `solve`.
    pub fn psi(&self) -> &PsiData {
        &self.psi
    }

    /// Side flux of the last coupled sweep, also the next initial guess.
    pub fn boundary_solution(&self) -> &PsiBoundData {
        &self.state.psi_bound_prev
    }

    pub fn layout(&self) -> &BoundaryLayout {
        &self.layout
    }

    pub fn mesh(&self) -> &M {
        &self.mesh
    }

    pub fn work_units(&self) -> usize {
        self.state.work_units
    }
}

impl<M, T, C> Sweeper for SchurSweeper<M, T, C>
where
    M: PartitionMesh,
    T: Transport,
    C: PointToPoint,
{
    fn sweep(&mut self, psi: &mut PsiData, source: &PsiData, homogeneous: bool) -> Result<(), SchurError> {
        CoupledSweep {
            coupling: Coupling {
                mesh: &self.mesh,
                transport: &self.transport,
                comm: &self.comm,
                comm_sides: &self.comm_sides,
                layout: &self.layout,
            },
            state: &mut self.state,
        }
        .sweep(psi, source, homogeneous)
    }
}

struct CoupledSweep<'a, M, T, C> {
    coupling: Coupling<'a, M, T, C>,
    state: &'a mut SweepState,
}

impl<M, T, C> Sweeper for CoupledSweep<'_, M, T, C>
where
    M: PartitionMesh,
    T: Transport,
    C: PointToPoint,
{
    fn sweep(&mut self, psi: &mut PsiData, source: &PsiData, homogeneous: bool) -> Result<(), SchurError> {
        let c = self.coupling;
        let st = &mut *self.state;
        let n_groups = c.transport.n_groups();
        let root = c.comm.rank() == 0;

        // Init: seed the boundary solve with the previous solution
        c.layout.write_vector(&st.psi_bound_prev, st.krylov.solution_mut())?;
        st.krylov.set_initial_guess_nonzero();

        // Source sweep with zero partition inflow
        if root {
            info!("    Sweeping Source");
        }
        let mut psi_bound = new_psi_bound(c.mesh, n_groups);
        if !homogeneous {
            c.transport.apply_inflow(&mut psi_bound);
        }
        c.transport.sweep(psi, source, &psi_bound)?;
        if root {
            info!("    Source Swept");
        }
        c.comm_sides.comm_sides(c.mesh, c.comm, psi, &mut psi_bound)?;
        c.layout.write_vector(&psi_bound, st.krylov.rhs_mut())?;

        // Boundary solve with the linear operator
        if root {
            info!("    Starting Krylov Solve on Boundary");
        }
        let zero_source = PsiData::zeros_like(source);
        let mut op_bound = new_psi_bound(c.mesh, n_groups);
        let stats = {
            let mut op = SchurOperator::new(c, &zero_source, psi, &mut op_bound);
            st.krylov.solve(&mut op, c.comm)?
        };
        if root {
            info!("    Krylov iterations: {} with Rnorm: {:e}", stats.iterations, stats.final_residual);
            if !stats.converged {
                warn!("    boundary solve stopped after {} iterations", stats.iterations);
            }
        }

        // Reconstruction: one sweep with the converged boundary flux
        c.layout.read_vector(st.krylov.solution(), &mut psi_bound)?;
        c.transport.sweep(psi, source, &psi_bound)?;
        st.psi_bound_prev = psi_bound;

        st.work_units += 2 + stats.iterations;
        st.krylov_iterations += stats.iterations;
        st.residual_norm = stats.final_residual;
        st.converged &= stats.converged;
        Ok(())
    }
}
