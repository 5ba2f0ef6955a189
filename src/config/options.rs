//! Command-line or API options for the boundary solve.
//!
//! This module provides the `SchurOptions` struct, which collects the knobs the
//! drivers need: the tolerance and iteration cap of the Krylov solve on the
//! partition boundary, the Krylov method used for it, and the settings of the
//! volumetric source iteration that runs around (plain driver) or inside
//! (outer driver) the boundary solve.

use std::str::FromStr;

use crate::context::ksp_context::SolverKind;
use crate::error::SchurError;

/// Method used for the volumetric source iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerMethod {
    /// Plain fixed-point (Richardson) source iteration.
    FixedPoint,
    /// GMRES-accelerated source iteration.
    Krylov,
}

impl FromStr for InnerMethod {
    type Err = SchurError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixedpoint" | "fixed_point" | "fixed-point" | "si" => Ok(InnerMethod::FixedPoint),
            "krylov" | "gmres" => Ok(InnerMethod::Krylov),
            other => Err(SchurError::Config(format!("unknown source iteration method `{other}`"))),
        }
    }
}

/// Source-iteration parameters.
#[derive(Debug, Clone)]
pub struct SourceIterationOptions {
    /// Fixed point or Krylov
    pub method: InnerMethod,
    /// Relative L1 change (fixed point) or relative residual (Krylov) to stop at
    pub tol: f64,
    /// Maximum number of iterations
    pub max_iters: usize,
    /// GMRES restart length for the Krylov method
    pub restart: usize,
}

impl Default for SourceIterationOptions {
    fn default() -> Self {
        Self {
            method: InnerMethod::FixedPoint,
            tol: 1e-8,
            max_iters: 1000,
            restart: 30,
        }
    }
}

/// Boundary-solve parameters.
#[derive(Debug, Clone)]
pub struct SchurOptions {
    /// Relative residual tolerance of the boundary Krylov solve
    pub dd_tol: f64,
    /// Iteration cap of the boundary Krylov solve
    pub dd_max_iters: usize,
    /// GMRES restart length for the boundary solve
    pub restart: usize,
    /// Krylov method for the boundary solve
    pub solver: SolverKind,
    /// Volumetric source iteration
    pub source_iteration: SourceIterationOptions,
}

impl Default for SchurOptions {
    fn default() -> Self {
        Self {
            dd_tol: 1e-8,
            dd_max_iters: 100,
            restart: 30,
            solver: SolverKind::Gmres,
            source_iteration: SourceIterationOptions::default(),
        }
    }
}

impl SchurOptions {
    pub fn with_dd_tol(mut self, tol: f64) -> Self {
        self.dd_tol = tol;
        self
    }

    pub fn with_dd_max_iters(mut self, max_iters: usize) -> Self {
        self.dd_max_iters = max_iters;
        self
    }

    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_source_iteration(mut self, opts: SourceIterationOptions) -> Self {
        self.source_iteration = opts;
        self
    }

    /// Reject settings no solver could honour.
    pub fn validate(&self) -> Result<(), SchurError> {
        if !(self.dd_tol.is_finite() && self.dd_tol > 0.0) {
            return Err(SchurError::Config(format!("dd_tol must be positive, got {}", self.dd_tol)));
        }
        if self.dd_max_iters == 0 {
            return Err(SchurError::Config("dd_max_iters must be at least 1".into()));
        }
        if self.restart == 0 {
            return Err(SchurError::Config("restart must be at least 1".into()));
        }
        let si = &self.source_iteration;
        if !(si.tol.is_finite() && si.tol > 0.0) {
            return Err(SchurError::Config(format!("source iteration tol must be positive, got {}", si.tol)));
        }
        if si.max_iters == 0 || si.restart == 0 {
            return Err(SchurError::Config(
                "source iteration max_iters and restart must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
