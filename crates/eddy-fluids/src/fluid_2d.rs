use crate::advect::advect_velocity;
use crate::mac_2d::MacGrid2D;
use crate::pressure::{apply_pressure_gradient, solve_pressure, SolveStats, SolverKind};

/// 2-D incompressible flow solver: pressure projection followed by
/// semi-Lagrangian advection, with divergence and speed recomputed as
/// diagnostics after every step.
///
/// The solver exclusively owns its fields; kernels borrow them for the
/// duration of a single call.
#[derive(Debug, Clone)]
pub struct GridFluid2D {
    pub mac: MacGrid2D,
    solver: SolverKind,
    max_iters: usize,
    tol: f64,
}

impl GridFluid2D {
    pub fn new(mac: MacGrid2D, solver: SolverKind, max_iters: usize, tol: f64) -> Self {
        GridFluid2D {
            mac,
            solver,
            max_iters,
            tol,
        }
    }

    /// Project the velocity field onto the divergence-free subspace: refresh
    /// the divergence, solve for pressure, subtract its gradient from the
    /// face velocities.
    pub fn make_incompressible(&mut self) -> SolveStats {
        self.mac.update_divergence();
        let stats = solve_pressure(&mut self.mac, self.solver, self.max_iters, self.tol);
        apply_pressure_gradient(&mut self.mac);
        stats
    }

    /// Advance the simulation by one time step.
    pub fn step(&mut self) -> SolveStats {
        let stats = self.make_incompressible();
        advect_velocity(&mut self.mac);
        self.mac.update_divergence();
        self.mac.update_speed();
        stats
    }
}
