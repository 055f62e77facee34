//! Semi-Lagrangian transport of the velocity field: an RK2 backward trace
//! per face, then a bilinear sample of the pre-step field at the departure
//! point.

use ndarray::Zip;

use crate::grid::Grid2;
use crate::mac_2d::MacGrid2D;
use crate::{Real, RealVec2};

/// Advect u and v through one time step.
///
/// Both components are written into fresh grids and only installed once the
/// sweeps complete; reading and writing the same grid in place would corrupt
/// the interpolation stencils. Cell labels are not consulted here, solids
/// are enforced by the next projection.
pub fn advect_velocity(grid: &mut MacGrid2D) {
    let dt = grid.dt;
    let domain = RealVec2::new(
        (grid.nx - 1) as Real * grid.dx,
        (grid.ny - 1) as Real * grid.dy,
    );

    let mut u_new = Grid2::new(grid.nx + 1, grid.ny);
    let mut v_new = Grid2::new(grid.nx, grid.ny + 1);

    let g = &*grid;
    Zip::indexed(u_new.values_mut()).par_for_each(|(i, j), out| {
        let start = RealVec2::new(i as Real * g.dx, (j as Real + 0.5) * g.dy);
        *out = g.sample_u(trace_back(g, start, dt, domain));
    });
    Zip::indexed(v_new.values_mut()).par_for_each(|(i, j), out| {
        let start = RealVec2::new((i as Real + 0.5) * g.dx, j as Real * g.dy);
        *out = g.sample_v(trace_back(g, start, dt, domain));
    });

    grid.u = u_new;
    grid.v = v_new;
}

/// Departure point of a particle arriving at `start`, located by a two-stage
/// (midpoint) backward trace and clamped to the physical domain.
fn trace_back(grid: &MacGrid2D, start: RealVec2, dt: Real, domain: RealVec2) -> RealVec2 {
    let v0 = grid.velocity_at(start);
    let mid = start - 0.5 * dt * v0;
    let v_mid = grid.velocity_at(mid);
    (start - dt * v_mid).clamp(RealVec2::ZERO, domain)
}
