//! Iterative solvers for the pressure Poisson equation and the explicit
//! pressure-gradient velocity correction.
//!
//! Every strategy shares the same per-cell update
//! `p_new = (-coef * div + sum(p_nb)) / N` with `coef = density * dx^2 / dt`,
//! where the neighbour sum and count N range over axis neighbours that are
//! inside the grid and not Solid (homogeneous Neumann at walls and solids).
//! Solid cells and cells with N = 0 are never updated.

use ndarray::Zip;

use crate::grid::Grid2;
use crate::mac_2d::MacGrid2D;
use crate::{CellType, Real};

/// Sweep strategy for the Poisson solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Reads the previous iteration everywhere. Fully parallel, slowest
    /// convergence per sweep.
    Jacobi,
    /// In-place sweep in storage order. Sequential, faster convergence.
    GaussSeidel,
    /// Two-colour Gauss-Seidel. Each colour pass is parallel; preferred
    /// default.
    RedBlackGaussSeidel,
}

/// Outcome of one pressure solve.
#[derive(Debug, Clone, Copy)]
pub struct SolveStats {
    /// Sweeps performed.
    pub iterations: usize,
    /// RMS residual over Fluid cells after the first sweep.
    pub initial_residual: f64,
    /// Final residual relative to `initial_residual`.
    pub relative_residual: f64,
    pub converged: bool,
}

/// Solve the pressure Poisson equation in place over Fluid cells.
///
/// `grid.div` must be current. Convergence is declared when the RMS residual
/// drops below `tol` relative to its value after the first sweep (or when
/// that first value is already ~0). Hitting `max_iters` logs a warning and
/// returns a non-converged [`SolveStats`]; it never aborts the run.
pub fn solve_pressure(
    grid: &mut MacGrid2D,
    kind: SolverKind,
    max_iters: usize,
    tol: f64,
) -> SolveStats {
    let coef = grid.density * grid.dx * grid.dx / grid.dt;

    // Jacobi needs a buffer so every read sees the previous iteration; the
    // red-black colour passes reuse it so each pass reads a consistent
    // snapshot. This is the only allocation on the solve path.
    let mut scratch = match kind {
        SolverKind::GaussSeidel => None,
        _ => Some(Grid2::new(grid.nx, grid.ny)),
    };

    let mut res0 = 1.0f64;

    for it in 0..max_iters {
        match kind {
            SolverKind::Jacobi => jacobi_sweep(grid, scratch.as_mut().unwrap(), coef),
            SolverKind::GaussSeidel => gauss_seidel_sweep(grid, coef),
            SolverKind::RedBlackGaussSeidel => {
                red_black_sweep(grid, scratch.as_mut().unwrap(), coef)
            }
        }

        let res = residual_norm(grid, coef);
        if stop(res, &mut res0, it, tol) {
            let relative = if res0 < 1e-30 { 0.0 } else { res / res0 };
            log::debug!(
                "{kind:?} converged in {} iters, rel res {relative:.3e}",
                it + 1
            );
            return SolveStats {
                iterations: it + 1,
                initial_residual: res0,
                relative_residual: relative,
                converged: true,
            };
        }

        if it + 1 == max_iters {
            let relative = if res0 < 1e-30 { 0.0 } else { res / res0 };
            log::warn!(
                "{kind:?} pressure solve hit max_iters = {max_iters} (rel res {relative:.3e})"
            );
            return SolveStats {
                iterations: max_iters,
                initial_residual: res0,
                relative_residual: relative,
                converged: false,
            };
        }
    }

    // max_iters == 0: nothing was done.
    SolveStats {
        iterations: 0,
        initial_residual: 0.0,
        relative_residual: 0.0,
        converged: false,
    }
}

/// Subtract the pressure gradient from interior face velocities.
///
/// Faces touching a Solid cell are pinned to `usolid`. The outermost face
/// layers (i = 0 and i = nx for u, j = 0 and j = ny for v) represent the
/// prescribed domain boundary and are never modified.
pub fn apply_pressure_gradient(grid: &mut MacGrid2D) {
    let coef_x = grid.dt / (grid.density * grid.dx);
    let coef_y = grid.dt / (grid.density * grid.dy);
    let usolid = grid.usolid;

    let MacGrid2D {
        nx,
        ny,
        u,
        v,
        p,
        cell_type,
        ..
    } = grid;
    let (nx, ny) = (*nx, *ny);

    for i in 1..nx {
        for j in 0..ny {
            if cell_type[(i - 1, j)] == CellType::Solid || cell_type[(i, j)] == CellType::Solid {
                u.set(i, j, usolid);
            } else {
                let grad = p.get(i, j) - p.get(i - 1, j);
                u.set(i, j, u.get(i, j) - coef_x * grad);
            }
        }
    }

    for j in 1..ny {
        for i in 0..nx {
            if cell_type[(i, j - 1)] == CellType::Solid || cell_type[(i, j)] == CellType::Solid {
                v.set(i, j, usolid);
            } else {
                let grad = p.get(i, j) - p.get(i, j - 1);
                v.set(i, j, v.get(i, j) - coef_y * grad);
            }
        }
    }
}

/// Sum and count of usable neighbour pressures for cell (i, j): axis
/// neighbours inside the grid that are not Solid.
fn neighbour_sum(grid: &MacGrid2D, i: usize, j: usize) -> (Real, usize) {
    let mut sum = 0.0;
    let mut n = 0usize;

    if i + 1 < grid.nx && grid.cell_type[(i + 1, j)] != CellType::Solid {
        sum += grid.p.get(i + 1, j);
        n += 1;
    }
    if i > 0 && grid.cell_type[(i - 1, j)] != CellType::Solid {
        sum += grid.p.get(i - 1, j);
        n += 1;
    }
    if j + 1 < grid.ny && grid.cell_type[(i, j + 1)] != CellType::Solid {
        sum += grid.p.get(i, j + 1);
        n += 1;
    }
    if j > 0 && grid.cell_type[(i, j - 1)] != CellType::Solid {
        sum += grid.p.get(i, j - 1);
        n += 1;
    }

    (sum, n)
}

/// New pressure for cell (i, j), or None when the cell is Solid or has no
/// usable neighbour.
fn cell_update(grid: &MacGrid2D, i: usize, j: usize, coef: Real) -> Option<Real> {
    if grid.cell_type[(i, j)] != CellType::Fluid {
        return None;
    }

    let (sum, n) = neighbour_sum(grid, i, j);
    if n == 0 {
        return None;
    }

    Some((-coef * grid.div.get(i, j) + sum) / n as Real)
}

fn jacobi_sweep(grid: &mut MacGrid2D, scratch: &mut Grid2, coef: Real) {
    let g = &*grid;
    Zip::indexed(scratch.values_mut()).par_for_each(|(i, j), out| {
        *out = cell_update(g, i, j, coef).unwrap_or_else(|| g.p.get(i, j));
    });
    grid.p.assign(scratch);
}

fn gauss_seidel_sweep(grid: &mut MacGrid2D, coef: Real) {
    for i in 0..grid.nx {
        for j in 0..grid.ny {
            if let Some(p_new) = cell_update(grid, i, j, coef) {
                grid.p.set(i, j, p_new);
            }
        }
    }
}

fn red_black_sweep(grid: &mut MacGrid2D, scratch: &mut Grid2, coef: Real) {
    // All four neighbours of a cell have the opposite colour, so a colour
    // pass only reads cells it does not write; the install between passes is
    // the barrier that lets the second colour see the first one's updates.
    for colour in 0..2usize {
        let g = &*grid;
        Zip::indexed(scratch.values_mut()).par_for_each(|(i, j), out| {
            *out = if (i + j) % 2 == colour {
                cell_update(g, i, j, coef).unwrap_or_else(|| g.p.get(i, j))
            } else {
                g.p.get(i, j)
            };
        });
        grid.p.assign(scratch);
    }
}

/// RMS residual of the discrete Poisson equation over Fluid cells, in f64
/// regardless of the working precision. Sequential so the accumulation
/// order, and with it the convergence decision, is reproducible.
fn residual_norm(grid: &MacGrid2D, coef: Real) -> f64 {
    let mut sum_sq = 0.0f64;
    let mut count = 0usize;

    for i in 0..grid.nx {
        for j in 0..grid.ny {
            if grid.cell_type[(i, j)] != CellType::Fluid {
                continue;
            }

            let (sum, n) = neighbour_sum(grid, i, j);
            let r = (-coef * grid.div.get(i, j)) as f64
                - (n as f64 * grid.p.get(i, j) as f64 - sum as f64);
            sum_sq += r * r;
            count += 1;
        }
    }

    if count > 0 {
        (sum_sq / count as f64).sqrt()
    } else {
        0.0
    }
}

// Records res0 on the first sweep so later checks use the relative
// criterion ||r_k|| / ||r_0|| < tol.
fn stop(res: f64, res0: &mut f64, it: usize, tol: f64) -> bool {
    if it == 0 {
        *res0 = res;
        return *res0 < 1e-30;
    }
    res / *res0 < tol
}

#[cfg(test)]
mod tests {
    use super::*;

    fn divergent_grid() -> MacGrid2D {
        let mut mac = MacGrid2D::new(8, 8, 1.0, 0.1, 1.0, 1.0);
        mac.u.set(4, 4, 1.0);
        mac.u.set(2, 5, -0.5);
        mac.v.set(5, 3, 0.75);
        mac.update_divergence();
        mac
    }

    #[test]
    fn residual_vanishes_at_a_freshly_updated_cell() {
        let mut mac = divergent_grid();
        let coef = mac.density * mac.dx * mac.dx / mac.dt;

        // One Gauss-Seidel update of (4, 4) must satisfy its own equation.
        let p_new = cell_update(&mac, 4, 4, coef).unwrap();
        mac.p.set(4, 4, p_new);

        let (sum, n) = neighbour_sum(&mac, 4, 4);
        let r = -coef * mac.div.get(4, 4) - (n as Real * mac.p.get(4, 4) - sum);
        assert!(r.abs() < 1e-3, "residual after update was {r}");
    }

    #[test]
    fn solid_cells_are_never_updated() {
        let mut mac = divergent_grid();
        mac.cell_type[(4, 4)] = CellType::Solid;
        let coef = mac.density * mac.dx * mac.dx / mac.dt;

        assert!(cell_update(&mac, 4, 4, coef).is_none());

        mac.p.set(4, 4, 123.0);
        solve_pressure(&mut mac, SolverKind::GaussSeidel, 50, 1e-6);
        assert_eq!(mac.p.get(4, 4), 123.0);
    }

    #[test]
    fn solid_neighbours_are_excluded_from_the_stencil() {
        let mut mac = divergent_grid();
        mac.p.set(3, 4, 100.0);
        mac.cell_type[(3, 4)] = CellType::Solid;

        let (sum, n) = neighbour_sum(&mac, 4, 4);
        assert_eq!(n, 3);
        assert!(sum.abs() < 1e-6, "solid neighbour pressure leaked: {sum}");
    }

    #[test]
    fn a_divergence_free_field_converges_immediately() {
        let mut mac = MacGrid2D::new(8, 8, 1.0, 0.1, 1.0, 1.0);
        mac.update_divergence();

        let stats = solve_pressure(&mut mac, SolverKind::RedBlackGaussSeidel, 100, 1e-3);
        assert!(stats.converged);
        assert_eq!(stats.iterations, 1);
        assert_eq!(mac.p.max_abs(), 0.0);
    }

    #[test]
    fn hitting_the_iteration_cap_reports_non_convergence() {
        let mut mac = divergent_grid();
        let stats = solve_pressure(&mut mac, SolverKind::Jacobi, 2, 1e-12);
        assert!(!stats.converged);
        assert_eq!(stats.iterations, 2);
    }

    #[test]
    fn faces_adjacent_to_solids_are_pinned() {
        let mut mac = divergent_grid();
        mac.cell_type[(3, 3)] = CellType::Solid;
        for i in 0..=8 {
            for j in 0..8 {
                mac.u.set(i, j, 2.0);
            }
        }

        apply_pressure_gradient(&mut mac);

        assert_eq!(mac.u.get(3, 3), 0.0);
        assert_eq!(mac.u.get(4, 3), 0.0);
        assert_eq!(mac.v.get(3, 3), 0.0);
        assert_eq!(mac.v.get(3, 4), 0.0);
    }

    #[test]
    fn boundary_faces_are_left_untouched() {
        let mut mac = divergent_grid();
        for j in 0..8 {
            mac.u.set(0, j, 7.0);
            mac.u.set(8, j, 7.0);
        }
        for i in 0..8 {
            mac.v.set(i, 0, 7.0);
            mac.v.set(i, 8, 7.0);
        }

        apply_pressure_gradient(&mut mac);

        for j in 0..8 {
            assert_eq!(mac.u.get(0, j), 7.0);
            assert_eq!(mac.u.get(8, j), 7.0);
        }
        for i in 0..8 {
            assert_eq!(mac.v.get(i, 0), 7.0);
            assert_eq!(mac.v.get(i, 8), 7.0);
        }
    }
}
