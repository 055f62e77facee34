use ndarray::Array2;

use crate::grid::{Grid2, Stagger};
use crate::{CellType, Real, RealVec2};

/// All physical fields of the simulation on a staggered (MAC) grid.
///
/// | Field   | Extent          | Location                  |
/// |---------|-----------------|---------------------------|
/// | `u`     | (nx+1) x ny     | x-face centres            |
/// | `v`     | nx x (ny+1)     | y-face centres            |
/// | `p`     | nx x ny         | cell centres              |
/// | `div`   | nx x ny         | cell centres (diagnostic) |
/// | `speed` | (nx-1) x (ny-1) | cell centres (diagnostic) |
/// | `smoke` | (nx-1) x (ny-1) | cell centres (passive)    |
///
/// Cell labels share the pressure grid's index mapping.
#[derive(Debug, Clone)]
pub struct MacGrid2D {
    /// Number of pressure cells in x.
    pub nx: usize,
    /// Number of pressure cells in y.
    pub ny: usize,
    /// Cell pitch in x.
    pub dx: Real,
    /// Cell pitch in y.
    pub dy: Real,
    /// Time-step size.
    pub dt: Real,
    /// Fluid density.
    pub density: Real,
    /// Velocity imposed at faces of Solid cells. Reserved for moving
    /// boundaries, 0 in this version.
    pub usolid: Real,

    pub u: Grid2,
    pub v: Grid2,
    pub p: Grid2,
    pub div: Grid2,
    pub speed: Grid2,
    pub smoke: Grid2,
    /// Cell labels (`Fluid` or `Solid`).
    pub cell_type: Array2<CellType>,
}

impl MacGrid2D {
    pub fn new(nx: usize, ny: usize, density: Real, dt: Real, dx: Real, dy: Real) -> Self {
        MacGrid2D {
            nx,
            ny,
            dx,
            dy,
            dt,
            density,
            usolid: 0.0,
            u: Grid2::new(nx + 1, ny),
            v: Grid2::new(nx, ny + 1),
            p: Grid2::new(nx, ny),
            div: Grid2::new(nx, ny),
            speed: Grid2::new(nx - 1, ny - 1),
            smoke: Grid2::new(nx - 1, ny - 1),
            cell_type: Array2::from_elem((nx, ny), CellType::Fluid),
        }
    }

    #[inline]
    pub fn is_solid(&self, i: usize, j: usize) -> bool {
        self.cell_type[(i, j)] == CellType::Solid
    }

    #[inline]
    pub fn sample_u(&self, p: RealVec2) -> Real {
        self.u.sample(p, self.dx, self.dy, Stagger::UFace)
    }

    #[inline]
    pub fn sample_v(&self, p: RealVec2) -> Real {
        self.v.sample(p, self.dx, self.dy, Stagger::VFace)
    }

    /// Interpolated velocity at the physical point `p`.
    #[inline]
    pub fn velocity_at(&self, p: RealVec2) -> RealVec2 {
        RealVec2::new(self.sample_u(p), self.sample_v(p))
    }

    /// Recompute the discrete divergence into `div`:
    /// `div(i,j) = (u(i+1,j) - u(i,j)) / dx + (v(i,j+1) - v(i,j)) / dy`.
    pub fn update_divergence(&mut self) {
        let inv_dx = 1.0 / self.dx;
        let inv_dy = 1.0 / self.dy;

        for i in 0..self.nx {
            for j in 0..self.ny {
                let dudx = (self.u.get(i + 1, j) - self.u.get(i, j)) * inv_dx;
                let dvdy = (self.v.get(i, j + 1) - self.v.get(i, j)) * inv_dy;
                self.div.set(i, j, dudx + dvdy);
            }
        }
    }

    /// Interpolate |velocity| to cell centres over the `speed` grid.
    pub fn update_speed(&mut self) {
        for i in 0..self.nx - 1 {
            for j in 0..self.ny - 1 {
                let centre = RealVec2::new(
                    (i as Real + 0.5) * self.dx,
                    (j as Real + 0.5) * self.dy,
                );
                let vel = self.velocity_at(centre);
                self.speed.set(i, j, vel.length());
            }
        }
    }

    /// Largest |div| over the grid, used for progress reporting.
    pub fn max_divergence(&self) -> Real {
        self.div.max_abs()
    }

    /// Mark all cells inside a disc as Solid. Centre and radius are in cell
    /// indices; the disc may extend past the domain.
    pub fn solid_cylinder(&mut self, cx: i64, cy: i64, r: i64) {
        let r2 = r * r;
        for i in 0..self.nx {
            for j in 0..self.ny {
                let di = i as i64 - cx;
                let dj = j as i64 - cy;
                if di * di + dj * dj <= r2 {
                    self.cell_type[(i, j)] = CellType::Solid;
                }
            }
        }
    }

    /// Mark the four border rows/columns as Solid (no-slip walls).
    pub fn solid_borders(&mut self) {
        for i in 0..self.nx {
            self.cell_type[(i, 0)] = CellType::Solid;
            self.cell_type[(i, self.ny - 1)] = CellType::Solid;
        }
        for j in 0..self.ny {
            self.cell_type[(0, j)] = CellType::Solid;
            self.cell_type[(self.nx - 1, j)] = CellType::Solid;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_extents_follow_the_mac_layout() {
        let mac = MacGrid2D::new(8, 6, 1000.0, 0.01, 0.1, 0.1);
        assert_eq!((mac.u.nx(), mac.u.ny()), (9, 6));
        assert_eq!((mac.v.nx(), mac.v.ny()), (8, 7));
        assert_eq!((mac.p.nx(), mac.p.ny()), (8, 6));
        assert_eq!((mac.speed.nx(), mac.speed.ny()), (7, 5));
        assert_eq!(mac.cell_type.dim(), (8, 6));
    }

    #[test]
    fn divergence_uses_forward_face_differences() {
        let mut mac = MacGrid2D::new(4, 4, 1.0, 0.1, 0.5, 0.25);
        mac.u.set(2, 1, 3.0);
        mac.u.set(1, 1, 1.0);
        mac.v.set(1, 2, 2.0);
        mac.v.set(1, 1, 0.5);

        mac.update_divergence();

        let expected = (3.0 - 1.0) / 0.5 + (2.0 - 0.5) / 0.25;
        assert!((mac.div.get(1, 1) - expected).abs() < 1e-5);
    }

    #[test]
    fn speed_of_a_uniform_field_is_its_norm() {
        let mut mac = MacGrid2D::new(6, 6, 1.0, 0.1, 1.0, 1.0);
        for i in 0..=6 {
            for j in 0..6 {
                mac.u.set(i, j, 3.0);
                mac.v.set(j, i, 4.0);
            }
        }

        mac.update_speed();

        for i in 0..5 {
            for j in 0..5 {
                assert!(
                    (mac.speed.get(i, j) - 5.0).abs() < 1e-4,
                    "speed at ({i}, {j}) was {}",
                    mac.speed.get(i, j)
                );
            }
        }
    }

    #[test]
    fn solid_borders_marks_the_outer_ring() {
        let mut mac = MacGrid2D::new(5, 5, 1.0, 0.1, 1.0, 1.0);
        mac.solid_borders();

        assert!(mac.is_solid(0, 2));
        assert!(mac.is_solid(4, 2));
        assert!(mac.is_solid(2, 0));
        assert!(mac.is_solid(2, 4));
        assert!(!mac.is_solid(2, 2));
    }

    #[test]
    fn solid_cylinder_marks_cells_inside_the_disc() {
        let mut mac = MacGrid2D::new(9, 9, 1.0, 0.1, 1.0, 1.0);
        mac.solid_cylinder(4, 4, 2);

        assert!(mac.is_solid(4, 4));
        assert!(mac.is_solid(4, 6));
        assert!(!mac.is_solid(6, 6));
        assert!(!mac.is_solid(0, 0));
    }
}
