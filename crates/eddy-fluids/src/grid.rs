use ndarray::Array2;

use crate::{Real, RealVec2};

/// Node layout used by the bilinear sampler.
///
/// On the MAC grid, u values sit on x-faces at `(i*dx, (j+0.5)*dy)` and
/// v values on y-faces at `((i+0.5)*dx, j*dy)`; cell-centred fields are
/// sampled without a half-cell offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stagger {
    Center,
    UFace,
    VFace,
}

/// Dense 2-D scalar field.
///
/// Values live in one contiguous block with the value at `(i, j)` stored at
/// linear offset `ny * i + j` (j varies fastest). Every grid in the solver
/// shares this convention. Integer access out of bounds panics.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2 {
    data: Array2<Real>,
}

impl Grid2 {
    /// Zero-filled `nx` by `ny` grid.
    pub fn new(nx: usize, ny: usize) -> Self {
        Grid2 {
            data: Array2::zeros((nx, ny)),
        }
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.data.dim().0
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.data.dim().1
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Real {
        self.data[(i, j)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: Real) {
        self.data[(i, j)] = value;
    }

    #[inline]
    pub fn in_bounds(&self, i: usize, j: usize) -> bool {
        i < self.nx() && j < self.ny()
    }

    pub fn values(&self) -> &Array2<Real> {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut Array2<Real> {
        &mut self.data
    }

    /// Overwrite this grid with the values of `src` (same extents).
    pub fn assign(&mut self, src: &Grid2) {
        self.data.assign(&src.data);
    }

    pub fn max_abs(&self) -> Real {
        self.data.iter().fold(0.0, |m, v| m.max(v.abs()))
    }

    /// Bilinearly interpolate the field at the physical point `p`.
    ///
    /// The fractional node index is `(p.x / dx, p.y / dy)`, shifted by half
    /// a cell along the staggered axis for `UFace`/`VFace`. The integer base
    /// of the 2x2 stencil is clamped so all four accessed nodes stay in
    /// bounds for any input point; an axis with a single node collapses its
    /// side of the stencil onto that node.
    pub fn sample(&self, p: RealVec2, dx: Real, dy: Real, stagger: Stagger) -> Real {
        let mut ir = p.x / dx;
        let mut jr = p.y / dy;

        match stagger {
            Stagger::UFace => jr -= 0.5,
            Stagger::VFace => ir -= 0.5,
            Stagger::Center => {}
        }

        let (i0, i1, fx) = stencil_axis(ir, self.nx());
        let (j0, j1, fy) = stencil_axis(jr, self.ny());

        let f00 = self.get(i0, j0);
        let f10 = self.get(i1, j0);
        let f01 = self.get(i0, j1);
        let f11 = self.get(i1, j1);

        (1.0 - fy) * ((1.0 - fx) * f00 + fx * f10) + fy * ((1.0 - fx) * f01 + fx * f11)
    }
}

/// Stencil bounds along one axis: base node, upper node, and fractional
/// weight for a fractional index `r` on an axis with `n` nodes.
fn stencil_axis(r: Real, n: usize) -> (usize, usize, Real) {
    if n < 2 {
        return (0, 0, 0.0);
    }
    let base = r.floor();
    let i0 = (base as isize).clamp(0, n as isize - 2) as usize;
    (i0, i0 + 1, r - base)
}
