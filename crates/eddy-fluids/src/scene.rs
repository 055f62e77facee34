//! Initial-condition primitives. Each primitive is built from the config,
//! applied once to the fields at startup, and then discarded.

use crate::grid::Grid2;
use crate::mac_2d::MacGrid2D;
use crate::{CellType, Real};

/// A scene primitive with a fixed capability set. Coordinates are cell
/// indices and may extend past the domain; applications clamp to the target
/// grid. Operations a primitive does not support are no-ops.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneObject {
    /// Axis-aligned rectangle with inclusive corners. Supports velocity,
    /// solid, and smoke.
    Rectangle {
        val: Real,
        x1: i64,
        y1: i64,
        x2: i64,
        y2: i64,
    },
    /// Filled disc. Supports solid only.
    Cylinder { cx: i64, cy: i64, r: i64 },
}

impl SceneObject {
    pub fn apply_velocity_u(&self, mac: &mut MacGrid2D) {
        if let SceneObject::Rectangle { val, x1, y1, x2, y2 } = *self {
            fill_rect(&mut mac.u, val, x1, y1, x2, y2);
        }
    }

    pub fn apply_velocity_v(&self, mac: &mut MacGrid2D) {
        if let SceneObject::Rectangle { val, x1, y1, x2, y2 } = *self {
            fill_rect(&mut mac.v, val, x1, y1, x2, y2);
        }
    }

    pub fn apply_smoke(&self, mac: &mut MacGrid2D) {
        if let SceneObject::Rectangle { val, x1, y1, x2, y2 } = *self {
            fill_rect(&mut mac.smoke, val, x1, y1, x2, y2);
        }
    }

    pub fn apply_solid(&self, mac: &mut MacGrid2D) {
        match *self {
            SceneObject::Rectangle { x1, y1, x2, y2, .. } => {
                let (Some(i_range), Some(j_range)) = (
                    clamped_range(x1, x2, mac.nx),
                    clamped_range(y1, y2, mac.ny),
                ) else {
                    return;
                };
                for i in i_range {
                    for j in j_range.clone() {
                        mac.cell_type[(i, j)] = CellType::Solid;
                    }
                }
            }
            SceneObject::Cylinder { cx, cy, r } => mac.solid_cylinder(cx, cy, r),
        }
    }
}

fn fill_rect(grid: &mut Grid2, val: Real, x1: i64, y1: i64, x2: i64, y2: i64) {
    let (Some(i_range), Some(j_range)) = (
        clamped_range(x1, x2, grid.nx()),
        clamped_range(y1, y2, grid.ny()),
    ) else {
        return;
    };
    for i in i_range {
        for j in j_range.clone() {
            grid.set(i, j, val);
        }
    }
}

/// Inclusive index range [lo, hi] intersected with [0, extent), or None when
/// the intersection is empty.
fn clamped_range(lo: i64, hi: i64, extent: usize) -> Option<std::ops::RangeInclusive<usize>> {
    let lo = lo.max(0);
    let hi = hi.min(extent as i64 - 1);
    if lo > hi {
        return None;
    }
    Some(lo as usize..=hi as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_writes_velocity_into_the_u_grid() {
        let mut mac = MacGrid2D::new(8, 8, 1.0, 0.1, 1.0, 1.0);
        let patch = SceneObject::Rectangle {
            val: 2.5,
            x1: 1,
            y1: 2,
            x2: 3,
            y2: 4,
        };

        patch.apply_velocity_u(&mut mac);

        assert_eq!(mac.u.get(1, 2), 2.5);
        assert_eq!(mac.u.get(3, 4), 2.5);
        assert_eq!(mac.u.get(0, 2), 0.0);
        assert_eq!(mac.u.get(4, 4), 0.0);
        assert_eq!(mac.v.max_abs(), 0.0);
    }

    #[test]
    fn rectangle_corners_are_clamped_to_the_grid() {
        let mut mac = MacGrid2D::new(4, 4, 1.0, 0.1, 1.0, 1.0);
        let patch = SceneObject::Rectangle {
            val: 1.0,
            x1: -3,
            y1: -3,
            x2: 100,
            y2: 100,
        };

        patch.apply_velocity_v(&mut mac);

        for i in 0..4 {
            for j in 0..=4 {
                assert_eq!(mac.v.get(i, j), 1.0);
            }
        }
    }

    #[test]
    fn rectangle_fully_outside_is_a_no_op() {
        let mut mac = MacGrid2D::new(4, 4, 1.0, 0.1, 1.0, 1.0);
        let patch = SceneObject::Rectangle {
            val: 1.0,
            x1: 10,
            y1: 10,
            x2: 20,
            y2: 20,
        };

        patch.apply_velocity_u(&mut mac);
        patch.apply_solid(&mut mac);

        assert_eq!(mac.u.max_abs(), 0.0);
        assert!(!mac.is_solid(3, 3));
    }

    #[test]
    fn rectangle_marks_solid_cells() {
        let mut mac = MacGrid2D::new(8, 8, 1.0, 0.1, 1.0, 1.0);
        let block = SceneObject::Rectangle {
            val: 0.0,
            x1: 2,
            y1: 2,
            x2: 4,
            y2: 4,
        };

        block.apply_solid(&mut mac);

        assert!(mac.is_solid(2, 2));
        assert!(mac.is_solid(4, 4));
        assert!(!mac.is_solid(5, 4));
        assert!(!mac.is_solid(1, 2));
    }

    #[test]
    fn cylinder_only_supports_solid() {
        let mut mac = MacGrid2D::new(8, 8, 1.0, 0.1, 1.0, 1.0);
        let disc = SceneObject::Cylinder { cx: 4, cy: 4, r: 2 };

        disc.apply_velocity_u(&mut mac);
        disc.apply_smoke(&mut mac);
        assert_eq!(mac.u.max_abs(), 0.0);
        assert_eq!(mac.smoke.max_abs(), 0.0);

        disc.apply_solid(&mut mac);
        assert!(mac.is_solid(4, 4));
        assert!(mac.is_solid(2, 4));
        assert!(!mac.is_solid(1, 1));
    }
}
