//! Core engine for a 2-D incompressible fluid solver on a staggered
//! (MAC) grid: pressure projection plus semi-Lagrangian advection.

pub mod advect;
pub mod fluid_2d;
pub mod grid;
pub mod mac_2d;
pub mod pressure;
pub mod scene;

/// Working floating-point precision for all fields and kernels.
///
/// Selected at build time: `f32` by default, `f64` with the `f64` cargo
/// feature. Output writers derive their type tag from this alias.
#[cfg(not(feature = "f64"))]
pub type Real = f32;
#[cfg(feature = "f64")]
pub type Real = f64;

/// 2-D point/vector in the working precision.
#[cfg(not(feature = "f64"))]
pub type RealVec2 = glam::Vec2;
#[cfg(feature = "f64")]
pub type RealVec2 = glam::DVec2;

/// Grid cell states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Active cell, participates in the pressure solve.
    Fluid,
    /// Obstacle or wall cell, adjacent face velocities are fixed.
    Solid,
}
