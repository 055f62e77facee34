//! Snapshot serialisation for simulation fields: per-step VTK ImageData
//! (`.vti`) files plus a `.pvd` collection index readable by ParaView.

pub mod encode;

pub use encode::{EncodingError, FieldSeriesEncoder};
