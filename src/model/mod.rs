pub mod grid;
pub mod structure;

pub use grid::{DoseGrid, GridGeometry, Labelmap};
pub use structure::{Color, Structure, StructureGeometry, StructureKey, StructureSet};
