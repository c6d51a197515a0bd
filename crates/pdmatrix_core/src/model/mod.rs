mod dimension;
mod matrix;

pub use dimension::Dimension;
pub use matrix::{BinCenter, CellTree, Matrix, Parameters};
