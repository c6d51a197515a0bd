//! Power deviation matrix library
//!
//! A power deviation matrix is a multi-dimensional binned lookup
//! table: each dimension partitions one measured parameter (wind
//! speed, turbulence intensity, ...) into a fixed grid of bins, and a
//! sparse cell map stores one deviation value per populated bin
//! combination. Matrices persist to an XML schema shared with other
//! PCWG tooling, so the binning arithmetic applied on write and on
//! read must match bit for bit.
//!
//! ```ignore
//! use pdmatrix_core::{Matrix, Parameters};
//!
//! let matrix = Matrix::load("matrix.xml")?;
//! let deviation = matrix.get(
//!     &Parameters::new()
//!         .with("Normalised Wind Speed", 0.45)
//!         .with("Hub Turbulence", 0.08),
//! )?;
//! ```

#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod model;

#[cfg(test)]
mod tests;

pub use error::{ConfigurationError, DocumentError, LookupError};
pub use model::{BinCenter, CellTree, Dimension, Matrix, Parameters};
