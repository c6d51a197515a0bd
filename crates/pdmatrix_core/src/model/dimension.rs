//! One axis of the deviation matrix grid.
//!
//! A dimension partitions a continuous parameter (wind speed,
//! turbulence intensity, ...) into `number_of_bins` bins of width
//! `bin_width`, identified by their centers. `bin()` snaps an
//! arbitrary value to the nearest center and is applied identically
//! when ingesting stored cells and when resolving a live query, so
//! both paths produce the same map key.

use serde::Serialize;

/// Round to `dp` decimal places with ties-to-even.
#[inline]
pub(crate) fn round_dp(value: f64, dp: i32) -> f64 {
    let scale = 10f64.powi(dp);
    (value * scale).round_ties_even() / scale
}

/// One independent parameter axis: a fixed-width, fixed-count bin grid.
///
/// Immutable after construction; `center_of_last_bin` is derived once
/// from the other three numeric fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimension {
    parameter: String,
    center_of_first_bin: f64,
    bin_width: f64,
    number_of_bins: usize,
    center_of_last_bin: f64,
}

impl Dimension {
    pub fn new(
        parameter: impl Into<String>,
        center_of_first_bin: f64,
        bin_width: f64,
        number_of_bins: usize,
    ) -> Self {
        let center_of_last_bin =
            center_of_first_bin + bin_width * (number_of_bins as f64 - 1.0);
        Self {
            parameter: parameter.into(),
            center_of_first_bin,
            bin_width,
            number_of_bins,
            center_of_last_bin,
        }
    }

    /// Name of the physical quantity this axis represents.
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn center_of_first_bin(&self) -> f64 {
        self.center_of_first_bin
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn number_of_bins(&self) -> usize {
        self.number_of_bins
    }

    pub fn center_of_last_bin(&self) -> f64 {
        self.center_of_last_bin
    }

    /// Center of bin `i`, for `i` in `[0, number_of_bins)`.
    #[inline]
    pub fn bin_center_by_index(&self, i: usize) -> f64 {
        self.center_of_first_bin + self.bin_width * i as f64
    }

    /// Whether `value` lies within `[center_of_first_bin,
    /// center_of_last_bin]`, both bounds inclusive.
    #[inline]
    pub fn within_range(&self, value: f64) -> bool {
        value >= self.center_of_first_bin && value <= self.center_of_last_bin
    }

    /// Snap `value` to the nearest bin center.
    ///
    /// The result is rounded to 4 decimal places to absorb
    /// floating-point drift, so centers re-derived through different
    /// arithmetic paths still compare equal as map keys. The 4-decimal
    /// constant is part of the persisted-file contract and is not
    /// derived from the bin width.
    #[inline]
    pub fn bin(&self, value: f64) -> f64 {
        let steps = ((value - self.center_of_first_bin) / self.bin_width).round_ties_even();
        round_dp(steps * self.bin_width + self.center_of_first_bin, 4)
    }
}
