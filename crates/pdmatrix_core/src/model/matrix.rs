//! The power deviation matrix: an ordered list of [`Dimension`]s and a
//! sparse map from canonicalized bin-center tuples to deviation values.
//!
//! Persistence is a flat list of `<Cell>` records; in memory the cells
//! live in one flat map keyed by `Vec<BinCenter>` (one component per
//! dimension, in dimension order). `save` accepts the nested
//! per-dimension [`CellTree`] form that upstream assembly code builds
//! and flattens it recursively, one recursion level per dimension.

use std::fmt;
use std::ops;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::document::{Document, Element};
use crate::error::{ConfigurationError, DocumentError, LookupError};
use crate::model::dimension::{Dimension, round_dp};

const MATRIX_NAMESPACE: &str = "http://www.pcwg.org";

/// A bin center canonicalized to 4 decimal places.
///
/// Stored as ten-thousandths in an integer, so tuples of centers get
/// structural `Eq + Hash` without hashing raw floats. Every value the
/// 4-decimal rounding can produce is represented exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinCenter(i64);

impl BinCenter {
    pub fn from_value(value: f64) -> Self {
        BinCenter((value * 10_000.0).round_ties_even() as i64)
    }

    pub fn value(self) -> f64 {
        self.0 as f64 / 10_000.0
    }
}

impl fmt::Display for BinCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Query input: parameter name to measured value.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    values: FxHashMap<String, f64>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, parameter: impl Into<String>, value: f64) -> Self {
        self.set(parameter, value);
        self
    }

    pub fn set(&mut self, parameter: impl Into<String>, value: f64) {
        self.values.insert(parameter.into(), value);
    }

    pub fn get(&self, parameter: &str) -> Option<f64> {
        self.values.get(parameter).copied()
    }
}

/// Nested per-dimension value tree, the shape `save` consumes: one
/// branch level per dimension, leaves holding the deviation value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellTree {
    Branch(FxHashMap<BinCenter, CellTree>),
    Leaf(f64),
}

impl CellTree {
    /// Empty branch level.
    pub fn new() -> Self {
        CellTree::Branch(FxHashMap::default())
    }

    /// Insert a value at a path of raw bin centers (one per dimension,
    /// outermost first). Centers are canonicalized on the way down.
    pub fn insert(&mut self, centers: &[f64], value: f64) {
        match centers.split_first() {
            None => *self = CellTree::Leaf(value),
            Some((&first, rest)) => {
                if let CellTree::Leaf(_) = self {
                    *self = CellTree::new();
                }
                if let CellTree::Branch(level) = self {
                    level
                        .entry(BinCenter::from_value(first))
                        .or_insert_with(CellTree::new)
                        .insert(rest, value);
                }
            }
        }
    }
}

impl Default for CellTree {
    fn default() -> Self {
        CellTree::new()
    }
}

/// A multi-dimensional binned deviation lookup table with XML
/// persistence.
///
/// Loaded fully formed from a file via [`Matrix::load`], or created
/// empty via [`Matrix::new`] and populated through [`Matrix::save`].
/// Lookup never mutates the cell map.
#[derive(Debug, Clone)]
pub struct Matrix {
    name: String,
    out_of_range_value: f64,
    dimensions: Vec<Dimension>,
    cells: FxHashMap<Vec<BinCenter>, f64>,
    path: Option<PathBuf>,
    is_new: bool,
}

impl Matrix {
    /// Empty, not-yet-persisted matrix.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            out_of_range_value: 0.0,
            dimensions: Vec::new(),
            cells: FxHashMap::default(),
            path: None,
            is_new: true,
        }
    }

    /// Load a matrix from a persisted document.
    ///
    /// Dimensions are read in document order; each cell record's bin
    /// centers are resolved through [`Dimension::bin`] so the stored
    /// key matches whatever a live query resolves to.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let doc = Document::load(path)?;

        let matrix_node = find_required(doc.root(), "PowerDeviationMatrix")?;
        let name = matrix_node.text_of("Name")?.to_string();
        let out_of_range_value = matrix_node.float_of("OutOfRangeValue")?;

        let dimensions_node = child_required(matrix_node, "Dimensions")?;
        let mut dimensions = Vec::new();
        for node in dimensions_node.children("Dimension") {
            let parameter = node.text_of("Parameter")?.to_string();
            let center_of_first_bin = node.float_of("CenterOfFirstBin")?;
            let bin_width = node.float_of("BinWidth")?;
            // The original writes an integer but reads it through the
            // float path; stay tolerant of "10.0" in existing files.
            let number_of_bins = node.float_of("NumberOfBins")?;

            if bin_width == 0.0 {
                return Err(ConfigurationError::InvalidDimension {
                    parameter,
                    reason: "bin width must be nonzero",
                });
            }
            if number_of_bins < 1.0 {
                return Err(ConfigurationError::InvalidDimension {
                    parameter,
                    reason: "number of bins must be at least 1",
                });
            }

            dimensions.push(Dimension::new(
                parameter,
                center_of_first_bin,
                bin_width,
                number_of_bins as usize,
            ));
        }
        if dimensions.is_empty() {
            return Err(ConfigurationError::NoDimensions);
        }

        // The cells block is located from the document root, not
        // through the matrix record; files that carry it in either
        // position read back identically.
        let cells_node = find_required(doc.root(), "Cells")?;
        let mut cells = FxHashMap::default();
        for cell_node in cells_node.children("Cell") {
            let cell_dimensions_node = child_required(cell_node, "CellDimensions")?;
            let mut centers: FxHashMap<&str, f64> = FxHashMap::default();
            for node in cell_dimensions_node.children("CellDimension") {
                centers.insert(node.text_of("Parameter")?, node.float_of("BinCenter")?);
            }
            let value = cell_node.float_of("Value")?;

            let mut key = Vec::with_capacity(dimensions.len());
            for dimension in &dimensions {
                let center = centers.get(dimension.parameter()).copied().ok_or_else(|| {
                    ConfigurationError::MissingCellDimension {
                        parameter: dimension.parameter().to_string(),
                    }
                })?;
                key.push(BinCenter::from_value(dimension.bin(center)));
            }
            cells.insert(key, value);
        }

        debug!(
            name = %name,
            dimensions = dimensions.len(),
            cells = cells.len(),
            "loaded power deviation matrix"
        );

        Ok(Self {
            name,
            out_of_range_value,
            dimensions,
            cells,
            path: Some(path.to_path_buf()),
            is_new: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn out_of_range_value(&self) -> f64 {
        self.out_of_range_value
    }

    pub fn set_out_of_range_value(&mut self, value: f64) {
        self.out_of_range_value = value;
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Number of populated cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether this matrix was created empty rather than loaded.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// File this matrix was last loaded from or saved to.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up the deviation for a tuple of measured parameter values.
    ///
    /// Each dimension's value is snapped to its nearest bin center; if
    /// any snapped center falls outside the dimension's bin range the
    /// configured out-of-range value is returned immediately, without
    /// touching the remaining dimensions. A combination that is in
    /// range for every dimension but has no stored cell is an error.
    pub fn get(&self, parameters: &Parameters) -> Result<f64, LookupError> {
        self.lookup(parameters).copied()
    }

    fn lookup(&self, parameters: &Parameters) -> Result<&f64, LookupError> {
        if self.dimensions.is_empty() {
            return Err(LookupError::NoDimensions);
        }

        let mut key = Vec::with_capacity(self.dimensions.len());
        for dimension in &self.dimensions {
            let value = parameters.get(dimension.parameter()).ok_or_else(|| {
                LookupError::MissingParameter(dimension.parameter().to_string())
            })?;
            let bin = dimension.bin(value);
            if !dimension.within_range(bin) {
                return Ok(&self.out_of_range_value);
            }
            key.push(BinCenter::from_value(bin));
        }

        match self.cells.get(&key) {
            Some(value) => Ok(value),
            None => {
                let message = self.miss_message(parameters);
                warn!("{message}");
                Err(LookupError::CellNotFound(message))
            }
        }
    }

    /// One line per dimension: raw value, resolved bin, valid range.
    fn miss_message(&self, parameters: &Parameters) -> String {
        use std::fmt::Write as _;

        let mut message = String::from("Matrix value not found:\n");
        for dimension in &self.dimensions {
            let value = parameters.get(dimension.parameter()).unwrap_or(f64::NAN);
            let _ = writeln!(
                message,
                "{}: {:.6} ({:.6}) - ({:.6} to {:.6})",
                dimension.parameter(),
                value,
                dimension.bin(value),
                dimension.center_of_first_bin(),
                dimension.center_of_last_bin(),
            );
        }
        message
    }

    /// Rebuild the nested [`CellTree`] form from the flat cell map,
    /// keyed by canonical centers in dimension order. Feeding the
    /// result back to [`Matrix::save`] reproduces every stored cell.
    pub fn cell_tree(&self) -> CellTree {
        let mut tree = CellTree::new();
        for (key, value) in &self.cells {
            let centers: Vec<f64> = key.iter().map(|c| c.value()).collect();
            tree.insert(&centers, *value);
        }
        tree
    }

    /// Persist a dimension list and nested value tree to `path`.
    ///
    /// The dimension list may differ from this matrix's own (the
    /// caller can assemble a structure externally and persist it
    /// through an empty matrix). Records the path and clears the
    /// new-matrix flag; the in-memory cell map is not replaced.
    pub fn save(
        &mut self,
        path: impl AsRef<Path>,
        dimensions: &[Dimension],
        matrix: &CellTree,
    ) -> Result<(), ConfigurationError> {
        let path = path.as_ref();

        let mut doc = Document::with_root("PowerDeviationMatrix", MATRIX_NAMESPACE);
        let root = doc.root_mut();
        root.add_text("Name", &self.name);
        root.add_float("OutOfRangeValue", self.out_of_range_value);

        let dimensions_node = root.add_element("Dimensions");
        for dimension in dimensions {
            let node = dimensions_node.add_element("Dimension");
            node.add_text("Parameter", dimension.parameter());
            node.add_float("CenterOfFirstBin", dimension.center_of_first_bin());
            node.add_float("BinWidth", dimension.bin_width());
            node.add_int("NumberOfBins", dimension.number_of_bins() as i64);
        }

        let cells_node = root.add_element("Cells");
        if !dimensions.is_empty() {
            let mut centers = Vec::with_capacity(dimensions.len());
            add_cells(cells_node, dimensions, matrix, &mut centers)?;
        }

        doc.save(path)?;

        debug!(path = %path.display(), "saved power deviation matrix");
        self.is_new = false;
        self.path = Some(path.to_path_buf());
        Ok(())
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscript-style accessor. Panics where [`Matrix::get`] would return
/// an error, like `HashMap` indexing.
impl ops::Index<&Parameters> for Matrix {
    type Output = f64;

    fn index(&self, parameters: &Parameters) -> &f64 {
        match self.lookup(parameters) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }
}

/// Recursive descent over the nested tree: at depth `d`, enumerate
/// dimension `d`'s bin centers in ascending index order and follow the
/// ones present in the current branch. Absent centers are skipped,
/// which is what keeps the flat record list sparse.
fn add_cells(
    cells_node: &mut Element,
    dimensions: &[Dimension],
    tree: &CellTree,
    centers: &mut Vec<f64>,
) -> Result<(), ConfigurationError> {
    let depth = centers.len();
    let CellTree::Branch(level) = tree else {
        return Err(ConfigurationError::InvalidCellTree { depth });
    };

    let dimension = &dimensions[depth];
    for i in 0..dimension.number_of_bins() {
        let center = dimension.bin_center_by_index(i);
        let Some(child) = level.get(&BinCenter::from_value(center)) else {
            continue;
        };

        centers.push(center);
        if centers.len() == dimensions.len() {
            let CellTree::Leaf(value) = child else {
                return Err(ConfigurationError::InvalidCellTree { depth: depth + 1 });
            };
            write_cell(cells_node, dimensions, centers, *value);
        } else {
            add_cells(cells_node, dimensions, child, centers)?;
        }
        centers.pop();
    }
    Ok(())
}

fn find_required<'a>(root: &'a Element, tag: &str) -> Result<&'a Element, DocumentError> {
    root.find(tag)
        .ok_or_else(|| DocumentError::MissingElement { tag: tag.into() })
}

fn child_required<'a>(parent: &'a Element, tag: &str) -> Result<&'a Element, DocumentError> {
    parent
        .child(tag)
        .ok_or_else(|| DocumentError::MissingElement { tag: tag.into() })
}

fn write_cell(cells_node: &mut Element, dimensions: &[Dimension], centers: &[f64], value: f64) {
    let cell_node = cells_node.add_element("Cell");
    let cell_dimensions_node = cell_node.add_element("CellDimensions");
    for (dimension, center) in dimensions.iter().zip(centers) {
        let node = cell_dimensions_node.add_element("CellDimension");
        node.add_text("Parameter", dimension.parameter());
        node.add_float("BinCenter", round_dp(*center, 4));
    }
    cell_node.add_float("Value", value);
}
