//! Query semantics against a matrix loaded from a real file.

use std::path::PathBuf;

use crate::error::{ConfigurationError, LookupError};
use crate::model::{Matrix, Parameters};

fn write_fixture(dir: &tempfile::TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("matrix.xml");
    std::fs::write(&path, text).unwrap();
    path
}

/// WindSpeed bins at 1, 2, 3; Turbulence bins at 0.05, 0.10, 0.15, 0.20.
/// Three populated cells out of twelve combinations. One cell lists its
/// dimensions out of order and one carries a slightly drifted center.
const TWO_DIMENSIONAL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<PowerDeviationMatrix xmlns="http://www.pcwg.org">
  <Name>Demo</Name>
  <OutOfRangeValue>-999</OutOfRangeValue>
  <Dimensions>
    <Dimension>
      <Parameter>WindSpeed</Parameter>
      <CenterOfFirstBin>1.0</CenterOfFirstBin>
      <BinWidth>1.0</BinWidth>
      <NumberOfBins>3</NumberOfBins>
    </Dimension>
    <Dimension>
      <Parameter>Turbulence</Parameter>
      <CenterOfFirstBin>0.05</CenterOfFirstBin>
      <BinWidth>0.05</BinWidth>
      <NumberOfBins>4.0</NumberOfBins>
    </Dimension>
  </Dimensions>
  <Cells>
    <Cell>
      <CellDimensions>
        <CellDimension>
          <Parameter>WindSpeed</Parameter>
          <BinCenter>2.0</BinCenter>
        </CellDimension>
        <CellDimension>
          <Parameter>Turbulence</Parameter>
          <BinCenter>0.1</BinCenter>
        </CellDimension>
      </CellDimensions>
      <Value>0.02</Value>
    </Cell>
    <Cell>
      <CellDimensions>
        <CellDimension>
          <Parameter>Turbulence</Parameter>
          <BinCenter>0.2</BinCenter>
        </CellDimension>
        <CellDimension>
          <Parameter>WindSpeed</Parameter>
          <BinCenter>3.0</BinCenter>
        </CellDimension>
      </CellDimensions>
      <Value>-0.01</Value>
    </Cell>
    <Cell>
      <CellDimensions>
        <CellDimension>
          <Parameter>WindSpeed</Parameter>
          <BinCenter>1.0001</BinCenter>
        </CellDimension>
        <CellDimension>
          <Parameter>Turbulence</Parameter>
          <BinCenter>0.05</BinCenter>
        </CellDimension>
      </CellDimensions>
      <Value>0.005</Value>
    </Cell>
  </Cells>
</PowerDeviationMatrix>
"#;

#[test]
fn test_load_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let matrix = Matrix::load(write_fixture(&dir, TWO_DIMENSIONAL)).unwrap();

    assert_eq!(matrix.name(), "Demo");
    assert_eq!(matrix.out_of_range_value(), -999.0);
    assert_eq!(matrix.len(), 3);
    assert!(!matrix.is_new());
    assert!(matrix.path().is_some());

    let dimensions = matrix.dimensions();
    assert_eq!(dimensions.len(), 2);
    assert_eq!(dimensions[0].parameter(), "WindSpeed");
    assert_eq!(dimensions[0].center_of_last_bin(), 3.0);
    assert_eq!(dimensions[1].parameter(), "Turbulence");
    // NumberOfBins written as "4.0" still loads
    assert_eq!(dimensions[1].number_of_bins(), 4);
}

#[test]
fn test_query_snaps_raw_values_to_bins() {
    let dir = tempfile::tempdir().unwrap();
    let matrix = Matrix::load(write_fixture(&dir, TWO_DIMENSIONAL)).unwrap();

    let parameters = Parameters::new()
        .with("WindSpeed", 1.9)
        .with("Turbulence", 0.11);
    assert_eq!(matrix.get(&parameters).unwrap(), 0.02);

    let parameters = Parameters::new()
        .with("WindSpeed", 3.2)
        .with("Turbulence", 0.19);
    assert_eq!(matrix.get(&parameters).unwrap(), -0.01);
}

#[test]
fn test_drifted_stored_center_resolves_to_its_bin() {
    let dir = tempfile::tempdir().unwrap();
    let matrix = Matrix::load(write_fixture(&dir, TWO_DIMENSIONAL)).unwrap();

    // Stored center 1.0001 canonicalizes to the 1.0 bin on ingest
    let parameters = Parameters::new()
        .with("WindSpeed", 1.0)
        .with("Turbulence", 0.05);
    assert_eq!(matrix.get(&parameters).unwrap(), 0.005);
}

#[test]
fn test_out_of_range_any_dimension() {
    let dir = tempfile::tempdir().unwrap();
    let matrix = Matrix::load(write_fixture(&dir, TWO_DIMENSIONAL)).unwrap();

    let parameters = Parameters::new()
        .with("WindSpeed", 3.6)
        .with("Turbulence", 0.1);
    assert_eq!(matrix.get(&parameters).unwrap(), -999.0);

    let parameters = Parameters::new()
        .with("WindSpeed", 2.0)
        .with("Turbulence", 0.5);
    assert_eq!(matrix.get(&parameters).unwrap(), -999.0);
}

#[test]
fn test_sparse_miss_names_every_dimension() {
    let dir = tempfile::tempdir().unwrap();
    let matrix = Matrix::load(write_fixture(&dir, TWO_DIMENSIONAL)).unwrap();

    // In range for both dimensions but no cell at (1.0, 0.15)
    let parameters = Parameters::new()
        .with("WindSpeed", 1.2)
        .with("Turbulence", 0.16);
    let Err(LookupError::CellNotFound(message)) = matrix.get(&parameters) else {
        panic!("expected CellNotFound");
    };
    assert!(message.starts_with("Matrix value not found:"));
    assert!(message.contains("WindSpeed"));
    assert!(message.contains("Turbulence"));
}

#[test]
fn test_zero_dimensions_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        &dir,
        r#"<PowerDeviationMatrix xmlns="http://www.pcwg.org">
             <Name>Empty</Name>
             <OutOfRangeValue>0</OutOfRangeValue>
             <Dimensions></Dimensions>
             <Cells></Cells>
           </PowerDeviationMatrix>"#,
    );
    assert!(matches!(
        Matrix::load(path),
        Err(ConfigurationError::NoDimensions)
    ));
}

#[test]
fn test_zero_bin_width_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        &dir,
        r#"<PowerDeviationMatrix xmlns="http://www.pcwg.org">
             <Name>Bad</Name>
             <OutOfRangeValue>0</OutOfRangeValue>
             <Dimensions>
               <Dimension>
                 <Parameter>WindSpeed</Parameter>
                 <CenterOfFirstBin>1.0</CenterOfFirstBin>
                 <BinWidth>0.0</BinWidth>
                 <NumberOfBins>3</NumberOfBins>
               </Dimension>
             </Dimensions>
             <Cells></Cells>
           </PowerDeviationMatrix>"#,
    );
    assert!(matches!(
        Matrix::load(path),
        Err(ConfigurationError::InvalidDimension { parameter, .. }) if parameter == "WindSpeed"
    ));
}

#[test]
fn test_cell_missing_a_declared_dimension() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        &dir,
        r#"<PowerDeviationMatrix xmlns="http://www.pcwg.org">
             <Name>Bad</Name>
             <OutOfRangeValue>0</OutOfRangeValue>
             <Dimensions>
               <Dimension>
                 <Parameter>WindSpeed</Parameter>
                 <CenterOfFirstBin>1.0</CenterOfFirstBin>
                 <BinWidth>1.0</BinWidth>
                 <NumberOfBins>3</NumberOfBins>
               </Dimension>
               <Dimension>
                 <Parameter>Turbulence</Parameter>
                 <CenterOfFirstBin>0.05</CenterOfFirstBin>
                 <BinWidth>0.05</BinWidth>
                 <NumberOfBins>4</NumberOfBins>
               </Dimension>
             </Dimensions>
             <Cells>
               <Cell>
                 <CellDimensions>
                   <CellDimension>
                     <Parameter>WindSpeed</Parameter>
                     <BinCenter>2.0</BinCenter>
                   </CellDimension>
                 </CellDimensions>
                 <Value>0.02</Value>
               </Cell>
             </Cells>
           </PowerDeviationMatrix>"#,
    );
    assert!(matches!(
        Matrix::load(path),
        Err(ConfigurationError::MissingCellDimension { parameter }) if parameter == "Turbulence"
    ));
}
