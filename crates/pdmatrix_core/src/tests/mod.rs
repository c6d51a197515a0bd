//! Integration tests for the matrix library
//!
//! Tests are organized by topic:
//! - `lookup` - multi-dimension query semantics against an in-file matrix
//! - `roundtrip` - save/load round trips through real files

mod lookup;
