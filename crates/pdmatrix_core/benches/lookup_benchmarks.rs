//! Criterion benchmarks for the hot lookup path
//!
//! Run with: cargo bench -p pdmatrix_core

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pdmatrix_core::{CellTree, Dimension, Matrix, Parameters};

fn dense_matrix() -> Matrix {
    let dimensions = vec![
        Dimension::new("WindSpeed", 0.5, 0.5, 40),
        Dimension::new("Turbulence", 0.01, 0.01, 30),
    ];
    let mut tree = CellTree::new();
    for i in 0..40 {
        for j in 0..30 {
            tree.insert(
                &[
                    dimensions[0].bin_center_by_index(i),
                    dimensions[1].bin_center_by_index(j),
                ],
                (i * 30 + j) as f64 / 1000.0,
            );
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.xml");
    let mut matrix = Matrix::new();
    matrix.set_out_of_range_value(-999.0);
    matrix.save(&path, &dimensions, &tree).unwrap();
    Matrix::load(&path).unwrap()
}

fn bench_lookup(c: &mut Criterion) {
    let matrix = dense_matrix();

    let hit = Parameters::new()
        .with("WindSpeed", 7.3)
        .with("Turbulence", 0.142);
    c.bench_function("lookup_cell_hit", |b| {
        b.iter(|| matrix.get(black_box(&hit)).unwrap())
    });

    let out_of_range = Parameters::new()
        .with("WindSpeed", 99.0)
        .with("Turbulence", 0.142);
    c.bench_function("lookup_out_of_range_short_circuit", |b| {
        b.iter(|| matrix.get(black_box(&out_of_range)).unwrap())
    });
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
