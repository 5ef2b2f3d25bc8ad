//! Basic example demonstrating the compositional transforms.
//!
//! This example shows how to:
//! 1. Close raw oxide analyses to proportions
//! 2. Replace zeros before log-ratio transforms
//! 3. Transform with each transformer and invert again
//! 4. Check that ILR preserves Aitchison distances

use geocoda::prelude::*;
use nalgebra::DMatrix;

fn main() -> Result<()> {
    println!("=== geocoda Example ===\n");

    let parts = ["SiO2", "Al2O3", "FeO", "MgO", "Na2O"];
    let raw = DMatrix::from_row_slice(4, 5, &[
        49.2, 15.1, 10.3, 8.7, 2.6,
        52.8, 16.0, 8.9, 6.1, 3.1,
        57.5, 16.8, 6.7, 3.9, 3.8,
        61.9, 17.2, 0.0, 2.4, 4.3,
    ]);

    println!("Raw analyses (wt%): {} samples × {} oxides", raw.nrows(), raw.ncols());

    let delta = adaptive_delta(&raw);
    let data = close(&multiplicative_replacement(&raw, delta)?)?;
    println!("Replaced zeros with delta = {:.5} and closed to 1\n", delta);

    let names: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
    let specs = [
        TransformSpec::Linear,
        TransformSpec::Alr { ref_idx: Some(0) },
        TransformSpec::Clr,
        TransformSpec::Ilr,
        TransformSpec::BoxCox {
            options: BoxCoxOptions::default(),
        },
    ];

    for spec in specs {
        let mut tmr = spec.build();
        let coords = tmr.transform(&data)?;
        let back = tmr.inverse_transform(&coords)?;
        let max_err = data
            .iter()
            .zip(back.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);

        println!("{}:", tmr.name());
        println!("  Columns: {}", tmr.output_names(&names).join(", "));
        println!("  First row: {:?}", coords.row(0).iter().map(|x| format!("{:.4}", x)).collect::<Vec<_>>());
        println!("  Max round-trip error: {:.2e}", max_err);
        println!();
    }

    println!("=== Isometry ===\n");
    let row = |i: usize| data.row(i).iter().cloned().collect::<Vec<f64>>();
    let coords = ilr(&data)?;
    let euclidean = (0..coords.ncols())
        .map(|j| (coords[(0, j)] - coords[(3, j)]).powi(2))
        .sum::<f64>()
        .sqrt();
    println!("Aitchison distance (sample 1, 4): {:.6}", aitchison_distance(&row(0), &row(3))?);
    println!("Euclidean distance in ILR space:  {:.6}", euclidean);

    Ok(())
}
