//! Cosine similarity calculations
//!
//! cos(θ) = (A · B) / (‖A‖ ‖B‖), computed in f64 over dense matrices.
//! Degenerate vectors are rejected when a matrix is built rather than
//! producing NaN scores.

use clozify_core::EmbeddingVector;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::debug;

use crate::error::{JoinError, Result};

/// Cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(JoinError::DimensionMismatch {
            table: "pair".to_string(),
            row: 1,
            expected: a.len(),
            actual: b.len(),
        });
    }
    let a: Array1<f64> = a.iter().map(|&x| x as f64).collect();
    let b: Array1<f64> = b.iter().map(|&x| x as f64).collect();

    let norm_a = norm(a.view());
    let norm_b = norm(b.view());
    if norm_a == 0.0 {
        return Err(JoinError::ZeroMagnitude { table: "pair".to_string(), row: 0 });
    }
    if norm_b == 0.0 {
        return Err(JoinError::ZeroMagnitude { table: "pair".to_string(), row: 1 });
    }

    Ok(a.dot(&b) / (norm_a * norm_b))
}

fn norm(v: ArrayView1<f64>) -> f64 {
    v.dot(&v).sqrt()
}

/// Stack embeddings into an `n × d` matrix, one row per embedding
///
/// Every vector must have the length of the first, contain only finite
/// values and have non-zero magnitude. `table` names the source in errors.
pub fn embedding_matrix(table: &str, embeddings: &[EmbeddingVector]) -> Result<Array2<f64>> {
    let dimension = embeddings.first().map_or(0, Vec::len);
    let mut flat = Vec::with_capacity(embeddings.len() * dimension);

    for (row, embedding) in embeddings.iter().enumerate() {
        if embedding.len() != dimension {
            return Err(JoinError::DimensionMismatch {
                table: table.to_string(),
                row,
                expected: dimension,
                actual: embedding.len(),
            });
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(JoinError::NonFinite {
                table: table.to_string(),
                row,
            });
        }
        if embedding.iter().all(|&x| x == 0.0) {
            return Err(JoinError::ZeroMagnitude {
                table: table.to_string(),
                row,
            });
        }
        flat.extend(embedding.iter().map(|&x| x as f64));
    }

    Array2::from_shape_vec((embeddings.len(), dimension), flat).map_err(|e| {
        JoinError::Table(clozify_core::ClozifyError::parse(format!(
            "cannot shape {table} embeddings: {e}"
        )))
    })
}

/// Full cosine-similarity matrix: `S[i][j]` compares row i of `x` with row j of `y`
///
/// Both matrices must come from [`embedding_matrix`] and share a column count.
pub fn similarity_matrix(x: &Array2<f64>, y: &Array2<f64>) -> Array2<f64> {
    debug!(
        "Computing {}x{} similarity matrix over {} dimensions",
        x.nrows(),
        y.nrows(),
        x.ncols()
    );
    let dots = x.dot(&y.t());
    let norms_x = x.map_axis(Axis(1), norm).insert_axis(Axis(1));
    let norms_y = y.map_axis(Axis(1), norm).insert_axis(Axis(0));
    dots / norms_x.dot(&norms_y)
}

/// Column index and score of each row's maximum; ties go to the lowest index
pub fn argmax_rows(scores: &Array2<f64>) -> Vec<(usize, f64)> {
    scores
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (j, &score)| {
                    if score > best.1 {
                        (j, score)
                    } else {
                        best
                    }
                })
        })
        .collect()
}
