//! Forward-chaining validation: every fold trains on a prefix and tests on the
//! block that immediately follows it.

use analysis_core::AnalysisError;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::ops::Range;

use crate::model::{LogisticRegression, Standardizer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Expanding-window folds over `n_samples` rows; test blocks are strictly increasing in time.
pub fn walk_forward_folds(n_samples: usize, n_folds: usize) -> Vec<Fold> {
    if n_folds == 0 {
        return Vec::new();
    }
    let test_size = n_samples / (n_folds + 1);
    if test_size == 0 {
        return Vec::new();
    }

    (0..n_folds)
        .filter_map(|i| {
            let test_start = (i + 1) * test_size;
            let test_end = if i == n_folds - 1 { n_samples } else { test_start + test_size };
            (test_start < n_samples).then(|| Fold {
                train: 0..test_start,
                test: test_start..test_end,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct TrainingParams {
    pub learning_rate: f64,
    pub iterations: usize,
    pub l2: f64,
}

pub fn rows_to_matrix(rows: &[Vec<f64>]) -> DMatrix<f64> {
    let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
    DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j])
}

/// Standardise on `train`, fit, and return the model with its scaler.
pub fn fit_on(
    rows: &[Vec<f64>],
    labels: &[f64],
    train: Range<usize>,
    params: TrainingParams,
) -> Result<(LogisticRegression, Standardizer), AnalysisError> {
    let x = rows_to_matrix(&rows[train.clone()]);
    let y = DVector::from_column_slice(&labels[train]);
    let scaler = Standardizer::fit(&x);
    let mut model = LogisticRegression::new(params.learning_rate, params.iterations, params.l2);
    model.fit(&scaler.transform(&x), &y)?;
    Ok((model, scaler))
}

/// Accuracy of a fitted model on `range`.
pub fn evaluate(
    model: &LogisticRegression,
    scaler: &Standardizer,
    rows: &[Vec<f64>],
    labels: &[f64],
    range: Range<usize>,
) -> Result<f64, AnalysisError> {
    let x = scaler.transform(&rows_to_matrix(&rows[range.clone()]));
    let y = DVector::from_column_slice(&labels[range]);
    model.accuracy(&x, &y)
}

/// Out-of-sample accuracy per fold, in fold order. Folds train in parallel.
pub fn cross_validate(
    rows: &[Vec<f64>],
    labels: &[f64],
    folds: &[Fold],
    params: TrainingParams,
) -> Result<Vec<f64>, AnalysisError> {
    folds
        .par_iter()
        .map(|fold| {
            let (model, scaler) = fit_on(rows, labels, fold.train.clone(), params)?;
            evaluate(&model, &scaler, rows, labels, fold.test.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folds_move_forward() {
        let folds = walk_forward_folds(120, 5);
        assert_eq!(folds.len(), 5);
        assert_eq!(folds[0], Fold { train: 0..20, test: 20..40 });
        assert_eq!(folds[4].test, 100..120);
        for pair in folds.windows(2) {
            assert!(pair[1].test.start > pair[0].test.start);
            assert_eq!(pair[0].train.end, pair[0].test.start);
        }
    }

    #[test]
    fn test_last_fold_absorbs_remainder() {
        let folds = walk_forward_folds(125, 5);
        assert_eq!(folds[4].test, 100..125);
    }

    #[test]
    fn test_too_few_rows() {
        assert!(walk_forward_folds(3, 5).is_empty());
        assert!(walk_forward_folds(100, 0).is_empty());
    }

    #[test]
    fn test_cross_validate_learns_signal() {
        // Label is the sign of the first feature
        let rows: Vec<Vec<f64>> = (0..200)
            .map(|i| {
                let v = ((i * 37) % 101) as f64 / 50.0 - 1.0;
                vec![v, (i % 7) as f64]
            })
            .collect();
        let labels: Vec<f64> = rows.iter().map(|r| if r[0] > 0.0 { 1.0 } else { 0.0 }).collect();
        let params = TrainingParams {
            learning_rate: 0.1,
            iterations: 300,
            l2: 0.01,
        };
        let folds = walk_forward_folds(rows.len(), 5);
        let accuracies = cross_validate(&rows, &labels, &folds, params).unwrap();
        assert_eq!(accuracies.len(), 5);
        assert!(accuracies.iter().all(|a| *a > 0.85));

        // Parallel evaluation is order-stable
        assert_eq!(accuracies, cross_validate(&rows, &labels, &folds, params).unwrap());
    }
}
