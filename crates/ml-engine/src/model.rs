//! L2-regularised logistic regression trained by full-batch gradient descent.
//!
//! Weights start at zero and the update is deterministic, so identical inputs
//! always produce identical models.

use analysis_core::AnalysisError;
use nalgebra::{DMatrix, DVector};

/// Column-wise z-score scaling fitted on training rows only.
#[derive(Debug, Clone)]
pub struct Standardizer {
    mean: DVector<f64>,
    std: DVector<f64>,
}

impl Standardizer {
    pub fn fit(x: &DMatrix<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mean = DVector::from_iterator(x.ncols(), x.column_iter().map(|c| c.sum() / n));
        let std = DVector::from_iterator(
            x.ncols(),
            x.column_iter().zip(mean.iter()).map(|(c, m)| {
                let var = c.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
                // Constant columns (unused one-hot slots) pass through unscaled
                if var > 1e-12 { var.sqrt() } else { 1.0 }
            }),
        );
        Self { mean, std }
    }

    pub fn transform(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| (x[(i, j)] - self.mean[j]) / self.std[j])
    }

    pub fn transform_row(&self, row: &[f64]) -> DVector<f64> {
        DVector::from_iterator(row.len(), row.iter().enumerate().map(|(j, v)| (v - self.mean[j]) / self.std[j]))
    }
}

/// Sigmoid activation function
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let exp_z = z.exp();
        exp_z / (1.0 + exp_z)
    }
}

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    learning_rate: f64,
    iterations: usize,
    l2: f64,
    weights: Option<DVector<f64>>,
    bias: f64,
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, iterations: usize, l2: f64) -> Self {
        Self {
            learning_rate,
            iterations,
            l2,
            weights: None,
            bias: 0.0,
        }
    }

    pub fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), AnalysisError> {
        if x.nrows() != y.len() {
            return Err(AnalysisError::CalculationError(format!(
                "feature rows ({}) and labels ({}) differ",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(AnalysisError::InsufficientData("no training rows".to_string()));
        }

        let n = x.nrows() as f64;
        let mut weights = DVector::<f64>::zeros(x.ncols());
        let mut bias = 0.0;

        for _ in 0..self.iterations {
            let linear = x * &weights;
            let errors = DVector::from_iterator(
                y.len(),
                linear.iter().zip(y.iter()).map(|(z, target)| sigmoid(z + bias) - target),
            );

            let dw = x.transpose() * &errors / n + &weights * self.l2;
            let db = errors.sum() / n;

            weights -= dw * self.learning_rate;
            bias -= db * self.learning_rate;
        }

        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(AnalysisError::CalculationError(
                "logistic regression diverged".to_string(),
            ));
        }

        self.weights = Some(weights);
        self.bias = bias;
        Ok(())
    }

    fn weights(&self) -> Result<&DVector<f64>, AnalysisError> {
        self.weights
            .as_ref()
            .ok_or_else(|| AnalysisError::CalculationError("model has not been fitted".to_string()))
    }

    /// Class-1 probability for each row.
    pub fn predict_proba(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, AnalysisError> {
        let weights = self.weights()?;
        Ok((x * weights).map(|z| sigmoid(z + self.bias)))
    }

    pub fn predict_proba_row(&self, row: &DVector<f64>) -> Result<f64, AnalysisError> {
        let weights = self.weights()?;
        Ok(sigmoid(weights.dot(row) + self.bias))
    }

    /// Share of rows whose 0.5-thresholded prediction matches the label.
    pub fn accuracy(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<f64, AnalysisError> {
        if y.is_empty() {
            return Ok(0.5);
        }
        let probs = self.predict_proba(x)?;
        let correct = probs
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (**p >= 0.5) == (**t >= 0.5))
            .count();
        Ok(correct as f64 / y.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (DMatrix<f64>, DVector<f64>) {
        let xs: Vec<f64> = (0..40).map(|i| i as f64 / 4.0 - 5.0).collect();
        let x = DMatrix::from_fn(40, 2, |i, j| if j == 0 { xs[i] } else { 1.0 });
        let y = DVector::from_iterator(40, xs.iter().map(|v| if *v > 0.0 { 1.0 } else { 0.0 }));
        (x, y)
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn test_fits_separable_data() {
        let (x, y) = separable();
        let scaler = Standardizer::fit(&x);
        let xs = scaler.transform(&x);
        let mut model = LogisticRegression::new(0.1, 400, 0.01);
        model.fit(&xs, &y).unwrap();
        assert!(model.accuracy(&xs, &y).unwrap() > 0.9);

        let high = model.predict_proba_row(&scaler.transform_row(&[4.0, 1.0])).unwrap();
        let low = model.predict_proba_row(&scaler.transform_row(&[-4.0, 1.0])).unwrap();
        assert!(high > 0.8);
        assert!(low < 0.2);
    }

    #[test]
    fn test_training_is_deterministic() {
        let (x, y) = separable();
        let mut a = LogisticRegression::new(0.1, 50, 0.01);
        let mut b = LogisticRegression::new(0.1, 50, 0.01);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_unfitted_model_errors() {
        let model = LogisticRegression::new(0.1, 10, 0.0);
        let err = model.predict_proba_row(&DVector::zeros(2)).unwrap_err();
        assert!(!err.is_soft());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut model = LogisticRegression::new(0.1, 10, 0.0);
        let x = DMatrix::<f64>::zeros(3, 2);
        let y = DVector::<f64>::zeros(2);
        assert!(matches!(model.fit(&x, &y), Err(AnalysisError::CalculationError(_))));
    }

    #[test]
    fn test_constant_column_passes_through() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 5.0, 2.0, 5.0, 3.0, 5.0]);
        let scaler = Standardizer::fit(&x);
        let t = scaler.transform(&x);
        assert_eq!(t[(0, 1)], 0.0);
        assert!((t[(0, 0)] + t[(2, 0)]).abs() < 1e-12);
    }
}
