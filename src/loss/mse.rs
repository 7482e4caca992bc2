pub struct MseLoss;

impl MseLoss {
    /// Scalar MSE: mean((predicted - expected)^2)
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        let n = predicted.len() as f64;
        predicted
            .iter()
            .zip(expected)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            / n
    }

    /// dL/dp_i = 2 (p_i - y_i) / n
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        let n = predicted.len() as f64;
        predicted
            .iter()
            .zip(expected)
            .map(|(a, b)| 2.0 * (a - b) / n)
            .collect()
    }
}
