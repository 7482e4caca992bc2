/// Categorical cross-entropy over a probability vector.
pub struct CrossEntropyLoss;

/// Keeps log() finite for zero probabilities.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// L = -sum(expected[i] * ln(predicted[i] + eps))
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        predicted
            .iter()
            .zip(expected)
            .map(|(p, e)| -e * (p + EPS).ln())
            .sum()
    }

    /// Gradient with respect to the probabilities.
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted
            .iter()
            .zip(expected)
            .map(|(p, e)| -e / (p + EPS))
            .collect()
    }

    /// Gradient with respect to the logits when `predicted` came out of a
    /// softmax and `expected` sums to one: `predicted - expected`.
    pub fn softmax_logit_gradient(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected).map(|(p, e)| p - e).collect()
    }
}
