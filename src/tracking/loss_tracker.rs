use crate::error::{Result, TrainError};

const DEFAULT_NDIGITS: u32 = 4;

/// Incremental running mean of scalar loss values, plus a per-epoch history.
///
/// One tracker is kept per loss stream (training, validation). `update` is
/// called once per processed batch; `on_epoch_end` is called exactly once per
/// epoch boundary and appends the rounded mean to `history`.
///
/// Non-finite values are folded into the mean unchanged. Use `try_update`
/// when they should be rejected instead.
#[derive(Debug, Clone)]
pub struct LossTracker {
    ndigits: u32,
    running_mean: f64,
    count: u64,
    history: Vec<f64>,
}

impl LossTracker {
    pub fn new() -> Self {
        Self::with_ndigits(DEFAULT_NDIGITS)
    }

    pub fn with_ndigits(ndigits: u32) -> Self {
        LossTracker {
            ndigits,
            running_mean: 0.0,
            count: 0,
            history: Vec::new(),
        }
    }

    /// Folds one loss value into the running mean:
    ///   mean' = (mean * count + value) / (count + 1)
    pub fn update(&mut self, value: f64) {
        let count = self.count as f64;
        self.running_mean = (self.running_mean * count + value) / (count + 1.0);
        self.count += 1;
    }

    /// Same as `update`, but refuses NaN and infinities.
    pub fn try_update(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(TrainError::NonFiniteLoss(value));
        }
        self.update(value);
        Ok(())
    }

    /// Running mean rounded to `ndigits` decimal digits; 0.0 before any update.
    pub fn loss(&self) -> f64 {
        round_to(self.running_mean, self.ndigits)
    }

    pub fn reset(&mut self) {
        self.running_mean = 0.0;
        self.count = 0;
    }

    pub fn on_epoch_end(&mut self, reset: bool) {
        self.history.push(self.loss());
        if reset {
            self.reset();
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn ndigits(&self) -> u32 {
        self.ndigits
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }
}

impl Default for LossTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Rounds the exact binary value to `ndigits` decimals, ties to even.
/// Float formatting already rounds that way, so the formatted text is parsed back.
fn round_to(value: f64, ndigits: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.*}", ndigits as usize, value).parse().unwrap_or(value)
}
