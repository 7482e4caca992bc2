//! Capabilities the training loop needs from a model.
//!
//! The loop never looks inside a model: it switches modes, runs forward and
//! backward passes, and hands parameters to an optimizer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelMode {
    #[default]
    Train,
    Eval,
}

/// Whether a forward pass should keep what `backward` needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradMode {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    /// Mean loss over the batch.
    pub loss: f64,
    pub batch_size: usize,
}

/// A trainable tensor view: values and the gradient buffer of the same length.
pub struct Parameter<'a> {
    pub name: String,
    pub value: &'a mut [f64],
    pub grad: &'a mut [f64],
}

impl Parameter<'_> {
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Writes an artifact directory that can be reloaded later (weights,
/// tokenizer files, feature schemas).
pub trait SavePretrained {
    fn save_pretrained(&self, dir: &Path) -> Result<()>;
}

pub trait Model: SavePretrained {
    type Batch;

    fn set_mode(&mut self, mode: ModelMode);

    fn mode(&self) -> ModelMode;

    /// Runs the batch through the model. With `GradMode::Enabled` the model
    /// keeps whatever the next `backward` call needs.
    fn forward(&mut self, batch: &Self::Batch, grad: GradMode) -> Result<ModelOutput>;

    /// Accumulates gradients of `loss_scale * loss` for the last
    /// gradient-enabled forward pass into the parameter gradient buffers.
    fn backward(&mut self, loss_scale: f64) -> Result<()>;

    fn parameters(&mut self) -> Vec<Parameter<'_>>;
}
