use crate::data::DataSource;
use crate::error::Result;
use crate::model::{GradMode, Model, ModelMode};
use crate::tracking::LossTracker;

/// Runs `model` in eval mode over one full pass of `data` with gradients
/// disabled and returns the rounded mean batch loss.
///
/// The tracker (a fresh one when `None`) is finalized with
/// `on_epoch_end(true)` before returning. A failing forward pass aborts the
/// evaluation.
pub fn evaluate<M: Model>(
    model: &mut M,
    data: &mut dyn DataSource<Batch = M::Batch>,
    tracker: Option<&mut LossTracker>,
) -> Result<f64> {
    model.set_mode(ModelMode::Eval);
    let mut fresh = LossTracker::new();
    let tracker = tracker.unwrap_or(&mut fresh);

    for batch in data.batches() {
        let output = model.forward(&batch, GradMode::Disabled)?;
        tracker.update(output.loss);
    }

    let loss = tracker.loss();
    tracker.on_epoch_end(true);
    Ok(loss)
}
