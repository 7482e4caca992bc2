use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::activation::activation::ActivationFunction;
use crate::data::Batch;
use crate::error::{Result, TrainError};
use crate::layers::dense::{Layer, LayerTrace};
use crate::loss::{CrossEntropyLoss, LossType};
use crate::model::{GradMode, Model, ModelMode, ModelOutput, Parameter, SavePretrained};

pub const MODEL_FILE: &str = "model.json";

/// Dense feed-forward network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub loss: LossType,
    #[serde(skip)]
    mode: ModelMode,
    /// Per-sample layer traces and targets from the last gradient-enabled forward.
    #[serde(skip)]
    pending: Vec<(Vec<LayerTrace>, Vec<f64>)>,
}

impl Network {
    /// Builds a network from (size, input_size, activation) tuples.
    pub fn new(layer_specs: Vec<(usize, usize, ActivationFunction)>, loss: LossType, seed: u64) -> Network {
        let mut rng = StdRng::seed_from_u64(seed);
        let layers = layer_specs
            .into_iter()
            .map(|(size, input_size, activation)| Layer::new(size, input_size, activation, &mut rng))
            .collect();
        Network {
            layers,
            loss,
            mode: ModelMode::Train,
            pending: Vec::new(),
        }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size)
    }

    /// Inference on a single input.
    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.check_input(input)?;
        Ok(self.trace(input).pop().map(|t| t.a).unwrap_or_default())
    }

    pub fn load_pretrained(dir: &Path) -> Result<Network> {
        let reader = BufReader::new(File::open(dir.join(MODEL_FILE))?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn trace(&self, input: &[f64]) -> Vec<LayerTrace> {
        let mut traces: Vec<LayerTrace> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let trace = match traces.last() {
                Some(prev) => layer.forward(&prev.a),
                None => layer.forward(input),
            };
            traces.push(trace);
        }
        traces
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        if input.len() != self.input_size() {
            return Err(TrainError::model(format!(
                "expected {} input features, got {}",
                self.input_size(),
                input.len()
            )));
        }
        Ok(())
    }

    /// Gradient of the loss with respect to the output layer's `z`.
    fn output_delta(&self, output: &LayerTrace, target: &[f64]) -> Vec<f64> {
        let activation = self.layers.last().map(|l| l.activation);
        if self.loss == LossType::CrossEntropy && activation == Some(ActivationFunction::Softmax) {
            return CrossEntropyLoss::softmax_logit_gradient(&output.a, target);
        }
        let grad_a = self.loss.derivative(&output.a, target);
        match activation {
            Some(act) => act.backprop(&output.z, &output.a, &grad_a),
            None => grad_a,
        }
    }
}

impl SavePretrained for Network {
    fn save_pretrained(&self, dir: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(dir.join(MODEL_FILE))?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

impl Model for Network {
    type Batch = Batch;

    fn set_mode(&mut self, mode: ModelMode) {
        self.mode = mode;
    }

    fn mode(&self) -> ModelMode {
        self.mode
    }

    /// Mean per-sample loss over the batch.
    fn forward(&mut self, batch: &Batch, grad: GradMode) -> Result<ModelOutput> {
        self.pending.clear();
        if batch.is_empty() {
            return Err(TrainError::model("empty batch"));
        }
        if batch.targets.len() != batch.inputs.len() {
            return Err(TrainError::model(format!(
                "batch has {} inputs but {} targets",
                batch.inputs.len(),
                batch.targets.len()
            )));
        }

        let mut total = 0.0;
        for (input, target) in batch.inputs.iter().zip(&batch.targets) {
            self.check_input(input)?;
            if target.len() != self.output_size() {
                return Err(TrainError::model(format!(
                    "expected {} target values, got {}",
                    self.output_size(),
                    target.len()
                )));
            }
            let traces = self.trace(input);
            if let Some(output) = traces.last() {
                total += self.loss.loss(&output.a, target);
            }
            if grad == GradMode::Enabled {
                self.pending.push((traces, target.clone()));
            }
        }

        Ok(ModelOutput {
            loss: total / batch.len() as f64,
            batch_size: batch.len(),
        })
    }

    fn backward(&mut self, loss_scale: f64) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Err(TrainError::model("backward called without a gradient-enabled forward pass"));
        }
        let scale = loss_scale / pending.len() as f64;

        for (traces, target) in &pending {
            let Some(output) = traces.last() else { continue };
            let mut dz = self.output_delta(output, target);
            for i in (0..self.layers.len()).rev() {
                let dx = self.layers[i].accumulate_gradients(&traces[i], &dz, scale);
                if i > 0 {
                    let below = &traces[i - 1];
                    dz = self.layers[i - 1].activation.backprop(&below.z, &below.a, &dx);
                }
            }
        }
        Ok(())
    }

    fn parameters(&mut self) -> Vec<Parameter<'_>> {
        self.layers
            .iter_mut()
            .enumerate()
            .flat_map(|(i, layer)| layer.parameters(i))
            .collect()
    }
}
