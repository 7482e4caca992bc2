use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Result, TrainError};
use crate::loss::loss_type::LossType;
use crate::network::metadata::ModelMetadata;
use crate::network::network::Network;

/// One dense layer of a `NetworkSpec`.
///
/// `input_size` must equal the previous layer's `size`, or the raw input
/// dimension for the first layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

/// Architecture, loss and metadata of a network, without weights.
///
/// Lives in the `[model]` section of a run config and can be stored on its
/// own before training starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    /// Input to output.
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub loss: LossType,
    #[serde(default)]
    pub metadata: Option<ModelMetadata>,
}

impl NetworkSpec {
    pub fn input_size(&self) -> Option<usize> {
        self.layers.first().map(|l| l.input_size)
    }

    pub fn output_size(&self) -> Option<usize> {
        self.layers.last().map(|l| l.size)
    }

    /// Every structural problem, one message each.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.layers.is_empty() {
            errors.push("model.layers must not be empty".to_string());
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.size == 0 || layer.input_size == 0 {
                errors.push(format!("model.layers[{i}] must have non-zero size and input_size"));
            }
            if let Some(prev) = i.checked_sub(1).map(|p| &self.layers[p]) {
                if prev.size != layer.input_size {
                    errors.push(format!(
                        "model.layers[{i}].input_size is {} but the previous layer has {} units",
                        layer.input_size, prev.size
                    ));
                }
            }
            if layer.activation == ActivationFunction::Softmax && i + 1 != self.layers.len() {
                errors.push(format!("model.layers[{i}]: softmax is only supported on the output layer"));
            }
        }
        errors
    }

    /// Builds a freshly initialized network. Weight init is seeded.
    pub fn build(&self, seed: u64) -> Result<Network> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(TrainError::validation(errors));
        }
        let layers = self
            .layers
            .iter()
            .map(|l| (l.size, l.input_size, l.activation))
            .collect();
        Ok(Network::new(layers, self.loss, seed))
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        std::io::Write::flush(&mut writer)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<NetworkSpec> {
        let reader = std::io::BufReader::new(std::fs::File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(size: usize, input_size: usize, activation: ActivationFunction) -> LayerSpec {
        LayerSpec {
            size,
            input_size,
            activation,
        }
    }

    fn spec(layers: Vec<LayerSpec>) -> NetworkSpec {
        NetworkSpec {
            name: "test".into(),
            layers,
            loss: LossType::Mse,
            metadata: None,
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn save_json_reports_write_failures() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        let spec = spec(vec![layer(1, 2, ActivationFunction::Identity)]);
        assert!(spec.save_json(full).is_err());
    }

    #[test]
    fn chained_sizes_build() {
        let spec = spec(vec![
            layer(4, 2, ActivationFunction::Tanh),
            layer(1, 4, ActivationFunction::Sigmoid),
        ]);
        assert!(spec.validate().is_empty());
        let net = spec.build(1).unwrap();
        assert_eq!(net.layers.len(), 2);
        assert_eq!((spec.input_size(), spec.output_size()), (Some(2), Some(1)));
    }

    #[test]
    fn validation_reports_every_problem() {
        let spec = spec(vec![
            layer(4, 2, ActivationFunction::Softmax),
            layer(1, 3, ActivationFunction::Sigmoid),
        ]);
        let errors = spec.validate();
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(matches!(spec.build(0), Err(TrainError::Validation(_))));
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        let spec = spec(vec![layer(1, 2, ActivationFunction::LeakyReLU { alpha: 0.01 })]);
        spec.save_json(&path).unwrap();
        assert_eq!(NetworkSpec::load_json(&path).unwrap(), spec);
    }
}
