pub mod builtin;
pub mod csv;
pub mod in_memory;

pub use csv::{load_csv, parse_csv, LabelMode};
pub use in_memory::{FnSource, InMemoryDataSource};

use serde::{Deserialize, Serialize};

/// Something the training loop can iterate once per epoch.
pub trait DataSource {
    type Batch;

    /// Batches per epoch, if the source knows it up front.
    fn num_batches(&self) -> Option<usize>;

    /// Starts a new pass over the data.
    fn batches(&mut self) -> Box<dyn Iterator<Item = Self::Batch> + '_>;
}

/// One supervised example: an input vector and its target vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub input: Vec<f64>,
    pub target: Vec<f64>,
}

impl Sample {
    pub fn new(input: Vec<f64>, target: Vec<f64>) -> Self {
        Sample { input, target }
    }
}

/// A mini-batch for the reference network.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub inputs: Vec<Vec<f64>>,
    pub targets: Vec<Vec<f64>>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl<'a> FromIterator<&'a Sample> for Batch {
    fn from_iter<I: IntoIterator<Item = &'a Sample>>(iter: I) -> Self {
        let mut batch = Batch::default();
        for sample in iter {
            batch.inputs.push(sample.input.clone());
            batch.targets.push(sample.target.clone());
        }
        batch
    }
}

/// Splits off the last `val_split_pct` percent of `samples` as a validation set.
///
/// The percentage is capped at 50. Returns `(train, validation)`.
pub fn split_validation(mut samples: Vec<Sample>, val_split_pct: u8) -> (Vec<Sample>, Vec<Sample>) {
    let pct = val_split_pct.min(50) as usize;
    let val_n = (samples.len() * pct) / 100;
    let train_n = samples.len() - val_n;
    let validation = samples.split_off(train_n);
    (samples, validation)
}
