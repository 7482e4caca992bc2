use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::SavePretrained;

pub const METADATA_FILE: &str = "metadata.json";

/// Annotations saved next to the weights in every checkpoint.
///
/// All fields are optional so older checkpoints deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelMetadata {
    pub description: Option<String>,
    /// Names of the input features, in input order.
    pub feature_names: Option<Vec<String>>,
    /// Human-readable labels for the output units (e.g. ["0", "1", ..., "9"]).
    pub output_labels: Option<Vec<String>>,
}

impl ModelMetadata {
    pub fn load(dir: &Path) -> Result<ModelMetadata> {
        let reader = BufReader::new(File::open(dir.join(METADATA_FILE))?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl SavePretrained for ModelMetadata {
    fn save_pretrained(&self, dir: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(dir.join(METADATA_FILE))?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_and_loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = ModelMetadata {
            description: Some("xor".into()),
            feature_names: None,
            output_labels: Some(vec!["false".into(), "true".into()]),
        };
        metadata.save_pretrained(dir.path()).unwrap();
        assert!(dir.path().join(METADATA_FILE).is_file());
        assert_eq!(ModelMetadata::load(dir.path()).unwrap(), metadata);
    }

    #[test]
    fn missing_fields_default_to_none() {
        let metadata: ModelMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(metadata, ModelMetadata::default());
    }
}
