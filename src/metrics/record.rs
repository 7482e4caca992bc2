use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// An ordered mapping from metric name to value.
///
/// Insertion order is preserved so that progress descriptions read in the
/// order the metrics were produced. Sinks must not depend on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    entries: Vec<(String, f64)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. A repeated name overwrites the earlier value in place.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| *value)
    }

    /// Returns a copy with every name rewritten to `{prefix}/{name}`.
    pub fn add_prefix(&self, prefix: &str) -> Metrics {
        Metrics {
            entries: self
                .entries
                .iter()
                .map(|(name, value)| (format!("{prefix}/{name}"), *value))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, f64)> for Metrics {
    fn from_iter<I: IntoIterator<Item = (N, f64)>>(iter: I) -> Self {
        let mut metrics = Metrics::new();
        for (name, value) in iter {
            metrics.insert(name, value);
        }
        metrics
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (name, value)) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_rewrites_every_name() {
        let metrics = Metrics::new().with("loss", 0.5).with("lr", 0.01);
        let prefixed = metrics.add_prefix("train");
        let names: Vec<&str> = prefixed.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["train/loss", "train/lr"]);
        assert_eq!(prefixed.get("train/loss"), Some(0.5));
        assert_eq!(metrics.get("loss"), Some(0.5));
    }

    #[test]
    fn repeated_name_overwrites_in_place() {
        let metrics = Metrics::new().with("a", 1.0).with("b", 2.0).with("a", 3.0);
        let collected: Vec<(&str, f64)> = metrics.iter().collect();
        assert_eq!(collected, vec![("a", 3.0), ("b", 2.0)]);
    }

    #[test]
    fn serializes_as_json_object() {
        let metrics: Metrics = [("loss", 1.5), ("lr", 0.25)].into_iter().collect();
        let json = serde_json::to_string(&metrics).unwrap();
        assert_eq!(json, r#"{"loss":1.5,"lr":0.25}"#);
    }
}
