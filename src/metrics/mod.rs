pub mod record;
pub mod sink;

pub use record::Metrics;
pub use sink::{JsonlSink, MetricsSink, RecordingSink, TracingSink};
