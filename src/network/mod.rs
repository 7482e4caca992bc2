pub mod metadata;
pub mod network;
pub mod spec;

pub use metadata::ModelMetadata;
pub use network::Network;
pub use spec::{LayerSpec, NetworkSpec};
