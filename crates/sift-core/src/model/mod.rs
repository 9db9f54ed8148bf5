//! Embedding-provider acquisition and lifecycle

mod manager;
mod probe;
mod status;

pub use manager::{LifecycleEvent, ModelLifecycleManager};
pub use probe::probe_endpoint;
pub use status::ModelLoadState;
