mod registry;
mod selectors;

pub use registry::{ModelRegistry, ModelSpec, DEFAULT_MODEL, DRYRUN_MODEL};
pub use selectors::{ModelSelection, ModelSelector};
