pub mod extraction;
pub mod normalize;
pub mod orchestrator;
pub mod postprocess;
pub mod processor;
pub mod structuring;
