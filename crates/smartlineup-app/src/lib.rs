// smartlineup application layer: command pipelines over the core, scoring
// and optimizer crates, plus log setup.

pub mod logging;
pub mod pipeline;
