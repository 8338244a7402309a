pub mod fps;
pub mod pipeline_metrics;

pub use fps::FpsTracker;
pub use pipeline_metrics::{PipelineMetrics, StageLatency};
