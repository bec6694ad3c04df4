pub mod aggregation;
pub mod config;
pub mod error;
pub mod forecast;
pub mod pipeline;
pub mod records;
pub mod time_value;
pub mod types;

#[cfg(feature = "summary")]
pub mod analysis;

#[cfg(feature = "narrative")]
pub mod narrative;

pub use config::PipelineConfig;
pub use error::PnlError;
pub use pipeline::{run_pipeline, PipelineInput, PipelineOutput};
pub use types::*;

/// Standard result type for all pipeline operations
pub type PnlResult<T> = Result<T, PnlError>;
