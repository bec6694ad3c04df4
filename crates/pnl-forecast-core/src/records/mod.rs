pub mod loader;
pub mod metrics;
