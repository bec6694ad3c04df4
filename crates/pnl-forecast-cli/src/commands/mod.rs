pub mod npv;
pub mod pipeline;
