pub mod growth;
pub mod quarterly;
