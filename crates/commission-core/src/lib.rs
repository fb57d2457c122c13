pub mod basis;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod rules;
pub mod types;

pub use error::CommissionError;
pub use types::*;

/// Standard result type for all commission-engine operations
pub type CommissionResult<T> = Result<T, CommissionError>;
