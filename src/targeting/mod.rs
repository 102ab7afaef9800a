//! Target models and the boolean criteria built over them.
mod criterion;
mod data;
mod models;

pub use criterion::{Operand, Operator, TargetingCriterion};
pub use data::TargetingData;
pub use models::*;
