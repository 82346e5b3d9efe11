#![forbid(unsafe_code)]

pub mod common;
pub mod matrix;

pub use common::{ContractViolation, Validate};
pub use matrix::{Matrix, PlanId, PlanRow, Price, TierId, EMPTY_MATRIX};
