#![forbid(unsafe_code)]

pub mod markup;
pub mod price_input;
