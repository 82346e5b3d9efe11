#![forbid(unsafe_code)]

use std::fmt;

use pricegrid_kernel_contracts::Price;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceInputError {
    NotNumeric { raw: String },
    Negative { raw: String },
    /// Parses, but would not survive being written as a JSON number.
    NotRepresentable { raw: String },
}

impl fmt::Display for PriceInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceInputError::NotNumeric { raw } => write!(f, "'{raw}' is not a number"),
            PriceInputError::Negative { raw } => write!(f, "'{raw}' is below zero"),
            PriceInputError::NotRepresentable { raw } => {
                write!(f, "'{raw}' has more precision than a stored price can hold")
            }
        }
    }
}

impl std::error::Error for PriceInputError {}

/// Turns raw cell text into a price. Blank input counts as zero; anything that is
/// not a non-negative decimal is rejected.
pub fn coerce_price_input(raw: &str) -> Result<Price, PriceInputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Price::ZERO);
    }
    let value = Price::parse_decimal(trimmed).ok_or_else(|| PriceInputError::NotNumeric {
        raw: raw.to_string(),
    })?;
    if value < Decimal::ZERO {
        return Err(PriceInputError::Negative {
            raw: raw.to_string(),
        });
    }
    Price::v1(value).map_err(|_| PriceInputError::NotRepresentable {
        raw: raw.to_string(),
    })
}
