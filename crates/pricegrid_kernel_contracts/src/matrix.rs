#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{ContractViolation, Validate};

/// Subscription plan columns, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlanId {
    Months36,
    Months24,
    Months12,
    Mtm,
}

impl PlanId {
    pub const ALL: [PlanId; 4] = [
        PlanId::Months36,
        PlanId::Months24,
        PlanId::Months12,
        PlanId::Mtm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlanId::Months36 => "36months",
            PlanId::Months24 => "24months",
            PlanId::Months12 => "12months",
            PlanId::Mtm => "mtm",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        PlanId::ALL.into_iter().find(|p| p.as_str() == raw)
    }

    fn index(self) -> usize {
        self as usize
    }

    fn field(self) -> &'static str {
        match self {
            PlanId::Months36 => "matrix.36months",
            PlanId::Months24 => "matrix.24months",
            PlanId::Months12 => "matrix.12months",
            PlanId::Mtm => "matrix.mtm",
        }
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mileage tier rows. `Lite` is the base tier that drives the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TierId {
    Lite,
    Standard,
    Unlimited,
}

impl TierId {
    pub const ALL: [TierId; 3] = [TierId::Lite, TierId::Standard, TierId::Unlimited];
    pub const BASE: TierId = TierId::Lite;

    pub fn as_str(self) -> &'static str {
        match self {
            TierId::Lite => "lite",
            TierId::Standard => "standard",
            TierId::Unlimited => "unlimited",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        TierId::ALL.into_iter().find(|t| t.as_str() == raw)
    }

    pub fn is_base(self) -> bool {
        self == TierId::BASE
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn cell_field(plan: PlanId, tier: TierId) -> &'static str {
    match (plan, tier) {
        (PlanId::Months36, TierId::Lite) => "matrix.36months.lite",
        (PlanId::Months36, TierId::Standard) => "matrix.36months.standard",
        (PlanId::Months36, TierId::Unlimited) => "matrix.36months.unlimited",
        (PlanId::Months24, TierId::Lite) => "matrix.24months.lite",
        (PlanId::Months24, TierId::Standard) => "matrix.24months.standard",
        (PlanId::Months24, TierId::Unlimited) => "matrix.24months.unlimited",
        (PlanId::Months12, TierId::Lite) => "matrix.12months.lite",
        (PlanId::Months12, TierId::Standard) => "matrix.12months.standard",
        (PlanId::Months12, TierId::Unlimited) => "matrix.12months.unlimited",
        (PlanId::Mtm, TierId::Lite) => "matrix.mtm.lite",
        (PlanId::Mtm, TierId::Standard) => "matrix.mtm.standard",
        (PlanId::Mtm, TierId::Unlimited) => "matrix.mtm.unlimited",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    pub fn v1(value: Decimal) -> Result<Self, ContractViolation> {
        let p = Self(value.normalize());
        p.validate()?;
        Ok(p)
    }

    /// Parses a decimal in plain (`2592.8`) or scientific (`2.5928e3`) notation.
    pub fn parse_decimal(raw: &str) -> Option<Decimal> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok()
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn checked_scale(self, factor: Decimal) -> Option<Price> {
        self.0
            .checked_mul(factor)
            .and_then(|v| Price::v1(v).ok())
    }
}

impl Validate for Price {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 < Decimal::ZERO {
            return Err(ContractViolation::InvalidValue {
                field: "price",
                reason: "must be >= 0",
            });
        }
        if !survives_json_number(self.0) {
            return Err(ContractViolation::InvalidValue {
                field: "price",
                reason: "must be exactly representable as a JSON number",
            });
        }
        Ok(())
    }
}

enum WireNumber {
    Whole(u64),
    Float(f64),
}

fn wire_number(value: Decimal) -> Option<WireNumber> {
    let v = value.normalize();
    if v.scale() == 0 {
        if let Some(whole) = v.to_u64() {
            return Some(WireNumber::Whole(whole));
        }
    }
    v.to_f64().filter(|f| f.is_finite()).map(WireNumber::Float)
}

/// True when writing `value` as a JSON number and reading it back yields the same value.
fn survives_json_number(value: Decimal) -> bool {
    match wire_number(value) {
        Some(WireNumber::Whole(_)) => true,
        Some(WireNumber::Float(f)) => Price::parse_decimal(&f.to_string()) == Some(value),
        None => false,
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match wire_number(self.0) {
            Some(WireNumber::Whole(whole)) => serializer.serialize_u64(whole),
            Some(WireNumber::Float(float)) => serializer.serialize_f64(float),
            None => Err(S::Error::custom("price is not representable as a JSON number")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlanRow {
    prices: [Price; 3],
}

impl PlanRow {
    pub const ZERO: PlanRow = PlanRow {
        prices: [Price::ZERO; 3],
    };

    pub fn v1(lite: Price, standard: Price, unlimited: Price) -> Result<Self, ContractViolation> {
        let r = Self {
            prices: [lite, standard, unlimited],
        };
        r.validate()?;
        Ok(r)
    }

    pub fn price(&self, tier: TierId) -> Price {
        self.prices[tier.index()]
    }

    pub fn with_price(mut self, tier: TierId, price: Price) -> Self {
        self.prices[tier.index()] = price;
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (TierId, Price)> + '_ {
        TierId::ALL.into_iter().map(|t| (t, self.price(t)))
    }
}

impl Validate for PlanRow {
    fn validate(&self) -> Result<(), ContractViolation> {
        for price in &self.prices {
            price.validate()?;
        }
        Ok(())
    }
}

impl Serialize for PlanRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(TierId::ALL.len()))?;
        for (tier, price) in self.iter() {
            map.serialize_entry(tier.as_str(), &price)?;
        }
        map.end()
    }
}

/// The full price grid. Every plan and every tier is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Matrix {
    rows: [PlanRow; 4],
}

pub const EMPTY_MATRIX: Matrix = Matrix {
    rows: [PlanRow::ZERO; 4],
};

impl Matrix {
    pub fn from_rows(rows: [(PlanId, PlanRow); 4]) -> Result<Self, ContractViolation> {
        let mut m = EMPTY_MATRIX;
        let mut seen = [false; 4];
        for (plan, row) in rows {
            if seen[plan.index()] {
                return Err(ContractViolation::InvalidValue {
                    field: plan.field(),
                    reason: "must appear exactly once",
                });
            }
            seen[plan.index()] = true;
            m.rows[plan.index()] = row;
        }
        m.validate()?;
        Ok(m)
    }

    pub fn row(&self, plan: PlanId) -> PlanRow {
        self.rows[plan.index()]
    }

    pub fn price(&self, plan: PlanId, tier: TierId) -> Price {
        self.row(plan).price(tier)
    }

    pub fn with_row(mut self, plan: PlanId, row: PlanRow) -> Self {
        self.rows[plan.index()] = row;
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlanId, PlanRow)> + '_ {
        PlanId::ALL.into_iter().map(|p| (p, self.row(p)))
    }

    pub fn is_empty_template(&self) -> bool {
        *self == EMPTY_MATRIX
    }

    /// Parses the wire shape: every plan key with exactly the three tier keys.
    /// Prices may be JSON numbers or numeric strings.
    pub fn from_json_value(value: &Value) -> Result<Self, ContractViolation> {
        let obj = value.as_object().ok_or(ContractViolation::InvalidValue {
            field: "matrix",
            reason: "must be an object",
        })?;
        reject_unknown_keys(obj, "matrix", |k| PlanId::parse(k).is_some())?;

        let mut m = EMPTY_MATRIX;
        for plan in PlanId::ALL {
            let raw_row = obj
                .get(plan.as_str())
                .ok_or(ContractViolation::MissingField { field: plan.field() })?;
            m.rows[plan.index()] = parse_row(plan, raw_row)?;
        }
        m.validate()?;
        Ok(m)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ContractViolation> {
        let value: Value = serde_json::from_str(raw).map_err(|_| ContractViolation::InvalidValue {
            field: "matrix",
            reason: "must be a JSON document",
        })?;
        Self::from_json_value(&value)
    }
}

impl Validate for Matrix {
    fn validate(&self) -> Result<(), ContractViolation> {
        for (plan, row) in self.iter() {
            for (tier, price) in row.iter() {
                price
                    .validate()
                    .map_err(|v| at_field(cell_field(plan, tier), v))?;
            }
        }
        Ok(())
    }
}

impl Serialize for Matrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(PlanId::ALL.len()))?;
        for (plan, row) in self.iter() {
            map.serialize_entry(plan.as_str(), &row)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Matrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Matrix::from_json_value(&value).map_err(D::Error::custom)
    }
}

fn reject_unknown_keys(
    obj: &Map<String, Value>,
    parent: &'static str,
    known: impl Fn(&str) -> bool,
) -> Result<(), ContractViolation> {
    match obj.keys().find(|k| !known(k)) {
        Some(key) => Err(ContractViolation::UnknownField {
            parent,
            key: key.clone(),
        }),
        None => Ok(()),
    }
}

fn parse_row(plan: PlanId, value: &Value) -> Result<PlanRow, ContractViolation> {
    let obj = value.as_object().ok_or(ContractViolation::InvalidValue {
        field: plan.field(),
        reason: "must be an object",
    })?;
    reject_unknown_keys(obj, plan.field(), |k| TierId::parse(k).is_some())?;

    let mut row = PlanRow::ZERO;
    for tier in TierId::ALL {
        let field = cell_field(plan, tier);
        let raw = obj
            .get(tier.as_str())
            .ok_or(ContractViolation::MissingField { field })?;
        row.prices[tier.index()] = parse_price(field, raw)?;
    }
    Ok(row)
}

fn parse_price(field: &'static str, value: &Value) -> Result<Price, ContractViolation> {
    let decimal = match value {
        Value::Number(n) => Price::parse_decimal(&n.to_string()),
        Value::String(s) => Price::parse_decimal(s),
        _ => {
            return Err(ContractViolation::InvalidValue {
                field,
                reason: "must be a number",
            })
        }
    }
    .ok_or(ContractViolation::InvalidValue {
        field,
        reason: "must be a representable decimal number",
    })?;
    Price::v1(decimal).map_err(|v| at_field(field, v))
}

fn at_field(field: &'static str, violation: ContractViolation) -> ContractViolation {
    match violation {
        ContractViolation::InvalidValue { reason, .. } => {
            ContractViolation::InvalidValue { field, reason }
        }
        other => other,
    }
}
