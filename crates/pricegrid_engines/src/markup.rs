#![forbid(unsafe_code)]

use std::fmt;

use pricegrid_kernel_contracts::{Matrix, PlanId, PlanRow, Price, TierId};
use rust_decimal::Decimal;

/// Multipliers applied to the base tier when it is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupPolicy {
    pub standard_factor: Decimal,
    pub unlimited_factor: Decimal,
}

impl MarkupPolicy {
    pub fn fixed_v1() -> Self {
        Self {
            standard_factor: Decimal::from(2u32),
            unlimited_factor: Decimal::from(3u32),
        }
    }

    pub fn factor(&self, tier: TierId) -> Decimal {
        match tier {
            TierId::Lite => Decimal::ONE,
            TierId::Standard => self.standard_factor,
            TierId::Unlimited => self.unlimited_factor,
        }
    }

    /// Rebuilds `row` after `tier` was set to `price`. A base-tier edit recomputes
    /// every sibling; any other edit overrides that single field.
    pub fn apply_tier_edit(
        &self,
        row: PlanRow,
        tier: TierId,
        price: Price,
    ) -> Result<PlanRow, MarkupError> {
        if !tier.is_base() {
            return Ok(row.with_price(tier, price));
        }
        let mut next = row;
        for t in TierId::ALL {
            let derived = price
                .checked_scale(self.factor(t))
                .ok_or(MarkupError::DerivedOutOfRange { tier: t })?;
            next = next.with_price(t, derived);
        }
        Ok(next)
    }

    pub fn apply_cell_edit(
        &self,
        matrix: &Matrix,
        plan: PlanId,
        tier: TierId,
        price: Price,
    ) -> Result<Matrix, MarkupError> {
        let row = self.apply_tier_edit(matrix.row(plan), tier, price)?;
        Ok(matrix.with_row(plan, row))
    }
}

impl Default for MarkupPolicy {
    fn default() -> Self {
        Self::fixed_v1()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupError {
    DerivedOutOfRange { tier: TierId },
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkupError::DerivedOutOfRange { tier } => {
                write!(f, "derived {tier} price is out of range")
            }
        }
    }
}

impl std::error::Error for MarkupError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pricegrid_kernel_contracts::EMPTY_MATRIX;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn price(raw: &str) -> Price {
        Price::v1(Decimal::from_str(raw).unwrap()).unwrap()
    }

    fn seed_row() -> PlanRow {
        PlanRow::v1(price("2592.8"), price("2981.72"), price("3889.2")).unwrap()
    }

    #[test]
    fn at_markup_01_base_edit_derives_siblings() {
        let row = MarkupPolicy::fixed_v1()
            .apply_tier_edit(seed_row(), TierId::Lite, price("3000"))
            .unwrap();
        assert_eq!(row.price(TierId::Lite).to_string(), "3000");
        assert_eq!(row.price(TierId::Standard).to_string(), "6000");
        assert_eq!(row.price(TierId::Unlimited).to_string(), "9000");
    }

    #[test]
    fn at_markup_02_non_base_edit_touches_one_field() {
        let policy = MarkupPolicy::fixed_v1();
        let row = policy
            .apply_tier_edit(seed_row(), TierId::Standard, price("1"))
            .unwrap();
        assert_eq!(row.price(TierId::Lite), price("2592.8"));
        assert_eq!(row.price(TierId::Standard), price("1"));
        assert_eq!(row.price(TierId::Unlimited), price("3889.2"));

        let row = policy
            .apply_tier_edit(seed_row(), TierId::Unlimited, price("7"))
            .unwrap();
        assert_eq!(row.price(TierId::Standard), price("2981.72"));
        assert_eq!(row.price(TierId::Unlimited), price("7"));
    }

    #[test]
    fn at_markup_03_cell_edit_leaves_other_plans_alone() {
        let matrix = EMPTY_MATRIX.with_row(PlanId::Mtm, seed_row());
        let out = MarkupPolicy::fixed_v1()
            .apply_cell_edit(&matrix, PlanId::Months36, TierId::Lite, price("10.5"))
            .unwrap();
        assert_eq!(out.price(PlanId::Months36, TierId::Standard), price("21"));
        assert_eq!(out.price(PlanId::Months36, TierId::Unlimited), price("31.5"));
        assert_eq!(out.row(PlanId::Mtm), seed_row());
        assert_eq!(out.row(PlanId::Months24), PlanRow::ZERO);
    }

    #[test]
    fn at_markup_04_decimal_arithmetic_is_exact() {
        let row = MarkupPolicy::fixed_v1()
            .apply_tier_edit(PlanRow::ZERO, TierId::Lite, price("0.1"))
            .unwrap();
        assert_eq!(row.price(TierId::Unlimited).to_string(), "0.3");
    }

    #[test]
    fn at_markup_05_overflowing_derivation_is_an_error() {
        let huge = Price::v1(Decimal::from(u64::MAX)).unwrap();
        let err = MarkupPolicy::fixed_v1()
            .apply_tier_edit(PlanRow::ZERO, TierId::Lite, huge)
            .unwrap_err();
        assert_eq!(
            err,
            MarkupError::DerivedOutOfRange {
                tier: TierId::Standard
            }
        );
    }

    proptest! {
        #[test]
        fn base_edit_always_yields_fixed_multiples(cents in 0i64..1_000_000_000) {
            let base = Price::v1(Decimal::new(cents, 2)).unwrap();
            let row = MarkupPolicy::fixed_v1()
                .apply_tier_edit(seed_row(), TierId::Lite, base)
                .unwrap();
            prop_assert_eq!(row.price(TierId::Lite), base);
            prop_assert_eq!(row.price(TierId::Standard).as_decimal(), base.as_decimal() * Decimal::from(2u32));
            prop_assert_eq!(row.price(TierId::Unlimited).as_decimal(), base.as_decimal() * Decimal::from(3u32));
        }

        #[test]
        fn sibling_edit_never_touches_base(cents in 0i64..1_000_000_000, top in any::<bool>()) {
            let tier = if top { TierId::Unlimited } else { TierId::Standard };
            let value = Price::v1(Decimal::new(cents, 2)).unwrap();
            let row = MarkupPolicy::fixed_v1()
                .apply_tier_edit(seed_row(), tier, value)
                .unwrap();
            prop_assert_eq!(row.price(TierId::Lite), seed_row().price(TierId::Lite));
            prop_assert_eq!(row.price(tier), value);
        }
    }
}
