#![forbid(unsafe_code)]

use std::fmt;

use pricegrid_kernel_contracts::{PlanId, Price, TierId};

/// Stable `<plan>.<tier>` identifier of one input cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId {
    pub plan: PlanId,
    pub tier: TierId,
}

impl CellId {
    pub fn new(plan: PlanId, tier: TierId) -> Self {
        Self { plan, tier }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (plan, tier) = raw.split_once('.')?;
        Some(Self {
            plan: PlanId::parse(plan)?,
            tier: TierId::parse(tier)?,
        })
    }

    /// Every cell, tier-major, matching the rendered row order.
    pub fn all() -> impl Iterator<Item = CellId> {
        TierId::ALL
            .into_iter()
            .flat_map(|tier| PlanId::ALL.into_iter().map(move |plan| CellId { plan, tier }))
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.plan, self.tier)
    }
}

/// Transient display text for one cell. It mirrors the bound price whenever that
/// price changes, and otherwise keeps whatever the user typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellInput {
    display: String,
    mirrored: Price,
}

impl CellInput {
    pub fn mount(value: Price) -> Self {
        Self {
            display: value.to_string(),
            mirrored: value,
        }
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn sync_external(&mut self, value: Price) {
        if value != self.mirrored {
            self.reset(value);
        }
    }

    pub fn reset(&mut self, value: Price) {
        self.mirrored = value;
        self.display = value.to_string();
    }

    /// Records raw user text and hands it back uninterpreted.
    pub fn input<'a>(&mut self, raw: &'a str) -> &'a str {
        self.display = raw.to_string();
        raw
    }
}
