#![forbid(unsafe_code)]

use pricegrid_kernel_contracts::{PlanId, TierId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellView {
    pub id: String,
    pub value: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierRowView {
    pub tier: &'static str,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct ControlsView {
    pub edit_visible: bool,
    pub save_visible: bool,
    pub save_enabled: bool,
    pub cancel_visible: bool,
    pub clear_visible: bool,
}

impl ControlsView {
    pub fn for_state(editing: bool, save_in_flight: bool) -> Self {
        Self {
            edit_visible: !editing,
            save_visible: editing,
            save_enabled: editing && !save_in_flight,
            cancel_visible: editing,
            clear_visible: editing,
        }
    }
}

/// One rendered frame of the pricing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub plans: Vec<&'static str>,
    pub rows: Vec<TierRowView>,
    pub controls: ControlsView,
    pub save_error: Option<String>,
}

impl TableView {
    pub fn cell(&self, id: &str) -> Option<&CellView> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .find(|cell| cell.id == id)
    }

    pub fn cells(&self) -> impl Iterator<Item = &CellView> {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }

    pub fn plan_ids(&self) -> Vec<PlanId> {
        self.plans.iter().filter_map(|p| PlanId::parse(p)).collect()
    }

    pub fn tier_ids(&self) -> Vec<TierId> {
        self.rows.iter().filter_map(|r| TierId::parse(r.tier)).collect()
    }

    /// Plain-text rendering: header row of plans, then one line per tier.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{:<10}", ""));
        for plan in &self.plans {
            out.push_str(&format!("{plan:>12}"));
        }
        out.push('\n');
        for row in &self.rows {
            out.push_str(&format!("{:<10}", row.tier));
            for cell in &row.cells {
                out.push_str(&format!("{:>12}", cell.value));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_view_01_controls_follow_editing_flag() {
        let idle = ControlsView::for_state(false, false);
        assert!(idle.edit_visible);
        assert!(!idle.save_visible && !idle.cancel_visible && !idle.clear_visible);

        let editing = ControlsView::for_state(true, false);
        assert!(!editing.edit_visible);
        assert!(editing.save_visible && editing.save_enabled);
        assert!(editing.cancel_visible && editing.clear_visible);

        let saving = ControlsView::for_state(true, true);
        assert!(saving.save_visible);
        assert!(!saving.save_enabled);
    }
}
