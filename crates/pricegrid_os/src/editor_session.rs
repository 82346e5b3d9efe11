#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use pricegrid_engines::markup::{MarkupError, MarkupPolicy};
use pricegrid_engines::price_input::{coerce_price_input, PriceInputError};
use pricegrid_kernel_contracts::{Matrix, TierId};
use tracing::{debug, info, warn};

use crate::cell::{CellId, CellInput};
use crate::matrix_store::{reduce, EditorState, MatrixAction};
use crate::pricing_save::{PricingSaveEngine, SaveError};
use crate::table_view::{CellView, ControlsView, TableView, TierRowView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    ControlUnavailable { control: &'static str },
    CellDisabled { cell: String },
    UnknownCell { cell: String },
    SaveInFlight,
    InvalidPrice(PriceInputError),
    Markup(MarkupError),
    Save(SaveError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControlUnavailable { control } => write!(f, "{control} is not available"),
            Self::CellDisabled { cell } => write!(f, "cell {cell} is disabled"),
            Self::UnknownCell { cell } => write!(f, "unknown cell {cell}"),
            Self::SaveInFlight => write!(f, "a save is already in flight"),
            Self::InvalidPrice(err) => write!(f, "invalid price: {err}"),
            Self::Markup(err) => write!(f, "{err}"),
            Self::Save(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<PriceInputError> for SessionError {
    fn from(value: PriceInputError) -> Self {
        Self::InvalidPrice(value)
    }
}

impl From<MarkupError> for SessionError {
    fn from(value: MarkupError) -> Self {
        Self::Markup(value)
    }
}

/// The matrix captured when a save started. Handing it back to
/// [`EditorSession::finish_save`] closes the in-flight window.
#[derive(Debug)]
pub struct SaveTicket {
    matrix: Matrix,
}

impl SaveTicket {
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }
}

/// One editing session over the pricing table.
#[derive(Debug, Clone)]
pub struct EditorSession {
    state: EditorState,
    cells: BTreeMap<CellId, CellInput>,
    policy: MarkupPolicy,
    save_in_flight: bool,
    last_save_error: Option<SaveError>,
}

impl EditorSession {
    pub fn new(initial: Option<Matrix>) -> Self {
        Self::with_policy(initial, MarkupPolicy::fixed_v1())
    }

    pub fn with_policy(initial: Option<Matrix>, policy: MarkupPolicy) -> Self {
        let state = EditorState::seeded(initial);
        let cells = CellId::all()
            .map(|id| (id, CellInput::mount(state.working.price(id.plan, id.tier))))
            .collect();
        Self {
            state,
            cells,
            policy,
            save_in_flight: false,
            last_save_error: None,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        self.state.editing
    }

    pub fn is_save_in_flight(&self) -> bool {
        self.save_in_flight
    }

    pub fn last_save_error(&self) -> Option<&SaveError> {
        self.last_save_error.as_ref()
    }

    pub fn click_edit(&mut self) -> Result<(), SessionError> {
        if self.state.editing {
            return Err(SessionError::ControlUnavailable { control: "edit" });
        }
        self.dispatch(MatrixAction::SetEditing(true));
        Ok(())
    }

    pub fn click_cancel(&mut self) -> Result<(), SessionError> {
        self.require_idle_editing("cancel")?;
        debug!(
            discarded_changes = self.state.has_unsaved_changes(),
            "pricing edits cancelled"
        );
        self.dispatch(MatrixAction::restore_original());
        self.dispatch(MatrixAction::SetEditing(false));
        self.reset_cells();
        Ok(())
    }

    pub fn click_clear(&mut self) -> Result<(), SessionError> {
        self.require_idle_editing("clear")?;
        self.dispatch(MatrixAction::reset_to_empty());
        self.reset_cells();
        Ok(())
    }

    pub fn click_save<E>(&mut self, engine: &E) -> Result<(), SessionError>
    where
        E: PricingSaveEngine + ?Sized,
    {
        let ticket = self.begin_save()?;
        let result = engine.save(ticket.matrix());
        self.finish_save(ticket, result)
    }

    pub fn begin_save(&mut self) -> Result<SaveTicket, SessionError> {
        self.require_idle_editing("save")?;
        self.save_in_flight = true;
        self.last_save_error = None;
        debug!("pricing save started");
        Ok(SaveTicket {
            matrix: self.state.working,
        })
    }

    pub fn finish_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<Matrix, SaveError>,
    ) -> Result<(), SessionError> {
        self.save_in_flight = false;
        match result {
            Ok(echoed) => {
                if echoed != ticket.matrix {
                    warn!("pricing endpoint echoed a different matrix than submitted");
                }
                self.dispatch(MatrixAction::SetOriginal {
                    payload: Some(ticket.matrix),
                });
                self.dispatch(MatrixAction::SetEditing(false));
                self.reset_cells();
                info!("pricing saved");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "pricing save failed; edits kept");
                self.last_save_error = Some(err.clone());
                Err(SessionError::Save(err))
            }
        }
    }

    /// Handles raw text typed into a cell. Base-tier edits recompute the plan's
    /// sibling tiers through the markup policy.
    pub fn change_cell(&mut self, cell_id: &str, raw: &str) -> Result<(), SessionError> {
        let id = CellId::parse(cell_id).ok_or_else(|| SessionError::UnknownCell {
            cell: cell_id.to_string(),
        })?;
        if !self.state.editing {
            return Err(SessionError::CellDisabled {
                cell: cell_id.to_string(),
            });
        }
        if self.save_in_flight {
            return Err(SessionError::SaveInFlight);
        }
        let raw = match self.cells.get_mut(&id) {
            Some(cell) => cell.input(raw),
            None => raw,
        };

        let price = coerce_price_input(raw)?;
        let next = self
            .policy
            .apply_cell_edit(&self.state.working, id.plan, id.tier, price)?;
        if id.tier == TierId::BASE {
            debug!(cell = %id, %price, "base tier edit recomputed siblings");
        }
        self.dispatch(MatrixAction::replace_working(next));
        Ok(())
    }

    pub fn cell(&self, cell_id: &str) -> Option<CellView> {
        let id = CellId::parse(cell_id)?;
        Some(self.cell_view(id))
    }

    pub fn render(&self) -> TableView {
        let plans: Vec<_> = self.state.working.iter().map(|(plan, _)| plan).collect();
        let rows = TierId::ALL
            .into_iter()
            .map(|tier| TierRowView {
                tier: tier.as_str(),
                cells: plans
                    .iter()
                    .map(|plan| self.cell_view(CellId::new(*plan, tier)))
                    .collect(),
            })
            .collect();
        TableView {
            plans: plans.iter().map(|p| p.as_str()).collect(),
            rows,
            controls: ControlsView::for_state(self.state.editing, self.save_in_flight),
            save_error: self.last_save_error.as_ref().map(|e| e.to_string()),
        }
    }

    fn cell_view(&self, id: CellId) -> CellView {
        let value = match self.cells.get(&id) {
            Some(cell) => cell.display().to_string(),
            None => self.state.working.price(id.plan, id.tier).to_string(),
        };
        CellView {
            id: id.to_string(),
            value,
            disabled: !self.state.editing,
        }
    }

    fn require_idle_editing(&self, control: &'static str) -> Result<(), SessionError> {
        if !self.state.editing {
            return Err(SessionError::ControlUnavailable { control });
        }
        if self.save_in_flight {
            return Err(SessionError::SaveInFlight);
        }
        Ok(())
    }

    fn dispatch(&mut self, action: MatrixAction) {
        self.state = reduce(self.state, action);
        let working = self.state.working;
        for (id, cell) in self.cells.iter_mut() {
            cell.sync_external(working.price(id.plan, id.tier));
        }
    }

    fn reset_cells(&mut self) {
        let working = self.state.working;
        for (id, cell) in self.cells.iter_mut() {
            cell.reset(working.price(id.plan, id.tier));
        }
    }
}
