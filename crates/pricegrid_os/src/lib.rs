#![forbid(unsafe_code)]

pub mod cell;
pub mod editor_session;
pub mod matrix_store;
pub mod pricing_save;
pub mod table_view;

pub use cell::{CellId, CellInput};
pub use editor_session::{EditorSession, SaveTicket, SessionError};
pub use matrix_store::{reduce, EditorState, MatrixAction};
pub use pricing_save::{
    PricingSaveEngine, PricingSaveHttpConfig, PricingSaveRuntime, SaveError,
};
pub use table_view::{CellView, ControlsView, TableView, TierRowView};
