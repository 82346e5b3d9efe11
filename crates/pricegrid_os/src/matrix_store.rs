#![forbid(unsafe_code)]

use pricegrid_kernel_contracts::{ContractViolation, Matrix, EMPTY_MATRIX};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorState {
    pub working: Matrix,
    pub original: Matrix,
    pub editing: bool,
}

impl EditorState {
    pub fn seeded(initial: Option<Matrix>) -> Self {
        let seed = initial.unwrap_or(EMPTY_MATRIX);
        Self {
            working: seed,
            original: seed,
            editing: false,
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.working != self.original
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::seeded(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixAction {
    /// `None` restores the last saved snapshot; `reset_to_empty` wins over any payload.
    ReplaceWorking {
        payload: Option<Matrix>,
        reset_to_empty: bool,
    },
    /// `None` resets the snapshot to the empty template.
    SetOriginal { payload: Option<Matrix> },
    SetEditing(bool),
}

impl MatrixAction {
    pub const SET_MATRIX: &'static str = "SET_MATRIX";
    pub const SET_ORIGINAL_MATRIX: &'static str = "SET_ORIGINAL_MATRIX";
    pub const SET_EDITABLE_STATE: &'static str = "SET_EDITABLE_STATE";

    pub fn restore_original() -> Self {
        Self::ReplaceWorking {
            payload: None,
            reset_to_empty: false,
        }
    }

    pub fn reset_to_empty() -> Self {
        Self::ReplaceWorking {
            payload: None,
            reset_to_empty: true,
        }
    }

    pub fn replace_working(matrix: Matrix) -> Self {
        Self::ReplaceWorking {
            payload: Some(matrix),
            reset_to_empty: false,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::ReplaceWorking { .. } => Self::SET_MATRIX,
            Self::SetOriginal { .. } => Self::SET_ORIGINAL_MATRIX,
            Self::SetEditing(_) => Self::SET_EDITABLE_STATE,
        }
    }

    /// Builds an action from its wire name. Unknown names yield `Ok(None)`.
    pub fn from_wire(
        kind: &str,
        payload: Option<&Value>,
        reset_to_empty: bool,
    ) -> Result<Option<Self>, ContractViolation> {
        let action = match kind {
            Self::SET_MATRIX => Self::ReplaceWorking {
                payload: parse_matrix_payload(payload)?,
                reset_to_empty,
            },
            Self::SET_ORIGINAL_MATRIX => Self::SetOriginal {
                payload: parse_matrix_payload(payload)?,
            },
            Self::SET_EDITABLE_STATE => match payload {
                None | Some(Value::Null) => Self::SetEditing(false),
                Some(Value::Bool(flag)) => Self::SetEditing(*flag),
                Some(_) => {
                    return Err(ContractViolation::InvalidValue {
                        field: "matrix_action.payload",
                        reason: "must be a boolean",
                    })
                }
            },
            _ => return Ok(None),
        };
        Ok(Some(action))
    }
}

fn parse_matrix_payload(payload: Option<&Value>) -> Result<Option<Matrix>, ContractViolation> {
    match payload {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Matrix::from_json_value(v).map(Some),
    }
}

pub fn reduce(state: EditorState, action: MatrixAction) -> EditorState {
    match action {
        MatrixAction::ReplaceWorking {
            payload,
            reset_to_empty,
        } => {
            let working = if reset_to_empty {
                EMPTY_MATRIX
            } else {
                payload.unwrap_or(state.original)
            };
            EditorState { working, ..state }
        }
        MatrixAction::SetOriginal { payload } => EditorState {
            original: payload.unwrap_or(EMPTY_MATRIX),
            ..state
        },
        MatrixAction::SetEditing(editing) => EditorState { editing, ..state },
    }
}

/// Applies a wire-level action; unknown action names leave the state untouched.
pub fn reduce_wire(
    state: EditorState,
    kind: &str,
    payload: Option<&Value>,
    reset_to_empty: bool,
) -> Result<EditorState, ContractViolation> {
    Ok(match MatrixAction::from_wire(kind, payload, reset_to_empty)? {
        Some(action) => reduce(state, action),
        None => state,
    })
}
