use crate::types::WorkoutId;
use thiserror::Error;

/// Numeric form input that was rejected before a workout was built.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Inputs must be positive numbers ({field} = {value})")]
pub struct ValidationError {
    pub field: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid workout type: {0:?}")]
pub struct InvalidType(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("workout id {0} is already present")]
    DuplicateId(WorkoutId),
    #[error("workout id {0} not found")]
    NotFound(WorkoutId),
}

/// The persisted collection could not be rebuilt. Restore is all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("persisted workouts are corrupt: {0}")]
pub struct CorruptPersistedState(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Could not get your position")]
pub struct GeolocationUnavailable;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidType(#[from] InvalidType),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("click on the map to choose a location first")]
    NoPendingLocation,
    #[error("no workout is being edited")]
    NotEditing,
    #[error("finish or cancel the current edit first")]
    EditInProgress,
    #[error("the map is not available")]
    MapUnavailable,
}

impl ControllerError {
    /// Errors that keep the form open so the user can correct the input.
    pub const fn is_input_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidType(_))
    }
}
