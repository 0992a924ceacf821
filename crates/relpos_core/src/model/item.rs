//! Orderable item record.
//!
//! # Responsibility
//! - Define the record whose relative order is maintained inside a container.
//! - Validate position values before they reach storage.
//!
//! # Invariants
//! - A present `position` is always finite.
//! - Ties between items of one container are allowed at rest.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of an orderable item.
pub type ItemId = Uuid;

/// Scope key inside which positions are compared (project, board, list...).
pub type ContainerId = Uuid;

/// Validation errors for orderable items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemValidationError {
    /// Position is NaN or infinite.
    NonFinitePosition(f64),
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinitePosition(value) => {
                write!(f, "position must be a finite number, got {value}")
            }
        }
    }
}

impl Error for ItemValidationError {}

/// One record ordered relative to its siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderableItem {
    pub id: ItemId,
    pub container_id: ContainerId,
    /// `None` until the item is placed for the first time.
    pub position: Option<f64>,
}

impl OrderableItem {
    /// Creates an unplaced item with a generated id.
    pub fn new(container_id: ContainerId) -> Self {
        Self::with_id(Uuid::new_v4(), container_id)
    }

    /// Creates an unplaced item with a caller-provided id.
    pub fn with_id(id: ItemId, container_id: ContainerId) -> Self {
        Self {
            id,
            container_id,
            position: None,
        }
    }

    /// Builder-style helper used by imports and fixtures.
    pub fn at(mut self, position: f64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }

    /// Checks persisted-state invariants.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        match self.position {
            Some(position) => validate_position(position),
            None => Ok(()),
        }
    }
}

/// Rejects positions that cannot be stored or compared.
pub fn validate_position(position: f64) -> Result<(), ItemValidationError> {
    if position.is_finite() {
        Ok(())
    } else {
        Err(ItemValidationError::NonFinitePosition(position))
    }
}
