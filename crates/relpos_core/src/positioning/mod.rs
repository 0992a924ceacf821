//! Relative positioning (fractional indexing) core.
//!
//! # Responsibility
//! - Compute positions strictly between neighbours without renumbering
//!   siblings.
//! - Describe cascaded neighbour moves as plain data for the caller to
//!   persist.
//!
//! # Invariants
//! - Positions are only compared within one container.
//! - The engine never writes; persistence goes through
//!   [`coordinator::persist_placement`].

pub mod between;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod query;

use crate::model::item::{ContainerId, ItemId, OrderableItem};

/// Lower sentinel used when an item has no left neighbour.
pub const MIN_POSITION: f64 = f64::MIN;
/// Upper sentinel used when an item has no right neighbour.
pub const MAX_POSITION: f64 = f64::MAX;
/// Centre of the position space.
pub const START_POSITION: f64 = 0.0;

/// Anything that can be ordered by the placement engine.
pub trait Positionable {
    fn item_id(&self) -> ItemId;
    fn position(&self) -> Option<f64>;
    fn set_position(&mut self, position: Option<f64>);
}

/// Maps an item to the container its position is relative to.
pub trait ScopeKey<T: ?Sized> {
    fn scope_key(&self, item: &T) -> ContainerId;
}

impl<T: ?Sized, F> ScopeKey<T> for F
where
    F: Fn(&T) -> ContainerId,
{
    fn scope_key(&self, item: &T) -> ContainerId {
        self(item)
    }
}

/// Scopes an [`OrderableItem`] by its own `container_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerScope;

impl ScopeKey<OrderableItem> for ContainerScope {
    fn scope_key(&self, item: &OrderableItem) -> ContainerId {
        item.container_id
    }
}

impl Positionable for OrderableItem {
    fn item_id(&self) -> ItemId {
        self.id
    }

    fn position(&self) -> Option<f64> {
        self.position
    }

    fn set_position(&mut self, position: Option<f64>) {
        self.position = position;
    }
}
