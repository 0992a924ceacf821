//! Read-only neighbour lookups consumed by the placement engine.
//!
//! Each lookup is one scoped aggregate over placed items; unplaced items
//! never take part.

use crate::model::item::ContainerId;
use crate::repo::item_repo::ItemRepoResult;

pub trait PositionQuery {
    /// Smallest position in the container, `None` when nothing is placed.
    fn min_position(&self, container_id: ContainerId) -> ItemRepoResult<Option<f64>>;
    /// Largest position in the container, `None` when nothing is placed.
    fn max_position(&self, container_id: ContainerId) -> ItemRepoResult<Option<f64>>;
    /// Largest position strictly below `position`, or `MIN_POSITION`.
    fn prev_position(&self, container_id: ContainerId, position: f64) -> ItemRepoResult<f64>;
    /// Smallest position strictly above `position`, or `MAX_POSITION`.
    fn next_position(&self, container_id: ContainerId, position: f64) -> ItemRepoResult<f64>;
}
