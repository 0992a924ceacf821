//! Relative positioning core.
//! Orders items inside a container by fractional positions so a move only
//! ever touches the moved item and, at most, its two neighbours.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod positioning;
pub mod repo;
pub mod service;

pub use config::{ConfigError, PositioningConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{ContainerId, ItemId, ItemValidationError, OrderableItem};
pub use positioning::between::position_between;
pub use positioning::coordinator::{persist_placement, NeighbourFailure, SaveReport};
pub use positioning::engine::{NeighbourMove, Placement, PlacementEngine};
pub use positioning::error::{PlacementError, PlacementResult};
pub use positioning::query::PositionQuery;
pub use positioning::{
    ContainerScope, Positionable, ScopeKey, MAX_POSITION, MIN_POSITION, START_POSITION,
};
pub use repo::item_repo::{ItemRepoError, ItemRepoResult, ItemRepository, SqliteItemRepository};
pub use service::positioning_service::{
    PositioningError, PositioningResult, PositioningService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
