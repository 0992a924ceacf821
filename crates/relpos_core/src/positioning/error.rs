//! Placement engine errors.

use crate::model::item::{ContainerId, ItemId};
use crate::repo::item_repo::ItemRepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PlacementResult<T> = Result<T, PlacementError>;

#[derive(Debug)]
pub enum PlacementError {
    /// A bound handed to the engine is NaN or infinite.
    NonFiniteBound(f64),
    /// No representable value lies strictly between `low` and `high`.
    Exhausted { low: f64, high: f64 },
    /// Anchor lives in another container than the moved item.
    CrossScope {
        item_id: ItemId,
        item_container: ContainerId,
        anchor_id: ItemId,
        anchor_container: ContainerId,
    },
    /// Item was passed as its own anchor.
    SelfAnchor(ItemId),
    /// Neighbour lookup failed.
    Repo(ItemRepoError),
}

impl Display for PlacementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFiniteBound(value) => write!(f, "position bound is not finite: {value}"),
            Self::Exhausted { low, high } => {
                write!(f, "no position left strictly between {low:e} and {high:e}")
            }
            Self::CrossScope {
                item_id,
                item_container,
                anchor_id,
                anchor_container,
            } => write!(
                f,
                "anchor {anchor_id} (container {anchor_container}) is not in the container of item {item_id} ({item_container})"
            ),
            Self::SelfAnchor(id) => write!(f, "item {id} cannot be positioned relative to itself"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlacementError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemRepoError> for PlacementError {
    fn from(value: ItemRepoError) -> Self {
        Self::Repo(value)
    }
}
