//! Neighbour persistence coordinator.
//!
//! # Responsibility
//! - Persist a [`Placement`]: primary item first, cascaded neighbours after.
//!
//! # Invariants
//! - An invalid or failed primary write leaves every neighbour untouched.
//! - Neighbour writes are independent and best-effort; a failed neighbour
//!   never rolls back the primary write.

use super::engine::Placement;
use crate::model::item::{validate_position, ItemId};
use crate::repo::item_repo::{ItemRepoError, ItemRepoResult, ItemRepository};
use log::{info, warn};

/// A cascaded neighbour write that did not go through.
#[derive(Debug)]
pub struct NeighbourFailure {
    pub item_id: ItemId,
    pub position: f64,
    pub error: ItemRepoError,
}

/// Outcome of persisting one placement.
#[derive(Debug)]
pub struct SaveReport {
    pub item_id: ItemId,
    pub position: f64,
    pub neighbours_saved: usize,
    pub neighbour_failures: Vec<NeighbourFailure>,
}

impl SaveReport {
    /// True when the primary item and every neighbour were written.
    pub fn is_complete(&self) -> bool {
        self.neighbour_failures.is_empty()
    }
}

/// Writes `placement` through `repo`.
///
/// # Errors
/// - Returns the primary item's validation or storage error. Nothing has
///   been written for neighbours in that case.
pub fn persist_placement<R>(repo: &R, placement: &Placement) -> ItemRepoResult<SaveReport>
where
    R: ItemRepository + ?Sized,
{
    validate_position(placement.position)?;
    repo.update_position(placement.item_id, Some(placement.position))?;

    let mut neighbours_saved = 0;
    let mut neighbour_failures = Vec::new();
    for neighbour in &placement.neighbours {
        let written = validate_position(neighbour.position)
            .map_err(ItemRepoError::from)
            .and_then(|()| repo.update_position(neighbour.item_id, Some(neighbour.position)));
        match written {
            Ok(()) => neighbours_saved += 1,
            Err(error) => {
                warn!(
                    "event=neighbour_save module=positioning status=error item_id={} neighbour_id={} error={}",
                    placement.item_id, neighbour.item_id, error
                );
                neighbour_failures.push(NeighbourFailure {
                    item_id: neighbour.item_id,
                    position: neighbour.position,
                    error,
                });
            }
        }
    }

    info!(
        "event=placement_save module=positioning status=ok item_id={} neighbours_saved={} neighbours_failed={}",
        placement.item_id,
        neighbours_saved,
        neighbour_failures.len()
    );

    Ok(SaveReport {
        item_id: placement.item_id,
        position: placement.position,
        neighbours_saved,
        neighbour_failures,
    })
}
