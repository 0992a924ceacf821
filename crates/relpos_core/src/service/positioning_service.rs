//! Relative positioning use-case service.
//!
//! # Responsibility
//! - Wire the placement engine, the position store and the neighbour
//!   coordinator behind one facade.
//! - Recover from float exhaustion by rebalancing the container and retrying.
//! - Place unplaced items in bulk.
//!
//! # Invariants
//! - Compute-only moves write nothing except recovery: a rebalance and, for
//!   `move_between`, restoring the anchors' requested order afterwards.
//! - `*_and_save` variants persist the primary item before any neighbour.
//! - Every anchor must belong to the moved item's container.

use crate::config::{ConfigError, PositioningConfig};
use crate::model::item::{ContainerId, ItemId, OrderableItem};
use crate::positioning::coordinator::{persist_placement, SaveReport};
use crate::positioning::engine::{Placement, PlacementEngine};
use crate::positioning::error::{PlacementError, PlacementResult};
use crate::positioning::{ContainerScope, MAX_POSITION, MIN_POSITION, START_POSITION};
use crate::repo::item_repo::{ItemRepoError, ItemRepository};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::fmt::{Display, Formatter};

const USER_FACING_FAILURE: &str = "could not reorder item";

pub type PositioningResult<T> = Result<T, PositioningError>;

/// Errors from positioning service operations.
#[derive(Debug)]
pub enum PositioningError {
    /// Service configuration is invalid.
    Config(ConfigError),
    /// Placement could not be computed.
    Placement(PlacementError),
    /// Position store failure, including primary validation failures.
    Repo(ItemRepoError),
    /// Anchor referenced by a move is not in the position store.
    ItemNotFound(ItemId),
}

impl PositioningError {
    /// Message shown to end users for any failed move.
    pub fn user_message(&self) -> &'static str {
        USER_FACING_FAILURE
    }
}

impl Display for PositioningError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid positioning config: {err}"),
            Self::Placement(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "orderable item not found: {id}"),
        }
    }
}

impl Error for PositioningError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Placement(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::ItemNotFound(_) => None,
        }
    }
}

impl From<ConfigError> for PositioningError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<PlacementError> for PositioningError {
    fn from(value: PlacementError) -> Self {
        match value {
            PlacementError::Repo(err) => Self::Repo(err),
            other => Self::Placement(other),
        }
    }
}

impl From<ItemRepoError> for PositioningError {
    fn from(value: ItemRepoError) -> Self {
        match value {
            ItemRepoError::NotFound(id) => Self::ItemNotFound(id),
            other => Self::Repo(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    End,
}

impl Edge {
    fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

/// Relative positioning facade over one position store.
pub struct PositioningService<R: ItemRepository, G: Rng = StdRng> {
    repo: R,
    engine: PlacementEngine<ContainerScope, G>,
    config: PositioningConfig,
}

impl<R: ItemRepository> PositioningService<R, StdRng> {
    /// Creates a service whose draws are seeded from the OS.
    pub fn new(repo: R, config: PositioningConfig) -> PositioningResult<Self> {
        Self::with_rng(repo, config, StdRng::from_os_rng())
    }
}

impl<R: ItemRepository, G: Rng> PositioningService<R, G> {
    /// Creates a service with a caller-provided random source.
    pub fn with_rng(repo: R, config: PositioningConfig, rng: G) -> PositioningResult<Self> {
        config.validate()?;
        Ok(Self {
            engine: PlacementEngine::new(ContainerScope, rng, &config),
            repo,
            config,
        })
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &PositioningConfig {
        &self.config
    }

    /// Creates and stores one unplaced item.
    pub fn create_item(&self, container_id: ContainerId) -> PositioningResult<OrderableItem> {
        let item = OrderableItem::new(container_id);
        self.repo.insert_item(&item)?;
        debug!(
            "event=item_create module=positioning status=ok item_id={} container_id={}",
            item.id, container_id
        );
        Ok(item)
    }

    /// Stores an item built by the caller, placed or not.
    pub fn insert_item(&self, item: &OrderableItem) -> PositioningResult<()> {
        self.repo.insert_item(item).map_err(Into::into)
    }

    pub fn get_item(&self, id: ItemId) -> PositioningResult<Option<OrderableItem>> {
        self.repo.get_item(id).map_err(Into::into)
    }

    pub fn delete_item(&self, id: ItemId) -> PositioningResult<()> {
        self.repo.delete_item(id).map_err(Into::into)
    }

    /// Lists every item of a container in display order.
    pub fn scoped_items(&self, container_id: ContainerId) -> PositioningResult<Vec<OrderableItem>> {
        self.repo.list_items(container_id).map_err(Into::into)
    }

    /// Lists the container of `item` without `item` itself.
    pub fn relative_siblings(
        &self,
        item: &OrderableItem,
    ) -> PositioningResult<Vec<OrderableItem>> {
        let mut items = self.repo.list_items(item.container_id)?;
        items.retain(|sibling| sibling.id != item.id);
        Ok(items)
    }

    pub fn move_to_front(&mut self, item: &mut OrderableItem) -> PositioningResult<Placement> {
        self.place_with_recovery("move_to_front", item, &[], |engine, repo, item, _| {
            engine.move_to_front(repo, item)
        })
    }

    pub fn move_to_end(&mut self, item: &mut OrderableItem) -> PositioningResult<Placement> {
        self.place_with_recovery("move_to_end", item, &[], |engine, repo, item, _| {
            engine.move_to_end(repo, item)
        })
    }

    pub fn move_before(
        &mut self,
        item: &mut OrderableItem,
        anchor: &OrderableItem,
    ) -> PositioningResult<Placement> {
        self.place_with_recovery("move_before", item, &[anchor], |engine, repo, item, anchors| {
            engine.move_before(repo, item, &anchors[0])
        })
    }

    pub fn move_after(
        &mut self,
        item: &mut OrderableItem,
        anchor: &OrderableItem,
    ) -> PositioningResult<Placement> {
        self.place_with_recovery("move_after", item, &[anchor], |engine, repo, item, anchors| {
            engine.move_after(repo, item, &anchors[0])
        })
    }

    pub fn move_between(
        &mut self,
        item: &mut OrderableItem,
        before: Option<&OrderableItem>,
        after: Option<&OrderableItem>,
    ) -> PositioningResult<Placement> {
        let has_before = before.is_some();
        let anchors: Vec<&OrderableItem> = before.into_iter().chain(after).collect();
        self.place_with_recovery("move_between", item, &anchors, |engine, repo, item, anchors| {
            let mut anchors = anchors.iter();
            let before = if has_before { anchors.next() } else { None };
            let after = anchors.next();
            engine.move_between(repo, item, before, after)
        })
    }

    /// Persists a placement: the primary item first, then its neighbours.
    pub fn save(&self, placement: &Placement) -> PositioningResult<SaveReport> {
        persist_placement(&self.repo, placement).map_err(|err| {
            warn!(
                "event=placement_save module=positioning status=error item_id={} error={}",
                placement.item_id, err
            );
            PositioningError::from(err)
        })
    }

    pub fn move_to_front_and_save(
        &mut self,
        item: &mut OrderableItem,
    ) -> PositioningResult<SaveReport> {
        let placement = self.move_to_front(item)?;
        self.save(&placement)
    }

    pub fn move_to_end_and_save(
        &mut self,
        item: &mut OrderableItem,
    ) -> PositioningResult<SaveReport> {
        let placement = self.move_to_end(item)?;
        self.save(&placement)
    }

    pub fn move_before_and_save(
        &mut self,
        item: &mut OrderableItem,
        anchor: &OrderableItem,
    ) -> PositioningResult<SaveReport> {
        let placement = self.move_before(item, anchor)?;
        self.save(&placement)
    }

    pub fn move_after_and_save(
        &mut self,
        item: &mut OrderableItem,
        anchor: &OrderableItem,
    ) -> PositioningResult<SaveReport> {
        let placement = self.move_after(item, anchor)?;
        self.save(&placement)
    }

    pub fn move_between_and_save(
        &mut self,
        item: &mut OrderableItem,
        before: Option<&OrderableItem>,
        after: Option<&OrderableItem>,
    ) -> PositioningResult<SaveReport> {
        let placement = self.move_between(item, before, after)?;
        self.save(&placement)
    }

    /// Places every unplaced item of `items` after the container's last item.
    ///
    /// Slice order is preserved; returns how many items were placed.
    pub fn move_nulls_to_end(&self, items: &mut [OrderableItem]) -> PositioningResult<usize> {
        self.place_nulls(items, Edge::End)
    }

    /// Places every unplaced item of `items` before the container's first item.
    pub fn move_nulls_to_start(&self, items: &mut [OrderableItem]) -> PositioningResult<usize> {
        self.place_nulls(items, Edge::Start)
    }

    /// Renumbers a container to evenly spaced positions, keeping its order.
    pub fn rebalance(&self, container_id: ContainerId) -> PositioningResult<usize> {
        let count = self
            .repo
            .rebalance(container_id, self.config.rebalance_spacing)?;
        info!(
            "event=scope_rebalance module=positioning status=ok container_id={} items={}",
            container_id, count
        );
        Ok(count)
    }

    fn place_with_recovery<F>(
        &mut self,
        op: &'static str,
        item: &mut OrderableItem,
        anchors: &[&OrderableItem],
        mut place: F,
    ) -> PositioningResult<Placement>
    where
        F: FnMut(
            &mut PlacementEngine<ContainerScope, G>,
            &R,
            &mut OrderableItem,
            &[OrderableItem],
        ) -> PlacementResult<Placement>,
    {
        let mut anchors: Vec<OrderableItem> = anchors.iter().map(|anchor| (*anchor).clone()).collect();
        let mut rebalances = 0;
        loop {
            match place(&mut self.engine, &self.repo, &mut *item, &anchors) {
                Ok(placement) => {
                    debug!(
                        "event=placement module=positioning op={op} status=ok item_id={} neighbours={} rebalances={rebalances}",
                        placement.item_id,
                        placement.neighbours.len()
                    );
                    return Ok(placement);
                }
                Err(PlacementError::Exhausted { low, high })
                    if rebalances < self.config.max_rebalance_attempts =>
                {
                    rebalances += 1;
                    warn!(
                        "event=placement module=positioning op={op} status=exhausted item_id={} low={low:e} high={high:e} action=rebalance",
                        item.id
                    );
                    self.rebalance(item.container_id)?;
                    anchors = anchors
                        .iter()
                        .map(|anchor| self.reload(anchor.id))
                        .collect::<PositioningResult<_>>()?;
                    if let [before, after] = anchors.as_mut_slice() {
                        self.restore_anchor_order(before, after)?;
                    }
                }
                Err(err) => {
                    warn!(
                        "event=placement module=positioning op={op} status=error item_id={} error={err}",
                        item.id
                    );
                    return Err(err.into());
                }
            }
        }
    }

    /// Rebalance breaks ties by id, which may put `after` ahead of `before`.
    /// Swaps their stored positions back so the retry sees the requested
    /// order.
    fn restore_anchor_order(
        &self,
        before: &mut OrderableItem,
        after: &mut OrderableItem,
    ) -> PositioningResult<()> {
        let (Some(low), Some(high)) = (after.position, before.position) else {
            return Ok(());
        };
        if low >= high {
            return Ok(());
        }

        self.repo
            .update_positions(&[(before.id, low), (after.id, high)])?;
        before.position = Some(low);
        after.position = Some(high);
        debug!(
            "event=anchor_order_restore module=positioning status=ok before_id={} after_id={}",
            before.id, after.id
        );
        Ok(())
    }

    fn reload(&self, id: ItemId) -> PositioningResult<OrderableItem> {
        self.repo
            .get_item(id)?
            .ok_or(PositioningError::ItemNotFound(id))
    }

    fn place_nulls(&self, items: &mut [OrderableItem], edge: Edge) -> PositioningResult<usize> {
        let unplaced: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.position.is_none())
            .map(|(index, _)| index)
            .collect();
        let Some(&first) = unplaced.first() else {
            return Ok(0);
        };

        let container = items[first].container_id;
        if let Some(stray) = items.iter().find(|item| item.container_id != container) {
            return Err(PlacementError::CrossScope {
                item_id: items[first].id,
                item_container: container,
                anchor_id: stray.id,
                anchor_container: stray.container_id,
            }
            .into());
        }

        let positions = match self.edge_positions(container, unplaced.len(), edge)? {
            Some(positions) => positions,
            None => {
                self.rebalance(container)?;
                self.edge_positions(container, unplaced.len(), edge)?
                    .ok_or(PlacementError::Exhausted {
                        low: MIN_POSITION,
                        high: MAX_POSITION,
                    })?
            }
        };

        let updates: Vec<(ItemId, f64)> = unplaced
            .iter()
            .zip(&positions)
            .map(|(index, position)| (items[*index].id, *position))
            .collect();
        self.repo.update_positions(&updates)?;
        for (index, position) in unplaced.iter().zip(positions) {
            items[*index].position = Some(position);
        }

        info!(
            "event=nulls_placed module=positioning status=ok container_id={} edge={} count={}",
            container,
            edge.as_str(),
            updates.len()
        );
        Ok(updates.len())
    }

    /// Ascending positions for `count` items beyond `edge` of the container,
    /// or `None` when they would not fit inside the float range.
    fn edge_positions(
        &self,
        container: ContainerId,
        count: usize,
        edge: Edge,
    ) -> PositioningResult<Option<Vec<f64>>> {
        let step = self.config.ideal_distance;
        let (base, positions): (Option<f64>, Vec<f64>) = match edge {
            Edge::End => {
                let last = self.repo.max_position(container)?;
                let base = last.unwrap_or(START_POSITION);
                (last, (1..=count).map(|k| base + step * k as f64).collect())
            }
            Edge::Start => {
                let first = self.repo.min_position(container)?;
                let base = first.unwrap_or(START_POSITION);
                (
                    first,
                    (0..count).map(|k| base - step * (count - k) as f64).collect(),
                )
            }
        };

        let finite = positions.iter().all(|position| position.is_finite());
        let increasing = positions.windows(2).all(|pair| pair[0] < pair[1]);
        let clear_of_base = match (edge, base, positions.first(), positions.last()) {
            (Edge::End, Some(base), Some(first), _) => *first > base,
            (Edge::Start, Some(base), _, Some(last)) => *last < base,
            _ => true,
        };

        Ok((finite && increasing && clear_of_base).then_some(positions))
    }
}
