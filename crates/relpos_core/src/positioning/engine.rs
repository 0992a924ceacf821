//! Placement engine.
//!
//! # Responsibility
//! - Turn "to front", "to end", "before", "after" and "between" requests into
//!   one new position for the moved item.
//! - Describe neighbours that must move too (ties, unplaced anchors) as
//!   [`NeighbourMove`] values instead of mutating them.
//!
//! # Invariants
//! - Only the moved item is mutated, and only in memory.
//! - Anchors must share the moved item's container.
//! - Every computed position is strictly between the bounds it was drawn
//!   from; exhaustion is reported, never papered over.

use super::between::{draw_window, position_between};
use super::error::{PlacementError, PlacementResult};
use super::query::PositionQuery;
use super::{Positionable, ScopeKey, MAX_POSITION, MIN_POSITION};
use crate::config::PositioningConfig;
use crate::model::item::{ContainerId, ItemId};
use rand::Rng;

/// A neighbour whose position must change together with the moved item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighbourMove {
    pub item_id: ItemId,
    pub position: f64,
}

/// Result of one placement request.
///
/// Nothing in here is persisted yet; hand it to
/// [`persist_placement`](super::coordinator::persist_placement).
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub item_id: ItemId,
    pub position: f64,
    /// Cascaded neighbour moves, persisted after the primary item.
    pub neighbours: Vec<NeighbourMove>,
}

impl Placement {
    fn single(item_id: ItemId, position: f64) -> Self {
        Self {
            item_id,
            position,
            neighbours: Vec::new(),
        }
    }

    /// Returns the cascaded position for `item_id`, if it is a neighbour.
    pub fn neighbour_position(&self, item_id: ItemId) -> Option<f64> {
        self.neighbours
            .iter()
            .find(|neighbour| neighbour.item_id == item_id)
            .map(|neighbour| neighbour.position)
    }
}

/// Computes positions for items of type `T` scoped by `S`.
pub struct PlacementEngine<S, G> {
    scope: S,
    rng: G,
    ideal_distance: f64,
}

impl<S, G: Rng> PlacementEngine<S, G> {
    pub fn new(scope: S, rng: G, config: &PositioningConfig) -> Self {
        Self {
            scope,
            rng,
            ideal_distance: config.ideal_distance,
        }
    }

    /// Draws a position strictly between `low` and `high`.
    ///
    /// Sentinel bounds are narrowed to `ideal_distance` around the real bound
    /// first, see [`draw_window`].
    pub fn position_between(&mut self, low: f64, high: f64) -> PlacementResult<f64> {
        let (low, high) = draw_window(low, high, self.ideal_distance);
        position_between(&mut self.rng, low, high)
    }

    pub fn move_to_front<T, Q>(&mut self, query: &Q, item: &mut T) -> PlacementResult<Placement>
    where
        T: Positionable,
        Q: PositionQuery + ?Sized,
        S: ScopeKey<T>,
    {
        let container = self.scope.scope_key(item);
        let placement = Placement::single(item.item_id(), self.front_position(query, container)?);
        Ok(assign(item, placement))
    }

    pub fn move_to_end<T, Q>(&mut self, query: &Q, item: &mut T) -> PlacementResult<Placement>
    where
        T: Positionable,
        Q: PositionQuery + ?Sized,
        S: ScopeKey<T>,
    {
        let container = self.scope.scope_key(item);
        let placement = Placement::single(item.item_id(), self.end_position(query, container)?);
        Ok(assign(item, placement))
    }

    /// Places `item` immediately before `anchor`.
    ///
    /// An unplaced anchor cannot be referenced, so the item goes to the end
    /// and the anchor is cascaded right after it.
    pub fn move_before<T, Q>(
        &mut self,
        query: &Q,
        item: &mut T,
        anchor: &T,
    ) -> PlacementResult<Placement>
    where
        T: Positionable,
        Q: PositionQuery + ?Sized,
        S: ScopeKey<T>,
    {
        let container = self.shared_scope(item, &[anchor])?;
        let placement = match anchor.position() {
            Some(anchor_position) => Placement::single(
                item.item_id(),
                self.position_before(query, container, anchor_position)?,
            ),
            None => {
                let position = self.end_position(query, container)?;
                let anchor_position = self.position_after(query, container, position)?;
                Placement {
                    item_id: item.item_id(),
                    position,
                    neighbours: vec![NeighbourMove {
                        item_id: anchor.item_id(),
                        position: anchor_position,
                    }],
                }
            }
        };
        Ok(assign(item, placement))
    }

    /// Places `item` immediately after `anchor`. Mirror of [`Self::move_before`].
    pub fn move_after<T, Q>(
        &mut self,
        query: &Q,
        item: &mut T,
        anchor: &T,
    ) -> PlacementResult<Placement>
    where
        T: Positionable,
        Q: PositionQuery + ?Sized,
        S: ScopeKey<T>,
    {
        let container = self.shared_scope(item, &[anchor])?;
        let placement = match anchor.position() {
            Some(anchor_position) => Placement::single(
                item.item_id(),
                self.position_after(query, container, anchor_position)?,
            ),
            None => {
                let position = self.end_position(query, container)?;
                let anchor_position = self.position_before(query, container, position)?;
                Placement {
                    item_id: item.item_id(),
                    position,
                    neighbours: vec![NeighbourMove {
                        item_id: anchor.item_id(),
                        position: anchor_position,
                    }],
                }
            }
        };
        Ok(assign(item, placement))
    }

    /// Places `item` between `before` and `after`.
    ///
    /// A missing `before` degrades to [`Self::move_before`] of `after`, a
    /// missing `after` to [`Self::move_after`] of `before`, and no anchors at
    /// all to [`Self::move_to_end`].
    ///
    /// With both anchors present:
    /// - distinct positions: draw between them;
    /// - equal positions (a tie): the item takes the shared value and the
    ///   anchors fan out to either side of it;
    /// - one anchor unplaced: place relative to the placed one, then cascade
    ///   the unplaced one next to the item;
    /// - both unplaced: item to the end, anchors cascaded around it.
    pub fn move_between<T, Q>(
        &mut self,
        query: &Q,
        item: &mut T,
        before: Option<&T>,
        after: Option<&T>,
    ) -> PlacementResult<Placement>
    where
        T: Positionable,
        Q: PositionQuery + ?Sized,
        S: ScopeKey<T>,
    {
        let (before, after) = match (before, after) {
            (None, None) => return self.move_to_end(query, item),
            (Some(before), None) => return self.move_after(query, item, before),
            (None, Some(after)) => return self.move_before(query, item, after),
            (Some(before), Some(after)) => (before, after),
        };
        let container = self.shared_scope(item, &[before, after])?;

        let (position, before_position, after_position) =
            match (before.position(), after.position()) {
                (Some(low), Some(high)) if low == high => {
                    let before_position = self.position_before(query, container, low)?;
                    let after_position = self.position_after(query, container, low)?;
                    (low, Some(before_position), Some(after_position))
                }
                (Some(low), Some(high)) => (self.position_between(low, high)?, None, None),
                (Some(low), None) => {
                    let position = self.position_after(query, container, low)?;
                    let after_position = self.position_after(query, container, position)?;
                    (position, None, Some(after_position))
                }
                (None, Some(high)) => {
                    let position = self.position_before(query, container, high)?;
                    let before_position = self.position_before(query, container, position)?;
                    (position, Some(before_position), None)
                }
                (None, None) => {
                    let position = self.end_position(query, container)?;
                    let before_position = self.position_before(query, container, position)?;
                    let after_position = self.position_after(query, container, position)?;
                    (position, Some(before_position), Some(after_position))
                }
            };

        let mut neighbours = Vec::with_capacity(2);
        if let Some(position) = before_position {
            neighbours.push(NeighbourMove {
                item_id: before.item_id(),
                position,
            });
        }
        if let Some(position) = after_position {
            neighbours.push(NeighbourMove {
                item_id: after.item_id(),
                position,
            });
        }

        let placement = Placement {
            item_id: item.item_id(),
            position,
            neighbours,
        };
        Ok(assign(item, placement))
    }

    fn front_position<Q>(&mut self, query: &Q, container: ContainerId) -> PlacementResult<f64>
    where
        Q: PositionQuery + ?Sized,
    {
        let first = query.min_position(container)?.unwrap_or(MAX_POSITION);
        self.position_between(MIN_POSITION, first)
    }

    fn end_position<Q>(&mut self, query: &Q, container: ContainerId) -> PlacementResult<f64>
    where
        Q: PositionQuery + ?Sized,
    {
        let last = query.max_position(container)?.unwrap_or(MIN_POSITION);
        self.position_between(last, MAX_POSITION)
    }

    fn position_before<Q>(
        &mut self,
        query: &Q,
        container: ContainerId,
        position: f64,
    ) -> PlacementResult<f64>
    where
        Q: PositionQuery + ?Sized,
    {
        let prev = query.prev_position(container, position)?;
        self.position_between(prev, position)
    }

    fn position_after<Q>(
        &mut self,
        query: &Q,
        container: ContainerId,
        position: f64,
    ) -> PlacementResult<f64>
    where
        Q: PositionQuery + ?Sized,
    {
        let next = query.next_position(container, position)?;
        self.position_between(position, next)
    }

    fn shared_scope<T>(&self, item: &T, anchors: &[&T]) -> PlacementResult<ContainerId>
    where
        T: Positionable,
        S: ScopeKey<T>,
    {
        let container = self.scope.scope_key(item);
        for anchor in anchors {
            if anchor.item_id() == item.item_id() {
                return Err(PlacementError::SelfAnchor(item.item_id()));
            }
            let anchor_container = self.scope.scope_key(anchor);
            if anchor_container != container {
                return Err(PlacementError::CrossScope {
                    item_id: item.item_id(),
                    item_container: container,
                    anchor_id: anchor.item_id(),
                    anchor_container,
                });
            }
        }
        Ok(container)
    }
}

fn assign<T: Positionable>(item: &mut T, placement: Placement) -> Placement {
    item.set_position(Some(placement.position));
    placement
}

#[cfg(test)]
mod tests {
    use super::{Placement, PlacementEngine};
    use crate::config::PositioningConfig;
    use crate::model::item::{ContainerId, OrderableItem};
    use crate::positioning::error::PlacementError;
    use crate::positioning::query::PositionQuery;
    use crate::positioning::{ContainerScope, MAX_POSITION, MIN_POSITION};
    use crate::repo::item_repo::ItemRepoResult;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    /// Placed positions per container, kept in memory.
    #[derive(Default)]
    struct Positions(Vec<(ContainerId, f64)>);

    impl Positions {
        fn scoped(&self, container_id: ContainerId) -> impl Iterator<Item = f64> + '_ {
            self.0
                .iter()
                .filter(move |(container, _)| *container == container_id)
                .map(|(_, position)| *position)
        }
    }

    impl PositionQuery for Positions {
        fn min_position(&self, container_id: ContainerId) -> ItemRepoResult<Option<f64>> {
            Ok(self.scoped(container_id).reduce(f64::min))
        }

        fn max_position(&self, container_id: ContainerId) -> ItemRepoResult<Option<f64>> {
            Ok(self.scoped(container_id).reduce(f64::max))
        }

        fn prev_position(&self, container_id: ContainerId, position: f64) -> ItemRepoResult<f64> {
            Ok(self
                .scoped(container_id)
                .filter(|value| *value < position)
                .fold(MIN_POSITION, f64::max))
        }

        fn next_position(&self, container_id: ContainerId, position: f64) -> ItemRepoResult<f64> {
            Ok(self
                .scoped(container_id)
                .filter(|value| *value > position)
                .fold(MAX_POSITION, f64::min))
        }
    }

    fn engine() -> PlacementEngine<ContainerScope, StdRng> {
        PlacementEngine::new(
            ContainerScope,
            StdRng::seed_from_u64(42),
            &PositioningConfig::default(),
        )
    }

    fn item_at(container: ContainerId, position: Option<f64>) -> OrderableItem {
        OrderableItem {
            id: Uuid::new_v4(),
            container_id: container,
            position,
        }
    }

    #[test]
    fn move_to_front_on_empty_scope_is_inside_bounds() {
        let container = Uuid::new_v4();
        let mut item = item_at(container, None);

        let placement = engine()
            .move_to_front(&Positions::default(), &mut item)
            .unwrap();

        assert!(MIN_POSITION < placement.position && placement.position < MAX_POSITION);
        assert_eq!(item.position, Some(placement.position));
        assert!(placement.neighbours.is_empty());
    }

    #[test]
    fn move_before_lands_between_anchor_and_its_predecessor() {
        let container = Uuid::new_v4();
        let store = Positions(vec![(container, 1.0), (container, 2.0), (container, 3.0)]);
        let anchor = item_at(container, Some(2.0));
        let mut item = item_at(container, None);

        let placement = engine().move_before(&store, &mut item, &anchor).unwrap();

        assert!(1.0 < placement.position && placement.position < 2.0);
    }

    #[test]
    fn move_after_unplaced_anchor_cascades_anchor_before_item() {
        let container = Uuid::new_v4();
        let store = Positions(vec![(container, 10.0)]);
        let anchor = item_at(container, None);
        let mut item = item_at(container, None);

        let placement = engine().move_after(&store, &mut item, &anchor).unwrap();

        let anchor_position = placement.neighbour_position(anchor.id).unwrap();
        assert!(10.0 < anchor_position);
        assert!(anchor_position < placement.position);
    }

    #[test]
    fn move_between_tie_fans_neighbours_out() {
        let container = Uuid::new_v4();
        let store = Positions(vec![(container, 5.0), (container, 5.0)]);
        let before = item_at(container, Some(5.0));
        let after = item_at(container, Some(5.0));
        let mut item = item_at(container, None);

        let placement: Placement = engine()
            .move_between(&store, &mut item, Some(&before), Some(&after))
            .unwrap();

        assert_eq!(placement.position, 5.0);
        assert!(placement.neighbour_position(before.id).unwrap() < 5.0);
        assert!(placement.neighbour_position(after.id).unwrap() > 5.0);
    }

    #[test]
    fn move_between_with_only_after_placed_cascades_before() {
        let container = Uuid::new_v4();
        let store = Positions(vec![(container, 1.0), (container, 4.0)]);
        let before = item_at(container, None);
        let after = item_at(container, Some(4.0));
        let mut item = item_at(container, None);

        let placement = engine()
            .move_between(&store, &mut item, Some(&before), Some(&after))
            .unwrap();

        let before_position = placement.neighbour_position(before.id).unwrap();
        assert!(1.0 < before_position);
        assert!(before_position < placement.position);
        assert!(placement.position < 4.0);
        assert_eq!(placement.neighbour_position(after.id), None);
    }

    #[test]
    fn move_between_with_nothing_placed_brackets_item_at_end() {
        let container = Uuid::new_v4();
        let store = Positions(vec![(container, 7.0)]);
        let before = item_at(container, None);
        let after = item_at(container, None);
        let mut item = item_at(container, None);

        let placement = engine()
            .move_between(&store, &mut item, Some(&before), Some(&after))
            .unwrap();

        let before_position = placement.neighbour_position(before.id).unwrap();
        let after_position = placement.neighbour_position(after.id).unwrap();
        assert!(7.0 < before_position);
        assert!(before_position < placement.position);
        assert!(placement.position < after_position);
    }

    #[test]
    fn custom_scope_closure_is_honoured() {
        let shared = Uuid::new_v4();
        let scope = move |_: &OrderableItem| shared;
        let mut engine = PlacementEngine::new(
            scope,
            StdRng::seed_from_u64(1),
            &PositioningConfig::default(),
        );
        let anchor = item_at(Uuid::new_v4(), Some(3.0));
        let mut item = item_at(Uuid::new_v4(), None);
        let store = Positions(vec![(shared, 3.0)]);

        let placement = engine.move_after(&store, &mut item, &anchor).unwrap();
        assert!(placement.position > 3.0);
    }

    #[test]
    fn anchors_from_other_containers_are_rejected() {
        let mut item = item_at(Uuid::new_v4(), None);
        let stranger = item_at(Uuid::new_v4(), Some(1.0));

        let err = engine()
            .move_before(&Positions::default(), &mut item, &stranger)
            .unwrap_err();

        assert!(matches!(err, PlacementError::CrossScope { .. }));
        assert_eq!(item.position, None);
    }

    #[test]
    fn item_cannot_anchor_on_itself() {
        let mut item = item_at(Uuid::new_v4(), Some(1.0));
        let same = item.clone();

        let err = engine()
            .move_after(&Positions::default(), &mut item, &same)
            .unwrap_err();
        assert!(matches!(err, PlacementError::SelfAnchor(id) if id == same.id));
    }

    #[test]
    fn adjacent_neighbours_report_exhaustion() {
        let container = Uuid::new_v4();
        let low = 1.0_f64;
        let high = low.next_up();
        let store = Positions(vec![(container, low), (container, high)]);
        let anchor = item_at(container, Some(high));
        let mut item = item_at(container, None);

        let err = engine().move_before(&store, &mut item, &anchor).unwrap_err();

        assert!(matches!(err, PlacementError::Exhausted { .. }));
        assert_eq!(item.position, None);
    }
}
