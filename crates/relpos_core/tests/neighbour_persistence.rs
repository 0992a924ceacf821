use rand::rngs::StdRng;
use rand::SeedableRng;
use relpos_core::db::open_db_in_memory;
use relpos_core::{
    persist_placement, ItemRepoError, ItemRepository, NeighbourMove, OrderableItem, Placement,
    PositioningConfig, PositioningError, PositioningService, SqliteItemRepository,
};
use uuid::Uuid;

fn insert_at(repo: &SqliteItemRepository<'_>, container: Uuid, position: Option<f64>) -> OrderableItem {
    let item = OrderableItem {
        id: Uuid::new_v4(),
        container_id: container,
        position,
    };
    repo.insert_item(&item).unwrap();
    item
}

fn position_of(repo: &SqliteItemRepository<'_>, id: Uuid) -> Option<f64> {
    repo.get_item(id).unwrap().unwrap().position
}

#[test]
fn primary_and_neighbours_are_written() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let container = Uuid::new_v4();
    let item = insert_at(&repo, container, None);
    let before = insert_at(&repo, container, Some(5.0));
    let after = insert_at(&repo, container, Some(5.0));

    let placement = Placement {
        item_id: item.id,
        position: 5.0,
        neighbours: vec![
            NeighbourMove {
                item_id: before.id,
                position: 4.5,
            },
            NeighbourMove {
                item_id: after.id,
                position: 5.5,
            },
        ],
    };
    let report = persist_placement(&repo, &placement).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.neighbours_saved, 2);
    assert_eq!(position_of(&repo, item.id), Some(5.0));
    assert_eq!(position_of(&repo, before.id), Some(4.5));
    assert_eq!(position_of(&repo, after.id), Some(5.5));
}

#[test]
fn invalid_primary_position_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let container = Uuid::new_v4();
    let item = insert_at(&repo, container, Some(1.0));
    let neighbour = insert_at(&repo, container, Some(2.0));

    let placement = Placement {
        item_id: item.id,
        position: f64::NAN,
        neighbours: vec![NeighbourMove {
            item_id: neighbour.id,
            position: 3.0,
        }],
    };
    let err = persist_placement(&repo, &placement).unwrap_err();

    assert!(matches!(err, ItemRepoError::Validation(_)));
    assert_eq!(position_of(&repo, item.id), Some(1.0));
    assert_eq!(position_of(&repo, neighbour.id), Some(2.0));
}

#[test]
fn missing_primary_writes_no_neighbours() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let neighbour = insert_at(&repo, Uuid::new_v4(), Some(2.0));
    let missing = Uuid::new_v4();

    let placement = Placement {
        item_id: missing,
        position: 1.0,
        neighbours: vec![NeighbourMove {
            item_id: neighbour.id,
            position: 3.0,
        }],
    };
    let err = persist_placement(&repo, &placement).unwrap_err();

    assert!(matches!(err, ItemRepoError::NotFound(id) if id == missing));
    assert_eq!(position_of(&repo, neighbour.id), Some(2.0));
}

#[test]
fn failed_neighbour_keeps_primary_and_other_neighbours() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let container = Uuid::new_v4();
    let item = insert_at(&repo, container, None);
    let kept = insert_at(&repo, container, Some(5.0));
    let gone = Uuid::new_v4();

    let placement = Placement {
        item_id: item.id,
        position: 5.0,
        neighbours: vec![
            NeighbourMove {
                item_id: gone,
                position: 4.0,
            },
            NeighbourMove {
                item_id: kept.id,
                position: 6.0,
            },
        ],
    };
    let report = persist_placement(&repo, &placement).unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.neighbours_saved, 1);
    assert_eq!(report.neighbour_failures.len(), 1);
    let failure = &report.neighbour_failures[0];
    assert_eq!(failure.item_id, gone);
    assert_eq!(failure.position, 4.0);
    assert!(matches!(failure.error, ItemRepoError::NotFound(id) if id == gone));

    assert_eq!(position_of(&repo, item.id), Some(5.0));
    assert_eq!(position_of(&repo, kept.id), Some(6.0));
}

#[test]
fn service_save_reports_deleted_anchor_as_neighbour_failure() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let mut service =
        PositioningService::with_rng(repo, PositioningConfig::default(), StdRng::seed_from_u64(3))
            .unwrap();
    let container = Uuid::new_v4();

    let before = OrderableItem::new(container).at(5.0);
    let after = OrderableItem::new(container).at(5.0);
    service.insert_item(&before).unwrap();
    service.insert_item(&after).unwrap();
    let mut item = service.create_item(container).unwrap();

    let placement = service
        .move_between(&mut item, Some(&before), Some(&after))
        .unwrap();
    service.delete_item(after.id).unwrap();

    let report = service.save(&placement).unwrap();
    assert_eq!(report.neighbours_saved, 1);
    assert_eq!(report.neighbour_failures[0].item_id, after.id);
    assert_eq!(service.get_item(item.id).unwrap().unwrap().position, Some(5.0));
    assert!(service.get_item(before.id).unwrap().unwrap().position.unwrap() < 5.0);
}

#[test]
fn service_save_surfaces_missing_primary_as_item_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let mut service =
        PositioningService::with_rng(repo, PositioningConfig::default(), StdRng::seed_from_u64(4))
            .unwrap();
    let container = Uuid::new_v4();

    let mut item = service.create_item(container).unwrap();
    let placement = service.move_to_end(&mut item).unwrap();
    service.delete_item(item.id).unwrap();

    let err = service.save(&placement).unwrap_err();
    assert!(matches!(err, PositioningError::ItemNotFound(id) if id == item.id));
    assert_eq!(err.user_message(), "could not reorder item");
}
