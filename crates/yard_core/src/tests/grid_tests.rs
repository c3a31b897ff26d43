use std::collections::HashSet;

use super::*;

fn id(raw: &str) -> ContainerId {
    ContainerId::new(raw)
}

fn assert_consistent(grid: &SpatialGrid) {
    let mut seen = HashSet::new();
    for container in grid.containers() {
        assert!(
            grid.dimensions().contains(container.position),
            "container {} escaped bounds at {}",
            container.id,
            container.position
        );
        assert!(
            seen.insert(container.position),
            "two containers share {}",
            container.position
        );
        assert_eq!(
            grid.occupant_at(container.position).map(|c| &c.id),
            Some(&container.id)
        );
    }
    assert_eq!(seen.len(), grid.len());
}

#[test]
fn place_then_occupant_at_returns_placed_container() {
    let mut grid = SpatialGrid::default();
    grid.place(id("C001"), Position::new(0, 0, 0)).expect("place");

    let occupant = grid.occupant_at(Position::new(0, 0, 0)).expect("occupant");
    assert_eq!(occupant.id, id("C001"));
    assert_eq!(
        grid.by_id(&id("C001")).map(|c| c.position),
        Some(Position::new(0, 0, 0))
    );
}

#[test]
fn place_rejects_out_of_bounds_positions() {
    let mut grid = SpatialGrid::new(YardDimensions::new(10, 10, 5));

    for position in [
        Position::new(10, 0, 0),
        Position::new(0, 10, 0),
        Position::new(0, 0, 5),
        Position::new(-1, 0, 0),
    ] {
        let err = grid.place(id("C001"), position).expect_err("out of bounds");
        assert!(matches!(err, GridError::OutOfBounds { .. }), "{err:?}");
    }
    assert!(grid.is_empty());
}

#[test]
fn place_rejects_occupied_position() {
    let mut grid = SpatialGrid::default();
    grid.place(id("C2"), Position::new(1, 0, 0)).expect("place C2");

    let err = grid
        .place(id("C1"), Position::new(1, 0, 0))
        .expect_err("occupied");
    assert_eq!(
        err,
        GridError::PositionOccupied {
            position: Position::new(1, 0, 0),
            occupant: id("C2"),
        }
    );
    assert!(grid.by_id(&id("C1")).is_none());
}

#[test]
fn place_rejects_known_id_at_other_position() {
    let mut grid = SpatialGrid::default();
    grid.place(id("C1"), Position::new(0, 0, 0)).expect("place");

    let err = grid
        .place(id("C1"), Position::new(3, 3, 0))
        .expect_err("duplicate id");
    assert!(matches!(err, GridError::DuplicateId { .. }));
    assert!(grid.occupant_at(Position::new(3, 3, 0)).is_none());
    assert_eq!(grid.len(), 1);
}

#[test]
fn placing_same_container_at_same_position_is_a_noop() {
    let mut grid = SpatialGrid::default();
    grid.place(id("C1"), Position::new(2, 2, 1)).expect("place");
    grid.place(id("C1"), Position::new(2, 2, 1)).expect("idempotent");
    assert_eq!(grid.len(), 1);
}

#[test]
fn remove_clears_both_indexes() {
    let mut grid = SpatialGrid::default();
    grid.place(id("C001"), Position::new(4, 4, 0)).expect("place");

    let removed = grid.remove(&id("C001")).expect("remove");
    assert_eq!(removed.position, Position::new(4, 4, 0));
    assert!(grid.by_id(&id("C001")).is_none());
    assert!(grid.occupant_at(Position::new(4, 4, 0)).is_none());

    assert_eq!(
        grid.remove(&id("C001")),
        Err(GridError::NotFound(id("C001")))
    );
}

#[test]
fn replace_all_swaps_in_new_set() {
    let mut grid = SpatialGrid::default();
    grid.place(id("OLD"), Position::new(9, 9, 4)).expect("place");

    grid.replace_all(vec![
        Container::new("C001", Position::new(0, 0, 0)),
        Container::new("C002", Position::new(1, 0, 0)),
    ])
    .expect("replace");

    assert_eq!(grid.len(), 2);
    assert!(grid.by_id(&id("OLD")).is_none());
    assert!(grid.occupant_at(Position::new(9, 9, 4)).is_none());
    assert_eq!(
        grid.occupant_at(Position::new(1, 0, 0)).map(|c| c.id.clone()),
        Some(id("C002"))
    );
}

#[test]
fn replace_all_leaves_grid_untouched_on_duplicate_position() {
    let mut grid = SpatialGrid::default();
    grid.place(id("KEEP"), Position::new(5, 5, 0)).expect("place");
    let before = grid.clone();

    let err = grid
        .replace_all(vec![
            Container::new("C001", Position::new(0, 0, 0)),
            Container::new("C002", Position::new(0, 0, 0)),
        ])
        .expect_err("duplicate position");

    assert!(matches!(err, GridError::InvariantViolation(_)));
    assert_eq!(grid, before);
}

#[test]
fn replace_all_leaves_grid_untouched_on_duplicate_id() {
    let mut grid = SpatialGrid::default();
    grid.place(id("KEEP"), Position::new(5, 5, 0)).expect("place");
    let before = grid.clone();

    let err = grid
        .replace_all(vec![
            Container::new("C001", Position::new(0, 0, 0)),
            Container::new("C001", Position::new(0, 1, 0)),
        ])
        .expect_err("duplicate id");

    assert!(matches!(err, GridError::InvariantViolation(_)));
    assert_eq!(grid, before);
}

#[test]
fn replace_all_rejects_out_of_bounds_entries() {
    let mut grid = SpatialGrid::new(YardDimensions::new(2, 2, 1));
    let before = grid.clone();

    let err = grid
        .replace_all(vec![Container::new("C001", Position::new(2, 0, 0))])
        .expect_err("bounds");

    assert_eq!(err.kind(), shared::error::ErrorKind::InvariantViolation);
    assert_eq!(grid, before);
}

#[test]
fn invariants_hold_across_mixed_place_and_remove_sequences() {
    let dimensions = YardDimensions::new(3, 3, 2);
    let mut grid = SpatialGrid::new(dimensions);
    // Small LCG so the sequence is deterministic and covers collisions.
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move |bound: u64| {
        seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        (seed >> 33) % bound
    };

    for step in 0..2_000 {
        let container = id(&format!("C{:02}", next(24)));
        if next(3) == 0 {
            let _ = grid.remove(&container);
        } else {
            let position = Position::new(
                next(5) as i64 - 1,
                next(5) as i64 - 1,
                next(3) as i64,
            );
            let had = grid.by_id(&container).cloned();
            match grid.place(container.clone(), position) {
                Ok(()) => {
                    assert_eq!(
                        grid.occupant_at(position).map(|c| &c.id),
                        Some(&container),
                        "step {step}"
                    );
                }
                Err(_) => assert_eq!(grid.by_id(&container).cloned(), had, "step {step}"),
            }
        }
        assert_consistent(&grid);
        assert!(grid.len() as u64 <= dimensions.capacity());
    }
}
