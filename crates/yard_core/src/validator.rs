//! Local admission checks run before a mutation is sent to the yard service.

use shared::domain::{ContainerId, Position};

use crate::{error::PlacementError, grid::SpatialGrid};

pub struct PlacementValidator;

impl PlacementValidator {
    /// Checks moving `id` to `target`: bounds, then that the cell is empty,
    /// then that `id` is known locally. A container's own cell counts as
    /// occupied.
    pub fn validate(
        grid: &SpatialGrid,
        id: &ContainerId,
        target: Position,
    ) -> Result<(), PlacementError> {
        grid.check_bounds(target)?;

        if let Some(occupant) = grid.occupant_at(target) {
            return Err(PlacementError::PositionOccupied {
                position: target,
                occupant: occupant.id.clone(),
            });
        }

        if grid.by_id(id).is_none() {
            return Err(PlacementError::NotFound(id.clone()));
        }

        Ok(())
    }

    pub fn validate_removal(grid: &SpatialGrid, id: &ContainerId) -> Result<(), PlacementError> {
        if grid.by_id(id).is_none() {
            return Err(PlacementError::NotFound(id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/validator_tests.rs"]
mod tests;
