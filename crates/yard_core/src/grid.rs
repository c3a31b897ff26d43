use std::collections::{hash_map::Entry, HashMap};

use shared::domain::{Container, ContainerId, Position, YardDimensions};

use crate::error::GridError;

/// Authoritative placement of containers inside a bounded yard.
///
/// Two indexes are kept in lockstep: position to occupant id, and id to
/// container. A container is present in both or in neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialGrid {
    dimensions: YardDimensions,
    by_position: HashMap<Position, ContainerId>,
    by_id: HashMap<ContainerId, Container>,
}

impl SpatialGrid {
    pub fn new(dimensions: YardDimensions) -> Self {
        Self {
            dimensions,
            by_position: HashMap::new(),
            by_id: HashMap::new(),
        }
    }

    pub fn dimensions(&self) -> YardDimensions {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn check_bounds(&self, position: Position) -> Result<(), GridError> {
        if self.dimensions.contains(position) {
            Ok(())
        } else {
            Err(GridError::OutOfBounds {
                position,
                dimensions: self.dimensions,
            })
        }
    }

    pub fn place(&mut self, id: ContainerId, position: Position) -> Result<(), GridError> {
        self.check_bounds(position)?;

        if let Some(existing) = self.by_id.get(&id) {
            if existing.position == position {
                return Ok(());
            }
            return Err(GridError::DuplicateId {
                id,
                existing: existing.position,
            });
        }

        match self.by_position.entry(position) {
            Entry::Occupied(slot) => Err(GridError::PositionOccupied {
                position,
                occupant: slot.get().clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(id.clone());
                self.by_id.insert(id.clone(), Container { id, position });
                Ok(())
            }
        }
    }

    pub fn remove(&mut self, id: &ContainerId) -> Result<Container, GridError> {
        let container = self
            .by_id
            .remove(id)
            .ok_or_else(|| GridError::NotFound(id.clone()))?;
        self.by_position.remove(&container.position);
        Ok(container)
    }

    /// Swaps in a full container set from a re-sync. The incoming set is
    /// checked in full before anything is touched.
    pub fn replace_all<I>(&mut self, containers: I) -> Result<(), GridError>
    where
        I: IntoIterator<Item = Container>,
    {
        let mut by_position = HashMap::new();
        let mut by_id = HashMap::new();

        for container in containers {
            if !self.dimensions.contains(container.position) {
                return Err(GridError::InvariantViolation(format!(
                    "container {} at {} is outside the yard bounds {}",
                    container.id, container.position, self.dimensions
                )));
            }
            if let Some(other) = by_position.insert(container.position, container.id.clone()) {
                return Err(GridError::InvariantViolation(format!(
                    "containers {} and {} share position {}",
                    other, container.id, container.position
                )));
            }
            if by_id.contains_key(&container.id) {
                return Err(GridError::InvariantViolation(format!(
                    "container id {} appears more than once",
                    container.id
                )));
            }
            by_id.insert(container.id.clone(), container);
        }

        self.by_position = by_position;
        self.by_id = by_id;
        Ok(())
    }

    pub fn occupant_at(&self, position: Position) -> Option<&Container> {
        self.by_position
            .get(&position)
            .and_then(|id| self.by_id.get(id))
    }

    pub fn by_id(&self, id: &ContainerId) -> Option<&Container> {
        self.by_id.get(id)
    }

    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.by_id.values()
    }

    /// Containers ordered by id, for stable rendering and comparisons.
    pub fn sorted_containers(&self) -> Vec<Container> {
        let mut containers = self.containers().cloned().collect::<Vec<_>>();
        containers.sort_by(|a, b| a.id.cmp(&b.id));
        containers
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(YardDimensions::default())
    }
}

#[cfg(test)]
#[path = "tests/grid_tests.rs"]
mod tests;
