//! The Entity Registry: the single authority on entity ids and owners.
//!
//! Mutated only by the Host Loop thread; clients learn about entities
//! exclusively through `EntityCreated` broadcasts.

use std::collections::HashMap;

use netforge_protocol::{ClientId, Entity, EntityId};

pub(crate) struct EntityRegistry {
    /// Next id to hand out; `None` once the u32 space is exhausted.
    /// Ids strictly increase and are never reused, so a stolen or
    /// replayed creation can never alias an older entity.
    next: Option<u32>,
    owners: HashMap<EntityId, ClientId>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            next: Some(0),
            owners: HashMap::new(),
        }
    }

    /// Allocates the next id and binds its owner. Returns `None` when
    /// the id space is spent; exhaustion is permanent, ids never wrap.
    pub fn create(&mut self, owner: ClientId) -> Option<Entity> {
        let id = self.next?;
        self.next = id.checked_add(1);
        let entity = Entity::new(EntityId(id), owner);
        self.owners.insert(entity.id(), owner);
        Some(entity)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }
}

#[cfg(test)]
impl EntityRegistry {
    /// Registry positioned near the end of the id space, for
    /// exhaustion tests that cannot afford four billion inserts.
    fn starting_at(next: u32) -> Self {
        Self {
            next: Some(next),
            owners: HashMap::new(),
        }
    }

    fn owner_of(&self, id: EntityId) -> Option<ClientId> {
        self.owners.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_strictly_increasing_from_zero() {
        let mut registry = EntityRegistry::new();
        let ids: Vec<u32> = (0..5)
            .map(|_| registry.create(ClientId(1)).expect("id space fresh").id().0)
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_owner_is_bound_at_creation() {
        let mut registry = EntityRegistry::new();
        let a = registry.create(ClientId(1)).expect("id space fresh");
        let b = registry.create(ClientId(2)).expect("id space fresh");
        assert_eq!(registry.owner_of(a.id()), Some(ClientId(1)));
        assert_eq!(registry.owner_of(b.id()), Some(ClientId(2)));
    }

    #[test]
    fn test_exhaustion_is_permanent_and_never_wraps() {
        let mut registry = EntityRegistry::starting_at(u32::MAX - 1);
        assert_eq!(
            registry.create(ClientId(1)).map(|e| e.id()),
            Some(EntityId(u32::MAX - 1))
        );
        assert_eq!(
            registry.create(ClientId(1)).map(|e| e.id()),
            Some(EntityId(u32::MAX))
        );
        assert_eq!(registry.create(ClientId(1)), None);
        assert_eq!(registry.create(ClientId(1)), None);
    }
}
