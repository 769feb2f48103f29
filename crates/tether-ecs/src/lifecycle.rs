//! Deferred entity destruction.
//!
//! Systems that decide *during* a live pass which entities must go cannot
//! destroy them on the spot (the pass borrows the world). They enqueue the
//! handles here and a later point in the tick flushes the queue.

use crate::entity::Entity;
use crate::world::World;

/// Queue of entities awaiting destruction.
#[derive(Default)]
pub struct DespawnQueue {
    pending: Vec<Entity>,
}

impl DespawnQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an entity. Duplicates are allowed; the second destruction is
    /// a no-op at flush time.
    pub fn enqueue(&mut self, entity: Entity) {
        self.pending.push(entity);
    }

    /// Destroys all queued entities. Returns how many were actually
    /// destroyed (stale handles and duplicates are skipped).
    pub fn flush(&mut self, world: &mut World) -> usize {
        self.pending
            .drain(..)
            .filter(|&entity| world.destroy_entity(entity))
            .count()
    }

    /// Number of queued entities.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_destroys_queued_entities() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();

        let mut queue = DespawnQueue::new();
        queue.enqueue(a);
        queue.enqueue(b);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.flush(&mut world), 2);
        assert!(queue.is_empty());
        assert!(!world.is_alive(a));
        assert!(!world.is_alive(b));
    }

    #[test]
    fn test_duplicates_count_once() {
        let mut world = World::new();
        let e = world.create_entity();

        let mut queue = DespawnQueue::new();
        queue.enqueue(e);
        queue.enqueue(e);

        assert_eq!(queue.flush(&mut world), 1);
    }

    #[test]
    fn test_stale_handles_are_skipped() {
        let mut world = World::new();
        let e = world.create_entity();
        world.destroy_entity(e);

        let mut queue = DespawnQueue::new();
        queue.enqueue(e);
        assert_eq!(queue.flush(&mut world), 0);
    }
}
