//! The [`World`]: entity registry, component stores, and the simulation
//! clock, behind one facade.

use std::any::TypeId;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::component::{AnyStore, Component, ComponentStore};
use crate::entity::{Entity, EntityRegistry};

/// Top-level container for all simulation state.
///
/// Every operation on a dead or stale entity handle is a no-op that reports
/// "not found"; nothing here panics on bad handles.
pub struct World {
    entities: EntityRegistry,
    stores: FxHashMap<TypeId, Box<dyn AnyStore>>,
    /// Simulation-time seconds, advanced once per tick by the scheduler.
    /// All timestamps (message arrival, authority updates) use this clock,
    /// which keeps staleness arithmetic deterministic under test.
    clock: f64,
}

impl World {
    /// Creates an empty world at clock zero.
    pub fn new() -> Self {
        Self {
            entities: EntityRegistry::new(),
            stores: FxHashMap::default(),
            clock: 0.0,
        }
    }

    // -----------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------

    /// Allocates a new entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        self.entities.create()
    }

    /// Destroys an entity, immediately freeing all of its components and
    /// invalidating every outstanding handle to it. Returns `false` if the
    /// handle was already dead.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.entities.destroy(entity) {
            trace!(%entity, "destroy of dead entity ignored");
            return false;
        }
        for store in self.stores.values_mut() {
            store.remove_entity(entity);
        }
        true
    }

    /// Returns `true` if the handle refers to a live entity.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities.
    pub fn alive_count(&self) -> usize {
        self.entities.alive_count()
    }

    // -----------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------

    /// Attaches a component to a live entity, overwriting any existing
    /// instance of the same type. Returns `false` (and does nothing) for a
    /// dead handle.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        if !self.entities.is_alive(entity) {
            trace!(%entity, "add_component on dead entity ignored");
            return false;
        }
        self.stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentStore::<T>::new()))
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .map(|store| {
                store.insert(entity, value);
            })
            .is_some()
    }

    /// Reads a component, or `None` when the entity is dead or lacks one.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.store::<T>()?.get(entity)
    }

    /// Mutable access to a component.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.store_mut::<T>()?.get_mut(entity)
    }

    /// Returns `true` if the entity is live and holds a `T`.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.store::<T>().is_some_and(|store| store.contains(entity))
    }

    /// Detaches and returns the entity's component, if present.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.store_mut::<T>()?.remove(entity)
    }

    // -----------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------

    /// Simulation-time seconds since the world was created.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Advances the simulation clock. The scheduler calls this once per
    /// tick before running systems; embedders driving the world manually
    /// (tests, tools) call it themselves.
    pub fn advance_clock(&mut self, dt: f64) {
        self.clock += dt;
    }

    // -----------------------------------------------------------------
    // Store plumbing (used by the query engine)
    // -----------------------------------------------------------------

    pub(crate) fn store<T: Component>(&self) -> Option<&ComponentStore<T>> {
        self.stores
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
    }

    pub(crate) fn store_mut<T: Component>(&mut self) -> Option<&mut ComponentStore<T>> {
        self.stores
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
    }

    /// Number of entities holding a `T` (zero when the store is absent).
    pub(crate) fn store_size<T: Component>(&self) -> usize {
        self.store::<T>().map_or(0, ComponentStore::len)
    }

    /// Snapshot of the entities holding a `T`.
    pub(crate) fn store_entities<T: Component>(&self) -> Vec<Entity> {
        self.store::<T>()
            .map(|store| store.entities().collect())
            .unwrap_or_default()
    }

    /// Runs `f` once per entity holding a `T`, with in-place mutable access
    /// to the component and read access to the rest of the world.
    ///
    /// The `T` store is detached from the world for the duration of the
    /// pass (reads of `T` through `world` inside `f` return `None`), which
    /// is what makes the simultaneous `&World` + `&mut T` borrows sound.
    /// Because `f` only receives `&World`, destroying entities mid-pass is
    /// a compile error — systems that destroy must use a snapshot query.
    pub fn for_each_mut<T: Component>(&mut self, mut f: impl FnMut(&World, Entity, &mut T)) {
        let Some(mut boxed) = self.stores.remove(&TypeId::of::<T>()) else {
            return;
        };
        if let Some(store) = boxed.as_any_mut().downcast_mut::<ComponentStore<T>>() {
            for (entity, value) in store.iter_mut() {
                if self.entities.is_alive(entity) {
                    f(self, entity, value);
                }
            }
        }
        self.stores.insert(TypeId::of::<T>(), boxed);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Transform, Velocity};

    #[test]
    fn test_components_attach_and_read_back() {
        let mut world = World::new();
        let e = world.create_entity();
        assert!(world.add_component(e, Transform::from_xy(10.0, 20.0)));
        assert!(world.add_component(e, Velocity::new(1.0, 0.0)));

        let transform = world.get_component::<Transform>(e).unwrap();
        assert_eq!(transform.position.x, 10.0);
        assert!(world.has_component::<Velocity>(e));
    }

    #[test]
    fn test_adding_twice_overwrites() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Velocity::new(1.0, 0.0));
        world.add_component(e, Velocity::new(9.0, 0.0));
        assert_eq!(world.get_component::<Velocity>(e).unwrap().0.x, 9.0);
        assert_eq!(world.store_size::<Velocity>(), 1);
    }

    #[test]
    fn test_destroy_frees_all_components() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Transform::default());
        world.add_component(e, Velocity::default());

        assert!(world.destroy_entity(e));
        assert_eq!(world.store_size::<Transform>(), 0);
        assert_eq!(world.store_size::<Velocity>(), 0);
        assert!(world.get_component::<Transform>(e).is_none());
    }

    #[test]
    fn test_dead_handle_operations_report_not_found() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Transform::default());
        world.destroy_entity(e);

        assert!(!world.add_component(e, Velocity::default()));
        assert!(world.get_component::<Transform>(e).is_none());
        assert!(world.get_component_mut::<Transform>(e).is_none());
        assert!(!world.has_component::<Transform>(e));
        assert!(world.remove_component::<Transform>(e).is_none());
        assert!(!world.destroy_entity(e));
    }

    #[test]
    fn test_recreated_entity_starts_without_components() {
        let mut world = World::new();
        let old = world.create_entity();
        world.add_component(old, Transform::from_xy(5.0, 5.0));
        world.destroy_entity(old);

        let new = world.create_entity();
        assert_eq!(new.index(), old.index());
        assert!(world.get_component::<Transform>(new).is_none());
        // The stale handle cannot reach the new occupant.
        assert!(world.get_component::<Transform>(old).is_none());
    }

    #[test]
    fn test_remove_component_returns_value() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Velocity::new(3.0, 4.0));

        let removed = world.remove_component::<Velocity>(e).unwrap();
        assert_eq!(removed.0.y, 4.0);
        assert!(!world.has_component::<Velocity>(e));
        assert!(world.is_alive(e));
    }

    #[test]
    fn test_for_each_mut_mutates_in_place() {
        let mut world = World::new();
        for i in 0..3 {
            let e = world.create_entity();
            world.add_component(e, Transform::from_xy(i as f32, 0.0));
        }

        world.for_each_mut::<Transform>(|_, _, transform| {
            transform.position.y = 7.0;
        });

        for e in world.store_entities::<Transform>() {
            assert_eq!(world.get_component::<Transform>(e).unwrap().position.y, 7.0);
        }
    }

    #[test]
    fn test_for_each_mut_can_read_other_components() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Transform::default());
        world.add_component(e, Velocity::new(2.0, 0.0));

        world.for_each_mut::<Transform>(|world, entity, transform| {
            if let Some(vel) = world.get_component::<Velocity>(entity) {
                transform.position += vel.0;
            }
        });

        assert_eq!(world.get_component::<Transform>(e).unwrap().position.x, 2.0);
    }

    #[test]
    fn test_clock_starts_at_zero() {
        let world = World::new();
        assert_eq!(world.clock(), 0.0);
    }
}
