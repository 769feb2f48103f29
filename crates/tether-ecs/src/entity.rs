//! Entity identity and allocation.
//!
//! An [`Entity`] combines a slot index with a generation counter. Destroying
//! an entity bumps the slot's generation, so any handle issued before the
//! destruction compares unequal to the slot's stored generation and is
//! detectably dead — the index can then be recycled without the ABA problem.

/// Opaque handle to an entity.
///
/// Unique among live entities; a handle outlives its entity only as a dead
/// reference that every registry and store operation treats as "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Slot index. Only meaningful to storage internals.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation counter distinguishing reuses of the same slot.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Allocates and recycles entity handles.
pub struct EntityRegistry {
    /// Current generation per slot. A slot on the free list already carries
    /// the generation its *next* occupant will be issued with.
    generations: Vec<u32>,
    /// Slots available for reuse.
    free: Vec<u32>,
    alive: usize,
}

impl EntityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            free: Vec::new(),
            alive: 0,
        }
    }

    /// Allocates a new entity, recycling a freed slot when one exists.
    pub fn create(&mut self) -> Entity {
        self.alive += 1;
        if let Some(index) = self.free.pop() {
            return Entity {
                index,
                generation: self.generations[index as usize],
            };
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        Entity {
            index,
            generation: 0,
        }
    }

    /// Destroys an entity. Returns `false` if the handle was already dead,
    /// in which case nothing changes.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        // Bump now so every outstanding handle goes stale immediately.
        self.generations[entity.index as usize] = entity.generation.wrapping_add(1);
        self.free.push(entity.index);
        self.alive -= 1;
        true
    }

    /// Returns `true` if the handle refers to a live entity.
    ///
    /// A freed slot already stores the generation its next occupant will be
    /// issued with, and no handle carrying that generation exists until
    /// [`create`](Self::create) recycles the slot — so a generation match is
    /// sufficient.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.generations
            .get(entity.index as usize)
            .is_some_and(|&generation| generation == entity.generation)
    }

    /// Number of currently live entities.
    pub fn alive_count(&self) -> usize {
        self.alive
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
