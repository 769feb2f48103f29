//! Query engine: entity sets satisfying "has all of components {T1..Tn}".
//!
//! Two modes with different safety contracts:
//!
//! - [`World::entities_with`] is the **live** view. It borrows the world for
//!   the whole iteration, so destroying entities (which needs `&mut World`)
//!   while it runs is rejected at compile time.
//! - [`World::query`] is the **snapshot** view: a materialized `Vec` of the
//!   matching entities at the moment of the call. Systems that destroy
//!   entities mid-iteration must use this mode; a handle destroyed earlier
//!   in the sweep simply reads back as "not found".
//!
//! The intersection starts from the smallest member store, so the cost is
//! bounded by the rarest component, not the most common one.

use crate::component::Component;
use crate::entity::Entity;
use crate::world::World;

/// A tuple of component types acting as a conjunctive filter.
///
/// Implemented for tuples of arity 1 through 4. Type identity comes from
/// the generic parameters; there is no name-based lookup anywhere.
pub trait QuerySet {
    /// `true` if the entity holds every member component.
    fn contains_all(world: &World, entity: Entity) -> bool;

    /// Entities of the smallest member store — the candidate set the
    /// intersection filters down.
    fn seed_entities(world: &World) -> Vec<Entity>;
}

macro_rules! impl_query_set {
    ($($member:ident),+) => {
        impl<$($member: Component),+> QuerySet for ($($member,)+) {
            fn contains_all(world: &World, entity: Entity) -> bool {
                $(world.has_component::<$member>(entity))&&+
            }

            fn seed_entities(world: &World) -> Vec<Entity> {
                let members: &[(usize, fn(&World) -> Vec<Entity>)] = &[
                    $((world.store_size::<$member>(), |w: &World| w.store_entities::<$member>())),+
                ];
                let Some(smallest) = members
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, (size, _))| *size)
                    .map(|(i, _)| i)
                else {
                    return Vec::new();
                };
                if members[smallest].0 == 0 {
                    // Some member has no instances: the intersection is empty.
                    return Vec::new();
                }
                (members[smallest].1)(world)
            }
        }
    };
}

impl_query_set!(A);
impl_query_set!(A, B);
impl_query_set!(A, B, C);
impl_query_set!(A, B, C, D);

impl World {
    /// Live view: iterates entities holding every component in `Q`.
    ///
    /// Borrows the world; structural changes during iteration are a compile
    /// error. Use [`query`](Self::query) when the loop body destroys.
    pub fn entities_with<Q: QuerySet>(&self) -> impl Iterator<Item = Entity> + '_ {
        Q::seed_entities(self)
            .into_iter()
            .filter(move |entity| Q::contains_all(self, *entity))
    }

    /// Snapshot view: the matching entity set, materialized.
    pub fn query<Q: QuerySet>(&self) -> Vec<Entity> {
        self.entities_with::<Q>().collect()
    }
}
