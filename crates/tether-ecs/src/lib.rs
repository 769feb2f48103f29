//! Generic ECS runtime: entity identity, typed component storage, queries,
//! and the ordered system scheduler that drives one simulation tick.
//!
//! The [`World`] owns all state; [`SystemScheduler`] runs systems over it in
//! a fixed order declared once at construction. Network-facing layers build
//! on top of this crate and never bypass it.

mod component;
mod components;
mod entity;
mod lifecycle;
mod query;
mod render_context;
mod schedule;
mod world;

pub use component::Component;
pub use components::{Lifetime, Name, Transform, Velocity};
pub use entity::{Entity, EntityRegistry};
pub use lifecycle::DespawnQueue;
pub use query::QuerySet;
pub use render_context::RenderContext;
pub use schedule::{SchedulerBuilder, System, SystemScheduler, TickDriver};
pub use world::World;
