//! State synchronization between server-authoritative ground truth and the
//! locally simulated world.
//!
//! Three layers, bottom up:
//!
//! - [`Authority`] records who may legally write an entity's pose.
//! - [`ReplicaSync`] replicates server-owned entities: spawn, update, bulk
//!   update, remove. Updates stage an [`InterpolationTarget`]; the
//!   [`InterpolationSystem`] eases the live transform toward it so motion
//!   stays continuous between server packets.
//! - [`ReconciliationEngine`] drives entities that must move locally every
//!   tick but are corrected by the server: fresh snapshots blend (or hard
//!   snap) the runtime position toward ground truth, and when snapshots go
//!   stale the engine falls back to pure local follow simulation with
//!   catch-up speed ramping.
//!
//! Network code only ever calls the staging entry points
//! ([`ReplicaSync::set_interpolation_target`],
//! [`ReconciliationEngine::set_server_snapshot`] and the message appliers);
//! the tick loop is the sole writer of live transforms.

mod authority;
mod messages;
mod reconcile;
mod replica;

pub use authority::{Authority, AuthorityLevel};
pub use messages::{
    BulkUpdate, NetworkId, PoolDelta, Pose, RemoveReason, RemoveReplica, ReplicaKind,
    ResourcePools, SpawnReplica, UpdateReplica,
};
pub use reconcile::{
    FollowConfig, FollowTarget, ReconciliationEngine, ReconciliationSystem, ServerSnapshot,
};
pub use replica::{
    BehaviorTag, InterpolationConfig, InterpolationSystem, InterpolationTarget, ReplicaSync,
};
