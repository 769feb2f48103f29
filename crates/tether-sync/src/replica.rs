//! Replication of server-owned entities.
//!
//! Per replica the lifecycle is absent → spawned → updated* → removed.
//! Updates never write the live [`Transform`]; they refresh the staged
//! [`InterpolationTarget`], and the [`InterpolationSystem`] eases the
//! transform toward it every tick. Visible motion therefore stays
//! continuous between the server's lower-frequency packets instead of
//! snapping on arrival.

use glam::Vec2;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use tether_ecs::{Entity, Name, System, Transform, World};
use tether_math::{approach_angle, exp_blend, move_toward};

use crate::authority::Authority;
use crate::messages::{
    BulkUpdate, NetworkId, Pose, RemoveReplica, ResourcePools, SpawnReplica, UpdateReplica,
};

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Staged future pose for a server-owned replica.
///
/// Written only by the network boundary (via [`ReplicaSync`]); consumed by
/// the [`InterpolationSystem`], which is the sole writer of the replica's
/// live transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationTarget {
    /// Target X in world pixels.
    pub x: f32,
    /// Target Y in world pixels.
    pub y: f32,
    /// Target heading in radians.
    pub rotation: f32,
    /// World-clock second the target was staged.
    pub received_at: f64,
}

impl InterpolationTarget {
    fn from_pose(pose: Pose, now: f64) -> Self {
        Self {
            x: pose.x,
            y: pose.y,
            rotation: pose.rotation,
            received_at: now,
        }
    }

    /// The staged pose, without the timestamp.
    pub fn pose(&self) -> Pose {
        Pose {
            x: self.x,
            y: self.y,
            rotation: self.rotation,
        }
    }
}

/// Behavior script tag carried by some replicas (e.g. `"patrol_road"`).
/// Consumed by AI presentation systems; opaque to the sync layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorTag(pub String);

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Tuning for replica pose smoothing.
#[derive(Debug, Clone, Copy)]
pub struct InterpolationConfig {
    /// Exponential convergence rate toward the target (per second).
    pub smoothing_rate: f32,
    /// Hard ceiling on interpolation speed in pixels per second; bounds the
    /// per-tick step to `max_speed * dt`.
    pub max_speed: f32,
    /// Rate for the heading blend (per second).
    pub rotation_rate: f32,
    /// Distance in pixels under which the position snaps onto the target.
    pub snap_epsilon: f32,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            smoothing_rate: 12.0,
            max_speed: 900.0,
            rotation_rate: 16.0,
            snap_epsilon: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// ReplicaSync
// ---------------------------------------------------------------------------

/// Entity lifecycle for server-owned replicas: owns the
/// [`NetworkId`] → [`Entity`] map and applies inbound messages.
pub struct ReplicaSync {
    /// Identifier recorded as the owner on replica authority.
    server_id: u64,
    net_to_local: FxHashMap<NetworkId, Entity>,
}

impl ReplicaSync {
    /// Creates a sync layer that attributes replicas to `server_id`.
    pub fn new(server_id: u64) -> Self {
        Self {
            server_id,
            net_to_local: FxHashMap::default(),
        }
    }

    /// Applies a spawn. Re-spawning a live id is an idempotent update of
    /// its staged pose and pools, never a duplicate create.
    pub fn apply_spawn(&mut self, world: &mut World, msg: &SpawnReplica) -> Entity {
        if let Some(&existing) = self.net_to_local.get(&msg.id) {
            if world.is_alive(existing) {
                debug!(id = msg.id.0, "spawn for live replica treated as update");
                self.stage_pose(world, existing, msg.pose);
                world.add_component(existing, msg.pools);
                if let Some(tag) = &msg.behavior {
                    world.add_component(existing, BehaviorTag(tag.clone()));
                }
                return existing;
            }
            // The mapping outlived its entity; fall through and respawn.
            self.net_to_local.remove(&msg.id);
        }

        let pose = if msg.pose.is_finite() {
            msg.pose
        } else {
            warn!(id = msg.id.0, "non-finite spawn pose coerced to origin");
            msg.pose.sanitized(Pose::ORIGIN)
        };

        let now = world.clock();
        let entity = world.create_entity();
        world.add_component(entity, Transform::new(pose.x, pose.y, pose.rotation));
        world.add_component(entity, InterpolationTarget::from_pose(pose, now));
        world.add_component(entity, Authority::server_owned(self.server_id, now));
        world.add_component(entity, msg.pools);
        world.add_component(entity, Name::new(format!("{:?}#{}", msg.kind, msg.id.0)));
        if let Some(tag) = &msg.behavior {
            world.add_component(entity, BehaviorTag(tag.clone()));
        }

        self.net_to_local.insert(msg.id, entity);
        debug!(id = msg.id.0, %entity, "replica spawned");
        entity
    }

    /// Applies an update to a known replica. Unknown ids are logged and
    /// ignored. The live transform is never written here.
    pub fn apply_update(&mut self, world: &mut World, msg: &UpdateReplica) {
        let Some(entity) = self.live_entity(world, msg.id) else {
            warn!(id = msg.id.0, "update for unknown replica ignored");
            return;
        };

        if let Some(pose) = msg.pose {
            self.stage_pose(world, entity, pose);
        }
        if let Some(delta) = msg.pools {
            if let Some(pools) = world.get_component_mut::<ResourcePools>(entity) {
                delta.apply_to(pools);
            }
        }
        if let Some(tag) = &msg.behavior {
            world.add_component(entity, BehaviorTag(tag.clone()));
        }
    }

    /// Applies a batch of updates in one pass.
    pub fn apply_bulk_update(&mut self, world: &mut World, msg: &BulkUpdate) {
        for update in &msg.updates {
            self.apply_update(world, update);
        }
    }

    /// Destroys a replica and all of its components immediately. Unknown
    /// ids are logged and ignored.
    pub fn apply_remove(&mut self, world: &mut World, msg: &RemoveReplica) -> bool {
        let Some(entity) = self.net_to_local.remove(&msg.id) else {
            warn!(id = msg.id.0, "remove for unknown replica ignored");
            return false;
        };
        let destroyed = world.destroy_entity(entity);
        debug!(id = msg.id.0, reason = ?msg.reason, destroyed, "replica removed");
        destroyed
    }

    /// Staging entry point used by the network boundary: refreshes the
    /// replica's interpolation target without touching its transform.
    pub fn set_interpolation_target(&mut self, world: &mut World, id: NetworkId, pose: Pose) {
        let Some(entity) = self.live_entity(world, id) else {
            warn!(id = id.0, "interpolation target for unknown replica ignored");
            return;
        };
        self.stage_pose(world, entity, pose);
    }

    /// The local entity for a replica id, if it is currently spawned.
    pub fn local_entity(&self, id: NetworkId) -> Option<Entity> {
        self.net_to_local.get(&id).copied()
    }

    /// Number of live replica mappings.
    pub fn replica_count(&self) -> usize {
        self.net_to_local.len()
    }

    fn live_entity(&self, world: &World, id: NetworkId) -> Option<Entity> {
        self.net_to_local
            .get(&id)
            .copied()
            .filter(|&entity| world.is_alive(entity))
    }

    fn stage_pose(&self, world: &mut World, entity: Entity, pose: Pose) {
        let now = world.clock();
        let last_good = world
            .get_component::<InterpolationTarget>(entity)
            .map(InterpolationTarget::pose)
            .unwrap_or(Pose::ORIGIN);
        if !pose.is_finite() {
            warn!(%entity, "non-finite pose coerced to last known-good");
        }
        let clean = pose.sanitized(last_good);
        world.add_component(entity, InterpolationTarget::from_pose(clean, now));
    }
}

// ---------------------------------------------------------------------------
// InterpolationSystem
// ---------------------------------------------------------------------------

/// Advances every replica's transform toward its staged target.
///
/// The step is an exponential blend (frame-rate independent, no overshoot)
/// clamped to `max_speed * dt`, with a snap once inside `snap_epsilon` so
/// replicas actually arrive instead of easing forever.
pub struct InterpolationSystem {
    config: InterpolationConfig,
}

impl InterpolationSystem {
    /// Creates the system with the given smoothing tuning.
    pub fn new(config: InterpolationConfig) -> Self {
        Self { config }
    }
}

impl System for InterpolationSystem {
    fn name(&self) -> &'static str {
        "interpolation"
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        let config = self.config;
        world.for_each_mut::<Transform>(|world, entity, transform| {
            let Some(target) = world.get_component::<InterpolationTarget>(entity) else {
                return;
            };

            let goal = Vec2::new(target.x, target.y);
            let distance = transform.position.distance(goal);
            if distance <= config.snap_epsilon {
                transform.position = goal;
            } else {
                let step = (distance * exp_blend(config.smoothing_rate, dt))
                    .min(config.max_speed * dt);
                transform.position = move_toward(transform.position, goal, step);
            }

            transform.rotation =
                approach_angle(transform.rotation, target.rotation, config.rotation_rate, dt);
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
