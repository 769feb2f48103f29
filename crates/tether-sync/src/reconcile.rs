//! Predict-then-correct blending for locally simulated, server-corrected
//! entities.
//!
//! A tracked entity moves every tick no matter what the network does. While
//! a fresh [`ServerSnapshot`] is available the runtime position converges
//! toward it (or hard-snaps across large gaps the local model cannot
//! explain). Once snapshots go stale the engine falls back to pure local
//! simulation: chase a low-pass-filtered follow target with a speed that
//! ramps up with distance and decays near arrival. Orientation always comes
//! from the motion actually performed, never from where the target happens
//! to be.

use glam::Vec2;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use tether_ecs::{Entity, System, Transform, Velocity, World};
use tether_math::{exp_blend, heading_from_displacement, lerp, remap_clamped, sanitize_vec2};

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Staged authoritative position for a reconciled entity.
///
/// Written only through [`ReconciliationEngine::set_server_snapshot`];
/// consumed by the engine and discarded once older than the staleness
/// bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerSnapshot {
    /// Authoritative X in world pixels.
    pub x: f32,
    /// Authoritative Y in world pixels.
    pub y: f32,
    /// World-clock second the snapshot arrived.
    pub received_at: f64,
}

/// Marks an entity as reconciled and names the reference entity its local
/// fallback simulation follows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowTarget {
    /// The entity whose pose and velocity drive the fallback target.
    pub owner: Entity,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Tuning for the reconciliation engine. Defaults fit a companion-scale
/// follower; the same engine drives any predicted entity with different
/// numbers.
#[derive(Debug, Clone, Copy)]
pub struct FollowConfig {
    /// Preferred trailing distance behind the owner, in pixels.
    pub follow_distance: f32,
    /// Radius inside which the applied step is scaled down to avoid
    /// oscillating around the target.
    pub slowdown_distance: f32,
    /// Distance under which the position snaps onto the target.
    pub arrive_epsilon: f32,
    /// Cruise speed in pixels per second.
    pub base_speed: f32,
    /// Maximum catch-up speed in pixels per second.
    pub catchup_speed: f32,
    /// Reference distance for the catch-up ramp.
    pub catchup_distance: f32,
    /// Ramp begins at `catchup_distance * catchup_start_ratio`.
    pub catchup_start_ratio: f32,
    /// Full catch-up speed at `catchup_distance * catchup_full_ratio`.
    pub catchup_full_ratio: f32,
    /// Rate for smoothing the commanded speed tick-to-tick (per second).
    pub speed_smoothing: f32,
    /// Low-pass rate for the follow target while the owner moves.
    pub target_filter_moving: f32,
    /// Stiffer low-pass rate once the owner stands still, absorbing
    /// upstream jitter.
    pub target_filter_idle: f32,
    /// Owner speeds below this count as stationary, in pixels per second.
    pub idle_speed_threshold: f32,
    /// Minimum per-tick displacement (pixels) that may rotate the entity
    /// while the owner is stationary.
    pub rotation_deadband: f32,
    /// Snapshots older than this many seconds are discarded.
    pub snapshot_stale_after: f64,
    /// Gap beyond which a fresh snapshot teleports instead of blending.
    pub hard_snap_distance: f32,
    /// Rate of the exponential convergence toward fresh snapshots.
    pub converge_rate: f32,
    /// Gap between runtime state and the live transform that means some
    /// external system teleported the entity; the runtime state re-seeds.
    pub teleport_distance: f32,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            follow_distance: 60.0,
            slowdown_distance: 28.0,
            arrive_epsilon: 1.0,
            base_speed: 140.0,
            catchup_speed: 420.0,
            catchup_distance: 240.0,
            catchup_start_ratio: 0.35,
            catchup_full_ratio: 1.0,
            speed_smoothing: 6.0,
            target_filter_moving: 10.0,
            target_filter_idle: 3.0,
            idle_speed_threshold: 4.0,
            rotation_deadband: 0.75,
            snapshot_stale_after: 0.6,
            hard_snap_distance: 300.0,
            converge_rate: 10.0,
            teleport_distance: 1200.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime side state
// ---------------------------------------------------------------------------

/// Per-entity runtime simulation state. Deliberately kept outside the
/// component model: it is scratch state owned by the engine, re-seeded on
/// teleport and dropped the moment the entity stops being tracked.
#[derive(Debug, Clone, Copy)]
struct RuntimeSimState {
    position: Vec2,
    rotation: f32,
    current_speed: f32,
    filtered_target: Vec2,
    has_filtered_target: bool,
}

impl RuntimeSimState {
    fn seeded_from(transform: &Transform) -> Self {
        Self {
            position: transform.position,
            rotation: transform.rotation,
            current_speed: 0.0,
            filtered_target: transform.position,
            has_filtered_target: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Blends local predictive simulation with periodic authoritative
/// snapshots for every entity carrying [`FollowTarget`].
pub struct ReconciliationEngine {
    config: FollowConfig,
    states: FxHashMap<Entity, RuntimeSimState>,
}

impl ReconciliationEngine {
    /// Creates an engine with the given tuning.
    pub fn new(config: FollowConfig) -> Self {
        Self {
            config,
            states: FxHashMap::default(),
        }
    }

    /// The active tuning.
    pub fn config(&self) -> &FollowConfig {
        &self.config
    }

    /// Number of entities with live runtime state.
    pub fn tracked_count(&self) -> usize {
        self.states.len()
    }

    /// Staging entry point used by the network boundary: records an
    /// authoritative position for a reconciled entity. Non-finite
    /// coordinates are coerced to the last staged (or live) value; dead
    /// handles are ignored.
    pub fn set_server_snapshot(world: &mut World, entity: Entity, x: f32, y: f32) {
        if !world.is_alive(entity) {
            warn!(%entity, "snapshot for dead entity ignored");
            return;
        }
        let fallback = world
            .get_component::<ServerSnapshot>(entity)
            .map(|snap| Vec2::new(snap.x, snap.y))
            .or_else(|| {
                world
                    .get_component::<Transform>(entity)
                    .map(|t| t.position)
            })
            .unwrap_or(Vec2::ZERO);
        if !x.is_finite() || !y.is_finite() {
            warn!(%entity, "non-finite snapshot coerced to last known-good");
        }
        let clean = sanitize_vec2(Vec2::new(x, y), fallback);
        let received_at = world.clock();
        world.add_component(
            entity,
            ServerSnapshot {
                x: clean.x,
                y: clean.y,
                received_at,
            },
        );
    }

    /// Advances every tracked entity by one tick and writes the results
    /// back to their transforms.
    pub fn step(&mut self, world: &mut World, dt: f32) {
        let now = world.clock();
        let tracked = world.query::<(Transform, FollowTarget)>();

        // Drop runtime state for entities that stopped being tracked.
        self.states.retain(|entity, _| tracked.contains(entity));

        for entity in tracked {
            // A query match can still lose its transform mid-tick; skip,
            // never throw.
            let Some(transform) = world.get_component::<Transform>(entity).copied() else {
                continue;
            };
            let mut state = *self
                .states
                .entry(entity)
                .or_insert_with(|| RuntimeSimState::seeded_from(&transform));

            // Teleport detection: an external system moved the entity
            // farther than the local model can explain, so pull the runtime
            // state to the authoritative transform instead of dragging the
            // entity back.
            if transform.position.distance(state.position) > self.config.teleport_distance {
                debug!(%entity, "teleport detected, reseeding runtime state");
                state = RuntimeSimState::seeded_from(&transform);
            }

            let position_before = state.position;
            let owner_idle = self.step_once(world, entity, &mut state, now, dt);

            // Orientation follows the displacement actually performed this
            // tick. The deadband widens while the owner is stationary so
            // target recomputation jitter cannot wiggle the heading.
            let deadband = if owner_idle {
                self.config.rotation_deadband
            } else {
                1e-3
            };
            if let Some(heading) =
                heading_from_displacement(state.position - position_before, deadband)
            {
                state.rotation = heading;
            }

            self.states.insert(entity, state);
            if let Some(live) = world.get_component_mut::<Transform>(entity) {
                live.position = state.position;
                live.rotation = state.rotation;
            }
        }
    }

    /// One tick of movement for a single entity. Returns whether the
    /// reference entity was considered stationary (for the rotation
    /// deadband).
    fn step_once(
        &self,
        world: &mut World,
        entity: Entity,
        state: &mut RuntimeSimState,
        now: f64,
        dt: f32,
    ) -> bool {
        // Fresh snapshot: converge toward ground truth.
        if let Some(snapshot) = world.get_component::<ServerSnapshot>(entity).copied() {
            if now - snapshot.received_at <= self.config.snapshot_stale_after {
                let goal = Vec2::new(snapshot.x, snapshot.y);
                if state.position.distance(goal) > self.config.hard_snap_distance {
                    // The server moved the entity through something the
                    // local simulation does not model. Snap exactly.
                    state.position = goal;
                    state.current_speed = 0.0;
                    state.has_filtered_target = false;
                } else {
                    state.position +=
                        (goal - state.position) * exp_blend(self.config.converge_rate, dt);
                }
                return false;
            }
            debug!(%entity, "stale snapshot discarded");
            world.remove_component::<ServerSnapshot>(entity);
        }

        // No fresh snapshot: pure local simulation.
        let Some(owner) = world
            .get_component::<FollowTarget>(entity)
            .map(|follow| follow.owner)
        else {
            return true;
        };
        let Some(owner_transform) = world.get_component::<Transform>(owner).copied() else {
            // Owner gone (or dead handle): hold position this tick.
            return true;
        };
        let owner_velocity = world
            .get_component::<Velocity>(owner)
            .map(|v| v.0)
            .unwrap_or(Vec2::ZERO);

        let owner_speed = owner_velocity.length();
        let owner_idle = owner_speed < self.config.idle_speed_threshold;
        let trail_direction = if owner_idle {
            Vec2::new(owner_transform.rotation.cos(), owner_transform.rotation.sin())
        } else {
            owner_velocity / owner_speed
        };
        let desired = owner_transform.position - trail_direction * self.config.follow_distance;

        // Low-pass the target itself so upstream jitter is absorbed before
        // the chase, with a stiffer filter while the owner stands still.
        if state.has_filtered_target {
            let rate = if owner_idle {
                self.config.target_filter_idle
            } else {
                self.config.target_filter_moving
            };
            state.filtered_target += (desired - state.filtered_target) * exp_blend(rate, dt);
        } else {
            state.filtered_target = desired;
            state.has_filtered_target = true;
        }

        let offset = state.filtered_target - state.position;
        let distance = offset.length();
        if distance <= self.config.arrive_epsilon {
            state.position = state.filtered_target;
            state.current_speed = 0.0;
            return owner_idle;
        }

        // Speed ramps with distance: cruise below the start of the band,
        // full catch-up past its end, smoothed so it never jumps.
        let ramp_start = self.config.catchup_distance * self.config.catchup_start_ratio;
        let ramp_full = self.config.catchup_distance * self.config.catchup_full_ratio;
        let commanded = lerp(
            self.config.base_speed,
            self.config.catchup_speed,
            remap_clamped(distance, ramp_start, ramp_full),
        );
        state.current_speed +=
            (commanded - state.current_speed) * exp_blend(self.config.speed_smoothing, dt);

        let mut step = state.current_speed * dt;
        if distance < self.config.slowdown_distance {
            step *= distance / self.config.slowdown_distance;
        }
        step = step.min(distance);
        state.position += offset * (step / distance);
        owner_idle
    }
}

// ---------------------------------------------------------------------------
// System adapter
// ---------------------------------------------------------------------------

/// Scheduler-facing wrapper around [`ReconciliationEngine`]. Must run
/// before render and after whatever system moves the owner.
pub struct ReconciliationSystem {
    engine: ReconciliationEngine,
}

impl ReconciliationSystem {
    /// Creates the system with the given tuning.
    pub fn new(config: FollowConfig) -> Self {
        Self {
            engine: ReconciliationEngine::new(config),
        }
    }

    /// Read access to the wrapped engine.
    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }
}

impl System for ReconciliationSystem {
    fn name(&self) -> &'static str {
        "reconciliation"
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        self.engine.step(world, dt);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    /// Owner plus tracked follower, both at explicit positions.
    fn follower_world(
        owner_pos: Vec2,
        owner_vel: Vec2,
        follower_pos: Vec2,
    ) -> (World, Entity, Entity) {
        let mut world = World::new();
        let owner = world.create_entity();
        world.add_component(owner, Transform::from_xy(owner_pos.x, owner_pos.y));
        world.add_component(owner, Velocity(owner_vel));

        let follower = world.create_entity();
        world.add_component(
            follower,
            Transform::from_xy(follower_pos.x, follower_pos.y),
        );
        world.add_component(follower, FollowTarget { owner });
        (world, owner, follower)
    }

    /// Advances the world clock the way the scheduler would, then steps
    /// the engine.
    fn tick(engine: &mut ReconciliationEngine, world: &mut World, ticks: u32) {
        for _ in 0..ticks {
            world.advance_clock(f64::from(DT));
            engine.step(world, DT);
        }
    }

    #[test]
    fn test_hard_snap_replaces_position_exactly() {
        let (mut world, _, follower) =
            follower_world(Vec2::ZERO, Vec2::ZERO, Vec2::new(0.0, 0.0));
        let mut engine = ReconciliationEngine::new(FollowConfig::default());

        // Seed the runtime state.
        tick(&mut engine, &mut world, 1);

        ReconciliationEngine::set_server_snapshot(&mut world, follower, 900.0, -400.0);
        tick(&mut engine, &mut world, 1);

        let transform = world.get_component::<Transform>(follower).unwrap();
        assert_eq!(
            transform.position,
            Vec2::new(900.0, -400.0),
            "beyond the snap threshold the replacement must be exact"
        );
    }

    #[test]
    fn test_fresh_snapshot_converges_without_overshoot() {
        let (mut world, _, follower) = follower_world(Vec2::ZERO, Vec2::ZERO, Vec2::ZERO);
        let mut engine = ReconciliationEngine::new(FollowConfig::default());
        tick(&mut engine, &mut world, 1);

        // 200 px gap: below the 300 px hard-snap threshold.
        ReconciliationEngine::set_server_snapshot(&mut world, follower, 200.0, 0.0);

        let goal = Vec2::new(200.0, 0.0);
        let mut last_distance = world
            .get_component::<Transform>(follower)
            .unwrap()
            .position
            .distance(goal);
        // Snapshot stays fresh for 0.6 s = 36 ticks.
        for _ in 0..30 {
            tick(&mut engine, &mut world, 1);
            let pos = world.get_component::<Transform>(follower).unwrap().position;
            let distance = pos.distance(goal);
            assert!(distance <= last_distance + 1e-4, "must not overshoot");
            last_distance = distance;
        }
        assert!(
            last_distance < 2.0,
            "should be nearly converged, still {last_distance} px away"
        );
    }

    #[test]
    fn test_stale_snapshot_is_ignored_and_discarded() {
        let owner_pos = Vec2::new(500.0, 500.0);
        let (mut world, _, follower) =
            follower_world(owner_pos, Vec2::new(50.0, 0.0), Vec2::new(400.0, 500.0));
        let mut engine = ReconciliationEngine::new(FollowConfig::default());
        tick(&mut engine, &mut world, 1);

        // Stage a snapshot far away from the local fallback target, then
        // let it age past the staleness bound without replacement.
        ReconciliationEngine::set_server_snapshot(&mut world, follower, 0.0, 0.0);
        tick(&mut engine, &mut world, 150); // 2.5 s >> 0.6 s bound

        assert!(
            world.get_component::<ServerSnapshot>(follower).is_none(),
            "stale snapshot must be discarded"
        );
        // The follower headed for the local follow target, not the stale
        // snapshot at the origin.
        let pos = world.get_component::<Transform>(follower).unwrap().position;
        let fallback_target = Vec2::new(500.0 - engine.config().follow_distance, 500.0);
        assert!(
            pos.distance(fallback_target) < pos.distance(Vec2::ZERO),
            "diverged toward {pos:?}, expected pull toward {fallback_target:?}"
        );
    }

    #[test]
    fn test_follower_converges_behind_moving_owner() {
        let owner_pos = Vec2::new(500.0, 500.0);
        let (mut world, _, follower) =
            follower_world(owner_pos, Vec2::new(50.0, 0.0), Vec2::new(100.0, 500.0));
        let config = FollowConfig::default();
        let mut engine = ReconciliationEngine::new(config);

        tick(&mut engine, &mut world, 600); // 10 s, no snapshots at all

        let pos = world.get_component::<Transform>(follower).unwrap().position;
        let expected = Vec2::new(500.0 - config.follow_distance, 500.0);
        assert!(
            pos.distance(expected) < 2.0,
            "follower at {pos:?}, expected near {expected:?}"
        );
    }

    #[test]
    fn test_catchup_speed_ramps_and_respects_maximum() {
        let owner_pos = Vec2::new(1000.0, 0.0);
        // Start far behind: well past the full-catch-up distance.
        let (mut world, _, follower) =
            follower_world(owner_pos, Vec2::new(50.0, 0.0), Vec2::ZERO);
        let config = FollowConfig::default();
        let mut engine = ReconciliationEngine::new(config);
        tick(&mut engine, &mut world, 1);

        let mut previous = world.get_component::<Transform>(follower).unwrap().position;
        let mut peak_speed = 0.0f32;
        for _ in 0..600 {
            tick(&mut engine, &mut world, 1);
            let pos = world.get_component::<Transform>(follower).unwrap().position;
            let speed = pos.distance(previous) / DT;
            assert!(
                speed <= config.catchup_speed + 1.0,
                "applied speed {speed} exceeds the catch-up maximum"
            );
            peak_speed = peak_speed.max(speed);
            previous = pos;
        }
        assert!(
            peak_speed > config.base_speed,
            "speed never ramped above cruise ({peak_speed})"
        );
    }

    #[test]
    fn test_distance_non_increasing_inside_slowdown_radius() {
        let owner_pos = Vec2::new(200.0, 0.0);
        let (mut world, _, follower) =
            follower_world(owner_pos, Vec2::new(50.0, 0.0), Vec2::new(100.0, 0.0));
        let config = FollowConfig::default();
        let mut engine = ReconciliationEngine::new(config);

        let target = Vec2::new(200.0 - config.follow_distance, 0.0);
        let mut inside_slowdown = false;
        let mut last_distance = f32::INFINITY;
        for _ in 0..600 {
            tick(&mut engine, &mut world, 1);
            let pos = world.get_component::<Transform>(follower).unwrap().position;
            let distance = pos.distance(target);
            if inside_slowdown {
                assert!(
                    distance <= last_distance + 1e-3,
                    "distance grew inside the slowdown radius: {distance} > {last_distance}"
                );
            }
            if distance < config.slowdown_distance {
                inside_slowdown = true;
            }
            last_distance = distance;
        }
        assert!(inside_slowdown, "never reached the slowdown radius");
    }

    #[test]
    fn test_teleport_reseeds_runtime_state() {
        let (mut world, _, follower) =
            follower_world(Vec2::new(100.0, 0.0), Vec2::ZERO, Vec2::ZERO);
        let mut engine = ReconciliationEngine::new(FollowConfig::default());
        tick(&mut engine, &mut world, 5);

        // An external system (scene change, scripted warp) moves the
        // entity far beyond the teleport threshold.
        world.get_component_mut::<Transform>(follower).unwrap().position =
            Vec2::new(5000.0, 5000.0);
        tick(&mut engine, &mut world, 1);

        let pos = world.get_component::<Transform>(follower).unwrap().position;
        assert!(
            pos.distance(Vec2::new(5000.0, 5000.0)) < 20.0,
            "runtime state must re-seed at the warp destination, got {pos:?}"
        );
    }

    #[test]
    fn test_rotation_follows_actual_displacement() {
        let owner_pos = Vec2::new(0.0, 500.0);
        // Owner "moves" +Y; follower starts directly below the target, so
        // its motion is straight up.
        let (mut world, _, follower) =
            follower_world(owner_pos, Vec2::new(0.0, 50.0), Vec2::new(0.0, 0.0));
        let mut engine = ReconciliationEngine::new(FollowConfig::default());

        tick(&mut engine, &mut world, 30);

        let rotation = world.get_component::<Transform>(follower).unwrap().rotation;
        assert!(
            (rotation - std::f32::consts::FRAC_PI_2).abs() < 0.1,
            "heading {rotation} should face +Y"
        );
    }

    #[test]
    fn test_idle_owner_does_not_jitter_rotation() {
        let owner_pos = Vec2::new(100.0, 100.0);
        let (mut world, _, follower) =
            follower_world(owner_pos, Vec2::ZERO, Vec2::new(40.0, 100.0));
        let mut engine = ReconciliationEngine::new(FollowConfig::default());

        // Settle completely.
        tick(&mut engine, &mut world, 600);
        let settled_rotation = world.get_component::<Transform>(follower).unwrap().rotation;

        // Target recomputation alone produces sub-deadband displacement;
        // the heading must not wiggle.
        tick(&mut engine, &mut world, 60);
        let rotation = world.get_component::<Transform>(follower).unwrap().rotation;
        assert_eq!(rotation, settled_rotation, "idle heading must hold still");
    }

    #[test]
    fn test_snapshot_for_dead_entity_is_ignored() {
        let mut world = World::new();
        let e = world.create_entity();
        world.destroy_entity(e);
        ReconciliationEngine::set_server_snapshot(&mut world, e, 10.0, 10.0);
        assert!(world.get_component::<ServerSnapshot>(e).is_none());
    }

    #[test]
    fn test_non_finite_snapshot_is_coerced() {
        let (mut world, _, follower) = follower_world(Vec2::ZERO, Vec2::ZERO, Vec2::ZERO);
        ReconciliationEngine::set_server_snapshot(&mut world, follower, 50.0, 60.0);
        ReconciliationEngine::set_server_snapshot(&mut world, follower, f32::NAN, 75.0);

        let snap = world.get_component::<ServerSnapshot>(follower).unwrap();
        assert_eq!(snap.x, 50.0, "NaN X keeps the last staged value");
        assert_eq!(snap.y, 75.0);
    }

    #[test]
    fn test_untracked_entities_drop_runtime_state() {
        let (mut world, _, follower) =
            follower_world(Vec2::new(100.0, 0.0), Vec2::ZERO, Vec2::ZERO);
        let mut engine = ReconciliationEngine::new(FollowConfig::default());
        tick(&mut engine, &mut world, 1);
        assert_eq!(engine.tracked_count(), 1);

        world.remove_component::<FollowTarget>(follower);
        tick(&mut engine, &mut world, 1);
        assert_eq!(engine.tracked_count(), 0);
    }

    #[test]
    fn test_missing_owner_holds_position() {
        let (mut world, owner, follower) =
            follower_world(Vec2::new(100.0, 0.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        let mut engine = ReconciliationEngine::new(FollowConfig::default());
        tick(&mut engine, &mut world, 1);

        world.destroy_entity(owner);
        let before = world.get_component::<Transform>(follower).unwrap().position;
        tick(&mut engine, &mut world, 30);
        let after = world.get_component::<Transform>(follower).unwrap().position;
        assert_eq!(before, after, "no owner, no fallback motion");
    }
}
