//! Headless demo: drives the full simulation pipeline against a scripted
//! server feed.
//!
//! Run with `cargo run -p tether-demo` (optionally `-- --ticks 900
//! --log-level debug`). A handful of replicas spawn and wander under
//! interpolation, a companion follows the local avatar under
//! reconciliation, server snapshots cut out halfway through to exercise the
//! local fallback, and transient effects are swept as they expire.

use clap::Parser;
use glam::Vec2;
use tracing::info;

use tether_config::{CliArgs, Config};
use tether_ecs::{
    DespawnQueue, Entity, Lifetime, Name, System, SystemScheduler, TickDriver, Transform, Velocity,
    World,
};
use tether_sync::{
    Authority, BulkUpdate, FollowConfig, FollowTarget, InterpolationConfig, InterpolationSystem,
    NetworkId, Pose, ReconciliationEngine, ReconciliationSystem, RemoveReason, RemoveReplica,
    ReplicaKind, ReplicaSync, ResourcePools, SpawnReplica, UpdateReplica,
};

/// Extra demo-only CLI on top of the shared config flags.
#[derive(Parser, Debug)]
#[command(name = "tether-demo", about = "Headless sync-pipeline demo")]
struct DemoArgs {
    /// Number of fixed ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    #[command(flatten)]
    config: CliArgs,
}

/// Integrates velocity for entities the local client may control. Entities
/// under server authority are skipped: their pose belongs to the sync
/// layer.
struct LocalMovementSystem {
    client_id: u64,
}

impl System for LocalMovementSystem {
    fn name(&self) -> &'static str {
        "local_movement"
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        let client_id = self.client_id;
        world.for_each_mut::<Transform>(|world, entity, transform| {
            let controllable = world
                .get_component::<Authority>(entity)
                .is_some_and(|auth| auth.can_be_controlled_by(client_id));
            if !controllable {
                return;
            }
            if let Some(vel) = world.get_component::<Velocity>(entity) {
                transform.position += vel.0 * dt;
            }
        });
    }
}

/// Destroys transient effects whose lifetime has expired. Uses the
/// snapshot query mode because it destroys while iterating.
struct EffectCleanupSystem {
    queue: DespawnQueue,
}

impl System for EffectCleanupSystem {
    fn name(&self) -> &'static str {
        "effect_cleanup"
    }

    fn update(&mut self, world: &mut World, _dt: f32) {
        let now = world.clock();
        for entity in world.query::<(Lifetime,)>() {
            let expired = world
                .get_component::<Lifetime>(entity)
                .is_some_and(|lifetime| lifetime.expires_at <= now);
            if expired {
                self.queue.enqueue(entity);
            }
        }
        let removed = self.queue.flush(world);
        if removed > 0 {
            info!(removed, "swept expired effects");
        }
    }
}

/// Scripted stand-in for the network boundary. Emits spawn/update/bulk/
/// remove messages on a fixed timeline and goes silent for a stretch to
/// demonstrate the reconciliation fallback.
struct ScriptedServer {
    npc_ids: Vec<NetworkId>,
}

impl ScriptedServer {
    fn new() -> Self {
        Self {
            npc_ids: vec![NetworkId(10), NetworkId(11), NetworkId(12)],
        }
    }

    fn drive(
        &mut self,
        tick: u64,
        world: &mut World,
        sync: &mut ReplicaSync,
        companion: Entity,
    ) {
        if tick == 0 {
            for (i, &id) in self.npc_ids.iter().enumerate() {
                sync.apply_spawn(
                    world,
                    &SpawnReplica {
                        id,
                        kind: ReplicaKind::Npc,
                        pose: Pose {
                            x: 100.0 * (i + 1) as f32,
                            y: 100.0,
                            rotation: 0.0,
                        },
                        pools: ResourcePools::default(),
                        behavior: Some("patrol_road".to_string()),
                    },
                );
            }
        }

        // Server packets arrive at 10 Hz against a 60 Hz simulation; the
        // interpolation system fills the gaps.
        if tick % 6 == 0 {
            let t = tick as f32 / 60.0;
            let updates = self
                .npc_ids
                .iter()
                .enumerate()
                .map(|(i, &id)| UpdateReplica {
                    id,
                    pose: Some(Pose {
                        x: 100.0 * (i + 1) as f32 + 40.0 * t.sin(),
                        y: 100.0 + 40.0 * (t + i as f32).cos(),
                        rotation: t,
                    }),
                    pools: None,
                    behavior: None,
                })
                .collect();
            sync.apply_bulk_update(world, &BulkUpdate { updates });
        }

        // Companion corrections at 5 Hz, silenced between ticks 200 and
        // 400 so the follower falls back to pure local simulation.
        let silenced = (200..400).contains(&tick);
        if tick % 12 == 0 && !silenced {
            let drift = Vec2::new((tick as f32 * 0.05).sin() * 10.0, 0.0);
            if let Some(avatar_pos) = world
                .get_component::<FollowTarget>(companion)
                .map(|f| f.owner)
                .and_then(|owner| world.get_component::<Transform>(owner))
                .map(|t| t.position)
            {
                let corrected = avatar_pos + Vec2::new(-60.0, 0.0) + drift;
                ReconciliationEngine::set_server_snapshot(
                    world, companion, corrected.x, corrected.y,
                );
            }
        }

        // One replica leaves late in the run.
        if tick == 500 {
            sync.apply_remove(
                world,
                &RemoveReplica {
                    id: self.npc_ids[2],
                    reason: RemoveReason::OutOfRange,
                },
            );
        }
    }
}

fn interpolation_config(config: &Config) -> InterpolationConfig {
    InterpolationConfig {
        smoothing_rate: config.interpolation.smoothing_rate,
        max_speed: config.interpolation.max_speed,
        rotation_rate: config.interpolation.rotation_rate,
        snap_epsilon: config.interpolation.snap_epsilon,
    }
}

fn follow_config(config: &Config) -> FollowConfig {
    FollowConfig {
        follow_distance: config.follow.follow_distance,
        base_speed: config.follow.base_speed,
        catchup_speed: config.follow.catchup_speed,
        catchup_distance: config.follow.catchup_distance,
        snapshot_stale_after: config.follow.snapshot_stale_after,
        hard_snap_distance: config.follow.hard_snap_distance,
        teleport_distance: config.follow.teleport_distance,
        ..FollowConfig::default()
    }
}

fn main() {
    let args = DemoArgs::parse();

    let config_path = args
        .config
        .config
        .clone()
        .or_else(Config::default_path)
        .unwrap_or_else(|| "config.ron".into());
    let mut config = match Config::load_or_default(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            std::process::exit(1);
        }
    };
    config.apply_cli_overrides(&args.config);
    tether_log::init_logging(Some(&config));

    let client_id = config.network.client_id;
    let mut world = World::new();

    // The local avatar: client-predictive, moved by game logic.
    let avatar = world.create_entity();
    world.add_component(avatar, Transform::from_xy(400.0, 300.0));
    world.add_component(avatar, Velocity::new(50.0, 0.0));
    world.add_component(avatar, Authority::client_predictive(client_id, 0.0));
    world.add_component(avatar, Name::new("avatar"));

    // Its companion: moved by the reconciliation engine every tick,
    // corrected by server snapshots while they flow.
    let companion = world.create_entity();
    world.add_component(companion, Transform::from_xy(340.0, 300.0));
    world.add_component(companion, FollowTarget { owner: avatar });
    world.add_component(companion, Authority::client_predictive(client_id, 0.0));
    world.add_component(companion, Name::new("companion"));

    // A couple of short-lived local effects for the cleanup sweep.
    for i in 0..3u32 {
        let effect = world.create_entity();
        world.add_component(effect, Transform::from_xy(400.0, 280.0 + 10.0 * i as f32));
        world.add_component(effect, Lifetime {
            expires_at: 1.0 + f64::from(i),
        });
        world.add_component(effect, Authority::client_local(client_id, 0.0));
    }

    let mut sync = ReplicaSync::new(config.network.server_id);
    let mut server = ScriptedServer::new();

    // Fixed order: input/movement first, reconciliation before
    // interpolation, cleanup last. Declared once; never reordered.
    let mut scheduler = SystemScheduler::builder()
        .with_system(LocalMovementSystem { client_id })
        .with_system(ReconciliationSystem::new(follow_config(&config)))
        .with_system(InterpolationSystem::new(interpolation_config(&config)))
        .with_system(EffectCleanupSystem {
            queue: DespawnQueue::new(),
        })
        .build();
    info!(order = ?scheduler.system_names(), "scheduler ready");

    let mut driver = TickDriver::new(config.simulation.tick_rate);
    let dt = driver.tick_duration() as f32;
    let mut tick: u64 = 0;

    while tick < args.ticks {
        // Headless: feed the driver exactly one tick of wall time.
        for _ in 0..driver.accumulate(driver.tick_duration()) {
            server.drive(tick, &mut world, &mut sync, companion);
            scheduler.update(&mut world, dt);

            if tick % 60 == 0 {
                let avatar_pos = world
                    .get_component::<Transform>(avatar)
                    .map(|t| t.position)
                    .unwrap_or_default();
                let companion_pos = world
                    .get_component::<Transform>(companion)
                    .map(|t| t.position)
                    .unwrap_or_default();
                info!(
                    tick,
                    clock = world.clock(),
                    avatar = ?(avatar_pos.x as i32, avatar_pos.y as i32),
                    companion = ?(companion_pos.x as i32, companion_pos.y as i32),
                    replicas = sync.replica_count(),
                    entities = world.alive_count(),
                    "state"
                );
            }
            tick += 1;
        }
    }

    info!(
        ticks = tick,
        entities = world.alive_count(),
        "demo finished"
    );
}
