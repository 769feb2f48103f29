//! Inbound synchronization messages.
//!
//! These are the in-memory shapes the network boundary hands to the sync
//! layer — conceptual payloads, not wire bytes. Every optional field means
//! "no change", never an implicit zero, and pose fields are sanitized
//! before they can reach any live state.

use serde::{Deserialize, Serialize};

use tether_math::sanitize_component;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Server-assigned identifier for a replicated entity. Clients reference
/// replicas exclusively by this id; local [`Entity`](tether_ecs::Entity)
/// handles never cross the network boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkId(pub u64);

/// Category of a spawned replica, used to pick client-side presentation
/// and behavior defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaKind {
    /// Another player's avatar.
    Avatar,
    /// Server-driven NPC.
    Npc,
    /// A player's companion/follower.
    Companion,
    /// Short-lived visual effect.
    Effect,
}

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// Position + heading as sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World-space X in pixels.
    pub x: f32,
    /// World-space Y in pixels.
    pub y: f32,
    /// Heading in radians.
    pub rotation: f32,
}

impl Pose {
    /// The origin with zero heading.
    pub const ORIGIN: Pose = Pose {
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
    };

    /// `true` if every field is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.rotation.is_finite()
    }

    /// Replaces non-finite fields with the corresponding field of
    /// `fallback` (the last known-good pose).
    pub fn sanitized(&self, fallback: Pose) -> Pose {
        Pose {
            x: sanitize_component(self.x, fallback.x),
            y: sanitize_component(self.y, fallback.y),
            rotation: sanitize_component(self.rotation, fallback.rotation),
        }
    }
}

// ---------------------------------------------------------------------------
// Resource pools
// ---------------------------------------------------------------------------

/// Gameplay resource pools carried by a replica. Attached as a component
/// at spawn and patched by updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourcePools {
    /// Current health.
    pub health: f32,
    /// Health ceiling.
    pub max_health: f32,
    /// Current energy/mana.
    pub energy: f32,
    /// Energy ceiling.
    pub max_energy: f32,
}

impl Default for ResourcePools {
    fn default() -> Self {
        Self {
            health: 100.0,
            max_health: 100.0,
            energy: 0.0,
            max_energy: 0.0,
        }
    }
}

/// Partial update to [`ResourcePools`]. Absent fields leave the current
/// value untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoolDelta {
    /// New current health, if changed.
    pub health: Option<f32>,
    /// New health ceiling, if changed.
    pub max_health: Option<f32>,
    /// New current energy, if changed.
    pub energy: Option<f32>,
    /// New energy ceiling, if changed.
    pub max_energy: Option<f32>,
}

impl PoolDelta {
    /// Merges the present fields into `pools`.
    pub fn apply_to(&self, pools: &mut ResourcePools) {
        if let Some(health) = self.health {
            pools.health = health;
        }
        if let Some(max_health) = self.max_health {
            pools.max_health = max_health;
        }
        if let Some(energy) = self.energy {
            pools.energy = energy;
        }
        if let Some(max_energy) = self.max_energy {
            pools.max_energy = max_energy;
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle messages
// ---------------------------------------------------------------------------

/// A newly-visible replica with its full initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnReplica {
    /// Server-assigned replica id.
    pub id: NetworkId,
    /// What kind of entity this is.
    pub kind: ReplicaKind,
    /// Initial pose.
    pub pose: Pose,
    /// Initial resource pools.
    pub pools: ResourcePools,
    /// Behavior script tag, when the replica runs one.
    pub behavior: Option<String>,
}

/// Changed state for a known replica. Absent fields mean "no change".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateReplica {
    /// Target replica id.
    pub id: NetworkId,
    /// New target pose, if the replica moved.
    pub pose: Option<Pose>,
    /// Resource pool changes, if any.
    pub pools: Option<PoolDelta>,
    /// New behavior tag, if it changed.
    pub behavior: Option<String>,
}

/// Per-entity updates batched into one message to bound per-packet
/// overhead as replica counts grow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulkUpdate {
    /// The batched updates, applied in order.
    pub updates: Vec<UpdateReplica>,
}

/// Why a replica went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoveReason {
    /// Orderly despawn (left the area, quest end).
    Despawn,
    /// The entity died.
    Death,
    /// Dropped out of the client's interest area.
    OutOfRange,
}

/// A replica the client must destroy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemoveReplica {
    /// Target replica id.
    pub id: NetworkId,
    /// Reason, for logging and presentation.
    pub reason: RemoveReason,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
