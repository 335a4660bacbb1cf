// Core ECS components for the navigation world.
// Agents, level geometry tags and the bookkeeping entities the tick driver touches.

use std::collections::BTreeSet;

use bevy_ecs::prelude::*;
use glam::{Vec2, Vec3};

/// Position of an entity in 3D space plus its heading around +Y.
#[derive(Component, Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
    /// Heading in radians, 0 = facing +X, counter-clockwise towards +Z.
    pub yaw: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position, yaw: 0.0 }
    }

    /// Ground-plane position (X, Z). Y is ignored for navigation.
    #[inline]
    pub fn ground(&self) -> Vec2 {
        Vec2::new(self.position.x, self.position.z)
    }
}

/// Velocity of an entity in 3D space (units per second)
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Velocity {
    pub linear: Vec3,
}

impl Velocity {
    pub fn new(linear: Vec3) -> Self {
        Self { linear }
    }

    /// Horizontal (XZ) part of the velocity.
    #[inline]
    pub fn horizontal(&self) -> Vec2 {
        Vec2::new(self.linear.x, self.linear.z)
    }

    #[inline]
    pub fn set_horizontal(&mut self, v: Vec2) {
        self.linear.x = v.x;
        self.linear.z = v.y;
    }
}

/// Per-tick force accumulator on the XZ plane.
///
/// Every steering contributor adds into `linear`; the integrator folds it
/// into [`Velocity`] and zeroes it at the end of the tick.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Acceleration {
    pub linear: Vec2,
}

/// Marks an entity as a navigating agent.
///
/// `field_id` picks the goal vector field to follow; `speed` is the desired
/// cruising speed in world units/sec.
#[derive(Component, Debug, Clone, Copy)]
pub struct Navigator {
    pub field_id: u32,
    pub speed: f32,
}

/// Physical body used by entity-entity avoidance and projectile hits.
#[derive(Component, Debug, Clone, Copy)]
pub struct Agent {
    pub radius: f32,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }
}

/// Set on an agent the tick it steps onto a goal tile of its field.
#[derive(Component, Debug, Clone, Copy)]
pub struct Arrived;

/// A moving hit volume that damages the first agent it touches.
#[derive(Component, Debug, Clone, Copy)]
pub struct Projectile {
    pub damage: f32,
    pub radius: f32,
}

/// Despawns the entity once it travels farther than `max_distance`
/// (horizontally) from `origin`.
#[derive(Component, Debug, Clone, Copy)]
pub struct Range {
    pub origin: Vec2,
    pub max_distance: f32,
}

/// Counts agents standing inside an axis-aligned ground rectangle centred
/// on the entity's transform.
#[derive(Component, Debug, Clone, Default)]
pub struct AreaTracker {
    pub half_extents: Vec2,
    pub inside: BTreeSet<Entity>,
    pub entered: u32,
    pub exited: u32,
}

impl AreaTracker {
    pub fn new(half_extents: Vec2) -> Self {
        Self {
            half_extents,
            ..Default::default()
        }
    }
}

/// How a piece of level geometry classifies the tiles under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelClass {
    Walkable,
    Spawn { spawn_id: u32, goal_id: u32 },
    Goal { goal_id: u32 },
    NavGate { goal_id: u32 },
}

/// Tags an entity as static level geometry feeding the navigation grid.
#[derive(Component, Debug, Clone, Copy)]
pub struct LevelGeometry {
    pub class: LevelClass,
}

/// Ground-plane half size of a level piece, centred on its transform.
#[derive(Component, Debug, Clone, Copy)]
pub struct Footprint {
    pub half_extents: Vec2,
}

