// World driver.
//
// `WorldState` is the one owned root of the simulation: the ECS world, the
// current navigation grid, steering tunables and the jitter RNG. Nothing is
// global; systems and the scripting bridge receive it (or its parts) by
// reference.
//
// Tick order is fixed:
//   navigate → avoid entities → avoid obstacles → integrate velocity
//   → move/align → projectiles → range/health culling → area trackers
// Goal force must read start-of-tick positions, and integration must see every
// contributor's force, so do not reorder.

use std::collections::BTreeMap;
use std::time::Instant;

use bevy_ecs::prelude::*;
use glam::{IVec2, Vec2, Vec3};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::components::*;
use super::config::SimConfig;
use super::debug_overlay::DebugStats;
use super::error::{NavError, Result};
use super::navigation::{NavigationGrid, WallSide};
use super::steering::SteeringParams;
use super::systems;

/// Script behaviour callable by name through the bridge.
pub type BehaviourFn = Box<dyn FnMut(&mut World, Entity) + Send>;

// ============================================================================
// LEVEL GEOMETRY → NAVIGATION GRID
// ============================================================================

/// One piece of level geometry as seen by the grid builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelTile {
    pub min: Vec2,
    pub max: Vec2,
    pub class: LevelClass,
}

/// Builds a navigation grid from level geometry.
///
/// The grid spans the bounding box of the walkable pieces. Spawn, goal and
/// gate pieces are applied on top, in that order, then rim walls are laid and
/// the flow fields are built.
///
/// A bad tile size is an error even for an empty level; a level with no
/// walkable geometry yields `Ok(None)` and navigation stays idle.
pub fn build_navigation(
    level: impl IntoIterator<Item = LevelTile>,
    tile_size: f32,
) -> Result<Option<NavigationGrid>> {
    if !tile_size.is_finite() || tile_size <= 0.0 {
        return Err(NavError::InvalidTileSize(tile_size));
    }

    let level: Vec<LevelTile> = level.into_iter().collect();
    let bounds = level
        .iter()
        .filter(|piece| piece.class == LevelClass::Walkable)
        .fold(None, |acc: Option<(Vec2, Vec2)>, piece| match acc {
            None => Some((piece.min, piece.max)),
            Some((lo, hi)) => Some((lo.min(piece.min), hi.max(piece.max))),
        });
    let Some((min, max)) = bounds else {
        debug!("no walkable geometry, skipping navigation build");
        return Ok(None);
    };

    let mut grid = NavigationGrid::new(min, max, min + Vec2::splat(tile_size * 0.5), tile_size)?;

    for piece in level.iter().filter(|p| p.class == LevelClass::Walkable) {
        grid.set_walkable(piece.min, piece.max);
    }
    for piece in &level {
        if let LevelClass::Spawn { spawn_id, goal_id } = piece.class {
            grid.set_spawn(spawn_id, goal_id, piece.min, piece.max);
        }
    }
    for piece in &level {
        if let LevelClass::Goal { goal_id } = piece.class {
            grid.set_goal(goal_id, piece.min, piece.max);
        }
    }
    for piece in &level {
        if let LevelClass::NavGate { goal_id } = piece.class {
            grid.set_nav_gate(goal_id, piece.min, piece.max);
        }
    }

    let walls = grid.generate_edge_walls();
    grid.build();
    info!(
        "Built navigation grid {}x{} (tile {}), {} fields, {} rim walls",
        grid.size_x(),
        grid.size_y(),
        tile_size,
        grid.field_ids().count(),
        walls
    );
    Ok(Some(grid))
}

/// Walks every entity tagged as level geometry.
pub fn level_geometry(world: &mut World) -> Vec<LevelTile> {
    let mut query = world.query::<(&Transform, &Footprint, &LevelGeometry)>();
    query
        .iter(world)
        .map(|(transform, footprint, geometry)| {
            let center = transform.ground();
            LevelTile {
                min: center - footprint.half_extents,
                max: center + footprint.half_extents,
                class: geometry.class,
            }
        })
        .collect()
}

// ============================================================================
// WORLD STATE
// ============================================================================

/// Counts from one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub arrived: usize,
    pub hits: usize,
    pub culled: usize,
}

pub struct WorldState {
    pub world: World,
    navigation: Option<NavigationGrid>,
    config: SimConfig,
    params: SteeringParams,
    rng: StdRng,
    pub(crate) behaviours: BTreeMap<String, BehaviourFn>,
    stats: DebugStats,
}

impl WorldState {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let params = config.steering_params();
        Ok(Self {
            world: World::new(),
            navigation: None,
            config,
            params,
            rng,
            behaviours: BTreeMap::new(),
            stats: DebugStats::default(),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn params(&self) -> &SteeringParams {
        &self.params
    }

    pub fn stats(&self) -> &DebugStats {
        &self.stats
    }

    pub fn navigation(&self) -> Option<&NavigationGrid> {
        self.navigation.as_ref()
    }

    /// Rebuilds the grid from the level entities and swaps it in.
    ///
    /// Takes `&mut self`, so it can never overlap a tick.
    pub fn rebuild_navigation(&mut self) -> Result<()> {
        let level = level_geometry(&mut self.world);
        let started = Instant::now();
        self.navigation = build_navigation(level, self.config.tile_size)?;
        self.stats.last_build_ms = started.elapsed().as_secs_f32() * 1000.0;
        self.stats.field_rebuilds += 1;
        Ok(())
    }

    /// Editor wall toggle on the live grid. No-op without a grid.
    pub fn set_wall(&mut self, tile: IVec2, side: WallSide, present: bool) {
        if let Some(grid) = self.navigation.as_mut() {
            grid.set_wall(tile, side, present);
        }
    }

    // ------------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------------

    /// Adds a piece of level geometry. Call [`Self::rebuild_navigation`] after
    /// a batch of edits.
    pub fn spawn_level_piece(
        &mut self,
        center: Vec2,
        half_extents: Vec2,
        class: LevelClass,
    ) -> Entity {
        self.world
            .spawn((
                Transform::from_position(Vec3::new(center.x, 0.0, center.y)),
                Footprint { half_extents },
                LevelGeometry { class },
            ))
            .id()
    }

    /// Spawns a navigating agent using the configured radius, speed and health.
    pub fn spawn_agent_at(&mut self, pos: Vec2, field_id: u32) -> Entity {
        self.world
            .spawn((
                Transform::from_position(Vec3::new(pos.x, 0.0, pos.y)),
                Velocity::default(),
                Acceleration::default(),
                Navigator {
                    field_id,
                    speed: self.config.agent_speed,
                },
                Agent {
                    radius: self.config.agent_radius,
                },
                Health::new(self.config.agent_health),
            ))
            .id()
    }

    /// Spawns an agent on a random spawn tile of `spawn_id`, heading for that
    /// tile's goal. `None` without a grid or without such spawn tiles.
    pub fn spawn_agent(&mut self, spawn_id: u32) -> Option<Entity> {
        let grid = self.navigation.as_ref()?;
        let tiles = grid.spawn_tiles(spawn_id);
        if tiles.is_empty() {
            return None;
        }
        let (tile, goal_id) = tiles[self.rng.gen_range(0..tiles.len())];
        let pos = grid.tile_center(tile);
        Some(self.spawn_agent_at(pos, goal_id))
    }

    pub fn spawn_projectile(
        &mut self,
        pos: Vec2,
        velocity: Vec2,
        damage: f32,
        radius: f32,
        range: f32,
    ) -> Entity {
        self.world
            .spawn((
                Transform::from_position(Vec3::new(pos.x, 0.0, pos.y)),
                Velocity::new(Vec3::new(velocity.x, 0.0, velocity.y)),
                Projectile { damage, radius },
                Range {
                    origin: pos,
                    max_distance: range,
                },
            ))
            .id()
    }

    pub fn spawn_area_tracker(&mut self, center: Vec2, half_extents: Vec2) -> Entity {
        self.world
            .spawn((
                Transform::from_position(Vec3::new(center.x, 0.0, center.y)),
                AreaTracker::new(half_extents),
            ))
            .id()
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Advances the simulation by one fixed step.
    pub fn tick(&mut self) -> TickReport {
        let started = Instant::now();
        let dt = self.config.dt();
        let mut report = TickReport::default();

        if let Some(grid) = self.navigation.as_ref() {
            report.arrived =
                systems::navigate_system(&mut self.world, grid, &self.params, &mut self.rng);
        }
        systems::avoid_entities_system(&mut self.world, &self.params);
        if let Some(grid) = self.navigation.as_ref() {
            systems::avoid_obstacles_system(&mut self.world, grid, &self.params);
        }
        systems::velocity_system(&mut self.world, &self.params, dt);
        systems::movement_system(&mut self.world, dt);
        report.hits = systems::projectile_system(&mut self.world);
        report.culled =
            systems::range_system(&mut self.world) + systems::health_system(&mut self.world);
        systems::area_tracker_system(&mut self.world);

        self.stats.tick += 1;
        self.stats.entity_count = self.world.entities().len() as usize;
        self.stats.agent_count = self.world.query::<&Navigator>().iter(&self.world).count();
        self.stats.tick_time_ms = started.elapsed().as_secs_f32() * 1000.0;
        report
    }
}
