// Steering and local avoidance.
//
// Force-based rather than velocity-space: every contributor adds a force into
// the agent's accumulator, and `calculate_velocity` folds the sum into the
// velocity once per tick.
//
//   navigate           goal seeking from the flow field + jitter
//   avoid_entities     time-to-collision forces against nearby agents
//   avoid_obstacles    time-to-collision corrections against grid walls
//   calculate_velocity integrate, clamp, zero the accumulator
//
// The world driver runs them in exactly that order.

use std::collections::HashMap;

use glam::{IVec2, Vec2};
use rand::Rng;

use super::geometry::{time_to_collision, time_to_segment_collision};
use super::navigation::NavigationGrid;

/// Added to the time-to-collision denominator so imminent hits stay finite.
const AVOIDANCE_EPSILON: f32 = 1e-3;
/// Below this distance two agents are treated as coincident.
const COINCIDENT_DISTANCE: f32 = 1e-6;
/// Floor for the neighbour bucket size.
const MIN_CELL_SIZE: f32 = 1e-3;

// ============================================================================
// PARAMETERS
// ============================================================================

/// Tunables for one steering pass. Built from `SimConfig::steering_params`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringParams {
    /// Velocity-matching gain. Higher = snappier, unstable when too high.
    pub ksi: f32,
    /// Only agents closer than this are considered for avoidance.
    pub neighbor_cutoff: f32,
    /// Agents closer than this always push each other apart.
    pub separation_distance: f32,
    /// Look-ahead (seconds) for agent-agent predicted collisions.
    pub avoidance_horizon: f32,
    /// Look-ahead (seconds) for agent-wall predicted collisions.
    pub obstacle_horizon: f32,
    pub jitter_scale: f32,
    pub max_overlap_force: f32,
    pub max_avoidance_force: f32,
    pub max_obstacle_force: f32,
    /// Acceleration cap per second; scaled by dt in the integrator.
    pub max_acceleration: f32,
}

impl Default for SteeringParams {
    fn default() -> Self {
        Self {
            ksi: 2.0,
            neighbor_cutoff: 3.0,
            separation_distance: 1.0,
            avoidance_horizon: 1.5,
            obstacle_horizon: 1.0,
            jitter_scale: 0.5,
            max_overlap_force: 10.0,
            max_avoidance_force: 20.0,
            max_obstacle_force: 40.0,
            max_acceleration: 20.0,
        }
    }
}

impl SteeringParams {
    /// Scale applied to avoidance magnitudes so they stay proportionate to
    /// the goal-seeking gain.
    pub fn ksi_factor(&self) -> f32 {
        if self.ksi >= 2.0 { self.ksi / 2.0 } else { 1.0 }
    }
}

// ============================================================================
// AGENT SNAPSHOT
// ============================================================================

/// Steering state for one agent, collected from the ECS before a pass and
/// written back after it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringAgent {
    /// XZ position.
    pub pos: Vec2,
    /// XZ velocity.
    pub vel: Vec2,
    /// Force accumulator for this tick.
    pub accel: Vec2,
    pub field_id: u32,
    /// Desired cruising speed.
    pub speed: f32,
    pub radius: f32,
}

impl SteeringAgent {
    pub fn new(pos: Vec2, field_id: u32, speed: f32, radius: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            accel: Vec2::ZERO,
            field_id,
            speed,
            radius,
        }
    }
}

// ============================================================================
// SPATIAL GRID
// ============================================================================

/// Sparse neighbour buckets keyed by `floor(pos / cell_size)`.
///
/// Only occupied cells are stored, so agents any distance apart cost one
/// bucket each. Agents with a non-finite position are left out.
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<IVec2, Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(MIN_CELL_SIZE),
            cells: HashMap::new(),
        }
    }

    /// Buckets every agent by index into `agents`.
    pub fn from_agents(agents: &[SteeringAgent], cell_size: f32) -> Self {
        let mut grid = Self::new(cell_size);
        for (i, a) in agents.iter().enumerate() {
            grid.insert(a.pos, i);
        }
        grid
    }

    fn cell_of(&self, pos: Vec2) -> Option<IVec2> {
        let c = (pos / self.cell_size).floor();
        c.is_finite().then(|| IVec2::new(c.x as i32, c.y as i32))
    }

    pub fn insert(&mut self, pos: Vec2, idx: usize) {
        if let Some(cell) = self.cell_of(pos) {
            self.cells.entry(cell).or_default().push(idx);
        }
    }

    /// Appends the indices bucketed in every cell touching the square
    /// `pos ± radius`. Entries may lie farther than `radius`; `out` is not
    /// cleared.
    pub fn query_radius(&self, pos: Vec2, radius: f32, out: &mut Vec<usize>) {
        let reach = Vec2::splat(radius.max(0.0));
        let (Some(lo), Some(hi)) = (self.cell_of(pos - reach), self.cell_of(pos + reach)) else {
            return;
        };
        for y in lo.y..=hi.y {
            for x in lo.x..=hi.x {
                if let Some(bucket) = self.cells.get(&IVec2::new(x, y)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
    }
}

// ============================================================================
// GOAL SEEKING
// ============================================================================

/// Adds the goal-seeking force to every agent.
///
/// Returns the indices of agents standing on a goal tile of their own field;
/// those get no force this tick and the caller decides what arrival means.
pub fn navigate(
    agents: &mut [SteeringAgent],
    grid: &NavigationGrid,
    params: &SteeringParams,
    rng: &mut impl Rng,
) -> Vec<usize> {
    let mut arrived = Vec::new();
    for (i, agent) in agents.iter_mut().enumerate() {
        let tile = grid.get_tile_space(agent.pos);
        if grid.is_goal_for(agent.field_id, tile) {
            arrived.push(i);
            continue;
        }

        let goal_vel = grid.get_force(agent.field_id, agent.pos) * agent.speed;
        let jitter =
            Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0)) * params.jitter_scale;
        agent.accel += (goal_vel - agent.vel) * params.ksi + jitter;
    }
    arrived
}

// ============================================================================
// ENTITY-ENTITY AVOIDANCE
// ============================================================================

/// Avoidance force on `agents[a_idx]` from the neighbours listed in `neighbors`.
pub fn entity_avoidance_force(
    agents: &[SteeringAgent],
    a_idx: usize,
    neighbors: &[usize],
    params: &SteeringParams,
) -> Vec2 {
    let a = &agents[a_idx];
    let factor = params.ksi_factor();
    let cutoff_sq = params.neighbor_cutoff * params.neighbor_cutoff;
    let mut force = Vec2::ZERO;

    for &b_idx in neighbors {
        if b_idx == a_idx {
            continue;
        }
        let b = &agents[b_idx];
        let offset = a.pos - b.pos;
        let dist_sq = offset.length_squared();
        if dist_sq >= cutoff_sq {
            continue;
        }
        let dist = dist_sq.sqrt();
        let combined_r = a.radius + b.radius;

        if dist < combined_r {
            // Already overlapping: shove straight out.
            if dist > COINCIDENT_DISTANCE {
                force += offset / dist * a.speed.min(params.max_overlap_force) * factor;
            }
        } else if let Some(t) = time_to_collision(b.pos - a.pos, b.vel - a.vel, combined_r) {
            if t > 0.0 && t < params.avoidance_horizon {
                let predicted = (a.pos + a.vel * t) - (b.pos + b.vel * t);
                let dir = predicted.normalize_or_zero();
                let magnitude = ((params.avoidance_horizon - t) / (t + AVOIDANCE_EPSILON))
                    .min(params.max_avoidance_force);
                force += dir * magnitude * factor;
            }
        }

        // Keep agents from coinciding even without a predicted collision.
        if dist < params.separation_distance && dist > COINCIDENT_DISTANCE {
            force += offset / dist * (1.0 / dist);
        }
    }

    force
}

/// Adds agent-agent avoidance forces to every agent.
///
/// Forces are computed from the positions and velocities at the start of the
/// pass, so the result does not depend on agent order.
pub fn avoid_entities(agents: &mut [SteeringAgent], params: &SteeringParams) {
    if agents.len() < 2 {
        return;
    }
    let grid = SpatialGrid::from_agents(agents, params.neighbor_cutoff);

    let mut candidates: Vec<usize> = Vec::new();
    let mut forces = Vec::with_capacity(agents.len());
    for i in 0..agents.len() {
        candidates.clear();
        grid.query_radius(agents[i].pos, params.neighbor_cutoff, &mut candidates);
        // Spatial query returns a superset; sort + dedup for a stable sum.
        candidates.sort_unstable();
        candidates.dedup();
        forces.push(entity_avoidance_force(agents, i, &candidates, params));
    }

    for (agent, force) in agents.iter_mut().zip(forces) {
        agent.accel += force;
    }
}

// ============================================================================
// ENTITY-OBSTACLE AVOIDANCE
// ============================================================================

/// Wall correction for one agent, given its current accumulated force.
pub fn obstacle_avoidance_force(
    agent: &SteeringAgent,
    grid: &NavigationGrid,
    params: &SteeringParams,
) -> Vec2 {
    let reach = params.obstacle_horizon * agent.vel.length();
    if reach <= 0.0 {
        return Vec2::ZERO;
    }

    let mut summed = agent.accel;
    let mut correction = Vec2::ZERO;
    for wall in grid.walls_in_area(agent.pos, reach + agent.radius) {
        let Some(t) = time_to_segment_collision(
            agent.pos,
            agent.vel,
            agent.radius,
            wall.start,
            wall.end,
            params.obstacle_horizon,
        ) else {
            continue;
        };
        if t >= params.obstacle_horizon {
            continue;
        }

        // Normal on the agent's side of the wall.
        let mut n = wall.normal;
        if (agent.pos - wall.start).dot(n) < 0.0 {
            n = -n;
        }

        let mut push = summed.dot(n) * n;
        if push.dot(n) < 0.0 {
            push = -push;
        }
        if push.length_squared() < COINCIDENT_DISTANCE {
            push = n;
        }

        let scale = ((params.obstacle_horizon - t) / (t + AVOIDANCE_EPSILON))
            .min(params.max_obstacle_force);
        let delta = push * scale;
        correction += delta;
        summed += delta;
    }
    correction
}

/// Adds wall corrections to every agent. Runs after the other force passes,
/// since it reshapes the force already accumulated.
pub fn avoid_obstacles(
    agents: &mut [SteeringAgent],
    grid: &NavigationGrid,
    params: &SteeringParams,
) {
    for agent in agents.iter_mut() {
        let correction = obstacle_avoidance_force(agent, grid, params);
        agent.accel += correction;
    }
}

// ============================================================================
// INTEGRATION
// ============================================================================

/// Folds the accumulated force into velocity and clears the accumulator.
///
/// The per-tick change is capped at `max_acceleration * dt`.
pub fn calculate_velocity(agents: &mut [SteeringAgent], params: &SteeringParams, dt: f32) {
    let cap = params.max_acceleration * dt;
    for agent in agents.iter_mut() {
        let accel = (agent.accel * dt).clamp_length_max(cap);
        agent.vel += accel;
        agent.accel = Vec2::ZERO;
    }
}
