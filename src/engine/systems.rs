// ECS systems run by the world driver, one call each per tick.
// Each takes the world explicitly plus whatever shared state it reads.
//
// Steering systems snapshot the agents into `SteeringAgent`s, run the pure
// steering pass, then write accelerations/velocities back.

use bevy_ecs::prelude::*;
use glam::Vec2;
use log::debug;
use rand::Rng;

use super::components::*;
use super::navigation::NavigationGrid;
use super::steering::{self, SteeringAgent, SteeringParams};

/// Below this horizontal speed an agent keeps its current heading.
const ALIGN_MIN_SPEED: f32 = 1e-3;

// ============================================================================
// STEERING
// ============================================================================

/// Snapshot of every navigating agent that has not arrived yet.
pub fn collect_agents(world: &mut World) -> (Vec<Entity>, Vec<SteeringAgent>) {
    let mut query = world.query_filtered::<
        (Entity, &Transform, &Velocity, &Acceleration, &Navigator, &Agent),
        Without<Arrived>,
    >();
    query
        .iter(world)
        .map(|(entity, transform, velocity, accel, nav, body)| {
            (
                entity,
                SteeringAgent {
                    pos: transform.ground(),
                    vel: velocity.horizontal(),
                    accel: accel.linear,
                    field_id: nav.field_id,
                    speed: nav.speed,
                    radius: body.radius,
                },
            )
        })
        .unzip()
}

/// Writes steering results back onto the ECS components.
pub fn write_back(world: &mut World, entities: &[Entity], agents: &[SteeringAgent]) {
    for (&entity, agent) in entities.iter().zip(agents) {
        if let Some(mut accel) = world.get_mut::<Acceleration>(entity) {
            accel.linear = agent.accel;
        }
        if let Some(mut velocity) = world.get_mut::<Velocity>(entity) {
            velocity.set_horizontal(agent.vel);
        }
    }
}

/// Goal seeking. Agents that reached a goal tile are tagged [`Arrived`] and
/// have their health zeroed so the health pass removes them.
/// Returns the number of arrivals.
pub fn navigate_system(
    world: &mut World,
    grid: &NavigationGrid,
    params: &SteeringParams,
    rng: &mut impl Rng,
) -> usize {
    let (entities, mut agents) = collect_agents(world);
    let arrived = steering::navigate(&mut agents, grid, params, rng);
    write_back(world, &entities, &agents);

    for &i in &arrived {
        let entity = entities[i];
        if let Some(mut health) = world.get_mut::<Health>(entity) {
            health.current = 0.0;
        }
        world.entity_mut(entity).insert(Arrived);
    }
    arrived.len()
}

pub fn avoid_entities_system(world: &mut World, params: &SteeringParams) {
    let (entities, mut agents) = collect_agents(world);
    steering::avoid_entities(&mut agents, params);
    write_back(world, &entities, &agents);
}

pub fn avoid_obstacles_system(world: &mut World, grid: &NavigationGrid, params: &SteeringParams) {
    let (entities, mut agents) = collect_agents(world);
    steering::avoid_obstacles(&mut agents, grid, params);
    write_back(world, &entities, &agents);
}

/// Integrates the force accumulator into velocity for every agent.
pub fn velocity_system(world: &mut World, params: &SteeringParams, delta_time: f32) {
    let (entities, mut agents) = collect_agents(world);
    steering::calculate_velocity(&mut agents, params, delta_time);
    write_back(world, &entities, &agents);
}

// ============================================================================
// MOVEMENT
// ============================================================================

/// Update entity positions based on velocity and turn agents to face
/// their horizontal direction of travel.
pub fn movement_system(world: &mut World, delta_time: f32) {
    let mut query = world.query::<(&mut Transform, &Velocity)>();
    for (mut transform, velocity) in query.iter_mut(world) {
        transform.position += velocity.linear * delta_time;

        let heading = velocity.horizontal();
        if heading.length_squared() > ALIGN_MIN_SPEED * ALIGN_MIN_SPEED {
            transform.yaw = heading.y.atan2(heading.x);
        }
    }
}

// ============================================================================
// PROJECTILES
// ============================================================================

/// Each projectile damages the first living agent it overlaps and is
/// removed. Returns the number of hits.
pub fn projectile_system(world: &mut World) -> usize {
    let mut targets_q = world.query::<(Entity, &Transform, &Agent, &Health)>();
    let mut targets: Vec<(Entity, Vec2, f32, f32)> = targets_q
        .iter(world)
        .filter(|(_, _, _, health)| !health.is_dead())
        .map(|(e, t, body, health)| (e, t.ground(), body.radius, health.current))
        .collect();
    targets.sort_by_key(|t| t.0);

    let mut projectiles_q = world.query::<(Entity, &Transform, &Projectile)>();
    let mut projectiles: Vec<(Entity, Vec2, Projectile)> = projectiles_q
        .iter(world)
        .map(|(e, t, p)| (e, t.ground(), *p))
        .collect();
    projectiles.sort_by_key(|p| p.0);

    let mut hits = 0;
    for (projectile, pos, shot) in projectiles {
        let hit = targets.iter_mut().find(|(_, target_pos, radius, current)| {
            *current > 0.0 && target_pos.distance(pos) < radius + shot.radius
        });
        let Some((target, _, _, current)) = hit else {
            continue;
        };

        *current -= shot.damage;
        if let Some(mut health) = world.get_mut::<Health>(*target) {
            health.current = *current;
        }
        world.despawn(projectile);
        hits += 1;
    }
    hits
}

// ============================================================================
// CULLING
// ============================================================================

/// Despawn entities that travelled past their range.
pub fn range_system(world: &mut World) -> usize {
    let mut query = world.query::<(Entity, &Transform, &Range)>();
    let expired: Vec<Entity> = query
        .iter(world)
        .filter(|(_, transform, range)| {
            transform.ground().distance(range.origin) > range.max_distance
        })
        .map(|(entity, _, _)| entity)
        .collect();

    for &entity in &expired {
        world.despawn(entity);
    }
    if !expired.is_empty() {
        debug!("range cull: {} entities", expired.len());
    }
    expired.len()
}

/// Despawn entities whose health is used up (including arrived agents).
pub fn health_system(world: &mut World) -> usize {
    let mut query = world.query::<(Entity, &Health)>();
    let dead: Vec<Entity> = query
        .iter(world)
        .filter(|(_, health)| health.is_dead())
        .map(|(entity, _)| entity)
        .collect();

    for &entity in &dead {
        world.despawn(entity);
    }
    if !dead.is_empty() {
        debug!("health cull: {} entities", dead.len());
    }
    dead.len()
}

// ============================================================================
// AREA TRACKING
// ============================================================================

/// Refresh which agents stand inside each tracker and count transitions.
pub fn area_tracker_system(world: &mut World) {
    let mut agents_q = world.query_filtered::<(Entity, &Transform), With<Navigator>>();
    let agents: Vec<(Entity, Vec2)> = agents_q.iter(world).map(|(e, t)| (e, t.ground())).collect();

    let mut trackers = world.query::<(&Transform, &mut AreaTracker)>();
    for (transform, mut tracker) in trackers.iter_mut(world) {
        let center = transform.ground();
        let half = tracker.half_extents;
        let now: std::collections::BTreeSet<Entity> = agents
            .iter()
            .filter(|(_, pos)| {
                let d = (*pos - center).abs();
                d.x <= half.x && d.y <= half.y
            })
            .map(|(e, _)| *e)
            .collect();

        let entered = now.difference(&tracker.inside).count() as u32;
        let exited = tracker.inside.difference(&now).count() as u32;
        tracker.entered += entered;
        tracker.exited += exited;
        tracker.inside = now;
    }
}
