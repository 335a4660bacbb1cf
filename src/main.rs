// Headless crowd demo.
// Builds a small level with two crossing streams and a nav gate, spawns
// agents and projectiles on a timer, and logs stats plus text dumps of the
// navigation grid.
//
// Usage: tilecrowd [config.ron] [ticks]
// Set RUST_LOG=info (or debug) to see output.

use glam::{IVec2, Vec2};
use log::{error, info};

use tilecrowd::engine::debug_overlay::{render_field, render_tiles};
use tilecrowd::engine::{
    AreaTracker, LevelClass, NavError, Navigator, SimConfig, WallSide, WorldState,
};

const DEFAULT_TICKS: u64 = 600;
const SPAWN_EVERY: u64 = 15;
const SHOOT_EVERY: u64 = 45;

// ============================================================================
// LEVEL
// ============================================================================

/// 20x10 field. Stream 0 crosses left to right through a gate only it may
/// pass; stream 1 crosses bottom to top through the middle.
fn build_level(state: &mut WorldState) {
    state.spawn_level_piece(Vec2::new(10.0, 5.0), Vec2::new(10.0, 5.0), LevelClass::Walkable);

    state.spawn_level_piece(
        Vec2::new(0.5, 5.0),
        Vec2::new(0.5, 3.0),
        LevelClass::Spawn { spawn_id: 0, goal_id: 0 },
    );
    state.spawn_level_piece(
        Vec2::new(19.5, 5.0),
        Vec2::new(0.5, 5.0),
        LevelClass::Goal { goal_id: 0 },
    );

    state.spawn_level_piece(
        Vec2::new(8.0, 0.5),
        Vec2::new(2.0, 0.5),
        LevelClass::Spawn { spawn_id: 1, goal_id: 1 },
    );
    state.spawn_level_piece(
        Vec2::new(8.0, 9.5),
        Vec2::new(2.0, 0.5),
        LevelClass::Goal { goal_id: 1 },
    );

    state.spawn_level_piece(
        Vec2::new(14.5, 5.0),
        Vec2::new(0.5, 5.0),
        LevelClass::NavGate { goal_id: 0 },
    );
}

/// A short interior wall the crossing streams have to steer around.
fn place_walls(state: &mut WorldState) {
    for y in 3..7 {
        state.set_wall(IVec2::new(4, y), WallSide::Right, true);
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn run() -> Result<(), NavError> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    let ticks = args.next().and_then(|t| t.parse().ok()).unwrap_or(DEFAULT_TICKS);

    let mut state = WorldState::new(config)?;
    build_level(&mut state);
    state.rebuild_navigation()?;
    place_walls(&mut state);
    let tracker = state.spawn_area_tracker(Vec2::new(8.0, 5.0), Vec2::splat(1.5));

    if let Some(grid) = state.navigation() {
        info!("Tiles:\n{}", render_tiles(grid));
        for field_id in grid.field_ids() {
            info!("Field {}:\n{}", field_id, render_field(grid, field_id));
        }
    }

    let tick_rate = state.config().tick_rate.max(1.0) as u64;
    let (mut arrived, mut hits, mut culled) = (0, 0, 0);
    for tick in 0..ticks {
        if tick % SPAWN_EVERY == 0 {
            state.spawn_agent(0);
            state.spawn_agent(1);
        }
        if tick % SHOOT_EVERY == 0 {
            state.spawn_projectile(Vec2::new(10.0, 9.0), Vec2::new(0.0, -6.0), 0.5, 0.1, 9.0);
        }

        let report = state.tick();
        arrived += report.arrived;
        hits += report.hits;
        culled += report.culled;

        if tick % tick_rate == 0 {
            info!("{}", state.stats().summary());
        }
    }

    let tracker_counts = state
        .world
        .get::<AreaTracker>(tracker)
        .map(|t| (t.entered, t.exited))
        .unwrap_or_default();
    let remaining = state.world.query::<&Navigator>().iter(&state.world).count();
    info!(
        "Done after {} ticks: {} arrived, {} projectile hits, {} culled, {} agents still walking",
        ticks, arrived, hits, culled, remaining
    );
    info!(
        "Centre tracker saw {} in / {} out",
        tracker_counts.0, tracker_counts.1
    );
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(1);
    }
}
