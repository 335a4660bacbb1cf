// Headless debug overlay: per-tick counters plus plain-text dumps of the
// navigation grid and its flow fields, for logs and tests.

use glam::{IVec2, Vec2};

use super::navigation::{NavigationGrid, TileKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugStats {
    /// Ticks run since the world was created.
    pub tick: u64,
    pub entity_count: usize,
    pub agent_count: usize,
    /// Wall time of the last tick (ms).
    pub tick_time_ms: f32,
    /// Time spent on the last navigation rebuild (ms). 0 if not yet run.
    pub last_build_ms: f32,
    /// Total number of navigation rebuilds since startup.
    pub field_rebuilds: u32,
}

impl DebugStats {
    pub fn summary(&self) -> String {
        format!(
            "tick {} | entities {} | agents {} | tick {:.2} ms | nav build {:.2} ms ({} rebuilds)",
            self.tick,
            self.entity_count,
            self.agent_count,
            self.tick_time_ms,
            self.last_build_ms,
            self.field_rebuilds,
        )
    }
}

/// One character per tile, top row (highest y) first.
///
/// ` ` absent, `.` walkable, `S` spawn, `G` goal, `#` nav gate.
pub fn render_tiles(grid: &NavigationGrid) -> String {
    render(grid, |tile| match grid.tile(tile).map(|t| &t.kind) {
        None | Some(TileKind::None) => ' ',
        Some(TileKind::Walkable) => '.',
        Some(TileKind::Spawn { .. }) => 'S',
        Some(TileKind::Goal { .. }) => 'G',
        Some(TileKind::NavGate { .. }) => '#',
    })
}

/// Flow field arrows for `field_id`, top row first.
///
/// `*` goal of this field, `x` reachable tile the BFS never reached,
/// `o` reached with no direction.
pub fn render_field(grid: &NavigationGrid, field_id: u32) -> String {
    render(grid, |tile| {
        if !grid.is_reachable(tile) {
            return ' ';
        }
        if grid.is_goal_for(field_id, tile) {
            return '*';
        }
        if grid.distance(field_id, tile).is_none() {
            return 'x';
        }
        let dir = grid.direction(field_id, tile);
        if dir == Vec2::Y {
            '^'
        } else if dir == Vec2::NEG_Y {
            'v'
        } else if dir == Vec2::NEG_X {
            '<'
        } else if dir == Vec2::X {
            '>'
        } else {
            'o'
        }
    })
}

fn render(grid: &NavigationGrid, mut glyph: impl FnMut(IVec2) -> char) -> String {
    let (w, h) = (grid.size_x() as i32, grid.size_y() as i32);
    let mut out = String::with_capacity(((w + 1) * h) as usize);
    for y in (0..h).rev() {
        for x in 0..w {
            out.push(glyph(IVec2::new(x, y)));
        }
        out.push('\n');
    }
    out
}
