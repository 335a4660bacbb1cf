// Tile navigation grid and per-goal flow fields.
//
// Layer 1: NavigationGrid: tile classification (walkable, spawn, goal,
//          nav-gate) plus per-tile wall flags, built from level geometry.
// Layer 2: FlowField: one per goal id; BFS distance field + axis-aligned
//          steepest-descent directions.
//
// Tile space: tile (x, y) has its centre at `offset + (x, y) * tile_size`
// on the world XZ plane (tile y runs along world Z). "Up" is +y.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::{IVec2, Vec2};

use super::error::{NavError, Result};

/// Distance value for tiles the BFS never reached.
pub const UNREACHED: u32 = u32::MAX;

/// Largest grid `NavigationGrid::new` will allocate.
pub const MAX_TILES: u32 = 1 << 24;

// ============================================================================
// TILES
// ============================================================================

/// Classification of one tile, with the payload each class carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TileKind {
    /// Absent tile: never iterated by the BFS and never reachable.
    #[default]
    None,
    Walkable,
    Spawn { spawn_id: u32, goal_id: u32 },
    /// A tile may be a goal for several logical goals at once.
    Goal { goal_ids: BTreeSet<u32> },
    /// Only agents seeking one of `allowed_goals` may cross.
    NavGate { allowed_goals: BTreeSet<u32> },
}

/// One side of a tile, in tile space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WallSide {
    /// +y
    Top,
    /// −y
    Bottom,
    /// −x
    Left,
    /// +x
    Right,
}

impl WallSide {
    pub const ALL: [WallSide; 4] =
        [WallSide::Top, WallSide::Bottom, WallSide::Left, WallSide::Right];

    #[inline]
    fn index(self) -> usize {
        match self {
            WallSide::Top => 0,
            WallSide::Bottom => 1,
            WallSide::Left => 2,
            WallSide::Right => 3,
        }
    }

    /// Unit step towards the neighbour across this side; also the outward normal.
    #[inline]
    pub fn offset(self) -> IVec2 {
        match self {
            WallSide::Top => IVec2::new(0, 1),
            WallSide::Bottom => IVec2::new(0, -1),
            WallSide::Left => IVec2::new(-1, 0),
            WallSide::Right => IVec2::new(1, 0),
        }
    }
}

/// A wall segment in world XZ space, derived on demand from a tile side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub start: Vec2,
    pub end: Vec2,
    /// Points out of the owning tile.
    pub normal: Vec2,
}

/// One cell of the navigation grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tile {
    pub kind: TileKind,
    walls: [bool; 4],
}

impl Tile {
    pub fn has_wall(&self, side: WallSide) -> bool {
        self.walls[side.index()]
    }

    pub fn is_none(&self) -> bool {
        matches!(self.kind, TileKind::None)
    }
}

/// Inclusive rectangle of tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub min: IVec2,
    pub max: IVec2,
}

impl TileRect {
    pub fn iter(&self) -> impl Iterator<Item = IVec2> {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| IVec2::new(x, y)))
    }
}

// ============================================================================
// FLOW FIELD
// ============================================================================

/// Pre-computed per-tile movement directions toward one goal id.
///
/// All agents assigned to the goal read from this, so the per-agent
/// query cost is O(1).
#[derive(Debug, Clone)]
pub struct FlowField {
    /// Unit axis direction toward the lowest-distance neighbour.
    /// Vec2::ZERO means "isolated" or "absent tile".
    pub directions: Vec<Vec2>,

    /// BFS hop distance to the nearest goal tile. [`UNREACHED`] = unreachable.
    pub distances: Vec<u32>,
}

// ============================================================================
// NAVIGATION GRID
// ============================================================================

/// Static tile classification, walls, and the flow fields derived from them.
/// Rebuilt from scratch whenever level geometry is edited.
#[derive(Debug, Clone)]
pub struct NavigationGrid {
    size_x: u32,
    size_y: u32,
    offset: Vec2,
    tile_size: f32,
    tiles: Vec<Tile>,
    fields: BTreeMap<u32, FlowField>,
}

impl NavigationGrid {
    /// Empty grid covering `min..max` on the XZ plane.
    ///
    /// `offset` is the world position of tile (0, 0)'s centre. Dimensions are
    /// `floor((max - min) / tile_size)`; a non-positive tile size, a box that
    /// yields zero tiles on either axis, or more than [`MAX_TILES`] tiles is
    /// rejected.
    pub fn new(min: Vec2, max: Vec2, offset: Vec2, tile_size: f32) -> Result<Self> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(NavError::InvalidTileSize(tile_size));
        }

        let span = (max - min) / tile_size;
        let size_x = if span.x.is_finite() { span.x.max(0.0).floor() as u32 } else { 0 };
        let size_y = if span.y.is_finite() { span.y.max(0.0).floor() as u32 } else { 0 };
        if size_x == 0 || size_y == 0 {
            return Err(NavError::DegenerateBounds { size_x, size_y });
        }
        let count = size_x
            .checked_mul(size_y)
            .filter(|&n| n <= MAX_TILES)
            .ok_or(NavError::GridTooLarge { size_x, size_y })?;

        Ok(Self {
            size_x,
            size_y,
            offset,
            tile_size,
            tiles: vec![Tile::default(); count as usize],
            fields: BTreeMap::new(),
        })
    }

    pub fn size_x(&self) -> u32 {
        self.size_x
    }

    pub fn size_y(&self) -> u32 {
        self.size_y
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Goal ids that currently own a flow field.
    pub fn field_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.fields.keys().copied()
    }

    pub fn field(&self, field_id: u32) -> Option<&FlowField> {
        self.fields.get(&field_id)
    }

    #[inline]
    fn idx(&self, tile: IVec2) -> Option<usize> {
        if tile.x < 0
            || tile.y < 0
            || tile.x as u32 >= self.size_x
            || tile.y as u32 >= self.size_y
        {
            return None;
        }
        Some((tile.y as u32 * self.size_x + tile.x as u32) as usize)
    }

    #[inline]
    fn coords(&self, idx: usize) -> IVec2 {
        let idx = idx as u32;
        IVec2::new((idx % self.size_x) as i32, (idx / self.size_x) as i32)
    }

    pub fn tile(&self, tile: IVec2) -> Option<&Tile> {
        self.idx(tile).map(|i| &self.tiles[i])
    }

    // ------------------------------------------------------------------------
    // Coordinate conversion
    // ------------------------------------------------------------------------

    /// Tile under a world-space ground position.
    ///
    /// Rounds to the nearest tile centre, so an agent drifting slightly past a
    /// tile edge still resolves to the tile it is mostly on.
    /// Non-finite input maps far outside the grid.
    pub fn get_tile_space(&self, world: Vec2) -> IVec2 {
        let t = ((world - self.offset) / self.tile_size).round();
        if !t.is_finite() {
            return IVec2::splat(i32::MIN);
        }
        IVec2::new(t.x as i32, t.y as i32)
    }

    /// World-space centre of a tile.
    pub fn tile_center(&self, tile: IVec2) -> Vec2 {
        self.offset + tile.as_vec2() * self.tile_size
    }

    /// Inclusive tile rectangle covered by a world rectangle, clamped to the grid.
    ///
    /// Covers every tile whose centre lies inside `min..max`. A rectangle too
    /// small to contain any centre maps to the tile under its own centre.
    /// Returns `None` when the rectangle misses the grid entirely.
    pub fn convert_to_tile_space(&self, min: Vec2, max: Vec2) -> Option<TileRect> {
        let lo = ((min - self.offset) / self.tile_size).ceil();
        let hi = ((max - self.offset) / self.tile_size).floor();
        let mut lo = IVec2::new(lo.x as i32, lo.y as i32);
        let mut hi = IVec2::new(hi.x as i32, hi.y as i32);

        if lo.x > hi.x || lo.y > hi.y {
            let center = self.get_tile_space((min + max) * 0.5);
            lo = center;
            hi = center;
        }

        let grid_max = IVec2::new(self.size_x as i32 - 1, self.size_y as i32 - 1);
        let lo_c = lo.max(IVec2::ZERO);
        let hi_c = hi.min(grid_max);
        if lo_c.x > hi_c.x || lo_c.y > hi_c.y {
            return None;
        }
        Some(TileRect { min: lo_c, max: hi_c })
    }

    // ------------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------------

    fn mark(&mut self, min: Vec2, max: Vec2, mut apply: impl FnMut(&mut TileKind)) {
        let Some(rect) = self.convert_to_tile_space(min, max) else {
            return;
        };
        for tile in rect.iter() {
            if let Some(i) = self.idx(tile) {
                apply(&mut self.tiles[i].kind);
            }
        }
    }

    /// Marks absent tiles walkable. Already-classified tiles keep their class.
    pub fn set_walkable(&mut self, min: Vec2, max: Vec2) {
        self.mark(min, max, |kind| {
            if matches!(kind, TileKind::None) {
                *kind = TileKind::Walkable;
            }
        });
    }

    pub fn set_spawn(&mut self, spawn_id: u32, goal_id: u32, min: Vec2, max: Vec2) {
        self.mark(min, max, |kind| *kind = TileKind::Spawn { spawn_id, goal_id });
    }

    /// Adds `goal_id` to the covered tiles; existing goal ids are kept.
    pub fn set_goal(&mut self, goal_id: u32, min: Vec2, max: Vec2) {
        self.mark(min, max, |kind| match kind {
            TileKind::Goal { goal_ids } => {
                goal_ids.insert(goal_id);
            }
            other => {
                *other = TileKind::Goal {
                    goal_ids: BTreeSet::from([goal_id]),
                }
            }
        });
    }

    /// Lets agents seeking `goal_id` through the covered tiles; accumulates.
    pub fn set_nav_gate(&mut self, goal_id: u32, min: Vec2, max: Vec2) {
        self.mark(min, max, |kind| match kind {
            TileKind::NavGate { allowed_goals } => {
                allowed_goals.insert(goal_id);
            }
            other => {
                *other = TileKind::NavGate {
                    allowed_goals: BTreeSet::from([goal_id]),
                }
            }
        });
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// In bounds and not `None`. Out-of-range tiles are simply unreachable.
    pub fn is_reachable(&self, tile: IVec2) -> bool {
        self.tile(tile).is_some_and(|t| !t.is_none())
    }

    pub fn is_walkable(&self, tile: IVec2) -> bool {
        self.tile(tile).is_some_and(|t| matches!(t.kind, TileKind::Walkable))
    }

    pub fn is_nav_gate(&self, tile: IVec2) -> bool {
        self.tile(tile).is_some_and(|t| matches!(t.kind, TileKind::NavGate { .. }))
    }

    /// Goal tile for any goal id.
    pub fn is_goal(&self, tile: IVec2) -> bool {
        self.tile(tile).is_some_and(|t| matches!(t.kind, TileKind::Goal { .. }))
    }

    pub fn is_goal_for(&self, goal_id: u32, tile: IVec2) -> bool {
        self.tile(tile).is_some_and(|t| match &t.kind {
            TileKind::Goal { goal_ids } => goal_ids.contains(&goal_id),
            _ => false,
        })
    }

    /// False only for a nav-gate tile whose allowed set excludes `goal_id`.
    ///
    /// Gates key on the goal being sought; `_spawn_id` is accepted so callers
    /// can pass an agent's full routing identity.
    pub fn is_passable(&self, _spawn_id: u32, goal_id: u32, tile: IVec2) -> bool {
        match self.tile(tile).map(|t| &t.kind) {
            Some(TileKind::NavGate { allowed_goals }) => allowed_goals.contains(&goal_id),
            _ => true,
        }
    }

    /// BFS distance from `tile` to the nearest goal of `field_id`.
    pub fn distance(&self, field_id: u32, tile: IVec2) -> Option<u32> {
        let i = self.idx(tile)?;
        let d = *self.fields.get(&field_id)?.distances.get(i)?;
        (d != UNREACHED).then_some(d)
    }

    /// Field direction at `tile` for `field_id`; zero when unknown.
    pub fn direction(&self, field_id: u32, tile: IVec2) -> Vec2 {
        let Some(i) = self.idx(tile) else {
            return Vec2::ZERO;
        };
        self.fields
            .get(&field_id)
            .and_then(|f| f.directions.get(i).copied())
            .unwrap_or(Vec2::ZERO)
    }

    /// Goal-seeking direction at a world position.
    ///
    /// Zero when the position maps to an unreachable tile or the field does
    /// not exist.
    pub fn get_force(&self, field_id: u32, world: Vec2) -> Vec2 {
        let tile = self.get_tile_space(world);
        if !self.is_reachable(tile) {
            return Vec2::ZERO;
        }
        if let Some(field) = self.fields.get(&field_id) {
            debug_assert_eq!(field.directions.len(), self.tiles.len(), "field/tile size mismatch");
        }
        self.direction(field_id, tile)
    }

    /// Calls `f` for every tile in row-major order, absent tiles included.
    pub fn for_each_tile(&self, mut f: impl FnMut(IVec2, &Tile)) {
        for (i, tile) in self.tiles.iter().enumerate() {
            f(self.coords(i), tile);
        }
    }

    /// Tiles registered for `spawn_id`, with the goal each one routes to.
    pub fn spawn_tiles(&self, spawn_id: u32) -> Vec<(IVec2, u32)> {
        self.tiles
            .iter()
            .enumerate()
            .filter_map(|(i, t)| match t.kind {
                TileKind::Spawn { spawn_id: s, goal_id } if s == spawn_id => {
                    Some((self.coords(i), goal_id))
                }
                _ => None,
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Walls
    // ------------------------------------------------------------------------

    /// Toggles a wall on one side of a tile. Out-of-range tiles are ignored.
    pub fn set_wall(&mut self, tile: IVec2, side: WallSide, present: bool) {
        if let Some(i) = self.idx(tile) {
            self.tiles[i].walls[side.index()] = present;
        }
    }

    /// World-space segment for a tile side, whether or not the wall is set.
    pub fn wall_segment(&self, tile: IVec2, side: WallSide) -> Wall {
        let c = self.tile_center(tile);
        let h = self.tile_size * 0.5;
        let (start, end) = match side {
            WallSide::Top => (Vec2::new(c.x - h, c.y + h), Vec2::new(c.x + h, c.y + h)),
            WallSide::Bottom => (Vec2::new(c.x - h, c.y - h), Vec2::new(c.x + h, c.y - h)),
            WallSide::Left => (Vec2::new(c.x - h, c.y - h), Vec2::new(c.x - h, c.y + h)),
            WallSide::Right => (Vec2::new(c.x + h, c.y - h), Vec2::new(c.x + h, c.y + h)),
        };
        Wall {
            start,
            end,
            normal: side.offset().as_vec2(),
        }
    }

    /// The wall on `side` of `tile`, if one is set.
    pub fn wall(&self, tile: IVec2, side: WallSide) -> Option<Wall> {
        self.tile(tile)
            .filter(|t| t.has_wall(side))
            .map(|_| self.wall_segment(tile, side))
    }

    /// All walls on tiles overlapping the square `center ± radius`.
    pub fn walls_in_area(&self, center: Vec2, radius: f32) -> Vec<Wall> {
        let mut out = Vec::new();
        let r = Vec2::splat(radius.max(0.0) + self.tile_size * 0.5);
        let lo = self.get_tile_space(center - r).max(IVec2::ZERO);
        let hi = self
            .get_tile_space(center + r)
            .min(IVec2::new(self.size_x as i32 - 1, self.size_y as i32 - 1));
        if lo.x > hi.x || lo.y > hi.y {
            return out;
        }
        for tile in (TileRect { min: lo, max: hi }).iter() {
            let Some(t) = self.tile(tile) else { continue };
            for side in WallSide::ALL {
                if t.has_wall(side) {
                    out.push(self.wall_segment(tile, side));
                }
            }
        }
        out
    }

    /// Puts a wall on every side of a reachable tile that borders an
    /// unreachable one (including the grid rim). Returns the number set.
    pub fn generate_edge_walls(&mut self) -> usize {
        let mut count = 0;
        for i in 0..self.tiles.len() {
            if self.tiles[i].is_none() {
                continue;
            }
            let tile = self.coords(i);
            for side in WallSide::ALL {
                if !self.is_reachable(tile + side.offset()) {
                    self.tiles[i].walls[side.index()] = true;
                    count += 1;
                }
            }
        }
        count
    }

    // ------------------------------------------------------------------------
    // Field construction
    // ------------------------------------------------------------------------

    /// Recomputes one flow field per distinct goal id, from scratch.
    pub fn build(&mut self) {
        let goal_ids: BTreeSet<u32> = self
            .tiles
            .iter()
            .filter_map(|t| match &t.kind {
                TileKind::Goal { goal_ids } => Some(goal_ids.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect();

        self.fields.clear();
        for goal_id in goal_ids {
            let field = self.compute_field(goal_id);
            self.fields.insert(goal_id, field);
        }
    }

    /// Multi-source BFS from every goal tile of `goal_id`, then a gradient pass.
    fn compute_field(&self, goal_id: u32) -> FlowField {
        let size = self.tiles.len();
        let mut distances = vec![UNREACHED; size];
        let mut queue = VecDeque::new();

        for (i, tile) in self.tiles.iter().enumerate() {
            if let TileKind::Goal { goal_ids } = &tile.kind {
                if goal_ids.contains(&goal_id) {
                    distances[i] = 0;
                    queue.push_back(self.coords(i));
                }
            }
        }

        // BFS: expand outward from the goals, recording shortest hop distance.
        while let Some(pos) = queue.pop_front() {
            let Some(pi) = self.idx(pos) else { continue };
            let next = distances[pi] + 1;
            for nb in cardinal_neighbors(pos) {
                let Some(ni) = self.idx(nb) else { continue };
                if self.tiles[ni].is_none() || !self.is_passable(0, goal_id, nb) {
                    continue;
                }
                if distances[ni] > next {
                    distances[ni] = next;
                    queue.push_back(nb);
                }
            }
        }

        // Gradient pass: point each present tile at its lowest neighbour.
        let mut directions = vec![Vec2::ZERO; size];
        for (i, tile) in self.tiles.iter().enumerate() {
            if tile.is_none() {
                continue;
            }
            let pos = self.coords(i);
            let dist_at = |side: WallSide| {
                self.idx(pos + side.offset())
                    .filter(|&n| !self.tiles[n].is_none())
                    .map_or(UNREACHED, |n| distances[n])
            };
            directions[i] = descent_direction(
                dist_at(WallSide::Top),
                dist_at(WallSide::Bottom),
                dist_at(WallSide::Left),
                dist_at(WallSide::Right),
            );
        }

        FlowField { directions, distances }
    }
}

/// Unit axis vector towards the smallest of the four neighbour distances.
///
/// Ties resolve up, then down, then left, else right. Plateaus are common,
/// so this order decides most of the field and must stay fixed.
fn descent_direction(up: u32, down: u32, left: u32, right: u32) -> Vec2 {
    if up == UNREACHED && down == UNREACHED && left == UNREACHED && right == UNREACHED {
        return Vec2::ZERO;
    }
    if up <= down && up <= left && up <= right {
        Vec2::Y
    } else if down <= left && down <= right {
        Vec2::NEG_Y
    } else if left <= right {
        Vec2::NEG_X
    } else {
        Vec2::X
    }
}

// ============================================================================
// NEIGHBOR ITERATORS
// ============================================================================

/// The four orthogonal neighbours of a tile, unclamped.
fn cardinal_neighbors(pos: IVec2) -> impl Iterator<Item = IVec2> {
    WallSide::ALL.into_iter().map(move |side| pos + side.offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid(n: u32) -> NavigationGrid {
        let mut grid = NavigationGrid::new(
            Vec2::splat(-0.5),
            Vec2::splat(n as f32 - 0.5),
            Vec2::ZERO,
            1.0,
        )
        .unwrap();
        grid.set_walkable(Vec2::splat(-0.5), Vec2::splat(n as f32 - 0.5));
        grid
    }

    #[test]
    fn rejects_bad_tile_size_and_bounds() {
        assert!(matches!(
            NavigationGrid::new(Vec2::ZERO, Vec2::splat(10.0), Vec2::ZERO, 0.0),
            Err(NavError::InvalidTileSize(_))
        ));
        assert!(matches!(
            NavigationGrid::new(Vec2::ZERO, Vec2::splat(10.0), Vec2::ZERO, f32::NAN),
            Err(NavError::InvalidTileSize(_))
        ));
        assert!(matches!(
            NavigationGrid::new(Vec2::ZERO, Vec2::new(10.0, 0.5), Vec2::ZERO, 1.0),
            Err(NavError::DegenerateBounds { size_x: 10, size_y: 0 })
        ));
    }

    #[test]
    fn oversized_bounds_are_an_error() {
        // 70_000^2 does not fit in a u32
        assert!(matches!(
            NavigationGrid::new(Vec2::ZERO, Vec2::splat(70_000.0), Vec2::ZERO, 1.0),
            Err(NavError::GridTooLarge { size_x: 70_000, size_y: 70_000 })
        ));
        // fits in a u32 but is far past the tile budget
        assert!(matches!(
            NavigationGrid::new(Vec2::ZERO, Vec2::splat(10.0), Vec2::ZERO, 1e-3),
            Err(NavError::GridTooLarge { .. })
        ));
        assert!(matches!(
            NavigationGrid::new(Vec2::ZERO, Vec2::splat(f32::MAX), Vec2::ZERO, 1e-3),
            Err(NavError::GridTooLarge { .. } | NavError::DegenerateBounds { .. })
        ));
    }

    #[test]
    fn non_finite_positions_are_unreachable() {
        let mut grid = open_grid(4);
        grid.set_goal(0, Vec2::splat(2.6), Vec2::splat(3.4));
        grid.build();
        for p in [Vec2::new(f32::NAN, 0.0), Vec2::new(0.0, f32::INFINITY), Vec2::splat(f32::NAN)] {
            let tile = grid.get_tile_space(p);
            assert!(!grid.is_reachable(tile), "{p} -> {tile}");
            assert_eq!(grid.get_force(0, p), Vec2::ZERO);
        }
        assert_ne!(grid.get_force(0, Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn size_rounds_down() {
        let grid = NavigationGrid::new(Vec2::ZERO, Vec2::new(10.9, 4.2), Vec2::ZERO, 2.0).unwrap();
        assert_eq!((grid.size_x(), grid.size_y()), (5, 2));
    }

    #[test]
    fn out_of_bounds_is_unreachable_not_a_panic() {
        let grid = open_grid(4);
        assert!(!grid.is_reachable(IVec2::new(-1, 0)));
        assert!(!grid.is_reachable(IVec2::new(4, 0)));
        assert!(!grid.is_reachable(IVec2::new(0, 100)));
        assert_eq!(grid.get_force(0, Vec2::new(-50.0, 3.0)), Vec2::ZERO);
        assert!(grid.wall(IVec2::new(9, 9), WallSide::Top).is_none());
    }

    #[test]
    fn tile_space_rounds_to_nearest_center() {
        let grid =
            NavigationGrid::new(Vec2::ZERO, Vec2::splat(20.0), Vec2::new(1.0, 1.0), 2.0).unwrap();
        let tile = IVec2::new(3, 4);
        let center = grid.tile_center(tile);
        assert_eq!(center, Vec2::new(7.0, 9.0));
        for d in [Vec2::ZERO, Vec2::new(0.99, 0.0), Vec2::new(-0.99, 0.99), Vec2::new(0.5, -0.99)] {
            assert_eq!(grid.get_tile_space(center + d), tile, "offset {d}");
        }
    }

    #[test]
    fn convert_rect_covers_tile_centres() {
        let grid = open_grid(10);
        let rect = grid.convert_to_tile_space(Vec2::new(1.5, 2.5), Vec2::new(4.5, 3.5)).unwrap();
        assert_eq!(rect.min, IVec2::new(2, 3));
        assert_eq!(rect.max, IVec2::new(4, 3));

        // smaller than a tile: falls back to the tile under the centre
        let rect = grid.convert_to_tile_space(Vec2::new(6.1, 6.1), Vec2::new(6.4, 6.4)).unwrap();
        assert_eq!(rect.min, IVec2::new(6, 6));
        assert_eq!(rect.max, IVec2::new(6, 6));

        // clamped to the grid
        let rect = grid.convert_to_tile_space(Vec2::splat(-30.0), Vec2::splat(1.0)).unwrap();
        assert_eq!(rect.min, IVec2::ZERO);
        assert_eq!(rect.max, IVec2::ONE);

        assert!(grid.convert_to_tile_space(Vec2::splat(50.0), Vec2::splat(60.0)).is_none());
    }

    #[test]
    fn goal_and_gate_ids_accumulate() {
        let mut grid = open_grid(4);
        let r = (Vec2::splat(0.6), Vec2::splat(1.4));
        grid.set_goal(1, r.0, r.1);
        grid.set_goal(2, r.0, r.1);
        assert!(grid.is_goal_for(1, IVec2::ONE));
        assert!(grid.is_goal_for(2, IVec2::ONE));
        assert!(!grid.is_goal_for(3, IVec2::ONE));

        let g = (Vec2::new(2.6, 0.6), Vec2::new(3.4, 1.4));
        grid.set_nav_gate(5, g.0, g.1);
        grid.set_nav_gate(6, g.0, g.1);
        let gate = IVec2::new(3, 1);
        assert!(grid.is_nav_gate(gate));
        assert!(grid.is_passable(0, 5, gate));
        assert!(grid.is_passable(0, 6, gate));
        assert!(!grid.is_passable(0, 7, gate));
    }

    #[test]
    fn walkable_does_not_clobber_goals() {
        let mut grid = open_grid(3);
        grid.set_goal(1, Vec2::splat(0.6), Vec2::splat(1.4));
        grid.set_walkable(Vec2::splat(-0.5), Vec2::splat(2.5));
        assert!(grid.is_goal(IVec2::ONE));
        assert!(grid.is_walkable(IVec2::ZERO));
    }

    #[test]
    fn passable_everywhere_but_excluding_gates() {
        let mut grid = open_grid(3);
        grid.set_spawn(4, 1, Vec2::new(-0.4, -0.4), Vec2::new(0.4, 0.4));
        grid.set_goal(1, Vec2::new(1.6, 1.6), Vec2::new(2.4, 2.4));
        grid.set_nav_gate(1, Vec2::new(0.6, 0.6), Vec2::new(1.4, 1.4));

        for goal in [0, 1, 2] {
            assert!(grid.is_passable(0, goal, IVec2::new(0, 0)));
            assert!(grid.is_passable(0, goal, IVec2::new(2, 2)));
            assert!(grid.is_passable(0, goal, IVec2::new(2, 0)));
            assert!(grid.is_passable(0, goal, IVec2::new(-3, 9)));
        }
        assert!(grid.is_passable(0, 1, IVec2::ONE));
        assert!(!grid.is_passable(0, 2, IVec2::ONE));
    }

    #[test]
    fn single_goal_scenario() {
        let mut grid = open_grid(10);
        grid.set_goal(0, Vec2::new(4.6, 4.6), Vec2::new(5.4, 5.4));
        grid.build();

        assert_eq!(grid.distance(0, IVec2::new(5, 5)), Some(0));
        assert_eq!(grid.distance(0, IVec2::new(4, 5)), Some(1));
        assert_eq!(grid.distance(0, IVec2::new(0, 0)), Some(10));
        assert_eq!(grid.direction(0, IVec2::new(4, 5)), Vec2::X);
        // (0,0): up and right tie at 9, down/left are off-grid → up wins
        assert_eq!(grid.direction(0, IVec2::new(0, 0)), Vec2::Y);
        // rebuilding gives the same field
        let before = grid.field(0).unwrap().directions.clone();
        grid.build();
        assert_eq!(grid.field(0).unwrap().directions, before);
    }

    #[test]
    fn tie_break_order_is_up_down_left_right() {
        assert_eq!(descent_direction(3, 3, 3, 3), Vec2::Y);
        assert_eq!(descent_direction(4, 3, 3, 3), Vec2::NEG_Y);
        assert_eq!(descent_direction(4, 4, 3, 3), Vec2::NEG_X);
        assert_eq!(descent_direction(4, 4, 4, 3), Vec2::X);
        assert_eq!(descent_direction(UNREACHED, UNREACHED, UNREACHED, UNREACHED), Vec2::ZERO);
    }

    #[test]
    fn distances_grow_by_one_hop_and_goals_are_zero() {
        let mut grid = open_grid(8);
        grid.set_goal(3, Vec2::new(-0.4, 6.6), Vec2::new(0.4, 7.4));
        grid.set_goal(3, Vec2::new(6.6, -0.4), Vec2::new(7.4, 0.4));
        grid.build();

        let field = grid.field(3).unwrap();
        grid.for_each_tile(|pos, tile| {
            let d = grid.distance(3, pos).unwrap();
            if grid.is_goal_for(3, pos) {
                assert_eq!(d, 0);
                return;
            }
            assert!(!tile.is_none());
            // some neighbour is exactly one hop closer, none is more than one hop closer
            let nbs: Vec<u32> =
                cardinal_neighbors(pos).filter_map(|n| grid.distance(3, n)).collect();
            assert!(nbs.contains(&(d - 1)), "{pos}: {d} vs {nbs:?}");
            assert!(nbs.iter().all(|&n| n + 1 >= d));
            let dir = field.directions[grid.idx(pos).unwrap()];
            assert!([Vec2::X, Vec2::NEG_X, Vec2::Y, Vec2::NEG_Y].contains(&dir));
        });
    }

    #[test]
    fn isolated_tile_has_zero_direction() {
        let mut grid =
            NavigationGrid::new(Vec2::splat(-0.5), Vec2::splat(4.5), Vec2::ZERO, 1.0).unwrap();
        grid.set_goal(0, Vec2::splat(-0.4), Vec2::splat(0.4));
        grid.set_walkable(Vec2::new(-0.4, 0.6), Vec2::new(0.4, 1.4));
        grid.set_walkable(Vec2::splat(3.6), Vec2::splat(4.4));
        grid.build();

        assert_eq!(grid.direction(0, IVec2::new(4, 4)), Vec2::ZERO);
        assert_eq!(grid.distance(0, IVec2::new(4, 4)), None);
        assert_eq!(grid.direction(0, IVec2::new(0, 1)), Vec2::NEG_Y);
        // goal tile points at its only present neighbour
        assert_eq!(grid.direction(0, IVec2::new(0, 0)), Vec2::Y);
    }

    #[test]
    fn gate_blocks_other_goals() {
        // corridor 5x1 with a gate in the middle; goal 1 at the east end
        let mut grid =
            NavigationGrid::new(Vec2::new(-0.5, -0.5), Vec2::new(4.5, 0.5), Vec2::ZERO, 1.0)
                .unwrap();
        grid.set_walkable(Vec2::new(-0.5, -0.5), Vec2::new(4.5, 0.5));
        grid.set_goal(1, Vec2::new(3.6, -0.4), Vec2::new(4.4, 0.4));
        grid.set_goal(2, Vec2::new(3.6, -0.4), Vec2::new(4.4, 0.4));
        grid.set_nav_gate(1, Vec2::new(1.6, -0.4), Vec2::new(2.4, 0.4));
        grid.build();

        assert_eq!(grid.distance(1, IVec2::new(0, 0)), Some(4));
        assert_eq!(grid.distance(2, IVec2::new(0, 0)), None);
        assert_eq!(grid.distance(2, IVec2::new(3, 0)), Some(1));
    }

    #[test]
    fn fields_are_kept_per_goal() {
        let mut grid = open_grid(5);
        grid.set_goal(1, Vec2::new(-0.4, 1.6), Vec2::new(0.4, 2.4));
        grid.set_goal(2, Vec2::new(3.6, 1.6), Vec2::new(4.4, 2.4));
        grid.build();

        assert_eq!(grid.field_ids().collect::<Vec<_>>(), vec![1, 2]);
        let mid = grid.tile_center(IVec2::new(2, 2));
        assert_eq!(grid.get_force(1, mid), Vec2::NEG_X);
        assert_eq!(grid.get_force(2, mid), Vec2::X);
        assert_eq!(grid.get_force(9, mid), Vec2::ZERO);
    }

    #[test]
    fn wall_segments_match_requested_side() {
        let mut grid =
            NavigationGrid::new(Vec2::ZERO, Vec2::splat(8.0), Vec2::splat(1.0), 2.0).unwrap();
        let tile = IVec2::new(1, 2); // centre (3, 5), spans x 2..4, z 4..6
        for side in WallSide::ALL {
            grid.set_wall(tile, side, true);
        }

        let top = grid.wall(tile, WallSide::Top).unwrap();
        assert_eq!(
            (top.start, top.end, top.normal),
            (Vec2::new(2.0, 6.0), Vec2::new(4.0, 6.0), Vec2::Y)
        );
        let bottom = grid.wall(tile, WallSide::Bottom).unwrap();
        assert_eq!(
            (bottom.start, bottom.end, bottom.normal),
            (Vec2::new(2.0, 4.0), Vec2::new(4.0, 4.0), Vec2::NEG_Y)
        );
        let left = grid.wall(tile, WallSide::Left).unwrap();
        assert_eq!(
            (left.start, left.end, left.normal),
            (Vec2::new(2.0, 4.0), Vec2::new(2.0, 6.0), Vec2::NEG_X)
        );
        let right = grid.wall(tile, WallSide::Right).unwrap();
        assert_eq!(
            (right.start, right.end, right.normal),
            (Vec2::new(4.0, 4.0), Vec2::new(4.0, 6.0), Vec2::X)
        );

        grid.set_wall(tile, WallSide::Left, false);
        assert!(grid.wall(tile, WallSide::Left).is_none());
    }

    #[test]
    fn edge_walls_line_the_rim() {
        let mut grid = open_grid(3);
        // 3x3 open: 12 rim sides
        assert_eq!(grid.generate_edge_walls(), 12);
        assert!(grid.wall(IVec2::new(0, 0), WallSide::Left).is_some());
        assert!(grid.wall(IVec2::new(0, 0), WallSide::Bottom).is_some());
        assert!(grid.wall(IVec2::new(1, 1), WallSide::Top).is_none());

        let near_corner = grid.walls_in_area(Vec2::new(0.0, 0.0), 0.4);
        assert!(near_corner.iter().any(|w| w.normal == Vec2::NEG_X));
        assert!(grid.walls_in_area(Vec2::splat(40.0), 1.0).is_empty());
    }

    #[test]
    fn spawn_tiles_report_their_goal() {
        let mut grid = open_grid(4);
        grid.set_spawn(7, 2, Vec2::new(-0.4, -0.4), Vec2::new(1.4, 0.4));
        let spawns = grid.spawn_tiles(7);
        assert_eq!(spawns, vec![(IVec2::new(0, 0), 2), (IVec2::new(1, 0), 2)]);
        assert!(grid.spawn_tiles(8).is_empty());
    }
}
