//! Grid map and A* pathfinding.
//!
//! The battlefield is rasterised once per battle into a [`GridMap`] of
//! passable and blocked cells. Units ask for routes between world positions;
//! the search runs on cells and the result is turned back into world-space
//! waypoints.
//!
//! The search is 4-connected with unit step cost and a Manhattan heuristic.
//! Ties on `f` are broken by cell coordinates so identical queries always
//! produce identical paths.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::math::Vec2;

/// Cell types for the grid map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellType {
    /// Open ground.
    #[default]
    Passable,
    /// Trees, walls, buildings.
    Blocked,
}

impl CellType {
    /// Returns true if units may stand in this cell.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        matches!(self, Self::Passable)
    }
}

/// Grid coordinates of a cell. `y` runs along world z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl Cell {
    /// Create a cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two cells.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// A circular piece of static terrain, as described by scenario files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Centre on the ground plane.
    pub center: Vec2,
    /// Blocking radius.
    pub radius: f32,
}

/// Static passable/blocked occupancy of the battlefield.
///
/// Cell `(0, 0)` has its lower corner at `origin`; the map covers
/// `width * cell_size` by `height * cell_size` world units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMap {
    width: u32,
    height: u32,
    cell_size: f32,
    origin: Vec2,
    /// Cell data stored in row-major order.
    cells: Vec<CellType>,
}

impl GridMap {
    /// Create a grid with every cell passable.
    pub fn new(width: u32, height: u32, cell_size: f32, origin: Vec2) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BattleError::InvalidGrid(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }
        if !(cell_size > 0.0 && cell_size.is_finite()) {
            return Err(BattleError::InvalidGrid(format!(
                "cell size must be positive, got {cell_size}"
            )));
        }

        let cell_count = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            cell_size,
            origin,
            cells: vec![CellType::Passable; cell_count],
        })
    }

    /// Create an open grid covering a square map of side `map_size` centred on the origin.
    pub fn for_map(map_size: f32, cell_size: f32) -> Result<Self> {
        if !(map_size > 0.0 && map_size.is_finite()) {
            return Err(BattleError::InvalidGrid(format!(
                "map size must be positive, got {map_size}"
            )));
        }
        let cells = (map_size / cell_size).ceil();
        if !(1.0..=65_536.0).contains(&cells) {
            return Err(BattleError::InvalidGrid(format!(
                "map size {map_size} with cell size {cell_size} gives {cells} cells per side"
            )));
        }
        let side = cells as u32;
        let half = map_size / 2.0;
        Self::new(side, side, cell_size, Vec2::new(-half, -half))
    }

    /// Rasterise circular obstacles onto an open map.
    ///
    /// A cell is blocked when its centre lies inside any obstacle.
    pub fn from_obstacles(map_size: f32, cell_size: f32, obstacles: &[Obstacle]) -> Result<Self> {
        let mut grid = Self::for_map(map_size, cell_size)?;
        for obstacle in obstacles {
            grid.block_circle(obstacle.center, obstacle.radius);
        }
        Ok(grid)
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Cell size in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    fn index(&self, cell: Cell) -> usize {
        (cell.y as usize) * (self.width as usize) + (cell.x as usize)
    }

    /// Check if a cell lies on the grid.
    #[must_use]
    pub const fn in_bounds(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Get the cell type, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, cell: Cell) -> Option<CellType> {
        self.in_bounds(cell).then(|| self.cells[self.index(cell)])
    }

    /// Set a cell type. Returns `false` if out of bounds.
    pub fn set(&mut self, cell: Cell, cell_type: CellType) -> bool {
        if self.in_bounds(cell) {
            let index = self.index(cell);
            self.cells[index] = cell_type;
            true
        } else {
            false
        }
    }

    /// Whether `cell` is on the grid and passable.
    #[must_use]
    pub fn is_passable(&self, cell: Cell) -> bool {
        self.get(cell).is_some_and(CellType::is_passable)
    }

    /// Whether a step from `from` to `to` keeps out of blocked cells.
    ///
    /// A walker already standing in a blocked cell may always step, so a unit
    /// nudged into terrain can walk back out. Steps must be shorter than a cell.
    #[must_use]
    pub fn permits_step(&self, from: Vec2, to: Vec2) -> bool {
        let blocked = |pos: Vec2| self.world_to_cell(pos).is_some_and(|c| !self.is_passable(c));
        blocked(from) || !blocked(to)
    }

    /// Block every cell whose centre lies within `radius` of `center`.
    pub fn block_circle(&mut self, center: Vec2, radius: f32) {
        let r_sq = radius * radius;
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = Cell::new(x, y);
                if self.cell_center(cell).distance_squared(center) <= r_sq {
                    self.set(cell, CellType::Blocked);
                }
            }
        }
    }

    /// Number of blocked cells.
    #[must_use]
    pub fn blocked_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_passable()).count()
    }

    /// Convert a world position to the cell containing it.
    #[must_use]
    pub fn world_to_cell(&self, pos: Vec2) -> Option<Cell> {
        let local = (pos - self.origin) / self.cell_size;
        if !local.is_finite() || local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let x = local.x.floor() as u64;
        let y = local.y.floor() as u64;
        if x < u64::from(self.width) && y < u64::from(self.height) {
            Some(Cell::new(x as u32, y as u32))
        } else {
            None
        }
    }

    /// World position of a cell's centre.
    #[must_use]
    pub fn cell_center(&self, cell: Cell) -> Vec2 {
        self.origin + (Vec2::new(cell.x as f32, cell.y as f32) + 0.5) * self.cell_size
    }

    /// Passable 4-neighbours of a cell, in a fixed order.
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        const DIRECTIONS: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
        DIRECTIONS.iter().filter_map(move |&(dx, dy)| {
            let nx = u32::try_from(i64::from(cell.x) + dx).ok()?;
            let ny = u32::try_from(i64::from(cell.y) + dy).ok()?;
            let next = Cell::new(nx, ny);
            self.is_passable(next).then_some(next)
        })
    }
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    cell: Cell,
    g_score: u32,
    f_score: u32,
    /// Lower coordinates first when `f` ties.
    tie_breaker: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse for lowest f first
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.tie_breaker.cmp(&self.tie_breaker),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[inline]
fn tie_breaker(cell: Cell) -> u64 {
    (u64::from(cell.y) << 32) | u64::from(cell.x)
}

/// Find a shortest 4-connected path between two cells.
///
/// Returns the cells from (excluding) `start` to (including) `goal`. The path
/// is empty when `start == goal`, when the goal is blocked or off the grid,
/// and when no route exists. The start cell itself may be blocked; a unit
/// nudged into an obstacle can still walk out.
#[must_use]
pub fn find_path(grid: &GridMap, start: Cell, goal: Cell) -> Vec<Cell> {
    if start == goal || !grid.in_bounds(start) || !grid.is_passable(goal) {
        return Vec::new();
    }

    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_score: HashMap<Cell, u32> = HashMap::new();

    g_score.insert(start, 0);
    open_set.push(AStarNode {
        cell: start,
        g_score: 0,
        f_score: start.manhattan(goal),
        tie_breaker: tie_breaker(start),
    });

    while let Some(current) = open_set.pop() {
        if current.cell == goal {
            return reconstruct_path(&came_from, start, goal);
        }

        // Skip entries superseded by a cheaper route
        if g_score.get(&current.cell).is_some_and(|&g| g < current.g_score) {
            continue;
        }

        for next in grid.neighbors(current.cell) {
            let tentative_g = current.g_score + 1;
            if g_score.get(&next).is_some_and(|&g| g <= tentative_g) {
                continue;
            }
            came_from.insert(next, current.cell);
            g_score.insert(next, tentative_g);
            open_set.push(AStarNode {
                cell: next,
                g_score: tentative_g,
                f_score: tentative_g + next.manhattan(goal),
                tie_breaker: tie_breaker(next),
            });
        }
    }

    Vec::new()
}

fn reconstruct_path(came_from: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Outcome of planning a walk between two world positions.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Walk through these waypoints; the last one is the exact destination.
    Waypoints(Vec<Vec2>),
    /// No walkable route exists. The caller holds position.
    Unreachable,
}

/// Plan a walk from `from` to `to` in world space.
///
/// Cells on the A* path become cell-centre waypoints, except the last which is
/// replaced by `to` itself. When both ends share a cell the route is `to`
/// directly. With `smooth` set, waypoints that can be skipped without losing
/// line of sight are dropped.
#[must_use]
pub fn plan_route(grid: &GridMap, from: Vec2, to: Vec2, smooth: bool) -> Route {
    let (Some(start), Some(goal)) = (grid.world_to_cell(from), grid.world_to_cell(to)) else {
        return Route::Unreachable;
    };
    if start == goal {
        return Route::Waypoints(vec![to]);
    }

    let cells = find_path(grid, start, goal);
    if cells.is_empty() {
        return Route::Unreachable;
    }

    let mut waypoints: Vec<Vec2> = cells.iter().map(|&c| grid.cell_center(c)).collect();
    if let Some(last) = waypoints.last_mut() {
        *last = to;
    }
    if smooth {
        waypoints = smooth_path(grid, from, waypoints);
    }
    Route::Waypoints(waypoints)
}

/// Drop waypoints that have a clear line of sight past them.
///
/// `from` is the walker's current position; the final waypoint is always kept.
#[must_use]
pub fn smooth_path(grid: &GridMap, from: Vec2, path: Vec<Vec2>) -> Vec<Vec2> {
    if path.len() <= 1 {
        return path;
    }

    let mut smoothed = Vec::with_capacity(path.len());
    let mut current = from;
    let mut index = 0;

    while index < path.len() {
        // Furthest waypoint reachable in a straight line
        let mut furthest = index;
        for check in (index + 1)..path.len() {
            if has_line_of_sight(grid, current, path[check]) {
                furthest = check;
            }
        }
        smoothed.push(path[furthest]);
        current = path[furthest];
        index = furthest + 1;
    }

    smoothed
}

/// Check if the straight segment between two positions only crosses passable cells.
///
/// Bresenham stepping over cells; diagonal steps also require both side cells
/// to be passable so the segment never clips a corner.
#[must_use]
pub fn has_line_of_sight(grid: &GridMap, start: Vec2, end: Vec2) -> bool {
    let (Some(a), Some(b)) = (grid.world_to_cell(start), grid.world_to_cell(end)) else {
        return false;
    };

    let (x0, y0) = (i64::from(a.x), i64::from(a.y));
    let (x1, y1) = (i64::from(b.x), i64::from(b.y));
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    let passable = |x: i64, y: i64| {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) => grid.is_passable(Cell::new(x, y)),
            _ => false,
        }
    };

    let (mut x, mut y) = (x0, y0);
    loop {
        // The walker's own cell may be blocked after a separation nudge
        if (x, y) != (x0, y0) && !passable(x, y) {
            return false;
        }
        if x == x1 && y == y1 {
            return true;
        }

        let e2 = 2 * err;
        if e2 > -dy && e2 < dx && (!passable(x + sx, y) || !passable(x, y + sy)) {
            return false;
        }
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
}
