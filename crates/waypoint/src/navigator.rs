// ChunkNavigator - per chunk cache of waypoint sets
// Outside chunks keep one girth grid per girth: a GG_SIZE x GG_SIZE bucket grid
// over the chunk box (enlarged by one cell all round) listing every waypoint
// whose X-Z bounds touch each cell.

use chunknav_shared::config::Config;
use glam::{Vec2, Vec3};
use tracing::{error, trace, warn};

use crate::chunk::Chunk;
use crate::math::BoundingBox;
use crate::waypoint_set::{WaypointSetId, WaypointSets};

pub const GG_SIZE: usize = 12;

/// Rings searched around the query cell.
const MAX_RING: i32 = GG_SIZE as i32;

const INVALID_HEIGHT: f32 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatorConfig {
    pub use_girth_grids: bool,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self { use_girth_grids: true }
    }
}

impl NavigatorConfig {
    /// Read `Navigation.UseGirthGrids` (default on).
    pub fn from_config(config: &Config) -> Self {
        Self {
            use_girth_grids: config.get_bool_default("Navigation.UseGirthGrids", true),
        }
    }
}

/// A waypoint found by a navigator query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavResult {
    pub set: WaypointSetId,
    pub waypoint: usize,
    /// The waypoint actually contains the query point
    pub exact_match: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GridElement {
    set: WaypointSetId,
    waypoint: usize,
}

#[derive(Debug, Clone)]
struct GirthGrid {
    girth: f32,
    cells: Vec<Vec<GridElement>>,
}

fn cell_index(x: i32, z: i32) -> Option<usize> {
    let size = GG_SIZE as i32;
    ((0..size).contains(&x) && (0..size).contains(&z)).then(|| (x + z * size) as usize)
}

impl GirthGrid {
    fn new(girth: f32) -> Self {
        Self {
            girth,
            cells: vec![Vec::new(); GG_SIZE * GG_SIZE],
        }
    }

    /// Containment search within one cell.
    ///
    /// Ignoring height, the containing waypoint whose top is nearest the
    /// point wins.
    fn find(&self, sets: &WaypointSets, cell: usize, point: Vec3, ignore_height: bool) -> Option<NavResult> {
        let elements = self.cells[cell].iter().filter_map(|e| {
            sets.get(e.set).map(|set| (e, set.waypoint(e.waypoint)))
        });

        if !ignore_height {
            return elements
                .filter(|(_, wp)| wp.contains(point))
                .map(|(e, _)| NavResult {
                    set: e.set,
                    waypoint: e.waypoint,
                    exact_match: true,
                })
                .next();
        }

        let mut best_height = INVALID_HEIGHT;
        let mut res = None;
        for (e, wp) in elements {
            if wp.contains_projection(point) && (wp.max_height() - point.y).abs() < (best_height - point.y).abs() {
                best_height = wp.max_height();
                res = Some(NavResult {
                    set: e.set,
                    waypoint: e.waypoint,
                    exact_match: true,
                });
            }
        }
        res
    }

    /// Nearest-waypoint accumulation over one cell.
    fn find_closest(
        &self,
        sets: &WaypointSets,
        bb: &BoundingBox,
        cell: usize,
        point: Vec3,
        best_distance_squared: &mut f32,
        res: &mut Option<NavResult>,
    ) {
        for e in &self.cells[cell] {
            let Some(set) = sets.get(e.set) else {
                continue;
            };
            let distance_squared = set.waypoint(e.waypoint).distance_squared(bb, point);
            if *best_distance_squared > distance_squared {
                *best_distance_squared = distance_squared;
                *res = Some(NavResult {
                    set: e.set,
                    waypoint: e.waypoint,
                    exact_match: false,
                });
            }
        }

        if let Some(r) = res.as_mut() {
            r.exact_match = sets
                .get(r.set)
                .is_some_and(|set| set.waypoint(r.waypoint).contains(point));
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChunkNavigator {
    sets: Vec<WaypointSetId>,
    use_girth_grids: bool,
    outside: bool,
    /// Chunk-local box, used for grid placement and clipping
    bounding_box: BoundingBox,
    grid_origin: Vec2,
    grid_resolution: f32,
    girth_grids: Vec<GirthGrid>,
}

impl ChunkNavigator {
    pub fn new(chunk: &Chunk, config: &NavigatorConfig) -> Self {
        let bb = chunk.local_bounding_box;
        let max_dim = (bb.max.x - bb.min.x).max(bb.max.z - bb.min.z);

        let mut use_girth_grids = config.use_girth_grids;
        if use_girth_grids && max_dim <= 0.0 {
            warn!(
                "ChunkNavigator: chunk '{}' has an empty bounding box, girth grids disabled",
                chunk.identifier
            );
            use_girth_grids = false;
        }

        // one extra grid square off each edge
        let one_square = max_dim / (GG_SIZE - 2) as f32;
        let (grid_origin, grid_resolution) = if use_girth_grids {
            (
                Vec2::new(bb.min.x - one_square, bb.min.z - one_square),
                1.0 / one_square,
            )
        } else {
            (Vec2::ZERO, 0.0)
        };

        Self {
            sets: Vec::new(),
            use_girth_grids,
            outside: chunk.is_outside_chunk(),
            bounding_box: bb,
            grid_origin,
            grid_resolution,
            girth_grids: Vec::new(),
        }
    }

    fn grids_active(&self) -> bool {
        self.use_girth_grids && self.outside
    }

    pub fn sets(&self) -> &[WaypointSetId] {
        &self.sets
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn has_nav_poly_set(&self, sets: &WaypointSets, girth: f32) -> bool {
        self.sets
            .iter()
            .filter_map(|&id| sets.get(id))
            .any(|set| set.girth() == girth)
    }

    pub fn has_girth_grid(&self, girth: f32) -> bool {
        self.girth_grids.iter().any(|g| g.girth == girth)
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Grid cell holding a chunk-local point, if inside the grid.
    fn grid_cell(&self, point: Vec3) -> (i32, i32) {
        (
            ((point.x - self.grid_origin.x) * self.grid_resolution) as i32,
            ((point.z - self.grid_origin.y) * self.grid_resolution) as i32,
        )
    }

    pub fn add(&mut self, sets: &WaypointSets, id: WaypointSetId) {
        self.sets.push(id);

        if !self.grids_active() {
            return;
        }

        let Some(set) = sets.get(id) else {
            error!("ChunkNavigator::add: set {:?} does not exist", id);
            return;
        };

        let girth = set.girth();
        let grid_index = match self.girth_grids.iter().position(|g| g.girth == girth) {
            Some(index) => index,
            None => {
                self.girth_grids.push(GirthGrid::new(girth));
                self.girth_grids.len() - 1
            }
        };

        let origin = self.grid_origin;
        let resolution = self.grid_resolution;
        let last = GG_SIZE as i32 - 1;
        let grid = &mut self.girth_grids[grid_index];

        for (i, wp) in set.data().iter().enumerate() {
            let mut min = Vec2::splat(INVALID_HEIGHT);
            let mut max = Vec2::splat(-INVALID_HEIGHT);
            for edge in wp.edges {
                let gf = (edge.start - origin) * resolution;
                min = min.min(gf);
                max = max.max(gf);
            }

            for xg in (min.x as i32).max(0)..=(max.x as i32).min(last) {
                for zg in (min.y as i32).max(0)..=(max.y as i32).min(last) {
                    if let Some(cell) = cell_index(xg, zg) {
                        grid.cells[cell].push(GridElement { set: id, waypoint: i });
                    }
                }
            }
        }
    }

    /// Forget a set. Returns false (and logs) if it was never added.
    pub fn del(&mut self, sets: &WaypointSets, id: WaypointSetId) -> bool {
        let Some(pos) = self.sets.iter().position(|&s| s == id) else {
            error!("ChunkNavigator::del: set {:?} is not in this chunk", id);
            return false;
        };
        self.sets.remove(pos);

        if !self.grids_active() {
            return true;
        }

        let girth = sets.get(id).map(|set| set.girth());
        for grid in &mut self.girth_grids {
            if girth.is_some_and(|g| g != grid.girth) {
                continue;
            }
            for cell in &mut grid.cells {
                cell.retain(|e| e.set != id);
            }
        }
        true
    }

    /// Containing waypoint of exactly this girth, ignoring height but
    /// preferring the waypoint whose vertical centre is nearest the point.
    /// Used when binding.
    pub fn find_exactly(&self, sets: &WaypointSets, point: Vec3, girth: f32) -> Option<NavResult> {
        let mut best_distance_squared = f32::MAX;
        let mut res = None;

        for &id in &self.sets {
            let Some(set) = sets.get(id) else {
                continue;
            };
            if set.girth() != girth {
                continue;
            }
            let Some(found) = set.data().find(point, true) else {
                continue;
            };

            let distance = point.y - set.waypoint(found).avg_height();
            let distance_squared = distance * distance;
            if best_distance_squared > distance_squared {
                best_distance_squared = distance_squared;
                res = Some(NavResult {
                    set: id,
                    waypoint: found,
                    exact_match: true,
                });
            }
        }
        res
    }

    /// Waypoint containing, or failing that nearest to, a chunk-local point.
    pub fn find(&self, sets: &WaypointSets, point: Vec3, girth: f32, ignore_height: bool) -> Option<NavResult> {
        if let Some(grid) = self.girth_grids.iter().find(|g| g.girth == girth) {
            return self.find_in_grid(grid, sets, point, ignore_height);
        }

        let matching = || {
            self.sets
                .iter()
                .filter_map(|&id| sets.get(id).map(|set| (id, set)))
                .filter(|(_, set)| set.girth() == girth)
        };

        for (id, set) in matching() {
            if let Some(found) = set.data().find(point, ignore_height) {
                return Some(NavResult {
                    set: id,
                    waypoint: found,
                    exact_match: true,
                });
            }
        }

        // no exact match, so use the closest one
        let mut best_distance_squared = f32::MAX;
        let mut res = None;
        for (id, set) in matching() {
            if let Some(found) = set.data().find_closest(&self.bounding_box, point, &mut best_distance_squared) {
                res = Some(NavResult {
                    set: id,
                    waypoint: found,
                    exact_match: false,
                });
            }
        }
        res
    }

    fn find_in_grid(&self, grid: &GirthGrid, sets: &WaypointSets, point: Vec3, ignore_height: bool) -> Option<NavResult> {
        let (xg, zg) = self.grid_cell(point);
        let Some(cell) = cell_index(xg, zg) else {
            trace!("ChunkNavigator::find: {} is outside the girth grid", point);
            return None;
        };

        if let Some(found) = grid.find(sets, cell, point, ignore_height) {
            return Some(found);
        }

        let mut best_distance_squared = f32::MAX;
        let mut res = None;

        if !ignore_height {
            // no exact height match, look for a layer below the point
            if let Some(found) = grid.find(sets, cell, point, true) {
                if let Some(set) = sets.get(found.set) {
                    let wp = set.waypoint(found.waypoint);
                    if wp.min_height() < point.y {
                        let d = wp.max_height() - point.y;
                        best_distance_squared = d * d;
                    }
                }
                res = Some(found);
            }
        }

        let try_cell = |x: i32, z: i32, best: &mut f32, res: &mut Option<NavResult>| {
            if let Some(cell) = cell_index(x, z) {
                grid.find_closest(sets, &self.bounding_box, cell, point, best, res);
            }
        };

        try_cell(xg, zg, &mut best_distance_squared, &mut res);

        for r in 1..MAX_RING {
            let had_candidate = res.is_some();

            let x_corner = xg - r;
            let z_corner = zg - r;
            for n in 0..r + r {
                try_cell(x_corner + n, zg - r, &mut best_distance_squared, &mut res);
                try_cell(x_corner + n + 1, zg + r, &mut best_distance_squared, &mut res);
                try_cell(xg - r, z_corner + n + 1, &mut best_distance_squared, &mut res);
                try_cell(xg + r, z_corner + n, &mut best_distance_squared, &mut res);
            }

            // A candidate from the previous ring is close enough. Large
            // waypoints are bucketed by their bounds, so this can miss a
            // nearer one further out.
            if had_candidate {
                return res;
            }
        }

        None
    }
}
