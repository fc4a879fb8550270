// Waypoint - convex polygon of walkable space with a vertical extent
// Polygons live in the chunk-local X-Z plane; edges are stored in the owning
// set data's flat edge buffer and referenced by range.

use std::ops::Range;

use glam::{Vec2, Vec3};

use crate::math::BoundingBox;

/// Neighbour code written for edges on the chunk boundary that have not been
/// resolved to another chunk's waypoint.
pub const ADJACENT_TO_CHUNK: u32 = 65535;

/// Vertex neighbour value marking a chunk boundary edge in waypoint data.
pub const CHUNK_ADJACENT_CONSTANT: i32 = 30000;

/// Fudge for points on a shared edge.
const EDGE_TOLERANCE: f32 = 0.01;
const HEIGHT_TOLERANCE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub start: Vec2,
    /// Below 32768 a waypoint index in the same set, 32768..=65535 the chunk
    /// boundary, negative (as i32) an inverted vista mask.
    pub neighbour: u32,
}

impl Edge {
    pub fn new(start: Vec2, neighbour: u32) -> Self {
        Self { start, neighbour }
    }

    pub fn neighbouring_waypoint(&self) -> Option<usize> {
        (self.neighbour < 32768).then_some(self.neighbour as usize)
    }

    pub fn adjacent_to_chunk(&self) -> bool {
        (32768..=65535).contains(&self.neighbour)
    }

    pub fn neighbouring_vista(&self) -> u32 {
        if (self.neighbour as i32) < 0 {
            !self.neighbour
        } else {
            0
        }
    }
}

/// `(offset, len)` into a set data's edge buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeRange {
    pub offset: usize,
    pub len: usize,
}

impl EdgeRange {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub min_height: f32,
    pub max_height: f32,
    pub centre: Vec2,
    pub edges: EdgeRange,
}

impl Waypoint {
    pub fn avg_height(&self) -> f32 {
        (self.min_height + self.max_height) / 2.0
    }
}

/// Length weighted average of the edge midpoints.
pub fn calc_centre(edges: &[Edge]) -> Vec2 {
    let n = edges.len();
    if n == 0 {
        return Vec2::ZERO;
    }

    let mut total_length = 0.0;
    let mut centre = Vec2::ZERO;
    for i in 0..n {
        let start = edges[i].start;
        let end = edges[(i + 1) % n].start;
        let length = (end - start).length();
        centre += (start + end) / 2.0 * length;
        total_length += length;
    }

    if total_length > 0.0 {
        centre / total_length
    } else {
        edges[0].start
    }
}

/// Projection of `point` onto the segment, if it lands within it.
fn project_point_to_line(start: Vec2, end: Vec2, point: Vec2) -> Option<Vec2> {
    let length = (end - start).length();
    let dir = (end - start).normalize_or_zero();
    let dot = (point - start).dot(dir);
    (0.0..=length).contains(&dot).then(|| start + dir * dot)
}

/// A waypoint together with its edges.
#[derive(Debug, Clone, Copy)]
pub struct WaypointRef<'a> {
    pub waypoint: &'a Waypoint,
    pub edges: &'a [Edge],
}

impl<'a> WaypointRef<'a> {
    pub fn min_height(&self) -> f32 {
        self.waypoint.min_height
    }

    pub fn max_height(&self) -> f32 {
        self.waypoint.max_height
    }

    pub fn avg_height(&self) -> f32 {
        self.waypoint.avg_height()
    }

    pub fn centre(&self) -> Vec2 {
        self.waypoint.centre
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The edge's end point, which is the next edge's start.
    pub fn edge_end(&self, i: usize) -> Vec2 {
        self.edges[(i + 1) % self.edges.len()].start
    }

    /// Inclusive point test including the height range (with tolerance).
    pub fn contains(&self, point: Vec3) -> bool {
        if point.y < self.waypoint.min_height - HEIGHT_TOLERANCE {
            return false;
        }
        if point.y > self.waypoint.max_height + HEIGHT_TOLERANCE {
            return false;
        }
        self.contains_projection(point)
    }

    /// 1.0 for clockwise polygons in (x, z), -1.0 for counter-clockwise.
    /// Degenerate polygons count as clockwise.
    fn winding(&self) -> f32 {
        let n = self.edges.len();
        let area: f32 = (0..n)
            .map(|i| self.edges[i].start.perp_dot(self.edges[(i + 1) % n].start))
            .sum();
        if area > 0.0 { -1.0 } else { 1.0 }
    }

    /// Whether the point's X-Z projection is within the polygon. Either
    /// winding is accepted as long as it is consistent.
    pub fn contains_projection(&self, point: Vec3) -> bool {
        let Some(last) = self.edges.last() else {
            return false;
        };
        let winding = self.winding();

        let mut prev = last.start;
        for edge in self.edges {
            let this = edge.start;
            let u = this.x - prev.x;
            let v = this.y - prev.y;
            let xd = point.x - prev.x;
            let zd = point.z - prev.y;

            if winding * (xd * v - zd * u) <= -EDGE_TOLERANCE {
                return false;
            }
            prev = this;
        }
        true
    }

    pub fn distance_squared(&self, bb: &BoundingBox, point: Vec3) -> f32 {
        let mut clipped = point;
        self.clip(bb, &mut clipped);
        (point - clipped).length_squared()
    }

    /// Move `point` to the nearest legal point of this waypoint that is also
    /// inside the chunk box `bb`. The result is at the waypoint's max height.
    pub fn clip(&self, bb: &BoundingBox, point: &mut Vec3) {
        let edges = self.edges;
        let n = edges.len();
        if n == 0 {
            return;
        }

        let winding = self.winding();
        let mut prev = edges[n - 1].start;
        let outside = edges.iter().any(|edge| {
            let edge_vec = edge.start - prev;
            let point_vec = Vec2::new(point.x - prev.x, point.z - prev.y);
            prev = edge.start;
            winding * edge_vec.perp_dot(point_vec) > 0.0
        });

        if outside {
            let p2d = Vec2::new(point.x, point.z);
            let mut best = 0;
            let mut best_dist = f32::MAX;
            for (i, edge) in edges.iter().enumerate() {
                let dist = (edge.start - p2d).length_squared();
                if dist < best_dist {
                    best_dist = dist;
                    best = i;
                }
            }

            let vertex = edges[best].start;
            let prev = edges[(best + n - 1) % n].start;
            let next = edges[(best + 1) % n].start;
            let clipped = project_point_to_line(vertex, prev, p2d)
                .or_else(|| project_point_to_line(vertex, next, p2d))
                .unwrap_or(vertex);

            point.x = clipped.x;
            point.z = clipped.y;
        }

        let centre_y = bb.centre().y;
        point.y = centre_y;

        if !bb.intersects(*point) {
            if let Some(i) = edges.iter().position(|e| !e.adjacent_to_chunk()) {
                let a = edges[i].start;
                let b = edges[(i + 1) % n].start;
                let mut start = Vec3::new(a.x, centre_y, a.y);
                let mut end = Vec3::new(b.x, centre_y, b.y);

                bb.clip(&mut start, &mut end);
                let mut middle = (start + end) / 2.0;
                bb.clip(&mut middle, point);

                let dir = (middle - *point).normalize_or_zero();
                *point += dir * EDGE_TOLERANCE;
            }
        }

        point.y = self.waypoint.max_height;
    }
}
