// WaypointSetData - the waypoints of one girth in one chunk
// Loaded once, transformed into chunk-local space, then shared read-only.

use std::collections::HashMap;

use glam::{Affine3A, Vec2, Vec3};
use tracing::error;

use crate::data_section::DataSection;
use crate::math::BoundingBox;
use crate::waypoint::{
    ADJACENT_TO_CHUNK, CHUNK_ADJACENT_CONSTANT, Edge, EdgeRange, Waypoint, WaypointRef, calc_centre,
};
use crate::{NavError, Result};

pub const DEFAULT_GIRTH: f32 = 0.5;

const HEIGHT_TOLERANCE: f32 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct WaypointSetData {
    girth: f32,
    waypoints: Vec<Waypoint>,
    edges: Vec<Edge>,
    source: String,
}

impl Default for WaypointSetData {
    fn default() -> Self {
        Self::new(DEFAULT_GIRTH)
    }
}

impl WaypointSetData {
    pub fn new(girth: f32) -> Self {
        Self {
            girth,
            waypoints: Vec::new(),
            edges: Vec::new(),
            source: String::new(),
        }
    }

    /// Append a waypoint whose edges are already encoded. Returns its index.
    pub fn push_waypoint(&mut self, min_height: f32, max_height: f32, edges: &[Edge]) -> usize {
        let range = EdgeRange {
            offset: self.edges.len(),
            len: edges.len(),
        };
        self.edges.extend_from_slice(edges);
        self.waypoints.push(Waypoint {
            min_height,
            max_height,
            centre: calc_centre(edges),
            edges: range,
        });
        self.waypoints.len() - 1
    }

    /// Parse every child called `section_name` (`waypoint`, or `navPoly` for
    /// older data) as a waypoint.
    ///
    /// A vertex is `x z neighbour`. The neighbour is the id of the waypoint
    /// across that edge, `CHUNK_ADJACENT_CONSTANT` (or an `adjacentChunk`
    /// child) for the chunk boundary, or zero/negative for a vista mask.
    pub fn load_from_section(section: &DataSection, section_name: &str) -> Result<Self> {
        let mut data = Self::new(section.read_float("girth", DEFAULT_GIRTH));
        let mut ids: HashMap<i32, usize> = HashMap::new();

        for waypoint in section.children_named(section_name) {
            let index = data.waypoints.len();
            ids.insert(waypoint.as_int(), index);

            let height = waypoint.read_float("height", 0.0);
            let min_height = waypoint.read_float("minHeight", height);
            let max_height = waypoint.read_float("maxHeight", height);

            let edges: Vec<Edge> = waypoint
                .children_named("vertex")
                .map(|vertex| {
                    let v = vertex.as_vector3();
                    let vzi = v.z as i32;
                    let neighbour = if vertex.open_section("adjacentChunk").is_some()
                        || vzi == CHUNK_ADJACENT_CONSTANT
                    {
                        ADJACENT_TO_CHUNK
                    } else if vzi > 0 {
                        vzi as u32
                    } else {
                        !vzi.wrapping_neg() as u32
                    };
                    Edge::new(Vec2::new(v.x, v.y), neighbour)
                })
                .collect();

            if edges.len() < 3 {
                error!(
                    "WaypointSetData::load: waypoint index {} has only {} edges",
                    index,
                    edges.len()
                );
                return Err(NavError::DegenerateWaypoint {
                    waypoint: index,
                    edges: edges.len(),
                });
            }

            data.push_waypoint(min_height, max_height, &edges);
        }

        // ids to indices
        for (wi, waypoint) in data.waypoints.iter().enumerate() {
            let range = waypoint.edges;
            for (ei, edge) in data.edges[range.range()].iter_mut().enumerate() {
                let Some(id) = edge.neighbouring_waypoint() else {
                    continue;
                };
                match ids.get(&(id as i32)) {
                    Some(&index) => edge.neighbour = index as u32,
                    None => {
                        error!(
                            "WaypointSetData::load: Cannot find neighbouring waypoint {} on edge {} of waypoint index {}",
                            id, ei, wi
                        );
                        return Err(NavError::UnknownNeighbour {
                            id: id as u32,
                            edge: ei,
                            waypoint: wi,
                        });
                    }
                }
            }
        }

        Ok(data)
    }

    /// Apply a transform whose Y axis points straight up (not checked).
    pub fn transform(&mut self, m: &Affine3A) {
        let y_scale = m.matrix3.y_axis.y;
        let y_offset = m.translation.y;

        for waypoint in &mut self.waypoints {
            waypoint.min_height = y_scale * waypoint.min_height + y_offset;
            waypoint.max_height = y_scale * waypoint.max_height + y_offset;

            let edges = &mut self.edges[waypoint.edges.range()];
            for edge in edges.iter_mut() {
                let v = m.transform_point3(Vec3::new(edge.start.x, 0.0, edge.start.y));
                edge.start = Vec2::new(v.x, v.z);
            }
            waypoint.centre = calc_centre(edges);
        }
    }

    /// Waypoint containing `point`.
    ///
    /// Ignoring height, a waypoint whose range covers the point wins outright;
    /// otherwise the one whose average height is nearest the point.
    pub fn find(&self, point: Vec3, ignore_height: bool) -> Option<usize> {
        let mut best = None;
        let mut best_height_diff = f32::MAX;

        for (i, wp) in self.iter().enumerate() {
            if !ignore_height {
                if wp.contains(point) {
                    return Some(i);
                }
                continue;
            }

            if !wp.contains_projection(point) {
                continue;
            }
            if point.y > wp.min_height() - HEIGHT_TOLERANCE && point.y < wp.max_height() + HEIGHT_TOLERANCE {
                return Some(i);
            }
            let diff = (point.y - wp.avg_height()).abs();
            if best_height_diff > diff {
                best_height_diff = diff;
                best = Some(i);
            }
        }
        best
    }

    /// Waypoint nearest to `point` that beats `best_distance_squared`, which
    /// is lowered to the new best.
    pub fn find_closest(&self, bb: &BoundingBox, point: Vec3, best_distance_squared: &mut f32) -> Option<usize> {
        let mut best = None;
        for (i, wp) in self.iter().enumerate() {
            let distance_squared = wp.distance_squared(bb, point);
            if *best_distance_squared > distance_squared {
                *best_distance_squared = distance_squared;
                best = Some(i);
            }
        }
        best
    }

    pub fn girth(&self) -> f32 {
        self.girth
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    pub fn waypoint(&self, index: usize) -> WaypointRef<'_> {
        let waypoint = &self.waypoints[index];
        WaypointRef {
            waypoint,
            edges: &self.edges[waypoint.edges.range()],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = WaypointRef<'_>> {
        self.waypoints.iter().map(|waypoint| WaypointRef {
            waypoint,
            edges: &self.edges[waypoint.edges.range()],
        })
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Index of a waypoint's edge in the flat edge buffer.
    pub fn absolute_edge_index(&self, waypoint: usize, edge: usize) -> u32 {
        (self.waypoints[waypoint].edges.offset + edge) as u32
    }

    /// Waypoint and local edge index for an absolute edge index.
    pub fn edge_location(&self, absolute: u32) -> Option<(usize, usize)> {
        let absolute = absolute as usize;
        self.waypoints
            .iter()
            .position(|wp| wp.edges.range().contains(&absolute))
            .map(|wi| (wi, absolute - self.waypoints[wi].edges.offset))
    }
}
