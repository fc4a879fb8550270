// Reports printed by the navtool subcommands, as text or JSON

use std::collections::HashMap;
use std::fmt;

use chunknav_waypoint::{ChunkId, ChunkSpace, NavResult, WaypointSet, WaypointSetId};
use glam::Vec3;
use serde::Serialize;

/// `chunk#n`, n being the set's position among its chunk's sets.
fn set_labels(space: &ChunkSpace) -> HashMap<WaypointSetId, String> {
    let mut labels = HashMap::new();
    for (id, chunk) in space.chunks() {
        for (n, set) in space.chunk_sets(id).into_iter().enumerate() {
            labels.insert(set, format!("{}#{}", chunk.identifier, n));
        }
    }
    labels
}

fn chunk_name(space: &ChunkSpace, id: ChunkId) -> String {
    space
        .chunk(id)
        .map_or_else(|| "?".to_string(), |c| c.identifier.clone())
}

#[derive(Debug, Serialize)]
pub struct SetSummary {
    pub girth: f32,
    pub waypoints: usize,
    pub edges: usize,
    pub boundary_edges: usize,
    pub source: String,
}

impl SetSummary {
    fn new(set: &WaypointSet) -> Self {
        let data = set.data();
        Self {
            girth: data.girth(),
            waypoints: data.waypoint_count(),
            edges: data.edges().len(),
            boundary_edges: data.edges().iter().filter(|e| e.adjacent_to_chunk()).count(),
            source: data.source().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChunkSummary {
    pub name: String,
    pub outside: bool,
    pub state: String,
    pub portals: usize,
    pub sets: Vec<SetSummary>,
}

#[derive(Debug, Serialize)]
pub struct SpaceReport {
    pub chunks: Vec<ChunkSummary>,
}

impl SpaceReport {
    pub fn new(space: &ChunkSpace) -> Self {
        let chunks = space
            .chunks()
            .map(|(id, chunk)| ChunkSummary {
                name: chunk.identifier.clone(),
                outside: chunk.is_outside_chunk(),
                state: format!("{:?}", chunk.state),
                portals: chunk.portals().count(),
                sets: space
                    .chunk_sets(id)
                    .into_iter()
                    .filter_map(|s| space.set(s))
                    .map(SetSummary::new)
                    .collect(),
            })
            .collect();
        Self { chunks }
    }
}

impl fmt::Display for SpaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in &self.chunks {
            writeln!(
                f,
                "{} ({}, {}): {} portals, {} waypoint sets",
                chunk.name,
                if chunk.outside { "outside" } else { "inside" },
                chunk.state,
                chunk.portals,
                chunk.sets.len()
            )?;
            for set in &chunk.sets {
                writeln!(
                    f,
                    "  girth {}: {} waypoints, {} edges ({} on the boundary){}",
                    set.girth,
                    set.waypoints,
                    set.edges,
                    set.boundary_edges,
                    if set.source.is_empty() { String::new() } else { format!(" from {}", set.source) }
                )?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct QueryReport {
    pub point: [f32; 3],
    pub set: Option<String>,
    pub waypoint: Option<usize>,
    pub exact_match: bool,
    pub min_height: Option<f32>,
    pub max_height: Option<f32>,
}

impl QueryReport {
    pub fn new(space: &ChunkSpace, point: Vec3, found: Option<(ChunkId, NavResult)>) -> Self {
        let labels = set_labels(space);
        let hit = found.and_then(|(_, r)| space.set(r.set).map(|set| (r, set.waypoint(r.waypoint))));

        Self {
            point: point.to_array(),
            set: found.and_then(|(_, r)| labels.get(&r.set).cloned()),
            waypoint: found.map(|(_, r)| r.waypoint),
            exact_match: found.is_some_and(|(_, r)| r.exact_match),
            min_height: hit.map(|(_, wp)| wp.min_height()),
            max_height: hit.map(|(_, wp)| wp.max_height()),
        }
    }
}

impl fmt::Display for QueryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z] = self.point;
        match (&self.set, self.waypoint) {
            (Some(set), Some(waypoint)) => writeln!(
                f,
                "({}, {}, {}): waypoint {} of {}, heights {}..{}{}",
                x,
                y,
                z,
                waypoint,
                set,
                self.min_height.unwrap_or_default(),
                self.max_height.unwrap_or_default(),
                if self.exact_match { "" } else { " (nearest)" }
            ),
            _ => writeln!(f, "({}, {}, {}): no waypoint", x, y, z),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Link {
    pub to: String,
    pub through_chunk: String,
    pub portal: usize,
    pub edges: Vec<u32>,
}

#[derive(Debug, Serialize)]
pub struct SetLinks {
    pub set: String,
    pub girth: f32,
    pub links: Vec<Link>,
    pub backlinks: usize,
    pub unbound_edges: usize,
}

#[derive(Debug, Serialize)]
pub struct BindReport {
    pub sets: Vec<SetLinks>,
}

impl BindReport {
    pub fn new(space: &ChunkSpace) -> Self {
        let labels = set_labels(space);
        let label = |id: &WaypointSetId| labels.get(id).cloned().unwrap_or_else(|| format!("{:?}", id));

        let mut sets: Vec<SetLinks> = space
            .sets()
            .iter()
            .map(|(id, set)| SetLinks {
                set: label(&id),
                girth: set.girth(),
                links: set
                    .connections()
                    .iter()
                    .map(|(target, portal)| Link {
                        to: label(target),
                        through_chunk: chunk_name(space, portal.chunk),
                        portal: portal.index,
                        edges: set
                            .edge_labels()
                            .iter()
                            .filter(|(_, t)| *t == target)
                            .map(|(&edge, _)| edge)
                            .collect(),
                    })
                    .collect(),
                backlinks: set.backlinks().len(),
                unbound_edges: set.unbound_edge_count(),
            })
            .collect();
        sets.sort_by(|a, b| a.set.cmp(&b.set));
        Self { sets }
    }
}

impl fmt::Display for BindReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for set in &self.sets {
            writeln!(
                f,
                "{} (girth {}): {} links, {} backlinks, {} unbound edges",
                set.set,
                set.girth,
                set.links.len(),
                set.backlinks,
                set.unbound_edges
            )?;
            for link in &set.links {
                writeln!(
                    f,
                    "  -> {} via portal {} of {}, edges {:?}",
                    link.to, link.portal, link.through_chunk, link.edges
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunknav_waypoint::{Chunk, BoundingBox, DataSection};
    use glam::Affine3A;

    fn space_with_one_square() -> (ChunkSpace, ChunkId) {
        let mut space = ChunkSpace::default();
        let chunk = Chunk::new(
            "0000ffffo",
            Affine3A::IDENTITY,
            BoundingBox::new(Vec3::new(0.0, -5.0, 0.0), Vec3::new(10.0, 5.0, 10.0)),
            true,
        );
        let id = space.add_chunk(chunk);
        let section = DataSection::new("chunk", "0000ffffo").with_child(
            DataSection::new("navPolySet", "").with_child(
                DataSection::new("navPoly", "1")
                    .with_child(DataSection::new("vertex", "0 0 30000"))
                    .with_child(DataSection::new("vertex", "0 10 0"))
                    .with_child(DataSection::new("vertex", "10 10 0"))
                    .with_child(DataSection::new("vertex", "10 0 0")),
            ),
        );
        space.load_chunk(id, &section).unwrap();
        (space, id)
    }

    #[test]
    fn test_space_report() {
        let (space, _) = space_with_one_square();
        let report = SpaceReport::new(&space);
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].state, "Loaded");
        assert_eq!(report.chunks[0].sets[0].boundary_edges, 1);
        assert!(report.to_string().contains("1 waypoint sets"));
    }

    #[test]
    fn test_query_report() {
        let (space, _) = space_with_one_square();
        let point = Vec3::new(5.0, 0.0, 5.0);
        let report = QueryReport::new(&space, point, space.find_world(point, 0.5, false));
        assert_eq!(report.set.as_deref(), Some("0000ffffo#0"));
        assert_eq!(report.waypoint, Some(0));
        assert!(report.exact_match);

        let empty = QueryReport::new(&space, point, None);
        assert!(empty.to_string().contains("no waypoint"));
    }

    #[test]
    fn test_bind_report_counts_unbound_edges() {
        let (mut space, id) = space_with_one_square();
        space.bind_chunk(id);
        let report = BindReport::new(&space);
        assert_eq!(report.sets.len(), 1);
        assert!(report.sets[0].links.is_empty());
        assert_eq!(report.sets[0].unbound_edges, 1);
    }
}
