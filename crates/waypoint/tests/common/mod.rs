// Shared fixtures: rows of 10x10 chunks joined by portals along x.

#![allow(dead_code)]

use chunknav_waypoint::{ChunkId, ChunkSpace, DataSection, NavigatorConfig, WaypointSetId};
use std::collections::BTreeSet;

pub const CHUNK_SIZE: f32 = 10.0;

pub fn chunk_name(i: usize, outside: bool) -> String {
    format!("c{:02}{}", i, if outside { 'o' } else { 'i' })
}

fn vec3(name: &str, x: f32, y: f32, z: f32) -> DataSection {
    DataSection::new(name, format!("{} {} {}", x, y, z))
}

fn portal(neighbour: &str, points: [(f32, f32); 4]) -> DataSection {
    let mut portal = DataSection::new("portal", "")
        .with_child(DataSection::new("chunk", neighbour))
        .with_child(vec3("uAxis", 0.0, 1.0, 0.0));
    for (u, v) in points {
        portal.push(vec3("point", u, v, 0.0));
    }
    portal
}

/// One square navPoly covering the chunk. Its x = 0 edge (edge 0) and
/// x = 10 edge (edge 2) are chunk boundaries when `west` / `east` are set.
pub fn square_nav_poly_set(west: bool, east: bool, height: f32) -> DataSection {
    let code = |boundary: bool| if boundary { 30000 } else { 0 };
    DataSection::new("navPolySet", "").with_child(
        DataSection::new("navPoly", "1")
            .with_child(DataSection::new("height", height.to_string()))
            .with_child(vec3("vertex", 0.0, 0.0, code(west) as f32))
            .with_child(vec3("vertex", 0.0, 10.0, 0.0))
            .with_child(vec3("vertex", 10.0, 10.0, code(east) as f32))
            .with_child(vec3("vertex", 10.0, 0.0, 0.0)),
    )
}

/// Description of chunk `i` of an `n` chunk row. The chunk sits at
/// x = 10 * i, has portals to its row neighbours and one square navPoly.
pub fn row_chunk_section(i: usize, n: usize, outside: bool) -> DataSection {
    let x = i as f32 * CHUNK_SIZE;
    let mut section = DataSection::new("chunk", chunk_name(i, outside))
        .with_child(DataSection::new("outside", outside.to_string()))
        .with_child(DataSection::new("transform", "").with_child(vec3("row3", x, 0.0, 0.0)))
        .with_child(
            DataSection::new("boundingBox", "")
                .with_child(vec3("min", x, -5.0, 0.0))
                .with_child(vec3("max", x + CHUNK_SIZE, 5.0, CHUNK_SIZE)),
        );

    if i > 0 {
        section.push(
            DataSection::new("boundary", "")
                .with_child(vec3("normal", 1.0, 0.0, 0.0))
                .with_child(DataSection::new("d", "0"))
                .with_child(portal(
                    &chunk_name(i - 1, outside),
                    [(-5.0, 0.0), (5.0, 0.0), (5.0, 10.0), (-5.0, 10.0)],
                )),
        );
    }
    if i + 1 < n {
        section.push(
            DataSection::new("boundary", "")
                .with_child(vec3("normal", -1.0, 0.0, 0.0))
                .with_child(DataSection::new("d", "-10"))
                .with_child(portal(
                    &chunk_name(i + 1, outside),
                    [(-5.0, -10.0), (5.0, -10.0), (5.0, 0.0), (-5.0, 0.0)],
                )),
        );
    }

    section.with_child(square_nav_poly_set(i > 0, i + 1 < n, 0.0))
}

pub struct Row {
    pub space: ChunkSpace,
    pub chunks: Vec<ChunkId>,
    pub sections: Vec<DataSection>,
}

impl Row {
    /// A loaded but unbound row of `n` chunks.
    pub fn new(n: usize, outside: bool) -> Self {
        let sections: Vec<DataSection> = (0..n).map(|i| row_chunk_section(i, n, outside)).collect();
        let mut space_section = DataSection::new("space", "row");
        for s in &sections {
            space_section.push(s.clone());
        }

        let mut space = ChunkSpace::new(NavigatorConfig::default());
        let chunks = space.load_space(&space_section).unwrap();
        assert_eq!(chunks.len(), n);
        Self { space, chunks, sections }
    }

    pub fn reload(&mut self, i: usize) {
        self.space.load_chunk(self.chunks[i], &self.sections[i]).unwrap();
    }

    /// The only set of chunk `i`.
    pub fn set(&self, i: usize) -> WaypointSetId {
        let sets = self.space.chunk_sets(self.chunks[i]);
        assert_eq!(sets.len(), 1, "chunk {} should hold one set", i);
        sets[0]
    }
}

/// Every connection has exactly one backlink on the other side, every
/// backlink has a connection, and every edge label uses a connection.
pub fn assert_graph_consistent(space: &ChunkSpace) {
    for (id, set) in space.sets() {
        for (&target, _) in set.connections() {
            let other = space.set(target).expect("connection to a live set");
            let count = other.backlinks().iter().filter(|&&b| b == id).count();
            assert_eq!(count, 1, "connection {:?} -> {:?} needs one backlink", id, target);
        }
        for &back in set.backlinks() {
            let other = space.set(back).expect("backlink to a live set");
            assert!(
                other.connections().contains_key(&id),
                "backlink {:?} in {:?} has no connection",
                back,
                id
            );
        }
        let used: BTreeSet<WaypointSetId> = set.edge_labels().values().copied().collect();
        for target in used {
            assert!(set.connections().contains_key(&target));
        }
        assert!(set.chunk().is_some(), "live set outside every chunk");
    }
}
