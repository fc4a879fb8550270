// Navmesh - packed binary waypoint sets and the cache of loaded ones
//
// A navmesh file is a run of records, one per girth, little-endian:
//   i32 version (0), f32 girth, i32 polyCount, i32 edgeCount
//   polyCount x { f32 minHeight, f32 maxHeight, i32 vertexCount }
//   edgeCount x { f32 x, f32 z, i32 neighbour }
// Neighbour codes are stored already encoded. Coordinates are chunk-local.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Weak};

use chunknav_shared::util::ByteBuffer;
use glam::Vec2;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::waypoint::Edge;
use crate::waypoint_set_data::WaypointSetData;
use crate::{NavError, Result};

pub const NAVMESH_VERSION: i32 = 0;

/// Bytes per packed poly and per packed edge.
const POLY_SIZE: usize = 12;
const EDGE_SIZE: usize = 12;

fn bad(source: &str, reason: impl Into<String>) -> NavError {
    NavError::BadNavmesh {
        resource: source.to_string(),
        reason: reason.into(),
    }
}

/// Decode every record of a navmesh. An empty buffer holds no sets.
pub fn decode_navmesh(bytes: Vec<u8>, source: &str) -> Result<Vec<WaypointSetData>> {
    let mut buf = ByteBuffer::from_bytes(bytes);
    let mut sets = Vec::new();

    while buf.remaining() > 0 {
        let truncated = |e: std::io::Error| bad(source, e.to_string());

        let version = buf.read_i32().map_err(truncated)?;
        if version != NAVMESH_VERSION {
            return Err(bad(source, format!("record {} has version {}", sets.len(), version)));
        }
        let girth = buf.read_f32().map_err(truncated)?;
        let poly_count = buf.read_i32().map_err(truncated)?;
        let edge_count = buf.read_i32().map_err(truncated)?;
        if poly_count < 0 || edge_count < 0 {
            return Err(bad(source, format!("negative counts {} / {}", poly_count, edge_count)));
        }

        let poly_count = poly_count as usize;
        if poly_count.saturating_mul(POLY_SIZE) > buf.remaining() {
            return Err(bad(
                source,
                format!("{} polys do not fit in {} bytes", poly_count, buf.remaining()),
            ));
        }

        let mut polys = Vec::with_capacity(poly_count);
        for _ in 0..poly_count {
            let min_height = buf.read_f32().map_err(truncated)?;
            let max_height = buf.read_f32().map_err(truncated)?;
            let vertex_count = buf.read_i32().map_err(truncated)?;
            polys.push((min_height, max_height, vertex_count.max(0) as usize));
        }

        let total: usize = polys.iter().map(|p| p.2).sum();
        if total != edge_count as usize {
            return Err(bad(
                source,
                format!("polys use {} edges, record has {}", total, edge_count),
            ));
        }
        if total.saturating_mul(EDGE_SIZE) > buf.remaining() {
            return Err(bad(
                source,
                format!("{} edges do not fit in {} bytes", total, buf.remaining()),
            ));
        }

        let mut data = WaypointSetData::new(girth);
        let mut edges = Vec::new();
        for (min_height, max_height, vertex_count) in polys {
            edges.clear();
            for _ in 0..vertex_count {
                let x = buf.read_f32().map_err(truncated)?;
                let z = buf.read_f32().map_err(truncated)?;
                let neighbour = buf.read_i32().map_err(truncated)? as u32;
                if neighbour < 32768 && neighbour as usize >= poly_count {
                    return Err(bad(
                        source,
                        format!("edge links to waypoint {} of {}", neighbour, poly_count),
                    ));
                }
                edges.push(Edge::new(Vec2::new(x, z), neighbour));
            }
            data.push_waypoint(min_height, max_height, &edges);
        }
        data.set_source(source);
        sets.push(data);
    }

    Ok(sets)
}

/// Pack sets into the navmesh format, one record each.
pub fn encode_navmesh<'a>(sets: impl IntoIterator<Item = &'a WaypointSetData>) -> Vec<u8> {
    let mut buf = ByteBuffer::new();
    for data in sets {
        buf.write_i32(NAVMESH_VERSION);
        buf.write_f32(data.girth());
        buf.write_i32(data.waypoint_count() as i32);
        buf.write_i32(data.edges().len() as i32);

        for wp in data.iter() {
            buf.write_f32(wp.min_height());
            buf.write_f32(wp.max_height());
            buf.write_i32(wp.edge_count() as i32);
        }
        for wp in data.iter() {
            for edge in wp.edges {
                buf.write_f32(edge.start.x);
                buf.write_f32(edge.start.y);
                buf.write_u32(edge.neighbour);
            }
        }
    }
    buf.into_inner()
}

/// Navmesh records already loaded, keyed by resource.
///
/// Entries are weak: a record can only be reused while every set decoded
/// from it is still held by some waypoint set.
#[derive(Debug, Default)]
pub struct NavmeshPopulation {
    records: Mutex<HashMap<String, Vec<Weak<WaypointSetData>>>>,
}

impl NavmeshPopulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// All sets of a live record, or None if any has been dropped.
    pub fn claim(&self, source: &str) -> Option<Vec<Arc<WaypointSetData>>> {
        let records = self.records.lock();
        records
            .get(source)?
            .iter()
            .map(Weak::upgrade)
            .collect()
    }

    pub fn insert(&self, source: &str, sets: &[Arc<WaypointSetData>]) {
        let record = sets.iter().map(Arc::downgrade).collect();
        self.records.lock().insert(source.to_string(), record);
    }

    pub fn remove(&self, source: &str) -> bool {
        self.records.lock().remove(source).is_some()
    }

    /// Drop records that can no longer be claimed. Returns how many went.
    pub fn prune(&self) -> usize {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| record.iter().all(|w| w.strong_count() > 0));
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Sets of the navmesh at `path`, shared with earlier loads when
    /// possible.
    pub fn load(&self, path: &Path) -> Result<Vec<Arc<WaypointSetData>>> {
        self.load_with(&path.to_string_lossy(), || std::fs::read(path))
    }

    /// As `load`, reading the bytes with `read` only on a cache miss.
    pub fn load_with(
        &self,
        source: &str,
        read: impl FnOnce() -> std::io::Result<Vec<u8>>,
    ) -> Result<Vec<Arc<WaypointSetData>>> {
        if let Some(sets) = self.claim(source) {
            debug!("Navmesh '{}': reusing {} loaded sets", source, sets.len());
            return Ok(sets);
        }

        let bytes = read().map_err(|e| {
            error!("Could not read navmesh '{}': {}", source, e);
            NavError::Io(e)
        })?;

        // empty navmeshes are not kept
        if bytes.is_empty() {
            return Ok(Vec::new());
        }

        let sets: Vec<Arc<WaypointSetData>> = decode_navmesh(bytes, source)?
            .into_iter()
            .map(Arc::new)
            .collect();
        self.insert(source, &sets);
        Ok(sets)
    }
}
