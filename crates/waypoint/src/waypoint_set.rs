// WaypointSet - a chunk's waypoints of one girth, plus their links to the
// waypoint sets of neighbouring chunks.
//
// Sets live in the ChunkSpace arena and refer to each other by handle. Every
// connection A -> B is mirrored by a backlink A in B, so either side can tear
// the link down. Boundary edges keep their 65535 neighbour code forever; which
// set an edge leads to is recorded in the edge label table instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use slotmap::{SlotMap, new_key_type};
use tracing::{debug, error, trace, warn};

use crate::chunk::{Chunk, ChunkId, ChunkState, PortalChoice, PortalRef};
use crate::space::ChunkSpace;
use crate::waypoint::{ADJACENT_TO_CHUNK, WaypointRef};
use crate::waypoint_set_data::WaypointSetData;

new_key_type! {
    /// Generation-checked handle to a waypoint set in a `ChunkSpace`.
    pub struct WaypointSetId;
}

pub type WaypointSets = SlotMap<WaypointSetId, WaypointSet>;

/// Lift above the waypoint when looking for the portal an edge crosses.
const BIND_HEIGHT_OFFSET: f32 = 0.1;
/// How far along a boundary edge the fallback bind point sits.
const BIND_EDGE_NUDGE: f32 = 0.08;

#[derive(Debug, Clone)]
pub struct WaypointSet {
    data: Arc<WaypointSetData>,
    chunk: Option<ChunkId>,
    connections: BTreeMap<WaypointSetId, PortalRef>,
    edge_labels: BTreeMap<u32, WaypointSetId>,
    backlinks: Vec<WaypointSetId>,
}

impl WaypointSet {
    pub fn new(data: Arc<WaypointSetData>) -> Self {
        Self {
            data,
            chunk: None,
            connections: BTreeMap::new(),
            edge_labels: BTreeMap::new(),
            backlinks: Vec::new(),
        }
    }

    pub fn data(&self) -> &Arc<WaypointSetData> {
        &self.data
    }

    pub fn chunk(&self) -> Option<ChunkId> {
        self.chunk
    }

    pub fn girth(&self) -> f32 {
        self.data.girth()
    }

    pub fn waypoint(&self, index: usize) -> WaypointRef<'_> {
        self.data.waypoint(index)
    }

    pub fn waypoint_count(&self) -> usize {
        self.data.waypoint_count()
    }

    /// The set a boundary edge (absolute edge index) is connected to.
    pub fn connection_waypoint(&self, edge: u32) -> Option<WaypointSetId> {
        self.edge_labels.get(&edge).copied()
    }

    /// Portal the connection to `target` was made through.
    pub fn connection_portal(&self, target: WaypointSetId) -> Option<PortalRef> {
        self.connections.get(&target).copied()
    }

    pub fn connections(&self) -> &BTreeMap<WaypointSetId, PortalRef> {
        &self.connections
    }

    pub fn edge_labels(&self) -> &BTreeMap<u32, WaypointSetId> {
        &self.edge_labels
    }

    pub fn backlinks(&self) -> &[WaypointSetId] {
        &self.backlinks
    }

    /// Boundary edges without a connection.
    pub fn unbound_edge_count(&self) -> usize {
        self.data
            .edges()
            .iter()
            .enumerate()
            .filter(|(i, e)| e.neighbour == ADJACENT_TO_CHUNK && !self.edge_labels.contains_key(&(*i as u32)))
            .count()
    }

    fn add_backlink(&mut self, set: WaypointSetId) {
        self.backlinks.push(set);
    }

    fn remove_backlink(&mut self, set: WaypointSetId) {
        match self.backlinks.iter().position(|&b| b == set) {
            Some(pos) => {
                self.backlinks.remove(pos);
            }
            None => error!("WaypointSet::remove_backlink: trying to remove backlink that doesn't exist"),
        }
    }
}

/// A connection found while binding, made once the scan is over.
struct PendingConnection {
    target: WaypointSetId,
    portal: PortalRef,
    edge: u32,
}

impl ChunkSpace {
    /// Put a freshly loaded set into the arena, not yet in any chunk.
    pub fn add_waypoint_set(&mut self, data: Arc<WaypointSetData>) -> WaypointSetId {
        self.sets.insert(WaypointSet::new(data))
    }

    /// Toss a set out of its chunk and drop it.
    pub fn discard_set(&mut self, id: WaypointSetId) -> Option<WaypointSet> {
        self.toss_set(id, None);
        self.sets.remove(id)
    }

    /// Move a set into `chunk` (or out of every chunk with `None`).
    ///
    /// Leaving a chunk tears down every connection in both directions and
    /// removes the set from that chunk's navigator. Entering one only
    /// registers with the navigator; connections wait for `bind_set`.
    pub fn toss_set(&mut self, id: WaypointSetId, chunk: Option<ChunkId>) {
        let Some(set) = self.sets.get(id) else {
            error!("ChunkSpace::toss_set: set {:?} does not exist", id);
            return;
        };
        let old = set.chunk;
        if old == chunk {
            return;
        }

        if let Some(old) = old {
            self.remove_others_connections(id);
            self.remove_our_connections(id);
            if let Some(navigator) = self.navigators.get_mut(old) {
                navigator.del(&self.sets, id);
            }
        }

        if let Some(set) = self.sets.get_mut(id) {
            set.chunk = chunk;
        }

        let Some(new) = chunk else {
            return;
        };

        if self.chunks.get(new).is_some_and(Chunk::online) {
            error!("WaypointSet::toss: Tossing after loading is not supported");
        }

        match self.navigators.get_mut(new) {
            Some(navigator) => navigator.add(&self.sets, id),
            None => error!("ChunkSpace::toss_set: chunk {:?} has no navigator", new),
        }
    }

    /// Link `edge` (absolute index) of set `from` to `target` through `portal`.
    pub fn connect(&mut self, from: WaypointSetId, target: WaypointSetId, portal: PortalRef, edge: u32) {
        let Some(set) = self.sets.get_mut(from) else {
            return;
        };

        let neighbour = set.data.edges().get(edge as usize).map(|e| e.neighbour);
        if neighbour != Some(ADJACENT_TO_CHUNK) {
            warn!("WaypointSet::connect called on non chunk-adjacent edge {}", edge);
            return;
        }

        let new_connection = !set.connections.contains_key(&target);
        if new_connection {
            set.connections.insert(target, portal);
        }
        set.edge_labels.insert(edge, target);

        if new_connection {
            match self.sets.get_mut(target) {
                Some(other) => other.add_backlink(from),
                None => error!("WaypointSet::connect: target set {:?} does not exist", target),
            }
        }
    }

    /// Drop the connection from `from` to `target` and every edge label
    /// using it. Returns false if there was no such connection.
    pub fn delete_connection(&mut self, from: WaypointSetId, target: WaypointSetId) -> bool {
        let Some(set) = self.sets.get_mut(from) else {
            return false;
        };

        if !set.connections.contains_key(&target) {
            error!(
                "WaypointSet::delete_connection: connection from {:?} to {:?} does not exist",
                from, target
            );
            return false;
        }

        set.edge_labels.retain(|_, t| *t != target);
        set.connections.remove(&target);

        if let Some(other) = self.sets.get_mut(target) {
            other.remove_backlink(from);
        }
        true
    }

    /// Forget everything this set links to.
    pub fn remove_our_connections(&mut self, id: WaypointSetId) {
        let Some(set) = self.sets.get_mut(id) else {
            return;
        };

        set.edge_labels.clear();
        let targets: Vec<WaypointSetId> = std::mem::take(&mut set.connections).into_keys().collect();

        for target in targets {
            match self.sets.get_mut(target) {
                Some(other) => other.remove_backlink(id),
                None => error!("WaypointSet::remove_our_connections: set {:?} has gone", target),
            }
        }
    }

    /// Make every set that links to this one drop its link.
    pub fn remove_others_connections(&mut self, id: WaypointSetId) {
        while let Some(&other) = self.sets.get(id).and_then(|s| s.backlinks.first()) {
            let linked = self
                .sets
                .get(other)
                .is_some_and(|o| o.connections.contains_key(&id));

            if !linked {
                error!("WaypointSet::remove_others_connections: Back connection not found");
                if let Some(set) = self.sets.get_mut(id) {
                    set.backlinks.remove(0);
                }
                continue;
            }

            // removes `other` from our backlinks
            self.delete_connection(other, id);
        }
    }

    /// Connect every unlabelled boundary edge of the set to the waypoint set
    /// across the portal it lies in. Edges with no loaded neighbour stay
    /// unresolved for a later call. Returns the number of edges connected.
    pub fn bind_set(&mut self, id: WaypointSetId) -> usize {
        let pending = self.find_connections(id);
        let count = pending.len();

        for c in pending {
            self.connect(id, c.target, c.portal, c.edge);
        }
        if count > 0 {
            debug!("WaypointSet {:?}: bound {} edges", id, count);
        }
        count
    }

    fn find_connections(&self, id: WaypointSetId) -> Vec<PendingConnection> {
        let mut pending = Vec::new();

        let Some(set) = self.sets.get(id) else {
            return pending;
        };
        let Some(chunk_id) = set.chunk else {
            debug!("WaypointSet {:?}: not in a chunk, nothing to bind", id);
            return pending;
        };
        let Some(chunk) = self.chunks.get(chunk_id) else {
            return pending;
        };

        let data = &set.data;
        let girth = data.girth();

        for (wi, wp) in data.iter().enumerate() {
            let avg = wp.avg_height() + BIND_HEIGHT_OFFSET;

            for (ei, edge) in wp.edges.iter().enumerate() {
                if edge.neighbour != ADJACENT_TO_CHUNK {
                    continue;
                }
                let absolute = data.absolute_edge_index(wi, ei);
                if set.edge_labels.contains_key(&absolute) {
                    continue;
                }

                let start = edge.start;
                let end = wp.edge_end(ei);
                let mid = (start + end) / 2.0;

                // a steep waypoint's average height can miss the portal
                let Some(choice) = self
                    .choose_portal(chunk, Vec3::new(mid.x, avg, mid.y))
                    .or_else(|| self.choose_portal(chunk, Vec3::new(mid.x, wp.max_height() + BIND_HEIGHT_OFFSET, mid.y)))
                else {
                    trace!("WaypointSet {:?}: no portal for edge {}", id, absolute);
                    continue;
                };

                let nudged = start + (end - start).normalize_or_zero() * BIND_EDGE_NUDGE;
                let Some(found) = self
                    .query_across(chunk, choice.target, mid, avg, girth)
                    .or_else(|| self.query_across(chunk, choice.target, nudged, avg, girth))
                else {
                    trace!("WaypointSet {:?}: nothing across portal for edge {}", id, absolute);
                    continue;
                };

                if found == id {
                    continue;
                }

                pending.push(PendingConnection {
                    target: found,
                    portal: PortalRef {
                        chunk: chunk_id,
                        index: choice.index,
                    },
                    edge: absolute,
                });
            }
        }

        pending
    }

    /// Best portal of `chunk` for a chunk-local point, among portals into
    /// loaded chunks whose box holds the point.
    fn choose_portal(&self, chunk: &Chunk, local: Vec3) -> Option<PortalChoice> {
        let world = chunk.transform.transform_point3(local);
        let mut best: Option<PortalChoice> = None;

        for (index, portal) in chunk.portals().enumerate() {
            let Some(target) = portal.target_chunk().and_then(|t| self.chunks.get(t)) else {
                continue;
            };
            if target.state == ChunkState::Unloaded || !target.bounding_box.intersects(world) {
                continue;
            }

            // only indoor targets need the distance from the portal plane
            let min_dist = if target.is_outside_chunk() { 0.0 } else { 1.0 };
            let Some(candidate) = PortalChoice::new(index, portal, target.is_outside_chunk(), local) else {
                continue;
            };
            if Chunk::find_better_portal(best.as_ref(), min_dist, &candidate, portal, local) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Look up the waypoint set containing a point of `chunk` (given in its
    /// local X-Z plus a height) in the neighbouring chunk `target`.
    fn query_across(&self, chunk: &Chunk, target: ChunkId, point: Vec2, height: f32, girth: f32) -> Option<WaypointSetId> {
        let target_chunk = self.chunks.get(target)?;
        let navigator = self.navigators.get(target)?;

        let world = chunk.transform.transform_point3(Vec3::new(point.x, height, point.y));
        let local = target_chunk.transform_inverse.transform_point3(world);
        navigator
            .find_exactly(&self.sets, local, girth)
            .map(|r| r.set)
    }
}
