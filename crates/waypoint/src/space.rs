// ChunkSpace - owner of the chunks, navigators and waypoint sets of one space
//
// All graph mutation goes through `&mut ChunkSpace`. Loading and transforming
// waypoint set data needs no access to the space, so it can be done on a
// loader thread and handed over.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use slotmap::{SecondaryMap, SlotMap};
use tracing::{debug, info, warn};

use crate::chunk::{Chunk, ChunkId, ChunkState, PortalTarget};
use crate::data_section::DataSection;
use crate::navigator::{ChunkNavigator, NavResult, NavigatorConfig};
use crate::navmesh::NavmeshPopulation;
use crate::waypoint_set::{WaypointSet, WaypointSetId, WaypointSets};
use crate::{NavError, Result};

#[derive(Debug)]
pub struct ChunkSpace {
    pub(crate) config: NavigatorConfig,
    pub(crate) chunks: SlotMap<ChunkId, Chunk>,
    pub(crate) navigators: SecondaryMap<ChunkId, ChunkNavigator>,
    pub(crate) sets: WaypointSets,
    chunk_names: HashMap<String, ChunkId>,
    pub(crate) population: Arc<NavmeshPopulation>,
    pub(crate) resource_root: PathBuf,
}

impl Default for ChunkSpace {
    fn default() -> Self {
        Self::new(NavigatorConfig::default())
    }
}

impl ChunkSpace {
    pub fn new(config: NavigatorConfig) -> Self {
        Self::with_population(config, Arc::new(NavmeshPopulation::new()))
    }

    /// A space sharing its navmesh cache with other spaces or loaders.
    pub fn with_population(config: NavigatorConfig, population: Arc<NavmeshPopulation>) -> Self {
        Self {
            config,
            chunks: SlotMap::with_key(),
            navigators: SecondaryMap::new(),
            sets: WaypointSets::with_key(),
            chunk_names: HashMap::new(),
            population,
            resource_root: PathBuf::new(),
        }
    }

    /// Directory navmesh resources are resolved against.
    pub fn set_resource_root(&mut self, root: impl Into<PathBuf>) {
        self.resource_root = root.into();
    }

    pub fn resource_root(&self) -> &Path {
        &self.resource_root
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn population(&self) -> &Arc<NavmeshPopulation> {
        &self.population
    }

    /// Register a chunk and create its navigator. Portals naming chunks
    /// already in the space are resolved both ways.
    pub fn add_chunk(&mut self, chunk: Chunk) -> ChunkId {
        let name = chunk.identifier.clone();
        let navigator = ChunkNavigator::new(&chunk, &self.config);
        let id = self.chunks.insert(chunk);

        if self.chunk_names.insert(name.clone(), id).is_some() {
            warn!("ChunkSpace::add_chunk: chunk '{}' replaces an earlier one of that name", name);
        }
        self.navigators.insert(id, navigator);
        self.resolve_portals();
        id
    }

    /// Point every portal naming a known chunk at that chunk's handle.
    pub fn resolve_portals(&mut self) {
        for chunk in self.chunks.values_mut() {
            for portal in chunk.portals_mut() {
                if portal.target == PortalTarget::Unbound {
                    if let Some(&target) = self.chunk_names.get(&portal.chunk_name) {
                        portal.target = PortalTarget::Chunk(target);
                    }
                }
            }
        }
    }

    /// Unload a chunk and forget it entirely.
    pub fn remove_chunk(&mut self, id: ChunkId) -> Option<Chunk> {
        self.unload_chunk(id);
        self.navigators.remove(id);
        let chunk = self.chunks.remove(id)?;
        if self.chunk_names.get(&chunk.identifier) == Some(&id) {
            self.chunk_names.remove(&chunk.identifier);
        }

        for other in self.chunks.values_mut() {
            for portal in other.portals_mut() {
                if portal.target == PortalTarget::Chunk(id) {
                    portal.target = PortalTarget::Unbound;
                }
            }
        }
        Some(chunk)
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    pub fn chunk_by_name(&self, name: &str) -> Option<ChunkId> {
        self.chunk_names.get(name).copied()
    }

    pub fn chunks(&self) -> impl Iterator<Item = (ChunkId, &Chunk)> {
        self.chunks.iter()
    }

    pub fn navigator(&self, id: ChunkId) -> Option<&ChunkNavigator> {
        self.navigators.get(id)
    }

    pub fn set(&self, id: WaypointSetId) -> Option<&WaypointSet> {
        self.sets.get(id)
    }

    pub fn sets(&self) -> &WaypointSets {
        &self.sets
    }

    /// Waypoint sets currently tossed into the chunk.
    pub fn chunk_sets(&self, id: ChunkId) -> Vec<WaypointSetId> {
        self.navigators
            .get(id)
            .map(|n| n.sets().to_vec())
            .unwrap_or_default()
    }

    /// Query a chunk for the waypoint containing (or nearest) a chunk-local
    /// point.
    pub fn find(&self, chunk: ChunkId, point: Vec3, girth: f32, ignore_height: bool) -> Option<NavResult> {
        self.navigators.get(chunk)?.find(&self.sets, point, girth, ignore_height)
    }

    pub fn find_exactly(&self, chunk: ChunkId, point: Vec3, girth: f32) -> Option<NavResult> {
        self.navigators.get(chunk)?.find_exactly(&self.sets, point, girth)
    }

    /// Query by world point over every loaded chunk whose box holds it,
    /// indoor chunks first. An exact match wins, otherwise the first
    /// chunk's nearest waypoint.
    pub fn find_world(&self, point: Vec3, girth: f32, ignore_height: bool) -> Option<(ChunkId, NavResult)> {
        let mut candidates: Vec<(ChunkId, &Chunk)> = self
            .chunks
            .iter()
            .filter(|(_, c)| c.state != ChunkState::Unloaded && c.bounding_box.intersects(point))
            .collect();
        candidates.sort_by_key(|(_, c)| c.is_outside_chunk());

        let mut fallback = None;
        for (id, chunk) in candidates {
            let local = chunk.transform_inverse.transform_point3(point);
            let Some(found) = self.find(id, local, girth, ignore_height) else {
                continue;
            };
            if found.exact_match {
                return Some((id, found));
            }
            fallback.get_or_insert((id, found));
        }
        fallback
    }

    /// Bind every set in the chunk, then give bound neighbours a chance to
    /// resolve edges that were waiting for this chunk. Returns the number of
    /// edges connected.
    pub fn bind_chunk(&mut self, id: ChunkId) -> usize {
        let Some(chunk) = self.chunks.get(id) else {
            return 0;
        };
        if chunk.state == ChunkState::Unloaded {
            warn!("ChunkSpace::bind_chunk: chunk '{}' is not loaded", chunk.identifier);
            return 0;
        }

        let mut neighbours: Vec<ChunkId> = chunk
            .portals()
            .filter_map(|p| p.target_chunk())
            .filter(|&t| t != id)
            .collect();
        neighbours.sort();
        neighbours.dedup();

        let mut bound = self.bind_sets(id);
        if let Some(chunk) = self.chunks.get_mut(id) {
            chunk.state = ChunkState::Bound;
        }

        for neighbour in neighbours {
            if self.chunks.get(neighbour).is_some_and(Chunk::online) {
                bound += self.bind_sets(neighbour);
            }
        }

        debug!("ChunkSpace::bind_chunk: {:?} connected {} edges", id, bound);
        bound
    }

    fn bind_sets(&mut self, id: ChunkId) -> usize {
        self.chunk_sets(id)
            .into_iter()
            .map(|set| self.bind_set(set))
            .sum()
    }

    /// Tear down and discard every set of the chunk.
    pub fn unload_chunk(&mut self, id: ChunkId) {
        for set in self.chunk_sets(id) {
            self.discard_set(set);
        }
        if let Some(chunk) = self.chunks.get_mut(id) {
            chunk.state = ChunkState::Unloaded;
        }
    }

    /// Add every chunk of a `space` section, loading its navigation items.
    /// Chunks are not bound.
    pub fn load_space(&mut self, section: &DataSection) -> Result<Vec<ChunkId>> {
        let mut ids = Vec::new();
        let mut descriptions = Vec::new();

        for description in section.children_named("chunk") {
            let chunk = Chunk::from_section(description)?;
            if self.chunk_by_name(&chunk.identifier).is_some() {
                return Err(NavError::BadSection {
                    section: section.name.clone(),
                    reason: format!("duplicate chunk '{}'", chunk.identifier),
                });
            }
            ids.push(self.add_chunk(chunk));
            descriptions.push(description);
        }

        for (&id, description) in ids.iter().zip(descriptions) {
            self.load_chunk(id, description)?;
        }

        info!("ChunkSpace: loaded {} chunks", ids.len());
        Ok(ids)
    }
}
