// Chunk items - the navigation items a chunk description can carry
//
// waypointSet   <waypoint> polygons in world coordinates
// navPolySet    <navPoly> polygons in chunk-local coordinates
// worldNavmesh  binary navmesh resource, chunk-local, shared via the population

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::chunk::{Chunk, ChunkId, ChunkState};
use crate::data_section::DataSection;
use crate::navmesh::NavmeshPopulation;
use crate::space::ChunkSpace;
use crate::waypoint_set_data::WaypointSetData;
use crate::{NavError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkItemKind {
    WaypointSet,
    NavPolySet,
    Navmesh,
}

impl ChunkItemKind {
    pub const ALL: [ChunkItemKind; 3] = [
        ChunkItemKind::WaypointSet,
        ChunkItemKind::NavPolySet,
        ChunkItemKind::Navmesh,
    ];

    pub fn from_section_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.section_name() == name)
    }

    pub fn section_name(self) -> &'static str {
        match self {
            ChunkItemKind::WaypointSet => "waypointSet",
            ChunkItemKind::NavPolySet => "navPolySet",
            ChunkItemKind::Navmesh => "worldNavmesh",
        }
    }

    /// Name of the per-waypoint child sections.
    pub fn waypoint_section(self) -> Option<&'static str> {
        match self {
            ChunkItemKind::WaypointSet => Some("waypoint"),
            ChunkItemKind::NavPolySet => Some("navPoly"),
            ChunkItemKind::Navmesh => None,
        }
    }

    pub fn in_world_coords(self) -> bool {
        self == ChunkItemKind::WaypointSet
    }

    /// Parse one item into chunk-local set data. Touches no graph state,
    /// so it is safe to run away from the main thread.
    pub fn load(
        self,
        section: &DataSection,
        chunk: &Chunk,
        population: &NavmeshPopulation,
        resource_root: &Path,
    ) -> Result<Vec<Arc<WaypointSetData>>> {
        let Some(waypoint_section) = self.waypoint_section() else {
            let resource = section.read_string("resource");
            if resource.is_empty() {
                return Err(NavError::BadSection {
                    section: self.section_name().into(),
                    reason: "no resource".into(),
                });
            }
            return population.load(&resource_root.join(resource));
        };

        let mut data = WaypointSetData::load_from_section(section, waypoint_section)?;
        if self.in_world_coords() {
            data.transform(&chunk.transform_inverse);
        }
        Ok(vec![Arc::new(data)])
    }
}

impl ChunkSpace {
    /// Load every navigation item of a chunk description and toss the
    /// resulting sets into the chunk. Items that fail to load are logged and
    /// skipped; the chunk just has less navigation. Returns the number of
    /// sets added. The chunk must be unloaded.
    pub fn load_chunk(&mut self, id: ChunkId, section: &DataSection) -> Result<usize> {
        let Some(chunk) = self.chunks.get(id) else {
            return Err(NavError::UnknownChunk(format!("{:?}", id)));
        };
        if chunk.state != ChunkState::Unloaded {
            warn!("Chunk '{}': already {:?}, load refused", chunk.identifier, chunk.state);
            return Err(NavError::ChunkAlreadyLoaded(chunk.identifier.clone()));
        }

        let mut loaded = Vec::new();
        for item in &section.children {
            let Some(kind) = ChunkItemKind::from_section_name(&item.name) else {
                continue;
            };
            match kind.load(item, chunk, &self.population, &self.resource_root) {
                Ok(sets) => loaded.extend(sets),
                Err(e) => error!(
                    "Chunk '{}': failed to load {}: {}",
                    chunk.identifier,
                    kind.section_name(),
                    e
                ),
            }
        }

        let count = loaded.len();
        for data in loaded {
            let set = self.add_waypoint_set(data);
            self.toss_set(set, Some(id));
        }

        if let Some(chunk) = self.chunks.get_mut(id) {
            chunk.state = ChunkState::Loaded;
            debug!("Chunk '{}': loaded {} waypoint sets", chunk.identifier, count);
        }
        Ok(count)
    }
}
