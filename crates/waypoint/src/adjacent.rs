// AdjacentChunkSet - a chunk and its portal neighbours as plane volumes
// Answers which of them a world point is in, indoor chunks first.

use glam::Vec3;

use crate::chunk::{ChunkId, PortalTarget};
use crate::math::PlaneEq;
use crate::space::ChunkSpace;

#[derive(Debug, Clone)]
struct ChunkDef {
    chunk: ChunkId,
    outside: bool,
    /// World space, facing into the chunk
    planes: Vec<PlaneEq>,
}

impl ChunkDef {
    fn contains(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.is_in_front_of(point))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdjacentChunkSet {
    start: Option<ChunkId>,
    chunks: Vec<ChunkDef>,
}

impl AdjacentChunkSet {
    /// The chunk and everything its portals lead to (other than heaven and
    /// earth). None if `start` is not in the space.
    pub fn read(space: &ChunkSpace, start: ChunkId) -> Option<Self> {
        let chunk = space.chunk(start)?;
        let mut set = Self {
            start: Some(start),
            chunks: Vec::new(),
        };
        set.add_chunk(space, start);

        for portal in chunk.portals() {
            match portal.target {
                PortalTarget::Chunk(id) if !set.has_chunk(id) => set.add_chunk(space, id),
                PortalTarget::Unbound => {
                    tracing::warn!(
                        "AdjacentChunkSet: chunk '{}' not in the space",
                        portal.chunk_name
                    );
                }
                _ => {}
            }
        }
        Some(set)
    }

    fn add_chunk(&mut self, space: &ChunkSpace, id: ChunkId) {
        let Some(chunk) = space.chunk(id) else {
            return;
        };

        let planes = chunk
            .boundaries
            .iter()
            .filter(|b| {
                // boundaries opening onto the sky, ground, inside or
                // another space do not bound the volume
                b.portals.first().is_none_or(|p| {
                    !p.internal && !matches!(p.target, PortalTarget::Heaven | PortalTarget::Earth | PortalTarget::Extern)
                })
            })
            .map(|b| b.plane.transformed(&chunk.transform))
            .collect();

        self.chunks.push(ChunkDef {
            chunk: id,
            outside: chunk.is_outside_chunk(),
            planes,
        });
    }

    pub fn has_chunk(&self, id: ChunkId) -> bool {
        self.chunks.iter().any(|c| c.chunk == id)
    }

    pub fn start_chunk(&self) -> Option<ChunkId> {
        self.start
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The chunk holding a world point, trying indoor chunks first.
    pub fn test(&self, point: Vec3) -> Option<ChunkId> {
        let indoor = self.chunks.iter().filter(|c| !c.outside);
        let outdoor = self.chunks.iter().filter(|c| c.outside);
        indoor
            .chain(outdoor)
            .find(|c| c.contains(point))
            .map(|c| c.chunk)
    }
}
