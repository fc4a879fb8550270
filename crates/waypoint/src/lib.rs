// chunknav - Waypoint navigation graph
//
// Convex waypoint polygons partitioned across streamed world chunks:
// - per-chunk waypoint sets, shared read-only set data
// - cross-chunk connections resolved through portals when a chunk binds
// - girth-grid accelerated containment and nearest-waypoint queries

pub mod adjacent;
pub mod chunk;
pub mod chunk_item;
pub mod data_section;
pub mod math;
pub mod navigator;
pub mod navmesh;
pub mod space;
pub mod waypoint;
pub mod waypoint_set;
pub mod waypoint_set_data;

pub use adjacent::AdjacentChunkSet;
pub use chunk::{Chunk, ChunkBoundary, ChunkId, ChunkState, Portal, PortalChoice, PortalRef, PortalTarget};
pub use chunk_item::ChunkItemKind;
pub use data_section::DataSection;
pub use math::{BoundingBox, PlaneEq};
pub use navigator::{ChunkNavigator, GG_SIZE, NavResult, NavigatorConfig};
pub use navmesh::{NavmeshPopulation, decode_navmesh, encode_navmesh};
pub use space::ChunkSpace;
pub use waypoint::{ADJACENT_TO_CHUNK, CHUNK_ADJACENT_CONSTANT, Edge, EdgeRange, Waypoint, WaypointRef};
pub use waypoint_set::{WaypointSet, WaypointSetId, WaypointSets};
pub use waypoint_set_data::{DEFAULT_GIRTH, WaypointSetData};

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum NavError {
    #[error("cannot find neighbouring waypoint {id} on edge {edge} of waypoint index {waypoint}")]
    UnknownNeighbour { id: u32, edge: usize, waypoint: usize },

    #[error("waypoint index {waypoint} has {edges} edges, at least 3 are required")]
    DegenerateWaypoint { waypoint: usize, edges: usize },

    #[error("bad '{section}' section: {reason}")]
    BadSection { section: String, reason: String },

    #[error("bad navmesh '{resource}': {reason}")]
    BadNavmesh { resource: String, reason: String },

    #[error("unknown chunk '{0}'")]
    UnknownChunk(String),

    #[error("chunk '{0}' is already loaded")]
    ChunkAlreadyLoaded(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for navigation operations
pub type Result<T> = std::result::Result<T, NavError>;
