//! Notifications for the presentation layer.
//!
//! The store appends events as chunks change; the frame loop collects them with
//! [`ChunkStore::drain_events`](crate::ChunkStore::drain_events).

use std::sync::Arc;

use vista_mesh::TerrainMesh;

use crate::chunk::ChunkCoord;

#[derive(Clone, Debug, PartialEq)]
pub enum ChunkEvent {
    /// A chunk entered or left the view radius.
    VisibilityChanged { coord: ChunkCoord, visible: bool },
    /// A chunk now renders `mesh`, built at mesh LOD `lod`.
    MeshChanged {
        coord: ChunkCoord,
        lod: usize,
        mesh: Arc<TerrainMesh>,
    },
    /// A chunk's collision mesh was attached. Happens at most once per chunk.
    ColliderAttached {
        coord: ChunkCoord,
        mesh: Arc<TerrainMesh>,
    },
}

impl ChunkEvent {
    pub fn coord(&self) -> ChunkCoord {
        match self {
            Self::VisibilityChanged { coord, .. }
            | Self::MeshChanged { coord, .. }
            | Self::ColliderAttached { coord, .. } => *coord,
        }
    }
}
