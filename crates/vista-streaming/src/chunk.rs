//! Per-chunk state: heightfield, meshes per detail level, visibility and collider.
//!
//! A chunk never talks to the dispatcher itself. Its methods update local state
//! and report what the store should do next (emit an event, request a mesh).

use std::fmt;
use std::sync::Arc;

use glam::Vec2;
use vista_lod::{Bounds2, LodTable};
use vista_mesh::{MeshSettings, TerrainMesh};
use vista_terrain::Heightfield;

/// Integer grid position of a chunk. Chunk `(x, y)` is centred on
/// `(x, y) * world_size` in the ground plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Ground-plane centre of this chunk.
    pub fn world_center(self, world_size: f32) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32) * world_size
    }

    /// Noise-space centre used when sampling this chunk's heightfield.
    pub fn sample_center(self, mesh: &MeshSettings) -> Vec2 {
        self.world_center(mesh.world_size()) / mesh.mesh_scale
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Clone, Debug, Default)]
pub enum HeightState {
    #[default]
    Unrequested,
    Pending,
    Ready(Arc<Heightfield>),
    Failed,
}

#[derive(Clone, Debug, Default)]
pub enum MeshState {
    #[default]
    NotRequested,
    Requested,
    Ready(Arc<TerrainMesh>),
    Failed,
}

/// What changed during [`TerrainChunk::evaluate`].
#[derive(Clone, Debug, Default)]
pub struct Evaluation {
    pub visibility: Option<bool>,
    /// Detail level swapped in and its mesh.
    pub swapped: Option<(usize, Arc<TerrainMesh>)>,
    /// Detail level whose mesh should be requested.
    pub request: Option<usize>,
}

/// Outcome of [`TerrainChunk::check_collider`].
#[derive(Clone, Debug, Default)]
pub struct ColliderCheck {
    pub request: bool,
    pub attached: Option<Arc<TerrainMesh>>,
}

#[derive(Debug)]
pub struct TerrainChunk {
    coord: ChunkCoord,
    bounds: Bounds2,
    sample_center: Vec2,
    height: HeightState,
    meshes: Vec<MeshState>,
    active_level: Option<usize>,
    has_collider: bool,
    visible: bool,
}

impl TerrainChunk {
    /// A hidden chunk with nothing requested, one mesh slot per detail level.
    pub fn new(coord: ChunkCoord, mesh: &MeshSettings, level_count: usize) -> Self {
        let world_size = mesh.world_size();
        Self {
            coord,
            bounds: Bounds2::from_center_size(coord.world_center(world_size), Vec2::splat(world_size)),
            sample_center: coord.sample_center(mesh),
            height: HeightState::Unrequested,
            meshes: vec![MeshState::NotRequested; level_count],
            active_level: None,
            has_collider: false,
            visible: false,
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn bounds(&self) -> Bounds2 {
        self.bounds
    }

    pub fn sample_center(&self) -> Vec2 {
        self.sample_center
    }

    pub fn height_state(&self) -> &HeightState {
        &self.height
    }

    pub fn heightfield(&self) -> Option<&Arc<Heightfield>> {
        match &self.height {
            HeightState::Ready(hf) => Some(hf),
            _ => None,
        }
    }

    pub fn mesh_state(&self, level: usize) -> Option<&MeshState> {
        self.meshes.get(level)
    }

    /// Detail level currently rendered, if any.
    pub fn active_level(&self) -> Option<usize> {
        self.active_level
    }

    pub fn active_mesh(&self) -> Option<&Arc<TerrainMesh>> {
        match self.meshes.get(self.active_level?)? {
            MeshState::Ready(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn has_collider(&self) -> bool {
        self.has_collider
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn mark_height_pending(&mut self) {
        self.height = HeightState::Pending;
    }

    pub(crate) fn set_heightfield(&mut self, heightfield: Arc<Heightfield>) {
        self.height = HeightState::Ready(heightfield);
    }

    pub(crate) fn mark_height_failed(&mut self) {
        self.height = HeightState::Failed;
    }

    /// Move `level` to `Requested` and hand back the heightfield to mesh.
    /// `None` if the heightfield is not ready or the level was already requested.
    pub(crate) fn begin_mesh_request(&mut self, level: usize) -> Option<Arc<Heightfield>> {
        let heightfield = Arc::clone(self.heightfield()?);
        let slot = self.meshes.get_mut(level)?;
        if !matches!(slot, MeshState::NotRequested) {
            return None;
        }
        *slot = MeshState::Requested;
        Some(heightfield)
    }

    pub(crate) fn set_mesh(&mut self, level: usize, mesh: Arc<TerrainMesh>) {
        if let Some(slot) = self.meshes.get_mut(level) {
            *slot = MeshState::Ready(mesh);
        }
    }

    pub(crate) fn mark_mesh_failed(&mut self, level: usize) {
        if let Some(slot) = self.meshes.get_mut(level) {
            *slot = MeshState::Failed;
        }
    }

    /// Re-derive visibility and detail level for a viewer at `viewer`.
    ///
    /// Does nothing until the heightfield has arrived. The rendered mesh only
    /// changes once the target level's mesh is ready; until then the previous
    /// mesh stays and the target is reported for request (once).
    pub fn evaluate(&mut self, viewer: Vec2, lods: &LodTable) -> Evaluation {
        let mut out = Evaluation::default();
        if !matches!(self.height, HeightState::Ready(_)) {
            return out;
        }

        let distance = self.bounds.distance(viewer);
        let visible = distance <= lods.max_view_distance();

        if visible {
            let level = lods.select(distance);
            if self.active_level != Some(level) {
                match self.meshes.get(level) {
                    Some(MeshState::Ready(mesh)) => {
                        self.active_level = Some(level);
                        out.swapped = Some((level, Arc::clone(mesh)));
                    }
                    Some(MeshState::NotRequested) => out.request = Some(level),
                    _ => {}
                }
            }
        }

        if visible != self.visible {
            self.visible = visible;
            out.visibility = Some(visible);
        }
        out
    }

    /// Request and, when close enough, attach the collision mesh.
    ///
    /// The collider level is requested once the viewer is inside that level's
    /// view distance. It is attached the first time the viewer is strictly
    /// within `attach_distance` of the chunk's edge and the mesh is ready;
    /// after that the check is a no-op.
    pub fn check_collider(
        &mut self,
        viewer: Vec2,
        lods: &LodTable,
        collider_level: usize,
        attach_distance: f32,
    ) -> ColliderCheck {
        let mut out = ColliderCheck::default();
        if self.has_collider {
            return out;
        }
        let Some(level) = lods.get(collider_level) else {
            return out;
        };

        let sqr_distance = self.bounds.sqr_distance(viewer);
        if sqr_distance < level.visible_distance * level.visible_distance {
            out.request = matches!(self.meshes.get(collider_level), Some(MeshState::NotRequested));
        }
        if sqr_distance < attach_distance * attach_distance {
            if let Some(MeshState::Ready(mesh)) = self.meshes.get(collider_level) {
                self.has_collider = true;
                out.attached = Some(Arc::clone(mesh));
            }
        }
        out
    }
}
