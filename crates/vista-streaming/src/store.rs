//! The chunk store: which chunks exist, which are visible, and what to build next.
//!
//! All chunk mutation happens on the thread that calls [`ChunkStore::update_viewer`]
//! and drains the dispatcher. Workers only see the inputs captured when their
//! job was scheduled.

use std::sync::Arc;

use glam::Vec2;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, error, info};
use vista_mesh::{TerrainMesh, build_terrain_mesh};
use vista_terrain::{HeightMapBuilder, Heightfield};

use crate::chunk::{ChunkCoord, TerrainChunk};
use crate::dispatcher::{Dispatcher, WorkError};
use crate::events::ChunkEvent;
use crate::settings::TerrainSettings;

pub struct ChunkStore {
    settings: Arc<TerrainSettings>,
    builder: Arc<HeightMapBuilder>,
    dispatcher: Dispatcher<ChunkStore>,
    chunks: FxHashMap<ChunkCoord, TerrainChunk>,
    visible: FxHashSet<ChunkCoord>,
    events: Vec<ChunkEvent>,
    viewer: Vec2,
    previous_viewer: Option<Vec2>,
    last_full_update: Option<Vec2>,
}

impl ChunkStore {
    pub fn new(settings: TerrainSettings, dispatcher: Dispatcher<ChunkStore>) -> Self {
        Self {
            settings: Arc::new(settings),
            builder: Arc::new(HeightMapBuilder::new()),
            dispatcher,
            chunks: FxHashMap::default(),
            visible: FxHashSet::default(),
            events: Vec::new(),
            viewer: Vec2::ZERO,
            previous_viewer: None,
            last_full_update: None,
        }
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn dispatcher(&self) -> &Dispatcher<ChunkStore> {
        &self.dispatcher
    }

    /// Last viewer position passed to [`ChunkStore::update_viewer`].
    pub fn viewer(&self) -> Vec2 {
        self.viewer
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    /// Number of chunks ever created. Chunks are never evicted.
    pub fn loaded_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Visible chunk coordinates in ascending order.
    pub fn visible_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.visible.iter().copied().collect();
        coords.sort_unstable();
        coords
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Take every event emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<ChunkEvent> {
        std::mem::take(&mut self.events)
    }

    /// Apply finished work. Shorthand for draining the store's dispatcher into itself.
    pub fn process_completed(&mut self) -> usize {
        let dispatcher = self.dispatcher.clone();
        dispatcher.drain(self)
    }

    /// Per-frame entry point.
    ///
    /// Any movement re-runs the collider check on visible chunks. Moving further
    /// than the configured threshold since the last full pass (or calling this
    /// for the first time) rebuilds the visible window.
    pub fn update_viewer(&mut self, position: Vec2) {
        self.viewer = position;

        if self.previous_viewer.is_some_and(|previous| previous != position) {
            for coord in self.visible_coords() {
                self.update_collider(coord);
            }
        }
        self.previous_viewer = Some(position);

        let threshold = self.settings.streaming.viewer_move_threshold;
        let needs_full_pass = self
            .last_full_update
            .is_none_or(|last| last.distance_squared(position) > threshold * threshold);
        if needs_full_pass {
            self.last_full_update = Some(position);
            self.update_visible_chunks();
        }
    }

    fn update_visible_chunks(&mut self) {
        let mut already_updated = FxHashSet::default();
        for coord in self.visible_coords() {
            already_updated.insert(coord);
            self.update_chunk(coord);
        }

        let world_size = self.settings.mesh.world_size();
        let center = (self.viewer / world_size).round();
        let (cx, cy) = (center.x as i32, center.y as i32);
        let radius = self.settings.chunks_in_view();

        let before = self.chunks.len();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let coord = ChunkCoord::new(cx + dx, cy + dy);
                if already_updated.contains(&coord) {
                    continue;
                }
                if self.chunks.contains_key(&coord) {
                    self.update_chunk(coord);
                } else {
                    self.load_chunk(coord);
                }
            }
        }

        // Colliders follow the final visible set, even for a stationary viewer.
        for coord in self.visible_coords() {
            self.update_collider(coord);
        }

        info!(
            viewer = %self.viewer,
            created = self.chunks.len() - before,
            loaded = self.chunks.len(),
            visible = self.visible.len(),
            "visible window updated"
        );
    }

    fn load_chunk(&mut self, coord: ChunkCoord) {
        let mut chunk = TerrainChunk::new(coord, &self.settings.mesh, self.settings.lods.len());
        let sample_center = chunk.sample_center();
        let settings = Arc::clone(&self.settings);
        let builder = Arc::clone(&self.builder);
        let size = settings.mesh.verts_per_line();

        let scheduled = self.dispatcher.schedule(
            move || builder.build(size, size, &settings.height, sample_center),
            move |store: &mut ChunkStore, result| store.on_heightfield_received(coord, result),
        );
        match scheduled {
            Ok(job) => {
                debug!(%coord, job, "heightfield requested");
                chunk.mark_height_pending();
            }
            Err(err) => {
                error!(%coord, %err, "could not schedule heightfield");
                chunk.mark_height_failed();
            }
        }
        self.chunks.insert(coord, chunk);
    }

    fn request_mesh(&mut self, coord: ChunkCoord, level: usize) {
        let Some(lod) = self.settings.lods.get(level).map(|l| l.lod) else {
            return;
        };
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let Some(heightfield) = chunk.begin_mesh_request(level) else {
            return;
        };
        let settings = Arc::clone(&self.settings);

        let scheduled = self.dispatcher.schedule(
            move || build_terrain_mesh(&heightfield, &settings.mesh, lod),
            move |store: &mut ChunkStore, result| store.on_mesh_received(coord, level, result),
        );
        match scheduled {
            Ok(job) => debug!(%coord, level, lod, job, "mesh requested"),
            Err(err) => {
                error!(%coord, level, %err, "could not schedule mesh");
                chunk.mark_mesh_failed(level);
            }
        }
    }

    fn update_chunk(&mut self, coord: ChunkCoord) {
        let viewer = self.viewer;
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let eval = chunk.evaluate(viewer, &self.settings.lods);

        if let Some((level, mesh)) = eval.swapped {
            let lod = self.settings.lods.get(level).map_or(0, |l| l.lod);
            self.events.push(ChunkEvent::MeshChanged { coord, lod, mesh });
        }
        if let Some(level) = eval.request {
            self.request_mesh(coord, level);
        }
        if let Some(visible) = eval.visibility {
            if visible {
                self.visible.insert(coord);
            } else {
                self.visible.remove(&coord);
            }
            self.events.push(ChunkEvent::VisibilityChanged { coord, visible });
        }
    }

    fn update_collider(&mut self, coord: ChunkCoord) {
        let viewer = self.viewer;
        let settings = &self.settings;
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let check = chunk.check_collider(
            viewer,
            &settings.lods,
            settings.collider_level,
            settings.streaming.collider_generation_distance,
        );

        if let Some(mesh) = check.attached {
            debug!(%coord, "collider attached");
            self.events.push(ChunkEvent::ColliderAttached { coord, mesh });
        }
        if check.request {
            let level = self.settings.collider_level;
            self.request_mesh(coord, level);
        }
    }

    pub(crate) fn on_heightfield_received(
        &mut self,
        coord: ChunkCoord,
        result: Result<Heightfield, WorkError>,
    ) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        match result {
            Ok(heightfield) => {
                chunk.set_heightfield(Arc::new(heightfield));
                self.update_chunk(coord);
                if self.visible.contains(&coord) {
                    self.update_collider(coord);
                }
            }
            Err(err) => {
                error!(%coord, %err, "heightfield generation failed");
                chunk.mark_height_failed();
            }
        }
    }

    pub(crate) fn on_mesh_received(
        &mut self,
        coord: ChunkCoord,
        level: usize,
        result: Result<TerrainMesh, WorkError>,
    ) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        match result {
            Ok(mesh) => {
                chunk.set_mesh(level, Arc::new(mesh));
                self.update_chunk(coord);
                if level == self.settings.collider_level {
                    self.update_collider(coord);
                }
            }
            Err(err) => {
                error!(%coord, level, %err, "mesh generation failed");
                chunk.mark_mesh_failed(level);
            }
        }
    }
}
