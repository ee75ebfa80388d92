//! Headless demo: generates preview images, then walks a viewer across the
//! endless terrain and logs what the streaming core does.
//!
//! Configuration is loaded from `terrain.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p vista-demo -- --seed 7 --steps 200`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::Vec2;
use tracing::{info, warn};
use vista_config::{CliArgs, Config, DrawMode, Observable, PreviewConfig};
use vista_mesh::{MeshSettings, build_terrain_mesh};
use vista_streaming::{ChunkEvent, ChunkStore, Dispatcher, TerrainSettings};
use vista_terrain::{
    FalloffMask, HeightMapBuilder, HeightMapSettings, LayerUniforms, build_texture_array,
    falloff_to_image, heightfield_to_image, load_layer_textures,
};

const NOISE_PREVIEW: &str = "noise_map.png";
const FALLOFF_PREVIEW: &str = "falloff_map.png";
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct EventTally {
    shown: usize,
    hidden: usize,
    mesh_swaps: usize,
    colliders: usize,
}

impl EventTally {
    fn record(&mut self, events: &[ChunkEvent]) {
        for event in events {
            match event {
                ChunkEvent::VisibilityChanged { visible: true, .. } => self.shown += 1,
                ChunkEvent::VisibilityChanged { visible: false, .. } => self.hidden += 1,
                ChunkEvent::MeshChanged { .. } => self.mesh_swaps += 1,
                ChunkEvent::ColliderAttached { coord, .. } => {
                    info!(%coord, "collider attached");
                    self.colliders += 1;
                }
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(Config::default_dir)
        .unwrap_or_else(|| PathBuf::from(".vista"));

    let mut config = Config::load_or_create(&config_dir)?;
    config.apply_cli_overrides(&args);

    vista_log::init_logging(Some(&config_dir.join("logs")), cfg!(debug_assertions), Some(&config));

    let settings = config.terrain_settings()?;
    info!(
        chunk_size = settings.mesh.chunk_size(),
        world_size = settings.mesh.world_size(),
        view_distance = settings.lods.max_view_distance(),
        seed = settings.height.noise.seed,
        "terrain settings loaded"
    );

    let uniforms = LayerUniforms::from_layers(
        &config.layers,
        settings.height.min_height(),
        settings.height.max_height(),
    );
    let texture_array = build_texture_array(&load_layer_textures(&config.layers, &config_dir)?);
    info!(
        layers = uniforms.layer_count,
        texture_slices = texture_array.len(),
        min_height = uniforms.min_height,
        max_height = uniforms.max_height,
        "material layers prepared"
    );

    let preview_dir = args
        .preview_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("preview"));
    let builder = Arc::new(HeightMapBuilder::new());
    draw_preview(&builder, &settings.height, &settings.mesh, &config.preview, &preview_dir)?;

    let mut height_settings = Observable::new(settings.height.clone());
    if config.preview.auto_update {
        let builder = Arc::clone(&builder);
        let mesh = settings.mesh.clone();
        let preview = config.preview.clone();
        let dir = preview_dir.clone();
        height_settings.subscribe(move |height: &HeightMapSettings| {
            if let Err(err) = draw_preview(&builder, height, &mesh, &preview, &dir) {
                warn!(%err, "preview refresh failed");
            }
        });
    }

    walk(settings, args.steps, args.step_length);

    // Pick up edits made to the settings file while the walk ran.
    match config.reload(&config_dir) {
        Ok(Some(mut updated)) => {
            updated.apply_cli_overrides(&args);
            if height_settings.set_if_changed(updated.height) {
                info!("height settings changed on disk");
            }
        }
        Ok(None) => {}
        Err(err) => warn!(%err, "config reload failed"),
    }

    Ok(())
}

/// Render the configured preview for a single chunk at the origin.
fn draw_preview(
    builder: &HeightMapBuilder,
    height: &HeightMapSettings,
    mesh: &MeshSettings,
    preview: &PreviewConfig,
    dir: &Path,
) -> image::ImageResult<()> {
    let size = mesh.verts_per_line();
    match preview.draw_mode {
        DrawMode::NoiseMap => {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(NOISE_PREVIEW);
            heightfield_to_image(&builder.build(size, size, height, Vec2::ZERO)).save(&path)?;
            info!(path = %path.display(), size, "noise preview written");
        }
        DrawMode::FalloffMap => {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(FALLOFF_PREVIEW);
            falloff_to_image(&FalloffMask::generate(size)).save(&path)?;
            info!(path = %path.display(), size, "falloff preview written");
        }
        DrawMode::Mesh => {
            let heightfield = builder.build(size, size, height, Vec2::ZERO);
            let lod = preview.editor_lod.min(vista_mesh::NUM_SUPPORTED_LODS - 1);
            let mesh = build_terrain_mesh(&heightfield, mesh, lod);
            info!(
                lod,
                vertices = mesh.vertex_count(),
                triangles = mesh.triangle_count(),
                flat_shaded = mesh.flat_shaded,
                "preview mesh built"
            );
        }
    }
    Ok(())
}

/// Move the viewer along +x, one frame per step, draining finished work each frame.
fn walk(settings: TerrainSettings, steps: u32, step_length: f32) {
    let mut store = ChunkStore::new(settings, Dispatcher::new());
    let mut tally = EventTally::default();
    let started = Instant::now();

    for frame in 0..steps {
        let viewer = Vec2::new(frame as f32 * step_length, 0.0);
        store.update_viewer(viewer);
        store.process_completed();
        tally.record(&store.drain_events());

        if frame % 20 == 0 {
            info!(
                frame,
                viewer = %viewer,
                loaded = store.loaded_chunk_count(),
                visible = store.visible_count(),
                in_flight = store.dispatcher().in_flight(),
                "streaming"
            );
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    let deadline = Instant::now() + SETTLE_TIMEOUT;
    while !store.dispatcher().is_idle() && Instant::now() < deadline {
        store.process_completed();
        tally.record(&store.drain_events());
        std::thread::sleep(Duration::from_millis(5));
    }
    if !store.dispatcher().is_idle() {
        warn!(in_flight = store.dispatcher().in_flight(), "workers still running at exit");
    }

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        loaded = store.loaded_chunk_count(),
        visible = store.visible_count(),
        shown = tally.shown,
        hidden = tally.hidden,
        mesh_swaps = tally.mesh_swaps,
        colliders = tally.colliders,
        "walk finished"
    );
}
