//! LOD mesh construction from a border-padded heightfield.
//!
//! The heightfield is `verts_per_line` samples square. Ring 0 (the outermost
//! samples) never becomes geometry but feeds the normals, so lighting stays
//! continuous across chunk borders. Ring 1 is always meshed at full
//! resolution. Ring 2 holds edge-connection vertices whose heights are
//! interpolated between the coarser interior vertices, so any two LODs meet
//! without cracks.
//!
//! ```text
//!  B  B  B  B  B  B  B        B  out-of-mesh border
//!  B  E  E  E  E  E  B        E  mesh edge
//!  B  E  M  c  M  E  B        M  main (aligned to the skip increment)
//!  B  E  c  .  c  E  B        c  edge connection
//!  B  E  M  c  M  E  B        .  skipped
//!  B  E  E  E  E  E  B
//!  B  B  B  B  B  B  B
//! ```

use glam::{Vec2, Vec3};
use vista_terrain::Heightfield;

use crate::settings::{MeshSettings, NUM_SUPPORTED_LODS};
use crate::terrain_mesh::TerrainMesh;

/// Grid stride of interior vertices at `lod`: 1 at full detail, then `2 * lod`.
#[inline]
pub fn skip_increment(lod: usize) -> usize {
    if lod == 0 { 1 } else { lod * 2 }
}

/// Closed-form vertex and triangle counts for one mesh resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshLayout {
    verts_per_line: usize,
    skip: usize,
}

impl MeshLayout {
    pub fn new(verts_per_line: usize, lod: usize) -> Self {
        Self {
            verts_per_line,
            skip: skip_increment(lod),
        }
    }

    pub fn verts_per_line(&self) -> usize {
        self.verts_per_line
    }

    pub fn skip(&self) -> usize {
        self.skip
    }

    /// Vertices on ring 1.
    pub fn edge_vertex_count(&self) -> usize {
        (self.verts_per_line - 2) * 4 - 4
    }

    /// Vertices on ring 2 that are not aligned to the skip increment.
    pub fn edge_connection_vertex_count(&self) -> usize {
        (self.skip - 1) * (self.verts_per_line - 5) / self.skip * 4
    }

    pub fn main_vertices_per_line(&self) -> usize {
        (self.verts_per_line - 5) / self.skip + 1
    }

    pub fn main_vertex_count(&self) -> usize {
        let m = self.main_vertices_per_line();
        m * m
    }

    /// Real (rendered) vertices, border excluded.
    pub fn vertex_count(&self) -> usize {
        self.edge_vertex_count() + self.edge_connection_vertex_count() + self.main_vertex_count()
    }

    /// Triangles in the full-resolution band between rings 1 and 2.
    pub fn edge_triangle_count(&self) -> usize {
        (self.verts_per_line - 4) * 8
    }

    pub fn main_triangle_count(&self) -> usize {
        let m = self.main_vertices_per_line() - 1;
        m * m * 2
    }

    pub fn triangle_count(&self) -> usize {
        self.edge_triangle_count() + self.main_triangle_count()
    }

    pub fn border_vertex_count(&self) -> usize {
        self.verts_per_line * 4 - 4
    }

    /// Triangles touching ring 0; used for normals only.
    pub fn border_triangle_count(&self) -> usize {
        (self.verts_per_line - 2) * 8
    }

    fn classify(&self, x: usize, y: usize) -> VertexKind {
        let v = self.verts_per_line;
        if x == 0 || y == 0 || x == v - 1 || y == v - 1 {
            return VertexKind::OutOfMesh;
        }
        if x == 1 || y == 1 || x == v - 2 || y == v - 2 {
            return VertexKind::MeshEdge;
        }
        if (x - 2) % self.skip == 0 && (y - 2) % self.skip == 0 {
            return VertexKind::Main;
        }
        if x == 2 || y == 2 || x == v - 3 || y == v - 3 {
            return VertexKind::EdgeConnection;
        }
        VertexKind::Skipped
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VertexKind {
    OutOfMesh,
    MeshEdge,
    Main,
    EdgeConnection,
    Skipped,
}

/// Where a grid cell's vertex lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Mesh(u32),
    Border(u32),
    Skipped,
}

/// Build the mesh for `heightfield` at detail level `lod`.
///
/// # Panics
///
/// Panics if `lod >= NUM_SUPPORTED_LODS` or if the heightfield is smaller than
/// `settings.verts_per_line()` on either axis. Both are guaranteed by validated
/// settings and heightfields built for them.
pub fn build_terrain_mesh(heightfield: &Heightfield, settings: &MeshSettings, lod: usize) -> TerrainMesh {
    assert!(lod < NUM_SUPPORTED_LODS, "lod {lod} out of range");
    let v = settings.verts_per_line();
    assert!(
        heightfield.width() >= v && heightfield.height() >= v,
        "heightfield {}x{} smaller than {v}x{v}",
        heightfield.width(),
        heightfield.height()
    );

    let layout = MeshLayout::new(v, lod);
    let skip = layout.skip();
    let world_size = settings.world_size();
    // Chunk-centred: x runs left to right, z runs top to bottom towards -z.
    let top_left = Vec2::new(-world_size, world_size) / 2.0;

    let mut slots = vec![Slot::Skipped; v * v];
    let mut mesh_count = 0u32;
    let mut border_count = 0u32;
    for y in 0..v {
        for x in 0..v {
            slots[y * v + x] = match layout.classify(x, y) {
                VertexKind::Skipped => Slot::Skipped,
                VertexKind::OutOfMesh => {
                    border_count += 1;
                    Slot::Border(border_count - 1)
                }
                _ => {
                    mesh_count += 1;
                    Slot::Mesh(mesh_count - 1)
                }
            };
        }
    }

    let mut positions = vec![Vec3::ZERO; mesh_count as usize];
    let mut uvs = vec![Vec2::ZERO; mesh_count as usize];
    let mut border_positions = vec![Vec3::ZERO; border_count as usize];
    let mut indices = Vec::with_capacity(layout.triangle_count() * 3);
    let mut border_triangles: Vec<[Slot; 3]> = Vec::with_capacity(layout.border_triangle_count());

    let span = (v - 3) as f32;
    for y in 0..v {
        for x in 0..v {
            let kind = layout.classify(x, y);
            if kind == VertexKind::Skipped {
                continue;
            }

            let percent = Vec2::new(x as f32 - 1.0, y as f32 - 1.0) / span;
            let height = if kind == VertexKind::EdgeConnection {
                edge_connection_height(heightfield, &layout, x, y)
            } else {
                heightfield.get(x, y)
            };
            let position = Vec3::new(
                top_left.x + percent.x * world_size,
                height,
                top_left.y - percent.y * world_size,
            );

            match slots[y * v + x] {
                Slot::Mesh(i) => {
                    positions[i as usize] = position;
                    uvs[i as usize] = percent;
                }
                Slot::Border(i) => border_positions[i as usize] = position,
                Slot::Skipped => {}
            }

            // Ring-2 connection vertices on the top and left sides are covered
            // by the quads of the main vertices they interpolate.
            let create_quad = x < v - 1
                && y < v - 1
                && (kind != VertexKind::EdgeConnection || (x != 2 && y != 2));
            if !create_quad {
                continue;
            }

            let step = if kind == VertexKind::Main && x != v - 3 && y != v - 3 {
                skip
            } else {
                1
            };
            let a = slots[y * v + x];
            let b = slots[y * v + x + step];
            let c = slots[(y + step) * v + x];
            let d = slots[(y + step) * v + x + step];
            for triangle in [[a, d, c], [d, a, b]] {
                match triangle {
                    [Slot::Mesh(i), Slot::Mesh(j), Slot::Mesh(k)] => indices.extend([i, j, k]),
                    _ => border_triangles.push(triangle),
                }
            }
        }
    }

    if settings.use_flat_shading {
        return flat_shade(&positions, &uvs, &indices);
    }

    let normals = smooth_normals(&positions, &border_positions, &indices, &border_triangles);
    TerrainMesh {
        positions,
        uvs,
        normals,
        indices,
        flat_shaded: false,
    }
}

/// Height of an edge-connection vertex: linear blend of the two main vertices
/// bounding it along its ring.
fn edge_connection_height(heightfield: &Heightfield, layout: &MeshLayout, x: usize, y: usize) -> f32 {
    let v = layout.verts_per_line();
    let skip = layout.skip();
    let vertical = x == 2 || x == v - 3;

    let along = if vertical { y - 2 } else { x - 2 };
    let dst_a = along % skip;
    let dst_b = skip - dst_a;
    let t = dst_a as f32 / skip as f32;

    let (height_a, height_b) = if vertical {
        (heightfield.get(x, y - dst_a), heightfield.get(x, y + dst_b))
    } else {
        (heightfield.get(x - dst_a, y), heightfield.get(x + dst_b, y))
    };
    height_a * (1.0 - t) + height_b * t
}

#[inline]
fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (a - b).cross(a - c).normalize_or_zero()
}

fn smooth_normals(
    positions: &[Vec3],
    border_positions: &[Vec3],
    indices: &[u32],
    border_triangles: &[[Slot; 3]],
) -> Vec<Vec3> {
    let resolve = |slot: Slot| match slot {
        Slot::Mesh(i) => positions[i as usize],
        Slot::Border(i) => border_positions[i as usize],
        Slot::Skipped => Vec3::ZERO,
    };

    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let n = face_normal(positions[a], positions[b], positions[c]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    for &[a, b, c] in border_triangles {
        let n = face_normal(resolve(a), resolve(b), resolve(c));
        for slot in [a, b, c] {
            if let Slot::Mesh(i) = slot {
                normals[i as usize] += n;
            }
        }
    }
    for n in &mut normals {
        *n = n.normalize_or_zero();
    }
    normals
}

/// Give every triangle its own three vertices carrying the face normal.
fn flat_shade(positions: &[Vec3], uvs: &[Vec2], indices: &[u32]) -> TerrainMesh {
    let mut flat_positions = Vec::with_capacity(indices.len());
    let mut flat_uvs = Vec::with_capacity(indices.len());
    let mut normals = Vec::with_capacity(indices.len());

    for tri in indices.chunks_exact(3) {
        let corners = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let n = face_normal(positions[corners[0]], positions[corners[1]], positions[corners[2]]);
        for i in corners {
            flat_positions.push(positions[i]);
            flat_uvs.push(uvs[i]);
            normals.push(n);
        }
    }

    TerrainMesh {
        positions: flat_positions,
        uvs: flat_uvs,
        normals,
        indices: (0..indices.len() as u32).collect(),
        flat_shaded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SUPPORTED_CHUNK_SIZES;
    use vista_terrain::{
        Grid, HeightCurve, HeightMapBuilder, HeightMapSettings, NoiseSettings, NormalizeMode,
        generate_noise_map,
    };

    const EPSILON: f32 = 1e-4;

    fn mesh_settings(chunk_size_index: usize) -> MeshSettings {
        MeshSettings {
            chunk_size_index,
            ..Default::default()
        }
    }

    fn flat_heightfield(settings: &MeshSettings, elevation: f32) -> Heightfield {
        let v = settings.verts_per_line();
        Heightfield::flat(v, v, elevation)
    }

    /// Find the mesh vertex generated from grid cell `(x, y)` through its UV.
    fn vertex_at(mesh: &TerrainMesh, v: usize, x: usize, y: usize) -> Option<usize> {
        let uv = Vec2::new(x as f32 - 1.0, y as f32 - 1.0) / (v - 3) as f32;
        mesh.uvs.iter().position(|u| (*u - uv).length() < 1e-6)
    }

    #[test]
    fn test_skip_increment() {
        assert_eq!(
            (0..NUM_SUPPORTED_LODS).map(skip_increment).collect::<Vec<_>>(),
            vec![1, 2, 4, 6, 8]
        );
    }

    #[test]
    fn test_full_detail_counts() {
        let settings = mesh_settings(0);
        let v = settings.verts_per_line();
        let mesh = build_terrain_mesh(&flat_heightfield(&settings, 0.0), &settings, 0);

        assert_eq!(mesh.vertex_count(), (v - 2) * (v - 2));
        assert_eq!(mesh.triangle_count(), 2 * (v - 3) * (v - 3));
        let layout = MeshLayout::new(v, 0);
        assert_eq!(layout.vertex_count(), mesh.vertex_count());
        assert_eq!(layout.triangle_count(), mesh.triangle_count());
        assert_eq!(layout.edge_connection_vertex_count(), 0);
    }

    #[test]
    fn test_reduced_detail_counts_match_layout() {
        for index in [0, 4, 8] {
            let settings = mesh_settings(index);
            let v = settings.verts_per_line();
            let hf = flat_heightfield(&settings, 1.0);
            for lod in 1..NUM_SUPPORTED_LODS {
                let mesh = build_terrain_mesh(&hf, &settings, lod);
                let layout = MeshLayout::new(v, lod);
                assert_eq!(
                    mesh.vertex_count(),
                    layout.vertex_count(),
                    "vertex count, size {} lod {lod}",
                    SUPPORTED_CHUNK_SIZES[index]
                );
                assert_eq!(
                    mesh.triangle_count(),
                    layout.triangle_count(),
                    "triangle count, size {} lod {lod}",
                    SUPPORTED_CHUNK_SIZES[index]
                );
            }
        }
    }

    #[test]
    fn test_indices_in_range_and_fewer_at_lower_detail() {
        let settings = mesh_settings(2);
        let hf = flat_heightfield(&settings, 0.0);
        let mut previous = usize::MAX;
        for lod in 0..NUM_SUPPORTED_LODS {
            let mesh = build_terrain_mesh(&hf, &settings, lod);
            assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
            assert!(mesh.triangle_count() < previous);
            previous = mesh.triangle_count();
        }
    }

    #[test]
    fn test_edge_connection_heights_interpolate() {
        let settings = mesh_settings(0);
        let v = settings.verts_per_line();
        let hf = Heightfield::from_grid(Grid::from_fn(v, v, |x, y| (x * x) as f32 * 0.01 + y as f32 * 0.3));
        let lod = 2;
        let skip = skip_increment(lod);
        let mesh = build_terrain_mesh(&hf, &settings, lod);

        // Left ring: halfway between two main vertices.
        let i = vertex_at(&mesh, v, 2, 2 + skip / 2).unwrap();
        let expected = (hf.get(2, 2) + hf.get(2, 2 + skip)) / 2.0;
        assert!((mesh.positions[i].y - expected).abs() < EPSILON);

        // Bottom ring: a quarter of the way along.
        let i = vertex_at(&mesh, v, 2 + skip + 1, v - 3).unwrap();
        let expected = hf.get(2 + skip, v - 3) * 0.75 + hf.get(2 + 2 * skip, v - 3) * 0.25;
        assert!((mesh.positions[i].y - expected).abs() < EPSILON);

        // Main and mesh-edge vertices keep their samples.
        let i = vertex_at(&mesh, v, 2 + skip, 2 + skip).unwrap();
        assert_eq!(mesh.positions[i].y, hf.get(2 + skip, 2 + skip));
        let i = vertex_at(&mesh, v, 5, 1).unwrap();
        assert_eq!(mesh.positions[i].y, hf.get(5, 1));

        // Interior vertices off the skip grid are not emitted.
        assert!(vertex_at(&mesh, v, 2 + skip + 1, 2 + skip + 1).is_none());
    }

    #[test]
    fn test_flat_field_normals_point_up() {
        let settings = mesh_settings(1);
        let hf = flat_heightfield(&settings, 3.0);
        for lod in [0, 3] {
            let mesh = build_terrain_mesh(&hf, &settings, lod);
            for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
                assert_eq!(p.y, 3.0);
                assert!((*n - Vec3::Y).length() < EPSILON, "normal {n} not up");
            }
        }
    }

    #[test]
    fn test_normals_are_unit_length_on_noise() {
        let settings = mesh_settings(0);
        let v = settings.verts_per_line();
        let hf = HeightMapBuilder::new().build(v, v, &HeightMapSettings::default(), Vec2::ZERO);
        let mesh = build_terrain_mesh(&hf, &settings, 1);
        for n in &mesh.normals {
            assert!((n.length() - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_border_slope_reaches_edge_normals() {
        // A ridge that only exists in ring 0 still tilts the ring-1 normals.
        let settings = mesh_settings(0);
        let v = settings.verts_per_line();
        let hf = Heightfield::from_grid(Grid::from_fn(v, v, |x, _| if x == 0 { 5.0 } else { 0.0 }));
        let mesh = build_terrain_mesh(&hf, &settings, 0);
        let edge = vertex_at(&mesh, v, 1, v / 2).unwrap();
        let inner = vertex_at(&mesh, v, 3, v / 2).unwrap();
        assert!(mesh.normals[edge].x > EPSILON, "edge normal should lean away from the ridge");
        assert!((mesh.normals[inner] - Vec3::Y).length() < EPSILON);
    }

    #[test]
    fn test_uvs_and_positions_span_chunk() {
        let settings = mesh_settings(0);
        let v = settings.verts_per_line();
        let ws = settings.world_size();
        let mesh = build_terrain_mesh(&flat_heightfield(&settings, 0.0), &settings, 1);

        for uv in &mesh.uvs {
            assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
        }
        let top_left = vertex_at(&mesh, v, 1, 1).unwrap();
        assert_eq!(mesh.uvs[top_left], Vec2::ZERO);
        assert!((mesh.positions[top_left] - Vec3::new(-ws / 2.0, 0.0, ws / 2.0)).length() < EPSILON);
        let bottom_right = vertex_at(&mesh, v, v - 2, v - 2).unwrap();
        assert!((mesh.positions[bottom_right] - Vec3::new(ws / 2.0, 0.0, -ws / 2.0)).length() < EPSILON);
    }

    #[test]
    fn test_flat_shading_explodes_triangles() {
        let settings = MeshSettings {
            use_flat_shading: true,
            flatshaded_chunk_size_index: 0,
            ..Default::default()
        };
        let v = settings.verts_per_line();
        let builder = HeightMapBuilder::new();
        let hf = builder.build(v, v, &HeightMapSettings::default(), Vec2::new(3.0, 7.0));
        let mesh = build_terrain_mesh(&hf, &settings, 1);

        assert!(mesh.flat_shaded);
        assert_eq!(mesh.triangle_count(), MeshLayout::new(v, 1).triangle_count());
        assert_eq!(mesh.vertex_count(), mesh.triangle_count() * 3);
        assert!(mesh.indices.iter().enumerate().all(|(i, &idx)| idx as usize == i));
        for (tri, normals) in mesh.positions.chunks_exact(3).zip(mesh.normals.chunks_exact(3)) {
            let expected = face_normal(tri[0], tri[1], tri[2]);
            assert!(normals.iter().all(|n| *n == expected));
            assert!(expected.y > 0.0, "terrain faces point up");
        }
    }

    #[test]
    fn test_end_to_end_heights_preserved() {
        let settings = mesh_settings(8);
        let v = settings.verts_per_line();
        let height_settings = HeightMapSettings {
            noise: NoiseSettings {
                seed: 17,
                ..Default::default()
            },
            height_multiplier: 10.0,
            height_curve: HeightCurve::linear(),
            use_falloff: false,
        };
        let hf = HeightMapBuilder::new().build(v, v, &height_settings, Vec2::ZERO);
        let mesh = build_terrain_mesh(&hf, &settings, 0);

        assert_eq!(mesh.vertex_count(), (v - 2) * (v - 2));
        let mut interior_max = f32::MIN;
        for y in 1..v - 1 {
            for x in 1..v - 1 {
                interior_max = interior_max.max(hf.get(x, y));
            }
        }
        let (_, mesh_max) = mesh.height_range().unwrap();
        assert_eq!(mesh_max, interior_max);

        // Linear curve: the peak is the multiplier times the largest meshed noise sample.
        let noise = generate_noise_map(v, v, &height_settings.noise, Vec2::ZERO);
        let mut noise_max = f32::NEG_INFINITY;
        for y in 1..v - 1 {
            for x in 1..v - 1 {
                noise_max = noise_max.max(noise.get(x, y));
            }
        }
        assert!(
            (mesh_max - 10.0 * noise_max).abs() < EPSILON,
            "mesh peak {mesh_max} != 10 * {noise_max}"
        );
        assert!(mesh_max <= 10.0 + EPSILON);
    }

    #[test]
    fn test_adjacent_chunks_share_edge_across_lods() {
        let settings = mesh_settings(0);
        let v = settings.verts_per_line();
        let height_settings = HeightMapSettings {
            noise: NoiseSettings {
                normalize_mode: NormalizeMode::Global,
                seed: 5,
                scale: 30.0,
                octaves: 4,
                ..Default::default()
            },
            ..Default::default()
        };
        let builder = HeightMapBuilder::new();
        let step = settings.world_size() / settings.mesh_scale;
        let left_hf = builder.build(v, v, &height_settings, Vec2::ZERO);
        let right_hf = builder.build(v, v, &height_settings, Vec2::new(step, 0.0));
        let left = build_terrain_mesh(&left_hf, &settings, 0);
        let right = build_terrain_mesh(&right_hf, &settings, 3);

        for y in 1..v - 1 {
            let l = left.positions[vertex_at(&left, v, v - 2, y).unwrap()];
            let r = right.positions[vertex_at(&right, v, 1, y).unwrap()];
            assert!((l.y - r.y).abs() < EPSILON, "seam height mismatch at row {y}");
            assert!((l.x - (r.x + settings.world_size())).abs() < EPSILON);
            assert!((l.z - r.z).abs() < EPSILON);
        }
    }

    #[test]
    #[should_panic(expected = "smaller than")]
    fn test_undersized_heightfield_panics() {
        let settings = mesh_settings(0);
        build_terrain_mesh(&Heightfield::flat(10, 10, 0.0), &settings, 0);
    }
}
