//! Finished terrain mesh data, ready for a renderer or collider.

use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// One interleaved vertex for GPU upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

const _: () = assert!(
    mem::size_of::<TerrainVertex>() == 32,
    "TerrainVertex layout changed, update renderer vertex layouts"
);

/// Output of one meshing pass.
///
/// `positions`, `uvs` and `normals` are parallel arrays; `indices` holds three
/// entries per triangle. With flat shading every triangle owns its three
/// vertices and `normals` carries the face normal of each.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerrainMesh {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub flat_shaded: bool,
}

impl TerrainMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Interleave the parallel arrays into a single vertex buffer.
    pub fn vertices(&self) -> Vec<TerrainVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.uvs)
            .map(|((p, n), uv)| TerrainVertex {
                position: p.to_array(),
                normal: n.to_array(),
                uv: uv.to_array(),
            })
            .collect()
    }

    /// Raw bytes of [`TerrainMesh::vertices`], suitable for a vertex buffer upload.
    pub fn vertex_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.vertices()).to_vec()
    }

    /// Lowest and highest vertex elevation, `None` for an empty mesh.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.positions.iter().fold(None, |acc, p| match acc {
            None => Some((p.y, p.y)),
            Some((lo, hi)) => Some((lo.min(p.y), hi.max(p.y))),
        })
    }
}
