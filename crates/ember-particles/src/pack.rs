//! Packing live particles into flat quad buffers for one batched draw

use crate::particle::ParticlePool;
use bytemuck::{Pod, Zeroable};
use ember_core::Result;
use serde::Serialize;

/// Quads are emitted as four corners each
pub const VERTICES_PER_PARTICLE: usize = 4;

/// 2D position or texture coordinate, laid out as two packed f32s
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable, Serialize)]
pub struct Vertex2d {
    pub x: f32,
    pub y: f32,
}

impl Vertex2d {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Per-vertex RGBA color
pub type VertexColor = [f32; 4];

/// Texture handle and the normalized rectangle the sprite occupies in it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextureInfo {
    pub id: u32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl TextureInfo {
    /// The whole of texture `id`
    pub fn full(id: u32) -> Self {
        Self {
            id,
            left: 0.0,
            right: 1.0,
            top: 0.0,
            bottom: 1.0,
        }
    }

    /// Corners in quad winding order: top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [Vertex2d; VERTICES_PER_PARTICLE] {
        [
            Vertex2d::new(self.left, self.top),
            Vertex2d::new(self.right, self.top),
            Vertex2d::new(self.right, self.bottom),
            Vertex2d::new(self.left, self.bottom),
        ]
    }
}

/// Image bound to an emitter: where it lives on the GPU and its pixel size.
///
/// This is a non-owning description. The texture it names must stay valid
/// for every frame the emitter is drawn with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sprite {
    pub texture: TextureInfo,
    pub width: u32,
    pub height: u32,
}

/// Opaque shader binding passed through to the draw sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ShaderHandle(pub u32);

/// Three parallel per-vertex arrays, `4 × live` entries each
#[derive(Debug, Default, Clone)]
pub struct PackedBuffers {
    pub vertices: Vec<Vertex2d>,
    pub colors: Vec<VertexColor>,
    pub texcoords: Vec<Vertex2d>,
}

impl PackedBuffers {
    /// Buffers sized once for a pool of `capacity` particles
    pub fn with_capacity(capacity: usize) -> Self {
        let vertices = capacity * VERTICES_PER_PARTICLE;
        Self {
            vertices: Vec::with_capacity(vertices),
            colors: Vec::with_capacity(vertices),
            texcoords: Vec::with_capacity(vertices),
        }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.colors.clear();
        self.texcoords.clear();
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_PARTICLE
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn texcoord_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texcoords)
    }
}

/// Byte offsets of each array inside one combined vertex buffer.
///
/// Regions are sized for a full pool so the buffer is allocated once; a frame
/// with fewer live particles only fills the front of each region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferLayout {
    pub vertex_offset: usize,
    pub color_offset: usize,
    pub texcoord_offset: usize,
    pub total_bytes: usize,
}

impl BufferLayout {
    pub fn for_capacity(capacity: usize) -> Self {
        let vertices = capacity * VERTICES_PER_PARTICLE;
        let vertex_bytes = vertices * std::mem::size_of::<Vertex2d>();
        let color_bytes = vertices * std::mem::size_of::<VertexColor>();
        let texcoord_bytes = vertices * std::mem::size_of::<Vertex2d>();
        Self {
            vertex_offset: 0,
            color_offset: vertex_bytes,
            texcoord_offset: vertex_bytes + color_bytes,
            total_bytes: vertex_bytes + color_bytes + texcoord_bytes,
        }
    }
}

/// Everything a renderer needs to issue one draw call for an emitter
#[derive(Debug, Clone, Copy)]
pub struct DrawBatch<'a> {
    pub buffers: &'a PackedBuffers,
    pub layout: BufferLayout,
    pub texture_id: u32,
    pub shader: Option<ShaderHandle>,
    pub quad_count: usize,
}

/// Receives packed particle buffers and submits them to the GPU
pub trait DrawSink {
    fn draw_quads(&mut self, batch: &DrawBatch<'_>) -> Result<()>;
}

/// Write a rotated, textured quad for every live particle into `out`.
///
/// `out` is cleared first. Vertex and texcoord corners share one winding
/// (top-left, top-right, bottom-right, bottom-left) so the sprite is never
/// mirrored.
pub fn pack(pool: &ParticlePool, sprite: &Sprite, out: &mut PackedBuffers) {
    out.clear();
    let texcoords = sprite.texture.corners();
    let width = sprite.width as f32;
    let height = sprite.height as f32;

    pool.for_each_live(|_, p| {
        let w = width * p.scale;
        let h = height * p.scale;
        let left = -w * p.center_x;
        let right = w * (1.0 - p.center_x);
        let top = -h * p.center_y;
        let bottom = h * (1.0 - p.center_y);

        let (sin, cos) = p.angle.sin_cos();
        let corners = [(left, top), (right, top), (right, bottom), (left, bottom)];
        for (dx, dy) in corners {
            out.vertices.push(Vertex2d::new(
                p.x + dx * cos - dy * sin,
                p.y + dx * sin + dy * cos,
            ));
        }

        let color = p.color.to_array();
        out.colors.extend_from_slice(&[color; VERTICES_PER_PARTICLE]);
        out.texcoords.extend_from_slice(&texcoords);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;
    use ember_core::Color;

    fn sprite() -> Sprite {
        Sprite {
            texture: TextureInfo {
                id: 7,
                left: 0.25,
                right: 0.5,
                top: 0.0,
                bottom: 0.125,
            },
            width: 4,
            height: 2,
        }
    }

    fn particle_at(x: f32, y: f32) -> Particle {
        Particle {
            x,
            y,
            time_to_live: 1.0,
            ..Particle::dead()
        }
    }

    fn assert_close(a: Vertex2d, b: Vertex2d) {
        assert!(
            (a.x - b.x).abs() < 1e-5 && (a.y - b.y).abs() < 1e-5,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn empty_pool_packs_nothing() {
        let pool = ParticlePool::new(8);
        let mut out = PackedBuffers::with_capacity(8);
        pack(&pool, &sprite(), &mut out);
        assert!(out.vertices.is_empty());
        assert!(out.colors.is_empty());
        assert!(out.texcoords.is_empty());
        assert_eq!(out.quad_count(), 0);
    }

    #[test]
    fn four_entries_per_live_particle() {
        let mut pool = ParticlePool::new(8);
        let colors = [Color::WHITE, Color::new(1.0, 0.0, 0.0, 0.5), Color::BLACK];
        for (i, color) in colors.iter().enumerate() {
            pool.spawn(Particle {
                color: *color,
                ..particle_at(i as f32, 0.0)
            });
        }
        let dead = pool.spawn(particle_at(99.0, 99.0)).unwrap();
        pool.mark_dead(dead);

        let mut out = PackedBuffers::with_capacity(8);
        pack(&pool, &sprite(), &mut out);

        assert_eq!(out.vertices.len(), 12);
        assert_eq!(out.colors.len(), 12);
        assert_eq!(out.texcoords.len(), 12);
        for (quad, color) in out.colors.chunks(4).zip(colors.iter()) {
            assert!(quad.iter().all(|c| *c == color.to_array()));
        }
    }

    #[test]
    fn unrotated_quad_matches_texcoord_winding() {
        let mut pool = ParticlePool::new(1);
        pool.spawn(particle_at(10.0, 20.0));
        let mut out = PackedBuffers::default();
        pack(&pool, &sprite(), &mut out);

        let expected = [
            Vertex2d::new(8.0, 19.0),
            Vertex2d::new(12.0, 19.0),
            Vertex2d::new(12.0, 21.0),
            Vertex2d::new(8.0, 21.0),
        ];
        for (v, e) in out.vertices.iter().zip(expected) {
            assert_close(*v, e);
        }
        assert_eq!(
            out.texcoords,
            vec![
                Vertex2d::new(0.25, 0.0),
                Vertex2d::new(0.5, 0.0),
                Vertex2d::new(0.5, 0.125),
                Vertex2d::new(0.25, 0.125),
            ]
        );
    }

    #[test]
    fn rotation_is_applied_per_vertex() {
        let mut pool = ParticlePool::new(1);
        pool.spawn(Particle {
            angle: std::f32::consts::FRAC_PI_2,
            scale: 2.0,
            ..particle_at(0.0, 0.0)
        });
        let mut out = PackedBuffers::default();
        pack(&pool, &sprite(), &mut out);

        // 8x4 quad turned a quarter: (x, y) -> (-y, x)
        let expected = [
            Vertex2d::new(2.0, -4.0),
            Vertex2d::new(2.0, 4.0),
            Vertex2d::new(-2.0, 4.0),
            Vertex2d::new(-2.0, -4.0),
        ];
        for (v, e) in out.vertices.iter().zip(expected) {
            assert_close(*v, e);
        }
    }

    #[test]
    fn anchor_shifts_quad() {
        let mut pool = ParticlePool::new(1);
        pool.spawn(Particle {
            center_x: 0.0,
            center_y: 0.0,
            ..particle_at(1.0, 1.0)
        });
        let mut out = PackedBuffers::default();
        pack(&pool, &sprite(), &mut out);
        assert_close(out.vertices[0], Vertex2d::new(1.0, 1.0));
        assert_close(out.vertices[2], Vertex2d::new(5.0, 3.0));
    }

    #[test]
    fn packing_reuses_reserved_storage() {
        let mut pool = ParticlePool::new(16);
        for i in 0..16 {
            pool.spawn(particle_at(i as f32, 0.0));
        }
        let mut out = PackedBuffers::with_capacity(16);
        let reserved = out.vertices.capacity();
        for _ in 0..3 {
            pack(&pool, &sprite(), &mut out);
        }
        assert_eq!(out.vertices.capacity(), reserved);
        assert_eq!(out.quad_count(), 16);
    }

    #[test]
    fn layout_offsets_follow_region_sizes() {
        let layout = BufferLayout::for_capacity(10);
        assert_eq!(layout.vertex_offset, 0);
        assert_eq!(layout.color_offset, 40 * 8);
        assert_eq!(layout.texcoord_offset, 40 * 8 + 40 * 16);
        assert_eq!(layout.total_bytes, 40 * 8 * 2 + 40 * 16);

        let mut out = PackedBuffers::default();
        out.vertices.push(Vertex2d::new(1.0, 2.0));
        assert_eq!(out.vertex_bytes().len(), 8);
    }
}
