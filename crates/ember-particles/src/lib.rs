//! Ember Particles - fixed-capacity particle emitters
//!
//! Provides pooled per-emitter particle simulation with:
//! - Ring-indexed slot reuse: no allocation or compaction after construction
//! - Accumulator-driven emission cadence that never drops overdue particles
//! - Per-particle integration of velocity, gravity, friction, spin, zoom and fade
//! - Packing of live particles into rotated textured quads for one draw call

pub mod emitter;
pub mod integrate;
pub mod pack;
pub mod particle;
pub mod pixel_cache;
pub mod range;
pub mod set;

use ember_core::Result;
use ember_runtime::RuntimeSystem;

pub use emitter::{EmitterConfig, ParticleEmitter, RangeAttribute, DEFAULT_MAX_PARTICLES};
pub use pack::{
    BufferLayout, DrawBatch, DrawSink, PackedBuffers, ShaderHandle, Sprite, TextureInfo, Vertex2d,
};
pub use particle::{Particle, ParticlePool, SlotIndex};
pub use pixel_cache::{MemoryImage, PixelCache, PixelSource, Rgba8};
pub use range::Range;
pub use set::EmitterSet;

/// The particle system. Implements RuntimeSystem for integration with the frame loop.
///
/// `update` simulates and then packs, so a render step that follows always
/// sees buffers for the fully updated pools.
#[derive(Default)]
pub struct ParticleSystem {
    pub emitters: EmitterSet,
}

impl ParticleSystem {
    pub fn new(emitters: EmitterSet) -> Self {
        Self { emitters }
    }

    /// Submit every emitter's packed buffers to `sink`.
    pub fn render<S: DrawSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        self.emitters.draw_all(sink)
    }
}

impl RuntimeSystem for ParticleSystem {
    fn initialize(&mut self) -> Result<()> {
        let count = self.emitters.emitter_count();
        if count > 0 {
            log::info!("[particles] Discovered {count} emitter(s)");
        }
        Ok(())
    }

    fn update(&mut self, dt: f64) -> Result<()> {
        self.emitters.update(dt as f32)?;
        self.emitters.pack_all();
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.emitters.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "particles"
    }
}
