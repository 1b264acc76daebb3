//! Emitter configuration (validated, loadable from TOML) and runtime state

use crate::pack::{
    self, BufferLayout, DrawBatch, DrawSink, PackedBuffers, ShaderHandle, Sprite, TextureInfo,
};
use crate::particle::{Particle, ParticlePool, SlotIndex};
use crate::range::Range;
use ember_core::{Color, EmberError, Result, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use std::fmt;

/// Capacity used when a configuration does not name one
pub const DEFAULT_MAX_PARTICLES: usize = 1000;

/// Every particle attribute drawn from a [`Range`] at emission time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeAttribute {
    AngularVelocity,
    CenterX,
    CenterY,
    Fade,
    Friction,
    Interval,
    Offset,
    Scale,
    Speed,
    TimeToLive,
    Zoom,
}

impl RangeAttribute {
    pub const ALL: [RangeAttribute; 11] = [
        RangeAttribute::AngularVelocity,
        RangeAttribute::CenterX,
        RangeAttribute::CenterY,
        RangeAttribute::Fade,
        RangeAttribute::Friction,
        RangeAttribute::Interval,
        RangeAttribute::Offset,
        RangeAttribute::Scale,
        RangeAttribute::Speed,
        RangeAttribute::TimeToLive,
        RangeAttribute::Zoom,
    ];

    /// Configuration key for this attribute
    pub fn key(self) -> &'static str {
        match self {
            RangeAttribute::AngularVelocity => "angular_velocity",
            RangeAttribute::CenterX => "center_x",
            RangeAttribute::CenterY => "center_y",
            RangeAttribute::Fade => "fade",
            RangeAttribute::Friction => "friction",
            RangeAttribute::Interval => "interval",
            RangeAttribute::Offset => "offset",
            RangeAttribute::Scale => "scale",
            RangeAttribute::Speed => "speed",
            RangeAttribute::TimeToLive => "time_to_live",
            RangeAttribute::Zoom => "zoom",
        }
    }
}

impl fmt::Display for RangeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Emitter placement plus the ranges new particles are sampled from
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterConfig {
    position: Vec3,
    gravity: f32,
    color: Color,
    angular_velocity: Range,
    center_x: Range,
    center_y: Range,
    fade: Range,
    friction: Range,
    interval: Range,
    offset: Range,
    scale: Range,
    speed: Range,
    time_to_live: Range,
    zoom: Range,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            gravity: 0.0,
            color: Color::WHITE,
            angular_velocity: Range::pinned(0.0),
            center_x: Range::pinned(0.5),
            center_y: Range::pinned(0.5),
            fade: Range::pinned(0.0),
            friction: Range::pinned(0.0),
            interval: Range::pinned(f32::INFINITY),
            offset: Range::pinned(0.0),
            scale: Range::pinned(1.0),
            speed: Range::pinned(0.0),
            time_to_live: Range::pinned(f32::INFINITY),
            zoom: Range::pinned(0.0),
        }
    }
}

impl EmitterConfig {
    /// Default configuration placed at `(x, y, z)`
    pub fn at(x: f32, y: f32, z: f32) -> Result<Self> {
        let mut config = Self::default();
        config.set_position(x, y, z)?;
        Ok(config)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) -> Result<()> {
        let position = Vec3::new(x, y, z);
        if !position.is_finite() {
            return Err(EmberError::NonFiniteValue {
                field: "position".to_string(),
                value: [x, y, z].into_iter().find(|v| !v.is_finite()).unwrap_or(f32::NAN),
            });
        }
        self.position = position;
        Ok(())
    }

    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: f32) -> Result<()> {
        finite("gravity", gravity)?;
        self.gravity = gravity;
        Ok(())
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) -> Result<()> {
        for channel in color.to_array() {
            finite("color", channel)?;
        }
        self.color = color;
        Ok(())
    }

    pub fn range(&self, attribute: RangeAttribute) -> Range {
        match attribute {
            RangeAttribute::AngularVelocity => self.angular_velocity,
            RangeAttribute::CenterX => self.center_x,
            RangeAttribute::CenterY => self.center_y,
            RangeAttribute::Fade => self.fade,
            RangeAttribute::Friction => self.friction,
            RangeAttribute::Interval => self.interval,
            RangeAttribute::Offset => self.offset,
            RangeAttribute::Scale => self.scale,
            RangeAttribute::Speed => self.speed,
            RangeAttribute::TimeToLive => self.time_to_live,
            RangeAttribute::Zoom => self.zoom,
        }
    }

    /// Replace one attribute's range after validating it.
    pub fn set_range(&mut self, attribute: RangeAttribute, min: f32, max: f32) -> Result<()> {
        let range = Range::new(attribute.key(), min, max)?;
        if attribute == RangeAttribute::Interval && range.min() <= 0.0 {
            return Err(EmberError::InvalidInterval(range.min()));
        }
        *self.range_mut(attribute) = range;
        Ok(())
    }

    fn range_mut(&mut self, attribute: RangeAttribute) -> &mut Range {
        match attribute {
            RangeAttribute::AngularVelocity => &mut self.angular_velocity,
            RangeAttribute::CenterX => &mut self.center_x,
            RangeAttribute::CenterY => &mut self.center_y,
            RangeAttribute::Fade => &mut self.fade,
            RangeAttribute::Friction => &mut self.friction,
            RangeAttribute::Interval => &mut self.interval,
            RangeAttribute::Offset => &mut self.offset,
            RangeAttribute::Scale => &mut self.scale,
            RangeAttribute::Speed => &mut self.speed,
            RangeAttribute::TimeToLive => &mut self.time_to_live,
            RangeAttribute::Zoom => &mut self.zoom,
        }
    }

    /// Parse a configuration from a TOML emitter table.
    ///
    /// Missing keys keep their defaults. Range keys accept a number (pinned)
    /// or a two-element `[min, max]` array.
    pub fn from_toml(table: &toml::value::Table) -> Result<Self> {
        let mut config = Self::default();

        let x = opt_f32(table, "x")?.unwrap_or(0.0);
        let y = opt_f32(table, "y")?.unwrap_or(0.0);
        let z = opt_f32(table, "z")?.unwrap_or(0.0);
        config.set_position(x, y, z)?;

        if let Some(gravity) = opt_f32(table, "gravity")? {
            config.set_gravity(gravity)?;
        }
        if let Some(v) = table.get("color") {
            config.set_color(toml_color(v)?)?;
        }
        for attribute in RangeAttribute::ALL {
            if let Some(v) = table.get(attribute.key()) {
                let (min, max) = toml_range(attribute.key(), v)?;
                config.set_range(attribute, min, max)?;
            }
        }

        Ok(config)
    }
}

/// Runtime state for one emitter: configuration, pool, cadence and buffers.
pub struct ParticleEmitter {
    config: EmitterConfig,
    pool: ParticlePool,
    /// Seconds until the next emission; negative when one is overdue
    time_until_emit: f32,
    rng: StdRng,
    buffers: PackedBuffers,
    layout: BufferLayout,
    image: Option<Sprite>,
    shader: Option<ShaderHandle>,
    /// Pool or image changed since the buffers were last packed
    needs_pack: bool,
}

impl ParticleEmitter {
    pub fn new(config: EmitterConfig, max_particles: usize) -> Self {
        Self::with_rng(config, max_particles, StdRng::from_os_rng())
    }

    /// Emitter with a deterministic random stream
    pub fn with_seed(config: EmitterConfig, max_particles: usize, seed: u64) -> Self {
        Self::with_rng(config, max_particles, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EmitterConfig, max_particles: usize, mut rng: StdRng) -> Self {
        let time_until_emit = config.interval.sample(&mut rng);
        log::debug!(
            "creating emitter at ({}, {}) with capacity {max_particles}",
            config.position.x,
            config.position.y
        );
        Self {
            config,
            pool: ParticlePool::new(max_particles),
            time_until_emit,
            rng,
            buffers: PackedBuffers::with_capacity(max_particles),
            layout: BufferLayout::for_capacity(max_particles),
            image: None,
            shader: None,
            needs_pack: false,
        }
    }

    /// Build an emitter from a TOML table, reading `max_particles`, `seed`
    /// and `sprite` alongside the [`EmitterConfig`] keys.
    pub fn from_toml(table: &toml::value::Table) -> Result<Self> {
        let config = EmitterConfig::from_toml(table)?;
        for key in unknown_keys(table) {
            log::warn!("ignoring unknown emitter key '{key}'");
        }
        let max_particles = match table.get("max_particles") {
            Some(v) => {
                let n = v.as_integer().ok_or_else(|| field_type("max_particles", "integer"))?;
                usize::try_from(n).map_err(|_| EmberError::InvalidCapacity(n))?
            }
            None => DEFAULT_MAX_PARTICLES,
        };
        let mut emitter = match table.get("seed") {
            Some(v) => {
                let seed = v.as_integer().ok_or_else(|| field_type("seed", "integer"))?;
                Self::with_seed(config, max_particles, seed as u64)
            }
            None => Self::new(config, max_particles),
        };
        if let Some(v) = table.get("sprite") {
            emitter.set_image(Some(toml_sprite(v)?));
        }
        Ok(emitter)
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    /// Number of live particles
    pub fn count(&self) -> usize {
        self.pool.alive_count()
    }

    pub fn max_particles(&self) -> usize {
        self.pool.capacity()
    }

    pub fn time_until_emit(&self) -> f32 {
        self.time_until_emit
    }

    /// Restart the random stream from `seed` and resample the time until
    /// the next emission, so later updates are reproducible.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.time_until_emit = self.config.interval.sample(&mut self.rng);
    }

    pub fn set_range(&mut self, attribute: RangeAttribute, min: f32, max: f32) -> Result<()> {
        self.config.set_range(attribute, min, max)?;
        if attribute == RangeAttribute::Interval {
            self.time_until_emit = self.config.interval.sample(&mut self.rng);
        }
        log::debug!("{attribute} set to {min}..{max}");
        Ok(())
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) -> Result<()> {
        self.config.set_position(x, y, z)
    }

    pub fn set_gravity(&mut self, gravity: f32) -> Result<()> {
        self.config.set_gravity(gravity)
    }

    pub fn set_color(&mut self, color: Color) -> Result<()> {
        self.config.set_color(color)
    }

    /// Base color as 0xAARRGGBB
    pub fn color_argb(&self) -> u32 {
        self.config.color.to_argb()
    }

    pub fn set_color_argb(&mut self, argb: u32) {
        self.config.color = Color::from_argb(argb);
    }

    pub fn image(&self) -> Option<&Sprite> {
        self.image.as_ref()
    }

    pub fn set_image(&mut self, image: Option<Sprite>) {
        self.image = image;
        self.needs_pack = true;
    }

    pub fn shader(&self) -> Option<ShaderHandle> {
        self.shader
    }

    pub fn set_shader(&mut self, shader: Option<ShaderHandle>) {
        self.shader = shader;
    }

    /// Emit one particle now, recycling the oldest one if the pool is full.
    pub fn emit(&mut self) -> Option<SlotIndex> {
        let particle = self.sample_particle();
        self.needs_pack = true;
        self.pool.spawn(particle)
    }

    fn sample_particle(&mut self) -> Particle {
        let c = &self.config;
        let rng = &mut self.rng;

        let direction = rng.random_range(0.0..TAU);
        let (sin, cos) = direction.sin_cos();
        let offset = c.offset.sample(rng);
        let speed = c.speed.sample(rng);

        Particle {
            x: c.position.x + offset * cos,
            y: c.position.y + offset * sin,
            center_x: c.center_x.sample(rng),
            center_y: c.center_y.sample(rng),
            velocity_x: speed * cos,
            velocity_y: speed * sin,
            angular_velocity: c.angular_velocity.sample(rng),
            color: c.color,
            fade: c.fade.sample(rng),
            scale: c.scale.sample(rng),
            zoom: c.zoom.sample(rng),
            friction: c.friction.sample(rng),
            angle: 0.0,
            time_to_live: c.time_to_live.sample(rng),
        }
    }

    /// Advance the emitter by `delta` seconds: emit whatever the cadence
    /// owes, then integrate every live particle. Returns how many particles
    /// were emitted.
    ///
    /// At most `max_particles` are emitted per update. Once that many have
    /// been emitted every slot holds a particle from this update, so the
    /// rest of the backlog is dropped and the cadence restarts.
    pub fn update(&mut self, delta: f32) -> Result<usize> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(EmberError::InvalidDelta(delta));
        }

        let capacity = self.pool.capacity();
        let mut emitted = 0;
        if capacity > 0 {
            self.time_until_emit -= delta;
            while self.time_until_emit <= 0.0 {
                if emitted == capacity {
                    log::debug!(
                        "emission backlog of {}s exceeds capacity {capacity}, restarting cadence",
                        -self.time_until_emit
                    );
                    self.time_until_emit = self.config.interval.sample(&mut self.rng);
                    break;
                }
                self.emit();
                emitted += 1;
                self.time_until_emit += self.config.interval.sample(&mut self.rng);
            }
        }

        self.pool.integrate(delta, self.config.gravity);
        self.needs_pack = true;
        Ok(emitted)
    }

    /// Pack live particles into the emitter's buffers using the bound image.
    /// Returns `None` when no image is bound.
    pub fn pack(&mut self) -> Option<&PackedBuffers> {
        let sprite = self.image?;
        pack::pack(&self.pool, &sprite, &mut self.buffers);
        self.needs_pack = false;
        Some(&self.buffers)
    }

    /// Buffers from the most recent [`pack`](ParticleEmitter::pack)
    pub fn packed(&self) -> &PackedBuffers {
        &self.buffers
    }

    pub fn layout(&self) -> BufferLayout {
        self.layout
    }

    /// Submit the packed buffers to `sink`.
    ///
    /// Call [`pack`](ParticleEmitter::pack) after `update()` and before this.
    /// Drawing buffers older than the pool is a [`EmberError::DrawError`].
    pub fn draw<S: DrawSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        let Some(image) = self.image else {
            return Ok(());
        };
        if self.needs_pack {
            return Err(EmberError::DrawError(
                "emitter changed since its buffers were last packed".to_string(),
            ));
        }
        if self.buffers.is_empty() {
            return Ok(());
        }
        sink.draw_quads(&DrawBatch {
            buffers: &self.buffers,
            layout: self.layout,
            texture_id: image.texture.id,
            shader: self.shader,
            quad_count: self.buffers.quad_count(),
        })
    }
}

// ── TOML helpers (handle integer/float coercion) ──

/// Emitter table keys other than the range attributes
const EMITTER_KEYS: [&str; 9] = [
    "name",
    "x",
    "y",
    "z",
    "gravity",
    "color",
    "max_particles",
    "seed",
    "sprite",
];

/// Keys of an emitter table that no setting reads, in table order
pub fn unknown_keys(table: &toml::value::Table) -> Vec<String> {
    table
        .keys()
        .filter(|key| {
            !EMITTER_KEYS.contains(&key.as_str())
                && !RangeAttribute::ALL.iter().any(|a| a.key() == key.as_str())
        })
        .cloned()
        .collect()
}

fn toml_f32(v: &toml::Value) -> Option<f32> {
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
}

fn opt_f32(table: &toml::value::Table, key: &str) -> Result<Option<f32>> {
    table
        .get(key)
        .map(|v| toml_f32(v).ok_or_else(|| field_type(key, "number")))
        .transpose()
}

fn toml_range(key: &str, v: &toml::Value) -> Result<(f32, f32)> {
    if let Some(value) = toml_f32(v) {
        return Ok((value, value));
    }
    match v.as_array().map(Vec::as_slice) {
        Some([min, max]) => match (toml_f32(min), toml_f32(max)) {
            (Some(min), Some(max)) => Ok((min, max)),
            _ => Err(field_type(key, "[min, max] of numbers")),
        },
        _ => Err(field_type(key, "number or [min, max]")),
    }
}

fn toml_color(v: &toml::Value) -> Result<Color> {
    let arr = v
        .as_array()
        .filter(|arr| arr.len() == 4)
        .ok_or_else(|| field_type("color", "[r, g, b, a]"))?;
    let mut channels = [0.0; 4];
    for (slot, value) in channels.iter_mut().zip(arr) {
        *slot = toml_f32(value).ok_or_else(|| field_type("color", "[r, g, b, a]"))?;
    }
    Ok(Color::from_array(channels))
}

fn toml_sprite(v: &toml::Value) -> Result<Sprite> {
    let table = v.as_table().ok_or_else(|| field_type("sprite", "table"))?;
    let dimension = |key: &str| -> Result<u32> {
        let n = table
            .get(key)
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| field_type(key, "integer"))?;
        u32::try_from(n).map_err(|_| field_type(key, "non-negative integer"))
    };
    let width = dimension("width")?;
    let height = dimension("height")?;
    let id = match table.get("texture_id") {
        Some(_) => dimension("texture_id")?,
        None => 0,
    };
    let full = TextureInfo::full(id);
    let texture = TextureInfo {
        id,
        left: opt_f32(table, "left")?.unwrap_or(full.left),
        right: opt_f32(table, "right")?.unwrap_or(full.right),
        top: opt_f32(table, "top")?.unwrap_or(full.top),
        bottom: opt_f32(table, "bottom")?.unwrap_or(full.bottom),
    };
    Ok(Sprite {
        texture,
        width,
        height,
    })
}

fn finite(field: &str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EmberError::NonFiniteValue {
            field: field.to_string(),
            value,
        })
    }
}

fn field_type(field: &str, expected: &str) -> EmberError {
    EmberError::InvalidFieldType {
        field: field.to_string(),
        expected: expected.to_string(),
    }
}
