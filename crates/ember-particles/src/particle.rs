//! Particle state and the fixed-capacity ring pool that owns it

use crate::integrate::integrate;
use ember_core::Color;
use serde::Serialize;

/// Per-particle simulation state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    /// Normalized sprite anchor the quad is built around (0.5 = middle)
    pub center_x: f32,
    pub center_y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    /// Radians per second
    pub angular_velocity: f32,
    pub color: Color,
    /// Alpha change per second
    pub fade: f32,
    pub scale: f32,
    /// Scale change per second
    pub zoom: f32,
    /// Fraction of velocity lost per second
    pub friction: f32,
    /// Radians
    pub angle: f32,
    /// Seconds remaining; the particle is dead once this reaches zero
    pub time_to_live: f32,
}

impl Particle {
    /// The contents of a slot that has never been written
    pub fn dead() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            center_x: 0.5,
            center_y: 0.5,
            velocity_x: 0.0,
            velocity_y: 0.0,
            angular_velocity: 0.0,
            color: Color::WHITE,
            fade: 0.0,
            scale: 1.0,
            zoom: 0.0,
            friction: 0.0,
            angle: 0.0,
            time_to_live: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.time_to_live > 0.0
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self::dead()
    }
}

/// Index of one slot in a [`ParticlePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(usize);

impl SlotIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

/// Fixed-capacity particle storage with oldest-first slot reuse.
///
/// Slots are never moved or compacted. A write cursor walks the array in a
/// ring, so each new particle lands in the least recently written slot:
/// either a dead one, or, once the pool is saturated, the oldest living one.
pub struct ParticlePool {
    particles: Vec<Particle>,
    alive_count: usize,
    cursor: usize,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: vec![Particle::dead(); capacity],
            alive_count: 0,
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Slot the next spawn will write to
    pub fn cursor(&self) -> Option<SlotIndex> {
        (self.capacity() > 0).then_some(SlotIndex(self.cursor))
    }

    /// Claim the slot under the cursor and advance the cursor.
    ///
    /// The slot is not initialized; callers normally go through [`spawn`],
    /// which writes the particle and keeps the live count in step.
    ///
    /// [`spawn`]: ParticlePool::spawn
    pub fn acquire_slot(&mut self) -> Option<SlotIndex> {
        if self.particles.is_empty() {
            return None;
        }
        let slot = SlotIndex(self.cursor);
        self.cursor = (self.cursor + 1) % self.particles.len();
        Some(slot)
    }

    /// Write `particle` into the oldest slot. Returns `None` for an empty pool.
    pub fn spawn(&mut self, particle: Particle) -> Option<SlotIndex> {
        let slot = self.acquire_slot()?;
        let target = &mut self.particles[slot.0];
        match (target.is_alive(), particle.is_alive()) {
            (false, true) => self.alive_count += 1,
            (true, false) => self.alive_count -= 1,
            (true, true) => log::trace!("recycling live particle in slot {}", slot.0),
            (false, false) => {}
        }
        *target = particle;
        Some(slot)
    }

    /// Kill the particle in `slot`. Killing a dead slot does nothing.
    pub fn mark_dead(&mut self, slot: SlotIndex) {
        let particle = &mut self.particles[slot.0];
        if particle.is_alive() {
            particle.time_to_live = 0.0;
            self.alive_count -= 1;
        }
    }

    pub fn get(&self, slot: SlotIndex) -> Option<&Particle> {
        self.particles.get(slot.0)
    }

    pub fn get_mut(&mut self, slot: SlotIndex) -> Option<&mut Particle> {
        self.particles.get_mut(slot.0)
    }

    /// Visit every live particle in slot order.
    pub fn for_each_live<F>(&self, mut f: F)
    where
        F: FnMut(SlotIndex, &Particle),
    {
        for (i, p) in self.particles.iter().enumerate() {
            if p.is_alive() {
                f(SlotIndex(i), p);
            }
        }
    }

    /// Visit every live particle in slot order, mutably.
    ///
    /// Changes to `time_to_live` made through this visitor bypass the live
    /// count; use [`integrate`](ParticlePool::integrate) or
    /// [`mark_dead`](ParticlePool::mark_dead) to kill particles.
    pub fn for_each_live_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(SlotIndex, &mut Particle),
    {
        for (i, p) in self.particles.iter_mut().enumerate() {
            if p.is_alive() {
                f(SlotIndex(i), p);
            }
        }
    }

    pub fn iter_live(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.particles.iter().filter(|p| p.is_alive())
    }

    /// Advance every live particle by `dt` and retire the ones that expire.
    /// Returns how many died this step.
    pub fn integrate(&mut self, dt: f32, gravity: f32) -> usize {
        let mut died = 0;
        for p in self.particles.iter_mut().filter(|p| p.is_alive()) {
            if !integrate(p, dt, gravity) {
                p.time_to_live = 0.0;
                died += 1;
            }
        }
        self.alive_count -= died;
        died
    }
}
