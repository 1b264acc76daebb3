//! Ember Runtime - Frame loop infrastructure
//!
//! Provides the building blocks a host loop uses to drive particle systems:
//! - `GameClock`: frame clock stepped with explicit, clamped deltas
//! - `RuntimeSystem`: trait for systems ticked by the frame loop

mod clock;
mod system;

pub use clock::GameClock;
pub use system::RuntimeSystem;
