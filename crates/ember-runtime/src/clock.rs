//! Frame clock for hosts that step emitters with explicit deltas

/// Longest frame the clock reports; slower frames are clamped to this
const MAX_FRAME_TIME: f64 = 0.25;

/// Tracks frame time for a loop stepped with synthetic deltas.
///
/// Headless hosts call [`GameClock::advance`] once per frame, which makes
/// runs reproducible. The clamped `delta_time` is what systems are updated
/// with.
#[derive(Debug, Clone, Default)]
pub struct GameClock {
    /// Total elapsed time in seconds
    pub total_time: f64,
    /// Time since last frame in seconds
    pub delta_time: f64,
    /// Number of frames advanced so far
    pub frame_count: u64,
}

impl GameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by one frame of `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        // Clamp to avoid spiral of death
        self.delta_time = dt.clamp(0.0, MAX_FRAME_TIME);
        self.total_time += self.delta_time;
        self.frame_count += 1;
    }
}
