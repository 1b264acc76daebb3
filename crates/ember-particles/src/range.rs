//! Closed sampling intervals for randomized particle attributes

use ember_core::{EmberError, Result};
use rand::Rng;
use serde::Serialize;

/// A closed interval `[min, max]` sampled uniformly at emission time.
///
/// Ranges are validated when built: `NaN` and negative infinity are rejected
/// everywhere, `min` may not exceed `max`, and positive infinity is only
/// accepted when the range is pinned (`min == max`). A pinned infinite range
/// is how "never" and "immortal" are spelled for the emission interval and
/// time-to-live.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    min: f32,
    max: f32,
}

impl Range {
    /// Build a validated range. `attribute` names the value in error messages.
    pub fn new(attribute: &str, min: f32, max: f32) -> Result<Self> {
        check_bound(attribute, min)?;
        check_bound(attribute, max)?;
        if min > max {
            return Err(EmberError::InvalidRange {
                attribute: attribute.to_string(),
                min,
                max,
            });
        }
        if min.is_infinite() != max.is_infinite() {
            return Err(EmberError::NonFiniteValue {
                field: attribute.to_string(),
                value: f32::INFINITY,
            });
        }
        Ok(Self { min, max })
    }

    /// A pinned range that always samples `value`.
    pub fn fixed(attribute: &str, value: f32) -> Result<Self> {
        Self::new(attribute, value, value)
    }

    pub(crate) const fn pinned(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn is_pinned(&self) -> bool {
        self.min == self.max
    }

    /// Draw a uniform value in `[min, max]`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        if self.is_pinned() {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        }
    }
}

fn check_bound(attribute: &str, value: f32) -> Result<()> {
    if value.is_nan() || value == f32::NEG_INFINITY {
        return Err(EmberError::NonFiniteValue {
            field: attribute.to_string(),
            value,
        });
    }
    Ok(())
}
