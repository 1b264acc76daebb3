//! CLI command implementations

pub mod simulate;
pub mod validate;

use anyhow::{Context, Result};
use ember_particles::EmitterSet;

/// Read and parse an emitter file
pub(crate) fn load_emitters(path: &str) -> Result<EmitterSet> {
    let source =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let set = EmitterSet::from_toml_str(&source)
        .with_context(|| format!("Failed to load emitters from {path}"))?;
    log::debug!("loaded {} emitter(s) from {path}", set.emitter_count());
    Ok(set)
}
