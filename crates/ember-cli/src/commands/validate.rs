//! Emitter file validation command

use super::load_emitters;
use anyhow::Result;
use ember_particles::{EmitterSet, RangeAttribute};

pub fn run(file: &str) -> Result<()> {
    let set = load_emitters(file)?;

    if set.emitter_count() == 0 {
        println!("No [[emitter]] tables found in {file}");
        return Ok(());
    }

    println!("{file}: {} emitter(s) OK", set.emitter_count());
    for line in describe(&set) {
        println!("  {line}");
    }
    Ok(())
}

/// One summary line per emitter, plus warnings for settings that never show anything
/// and for keys that were ignored
fn describe(set: &EmitterSet) -> Vec<String> {
    let mut lines = Vec::new();
    for (id, emitter) in set.iter() {
        let config = emitter.config();
        let interval = config.range(RangeAttribute::Interval);
        let ttl = config.range(RangeAttribute::TimeToLive);
        lines.push(format!(
            "[{}] {}: capacity {}, interval {}..{}s, time_to_live {}..{}s",
            id,
            set.name(id).unwrap_or_default(),
            emitter.max_particles(),
            interval.min(),
            interval.max(),
            ttl.min(),
            ttl.max(),
        ));
        if emitter.max_particles() == 0 {
            lines.push("    warning: max_particles is 0, nothing will be emitted".to_string());
        }
        if interval.min().is_infinite() {
            lines.push("    warning: no interval set, particles only appear on explicit emit".to_string());
        }
        if emitter.image().is_none() {
            lines.push("    warning: no sprite bound, particles will not be drawn".to_string());
        }
        for key in set.unknown_keys(id) {
            lines.push(format!("    warning: unknown key '{key}' is ignored"));
        }
    }
    lines
}
