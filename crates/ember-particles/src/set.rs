//! A collection of emitters stepped, packed and drawn together

use crate::emitter::{unknown_keys, ParticleEmitter};
use crate::pack::DrawSink;
use ember_core::{EmberError, EmitterId, Result};
use std::collections::BTreeMap;

/// Emitters keyed by ID, iterated in creation order
#[derive(Default)]
pub struct EmitterSet {
    emitters: BTreeMap<EmitterId, ParticleEmitter>,
    names: BTreeMap<EmitterId, String>,
    /// Table keys no setting read, for emitters loaded from TOML
    unknown_keys: BTreeMap<EmitterId, Vec<String>>,
}

impl EmitterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `[[emitter]]` table from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let doc: toml::value::Table = toml::from_str(source)?;
        let mut set = Self::new();
        let Some(entries) = doc.get("emitter") else {
            return Ok(set);
        };
        let entries = entries.as_array().ok_or_else(|| EmberError::InvalidFieldType {
            field: "emitter".to_string(),
            expected: "array of tables".to_string(),
        })?;

        for (index, entry) in entries.iter().enumerate() {
            let table = entry.as_table().ok_or_else(|| EmberError::InvalidFieldType {
                field: format!("emitter[{index}]"),
                expected: "table".to_string(),
            })?;
            let emitter = ParticleEmitter::from_toml(table)
                .map_err(|e| EmberError::ParseError(format!("emitter[{index}]: {e}")))?;
            let name = table
                .get("name")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("emitter{index}"));
            let id = set.insert_named(name, emitter);
            let unknown = unknown_keys(table);
            if !unknown.is_empty() {
                set.unknown_keys.insert(id, unknown);
            }
        }
        Ok(set)
    }

    pub fn insert(&mut self, emitter: ParticleEmitter) -> EmitterId {
        let id = EmitterId::new();
        self.emitters.insert(id, emitter);
        id
    }

    pub fn insert_named(&mut self, name: impl Into<String>, emitter: ParticleEmitter) -> EmitterId {
        let id = self.insert(emitter);
        self.names.insert(id, name.into());
        id
    }

    pub fn remove(&mut self, id: EmitterId) -> Option<ParticleEmitter> {
        self.names.remove(&id);
        self.unknown_keys.remove(&id);
        self.emitters.remove(&id)
    }

    pub fn get(&self, id: EmitterId) -> Option<&ParticleEmitter> {
        self.emitters.get(&id)
    }

    pub fn get_mut(&mut self, id: EmitterId) -> Option<&mut ParticleEmitter> {
        self.emitters.get_mut(&id)
    }

    pub fn name(&self, id: EmitterId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Keys of the emitter's TOML table that were ignored when loading it
    pub fn unknown_keys(&self, id: EmitterId) -> &[String] {
        self.unknown_keys.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Find an emitter by the name it was inserted with
    pub fn find(&self, name: &str) -> Option<EmitterId> {
        self.names
            .iter()
            .find_map(|(id, n)| (n == name).then_some(*id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmitterId, &ParticleEmitter)> + '_ {
        self.emitters.iter().map(|(id, e)| (*id, e))
    }

    pub fn clear(&mut self) {
        self.emitters.clear();
        self.names.clear();
        self.unknown_keys.clear();
    }

    /// Reseed every emitter. The emitter at position `i` in creation order
    /// gets `seed + i`, so each keeps its own stream.
    pub fn reseed(&mut self, seed: u64) {
        for (index, emitter) in self.emitters.values_mut().enumerate() {
            emitter.reseed(seed.wrapping_add(index as u64));
        }
    }

    /// Step every emitter. Returns the total number of particles emitted.
    pub fn update(&mut self, dt: f32) -> Result<usize> {
        let mut emitted = 0;
        for emitter in self.emitters.values_mut() {
            emitted += emitter.update(dt)?;
        }
        Ok(emitted)
    }

    /// Pack every emitter that has an image bound.
    /// Call this after `update()`.
    pub fn pack_all(&mut self) {
        for emitter in self.emitters.values_mut() {
            emitter.pack();
        }
    }

    /// Submit every emitter's packed buffers, one batch per emitter.
    /// Call this after `pack_all()`.
    pub fn draw_all<S: DrawSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        for emitter in self.emitters.values() {
            emitter.draw(sink)?;
        }
        Ok(())
    }

    /// Number of tracked emitters
    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// Total alive particles across all emitters
    pub fn total_alive(&self) -> usize {
        self.emitters.values().map(ParticleEmitter::count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::EmitterConfig;
    use crate::pack::DrawBatch;

    const TWO_EMITTERS: &str = r#"
[[emitter]]
name = "sparks"
seed = 1
max_particles = 50
interval = 0.01
time_to_live = 0.5
sprite = { width = 4, height = 4 }

[[emitter]]
seed = 2
max_particles = 10
interval = [0.05, 0.1]
"#;

    struct CountingSink {
        batches: usize,
        quads: usize,
    }

    impl DrawSink for CountingSink {
        fn draw_quads(&mut self, batch: &DrawBatch<'_>) -> Result<()> {
            self.batches += 1;
            self.quads += batch.quad_count;
            Ok(())
        }
    }

    #[test]
    fn loads_emitters_in_order() {
        let set = EmitterSet::from_toml_str(TWO_EMITTERS).unwrap();
        assert_eq!(set.emitter_count(), 2);
        let names: Vec<_> = set.iter().map(|(id, _)| set.name(id).unwrap()).collect();
        assert_eq!(names, vec!["sparks", "emitter1"]);
        let sparks = set.find("sparks").unwrap();
        assert_eq!(set.get(sparks).unwrap().max_particles(), 50);
    }

    #[test]
    fn empty_document_has_no_emitters() {
        let set = EmitterSet::from_toml_str("").unwrap();
        assert_eq!(set.emitter_count(), 0);
    }

    #[test]
    fn bad_entry_reports_its_index() {
        let err = EmitterSet::from_toml_str("[[emitter]]\nspeed = [2, 1]\n")
            .err()
            .unwrap();
        assert!(err.to_string().contains("emitter[0]"), "{err}");
    }

    #[test]
    fn update_pack_draw_cycle() {
        let mut set = EmitterSet::from_toml_str(TWO_EMITTERS).unwrap();
        let mut sink = CountingSink { batches: 0, quads: 0 };

        let emitted = set.update(0.1).unwrap();
        assert!(emitted >= 10);
        set.pack_all();
        set.draw_all(&mut sink).unwrap();

        // Only the emitter with a sprite is drawn
        let sparks = set.find("sparks").unwrap();
        assert_eq!(sink.batches, 1);
        assert_eq!(sink.quads, set.get(sparks).unwrap().count());
        assert_eq!(set.total_alive(), set.iter().map(|(_, e)| e.count()).sum());
    }

    #[test]
    fn unknown_keys_are_kept_per_emitter() {
        let set = EmitterSet::from_toml_str(
            "[[emitter]]\nname = \"a\"\nintervl = 0.01\n\n[[emitter]]\nname = \"b\"\ninterval = 0.01\n",
        )
        .unwrap();
        let a = set.find("a").unwrap();
        let b = set.find("b").unwrap();
        assert_eq!(set.unknown_keys(a), ["intervl".to_string()]);
        assert!(set.unknown_keys(b).is_empty());
    }

    #[test]
    fn reseed_makes_loads_repeatable() {
        // No `seed` keys, so each load starts from OS entropy
        let source = r#"
[[emitter]]
max_particles = 40
interval = [0.01, 0.03]
speed = [1, 5]
offset = [0, 2]

[[emitter]]
max_particles = 10
interval = [0.05, 0.1]
angular_velocity = [-3, 3]
"#;
        let snapshot = |set: &EmitterSet| -> Vec<(f32, f32, f32)> {
            set.iter()
                .flat_map(|(_, e)| e.pool().iter_live().map(|p| (p.x, p.velocity_y, p.angle)))
                .collect()
        };

        let mut first = EmitterSet::from_toml_str(source).unwrap();
        let mut second = EmitterSet::from_toml_str(source).unwrap();
        first.reseed(1234);
        second.reseed(1234);
        for _ in 0..5 {
            first.update(0.1).unwrap();
            second.update(0.1).unwrap();
        }
        assert!(first.total_alive() > 0);
        assert_eq!(snapshot(&first), snapshot(&second));
    }

    #[test]
    fn insert_and_remove() {
        let mut set = EmitterSet::new();
        let id = set.insert(ParticleEmitter::with_seed(EmitterConfig::default(), 4, 3));
        set.get_mut(id).unwrap().emit();
        assert_eq!(set.total_alive(), 1);
        assert!(set.remove(id).is_some());
        assert!(set.get(id).is_none());
        assert_eq!(set.total_alive(), 0);
    }
}
