use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid mapping JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Mapping table '{table}' maps {old} to negative id {new}")]
    NegativeTarget { table: &'static str, old: usize, new: i32 },
}

/// A dense old-id -> new-id table. Index is the old id; `-1` marks an id
/// that no longer exists in the newer version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mappings {
    forward: Vec<i32>,
}

impl Mappings {
    pub const UNMAPPED: i32 = -1;

    pub fn new(forward: Vec<i32>) -> Self {
        Self { forward }
    }

    /// Build from explicit pairs; gaps become unmapped.
    pub fn from_pairs(pairs: &[(i32, i32)]) -> Self {
        let size = pairs.iter().map(|(old, _)| *old + 1).max().unwrap_or(0).max(0) as usize;
        let mut forward = vec![Self::UNMAPPED; size];
        for &(old, new) in pairs {
            if old >= 0 {
                forward[old as usize] = new;
            }
        }
        Self { forward }
    }

    pub fn identity(size: usize) -> Self {
        Self {
            forward: (0..size as i32).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn new_id(&self, old: i32) -> Option<i32> {
        if old < 0 {
            return None;
        }
        match self.forward.get(old as usize) {
            Some(&id) if id != Self::UNMAPPED => Some(id),
            _ => None,
        }
    }

    /// The reverse table, used for serverbound rewriting.
    pub fn inverse(&self) -> Mappings {
        let size = self.forward.iter().copied().max().map_or(0, |m| (m + 1).max(0) as usize);
        let mut backward = vec![Self::UNMAPPED; size];
        for (old, &new) in self.forward.iter().enumerate() {
            if new >= 0 && backward[new as usize] == Self::UNMAPPED {
                backward[new as usize] = old as i32;
            }
        }
        Mappings { forward: backward }
    }
}

/// A table used in both directions (items are sent by both sides).
#[derive(Debug, Clone, Default)]
pub struct BiMappings {
    forward: Mappings,
    backward: Mappings,
}

impl BiMappings {
    pub fn new(forward: Mappings) -> Self {
        let backward = forward.inverse();
        Self { forward, backward }
    }

    pub fn new_id(&self, old: i32) -> Option<i32> {
        self.forward.new_id(old)
    }

    pub fn old_id(&self, new: i32) -> Option<i32> {
        self.backward.new_id(new)
    }
}

#[derive(Debug, Default, Deserialize)]
struct MappingFile {
    #[serde(default)]
    blockstates: Option<Vec<i32>>,
    #[serde(default)]
    blocks: Option<Vec<i32>>,
    #[serde(default)]
    items: Option<Vec<i32>>,
    #[serde(default)]
    sounds: Option<Vec<i32>>,
    #[serde(default)]
    particles: Option<Vec<i32>>,
    #[serde(default)]
    statistics: Option<Vec<i32>>,
}

/// Id tables for one version pair. Absent tables mean ids are unchanged
/// between the two versions.
#[derive(Debug, Clone, Default)]
pub struct MappingData {
    pub block_states: Option<Mappings>,
    pub blocks: Option<Mappings>,
    pub items: Option<BiMappings>,
    pub sounds: Option<Mappings>,
    pub particles: Option<Mappings>,
    pub statistics: Option<Mappings>,
}

impl MappingData {
    /// Mapping data that leaves every id untouched.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, MappingError> {
        let file: MappingFile = serde_json::from_str(json)?;
        Ok(Self {
            block_states: table("blockstates", file.blockstates)?,
            blocks: table("blocks", file.blocks)?,
            items: table("items", file.items)?.map(BiMappings::new),
            sounds: table("sounds", file.sounds)?,
            particles: table("particles", file.particles)?,
            statistics: table("statistics", file.statistics)?,
        })
    }

    /// Unknown block states fall back to air (0), as the client would
    /// otherwise reject the chunk or entity outright.
    pub fn new_block_state_id(&self, old: i32) -> i32 {
        match &self.block_states {
            None => old,
            Some(table) => table.new_id(old).unwrap_or_else(|| {
                warn!("Missing block state mapping for {}", old);
                0
            }),
        }
    }

    /// Block (not block state) ids, as used by tags and statistics.
    pub fn new_block_id(&self, old: i32) -> Option<i32> {
        match &self.blocks {
            Some(table) => table.new_id(old),
            None => Some(old),
        }
    }

    pub fn new_item_id(&self, old: i32) -> i32 {
        match &self.items {
            None => old,
            Some(table) => table.new_id(old).unwrap_or_else(|| {
                warn!("Missing item mapping for {}", old);
                1
            }),
        }
    }

    pub fn old_item_id(&self, new: i32) -> i32 {
        match &self.items {
            None => new,
            Some(table) => table.old_id(new).unwrap_or(1),
        }
    }

    /// `None` means the sound does not exist for the newer client.
    pub fn new_sound_id(&self, old: i32) -> Option<i32> {
        match &self.sounds {
            None => Some(old),
            Some(table) => table.new_id(old),
        }
    }

    pub fn new_particle_id(&self, old: i32) -> i32 {
        match &self.particles {
            None => old,
            Some(table) => table.new_id(old).unwrap_or(old),
        }
    }

    /// `None` means the statistic was removed and the entry should be dropped.
    pub fn new_statistic_id(&self, old: i32) -> Option<i32> {
        match &self.statistics {
            None => Some(old),
            Some(table) => table.new_id(old),
        }
    }
}

fn table(name: &'static str, values: Option<Vec<i32>>) -> Result<Option<Mappings>, MappingError> {
    let Some(values) = values else {
        return Ok(None);
    };
    if let Some((old, &new)) = values
        .iter()
        .enumerate()
        .find(|(_, v)| **v < Mappings::UNMAPPED)
    {
        return Err(MappingError::NegativeTarget { table: name, old, new });
    }
    Ok(Some(Mappings::new(values)))
}
