use pickaxe_nbt::NbtValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A block position in the world (x, y, z integers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Encode as a 64-bit long (protocol format since 1.14).
    /// x: 26 bits, z: 26 bits, y: 12 bits
    pub fn encode(&self) -> u64 {
        ((self.x as u64 & 0x3FFFFFF) << 38)
            | ((self.z as u64 & 0x3FFFFFF) << 12)
            | (self.y as u64 & 0xFFF)
    }

    pub fn decode(val: u64) -> Self {
        let mut x = (val >> 38) as i32;
        let mut z = ((val >> 12) & 0x3FFFFFF) as i32;
        let mut y = (val & 0xFFF) as i32;
        if x >= 1 << 25 {
            x -= 1 << 26;
        }
        if z >= 1 << 25 {
            z -= 1 << 26;
        }
        if y >= 1 << 11 {
            y -= 1 << 12;
        }
        Self { x, y, z }
    }
}

/// A Minecraft resource identifier (e.g., "minecraft:stone").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub namespace: String,
    pub path: String,
}

impl Identifier {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
        }
    }

    pub fn minecraft(path: impl Into<String>) -> Self {
        Self::new("minecraft", path)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl std::str::FromStr for Identifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((ns, path)) = s.split_once(':') {
            Ok(Self::new(ns, path))
        } else {
            Ok(Self::minecraft(s))
        }
    }
}

/// A released protocol version: wire number plus the game version name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolVersion {
    pub number: i32,
    pub name: &'static str,
}

impl ProtocolVersion {
    pub const V1_16_1: ProtocolVersion = ProtocolVersion::new(736, "1.16.1");
    pub const V1_16_2: ProtocolVersion = ProtocolVersion::new(751, "1.16.2");
    pub const V1_20: ProtocolVersion = ProtocolVersion::new(763, "1.20");
    pub const V1_20_2: ProtocolVersion = ProtocolVersion::new(764, "1.20.2");

    pub const fn new(number: i32, name: &'static str) -> Self {
        Self { number, name }
    }

    pub fn known() -> &'static [ProtocolVersion] {
        &[Self::V1_16_1, Self::V1_16_2, Self::V1_20, Self::V1_20_2]
    }

    pub fn from_number(number: i32) -> Option<Self> {
        Self::known().iter().copied().find(|v| v.number == number)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.number)
    }
}

/// An item stack in the pre-1.20.5 slot format (id, count, optional NBT).
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub item_id: i32,
    pub count: i8,
    pub tag: Option<NbtValue>,
}

impl ItemStack {
    pub fn new(item_id: i32, count: i8) -> Self {
        Self {
            item_id,
            count,
            tag: None,
        }
    }
}

/// One extra argument carried by a particle, in wire order.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleData {
    BlockState(i32),
    Item(Option<ItemStack>),
    Float(f32),
    VarInt(i32),
}

/// A particle descriptor: particle type id plus its type-specific arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: i32,
    pub data: Vec<ParticleData>,
}

impl Particle {
    pub fn new(id: i32) -> Self {
        Self {
            id,
            data: Vec::new(),
        }
    }

    pub fn with(mut self, data: ParticleData) -> Self {
        self.data.push(data);
        self
    }
}
