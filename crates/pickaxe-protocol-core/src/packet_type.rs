use crate::state::{Direction, State};
use std::collections::HashMap;
use std::fmt;

/// A packet's symbolic identity in one protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketType {
    pub state: State,
    pub direction: Direction,
    pub id: i32,
    pub name: &'static str,
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} (0x{:02x})", self.direction, self.state, self.name, self.id)
    }
}

/// One state/direction section of a version's packet list. Ids are
/// assigned by position.
pub struct PacketSection {
    pub state: State,
    pub direction: Direction,
    pub names: &'static [&'static str],
}

/// All packet types of one protocol version, indexed both ways.
pub struct PacketTable {
    pub version: &'static str,
    by_id: HashMap<(State, Direction, i32), PacketType>,
    by_name: HashMap<(State, Direction, &'static str), PacketType>,
}

impl PacketTable {
    pub fn new(version: &'static str, sections: &[PacketSection]) -> Self {
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        for section in sections {
            for (id, name) in section.names.iter().enumerate() {
                let ty = PacketType {
                    state: section.state,
                    direction: section.direction,
                    id: id as i32,
                    name,
                };
                by_id.insert((ty.state, ty.direction, ty.id), ty);
                by_name.insert((ty.state, ty.direction, ty.name), ty);
            }
        }
        Self {
            version,
            by_id,
            by_name,
        }
    }

    pub fn by_id(&self, state: State, direction: Direction, id: i32) -> Option<PacketType> {
        self.by_id.get(&(state, direction, id)).copied()
    }

    pub fn by_name(&self, state: State, direction: Direction, name: &str) -> Option<PacketType> {
        self.by_name.get(&(state, direction, name)).copied()
    }

    /// Look a name up, treating absence as a bug in a static table.
    pub fn require(&self, state: State, direction: Direction, name: &str) -> crate::ProtocolResult<PacketType> {
        self.by_name(state, direction, name).ok_or_else(|| {
            crate::ProtocolError::configuration(
                self.version,
                format!("no {} {} packet named {}", direction, state, name),
            )
        })
    }

    pub fn types(&self) -> impl Iterator<Item = &PacketType> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
