use crate::codec::*;
use crate::value::{read_particle, write_particle, NbtFormat, ParticleLayout};
use bytes::{Buf, BufMut, BytesMut};
use pickaxe_nbt::NbtValue;
use pickaxe_types::{BlockPos, ItemStack, Particle};
use uuid::Uuid;

/// End-of-list marker in the entity metadata wire format.
const END_OF_METADATA: u8 = 0xFF;

/// The declared value kind of a metadata entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKind {
    Byte,
    VarInt,
    Float,
    String,
    Component,
    OptComponent,
    Item,
    Boolean,
    Rotation,
    Position,
    OptPosition,
    Direction,
    OptUuid,
    /// Optional block state; 0 means absent.
    BlockState,
    Nbt,
    Particle,
    VillagerData,
    OptVarInt,
    Pose,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Byte(i8),
    VarInt(i32),
    Float(f32),
    String(String),
    Component(String),
    OptComponent(Option<String>),
    Item(Option<ItemStack>),
    Boolean(bool),
    Rotation(f32, f32, f32),
    Position(BlockPos),
    OptPosition(Option<BlockPos>),
    Direction(i32),
    OptUuid(Option<Uuid>),
    BlockState(i32),
    Nbt(Option<NbtValue>),
    Particle(Particle),
    VillagerData(i32, i32, i32),
    OptVarInt(i32),
    Pose(i32),
}

impl MetaValue {
    pub fn kind(&self) -> MetaKind {
        match self {
            MetaValue::Byte(_) => MetaKind::Byte,
            MetaValue::VarInt(_) => MetaKind::VarInt,
            MetaValue::Float(_) => MetaKind::Float,
            MetaValue::String(_) => MetaKind::String,
            MetaValue::Component(_) => MetaKind::Component,
            MetaValue::OptComponent(_) => MetaKind::OptComponent,
            MetaValue::Item(_) => MetaKind::Item,
            MetaValue::Boolean(_) => MetaKind::Boolean,
            MetaValue::Rotation(..) => MetaKind::Rotation,
            MetaValue::Position(_) => MetaKind::Position,
            MetaValue::OptPosition(_) => MetaKind::OptPosition,
            MetaValue::Direction(_) => MetaKind::Direction,
            MetaValue::OptUuid(_) => MetaKind::OptUuid,
            MetaValue::BlockState(_) => MetaKind::BlockState,
            MetaValue::Nbt(_) => MetaKind::Nbt,
            MetaValue::Particle(_) => MetaKind::Particle,
            MetaValue::VillagerData(..) => MetaKind::VillagerData,
            MetaValue::OptVarInt(_) => MetaKind::OptVarInt,
            MetaValue::Pose(_) => MetaKind::Pose,
        }
    }
}

/// One entity metadata entry: a slot index and its typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub index: u8,
    pub value: MetaValue,
}

impl Metadata {
    pub fn new(index: u8, value: MetaValue) -> Self {
        Self { index, value }
    }

    pub fn kind(&self) -> MetaKind {
        self.value.kind()
    }
}

/// A version's metadata type registry: the wire type id of a kind is its
/// position in `kinds`.
#[derive(Debug, PartialEq, Eq)]
pub struct MetaTypes {
    pub name: &'static str,
    pub kinds: &'static [MetaKind],
    pub particles: &'static ParticleLayout,
    pub nbt: NbtFormat,
}

impl MetaTypes {
    pub fn kind(&self, type_id: i32) -> Option<MetaKind> {
        usize::try_from(type_id)
            .ok()
            .and_then(|i| self.kinds.get(i))
            .copied()
    }

    pub fn type_id(&self, kind: MetaKind) -> Option<i32> {
        self.kinds.iter().position(|k| *k == kind).map(|i| i as i32)
    }
}

/// A full metadata list as carried by a packet, tagged with the type
/// registry it is encoded against.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataList {
    pub types: &'static MetaTypes,
    pub entries: Vec<Metadata>,
}

impl MetadataList {
    pub fn new(types: &'static MetaTypes, entries: Vec<Metadata>) -> Self {
        Self { types, entries }
    }

    pub fn get(&self, index: u8) -> Option<&Metadata> {
        self.entries.iter().find(|m| m.index == index)
    }
}

pub fn read_metadata(buf: &mut BytesMut, types: &'static MetaTypes) -> CodecResult<MetadataList> {
    let mut entries = Vec::new();
    loop {
        ensure(buf, 1)?;
        let index = buf.get_u8();
        if index == END_OF_METADATA {
            break;
        }
        let type_id = read_varint(buf)?;
        let kind = types
            .kind(type_id)
            .ok_or(CodecError::UnknownMetaType(type_id))?;
        let value = read_meta_value(buf, kind, types)?;
        entries.push(Metadata { index, value });
    }
    Ok(MetadataList { types, entries })
}

pub fn write_metadata(buf: &mut BytesMut, list: &MetadataList) -> CodecResult<()> {
    for entry in &list.entries {
        let kind = entry.kind();
        let type_id = list
            .types
            .type_id(kind)
            .ok_or(CodecError::UnmappedMetaKind(kind_name(kind), list.types.name))?;
        buf.put_u8(entry.index);
        write_varint(buf, type_id);
        write_meta_value(buf, &entry.value, list.types);
    }
    buf.put_u8(END_OF_METADATA);
    Ok(())
}

fn read_f32(buf: &mut BytesMut) -> CodecResult<f32> {
    ensure(buf, 4)?;
    Ok(buf.get_f32())
}

fn read_meta_value(buf: &mut BytesMut, kind: MetaKind, types: &MetaTypes) -> CodecResult<MetaValue> {
    let named = types.nbt == NbtFormat::Named;
    let value = match kind {
        MetaKind::Byte => {
            ensure(buf, 1)?;
            MetaValue::Byte(buf.get_i8())
        }
        MetaKind::VarInt => MetaValue::VarInt(read_varint(buf)?),
        MetaKind::Float => MetaValue::Float(read_f32(buf)?),
        MetaKind::String => MetaValue::String(read_string(buf, 32767)?),
        MetaKind::Component => MetaValue::Component(read_string(buf, 262144)?),
        MetaKind::OptComponent => {
            let text = if read_bool(buf)? {
                Some(read_string(buf, 262144)?)
            } else {
                None
            };
            MetaValue::OptComponent(text)
        }
        MetaKind::Item => MetaValue::Item(read_slot(buf, named)?),
        MetaKind::Boolean => MetaValue::Boolean(read_bool(buf)?),
        MetaKind::Rotation => {
            MetaValue::Rotation(read_f32(buf)?, read_f32(buf)?, read_f32(buf)?)
        }
        MetaKind::Position => MetaValue::Position(read_position(buf)?),
        MetaKind::OptPosition => {
            let pos = if read_bool(buf)? {
                Some(read_position(buf)?)
            } else {
                None
            };
            MetaValue::OptPosition(pos)
        }
        MetaKind::Direction => MetaValue::Direction(read_varint(buf)?),
        MetaKind::OptUuid => {
            let uuid = if read_bool(buf)? {
                Some(read_uuid(buf)?)
            } else {
                None
            };
            MetaValue::OptUuid(uuid)
        }
        MetaKind::BlockState => MetaValue::BlockState(read_varint(buf)?),
        MetaKind::Nbt => {
            let tag = if named {
                NbtValue::read_root_named(buf)?
            } else {
                NbtValue::read_root_network(buf)?
            };
            MetaValue::Nbt(tag)
        }
        MetaKind::Particle => MetaValue::Particle(read_particle(buf, types.particles, types.nbt)?),
        MetaKind::VillagerData => {
            MetaValue::VillagerData(read_varint(buf)?, read_varint(buf)?, read_varint(buf)?)
        }
        MetaKind::OptVarInt => MetaValue::OptVarInt(read_varint(buf)?),
        MetaKind::Pose => MetaValue::Pose(read_varint(buf)?),
    };
    Ok(value)
}

fn write_meta_value(buf: &mut BytesMut, value: &MetaValue, types: &MetaTypes) {
    let named = types.nbt == NbtFormat::Named;
    match value {
        MetaValue::Byte(v) => buf.put_i8(*v),
        MetaValue::VarInt(v)
        | MetaValue::Direction(v)
        | MetaValue::BlockState(v)
        | MetaValue::OptVarInt(v)
        | MetaValue::Pose(v) => write_varint(buf, *v),
        MetaValue::Float(v) => buf.put_f32(*v),
        MetaValue::String(v) | MetaValue::Component(v) => write_string(buf, v),
        MetaValue::OptComponent(v) => match v {
            Some(text) => {
                buf.put_u8(1);
                write_string(buf, text);
            }
            None => buf.put_u8(0),
        },
        MetaValue::Item(item) => write_slot(buf, item, named),
        MetaValue::Boolean(v) => buf.put_u8(*v as u8),
        MetaValue::Rotation(x, y, z) => {
            buf.put_f32(*x);
            buf.put_f32(*y);
            buf.put_f32(*z);
        }
        MetaValue::Position(pos) => write_position(buf, pos),
        MetaValue::OptPosition(pos) => match pos {
            Some(pos) => {
                buf.put_u8(1);
                write_position(buf, pos);
            }
            None => buf.put_u8(0),
        },
        MetaValue::OptUuid(uuid) => match uuid {
            Some(uuid) => {
                buf.put_u8(1);
                write_uuid(buf, uuid);
            }
            None => buf.put_u8(0),
        },
        MetaValue::Nbt(tag) => pickaxe_nbt::write_optional_root(tag.as_ref(), named, buf),
        MetaValue::Particle(particle) => write_particle(buf, particle, types.nbt),
        MetaValue::VillagerData(a, b, c) => {
            write_varint(buf, *a);
            write_varint(buf, *b);
            write_varint(buf, *c);
        }
    }
}

fn kind_name(kind: MetaKind) -> &'static str {
    match kind {
        MetaKind::Byte => "byte",
        MetaKind::VarInt => "varint",
        MetaKind::Float => "float",
        MetaKind::String => "string",
        MetaKind::Component => "component",
        MetaKind::OptComponent => "optional component",
        MetaKind::Item => "item",
        MetaKind::Boolean => "boolean",
        MetaKind::Rotation => "rotation",
        MetaKind::Position => "position",
        MetaKind::OptPosition => "optional position",
        MetaKind::Direction => "direction",
        MetaKind::OptUuid => "optional uuid",
        MetaKind::BlockState => "block state",
        MetaKind::Nbt => "nbt",
        MetaKind::Particle => "particle",
        MetaKind::VillagerData => "villager data",
        MetaKind::OptVarInt => "optional varint",
        MetaKind::Pose => "pose",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ParticleArg;

    static PARTICLES: ParticleLayout = ParticleLayout {
        entries: &[(3, &[ParticleArg::BlockState])],
    };

    static TYPES: MetaTypes = MetaTypes {
        name: "test",
        kinds: &[MetaKind::Byte, MetaKind::VarInt, MetaKind::Item, MetaKind::Particle, MetaKind::BlockState],
        particles: &PARTICLES,
        nbt: NbtFormat::Named,
    };

    #[test]
    fn test_metadata_list_reads_until_terminator() {
        let list = MetadataList::new(
            &TYPES,
            vec![
                Metadata::new(0, MetaValue::Byte(3)),
                Metadata::new(7, MetaValue::Particle(Particle::new(3).with(pickaxe_types::ParticleData::BlockState(9)))),
                Metadata::new(10, MetaValue::BlockState(17)),
            ],
        );
        let mut buf = BytesMut::new();
        write_metadata(&mut buf, &list).unwrap();
        buf.put_u8(0x42);

        let read = read_metadata(&mut buf, &TYPES).unwrap();
        assert_eq!(read, list);
        assert_eq!(buf.to_vec(), vec![0x42]);
    }

    #[test]
    fn test_unknown_type_id_is_an_error() {
        let mut buf = BytesMut::from(&[0x00, 0x20][..]);
        assert!(matches!(
            read_metadata(&mut buf, &TYPES),
            Err(CodecError::UnknownMetaType(0x20))
        ));
    }

    #[test]
    fn test_kind_missing_from_target_registry() {
        let list = MetadataList::new(&TYPES, vec![Metadata::new(1, MetaValue::Pose(0))]);
        let mut buf = BytesMut::new();
        assert!(matches!(
            write_metadata(&mut buf, &list),
            Err(CodecError::UnmappedMetaKind("pose", "test"))
        ));
    }
}
