use crate::codec::*;
use crate::metadata::{read_metadata, write_metadata, MetaTypes, MetadataList};
use bytes::{Buf, BufMut, BytesMut};
use pickaxe_nbt::NbtValue;
use pickaxe_types::{BlockPos, ItemStack, Particle, ParticleData};
use uuid::Uuid;

const MAX_STRING: usize = 32767;

/// How a root NBT tag is framed on the wire. 1.20.2 dropped the root name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NbtFormat {
    Named,
    Nameless,
}

impl NbtFormat {
    fn is_named(self) -> bool {
        self == NbtFormat::Named
    }
}

/// One argument a particle type carries after its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleArg {
    BlockState,
    Item,
    Float,
    VarInt,
}

/// Per-version table of particle ids that carry extra arguments.
/// Ids not listed carry none.
#[derive(Debug, PartialEq, Eq)]
pub struct ParticleLayout {
    pub entries: &'static [(i32, &'static [ParticleArg])],
}

impl ParticleLayout {
    pub fn args(&self, particle_id: i32) -> &'static [ParticleArg] {
        self.entries
            .iter()
            .find(|(id, _)| *id == particle_id)
            .map(|(_, args)| *args)
            .unwrap_or(&[])
    }
}

/// The declared wire type of a field, used to decode it lazily.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    Long,
    Float,
    Double,
    VarInt,
    VarLong,
    String,
    Uuid,
    OptionalUuid,
    Position,
    ByteArray,
    RemainingBytes,
    Nbt(NbtFormat),
    Item(NbtFormat),
    Particle(&'static ParticleLayout, NbtFormat),
    Metadata(&'static MetaTypes),
    VarIntArray,
    StringArray,
}

/// A decoded field value. Every variant knows how to encode itself.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Byte(i8),
    UnsignedByte(u8),
    Short(i16),
    UnsignedShort(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    VarInt(i32),
    VarLong(i64),
    String(String),
    Uuid(Uuid),
    OptionalUuid(Option<Uuid>),
    Position(BlockPos),
    ByteArray(Vec<u8>),
    RemainingBytes(Vec<u8>),
    Nbt(NbtFormat, Option<NbtValue>),
    Item(NbtFormat, Option<ItemStack>),
    Particle(NbtFormat, Particle),
    Metadata(MetadataList),
    VarIntArray(Vec<i32>),
    StringArray(Vec<String>),
}

impl FieldValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Byte(_) => "byte",
            FieldValue::UnsignedByte(_) => "unsigned byte",
            FieldValue::Short(_) => "short",
            FieldValue::UnsignedShort(_) => "unsigned short",
            FieldValue::Int(_) => "int",
            FieldValue::Long(_) => "long",
            FieldValue::Float(_) => "float",
            FieldValue::Double(_) => "double",
            FieldValue::VarInt(_) => "varint",
            FieldValue::VarLong(_) => "varlong",
            FieldValue::String(_) => "string",
            FieldValue::Uuid(_) => "uuid",
            FieldValue::OptionalUuid(_) => "optional uuid",
            FieldValue::Position(_) => "position",
            FieldValue::ByteArray(_) => "byte array",
            FieldValue::RemainingBytes(_) => "remaining bytes",
            FieldValue::Nbt(..) => "nbt",
            FieldValue::Item(..) => "item",
            FieldValue::Particle(..) => "particle",
            FieldValue::Metadata(_) => "metadata",
            FieldValue::VarIntArray(_) => "varint array",
            FieldValue::StringArray(_) => "string array",
        }
    }

    /// Whether an already-materialized value can stand in for a read of `kind`.
    pub fn matches(&self, kind: FieldKind) -> bool {
        match (self, kind) {
            (FieldValue::Bool(_), FieldKind::Bool)
            | (FieldValue::Byte(_), FieldKind::Byte)
            | (FieldValue::UnsignedByte(_), FieldKind::UnsignedByte)
            | (FieldValue::Short(_), FieldKind::Short)
            | (FieldValue::UnsignedShort(_), FieldKind::UnsignedShort)
            | (FieldValue::Int(_), FieldKind::Int)
            | (FieldValue::Long(_), FieldKind::Long)
            | (FieldValue::Float(_), FieldKind::Float)
            | (FieldValue::Double(_), FieldKind::Double)
            | (FieldValue::VarInt(_), FieldKind::VarInt)
            | (FieldValue::VarLong(_), FieldKind::VarLong)
            | (FieldValue::String(_), FieldKind::String)
            | (FieldValue::Uuid(_), FieldKind::Uuid)
            | (FieldValue::OptionalUuid(_), FieldKind::OptionalUuid)
            | (FieldValue::Position(_), FieldKind::Position)
            | (FieldValue::ByteArray(_), FieldKind::ByteArray)
            | (FieldValue::RemainingBytes(_), FieldKind::RemainingBytes)
            | (FieldValue::VarIntArray(_), FieldKind::VarIntArray)
            | (FieldValue::StringArray(_), FieldKind::StringArray) => true,
            (FieldValue::Nbt(a, _), FieldKind::Nbt(b))
            | (FieldValue::Item(a, _), FieldKind::Item(b))
            | (FieldValue::Particle(a, _), FieldKind::Particle(_, b)) => *a == b,
            (FieldValue::Metadata(list), FieldKind::Metadata(types)) => std::ptr::eq(list.types, types),
            _ => false,
        }
    }
}

/// Decode one field of the given kind from the front of `buf`.
pub fn read_field(buf: &mut BytesMut, kind: FieldKind) -> CodecResult<FieldValue> {
    let value = match kind {
        FieldKind::Bool => FieldValue::Bool(read_bool(buf)?),
        FieldKind::Byte => {
            ensure(buf, 1)?;
            FieldValue::Byte(buf.get_i8())
        }
        FieldKind::UnsignedByte => {
            ensure(buf, 1)?;
            FieldValue::UnsignedByte(buf.get_u8())
        }
        FieldKind::Short => {
            ensure(buf, 2)?;
            FieldValue::Short(buf.get_i16())
        }
        FieldKind::UnsignedShort => {
            ensure(buf, 2)?;
            FieldValue::UnsignedShort(buf.get_u16())
        }
        FieldKind::Int => {
            ensure(buf, 4)?;
            FieldValue::Int(buf.get_i32())
        }
        FieldKind::Long => {
            ensure(buf, 8)?;
            FieldValue::Long(buf.get_i64())
        }
        FieldKind::Float => {
            ensure(buf, 4)?;
            FieldValue::Float(buf.get_f32())
        }
        FieldKind::Double => {
            ensure(buf, 8)?;
            FieldValue::Double(buf.get_f64())
        }
        FieldKind::VarInt => FieldValue::VarInt(read_varint(buf)?),
        FieldKind::VarLong => FieldValue::VarLong(read_varlong(buf)?),
        FieldKind::String => FieldValue::String(read_string(buf, MAX_STRING)?),
        FieldKind::Uuid => FieldValue::Uuid(read_uuid(buf)?),
        FieldKind::OptionalUuid => {
            let uuid = if read_bool(buf)? {
                Some(read_uuid(buf)?)
            } else {
                None
            };
            FieldValue::OptionalUuid(uuid)
        }
        FieldKind::Position => FieldValue::Position(read_position(buf)?),
        FieldKind::ByteArray => FieldValue::ByteArray(read_byte_array(buf)?),
        FieldKind::RemainingBytes => {
            let rest = buf.split();
            FieldValue::RemainingBytes(rest.to_vec())
        }
        FieldKind::Nbt(format) => {
            let tag = match format {
                NbtFormat::Named => NbtValue::read_root_named(buf)?,
                NbtFormat::Nameless => NbtValue::read_root_network(buf)?,
            };
            FieldValue::Nbt(format, tag)
        }
        FieldKind::Item(format) => FieldValue::Item(format, read_slot(buf, format.is_named())?),
        FieldKind::Particle(layout, format) => {
            FieldValue::Particle(format, read_particle(buf, layout, format)?)
        }
        FieldKind::Metadata(types) => FieldValue::Metadata(read_metadata(buf, types)?),
        FieldKind::VarIntArray => {
            let len = read_length(buf)?;
            let mut values = Vec::with_capacity(len.min(4096));
            for _ in 0..len {
                values.push(read_varint(buf)?);
            }
            FieldValue::VarIntArray(values)
        }
        FieldKind::StringArray => {
            let len = read_length(buf)?;
            let mut values = Vec::with_capacity(len.min(4096));
            for _ in 0..len {
                values.push(read_string(buf, MAX_STRING)?);
            }
            FieldValue::StringArray(values)
        }
    };
    Ok(value)
}

/// Encode one field onto the end of `buf`.
pub fn write_field(buf: &mut BytesMut, value: &FieldValue) -> CodecResult<()> {
    match value {
        FieldValue::Bool(v) => buf.put_u8(*v as u8),
        FieldValue::Byte(v) => buf.put_i8(*v),
        FieldValue::UnsignedByte(v) => buf.put_u8(*v),
        FieldValue::Short(v) => buf.put_i16(*v),
        FieldValue::UnsignedShort(v) => buf.put_u16(*v),
        FieldValue::Int(v) => buf.put_i32(*v),
        FieldValue::Long(v) => buf.put_i64(*v),
        FieldValue::Float(v) => buf.put_f32(*v),
        FieldValue::Double(v) => buf.put_f64(*v),
        FieldValue::VarInt(v) => write_varint(buf, *v),
        FieldValue::VarLong(v) => write_varlong(buf, *v),
        FieldValue::String(v) => write_string(buf, v),
        FieldValue::Uuid(v) => write_uuid(buf, v),
        FieldValue::OptionalUuid(v) => match v {
            Some(uuid) => {
                buf.put_u8(1);
                write_uuid(buf, uuid);
            }
            None => buf.put_u8(0),
        },
        FieldValue::Position(v) => write_position(buf, v),
        FieldValue::ByteArray(v) => write_byte_array(buf, v),
        FieldValue::RemainingBytes(v) => buf.put_slice(v),
        FieldValue::Nbt(format, tag) => {
            pickaxe_nbt::write_optional_root(tag.as_ref(), format.is_named(), buf)
        }
        FieldValue::Item(format, item) => write_slot(buf, item, format.is_named()),
        FieldValue::Particle(format, particle) => write_particle(buf, particle, *format),
        FieldValue::Metadata(list) => write_metadata(buf, list)?,
        FieldValue::VarIntArray(values) => {
            write_varint(buf, values.len() as i32);
            for v in values {
                write_varint(buf, *v);
            }
        }
        FieldValue::StringArray(values) => {
            write_varint(buf, values.len() as i32);
            for v in values {
                write_string(buf, v);
            }
        }
    }
    Ok(())
}

pub fn read_particle(
    buf: &mut BytesMut,
    layout: &ParticleLayout,
    format: NbtFormat,
) -> CodecResult<Particle> {
    let mut particle = Particle::new(read_varint(buf)?);
    for arg in layout.args(particle.id) {
        let data = match arg {
            ParticleArg::BlockState => ParticleData::BlockState(read_varint(buf)?),
            ParticleArg::Item => ParticleData::Item(read_slot(buf, format.is_named())?),
            ParticleArg::Float => {
                ensure(buf, 4)?;
                ParticleData::Float(buf.get_f32())
            }
            ParticleArg::VarInt => ParticleData::VarInt(read_varint(buf)?),
        };
        particle.data.push(data);
    }
    Ok(particle)
}

pub fn write_particle(buf: &mut BytesMut, particle: &Particle, format: NbtFormat) {
    write_varint(buf, particle.id);
    for data in &particle.data {
        match data {
            ParticleData::BlockState(id) | ParticleData::VarInt(id) => write_varint(buf, *id),
            ParticleData::Item(item) => write_slot(buf, item, format.is_named()),
            ParticleData::Float(v) => buf.put_f32(*v),
        }
    }
}
