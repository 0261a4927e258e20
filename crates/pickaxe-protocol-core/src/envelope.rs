use crate::codec::{read_varint, write_varint};
use crate::error::{ProtocolError, ProtocolResult};
use crate::metadata::MetadataList;
use crate::packet_type::PacketType;
use crate::state::{Direction, State};
use crate::value::{read_field, write_field, FieldKind, FieldValue};
use bytes::BytesMut;
use pickaxe_nbt::NbtValue;
use pickaxe_types::{BlockPos, ItemStack, Particle};
use std::collections::VecDeque;
use uuid::Uuid;

/// One packet in flight.
///
/// Values are consumed from the front of the input with [`Envelope::read`]
/// and produced with [`Envelope::write`]. Input that has not been
/// materialized yet stays in the raw remainder and is decoded on demand.
/// Between translators [`Envelope::reset_reader`] turns the output, followed
/// by whatever was left unread, into the next input. The wire image is
/// always `output ++ unread input ++ raw remainder`.
#[derive(Debug, Clone)]
pub struct Envelope {
    direction: Direction,
    state: State,
    id: i32,
    packet_type: Option<PacketType>,
    input: VecDeque<FieldValue>,
    output: Vec<FieldValue>,
    raw: BytesMut,
    cancelled: bool,
}

macro_rules! typed_read {
    ($(#[$doc:meta])* $name:ident, $passthrough:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&mut self) -> ProtocolResult<$ty> {
            match self.read(FieldKind::$variant)? {
                FieldValue::$variant(v) => Ok(v),
                other => Err(mismatch(stringify!($variant), &other)),
            }
        }

        pub fn $passthrough(&mut self) -> ProtocolResult<$ty> {
            match self.passthrough(FieldKind::$variant)? {
                FieldValue::$variant(v) => Ok(v),
                other => Err(mismatch(stringify!($variant), &other)),
            }
        }
    };
}

fn mismatch(expected: &str, found: &FieldValue) -> ProtocolError {
    ProtocolError::violation(format!(
        "expected {} field, found {}",
        expected,
        found.kind_name()
    ))
}

impl Envelope {
    pub fn new(direction: Direction, state: State, id: i32) -> Self {
        Self {
            direction,
            state,
            id,
            packet_type: None,
            input: VecDeque::new(),
            output: Vec::new(),
            raw: BytesMut::new(),
            cancelled: false,
        }
    }

    /// An envelope whose payload is still fully encoded.
    pub fn from_raw(direction: Direction, state: State, id: i32, payload: BytesMut) -> Self {
        Self {
            raw: payload,
            ..Self::new(direction, state, id)
        }
    }

    /// Split a decompressed frame into its id and payload.
    pub fn from_frame(direction: Direction, state: State, mut frame: BytesMut) -> ProtocolResult<Self> {
        let id = read_varint(&mut frame)?;
        Ok(Self::from_raw(direction, state, id, frame))
    }

    pub fn with_fields(direction: Direction, state: State, id: i32, fields: Vec<FieldValue>) -> Self {
        Self {
            input: fields.into(),
            ..Self::new(direction, state, id)
        }
    }

    /// An empty envelope for a known packet type; values are added with
    /// [`Envelope::write`].
    pub fn from_type(packet_type: PacketType) -> Self {
        let mut envelope = Self::new(packet_type.direction, packet_type.state, packet_type.id);
        envelope.packet_type = Some(packet_type);
        envelope
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    /// Renumber the packet. A symbolic type no longer describes the id, so
    /// it is dropped.
    pub fn set_id(&mut self, id: i32) {
        if self.id != id {
            self.packet_type = None;
        }
        self.id = id;
    }

    pub fn packet_type(&self) -> Option<PacketType> {
        self.packet_type
    }

    /// Retag the envelope. Id and state follow the type.
    pub fn set_packet_type(&mut self, packet_type: PacketType) {
        self.id = packet_type.id;
        self.state = packet_type.state;
        self.packet_type = Some(packet_type);
    }

    pub fn clear_packet_type(&mut self) {
        self.packet_type = None;
    }

    pub fn name(&self) -> Option<&'static str> {
        self.packet_type.map(|ty| ty.name)
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Consume the next input value, decoding it from the raw remainder if
    /// it has not been materialized. A materialized value of another kind
    /// is a protocol violation.
    pub fn read(&mut self, kind: FieldKind) -> ProtocolResult<FieldValue> {
        match self.input.pop_front() {
            Some(value) if value.matches(kind) => Ok(value),
            Some(value) => {
                let err = ProtocolError::violation(format!(
                    "packet 0x{:02x}: expected {:?}, found {}",
                    self.id,
                    kind,
                    value.kind_name()
                ));
                self.input.push_front(value);
                Err(err)
            }
            None => Ok(read_field(&mut self.raw, kind)?),
        }
    }

    /// Append a value to the output.
    pub fn write(&mut self, value: FieldValue) {
        self.output.push(value);
    }

    /// Read a value and write it back unchanged.
    pub fn passthrough(&mut self, kind: FieldKind) -> ProtocolResult<FieldValue> {
        let value = self.read(kind)?;
        self.output.push(value.clone());
        Ok(value)
    }

    /// Move every unread value to the output. Raw bytes stay encoded.
    pub fn passthrough_all(&mut self) {
        self.output.extend(self.input.drain(..));
    }

    /// Drop all unread input, materialized or raw.
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.raw.clear();
    }

    /// Drop everything written so far.
    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    pub fn reset_reader(&mut self) {
        if self.output.is_empty() {
            return;
        }
        let unread = std::mem::take(&mut self.input);
        self.input = self.output.drain(..).collect();
        self.input.extend(unread);
    }

    /// Materialized values in wire order: output first, then unread input.
    pub fn fields(&self) -> impl Iterator<Item = &FieldValue> {
        self.output.iter().chain(self.input.iter())
    }

    /// Undecoded trailing bytes.
    pub fn raw_remainder(&self) -> &[u8] {
        &self.raw
    }

    pub fn payload(&self) -> ProtocolResult<BytesMut> {
        let mut buf = BytesMut::new();
        for value in self.fields() {
            write_field(&mut buf, value)?;
        }
        buf.extend_from_slice(&self.raw);
        Ok(buf)
    }

    /// The packet id followed by the payload, ready for framing.
    pub fn to_bytes(&self) -> ProtocolResult<BytesMut> {
        let payload = self.payload()?;
        let mut buf = BytesMut::with_capacity(payload.len() + 5);
        write_varint(&mut buf, self.id);
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    typed_read!(read_bool, passthrough_bool, Bool, bool);
    typed_read!(read_byte, passthrough_byte, Byte, i8);
    typed_read!(read_unsigned_byte, passthrough_unsigned_byte, UnsignedByte, u8);
    typed_read!(read_short, passthrough_short, Short, i16);
    typed_read!(read_int, passthrough_int, Int, i32);
    typed_read!(read_long, passthrough_long, Long, i64);
    typed_read!(read_float, passthrough_float, Float, f32);
    typed_read!(read_double, passthrough_double, Double, f64);
    typed_read!(read_varint, passthrough_varint, VarInt, i32);
    typed_read!(read_string, passthrough_string, String, String);
    typed_read!(read_uuid, passthrough_uuid, Uuid, Uuid);
    typed_read!(read_position, passthrough_position, Position, BlockPos);
    typed_read!(read_byte_array, passthrough_byte_array, ByteArray, Vec<u8>);
    typed_read!(read_varint_array, passthrough_varint_array, VarIntArray, Vec<i32>);
    typed_read!(read_string_array, passthrough_string_array, StringArray, Vec<String>);

    pub fn read_nbt(&mut self, kind: FieldKind) -> ProtocolResult<Option<NbtValue>> {
        match self.read(kind)? {
            FieldValue::Nbt(_, tag) => Ok(tag),
            other => Err(mismatch("Nbt", &other)),
        }
    }

    pub fn read_item(&mut self, kind: FieldKind) -> ProtocolResult<Option<ItemStack>> {
        match self.read(kind)? {
            FieldValue::Item(_, item) => Ok(item),
            other => Err(mismatch("Item", &other)),
        }
    }

    pub fn read_particle(&mut self, kind: FieldKind) -> ProtocolResult<Particle> {
        match self.read(kind)? {
            FieldValue::Particle(_, particle) => Ok(particle),
            other => Err(mismatch("Particle", &other)),
        }
    }

    pub fn read_metadata(&mut self, kind: FieldKind) -> ProtocolResult<MetadataList> {
        match self.read(kind)? {
            FieldValue::Metadata(list) => Ok(list),
            other => Err(mismatch("Metadata", &other)),
        }
    }
}
