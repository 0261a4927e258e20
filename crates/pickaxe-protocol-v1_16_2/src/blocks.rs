use crate::packets::{
    ACKNOWLEDGE_PLAYER_DIGGING, BLOCK_ACTION, BLOCK_CHANGE, EFFECT, MULTI_BLOCK_CHANGE, MULTI_BLOCK_CHANGE_1_16_2,
};
use bytes::{Buf, BytesMut};
use pickaxe_protocol_core::{
    ensure, read_varint, CodecResult, Direction, Envelope, FieldValue, HandlerKey, PacketContext, PacketFilter,
    ProtocolResult, RawFrame, State, Target, TranslatorBuilder, UserConnection,
};
use std::collections::BTreeMap;
use tracing::trace;

/// Effect id of the block break particles and sound; its data is a block state.
const EFFECT_BLOCK_BREAK: i32 = 2001;

/// One record of the 1.16.1 multi block change: the position inside the
/// chunk column and the new block state.
#[derive(Debug, Clone, Copy)]
struct BlockChangeRecord {
    /// x << 4 | z
    horizontal: u8,
    y: u8,
    state: i32,
}

impl BlockChangeRecord {
    fn section(&self) -> i32 {
        (self.y >> 4) as i32
    }

    /// 1.16.2 packs the record into one varlong: the state above a 12 bit
    /// section-local position.
    fn pack(&self, state: i32) -> i64 {
        let x = (self.horizontal >> 4) as i64;
        let z = (self.horizontal & 0xF) as i64;
        let y = (self.y & 0xF) as i64;
        ((state as i64) << 12) | (x << 8) | (z << 4) | y
    }

    fn write(&self, envelope: &mut Envelope) {
        envelope.write(FieldValue::UnsignedByte(self.horizontal));
        envelope.write(FieldValue::UnsignedByte(self.y));
        envelope.write(FieldValue::VarInt(self.state));
    }
}

pub fn section_position(chunk_x: i32, section_y: i32, chunk_z: i32) -> i64 {
    ((chunk_x as i64 & 0x3FFFFF) << 42) | ((chunk_z as i64 & 0x3FFFFF) << 20) | (section_y as i64 & 0xFFFFF)
}

pub fn register(builder: &mut TranslatorBuilder) {
    builder.register(
        HandlerKey::id(State::Play, Direction::Clientbound, BLOCK_CHANGE),
        Target::Auto,
        |envelope, ctx| {
            envelope.passthrough_position()?;
            map_block_state(envelope, ctx)
        },
    );

    builder.register(
        HandlerKey::id(State::Play, Direction::Clientbound, ACKNOWLEDGE_PLAYER_DIGGING),
        Target::Auto,
        |envelope, ctx| {
            envelope.passthrough_position()?;
            map_block_state(envelope, ctx)
        },
    );

    builder.register(
        HandlerKey::id(State::Play, Direction::Clientbound, BLOCK_ACTION),
        Target::Auto,
        |envelope, ctx| {
            envelope.passthrough_position()?;
            envelope.passthrough_unsigned_byte()?;
            envelope.passthrough_unsigned_byte()?;
            let block = envelope.read_varint()?;
            match ctx.translator().mappings().new_block_id(block) {
                Some(block) => envelope.write(FieldValue::VarInt(block)),
                None => envelope.cancel(),
            }
            Ok(())
        },
    );

    builder.register(
        HandlerKey::id(State::Play, Direction::Clientbound, EFFECT),
        Target::Auto,
        |envelope, ctx| {
            let effect = envelope.passthrough_int()?;
            envelope.passthrough_position()?;
            let data = envelope.read_int()?;
            let data = if effect == EFFECT_BLOCK_BREAK {
                ctx.translator().mappings().new_block_state_id(data)
            } else {
                data
            };
            envelope.write(FieldValue::Int(data));
            Ok(())
        },
    );

    builder.register(
        HandlerKey::id(State::Play, Direction::Clientbound, MULTI_BLOCK_CHANGE),
        Target::Id(MULTI_BLOCK_CHANGE_1_16_2),
        rewrite_multi_block_change,
    );
}

fn map_block_state(envelope: &mut Envelope, ctx: &PacketContext<'_>) -> ProtocolResult<()> {
    let state = envelope.read_varint()?;
    envelope.write(FieldValue::VarInt(ctx.translator().mappings().new_block_state_id(state)));
    Ok(())
}

/// 1.16.2 sends block changes per chunk section rather than per column.
/// The first section is written into this packet, any others are sent on
/// as packets of their own.
fn rewrite_multi_block_change(envelope: &mut Envelope, ctx: &mut PacketContext<'_>) -> ProtocolResult<()> {
    let chunk_x = envelope.read_int()?;
    let chunk_z = envelope.read_int()?;
    let count = envelope.read_varint()?;
    let mut sections: BTreeMap<i32, Vec<i64>> = BTreeMap::new();
    for _ in 0..count.max(0) {
        let record = BlockChangeRecord {
            horizontal: envelope.read_unsigned_byte()?,
            y: envelope.read_unsigned_byte()?,
            state: envelope.read_varint()?,
        };
        let state = ctx.translator().mappings().new_block_state_id(record.state);
        sections.entry(record.section()).or_default().push(record.pack(state));
    }

    let mut sections = sections.into_iter();
    let Some((section_y, records)) = sections.next() else {
        envelope.cancel();
        return Ok(());
    };
    write_section(envelope, chunk_x, section_y, chunk_z, records);

    for (section_y, records) in sections {
        trace!("Splitting block changes of chunk {},{} into section {}", chunk_x, chunk_z, section_y);
        let mut packet = Envelope::new(Direction::Clientbound, State::Play, MULTI_BLOCK_CHANGE_1_16_2);
        write_section(&mut packet, chunk_x, section_y, chunk_z, records);
        ctx.send(packet, true)?;
    }
    Ok(())
}

fn write_section(envelope: &mut Envelope, chunk_x: i32, section_y: i32, chunk_z: i32, records: Vec<i64>) {
    envelope.write(FieldValue::Long(section_position(chunk_x, section_y, chunk_z)));
    // Light is sent separately; the client must not skip its own update.
    envelope.write(FieldValue::Bool(false));
    envelope.write(FieldValue::VarInt(records.len() as i32));
    for record in records {
        envelope.write(FieldValue::VarLong(record));
    }
}

/// Splits a server's multi block change by section before anything decodes
/// it, so each section is translated as a packet of its own.
pub struct MultiBlockChangeFilter;

impl MultiBlockChangeFilter {
    fn decode(payload: &mut BytesMut) -> CodecResult<(i32, i32, Vec<BlockChangeRecord>)> {
        ensure(payload, 8)?;
        let chunk_x = payload.get_i32();
        let chunk_z = payload.get_i32();
        let count = read_varint(payload)?.max(0);
        let mut records = Vec::with_capacity(count.min(4096) as usize);
        for _ in 0..count {
            ensure(payload, 2)?;
            let horizontal = payload.get_u8();
            let y = payload.get_u8();
            let state = read_varint(payload)?;
            records.push(BlockChangeRecord { horizontal, y, state });
        }
        Ok((chunk_x, chunk_z, records))
    }
}

impl PacketFilter for MultiBlockChangeFilter {
    fn is_filtered(&self, frame: &RawFrame) -> bool {
        frame.direction == Direction::Clientbound && frame.state == State::Play && frame.id == MULTI_BLOCK_CHANGE
    }

    fn filter(&self, _user: &UserConnection, mut frame: RawFrame, out: &mut Vec<Envelope>) -> ProtocolResult<()> {
        let (chunk_x, chunk_z, records) = Self::decode(&mut frame.payload)?;
        let mut sections: BTreeMap<i32, Vec<BlockChangeRecord>> = BTreeMap::new();
        for record in records {
            sections.entry(record.section()).or_default().push(record);
        }
        for records in sections.into_values() {
            let mut envelope = Envelope::new(frame.direction, frame.state, frame.id);
            envelope.write(FieldValue::Int(chunk_x));
            envelope.write(FieldValue::Int(chunk_z));
            envelope.write(FieldValue::VarInt(records.len() as i32));
            for record in &records {
                record.write(&mut envelope);
            }
            envelope.reset_reader();
            out.push(envelope);
        }
        Ok(())
    }
}
