use bytes::{Buf, BufMut, BytesMut};
use pickaxe_nbt::{NbtError, NbtValue};
use pickaxe_types::{BlockPos, ItemStack};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("VarInt too big")]
    VarIntTooBig,
    #[error("Not enough data")]
    NotEnoughData,
    #[error("String too long: {0} > {1}")]
    StringTooLong(usize, usize),
    #[error("Negative length {0}")]
    NegativeLength(i32),
    #[error("Invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("NBT error: {0}")]
    Nbt(#[from] NbtError),
    #[error("Unknown metadata type {0}")]
    UnknownMetaType(i32),
    #[error("Metadata kind {0} has no id in {1}")]
    UnmappedMetaKind(&'static str, &'static str),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Fail cleanly instead of letting `Buf` panic on a short packet.
pub fn ensure(buf: &BytesMut, n: usize) -> CodecResult<()> {
    if buf.remaining() < n {
        Err(CodecError::NotEnoughData)
    } else {
        Ok(())
    }
}

/// Read a VarInt from the buffer.
pub fn read_varint(buf: &mut BytesMut) -> CodecResult<i32> {
    let mut result: i32 = 0;
    let mut shift: u32 = 0;
    loop {
        if !buf.has_remaining() {
            return Err(CodecError::NotEnoughData);
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7F) as i32) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 35 {
            return Err(CodecError::VarIntTooBig);
        }
    }
}

/// Write a VarInt to the buffer.
pub fn write_varint(buf: &mut BytesMut, mut value: i32) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u32) >> 7) as i32;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Calculate the byte length of a VarInt.
pub fn varint_len(value: i32) -> usize {
    let mut val = value as u32;
    let mut len = 0;
    loop {
        len += 1;
        val >>= 7;
        if val == 0 {
            break;
        }
    }
    len
}

/// Read a VarLong from the buffer.
pub fn read_varlong(buf: &mut BytesMut) -> CodecResult<i64> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;
    loop {
        if !buf.has_remaining() {
            return Err(CodecError::NotEnoughData);
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7F) as i64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 70 {
            return Err(CodecError::VarIntTooBig);
        }
    }
}

/// Write a VarLong to the buffer.
pub fn write_varlong(buf: &mut BytesMut, mut value: i64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u64) >> 7) as i64;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Read a protocol string (varint-prefixed UTF-8).
pub fn read_string(buf: &mut BytesMut, max_len: usize) -> CodecResult<String> {
    let len = read_length(buf)?;
    if len > max_len * 4 {
        return Err(CodecError::StringTooLong(len, max_len));
    }
    ensure(buf, len)?;
    let bytes = buf.split_to(len);
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Write a protocol string.
pub fn write_string(buf: &mut BytesMut, s: &str) {
    write_varint(buf, s.len() as i32);
    buf.put_slice(s.as_bytes());
}

/// Read a UUID (128 bits, big endian).
pub fn read_uuid(buf: &mut BytesMut) -> CodecResult<Uuid> {
    ensure(buf, 16)?;
    let mut bytes = [0u8; 16];
    buf.copy_to_slice(&mut bytes);
    Ok(Uuid::from_bytes(bytes))
}

/// Write a UUID.
pub fn write_uuid(buf: &mut BytesMut, uuid: &Uuid) {
    buf.put_slice(uuid.as_bytes());
}

pub fn read_bool(buf: &mut BytesMut) -> CodecResult<bool> {
    ensure(buf, 1)?;
    Ok(buf.get_u8() != 0)
}

/// Read a position packed into a long.
pub fn read_position(buf: &mut BytesMut) -> CodecResult<BlockPos> {
    ensure(buf, 8)?;
    Ok(BlockPos::decode(buf.get_u64()))
}

pub fn write_position(buf: &mut BytesMut, pos: &BlockPos) {
    buf.put_u64(pos.encode());
}

/// Read a non-negative varint length prefix.
pub fn read_length(buf: &mut BytesMut) -> CodecResult<usize> {
    let len = read_varint(buf)?;
    if len < 0 {
        return Err(CodecError::NegativeLength(len));
    }
    Ok(len as usize)
}

/// Read a byte array with varint length prefix.
pub fn read_byte_array(buf: &mut BytesMut) -> CodecResult<Vec<u8>> {
    let len = read_length(buf)?;
    ensure(buf, len)?;
    let bytes = buf.split_to(len);
    Ok(bytes.to_vec())
}

/// Write a byte array with varint length prefix.
pub fn write_byte_array(buf: &mut BytesMut, data: &[u8]) {
    write_varint(buf, data.len() as i32);
    buf.put_slice(data);
}

/// Read a Slot (1.13.2 - 1.20.4 format: present flag, item id, count, NBT).
/// Returns None for empty slots.
pub fn read_slot(buf: &mut BytesMut, named_nbt: bool) -> CodecResult<Option<ItemStack>> {
    if !read_bool(buf)? {
        return Ok(None);
    }
    let item_id = read_varint(buf)?;
    ensure(buf, 1)?;
    let count = buf.get_i8();
    let tag = if named_nbt {
        NbtValue::read_root_named(buf)?
    } else {
        NbtValue::read_root_network(buf)?
    };
    Ok(Some(ItemStack {
        item_id,
        count,
        tag,
    }))
}

/// Write a Slot in the same format as [`read_slot`].
pub fn write_slot(buf: &mut BytesMut, slot: &Option<ItemStack>, named_nbt: bool) {
    match slot {
        None => buf.put_u8(0),
        Some(item) => {
            buf.put_u8(1);
            write_varint(buf, item.item_id);
            buf.put_i8(item.count);
            pickaxe_nbt::write_optional_root(item.tag.as_ref(), named_nbt, buf);
        }
    }
}
