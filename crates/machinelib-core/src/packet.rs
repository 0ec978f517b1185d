//! Wire encoding of slot contents for client/server sync.
//!
//! One slot encodes as a big-endian `u64` amount. An amount of 0 means the
//! slot is empty and nothing follows. Otherwise a varint-length-prefixed UTF-8
//! resource key follows, then a presence byte and, when present, a
//! varint-length-prefixed bitcode compound.

use crate::resource::{Resource, ResourceResolver};
use crate::slot::ResourceSlot;
use crate::slotted::SlottedStorage;
use crate::storage::ResourceStorage;
use crate::tag::Tag;
use bytes::{Buf, BufMut};

/// Errors raised while encoding or decoding slot packets.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("packet ended early: needed {needed} more bytes, {remaining} left")]
    UnexpectedEof { needed: usize, remaining: usize },
    #[error("resource key is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("varint longer than 5 bytes")]
    VarIntTooLong,
    #[error("compound encoding failed: {0}")]
    Compound(String),
    #[error("resource {0} has no registered key")]
    UnregisteredResource(String),
    #[error("slot index {index} out of range for {size} slots")]
    SlotOutOfRange { index: usize, size: usize },
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

fn ensure(buf: &impl Buf, needed: usize) -> Result<(), PacketError> {
    if buf.remaining() < needed {
        return Err(PacketError::UnexpectedEof {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

/// LEB128-style unsigned varint, at most 5 bytes.
pub fn write_var_int(buf: &mut impl BufMut, mut value: u32) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

pub fn read_var_int(buf: &mut impl Buf) -> Result<u32, PacketError> {
    let mut value = 0u32;
    for i in 0..5 {
        ensure(buf, 1)?;
        let byte = buf.get_u8();
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(PacketError::VarIntTooLong)
}

fn write_len(buf: &mut impl BufMut, len: usize) -> Result<(), PacketError> {
    let len = u32::try_from(len).map_err(|_| PacketError::Compound(format!("length {len} too large")))?;
    write_var_int(buf, len);
    Ok(())
}

fn read_bytes(buf: &mut impl Buf) -> Result<Vec<u8>, PacketError> {
    let len = read_var_int(buf)? as usize;
    ensure(buf, len)?;
    let mut bytes = vec![0; len];
    buf.copy_to_slice(&mut bytes);
    Ok(bytes)
}

pub fn write_utf(buf: &mut impl BufMut, value: &str) -> Result<(), PacketError> {
    write_len(buf, value.len())?;
    buf.put_slice(value.as_bytes());
    Ok(())
}

pub fn read_utf(buf: &mut impl Buf) -> Result<String, PacketError> {
    Ok(String::from_utf8(read_bytes(buf)?)?)
}

pub fn write_compound(buf: &mut impl BufMut, tag: Option<&Tag>) -> Result<(), PacketError> {
    match tag {
        None => buf.put_u8(0),
        Some(tag) => {
            let encoded = bitcode::serialize(tag).map_err(|e| PacketError::Compound(e.to_string()))?;
            buf.put_u8(1);
            write_len(buf, encoded.len())?;
            buf.put_slice(&encoded);
        }
    }
    Ok(())
}

pub fn read_compound(buf: &mut impl Buf) -> Result<Option<Tag>, PacketError> {
    ensure(buf, 1)?;
    match buf.get_u8() {
        0 => Ok(None),
        _ => {
            let encoded = read_bytes(buf)?;
            let tag = bitcode::deserialize(&encoded).map_err(|e| PacketError::Compound(e.to_string()))?;
            Ok(Some(tag))
        }
    }
}

// ---------------------------------------------------------------------------
// Slots and storages
// ---------------------------------------------------------------------------

impl<R: Resource> ResourceSlot<R> {
    pub fn write_packet(
        &self,
        buf: &mut impl BufMut,
        resolver: &impl ResourceResolver<R>,
    ) -> Result<(), PacketError> {
        let stack = self.stack();
        let Some(resource) = stack.resource else {
            buf.put_u64(0);
            return Ok(());
        };
        let key = resolver
            .resource_key(&resource)
            .ok_or_else(|| PacketError::UnregisteredResource(format!("{resource:?}")))?;
        buf.put_u64(stack.amount);
        write_utf(buf, &key)?;
        write_compound(buf, stack.tag.as_ref())
    }

    /// Overwrite this slot from a packet. An unknown key empties the slot
    /// after consuming the rest of the slot's bytes.
    pub fn read_packet(
        &self,
        buf: &mut impl Buf,
        resolver: &impl ResourceResolver<R>,
    ) -> Result<(), PacketError> {
        ensure(buf, 8)?;
        let amount = buf.get_u64();
        if amount == 0 {
            self.set_empty();
            return Ok(());
        }
        let key = read_utf(buf)?;
        let tag = read_compound(buf)?;
        match resolver.resolve(&key) {
            Some(resource) => self.set(Some(resource), tag, amount),
            None => {
                tracing::warn!(%key, kind = R::KIND, "unknown resource in slot packet, leaving slot empty");
                self.set_empty();
            }
        }
        Ok(())
    }
}

impl<R: Resource> ResourceStorage<R> {
    /// Write every slot in flat order.
    pub fn write_packet(
        &self,
        buf: &mut impl BufMut,
        resolver: &impl ResourceResolver<R>,
    ) -> Result<(), PacketError> {
        for slot in self.slots() {
            slot.write_packet(buf, resolver)?;
        }
        Ok(())
    }

    /// Read every slot in flat order, as written by [`write_packet`](Self::write_packet).
    pub fn read_packet(
        &self,
        buf: &mut impl Buf,
        resolver: &impl ResourceResolver<R>,
    ) -> Result<(), PacketError> {
        for index in 0..self.size() {
            self.slot(index).read_packet(buf, resolver)?;
        }
        Ok(())
    }
}
