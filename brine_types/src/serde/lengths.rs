use anyhow::Result;
use derive_more::Deref;
use std::io::{self, Read};
use std::mem;

/// Element or entry count of a container, `u32` on the wire.
#[derive(Deref, Clone, Copy)]
pub struct ElemCount(u32);
impl ElemCount {
    pub fn from_len(len: usize) -> Result<Self> {
        let int = u32::try_from(len)?;
        Ok(Self(int))
    }
    pub fn deser(r: &mut impl Read) -> Result<(usize, Self), io::Error> {
        let mut buf = [0u8; mem::size_of::<u32>()];
        r.read_exact(&mut buf)?;
        let int = u32::from_le_bytes(buf);
        Ok((buf.len(), Self(int)))
    }
}

/// Byte length of a string or big-integer payload, `u32` on the wire.
#[derive(Deref, Clone, Copy)]
pub struct ByteLen(u32);
impl ByteLen {
    pub fn from_payload(buf: &[u8]) -> Result<Self> {
        let int = u32::try_from(buf.len())?;
        Ok(Self(int))
    }
    pub fn deser(r: &mut impl Read) -> Result<(usize, Self), io::Error> {
        let mut buf = [0u8; mem::size_of::<u32>()];
        r.read_exact(&mut buf)?;
        let int = u32::from_le_bytes(buf);
        Ok((buf.len(), Self(int)))
    }
}
