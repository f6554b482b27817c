use crate::serde::CodecError;
use derive_more::{Deref, From};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use std::io::{self, Read};
use std::mem;

#[derive(From, Deref, Clone, Copy)]
pub struct TypeTagInt(u8);
impl From<TypeTag> for TypeTagInt {
    fn from(tag: TypeTag) -> Self {
        let int = tag.to_u8().unwrap();
        Self(int)
    }
}
impl TypeTagInt {
    pub fn deser(r: &mut impl Read) -> Result<(usize, Self), io::Error> {
        let mut buf = [0u8; mem::size_of::<u8>()];
        r.read_exact(&mut buf)?;
        Ok((buf.len(), Self(buf[0])))
    }
}

/// Wire tags are mnemonic ASCII bytes, fixed forever: an enum discriminant
/// here IS the byte on the wire.
///
/// `Empty` does double duty: it is the empty value's own tag, and the
/// element-subtype marker of tuples and heterogeneous arrays ("elements are
/// any value"). A packed primitive array instead carries its scalar kind as
/// the subtype.
#[repr(u8)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, FromPrimitive, ToPrimitive, Debug)]
pub enum TypeTag {
    I8 = b's',
    U8 = b'S',
    I16 = b'i',
    U16 = b'I',
    I32 = b'l',
    U32 = b'L',
    I64 = b'x',
    U64 = b'X',
    Bool = b'b',
    F32 = b'f',
    F64 = b'd',
    C64 = b'F',
    C128 = b'D',
    Str = b'a',
    Tab = b't',
    OTab = b'o',
    Tup = b'u',
    Int = b'q',
    Uint = b'Q',
    Arr = b'n',
    Empty = b'Z',
    Proxy = b'P',
}

impl TypeTag {
    /// Whether this tag denotes a packed-array element kind.
    pub fn is_pod_subtype(&self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::U8
                | Self::I16
                | Self::U16
                | Self::I32
                | Self::U32
                | Self::I64
                | Self::U64
                | Self::Bool
                | Self::F32
                | Self::F64
                | Self::C64
                | Self::C128
        )
    }
}

impl TryFrom<TypeTagInt> for TypeTag {
    type Error = CodecError;
    fn try_from(int: TypeTagInt) -> Result<Self, CodecError> {
        TypeTag::from_u8(int.0).ok_or(CodecError::UnknownTag(int.0))
    }
}
