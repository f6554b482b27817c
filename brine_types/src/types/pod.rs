use crate::serde::TypeTag;
use derive_more::From;
use num_complex::Complex;
use std::hash::{Hash, Hasher};
use std::io::{self, Read, Write};
use std::mem;

/// A fixed-width element of a packed primitive array: the integer, bool,
/// float, and complex kinds. Containers and strings are not packable.
pub trait PodScalar: Copy {
    const TAG: TypeTag;
    const WIDTH: usize;

    fn write_le(&self, w: &mut impl Write) -> io::Result<()>;
    fn read_le(r: &mut impl Read) -> io::Result<Self>;
}

macro_rules! impl_pod_scalar {
    ($ty:ty, $tag:expr) => {
        impl PodScalar for $ty {
            const TAG: TypeTag = $tag;
            const WIDTH: usize = mem::size_of::<$ty>();

            fn write_le(&self, w: &mut impl Write) -> io::Result<()> {
                w.write_all(&self.to_le_bytes())
            }

            fn read_le(r: &mut impl Read) -> io::Result<Self> {
                let mut buf = [0u8; mem::size_of::<$ty>()];
                r.read_exact(&mut buf)?;
                Ok(<$ty>::from_le_bytes(buf))
            }
        }
    };
}

impl_pod_scalar!(i8, TypeTag::I8);
impl_pod_scalar!(u8, TypeTag::U8);
impl_pod_scalar!(i16, TypeTag::I16);
impl_pod_scalar!(u16, TypeTag::U16);
impl_pod_scalar!(i32, TypeTag::I32);
impl_pod_scalar!(u32, TypeTag::U32);
impl_pod_scalar!(i64, TypeTag::I64);
impl_pod_scalar!(u64, TypeTag::U64);
impl_pod_scalar!(f32, TypeTag::F32);
impl_pod_scalar!(f64, TypeTag::F64);

impl PodScalar for bool {
    const TAG: TypeTag = TypeTag::Bool;
    const WIDTH: usize = 1;

    fn write_le(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&[*self as u8])
    }

    fn read_le(r: &mut impl Read) -> io::Result<Self> {
        let mut buf = [0u8; 1];
        r.read_exact(&mut buf)?;
        Ok(buf[0] != 0)
    }
}

impl PodScalar for Complex<f32> {
    const TAG: TypeTag = TypeTag::C64;
    const WIDTH: usize = 8;

    fn write_le(&self, w: &mut impl Write) -> io::Result<()> {
        self.re.write_le(w)?;
        self.im.write_le(w)
    }

    fn read_le(r: &mut impl Read) -> io::Result<Self> {
        let re = f32::read_le(r)?;
        let im = f32::read_le(r)?;
        Ok(Complex::new(re, im))
    }
}

impl PodScalar for Complex<f64> {
    const TAG: TypeTag = TypeTag::C128;
    const WIDTH: usize = 16;

    fn write_le(&self, w: &mut impl Write) -> io::Result<()> {
        self.re.write_le(w)?;
        self.im.write_le(w)
    }

    fn read_le(r: &mut impl Read) -> io::Result<Self> {
        let re = f64::read_le(r)?;
        let im = f64::read_le(r)?;
        Ok(Complex::new(re, im))
    }
}

/// A homogeneous array of one fixed-width scalar kind, serialized as packed
/// element bytes with no per-element tags.
#[derive(Clone, From, Debug)]
pub enum PodArr {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    Bool(Vec<bool>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    C64(Vec<Complex<f32>>),
    C128(Vec<Complex<f64>>),
}

impl PodArr {
    /// The element kind's tag; always a scalar tag, by construction.
    pub fn subtype(&self) -> TypeTag {
        match self {
            Self::I8(_) => TypeTag::I8,
            Self::U8(_) => TypeTag::U8,
            Self::I16(_) => TypeTag::I16,
            Self::U16(_) => TypeTag::U16,
            Self::I32(_) => TypeTag::I32,
            Self::U32(_) => TypeTag::U32,
            Self::I64(_) => TypeTag::I64,
            Self::U64(_) => TypeTag::U64,
            Self::Bool(_) => TypeTag::Bool,
            Self::F32(_) => TypeTag::F32,
            Self::F64(_) => TypeTag::F64,
            Self::C64(_) => TypeTag::C64,
            Self::C128(_) => TypeTag::C128,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::I8(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::C64(v) => v.len(),
            Self::C128(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn elem_width(&self) -> usize {
        match self {
            Self::I8(_) => <i8 as PodScalar>::WIDTH,
            Self::U8(_) => <u8 as PodScalar>::WIDTH,
            Self::I16(_) => <i16 as PodScalar>::WIDTH,
            Self::U16(_) => <u16 as PodScalar>::WIDTH,
            Self::I32(_) => <i32 as PodScalar>::WIDTH,
            Self::U32(_) => <u32 as PodScalar>::WIDTH,
            Self::I64(_) => <i64 as PodScalar>::WIDTH,
            Self::U64(_) => <u64 as PodScalar>::WIDTH,
            Self::Bool(_) => <bool as PodScalar>::WIDTH,
            Self::F32(_) => <f32 as PodScalar>::WIDTH,
            Self::F64(_) => <f64 as PodScalar>::WIDTH,
            Self::C64(_) => <Complex<f32> as PodScalar>::WIDTH,
            Self::C128(_) => <Complex<f64> as PodScalar>::WIDTH,
        }
    }

    /// Packed element bytes on the wire: `len * elem_width`.
    pub fn payload_bytes(&self) -> usize {
        self.len() * self.elem_width()
    }
}

impl PartialEq for PodArr {
    fn eq(&self, other: &Self) -> bool {
        fn bits_eq<T: Copy, B: Eq>(a: &[T], b: &[T], to_bits: impl Fn(T) -> B) -> bool {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| to_bits(*x) == to_bits(*y))
        }
        match (self, other) {
            (Self::I8(a), Self::I8(b)) => a == b,
            (Self::U8(a), Self::U8(b)) => a == b,
            (Self::I16(a), Self::I16(b)) => a == b,
            (Self::U16(a), Self::U16(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::U32(a), Self::U32(b)) => a == b,
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::U64(a), Self::U64(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => bits_eq(a, b, f32::to_bits),
            (Self::F64(a), Self::F64(b)) => bits_eq(a, b, f64::to_bits),
            (Self::C64(a), Self::C64(b)) => {
                bits_eq(a, b, |c| (c.re.to_bits(), c.im.to_bits()))
            }
            (Self::C128(a), Self::C128(b)) => {
                bits_eq(a, b, |c| (c.re.to_bits(), c.im.to_bits()))
            }
            _ => false,
        }
    }
}
impl Eq for PodArr {}

impl Hash for PodArr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.subtype() as u8);
        state.write_usize(self.len());
        match self {
            Self::I8(v) => v.hash(state),
            Self::U8(v) => v.hash(state),
            Self::I16(v) => v.hash(state),
            Self::U16(v) => v.hash(state),
            Self::I32(v) => v.hash(state),
            Self::U32(v) => v.hash(state),
            Self::I64(v) => v.hash(state),
            Self::U64(v) => v.hash(state),
            Self::Bool(v) => v.hash(state),
            Self::F32(v) => v.iter().for_each(|x| state.write_u32(x.to_bits())),
            Self::F64(v) => v.iter().for_each(|x| state.write_u64(x.to_bits())),
            Self::C64(v) => v.iter().for_each(|c| {
                state.write_u32(c.re.to_bits());
                state.write_u32(c.im.to_bits());
            }),
            Self::C128(v) => v.iter().for_each(|c| {
                state.write_u64(c.re.to_bits());
                state.write_u64(c.im.to_bits());
            }),
        }
    }
}
