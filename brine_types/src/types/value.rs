use crate::serde::TypeTag;
use crate::types::{OrderedTable, PodArr, Proxy, Table, Tuple};
use malachite::{Integer, Natural};
use num_complex::Complex;
use std::hash::{Hash, Hasher};

/// The dynamic value: a closed tagged variant. Exactly one payload is active
/// per instance, selected by its tag.
///
/// `Value` is usable as a table key. To make that workable the equality and
/// hashing semantics are:
/// - floats and complexes compare and hash by bit pattern (`NaN == NaN`,
///   `0.0 != -0.0`);
/// - proxies compare and hash by control-block identity;
/// - unordered tables hash order-independently;
/// - different variants are never equal, even numerically (`I32(1) != I64(1)`).
#[derive(Clone, Debug)]
pub enum Value {
    None,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    C64(Complex<f32>),
    C128(Complex<f64>),
    Str(String),
    Int(Integer),
    Uint(Natural),
    Tab(Table),
    OTab(OrderedTable),
    Tup(Tuple),
    Arr(Vec<Value>),
    Pod(PodArr),
    Proxy(Proxy),
}

impl Value {
    pub fn tag(&self) -> TypeTag {
        TypeTag::from(self)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, Self::Proxy(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tab(&self) -> Option<&Table> {
        match self {
            Self::Tab(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_otab(&self) -> Option<&OrderedTable> {
        match self {
            Self::OTab(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_tup(&self) -> Option<&Tuple> {
        match self {
            Self::Tup(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_arr(&self) -> Option<&[Value]> {
        match self {
            Self::Arr(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_pod(&self) -> Option<&PodArr> {
        match self {
            Self::Pod(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Self::Proxy(p) => Some(p),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::I8(a), Self::I8(b)) => a == b,
            (Self::U8(a), Self::U8(b)) => a == b,
            (Self::I16(a), Self::I16(b)) => a == b,
            (Self::U16(a), Self::U16(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::U32(a), Self::U32(b)) => a == b,
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::U64(a), Self::U64(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            (Self::C64(a), Self::C64(b)) => {
                (a.re.to_bits(), a.im.to_bits()) == (b.re.to_bits(), b.im.to_bits())
            }
            (Self::C128(a), Self::C128(b)) => {
                (a.re.to_bits(), a.im.to_bits()) == (b.re.to_bits(), b.im.to_bits())
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Uint(a), Self::Uint(b)) => a == b,
            (Self::Tab(a), Self::Tab(b)) => a == b,
            (Self::OTab(a), Self::OTab(b)) => a == b,
            (Self::Tup(a), Self::Tup(b)) => a == b,
            (Self::Arr(a), Self::Arr(b)) => a == b,
            (Self::Pod(a), Self::Pod(b)) => a == b,
            (Self::Proxy(a), Self::Proxy(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.tag() as u8);
        match self {
            Self::None => {}
            Self::Bool(x) => x.hash(state),
            Self::I8(x) => x.hash(state),
            Self::U8(x) => x.hash(state),
            Self::I16(x) => x.hash(state),
            Self::U16(x) => x.hash(state),
            Self::I32(x) => x.hash(state),
            Self::U32(x) => x.hash(state),
            Self::I64(x) => x.hash(state),
            Self::U64(x) => x.hash(state),
            Self::F32(x) => state.write_u32(x.to_bits()),
            Self::F64(x) => state.write_u64(x.to_bits()),
            Self::C64(x) => {
                state.write_u32(x.re.to_bits());
                state.write_u32(x.im.to_bits());
            }
            Self::C128(x) => {
                state.write_u64(x.re.to_bits());
                state.write_u64(x.im.to_bits());
            }
            Self::Str(x) => x.hash(state),
            Self::Int(x) => x.hash(state),
            Self::Uint(x) => x.hash(state),
            Self::Tab(x) => x.hash(state),
            Self::OTab(x) => x.hash(state),
            Self::Tup(x) => x.hash(state),
            Self::Arr(x) => x.hash(state),
            Self::Pod(x) => x.hash(state),
            Self::Proxy(x) => x.hash(state),
        }
    }
}

/// The tag alone distinguishes `Arr` from `Pod` only together with the
/// subtype byte; both answer the array tag here, mirroring the wire.
impl From<&Value> for TypeTag {
    fn from(v: &Value) -> Self {
        match v {
            Value::None => TypeTag::Empty,
            Value::Bool(_) => TypeTag::Bool,
            Value::I8(_) => TypeTag::I8,
            Value::U8(_) => TypeTag::U8,
            Value::I16(_) => TypeTag::I16,
            Value::U16(_) => TypeTag::U16,
            Value::I32(_) => TypeTag::I32,
            Value::U32(_) => TypeTag::U32,
            Value::I64(_) => TypeTag::I64,
            Value::U64(_) => TypeTag::U64,
            Value::F32(_) => TypeTag::F32,
            Value::F64(_) => TypeTag::F64,
            Value::C64(_) => TypeTag::C64,
            Value::C128(_) => TypeTag::C128,
            Value::Str(_) => TypeTag::Str,
            Value::Int(_) => TypeTag::Int,
            Value::Uint(_) => TypeTag::Uint,
            Value::Tab(_) => TypeTag::Tab,
            Value::OTab(_) => TypeTag::OTab,
            Value::Tup(_) => TypeTag::Tup,
            Value::Arr(_) | Value::Pod(_) => TypeTag::Arr,
            Value::Proxy(_) => TypeTag::Proxy,
        }
    }
}

macro_rules! impl_value_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Value {
            fn from(x: $ty) -> Self {
                Self::$variant(x)
            }
        }
    };
}

impl_value_from!(bool, Bool);
impl_value_from!(i8, I8);
impl_value_from!(u8, U8);
impl_value_from!(i16, I16);
impl_value_from!(u16, U16);
impl_value_from!(i32, I32);
impl_value_from!(u32, U32);
impl_value_from!(i64, I64);
impl_value_from!(u64, U64);
impl_value_from!(f32, F32);
impl_value_from!(f64, F64);
impl_value_from!(Complex<f32>, C64);
impl_value_from!(Complex<f64>, C128);
impl_value_from!(String, Str);
impl_value_from!(Integer, Int);
impl_value_from!(Natural, Uint);
impl_value_from!(Table, Tab);
impl_value_from!(OrderedTable, OTab);
impl_value_from!(Tuple, Tup);
impl_value_from!(Vec<Value>, Arr);
impl_value_from!(PodArr, Pod);
impl_value_from!(Proxy, Proxy);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(String::from(s))
    }
}
