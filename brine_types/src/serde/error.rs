use crate::serde::TypeTag;
use derive_more::Display;
use std::error::Error;

/// The codec's unrecoverable complaints. Once one of these is raised the
/// stream position is unusable; nothing is retried.
#[derive(Display, PartialEq, Eq, Clone, Copy, Debug)]
pub enum CodecError {
    /// A tag byte no variant claims.
    #[display(fmt = "unknown type tag {:#04x}", _0)]
    UnknownTag(u8),

    /// A packed array whose declared element kind is a container or string.
    #[display(fmt = "{:?} is not a packable element kind", _0)]
    UnsupportedPodSubtype(TypeTag),

    /// A proxy whose wrapped value is not a container.
    #[display(fmt = "a proxy cannot wrap a {:?} value", _0)]
    UnsupportedProxyBody(TypeTag),
}

impl Error for CodecError {}
