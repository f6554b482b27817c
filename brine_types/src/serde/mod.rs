//! # Serialization format
//!
//! A value serializes as a tag byte followed by its payload. All multi-byte
//! numeric fields are little-endian; counts and lengths are `u32`.
//!
//! ```text
//! scalar          tag, then the payload at its fixed width
//!                 (1: i8/u8/bool; 2: i16/u16; 4: i32/u32/f32;
//!                  8: i64/u64/f64/c64; 16: c128)
//!
//! none            tag only
//!
//! string          tag, byte_len: u32, raw bytes
//!
//! big integer     tag, byte_len: u32, sign byte + minimal le magnitude
//!   (unsigned form omits the sign byte; zero is the empty magnitude)
//!
//! table           tag, entry_count: u32, then entry_count × (key, value)
//!   (ordered and unordered tables share this shape; only the tag differs)
//!
//! tuple           tag, subtype = any-value marker, len: u32, len × value
//! hetero array    tag, subtype = any-value marker, len: u32, len × value
//! packed array    tag, scalar subtype, len: u32, len × element bytes
//!                 (no per-element tags)
//!
//! proxy, first    tag, marker: u32, adopt: u8, lock: u8, reserved: u8,
//!                 then the wrapped container in full
//! proxy, repeat   tag, marker: u32   (body omitted; 5 bytes total)
//! ```
//!
//! One top-level encode or decode call owns one marker table: each distinct
//! proxy identity gets one integer marker and its body appears exactly once,
//! which is both the dedup and what lets aliasing (and cycles) round-trip.
//!
//! Compat mode degrades the newer kinds into older ones (ordered tables
//! into plain tables, tuples into heterogeneous arrays, big integers into
//! decimal strings) identically in sizing, encoding, and decoding, so a
//! compat stream reads the same whether or not the reader also asks for
//! compat.
//!
//! The format carries no checksum, version header, or total length; a
//! truncated buffer surfaces as an `UnexpectedEof` read error.

mod cx;
mod error;
mod lengths;
mod tag;
mod value;

pub use cx::*;
pub use error::*;
pub use tag::*;
pub use value::*;

use lengths::*;
