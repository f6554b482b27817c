use anyhow::{anyhow, Result};
use malachite::{Integer, Natural};

mod deser;
mod ser;

pub use deser::*;
pub use ser::*;

/// Minimal little-endian magnitude bytes; zero is the empty magnitude.
/// Minimality is what makes the wire form canonical: one value, one byte
/// sequence, one length.
pub(crate) fn nat_magnitude_le(n: &Natural) -> Vec<u8> {
    let mut bytes = vec![];
    let mut v = n.clone();
    let base = Natural::from(256u32);
    while v != Natural::from(0u32) {
        let rem = &v % &base;
        bytes.push(u64::try_from(&rem).unwrap_or(0) as u8);
        v = &v / &base;
    }
    bytes
}

pub(crate) fn nat_from_magnitude_le(bytes: &[u8]) -> Natural {
    let mut v = Natural::from(0u32);
    let base = Natural::from(256u32);
    for &byte in bytes.iter().rev() {
        v = v * &base + Natural::from(u32::from(byte));
    }
    v
}

/// Signed payload: one sign byte (0 or 1), then the minimal magnitude.
pub(crate) fn int_payload(i: &Integer) -> Vec<u8> {
    let negative = *i < Integer::from(0);
    let mut magnitude = if negative { -i.clone() } else { i.clone() };
    let mut payload = vec![u8::from(negative)];
    let base = Integer::from(256);
    while magnitude != Integer::from(0) {
        let rem = &magnitude % &base;
        payload.push(u64::try_from(&rem).unwrap_or(0) as u8);
        magnitude = &magnitude / &base;
    }
    payload
}

pub(crate) fn int_from_payload(payload: &[u8]) -> Result<Integer> {
    let (sign, magnitude) = payload
        .split_first()
        .ok_or_else(|| anyhow!("empty signed big-integer payload"))?;
    let mut v = Integer::from(0);
    let base = Integer::from(256);
    for &byte in magnitude.iter().rev() {
        v = v * &base + Integer::from(u32::from(byte));
    }
    Ok(if *sign != 0 { -v } else { v })
}
