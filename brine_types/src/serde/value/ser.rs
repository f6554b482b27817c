use super::{int_payload, nat_magnitude_le};
use crate::serde::{ByteLen, ElemCount, EncodeCx, TypeTag, TypeTagInt};
use crate::types::{PodArr, PodScalar, Proxy, ProxyBody, Value};
use anyhow::{ensure, Result};
use std::io::{self, Write};

/// The byte stuffed into a proxy preamble's third flag slot.
const RESERVED_BYTE: u8 = b' ';

/// Exact byte count [`encode`] produces for `value` under the same `compat`.
pub fn encoded_len(value: &Value, compat: bool) -> Result<usize> {
    let mut cx = EncodeCx::new(compat);
    len_value(value, &mut cx)
}

/// Encodes `value` into a fresh, exactly-sized buffer.
pub fn encode(value: &Value, compat: bool) -> Result<Vec<u8>> {
    let total = encoded_len(value, compat)?;
    let mut buf = Vec::with_capacity(total);
    let mut cx = EncodeCx::new(compat);
    let w_len = write_value(value, &mut buf, &mut cx)?;
    debug_assert_eq!(total, w_len);
    Ok(buf)
}

/// Encodes into a caller-supplied buffer of exactly [`encoded_len`] bytes.
/// No growth, no streaming. Returns the end offset.
pub fn encode_into(value: &Value, dst: &mut [u8], compat: bool) -> Result<usize> {
    let total = encoded_len(value, compat)?;
    ensure!(
        dst.len() == total,
        "destination holds {} bytes; value needs exactly {}",
        dst.len(),
        total
    );
    let mut cx = EncodeCx::new(compat);
    let mut slot = &mut dst[..];
    let w_len = write_value(value, &mut slot, &mut cx)?;
    debug_assert_eq!(total, w_len);
    Ok(w_len)
}

/* Size walk. Mirrors the write walk arm for arm: whatever would be written
 * is what gets counted, including compat degradation and proxy dedup. */

fn len_value(value: &Value, cx: &mut EncodeCx) -> Result<usize> {
    let bytes = match value {
        Value::Proxy(p) => return len_proxy(p, cx),
        Value::None => 1,
        Value::Bool(_) | Value::I8(_) | Value::U8(_) => 1 + 1,
        Value::I16(_) | Value::U16(_) => 1 + 2,
        Value::I32(_) | Value::U32(_) | Value::F32(_) => 1 + 4,
        Value::I64(_) | Value::U64(_) | Value::F64(_) | Value::C64(_) => 1 + 8,
        Value::C128(_) => 1 + 16,
        Value::Str(s) => len_str(s),
        Value::Int(i) => {
            if cx.compat() {
                len_str(&i.to_string())
            } else {
                1 + 4 + int_payload(i).len()
            }
        }
        Value::Uint(n) => {
            if cx.compat() {
                len_str(&n.to_string())
            } else {
                1 + 4 + nat_magnitude_le(n).len()
            }
        }
        Value::Tab(t) => len_entries(t.iter(), cx)?,
        Value::OTab(t) => len_entries(t.iter(), cx)?,
        Value::Tup(t) => len_seq(t.iter(), cx)?,
        Value::Arr(a) => len_seq(a.iter(), cx)?,
        Value::Pod(arr) => 1 + 1 + 4 + arr.payload_bytes(),
    };
    Ok(bytes)
}

fn len_str(s: &str) -> usize {
    1 + 4 + s.len()
}

fn len_entries<'a>(
    entries: impl Iterator<Item = (&'a Value, &'a Value)>,
    cx: &mut EncodeCx,
) -> Result<usize> {
    let mut bytes = 1 + 4;
    for (key, val) in entries {
        bytes += len_value(key, cx)? + len_value(val, cx)?;
    }
    Ok(bytes)
}

fn len_seq<'a>(members: impl Iterator<Item = &'a Value>, cx: &mut EncodeCx) -> Result<usize> {
    let mut bytes = 1 + 1 + 4;
    for member in members {
        bytes += len_value(member, cx)?;
    }
    Ok(bytes)
}

fn len_proxy(proxy: &Proxy, cx: &mut EncodeCx) -> Result<usize> {
    // The marker must be claimed before descending into the body: that is
    // what terminates the walk when the graph loops back onto this proxy.
    let (_, first) = cx.assign_marker(proxy.handle_id());
    let mut bytes = 1 + 4;
    if first {
        bytes += 3;
        let body = proxy.body();
        bytes += match &*body {
            ProxyBody::Tab(t) => len_entries(t.iter(), cx)?,
            ProxyBody::OTab(t) => len_entries(t.iter(), cx)?,
            ProxyBody::Tup(t) => len_seq(t.iter(), cx)?,
            ProxyBody::Arr(a) => len_seq(a.iter(), cx)?,
            ProxyBody::Pod(arr) => 1 + 1 + 4 + arr.payload_bytes(),
        };
    }
    Ok(bytes)
}

/* Write walk. */

fn write_value(value: &Value, w: &mut impl Write, cx: &mut EncodeCx) -> Result<usize> {
    let w_len = match value {
        Value::Proxy(p) => return write_proxy(p, w, cx),
        Value::None => write_tag(w, TypeTag::Empty)?,
        Value::Bool(x) => write_scalar(w, x)?,
        Value::I8(x) => write_scalar(w, x)?,
        Value::U8(x) => write_scalar(w, x)?,
        Value::I16(x) => write_scalar(w, x)?,
        Value::U16(x) => write_scalar(w, x)?,
        Value::I32(x) => write_scalar(w, x)?,
        Value::U32(x) => write_scalar(w, x)?,
        Value::I64(x) => write_scalar(w, x)?,
        Value::U64(x) => write_scalar(w, x)?,
        Value::F32(x) => write_scalar(w, x)?,
        Value::F64(x) => write_scalar(w, x)?,
        Value::C64(x) => write_scalar(w, x)?,
        Value::C128(x) => write_scalar(w, x)?,
        Value::Str(s) => write_payload(w, TypeTag::Str, s.as_bytes())?,
        Value::Int(i) => {
            if cx.compat() {
                write_payload(w, TypeTag::Str, i.to_string().as_bytes())?
            } else {
                write_payload(w, TypeTag::Int, &int_payload(i))?
            }
        }
        Value::Uint(n) => {
            if cx.compat() {
                write_payload(w, TypeTag::Str, n.to_string().as_bytes())?
            } else {
                write_payload(w, TypeTag::Uint, &nat_magnitude_le(n))?
            }
        }
        Value::Tab(t) => write_entries(w, TypeTag::Tab, t.len(), t.iter(), cx)?,
        Value::OTab(t) => {
            let tag = if cx.compat() { TypeTag::Tab } else { TypeTag::OTab };
            write_entries(w, tag, t.len(), t.iter(), cx)?
        }
        Value::Tup(t) => {
            let tag = if cx.compat() { TypeTag::Arr } else { TypeTag::Tup };
            write_seq(w, tag, t, cx)?
        }
        Value::Arr(a) => write_seq(w, TypeTag::Arr, a, cx)?,
        Value::Pod(arr) => write_pod(w, arr)?,
    };
    Ok(w_len)
}

fn write_tag(w: &mut impl Write, tag: TypeTag) -> Result<usize> {
    w.write_all(&[*TypeTagInt::from(tag)])?;
    Ok(1)
}

fn write_scalar<T: PodScalar>(w: &mut impl Write, x: &T) -> Result<usize> {
    let w_len = write_tag(w, T::TAG)?;
    x.write_le(w)?;
    Ok(w_len + T::WIDTH)
}

fn write_payload(w: &mut impl Write, tag: TypeTag, payload: &[u8]) -> Result<usize> {
    let mut w_len = write_tag(w, tag)?;
    let byte_len = ByteLen::from_payload(payload)?;
    w.write_all(&byte_len.to_le_bytes())?;
    w.write_all(payload)?;
    w_len += 4 + payload.len();
    Ok(w_len)
}

fn write_entries<'a>(
    w: &mut impl Write,
    tag: TypeTag,
    len: usize,
    entries: impl Iterator<Item = (&'a Value, &'a Value)>,
    cx: &mut EncodeCx,
) -> Result<usize> {
    let mut w_len = write_tag(w, tag)?;
    let count = ElemCount::from_len(len)?;
    w.write_all(&count.to_le_bytes())?;
    w_len += 4;
    for (key, val) in entries {
        w_len += write_value(key, w, cx)?;
        w_len += write_value(val, w, cx)?;
    }
    Ok(w_len)
}

fn write_seq(
    w: &mut impl Write,
    tag: TypeTag,
    members: &[Value],
    cx: &mut EncodeCx,
) -> Result<usize> {
    let mut w_len = write_tag(w, tag)?;
    w_len += write_tag(w, TypeTag::Empty)?;
    let count = ElemCount::from_len(members.len())?;
    w.write_all(&count.to_le_bytes())?;
    w_len += 4;
    for member in members {
        w_len += write_value(member, w, cx)?;
    }
    Ok(w_len)
}

fn write_pod(w: &mut impl Write, arr: &PodArr) -> Result<usize> {
    let mut w_len = write_tag(w, TypeTag::Arr)?;
    w_len += write_tag(w, arr.subtype())?;
    let count = ElemCount::from_len(arr.len())?;
    w.write_all(&count.to_le_bytes())?;
    w_len += 4;
    w_len += match arr {
        PodArr::I8(v) => write_pod_elems(w, v)?,
        PodArr::U8(v) => write_pod_elems(w, v)?,
        PodArr::I16(v) => write_pod_elems(w, v)?,
        PodArr::U16(v) => write_pod_elems(w, v)?,
        PodArr::I32(v) => write_pod_elems(w, v)?,
        PodArr::U32(v) => write_pod_elems(w, v)?,
        PodArr::I64(v) => write_pod_elems(w, v)?,
        PodArr::U64(v) => write_pod_elems(w, v)?,
        PodArr::Bool(v) => write_pod_elems(w, v)?,
        PodArr::F32(v) => write_pod_elems(w, v)?,
        PodArr::F64(v) => write_pod_elems(w, v)?,
        PodArr::C64(v) => write_pod_elems(w, v)?,
        PodArr::C128(v) => write_pod_elems(w, v)?,
    };
    Ok(w_len)
}

fn write_pod_elems<T: PodScalar>(w: &mut impl Write, elems: &[T]) -> io::Result<usize> {
    for elem in elems {
        elem.write_le(w)?;
    }
    Ok(elems.len() * T::WIDTH)
}

fn write_proxy(proxy: &Proxy, w: &mut impl Write, cx: &mut EncodeCx) -> Result<usize> {
    let (marker, first) = cx.assign_marker(proxy.handle_id());
    let mut w_len = write_tag(w, TypeTag::Proxy)?;
    w.write_all(&marker.to_le_bytes())?;
    w_len += 4;
    if !first {
        // Body already on the wire under this marker: the 5-byte
        // back-reference is the whole encoding.
        return Ok(w_len);
    }

    w.write_all(&[
        u8::from(proxy.adopt()),
        u8::from(proxy.lock_flag()),
        RESERVED_BYTE,
    ])?;
    w_len += 3;

    let body = proxy.body();
    w_len += match &*body {
        ProxyBody::Tab(t) => write_entries(w, TypeTag::Tab, t.len(), t.iter(), cx)?,
        ProxyBody::OTab(t) => {
            let tag = if cx.compat() { TypeTag::Tab } else { TypeTag::OTab };
            write_entries(w, tag, t.len(), t.iter(), cx)?
        }
        ProxyBody::Tup(t) => {
            let tag = if cx.compat() { TypeTag::Arr } else { TypeTag::Tup };
            write_seq(w, tag, t, cx)?
        }
        ProxyBody::Arr(a) => write_seq(w, TypeTag::Arr, a, cx)?,
        ProxyBody::Pod(arr) => write_pod(w, arr)?,
    };
    Ok(w_len)
}
