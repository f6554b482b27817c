use super::{int_from_payload, nat_from_magnitude_le};
use crate::serde::{ByteLen, CodecError, DecodeCx, ElemCount, Marker, TypeTag, TypeTagInt};
use crate::types::{OrderedTable, PodArr, PodScalar, Proxy, ProxyBody, Table, Tuple, Value};
use anyhow::{anyhow, Result};
use std::io::{self, Cursor, Read};

/// Decodes one value from the front of `buf`, returning it with the end
/// offset: exactly the bytes [`super::encode`] wrote for the (possibly
/// degraded) structure.
///
/// The caller vouches for well-formedness: the format itself carries no
/// guards, and a short buffer surfaces as an `UnexpectedEof` read error.
pub fn decode(buf: &[u8], compat: bool) -> Result<(Value, usize)> {
    let mut r = Cursor::new(buf);
    let mut cx = DecodeCx::new(compat);
    let (r_len, value) = read_value(&mut r, &mut cx)?;
    Ok((value, r_len))
}

fn read_value<R: Read>(r: &mut R, cx: &mut DecodeCx) -> Result<(usize, Value)> {
    let (mut r_len, tag_int) = TypeTagInt::deser(r).map_err(|e| anyhow!(e))?;
    let tag = TypeTag::try_from(tag_int)?;
    let value = match tag {
        TypeTag::Empty => Value::None,
        TypeTag::Bool => read_scalar(r, &mut r_len, Value::Bool)?,
        TypeTag::I8 => read_scalar(r, &mut r_len, Value::I8)?,
        TypeTag::U8 => read_scalar(r, &mut r_len, Value::U8)?,
        TypeTag::I16 => read_scalar(r, &mut r_len, Value::I16)?,
        TypeTag::U16 => read_scalar(r, &mut r_len, Value::U16)?,
        TypeTag::I32 => read_scalar(r, &mut r_len, Value::I32)?,
        TypeTag::U32 => read_scalar(r, &mut r_len, Value::U32)?,
        TypeTag::I64 => read_scalar(r, &mut r_len, Value::I64)?,
        TypeTag::U64 => read_scalar(r, &mut r_len, Value::U64)?,
        TypeTag::F32 => read_scalar(r, &mut r_len, Value::F32)?,
        TypeTag::F64 => read_scalar(r, &mut r_len, Value::F64)?,
        TypeTag::C64 => read_scalar(r, &mut r_len, Value::C64)?,
        TypeTag::C128 => read_scalar(r, &mut r_len, Value::C128)?,
        TypeTag::Str => {
            let payload = read_payload(r, &mut r_len)?;
            Value::Str(String::from_utf8(payload)?)
        }
        TypeTag::Int => {
            let payload = read_payload(r, &mut r_len)?;
            let int = int_from_payload(&payload)?;
            if cx.compat() {
                Value::Str(int.to_string())
            } else {
                Value::Int(int)
            }
        }
        TypeTag::Uint => {
            let payload = read_payload(r, &mut r_len)?;
            let nat = nat_from_magnitude_le(&payload);
            if cx.compat() {
                Value::Str(nat.to_string())
            } else {
                Value::Uint(nat)
            }
        }
        TypeTag::Tab => Value::Tab(read_tab_body(r, cx, &mut r_len)?),
        TypeTag::OTab => {
            // Compat narrows: an ordered-table tag reconstructs a plain
            // table, same as if the writer had degraded it.
            if cx.compat() {
                Value::Tab(read_tab_body(r, cx, &mut r_len)?)
            } else {
                Value::OTab(read_otab_body(r, cx, &mut r_len)?)
            }
        }
        TypeTag::Tup | TypeTag::Arr => read_array_like(tag, r, cx, &mut r_len)?,
        TypeTag::Proxy => read_proxy(r, cx, &mut r_len)?,
    };
    Ok((r_len, value))
}

fn read_scalar<T: PodScalar, R: Read>(
    r: &mut R,
    r_len: &mut usize,
    wrap: impl Fn(T) -> Value,
) -> Result<Value> {
    let x = T::read_le(r)?;
    *r_len += T::WIDTH;
    Ok(wrap(x))
}

fn read_payload<R: Read>(r: &mut R, r_len: &mut usize) -> Result<Vec<u8>> {
    let (l, byte_len) = ByteLen::deser(r)?;
    *r_len += l;
    let mut payload = vec![0u8; *byte_len as usize];
    r.read_exact(&mut payload)?;
    *r_len += payload.len();
    Ok(payload)
}

fn read_tab_body<R: Read>(r: &mut R, cx: &mut DecodeCx, r_len: &mut usize) -> Result<Table> {
    let (l, count) = ElemCount::deser(r)?;
    *r_len += l;
    let mut tab = Table::new();
    for _ in 0..*count {
        let (kl, key) = read_value(r, cx)?;
        *r_len += kl;
        let (vl, val) = read_value(r, cx)?;
        *r_len += vl;
        tab.insert(key, val);
    }
    Ok(tab)
}

fn read_otab_body<R: Read>(
    r: &mut R,
    cx: &mut DecodeCx,
    r_len: &mut usize,
) -> Result<OrderedTable> {
    let (l, count) = ElemCount::deser(r)?;
    *r_len += l;
    let mut otab = OrderedTable::new();
    for _ in 0..*count {
        let (kl, key) = read_value(r, cx)?;
        *r_len += kl;
        let (vl, val) = read_value(r, cx)?;
        *r_len += vl;
        otab.insert(key, val);
    }
    Ok(otab)
}

/// Tuples and arrays share one wire shape; the subtype byte picks between
/// any-value elements and a packed scalar payload.
fn read_array_like<R: Read>(
    tag: TypeTag,
    r: &mut R,
    cx: &mut DecodeCx,
    r_len: &mut usize,
) -> Result<Value> {
    let (sl, sub_int) = TypeTagInt::deser(r).map_err(|e| anyhow!(e))?;
    *r_len += sl;
    let sub = TypeTag::try_from(sub_int)?;
    let (cl, count) = ElemCount::deser(r)?;
    *r_len += cl;
    let len = *count as usize;

    if sub == TypeTag::Empty {
        let mut members = Vec::with_capacity(len);
        for _ in 0..len {
            let (ml, member) = read_value(r, cx)?;
            *r_len += ml;
            members.push(member);
        }
        // Compat narrows the tuple tag down to a plain array.
        if tag == TypeTag::Tup && !cx.compat() {
            Ok(Value::Tup(Tuple::new(members)))
        } else {
            Ok(Value::Arr(members))
        }
    } else {
        let arr = read_pod_body(sub, len, r, r_len)?;
        Ok(Value::Pod(arr))
    }
}

fn read_pod_body<R: Read>(
    sub: TypeTag,
    len: usize,
    r: &mut R,
    r_len: &mut usize,
) -> Result<PodArr> {
    let arr = match sub {
        TypeTag::I8 => PodArr::I8(read_pod_elems(r, len, r_len)?),
        TypeTag::U8 => PodArr::U8(read_pod_elems(r, len, r_len)?),
        TypeTag::I16 => PodArr::I16(read_pod_elems(r, len, r_len)?),
        TypeTag::U16 => PodArr::U16(read_pod_elems(r, len, r_len)?),
        TypeTag::I32 => PodArr::I32(read_pod_elems(r, len, r_len)?),
        TypeTag::U32 => PodArr::U32(read_pod_elems(r, len, r_len)?),
        TypeTag::I64 => PodArr::I64(read_pod_elems(r, len, r_len)?),
        TypeTag::U64 => PodArr::U64(read_pod_elems(r, len, r_len)?),
        TypeTag::Bool => PodArr::Bool(read_pod_elems(r, len, r_len)?),
        TypeTag::F32 => PodArr::F32(read_pod_elems(r, len, r_len)?),
        TypeTag::F64 => PodArr::F64(read_pod_elems(r, len, r_len)?),
        TypeTag::C64 => PodArr::C64(read_pod_elems(r, len, r_len)?),
        TypeTag::C128 => PodArr::C128(read_pod_elems(r, len, r_len)?),
        other => return Err(CodecError::UnsupportedPodSubtype(other).into()),
    };
    Ok(arr)
}

fn read_pod_elems<T: PodScalar, R: Read>(
    r: &mut R,
    len: usize,
    r_len: &mut usize,
) -> io::Result<Vec<T>> {
    let mut elems = Vec::with_capacity(len);
    for _ in 0..len {
        elems.push(T::read_le(r)?);
    }
    *r_len += len * T::WIDTH;
    Ok(elems)
}

fn read_proxy<R: Read>(r: &mut R, cx: &mut DecodeCx, r_len: &mut usize) -> Result<Value> {
    let (ml, marker) = Marker::deser(r)?;
    *r_len += ml;

    // A marker seen before resolves to the same handle: shared, not copied.
    if let Some(existing) = cx.lookup(marker) {
        return Ok(Value::Proxy(existing));
    }

    let mut flags = [0u8; 3];
    r.read_exact(&mut flags)?;
    *r_len += flags.len();
    let [adopt, lock, _reserved] = flags;

    let (bl, body_value) = read_value(r, cx)?;
    *r_len += bl;
    let body = match body_value {
        Value::Tab(t) => ProxyBody::Tab(t),
        Value::OTab(t) => ProxyBody::OTab(t),
        Value::Tup(t) => ProxyBody::Tup(t),
        Value::Arr(a) => ProxyBody::Arr(a),
        Value::Pod(arr) => ProxyBody::Pod(arr),
        other => return Err(CodecError::UnsupportedProxyBody(other.tag()).into()),
    };

    let proxy = Proxy::with_flags(body, adopt != 0, lock != 0);
    cx.record(marker, proxy.clone());
    Ok(Value::Proxy(proxy))
}
