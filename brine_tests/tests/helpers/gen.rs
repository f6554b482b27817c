use brine_types::types::{OrderedTable, PodArr, Table, Tuple, Value};
use malachite::{Integer, Natural};
use num_complex::Complex;
use rand::prelude::*;

pub fn gen_str_key(rng: &mut impl Rng) -> Value {
    let len = rng.gen_range(0..12);
    let s = (0..len)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect::<String>();
    Value::Str(s)
}

pub fn gen_scalar(rng: &mut impl Rng) -> Value {
    match rng.gen_range(0..16) {
        0 => Value::None,
        1 => Value::Bool(rng.gen()),
        2 => Value::I8(rng.gen()),
        3 => Value::U8(rng.gen()),
        4 => Value::I16(rng.gen()),
        5 => Value::U16(rng.gen()),
        6 => Value::I32(rng.gen()),
        7 => Value::U32(rng.gen()),
        8 => Value::I64(rng.gen()),
        9 => Value::U64(rng.gen()),
        10 => Value::F32(rng.gen()),
        11 => Value::F64(rng.gen()),
        12 => Value::C64(Complex::new(rng.gen(), rng.gen())),
        13 => Value::C128(Complex::new(rng.gen(), rng.gen())),
        14 => Value::Int(Integer::from(rng.gen::<i128>()) * Integer::from(rng.gen::<i64>())),
        _ => Value::Uint(Natural::from(rng.gen::<u128>())),
    }
}

pub fn gen_pod(rng: &mut impl Rng) -> PodArr {
    let len = rng.gen_range(0..20);
    match rng.gen_range(0..6) {
        0 => PodArr::U8((0..len).map(|_| rng.gen()).collect()),
        1 => PodArr::I16((0..len).map(|_| rng.gen()).collect()),
        2 => PodArr::I64((0..len).map(|_| rng.gen()).collect()),
        3 => PodArr::Bool((0..len).map(|_| rng.gen()).collect()),
        4 => PodArr::F64((0..len).map(|_| rng.gen()).collect()),
        _ => PodArr::C64((0..len).map(|_| Complex::new(rng.gen(), rng.gen())).collect()),
    }
}

/// A random value tree, at most `depth` container levels deep.
pub fn gen_value(rng: &mut impl Rng, depth: usize) -> Value {
    if depth == 0 {
        return gen_scalar(rng);
    }
    match rng.gen_range(0..8) {
        0 => {
            let mut tab = Table::new();
            for _ in 0..rng.gen_range(0..5) {
                tab.insert(gen_str_key(rng), gen_value(rng, depth - 1));
            }
            Value::Tab(tab)
        }
        1 => {
            let mut otab = OrderedTable::new();
            for _ in 0..rng.gen_range(0..5) {
                otab.insert(gen_str_key(rng), gen_value(rng, depth - 1));
            }
            Value::OTab(otab)
        }
        2 => Value::Tup(Tuple::new(
            (0..rng.gen_range(0..5))
                .map(|_| gen_value(rng, depth - 1))
                .collect(),
        )),
        3 => Value::Arr(
            (0..rng.gen_range(0..5))
                .map(|_| gen_value(rng, depth - 1))
                .collect(),
        ),
        4 => Value::Pod(gen_pod(rng)),
        5 => Value::Str(format!("s{}", rng.gen::<u32>())),
        _ => gen_scalar(rng),
    }
}

/// The shape a round trip must reproduce when `compat` is in play.
pub fn apply_compat(v: &Value) -> Value {
    match v {
        Value::OTab(t) => Value::Tab(
            t.iter()
                .map(|(k, v)| (apply_compat(k), apply_compat(v)))
                .collect(),
        ),
        Value::Tab(t) => Value::Tab(
            t.iter()
                .map(|(k, v)| (apply_compat(k), apply_compat(v)))
                .collect(),
        ),
        Value::Tup(t) => Value::Arr(t.iter().map(apply_compat).collect()),
        Value::Arr(a) => Value::Arr(a.iter().map(apply_compat).collect()),
        Value::Int(i) => Value::Str(i.to_string()),
        Value::Uint(n) => Value::Str(n.to_string()),
        other => other.clone(),
    }
}
