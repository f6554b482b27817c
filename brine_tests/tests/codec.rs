use crate::helpers::gen::{apply_compat, gen_value};
use anyhow::Result;
use brine_types::serde::{decode, encode, encoded_len};
use rand::prelude::*;

pub fn test_randomized_roundtrips() -> Result<()> {
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let value = gen_value(&mut rng, 4);
        for compat in [false, true] {
            let total = encoded_len(&value, compat)?;
            let serialized = encode(&value, compat)?;
            assert_eq!(total, serialized.len(), "\n{value:?}\n");

            let (decoded, r_len) = decode(&serialized, compat)?;
            assert_eq!(total, r_len, "decode must consume exactly encoded_len");

            let expected = if compat {
                apply_compat(&value)
            } else {
                value.clone()
            };
            assert_eq!(expected, decoded, "\n{value:?}\n{serialized:?}\n");
        }
    }
    Ok(())
}

/// Narrowing is applied identically no matter which side asks for it: a
/// stream produced in compat mode decodes the same with or without the
/// reader's compat flag.
pub fn test_compat_narrowing_is_one_way() -> Result<()> {
    let mut rng = rand::thread_rng();
    for _ in 0..100 {
        let value = gen_value(&mut rng, 3);
        let serialized = encode(&value, true)?;
        let (plain_reader, _) = decode(&serialized, false)?;
        let (compat_reader, _) = decode(&serialized, true)?;
        assert_eq!(plain_reader, compat_reader, "\n{value:?}\n");
        assert_eq!(apply_compat(&value), plain_reader);
    }
    Ok(())
}
