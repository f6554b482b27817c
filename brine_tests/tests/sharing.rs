use anyhow::Result;
use brine_pool::StreamingPool;
use brine_types::serde::{decode, encode, encoded_len};
use brine_types::types::{PodArr, Proxy, ProxyBody, Table, Value};
use std::thread;

/// Two positions holding the identical handle before encoding hold the
/// identical (not merely equal) handle after a round trip, and a mutation
/// through one is visible through the other.
pub fn test_aliasing_survives_roundtrip() -> Result<()> {
    let mut tab = Table::new();
    tab.insert(Value::from("n"), Value::I64(0));
    let shared = Proxy::new_locked(ProxyBody::Tab(tab));

    let mut outer = Table::new();
    outer.insert(Value::from("left"), Value::Proxy(shared.clone()));
    outer.insert(Value::from("right"), Value::Proxy(shared.clone()));
    let composite = Value::Tab(outer);

    // Dedup in bytes: whichever entry comes first carries the one full
    // body; the other is a 5-byte back-reference.
    let solo_proxy = encoded_len(&Value::Proxy(shared.clone()), false)?;
    let keys_len = encoded_len(&Value::from("left"), false)? + encoded_len(&Value::from("right"), false)?;
    let expected = 5 + keys_len + solo_proxy + 5;
    assert_eq!(expected, encoded_len(&composite, false)?);

    let (decoded, _) = decode(&encode(&composite, false)?, false)?;
    let decoded_tab = decoded.as_tab().unwrap();
    let left = decoded_tab
        .get(&Value::from("left"))
        .and_then(Value::as_proxy)
        .unwrap();
    let right = decoded_tab
        .get(&Value::from("right"))
        .and_then(Value::as_proxy)
        .unwrap();
    assert!(left.ptr_eq(right));
    assert!(!left.ptr_eq(&shared));

    match &mut *left.body() {
        ProxyBody::Tab(t) => {
            t.insert(Value::from("n"), Value::I64(42));
        }
        other => panic!("unexpected body {other:?}"),
    }
    match &*right.body() {
        ProxyBody::Tab(t) => assert_eq!(Some(&Value::I64(42)), t.get(&Value::from("n"))),
        other => panic!("unexpected body {other:?}"),
    }
    Ok(())
}

/// Shared-mode proxies reserve pool storage at construction and return it
/// when the last adopting handle drops.
pub fn test_shared_proxies_release_pool_storage() -> Result<()> {
    let pool = StreamingPool::with_capacity(16 * 1024, 8)?;
    assert!(pool.is_pristine());

    {
        let a = Proxy::new_shared(ProxyBody::Pod(PodArr::I64(vec![1; 64])), &pool)?;
        let b = Proxy::new_shared(ProxyBody::Pod(PodArr::F64(vec![0.5; 32])), &pool)?;
        assert!(!pool.is_pristine());
        assert!(a.is_arena_backed() && b.is_arena_backed());

        // A clone shares the control block, so storage stays put until the
        // last handle goes.
        let a2 = a.clone();
        drop(a);
        assert!(!pool.is_pristine());
        assert_eq!(1, a2.ref_count());
        drop(a2);
        drop(b);
    }
    assert!(pool.is_pristine());

    // A shared proxy round-trips by value; the reconstructed handle is
    // heap-backed on the reading side (the stream does not carry the pool).
    let original = Proxy::new_shared(ProxyBody::Pod(PodArr::U8(vec![7; 16])), &pool)?;
    let (decoded, _) = decode(&encode(&Value::Proxy(original.clone()), false)?, false)?;
    let reconstructed = decoded.as_proxy().unwrap();
    assert!(!reconstructed.is_arena_backed());
    assert_eq!(*original.body(), *reconstructed.body());
    drop(original);
    assert!(pool.is_pristine());
    Ok(())
}

/// The `lock` flag's promise: concurrent mutators through clones of one
/// handle serialize on the proxy's own mutex (not the pool lock).
pub fn test_locked_proxy_across_threads() -> Result<()> {
    let proxy = Proxy::new_locked(ProxyBody::Tab(Table::new()));
    thread::scope(|scope| {
        for t in 0..4u8 {
            let proxy = proxy.clone();
            scope.spawn(move || {
                for i in 0..50u8 {
                    match &mut *proxy.body() {
                        ProxyBody::Tab(tab) => {
                            tab.insert(
                                Value::Tup(vec![Value::U8(t), Value::U8(i)].into()),
                                Value::Bool(true),
                            );
                        }
                        other => panic!("unexpected body {other:?}"),
                    }
                }
            });
        }
    });
    match &*proxy.body() {
        ProxyBody::Tab(tab) => assert_eq!(4 * 50, tab.len()),
        other => panic!("unexpected body {other:?}"),
    }
    Ok(())
}
