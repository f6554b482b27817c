use anyhow::Result;

mod codec;
mod helpers;
mod pool;
mod sharing;

#[test]
fn integration_codec_roundtrips() -> Result<()> {
    codec::test_randomized_roundtrips()?;
    codec::test_compat_narrowing_is_one_way()?;
    Ok(())
}

#[test]
fn integration_sharing() -> Result<()> {
    sharing::test_aliasing_survives_roundtrip()?;
    sharing::test_shared_proxies_release_pool_storage()?;
    sharing::test_locked_proxy_across_threads()?;
    Ok(())
}

#[test]
fn integration_pool() -> Result<()> {
    pool::test_pristine_under_any_free_order()?;
    pool::test_alignment_sweep()?;
    pool::test_equal_blocks_freed_b_a_c()?;
    pool::test_double_free_is_an_error()?;
    pool::test_deferred_teardown_with_proxies()?;
    Ok(())
}
