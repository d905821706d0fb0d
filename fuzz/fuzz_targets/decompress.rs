#![no_main]
use libfuzzer_sys::fuzz_target;
use zstd_handles::DecompressionContext;

fuzz_target!(|data: &[u8]| {
    let mut dctx = DecompressionContext::new().unwrap();
    let _ = dctx.decompress_limited(data, 1 << 20, None);
    let _ = dctx.decompress(data, None, None);
    let _ = dctx.decompress(data, Some(data.len()), None);
});
