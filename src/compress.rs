use crate::context::{check_level, CompressionContext, DecompressionContext, DEFAULT_LEVEL};
use crate::dict::Dictionary;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

thread_local! {
    static ZSTD_CCTX: RefCell<Option<CompressionContext>> = const { RefCell::new(None) };
    static ZSTD_DCTX: RefCell<Option<DecompressionContext>> = const { RefCell::new(None) };
}

/// Run `f` on this thread's compression context, creating it on first use.
fn with_cctx<T>(f: impl FnOnce(&mut CompressionContext) -> Result<T>) -> Result<T> {
    ZSTD_CCTX.with_borrow_mut(|slot| {
        let ctx = match slot.take() {
            Some(ctx) => ctx,
            None => CompressionContext::new()?,
        };
        f(slot.insert(ctx))
    })
}

/// Run `f` on this thread's decompression context, creating it on first use.
fn with_dctx<T>(f: impl FnOnce(&mut DecompressionContext) -> Result<T>) -> Result<T> {
    ZSTD_DCTX.with_borrow_mut(|slot| {
        let ctx = match slot.take() {
            Some(ctx) => ctx,
            None => DecompressionContext::new()?,
        };
        f(slot.insert(ctx))
    })
}

/// Compression settings.
///
/// Either a plain compression level, or a dictionary that carries its own level. Operations run
/// on per-thread contexts, so a `Compress` can be used freely from any thread.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Compress {
    /// Compress at the given level with no dictionary.
    Level(i32),
    /// Compress using the provided dictionary object.
    Dict(Dictionary),
}

impl Compress {
    /// Plain compression at `level`, checked against the range libzstd accepts.
    pub fn new_level(level: i32) -> Result<Self> {
        check_level(level)?;
        Ok(Compress::Level(level))
    }

    /// Dictionary compression with `dict` built for `level`.
    pub fn new_dict(level: i32, dict: Vec<u8>) -> Result<Self> {
        Ok(Compress::Dict(Dictionary::new(dict, level)?))
    }

    pub fn level(&self) -> i32 {
        match self {
            Compress::Level(level) => *level,
            Compress::Dict(dict) => dict.level(),
        }
    }

    pub fn dictionary(&self) -> Option<&Dictionary> {
        match self {
            Compress::Level(_) => None,
            Compress::Dict(dict) => Some(dict),
        }
    }

    /// Compress `src` into a single frame, recording its size in the frame header.
    pub fn compress(&self, src: &[u8]) -> Result<Vec<u8>> {
        let level = self.level();
        let cdict = self.dictionary().map(Dictionary::compression);
        with_cctx(|ctx| ctx.compress(src, level, cdict))
    }

    /// Decompress a frame made by [`compress`](Self::compress), failing if it would produce more
    /// than `max_size` bytes.
    pub fn decompress(&self, src: &[u8], max_size: usize) -> Result<Vec<u8>> {
        let ddict = self.dictionary().map(Dictionary::decompression);
        with_dctx(|ctx| ctx.decompress_limited(src, max_size, ddict))
    }
}

impl std::default::Default for Compress {
    fn default() -> Self {
        Compress::Level(DEFAULT_LEVEL)
    }
}
