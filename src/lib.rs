//! Safe handles over libzstd's one-shot API.
//!
//! This crate manages the boundary between Rust and the native zstd library: creating and freeing
//! compression/decompression contexts and digested dictionaries, sizing the buffers handed across,
//! and turning libzstd's in-band error codes into typed [`Error`]s. The compression itself is
//! entirely libzstd's; the compressed bytes are opaque here.
//!
//! - [`CompressionContext`] and [`DecompressionContext`] own native working state and run single
//!   frame compress/decompress calls, optionally with a borrowed dictionary.
//! - [`CompressionDictionary`], [`DecompressionDictionary`], and the paired [`Dictionary`] are
//!   immutable once built and may be shared between threads.
//! - [`train_dictionary`] builds dictionary bytes from sample data.
//! - [`Compress`] is a serializable setting that runs on lazily created per-thread contexts.
//!
//! Every native object is freed exactly once, when it is closed or dropped, whichever comes
//! first. Using a closed object returns [`Error::UseAfterClose`].
//!
//! ```
//! use zstd_handles::{CompressionContext, DecompressionContext};
//!
//! let mut cctx = CompressionContext::new()?;
//! let mut dctx = DecompressionContext::new()?;
//! let compressed = cctx.compress(b"hello world", 3, None)?;
//! let decompressed = dctx.decompress(&compressed, Some(11), None)?;
//! assert_eq!(decompressed, b"hello world");
//! # Ok::<(), zstd_handles::Error>(())
//! ```

mod compress;
mod context;
mod dict;
mod error;
mod ffi;
mod handle;
mod status;
mod train;

pub use compress::Compress;
pub use context::{
    compress_bound, frame_content_size, max_level, min_level, CompressionContext,
    DecompressionContext, DEFAULT_LEVEL, MIN_LEVEL,
};
pub use dict::{CompressionDictionary, DecompressionDictionary, Dictionary};
pub use error::{Error, Operation, Result};
pub use handle::HandleKind;
pub use train::train_dictionary;
