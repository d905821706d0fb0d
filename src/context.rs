//! One-shot compression and decompression contexts.
//!
//! A context owns native working memory that libzstd reuses between calls, so keeping one around
//! for many small payloads is much cheaper than creating a new one each time. Contexts are `Send`
//! but not `Sync`: every operation takes `&mut self`, so a context can move between threads but
//! is only ever driven by one of them at a time. Use one context per thread, or put it behind a
//! lock.
//!
//! Each operation works on a single zstd frame. The output buffer is allocated here and sized
//! from [`compress_bound`] for compression, or from the expected output size for decompression.

use crate::dict::{CompressionDictionary, DecompressionDictionary};
use crate::error::{Error, Operation, Result};
use crate::handle::{CCtxKind, DCtxKind, ResourceHandle};
use crate::{ffi, status};
use log::trace;
use std::ffi::c_void;
use std::sync::OnceLock;

/// The most negative ("fastest") level libzstd accepts, matching `ZSTD_minCLevel()`.
pub const MIN_LEVEL: i32 = -(1 << 17);

/// The compression level used when nothing else is specified.
pub const DEFAULT_LEVEL: i32 = 3;

/// The strongest compression level supported by the linked libzstd. Read once per process.
pub fn max_level() -> i32 {
    static MAX_LEVEL: OnceLock<i32> = OnceLock::new();
    // SAFETY: no arguments, no side effects.
    *MAX_LEVEL.get_or_init(|| unsafe { ffi::ZSTD_maxCLevel() })
}

/// The most negative level the linked libzstd reports it accepts.
pub fn min_level() -> i32 {
    // SAFETY: no arguments, no side effects.
    unsafe { ffi::ZSTD_minCLevel() }
}

/// Worst-case compressed size for an input of `src_len` bytes.
pub fn compress_bound(src_len: usize) -> usize {
    // SAFETY: pure arithmetic on the argument.
    unsafe { ffi::ZSTD_compressBound(src_len) }
}

/// Read the decompressed size recorded in a frame header. Returns `Ok(None)` if the frame was
/// written without one.
pub fn frame_content_size(src: &[u8]) -> Result<Option<u64>> {
    // SAFETY: libzstd reads at most `src.len()` bytes from `src`.
    let size = unsafe { ffi::ZSTD_getFrameContentSize(src.as_ptr() as *const c_void, src.len()) };
    match size {
        ffi::CONTENTSIZE_UNKNOWN => Ok(None),
        ffi::CONTENTSIZE_ERROR => Err(Error::OperationFailed {
            operation: Operation::FrameHeader,
            message: "Invalid or truncated frame header".into(),
        }),
        size => Ok(Some(size)),
    }
}

pub(crate) fn check_level(level: i32) -> Result<()> {
    let max = max_level();
    if (MIN_LEVEL..=max).contains(&level) {
        Ok(())
    } else {
        Err(Error::InvalidLevel {
            level,
            min: MIN_LEVEL,
            max,
        })
    }
}

/// A reusable native compression context.
#[derive(Debug)]
pub struct CompressionContext {
    handle: ResourceHandle<CCtxKind>,
}

impl CompressionContext {
    pub fn new() -> Result<Self> {
        // SAFETY: plain constructor; ownership passes to the handle.
        let handle = ResourceHandle::<CCtxKind>::create(|| unsafe { ffi::ZSTD_createCCtx() })?;
        Ok(Self { handle })
    }

    /// Adopt a context created elsewhere. If `owned` is false, it is never freed by this wrapper.
    ///
    /// # Safety
    /// `ptr` must be a live `ZSTD_CCtx` that nothing else uses while this wrapper is open, and if
    /// `owned` is true, nothing else may free it.
    pub unsafe fn from_raw(ptr: *mut zstd_safe::zstd_sys::ZSTD_CCtx, owned: bool) -> Self {
        Self {
            handle: ResourceHandle::wrap(ptr, owned),
        }
    }

    /// Compress `source` into a single frame.
    ///
    /// `level` must lie within [`MIN_LEVEL`]`..=`[`max_level()`]. When a dictionary is supplied,
    /// libzstd compresses at the level the dictionary was built with; `level` is still checked.
    pub fn compress(
        &mut self,
        source: &[u8],
        level: i32,
        dictionary: Option<&CompressionDictionary>,
    ) -> Result<Vec<u8>> {
        let cctx = self.handle.as_ptr()?;
        check_level(level)?;
        let cdict = dictionary.map(CompressionDictionary::as_ptr).transpose()?;

        let capacity = compress_bound(source.len());
        let mut buf: Vec<u8> = Vec::with_capacity(capacity);
        let dst = buf.spare_capacity_mut().as_mut_ptr() as *mut c_void;
        let src = source.as_ptr() as *const c_void;

        // SAFETY: `dst` has room for `capacity` bytes and `src` for `source.len()`. The context
        // and dictionary are live for the duration of the call.
        let code = unsafe {
            match cdict {
                None => ffi::ZSTD_compressCCtx(cctx, dst, capacity, src, source.len(), level),
                Some(cdict) => {
                    ffi::ZSTD_compress_usingCDict(cctx, dst, capacity, src, source.len(), cdict)
                }
            }
        };
        let len = status::codec_result(code).map_err(|message| Error::OperationFailed {
            operation: Operation::Compress,
            message,
        })?;

        // SAFETY: libzstd wrote exactly `len` bytes, and never reports more than `capacity`.
        unsafe { buf.set_len(len) };
        trace!(
            "compressed {} bytes to {} (level {}, dictionary: {})",
            source.len(),
            len,
            level,
            cdict.is_some()
        );
        Ok(buf)
    }

    /// Free the native context. Further operations fail with [`Error::UseAfterClose`].
    pub fn close(&mut self) {
        self.handle.release();
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_released()
    }

    /// False for contexts adopted with `from_raw(_, false)`.
    pub fn is_owned(&self) -> bool {
        self.handle.is_owned()
    }
}

/// A reusable native decompression context.
#[derive(Debug)]
pub struct DecompressionContext {
    handle: ResourceHandle<DCtxKind>,
}

impl DecompressionContext {
    pub fn new() -> Result<Self> {
        // SAFETY: plain constructor; ownership passes to the handle.
        let handle = ResourceHandle::<DCtxKind>::create(|| unsafe { ffi::ZSTD_createDCtx() })?;
        Ok(Self { handle })
    }

    /// Adopt a context created elsewhere. If `owned` is false, it is never freed by this wrapper.
    ///
    /// # Safety
    /// `ptr` must be a live `ZSTD_DCtx` that nothing else uses while this wrapper is open, and if
    /// `owned` is true, nothing else may free it.
    pub unsafe fn from_raw(ptr: *mut zstd_safe::zstd_sys::ZSTD_DCtx, owned: bool) -> Self {
        Self {
            handle: ResourceHandle::wrap(ptr, owned),
        }
    }

    /// Decompress a single frame.
    ///
    /// If `known_output_size` is `None`, the size is read from the frame header. Frames written
    /// without a content size can't be sized that way and fail with
    /// [`Error::ContentSizeUnknown`]; for those the caller must pass the size. A size that
    /// disagrees with the header, or with what libzstd actually produced, fails with
    /// [`Error::OutputSizeMismatch`].
    ///
    /// The full output buffer is allocated up front. For untrusted input, prefer
    /// [`decompress_limited`](Self::decompress_limited).
    pub fn decompress(
        &mut self,
        source: &[u8],
        known_output_size: Option<usize>,
        dictionary: Option<&DecompressionDictionary>,
    ) -> Result<Vec<u8>> {
        let dctx = self.handle.as_ptr()?;
        let ddict = dictionary.map(DecompressionDictionary::as_ptr).transpose()?;

        let declared = frame_content_size(source);
        let expected = match known_output_size {
            Some(expected) => {
                // A broken header is left for libzstd to report.
                if let Ok(Some(declared)) = declared {
                    if declared != expected as u64 {
                        return Err(Error::OutputSizeMismatch {
                            expected,
                            actual: Some(usize::try_from(declared).unwrap_or(usize::MAX)),
                        });
                    }
                }
                expected
            }
            None => {
                let declared = declared?.ok_or(Error::ContentSizeUnknown)?;
                usize::try_from(declared).map_err(|_| Error::SizeLimitExceeded {
                    max: usize::MAX,
                    actual: declared,
                })?
            }
        };

        // The size may come straight from an untrusted header.
        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(expected)
            .map_err(|_| Error::OutOfMemory {
                requested: expected,
            })?;
        let dst = buf.spare_capacity_mut().as_mut_ptr() as *mut c_void;
        let src = source.as_ptr() as *const c_void;

        // SAFETY: `dst` has room for `expected` bytes and `src` for `source.len()`. The context
        // and dictionary are live for the duration of the call.
        let code = unsafe {
            match ddict {
                None => ffi::ZSTD_decompressDCtx(dctx, dst, expected, src, source.len()),
                Some(ddict) => {
                    ffi::ZSTD_decompress_usingDDict(dctx, dst, expected, src, source.len(), ddict)
                }
            }
        };
        let len = match status::codec_result(code) {
            Ok(len) => len,
            // Only reachable for frames without a recorded size; otherwise the header check
            // above already caught the mismatch.
            Err(_) if status::is_dst_too_small(code) => {
                return Err(Error::OutputSizeMismatch {
                    expected,
                    actual: None,
                })
            }
            Err(message) => {
                return Err(Error::OperationFailed {
                    operation: Operation::Decompress,
                    message,
                })
            }
        };
        if len != expected {
            return Err(Error::OutputSizeMismatch {
                expected,
                actual: Some(len),
            });
        }

        // SAFETY: libzstd wrote exactly `len` bytes, which is the buffer's capacity request.
        unsafe { buf.set_len(len) };
        trace!(
            "decompressed {} bytes to {} (dictionary: {})",
            source.len(),
            len,
            ddict.is_some()
        );
        Ok(buf)
    }

    /// Decompress a single frame whose header records its size, refusing to allocate more than
    /// `max_output_size` bytes.
    pub fn decompress_limited(
        &mut self,
        source: &[u8],
        max_output_size: usize,
        dictionary: Option<&DecompressionDictionary>,
    ) -> Result<Vec<u8>> {
        self.handle.as_ptr()?;
        let declared = frame_content_size(source)?.ok_or(Error::ContentSizeUnknown)?;
        if declared > max_output_size as u64 {
            return Err(Error::SizeLimitExceeded {
                max: max_output_size,
                actual: declared,
            });
        }
        self.decompress(source, Some(declared as usize), dictionary)
    }

    /// Free the native context. Further operations fail with [`Error::UseAfterClose`].
    pub fn close(&mut self) {
        self.handle.release();
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_released()
    }

    /// False for contexts adopted with `from_raw(_, false)`.
    pub fn is_owned(&self) -> bool {
        self.handle.is_owned()
    }
}
