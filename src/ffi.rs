//! Raw entry points into libzstd.
//!
//! Everything here is a plain re-export of the `zstd-sys` declarations that the rest of the crate
//! calls. Nothing in this module checks arguments or results; see [`crate::status`] for that.

pub(crate) use zstd_safe::zstd_sys::{
    // Context lifecycle
    ZSTD_CCtx, ZSTD_DCtx, ZSTD_createCCtx, ZSTD_createDCtx, ZSTD_freeCCtx, ZSTD_freeDCtx,
    // One-shot operation
    ZSTD_compressCCtx, ZSTD_decompressDCtx,
    // Dictionary lifecycle and use
    ZSTD_CDict, ZSTD_DDict, ZSTD_compress_usingCDict, ZSTD_createCDict, ZSTD_createDDict,
    ZSTD_decompress_usingDDict, ZSTD_freeCDict, ZSTD_freeDDict,
    // Introspection
    ZSTD_ErrorCode, ZSTD_compressBound, ZSTD_getErrorCode, ZSTD_getErrorName,
    ZSTD_getFrameContentSize, ZSTD_isError, ZSTD_maxCLevel, ZSTD_minCLevel,
    // Training
    ZDICT_getErrorName, ZDICT_isError, ZDICT_trainFromBuffer,
};

// Returned by `ZSTD_getFrameContentSize` when the header omits the size, or is invalid.
pub(crate) use zstd_safe::{CONTENTSIZE_ERROR, CONTENTSIZE_UNKNOWN};
