//! Translation of native result codes.
//!
//! libzstd packs failures into the top of the `size_t` range, and the dictionary builder has its
//! own predicate for the same trick. Both are asked through their own `isError` function; the
//! raw value is never compared against a threshold here.

use crate::ffi;
use std::ffi::CStr;
use std::os::raw::c_char;

const UNDISPLAYABLE: &str = "Undisplayable error code";

/// Interpret the result of a compress/decompress/introspection call.
pub(crate) fn codec_result(code: usize) -> Result<usize, String> {
    // SAFETY: pure functions on an integer; the name is a static C string owned by libzstd.
    unsafe {
        if ffi::ZSTD_isError(code) == 0 {
            Ok(code)
        } else {
            Err(error_name(ffi::ZSTD_getErrorName(code)))
        }
    }
}

/// True if a failed codec call ran out of room in its destination buffer.
pub(crate) fn is_dst_too_small(code: usize) -> bool {
    // SAFETY: pure function on an integer.
    let code = unsafe { ffi::ZSTD_getErrorCode(code) };
    matches!(code, ffi::ZSTD_ErrorCode::ZSTD_error_dstSize_tooSmall)
}

/// Interpret the result of `ZDICT_trainFromBuffer`.
pub(crate) fn training_result(code: usize) -> Result<usize, String> {
    // SAFETY: as above, with the dictionary builder's own predicate and name table.
    unsafe {
        if ffi::ZDICT_isError(code) == 0 {
            Ok(code)
        } else {
            Err(error_name(ffi::ZDICT_getErrorName(code)))
        }
    }
}

/// # Safety
/// `name` must be null or point to a nul-terminated string that outlives this call.
unsafe fn error_name(name: *const c_char) -> String {
    if name.is_null() {
        return UNDISPLAYABLE.to_owned();
    }
    CStr::from_ptr(name)
        .to_str()
        .unwrap_or(UNDISPLAYABLE)
        .to_owned()
}
