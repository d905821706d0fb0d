//! Owning wrappers around native zstd pointers.
//!
//! A [`ResourceHandle`] holds exactly one address handed out by libzstd, and makes sure the
//! matching free function runs once and only once: either through an explicit
//! [`release`](ResourceHandle::release) or when the handle is dropped. After release the address
//! is forgotten, and any attempt to use it reports [`Error::UseAfterClose`] instead of passing a
//! stale pointer back into the library.

use crate::error::{Error, Result};
use crate::{ffi, status};
use log::{debug, warn};
use std::{fmt, ptr};

/// The four kinds of native object this crate manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleKind {
    CompressionContext,
    DecompressionContext,
    CompressionDictionary,
    DecompressionDictionary,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            HandleKind::CompressionContext => "compression context",
            HandleKind::DecompressionContext => "decompression context",
            HandleKind::CompressionDictionary => "compression dictionary",
            HandleKind::DecompressionDictionary => "decompression dictionary",
        })
    }
}

/// Ties a native pointee type to its kind and its destructor.
pub(crate) trait NativeKind {
    type Raw;
    const KIND: HandleKind;

    /// Free a native object, returning the library's result code.
    ///
    /// # Safety
    /// `ptr` must have come from this kind's constructor and must not have been freed yet.
    unsafe fn free(ptr: *mut Self::Raw) -> usize;
}

/// Kinds that are immutable once built, and so may be used from several threads at once.
///
/// # Safety
/// Implementors must only be read by the native library after construction.
pub(crate) unsafe trait SharedKind: NativeKind {}

pub(crate) enum CCtxKind {}
pub(crate) enum DCtxKind {}
pub(crate) enum CDictKind {}
pub(crate) enum DDictKind {}

impl NativeKind for CCtxKind {
    type Raw = ffi::ZSTD_CCtx;
    const KIND: HandleKind = HandleKind::CompressionContext;
    unsafe fn free(ptr: *mut Self::Raw) -> usize {
        ffi::ZSTD_freeCCtx(ptr)
    }
}

impl NativeKind for DCtxKind {
    type Raw = ffi::ZSTD_DCtx;
    const KIND: HandleKind = HandleKind::DecompressionContext;
    unsafe fn free(ptr: *mut Self::Raw) -> usize {
        ffi::ZSTD_freeDCtx(ptr)
    }
}

impl NativeKind for CDictKind {
    type Raw = ffi::ZSTD_CDict;
    const KIND: HandleKind = HandleKind::CompressionDictionary;
    unsafe fn free(ptr: *mut Self::Raw) -> usize {
        ffi::ZSTD_freeCDict(ptr)
    }
}

impl NativeKind for DDictKind {
    type Raw = ffi::ZSTD_DDict;
    const KIND: HandleKind = HandleKind::DecompressionDictionary;
    unsafe fn free(ptr: *mut Self::Raw) -> usize {
        ffi::ZSTD_freeDDict(ptr)
    }
}

// SAFETY: digested dictionaries are only read by libzstd after creation.
unsafe impl SharedKind for CDictKind {}
unsafe impl SharedKind for DDictKind {}

/// Null and all-ones are never valid addresses for a zstd object.
fn is_sentinel<T>(ptr: *mut T) -> bool {
    ptr.is_null() || ptr as usize == usize::MAX
}

pub(crate) struct ResourceHandle<K: NativeKind> {
    ptr: *mut K::Raw,
    owned: bool,
    released: bool,
}

impl<K: NativeKind> ResourceHandle<K> {
    /// Run a native constructor and take ownership of whatever it returns.
    pub fn create<F>(factory: F) -> Result<Self>
    where
        F: FnOnce() -> *mut K::Raw,
    {
        let ptr = factory();
        if is_sentinel(ptr) {
            debug!("zstd returned no {}", K::KIND);
            return Err(Error::AllocationFailed(K::KIND));
        }
        debug!("created {} at {:p}", K::KIND, ptr);
        Ok(Self {
            ptr,
            owned: true,
            released: false,
        })
    }

    /// Adopt an existing native pointer without calling a constructor. When `owned` is false the
    /// native object is never freed by this handle.
    ///
    /// # Safety
    /// `ptr` must be a live object of this kind (or a sentinel), and if `owned` is true, nothing
    /// else may free it.
    pub unsafe fn wrap(ptr: *mut K::Raw, owned: bool) -> Self {
        let released = is_sentinel(ptr);
        Self {
            ptr: if released { ptr::null_mut() } else { ptr },
            owned,
            released,
        }
    }

    /// The live native address, or [`Error::UseAfterClose`] once released.
    pub fn as_ptr(&self) -> Result<*mut K::Raw> {
        if self.released {
            Err(Error::UseAfterClose(K::KIND))
        } else {
            Ok(self.ptr)
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Free the native object if this handle owns it. Calling this again does nothing.
    ///
    /// The handle is considered released even if the native free function reports an error,
    /// since there is nothing more that can be done with the pointer.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        let ptr = std::mem::replace(&mut self.ptr, ptr::null_mut());
        self.released = true;
        if !self.owned {
            debug!("dropped borrowed {} at {:p}", K::KIND, ptr);
            return;
        }
        // SAFETY: `ptr` came from `create` or an owned `wrap`, and `released` guarantees this
        // point is reached only once.
        let code = unsafe { K::free(ptr) };
        match status::codec_result(code) {
            Ok(_) => debug!("freed {} at {:p}", K::KIND, ptr),
            Err(msg) => warn!("freeing {} at {:p} reported: {}", K::KIND, ptr, msg),
        }
    }
}

impl<K: NativeKind> Drop for ResourceHandle<K> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<K: NativeKind> fmt::Debug for ResourceHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("kind", &K::KIND)
            .field("ptr", &self.ptr)
            .field("owned", &self.owned)
            .field("released", &self.released)
            .finish()
    }
}

// SAFETY: zstd objects carry no thread affinity, so ownership can move between threads.
unsafe impl<K: NativeKind> Send for ResourceHandle<K> {}
// SAFETY: see `SharedKind`.
unsafe impl<K: SharedKind> Sync for ResourceHandle<K> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static FREED: Cell<usize> = const { Cell::new(0) };
    }

    enum Counted {}

    impl NativeKind for Counted {
        type Raw = u8;
        const KIND: HandleKind = HandleKind::CompressionContext;
        unsafe fn free(_ptr: *mut u8) -> usize {
            FREED.with(|f| f.set(f.get() + 1));
            0
        }
    }

    fn freed() -> usize {
        FREED.with(|f| f.get())
    }

    fn fake_ptr(slot: &mut u8) -> *mut u8 {
        slot as *mut u8
    }

    #[test]
    fn release_is_idempotent() {
        let mut slot = 0u8;
        let start = freed();
        let mut handle = ResourceHandle::<Counted>::create(|| fake_ptr(&mut slot)).unwrap();
        assert!(handle.as_ptr().is_ok());
        handle.release();
        handle.release();
        drop(handle);
        assert_eq!(freed(), start + 1);
    }

    #[test]
    fn drop_releases_on_early_return() {
        fn bail(slot: &mut u8) -> Result<()> {
            let _handle = ResourceHandle::<Counted>::create(|| fake_ptr(slot))?;
            Err(Error::ContentSizeUnknown)
        }
        let mut slot = 0u8;
        let start = freed();
        assert!(bail(&mut slot).is_err());
        assert_eq!(freed(), start + 1);
    }

    #[test]
    fn borrowed_handles_are_never_freed() {
        let mut slot = 0u8;
        let start = freed();
        let mut handle = unsafe { ResourceHandle::<Counted>::wrap(fake_ptr(&mut slot), false) };
        assert!(!handle.is_owned());
        assert!(handle.as_ptr().is_ok());
        handle.release();
        assert!(handle.is_released());
        drop(handle);
        assert_eq!(freed(), start);
    }

    #[test]
    fn sentinels_are_rejected() {
        let start = freed();
        let err = ResourceHandle::<Counted>::create(ptr::null_mut).unwrap_err();
        assert_eq!(err, Error::AllocationFailed(HandleKind::CompressionContext));
        let err = ResourceHandle::<Counted>::create(|| usize::MAX as *mut u8).unwrap_err();
        assert_eq!(err, Error::AllocationFailed(HandleKind::CompressionContext));

        let handle = unsafe { ResourceHandle::<Counted>::wrap(ptr::null_mut(), true) };
        assert_eq!(
            handle.as_ptr().unwrap_err(),
            Error::UseAfterClose(HandleKind::CompressionContext)
        );
        drop(handle);
        assert_eq!(freed(), start);
    }

    #[test]
    fn released_handle_reports_use_after_close() {
        let mut slot = 0u8;
        let mut handle = ResourceHandle::<Counted>::create(|| fake_ptr(&mut slot)).unwrap();
        handle.release();
        assert_eq!(
            handle.as_ptr().unwrap_err(),
            Error::UseAfterClose(HandleKind::CompressionContext)
        );
    }

    #[test]
    fn real_contexts_round_trip_through_free() {
        let mut cctx = ResourceHandle::<CCtxKind>::create(|| unsafe { ffi::ZSTD_createCCtx() })
            .unwrap();
        cctx.release();
        assert!(cctx.is_released());
        let dctx = ResourceHandle::<DCtxKind>::create(|| unsafe { ffi::ZSTD_createDCtx() })
            .unwrap();
        drop(dctx);
    }
}
