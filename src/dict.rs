use crate::context::check_level;
use crate::error::{Error, Result};
use crate::handle::{CDictKind, DDictKind, ResourceHandle};
use crate::{ffi, train};
use serde::{Deserialize, Serialize, Serializer};
use serde_bytes::ByteBuf;
use std::ffi::c_void;
use std::{fmt, sync::Arc};

/// A digested dictionary ready for compression at a fixed level.
///
/// Built once and never changed afterwards, so it can be shared by reference across threads and
/// used by any number of [`CompressionContext`](crate::CompressionContext)s. Contexts only borrow
/// it for the length of a call.
pub struct CompressionDictionary {
    dict: Arc<[u8]>,
    level: i32,
    handle: ResourceHandle<CDictKind>,
}

impl CompressionDictionary {
    /// Digest `dict` for compression at `level`. Buffers that aren't trained zstd dictionaries
    /// are used as raw content.
    pub fn new(dict: impl Into<Arc<[u8]>>, level: i32) -> Result<Self> {
        check_level(level)?;
        let dict = dict.into();
        // SAFETY: libzstd copies the dictionary content, so `dict` need not outlive the handle.
        let handle = ResourceHandle::<CDictKind>::create(|| unsafe {
            ffi::ZSTD_createCDict(dict.as_ptr() as *const c_void, dict.len(), level)
        })?;
        Ok(Self {
            dict,
            level,
            handle,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.dict
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// Free the native dictionary. Contexts given a closed dictionary fail with
    /// [`Error::UseAfterClose`].
    pub fn close(&mut self) {
        self.handle.release();
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_released()
    }

    pub(crate) fn as_ptr(&self) -> Result<*mut ffi::ZSTD_CDict> {
        self.handle.as_ptr()
    }
}

impl fmt::Debug for CompressionDictionary {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("CompressionDictionary")
            .field("len", &self.dict.len())
            .field("level", &self.level)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A digested dictionary ready for decompression. Shareable the same way as
/// [`CompressionDictionary`].
pub struct DecompressionDictionary {
    dict: Arc<[u8]>,
    handle: ResourceHandle<DDictKind>,
}

impl DecompressionDictionary {
    pub fn new(dict: impl Into<Arc<[u8]>>) -> Result<Self> {
        let dict = dict.into();
        // SAFETY: libzstd copies the dictionary content, so `dict` need not outlive the handle.
        let handle = ResourceHandle::<DDictKind>::create(|| unsafe {
            ffi::ZSTD_createDDict(dict.as_ptr() as *const c_void, dict.len())
        })?;
        Ok(Self { dict, handle })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.dict
    }

    pub fn close(&mut self) {
        self.handle.release();
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_released()
    }

    pub(crate) fn as_ptr(&self) -> Result<*mut ffi::ZSTD_DDict> {
        self.handle.as_ptr()
    }
}

impl fmt::Debug for DecompressionDictionary {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("DecompressionDictionary")
            .field("len", &self.dict.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Both halves of a dictionary, built from the same buffer.
///
/// Serializes as its level and raw bytes; the native dictionaries are rebuilt on deserialization.
#[derive(Deserialize)]
#[serde(try_from = "DictionarySerde")]
pub struct Dictionary {
    cdict: CompressionDictionary,
    ddict: DecompressionDictionary,
}

impl Dictionary {
    /// Build a dictionary pair for compression at `level`.
    pub fn new(dict: impl Into<Arc<[u8]>>, level: i32) -> Result<Self> {
        let dict = dict.into();
        let cdict = CompressionDictionary::new(Arc::clone(&dict), level)?;
        let ddict = DecompressionDictionary::new(dict)?;
        Ok(Self { cdict, ddict })
    }

    /// Train a dictionary of at most `max_size` bytes from `samples`, then build it for `level`.
    pub fn train<S: AsRef<[u8]>>(samples: &[S], max_size: usize, level: i32) -> Result<Self> {
        check_level(level)?;
        let dict = train::train_dictionary(samples, max_size)?;
        Self::new(dict, level)
    }

    /// Build a fresh pair of native dictionaries from the same bytes and level.
    pub fn try_clone(&self) -> Result<Self> {
        let dict = Arc::clone(&self.cdict.dict);
        Ok(Self {
            cdict: CompressionDictionary::new(Arc::clone(&dict), self.cdict.level)?,
            ddict: DecompressionDictionary::new(dict)?,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.cdict.as_bytes()
    }

    pub fn level(&self) -> i32 {
        self.cdict.level()
    }

    pub fn compression(&self) -> &CompressionDictionary {
        &self.cdict
    }

    pub fn decompression(&self) -> &DecompressionDictionary {
        &self.ddict
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Dictionary")
            .field("len", &self.as_bytes().len())
            .field("level", &self.level())
            .finish()
    }
}

// Struct used solely for deserialization
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DictionarySerde {
    level: i32,
    dict: ByteBuf,
}

#[derive(Serialize)]
struct DictionarySerdeRef<'a> {
    level: i32,
    #[serde(with = "serde_bytes")]
    dict: &'a [u8],
}

impl TryFrom<DictionarySerde> for Dictionary {
    type Error = Error;
    fn try_from(value: DictionarySerde) -> Result<Self, Self::Error> {
        Dictionary::new(value.dict.into_vec(), value.level)
    }
}

impl Serialize for Dictionary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DictionarySerdeRef {
            level: self.level(),
            dict: self.as_bytes(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompressionContext, DecompressionContext, HandleKind};

    fn raw_dict() -> Vec<u8> {
        b"{\"name\": \"sensor\", \"unit\": \"celsius\", \"reading\": , \"status\": \"ok\"}"
            .repeat(4)
    }

    #[test]
    fn raw_content_round_trip() {
        let dict = Dictionary::new(raw_dict(), 5).unwrap();
        let data = b"{\"name\": \"sensor\", \"unit\": \"celsius\", \"reading\": 21.5, \"status\": \"ok\"}";
        let mut cctx = CompressionContext::new().unwrap();
        let mut dctx = DecompressionContext::new().unwrap();

        let with_dict = cctx.compress(data, 5, Some(dict.compression())).unwrap();
        let without_dict = cctx.compress(data, 5, None).unwrap();
        assert!(with_dict.len() < without_dict.len());

        let out = dctx
            .decompress(&with_dict, Some(data.len()), Some(dict.decompression()))
            .unwrap();
        assert_eq!(&out[..], &data[..]);
    }

    #[test]
    fn closed_dictionary_is_rejected() {
        let mut cdict = CompressionDictionary::new(raw_dict(), 3).unwrap();
        let mut ddict = DecompressionDictionary::new(raw_dict()).unwrap();
        let mut cctx = CompressionContext::new().unwrap();
        let mut dctx = DecompressionContext::new().unwrap();
        let compressed = cctx.compress(b"hello world", 3, Some(&cdict)).unwrap();

        cdict.close();
        cdict.close();
        assert_eq!(
            cctx.compress(b"hello world", 3, Some(&cdict)).unwrap_err(),
            Error::UseAfterClose(HandleKind::CompressionDictionary)
        );
        ddict.close();
        assert_eq!(
            dctx.decompress(&compressed, Some(11), Some(&ddict)).unwrap_err(),
            Error::UseAfterClose(HandleKind::DecompressionDictionary)
        );
        // Closing a dictionary leaves the contexts alone.
        assert!(!cctx.is_closed());
        assert!(cctx.compress(b"hello world", 3, None).is_ok());
    }

    #[test]
    fn dictionary_level_is_checked() {
        let err = CompressionDictionary::new(raw_dict(), i32::MAX).unwrap_err();
        assert!(matches!(err, Error::InvalidLevel { .. }));
    }

    #[test]
    fn serde_rebuilds_native_handles() {
        let dict = Dictionary::new(raw_dict(), 7).unwrap();
        let json = serde_json::to_string(&dict).unwrap();
        let back: Dictionary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.level(), 7);
        assert_eq!(back.as_bytes(), dict.as_bytes());

        let mut cctx = CompressionContext::new().unwrap();
        let mut dctx = DecompressionContext::new().unwrap();
        let compressed = cctx.compress(b"hello world", 7, Some(dict.compression())).unwrap();
        let out = dctx
            .decompress(&compressed, Some(11), Some(back.decompression()))
            .unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn serde_rejects_bad_level() {
        let json = r#"{"level": 100000, "dict": [1, 2, 3]}"#;
        assert!(serde_json::from_str::<Dictionary>(json).is_err());
    }

    #[test]
    fn debug_omits_contents() {
        let dict = Dictionary::new(vec![0xABu8; 300], 3).unwrap();
        let shown = format!("{:?}", dict);
        assert_eq!(shown, "Dictionary { len: 300, level: 3 }");
    }

    #[test]
    fn try_clone_is_independent() {
        let dict = Dictionary::new(raw_dict(), 3).unwrap();
        let mut copy = dict.try_clone().unwrap();
        copy.cdict.close();
        assert!(!dict.compression().is_closed());
        assert_eq!(copy.as_bytes(), dict.as_bytes());
    }

    #[test]
    fn shared_across_threads() {
        let dict = Dictionary::new(raw_dict(), 3).unwrap();
        let data = b"{\"name\": \"sensor\", \"unit\": \"celsius\", \"reading\": 19.0}";
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let mut cctx = CompressionContext::new().unwrap();
                    let mut dctx = DecompressionContext::new().unwrap();
                    for _ in 0..50 {
                        let c = cctx.compress(data, 3, Some(dict.compression())).unwrap();
                        let d = dctx
                            .decompress(&c, Some(data.len()), Some(dict.decompression()))
                            .unwrap();
                        assert_eq!(&d[..], &data[..]);
                    }
                });
            }
        });
    }
}
