use crate::error::{Error, Result};
use crate::{ffi, status};
use log::debug;
use std::ffi::c_void;

/// Attempt to train a zstd dictionary of at most `max_dictionary_size` bytes from `samples`.
///
/// Training fails with [`Error::TrainingFailed`] if there are no samples, if the size limit is
/// zero, or if the trainer rejects the data. Too little data, or data with nothing in common,
/// is a normal reason for the latter; the message names the trainer's complaint.
pub fn train_dictionary<S: AsRef<[u8]>>(
    samples: &[S],
    max_dictionary_size: usize,
) -> Result<Vec<u8>> {
    if samples.is_empty() {
        return Err(Error::TrainingFailed("No samples provided".into()));
    }
    if max_dictionary_size == 0 {
        return Err(Error::TrainingFailed(
            "Dictionary size limit must be non-zero".into(),
        ));
    }
    let sample_count = u32::try_from(samples.len())
        .map_err(|_| Error::TrainingFailed("Too many samples".into()))?;

    // The trainer wants one contiguous buffer plus the length of each sample in it.
    let sample_lens: Vec<usize> = samples.iter().map(|s| s.as_ref().len()).collect();
    let mut sample_buf = Vec::with_capacity(sample_lens.iter().sum());
    for sample in samples {
        sample_buf.extend_from_slice(sample.as_ref());
    }

    let mut dict: Vec<u8> = Vec::with_capacity(max_dictionary_size);
    // SAFETY: `dict` has room for `max_dictionary_size` bytes, and `sample_lens` describes
    // exactly the contents of `sample_buf`.
    let code = unsafe {
        ffi::ZDICT_trainFromBuffer(
            dict.spare_capacity_mut().as_mut_ptr() as *mut c_void,
            max_dictionary_size,
            sample_buf.as_ptr() as *const c_void,
            sample_lens.as_ptr(),
            sample_count,
        )
    };
    let dict_len = status::training_result(code).map_err(Error::TrainingFailed)?;
    // SAFETY: the trainer wrote `dict_len` bytes, never more than the capacity it was given.
    unsafe { dict.set_len(dict_len) };
    debug!(
        "trained a {} byte dictionary from {} samples ({} bytes)",
        dict_len,
        sample_count,
        sample_buf.len()
    );
    Ok(dict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_samples() {
        let samples: [&[u8]; 0] = [];
        assert!(matches!(
            train_dictionary(&samples, 1024),
            Err(Error::TrainingFailed(_))
        ));
    }

    #[test]
    fn zero_size() {
        let samples = [b"abc".to_vec()];
        assert!(matches!(
            train_dictionary(&samples, 0),
            Err(Error::TrainingFailed(_))
        ));
    }

    #[test]
    fn too_little_data() {
        let samples = [b"tiny".to_vec()];
        match train_dictionary(&samples, 1024) {
            Err(Error::TrainingFailed(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected a training failure, got {:?}", other),
        }
    }
}
