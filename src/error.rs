use crate::handle::HandleKind;
use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which one-shot native call reported a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Compress,
    Decompress,
    /// Reading the content size out of a frame header.
    FrameHeader,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Operation::Compress => "compression",
            Operation::Decompress => "decompression",
            Operation::FrameHeader => "frame header parsing",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A native constructor returned a null (or otherwise invalid) handle. No native error code
    /// exists for this case.
    AllocationFailed(HandleKind),
    /// A native compress or decompress call returned an error code. The message is the
    /// library's error name, and is only meant for humans.
    OperationFailed {
        operation: Operation,
        message: String,
    },
    /// Decompression produced, or the frame header promised, a different number of bytes than
    /// the caller asked for. `actual` is `None` when the output didn't fit in `expected` bytes
    /// and the frame doesn't record its real size.
    OutputSizeMismatch {
        expected: usize,
        actual: Option<usize>,
    },
    /// The handle was already released.
    UseAfterClose(HandleKind),
    /// Dictionary training was rejected, either up front or by the native trainer.
    TrainingFailed(String),
    /// A compression level outside of the range libzstd accepts.
    InvalidLevel { level: i32, min: i32, max: i32 },
    /// The frame header doesn't record the decompressed size, so it must be supplied by the
    /// caller.
    ContentSizeUnknown,
    /// The frame header promised more output than the caller was willing to allocate.
    SizeLimitExceeded { max: usize, actual: u64 },
    /// The output buffer for decompression couldn't be allocated.
    OutOfMemory { requested: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::AllocationFailed(kind) => write!(f, "Failed to allocate a zstd {}", kind),
            Error::OperationFailed {
                operation,
                ref message,
            } => write!(f, "zstd {} failed: {}", operation, message),
            Error::OutputSizeMismatch {
                expected,
                actual: Some(actual),
            } => write!(
                f,
                "Expected {} decompressed bytes, but got {}",
                expected, actual
            ),
            Error::OutputSizeMismatch {
                expected,
                actual: None,
            } => write!(
                f,
                "Expected {} decompressed bytes, but the frame holds more",
                expected
            ),
            Error::UseAfterClose(kind) => write!(f, "The zstd {} was already closed", kind),
            Error::TrainingFailed(ref msg) => write!(f, "Dictionary training failed: {}", msg),
            Error::InvalidLevel { level, min, max } => write!(
                f,
                "Compression level {} is outside of the allowed range [{}, {}]",
                level, min, max
            ),
            Error::ContentSizeUnknown => f.write_str(
                "Frame doesn't record its decompressed size; the output size must be provided",
            ),
            Error::SizeLimitExceeded { max, actual } => write!(
                f,
                "Decompressed size is {} bytes, larger than the maximum of {}",
                actual, max
            ),
            Error::OutOfMemory { requested } => write!(
                f,
                "Couldn't allocate {} bytes for decompressed output",
                requested
            ),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_native_message() {
        let err = Error::OperationFailed {
            operation: Operation::Decompress,
            message: "Unknown frame descriptor".into(),
        };
        assert_eq!(
            err.to_string(),
            "zstd decompression failed: Unknown frame descriptor"
        );
        let err = Error::UseAfterClose(HandleKind::CompressionContext);
        assert_eq!(
            err.to_string(),
            "The zstd compression context was already closed"
        );
        let err = Error::OutputSizeMismatch {
            expected: 5,
            actual: None,
        };
        assert_eq!(
            err.to_string(),
            "Expected 5 decompressed bytes, but the frame holds more"
        );
    }
}
