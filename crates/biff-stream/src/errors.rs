use thiserror::Error;

/// Errors produced while reading or writing a BIFF workbook stream.
///
/// A malformed header invalidates every subsequent record boundary, so none
/// of these are recoverable mid-stream: callers abort the parse and report
/// the offset/record id carried here.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("truncated record header at offset {offset}")]
    TruncatedHeader { offset: usize },

    #[error(
        "record 0x{sid:04X} at offset {offset} declares {declared} payload bytes but only {available} remain"
    )]
    TruncatedPayload {
        sid: u16,
        offset: usize,
        declared: usize,
        available: usize,
    },

    /// A length field exceeds the configured safety ceiling. Raised before
    /// any allocation proportional to the field.
    #[error(
        "record 0x{sid:04X} at offset {offset} declares {declared} payload bytes, over the {max}-byte ceiling"
    )]
    SizeLimitExceeded {
        sid: u16,
        offset: usize,
        declared: usize,
        max: usize,
    },

    #[error("CONTINUE record at offset {offset} follows no open record")]
    OrphanContinue { offset: usize },

    #[error("read of {requested} bytes overruns record 0x{sid:04X} ({remaining} bytes remain)")]
    ReadPastEnd {
        sid: u16,
        requested: usize,
        remaining: usize,
    },

    #[error("record 0x{sid:04X} spans more than {max} bytes across CONTINUE frames")]
    ContinuedTooLarge { sid: u16, max: usize },

    #[error("record 0x{sid:04X} spans more than {max} CONTINUE fragments")]
    TooManyFragments { sid: u16, max: usize },

    /// A decoder's structural precondition failed (unexpected marker value,
    /// bad sub-record layout, non-zero trailing bytes, ...).
    #[error("record 0x{sid:04X}: {message}")]
    Malformed { sid: u16, message: String },

    #[error("string continuation splits a multi-byte character in record 0x{sid:04X}")]
    SplitMidCharacter { sid: u16 },

    #[error("drawing data: {0}")]
    Escher(#[from] biff_escher::EscherError),

    /// The drawing aggregate wrote a different number of bytes than its
    /// computed size; the in-memory model no longer matches the stream.
    #[error("drawing aggregate wrote {written} bytes but computed size is {expected}")]
    AggregateSizeMismatch { written: usize, expected: usize },

    #[error(
        "drawing aggregate has {objects} object records but the escher tree has {anchors} shape anchors"
    )]
    ShapeObjectMismatch { anchors: usize, objects: usize },
}

impl RecordError {
    pub(crate) fn malformed(sid: u16, message: impl Into<String>) -> Self {
        RecordError::Malformed {
            sid,
            message: message.into(),
        }
    }
}
