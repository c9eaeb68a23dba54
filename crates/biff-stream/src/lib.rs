//! Binary record codec for BIFF workbook streams.
//!
//! A workbook stream is a flat sequence of framed records: a 2-byte record
//! id, a 2-byte payload length, then the payload. Payloads over the
//! per-frame ceiling spill into CONTINUE records. This crate provides the
//! continuation-aware reader and writer ([`RecordInputStream`],
//! [`RecordWriter`]), typed decoders for the record set with a lossless
//! opaque fallback ([`Record`]), the BIFF8 string codec, and the drawing
//! aggregate that reassembles Escher data scattered across `DRAWING`,
//! `CONTINUE`, `OBJ` and `TXO` records ([`DrawingAggregate`]).
//!
//! All reads are bounds-checked against caller-supplied limits; hostile
//! lengths fail before any proportional allocation.

pub mod aggregate;
mod errors;
pub mod frame;
pub mod input;
pub mod list;
pub mod output;
pub mod records;
pub mod strings;

pub use aggregate::DrawingAggregate;
pub use errors::RecordError;
pub use frame::{Frame, FrameIter, MAX_RECORD_DATA_SIZE, SID_BOF, SID_CONTINUE, SID_EOF};
pub use input::RecordInputStream;
pub use list::RecordList;
pub use output::{ContinuableRecordOutput, RecordWriter, StringData};
pub use records::{read_records, Record};
pub use strings::{FormatRun, UnicodeString};

/// Limits and policy knobs shared by the reader and writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Per-frame payload ceiling. Writers split at this size; readers
    /// reject frames declaring more.
    pub max_record_data_size: usize,
    /// Ceiling on one logical record's total payload across CONTINUE
    /// frames.
    pub max_logical_record_bytes: usize,
    /// Ceiling on the number of physical fragments in one logical record.
    pub max_logical_record_fragments: usize,
    /// Tolerate recoverable malformations (orphan CONTINUE at stream
    /// start) instead of failing.
    pub lenient: bool,
    /// Windows codepage for compressed (8-bit) string data.
    pub codepage: u16,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_record_data_size: MAX_RECORD_DATA_SIZE,
            max_logical_record_bytes: 16 * 1024 * 1024,
            max_logical_record_fragments: 4096,
            lenient: false,
            codepage: 1252,
        }
    }
}
