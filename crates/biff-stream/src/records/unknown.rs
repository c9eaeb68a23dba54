//! Opaque pass-through for record types outside the dispatch table.

use crate::input::RecordInputStream;
use crate::output::ContinuableRecordOutput;
use crate::RecordError;

/// Raw bytes of an undecoded record, re-emitted unchanged on write.
///
/// Stores one physical frame's payload; a CONTINUE frame behind an unknown
/// record becomes its own [`super::ContinueRecord`], so the original frame
/// structure round-trips exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRecord {
    pub sid: u16,
    pub data: Vec<u8>,
}

impl UnknownRecord {
    pub fn read(input: &mut RecordInputStream<'_>) -> Result<Self, RecordError> {
        Ok(Self {
            sid: input.sid(),
            data: input.read_remainder().to_vec(),
        })
    }

    pub fn write(&self, out: &mut ContinuableRecordOutput<'_>) {
        out.write_bytes(&self.data);
    }
}
