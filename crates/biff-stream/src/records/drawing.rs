//! Carrier records for Escher byte fragments.
//!
//! `MSODRAWING` (0x00EC) and any `CONTINUE` frames behind it hold slices of
//! one Escher stream. Neither record interprets its payload; the
//! [`crate::aggregate::DrawingAggregate`] concatenates the fragments and
//! decodes the result.

use crate::input::RecordInputStream;
use crate::output::ContinuableRecordOutput;
use crate::RecordError;

/// One `MSODRAWING` fragment, payload kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DrawingRecord {
    pub data: Vec<u8>,
}

impl DrawingRecord {
    /// Reads only the primary frame: trailing CONTINUE frames surface as
    /// [`ContinueRecord`]s so the physical fragment structure is visible
    /// to the aggregation step.
    pub fn read(input: &mut RecordInputStream<'_>) -> Result<Self, RecordError> {
        Ok(Self {
            data: input.read_remainder().to_vec(),
        })
    }

    pub fn write(&self, out: &mut ContinuableRecordOutput<'_>) {
        out.write_bytes(&self.data);
    }
}

/// A raw `CONTINUE` frame that no decoder absorbed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContinueRecord {
    pub data: Vec<u8>,
}

impl ContinueRecord {
    pub fn read(input: &mut RecordInputStream<'_>) -> Result<Self, RecordError> {
        Ok(Self {
            data: input.read_remainder().to_vec(),
        })
    }

    pub fn write(&self, out: &mut ContinuableRecordOutput<'_>) {
        out.write_bytes(&self.data);
    }
}
