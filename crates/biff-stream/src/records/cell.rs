//! Fixed-layout cell records: `NUMBER` (0x0203), `BLANK` (0x0201) and
//! `LABELSST` (0x00FD). Each starts with the shared row/column/XF-index
//! header.

use crate::input::RecordInputStream;
use crate::output::ContinuableRecordOutput;
use crate::RecordError;

/// A numeric cell holding an IEEE-754 double.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberRecord {
    pub row: u16,
    pub col: u16,
    pub xf_index: u16,
    pub value: f64,
}

impl NumberRecord {
    pub fn read(input: &mut RecordInputStream<'_>) -> Result<Self, RecordError> {
        Ok(Self {
            row: input.read_u16()?,
            col: input.read_u16()?,
            xf_index: input.read_u16()?,
            value: input.read_f64()?,
        })
    }

    pub fn write(&self, out: &mut ContinuableRecordOutput<'_>) {
        out.write_u16(self.row);
        out.write_u16(self.col);
        out.write_u16(self.xf_index);
        out.write_f64(self.value);
    }
}

/// A formatted but valueless cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlankRecord {
    pub row: u16,
    pub col: u16,
    pub xf_index: u16,
}

impl BlankRecord {
    pub fn read(input: &mut RecordInputStream<'_>) -> Result<Self, RecordError> {
        Ok(Self {
            row: input.read_u16()?,
            col: input.read_u16()?,
            xf_index: input.read_u16()?,
        })
    }

    pub fn write(&self, out: &mut ContinuableRecordOutput<'_>) {
        out.write_u16(self.row);
        out.write_u16(self.col);
        out.write_u16(self.xf_index);
    }
}

/// A text cell referencing the shared string table by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelSstRecord {
    pub row: u16,
    pub col: u16,
    pub xf_index: u16,
    pub sst_index: u32,
}

impl LabelSstRecord {
    pub fn read(input: &mut RecordInputStream<'_>) -> Result<Self, RecordError> {
        Ok(Self {
            row: input.read_u16()?,
            col: input.read_u16()?,
            xf_index: input.read_u16()?,
            sst_index: input.read_u32()?,
        })
    }

    pub fn write(&self, out: &mut ContinuableRecordOutput<'_>) {
        out.write_u16(self.row);
        out.write_u16(self.col);
        out.write_u16(self.xf_index);
        out.write_u32(self.sst_index);
    }
}
