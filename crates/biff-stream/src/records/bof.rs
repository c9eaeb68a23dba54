//! Substream delimiters: `BOF` (0x0809) and `EOF` (0x000A).

use crate::input::RecordInputStream;
use crate::output::ContinuableRecordOutput;
use crate::RecordError;

/// BIFF8 stream version carried in `BOF`.
pub const BOF_VERSION_BIFF8: u16 = 0x0600;
/// `BOF` stream type for a workbook globals substream.
pub const STREAM_TYPE_WORKBOOK: u16 = 0x0005;
/// `BOF` stream type for a worksheet substream.
pub const STREAM_TYPE_WORKSHEET: u16 = 0x0010;

/// Beginning-of-substream marker, 16-byte BIFF8 layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BofRecord {
    pub version: u16,
    pub stream_type: u16,
    pub build: u16,
    pub build_year: u16,
    pub history_flags: u32,
    pub lowest_version: u32,
}

impl BofRecord {
    pub fn worksheet() -> Self {
        Self {
            version: BOF_VERSION_BIFF8,
            stream_type: STREAM_TYPE_WORKSHEET,
            build: 0x0DBB,
            build_year: 1996,
            history_flags: 0x41,
            lowest_version: 0x0006,
        }
    }

    pub fn read(input: &mut RecordInputStream<'_>) -> Result<Self, RecordError> {
        Ok(Self {
            version: input.read_u16()?,
            stream_type: input.read_u16()?,
            build: input.read_u16()?,
            build_year: input.read_u16()?,
            history_flags: input.read_u32()?,
            lowest_version: input.read_u32()?,
        })
    }

    pub fn write(&self, out: &mut ContinuableRecordOutput<'_>) {
        out.write_u16(self.version);
        out.write_u16(self.stream_type);
        out.write_u16(self.build);
        out.write_u16(self.build_year);
        out.write_u32(self.history_flags);
        out.write_u32(self.lowest_version);
    }
}

/// End-of-substream marker. Always empty on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EofRecord;

impl EofRecord {
    pub fn read(input: &mut RecordInputStream<'_>) -> Result<Self, RecordError> {
        let leftover = input.remaining();
        if leftover != 0 {
            return Err(RecordError::malformed(
                input.sid(),
                format!("EOF record carries {leftover} payload bytes"),
            ));
        }
        Ok(Self)
    }
}
