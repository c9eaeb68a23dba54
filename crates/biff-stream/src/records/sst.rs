//! The shared string table (`SST`, 0x00FC): the record most likely to
//! spill across many CONTINUE frames, with individual strings legitimately
//! split mid-character-data.

use crate::input::RecordInputStream;
use crate::output::ContinuableRecordOutput;
use crate::strings::{read_unicode_string, write_unicode_string, UnicodeString};
use crate::RecordError;

use super::sids::SID_SST;

/// Minimum wire size of one string entry: cch (2) + flags (1).
const MIN_STRING_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SstRecord {
    /// Total string references in the workbook, duplicates included.
    pub total_strings: u32,
    /// The unique strings, in table order. `LABELSST` cells index into
    /// this list.
    pub strings: Vec<UnicodeString>,
}

impl SstRecord {
    pub fn read(input: &mut RecordInputStream<'_>) -> Result<Self, RecordError> {
        let total_strings = input.read_u32()?;
        let unique = input.read_u32()? as usize;

        // Each string occupies at least MIN_STRING_SIZE bytes, so a count
        // that cannot fit in the remaining payload is corrupt. Checked
        // before the Vec allocation.
        let remaining = input.remaining();
        if unique.saturating_mul(MIN_STRING_SIZE) > remaining {
            return Err(RecordError::malformed(
                SID_SST,
                format!("SST declares {unique} strings but only {remaining} payload bytes remain"),
            ));
        }

        let codepage = input.config().codepage;
        let mut strings = Vec::with_capacity(unique);
        for _ in 0..unique {
            strings.push(read_unicode_string(input, codepage)?);
        }

        Ok(Self {
            total_strings,
            strings,
        })
    }

    pub fn write(
        &self,
        out: &mut ContinuableRecordOutput<'_>,
        codepage: u16,
    ) -> Result<(), RecordError> {
        let unique = u32::try_from(self.strings.len())
            .map_err(|_| RecordError::malformed(SID_SST, "more than u32::MAX unique strings"))?;
        out.write_u32(self.total_strings);
        out.write_u32(unique);
        for s in &self.strings {
            write_unicode_string(out, SID_SST, s, codepage)?;
        }
        Ok(())
    }
}
