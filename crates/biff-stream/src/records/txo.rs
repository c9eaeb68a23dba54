//! Text object records (`TXO`, 0x01B6).
//!
//! The 18-byte body carries counts only; the text lives in a following
//! CONTINUE frame (flags byte then character data, re-synchronized at each
//! further boundary) and the formatting runs in another. The paired shape's
//! geometry lives in the Escher stream.

use crate::input::RecordInputStream;
use crate::output::{ContinuableRecordOutput, StringData};
use crate::strings::{compress, read_char_data, STR_FLAG_HIGH_BYTE};
use crate::RecordError;

use super::sids::SID_TXO;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextObjectRecord {
    pub options: u16,
    pub rotation: u16,
    pub reserved1: u16,
    pub reserved2: u16,
    pub reserved3: u16,
    pub reserved4: u32,
    pub text: String,
    /// Raw `TXORuns` bytes (8 bytes per run), preserved opaquely.
    pub formatting_runs: Vec<u8>,
}

impl TextObjectRecord {
    pub fn read(input: &mut RecordInputStream<'_>) -> Result<Self, RecordError> {
        let options = input.read_u16()?;
        let rotation = input.read_u16()?;
        let reserved1 = input.read_u16()?;
        let reserved2 = input.read_u16()?;
        let reserved3 = input.read_u16()?;
        let text_len = input.read_u16()? as usize;
        let runs_len = input.read_u16()? as usize;
        let reserved4 = input.read_u32()?;

        // The body frame ends here; the flags byte is the first byte of
        // the text continuation.
        let codepage = input.config().codepage;
        let text = if text_len > 0 {
            let is_unicode = input.read_u8()? & STR_FLAG_HIGH_BYTE != 0;
            read_char_data(input, text_len, is_unicode, codepage)?
        } else {
            String::new()
        };

        let formatting_runs = input.read_bytes(runs_len)?;

        Ok(Self {
            options,
            rotation,
            reserved1,
            reserved2,
            reserved3,
            reserved4,
            text,
            formatting_runs,
        })
    }

    pub fn write(
        &self,
        out: &mut ContinuableRecordOutput<'_>,
        codepage: u16,
    ) -> Result<(), RecordError> {
        let units: Vec<u16> = self.text.encode_utf16().collect();
        let text_len = u16::try_from(units.len())
            .map_err(|_| RecordError::malformed(SID_TXO, "text longer than 65535 characters"))?;
        let runs_len = u16::try_from(self.formatting_runs.len())
            .map_err(|_| RecordError::malformed(SID_TXO, "formatting runs longer than u16"))?;

        out.write_u16(self.options);
        out.write_u16(self.rotation);
        out.write_u16(self.reserved1);
        out.write_u16(self.reserved2);
        out.write_u16(self.reserved3);
        out.write_u16(text_len);
        out.write_u16(runs_len);
        out.write_u32(self.reserved4);

        if text_len > 0 {
            out.write_continue();
            match compress(&self.text, codepage) {
                Some(bytes) => {
                    out.write_u8(0x00);
                    out.write_string_data(StringData::Compressed(&bytes));
                }
                None => {
                    out.write_u8(STR_FLAG_HIGH_BYTE);
                    out.write_string_data(StringData::Utf16(&units));
                }
            }
        }
        if runs_len > 0 {
            out.write_continue();
            out.write_bytes(&self.formatting_runs);
        }
        Ok(())
    }
}
