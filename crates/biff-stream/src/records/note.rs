//! Cell comment records (`NOTE`, 0x001C): the comment's cell anchor and
//! author; the comment text itself lives in the paired `TXO` record.

use crate::input::RecordInputStream;
use crate::output::{ContinuableRecordOutput, StringData};
use crate::strings::{compress, read_char_data, STR_FLAG_HIGH_BYTE};
use crate::RecordError;

use super::sids::SID_NOTE;

/// The comment is shown even when the cell is not hovered.
pub const NOTE_FLAG_SHOW: u16 = 0x0002;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NoteRecord {
    pub row: u16,
    pub col: u16,
    pub flags: u16,
    /// Object id of the shape carrying the comment box; matches the id in
    /// the paired `OBJ` record's common-object-data sub-record.
    pub shape_id: u16,
    pub author: String,
    /// Some writers pad the record with one trailing byte; preserved so
    /// rewrites are byte-identical.
    pub padding: Option<u8>,
}

impl NoteRecord {
    pub fn read(input: &mut RecordInputStream<'_>) -> Result<Self, RecordError> {
        let row = input.read_u16()?;
        let col = input.read_u16()?;
        let flags = input.read_u16()?;
        let shape_id = input.read_u16()?;

        let codepage = input.config().codepage;
        let author_len = input.read_u16()? as usize;
        let is_unicode = input.read_u8()? & STR_FLAG_HIGH_BYTE != 0;
        let author = read_char_data(input, author_len, is_unicode, codepage)?;

        let padding = match input.remaining() {
            0 => None,
            1 => Some(input.read_u8()?),
            n => {
                return Err(RecordError::malformed(
                    SID_NOTE,
                    format!("{n} bytes after author string"),
                ))
            }
        };

        Ok(Self {
            row,
            col,
            flags,
            shape_id,
            author,
            padding,
        })
    }

    pub fn write(
        &self,
        out: &mut ContinuableRecordOutput<'_>,
        codepage: u16,
    ) -> Result<(), RecordError> {
        let units: Vec<u16> = self.author.encode_utf16().collect();
        let author_len = u16::try_from(units.len())
            .map_err(|_| RecordError::malformed(SID_NOTE, "author longer than 65535 characters"))?;

        out.write_u16(self.row);
        out.write_u16(self.col);
        out.write_u16(self.flags);
        out.write_u16(self.shape_id);
        out.write_u16(author_len);
        match compress(&self.author, codepage) {
            Some(bytes) => {
                out.write_u8(0x00);
                out.write_string_data(StringData::Compressed(&bytes));
            }
            None => {
                out.write_u8(STR_FLAG_HIGH_BYTE);
                out.write_string_data(StringData::Utf16(&units));
            }
        }
        if let Some(padding) = self.padding {
            out.write_u8(padding);
        }
        Ok(())
    }
}
