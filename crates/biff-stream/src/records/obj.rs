//! Drawing object records (`OBJ`, 0x005D): a list of `(ft, cb, data)`
//! sub-records terminated by an `ftEnd` marker.

use crate::input::RecordInputStream;
use crate::output::ContinuableRecordOutput;
use crate::RecordError;

use super::sids::SID_OBJ;

/// Sub-record type of the terminating marker.
pub const FT_END: u16 = 0x0000;
/// Sub-record type of the common object data block.
pub const FT_CMO: u16 = 0x0015;

/// One `(ft, cb, data)` sub-record. `cb` is implied by `data.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjSubRecord {
    pub ft: u16,
    pub data: Vec<u8>,
}

/// An `OBJ` record: the non-Escher half of one drawing shape, positionally
/// paired with a shape anchor in the Escher stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjRecord {
    pub sub_records: Vec<ObjSubRecord>,
}

impl ObjRecord {
    /// Decode the sub-record list.
    ///
    /// Some writers pad the record past `ftEnd` with zero bytes. Such
    /// padding is dropped with a warning and never written back; non-zero
    /// trailing bytes are fatal. This is a deliberate, narrowly scoped
    /// leniency, not general tolerance of malformed sub-records.
    pub fn read(input: &mut RecordInputStream<'_>) -> Result<Self, RecordError> {
        let bytes = input.read_all_continued_remainder()?;
        let mut sub_records = Vec::new();
        let mut pos = 0;

        loop {
            let Some(header) = bytes.get(pos..pos + 4) else {
                return Err(RecordError::malformed(
                    SID_OBJ,
                    "OBJ record ends without an ftEnd sub-record",
                ));
            };
            let ft = u16::from_le_bytes([header[0], header[1]]);
            let cb = u16::from_le_bytes([header[2], header[3]]) as usize;
            let data = bytes.get(pos + 4..pos + 4 + cb).ok_or_else(|| {
                RecordError::malformed(
                    SID_OBJ,
                    format!("OBJ sub-record 0x{ft:04X} declares {cb} bytes past the record end"),
                )
            })?;
            sub_records.push(ObjSubRecord {
                ft,
                data: data.to_vec(),
            });
            pos += 4 + cb;
            if ft == FT_END {
                break;
            }
        }

        let trailing = &bytes[pos..];
        if !trailing.is_empty() {
            if trailing.iter().any(|&b| b != 0) {
                return Err(RecordError::malformed(
                    SID_OBJ,
                    format!("{} non-zero bytes after ftEnd", trailing.len()),
                ));
            }
            log::warn!(
                "dropping {} zero padding bytes after ftEnd in OBJ record",
                trailing.len()
            );
        }

        Ok(Self { sub_records })
    }

    pub fn write(&self, out: &mut ContinuableRecordOutput<'_>) {
        for sub in &self.sub_records {
            out.write_u16(sub.ft);
            out.write_u16(sub.data.len() as u16);
            out.write_bytes(&sub.data);
        }
    }
}
