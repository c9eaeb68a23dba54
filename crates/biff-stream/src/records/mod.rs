//! Typed records and the sid dispatch table.
//!
//! [`decode`] is total over the 16-bit sid space: sids without a decoder
//! fall through to [`UnknownRecord`], which preserves the raw bytes for a
//! lossless rewrite. Decoders read through [`RecordInputStream`], so a
//! record split across CONTINUE frames decodes the same as a contiguous
//! one.

mod bof;
mod cell;
mod drawing;
mod note;
mod obj;
mod sst;
mod txo;
mod unknown;

pub use bof::{BofRecord, EofRecord, BOF_VERSION_BIFF8, STREAM_TYPE_WORKBOOK, STREAM_TYPE_WORKSHEET};
pub use cell::{BlankRecord, LabelSstRecord, NumberRecord};
pub use drawing::{ContinueRecord, DrawingRecord};
pub use note::{NoteRecord, NOTE_FLAG_SHOW};
pub use obj::{ObjRecord, ObjSubRecord, FT_CMO, FT_END};
pub use sst::SstRecord;
pub use txo::TextObjectRecord;
pub use unknown::UnknownRecord;

use crate::aggregate::DrawingAggregate;
use crate::input::RecordInputStream;
use crate::list::RecordList;
use crate::output::RecordWriter;
use crate::{RecordError, StreamConfig};

/// Record ids with typed decoders.
pub mod sids {
    pub use crate::frame::{SID_BOF, SID_CONTINUE, SID_EOF};

    pub const SID_NOTE: u16 = 0x001C;
    pub const SID_OBJ: u16 = 0x005D;
    pub const SID_DRAWING: u16 = 0x00EC;
    pub const SID_SST: u16 = 0x00FC;
    pub const SID_LABELSST: u16 = 0x00FD;
    pub const SID_BLANK: u16 = 0x0201;
    pub const SID_NUMBER: u16 = 0x0203;
    pub const SID_TXO: u16 = 0x01B6;
}

use sids::*;

/// One decoded logical record. Owns all of its data; `Clone` produces a
/// fully independent deep copy.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Bof(BofRecord),
    Eof(EofRecord),
    Number(NumberRecord),
    Blank(BlankRecord),
    LabelSst(LabelSstRecord),
    Sst(SstRecord),
    Drawing(DrawingRecord),
    Obj(ObjRecord),
    TextObject(TextObjectRecord),
    Note(NoteRecord),
    /// A raw CONTINUE frame no decoder absorbed; input to drawing
    /// aggregation.
    Continue(ContinueRecord),
    Unknown(UnknownRecord),
    /// The collapsed drawing/object run of one sheet.
    Aggregate(DrawingAggregate),
}

/// True if `sid` has a typed decoder; false means the opaque fallback.
pub fn is_decoded(sid: u16) -> bool {
    matches!(
        sid,
        SID_BOF
            | SID_EOF
            | SID_NUMBER
            | SID_BLANK
            | SID_LABELSST
            | SID_SST
            | SID_DRAWING
            | SID_OBJ
            | SID_TXO
            | SID_NOTE
            | SID_CONTINUE
    )
}

/// Decode the current logical record. Total: unknown sids yield
/// [`Record::Unknown`], never an error; a typed decoder may still fail on
/// structurally invalid payloads.
pub fn decode(sid: u16, input: &mut RecordInputStream<'_>) -> Result<Record, RecordError> {
    Ok(match sid {
        SID_BOF => Record::Bof(BofRecord::read(input)?),
        SID_EOF => Record::Eof(EofRecord::read(input)?),
        SID_NUMBER => Record::Number(NumberRecord::read(input)?),
        SID_BLANK => Record::Blank(BlankRecord::read(input)?),
        SID_LABELSST => Record::LabelSst(LabelSstRecord::read(input)?),
        SID_SST => Record::Sst(SstRecord::read(input)?),
        SID_DRAWING => Record::Drawing(DrawingRecord::read(input)?),
        SID_OBJ => Record::Obj(ObjRecord::read(input)?),
        SID_TXO => Record::TextObject(TextObjectRecord::read(input)?),
        SID_NOTE => Record::Note(NoteRecord::read(input)?),
        SID_CONTINUE => Record::Continue(ContinueRecord::read(input)?),
        _ => Record::Unknown(UnknownRecord::read(input)?),
    })
}

impl Record {
    /// The record id written to the primary frame header.
    pub fn sid(&self) -> u16 {
        match self {
            Record::Bof(_) => SID_BOF,
            Record::Eof(_) => SID_EOF,
            Record::Number(_) => SID_NUMBER,
            Record::Blank(_) => SID_BLANK,
            Record::LabelSst(_) => SID_LABELSST,
            Record::Sst(_) => SID_SST,
            Record::Drawing(_) => SID_DRAWING,
            Record::Obj(_) => SID_OBJ,
            Record::TextObject(_) => SID_TXO,
            Record::Note(_) => SID_NOTE,
            Record::Continue(_) => SID_CONTINUE,
            Record::Unknown(r) => r.sid,
            Record::Aggregate(_) => SID_DRAWING,
        }
    }

    /// Serialize this record, splitting into CONTINUE frames as needed.
    /// An aggregate expands back into its full drawing/object record run.
    pub fn write(&self, writer: &mut RecordWriter) -> Result<(), RecordError> {
        let codepage = writer.config().codepage;
        match self {
            Record::Aggregate(aggregate) => return aggregate.serialize(writer),
            Record::Sst(r) => {
                let mut out = writer.begin_record(SID_SST);
                r.write(&mut out, codepage)?;
            }
            Record::TextObject(r) => {
                let mut out = writer.begin_record(SID_TXO);
                r.write(&mut out, codepage)?;
            }
            Record::Note(r) => {
                let mut out = writer.begin_record(SID_NOTE);
                r.write(&mut out, codepage)?;
            }
            Record::Bof(r) => r.write(&mut writer.begin_record(SID_BOF)),
            Record::Eof(_) => writer.begin_record(SID_EOF).end_record(),
            Record::Number(r) => r.write(&mut writer.begin_record(SID_NUMBER)),
            Record::Blank(r) => r.write(&mut writer.begin_record(SID_BLANK)),
            Record::LabelSst(r) => r.write(&mut writer.begin_record(SID_LABELSST)),
            Record::Drawing(r) => r.write(&mut writer.begin_record(SID_DRAWING)),
            Record::Obj(r) => r.write(&mut writer.begin_record(SID_OBJ)),
            Record::Continue(r) => r.write(&mut writer.begin_record(SID_CONTINUE)),
            Record::Unknown(r) => r.write(&mut writer.begin_record(r.sid)),
        }
        Ok(())
    }
}

/// Decode every record in `stream` into a [`RecordList`].
pub fn read_records(stream: &[u8], config: StreamConfig) -> Result<RecordList, RecordError> {
    let mut input = RecordInputStream::new(stream, config);
    let mut records = RecordList::new();
    while input.has_next_record() {
        let sid = input.next_record()?;
        records.push(decode(sid, &mut input)?);
    }
    Ok(records)
}
