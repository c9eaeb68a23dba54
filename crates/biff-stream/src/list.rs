//! Ordered record container for one substream.

use std::ops::Range;

use crate::aggregate::DrawingAggregate;
use crate::output::RecordWriter;
use crate::records::Record;
use crate::{RecordError, StreamConfig};

/// The decoded records of one substream, in stream order.
///
/// Beyond plain sequence operations, supports replacing a contiguous index
/// range with a single record. That is how a sheet's drawing/object run
/// collapses into one [`DrawingAggregate`] element while every surrounding
/// record keeps its relative position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordList {
    records: Vec<Record>,
}

impl RecordList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[Record] {
        &self.records
    }

    /// Replace the records at `range` with the single `replacement`.
    pub fn replace_range(&mut self, range: Range<usize>, replacement: Record) {
        self.records.splice(range, std::iter::once(replacement));
    }

    /// Index range of the drawing/object run, if the list has one: from the
    /// first `MSODRAWING` record through the trailing `NOTE`s behind it.
    pub fn find_drawing_run(&self) -> Option<Range<usize>> {
        let start = self
            .records
            .iter()
            .position(|r| matches!(r, Record::Drawing(_)))?;
        let mut end = start;
        while end < self.records.len() {
            match &self.records[end] {
                Record::Drawing(_)
                | Record::Continue(_)
                | Record::Obj(_)
                | Record::TextObject(_)
                | Record::Note(_) => end += 1,
                _ => break,
            }
        }
        Some(start..end)
    }

    /// Collapse the drawing/object run into one [`Record::Aggregate`]
    /// element. No-op when the list has no drawing records.
    pub fn aggregate_drawing_records(&mut self) -> Result<(), RecordError> {
        let Some(range) = self.find_drawing_run() else {
            return Ok(());
        };
        let aggregate = DrawingAggregate::aggregate(&self.records[range.clone()])?;
        self.replace_range(range, Record::Aggregate(aggregate));
        Ok(())
    }

    /// Serialize every record back to stream bytes; aggregates expand into
    /// their full record runs.
    pub fn serialize(&self, config: StreamConfig) -> Result<Vec<u8>, RecordError> {
        let mut writer = RecordWriter::new(config);
        for record in &self.records {
            record.write(&mut writer)?;
        }
        Ok(writer.into_bytes())
    }

    /// Total stream size of the serialized list, headers included.
    pub fn serialized_size(&self, config: StreamConfig) -> Result<usize, RecordError> {
        Ok(self.serialize(config)?.len())
    }
}

impl From<Vec<Record>> for RecordList {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl IntoIterator for RecordList {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordList {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BlankRecord, BofRecord, EofRecord, UnknownRecord};
    use pretty_assertions::assert_eq;

    fn unknown(sid: u16) -> Record {
        Record::Unknown(UnknownRecord {
            sid,
            data: Vec::new(),
        })
    }

    #[test]
    fn replace_range_preserves_surrounding_order() {
        let mut list = RecordList::from(vec![
            unknown(0x0001),
            unknown(0x0002),
            unknown(0x0003),
            unknown(0x0004),
        ]);
        list.replace_range(1..3, unknown(0x00AA));

        let sids: Vec<u16> = list.iter().map(Record::sid).collect();
        assert_eq!(sids, vec![0x0001, 0x00AA, 0x0004]);
    }

    #[test]
    fn finds_drawing_run_boundaries() {
        let list = RecordList::from(vec![
            Record::Bof(BofRecord::worksheet()),
            Record::Drawing(crate::records::DrawingRecord { data: Vec::new() }),
            Record::Obj(crate::records::ObjRecord::default()),
            Record::Note(crate::records::NoteRecord::default()),
            Record::Blank(BlankRecord {
                row: 0,
                col: 0,
                xf_index: 0,
            }),
            Record::Eof(EofRecord),
        ]);
        assert_eq!(list.find_drawing_run(), Some(1..4));
    }

    #[test]
    fn list_without_drawings_aggregates_to_itself() {
        let mut list = RecordList::from(vec![Record::Bof(BofRecord::worksheet())]);
        let before = list.clone();
        list.aggregate_drawing_records().expect("aggregate");
        assert_eq!(list, before);
    }

    #[test]
    fn serializes_records_in_order() {
        let list = RecordList::from(vec![
            Record::Bof(BofRecord::worksheet()),
            Record::Eof(EofRecord),
        ]);
        let bytes = list.serialize(StreamConfig::default()).expect("serialize");

        let decoded = crate::records::read_records(&bytes, StreamConfig::default()).unwrap();
        assert_eq!(decoded, list);
    }
}
