//! Reassembly of a sheet's drawing data.
//!
//! On the wire, one sheet's Escher stream is chopped across `MSODRAWING`
//! (and `CONTINUE`) records, physically interleaved with the `OBJ`/`TXO`
//! records describing each shape's non-Escher half. [`DrawingAggregate`]
//! concatenates the drawing-payload bytes in stream order, decodes them as
//! one Escher forest, and pairs every shape-anchor atom (client data /
//! client textbox) with the next object record in encounter order. The
//! pairing is positional, not keyed: the aggregate carries the anchors and
//! the object records as parallel ordered sequences, and reordering either
//! side independently corrupts the association.
//!
//! Serialization re-derives the interleaving: the forest is serialized to
//! one buffer, the buffer is re-split at each anchor's end offset, each
//! slice becomes an `MSODRAWING` record (plus `CONTINUE` frames past the
//! frame ceiling) followed by its paired object record, and the tail
//! records (`NOTE`) follow unchanged. A byte-count mismatch between the
//! emitted run and the independently computed size is fatal.

use biff_escher::{
    count_shape_anchors, decode_records, serialize_with_offsets, EscherPayload, EscherRecord,
};

use crate::frame::HEADER_SIZE;
use crate::output::RecordWriter;
use crate::records::sids::SID_DRAWING;
use crate::records::Record;
use crate::{RecordError, StreamConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct DrawingAggregate {
    escher: Vec<EscherRecord>,
    /// Object records in anchor order; `shape_objs[i]` belongs to the
    /// i-th shape-anchor atom of `escher` in stream order.
    shape_objs: Vec<Record>,
    /// Records trailing the drawing run with no anchor pairing.
    tail: Vec<Record>,
}

impl DrawingAggregate {
    /// Build an aggregate from already-decoded parts, validating the
    /// anchor/object pairing.
    pub fn new(
        escher: Vec<EscherRecord>,
        shape_objs: Vec<Record>,
        tail: Vec<Record>,
    ) -> Result<Self, RecordError> {
        let anchors = count_shape_anchors(&escher);
        if anchors != shape_objs.len() {
            return Err(RecordError::ShapeObjectMismatch {
                anchors,
                objects: shape_objs.len(),
            });
        }
        Ok(Self {
            escher,
            shape_objs,
            tail,
        })
    }

    /// Collapse a contiguous drawing run of top-level records into one
    /// aggregate.
    ///
    /// Accepts `MSODRAWING` and raw `CONTINUE` records (their payloads are
    /// the byte soup), `OBJ`/`TXO` records (collected in encounter order)
    /// and trailing `NOTE` records. Any other record means the caller
    /// sliced the run wrong.
    pub fn aggregate(records: &[Record]) -> Result<Self, RecordError> {
        let mut buf = Vec::new();
        let mut shape_objs = Vec::new();
        let mut tail = Vec::new();

        for record in records {
            match record {
                Record::Drawing(drawing) => buf.extend_from_slice(&drawing.data),
                Record::Continue(cont) => buf.extend_from_slice(&cont.data),
                Record::Obj(_) | Record::TextObject(_) => shape_objs.push(record.clone()),
                Record::Note(_) => tail.push(record.clone()),
                other => {
                    return Err(RecordError::malformed(
                        SID_DRAWING,
                        format!("record 0x{:04X} inside a drawing run", other.sid()),
                    ))
                }
            }
        }

        let escher = decode_records(&buf)?;
        Self::new(escher, shape_objs, tail)
    }

    pub fn escher(&self) -> &[EscherRecord] {
        &self.escher
    }

    pub fn escher_mut(&mut self) -> &mut Vec<EscherRecord> {
        &mut self.escher
    }

    /// Object records in anchor order.
    pub fn shape_objects(&self) -> &[Record] {
        &self.shape_objs
    }

    pub fn tail_records(&self) -> &[Record] {
        &self.tail
    }

    pub fn shape_count(&self) -> usize {
        self.shape_objs.len()
    }

    /// Serialize the full drawing run back into `writer`.
    pub fn serialize(&self, writer: &mut RecordWriter) -> Result<(), RecordError> {
        let expected = self.record_size(writer.config())?;
        let start = writer.len();

        let (bytes, anchor_ends) = serialize_with_offsets(&self.escher);
        if anchor_ends.len() != self.shape_objs.len() {
            return Err(RecordError::ShapeObjectMismatch {
                anchors: anchor_ends.len(),
                objects: self.shape_objs.len(),
            });
        }

        let mut prev = 0;
        for (&end, obj) in anchor_ends.iter().zip(&self.shape_objs) {
            let mut out = writer.begin_record(SID_DRAWING);
            out.write_bytes(&bytes[prev..end]);
            out.end_record();
            obj.write(writer)?;
            prev = end;
        }
        if prev < bytes.len() {
            let mut out = writer.begin_record(SID_DRAWING);
            out.write_bytes(&bytes[prev..]);
            out.end_record();
        }
        for record in &self.tail {
            record.write(writer)?;
        }

        let written = writer.len() - start;
        if written != expected {
            return Err(RecordError::AggregateSizeMismatch { written, expected });
        }
        Ok(())
    }

    /// Serialized size of the whole run, computed from the forest's
    /// arithmetic sizes rather than by serializing the Escher data, so it
    /// cross-checks `serialize`.
    pub fn record_size(&self, config: &StreamConfig) -> Result<usize, RecordError> {
        let max = config.max_record_data_size;

        let total_escher: usize = self.escher.iter().map(EscherRecord::record_size).sum();
        let mut anchor_ends = Vec::new();
        let mut offset = 0;
        collect_anchor_ends(&self.escher, &mut offset, &mut anchor_ends);
        debug_assert_eq!(offset, total_escher);

        let mut total = 0;
        let mut prev = 0;
        for &end in &anchor_ends {
            total += framed_size(end - prev, max);
            prev = end;
        }
        if prev < total_escher {
            total += framed_size(total_escher - prev, max);
        }

        let mut scratch = RecordWriter::new(config.clone());
        for record in self.shape_objs.iter().chain(&self.tail) {
            record.write(&mut scratch)?;
        }
        Ok(total + scratch.len())
    }
}

/// Bytes one drawing slice occupies once framed: payload plus one header
/// per frame, the first frame holding up to `max` bytes and each CONTINUE
/// frame likewise.
fn framed_size(len: usize, max: usize) -> usize {
    let frames = if len <= max { 1 } else { len.div_ceil(max) };
    len + frames * HEADER_SIZE
}

/// Offsets just past each shape-anchor atom, from arithmetic sizes alone.
/// Mirrors the offsets `serialize_with_offsets` reports during actual
/// serialization.
fn collect_anchor_ends(records: &[EscherRecord], offset: &mut usize, ends: &mut Vec<usize>) {
    for record in records {
        *offset += biff_escher::HEADER_SIZE;
        match &record.payload {
            EscherPayload::Container(children) => collect_anchor_ends(children, offset, ends),
            EscherPayload::Atom(data) => {
                *offset += data.len();
                if record.is_shape_anchor() {
                    ends.push(*offset);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::sids::{SID_NOTE, SID_OBJ};
    use crate::records::{
        read_records, NoteRecord, ObjRecord, ObjSubRecord, TextObjectRecord, FT_CMO, FT_END,
    };
    use biff_escher::{CLIENT_DATA, CLIENT_TEXTBOX, DG, DG_CONTAINER, SP, SP_CONTAINER};
    use pretty_assertions::assert_eq;

    fn obj(id: u16) -> Record {
        Record::Obj(ObjRecord {
            sub_records: vec![
                ObjSubRecord {
                    ft: FT_CMO,
                    data: vec![0x08, 0x00, id as u8, (id >> 8) as u8],
                },
                ObjSubRecord {
                    ft: FT_END,
                    data: Vec::new(),
                },
            ],
        })
    }

    fn shape(anchor_id: u16, filler: usize) -> EscherRecord {
        EscherRecord::container(
            0,
            SP_CONTAINER,
            vec![
                EscherRecord::atom(0x0002, SP, vec![0x11; 8]),
                EscherRecord::atom(0, anchor_id, vec![0x22; filler]),
            ],
        )
    }

    fn two_shape_tree() -> Vec<EscherRecord> {
        vec![EscherRecord::container(
            0,
            DG_CONTAINER,
            vec![
                EscherRecord::atom(0x0010, DG, vec![0x33; 8]),
                shape(CLIENT_DATA, 0),
                shape(CLIENT_TEXTBOX, 4),
            ],
        )]
    }

    #[test]
    fn pairing_mismatch_is_fatal() {
        let err = DrawingAggregate::new(two_shape_tree(), vec![obj(1)], Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            RecordError::ShapeObjectMismatch {
                anchors: 2,
                objects: 1,
            }
        ));
    }

    #[test]
    fn serialize_interleaves_objects_after_their_shapes() {
        let aggregate = DrawingAggregate::new(
            two_shape_tree(),
            vec![obj(1), obj(2)],
            vec![Record::Note(NoteRecord {
                row: 1,
                col: 1,
                shape_id: 2,
                author: "a".to_string(),
                ..NoteRecord::default()
            })],
        )
        .expect("aggregate");

        let config = StreamConfig::default();
        let mut writer = RecordWriter::new(config.clone());
        aggregate.serialize(&mut writer).expect("serialize");
        let bytes = writer.into_bytes();

        let records = read_records(&bytes, config).expect("read back");
        let sids: Vec<u16> = records.iter().map(Record::sid).collect();
        assert_eq!(
            sids,
            vec![SID_DRAWING, SID_OBJ, SID_DRAWING, SID_OBJ, SID_NOTE]
        );
    }

    #[test]
    fn aggregate_then_serialize_reproduces_the_run_exactly() {
        let aggregate =
            DrawingAggregate::new(two_shape_tree(), vec![obj(1), obj(2)], Vec::new()).unwrap();

        let config = StreamConfig::default();
        let mut writer = RecordWriter::new(config.clone());
        aggregate.serialize(&mut writer).unwrap();
        let original = writer.into_bytes();

        let records = read_records(&original, config.clone()).unwrap();
        let reassembled = DrawingAggregate::aggregate(records.as_slice()).expect("re-aggregate");
        assert_eq!(reassembled, aggregate);

        let mut writer = RecordWriter::new(config);
        reassembled.serialize(&mut writer).unwrap();
        assert_eq!(writer.into_bytes(), original);
    }

    #[test]
    fn aggregates_byte_soup_split_across_drawing_and_continue_records() {
        // The same escher buffer arrives once as a single fragment and once
        // split at an arbitrary byte position; both decode identically.
        let tree = two_shape_tree();
        let bytes = biff_escher::serialize_records(&tree);

        let whole = vec![
            Record::Drawing(crate::records::DrawingRecord { data: bytes.clone() }),
            obj(1),
            obj(2),
        ];
        let split = vec![
            Record::Drawing(crate::records::DrawingRecord {
                data: bytes[..13].to_vec(),
            }),
            Record::Continue(crate::records::ContinueRecord {
                data: bytes[13..].to_vec(),
            }),
            obj(1),
            obj(2),
        ];

        let a = DrawingAggregate::aggregate(&whole).unwrap();
        let b = DrawingAggregate::aggregate(&split).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_shapes_round_trips() {
        let tree = vec![EscherRecord::container(
            0,
            DG_CONTAINER,
            vec![EscherRecord::atom(0x0010, DG, vec![0x44; 8])],
        )];
        let aggregate = DrawingAggregate::new(tree, Vec::new(), Vec::new()).unwrap();

        let config = StreamConfig::default();
        let mut writer = RecordWriter::new(config.clone());
        aggregate.serialize(&mut writer).unwrap();

        let records = read_records(writer.as_bytes(), config).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records.get(0).unwrap().sid(), SID_DRAWING);

        let reassembled = DrawingAggregate::aggregate(records.as_slice()).unwrap();
        assert_eq!(reassembled, aggregate);
    }

    #[test]
    fn one_shape_round_trips() {
        let tree = vec![shape(CLIENT_DATA, 2)];
        let aggregate = DrawingAggregate::new(tree, vec![obj(9)], Vec::new()).unwrap();

        let config = StreamConfig::default();
        let mut writer = RecordWriter::new(config.clone());
        aggregate.serialize(&mut writer).unwrap();
        let records = read_records(writer.as_bytes(), config).unwrap();
        let reassembled = DrawingAggregate::aggregate(records.as_slice()).unwrap();
        assert_eq!(reassembled, aggregate);
    }

    #[test]
    fn record_size_matches_serialized_length() {
        let aggregate = DrawingAggregate::new(
            two_shape_tree(),
            vec![obj(1), obj(2)],
            vec![Record::Note(NoteRecord {
                shape_id: 2,
                author: "author".to_string(),
                ..NoteRecord::default()
            })],
        )
        .unwrap();

        let config = StreamConfig::default();
        let expected = aggregate.record_size(&config).unwrap();
        let mut writer = RecordWriter::new(config);
        aggregate.serialize(&mut writer).unwrap();
        assert_eq!(writer.len(), expected);
    }

    #[test]
    fn oversized_shape_slice_spills_into_continue_frames() {
        let config = StreamConfig::default();
        let big = config.max_record_data_size * 2 + 100;
        let tree = vec![shape(CLIENT_DATA, big)];
        let aggregate = DrawingAggregate::new(tree, vec![obj(1)], Vec::new()).unwrap();

        let mut writer = RecordWriter::new(config.clone());
        aggregate.serialize(&mut writer).unwrap();

        let records = read_records(writer.as_bytes(), config).unwrap();
        let sids: Vec<u16> = records.iter().map(Record::sid).collect();
        assert_eq!(
            sids,
            vec![
                SID_DRAWING,
                crate::frame::SID_CONTINUE,
                crate::frame::SID_CONTINUE,
                SID_OBJ,
            ]
        );

        let reassembled = DrawingAggregate::aggregate(records.as_slice()).unwrap();
        assert_eq!(reassembled, aggregate);
    }

    #[test]
    fn foreign_record_in_run_is_rejected() {
        let records = vec![Record::Eof(crate::records::EofRecord)];
        let err = DrawingAggregate::aggregate(&records).unwrap_err();
        assert!(matches!(err, RecordError::Malformed { .. }));
    }
}
