//! End-to-end round trips over whole streams: continuation arithmetic,
//! lossless unknown records, and the drawing aggregate collapsing and
//! re-expanding inside a realistic worksheet record sequence.

use biff_escher::{EscherRecord, CLIENT_DATA, DG, DG_CONTAINER, SP, SP_CONTAINER};
use biff_stream::records::{
    BofRecord, EofRecord, LabelSstRecord, NoteRecord, NumberRecord, ObjRecord, ObjSubRecord,
    SstRecord, UnknownRecord, FT_CMO, FT_END,
};
use biff_stream::{
    read_records, DrawingAggregate, Frame, FrameIter, Record, RecordInputStream, RecordWriter,
    StreamConfig, UnicodeString, MAX_RECORD_DATA_SIZE, SID_CONTINUE,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn frames(bytes: &[u8], config: &StreamConfig) -> Vec<(u16, usize)> {
    FrameIter::new(bytes, config.clone())
        .map(|f| f.map(|Frame { sid, data, .. }| (sid, data.len())))
        .collect::<Result<_, _>>()
        .expect("well-formed frames")
}

#[test]
fn twenty_thousand_byte_payload_splits_at_the_documented_ceiling() {
    let payload: Vec<u8> = (0..20_000u32).map(|i| i as u8).collect();

    let config = StreamConfig::default();
    let mut writer = RecordWriter::new(config.clone());
    let mut out = writer.begin_record(0x00FC);
    out.write_bytes(&payload);
    out.end_record();
    let bytes = writer.into_bytes();

    assert_eq!(
        frames(&bytes, &config),
        vec![
            (0x00FC, MAX_RECORD_DATA_SIZE),
            (SID_CONTINUE, MAX_RECORD_DATA_SIZE),
            (SID_CONTINUE, 20_000 - 2 * MAX_RECORD_DATA_SIZE), // 3552
        ]
    );

    let mut input = RecordInputStream::new(&bytes, config);
    input.next_record().expect("record");
    assert_eq!(input.remaining(), 20_000);
    assert_eq!(input.read_all_continued_remainder().unwrap(), payload);
}

#[test]
fn worksheet_with_drawing_run_collapses_and_re_expands_byte_identically() {
    let escher = vec![EscherRecord::container(
        0,
        DG_CONTAINER,
        vec![
            EscherRecord::atom(0x0010, DG, vec![0u8; 8]),
            EscherRecord::container(
                0,
                SP_CONTAINER,
                vec![
                    EscherRecord::atom(0x0002, SP, vec![1u8; 8]),
                    EscherRecord::atom(0, CLIENT_DATA, Vec::new()),
                ],
            ),
        ],
    )];
    let obj = Record::Obj(ObjRecord {
        sub_records: vec![
            ObjSubRecord {
                ft: FT_CMO,
                data: vec![0x19, 0x00, 0x01, 0x00],
            },
            ObjSubRecord {
                ft: FT_END,
                data: Vec::new(),
            },
        ],
    });
    let aggregate = DrawingAggregate::new(
        escher,
        vec![obj],
        vec![Record::Note(NoteRecord {
            row: 0,
            col: 2,
            shape_id: 1,
            author: "reviewer".to_string(),
            ..NoteRecord::default()
        })],
    )
    .expect("aggregate");

    let sheet = vec![
        Record::Bof(BofRecord::worksheet()),
        Record::Sst(SstRecord {
            total_strings: 2,
            strings: vec![UnicodeString::new("first"), UnicodeString::new("второй")],
        }),
        Record::Number(NumberRecord {
            row: 0,
            col: 0,
            xf_index: 15,
            value: 1.25,
        }),
        Record::LabelSst(LabelSstRecord {
            row: 0,
            col: 1,
            xf_index: 15,
            sst_index: 1,
        }),
        Record::Aggregate(aggregate),
        Record::Unknown(UnknownRecord {
            sid: 0x01C0,
            data: vec![0x07, 0x00],
        }),
        Record::Eof(EofRecord),
    ];

    let config = StreamConfig::default();
    let mut writer = RecordWriter::new(config.clone());
    for record in &sheet {
        record.write(&mut writer).unwrap();
    }
    let original = writer.into_bytes();

    // Reading expands the aggregate into its physical records; collapsing
    // the drawing run restores the logical view.
    let mut list = read_records(&original, config.clone()).expect("read");
    list.aggregate_drawing_records().expect("collapse");
    assert_eq!(list.as_slice(), sheet.as_slice());

    assert_eq!(list.serialize(config).expect("serialize"), original);
}

#[test]
fn unknown_records_round_trip_byte_identically() {
    let config = StreamConfig::default();
    let mut stream = Vec::new();
    for (sid, len) in [(0x0031u16, 20usize), (0x0085, 14), (0x0866, 0)] {
        stream.extend_from_slice(&sid.to_le_bytes());
        stream.extend_from_slice(&(len as u16).to_le_bytes());
        stream.extend((0..len).map(|i| i as u8));
    }

    let list = read_records(&stream, config.clone()).expect("read");
    assert!(list
        .iter()
        .all(|record| matches!(record, Record::Unknown(_))));
    assert_eq!(list.serialize(config).expect("serialize"), stream);
}

proptest! {
    // Continuation transparency: any payload comes back exactly, in the
    // exact number of frames the boundary arithmetic predicts.
    #[test]
    fn continuation_transparency(payload in proptest::collection::vec(any::<u8>(), 0..4000), max in 16usize..512) {
        let config = StreamConfig {
            max_record_data_size: max,
            ..StreamConfig::default()
        };
        let mut writer = RecordWriter::new(config.clone());
        let mut out = writer.begin_record(0x00AA);
        out.write_bytes(&payload);
        out.end_record();
        let bytes = writer.into_bytes();

        let expected_frames = 1 + payload.len().saturating_sub(max).div_ceil(max);
        prop_assert_eq!(frames(&bytes, &config).len(), expected_frames);

        let mut input = RecordInputStream::new(&bytes, config);
        input.next_record().unwrap();
        prop_assert_eq!(input.remaining(), payload.len());
        prop_assert_eq!(input.read_all_continued_remainder().unwrap(), payload);
    }

    #[test]
    fn strings_round_trip_at_any_frame_size(text in "[ -~ЀЁА-яξ例]{0,120}", max in 8usize..64) {
        let config = StreamConfig {
            max_record_data_size: max,
            ..StreamConfig::default()
        };
        let s = UnicodeString::new(text);

        let mut writer = RecordWriter::new(config.clone());
        let mut out = writer.begin_record(0x00FC);
        biff_stream::strings::write_unicode_string(&mut out, 0x00FC, &s, config.codepage).unwrap();
        out.end_record();
        let bytes = writer.into_bytes();

        let mut input = RecordInputStream::new(&bytes, config.clone());
        input.next_record().unwrap();
        let decoded = biff_stream::strings::read_unicode_string(&mut input, config.codepage).unwrap();
        prop_assert_eq!(decoded, s);
    }
}
