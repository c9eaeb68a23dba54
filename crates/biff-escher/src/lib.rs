//! OfficeArt ("Escher") record tree codec.
//!
//! Escher drawing data is stored inside BIFF `MSODRAWING` record payloads,
//! but uses its own framing convention, distinct from the outer BIFF
//! `(sid:u16, len:u16)` headers: every Escher record starts with an 8-byte
//! header `[ver_instance:u16][record_id:u16][length:u32]` (all
//! little-endian). Records whose header version nibble is `0xF` are
//! containers; their payload is a sequence of child records. Everything
//! else is an atom whose payload this crate treats as opaque bytes, so
//! unrecognized atoms round-trip losslessly.
//!
//! The caller (the drawing aggregate in `biff-stream`) concatenates the
//! drawing-record payload bytes of a sheet into one buffer, decodes it with
//! [`decode_records`], and re-serializes with [`serialize_records`] or
//! [`serialize_with_offsets`] when it needs the shape split points back.

use thiserror::Error;

/// Escher record header size on the wire.
pub const HEADER_SIZE: usize = 8;

/// Version nibble marking a container record.
const CONTAINER_VERSION: u16 = 0x000F;

// Container record ids ([MS-ODRAW] 2.2).
pub const DGG_CONTAINER: u16 = 0xF000;
pub const BSTORE_CONTAINER: u16 = 0xF001;
pub const DG_CONTAINER: u16 = 0xF002;
pub const SPGR_CONTAINER: u16 = 0xF003;
pub const SP_CONTAINER: u16 = 0xF004;
pub const SOLVER_CONTAINER: u16 = 0xF005;

// Atom ids the drawing aggregate pairs with outer object records.
pub const CLIENT_TEXTBOX: u16 = 0xF00D;
pub const CLIENT_DATA: u16 = 0xF011;

// Other common atom ids, kept for callers building trees by hand.
pub const DG: u16 = 0xF008;
pub const SPGR: u16 = 0xF009;
pub const SP: u16 = 0xF00A;
pub const OPT: u16 = 0xF00B;
pub const CLIENT_ANCHOR: u16 = 0xF010;

// Nesting cap: real drawings are a handful of levels deep, so this only
// trips on corrupt or hostile input.
const MAX_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum EscherError {
    #[error("truncated escher record header at offset {offset}")]
    TruncatedHeader { offset: usize },
    #[error(
        "escher record 0x{record_id:04X} at offset {offset} declares {declared} payload bytes but only {available} remain"
    )]
    TruncatedPayload {
        record_id: u16,
        offset: usize,
        declared: usize,
        available: usize,
    },
    #[error("escher container 0x{record_id:04X} at offset {offset} nested deeper than {MAX_DEPTH} levels")]
    TooDeep { record_id: u16, offset: usize },
    #[error(
        "escher container 0x{record_id:04X} at offset {offset} child overruns the declared container length"
    )]
    ChildOverrun { record_id: u16, offset: usize },
}

/// One node of the Escher tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscherRecord {
    /// Combined version/instance bitfield from the header. For containers
    /// the low nibble is always `0xF`.
    pub ver_instance: u16,
    pub record_id: u16,
    pub payload: EscherPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscherPayload {
    Container(Vec<EscherRecord>),
    Atom(Vec<u8>),
}

impl EscherRecord {
    pub fn container(ver_instance: u16, record_id: u16, children: Vec<EscherRecord>) -> Self {
        Self {
            ver_instance: ver_instance | CONTAINER_VERSION,
            record_id,
            payload: EscherPayload::Container(children),
        }
    }

    pub fn atom(ver_instance: u16, record_id: u16, data: Vec<u8>) -> Self {
        Self {
            ver_instance,
            record_id,
            payload: EscherPayload::Atom(data),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.payload, EscherPayload::Container(_))
    }

    /// Total serialized size, header included.
    pub fn record_size(&self) -> usize {
        HEADER_SIZE + self.payload_size()
    }

    fn payload_size(&self) -> usize {
        match &self.payload {
            EscherPayload::Container(children) => {
                children.iter().map(EscherRecord::record_size).sum()
            }
            EscherPayload::Atom(data) => data.len(),
        }
    }

    /// Child records, or an empty slice for atoms.
    pub fn children(&self) -> &[EscherRecord] {
        match &self.payload {
            EscherPayload::Container(children) => children,
            EscherPayload::Atom(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [EscherRecord] {
        match &mut self.payload {
            EscherPayload::Container(children) => children,
            EscherPayload::Atom(_) => &mut [],
        }
    }

    /// True for the atom kinds the drawing layer pairs with an outer object
    /// record (client data and client textbox).
    pub fn is_shape_anchor(&self) -> bool {
        self.record_id == CLIENT_DATA || self.record_id == CLIENT_TEXTBOX
    }

    fn serialize_into(&self, out: &mut Vec<u8>, leaf_end_offsets: Option<&mut Vec<usize>>) {
        out.extend_from_slice(&self.ver_instance.to_le_bytes());
        out.extend_from_slice(&self.record_id.to_le_bytes());
        out.extend_from_slice(&(self.payload_size() as u32).to_le_bytes());
        match &self.payload {
            EscherPayload::Container(children) => {
                // A container's own header does not count as a split point;
                // only anchor atoms inside it do.
                if let Some(offsets) = leaf_end_offsets {
                    for child in children {
                        child.serialize_into(out, Some(offsets));
                    }
                } else {
                    for child in children {
                        child.serialize_into(out, None);
                    }
                }
            }
            EscherPayload::Atom(data) => {
                out.extend_from_slice(data);
                if let Some(offsets) = leaf_end_offsets {
                    if self.is_shape_anchor() {
                        offsets.push(out.len());
                    }
                }
            }
        }
    }
}

/// Decode a flat buffer of concatenated Escher records into a forest.
///
/// The buffer must be exactly consumed; leftover bytes after the last
/// record, or a record overrunning the buffer, are fatal.
pub fn decode_records(data: &[u8]) -> Result<Vec<EscherRecord>, EscherError> {
    let (records, consumed) = decode_run(data, 0, data.len(), 0)?;
    debug_assert_eq!(consumed, data.len());
    Ok(records)
}

fn decode_run(
    data: &[u8],
    start: usize,
    len: usize,
    depth: usize,
) -> Result<(Vec<EscherRecord>, usize), EscherError> {
    let end = start + len;
    let mut offset = start;
    let mut out = Vec::new();

    while offset < end {
        if end - offset < HEADER_SIZE {
            return Err(EscherError::TruncatedHeader { offset });
        }
        let ver_instance = u16::from_le_bytes([data[offset], data[offset + 1]]);
        let record_id = u16::from_le_bytes([data[offset + 2], data[offset + 3]]);
        let declared = u32::from_le_bytes([
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ]) as usize;

        let payload_start = offset + HEADER_SIZE;
        let available = end - payload_start;
        if declared > available {
            return Err(EscherError::TruncatedPayload {
                record_id,
                offset,
                declared,
                available,
            });
        }

        let payload = if ver_instance & CONTAINER_VERSION == CONTAINER_VERSION {
            if depth + 1 > MAX_DEPTH {
                return Err(EscherError::TooDeep { record_id, offset });
            }
            let (children, consumed) = decode_run(data, payload_start, declared, depth + 1)?;
            if consumed != payload_start + declared {
                return Err(EscherError::ChildOverrun { record_id, offset });
            }
            EscherPayload::Container(children)
        } else {
            EscherPayload::Atom(data[payload_start..payload_start + declared].to_vec())
        };

        out.push(EscherRecord {
            ver_instance,
            record_id,
            payload,
        });
        offset = payload_start + declared;
    }

    Ok((out, offset))
}

/// Serialize a forest back to one contiguous buffer.
pub fn serialize_records(records: &[EscherRecord]) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.iter().map(EscherRecord::record_size).sum());
    for record in records {
        record.serialize_into(&mut out, None);
    }
    out
}

/// Serialize a forest, also returning the buffer offset just past each
/// shape-anchor atom (client data / client textbox), in serialization
/// order. These offsets are the split points between per-shape drawing
/// slices when the buffer is re-framed into the outer record stream.
pub fn serialize_with_offsets(records: &[EscherRecord]) -> (Vec<u8>, Vec<usize>) {
    let mut out = Vec::with_capacity(records.iter().map(EscherRecord::record_size).sum());
    let mut offsets = Vec::new();
    for record in records {
        record.serialize_into(&mut out, Some(&mut offsets));
    }
    (out, offsets)
}

/// Visit every record of the forest depth-first, in stream order.
pub fn for_each_record<'a>(records: &'a [EscherRecord], f: &mut impl FnMut(&'a EscherRecord)) {
    for record in records {
        f(record);
        for_each_record(record.children(), f);
    }
}

/// Count shape-anchor atoms in stream order.
pub fn count_shape_anchors(records: &[EscherRecord]) -> usize {
    let mut count = 0;
    for_each_record(records, &mut |r| {
        if r.is_shape_anchor() {
            count += 1;
        }
    });
    count
}
