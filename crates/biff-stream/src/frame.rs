//! Physical record framing.
//!
//! A BIFF workbook stream is a flat sequence of frames, each headed by a
//! 2-byte little-endian record id (`sid`) and a 2-byte little-endian payload
//! length. Frames using the reserved [`SID_CONTINUE`] id carry the next
//! slice of the preceding record's payload; reassembly happens one layer up
//! in [`crate::input::RecordInputStream`]. This module only knows about
//! single frames: bounds-checked header reads and a diagnostic iterator
//! over raw frames.

use crate::{RecordError, StreamConfig};

/// Record header size on the wire.
pub const HEADER_SIZE: usize = 4;

/// Reserved continuation record id.
pub const SID_CONTINUE: u16 = 0x003C;
/// End of a substream.
pub const SID_EOF: u16 = 0x000A;
/// BIFF8 beginning-of-substream id.
pub const SID_BOF: u16 = 0x0809;

/// Default per-frame payload ceiling. The format allows lengths up to
/// 0xFFFF, but writers cap payloads at 8224 bytes and split the rest into
/// CONTINUE frames; the same value doubles as the read-side safety ceiling.
pub const MAX_RECORD_DATA_SIZE: usize = 8224;

/// One physical frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub sid: u16,
    pub len: usize,
}

/// Read the frame header at `offset`, enforcing the configured ceiling.
///
/// Returns `None` at end of stream (offset exactly at the end). A partial
/// header, a payload overrunning the stream, or a length over the ceiling
/// is an error.
pub(crate) fn read_header(
    stream: &[u8],
    offset: usize,
    config: &StreamConfig,
) -> Option<Result<RecordHeader, RecordError>> {
    if offset >= stream.len() {
        return None;
    }
    let header = match stream.get(offset..offset + HEADER_SIZE) {
        Some(header) => header,
        None => return Some(Err(RecordError::TruncatedHeader { offset })),
    };
    let sid = u16::from_le_bytes([header[0], header[1]]);
    let declared = u16::from_le_bytes([header[2], header[3]]) as usize;

    if declared > config.max_record_data_size {
        return Some(Err(RecordError::SizeLimitExceeded {
            sid,
            offset,
            declared,
            max: config.max_record_data_size,
        }));
    }

    let available = stream.len() - offset - HEADER_SIZE;
    if declared > available {
        return Some(Err(RecordError::TruncatedPayload {
            sid,
            offset,
            declared,
            available,
        }));
    }

    Some(Ok(RecordHeader { sid, len: declared }))
}

/// One physical frame, borrowed from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Offset of the frame header in the stream.
    pub offset: usize,
    pub sid: u16,
    pub data: &'a [u8],
}

/// Diagnostic iterator over physical frames, with no CONTINUE reassembly.
///
/// A truncated header or payload yields an `Err` and terminates iteration.
pub struct FrameIter<'a> {
    stream: &'a [u8],
    config: StreamConfig,
    offset: usize,
    finished: bool,
}

impl<'a> FrameIter<'a> {
    pub fn new(stream: &'a [u8], config: StreamConfig) -> Self {
        Self {
            stream,
            config,
            offset: 0,
            finished: false,
        }
    }
}

impl<'a> Iterator for FrameIter<'a> {
    type Item = Result<Frame<'a>, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let header = match read_header(self.stream, self.offset, &self.config)? {
            Ok(header) => header,
            Err(err) => {
                self.finished = true;
                return Some(Err(err));
            }
        };
        let data_start = self.offset + HEADER_SIZE;
        let frame = Frame {
            offset: self.offset,
            sid: header.sid,
            data: &self.stream[data_start..data_start + header.len],
        };
        self.offset = data_start + header.len;
        Some(Ok(frame))
    }
}

#[cfg(test)]
pub(crate) fn frame_bytes(sid: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&sid.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(payload);
    out
}
