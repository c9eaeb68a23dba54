//! Continuation-aware record writing.
//!
//! [`RecordWriter`] owns the output buffer; [`ContinuableRecordOutput`] is
//! the view over one logical record. The caller begins a record with its
//! sid and writes a payload of arbitrary length; the writer emits a primary
//! frame and breaks into CONTINUE frames whenever the configured per-frame
//! ceiling is reached. Splitting is byte-granular by default; callers with
//! unit-granular content (UTF-16 code units, 4-byte format runs) reserve
//! room with [`ContinuableRecordOutput::write_continue_if_required`] or use
//! the string helpers, which re-emit the option-flags byte at the start of
//! each continued fragment.
//!
//! Output is deterministic: identical payloads and configuration produce
//! identical bytes.

use crate::frame::{HEADER_SIZE, SID_CONTINUE};
use crate::StreamConfig;

pub struct RecordWriter {
    buf: Vec<u8>,
    config: StreamConfig,
}

impl RecordWriter {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            buf: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Bytes emitted so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Start a logical record. The record stays open until the returned
    /// output is dropped (or [`ContinuableRecordOutput::end_record`] is
    /// called); the frame length headers are patched at that point.
    pub fn begin_record(&mut self, sid: u16) -> ContinuableRecordOutput<'_> {
        let header_pos = self.buf.len();
        self.buf.extend_from_slice(&sid.to_le_bytes());
        self.buf.extend_from_slice(&0u16.to_le_bytes());
        ContinuableRecordOutput {
            buf: &mut self.buf,
            max_data: self.config.max_record_data_size,
            header_pos,
        }
    }
}

/// Writer for one logical record's payload.
pub struct ContinuableRecordOutput<'a> {
    buf: &'a mut Vec<u8>,
    max_data: usize,
    /// Offset of the current (last emitted) frame header.
    header_pos: usize,
}

impl<'a> ContinuableRecordOutput<'a> {
    fn frame_len(&self) -> usize {
        self.buf.len() - self.header_pos - HEADER_SIZE
    }

    /// Payload bytes still available in the current frame.
    pub fn capacity_remaining(&self) -> usize {
        self.max_data - self.frame_len()
    }

    fn patch_header(&mut self) {
        let len = self.frame_len() as u16;
        let at = self.header_pos + 2;
        self.buf[at..at + 2].copy_from_slice(&len.to_le_bytes());
    }

    /// Close the current frame and start a CONTINUE frame.
    pub fn write_continue(&mut self) {
        self.patch_header();
        self.header_pos = self.buf.len();
        self.buf.extend_from_slice(&SID_CONTINUE.to_le_bytes());
        self.buf.extend_from_slice(&0u16.to_le_bytes());
    }

    /// Start a CONTINUE frame unless `n` bytes fit in the current frame.
    /// This is the "do not split here" hook for unit-granular content.
    pub fn write_continue_if_required(&mut self, n: usize) {
        if self.capacity_remaining() < n {
            self.write_continue();
        }
    }

    fn push_raw(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= self.capacity_remaining());
        self.buf.extend_from_slice(bytes);
    }

    /// Write bytes, splitting into CONTINUE frames at byte granularity.
    pub fn write_bytes(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            if self.capacity_remaining() == 0 {
                self.write_continue();
            }
            let take = bytes.len().min(self.capacity_remaining());
            self.push_raw(&bytes[..take]);
            bytes = &bytes[take..];
        }
    }

    /// Scalars never split across a frame boundary.
    pub fn write_u8(&mut self, v: u8) {
        self.write_continue_if_required(1);
        self.push_raw(&[v]);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_continue_if_required(2);
        self.push_raw(&v.to_le_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.write_u16(v as u16);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_continue_if_required(4);
        self.push_raw(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_u32(v as u32);
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_continue_if_required(8);
        self.push_raw(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    /// Write BIFF8 string character data. The caller has already written
    /// the character count and the initial option-flags byte; this writes
    /// the character bytes, breaking into CONTINUE frames as needed and
    /// re-emitting a fresh flags byte at the start of every continued
    /// fragment so each fragment declares its own width.
    ///
    /// `compressed` carries the 8-bit bytes when the string fits the
    /// single-byte encoding; otherwise `utf16` units are written two bytes
    /// at a time, never split mid-unit.
    pub fn write_string_data(&mut self, data: StringData<'_>) {
        match data {
            StringData::Compressed(mut bytes) => {
                while !bytes.is_empty() {
                    // A continued fragment needs the flags byte plus at
                    // least one character.
                    if self.capacity_remaining() < 1 {
                        self.write_continue();
                        self.push_raw(&[0x00]);
                    }
                    let take = bytes.len().min(self.capacity_remaining());
                    self.push_raw(&bytes[..take]);
                    bytes = &bytes[take..];
                }
            }
            StringData::Utf16(units) => {
                for unit in units {
                    if self.capacity_remaining() < 2 {
                        self.write_continue();
                        self.push_raw(&[0x01]);
                    }
                    self.push_raw(&unit.to_le_bytes());
                }
            }
        }
    }

    /// Patch the final frame header. Dropping the output does the same.
    pub fn end_record(self) {}
}

impl Drop for ContinuableRecordOutput<'_> {
    fn drop(&mut self) {
        self.patch_header();
    }
}

/// Character payload for [`ContinuableRecordOutput::write_string_data`].
pub enum StringData<'a> {
    Compressed(&'a [u8]),
    Utf16(&'a [u16]),
}
