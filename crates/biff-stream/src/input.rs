//! Continuation-aware record reading.
//!
//! [`RecordInputStream`] presents one *logical* record at a time: a primary
//! frame plus any number of immediately-following CONTINUE frames. Reads
//! cross CONTINUE boundaries transparently; consumers that must react to a
//! boundary (BIFF8 strings re-read their option-flags byte there) use
//! [`RecordInputStream::read_continued_bytes`] or the frame-level helpers.
//!
//! The reader moves through the states before-record, in-primary-payload,
//! in-continuation-payload and exhausted-record implicitly: `next_record`
//! opens the next primary frame, reads advance the cursor and pull in
//! CONTINUE frames on demand, and a read past the logical record's declared
//! end is fatal.

use crate::frame::{self, RecordHeader, HEADER_SIZE, SID_CONTINUE};
use crate::{RecordError, StreamConfig};

pub struct RecordInputStream<'a> {
    stream: &'a [u8],
    config: StreamConfig,
    /// Header offset of the next unread physical frame.
    next_frame: usize,
    /// True once `next_record` has opened at least one record.
    started: bool,
    sid: u16,
    /// Header offset of the current record's primary frame.
    record_offset: usize,
    /// Payload bounds of the current physical frame.
    data_start: usize,
    data_end: usize,
    pos: usize,
    /// Physical fragments opened for the current logical record.
    fragments: usize,
    /// Total payload bytes opened for the current logical record.
    opened_bytes: usize,
}

impl<'a> RecordInputStream<'a> {
    pub fn new(stream: &'a [u8], config: StreamConfig) -> Self {
        Self {
            stream,
            config,
            next_frame: 0,
            started: false,
            sid: 0,
            record_offset: 0,
            data_start: 0,
            data_end: 0,
            pos: 0,
            fragments: 0,
            opened_bytes: 0,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Record id of the current logical record.
    pub fn sid(&self) -> u16 {
        self.sid
    }

    /// Header offset of the current record's primary frame.
    pub fn record_offset(&self) -> usize {
        self.record_offset
    }

    /// True while any stream bytes remain past the current frame. The next
    /// `next_record` call either opens a record or reports why it cannot.
    pub fn has_next_record(&self) -> bool {
        self.next_frame < self.stream.len()
    }

    /// Open the next logical record and return its id.
    ///
    /// Unread payload left in the current frame is skipped with a warning.
    /// A CONTINUE frame at the very start of the stream is an error unless
    /// the configuration is lenient; a CONTINUE frame following a record
    /// whose decoder did not absorb it is surfaced as its own record so
    /// drawing-layer consumers and diagnostics can see raw frames.
    pub fn next_record(&mut self) -> Result<u16, RecordError> {
        if self.started && self.pos < self.data_end {
            log::warn!(
                "record 0x{:04X} at offset {}: {} unread payload bytes skipped",
                self.sid,
                self.record_offset,
                self.data_end - self.pos
            );
            self.pos = self.data_end;
        }

        let offset = self.next_frame;
        let header = match frame::read_header(self.stream, offset, &self.config) {
            Some(result) => result?,
            None => return Err(RecordError::TruncatedHeader { offset }),
        };

        if header.sid == SID_CONTINUE && !self.started {
            if !self.config.lenient {
                return Err(RecordError::OrphanContinue { offset });
            }
            log::warn!("tolerating CONTINUE record at stream start (offset {offset})");
        }

        self.started = true;
        self.sid = header.sid;
        self.record_offset = offset;
        self.data_start = offset + HEADER_SIZE;
        self.data_end = self.data_start + header.len;
        self.pos = self.data_start;
        self.next_frame = self.data_end;
        self.fragments = 1;
        self.opened_bytes = header.len;
        Ok(header.sid)
    }

    /// Unread bytes in the current physical frame.
    pub fn current_frame_remaining(&self) -> usize {
        self.data_end - self.pos
    }

    /// True if the next physical frame is a CONTINUE frame.
    pub fn is_continue_next(&self) -> bool {
        matches!(
            frame::read_header(self.stream, self.next_frame, &self.config),
            Some(Ok(RecordHeader {
                sid: SID_CONTINUE,
                ..
            }))
        )
    }

    /// Unread bytes in the whole logical record, CONTINUE frames included.
    ///
    /// Computed lazily by scanning ahead over continuation headers; the scan
    /// applies the same framing rules as `read`, so the two always agree.
    pub fn remaining(&self) -> usize {
        let mut total = self.current_frame_remaining();
        let mut offset = self.next_frame;
        while let Some(Ok(header)) = frame::read_header(self.stream, offset, &self.config) {
            if header.sid != SID_CONTINUE {
                break;
            }
            total += header.len;
            offset += HEADER_SIZE + header.len;
        }
        total
    }

    /// Open the next CONTINUE frame, if one follows. `Ok(false)` means the
    /// next frame is absent or not a continuation.
    pub(crate) fn advance_to_continue(&mut self) -> Result<bool, RecordError> {
        let header = match frame::read_header(self.stream, self.next_frame, &self.config) {
            Some(result) => result?,
            None => return Ok(false),
        };
        if header.sid != SID_CONTINUE {
            return Ok(false);
        }

        if self.fragments + 1 > self.config.max_logical_record_fragments {
            return Err(RecordError::TooManyFragments {
                sid: self.sid,
                max: self.config.max_logical_record_fragments,
            });
        }
        let opened = self.opened_bytes.saturating_add(header.len);
        if opened > self.config.max_logical_record_bytes {
            return Err(RecordError::ContinuedTooLarge {
                sid: self.sid,
                max: self.config.max_logical_record_bytes,
            });
        }

        self.data_start = self.next_frame + HEADER_SIZE;
        self.data_end = self.data_start + header.len;
        self.pos = self.data_start;
        self.next_frame = self.data_end;
        self.fragments += 1;
        self.opened_bytes = opened;
        Ok(true)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), RecordError> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.current_frame_remaining() == 0 {
                if !self.advance_to_continue()? {
                    return Err(RecordError::ReadPastEnd {
                        sid: self.sid,
                        requested: buf.len(),
                        remaining: filled,
                    });
                }
            }
            let take = (buf.len() - filled).min(self.current_frame_remaining());
            buf[filled..filled + take].copy_from_slice(&self.stream[self.pos..self.pos + take]);
            self.pos += take;
            filled += take;
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, RecordError> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, RecordError> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_i16(&mut self) -> Result<i16, RecordError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, RecordError> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_i32(&mut self) -> Result<i32, RecordError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64, RecordError> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_f64(&mut self) -> Result<f64, RecordError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Read `n` bytes, crossing CONTINUE boundaries transparently.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, RecordError> {
        if n > self.config.max_logical_record_bytes {
            return Err(RecordError::ContinuedTooLarge {
                sid: self.sid,
                max: self.config.max_logical_record_bytes,
            });
        }
        let mut buf = vec![0u8; n];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Read `n` bytes, invoking `on_boundary` each time the read crosses
    /// into a new CONTINUE frame, *before* any byte of that frame is
    /// consumed. The callback may itself read (e.g. a re-emitted flag
    /// byte); the `n`-byte count covers only bytes read by this call.
    pub fn read_continued_bytes(
        &mut self,
        n: usize,
        mut on_boundary: impl FnMut(&mut RecordInputStream<'a>) -> Result<(), RecordError>,
    ) -> Result<Vec<u8>, RecordError> {
        if n > self.config.max_logical_record_bytes {
            return Err(RecordError::ContinuedTooLarge {
                sid: self.sid,
                max: self.config.max_logical_record_bytes,
            });
        }
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            if self.current_frame_remaining() == 0 {
                if !self.advance_to_continue()? {
                    return Err(RecordError::ReadPastEnd {
                        sid: self.sid,
                        requested: n,
                        remaining: out.len(),
                    });
                }
                on_boundary(self)?;
                continue;
            }
            let take = (n - out.len()).min(self.current_frame_remaining());
            out.extend_from_slice(&self.stream[self.pos..self.pos + take]);
            self.pos += take;
        }
        Ok(out)
    }

    /// Read `n` bytes from the current physical frame only, zero-copy.
    pub(crate) fn read_frame_bytes(&mut self, n: usize) -> Result<&'a [u8], RecordError> {
        if n > self.current_frame_remaining() {
            return Err(RecordError::ReadPastEnd {
                sid: self.sid,
                requested: n,
                remaining: self.current_frame_remaining(),
            });
        }
        let out = &self.stream[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Remainder of the current physical frame, zero-copy. Does not pull in
    /// CONTINUE frames.
    pub fn read_remainder(&mut self) -> &'a [u8] {
        let out = &self.stream[self.pos..self.data_end];
        self.pos = self.data_end;
        out
    }

    /// Eagerly drain the rest of the logical record, across all remaining
    /// CONTINUE frames, into one contiguous buffer. For consumers that
    /// cannot tolerate a mid-field boundary (name/formula payloads).
    pub fn read_all_continued_remainder(&mut self) -> Result<Vec<u8>, RecordError> {
        let mut out = Vec::with_capacity(self.current_frame_remaining());
        loop {
            out.extend_from_slice(self.read_remainder());
            if !self.advance_to_continue()? {
                return Ok(out);
            }
        }
    }
}
