//! BIFF8 unicode string codec (`XLUnicodeRichExtendedString`, [MS-XLS]
//! 2.5.296 / 2.5.268).
//!
//! A string carries a 16-bit character count, a 1-byte option flags field
//! (`fHighByte` selects 8-bit "compressed" vs UTF-16LE character data,
//! `fRichSt`/`fExtSt` add format runs and an extended payload), then the
//! character bytes. When character data crosses a CONTINUE boundary, the
//! continued fragment begins with a fresh flags byte whose `fHighByte` may
//! differ from the previous fragment's, so the reader re-synchronizes the
//! width at every boundary. Breaks inside the format-run or ext sections
//! carry no flags byte.

use std::collections::BTreeSet;
use std::sync::{Mutex, OnceLock};

use encoding_rs::{
    Encoding, WINDOWS_1250, WINDOWS_1251, WINDOWS_1252, WINDOWS_1253, WINDOWS_1254, WINDOWS_1255,
    WINDOWS_1256, WINDOWS_1257, WINDOWS_1258, WINDOWS_874,
};

use crate::input::RecordInputStream;
use crate::output::{ContinuableRecordOutput, StringData};
use crate::RecordError;

pub(crate) const STR_FLAG_HIGH_BYTE: u8 = 0x01;
pub(crate) const STR_FLAG_EXT: u8 = 0x04;
pub(crate) const STR_FLAG_RICH_TEXT: u8 = 0x08;

/// Single-byte Windows codepages usable for compressed character data.
/// Multi-byte codepages never qualify: compressed BIFF8 strings are one
/// byte per character by definition.
pub(crate) fn encoding_for_codepage(codepage: u16) -> Option<&'static Encoding> {
    Some(match codepage {
        874 => WINDOWS_874,
        1250 => WINDOWS_1250,
        1251 => WINDOWS_1251,
        1252 => WINDOWS_1252,
        1253 => WINDOWS_1253,
        1254 => WINDOWS_1254,
        1255 => WINDOWS_1255,
        1256 => WINDOWS_1256,
        1257 => WINDOWS_1257,
        1258 => WINDOWS_1258,
        _ => return None,
    })
}

pub(crate) fn decode_ansi(codepage: u16, bytes: &[u8]) -> String {
    if let Some(encoding) = encoding_for_codepage(codepage) {
        let (cow, _, _) = encoding.decode(bytes);
        return cow.into_owned();
    }

    warn_unsupported_codepage(codepage);

    // Lossless byte-to-Unicode mapping: keeps ASCII intact and preserves
    // the payload when the codepage is unknown.
    bytes.iter().copied().map(char::from).collect()
}

fn warn_unsupported_codepage(codepage: u16) {
    static WARNED: OnceLock<Mutex<BTreeSet<u16>>> = OnceLock::new();

    let warned = WARNED.get_or_init(|| Mutex::new(BTreeSet::new()));
    let mut warned = match warned.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if warned.insert(codepage) {
        log::warn!(
            "unsupported codepage {codepage}; decoding 8-bit strings with a byte-to-Unicode mapping"
        );
    }
}

/// Encode `text` as compressed (one byte per character) data, if the
/// codepage can represent every character that way.
pub(crate) fn compress(text: &str, codepage: u16) -> Option<Vec<u8>> {
    let encoding = encoding_for_codepage(codepage)?;
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        return None;
    }
    (bytes.len() == text.encode_utf16().count()).then(|| bytes.into_owned())
}

/// A rich-text format run: the character index where a font starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRun {
    pub char_index: u16,
    pub font_index: u16,
}

/// One decoded BIFF8 string with its optional rich-text and extended
/// payloads. Owns all its data; `Clone` is a deep copy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnicodeString {
    pub text: String,
    pub format_runs: Vec<FormatRun>,
    /// Raw `ExtRst` payload (phonetic data); preserved opaquely.
    pub ext_data: Vec<u8>,
}

impl UnicodeString {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format_runs: Vec::new(),
            ext_data: Vec::new(),
        }
    }
}

/// Read one string from the current logical record.
pub fn read_unicode_string(
    input: &mut RecordInputStream<'_>,
    codepage: u16,
) -> Result<UnicodeString, RecordError> {
    let cch = input.read_u16()? as usize;
    let flags = input.read_u8()?;
    let is_unicode = flags & STR_FLAG_HIGH_BYTE != 0;

    let run_count = if flags & STR_FLAG_RICH_TEXT != 0 {
        input.read_u16()? as usize
    } else {
        0
    };
    let ext_size = if flags & STR_FLAG_EXT != 0 {
        input.read_u32()? as usize
    } else {
        0
    };

    let text = read_char_data(input, cch, is_unicode, codepage)?;

    let mut format_runs = Vec::with_capacity(run_count);
    for _ in 0..run_count {
        format_runs.push(FormatRun {
            char_index: input.read_u16()?,
            font_index: input.read_u16()?,
        });
    }

    let ext_data = input.read_bytes(ext_size)?;

    Ok(UnicodeString {
        text,
        format_runs,
        ext_data,
    })
}

/// Read `cch` characters, re-reading the option-flags byte after every
/// CONTINUE boundary crossed inside the character data.
pub(crate) fn read_char_data(
    input: &mut RecordInputStream<'_>,
    cch: usize,
    mut is_unicode: bool,
    codepage: u16,
) -> Result<String, RecordError> {
    let mut remaining = cch;
    let mut out = String::with_capacity(cch.min(1024));

    while remaining > 0 {
        if input.current_frame_remaining() == 0 {
            if !input.advance_to_continue()? {
                return Err(RecordError::ReadPastEnd {
                    sid: input.sid(),
                    requested: remaining,
                    remaining: 0,
                });
            }
            // The continued fragment restates the character width.
            is_unicode = input.read_u8()? & STR_FLAG_HIGH_BYTE != 0;
            continue;
        }

        let unit = if is_unicode { 2 } else { 1 };
        let available_chars = input.current_frame_remaining() / unit;
        if available_chars == 0 {
            return Err(RecordError::SplitMidCharacter { sid: input.sid() });
        }

        let take = remaining.min(available_chars);
        let bytes = input.read_frame_bytes(take * unit)?;
        if is_unicode {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            out.push_str(&String::from_utf16_lossy(&units));
        } else {
            out.push_str(&decode_ansi(codepage, bytes));
        }
        remaining -= take;
    }

    Ok(out)
}

/// Write one string into the current logical record, choosing compressed
/// or UTF-16 character data and re-emitting the flags byte at continuation
/// boundaries inside the character data.
pub fn write_unicode_string(
    out: &mut ContinuableRecordOutput<'_>,
    sid: u16,
    s: &UnicodeString,
    codepage: u16,
) -> Result<(), RecordError> {
    let units: Vec<u16> = s.text.encode_utf16().collect();
    let cch = u16::try_from(units.len())
        .map_err(|_| RecordError::malformed(sid, "string longer than 65535 characters"))?;
    let run_count = u16::try_from(s.format_runs.len())
        .map_err(|_| RecordError::malformed(sid, "more than 65535 format runs"))?;
    let ext_size = u32::try_from(s.ext_data.len())
        .map_err(|_| RecordError::malformed(sid, "ext payload longer than u32"))?;

    let compressed = compress(&s.text, codepage);

    let mut flags = 0u8;
    if compressed.is_none() {
        flags |= STR_FLAG_HIGH_BYTE;
    }
    if run_count > 0 {
        flags |= STR_FLAG_RICH_TEXT;
    }
    if ext_size > 0 {
        flags |= STR_FLAG_EXT;
    }

    out.write_u16(cch);
    out.write_u8(flags);
    if run_count > 0 {
        out.write_u16(run_count);
    }
    if ext_size > 0 {
        out.write_u32(ext_size);
    }

    match &compressed {
        Some(bytes) => out.write_string_data(StringData::Compressed(bytes)),
        None => out.write_string_data(StringData::Utf16(&units)),
    }

    // A format run never splits; breaks between runs carry no flags byte.
    for run in &s.format_runs {
        out.write_continue_if_required(4);
        out.write_u16(run.char_index);
        out.write_u16(run.font_index);
    }
    out.write_bytes(&s.ext_data);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::frame_bytes;
    use crate::frame::SID_CONTINUE;
    use crate::output::RecordWriter;
    use crate::StreamConfig;
    use pretty_assertions::assert_eq;

    const SID: u16 = 0x00FC;

    fn round_trip_with_max(s: &UnicodeString, max: usize) -> UnicodeString {
        let config = StreamConfig {
            max_record_data_size: max,
            ..StreamConfig::default()
        };
        let mut writer = RecordWriter::new(config.clone());
        let mut out = writer.begin_record(SID);
        write_unicode_string(&mut out, SID, s, config.codepage).expect("write");
        out.end_record();

        let bytes = writer.into_bytes();
        let mut input = RecordInputStream::new(&bytes, config.clone());
        input.next_record().expect("record");
        read_unicode_string(&mut input, config.codepage).expect("read")
    }

    #[test]
    fn round_trips_ascii_in_one_frame() {
        let s = UnicodeString::new("Hello");
        assert_eq!(round_trip_with_max(&s, 8224), s);
    }

    #[test]
    fn round_trips_non_latin_text_as_utf16() {
        let s = UnicodeString::new("Пример 例");
        assert_eq!(round_trip_with_max(&s, 8224), s);
    }

    #[test]
    fn round_trips_across_forced_continuation_boundaries() {
        let s = UnicodeString::new("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(round_trip_with_max(&s, 8), s);

        let s = UnicodeString::new("абвгдежзийклмн");
        assert_eq!(round_trip_with_max(&s, 9), s);
    }

    #[test]
    fn round_trips_format_runs_and_ext_payload() {
        let s = UnicodeString {
            text: "styled".to_string(),
            format_runs: vec![
                FormatRun {
                    char_index: 0,
                    font_index: 5,
                },
                FormatRun {
                    char_index: 3,
                    font_index: 7,
                },
            ],
            ext_data: vec![0xDE, 0xAD, 0xBE, 0xEF],
        };
        assert_eq!(round_trip_with_max(&s, 8224), s);
        assert_eq!(round_trip_with_max(&s, 7), s);
    }

    #[test]
    fn decodes_flag_change_at_continuation_boundary() {
        // Hand-built record: compressed "AB" in the primary frame, then a
        // continued fragment that switches to UTF-16 for "ЯЮ".
        let mut primary = Vec::new();
        primary.extend_from_slice(&4u16.to_le_bytes()); // cch
        primary.push(0x00); // flags: compressed
        primary.extend_from_slice(b"AB");

        let mut cont = Vec::new();
        cont.push(STR_FLAG_HIGH_BYTE);
        for unit in "ЯЮ".encode_utf16() {
            cont.extend_from_slice(&unit.to_le_bytes());
        }

        let stream = [
            frame_bytes(SID, &primary),
            frame_bytes(SID_CONTINUE, &cont),
        ]
        .concat();

        let mut input = RecordInputStream::new(&stream, StreamConfig::default());
        input.next_record().unwrap();
        let s = read_unicode_string(&mut input, 1252).expect("read");
        assert_eq!(s.text, "ABЯЮ");
    }

    #[test]
    fn rejects_mid_character_continuation_split() {
        // cch=1 utf16, but the primary frame holds only one of the two
        // bytes of the code unit.
        let mut primary = Vec::new();
        primary.extend_from_slice(&1u16.to_le_bytes());
        primary.push(STR_FLAG_HIGH_BYTE);
        primary.push(b'A');

        let cont = [STR_FLAG_HIGH_BYTE, 0x00];
        let stream = [
            frame_bytes(SID, &primary),
            frame_bytes(SID_CONTINUE, &cont),
        ]
        .concat();

        let mut input = RecordInputStream::new(&stream, StreamConfig::default());
        input.next_record().unwrap();
        let err = read_unicode_string(&mut input, 1252).unwrap_err();
        assert!(matches!(err, RecordError::SplitMidCharacter { sid: SID }));
    }

    #[test]
    fn flag_byte_lands_first_in_new_fragment_when_boundary_precedes_it() {
        // Classic boundary case: the last character byte of the
        // primary frame is followed by a boundary, and the next fragment
        // starts with the flags byte for the remaining characters.
        let config = StreamConfig {
            max_record_data_size: 5,
            ..StreamConfig::default()
        };
        let s = UnicodeString::new("ABCDE");
        let mut writer = RecordWriter::new(config.clone());
        let mut out = writer.begin_record(SID);
        write_unicode_string(&mut out, SID, &s, config.codepage).expect("write");
        out.end_record();
        let bytes = writer.into_bytes();

        // Primary: cch(2) + flags(1) + "AB"; continued: flags + "CDE".
        assert_eq!(
            bytes,
            [
                frame_bytes(SID, &[5, 0, 0x00, b'A', b'B']),
                frame_bytes(SID_CONTINUE, &[0x00, b'C', b'D', b'E']),
            ]
            .concat()
        );

        let mut input = RecordInputStream::new(&bytes, config.clone());
        input.next_record().unwrap();
        assert_eq!(read_unicode_string(&mut input, 1252).expect("read"), s);
    }

    #[test]
    fn unsupported_codepage_falls_back_to_byte_mapping() {
        let bytes = [0x41u8, 0x80, 0xFF];
        let expected: String = bytes.iter().copied().map(char::from).collect();
        assert_eq!(decode_ansi(9999, &bytes), expected);
    }
}
