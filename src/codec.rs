//! Primitive EXI datatype codecs (spec component B), layered on top of the
//! [`crate::bitstream::BitBuffer`] bit cursor.
//!
//! Semantics pinned to `original_source/trunk/src/streamIO/include/streamEncode.h`.

use crate::bitstream::{BitBuffer, Sink, Source};
use crate::error::{ErrorCode, Result};

/// n-bit unsigned integer, MSB-first. Used for event-code parts and all
/// bounded counts (`n` in `1..=32`).
pub fn encode_n_bit_uint(buf: &mut BitBuffer, n: u8, v: u32, sink: &mut dyn Sink) -> Result<()> {
    buf.write_bits(n, v, sink)
}

pub fn decode_n_bit_uint(buf: &mut BitBuffer, n: u8, source: &mut dyn Source) -> Result<u32> {
    buf.read_bits(n, source)
}

/// Single bit: `0` = false, `1` = true.
pub fn encode_bool(buf: &mut BitBuffer, v: bool, sink: &mut dyn Sink) -> Result<()> {
    buf.write_bits(1, v as u32, sink)
}

pub fn decode_bool(buf: &mut BitBuffer, source: &mut dyn Source) -> Result<bool> {
    Ok(buf.read_bits(1, source)? != 0)
}

/// Arbitrary-precision unsigned integer: 7-bit groups with a continuation
/// bit in bit 7, little-endian groups, terminating on a group whose
/// continuation bit is 0. Supports the full `u64` range.
pub fn encode_uint(buf: &mut BitBuffer, mut v: u64, sink: &mut dyn Sink) -> Result<()> {
    loop {
        let mut byte = (v & 0x7F) as u32;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        buf.write_bits(8, byte, sink)?;
        if v == 0 {
            break;
        }
    }
    Ok(())
}

pub fn decode_uint(buf: &mut BitBuffer, source: &mut dyn Source) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = buf.read_bits(8, source)?;
        result |= ((byte & 0x7F) as u64)
            .checked_shl(shift)
            .ok_or(ErrorCode::IntegerOverflow)?;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 64 {
            return Err(ErrorCode::IntegerOverflow);
        }
    }
    Ok(result)
}

/// Signed integer: one sign bit (`0` = non-negative), then an unsigned
/// integer equal to the value when non-negative, or `-value - 1` when
/// negative.
pub fn encode_sint(buf: &mut BitBuffer, v: i64, sink: &mut dyn Sink) -> Result<()> {
    if v >= 0 {
        encode_bool(buf, false, sink)?;
        encode_uint(buf, v as u64, sink)
    } else {
        encode_bool(buf, true, sink)?;
        let magnitude = (-(v + 1)) as u64; // -v - 1, safe: v < 0
        encode_uint(buf, magnitude, sink)
    }
}

pub fn decode_sint(buf: &mut BitBuffer, source: &mut dyn Source) -> Result<i64> {
    let negative = decode_bool(buf, source)?;
    let magnitude = decode_uint(buf, source)?;
    if negative {
        let v = i64::try_from(magnitude).map_err(|_| ErrorCode::IntegerOverflow)?;
        Ok(-v - 1)
    } else {
        i64::try_from(magnitude).map_err(|_| ErrorCode::IntegerOverflow)
    }
}

/// Decimal: sign bit, integral part (unsigned integer), fractional part
/// (unsigned integer, digits in reverse order — least significant decimal
/// digit first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    pub negative: bool,
    pub integral: u64,
    /// Fractional digits, already stored least-significant-first as EXI
    /// requires on the wire; `reversed_fraction` is the wire value itself.
    pub reversed_fraction: u64,
}

pub fn encode_decimal(buf: &mut BitBuffer, v: Decimal, sink: &mut dyn Sink) -> Result<()> {
    encode_bool(buf, v.negative, sink)?;
    encode_uint(buf, v.integral, sink)?;
    encode_uint(buf, v.reversed_fraction, sink)
}

pub fn decode_decimal(buf: &mut BitBuffer, source: &mut dyn Source) -> Result<Decimal> {
    let negative = decode_bool(buf, source)?;
    let integral = decode_uint(buf, source)?;
    let reversed_fraction = decode_uint(buf, source)?;
    Ok(Decimal {
        negative,
        integral,
        reversed_fraction,
    })
}

/// Float: signed-integer mantissa, signed-integer base-10 exponent.
/// `(1, -16384)` = +INF, `(-1, -16384)` = -INF, any other mantissa paired
/// with exponent `-16384` is NaN, `(0, 0)` is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExiFloat {
    Value { mantissa: i64, exponent: i64 },
    PositiveInfinity,
    NegativeInfinity,
    NaN,
}

const SPECIAL_EXPONENT: i64 = -16384;

pub fn encode_float(buf: &mut BitBuffer, v: ExiFloat, sink: &mut dyn Sink) -> Result<()> {
    let (mantissa, exponent) = match v {
        ExiFloat::Value { mantissa, exponent } => (mantissa, exponent),
        ExiFloat::PositiveInfinity => (1, SPECIAL_EXPONENT),
        ExiFloat::NegativeInfinity => (-1, SPECIAL_EXPONENT),
        ExiFloat::NaN => (0, SPECIAL_EXPONENT),
    };
    encode_sint(buf, mantissa, sink)?;
    encode_sint(buf, exponent, sink)
}

pub fn decode_float(buf: &mut BitBuffer, source: &mut dyn Source) -> Result<ExiFloat> {
    let mantissa = decode_sint(buf, source)?;
    let exponent = decode_sint(buf, source)?;
    Ok(if exponent == SPECIAL_EXPONENT {
        match mantissa {
            1 => ExiFloat::PositiveInfinity,
            -1 => ExiFloat::NegativeInfinity,
            _ => ExiFloat::NaN,
        }
    } else {
        ExiFloat::Value { mantissa, exponent }
    })
}

/// Date-time presence mask bits, matching `procTypes.h`'s `*_PRESENCE` macros.
pub mod presence {
    pub const YEAR: u16 = 0b0000_0000_0010_0000;
    pub const MONTH_DAY: u16 = 0b0000_0000_0001_1000;
    pub const TIME: u16 = 0b0000_0000_0000_0111;
    pub const FRACTIONAL_SECS: u16 = 0b0000_0001_0000_0000;
    pub const TIMEZONE: u16 = 0b0000_0010_0000_0000;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTime {
    pub presence_mask: u16,
    /// Signed year offset from 2000.
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub fractional_seconds: u32,
    /// Signed offset from UTC in minutes, range fits in 11 bits.
    pub timezone_minutes: i16,
}

fn is_present(mask: u16, bit: u16) -> bool {
    mask & bit != 0
}

pub fn encode_datetime(buf: &mut BitBuffer, v: &DateTime, sink: &mut dyn Sink) -> Result<()> {
    if is_present(v.presence_mask, presence::YEAR) {
        encode_sint(buf, v.year as i64, sink)?;
    }
    if is_present(v.presence_mask, presence::MONTH_DAY) {
        let packed = v.month as u32 * 32 + v.day as u32;
        encode_n_bit_uint(buf, 9, packed, sink)?;
    }
    if is_present(v.presence_mask, presence::TIME) {
        let hour_min = v.hour as u32 * 64 + v.minute as u32;
        encode_n_bit_uint(buf, 11, hour_min, sink)?;
        encode_n_bit_uint(buf, 6, v.second as u32, sink)?;
        encode_bool(buf, is_present(v.presence_mask, presence::FRACTIONAL_SECS), sink)?;
        if is_present(v.presence_mask, presence::FRACTIONAL_SECS) {
            encode_uint(buf, v.fractional_seconds as u64, sink)?;
        }
    }
    encode_bool(buf, is_present(v.presence_mask, presence::TIMEZONE), sink)?;
    if is_present(v.presence_mask, presence::TIMEZONE) {
        encode_n_bit_uint(buf, 11, (v.timezone_minutes as i32 + 1024) as u32, sink)?;
    }
    Ok(())
}

pub fn decode_datetime(
    buf: &mut BitBuffer,
    mask: u16,
    source: &mut dyn Source,
) -> Result<DateTime> {
    let mut v = DateTime {
        presence_mask: mask,
        ..Default::default()
    };
    if is_present(mask, presence::YEAR) {
        v.year = decode_sint(buf, source)? as i32;
    }
    if is_present(mask, presence::MONTH_DAY) {
        let packed = decode_n_bit_uint(buf, 9, source)?;
        v.month = (packed / 32) as u8;
        v.day = (packed % 32) as u8;
    }
    if is_present(mask, presence::TIME) {
        let hour_min = decode_n_bit_uint(buf, 11, source)?;
        v.hour = (hour_min / 64) as u8;
        v.minute = (hour_min % 64) as u8;
        v.second = decode_n_bit_uint(buf, 6, source)? as u8;
        if decode_bool(buf, source)? {
            v.presence_mask |= presence::FRACTIONAL_SECS;
            v.fractional_seconds = decode_uint(buf, source)? as u32;
        }
    }
    if decode_bool(buf, source)? {
        v.presence_mask |= presence::TIMEZONE;
        let raw = decode_n_bit_uint(buf, 11, source)?;
        v.timezone_minutes = (raw as i32 - 1024) as i16;
    }
    Ok(v)
}

/// Length-prefixed byte sequence; caller must byte-align first in
/// byte-aligned/pre-compression modes per §4.B.
pub fn encode_binary(buf: &mut BitBuffer, bytes: &[u8], sink: &mut dyn Sink) -> Result<()> {
    encode_uint(buf, bytes.len() as u64, sink)?;
    buf.byte_align();
    buf.write_bytes(bytes, sink)
}

pub fn decode_binary(buf: &mut BitBuffer, source: &mut dyn Source) -> Result<Vec<u8>> {
    let len = decode_uint(buf, source)? as usize;
    buf.byte_align();
    buf.read_bytes(len, source)
}

/// Length-prefixed sequence of UCS code points, each an unsigned integer.
/// This is the "string only" codec (§4.B `encodeStringOnly`) — the
/// string-table-aware three-state literal encoding lives in
/// [`crate::strtab`].
pub fn encode_string_only(buf: &mut BitBuffer, s: &str, sink: &mut dyn Sink) -> Result<()> {
    let chars: Vec<char> = s.chars().collect();
    encode_uint(buf, chars.len() as u64, sink)?;
    for c in chars {
        encode_uint(buf, c as u64, sink)?;
    }
    Ok(())
}

pub fn decode_string_only(buf: &mut BitBuffer, source: &mut dyn Source) -> Result<String> {
    let len = decode_uint(buf, source)? as usize;
    let mut s = String::with_capacity(len);
    for _ in 0..len {
        let cp = decode_uint(buf, source)? as u32;
        let c = char::from_u32(cp).ok_or(ErrorCode::InvalidExiInput)?;
        s.push(c);
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::{MemorySink, MemorySource};

    fn roundtrip_uint(v: u64) -> u64 {
        let mut sink = MemorySink::default();
        let mut w = BitBuffer::for_writing();
        encode_uint(&mut w, v, &mut sink).unwrap();
        w.close_writer(&mut sink).unwrap();
        let mut source = MemorySource::new(&sink.0);
        let mut r = BitBuffer::for_reading();
        decode_uint(&mut r, &mut source).unwrap()
    }

    #[test]
    fn uint_roundtrip() {
        for v in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            assert_eq!(roundtrip_uint(v), v);
        }
    }

    #[test]
    fn sint_roundtrip() {
        for v in [0i64, 1, -1, 127, -128, i32::MIN as i64, i32::MAX as i64] {
            let mut sink = MemorySink::default();
            let mut w = BitBuffer::for_writing();
            encode_sint(&mut w, v, &mut sink).unwrap();
            w.close_writer(&mut sink).unwrap();
            let mut source = MemorySource::new(&sink.0);
            let mut r = BitBuffer::for_reading();
            assert_eq!(decode_sint(&mut r, &mut source).unwrap(), v);
        }
    }

    #[test]
    fn schema_informed_unsigned_byte_200_is_eight_bits_no_overhead() {
        // n-bit unsigned, n = ceil(log2(256)) = 8, value 200 = 0b11001000
        let mut sink = MemorySink::default();
        let mut w = BitBuffer::for_writing();
        encode_n_bit_uint(&mut w, 8, 200, &mut sink).unwrap();
        w.close_writer(&mut sink).unwrap();
        assert_eq!(sink.0, vec![0b1100_1000]);
    }

    #[test]
    fn float_special_values_roundtrip() {
        for v in [
            ExiFloat::PositiveInfinity,
            ExiFloat::NegativeInfinity,
            ExiFloat::NaN,
            ExiFloat::Value {
                mantissa: 0,
                exponent: 0,
            },
            ExiFloat::Value {
                mantissa: 314,
                exponent: -2,
            },
        ] {
            let mut sink = MemorySink::default();
            let mut w = BitBuffer::for_writing();
            encode_float(&mut w, v, &mut sink).unwrap();
            w.close_writer(&mut sink).unwrap();
            let mut source = MemorySource::new(&sink.0);
            let mut r = BitBuffer::for_reading();
            assert_eq!(decode_float(&mut r, &mut source).unwrap(), v);
        }
    }

    #[test]
    fn decimal_roundtrip() {
        let d = Decimal {
            negative: true,
            integral: 3,
            reversed_fraction: 41, // represents .14 reversed
        };
        let mut sink = MemorySink::default();
        let mut w = BitBuffer::for_writing();
        encode_decimal(&mut w, d, &mut sink).unwrap();
        w.close_writer(&mut sink).unwrap();
        let mut source = MemorySource::new(&sink.0);
        let mut r = BitBuffer::for_reading();
        assert_eq!(decode_decimal(&mut r, &mut source).unwrap(), d);
    }

    #[test]
    fn string_only_roundtrip_unicode() {
        let s = "héllo\u{1F980}";
        let mut sink = MemorySink::default();
        let mut w = BitBuffer::for_writing();
        encode_string_only(&mut w, s, &mut sink).unwrap();
        w.close_writer(&mut sink).unwrap();
        let mut source = MemorySource::new(&sink.0);
        let mut r = BitBuffer::for_reading();
        assert_eq!(decode_string_only(&mut r, &mut source).unwrap(), s);
    }

    #[test]
    fn binary_byte_aligns_before_payload() {
        let mut sink = MemorySink::default();
        let mut w = BitBuffer::for_writing();
        encode_bool(&mut w, true, &mut sink).unwrap();
        encode_binary(&mut w, &[0xAA, 0xBB], &mut sink).unwrap();
        w.close_writer(&mut sink).unwrap();
        // bool bit, pad to byte, then length=2 (1 byte), then 2 raw bytes.
        assert_eq!(sink.0, vec![0b1000_0000, 0x02, 0xAA, 0xBB]);
    }

    #[test]
    fn datetime_roundtrips_when_decode_mask_matches_encode_mask() {
        let v = DateTime {
            presence_mask: presence::YEAR | presence::MONTH_DAY | presence::TIME,
            year: 26,
            month: 7,
            day: 27,
            hour: 13,
            minute: 5,
            second: 0,
            fractional_seconds: 0,
            timezone_minutes: 0,
        };
        let mut sink = MemorySink::default();
        let mut w = BitBuffer::for_writing();
        encode_datetime(&mut w, &v, &mut sink).unwrap();
        w.close_writer(&mut sink).unwrap();
        let mut source = MemorySource::new(&sink.0);
        let mut r = BitBuffer::for_reading();
        let decoded = decode_datetime(&mut r, v.presence_mask, &mut source).unwrap();
        assert_eq!(decoded, v);
    }

    #[test]
    fn datetime_decoded_with_wrong_mask_desyncs_instead_of_matching() {
        // year+monthDay+time written, but decoded as if only year were
        // present: the decoder stops after the year field, leaving the
        // monthDay/time bits unconsumed and unreflected in the result.
        let v = DateTime {
            presence_mask: presence::YEAR | presence::MONTH_DAY | presence::TIME,
            year: 26,
            month: 7,
            day: 27,
            hour: 13,
            minute: 5,
            second: 0,
            fractional_seconds: 0,
            timezone_minutes: 0,
        };
        let mut sink = MemorySink::default();
        let mut w = BitBuffer::for_writing();
        encode_datetime(&mut w, &v, &mut sink).unwrap();
        w.close_writer(&mut sink).unwrap();
        let mut source = MemorySource::new(&sink.0);
        let mut r = BitBuffer::for_reading();
        let decoded = decode_datetime(&mut r, presence::YEAR, &mut source).unwrap();
        assert_ne!(decoded, v);
        assert_eq!(decoded.month, 0);
        assert_eq!(decoded.day, 0);
    }
}
