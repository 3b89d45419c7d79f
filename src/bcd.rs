//! BCD numeric and timestamp fields.
//!
//! WIN32 packs geodetic and temporal values as binary-coded decimal, one
//! digit per nibble, MSB-first. Reserved nibbles carry structure: `0xB`
//! marks an absent field, `0xC`/`0xD` carry a sign, and `0xE` terminates a
//! mantissa early. Everything else outside `0..=9` is malformed.

use crate::scaled::ScaledNumber;
use crate::time::JstTime;
use crate::{KwinError, Result};

pub(crate) const NIBBLE_ABSENT: u8 = 0xB;
pub(crate) const NIBBLE_PLUS: u8 = 0xC;
pub(crate) const NIBBLE_MINUS: u8 = 0xD;
pub(crate) const NIBBLE_END: u8 = 0xE;

fn nibbles(bytes: &[u8]) -> impl Iterator<Item = u8> + '_ {
    bytes.iter().flat_map(|&b| [b >> 4, b & 0x0F])
}

/// Decode an unsigned BCD fraction field.
///
/// The first `int_digits` digits are integral, the remainder fractional.
/// A leading `0xB` nibble means the field is absent. `0xE` ends the
/// mantissa; digits cut off before the integral part completes do not scale
/// the value up, so `3 6 E …` with three integral digits is 36, not 360.
pub fn decode_scaled(bytes: &[u8], int_digits: u32) -> Result<Option<ScaledNumber>> {
    let mut mantissa: i64 = 0;
    let mut consumed: u32 = 0;
    for (position, nibble) in nibbles(bytes).enumerate() {
        if position == 0 && nibble == NIBBLE_ABSENT {
            return Ok(None);
        }
        if nibble == NIBBLE_END {
            break;
        }
        if nibble > 9 {
            return Err(KwinError::InvalidBcdDigit { nibble, position });
        }
        mantissa = mantissa * 10 + i64::from(nibble);
        consumed += 1;
    }
    let scale = -(consumed.saturating_sub(int_digits) as i32);
    Ok(Some(ScaledNumber::new(mantissa as i32, scale)))
}

/// Decode a signed BCD field (altitudes).
///
/// The first nibble is `0xC` (positive), `0xD` (negative), or `0xB`
/// (absent); the remaining digits follow [`decode_scaled`] rules.
pub fn decode_signed(bytes: &[u8], int_digits: u32) -> Result<Option<ScaledNumber>> {
    let mut it = nibbles(bytes);
    let sign = match it.next() {
        Some(n) => n,
        None => {
            return Err(KwinError::UnexpectedEof {
                expected: 1,
                actual: 0,
            });
        }
    };
    let negative = match sign {
        NIBBLE_ABSENT => return Ok(None),
        NIBBLE_PLUS => false,
        NIBBLE_MINUS => true,
        other => return Err(KwinError::InvalidSignNibble(other)),
    };
    let mut mantissa: i64 = 0;
    let mut consumed: u32 = 0;
    for (i, nibble) in it.enumerate() {
        if nibble == NIBBLE_END {
            break;
        }
        if nibble > 9 {
            return Err(KwinError::InvalidBcdDigit {
                nibble,
                position: i + 1,
            });
        }
        mantissa = mantissa * 10 + i64::from(nibble);
        consumed += 1;
    }
    if negative {
        mantissa = -mantissa;
    }
    let scale = -(consumed.saturating_sub(int_digits) as i32);
    Ok(Some(ScaledNumber::new(mantissa as i32, scale)))
}

/// Decode a geodetic coordinate (three integral digits).
///
/// Negative coordinates are carried as `positive_limit + |value|`: a
/// latitude of −35.1° arrives as 125.1°. The fold-back happens in the
/// scaled domain so significant digits survive.
pub fn decode_coordinate(bytes: &[u8], positive_limit: i32) -> Result<Option<ScaledNumber>> {
    let Some(raw) = decode_scaled(bytes, 3)? else {
        return Ok(None);
    };
    let shift = 10i32.pow(raw.scale().unsigned_abs());
    let limit = positive_limit * shift;
    if raw.mantissa() > limit {
        Ok(Some(ScaledNumber::new(
            -(raw.mantissa() - limit),
            raw.scale(),
        )))
    } else {
        Ok(Some(raw))
    }
}

/// Decode an 8-byte timestamp: `yyyy mm dd hh mi ss ff`, `ff` in
/// hundredths of a second.
pub fn decode_time(bytes: &[u8; 8]) -> Result<JstTime> {
    let mut d = [0u8; 16];
    for (position, nibble) in nibbles(bytes).enumerate() {
        if nibble > 9 {
            return Err(KwinError::InvalidBcdDigit { nibble, position });
        }
        d[position] = nibble;
    }
    let pair = |i: usize| d[i] * 10 + d[i + 1];
    Ok(JstTime {
        year: u16::from(d[0]) * 1000 + u16::from(d[1]) * 100 + u16::from(d[2]) * 10 + u16::from(d[3]),
        month: pair(4),
        day: pair(6),
        hour: pair(8),
        minute: pair(10),
        second: pair(12),
        millisecond: u16::from(pair(14)) * 10,
    })
}

fn pack_nibbles(digits: &[u8]) -> Vec<u8> {
    debug_assert!(digits.len().is_multiple_of(2));
    digits
        .chunks_exact(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect()
}

fn push_mantissa(digits: &mut Vec<u8>, mantissa: u32, width: u32) {
    for i in (0..width).rev() {
        digits.push(((mantissa / 10u32.pow(i)) % 10) as u8);
    }
}

/// Encode an unsigned BCD fraction field of `digit_count` nibbles
/// (`digit_count` must be even).
pub fn encode_scaled(
    value: Option<ScaledNumber>,
    digit_count: u32,
    int_digits: u32,
) -> Result<Vec<u8>> {
    let mut digits: Vec<u8> = Vec::with_capacity(digit_count as usize);
    match value {
        None => digits.resize(digit_count as usize, NIBBLE_ABSENT),
        Some(v) => {
            write_digits(&mut digits, v, digit_count, int_digits)?;
        }
    }
    Ok(pack_nibbles(&digits))
}

/// Encode a signed BCD field: sign nibble plus `digit_count − 1` digits.
pub fn encode_signed(
    value: Option<ScaledNumber>,
    digit_count: u32,
    int_digits: u32,
) -> Result<Vec<u8>> {
    let mut digits: Vec<u8> = Vec::with_capacity(digit_count as usize);
    match value {
        None => digits.resize(digit_count as usize, NIBBLE_ABSENT),
        Some(v) => {
            digits.push(if v.mantissa() < 0 {
                NIBBLE_MINUS
            } else {
                NIBBLE_PLUS
            });
            let abs = ScaledNumber::new(v.mantissa().abs(), v.scale());
            write_digits(&mut digits, abs, digit_count - 1, int_digits)?;
        }
    }
    Ok(pack_nibbles(&digits))
}

/// Encode a geodetic coordinate, folding negatives past `positive_limit`.
pub fn encode_coordinate(
    value: Option<ScaledNumber>,
    digit_count: u32,
    positive_limit: i32,
) -> Result<Vec<u8>> {
    let folded = match value {
        None => None,
        Some(v) => {
            if v.to_f64().abs() > f64::from(positive_limit) {
                return Err(KwinError::EncodeError(format!(
                    "coordinate {v} outside ±{positive_limit}"
                )));
            }
            let shift = 10i32.pow(v.scale().unsigned_abs());
            let mantissa = if v.mantissa() < 0 {
                positive_limit * shift - v.mantissa()
            } else {
                v.mantissa()
            };
            Some(ScaledNumber::new(mantissa, v.scale()))
        }
    };
    encode_scaled(folded, digit_count, 3)
}

fn write_digits(
    digits: &mut Vec<u8>,
    v: ScaledNumber,
    capacity: u32,
    int_digits: u32,
) -> Result<()> {
    if v.scale() > 0 || v.mantissa() < 0 {
        return Err(KwinError::EncodeError(format!(
            "value {v} not representable as a BCD fraction field"
        )));
    }
    let frac = v.scale().unsigned_abs();
    let width = int_digits + frac;
    if width > capacity || i64::from(v.mantissa()) >= 10i64.pow(width) {
        return Err(KwinError::EncodeError(format!(
            "value {v} does not fit a {int_digits}+{} digit BCD field",
            capacity - int_digits
        )));
    }
    push_mantissa(digits, v.mantissa() as u32, width);
    if width < capacity {
        digits.push(NIBBLE_END);
        for _ in width + 1..capacity {
            digits.push(0);
        }
    }
    Ok(())
}

/// Encode an 8-byte timestamp. Millisecond precision below hundredths of a
/// second is truncated.
pub fn encode_time(t: &JstTime) -> [u8; 8] {
    let mut digits = Vec::with_capacity(16);
    push_mantissa(&mut digits, u32::from(t.year), 4);
    push_mantissa(&mut digits, u32::from(t.month), 2);
    push_mantissa(&mut digits, u32::from(t.day), 2);
    push_mantissa(&mut digits, u32::from(t.hour), 2);
    push_mantissa(&mut digits, u32::from(t.minute), 2);
    push_mantissa(&mut digits, u32::from(t.second), 2);
    push_mantissa(&mut digits, u32::from(t.millisecond / 10) % 100, 2);
    let packed = pack_nibbles(&digits);
    let mut out = [0u8; 8];
    out.copy_from_slice(&packed);
    out
}
