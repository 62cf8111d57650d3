// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register codec
//!
//! Maps typed PLC values to and from Modbus register words. Every type uses
//! the same convention as the PLC: big-endian bytes inside each word and
//! big-endian word order (most significant word first) for multi-word values.
//!
//! | Type | Storage | Words |
//! |------|---------|-------|
//! | `BOOL` | coil | - |
//! | `INT` | holding register | 1 (two's complement) |
//! | `REAL` | holding registers | 2 (IEEE-754 single, high word first) |

use super::error::CodecError;

/// Number of holding registers used by a `REAL` value
pub const FLOAT32_WORDS: usize = 2;

/// Number of holding registers used by an `INT` value
pub const INT16_WORDS: usize = 1;

/// Check that `words` registers starting at `address` fit in the address space
///
/// ### Errors
///
/// Returns [`CodecError::Span`] when the last word would be past 65535.
pub fn check_span(address: u16, words: usize) -> Result<(), CodecError> {
    if usize::from(address) + words > usize::from(u16::MAX) + 1 {
        return Err(CodecError::Span { address, words });
    }
    Ok(())
}

/// Encode a boolean for a coil write
pub fn encode_bool(value: bool) -> bool {
    value
}

/// Decode a coil bit
pub fn decode_bool(coil: bool) -> bool {
    coil
}

/// Encode a signed 16-bit integer into one register word
///
/// ### Errors
///
/// Returns [`CodecError::Range`] when `value` is outside `-32768..=32767`.
pub fn encode_int16(value: i64) -> Result<[u16; INT16_WORDS], CodecError> {
    let narrowed = i16::try_from(value).map_err(|_| CodecError::Range { value })?;
    Ok([u16::from_be_bytes(narrowed.to_be_bytes())])
}

/// Decode one register word as a signed 16-bit integer
///
/// ### Errors
///
/// Returns [`CodecError::Length`] unless exactly one word is given.
pub fn decode_int16(words: &[u16]) -> Result<i16, CodecError> {
    match words {
        [word] => Ok(i16::from_be_bytes(word.to_be_bytes())),
        _ => Err(CodecError::Length {
            expected: INT16_WORDS,
            actual: words.len(),
        }),
    }
}

/// Encode an IEEE-754 single-precision float into two register words
///
/// The most significant word comes first. NaN and infinities keep their
/// exact bit pattern.
pub fn encode_float32(value: f32) -> [u16; FLOAT32_WORDS] {
    let bits = value.to_bits();
    [(bits >> 16) as u16, (bits & 0xFFFF) as u16]
}

/// Decode two register words (most significant first) as a float
///
/// ### Errors
///
/// Returns [`CodecError::Length`] unless exactly two words are given.
pub fn decode_float32(words: &[u16]) -> Result<f32, CodecError> {
    match words {
        [high, low] => Ok(f32::from_bits((u32::from(*high) << 16) | u32::from(*low))),
        _ => Err(CodecError::Length {
            expected: FLOAT32_WORDS,
            actual: words.len(),
        }),
    }
}
