// spend-script/src/script/script_num.rs
//! Numeric stack operands.
//!
//! Numbers are little-endian with the sign in the high bit of the last byte.
//! Zero encodes as the empty vector.

use crate::error::ScriptError;

/// Decodes `bytes` as a script number no longer than `max_len` bytes.
pub fn make_script_num(bytes: &[u8], max_len: usize) -> Result<i64, ScriptError> {
    if bytes.len() > max_len {
        return Err(ScriptError::NumberTooBig(bytes.len()));
    }
    if bytes.is_empty() {
        return Ok(0);
    }

    let mut result: i64 = 0;
    for (i, b) in bytes.iter().enumerate() {
        result |= (*b as i64) << (8 * i);
    }

    let last = bytes[bytes.len() - 1];
    if last & 0x80 != 0 {
        // Clear the sign bit and negate.
        result &= !(0x80i64 << (8 * (bytes.len() - 1)));
        return Ok(-result);
    }
    Ok(result)
}

/// Encodes `n` in the minimal script number form.
pub fn script_num_bytes(n: i64) -> Vec<u8> {
    if n == 0 {
        return vec![];
    }

    let negative = n < 0;
    let mut abs = n.unsigned_abs();
    let mut result = Vec::with_capacity(9);
    while abs > 0 {
        result.push((abs & 0xff) as u8);
        abs >>= 8;
    }

    // The high bit is the sign, so add a byte when the magnitude already uses it.
    let last = result.len() - 1;
    if result[last] & 0x80 != 0 {
        result.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        result[last] |= 0x80;
    }
    result
}
