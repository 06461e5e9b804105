//! Flat text encoding of stream history.
//!
//! The dashboard pulls history as one comma-delimited sequence of numbers,
//! laid out stream-major: every value of stream 0 oldest-first, then every
//! value of stream 1, and so on, with the time stream last. Each token is
//! followed by [`DELIMITER`], so the payload always ends with one. A browser
//! consumer strips that final delimiter, wraps the rest in brackets and parses
//! it as a JSON array.
//!
//! ```text
//! 10,20,100,200,1,2,
//! └─s0─┘└─s1──┘└t─┘
//! ```
//!
//! Values are written with at most `decimals` fractional digits and trailing
//! zeros trimmed, never in exponent form. Non-finite values are written as
//! [`NULL_TOKEN`] so the bracket-wrapped payload stays valid JSON.

use core::fmt::Write;

use crate::error::{ParseError, ParseResult};

/// Separator written after every token.
pub const DELIMITER: char = ',';

/// Token written in place of a non-finite value.
pub const NULL_TOKEN: &str = "null";

/// Default number of fractional digits for value tokens.
pub const DEFAULT_DECIMALS: usize = 2;

/// Largest supported number of fractional digits.
pub const MAX_DECIMALS: usize = 6;

/// Integer digits of `f32::MAX` written without an exponent.
const F32_MAX_INTEGER_DIGITS: usize = 39;

/// Digits of `u64::MAX`.
const U64_MAX_DIGITS: usize = 20;

/// Upper bound on the length of one value token, delimiter included.
///
/// Sign, integer part of `f32::MAX`, decimal point, fraction, delimiter.
#[must_use]
pub const fn max_value_token_len(decimals: usize) -> usize {
    1 + F32_MAX_INTEGER_DIGITS + 1 + decimals + 1
}

/// Upper bound on the length of one timestamp token, delimiter included.
pub const MAX_TIMESTAMP_TOKEN_LEN: usize = U64_MAX_DIGITS + 1;

/// Append one value token and its delimiter to `out`.
///
/// ```
/// use telemetry_types::wire;
///
/// let mut out = String::new();
/// wire::push_value(&mut out, 10.0, 2);
/// wire::push_value(&mut out, 2.5, 2);
/// wire::push_value(&mut out, 1.0 / 3.0, 2);
/// assert_eq!(out, "10,2.5,0.33,");
/// ```
pub fn push_value(out: &mut String, value: f32, decimals: usize) {
    if !value.is_finite() {
        out.push_str(NULL_TOKEN);
        out.push(DELIMITER);
        return;
    }

    let start = out.len();
    let _ = write!(out, "{:.*}", decimals, value);

    // Only trim when a fractional part was written, otherwise "10" would lose its zero
    if decimals > 0 {
        let kept = out[start..]
            .trim_end_matches('0')
            .trim_end_matches('.')
            .len();
        out.truncate(start + kept);
    }
    if &out[start..] == "-0" {
        out.truncate(start);
        out.push('0');
    }

    out.push(DELIMITER);
}

/// Append one timestamp token and its delimiter to `out`.
pub fn push_timestamp(out: &mut String, timestamp: u64) {
    let _ = write!(out, "{}{}", timestamp, DELIMITER);
}

/// Decode a flat payload into its numeric tokens.
///
/// The payload must end with [`DELIMITER`] unless it is empty. [`NULL_TOKEN`]
/// decodes to `NaN`. Surrounding whitespace is ignored.
///
/// ```
/// use telemetry_types::wire;
///
/// let tokens = wire::decode("10,20,100,200,1,2,").unwrap();
/// assert_eq!(tokens, vec![10.0, 20.0, 100.0, 200.0, 1.0, 2.0]);
/// ```
pub fn decode(payload: &str) -> ParseResult<Vec<f64>> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(Vec::new());
    }

    let body = payload
        .strip_suffix(DELIMITER)
        .ok_or(ParseError::MissingTrailingDelimiter)?;

    body.split(DELIMITER)
        .enumerate()
        .map(|(index, token)| {
            let token = token.trim();
            if token == NULL_TOKEN {
                return Ok(f64::NAN);
            }
            token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ParseError::InvalidToken {
                    index,
                    token: token.to_string(),
                })
        })
        .collect()
}

/// Split stream-major tokens back into one vector per stream.
///
/// `streams` is the number of streams on the wire, time stream included.
/// Every stream receives `tokens.len() / streams` values.
///
/// ```
/// use telemetry_types::wire;
///
/// let columns = wire::deinterleave(&[10.0, 20.0, 100.0, 200.0, 1.0, 2.0], 3).unwrap();
/// assert_eq!(columns[0], vec![10.0, 20.0]);
/// assert_eq!(columns[2], vec![1.0, 2.0]);
/// ```
pub fn deinterleave(tokens: &[f64], streams: usize) -> ParseResult<Vec<Vec<f64>>> {
    if streams == 0 {
        return Err(ParseError::InvalidData(
            "stream count must be at least 1".to_string(),
        ));
    }
    if tokens.len() % streams != 0 {
        return Err(ParseError::Misaligned {
            tokens: tokens.len(),
            streams,
        });
    }

    let length = tokens.len() / streams;
    if length == 0 {
        return Ok(vec![Vec::new(); streams]);
    }
    Ok(tokens.chunks(length).map(<[f64]>::to_vec).collect())
}

/// Decode a payload and de-interleave it in one step.
pub fn decode_streams(payload: &str, streams: usize) -> ParseResult<Vec<Vec<f64>>> {
    let tokens = decode(payload)?;
    deinterleave(&tokens, streams)
}
