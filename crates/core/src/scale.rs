//! Decimal scaling at the input boundary.
//!
//! Request numerics arrive as decimal strings. The engine multiplies every
//! width, height, cut thickness and trim dimension by `10^d`, where `d` is
//! the largest number of decimal places found in the request, capped so that
//! integer digits plus decimal digits stay within [`MAX_ALLOWED_DIGITS`].
//! The core then works on integers; responses divide back by the factor.

use crate::error::{CoreError, Error, Result};

/// Maximum total digits (integer + decimal) a scaled value may occupy.
pub const MAX_ALLOWED_DIGITS: usize = 6;

/// Number of digits after the decimal point. `None` and undotted strings
/// count as zero.
pub fn decimal_places(value: Option<&str>) -> usize {
    match value {
        None => 0,
        Some(v) => match v.find('.') {
            Some(dot) => v.len() - dot - 1,
            None => 0,
        },
    }
}

/// Number of digits before the decimal point.
pub fn integer_places(value: Option<&str>) -> usize {
    match value {
        None => 0,
        Some(v) => match v.find('.') {
            Some(dot) => dot,
            None => v.len(),
        },
    }
}

/// Resolves the scaling factor for a request, clamping the decimal digits so
/// the total stays within [`MAX_ALLOWED_DIGITS`]. Returns the factor and
/// whether clamping occurred.
pub fn resolve_factor(max_decimal_places: usize, max_integer_places: usize) -> (f64, bool) {
    let clamped = max_decimal_places + max_integer_places > MAX_ALLOWED_DIGITS;
    let places = if clamped {
        MAX_ALLOWED_DIGITS.saturating_sub(max_integer_places)
    } else {
        max_decimal_places
    };
    (10f64.powi(places as i32), clamped)
}

/// Parses a decimal string and scales it to the integer grid.
pub fn scale_value(value: &str, factor: f64) -> Result<u32> {
    let parsed: f64 = value.trim().parse().map_err(|e| {
        Error::Core(CoreError::NumberParse {
            value: value.to_string(),
            reason: format!("{e}"),
        })
    })?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(Error::Core(CoreError::NumberParse {
            value: value.to_string(),
            reason: "negative or non-finite".to_string(),
        }));
    }
    Ok((parsed * factor).round() as u32)
}

/// Scales an optional numeric; blank or missing values count as zero, and a
/// malformed value falls back to zero as well (the boundary logs, the engine
/// proceeds without kerf/trim).
pub fn scale_or_zero(value: Option<&str>, factor: f64) -> u32 {
    match value {
        Some(v) if !v.trim().is_empty() => scale_value(v, factor).unwrap_or_else(|_| {
            log::error!("error parsing numeric value [{v}], treating as 0");
            0
        }),
        _ => 0,
    }
}

/// Maps a scaled length back to input units.
pub fn unscale(value: u64, factor: f64) -> f64 {
    value as f64 / factor
}

/// Maps a scaled area back to input units.
pub fn unscale_area(value: u64, factor: f64) -> f64 {
    value as f64 / (factor * factor)
}
