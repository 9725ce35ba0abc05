//! Indicator frame decoding
//!
//! Wire format, one reading per line terminated by `\r`:
//!
//! ```text
//! <StatusChar><Sign><Digits>[.<Digits>]
//! ```
//!
//! e.g. `P+00125` or `T-3.50`. The status letter says whether the
//! platform has settled; the numeric part is the weight magnitude in
//! kilograms.

use weighbridge_types::{DeviceStatus, FrameError, WeightSample};

/// Extra decimal places the indicator folds into integer values. The
/// shipped indicator configuration reports whole kilograms, so this
/// stays at 0, but the divisor concept is kept for indicators that
/// report fixed-point integers.
pub const DECIMAL_PLACES: u32 = 0;

/// Readings are snapped to the nearest multiple of this many kilograms.
pub const ROUNDING_STEP_KG: i32 = 5;

/// Decode one logical frame into a weight sample.
///
/// Control characters are stripped and the remainder trimmed before
/// parsing. An empty result is [`FrameError::Empty`] (ignorable, not a
/// fault); anything not matching the exact grammar is
/// [`FrameError::Malformed`]. Never panics on arbitrary input.
pub fn decode(frame: &str) -> Result<WeightSample, FrameError> {
    let cleaned: String = frame.chars().filter(|c| !c.is_ascii_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return Err(FrameError::Empty);
    }

    let mut chars = cleaned.chars();

    let status = match chars.next() {
        Some(c) if c.is_ascii_uppercase() => c,
        _ => return Err(FrameError::Malformed(cleaned.to_string())),
    };

    let negative = match chars.next() {
        Some('+') => false,
        Some('-') => true,
        _ => return Err(FrameError::Malformed(cleaned.to_string())),
    };

    let value = chars.as_str();
    if !is_numeric_part(value) {
        return Err(FrameError::Malformed(cleaned.to_string()));
    }

    let magnitude = if value.contains('.') {
        value
            .parse::<f64>()
            .map_err(|_| FrameError::Malformed(cleaned.to_string()))?
    } else {
        let raw = value
            .parse::<i64>()
            .map_err(|_| FrameError::Malformed(cleaned.to_string()))?;
        raw as f64 / 10f64.powi(DECIMAL_PLACES as i32)
    };

    let signed = if negative { -magnitude } else { magnitude };

    // Round half away from zero to the nearest step. A digit run that
    // rounds outside i32 (line noise, never a real reading) is rejected
    // rather than wrapped.
    let steps = (signed / ROUNDING_STEP_KG as f64).round();
    if steps < (i32::MIN / ROUNDING_STEP_KG) as f64 || steps > (i32::MAX / ROUNDING_STEP_KG) as f64
    {
        return Err(FrameError::Malformed(cleaned.to_string()));
    }
    let kg = steps as i32 * ROUNDING_STEP_KG;

    Ok(WeightSample {
        kg,
        status: DeviceStatus::from_code(status),
    })
}

/// Digits with at most one decimal point, and at least one digit.
fn is_numeric_part(value: &str) -> bool {
    let mut digits = 0;
    let mut dots = 0;
    for c in value.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}
