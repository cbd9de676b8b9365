use ethers::types::U256;

use crate::constants::NATIVE_DECIMALS;

// Below this the formatter keeps leading zeros plus two significant digits.
const SMALL_BALANCE_THRESHOLD: f64 = 0.0001;
// Rounding applied before fixed formatting to erase binary floating-point noise.
const NOISE_SIGNIFICANT_DIGITS: usize = 12;
const FALLBACK_SIGNIFICANT_DIGITS: usize = 3;

/// Normalizes a decimal balance string for display.
///
/// Whole numbers lose their fractional part, dust amounts keep two significant
/// digits after the leading zeros (`0.00000060004872` -> `0.00000060`), and
/// everything else is rounded to a magnitude-dependent number of decimals with
/// trailing zeros removed. Never fails: unparseable input renders as `"0"`.
pub fn truncate_balance(balance: &str) -> String {
    let text = balance.trim();
    let num = match text.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => return "0".to_string(),
    };

    if num == 0.0 {
        return "0".to_string();
    }

    if num.fract() == 0.0 {
        return format!("{}", num);
    }

    if num < SMALL_BALANCE_THRESHOLD {
        if let Some(kept) = leading_significant_digits(text) {
            return kept;
        }
        // Exponent or otherwise non-canonical input: retry on the plain decimal form.
        if let Some(kept) = leading_significant_digits(&format!("{}", num)) {
            return kept;
        }
        return format!("{}", round_significant(num, FALLBACK_SIGNIFICANT_DIGITS));
    }

    let normalized = round_significant(num, NOISE_SIGNIFICANT_DIGITS);
    let decimals = if normalized >= 1.0 {
        6
    } else if normalized >= 0.01 {
        8
    } else {
        10
    };

    let fixed = format!("{:.*}", decimals, normalized);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

// Internal helper that keeps `0.` + leading zeros + first non-zero digit + one more digit.
fn leading_significant_digits(text: &str) -> Option<String> {
    let rest = text.strip_prefix("0.")?;
    let zeros = rest.len() - rest.trim_start_matches('0').len();
    let mut digits = rest[zeros..].chars();
    let first = digits.next().filter(|c| matches!(c, '1'..='9'))?;
    let mut kept = format!("0.{}{}", &rest[..zeros], first);
    if let Some(second) = digits.next().filter(char::is_ascii_digit) {
        kept.push(second);
    }
    Some(kept)
}

// Internal helper that rounds to `digits` significant digits.
fn round_significant(value: f64, digits: usize) -> f64 {
    format!("{:.*e}", digits.saturating_sub(1), value)
        .parse::<f64>()
        .unwrap_or(value)
}

/// Converts a user-facing decimal amount into the smallest native unit (18 decimals).
///
/// Fraction digits beyond the 18th are rounded half-up. Signs, exponents and
/// anything that is not `digits[.digits]` are rejected.
pub fn parse_native_amount(amount: &str) -> Option<U256> {
    let trimmed = amount.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let scale = NATIVE_DECIMALS as usize;
    let (kept, dropped) = if fraction.len() > scale {
        fraction.split_at(scale)
    } else {
        (fraction, "")
    };
    let round_up = dropped.chars().next().is_some_and(|c| c >= '5');

    let whole = if whole.is_empty() { "0" } else { whole };
    let digits = format!("{}{:0<width$}", whole, kept, width = scale);
    let value = U256::from_dec_str(&digits).ok()?;
    if round_up {
        value.checked_add(U256::one())
    } else {
        Some(value)
    }
}

/// Renders a smallest-unit integer as a minimal decimal string in the native unit.
pub fn format_native_amount(value: U256) -> String {
    let scale = NATIVE_DECIMALS as usize;
    let base = U256::exp10(scale);
    let whole = value / base;
    let fraction = value % base;
    if fraction.is_zero() {
        return whole.to_string();
    }
    let padded = format!("{:0>width$}", fraction.to_string(), width = scale);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}
