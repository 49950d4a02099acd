//! Number formatting and parsing with ECMAScript semantics.
//!
//! `to_js_string` is the Number-to-String conversion: shortest round-trip
//! digits (via `ryu`), integer values without a fractional part, exponential
//! notation outside `[1e-6, 1e21)`. `parse_js_number` is the String-to-Number
//! conversion used by `Number(...)` and unary `+`, which accepts radix
//! prefixes and rejects trailing garbage (unlike `parseFloat`).

use num_bigint::BigInt;
use num_traits::{Num, ToPrimitive};

/// ECMAScript Number-to-String.
pub(crate) fn to_js_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    let neg = n < 0.0;
    let abs = n.abs();
    // Integers below 2^53 print exactly without ryu's trailing ".0".
    if abs < 9_007_199_254_740_992.0 && abs.fract() == 0.0 && abs < 1e21 {
        let mut s = String::new();
        if neg {
            s.push('-');
        }
        s.push_str(&format!("{}", abs as u64));
        return s;
    }
    let mut buf = ryu::Buffer::new();
    let shortest = buf.format(abs);
    // ryu renders as `d.dddde<exp>` or `d.dddd`; re-shape per ECMAScript.
    let (digits, exp) = split_ryu(shortest);
    let k = digits.len() as i32;
    // `p` is the position of the decimal point relative to the first digit.
    let p = exp + 1;
    let mut out = String::new();
    if neg {
        out.push('-');
    }
    if (-5..=21).contains(&p) {
        if p <= 0 {
            out.push_str("0.");
            for _ in 0..-p {
                out.push('0');
            }
            out.push_str(&digits);
        } else if p >= k {
            out.push_str(&digits);
            for _ in 0..(p - k) {
                out.push('0');
            }
        } else {
            out.push_str(&digits[..p as usize]);
            out.push('.');
            out.push_str(&digits[p as usize..]);
        }
    } else {
        out.push_str(&digits[..1]);
        if k > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        if p - 1 >= 0 {
            out.push('+');
        }
        out.push_str(&(p - 1).to_string());
    }
    out
}

/// Splits a ryu-formatted positive float into (digits, exponent-of-first-digit).
fn split_ryu(s: &str) -> (String, i32) {
    let (mantissa, exp) = match s.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i32>().expect("ryu exponent")),
        None => (s, 0),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    let mut digits: String = int_part.chars().chain(frac_part.chars()).collect();
    // exponent of the first digit: int part length - 1, adjusted by e
    let mut first_exp = int_part.len() as i32 - 1 + exp;
    // strip leading zeros ("0.5" -> digits "05")
    while digits.len() > 1 && digits.starts_with('0') {
        digits.remove(0);
        first_exp -= 1;
    }
    // strip trailing zeros
    while digits.len() > 1 && digits.ends_with('0') {
        digits.pop();
    }
    (digits, first_exp)
}

/// ECMAScript String-to-Number (the `Number("...")` conversion).
///
/// Accepts optional sign, decimal with exponent, `0x`/`0o`/`0b` prefixes,
/// `Infinity`, and whitespace trimming. Any trailing garbage yields `NaN`.
pub(crate) fn parse_js_number(s: &str) -> f64 {
    let t = s.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}');
    if t.is_empty() {
        return 0.0;
    }
    if let Some(rest) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return parse_radix(rest, 16);
    }
    if let Some(rest) = t.strip_prefix("0o").or_else(|| t.strip_prefix("0O")) {
        return parse_radix(rest, 8);
    }
    if let Some(rest) = t.strip_prefix("0b").or_else(|| t.strip_prefix("0B")) {
        return parse_radix(rest, 2);
    }
    let (sign, body) = match t.as_bytes().first() {
        Some(b'-') => (-1.0, &t[1..]),
        Some(b'+') => (1.0, &t[1..]),
        _ => (1.0, t),
    };
    if body == "Infinity" {
        return sign * f64::INFINITY;
    }
    // reject forms Rust accepts but JS does not
    if body.is_empty() || body.starts_with("inf") || body.starts_with("NaN") || body.contains('_') {
        return f64::NAN;
    }
    match body.parse::<f64>() {
        Ok(v) => sign * v,
        Err(_) => f64::NAN,
    }
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut v = 0f64;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => v = v * f64::from(radix) + f64::from(d),
            None => return f64::NAN,
        }
    }
    v
}

/// ToInt32: modular truncation into `i32`.
pub(crate) fn to_int32(n: f64) -> i32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let m = n.trunc() % 4_294_967_296.0;
    let m = if m < 0.0 { m + 4_294_967_296.0 } else { m };
    if m >= 2_147_483_648.0 { (m - 4_294_967_296.0) as i32 } else { m as i32 }
}

/// ToUint32.
pub(crate) fn to_uint32(n: f64) -> u32 {
    to_int32(n) as u32
}

/// ToLength: truncate and clamp to `[0, 2^53 - 1]`.
pub(crate) fn to_length(n: f64) -> u64 {
    if n.is_nan() || n <= 0.0 {
        return 0;
    }
    let n = n.trunc();
    if n >= 9_007_199_254_740_991.0 {
        9_007_199_254_740_991
    } else {
        n as u64
    }
}

/// ToIntegerOrInfinity, kept as f64 (`±Infinity` flow through).
pub(crate) fn to_integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() { 0.0 } else { n.trunc() }
}

/// Relative index resolution used by `at`/`slice`-family methods.
pub(crate) fn relative_index(idx: f64, len: usize) -> Option<usize> {
    let idx = to_integer_or_infinity(idx);
    let len = len as f64;
    let resolved = if idx < 0.0 { len + idx } else { idx };
    if resolved < 0.0 || resolved >= len {
        None
    } else {
        Some(resolved as usize)
    }
}

/// BigInt to f64, rounding to the nearest double (the `Number(bigint)`
/// conversion; comparisons stay exact and do not use this).
pub(crate) fn bigint_to_f64(b: &BigInt) -> f64 {
    b.to_f64().unwrap_or(f64::NAN)
}

/// Parses a BigInt from a string (the `BigInt("...")` conversion).
pub(crate) fn parse_js_bigint(s: &str) -> Option<BigInt> {
    let t = s.trim();
    if t.is_empty() {
        return Some(BigInt::from(0));
    }
    if let Some(rest) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return BigInt::from_str_radix(rest, 16).ok();
    }
    if let Some(rest) = t.strip_prefix("0o").or_else(|| t.strip_prefix("0O")) {
        return BigInt::from_str_radix(rest, 8).ok();
    }
    if let Some(rest) = t.strip_prefix("0b").or_else(|| t.strip_prefix("0B")) {
        return BigInt::from_str_radix(rest, 2).ok();
    }
    t.parse::<BigInt>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_without_fraction() {
        assert_eq!(to_js_string(0.0), "0");
        assert_eq!(to_js_string(-0.0), "0");
        assert_eq!(to_js_string(1.0), "1");
        assert_eq!(to_js_string(-42.0), "-42");
        assert_eq!(to_js_string(9007199254740991.0), "9007199254740991");
    }

    #[test]
    fn fractions_shortest() {
        assert_eq!(to_js_string(0.5), "0.5");
        assert_eq!(to_js_string(0.1), "0.1");
        assert_eq!(to_js_string(-1.5), "-1.5");
        assert_eq!(to_js_string(1234.5678), "1234.5678");
    }

    #[test]
    fn exponential_thresholds() {
        assert_eq!(to_js_string(1e21), "1e+21");
        assert_eq!(to_js_string(1e-7), "1e-7");
        assert_eq!(to_js_string(0.000001), "0.000001");
        assert_eq!(to_js_string(123e18), "123000000000000000000");
        assert_eq!(to_js_string(1.5e22), "1.5e+22");
    }

    #[test]
    fn specials() {
        assert_eq!(to_js_string(f64::NAN), "NaN");
        assert_eq!(to_js_string(f64::INFINITY), "Infinity");
        assert_eq!(to_js_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn parse_accepts_radix_and_sign() {
        assert_eq!(parse_js_number("0x10"), 16.0);
        assert_eq!(parse_js_number("0b101"), 5.0);
        assert_eq!(parse_js_number("0o17"), 15.0);
        assert_eq!(parse_js_number("  -12.5e1 "), -125.0);
        assert_eq!(parse_js_number(""), 0.0);
        assert_eq!(parse_js_number("   "), 0.0);
        assert_eq!(parse_js_number("Infinity"), f64::INFINITY);
        assert_eq!(parse_js_number("-Infinity"), f64::NEG_INFINITY);
    }

    #[test]
    fn parse_rejects_trailing_garbage() {
        assert!(parse_js_number("12px").is_nan());
        assert!(parse_js_number("0x").is_nan());
        assert!(parse_js_number("1_000").is_nan());
        assert!(parse_js_number("inf").is_nan());
    }

    #[test]
    fn int32_wrapping() {
        assert_eq!(to_int32(4_294_967_296.0), 0);
        assert_eq!(to_int32(4_294_967_297.0), 1);
        assert_eq!(to_int32(2_147_483_648.0), -2_147_483_648);
        assert_eq!(to_int32(-1.5), -1);
        assert_eq!(to_uint32(-1.0), 4_294_967_295);
        assert_eq!(to_int32(f64::NAN), 0);
    }

    #[test]
    fn length_clamping() {
        assert_eq!(to_length(-5.0), 0);
        assert_eq!(to_length(3.7), 3);
        assert_eq!(to_length(1e60), 9_007_199_254_740_991);
    }
}
