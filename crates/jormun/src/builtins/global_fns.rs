//! Free global functions: number parsing, URI coding, timers,
//! `queueMicrotask`.

use super::arg;
use crate::{
    error::{RunError, RunResult},
    jobs::Job,
    machine::Interp,
    types::number::to_integer_or_infinity,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GlobalFn {
    ParseInt,
    ParseFloat,
    IsNaN,
    IsFinite,
    EncodeURI,
    EncodeURIComponent,
    DecodeURI,
    DecodeURIComponent,
    SetTimeout,
    ClearTimeout,
    SetInterval,
    ClearInterval,
    QueueMicrotask,
}

pub(crate) fn call(interp: &mut Interp, f: GlobalFn, _this: Value, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    let a1 = arg(args, 1);
    match f {
        GlobalFn::ParseInt => {
            let s = interp.to_string_rust(a0)?;
            let radix = to_integer_or_infinity(interp.to_number(a1)?) as i64;
            Ok(Value::Number(parse_int(&s, radix)))
        }
        GlobalFn::ParseFloat => {
            let s = interp.to_string_rust(a0)?;
            Ok(Value::Number(parse_float(&s)))
        }
        GlobalFn::IsNaN => {
            let n = interp.to_number(a0)?;
            Ok(Value::Bool(n.is_nan()))
        }
        GlobalFn::IsFinite => {
            let n = interp.to_number(a0)?;
            Ok(Value::Bool(n.is_finite()))
        }
        GlobalFn::EncodeURI => uri_encode(interp, a0, "!#$&'()*+,-./:;=?@_~"),
        GlobalFn::EncodeURIComponent => uri_encode(interp, a0, "!'()*-._~"),
        GlobalFn::DecodeURI | GlobalFn::DecodeURIComponent => {
            let s = interp.to_string_rust(a0)?;
            let out = uri_decode(&s).ok_or_else(|| {
                RunError::Simple(crate::error::SimpleException::new(
                    crate::error::ExcKind::UriError,
                    "URI malformed",
                ))
            })?;
            Value::string(&mut interp.heap, out)
        }
        GlobalFn::SetTimeout | GlobalFn::SetInterval => {
            if !a0.is_callable(&interp.heap) {
                return Err(interp.throw_type("Callback must be a function"));
            }
            let delay = if matches!(a1, Value::Undefined) { 0.0 } else { interp.to_number(a1)? };
            let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
            let extra: Vec<Value> = args.iter().skip(2).copied().collect();
            let interval = matches!(f, GlobalFn::SetInterval).then_some(delay);
            let id = interp.timers.schedule(a0, delay, extra, interval);
            Ok(Value::Number(f64::from(id)))
        }
        GlobalFn::ClearTimeout | GlobalFn::ClearInterval => {
            if let Value::Number(n) = a0 {
                interp.timers.cancel(n as u32);
            }
            Ok(Value::Undefined)
        }
        GlobalFn::QueueMicrotask => {
            if !a0.is_callable(&interp.heap) {
                return Err(interp.throw_type("Callback must be a function"));
            }
            interp.jobs.push_back(Job::Callback { func: a0, args: Vec::new() });
            Ok(Value::Undefined)
        }
    }
}

/// `parseInt`: optional sign, optional 0x prefix (radix 16 or unspecified),
/// longest digit prefix.
fn parse_int(s: &str, radix: i64) -> f64 {
    let t = s.trim_start();
    let (sign, t) = match t.as_bytes().first() {
        Some(b'-') => (-1.0, &t[1..]),
        Some(b'+') => (1.0, &t[1..]),
        _ => (1.0, t),
    };
    let explicit = radix != 0;
    let mut radix = if explicit { radix as u32 } else { 10 };
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let t = if (!explicit || radix == 16) && (t.starts_with("0x") || t.starts_with("0X")) {
        radix = 16;
        &t[2..]
    } else {
        t
    };
    let mut value = 0f64;
    let mut any = false;
    for c in t.chars() {
        match c.to_digit(radix) {
            Some(d) => {
                any = true;
                value = value * f64::from(radix) + f64::from(d);
            }
            None => break,
        }
    }
    if any { sign * value } else { f64::NAN }
}

/// `parseFloat`: longest valid decimal prefix.
fn parse_float(s: &str) -> f64 {
    let t = s.trim_start();
    let bytes = t.as_bytes();
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_e = false;
    while end < bytes.len() {
        let c = bytes[end];
        match c {
            b'0'..=b'9' => {}
            b'+' | b'-' if end == 0 || matches!(bytes[end - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_e => seen_dot = true,
            b'e' | b'E' if !seen_e && end > 0 => seen_e = true,
            _ => break,
        }
        end += 1;
    }
    if t.starts_with("Infinity") || t.starts_with("+Infinity") {
        return f64::INFINITY;
    }
    if t.starts_with("-Infinity") {
        return f64::NEG_INFINITY;
    }
    // trim a trailing exponent marker without digits
    let mut slice = &t[..end];
    while slice.ends_with(['e', 'E', '+', '-', '.']) && !slice.is_empty() {
        slice = &slice[..slice.len() - 1];
    }
    slice.parse::<f64>().unwrap_or(f64::NAN)
}

fn uri_encode(interp: &mut Interp, v: Value, unreserved: &str) -> RunResult<Value> {
    let s = interp.to_string_rust(v)?;
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() || unreserved.contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    Value::string(&mut interp.heap, out)
}

fn uri_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out_bytes = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            let byte = u8::from_str_radix(hex, 16).ok()?;
            out_bytes.push(byte);
            i += 3;
        } else {
            out_bytes.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out_bytes).ok()
}
