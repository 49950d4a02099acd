//! The `Number` constructor, statics, and prototype.

use super::arg;
use crate::{
    error::{RunError, RunResult},
    heap::HeapData,
    machine::Interp,
    object::{JsObject, ObjectKind},
    types::number::{to_integer_or_infinity, to_js_string},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumberFn {
    Ctor,
    IsInteger,
    IsFinite,
    IsNaN,
    IsSafeInteger,
    ToFixed,
    ToPrecision,
    ToStringRadix,
    ValueOf,
}

fn this_number(interp: &mut Interp, this: Value) -> RunResult<f64> {
    match this {
        Value::Number(n) => Ok(n),
        _ => {
            if let Some(id) = this.object_id(&interp.heap)
                && let ObjectKind::Wrapper(Value::Number(n)) = interp.heap.obj(id).kind
            {
                return Ok(n);
            }
            Err(interp.throw_type("Number.prototype method called on incompatible receiver"))
        }
    }
}

pub(crate) fn construct(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    let n = if args.is_empty() { 0.0 } else { interp.to_number(arg(args, 0))? };
    let obj = JsObject::new(Some(interp.realm.number_proto), ObjectKind::Wrapper(Value::Number(n)));
    Ok(Value::Ref(interp.heap.alloc(HeapData::Object(obj))?))
}

pub(crate) fn call(interp: &mut Interp, f: NumberFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    match f {
        NumberFn::Ctor => {
            if args.is_empty() {
                return Ok(Value::Number(0.0));
            }
            // Number(bigint) converts, unlike arithmetic
            if let Some(b) = a0.as_bigint(&interp.heap) {
                return Ok(Value::Number(crate::types::number::bigint_to_f64(b)));
            }
            Ok(Value::Number(interp.to_number(a0)?))
        }
        NumberFn::IsInteger => Ok(Value::Bool(matches!(a0, Value::Number(n) if n.is_finite() && n.fract() == 0.0))),
        NumberFn::IsFinite => Ok(Value::Bool(matches!(a0, Value::Number(n) if n.is_finite()))),
        NumberFn::IsNaN => Ok(Value::Bool(matches!(a0, Value::Number(n) if n.is_nan()))),
        NumberFn::IsSafeInteger => Ok(Value::Bool(
            matches!(a0, Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_991.0),
        )),
        NumberFn::ToFixed => {
            let n = this_number(interp, this)?;
            let digits = to_integer_or_infinity(interp.to_number(a0)?);
            if !(0.0..=100.0).contains(&digits) {
                return Err(RunError::range_err("toFixed() digits argument must be between 0 and 100"));
            }
            let s = if n.abs() >= 1e21 { to_js_string(n) } else { format!("{n:.*}", digits as usize) };
            Value::string(&mut interp.heap, s)
        }
        NumberFn::ToPrecision => {
            let n = this_number(interp, this)?;
            if matches!(a0, Value::Undefined) {
                return Value::string(&mut interp.heap, to_js_string(n));
            }
            let p = to_integer_or_infinity(interp.to_number(a0)?);
            if !(1.0..=100.0).contains(&p) {
                return Err(RunError::range_err("toPrecision() argument must be between 1 and 100"));
            }
            let s = format!("{n:.*e}", p as usize - 1);
            // fall back to plain formatting when the exponent is small
            let plain = format!("{n:.*}", (p as usize).saturating_sub(1 + n.abs().log10().max(0.0) as usize));
            let s = if n != 0.0 && (n.abs() >= 1e21 || n.abs() < 1e-6) { s } else { plain };
            Value::string(&mut interp.heap, s)
        }
        NumberFn::ToStringRadix => {
            let n = this_number(interp, this)?;
            let radix = if matches!(a0, Value::Undefined) { 10 } else { to_integer_or_infinity(interp.to_number(a0)?) as i64 };
            if !(2..=36).contains(&radix) {
                return Err(RunError::range_err("toString() radix must be between 2 and 36"));
            }
            let s = if radix == 10 { to_js_string(n) } else { format_radix(n, radix as u32) };
            Value::string(&mut interp.heap, s)
        }
        NumberFn::ValueOf => Ok(Value::Number(this_number(interp, this)?)),
    }
}

/// Integer-focused radix formatting (fractional parts truncate to 20
/// digits of precision).
fn format_radix(n: f64, radix: u32) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    let neg = n < 0.0;
    let mut int = n.abs().trunc();
    let mut frac = n.abs().fract();
    let digit = |d: u32| char::from_digit(d, radix).expect("digit below radix");
    let mut int_digits = Vec::new();
    if int == 0.0 {
        int_digits.push('0');
    }
    while int >= 1.0 {
        int_digits.push(digit((int % f64::from(radix)) as u32));
        int = (int / f64::from(radix)).trunc();
    }
    let mut out = String::new();
    if neg {
        out.push('-');
    }
    out.extend(int_digits.iter().rev());
    if frac > 0.0 {
        out.push('.');
        for _ in 0..20 {
            frac *= f64::from(radix);
            out.push(digit(frac.trunc() as u32));
            frac = frac.fract();
            if frac == 0.0 {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::format_radix;

    #[test]
    fn radix_formatting() {
        assert_eq!(format_radix(255.0, 16), "ff");
        assert_eq!(format_radix(-8.0, 2), "-1000");
        assert_eq!(format_radix(0.0, 36), "0");
        assert_eq!(format_radix(0.5, 2), "0.1");
    }
}
