//! The `Math` namespace object.

use rand::Rng;

use super::arg;
use crate::{error::RunResult, machine::Interp, value::Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MathFn {
    Abs,
    Floor,
    Ceil,
    Round,
    Trunc,
    Sign,
    Sqrt,
    Cbrt,
    Pow,
    Exp,
    Log,
    Log2,
    Log10,
    Min,
    Max,
    Random,
    Hypot,
    Atan2,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
}

pub(crate) fn call(interp: &mut Interp, f: MathFn, _this: Value, args: &[Value]) -> RunResult<Value> {
    let x = || arg(args, 0);
    let unary = |interp: &mut Interp, g: fn(f64) -> f64| -> RunResult<Value> {
        let n = interp.to_number(arg(args, 0))?;
        Ok(Value::Number(g(n)))
    };
    match f {
        MathFn::Abs => unary(interp, f64::abs),
        MathFn::Floor => unary(interp, f64::floor),
        MathFn::Ceil => unary(interp, f64::ceil),
        MathFn::Round => {
            // JS rounds half toward +Infinity; Rust's round is half-away
            let n = interp.to_number(x())?;
            let r = if n.is_finite() { (n + 0.5).floor() } else { n };
            Ok(Value::Number(r))
        }
        MathFn::Trunc => unary(interp, f64::trunc),
        MathFn::Sign => unary(interp, |n| {
            if n.is_nan() || n == 0.0 { n } else if n > 0.0 { 1.0 } else { -1.0 }
        }),
        MathFn::Sqrt => unary(interp, f64::sqrt),
        MathFn::Cbrt => unary(interp, f64::cbrt),
        MathFn::Pow => {
            let a = interp.to_number(arg(args, 0))?;
            let b = interp.to_number(arg(args, 1))?;
            // Math.pow mirrors the ** operator's edge cases
            let r = if b.is_nan() || (b.is_infinite() && a.abs() == 1.0) { f64::NAN } else { a.powf(b) };
            Ok(Value::Number(r))
        }
        MathFn::Exp => unary(interp, f64::exp),
        MathFn::Log => unary(interp, f64::ln),
        MathFn::Log2 => unary(interp, f64::log2),
        MathFn::Log10 => unary(interp, f64::log10),
        MathFn::Min | MathFn::Max => {
            let want_min = matches!(f, MathFn::Min);
            let mut acc = if want_min { f64::INFINITY } else { f64::NEG_INFINITY };
            for a in args {
                let n = interp.to_number(*a)?;
                if n.is_nan() {
                    return Ok(Value::Number(f64::NAN));
                }
                acc = if want_min { acc.min(n) } else { acc.max(n) };
            }
            Ok(Value::Number(acc))
        }
        MathFn::Random => Ok(Value::Number(interp.rng.gen_range(0.0..1.0))),
        MathFn::Hypot => {
            let mut sum = 0.0;
            for a in args {
                let n = interp.to_number(*a)?;
                sum += n * n;
            }
            Ok(Value::Number(sum.sqrt()))
        }
        MathFn::Atan2 => {
            let a = interp.to_number(arg(args, 0))?;
            let b = interp.to_number(arg(args, 1))?;
            Ok(Value::Number(a.atan2(b)))
        }
        MathFn::Sin => unary(interp, f64::sin),
        MathFn::Cos => unary(interp, f64::cos),
        MathFn::Tan => unary(interp, f64::tan),
        MathFn::Asin => unary(interp, f64::asin),
        MathFn::Acos => unary(interp, f64::acos),
        MathFn::Atan => unary(interp, f64::atan),
        MathFn::Sinh => unary(interp, f64::sinh),
        MathFn::Cosh => unary(interp, f64::cosh),
        MathFn::Tanh => unary(interp, f64::tanh),
    }
}
