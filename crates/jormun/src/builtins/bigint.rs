//! The `BigInt` function and prototype.

use num_bigint::BigInt;

use super::arg;
use crate::{
    error::RunResult,
    machine::Interp,
    object::ObjectKind,
    types::number::parse_js_bigint,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BigIntFn {
    Ctor,
    ToStringMethod,
    ValueOf,
}

fn this_bigint(interp: &mut Interp, this: Value) -> RunResult<BigInt> {
    if let Some(b) = this.as_bigint(&interp.heap) {
        return Ok(b.clone());
    }
    if let Some(id) = this.object_id(&interp.heap)
        && let ObjectKind::Wrapper(inner) = interp.heap.obj(id).kind
        && let Some(b) = inner.as_bigint(&interp.heap)
    {
        return Ok(b.clone());
    }
    Err(interp.throw_type("BigInt.prototype method called on incompatible receiver"))
}

pub(crate) fn call(interp: &mut Interp, f: BigIntFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    match f {
        BigIntFn::Ctor => {
            if a0.as_bigint(&interp.heap).is_some() {
                return Ok(a0);
            }
            match a0 {
                Value::Number(n) => {
                    if !n.is_finite() || n.fract() != 0.0 {
                        return Err(interp.throw_type(format!(
                            "The number {} cannot be converted to a BigInt because it is not an integer",
                            crate::types::number::to_js_string(n)
                        )));
                    }
                    Value::bigint(&mut interp.heap, BigInt::from(n as i64))
                }
                Value::Bool(b) => Value::bigint(&mut interp.heap, BigInt::from(i32::from(b))),
                _ => {
                    if let Some(s) = a0.as_str(&interp.heap, &interp.interns) {
                        let s = s.to_owned();
                        return match parse_js_bigint(&s) {
                            Some(b) => Value::bigint(&mut interp.heap, b),
                            None => Err(crate::error::RunError::Simple(crate::error::SimpleException::new(
                                crate::error::ExcKind::SyntaxError,
                                format!("Cannot convert {s} to a BigInt"),
                            ))),
                        };
                    }
                    Err(interp.throw_type("Cannot convert value to a BigInt"))
                }
            }
        }
        BigIntFn::ToStringMethod => {
            let b = this_bigint(interp, this)?;
            Value::string(&mut interp.heap, b.to_string())
        }
        BigIntFn::ValueOf => {
            let b = this_bigint(interp, this)?;
            Value::bigint(&mut interp.heap, b)
        }
    }
}
