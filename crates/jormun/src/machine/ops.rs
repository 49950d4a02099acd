//! Abstract operations and operator semantics: conversions (`ToPrimitive`,
//! `ToNumber`, `ToString`, `ToPropertyKey`), the equality families, and the
//! binary/unary operator steps.

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Pow, Signed, ToPrimitive, Zero};

use super::{Flow, Interp, Machine};
use crate::{
    ast::{BinOp, UnaryOp},
    error::{RunError, RunResult},
    heap::HeapData,
    intern::{StaticStrings, WellKnown},
    object::{Key, ObjectKind},
    types::number::{parse_js_bigint, parse_js_number, to_int32, to_js_string, to_uint32},
    value::{Value, strict_eq},
};

/// Preferred type hint for `ToPrimitive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hint {
    Default,
    Number,
    String,
}

impl Interp {
    // === conversions ===

    /// ToPrimitive: `Symbol.toPrimitive`, then `valueOf`/`toString` in
    /// hint order.
    pub(crate) fn to_primitive(&mut self, v: Value, hint: Hint) -> RunResult<Value> {
        if v.object_id(&self.heap).is_none() {
            return Ok(v);
        }
        let exotic = self.get_prop(v, &Key::Sym(WellKnown::ToPrimitive.id()))?;
        if !exotic.is_nullish() {
            if !exotic.is_callable(&self.heap) {
                return Err(self.throw_type("Symbol.toPrimitive is not a function"));
            }
            let hint_str = match hint {
                Hint::Default => "default",
                Hint::Number => "number",
                Hint::String => "string",
            };
            let hint_val = Value::string(&mut self.heap, hint_str.to_owned())?;
            let result = self.call_sync(exotic, v, &[hint_val])?;
            if result.object_id(&self.heap).is_some() {
                return Err(self.throw_type("Cannot convert object to primitive value"));
            }
            return Ok(result);
        }
        let order: [StaticStrings; 2] = if hint == Hint::String {
            [StaticStrings::ToString, StaticStrings::ValueOf]
        } else {
            [StaticStrings::ValueOf, StaticStrings::ToString]
        };
        for name in order {
            let method = self.get_prop(v, &Key::Str(name.id()))?;
            if method.is_callable(&self.heap) {
                let result = self.call_sync(method, v, &[])?;
                if result.object_id(&self.heap).is_none() {
                    return Ok(result);
                }
            }
        }
        Err(self.throw_type("Cannot convert object to primitive value"))
    }

    pub(crate) fn to_number(&mut self, v: Value) -> RunResult<f64> {
        match v {
            Value::Undefined => Ok(f64::NAN),
            Value::Null => Ok(0.0),
            Value::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
            Value::Number(n) => Ok(n),
            Value::Symbol(_) => Err(self.throw_type("Cannot convert a Symbol value to a number")),
            _ => {
                if let Some(s) = v.as_str(&self.heap, &self.interns) {
                    return Ok(parse_js_number(s));
                }
                if v.as_bigint(&self.heap).is_some() {
                    return Err(self.throw_type("Cannot convert a BigInt value to a number"));
                }
                let prim = self.to_primitive(v, Hint::Number)?;
                self.to_number(prim)
            }
        }
    }

    /// ToNumeric: like ToNumber but BigInts pass through.
    pub(crate) fn to_numeric(&mut self, v: Value) -> RunResult<Value> {
        if v.as_bigint(&self.heap).is_some() {
            return Ok(v);
        }
        if v.object_id(&self.heap).is_some() {
            let prim = self.to_primitive(v, Hint::Number)?;
            return self.to_numeric(prim);
        }
        Ok(Value::Number(self.to_number(v)?))
    }

    /// ToString returning a Rust string.
    pub(crate) fn to_string_rust(&mut self, v: Value) -> RunResult<String> {
        match v {
            Value::Undefined => Ok("undefined".to_owned()),
            Value::Null => Ok("null".to_owned()),
            Value::Bool(b) => Ok(if b { "true" } else { "false" }.to_owned()),
            Value::Number(n) => Ok(to_js_string(n)),
            Value::Symbol(_) => Err(self.throw_type("Cannot convert a Symbol value to a string")),
            Value::InternString(id) => Ok(self.interns.str(id).to_owned()),
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Str(s) => Ok(s.clone()),
                HeapData::BigInt(b) => Ok(b.to_string()),
                _ => {
                    let prim = self.to_primitive(v, Hint::String)?;
                    self.to_string_rust(prim)
                }
            },
        }
    }

    /// ToString returning a string `Value`.
    pub(crate) fn to_string_value(&mut self, v: Value) -> RunResult<Value> {
        if v.is_string(&self.heap) {
            return Ok(v);
        }
        let s = self.to_string_rust(v)?;
        Value::string(&mut self.heap, s)
    }

    /// ToPropertyKey: symbols pass through, everything else stringifies
    /// (with the canonical-array-index fast path).
    pub(crate) fn to_property_key(&mut self, v: Value) -> RunResult<Key> {
        match v {
            Value::Symbol(id) => Ok(Key::Sym(id)),
            Value::Number(n) => {
                if let Some(key) = Key::from_number_index(n) {
                    return Ok(key);
                }
                let s = to_js_string(n);
                Ok(Key::from_str(&mut self.interns, &s))
            }
            _ => {
                let prim = self.to_primitive(v, Hint::String)?;
                if let Value::Symbol(id) = prim {
                    return Ok(Key::Sym(id));
                }
                let s = self.to_string_rust(prim)?;
                Ok(Key::from_str(&mut self.interns, &s))
            }
        }
    }

    /// ToObject: boxes primitives in their wrapper objects; `null`/
    /// `undefined` raise.
    pub(crate) fn to_object(&mut self, v: Value) -> RunResult<Value> {
        if v.is_nullish() {
            return Err(self.throw_type("Cannot convert undefined or null to object"));
        }
        if v.object_id(&self.heap).is_some() {
            return Ok(v);
        }
        let proto = self.realm.wrapper_proto(v, &self.heap);
        let obj = crate::object::JsObject::new(Some(proto), ObjectKind::Wrapper(v));
        Ok(Value::Ref(self.heap.alloc(HeapData::Object(obj))?))
    }

    // === operators ===

    pub(crate) fn step_bin_op(&mut self, m: &mut Machine, op: BinOp) -> RunResult<Flow> {
        let rhs = m.pop();
        let lhs = m.pop();
        let result = self.binary_op(op, lhs, rhs)?;
        m.push(result);
        Ok(Flow::More)
    }

    pub(crate) fn binary_op(&mut self, op: BinOp, lhs: Value, rhs: Value) -> RunResult<Value> {
        match op {
            BinOp::Add => self.op_add(lhs, rhs),
            BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem | BinOp::Exp => self.op_arith(op, lhs, rhs),
            BinOp::Shl | BinOp::Shr | BinOp::UShr | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                self.op_bitwise(op, lhs, rhs)
            }
            BinOp::Lt => self.op_relational(lhs, rhs, |o| o == std::cmp::Ordering::Less),
            BinOp::Gt => self.op_relational(lhs, rhs, |o| o == std::cmp::Ordering::Greater),
            BinOp::LtEq => self.op_relational(lhs, rhs, |o| o != std::cmp::Ordering::Greater),
            BinOp::GtEq => self.op_relational(lhs, rhs, |o| o != std::cmp::Ordering::Less),
            BinOp::Eq => Ok(Value::Bool(self.abstract_equals(lhs, rhs)?)),
            BinOp::NotEq => Ok(Value::Bool(!self.abstract_equals(lhs, rhs)?)),
            BinOp::StrictEq => Ok(Value::Bool(strict_eq(lhs, rhs, &self.heap, &self.interns))),
            BinOp::StrictNotEq => Ok(Value::Bool(!strict_eq(lhs, rhs, &self.heap, &self.interns))),
            BinOp::In => {
                let Some(obj) = rhs.object_id(&self.heap) else {
                    return Err(self.throw_type("Cannot use 'in' operator on a non-object"));
                };
                let key = self.to_property_key(lhs)?;
                Ok(Value::Bool(self.has_prop(obj, &key)?))
            }
            BinOp::InstanceOf => self.instance_of(lhs, rhs),
        }
    }

    fn op_add(&mut self, lhs: Value, rhs: Value) -> RunResult<Value> {
        let lp = self.to_primitive(lhs, Hint::Default)?;
        let rp = self.to_primitive(rhs, Hint::Default)?;
        if lp.is_string(&self.heap) || rp.is_string(&self.heap) {
            let mut out = self.to_string_rust(lp)?;
            out.push_str(&self.to_string_rust(rp)?);
            return Value::string(&mut self.heap, out);
        }
        match (lp.as_bigint(&self.heap), rp.as_bigint(&self.heap)) {
            (Some(a), Some(b)) => {
                let sum = a + b;
                Value::bigint(&mut self.heap, sum)
            }
            (Some(_), None) | (None, Some(_)) => Err(self.throw_type("Cannot mix BigInt and other types, use explicit conversions")),
            (None, None) => {
                let a = self.to_number(lp)?;
                let b = self.to_number(rp)?;
                Ok(Value::Number(a + b))
            }
        }
    }

    fn op_arith(&mut self, op: BinOp, lhs: Value, rhs: Value) -> RunResult<Value> {
        let ln = self.to_numeric(lhs)?;
        let rn = self.to_numeric(rhs)?;
        match (ln.as_bigint(&self.heap), rn.as_bigint(&self.heap)) {
            (Some(a), Some(b)) => {
                let result = match op {
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => {
                        if b.is_zero() {
                            return Err(RunError::range_err("Division by zero"));
                        }
                        a / b
                    }
                    BinOp::Rem => {
                        if b.is_zero() {
                            return Err(RunError::range_err("Division by zero"));
                        }
                        a % b
                    }
                    BinOp::Exp => {
                        if b.is_negative() {
                            return Err(RunError::range_err("Exponent must be non-negative"));
                        }
                        let exp = b.to_u32().ok_or_else(|| RunError::range_err("BigInt exponent too large"))?;
                        Pow::pow(a, exp)
                    }
                    _ => unreachable!("arith op"),
                };
                Value::bigint(&mut self.heap, result)
            }
            (None, None) => {
                let a = self.to_number(ln)?;
                let b = self.to_number(rn)?;
                let result = match op {
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Rem => a % b,
                    BinOp::Exp => js_pow(a, b),
                    _ => unreachable!("arith op"),
                };
                Ok(Value::Number(result))
            }
            _ => Err(self.throw_type("Cannot mix BigInt and other types, use explicit conversions")),
        }
    }

    fn op_bitwise(&mut self, op: BinOp, lhs: Value, rhs: Value) -> RunResult<Value> {
        let ln = self.to_numeric(lhs)?;
        let rn = self.to_numeric(rhs)?;
        match (ln.as_bigint(&self.heap), rn.as_bigint(&self.heap)) {
            (Some(a), Some(b)) => {
                let result = match op {
                    BinOp::BitAnd => a & b,
                    BinOp::BitOr => a | b,
                    BinOp::BitXor => a ^ b,
                    BinOp::Shl => {
                        let shift = b.to_i64().ok_or_else(|| RunError::range_err("BigInt shift too large"))?;
                        if shift >= 0 { a << shift } else { a >> (-shift) }
                    }
                    BinOp::Shr => {
                        let shift = b.to_i64().ok_or_else(|| RunError::range_err("BigInt shift too large"))?;
                        if shift >= 0 { a >> shift } else { a << (-shift) }
                    }
                    BinOp::UShr => {
                        return Err(self.throw_type("BigInts have no unsigned right shift, use >> instead"));
                    }
                    _ => unreachable!("bitwise op"),
                };
                Value::bigint(&mut self.heap, result)
            }
            (None, None) => {
                let a = self.to_number(ln)?;
                let b = self.to_number(rn)?;
                let result = match op {
                    BinOp::BitAnd => f64::from(to_int32(a) & to_int32(b)),
                    BinOp::BitOr => f64::from(to_int32(a) | to_int32(b)),
                    BinOp::BitXor => f64::from(to_int32(a) ^ to_int32(b)),
                    BinOp::Shl => f64::from(to_int32(a) << (to_uint32(b) & 31)),
                    BinOp::Shr => f64::from(to_int32(a) >> (to_uint32(b) & 31)),
                    BinOp::UShr => f64::from(to_uint32(a) >> (to_uint32(b) & 31)),
                    _ => unreachable!("bitwise op"),
                };
                Ok(Value::Number(result))
            }
            _ => Err(self.throw_type("Cannot mix BigInt and other types, use explicit conversions")),
        }
    }

    /// Abstract relational comparison; NaN operands compare as none-of-the-
    /// orderings (every comparison false).
    fn op_relational(&mut self, lhs: Value, rhs: Value, test: fn(std::cmp::Ordering) -> bool) -> RunResult<Value> {
        let lp = self.to_primitive(lhs, Hint::Number)?;
        let rp = self.to_primitive(rhs, Hint::Number)?;
        if let (Some(a), Some(b)) = (lp.as_str(&self.heap, &self.interns), rp.as_str(&self.heap, &self.interns)) {
            // code-unit comparison: compare UTF-16 sequences
            let a: Vec<u16> = a.encode_utf16().collect();
            let b: Vec<u16> = b.encode_utf16().collect();
            return Ok(Value::Bool(test(a.cmp(&b))));
        }
        let ord = match (lp.as_bigint(&self.heap), rp.as_bigint(&self.heap)) {
            (Some(a), Some(b)) => Some(a.cmp(b)),
            (Some(a), None) => {
                // BigInt vs Number/string: compare mathematical values
                if let Some(s) = rp.as_str(&self.heap, &self.interns) {
                    parse_js_bigint(s).map(|b| a.cmp(&b))
                } else {
                    let a = a.clone();
                    let b = self.to_number(rp)?;
                    bigint_f64_cmp(&a, b)
                }
            }
            (None, Some(b)) => {
                if let Some(s) = lp.as_str(&self.heap, &self.interns) {
                    parse_js_bigint(s).map(|a| a.cmp(b))
                } else {
                    let b = b.clone();
                    let a = self.to_number(lp)?;
                    bigint_f64_cmp(&b, a).map(std::cmp::Ordering::reverse)
                }
            }
            (None, None) => {
                let a = self.to_number(lp)?;
                let b = self.to_number(rp)?;
                a.partial_cmp(&b)
            }
        };
        Ok(Value::Bool(ord.is_some_and(test)))
    }

    /// The `==` operator.
    pub(crate) fn abstract_equals(&mut self, lhs: Value, rhs: Value) -> RunResult<bool> {
        // identical types: strict comparison
        let cmp = |a: Value, b: Value, interp: &Self| strict_eq(a, b, &interp.heap, &interp.interns);
        match (lhs, rhs) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => Ok(true),
            (Value::Number(_), Value::Number(_))
            | (Value::Bool(_), Value::Bool(_))
            | (Value::Symbol(_), Value::Symbol(_))
            | (Value::Undefined | Value::Null, _)
            | (_, Value::Undefined | Value::Null) => {
                if matches!(lhs, Value::Undefined | Value::Null) || matches!(rhs, Value::Undefined | Value::Null) {
                    return Ok(false);
                }
                Ok(cmp(lhs, rhs, self))
            }
            _ => {
                let l_str = lhs.is_string(&self.heap);
                let r_str = rhs.is_string(&self.heap);
                if l_str && r_str {
                    return Ok(cmp(lhs, rhs, self));
                }
                let l_big = lhs.as_bigint(&self.heap).is_some();
                let r_big = rhs.as_bigint(&self.heap).is_some();
                if l_big && r_big {
                    return Ok(cmp(lhs, rhs, self));
                }
                let l_obj = lhs.object_id(&self.heap).is_some();
                let r_obj = rhs.object_id(&self.heap).is_some();
                if l_obj && r_obj {
                    return Ok(cmp(lhs, rhs, self));
                }
                // boolean operands convert to numbers
                if let Value::Bool(b) = lhs {
                    return self.abstract_equals(Value::Number(if b { 1.0 } else { 0.0 }), rhs);
                }
                if let Value::Bool(b) = rhs {
                    return self.abstract_equals(lhs, Value::Number(if b { 1.0 } else { 0.0 }));
                }
                // object vs primitive: ToPrimitive the object
                if l_obj {
                    let lp = self.to_primitive(lhs, Hint::Default)?;
                    return self.abstract_equals(lp, rhs);
                }
                if r_obj {
                    let rp = self.to_primitive(rhs, Hint::Default)?;
                    return self.abstract_equals(lhs, rp);
                }
                // number vs string
                if matches!(lhs, Value::Number(_)) && r_str {
                    let n = self.to_number(rhs)?;
                    return Ok(strict_eq(lhs, Value::Number(n), &self.heap, &self.interns));
                }
                if matches!(rhs, Value::Number(_)) && l_str {
                    let n = self.to_number(lhs)?;
                    return Ok(strict_eq(Value::Number(n), rhs, &self.heap, &self.interns));
                }
                // bigint vs string
                if l_big && r_str {
                    let s = rhs.as_str(&self.heap, &self.interns).expect("string checked").to_owned();
                    return Ok(match parse_js_bigint(&s) {
                        Some(b) => lhs.as_bigint(&self.heap) == Some(&b),
                        None => false,
                    });
                }
                if r_big && l_str {
                    return self.abstract_equals(rhs, lhs);
                }
                // bigint vs number: mathematical value
                if l_big && matches!(rhs, Value::Number(_)) {
                    let Value::Number(n) = rhs else { unreachable!() };
                    let a = lhs.as_bigint(&self.heap).expect("bigint checked");
                    return Ok(bigint_f64_cmp(a, n) == Some(std::cmp::Ordering::Equal));
                }
                if r_big && matches!(lhs, Value::Number(_)) {
                    return self.abstract_equals(rhs, lhs);
                }
                Ok(false)
            }
        }
    }

    pub(crate) fn step_un_op(&mut self, m: &mut Machine, op: UnaryOp) -> RunResult<Flow> {
        let v = m.pop();
        let result = match op {
            UnaryOp::Neg => {
                let n = self.to_numeric(v)?;
                if let Some(b) = n.as_bigint(&self.heap) {
                    let neg = -b;
                    Value::bigint(&mut self.heap, neg)?
                } else {
                    let Value::Number(x) = n else { unreachable!("to_numeric") };
                    Value::Number(-x)
                }
            }
            UnaryOp::Plus => Value::Number(self.to_number(v)?),
            UnaryOp::Not => Value::Bool(!v.to_boolean(&self.heap, &self.interns)),
            UnaryOp::BitNot => {
                let n = self.to_numeric(v)?;
                if let Some(b) = n.as_bigint(&self.heap) {
                    let inverted = -(b + 1i32);
                    Value::bigint(&mut self.heap, inverted)?
                } else {
                    let Value::Number(x) = n else { unreachable!("to_numeric") };
                    Value::Number(f64::from(!to_int32(x)))
                }
            }
            UnaryOp::Typeof => {
                let s = v.type_of(&self.heap);
                Value::string(&mut self.heap, s.to_owned())?
            }
            UnaryOp::Void => Value::Undefined,
            // non-reference delete targets always succeed
            UnaryOp::Delete => Value::Bool(true),
        };
        m.push(result);
        Ok(Flow::More)
    }

    /// Numeric increment/decrement: returns `(old as numeric, new)`.
    pub(crate) fn update_numeric(&mut self, old: Value, inc: bool) -> RunResult<(Value, Value)> {
        let old_num = self.to_numeric(old)?;
        if let Some(b) = old_num.as_bigint(&self.heap) {
            let new = if inc { b + 1 } else { b - 1 };
            let new = Value::bigint(&mut self.heap, new)?;
            Ok((old_num, new))
        } else {
            let Value::Number(n) = old_num else { unreachable!("to_numeric") };
            let new = Value::Number(if inc { n + 1.0 } else { n - 1.0 });
            Ok((old_num, new))
        }
    }
}

/// `**` with ECMAScript edge cases the IEEE `pow` diverges on.
fn js_pow(base: f64, exp: f64) -> f64 {
    if exp.is_nan() {
        return f64::NAN;
    }
    if exp.is_infinite() && base.abs() == 1.0 {
        return f64::NAN;
    }
    base.powf(exp)
}

/// Compares a BigInt against an f64 by exact mathematical value.
///
/// Rounding the BigInt through `to_f64` would collapse neighbors above 2^53,
/// so the comparison goes the other way: the float's integral part converts
/// exactly into a `BigInt`, and a fractional float is bracketed by its floor.
fn bigint_f64_cmp(a: &BigInt, b: f64) -> Option<std::cmp::Ordering> {
    use std::cmp::Ordering;
    if b.is_nan() {
        return None;
    }
    if b == f64::INFINITY {
        return Some(Ordering::Less);
    }
    if b == f64::NEG_INFINITY {
        return Some(Ordering::Greater);
    }
    let floor = BigInt::from_f64(b.floor()).expect("finite float floor is integral");
    if b.fract() == 0.0 {
        return Some(a.cmp(&floor));
    }
    // floor < b < floor + 1, and a is an integer
    match a.cmp(&floor) {
        Ordering::Greater => Some(Ordering::Greater),
        _ => Some(Ordering::Less),
    }
}
