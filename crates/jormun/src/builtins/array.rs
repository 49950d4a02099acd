//! The `Array` constructor, statics, and `Array.prototype`.
//!
//! Methods are generic over array-likes where ECMAScript requires it: they
//! read `length` and index properties through the ordinary protocol, so
//! inherited accessors and holes behave.

use super::arg;
use crate::{
    error::{RunError, RunResult},
    intern::{StaticStrings, WellKnown},
    machine::Interp,
    object::{BuiltinIter, IterKind, Key, ObjectKind},
    types::number::{to_integer_or_infinity, to_length},
    value::{Value, same_value_zero, strict_eq},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArrayFn {
    Ctor,
    IsArray,
    Of,
    From,
    Push,
    Pop,
    Shift,
    Unshift,
    Slice,
    Splice,
    Concat,
    Join,
    Reverse,
    IndexOf,
    LastIndexOf,
    Includes,
    Find,
    FindIndex,
    FindLast,
    FindLastIndex,
    Filter,
    Map,
    ForEach,
    Reduce,
    ReduceRight,
    Some,
    Every,
    Sort,
    Flat,
    FlatMap,
    Fill,
    At,
    Keys,
    Values,
    Entries,
    ToString,
    ToReversed,
    ToSorted,
    ToSpliced,
    With,
}

fn len_of(interp: &mut Interp, this: Value) -> RunResult<u64> {
    let len = interp.get_prop(this, &Key::Str(StaticStrings::Length.id()))?;
    let len = interp.to_number(len)?;
    Ok(to_length(len))
}

fn get_i(interp: &mut Interp, this: Value, i: u64) -> RunResult<Value> {
    interp.get_prop(this, &Key::Index(i as u32))
}

fn set_i(interp: &mut Interp, this: Value, i: u64, v: Value) -> RunResult<()> {
    let id = interp.require_object(this)?;
    interp.set_prop(id, Key::Index(i as u32), v, this, true)
}

fn set_len(interp: &mut Interp, this: Value, len: u64) -> RunResult<()> {
    let id = interp.require_object(this)?;
    interp.set_prop(id, Key::Str(StaticStrings::Length.id()), Value::Number(len as f64), this, true)
}

fn delete_i(interp: &mut Interp, this: Value, i: u64) -> RunResult<()> {
    let id = interp.require_object(this)?;
    interp.delete_prop(id, &Key::Index(i as u32), false)?;
    Ok(())
}

/// Resolves a relative start/end argument against `len`.
fn clamp_range(idx: Value, len: u64, default: u64, interp: &mut Interp) -> RunResult<u64> {
    if matches!(idx, Value::Undefined) {
        return Ok(default);
    }
    let n = to_integer_or_infinity(interp.to_number(idx)?);
    Ok(if n < 0.0 {
        (len as f64 + n).max(0.0) as u64
    } else {
        (n as u64).min(len)
    })
}

/// Calls a per-element callback `(value, index, array)`.
fn invoke(interp: &mut Interp, cb: Value, this_arg: Value, v: Value, i: u64, this: Value) -> RunResult<Value> {
    interp.call_sync(cb, this_arg, &[v, Value::Number(i as f64), this])
}

fn require_callback(interp: &mut Interp, cb: Value) -> RunResult<()> {
    if !cb.is_callable(&interp.heap) {
        return Err(interp.throw_type("callback is not a function"));
    }
    Ok(())
}

pub(crate) fn construct(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    if args.len() == 1
        && let Value::Number(n) = args[0]
    {
        let len = n as u32;
        if f64::from(len) != n {
            return Err(RunError::range_err("Invalid array length"));
        }
        let array = interp.make_array(Vec::new())?;
        let id = array.object_id(&interp.heap).expect("array");
        if let ObjectKind::Array { length } = &mut interp.heap.obj_mut(id).kind {
            *length = len;
        }
        return Ok(array);
    }
    interp.make_array(args.to_vec())
}

pub(crate) fn call(interp: &mut Interp, f: ArrayFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    let a1 = arg(args, 1);
    match f {
        ArrayFn::Ctor => construct(interp, args),
        ArrayFn::IsArray => Ok(Value::Bool(
            a0.object_id(&interp.heap).is_some_and(|id| interp.heap.obj(id).is_array()),
        )),
        ArrayFn::Of => interp.make_array(args.to_vec()),
        ArrayFn::From => {
            let map_fn = a1;
            if !map_fn.is_nullish() {
                require_callback(interp, map_fn)?;
            }
            let items = interp.iter_collect_array_like(a0)?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                let v = if map_fn.is_nullish() {
                    item
                } else {
                    interp.call_sync(map_fn, Value::Undefined, &[item, Value::Number(i as f64)])?
                };
                out.push(v);
            }
            interp.make_array(out)
        }
        ArrayFn::Push => {
            let mut len = len_of(interp, this)?;
            for v in args {
                set_i(interp, this, len, *v)?;
                len += 1;
            }
            set_len(interp, this, len)?;
            Ok(Value::Number(len as f64))
        }
        ArrayFn::Pop => {
            let len = len_of(interp, this)?;
            if len == 0 {
                set_len(interp, this, 0)?;
                return Ok(Value::Undefined);
            }
            let v = get_i(interp, this, len - 1)?;
            delete_i(interp, this, len - 1)?;
            set_len(interp, this, len - 1)?;
            Ok(v)
        }
        ArrayFn::Shift => {
            let len = len_of(interp, this)?;
            if len == 0 {
                set_len(interp, this, 0)?;
                return Ok(Value::Undefined);
            }
            let first = get_i(interp, this, 0)?;
            for i in 1..len {
                let v = get_i(interp, this, i)?;
                set_i(interp, this, i - 1, v)?;
            }
            delete_i(interp, this, len - 1)?;
            set_len(interp, this, len - 1)?;
            Ok(first)
        }
        ArrayFn::Unshift => {
            let len = len_of(interp, this)?;
            let n = args.len() as u64;
            for i in (0..len).rev() {
                let v = get_i(interp, this, i)?;
                set_i(interp, this, i + n, v)?;
            }
            for (i, v) in args.iter().enumerate() {
                set_i(interp, this, i as u64, *v)?;
            }
            set_len(interp, this, len + n)?;
            Ok(Value::Number((len + n) as f64))
        }
        ArrayFn::Slice => {
            let len = len_of(interp, this)?;
            let start = clamp_range(a0, len, 0, interp)?;
            let end = clamp_range(a1, len, len, interp)?;
            let mut out = Vec::new();
            for i in start..end {
                out.push(get_i(interp, this, i)?);
            }
            interp.make_array(out)
        }
        ArrayFn::Splice => {
            let len = len_of(interp, this)?;
            let start = clamp_range(a0, len, 0, interp)?;
            let delete_count = if args.len() <= 1 {
                len - start
            } else {
                let n = to_integer_or_infinity(interp.to_number(a1)?).max(0.0) as u64;
                n.min(len - start)
            };
            let mut removed = Vec::with_capacity(delete_count as usize);
            for i in start..start + delete_count {
                removed.push(get_i(interp, this, i)?);
            }
            let inserted: Vec<Value> = args.iter().skip(2).copied().collect();
            let n_ins = inserted.len() as u64;
            // shift the tail
            if n_ins < delete_count {
                for i in start..len - delete_count {
                    let v = get_i(interp, this, i + delete_count)?;
                    set_i(interp, this, i + n_ins, v)?;
                }
                for i in (len - delete_count + n_ins..len).rev() {
                    delete_i(interp, this, i)?;
                }
            } else if n_ins > delete_count {
                for i in (start..len - delete_count).rev() {
                    let v = get_i(interp, this, i + delete_count)?;
                    set_i(interp, this, i + n_ins, v)?;
                }
            }
            for (k, v) in inserted.into_iter().enumerate() {
                set_i(interp, this, start + k as u64, v)?;
            }
            set_len(interp, this, len - delete_count + n_ins)?;
            interp.make_array(removed)
        }
        ArrayFn::Concat => {
            let mut out = Vec::new();
            let mut push_spreadable = |interp: &mut Interp, v: Value, out: &mut Vec<Value>| -> RunResult<()> {
                let spreadable = v.object_id(&interp.heap).is_some_and(|id| interp.heap.obj(id).is_array());
                if spreadable {
                    let len = len_of(interp, v)?;
                    for i in 0..len {
                        out.push(get_i(interp, v, i)?);
                    }
                } else {
                    out.push(v);
                }
                Ok(())
            };
            push_spreadable(interp, this, &mut out)?;
            for v in args {
                push_spreadable(interp, *v, &mut out)?;
            }
            interp.make_array(out)
        }
        ArrayFn::Join | ArrayFn::ToString => {
            let sep = if matches!(f, ArrayFn::ToString) || matches!(a0, Value::Undefined) {
                ",".to_owned()
            } else {
                interp.to_string_rust(a0)?
            };
            let len = len_of(interp, this)?;
            let mut out = String::new();
            for i in 0..len {
                if i > 0 {
                    out.push_str(&sep);
                }
                let v = get_i(interp, this, i)?;
                if !v.is_nullish() {
                    out.push_str(&interp.to_string_rust(v)?);
                }
            }
            Value::string(&mut interp.heap, out)
        }
        ArrayFn::Reverse => {
            let len = len_of(interp, this)?;
            for i in 0..len / 2 {
                let j = len - 1 - i;
                let a = get_i(interp, this, i)?;
                let b = get_i(interp, this, j)?;
                set_i(interp, this, i, b)?;
                set_i(interp, this, j, a)?;
            }
            Ok(this)
        }
        ArrayFn::IndexOf => {
            let len = len_of(interp, this)?;
            let from = clamp_range(a1, len, 0, interp)?;
            for i in from..len {
                let v = get_i(interp, this, i)?;
                if strict_eq(v, a0, &interp.heap, &interp.interns) {
                    return Ok(Value::Number(i as f64));
                }
            }
            Ok(Value::Number(-1.0))
        }
        ArrayFn::LastIndexOf => {
            let len = len_of(interp, this)?;
            for i in (0..len).rev() {
                let v = get_i(interp, this, i)?;
                if strict_eq(v, a0, &interp.heap, &interp.interns) {
                    return Ok(Value::Number(i as f64));
                }
            }
            Ok(Value::Number(-1.0))
        }
        ArrayFn::Includes => {
            let len = len_of(interp, this)?;
            for i in 0..len {
                let v = get_i(interp, this, i)?;
                if same_value_zero(v, a0, &interp.heap, &interp.interns) {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        ArrayFn::Find | ArrayFn::FindIndex | ArrayFn::FindLast | ArrayFn::FindLastIndex => {
            require_callback(interp, a0)?;
            let len = len_of(interp, this)?;
            let backwards = matches!(f, ArrayFn::FindLast | ArrayFn::FindLastIndex);
            let want_index = matches!(f, ArrayFn::FindIndex | ArrayFn::FindLastIndex);
            let indices: Vec<u64> = if backwards { (0..len).rev().collect() } else { (0..len).collect() };
            for i in indices {
                let v = get_i(interp, this, i)?;
                let test = invoke(interp, a0, a1, v, i, this)?;
                if test.to_boolean(&interp.heap, &interp.interns) {
                    return Ok(if want_index { Value::Number(i as f64) } else { v });
                }
            }
            Ok(if want_index { Value::Number(-1.0) } else { Value::Undefined })
        }
        ArrayFn::Filter => {
            require_callback(interp, a0)?;
            let len = len_of(interp, this)?;
            let mut out = Vec::new();
            for i in 0..len {
                let v = get_i(interp, this, i)?;
                let test = invoke(interp, a0, a1, v, i, this)?;
                if test.to_boolean(&interp.heap, &interp.interns) {
                    out.push(v);
                }
            }
            interp.make_array(out)
        }
        ArrayFn::Map => {
            require_callback(interp, a0)?;
            let len = len_of(interp, this)?;
            let mut out = Vec::with_capacity(len as usize);
            for i in 0..len {
                let v = get_i(interp, this, i)?;
                out.push(invoke(interp, a0, a1, v, i, this)?);
            }
            interp.make_array(out)
        }
        ArrayFn::ForEach => {
            require_callback(interp, a0)?;
            let len = len_of(interp, this)?;
            for i in 0..len {
                let v = get_i(interp, this, i)?;
                invoke(interp, a0, a1, v, i, this)?;
            }
            Ok(Value::Undefined)
        }
        ArrayFn::Reduce | ArrayFn::ReduceRight => {
            require_callback(interp, a0)?;
            let len = len_of(interp, this)?;
            let backwards = matches!(f, ArrayFn::ReduceRight);
            let mut indices: Vec<u64> = if backwards { (0..len).rev().collect() } else { (0..len).collect() };
            let mut acc = if args.len() > 1 {
                a1
            } else {
                if indices.is_empty() {
                    return Err(interp.throw_type("Reduce of empty array with no initial value"));
                }
                let first = indices.remove(0);
                get_i(interp, this, first)?
            };
            for i in indices {
                let v = get_i(interp, this, i)?;
                acc = interp.call_sync(a0, Value::Undefined, &[acc, v, Value::Number(i as f64), this])?;
            }
            Ok(acc)
        }
        ArrayFn::Some | ArrayFn::Every => {
            require_callback(interp, a0)?;
            let len = len_of(interp, this)?;
            let want = matches!(f, ArrayFn::Some);
            for i in 0..len {
                let v = get_i(interp, this, i)?;
                let test = invoke(interp, a0, a1, v, i, this)?;
                if test.to_boolean(&interp.heap, &interp.interns) == want {
                    return Ok(Value::Bool(want));
                }
            }
            Ok(Value::Bool(!want))
        }
        ArrayFn::Sort => {
            let len = len_of(interp, this)?;
            let mut items = Vec::with_capacity(len as usize);
            for i in 0..len {
                items.push(get_i(interp, this, i)?);
            }
            let sorted = sort_values(interp, items, a0)?;
            for (i, v) in sorted.iter().enumerate() {
                set_i(interp, this, i as u64, *v)?;
            }
            Ok(this)
        }
        ArrayFn::Flat => {
            let depth = if matches!(a0, Value::Undefined) {
                1.0
            } else {
                to_integer_or_infinity(interp.to_number(a0)?)
            };
            let mut out = Vec::new();
            flatten(interp, this, depth, &mut out)?;
            interp.make_array(out)
        }
        ArrayFn::FlatMap => {
            require_callback(interp, a0)?;
            let len = len_of(interp, this)?;
            let mut out = Vec::new();
            for i in 0..len {
                let v = get_i(interp, this, i)?;
                let mapped = invoke(interp, a0, a1, v, i, this)?;
                let is_arr = mapped.object_id(&interp.heap).is_some_and(|id| interp.heap.obj(id).is_array());
                if is_arr {
                    flatten(interp, mapped, 0.0, &mut out)?;
                } else {
                    out.push(mapped);
                }
            }
            interp.make_array(out)
        }
        ArrayFn::Fill => {
            let len = len_of(interp, this)?;
            let start = clamp_range(a1, len, 0, interp)?;
            let end = clamp_range(arg(args, 2), len, len, interp)?;
            for i in start..end {
                set_i(interp, this, i, a0)?;
            }
            Ok(this)
        }
        ArrayFn::At => {
            let len = len_of(interp, this)?;
            let idx = to_integer_or_infinity(interp.to_number(a0)?);
            match crate::types::number::relative_index(idx, len as usize) {
                Some(i) => get_i(interp, this, i as u64),
                None => Ok(Value::Undefined),
            }
        }
        ArrayFn::Keys | ArrayFn::Values | ArrayFn::Entries => {
            let obj = interp.to_object(this)?;
            let array = obj.object_id(&interp.heap).expect("to_object");
            let kind = match f {
                ArrayFn::Keys => IterKind::Keys,
                ArrayFn::Values => IterKind::Values,
                _ => IterKind::Entries,
            };
            interp.make_builtin_iter(BuiltinIter::Array { array, index: 0, kind })
        }
        ArrayFn::ToReversed => {
            let len = len_of(interp, this)?;
            let mut out = Vec::with_capacity(len as usize);
            for i in (0..len).rev() {
                out.push(get_i(interp, this, i)?);
            }
            interp.make_array(out)
        }
        ArrayFn::ToSorted => {
            let len = len_of(interp, this)?;
            let mut items = Vec::with_capacity(len as usize);
            for i in 0..len {
                items.push(get_i(interp, this, i)?);
            }
            let sorted = sort_values(interp, items, a0)?;
            interp.make_array(sorted)
        }
        ArrayFn::ToSpliced => {
            let len = len_of(interp, this)?;
            let start = clamp_range(a0, len, 0, interp)?;
            let delete_count = if args.len() <= 1 {
                len - start
            } else {
                let n = to_integer_or_infinity(interp.to_number(a1)?).max(0.0) as u64;
                n.min(len - start)
            };
            let mut out = Vec::new();
            for i in 0..start {
                out.push(get_i(interp, this, i)?);
            }
            out.extend(args.iter().skip(2).copied());
            for i in start + delete_count..len {
                out.push(get_i(interp, this, i)?);
            }
            interp.make_array(out)
        }
        ArrayFn::With => {
            let len = len_of(interp, this)?;
            let idx = to_integer_or_infinity(interp.to_number(a0)?);
            let Some(actual) = crate::types::number::relative_index(idx, len as usize) else {
                return Err(RunError::range_err("Invalid index"));
            };
            let mut out = Vec::with_capacity(len as usize);
            for i in 0..len {
                out.push(if i == actual as u64 { a1 } else { get_i(interp, this, i)? });
            }
            interp.make_array(out)
        }
    }
}

/// SortCompare with an optional user comparator; `undefined` sorts last,
/// the default order is string comparison. Insertion sort keeps comparator
/// errors propagating cleanly; sorts in the sandbox are small.
fn sort_values(interp: &mut Interp, items: Vec<Value>, comparator: Value) -> RunResult<Vec<Value>> {
    if !matches!(comparator, Value::Undefined) && !comparator.is_callable(&interp.heap) {
        return Err(interp.throw_type("The comparison function must be either a function or undefined"));
    }
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for v in items {
        let mut lo = 0;
        let mut hi = out.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let ord = sort_compare(interp, out[mid], v, comparator)?;
            if ord <= 0.0 { lo = mid + 1 } else { hi = mid }
        }
        out.insert(lo, v);
    }
    Ok(out)
}

fn sort_compare(interp: &mut Interp, a: Value, b: Value, comparator: Value) -> RunResult<f64> {
    let a_undef = matches!(a, Value::Undefined);
    let b_undef = matches!(b, Value::Undefined);
    if a_undef || b_undef {
        return Ok(f64::from(i8::from(a_undef) - i8::from(b_undef)));
    }
    if comparator.is_callable(&interp.heap) {
        let r = interp.call_sync(comparator, Value::Undefined, &[a, b])?;
        let n = interp.to_number(r)?;
        return Ok(if n.is_nan() { 0.0 } else { n });
    }
    let sa = interp.to_string_rust(a)?;
    let sb = interp.to_string_rust(b)?;
    // the default order is UTF-16 code-unit comparison, like the relational
    // operators
    let ua: Vec<u16> = sa.encode_utf16().collect();
    let ub: Vec<u16> = sb.encode_utf16().collect();
    Ok(match ua.cmp(&ub) {
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => 1.0,
    })
}

fn flatten(interp: &mut Interp, source: Value, depth: f64, out: &mut Vec<Value>) -> RunResult<()> {
    let len = len_of(interp, source)?;
    for i in 0..len {
        let v = get_i(interp, source, i)?;
        let is_arr = v.object_id(&interp.heap).is_some_and(|id| interp.heap.obj(id).is_array());
        if is_arr && depth >= 1.0 {
            flatten(interp, v, depth - 1.0, out)?;
        } else {
            out.push(v);
        }
    }
    Ok(())
}
