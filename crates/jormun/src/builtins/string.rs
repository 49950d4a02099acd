//! The `String` constructor, statics, and `String.prototype`, including the
//! regex-coupled methods (`match`, `matchAll`, `replace`, `replaceAll`,
//! `search`, `split`).

use super::arg;
use crate::{
    error::RunResult,
    heap::{HeapData, HeapId},
    intern::StaticStrings,
    machine::Interp,
    object::{BuiltinIter, JsObject, Key, ObjectKind},
    types::{
        number::{relative_index, to_integer_or_infinity},
        str::{char_at, char_code_at, code_point_at, utf16_len, utf16_slice},
    },
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StringFn {
    Ctor,
    FromCharCode,
    FromCodePoint,
    Raw,
    At,
    CharAt,
    CharCodeAt,
    CodePointAt,
    Concat,
    EndsWith,
    StartsWith,
    Includes,
    IndexOf,
    LastIndexOf,
    Slice,
    Substring,
    ToUpperCase,
    ToLowerCase,
    Trim,
    TrimStart,
    TrimEnd,
    PadStart,
    PadEnd,
    Repeat,
    Split,
    Replace,
    ReplaceAll,
    Match,
    MatchAll,
    Search,
    LocaleCompare,
    ValueOf,
    ToStringMethod,
    Iterator,
}

/// The receiver string for a prototype method (primitives and wrappers).
fn this_str(interp: &mut Interp, this: Value) -> RunResult<String> {
    if this.is_nullish() {
        return Err(interp.throw_type("String.prototype method called on null or undefined"));
    }
    if let Some(id) = this.object_id(&interp.heap)
        && let ObjectKind::Wrapper(v) = &interp.heap.obj(id).kind
        && v.is_string(&interp.heap)
    {
        let v = *v;
        return interp.to_string_rust(v);
    }
    interp.to_string_rust(this)
}

pub(crate) fn construct(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    let s = if args.is_empty() {
        Value::InternString(StaticStrings::Empty.id())
    } else {
        interp.to_string_value(arg(args, 0))?
    };
    let obj = JsObject::new(Some(interp.realm.string_proto), ObjectKind::Wrapper(s));
    Ok(Value::Ref(interp.heap.alloc(HeapData::Object(obj))?))
}

pub(crate) fn call(interp: &mut Interp, f: StringFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    let a1 = arg(args, 1);
    match f {
        StringFn::Ctor => {
            if args.is_empty() {
                return Ok(Value::InternString(StaticStrings::Empty.id()));
            }
            // String(sym) is the one place symbols stringify
            if let Value::Symbol(sym) = a0 {
                let desc = interp.interns.symbol(sym).description.clone().unwrap_or_default();
                return Value::string(&mut interp.heap, format!("Symbol({desc})"));
            }
            interp.to_string_value(a0)
        }
        StringFn::FromCharCode => {
            let mut units = Vec::with_capacity(args.len());
            for a in args {
                let n = interp.to_number(*a)?;
                units.push(crate::types::number::to_uint32(n) as u16);
            }
            let s = String::from_utf16_lossy(&units);
            Value::string(&mut interp.heap, s)
        }
        StringFn::FromCodePoint => {
            let mut out = String::new();
            for a in args {
                let n = interp.to_number(*a)?;
                let cp = n as u32;
                if f64::from(cp) != n || cp > 0x10_FFFF {
                    return Err(crate::error::RunError::range_err(format!("Invalid code point {n}")));
                }
                out.push(char::from_u32(cp).unwrap_or('\u{FFFD}'));
            }
            Value::string(&mut interp.heap, out)
        }
        StringFn::Raw => {
            let raw = interp.get_prop(a0, &Key::Str(StaticStrings::Raw.id()))?;
            let len_val = interp.get_prop(raw, &Key::Str(StaticStrings::Length.id()))?;
            let len = crate::types::number::to_length(interp.to_number(len_val)?);
            let mut out = String::new();
            for i in 0..len {
                let seg = interp.get_prop(raw, &Key::Index(i as u32))?;
                out.push_str(&interp.to_string_rust(seg)?);
                if i + 1 < len
                    && let Some(sub) = args.get(i as usize + 1)
                {
                    out.push_str(&interp.to_string_rust(*sub)?);
                }
            }
            Value::string(&mut interp.heap, out)
        }
        StringFn::At => {
            let s = this_str(interp, this)?;
            let idx = to_integer_or_infinity(interp.to_number(a0)?);
            match relative_index(idx, utf16_len(&s)) {
                Some(i) => match char_at(&s, i) {
                    Some(c) => Value::string(&mut interp.heap, c.to_string()),
                    None => Ok(Value::Undefined),
                },
                None => Ok(Value::Undefined),
            }
        }
        StringFn::CharAt => {
            let s = this_str(interp, this)?;
            let idx = to_integer_or_infinity(interp.to_number(a0)?);
            if idx < 0.0 {
                return Ok(Value::InternString(StaticStrings::Empty.id()));
            }
            match char_at(&s, idx as usize) {
                Some(c) => Value::string(&mut interp.heap, c.to_string()),
                None => Ok(Value::InternString(StaticStrings::Empty.id())),
            }
        }
        StringFn::CharCodeAt => {
            let s = this_str(interp, this)?;
            let idx = to_integer_or_infinity(interp.to_number(a0)?);
            if idx < 0.0 {
                return Ok(Value::Number(f64::NAN));
            }
            Ok(match char_code_at(&s, idx as usize) {
                Some(u) => Value::Number(f64::from(u)),
                None => Value::Number(f64::NAN),
            })
        }
        StringFn::CodePointAt => {
            let s = this_str(interp, this)?;
            let idx = to_integer_or_infinity(interp.to_number(a0)?);
            if idx < 0.0 {
                return Ok(Value::Undefined);
            }
            Ok(match code_point_at(&s, idx as usize) {
                Some(cp) => Value::Number(f64::from(cp)),
                None => Value::Undefined,
            })
        }
        StringFn::Concat => {
            let mut s = this_str(interp, this)?;
            for a in args {
                s.push_str(&interp.to_string_rust(*a)?);
            }
            Value::string(&mut interp.heap, s)
        }
        StringFn::EndsWith => {
            let s = this_str(interp, this)?;
            let search = interp.to_string_rust(a0)?;
            let end = if matches!(a1, Value::Undefined) {
                utf16_len(&s)
            } else {
                to_integer_or_infinity(interp.to_number(a1)?).max(0.0) as usize
            };
            let hay = utf16_slice(&s, 0, end);
            Ok(Value::Bool(hay.ends_with(&search)))
        }
        StringFn::StartsWith => {
            let s = this_str(interp, this)?;
            let search = interp.to_string_rust(a0)?;
            let start = to_integer_or_infinity(interp.to_number(a1)?).max(0.0) as usize;
            let hay = utf16_slice(&s, start, usize::MAX);
            Ok(Value::Bool(hay.starts_with(&search)))
        }
        StringFn::Includes => {
            let s = this_str(interp, this)?;
            let search = interp.to_string_rust(a0)?;
            Ok(Value::Bool(s.contains(&search)))
        }
        StringFn::IndexOf => {
            let s = this_str(interp, this)?;
            let search = interp.to_string_rust(a0)?;
            let from = to_integer_or_infinity(interp.to_number(a1)?).max(0.0) as usize;
            let hay = utf16_slice(&s, from, usize::MAX);
            Ok(match hay.find(&search) {
                Some(byte) => {
                    Value::Number((from + crate::types::str::byte_to_utf16(hay, byte)) as f64)
                }
                None => Value::Number(-1.0),
            })
        }
        StringFn::LastIndexOf => {
            let s = this_str(interp, this)?;
            let search = interp.to_string_rust(a0)?;
            Ok(match s.rfind(&search) {
                Some(byte) => Value::Number(crate::types::str::byte_to_utf16(&s, byte) as f64),
                None => Value::Number(-1.0),
            })
        }
        StringFn::Slice => {
            let s = this_str(interp, this)?;
            let len = utf16_len(&s);
            let start = relative_clamp(interp, a0, len, 0)?;
            let end = relative_clamp(interp, a1, len, len)?;
            let out = utf16_slice(&s, start, end).to_owned();
            Value::string(&mut interp.heap, out)
        }
        StringFn::Substring => {
            let s = this_str(interp, this)?;
            let len = utf16_len(&s);
            let mut start = absolute_clamp(interp, a0, len, 0)?;
            let mut end = absolute_clamp(interp, a1, len, len)?;
            if start > end {
                std::mem::swap(&mut start, &mut end);
            }
            let out = utf16_slice(&s, start, end).to_owned();
            Value::string(&mut interp.heap, out)
        }
        StringFn::ToUpperCase => {
            let s = this_str(interp, this)?;
            let out = s.to_uppercase();
            Value::string(&mut interp.heap, out)
        }
        StringFn::ToLowerCase => {
            let s = this_str(interp, this)?;
            let out = s.to_lowercase();
            Value::string(&mut interp.heap, out)
        }
        StringFn::Trim => {
            let s = this_str(interp, this)?;
            let out = s.trim().to_owned();
            Value::string(&mut interp.heap, out)
        }
        StringFn::TrimStart => {
            let s = this_str(interp, this)?;
            let out = s.trim_start().to_owned();
            Value::string(&mut interp.heap, out)
        }
        StringFn::TrimEnd => {
            let s = this_str(interp, this)?;
            let out = s.trim_end().to_owned();
            Value::string(&mut interp.heap, out)
        }
        StringFn::PadStart | StringFn::PadEnd => {
            let s = this_str(interp, this)?;
            let target = to_integer_or_infinity(interp.to_number(a0)?).max(0.0) as usize;
            let filler = if matches!(a1, Value::Undefined) { " ".to_owned() } else { interp.to_string_rust(a1)? };
            let len = utf16_len(&s);
            if target <= len || filler.is_empty() {
                return Value::string(&mut interp.heap, s);
            }
            let mut pad = String::new();
            while utf16_len(&pad) < target - len {
                pad.push_str(&filler);
            }
            let pad = utf16_slice(&pad, 0, target - len).to_owned();
            let out = if matches!(f, StringFn::PadStart) { format!("{pad}{s}") } else { format!("{s}{pad}") };
            Value::string(&mut interp.heap, out)
        }
        StringFn::Repeat => {
            let s = this_str(interp, this)?;
            let n = to_integer_or_infinity(interp.to_number(a0)?);
            if n < 0.0 || n.is_infinite() {
                return Err(crate::error::RunError::range_err("Invalid count value"));
            }
            let out = s.repeat(n as usize);
            Value::string(&mut interp.heap, out)
        }
        StringFn::LocaleCompare => {
            let s = this_str(interp, this)?;
            let other = interp.to_string_rust(a0)?;
            Ok(Value::Number(match s.cmp(&other) {
                std::cmp::Ordering::Less => -1.0,
                std::cmp::Ordering::Equal => 0.0,
                std::cmp::Ordering::Greater => 1.0,
            }))
        }
        StringFn::ValueOf | StringFn::ToStringMethod => {
            let s = this_str(interp, this)?;
            Value::string(&mut interp.heap, s)
        }
        StringFn::Iterator => {
            let s = this_str(interp, this)?;
            let string = Value::string(&mut interp.heap, s)?;
            interp.make_builtin_iter(BuiltinIter::Str { string, index: 0 })
        }
        StringFn::Split => {
            let s = this_str(interp, this)?;
            let limit = if matches!(a1, Value::Undefined) {
                usize::MAX
            } else {
                crate::types::number::to_uint32(interp.to_number(a1)?) as usize
            };
            if let Some(regex) = regex_of(interp, a0) {
                return split_regex(interp, &s, regex, limit);
            }
            if matches!(a0, Value::Undefined) {
                let whole = Value::string(&mut interp.heap, s)?;
                return interp.make_array(vec![whole]);
            }
            let sep = interp.to_string_rust(a0)?;
            let mut out = Vec::new();
            if sep.is_empty() {
                for c in s.chars() {
                    if out.len() >= limit {
                        break;
                    }
                    out.push(Value::string(&mut interp.heap, c.to_string())?);
                }
            } else {
                for part in s.split(&sep) {
                    if out.len() >= limit {
                        break;
                    }
                    out.push(Value::string(&mut interp.heap, part.to_owned())?);
                }
            }
            interp.make_array(out)
        }
        StringFn::Replace | StringFn::ReplaceAll => {
            let s = this_str(interp, this)?;
            let all = matches!(f, StringFn::ReplaceAll);
            if let Some(regex) = regex_of(interp, a0) {
                let global = match &interp.heap.obj(regex).kind {
                    ObjectKind::Regex(data) => data.flags.global,
                    _ => false,
                };
                if all && !global {
                    return Err(interp.throw_type("replaceAll must be called with a global RegExp"));
                }
                return interp.regexp_replace(regex, &s, a1, global);
            }
            let search = interp.to_string_rust(a0)?;
            replace_plain(interp, &s, &search, a1, all)
        }
        StringFn::Match => {
            let s = this_str(interp, this)?;
            let regex = coerce_regex(interp, a0, "")?;
            let global = match &interp.heap.obj(regex).kind {
                ObjectKind::Regex(data) => data.flags.global,
                _ => false,
            };
            let subject = Value::string(&mut interp.heap, s)?;
            if !global {
                return interp.regexp_exec(regex, subject);
            }
            interp.reset_last_index(regex)?;
            let mut out = Vec::new();
            loop {
                match interp.regexp_exec(regex, subject)? {
                    Value::Null => break,
                    m => {
                        let full = interp.get_prop(m, &Key::Index(0))?;
                        out.push(full);
                    }
                }
            }
            if out.is_empty() {
                return Ok(Value::Null);
            }
            interp.make_array(out)
        }
        StringFn::MatchAll => {
            let s = this_str(interp, this)?;
            let regex = coerce_regex(interp, a0, "g")?;
            let global = match &interp.heap.obj(regex).kind {
                ObjectKind::Regex(data) => data.flags.global,
                _ => false,
            };
            if !global {
                return Err(interp.throw_type("String.prototype.matchAll called with a non-global RegExp argument"));
            }
            let string = Value::string(&mut interp.heap, s)?;
            interp.make_builtin_iter(BuiltinIter::RegExpString { regex, string, done: false })
        }
        StringFn::Search => {
            let s = this_str(interp, this)?;
            let regex = coerce_regex(interp, a0, "")?;
            let subject = Value::string(&mut interp.heap, s)?;
            // search ignores and restores lastIndex
            interp.reset_last_index(regex)?;
            match interp.regexp_exec_no_advance(regex, subject)? {
                Some(result) => {
                    let index = interp.get_prop(result, &Key::Str(StaticStrings::Index.id()))?;
                    Ok(index)
                }
                None => Ok(Value::Number(-1.0)),
            }
        }
    }
}

/// The regex heap id when the value is a RegExp object.
pub(crate) fn regex_of(interp: &Interp, v: Value) -> Option<HeapId> {
    let id = v.object_id(&interp.heap)?;
    match interp.heap.obj(id).kind {
        ObjectKind::Regex(_) => Some(id),
        _ => None,
    }
}

/// Coerces a `match`/`matchAll`/`search` argument into a RegExp.
fn coerce_regex(interp: &mut Interp, v: Value, extra_flags: &str) -> RunResult<HeapId> {
    if let Some(id) = regex_of(interp, v) {
        return Ok(id);
    }
    let source = if matches!(v, Value::Undefined) { String::new() } else { interp.to_string_rust(v)? };
    let regex = interp.make_regex(&source, extra_flags)?;
    Ok(regex.object_id(&interp.heap).expect("regex object"))
}

fn relative_clamp(interp: &mut Interp, v: Value, len: usize, default: usize) -> RunResult<usize> {
    if matches!(v, Value::Undefined) {
        return Ok(default);
    }
    let n = to_integer_or_infinity(interp.to_number(v)?);
    Ok(if n < 0.0 { ((len as f64) + n).max(0.0) as usize } else { (n as usize).min(len) })
}

fn absolute_clamp(interp: &mut Interp, v: Value, len: usize, default: usize) -> RunResult<usize> {
    if matches!(v, Value::Undefined) {
        return Ok(default);
    }
    let n = to_integer_or_infinity(interp.to_number(v)?);
    Ok(n.clamp(0.0, len as f64) as usize)
}

/// Non-regex `replace`/`replaceAll`.
fn replace_plain(interp: &mut Interp, s: &str, search: &str, replacement: Value, all: bool) -> RunResult<Value> {
    let func = replacement.is_callable(&interp.heap);
    let mut out = String::new();
    let mut rest = s;
    let mut offset = 0usize;
    loop {
        let Some(pos) = rest.find(search) else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..pos]);
        let abs_units = crate::types::str::byte_to_utf16(s, offset + pos);
        if func {
            let m = Value::string(&mut interp.heap, search.to_owned())?;
            let subject = Value::string(&mut interp.heap, s.to_owned())?;
            let r = interp.call_sync(replacement, Value::Undefined, &[m, Value::Number(abs_units as f64), subject])?;
            out.push_str(&interp.to_string_rust(r)?);
        } else {
            let template = interp.to_string_rust(replacement)?;
            out.push_str(&crate::builtins::regexp::expand_plain_replacement(&template, search, s, offset + pos));
        }
        let advance = pos + search.len().max(1);
        if search.is_empty() {
            // empty search matches once at the start
            out.push_str(rest);
            break;
        }
        offset += pos + search.len();
        rest = &rest[advance.min(rest.len())..];
        if !all {
            out.push_str(rest);
            break;
        }
    }
    Value::string(&mut interp.heap, out)
}

fn split_regex(interp: &mut Interp, s: &str, regex: HeapId, limit: usize) -> RunResult<Value> {
    let mut out = Vec::new();
    let mut last = 0usize;
    let mut pos = 0usize;
    while pos <= s.len() {
        let m = {
            let ObjectKind::Regex(data) = &mut interp.heap.obj_mut(regex).kind else {
                unreachable!("regex checked");
            };
            data.find_at(s, pos)?
        };
        let Some(m) = m else { break };
        if m.end == m.start {
            // zero-width match: advance one char
            pos = next_char_boundary(s, m.end);
            continue;
        }
        if out.len() >= limit {
            break;
        }
        out.push(Value::string(&mut interp.heap, s[last..m.start].to_owned())?);
        // captured groups interleave into the result
        for group in &m.groups {
            if out.len() >= limit {
                break;
            }
            out.push(match group {
                Some((gs, ge)) => Value::string(&mut interp.heap, s[*gs..*ge].to_owned())?,
                None => Value::Undefined,
            });
        }
        last = m.end;
        pos = m.end;
    }
    if out.len() < limit {
        out.push(Value::string(&mut interp.heap, s[last..].to_owned())?);
    }
    interp.make_array(out)
}

fn next_char_boundary(s: &str, mut i: usize) -> usize {
    i += 1;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
