//! The `JSON` namespace: `stringify` (replacer function/array, indent,
//! `toJSON`, cycle detection) and `parse` (on the `serde_json` parser, with
//! reviver support).

use super::arg;
use crate::{
    error::RunResult,
    heap::{HeapData, HeapId},
    intern::StaticStrings,
    machine::Interp,
    object::{JsObject, Key, ObjectKind, Property},
    types::number::to_js_string,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JsonFn {
    Parse,
    Stringify,
}

pub(crate) fn call(interp: &mut Interp, f: JsonFn, _this: Value, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    let a1 = arg(args, 1);
    match f {
        JsonFn::Parse => {
            let text = interp.to_string_rust(a0)?;
            let parsed: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
                crate::error::RunError::Simple(crate::error::SimpleException::new(
                    crate::error::ExcKind::SyntaxError,
                    format!("Unexpected token in JSON: {e}"),
                ))
            })?;
            let value = from_serde(interp, parsed)?;
            if a1.is_callable(&interp.heap) {
                // the reviver walks bottom-up from a synthetic root holder
                let holder = JsObject::ordinary(interp.realm.object_proto);
                let holder = interp.heap.alloc(HeapData::Object(holder))?;
                let root_key = Key::Str(StaticStrings::Empty.id());
                interp.heap.obj_mut(holder).define(root_key, Property::data(value));
                return revive(interp, Value::Ref(holder), root_key, a1);
            }
            Ok(value)
        }
        JsonFn::Stringify => {
            let indent = make_indent(interp, arg(args, 2))?;
            let replacer_fn = if a1.is_callable(&interp.heap) { Some(a1) } else { None };
            let key_filter = replacer_key_filter(interp, a1)?;
            let mut ser = Serializer {
                seen: Vec::new(),
                indent,
                replacer_fn,
                key_filter,
            };
            let root = apply_to_json(interp, a0, "")?;
            let root = match ser.replacer_fn {
                Some(f) => {
                    let key = Value::InternString(StaticStrings::Empty.id());
                    interp.call_sync(f, a0, &[key, root])?
                }
                None => root,
            };
            match serialize(interp, &mut ser, root, 0)? {
                Some(s) => Value::string(&mut interp.heap, s),
                None => Ok(Value::Undefined),
            }
        }
    }
}

struct Serializer {
    /// Objects on the current serialization path (cycle check).
    seen: Vec<HeapId>,
    indent: Option<String>,
    replacer_fn: Option<Value>,
    key_filter: Option<Vec<String>>,
}

fn make_indent(interp: &mut Interp, space: Value) -> RunResult<Option<String>> {
    match space {
        Value::Number(n) => {
            let n = (n.max(0.0) as usize).min(10);
            Ok(if n == 0 { None } else { Some(" ".repeat(n)) })
        }
        _ => {
            if let Some(s) = space.as_str(&interp.heap, &interp.interns) {
                let s: String = s.chars().take(10).collect();
                Ok(if s.is_empty() { None } else { Some(s) })
            } else {
                Ok(None)
            }
        }
    }
}

fn replacer_key_filter(interp: &mut Interp, replacer: Value) -> RunResult<Option<Vec<String>>> {
    let Some(id) = replacer.object_id(&interp.heap) else {
        return Ok(None);
    };
    if !interp.heap.obj(id).is_array() {
        return Ok(None);
    }
    let len = interp.heap.obj(id).array_length();
    let mut keys = Vec::with_capacity(len as usize);
    for i in 0..len {
        let v = interp.get_prop(replacer, &Key::Index(i))?;
        match v {
            Value::Number(n) => keys.push(to_js_string(n)),
            _ => {
                if v.is_string(&interp.heap) {
                    keys.push(interp.to_string_rust(v)?);
                }
            }
        }
    }
    Ok(Some(keys))
}

/// Invokes `toJSON` when present.
fn apply_to_json(interp: &mut Interp, value: Value, key: &str) -> RunResult<Value> {
    if value.object_id(&interp.heap).is_none() {
        return Ok(value);
    }
    let to_json = interp.get_prop(value, &Key::Str(StaticStrings::ToJSON.id()))?;
    if to_json.is_callable(&interp.heap) {
        let key = Value::string(&mut interp.heap, key.to_owned())?;
        return interp.call_sync(to_json, value, &[key]);
    }
    Ok(value)
}

/// Serializes one value; `None` means the value is omitted (functions,
/// undefined, symbols).
fn serialize(interp: &mut Interp, ser: &mut Serializer, value: Value, depth: usize) -> RunResult<Option<String>> {
    match value {
        Value::Undefined | Value::Symbol(_) => Ok(None),
        Value::Null => Ok(Some("null".to_owned())),
        Value::Bool(b) => Ok(Some(if b { "true" } else { "false" }.to_owned())),
        Value::Number(n) => Ok(Some(if n.is_finite() { to_js_string(n) } else { "null".to_owned() })),
        _ => {
            if let Some(s) = value.as_str(&interp.heap, &interp.interns) {
                return Ok(Some(quote_json(s)));
            }
            if value.as_bigint(&interp.heap).is_some() {
                return Err(interp.throw_type("Do not know how to serialize a BigInt"));
            }
            let id = value.object_id(&interp.heap).expect("remaining values are objects");
            // wrappers serialize as their primitive
            match &interp.heap.obj(id).kind {
                ObjectKind::Function(_) => return Ok(None),
                ObjectKind::Wrapper(inner) => {
                    let inner = *inner;
                    return serialize(interp, ser, inner, depth);
                }
                _ => {}
            }
            if ser.seen.contains(&id) {
                return Err(interp.throw_type("Converting circular structure to JSON"));
            }
            ser.seen.push(id);
            let result = if interp.heap.obj(id).is_array() {
                serialize_array(interp, ser, value, id, depth)
            } else {
                serialize_object(interp, ser, value, id, depth)
            };
            ser.seen.pop();
            result.map(Some)
        }
    }
}

fn member_value(interp: &mut Interp, ser: &mut Serializer, holder: Value, key: &Key) -> RunResult<Value> {
    let raw = interp.get_prop(holder, key)?;
    let key_str = key.render(&interp.interns);
    let v = apply_to_json(interp, raw, &key_str)?;
    match ser.replacer_fn {
        Some(f) => {
            let key_val = Value::string(&mut interp.heap, key_str)?;
            interp.call_sync(f, holder, &[key_val, v])
        }
        None => Ok(v),
    }
}

fn serialize_array(
    interp: &mut Interp,
    ser: &mut Serializer,
    value: Value,
    id: HeapId,
    depth: usize,
) -> RunResult<String> {
    let len = interp.heap.obj(id).array_length();
    let mut parts = Vec::with_capacity(len as usize);
    for i in 0..len {
        let v = member_value(interp, ser, value, &Key::Index(i))?;
        // undefined and functions render as null inside arrays
        let part = serialize(interp, ser, v, depth + 1)?.unwrap_or_else(|| "null".to_owned());
        parts.push(part);
    }
    Ok(join_parts(&parts, "[", "]", ser.indent.as_deref(), depth))
}

fn serialize_object(
    interp: &mut Interp,
    ser: &mut Serializer,
    value: Value,
    id: HeapId,
    depth: usize,
) -> RunResult<String> {
    let keys: Vec<Key> = match &ser.key_filter {
        Some(filter) => filter
            .iter()
            .map(|k| Key::from_str(&mut interp.interns, k))
            .collect(),
        None => interp.own_enumerable_keys(id),
    };
    let mut parts = Vec::new();
    for key in keys {
        if matches!(key, Key::Sym(_) | Key::Private(_)) {
            continue;
        }
        let v = member_value(interp, ser, value, &key)?;
        // undefined-valued members are omitted from objects
        if let Some(rendered) = serialize(interp, ser, v, depth + 1)? {
            let name = quote_json(&key.render(&interp.interns));
            let sep = if ser.indent.is_some() { ": " } else { ":" };
            parts.push(format!("{name}{sep}{rendered}"));
        }
    }
    Ok(join_parts(&parts, "{", "}", ser.indent.as_deref(), depth))
}

fn join_parts(parts: &[String], open: &str, close: &str, indent: Option<&str>, depth: usize) -> String {
    if parts.is_empty() {
        return format!("{open}{close}");
    }
    match indent {
        None => format!("{open}{}{close}", parts.join(",")),
        Some(unit) => {
            let inner = unit.repeat(depth + 1);
            let outer = unit.repeat(depth);
            format!("{open}\n{inner}{}\n{outer}{close}", parts.join(&format!(",\n{inner}")))
        }
    }
}

/// JSON string quoting; unpaired surrogates cannot occur in well-formed
/// Rust strings, and astral characters pass through verbatim.
fn quote_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// serde_json value -> JS value (object key order preserved by the
/// `preserve_order` feature).
fn from_serde(interp: &mut Interp, v: serde_json::Value) -> RunResult<Value> {
    Ok(match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(&mut interp.heap, s)?,
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_serde(interp, item)?);
            }
            interp.make_array(out)?
        }
        serde_json::Value::Object(map) => {
            let obj = JsObject::ordinary(interp.realm.object_proto);
            let id = interp.heap.alloc(HeapData::Object(obj))?;
            for (k, item) in map {
                let value = from_serde(interp, item)?;
                let key = Key::from_str(&mut interp.interns, &k);
                interp.heap.obj_mut(id).define(key, Property::data(value));
            }
            Value::Ref(id)
        }
    })
}

/// The reviver walk: children first, then the holder's own entry;
/// `undefined` from the reviver deletes the key.
fn revive(interp: &mut Interp, holder: Value, key: Key, reviver: Value) -> RunResult<Value> {
    let value = interp.get_prop(holder, &key)?;
    if let Some(id) = value.object_id(&interp.heap) {
        let keys = interp.own_enumerable_keys(id);
        for child_key in keys {
            let revised = revive(interp, value, child_key, reviver)?;
            if matches!(revised, Value::Undefined) {
                // deleting array entries leaves holes; length is unchanged
                interp.heap.obj_mut(id).remove(&child_key);
            } else {
                interp.heap.obj_mut(id).define(child_key, Property::data(revised));
            }
        }
    }
    let key_str = Value::string(&mut interp.heap, key.render(&interp.interns))?;
    interp.call_sync(reviver, holder, &[key_str, value])
}
