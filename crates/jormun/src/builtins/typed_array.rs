//! `ArrayBuffer` and the typed-array constructors.
//!
//! Element reads/writes (with per-kind clamping and wrapping) live in the
//! member module as exotic hooks; here are the constructors and the small
//! prototype surface.

use super::arg;
use crate::{
    error::{RunError, RunResult},
    heap::HeapData,
    intern::StaticStrings,
    machine::Interp,
    object::{ElementKind, JsObject, Key, ObjectKind, Property},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypedArrayFn {
    Ctor(ElementKind),
    ArrayBufferCtor,
    Fill,
    Slice,
    SetMethod,
    At,
    ByteLengthGetter,
}

pub(crate) fn construct_buffer(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    let len = interp.to_number(arg(args, 0))?;
    let len = if len.is_finite() && len >= 0.0 { len as usize } else { 0 };
    let obj = JsObject::new(Some(interp.realm.arraybuffer_proto), ObjectKind::ArrayBuffer(vec![0u8; len]));
    Ok(Value::Ref(interp.heap.alloc(HeapData::Object(obj))?))
}

pub(crate) fn construct(interp: &mut Interp, kind: ElementKind, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    let proto = interp.realm.typed_array_proto(kind);
    // new T(buffer [, byteOffset [, length]])
    if let Some(buf_id) = a0.object_id(&interp.heap)
        && matches!(interp.heap.obj(buf_id).kind, ObjectKind::ArrayBuffer(_))
    {
        let byte_len = match &interp.heap.obj(buf_id).kind {
            ObjectKind::ArrayBuffer(data) => data.len(),
            _ => unreachable!("buffer checked"),
        };
        let byte_offset = interp.to_number(arg(args, 1))? as usize;
        if byte_offset % kind.size() != 0 || byte_offset > byte_len {
            return Err(RunError::range_err("start offset is not aligned"));
        }
        let length = if matches!(arg(args, 2), Value::Undefined) {
            (byte_len - byte_offset) / kind.size()
        } else {
            interp.to_number(arg(args, 2))? as usize
        };
        if byte_offset + length * kind.size() > byte_len {
            return Err(RunError::range_err("Invalid typed array length"));
        }
        return make_view(interp, kind, proto, buf_id, byte_offset, length);
    }
    // new T(length) / new T(iterable or array-like)
    let (length, init) = match a0 {
        Value::Number(n) => {
            let len = n as usize;
            if len as f64 != n {
                return Err(RunError::range_err("Invalid typed array length"));
            }
            (len, Vec::new())
        }
        Value::Undefined => (0, Vec::new()),
        _ => {
            let items = interp.iter_collect_array_like(a0)?;
            (items.len(), items)
        }
    };
    let buffer = JsObject::new(
        Some(interp.realm.arraybuffer_proto),
        ObjectKind::ArrayBuffer(vec![0u8; length * kind.size()]),
    );
    let buf_id = interp.heap.alloc(HeapData::Object(buffer))?;
    let view = make_view(interp, kind, proto, buf_id, 0, length)?;
    let view_id = view.object_id(&interp.heap).expect("typed array");
    for (i, item) in init.into_iter().enumerate() {
        let numeric = interp.to_numeric(item)?;
        interp.typed_array_set(view_id, i, numeric)?;
    }
    Ok(view)
}

fn make_view(
    interp: &mut Interp,
    kind: ElementKind,
    proto: crate::heap::HeapId,
    buffer: crate::heap::HeapId,
    byte_offset: usize,
    length: usize,
) -> RunResult<Value> {
    let mut obj = JsObject::new(
        Some(proto),
        ObjectKind::TypedArray { kind, buffer, byte_offset, length },
    );
    obj.define(Key::Str(StaticStrings::Buffer.id()), Property::method_ro(Value::Ref(buffer)));
    obj.define(
        Key::Str(StaticStrings::ByteOffset.id()),
        Property::method_ro(Value::Number(byte_offset as f64)),
    );
    obj.define(
        Key::Str(StaticStrings::ByteLength.id()),
        Property::method_ro(Value::Number((length * kind.size()) as f64)),
    );
    obj.define(
        Key::Str(StaticStrings::BytesPerElement.id()),
        Property::method_ro(Value::Number(kind.size() as f64)),
    );
    Ok(Value::Ref(interp.heap.alloc(HeapData::Object(obj))?))
}

fn this_typed_array(interp: &mut Interp, this: Value) -> RunResult<(crate::heap::HeapId, usize)> {
    if let Some(id) = this.object_id(&interp.heap)
        && let ObjectKind::TypedArray { length, .. } = interp.heap.obj(id).kind
    {
        return Ok((id, length));
    }
    Err(interp.throw_type("TypedArray method called on incompatible receiver"))
}

pub(crate) fn call(interp: &mut Interp, f: TypedArrayFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    match f {
        TypedArrayFn::Ctor(_) | TypedArrayFn::ArrayBufferCtor => {
            Err(interp.throw_type("Constructor requires 'new'"))
        }
        TypedArrayFn::Fill => {
            let (id, len) = this_typed_array(interp, this)?;
            let numeric = interp.to_numeric(a0)?;
            for i in 0..len {
                interp.typed_array_set(id, i, numeric)?;
            }
            Ok(this)
        }
        TypedArrayFn::Slice => {
            let (id, len) = this_typed_array(interp, this)?;
            let start = rel(interp, a0, len, 0)?;
            let end = rel(interp, arg(args, 1), len, len)?;
            let kind = match interp.heap.obj(id).kind {
                ObjectKind::TypedArray { kind, .. } => kind,
                _ => unreachable!("typed array checked"),
            };
            let items: Vec<Value> = {
                let mut out = Vec::new();
                for i in start..end {
                    if let Some(v) = interp.typed_array_get(id, i)? {
                        out.push(v);
                    }
                }
                out
            };
            let arr = interp.make_array(items)?;
            construct(interp, kind, &[arr])
        }
        TypedArrayFn::SetMethod => {
            let (id, len) = this_typed_array(interp, this)?;
            let offset = interp.to_number(arg(args, 1))? as usize;
            let items = interp.iter_collect_array_like(a0)?;
            if offset + items.len() > len {
                return Err(RunError::range_err("offset is out of bounds"));
            }
            for (i, item) in items.into_iter().enumerate() {
                let numeric = interp.to_numeric(item)?;
                interp.typed_array_set(id, offset + i, numeric)?;
            }
            Ok(Value::Undefined)
        }
        TypedArrayFn::At => {
            let (id, len) = this_typed_array(interp, this)?;
            let idx = crate::types::number::to_integer_or_infinity(interp.to_number(a0)?);
            match crate::types::number::relative_index(idx, len) {
                Some(i) => Ok(interp.typed_array_get(id, i)?.unwrap_or(Value::Undefined)),
                None => Ok(Value::Undefined),
            }
        }
        TypedArrayFn::ByteLengthGetter => {
            let Some(id) = this.object_id(&interp.heap) else {
                return Err(interp.throw_type("byteLength getter called on incompatible receiver"));
            };
            match &interp.heap.obj(id).kind {
                ObjectKind::ArrayBuffer(data) => Ok(Value::Number(data.len() as f64)),
                _ => Err(interp.throw_type("byteLength getter called on incompatible receiver")),
            }
        }
    }
}

fn rel(interp: &mut Interp, v: Value, len: usize, default: usize) -> RunResult<usize> {
    if matches!(v, Value::Undefined) {
        return Ok(default);
    }
    let n = crate::types::number::to_integer_or_infinity(interp.to_number(v)?);
    Ok(if n < 0.0 { ((len as f64) + n).max(0.0) as usize } else { (n as usize).min(len) })
}
