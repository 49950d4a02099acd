//! The error constructors (`Error`, `TypeError`, ..., `AggregateError`)
//! and `Error.prototype`.

use super::arg;
use crate::{
    error::{ExcKind, RunResult},
    heap::HeapData,
    intern::StaticStrings,
    machine::Interp,
    object::{JsObject, Key, ObjectKind, Property},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorFn {
    Ctor(ExcKind),
    ProtoToString,
}

pub(crate) fn construct(interp: &mut Interp, kind: ExcKind, args: &[Value], _new_target: Value) -> RunResult<Value> {
    let (message, options, errors) = if kind == ExcKind::AggregateError {
        (arg(args, 1), arg(args, 2), Some(arg(args, 0)))
    } else {
        (arg(args, 0), arg(args, 1), None)
    };
    let mut obj = JsObject::new(Some(interp.realm.error_proto(kind)), ObjectKind::Error { kind });
    if !matches!(message, Value::Undefined) {
        let msg = interp.to_string_value(message)?;
        obj.define(Key::Str(StaticStrings::Message.id()), Property::method(msg));
    }
    obj.define(
        Key::Str(StaticStrings::Stack.id()),
        Property::method(Value::InternString(StaticStrings::Empty.id())),
    );
    let id = interp.heap.alloc(HeapData::Object(obj))?;
    // ES2022 options bag: { cause }
    if options.object_id(&interp.heap).is_some() {
        let cause_key = Key::Str(StaticStrings::Cause.id());
        if interp.has_prop(options.object_id(&interp.heap).expect("object"), &cause_key)? {
            let cause = interp.get_prop(options, &cause_key)?;
            interp.heap.obj_mut(id).define(cause_key, Property::method(cause));
        }
    }
    if let Some(errors) = errors {
        let list = interp.iter_collect(errors)?;
        let array = interp.make_array(list)?;
        interp
            .heap
            .obj_mut(id)
            .define(Key::Str(StaticStrings::Errors.id()), Property::method(array));
    }
    Ok(Value::Ref(id))
}

pub(crate) fn call(interp: &mut Interp, f: ErrorFn, this: Value, args: &[Value]) -> RunResult<Value> {
    match f {
        // Error(...) without new behaves like new Error(...)
        ErrorFn::Ctor(kind) => construct(interp, kind, args, Value::Undefined),
        ErrorFn::ProtoToString => {
            if this.object_id(&interp.heap).is_none() {
                return Err(interp.throw_type("Error.prototype.toString called on non-object"));
            }
            let name = interp.get_prop(this, &Key::Str(StaticStrings::Name.id()))?;
            let name = if matches!(name, Value::Undefined) { "Error".to_owned() } else { interp.to_string_rust(name)? };
            let message = interp.get_prop(this, &Key::Str(StaticStrings::Message.id()))?;
            let message =
                if matches!(message, Value::Undefined) { String::new() } else { interp.to_string_rust(message)? };
            let out = match (name.is_empty(), message.is_empty()) {
                (true, _) => message,
                (false, true) => name,
                (false, false) => format!("{name}: {message}"),
            };
            Value::string(&mut interp.heap, out)
        }
    }
}
