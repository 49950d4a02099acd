//! The `Boolean` constructor and prototype.

use super::arg;
use crate::{
    error::RunResult,
    heap::HeapData,
    machine::Interp,
    object::{JsObject, ObjectKind},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BooleanFn {
    Ctor,
    ToStringMethod,
    ValueOf,
}

fn this_bool(interp: &mut Interp, this: Value) -> RunResult<bool> {
    match this {
        Value::Bool(b) => Ok(b),
        _ => {
            if let Some(id) = this.object_id(&interp.heap)
                && let ObjectKind::Wrapper(Value::Bool(b)) = interp.heap.obj(id).kind
            {
                return Ok(b);
            }
            Err(interp.throw_type("Boolean.prototype method called on incompatible receiver"))
        }
    }
}

pub(crate) fn construct(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    let b = arg(args, 0).to_boolean(&interp.heap, &interp.interns);
    let obj = JsObject::new(Some(interp.realm.boolean_proto), ObjectKind::Wrapper(Value::Bool(b)));
    Ok(Value::Ref(interp.heap.alloc(HeapData::Object(obj))?))
}

pub(crate) fn call(interp: &mut Interp, f: BooleanFn, this: Value, args: &[Value]) -> RunResult<Value> {
    match f {
        BooleanFn::Ctor => Ok(Value::Bool(arg(args, 0).to_boolean(&interp.heap, &interp.interns))),
        BooleanFn::ToStringMethod => {
            let b = this_bool(interp, this)?;
            Value::string(&mut interp.heap, if b { "true" } else { "false" }.to_owned())
        }
        BooleanFn::ValueOf => Ok(Value::Bool(this_bool(interp, this)?)),
    }
}
