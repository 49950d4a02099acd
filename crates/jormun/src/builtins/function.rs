//! `Function.prototype`: `call`, `apply`, `bind`, `toString`.

use super::arg;
use crate::{
    error::RunResult,
    machine::Interp,
    object::{FuncKind, ObjectKind},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionFn {
    /// The `Function` constructor itself (source compilation is refused in
    /// the sandbox).
    Ctor,
    ProtoCall,
    ProtoApply,
    ProtoBind,
    ProtoToString,
}

pub(crate) fn call(interp: &mut Interp, f: FunctionFn, this: Value, args: &[Value]) -> RunResult<Value> {
    match f {
        FunctionFn::Ctor => Err(interp.throw_type("Function constructor from source is not supported")),
        FunctionFn::ProtoCall => {
            let bound_this = arg(args, 0);
            let rest: Vec<Value> = args.iter().skip(1).copied().collect();
            interp.call_sync(this, bound_this, &rest)
        }
        FunctionFn::ProtoApply => {
            let bound_this = arg(args, 0);
            let list = arg(args, 1);
            let call_args = if list.is_nullish() {
                Vec::new()
            } else {
                interp.iter_collect_array_like(list)?
            };
            interp.call_sync(this, bound_this, &call_args)
        }
        FunctionFn::ProtoBind => {
            let Some(target) = this.object_id(&interp.heap) else {
                return Err(interp.throw_type("Bind must be called on a function"));
            };
            if !matches!(interp.heap.obj(target).kind, ObjectKind::Function(_)) {
                return Err(interp.throw_type("Bind must be called on a function"));
            }
            let bound_this = arg(args, 0);
            let bound_args: Vec<Value> = args.iter().skip(1).copied().collect();
            interp.make_bound_function(target, bound_this, bound_args)
        }
        FunctionFn::ProtoToString => {
            let Some(id) = this.object_id(&interp.heap) else {
                return Err(interp.throw_type("Function.prototype.toString requires a function"));
            };
            let source = match interp.heap.obj(id).as_function() {
                Some(FuncKind::User(user)) => interp.code.func_source(user.func).to_owned(),
                Some(FuncKind::Native(_) | FuncKind::PromiseResolver { .. }) => {
                    let name = interp.get_prop(this, &crate::object::Key::Str(crate::intern::StaticStrings::Name.id()))?;
                    let name = interp.to_string_rust(name)?;
                    format!("function {name}() {{ [native code] }}")
                }
                Some(FuncKind::Bound(_)) => "function () { [native code] }".to_owned(),
                None => return Err(interp.throw_type("Function.prototype.toString requires a function")),
            };
            Value::string(&mut interp.heap, source)
        }
    }
}

impl Interp {
    /// Spread helper for `apply`: arrays read by index, other iterables via
    /// the protocol, array-likes by `length`.
    pub(crate) fn iter_collect_array_like(&mut self, v: Value) -> RunResult<Vec<Value>> {
        if let Some(id) = v.object_id(&self.heap)
            && self.heap.obj(id).is_array()
        {
            let len = self.heap.obj(id).array_length();
            let mut out = Vec::with_capacity(len as usize);
            for i in 0..len {
                out.push(self.get_prop(v, &crate::object::Key::Index(i))?);
            }
            return Ok(out);
        }
        let iter_method = self.get_prop(v, &crate::object::Key::Sym(crate::intern::WellKnown::Iterator.id()))?;
        if iter_method.is_callable(&self.heap) {
            return self.iter_collect(v);
        }
        // array-like fallback: numeric length, indexed reads
        let len_val = self.get_prop(v, &crate::object::Key::Str(crate::intern::StaticStrings::Length.id()))?;
        let len = crate::types::number::to_length(self.to_number(len_val)?);
        let mut out = Vec::with_capacity(len as usize);
        for i in 0..len {
            out.push(self.get_prop(v, &crate::object::Key::Index(i as u32))?);
        }
        Ok(out)
    }
}
