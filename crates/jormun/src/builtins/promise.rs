//! The `Promise` constructor, combinators, and prototype.
//!
//! Combinator state (pending counter, results array) lives in hidden
//! properties on the result promise; each input registers a
//! `Reaction::Combinator` carrying its index, so settlement order cannot
//! race and input order is preserved.

use super::arg;
use crate::{
    error::{ExcKind, RunResult},
    heap::HeapId,
    intern::StaticStrings,
    machine::Interp,
    object::{Key, ObjectKind, Property},
    jobs::Reaction,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromiseFn {
    Ctor,
    Resolve,
    Reject,
    All,
    AllSettled,
    Any,
    Race,
    Then,
    Catch,
    Finally,
}

/// Which combinator a grouped reaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CombKind {
    All,
    AllSettled,
    Any,
    Race,
}

fn this_promise(interp: &mut Interp, this: Value) -> RunResult<HeapId> {
    if let Some(id) = this.object_id(&interp.heap)
        && matches!(interp.heap.obj(id).kind, ObjectKind::Promise(_))
    {
        return Ok(id);
    }
    Err(interp.throw_type("Promise.prototype method called on incompatible receiver"))
}

pub(crate) fn construct(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    let executor = arg(args, 0);
    if !executor.is_callable(&interp.heap) {
        return Err(interp.throw_type("Promise resolver is not a function"));
    }
    let promise = interp.make_pending_promise()?;
    let resolve = interp.make_resolver(promise, false)?;
    let reject = interp.make_resolver(promise, true)?;
    match interp.call_sync(executor, Value::Undefined, &[resolve, reject]) {
        Ok(_) => {}
        Err(err) => {
            if !err.is_catchable() {
                return Err(err);
            }
            let reason = interp.exception_value(err)?;
            interp.reject_promise(promise, reason)?;
        }
    }
    Ok(Value::Ref(promise))
}

fn results_key(interp: &mut Interp) -> Key {
    Key::Str(interp.interns.intern("[[results]]"))
}

fn pending_key(interp: &mut Interp) -> Key {
    Key::Str(interp.interns.intern("[[pending]]"))
}

pub(crate) fn call(interp: &mut Interp, f: PromiseFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    let a1 = arg(args, 1);
    match f {
        PromiseFn::Ctor => Err(interp.throw_type("Promise constructor requires 'new'")),
        PromiseFn::Resolve => {
            let p = interp.promise_resolve_value(a0)?;
            Ok(Value::Ref(p))
        }
        PromiseFn::Reject => {
            let p = interp.make_pending_promise()?;
            interp.reject_promise(p, a0)?;
            Ok(Value::Ref(p))
        }
        PromiseFn::All | PromiseFn::AllSettled | PromiseFn::Any | PromiseFn::Race => {
            let kind = match f {
                PromiseFn::All => CombKind::All,
                PromiseFn::AllSettled => CombKind::AllSettled,
                PromiseFn::Any => CombKind::Any,
                _ => CombKind::Race,
            };
            combinator(interp, kind, a0)
        }
        PromiseFn::Then => {
            let promise = this_promise(interp, this)?;
            let derived = interp.make_pending_promise()?;
            let on_fulfilled = if a0.is_callable(&interp.heap) { Some(a0) } else { None };
            let on_rejected = if a1.is_callable(&interp.heap) { Some(a1) } else { None };
            interp.register_reaction(promise, Reaction::Handler { on_fulfilled, on_rejected, derived });
            Ok(Value::Ref(derived))
        }
        PromiseFn::Catch => {
            let promise = this_promise(interp, this)?;
            let derived = interp.make_pending_promise()?;
            let on_rejected = if a0.is_callable(&interp.heap) { Some(a0) } else { None };
            interp.register_reaction(promise, Reaction::Handler { on_fulfilled: None, on_rejected, derived });
            Ok(Value::Ref(derived))
        }
        PromiseFn::Finally => {
            let promise = this_promise(interp, this)?;
            let derived = interp.make_pending_promise()?;
            interp.register_reaction(promise, Reaction::Finally { callback: a0, derived });
            Ok(Value::Ref(derived))
        }
    }
}

fn combinator(interp: &mut Interp, kind: CombKind, iterable: Value) -> RunResult<Value> {
    let result = interp.make_pending_promise()?;
    let inputs = match interp.iter_collect(iterable) {
        Ok(items) => items,
        Err(err) => {
            if !err.is_catchable() {
                return Err(err);
            }
            let reason = interp.exception_value(err)?;
            interp.reject_promise(result, reason)?;
            return Ok(Value::Ref(result));
        }
    };
    let total = inputs.len();
    if total == 0 {
        match kind {
            CombKind::All | CombKind::AllSettled => {
                let empty = interp.make_array(Vec::new())?;
                interp.resolve_promise(result, empty)?;
            }
            CombKind::Any => {
                let err = make_aggregate_error(interp, Vec::new())?;
                interp.reject_promise(result, err)?;
            }
            CombKind::Race => {} // forever pending
        }
        return Ok(Value::Ref(result));
    }
    // hidden combinator state on the result promise
    if !matches!(kind, CombKind::Race) {
        let slots = vec![Value::Undefined; total];
        let results = interp.make_array(slots)?;
        let rk = results_key(interp);
        let pk = pending_key(interp);
        let obj = interp.heap.obj_mut(result);
        obj.define(rk, Property::method(results));
        obj.define(pk, Property::method(Value::Number(total as f64)));
    }
    for (i, input) in inputs.into_iter().enumerate() {
        let p = interp.promise_resolve_value(input)?;
        interp.register_reaction(p, Reaction::Combinator { kind, result, index: i as u32 });
    }
    Ok(Value::Ref(result))
}

impl Interp {
    /// One combinator input settled.
    pub(crate) fn combinator_settled(
        &mut self,
        kind: CombKind,
        result: HeapId,
        index: u32,
        rejected: bool,
        value: Value,
    ) -> RunResult<()> {
        match kind {
            CombKind::Race => {
                if rejected {
                    self.reject_promise(result, value)
                } else {
                    self.resolve_promise(result, value)
                }
            }
            CombKind::All => {
                if rejected {
                    return self.reject_promise(result, value);
                }
                self.store_combinator_slot(result, index, value)?;
                if self.decrement_pending(result)? == 0 {
                    let results = self.combinator_results(result)?;
                    return self.resolve_promise(result, results);
                }
                Ok(())
            }
            CombKind::AllSettled => {
                let entry = self.make_settled_entry(rejected, value)?;
                self.store_combinator_slot(result, index, entry)?;
                if self.decrement_pending(result)? == 0 {
                    let results = self.combinator_results(result)?;
                    return self.resolve_promise(result, results);
                }
                Ok(())
            }
            CombKind::Any => {
                if !rejected {
                    return self.resolve_promise(result, value);
                }
                self.store_combinator_slot(result, index, value)?;
                if self.decrement_pending(result)? == 0 {
                    let errors_arr = self.combinator_results(result)?;
                    let errors = {
                        let id = errors_arr.object_id(&self.heap).expect("array");
                        let len = self.heap.obj(id).array_length();
                        let mut out = Vec::with_capacity(len as usize);
                        for i in 0..len {
                            out.push(self.get_prop(errors_arr, &Key::Index(i))?);
                        }
                        out
                    };
                    let err = make_aggregate_error(self, errors)?;
                    return self.reject_promise(result, err);
                }
                Ok(())
            }
        }
    }

    fn store_combinator_slot(&mut self, result: HeapId, index: u32, value: Value) -> RunResult<()> {
        let rk = results_key(self);
        let results = self.get_prop_on(result, &rk, Value::Ref(result))?;
        let id = results.object_id(&self.heap).expect("combinator results array");
        self.set_prop(id, Key::Index(index), value, results, true)
    }

    fn combinator_results(&mut self, result: HeapId) -> RunResult<Value> {
        let rk = results_key(self);
        self.get_prop_on(result, &rk, Value::Ref(result))
    }

    fn decrement_pending(&mut self, result: HeapId) -> RunResult<u32> {
        let pk = pending_key(self);
        let n = self.get_prop_on(result, &pk, Value::Ref(result))?;
        let n = self.to_number(n)? as u32 - 1;
        self.heap.obj_mut(result).define(pk, Property::method(Value::Number(f64::from(n))));
        Ok(n)
    }

    fn make_settled_entry(&mut self, rejected: bool, value: Value) -> RunResult<Value> {
        let mut obj = crate::object::JsObject::ordinary(self.realm.object_proto);
        let status = Value::InternString(if rejected {
            StaticStrings::Rejected.id()
        } else {
            StaticStrings::Fulfilled.id()
        });
        obj.define(Key::Str(StaticStrings::Status.id()), Property::data(status));
        if rejected {
            obj.define(Key::Str(StaticStrings::Reason.id()), Property::data(value));
        } else {
            obj.define(Key::Str(StaticStrings::Value.id()), Property::data(value));
        }
        Ok(Value::Ref(self.heap.alloc(crate::heap::HeapData::Object(obj))?))
    }
}

fn make_aggregate_error(interp: &mut Interp, errors: Vec<Value>) -> RunResult<Value> {
    let err = interp.make_error(ExcKind::AggregateError, "All promises were rejected")?;
    let id = err.object_id(&interp.heap).expect("error object");
    let array = interp.make_array(errors)?;
    interp
        .heap
        .obj_mut(id)
        .define(Key::Str(StaticStrings::Errors.id()), Property::method(array));
    Ok(err)
}
