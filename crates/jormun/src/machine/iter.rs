//! The iteration protocol: obtaining iterators, stepping them, closing them
//! on early exit, spread collection, and `yield*` delegation.

use super::{DelegateThrow, Exit, Flow, Interp, Machine, Step};
use crate::{
    error::{RunError, RunResult},
    intern::{StaticStrings, WellKnown},
    object::Key,
    value::Value,
};

/// An iterator record: the iterator object and its cached `next` method.
#[derive(Debug, Clone)]
pub(crate) struct IterRecord {
    pub iter: Value,
    pub next: Value,
}

impl IterRecord {
    /// Placeholder before the iterable has been evaluated.
    pub fn empty() -> Self {
        Self {
            iter: Value::Undefined,
            next: Value::Undefined,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.iter, Value::Undefined)
    }
}

/// `yield*` state: drives the inner iterator, forwarding `next`/`throw`/
/// `return` resumptions.
#[derive(Debug)]
pub(crate) struct DelegateStep {
    pub iter: Option<IterRecord>,
}

impl DelegateStep {
    pub fn start() -> Self {
        Self { iter: None }
    }
}

impl Interp {
    /// GetIterator: `[Symbol.iterator]()` (or `[Symbol.asyncIterator]()`,
    /// falling back to the sync iterator whose results the caller awaits).
    pub(crate) fn get_iterator(&mut self, v: Value, is_async: bool) -> RunResult<IterRecord> {
        let method = if is_async {
            let m = self.get_prop(v, &Key::Sym(WellKnown::AsyncIterator.id()))?;
            if m.is_nullish() {
                self.get_prop(v, &Key::Sym(WellKnown::Iterator.id()))?
            } else {
                m
            }
        } else {
            self.get_prop(v, &Key::Sym(WellKnown::Iterator.id()))?
        };
        if !method.is_callable(&self.heap) {
            let type_name = v.type_of(&self.heap);
            return Err(self.throw_type(format!("{type_name} is not iterable")));
        }
        let iter = self.call_sync(method, v, &[])?;
        if iter.object_id(&self.heap).is_none() {
            return Err(self.throw_type("Result of the Symbol.iterator method is not an object"));
        }
        let next = self.get_prop(iter, &Key::Str(StaticStrings::Next.id()))?;
        Ok(IterRecord { iter, next })
    }

    /// Splits an iterator result object into `(value, done)`.
    pub(crate) fn iter_result_parts(&mut self, result: Value) -> RunResult<(Value, bool)> {
        if result.object_id(&self.heap).is_none() {
            return Err(self.throw_type("Iterator result is not an object"));
        }
        let done = self.get_prop(result, &Key::Str(StaticStrings::Done.id()))?;
        let done = done.to_boolean(&self.heap, &self.interns);
        let value = self.get_prop(result, &Key::Str(StaticStrings::Value.id()))?;
        Ok((value, done))
    }

    /// IteratorClose: calls `return()` if present. The caller decides
    /// whether a close error may replace the current completion.
    pub(crate) fn iter_close(&mut self, iter: &IterRecord) -> RunResult<()> {
        let ret = self.get_prop(iter.iter, &Key::Str(StaticStrings::Return.id()))?;
        if ret.is_callable(&self.heap) {
            self.call_sync(ret, iter.iter, &[])?;
        }
        Ok(())
    }

    /// Collects an iterable into a vector (spread, `Array.from`).
    pub(crate) fn iter_collect(&mut self, v: Value) -> RunResult<Vec<Value>> {
        let record = self.get_iterator(v, false)?;
        let mut out = Vec::new();
        loop {
            let result = self.call_sync(record.next, record.iter, &[])?;
            let (value, done) = self.iter_result_parts(result)?;
            if done {
                return Ok(out);
            }
            out.push(value);
        }
    }

    /// One `yield*` turn: feed the inner iterator, then either finish with
    /// its return value or yield its result out.
    pub(crate) fn step_delegate(&mut self, m: &mut Machine, mut step: Box<DelegateStep>) -> RunResult<Flow> {
        let (record, injected) = match step.iter.take() {
            None => {
                let iterable = m.pop();
                (self.get_iterator(iterable, false)?, Value::Undefined)
            }
            Some(record) => (record, m.pop()),
        };
        let result = self.call_sync(record.next, record.iter, &[injected])?;
        let (value, done) = self.iter_result_parts(result)?;
        if done {
            m.push(value);
            return Ok(Flow::More);
        }
        step.iter = Some(record);
        m.ctrl.push(Step::Delegate(step));
        Ok(Flow::Suspend(Exit::Yield(value)))
    }

    /// A throw unwinding through a `yield*`: forward to the inner iterator's
    /// `throw()`; without one, close the iterator and raise a TypeError.
    pub(crate) fn delegate_throw(
        &mut self,
        m: &mut Machine,
        step: Box<DelegateStep>,
        err: RunError,
    ) -> RunResult<DelegateThrow> {
        let Some(record) = step.iter else {
            return Ok(DelegateThrow::Rethrow(err));
        };
        if !err.is_catchable() {
            return Ok(DelegateThrow::Rethrow(err));
        }
        let throw_method = self.get_prop(record.iter, &Key::Str(StaticStrings::Throw.id()))?;
        if !throw_method.is_callable(&self.heap) {
            let _ = self.iter_close(&record);
            return Ok(DelegateThrow::Rethrow(
                self.throw_type("The iterator does not provide a 'throw' method"),
            ));
        }
        let thrown = self.exception_value(err)?;
        let result = self.call_sync(throw_method, record.iter, &[thrown])?;
        let (value, done) = self.iter_result_parts(result)?;
        if done {
            // delegation ends; the delegator resumes with the value
            m.push(value);
            return Ok(DelegateThrow::Handled);
        }
        // the inner iterator yielded again: suspend the machine anew
        m.ctrl.push(Step::Delegate(Box::new(DelegateStep { iter: Some(record) })));
        m.ctrl.push(Step::YieldOp);
        m.ctrl.push(Step::Push(value));
        Ok(DelegateThrow::Handled)
    }

    /// A `return` unwinding through a `yield*`: forward to the inner
    /// iterator's `return()`.
    pub(crate) fn delegate_return(&mut self, step: &DelegateStep) -> RunResult<()> {
        if let Some(record) = &step.iter {
            let record = record.clone();
            self.iter_close(&record)?;
        }
        Ok(())
    }
}
