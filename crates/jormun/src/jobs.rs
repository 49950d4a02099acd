//! Jobs and scheduling: the promise state machine, the FIFO microtask
//! queue, and the host-pumped timer queue.
//!
//! The realm is single-threaded and cooperative: the machine runs
//! synchronously until it suspends, then microtasks (promise reactions,
//! `queueMicrotask`) drain in FIFO order. Timer callbacks are macrotasks:
//! the host advances the clock, one due entry runs, then the microtask
//! queue drains again.

use std::collections::BinaryHeap;

use ahash::AHashSet;

use crate::{
    coroutine::CoroId,
    error::RunResult,
    heap::{HeapData, HeapId},
    machine::{Interp, ResumeMode},
    module::ModuleId,
    object::{JsObject, ObjectKind},
    value::Value,
};

/// Promise state plus registered reactions.
#[derive(Debug, Default)]
pub(crate) struct PromiseData {
    pub state: PromiseState,
    pub reactions: Vec<Reaction>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) enum PromiseState {
    #[default]
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

/// What to do when a promise settles. Reactions fire as microtasks in
/// registration order.
#[derive(Debug)]
pub(crate) enum Reaction {
    /// A `then`/`catch`/`finally` registration: call the matching handler
    /// and settle `derived` with its result. A missing handler passes the
    /// value (or re-throws the reason) through.
    Handler {
        on_fulfilled: Option<Value>,
        on_rejected: Option<Value>,
        derived: HeapId,
    },
    /// Resume a parked async function.
    ResumeCoro { coro: CoroId },
    /// Resume a parked async generator, settling its pending `next()`.
    ResumeAsyncGen { r#gen: HeapId, next_promise: HeapId },
    /// Notify a module waiting on an async dependency.
    ModuleDep { module: ModuleId },
    /// Settle a dynamic `import()` promise with the module's namespace.
    DynamicImport { module: ModuleId, result: HeapId },
    /// One input of a `Promise.all`-family combinator settled.
    Combinator {
        kind: crate::builtins::promise::CombKind,
        result: HeapId,
        index: u32,
    },
    /// `Promise.prototype.finally`: run the callback, pass the outcome
    /// through (a throwing callback replaces it).
    Finally { callback: Value, derived: HeapId },
}

/// One queued microtask.
#[derive(Debug)]
pub(crate) enum Job {
    /// Fire a settled reaction.
    Reaction {
        reaction: Reaction,
        value: Value,
        rejected: bool,
    },
    /// `queueMicrotask(fn)`.
    Callback { func: Value, args: Vec<Value> },
    /// Call a foreign thenable's `then(resolve, reject)`.
    Thenable {
        promise: HeapId,
        thenable: Value,
        then: Value,
    },
}

/// One scheduled timer.
#[derive(Debug)]
pub(crate) struct TimerEntry {
    pub due: f64,
    pub seq: u64,
    pub id: u32,
    pub func: Value,
    pub args: Vec<Value>,
    /// `setInterval` period; `None` for one-shot timeouts.
    pub interval: Option<f64>,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}
impl Eq for TimerEntry {}
impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // min-heap through reversal: earliest due, then FIFO by seq
        other
            .due
            .total_cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending timers, keyed by due time with FIFO tie-breaking.
#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    heap: BinaryHeap<TimerEntry>,
    cancelled: AHashSet<u32>,
    next_id: u32,
    next_seq: u64,
    /// The host-advanced clock, milliseconds.
    pub now: f64,
}

impl TimerQueue {
    pub fn schedule(&mut self, func: Value, delay: f64, args: Vec<Value>, interval: Option<f64>) -> u32 {
        self.next_id += 1;
        self.next_seq += 1;
        let id = self.next_id;
        self.heap.push(TimerEntry {
            due: self.now + delay.max(0.0),
            seq: self.next_seq,
            id,
            func,
            args,
            interval,
        });
        id
    }

    pub fn cancel(&mut self, id: u32) {
        self.cancelled.insert(id);
    }

    /// Pops the next timer due at or before `now`, skipping cancelled ones.
    pub fn pop_due(&mut self, now: f64) -> Option<TimerEntry> {
        while let Some(entry) = self.heap.peek() {
            if entry.due > now {
                return None;
            }
            let entry = self.heap.pop().expect("peeked entry");
            if self.cancelled.contains(&entry.id) {
                continue;
            }
            return Some(entry);
        }
        None
    }

    /// Re-arms an interval entry after it fired.
    pub fn rearm(&mut self, entry: TimerEntry, period: f64) {
        self.next_seq += 1;
        self.heap.push(TimerEntry {
            due: self.now + period.max(0.0),
            seq: self.next_seq,
            ..entry
        });
    }

    pub fn is_empty(&self) -> bool {
        self.heap.iter().all(|e| self.cancelled.contains(&e.id))
    }
}

impl Interp {
    // === promise primitives ===

    pub(crate) fn make_pending_promise(&mut self) -> RunResult<HeapId> {
        let obj = JsObject::new(
            Some(self.realm.promise_proto),
            ObjectKind::Promise(Box::new(PromiseData::default())),
        );
        self.heap.alloc(HeapData::Object(obj))
    }

    fn promise_data_mut(&mut self, promise: HeapId) -> &mut PromiseData {
        match &mut self.heap.obj_mut(promise).kind {
            ObjectKind::Promise(data) => data,
            _ => panic!("promise operation on non-promise"),
        }
    }

    pub(crate) fn promise_state(&self, promise: HeapId) -> PromiseState {
        match &self.heap.obj(promise).kind {
            ObjectKind::Promise(data) => data.state,
            _ => panic!("promise operation on non-promise"),
        }
    }

    /// The resolve half of the resolution algorithm: adopts promises and
    /// thenables, fulfills with plain values.
    pub(crate) fn resolve_promise(&mut self, promise: HeapId, value: Value) -> RunResult<()> {
        if self.promise_state(promise) != PromiseState::Pending {
            return Ok(());
        }
        if let Some(vid) = value.object_id(&self.heap) {
            if vid == promise {
                let err = self.make_error(crate::error::ExcKind::TypeError, "Chaining cycle detected for promise")?;
                return self.settle(promise, err, true);
            }
            if matches!(self.heap.obj(vid).kind, ObjectKind::Promise(_)) {
                // adopt the inner promise's eventual state
                self.register_reaction(
                    vid,
                    Reaction::Handler {
                        on_fulfilled: None,
                        on_rejected: None,
                        derived: promise,
                    },
                );
                return Ok(());
            }
            let then = self.get_prop(value, &crate::object::Key::Str(crate::intern::StaticStrings::Then.id()))?;
            if then.is_callable(&self.heap) {
                self.jobs.push_back(Job::Thenable { promise, thenable: value, then });
                return Ok(());
            }
        }
        self.settle(promise, value, false)
    }

    pub(crate) fn reject_promise(&mut self, promise: HeapId, reason: Value) -> RunResult<()> {
        if self.promise_state(promise) != PromiseState::Pending {
            return Ok(());
        }
        self.settle(promise, reason, true)
    }

    fn settle(&mut self, promise: HeapId, value: Value, rejected: bool) -> RunResult<()> {
        let data = self.promise_data_mut(promise);
        data.state = if rejected { PromiseState::Rejected(value) } else { PromiseState::Fulfilled(value) };
        let reactions = std::mem::take(&mut data.reactions);
        for reaction in reactions {
            self.jobs.push_back(Job::Reaction { reaction, value, rejected });
        }
        Ok(())
    }

    /// Registers a reaction, firing immediately (as a microtask) when the
    /// promise is already settled.
    pub(crate) fn register_reaction(&mut self, promise: HeapId, reaction: Reaction) {
        match self.promise_state(promise) {
            PromiseState::Pending => self.promise_data_mut(promise).reactions.push(reaction),
            PromiseState::Fulfilled(value) => {
                self.jobs.push_back(Job::Reaction { reaction, value, rejected: false });
            }
            PromiseState::Rejected(value) => {
                self.jobs.push_back(Job::Reaction { reaction, value, rejected: true });
            }
        }
    }

    /// One half of a promise's resolve/reject function pair was called.
    pub(crate) fn promise_resolver_called(&mut self, promise: HeapId, reject: bool, arg: Value) -> RunResult<()> {
        if reject {
            self.reject_promise(promise, arg)
        } else {
            self.resolve_promise(promise, arg)
        }
    }

    /// `Promise.resolve(v)` semantics: passes promises through, wraps
    /// everything else.
    pub(crate) fn promise_resolve_value(&mut self, value: Value) -> RunResult<HeapId> {
        if let Some(id) = value.object_id(&self.heap)
            && matches!(self.heap.obj(id).kind, ObjectKind::Promise(_))
        {
            return Ok(id);
        }
        let p = self.make_pending_promise()?;
        self.resolve_promise(p, value)?;
        Ok(p)
    }

    /// An async function awaited `value`: park it on the (wrapped) promise.
    pub(crate) fn await_value(&mut self, value: Value, coro: CoroId) -> RunResult<()> {
        let p = self.promise_resolve_value(value)?;
        self.register_reaction(p, Reaction::ResumeCoro { coro });
        Ok(())
    }

    /// An async generator awaited `value` while `next_promise` is pending.
    pub(crate) fn await_async_generator(
        &mut self,
        r#gen: HeapId,
        machine: Box<crate::machine::Machine>,
        value: Value,
        next_promise: HeapId,
    ) -> RunResult<()> {
        // park the machine back on the generator object
        if let ObjectKind::Generator(data) = &mut self.heap.obj_mut(r#gen).kind {
            data.machine = Some(machine);
        }
        let p = self.promise_resolve_value(value)?;
        self.register_reaction(p, Reaction::ResumeAsyncGen { r#gen, next_promise });
        Ok(())
    }

    // === the microtask queue ===

    /// Drains the microtask queue to empty.
    pub(crate) fn run_jobs(&mut self) -> RunResult<()> {
        while let Some(job) = self.jobs.pop_front() {
            self.run_job(job)?;
        }
        Ok(())
    }

    fn run_job(&mut self, job: Job) -> RunResult<()> {
        match job {
            Job::Callback { func, args } => {
                self.call_sync(func, Value::Undefined, &args)?;
                Ok(())
            }
            Job::Thenable { promise, thenable, then } => {
                let resolve = self.make_resolver(promise, false)?;
                let reject = self.make_resolver(promise, true)?;
                match self.call_sync(then, thenable, &[resolve, reject]) {
                    Ok(_) => Ok(()),
                    Err(err) => {
                        if !err.is_catchable() {
                            return Err(err);
                        }
                        let reason = self.exception_value(err)?;
                        self.reject_promise(promise, reason)
                    }
                }
            }
            Job::Reaction { reaction, value, rejected } => match reaction {
                Reaction::Handler { on_fulfilled, on_rejected, derived } => {
                    let handler = if rejected { on_rejected } else { on_fulfilled };
                    match handler {
                        None => {
                            // passthrough: adopt the settled outcome
                            if rejected {
                                self.reject_promise(derived, value)
                            } else {
                                self.resolve_promise(derived, value)
                            }
                        }
                        Some(handler) => match self.call_sync(handler, Value::Undefined, &[value]) {
                            Ok(result) => self.resolve_promise(derived, result),
                            Err(err) => {
                                if !err.is_catchable() {
                                    return Err(err);
                                }
                                let reason = self.exception_value(err)?;
                                self.reject_promise(derived, reason)
                            }
                        },
                    }
                }
                Reaction::ResumeCoro { coro } => {
                    let mode = if rejected { ResumeMode::Throw(value) } else { ResumeMode::Next(value) };
                    self.drive_coroutine(coro, Some(mode))
                }
                Reaction::ResumeAsyncGen { r#gen, next_promise } => {
                    let machine = match &mut self.heap.obj_mut(r#gen).kind {
                        ObjectKind::Generator(data) => data.machine.take(),
                        _ => None,
                    };
                    let Some(machine) = machine else {
                        return Ok(());
                    };
                    let mode = if rejected { ResumeMode::Throw(value) } else { ResumeMode::Next(value) };
                    self.drive_async_generator(r#gen, machine, Some(mode), next_promise)
                }
                Reaction::ModuleDep { module } => self.module_dep_settled(module, rejected, value),
                Reaction::DynamicImport { module, result } => {
                    self.dynamic_import_settled(module, result, rejected, value)
                }
                Reaction::Combinator { kind, result, index } => {
                    self.combinator_settled(kind, result, index, rejected, value)
                }
                Reaction::Finally { callback, derived } => {
                    if callback.is_callable(&self.heap) {
                        match self.call_sync(callback, Value::Undefined, &[]) {
                            Ok(_) => {}
                            Err(err) => {
                                if !err.is_catchable() {
                                    return Err(err);
                                }
                                let reason = self.exception_value(err)?;
                                return self.reject_promise(derived, reason);
                            }
                        }
                    }
                    if rejected {
                        self.reject_promise(derived, value)
                    } else {
                        self.resolve_promise(derived, value)
                    }
                }
            },
        }
    }

    /// A `resolve` or `reject` function object for `promise`.
    pub(crate) fn make_resolver(&mut self, promise: HeapId, reject: bool) -> RunResult<Value> {
        let obj = JsObject::new(
            Some(self.realm.function_proto),
            ObjectKind::Function(crate::object::FuncKind::PromiseResolver { promise, reject }),
        );
        Ok(Value::Ref(self.heap.alloc(HeapData::Object(obj))?))
    }

    // === timers ===

    /// Runs timers due at `now` (advancing the queue clock), draining
    /// microtasks after each macrotask. Returns the number of callbacks run.
    pub(crate) fn run_due_timers(&mut self, now: f64) -> RunResult<usize> {
        self.timers.now = now;
        let mut ran = 0;
        while let Some(entry) = self.timers.pop_due(now) {
            ran += 1;
            let result = self.call_sync(entry.func, Value::Undefined, &entry.args);
            match result {
                Ok(_) => {}
                Err(err) if err.is_catchable() => {
                    // uncaught timer errors do not stop the loop
                    let _ = self.exception_value(err)?;
                }
                Err(err) => return Err(err),
            }
            if let Some(period) = entry.interval {
                self.timers.rearm(entry, period);
            }
            self.run_jobs()?;
        }
        Ok(ran)
    }
}
