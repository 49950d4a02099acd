//! Coroutines: generators and async functions.
//!
//! A generator owns a suspended [`Machine`]; `next`/`throw`/`return` resume
//! it with an injected completion and hand back `{value, done}`. An async
//! function is a coroutine whose machine runs until the first `await`, then
//! parks in the [`CoroStore`]; promise reactions resume it as microtasks.
//! Async generators compose both: each `next()` call returns a promise that
//! settles when the body reaches the next `yield` (awaiting in between).

use crate::{
    error::{RunError, RunResult},
    heap::{HeapData, HeapId},
    intern::StaticStrings,
    machine::{Exit, FrameKind, Machine, MachineKind, ResumeMode},
    module::ModuleId,
    object::{JsObject, Key, ObjectKind, Property},
    value::Value,
};

use crate::machine::Interp;

/// Generator execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GenState {
    /// Created or parked at a `yield`; the machine can be resumed.
    Suspended,
    /// Currently executing; re-entrant resumption is a TypeError.
    Running,
    /// Returned or threw; every further `next()` is `{undefined, true}`.
    Done,
}

/// The payload of a generator object.
#[derive(Debug)]
pub(crate) struct GeneratorData {
    pub state: GenState,
    /// The suspended execution; `None` while running or once done.
    pub machine: Option<Box<Machine>>,
    pub is_async: bool,
}

/// Identifies a parked async-function run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CoroId(pub u32);

/// What to do when a parked coroutine completes.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CoroDone {
    /// Settle the associated promise.
    Plain,
    /// Also mark the module evaluated (top-level await).
    Module(ModuleId),
}

#[derive(Debug)]
pub(crate) struct AsyncRun {
    pub machine: Option<Box<Machine>>,
    pub promise: HeapId,
    pub done: CoroDone,
}

/// Slab of parked async runs.
#[derive(Debug, Default)]
pub(crate) struct CoroStore {
    slots: Vec<Option<AsyncRun>>,
}

impl CoroStore {
    pub fn insert(&mut self, run: AsyncRun) -> CoroId {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(run);
                return CoroId(i as u32);
            }
        }
        self.slots.push(Some(run));
        CoroId((self.slots.len() - 1) as u32)
    }

    pub fn get_mut(&mut self, id: CoroId) -> &mut AsyncRun {
        self.slots[id.0 as usize].as_mut().expect("live coroutine")
    }

    pub fn remove(&mut self, id: CoroId) -> AsyncRun {
        self.slots[id.0 as usize].take().expect("live coroutine")
    }
}

impl Interp {
    /// Calling a generator function: seed its machine, run nothing.
    pub(crate) fn create_generator(&mut self, func_id: HeapId, this: Value, args: Vec<Value>) -> RunResult<Value> {
        let is_async = {
            let Some(crate::object::FuncKind::User(user)) = self.heap.obj(func_id).as_function() else {
                panic!("generator creation on non-user function");
            };
            self.code.func(user.func).is_async
        };
        let mut machine = Machine::empty(MachineKind::Coroutine, self.realm.global_scope);
        self.enter_frame_on(&mut machine, func_id, this, args, FrameKind::Call)?;
        let proto = self.get_prop(Value::Ref(func_id), &Key::Str(StaticStrings::Prototype.id()))?;
        let proto = proto.object_id(&self.heap).unwrap_or(if is_async {
            self.realm.async_generator_proto
        } else {
            self.realm.generator_proto
        });
        let data = GeneratorData {
            state: GenState::Suspended,
            machine: Some(Box::new(machine)),
            is_async,
        };
        let obj = JsObject::new(Some(proto), ObjectKind::Generator(Box::new(data)));
        Ok(Value::Ref(self.heap.alloc(HeapData::Object(obj))?))
    }

    /// Resumes a (sync) generator; returns `(value, done)`.
    pub(crate) fn generator_resume(&mut self, gen_id: HeapId, mode: ResumeMode) -> RunResult<(Value, bool)> {
        let (state, mut machine) = {
            let ObjectKind::Generator(data) = &mut self.heap.obj_mut(gen_id).kind else {
                return Err(self.throw_type("Generator.prototype method called on incompatible receiver"));
            };
            (data.state, data.machine.take())
        };
        match state {
            GenState::Running => Err(self.throw_type("Generator is already running")),
            GenState::Done => match mode {
                ResumeMode::Next(_) => Ok((Value::Undefined, true)),
                ResumeMode::Return(v) => Ok((v, true)),
                ResumeMode::Throw(v) => Err(RunError::Throw(v)),
            },
            GenState::Suspended => {
                let mut m = machine.take().expect("suspended generator has a machine");
                self.set_gen_state(gen_id, GenState::Running, None);
                let result = if !m.started && matches!(mode, ResumeMode::Next(_)) {
                    // freshly created machine: the body has not started and
                    // expects no injected value (nothing popped it yet)
                    self.run_machine(&mut m)
                } else if !m.started {
                    // not started: return/throw complete without running,
                    // per the generator protocol
                    match mode {
                        ResumeMode::Return(v) => {
                            self.set_gen_state(gen_id, GenState::Done, None);
                            return Ok((v, true));
                        }
                        ResumeMode::Throw(v) => {
                            self.set_gen_state(gen_id, GenState::Done, None);
                            return Err(RunError::Throw(v));
                        }
                        ResumeMode::Next(_) => unreachable!("handled above"),
                    }
                } else {
                    self.resume_machine(&mut m, mode)
                };
                match result {
                    Ok(Exit::Yield(v)) => {
                        self.set_gen_state(gen_id, GenState::Suspended, Some(m));
                        Ok((v, false))
                    }
                    Ok(Exit::Done(v)) => {
                        self.set_gen_state(gen_id, GenState::Done, None);
                        Ok((v, true))
                    }
                    Ok(Exit::Await(_)) => {
                        self.set_gen_state(gen_id, GenState::Done, None);
                        Err(self.throw_type("await is not supported in a synchronous generator"))
                    }
                    Err(e) => {
                        self.set_gen_state(gen_id, GenState::Done, None);
                        Err(e)
                    }
                }
            }
        }
    }

    fn set_gen_state(&mut self, gen_id: HeapId, state: GenState, machine: Option<Box<Machine>>) {
        if let ObjectKind::Generator(data) = &mut self.heap.obj_mut(gen_id).kind {
            data.state = state;
            data.machine = machine;
        }
    }

    /// Calling an async function: runs synchronously until the first
    /// `await`, returning the result promise.
    pub(crate) fn call_async(&mut self, func_id: HeapId, this: Value, args: Vec<Value>) -> RunResult<Value> {
        let mut machine = Machine::empty(MachineKind::Coroutine, self.realm.global_scope);
        self.enter_frame_on(&mut machine, func_id, this, args, FrameKind::Call)?;
        let promise = self.make_pending_promise()?;
        let coro = self.coros.insert(AsyncRun {
            machine: Some(Box::new(machine)),
            promise,
            done: CoroDone::Plain,
        });
        self.drive_coroutine(coro, None)?;
        Ok(Value::Ref(promise))
    }

    /// Runs a parked coroutine until it finishes or parks at another await.
    pub(crate) fn drive_coroutine(&mut self, coro: CoroId, resume: Option<ResumeMode>) -> RunResult<()> {
        let mut m = self
            .coros
            .get_mut(coro)
            .machine
            .take()
            .expect("coroutine machine parked");
        let result = match resume {
            None => self.run_machine(&mut m),
            Some(mode) => self.resume_machine(&mut m, mode),
        };
        match result {
            Ok(Exit::Done(v)) => {
                let run = self.coros.remove(coro);
                self.resolve_promise(run.promise, v)?;
                self.coroutine_done(run.done)?;
                Ok(())
            }
            Ok(Exit::Await(awaited)) => {
                self.coros.get_mut(coro).machine = Some(m);
                self.await_value(awaited, coro)?;
                Ok(())
            }
            Ok(Exit::Yield(_)) => unreachable!("async function bodies cannot yield"),
            Err(err) => {
                if !err.is_catchable() {
                    return Err(err);
                }
                let run = self.coros.remove(coro);
                let reason = self.exception_value(err)?;
                self.reject_promise(run.promise, reason)?;
                self.coroutine_done(run.done)?;
                Ok(())
            }
        }
    }

    fn coroutine_done(&mut self, done: CoroDone) -> RunResult<()> {
        match done {
            CoroDone::Plain => Ok(()),
            CoroDone::Module(module) => self.module_eval_finished(module),
        }
    }

    /// Async generator `next`/`throw`/`return`: returns a promise for the
    /// next iteration result, driving the body (and its awaits) as needed.
    pub(crate) fn async_generator_resume(&mut self, gen_id: HeapId, mode: ResumeMode) -> RunResult<Value> {
        let next_promise = self.make_pending_promise()?;
        let (state, machine) = {
            let ObjectKind::Generator(data) = &mut self.heap.obj_mut(gen_id).kind else {
                return Err(self.throw_type("AsyncGenerator method called on incompatible receiver"));
            };
            (data.state, data.machine.take())
        };
        match state {
            GenState::Running => {
                return Err(self.throw_type("AsyncGenerator is already running"));
            }
            GenState::Done => {
                let result = match mode {
                    ResumeMode::Next(_) => self.make_iter_result(Value::Undefined, true)?,
                    ResumeMode::Return(v) => self.make_iter_result(v, true)?,
                    ResumeMode::Throw(v) => {
                        self.reject_promise(next_promise, v)?;
                        return Ok(Value::Ref(next_promise));
                    }
                };
                self.resolve_promise(next_promise, result)?;
                return Ok(Value::Ref(next_promise));
            }
            GenState::Suspended => {
                let m = machine.expect("suspended async generator has a machine");
                self.set_gen_state(gen_id, GenState::Running, None);
                self.drive_async_generator(gen_id, m, Some(mode), next_promise)?;
            }
        }
        Ok(Value::Ref(next_promise))
    }

    pub(crate) fn drive_async_generator(
        &mut self,
        gen_id: HeapId,
        mut m: Box<Machine>,
        resume: Option<ResumeMode>,
        next_promise: HeapId,
    ) -> RunResult<()> {
        let fresh = !m.started;
        let result = match resume {
            None => self.run_machine(&mut m),
            Some(ResumeMode::Next(_)) if fresh => self.run_machine(&mut m),
            Some(mode) => self.resume_machine(&mut m, mode),
        };
        match result {
            Ok(Exit::Yield(v)) => {
                self.set_gen_state(gen_id, GenState::Suspended, Some(m));
                let result = self.make_iter_result(v, false)?;
                self.resolve_promise(next_promise, result)
            }
            Ok(Exit::Done(v)) => {
                self.set_gen_state(gen_id, GenState::Done, None);
                let result = self.make_iter_result(v, true)?;
                self.resolve_promise(next_promise, result)
            }
            Ok(Exit::Await(awaited)) => {
                // park: the settled value resumes the generator body, still
                // targeting the same pending next()-promise
                self.await_async_generator(gen_id, m, awaited, next_promise)
            }
            Err(err) => {
                if !err.is_catchable() {
                    return Err(err);
                }
                self.set_gen_state(gen_id, GenState::Done, None);
                let reason = self.exception_value(err)?;
                self.reject_promise(next_promise, reason)
            }
        }
    }

    /// `{value, done}` object.
    pub(crate) fn make_iter_result(&mut self, value: Value, done: bool) -> RunResult<Value> {
        let mut obj = JsObject::ordinary(self.realm.object_proto);
        obj.define(Key::Str(StaticStrings::Value.id()), Property::data(value));
        obj.define(Key::Str(StaticStrings::Done.id()), Property::data(Value::Bool(done)));
        Ok(Value::Ref(self.heap.alloc(HeapData::Object(obj))?))
    }
}
