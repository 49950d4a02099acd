//! The public embedding interface.
//!
//! An [`Interpreter`] owns one realm (global object plus intrinsics) and all
//! execution state. Hosts submit source with [`Interpreter::eval`] (the
//! completion value of the last expression) or [`Interpreter::eval_async`]
//! (runs, drains the microtask queue, settles). Module hosting happens
//! through the registered resolver and loader callbacks; timers fire when
//! the host pumps [`Interpreter::run_timers`].

use num_bigint::BigInt;
use rand::SeedableRng;

use crate::{
    error::{ExcKind, Exception, RunError},
    heap::{Heap, HeapData, HeapStats, HeapId},
    intern::{Interns, StaticStrings},
    io::{PrintWriter, StdPrint},
    jobs::PromiseState,
    machine::{Exit, Frame, FrameKind, Interp, Machine, MachineKind, Step, StmtListRef},
    module::{ModuleRegistry, ModuleStatus},
    object::{Key, ObjectKind, Property},
    parser,
    realm,
    resource::{ResourceLimits, Tracker},
    value::Value,
};

/// Host-facing resolver: `(specifier, importer) -> module id`.
pub type ModuleResolver = dyn Fn(&str, Option<&str>) -> Result<String, String>;
/// Host-facing loader: `module id -> source text`.
pub type ModuleLoader = dyn FnMut(&str) -> Result<String, String>;

/// A JavaScript value exported across the embedding boundary.
///
/// Owns all its data; structures are copied out of the interpreter heap
/// (cycles render as [`JsValue::Repr`] markers). This is the public analogue
/// of the internal tagged value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(BigInt),
    String(String),
    /// A symbol, by description.
    Symbol(Option<String>),
    Array(Vec<JsValue>),
    /// Plain-object contents in insertion order.
    Object(Vec<(String, JsValue)>),
    /// A function, by name.
    Function(String),
    /// Values with no structural mapping (dates, regexes, promises, ...)
    /// render as their display string.
    Repr(String),
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// An embeddable ECMAScript interpreter owning one realm.
///
/// # Example
/// ```
/// use jormun::{Interpreter, JsValue};
///
/// let mut interp = Interpreter::new();
/// let v = interp.eval("2 ** 10").unwrap();
/// assert_eq!(v, JsValue::Number(1024.0));
/// ```
pub struct Interpreter {
    interp: Interp,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter with no resource limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(ResourceLimits::default())
    }

    /// An interpreter with the given resource limits applied.
    #[must_use]
    pub fn with_limits(limits: ResourceLimits) -> Self {
        let mut heap = Heap::new(Tracker::new(limits));
        let mut interns = Interns::new();
        let realm = realm::create(&mut heap, &mut interns).expect("realm construction cannot exceed fresh limits");
        let mut interp = Interp {
            heap,
            interns,
            code: crate::ast::CodeStore::default(),
            programs: Vec::new(),
            realm,
            jobs: std::collections::VecDeque::new(),
            timers: crate::jobs::TimerQueue::default(),
            modules: ModuleRegistry::default(),
            coros: crate::coroutine::CoroStore::default(),
            print: Box::new(StdPrint),
            rng: rand_chacha::ChaCha8Rng::seed_from_u64(0x6a6f726d756e),
            nested_depth: 0,
        };
        interp.timers.now = chrono::Utc::now().timestamp_millis() as f64;
        Self { interp }
    }

    /// Redirects `console` output.
    pub fn set_print_writer(&mut self, writer: Box<dyn PrintWriter>) {
        self.interp.print = writer;
    }

    /// Registers the module resolver callback.
    pub fn set_module_resolver(&mut self, resolver: impl Fn(&str, Option<&str>) -> Result<String, String> + 'static) {
        self.interp.modules.resolver = Some(Box::new(resolver));
    }

    /// Registers the module source loader callback.
    pub fn set_module_loader(&mut self, loader: impl FnMut(&str) -> Result<String, String> + 'static) {
        self.interp.modules.loader = Some(Box::new(loader));
    }

    /// Evaluates a script synchronously, returning the completion value of
    /// its last expression. Microtasks queued by the script stay queued.
    pub fn eval(&mut self, source: &str) -> Result<JsValue, Exception> {
        let value = self.run_script(source)?;
        let out = self.to_public(value);
        Ok(out)
    }

    /// Evaluates a script, then drains the microtask queue. A promise
    /// completion value is unwrapped once settled (a rejection surfaces as
    /// the exception).
    pub fn eval_async(&mut self, source: &str) -> Result<JsValue, Exception> {
        let value = self.run_script(source)?;
        self.drain_jobs()?;
        let value = self.settle(value)?;
        Ok(self.to_public(value))
    }

    /// Loads, links, evaluates, and caches a module; microtasks drain so
    /// top-level await can finish.
    pub fn preload_module(&mut self, specifier: &str) -> Result<(), Exception> {
        let result = self
            .interp
            .load_module(specifier, None)
            .and_then(|id| self.interp.evaluate_module(id).map(|p| (id, p)));
        let (id, _promise) = match result {
            Ok(v) => v,
            Err(err) => return Err(self.to_exception(err)),
        };
        self.drain_jobs()?;
        match self.interp.modules.get(id).status {
            ModuleStatus::Failed => {
                let reason = self.interp.modules.get(id).failure.unwrap_or(Value::Undefined);
                Err(self.value_to_exception(reason))
            }
            _ => Ok(()),
        }
    }

    /// Runs timers due at `now_ms` (milliseconds since the epoch), draining
    /// microtasks after each callback. Returns the number of callbacks run.
    pub fn run_timers(&mut self, now_ms: f64) -> Result<usize, Exception> {
        self.interp.run_due_timers(now_ms).map_err(|e| self.to_exception(e))
    }

    /// Whether timers remain scheduled.
    #[must_use]
    pub fn has_pending_timers(&self) -> bool {
        !self.interp.timers.is_empty()
    }

    /// A snapshot of heap usage.
    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.interp.heap.stats(self.interp.interns.dynamic_count())
    }

    // === internals ===

    fn run_script(&mut self, source: &str) -> Result<Value, Exception> {
        let info = parser::parse_program(source, false, &mut self.interp.code, &mut self.interp.interns)
            .map_err(Exception::from)?;
        let strict = info.strict;
        let var_names = info.var_names.clone();
        let fn_decls = info.fn_decls.clone();
        let lex = info.lex.clone();
        let program = self.interp.add_program(info);
        self.hoist_script(&var_names, &fn_decls, &lex).map_err(|e| self.to_exception(e))?;
        let mut machine = Machine::empty(MachineKind::Script, self.interp.realm.global_scope);
        machine.frames.push(Frame {
            ctrl_base: 0,
            vals_base: 0,
            caller_env: self.interp.realm.global_scope,
            func: None,
            strict,
            kind: FrameKind::Script,
            loc: crate::error::CodeLoc { line: 1, column: 1 },
        });
        machine.ctrl.push(Step::Seq { list: StmtListRef::Program(program), idx: 0 });
        match self.interp.run_machine(&mut machine) {
            Ok(Exit::Done(v)) => Ok(v),
            Ok(_) => unreachable!("script machines cannot suspend"),
            Err(err) => Err(self.to_exception(err)),
        }
    }

    /// Script-level hoisting: `var` and function declarations become global
    /// object properties; lexical declarations live on the global scope and
    /// persist across evals.
    fn hoist_script(
        &mut self,
        var_names: &[crate::intern::StringId],
        fn_decls: &[(crate::intern::StringId, crate::intern::FuncId)],
        lex: &[crate::ast::LexDecl],
    ) -> Result<(), RunError> {
        let global = self.interp.realm.global_obj;
        for name in var_names {
            if !self.interp.heap.obj(global).has_own(&Key::Str(*name)) {
                self.interp.heap.obj_mut(global).define(Key::Str(*name), Property::data(Value::Undefined));
            }
        }
        for (name, func) in fn_decls {
            let closure = self.interp.make_closure(*func, self.interp.realm.global_scope, Some(*name))?;
            self.interp.heap.obj_mut(global).define(Key::Str(*name), Property::data(closure));
        }
        for decl in lex {
            let binding = if decl.is_const {
                crate::env::Binding::uninit_const()
            } else {
                crate::env::Binding::uninit_let()
            };
            let scope = self.interp.realm.global_scope;
            self.interp.heap.scope_mut(scope).bindings.insert(decl.name, binding);
        }
        Ok(())
    }

    fn drain_jobs(&mut self) -> Result<(), Exception> {
        self.interp.run_jobs().map_err(|e| self.to_exception(e))
    }

    /// Unwraps a settled promise completion value.
    fn settle(&mut self, value: Value) -> Result<Value, Exception> {
        if let Some(id) = value.object_id(&self.interp.heap)
            && matches!(self.interp.heap.obj(id).kind, ObjectKind::Promise(_))
        {
            return match self.interp.promise_state(id) {
                PromiseState::Fulfilled(v) => Ok(v),
                PromiseState::Rejected(reason) => Err(self.value_to_exception(reason)),
                PromiseState::Pending => Ok(Value::Undefined),
            };
        }
        Ok(value)
    }

    fn to_exception(&mut self, err: RunError) -> Exception {
        match err {
            RunError::Resource(e) => Exception::resource(e),
            RunError::Simple(simple) => Exception::new(Some(simple.kind), simple.message),
            RunError::Throw(v) => self.value_to_exception(v),
        }
    }

    fn value_to_exception(&mut self, v: Value) -> Exception {
        if let Some(id) = v.object_id(&self.interp.heap)
            && let ObjectKind::Error { kind } = self.interp.heap.obj(id).kind
        {
            let message = self
                .interp
                .get_prop(v, &Key::Str(StaticStrings::Message.id()))
                .ok()
                .and_then(|m| if matches!(m, Value::Undefined) { None } else { Some(m) })
                .and_then(|m| self.interp.to_string_rust(m).ok())
                .unwrap_or_default();
            return Exception::new(Some(kind), message);
        }
        let message = self
            .interp
            .to_string_rust(v)
            .unwrap_or_else(|_| "exception while stringifying thrown value".to_owned());
        Exception::new(None, message)
    }

    fn to_public(&mut self, v: Value) -> JsValue {
        let mut seen = Vec::new();
        self.to_public_inner(v, &mut seen)
    }

    fn to_public_inner(&mut self, v: Value, seen: &mut Vec<HeapId>) -> JsValue {
        match v {
            Value::Undefined => JsValue::Undefined,
            Value::Null => JsValue::Null,
            Value::Bool(b) => JsValue::Bool(b),
            Value::Number(n) => JsValue::Number(n),
            Value::InternString(id) => JsValue::String(self.interp.interns.str(id).to_owned()),
            Value::Symbol(sym) => JsValue::Symbol(self.interp.interns.symbol(sym).description.clone()),
            Value::Ref(id) => match self.interp.heap.get(id) {
                HeapData::Str(s) => JsValue::String(s.clone()),
                HeapData::BigInt(b) => JsValue::BigInt(b.clone()),
                HeapData::Scope(_) => JsValue::Repr("[scope]".to_owned()),
                HeapData::Object(obj) => {
                    if seen.contains(&id) {
                        return JsValue::Repr("[Circular]".to_owned());
                    }
                    match &obj.kind {
                        ObjectKind::Array { length } => {
                            let length = *length;
                            seen.push(id);
                            let mut out = Vec::with_capacity(length as usize);
                            for i in 0..length {
                                let item = self
                                    .interp
                                    .get_prop(v, &Key::Index(i))
                                    .unwrap_or(Value::Undefined);
                                out.push(self.to_public_inner(item, seen));
                            }
                            seen.pop();
                            JsValue::Array(out)
                        }
                        ObjectKind::Function(_) => {
                            let name = self
                                .interp
                                .get_prop(v, &Key::Str(StaticStrings::Name.id()))
                                .ok()
                                .and_then(|n| self.interp.to_string_rust(n).ok())
                                .unwrap_or_default();
                            JsValue::Function(name)
                        }
                        ObjectKind::Ordinary
                        | ObjectKind::Arguments { .. }
                        | ObjectKind::Error { .. } => {
                            seen.push(id);
                            let keys = self.interp.own_enumerable_keys(id);
                            let mut out = Vec::with_capacity(keys.len());
                            for key in keys {
                                let name = key.render(&self.interp.interns);
                                let item = self.interp.get_prop(v, &key).unwrap_or(Value::Undefined);
                                out.push((name, self.to_public_inner(item, seen)));
                            }
                            seen.pop();
                            JsValue::Object(out)
                        }
                        _ => {
                            let repr = self
                                .interp
                                .to_string_rust(v)
                                .unwrap_or_else(|_| "[object]".to_owned());
                            JsValue::Repr(repr)
                        }
                    }
                }
            },
        }
    }
}
