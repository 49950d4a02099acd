//! Calls: argument collection, frame entry, parameter binding, `new`
//! construction, `super(...)`, tail-call frame reuse, and the synchronous
//! nested-machine entry point built-ins use for callbacks.

use super::{Exit, Flow, Frame, FrameKind, Interp, Machine, MachineKind, Step};
use crate::{
    ast::{Arg, FuncBody, Pat},
    env::{Binding, FnScopeData, Scope, ScopeKind, ThisState},
    error::{RunError, RunResult},
    heap::{HeapData, HeapId},
    intern::{FuncId, StaticStrings, StringId, WellKnown},
    object::{
        BoundFunc, CtorKind, FuncKind, JsObject, Key, ObjectKind, Property, ThisMode, UserFunc,
    },
    value::Value,
};

/// Host-recursion cap for nested machines (getters, callbacks, iterator
/// protocol). Each nesting level costs real Rust stack.
const MAX_NESTED_MACHINES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Call,
    New,
    Super,
}

/// Argument-collection step: evaluates arguments left to right (expanding
/// spreads), then performs the call.
#[derive(Debug)]
pub(crate) struct CallStep {
    pub args: Vec<Arg>,
    pub idx: usize,
    pub collected: Vec<Value>,
    pub kind: CallKind,
    pub optional: bool,
    pub tail: bool,
    /// An argument value is pending on the operand stack.
    pub waiting: bool,
}

impl CallStep {
    pub fn new(args: Vec<Arg>, kind: CallKind, optional: bool, tail: bool) -> Self {
        let cap = args.len();
        Self {
            args,
            idx: 0,
            collected: Vec::with_capacity(cap),
            kind,
            optional,
            tail,
            waiting: false,
        }
    }

    /// A call step with pre-collected leading arguments (tagged templates).
    pub fn with_prefix(prefix: Vec<Value>, args: Vec<Arg>, kind: CallKind) -> Self {
        let mut step = Self::new(args, kind, false, false);
        step.collected = prefix;
        step
    }
}

impl Interp {
    pub(crate) fn step_call_args(&mut self, m: &mut Machine, mut step: Box<CallStep>) -> RunResult<Flow> {
        if step.waiting {
            step.waiting = false;
            let v = m.pop();
            match step.args[step.idx - 1] {
                Arg::Item(_) => step.collected.push(v),
                Arg::Spread(_) => {
                    let items = self.iter_collect(v)?;
                    step.collected.extend(items);
                }
            }
        }
        if step.idx < step.args.len() {
            let expr = match step.args[step.idx] {
                Arg::Item(e) | Arg::Spread(e) => e,
            };
            step.idx += 1;
            step.waiting = true;
            m.ctrl.push(Step::CallArgs(step));
            m.ctrl.push(Step::Eval(expr));
            return Ok(Flow::More);
        }
        let CallStep { collected, kind, optional, tail, .. } = *step;
        match kind {
            CallKind::Call => {
                let func = m.pop();
                let this = m.pop();
                if optional && func.is_nullish() {
                    self.chain_short_circuit(m);
                    return Ok(Flow::More);
                }
                self.do_call(m, func, this, collected, tail)
            }
            CallKind::New => {
                let func = m.pop();
                self.do_construct(m, func, collected)
            }
            CallKind::Super => self.do_super_call(m, collected),
        }
    }

    /// Performs a call on the current machine.
    pub(crate) fn do_call(
        &mut self,
        m: &mut Machine,
        func: Value,
        this: Value,
        args: Vec<Value>,
        tail: bool,
    ) -> RunResult<Flow> {
        let Some(func_id) = func.object_id(&self.heap) else {
            return Err(self.not_a_function(func));
        };
        let Some(kind) = self.heap.obj(func_id).as_function() else {
            return Err(self.not_a_function(func));
        };
        match kind {
            FuncKind::Native(nf) => {
                let nf = *nf;
                let result = self.call_native(nf, this, &args)?;
                m.push(result);
                Ok(Flow::More)
            }
            FuncKind::PromiseResolver { promise, reject } => {
                let (promise, reject) = (*promise, *reject);
                let arg = args.first().copied().unwrap_or(Value::Undefined);
                self.promise_resolver_called(promise, reject, arg)?;
                m.push(Value::Undefined);
                Ok(Flow::More)
            }
            FuncKind::Bound(b) => {
                let target = Value::Ref(b.target);
                let bound_this = b.this;
                let mut full_args = b.args.clone();
                full_args.extend(args);
                self.do_call(m, target, bound_this, full_args, false)
            }
            FuncKind::User(user) => {
                if user.ctor != CtorKind::None {
                    return Err(self.throw_type("Class constructor cannot be invoked without 'new'"));
                }
                let def = self.code.func(user.func);
                if def.is_generator {
                    let r#gen = self.create_generator(func_id, this, args)?;
                    m.push(r#gen);
                    return Ok(Flow::More);
                }
                if def.is_async {
                    let promise = self.call_async(func_id, this, args)?;
                    m.push(promise);
                    return Ok(Flow::More);
                }
                let strict_callee = def.is_strict;
                // strict-mode proper tail call: reuse the caller's frame
                if tail
                    && strict_callee
                    && matches!(m.frame().kind, FrameKind::Call)
                {
                    let frame = m.frame();
                    let (ctrl_base, vals_base) = (frame.ctrl_base, frame.vals_base);
                    m.ctrl.truncate(ctrl_base);
                    m.vals.truncate(vals_base);
                    m.frames.pop();
                    self.enter_frame_on(m, func_id, this, args, FrameKind::Call)?;
                    return Ok(Flow::More);
                }
                self.enter_frame_on(m, func_id, this, args, FrameKind::Call)?;
                Ok(Flow::More)
            }
        }
    }

    fn not_a_function(&mut self, func: Value) -> RunError {
        self.throw_type(format!("{} is not a function", func.type_of(&self.heap)))
    }

    /// `new F(...)`.
    pub(crate) fn do_construct(&mut self, m: &mut Machine, func: Value, args: Vec<Value>) -> RunResult<Flow> {
        let Some(func_id) = func.object_id(&self.heap) else {
            return Err(self.not_a_constructor(func));
        };
        let Some(kind) = self.heap.obj(func_id).as_function() else {
            return Err(self.not_a_constructor(func));
        };
        match kind {
            FuncKind::Native(nf) => {
                let nf = *nf;
                let result = self.construct_native(nf, &args, func)?;
                m.push(result);
                Ok(Flow::More)
            }
            FuncKind::PromiseResolver { .. } => Err(self.not_a_constructor(func)),
            FuncKind::Bound(b) => {
                let target = Value::Ref(b.target);
                let mut full_args = b.args.clone();
                full_args.extend(args);
                self.do_construct(m, target, full_args)
            }
            FuncKind::User(user) => {
                let def = self.code.func(user.func);
                if def.is_arrow || def.is_async || def.is_generator {
                    return Err(self.not_a_constructor(func));
                }
                let derived = user.ctor == CtorKind::Derived;
                let proto = self.ctor_prototype(func)?;
                if derived {
                    // `this` is created by the base constructor via super()
                    self.enter_frame_on(m, func_id, Value::Undefined, args, FrameKind::ConstructDerived)?;
                } else {
                    let obj = JsObject::new(Some(proto), ObjectKind::Ordinary);
                    let this = self.heap.alloc(HeapData::Object(obj))?;
                    self.enter_frame_on(m, func_id, Value::Ref(this), args, FrameKind::Construct { this })?;
                }
                Ok(Flow::More)
            }
        }
    }

    fn not_a_constructor(&mut self, func: Value) -> RunError {
        self.throw_type(format!("{} is not a constructor", func.type_of(&self.heap)))
    }

    /// The new object's prototype: `F.prototype` if it is an object, else
    /// the intrinsic object prototype.
    fn ctor_prototype(&mut self, func: Value) -> RunResult<HeapId> {
        let proto = self.get_prop(func, &Key::Str(StaticStrings::Prototype.id()))?;
        Ok(match proto.object_id(&self.heap) {
            Some(id) => id,
            None => self.realm.object_proto,
        })
    }

    /// `super(...)` inside a derived constructor.
    fn do_super_call(&mut self, m: &mut Machine, args: Vec<Value>) -> RunResult<Flow> {
        let fn_scope = self
            .fn_scope_of(m.env)
            .ok_or_else(|| RunError::syntax_err("'super' keyword unexpected here"))?;
        let data = self.heap.scope(fn_scope).fn_data().expect("fn scope");
        if matches!(data.this, ThisState::Bound(_)) {
            return Err(RunError::reference_err("Super constructor may only be called once"));
        }
        let func_obj = data
            .func_obj
            .ok_or_else(|| RunError::syntax_err("'super' keyword unexpected here"))?;
        let new_target = data.new_target;
        let parent = self
            .heap
            .obj(func_obj)
            .proto
            .ok_or_else(|| self.throw_type("Super constructor is not a constructor"))?;
        let parent_val = Value::Ref(parent);
        if !parent_val.is_callable(&self.heap) {
            return Err(self.throw_type("Super constructor is not a constructor"));
        }
        // the instance prototype comes from the original new.target
        let proto = self.ctor_prototype(new_target)?;
        m.ctrl.push(Step::SuperBind);
        let parent_kind = self.heap.obj(parent).as_function().expect("callable checked");
        match parent_kind {
            FuncKind::Native(nf) => {
                let nf = *nf;
                let result = self.construct_native(nf, &args, new_target)?;
                m.push(result);
                Ok(Flow::More)
            }
            FuncKind::User(user) => {
                let def = self.code.func(user.func);
                if def.is_arrow || def.is_async || def.is_generator {
                    return Err(self.throw_type("Super constructor is not a constructor"));
                }
                if user.ctor == CtorKind::Derived {
                    self.enter_frame_on(m, parent, Value::Undefined, args, FrameKind::ConstructDerived)?;
                } else {
                    let obj = JsObject::new(Some(proto), ObjectKind::Ordinary);
                    let this = self.heap.alloc(HeapData::Object(obj))?;
                    self.enter_frame_on(m, parent, Value::Ref(this), args, FrameKind::Construct { this })?;
                }
                // new.target inside the parent constructor is the originally
                // constructed class, not the parent
                if let Some(data) = self.heap.scope_mut(m.env).fn_data_mut() {
                    data.new_target = new_target;
                }
                Ok(Flow::More)
            }
            _ => Err(self.throw_type("Super constructor is not a constructor")),
        }
    }

    /// After `super(...)` produced the instance: bind `this` and install the
    /// running (derived) class's instance fields.
    pub(crate) fn step_super_bind(&mut self, m: &mut Machine) -> RunResult<Flow> {
        let instance = m.peek_val();
        let fn_scope = self.fn_scope_of(m.env).expect("derived ctor has fn scope");
        let data = self.heap.scope_mut(fn_scope).fn_data_mut().expect("fn scope");
        data.this = ThisState::Bound(instance);
        let func_obj = data.func_obj.expect("derived ctor scope");
        let class_data = match self.heap.obj(func_obj).as_function() {
            Some(FuncKind::User(user)) => user.class_data.clone(),
            _ => None,
        };
        if let Some(class_data) = class_data {
            self.install_instance_fields(instance, &class_data.fields)?;
        }
        Ok(Flow::More)
    }

    // === frame entry ===

    /// Pushes a call frame for a user function onto `m` and seeds parameter
    /// binding plus the body.
    pub(crate) fn enter_frame_on(
        &mut self,
        m: &mut Machine,
        func_id: HeapId,
        this: Value,
        args: Vec<Value>,
        kind: FrameKind,
    ) -> RunResult<()> {
        self.heap.tracker.check_depth(m.frames.len() + self.nested_depth)?;
        let Some(FuncKind::User(user)) = self.heap.obj(func_id).as_function() else {
            panic!("enter_frame_on requires a user function");
        };
        let user = user.clone();
        let def = self.code.func(user.func);
        let (is_arrow, strict, loc) = (def.is_arrow, def.is_strict, def.loc);
        let params: Vec<_> = def.params.clone();
        let rest = def.rest;
        let body_expr = match &def.body {
            FuncBody::Expr(e) => Some(*e),
            FuncBody::Block(_) => None,
        };
        let simple_params = def.simple_params;
        let var_names = def.var_names.clone();
        let fn_decls = def.fn_decls.clone();
        let lex = def.lex.clone();

        // the function scope
        let scope = if is_arrow {
            // arrows capture this/new.target/arguments lexically
            Scope::new(Some(user.env), ScopeKind::Block)
        } else {
            let this_state = match kind {
                FrameKind::ConstructDerived => ThisState::Uninitialized,
                FrameKind::Construct { this } => ThisState::Bound(Value::Ref(this)),
                _ => match user.this_mode {
                    ThisMode::Lexical => unreachable!("arrow handled above"),
                    ThisMode::Strict => ThisState::Bound(this),
                    ThisMode::Global => {
                        let resolved = if this.is_nullish() {
                            Value::Ref(self.realm.global_obj)
                        } else if this.object_id(&self.heap).is_some() {
                            this
                        } else {
                            self.to_object(this)?
                        };
                        ThisState::Bound(resolved)
                    }
                },
            };
            let new_target = match kind {
                FrameKind::Construct { .. } | FrameKind::ConstructDerived => {
                    // new.target defaults to the constructor itself; super()
                    // entry overrides it below through the scope data
                    Value::Ref(func_id)
                }
                _ => Value::Undefined,
            };
            let mut data = FnScopeData::new(this_state, new_target);
            data.home_object = user.home_object;
            data.func_obj = Some(func_id);
            Scope::new(Some(user.env), ScopeKind::Function(data))
        };
        let scope = self.heap.alloc(HeapData::Scope(scope))?;

        // declare parameters
        let mut param_names = Vec::new();
        for &pat in &params {
            collect_bound_names(&self.code, pat, &mut param_names);
        }
        if let Some(rest) = rest {
            collect_bound_names(&self.code, rest, &mut param_names);
        }
        for name in &param_names {
            self.heap.scope_mut(scope).bindings.insert(*name, Binding::var(Value::Undefined));
        }

        // the arguments object
        if !is_arrow {
            let mapped = if simple_params && !strict {
                params
                    .iter()
                    .map(|&p| match self.code.pat(p) {
                        Pat::Ident(name) => Some(*name),
                        _ => None,
                    })
                    .collect()
            } else {
                Vec::new()
            };
            let arguments = self.make_arguments_object(scope, mapped, &args, func_id, strict)?;
            self.heap.scope_mut(scope).bindings.insert(
                StaticStrings::Arguments.id(),
                Binding::var(arguments),
            );
            if let Some(data) = self.heap.scope_mut(scope).fn_data_mut() {
                data.arguments = Some(arguments);
            }
        }

        // frame bookkeeping before seeding steps
        let frame = Frame {
            ctrl_base: m.ctrl.len(),
            vals_base: m.vals.len(),
            caller_env: m.env,
            func: Some(func_id),
            strict,
            kind,
            loc,
        };
        m.frames.push(frame);
        m.env = scope;

        // body
        if let Some(expr) = body_expr {
            m.ctrl.push(Step::ReturnVal);
            m.ctrl.push(Step::Eval(expr));
        } else {
            m.ctrl.push(Step::Seq {
                list: super::StmtListRef::FnBody(user.func),
                idx: 0,
            });
        }

        // parameter binding: simple identifiers bind eagerly; patterns and
        // defaults run as steps (pushed in reverse so they run in order)
        let mut deferred: Vec<(crate::ast::PatId, Value)> = Vec::new();
        for (i, &pat) in params.iter().enumerate() {
            let arg = args.get(i).copied().unwrap_or(Value::Undefined);
            if let Pat::Ident(name) = self.code.pat(pat) {
                let name = *name;
                self.heap.scope_mut(scope).bindings.insert(name, Binding::var(arg));
            } else {
                deferred.push((pat, arg));
            }
        }
        if let Some(rest_pat) = rest {
            let rest_args: Vec<Value> = args.iter().skip(params.len()).copied().collect();
            let rest_array = self.make_array(rest_args)?;
            if let Pat::Ident(name) = self.code.pat(rest_pat) {
                let name = *name;
                self.heap.scope_mut(scope).bindings.insert(name, Binding::var(rest_array));
            } else {
                deferred.push((rest_pat, rest_array));
            }
        }
        for (pat, value) in deferred.into_iter().rev() {
            m.ctrl.push(Step::BindPat {
                pat,
                mode: super::BindMode::Var,
            });
            m.ctrl.push(Step::Push(value));
        }

        // var hoisting (params keep their values)
        for name in var_names {
            if !self.heap.scope(scope).bindings.contains_key(&name) {
                self.heap.scope_mut(scope).bindings.insert(name, Binding::var(Value::Undefined));
            }
        }
        // hoisted function declarations
        for (name, func) in fn_decls {
            let closure = self.make_closure(func, scope, Some(name))?;
            self.heap.scope_mut(scope).bindings.insert(name, Binding::var(closure));
        }
        // top-level lexical declarations (TDZ)
        for decl in lex {
            let binding = if decl.is_const { Binding::uninit_const() } else { Binding::uninit_let() };
            self.heap.scope_mut(scope).bindings.insert(decl.name, binding);
        }

        // base-class constructors install instance fields before the body
        if user.ctor == CtorKind::Base
            && let FrameKind::Construct { this } = kind
            && let Some(class_data) = &user.class_data
        {
            self.install_instance_fields(Value::Ref(this), &class_data.fields)?;
        }
        Ok(())
    }

    /// Synchronous call used by built-ins for callbacks, getters, and the
    /// iterator protocol. Runs user functions on a nested machine.
    pub(crate) fn call_sync(&mut self, func: Value, this: Value, args: &[Value]) -> RunResult<Value> {
        let Some(func_id) = func.object_id(&self.heap) else {
            return Err(self.not_a_function(func));
        };
        let Some(kind) = self.heap.obj(func_id).as_function() else {
            return Err(self.not_a_function(func));
        };
        match kind {
            FuncKind::Native(nf) => {
                let nf = *nf;
                self.call_native(nf, this, args)
            }
            FuncKind::PromiseResolver { promise, reject } => {
                let (promise, reject) = (*promise, *reject);
                let arg = args.first().copied().unwrap_or(Value::Undefined);
                self.promise_resolver_called(promise, reject, arg)?;
                Ok(Value::Undefined)
            }
            FuncKind::Bound(b) => {
                let target = Value::Ref(b.target);
                let bound_this = b.this;
                let mut full_args = b.args.clone();
                full_args.extend_from_slice(args);
                self.call_sync(target, bound_this, &full_args)
            }
            FuncKind::User(user) => {
                if user.ctor != CtorKind::None {
                    return Err(self.throw_type("Class constructor cannot be invoked without 'new'"));
                }
                let def = self.code.func(user.func);
                if def.is_generator {
                    return self.create_generator(func_id, this, args.to_vec());
                }
                if def.is_async {
                    return self.call_async(func_id, this, args.to_vec());
                }
                self.run_nested(func_id, this, args.to_vec(), FrameKind::Call)
            }
        }
    }

    /// Constructs on a nested machine (used by `Reflect`-free built-ins like
    /// `Array.from(..., mapFn)` subclassing is out of scope, so this only
    /// services user classes constructed from native code).
    pub(crate) fn construct_sync(&mut self, func: Value, args: &[Value]) -> RunResult<Value> {
        let mut m = Machine::empty(MachineKind::Coroutine, self.realm.global_scope);
        self.enter_nested(|interp| {
            interp.do_construct(&mut m, func, args.to_vec())?;
            match interp.run_machine(&mut m)? {
                Exit::Done(v) => Ok(v),
                _ => unreachable!("construct cannot suspend"),
            }
        })
    }

    fn run_nested(&mut self, func_id: HeapId, this: Value, args: Vec<Value>, kind: FrameKind) -> RunResult<Value> {
        let mut m = Machine::empty(MachineKind::Coroutine, self.realm.global_scope);
        self.enter_nested(|interp| {
            interp.enter_frame_on(&mut m, func_id, this, args, kind)?;
            match interp.run_machine(&mut m)? {
                Exit::Done(v) => Ok(v),
                _ => unreachable!("sync function cannot suspend"),
            }
        })
    }

    fn enter_nested<T>(&mut self, f: impl FnOnce(&mut Self) -> RunResult<T>) -> RunResult<T> {
        if self.nested_depth >= MAX_NESTED_MACHINES {
            return Err(RunError::range_err("Maximum call stack size exceeded"));
        }
        self.nested_depth += 1;
        let result = f(self);
        self.nested_depth -= 1;
        result
    }

    // === object construction helpers ===

    /// Creates a closure object for a function definition.
    pub(crate) fn make_closure(&mut self, func: FuncId, env: HeapId, name_hint: Option<StringId>) -> RunResult<Value> {
        let def = self.code.func(func);
        let (is_arrow, is_generator, is_async, is_strict) = (def.is_arrow, def.is_generator, def.is_async, def.is_strict);
        let name = def.name.or(name_hint);
        let length = def
            .params
            .iter()
            .take_while(|&&p| !matches!(self.code.pat(p), Pat::Default { .. }))
            .count();
        let user = UserFunc {
            func,
            env,
            home_object: None,
            this_mode: if is_arrow {
                ThisMode::Lexical
            } else if is_strict {
                ThisMode::Strict
            } else {
                ThisMode::Global
            },
            ctor: CtorKind::None,
            class_data: None,
        };
        let mut obj = JsObject::new(
            Some(self.realm.function_proto),
            ObjectKind::Function(FuncKind::User(Box::new(user))),
        );
        let name_val = match name {
            Some(id) => Value::InternString(id),
            None => Value::InternString(StaticStrings::Empty.id()),
        };
        obj.define(Key::Str(StaticStrings::Name.id()), Property::method_ro(name_val));
        obj.define(
            Key::Str(StaticStrings::Length.id()),
            Property::method_ro(Value::Number(length as f64)),
        );
        let func_obj = self.heap.alloc(HeapData::Object(obj))?;
        // ordinary functions and generators get a `prototype` object
        if !is_arrow && !is_async {
            if is_generator {
                let proto = JsObject::new(Some(self.realm.generator_proto), ObjectKind::Ordinary);
                let proto_id = self.heap.alloc(HeapData::Object(proto))?;
                self.heap.obj_mut(func_obj).define(
                    Key::Str(StaticStrings::Prototype.id()),
                    Property::method(Value::Ref(proto_id)),
                );
            } else {
                let mut proto = JsObject::new(Some(self.realm.object_proto), ObjectKind::Ordinary);
                proto.define(
                    Key::Str(StaticStrings::Constructor.id()),
                    Property::method(Value::Ref(func_obj)),
                );
                let proto_id = self.heap.alloc(HeapData::Object(proto))?;
                self.heap.obj_mut(func_obj).define(
                    Key::Str(StaticStrings::Prototype.id()),
                    Property::Data {
                        value: Value::Ref(proto_id),
                        writable: true,
                        enumerable: false,
                        configurable: false,
                    },
                );
            }
        }
        Ok(Value::Ref(func_obj))
    }

    /// `Function.prototype.bind` result.
    pub(crate) fn make_bound_function(&mut self, target: HeapId, this: Value, args: Vec<Value>) -> RunResult<Value> {
        let bound = BoundFunc { target, this, args };
        let mut obj = JsObject::new(
            Some(self.realm.function_proto),
            ObjectKind::Function(FuncKind::Bound(Box::new(bound))),
        );
        let target_name = self.get_prop(Value::Ref(target), &Key::Str(StaticStrings::Name.id()))?;
        let name = format!("bound {}", self.to_string_rust(target_name)?);
        let name_val = Value::string(&mut self.heap, name)?;
        obj.define(Key::Str(StaticStrings::Name.id()), Property::method_ro(name_val));
        Ok(Value::Ref(self.heap.alloc(HeapData::Object(obj))?))
    }

    fn make_arguments_object(
        &mut self,
        env: HeapId,
        mapped: Vec<Option<StringId>>,
        args: &[Value],
        func_id: HeapId,
        strict: bool,
    ) -> RunResult<Value> {
        let mut obj = JsObject::new(
            Some(self.realm.object_proto),
            ObjectKind::Arguments { env, mapped },
        );
        for (i, arg) in args.iter().enumerate() {
            obj.define(Key::Index(i as u32), Property::data(*arg));
        }
        obj.define(
            Key::Str(StaticStrings::Length.id()),
            Property::method(Value::Number(args.len() as f64)),
        );
        if !strict {
            obj.define(Key::Str(StaticStrings::Callee.id()), Property::method(Value::Ref(func_id)));
        }
        obj.define(
            Key::Sym(WellKnown::Iterator.id()),
            Property::method(self.realm.array_values_fn),
        );
        Ok(Value::Ref(self.heap.alloc(HeapData::Object(obj))?))
    }

    /// Allocates a dense array from values.
    pub(crate) fn make_array(&mut self, values: Vec<Value>) -> RunResult<Value> {
        let mut obj = JsObject::new(
            Some(self.realm.array_proto),
            ObjectKind::Array { length: values.len() as u32 },
        );
        for (i, v) in values.into_iter().enumerate() {
            obj.define(Key::Index(i as u32), Property::data(v));
        }
        Ok(Value::Ref(self.heap.alloc(HeapData::Object(obj))?))
    }
}

/// Collects the identifiers a binding pattern declares.
fn collect_bound_names(code: &crate::ast::CodeStore, pat: crate::ast::PatId, out: &mut Vec<StringId>) {
    match code.pat(pat) {
        Pat::Ident(name) => out.push(*name),
        Pat::Expr(_) => {}
        Pat::Array { elems, rest } => {
            for elem in elems.iter().flatten() {
                collect_bound_names(code, *elem, out);
            }
            if let Some(rest) = rest {
                collect_bound_names(code, *rest, out);
            }
        }
        Pat::Object { props, rest } => {
            for prop in props {
                collect_bound_names(code, prop.value, out);
            }
            if let Some(rest) = rest {
                collect_bound_names(code, *rest, out);
            }
        }
        Pat::Default { pat, .. } => collect_bound_names(code, *pat, out),
    }
}
