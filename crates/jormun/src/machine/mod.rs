//! The machine evaluator.
//!
//! The evaluator is an explicit continuation machine: a control stack of
//! [`Step`]s (the AST itself is the instruction stream), an operand stack of
//! values, and call frames recording stack bases. Abrupt completions —
//! `throw`, `return`, `break`, `continue` — unwind the control stack through
//! marker steps (try markers, loop frames, scope restores, iterator-close
//! obligations). Because the whole execution state lives in these two stacks,
//! suspension is trivial: a generator owns its machine, `yield` hands the
//! stacks back to the caller, and `next(v)` pushes `v` and keeps going.
//!
//! Frames are reused for strict-mode calls in tail position, so tail
//! recursion runs in constant stack on both the machine and the host.

mod call;
mod class;
mod expr;
mod iter;
mod member;
mod ops;
mod pattern;
mod stmt;

use std::collections::VecDeque;

use crate::{
    ast::{CodeStore, ExprId, PatId, ProgramInfo, StmtId},
    ast::{BinOp, LogicalOp, UnaryOp},
    coroutine::CoroStore,
    env::{Binding, Scope, ScopeKind},
    error::{CodeLoc, ExcKind, RunError, RunResult, SimpleException},
    heap::{Heap, HeapData, HeapId},
    intern::{FuncId, Interns, PrivateId, StaticStrings, StringId},
    io::PrintWriter,
    jobs::{Job, TimerQueue},
    module::ModuleRegistry,
    object::{Key, ObjectKind, Property},
    realm::Realm,
    value::Value,
};

pub(crate) use call::CallKind;

/// Identifies a parsed top-level program in [`Interp::programs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProgramId(pub u32);

/// A handle to a statement list the machine can execute sequentially.
#[derive(Debug, Clone, Copy)]
pub(crate) enum StmtListRef {
    /// Statements of a `Stmt::Block`.
    Block(StmtId),
    /// A function body (`FuncBody::Block`).
    FnBody(FuncId),
    /// One case clause of a `Stmt::Switch`.
    SwitchCase(StmtId, u32),
    /// A top-level program body.
    Program(ProgramId),
}

/// How a pattern binds the value it destructures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindMode {
    /// `let` / `catch` parameter: initialize the pre-declared binding.
    DeclareLet,
    /// `const`: initialize the pre-declared immutable binding.
    DeclareConst,
    /// `var`: assign the hoisted binding.
    Var,
    /// Assignment expression target: resolve and assign.
    Assign,
}

/// A member key as it appears on a step: static keys are pre-converted.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MemberSel {
    Static(Key),
    /// The key was evaluated and sits on the operand stack.
    Computed,
    Private(PrivateId),
}

/// The try/catch/finally marker.
#[derive(Debug)]
pub(crate) struct TryStep {
    pub catch: Option<(Option<PatId>, StmtId)>,
    pub finally: Option<StmtId>,
    /// True once the catch block is running (a throw from it goes to
    /// `finally`, not back into `catch`).
    pub in_catch: bool,
    pub env: HeapId,
    pub vals_len: u32,
}

/// Loop markers stay on the control stack while the loop runs; they are both
/// the iteration driver and the `break`/`continue` unwind target.
#[derive(Debug)]
pub(crate) struct LoopStep {
    pub labels: Vec<StringId>,
    pub env: HeapId,
    pub vals_len: u32,
    pub kind: LoopKind,
}

#[derive(Debug)]
pub(crate) enum LoopKind {
    While {
        test: ExprId,
        body: StmtId,
        phase: LoopPhase,
    },
    DoWhile {
        test: ExprId,
        body: StmtId,
        phase: LoopPhase,
    },
    For {
        test: Option<ExprId>,
        update: Option<ExprId>,
        body: StmtId,
        /// Names copied per iteration so closures capture distinct bindings.
        per_iter: Vec<StringId>,
        phase: ForPhase,
    },
    ForIn {
        obj: Value,
        keys: Vec<Value>,
        idx: usize,
        head: PatId,
        mode: BindMode,
        scope_names: Vec<(StringId, bool)>,
        body: StmtId,
    },
    ForOf {
        iter: iter::IterRecord,
        done: bool,
        head: PatId,
        mode: BindMode,
        scope_names: Vec<(StringId, bool)>,
        body: StmtId,
        is_await: bool,
        /// A `for await` iteration result is pending on the operand stack.
        awaiting: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopPhase {
    Test,
    AfterTest,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ForPhase {
    Entry,
    Test,
    AfterTest,
    Update,
}

/// One step of machine work. The control stack is a stack of these.
#[derive(Debug)]
pub(crate) enum Step {
    // dispatch
    Eval(ExprId),
    Exec(StmtId),
    Seq { list: StmtListRef, idx: u32 },

    // micro-ops
    Push(Value),
    Drop,
    Dup,
    /// Pop a value into the machine's completion slot (expression
    /// statements; the eval result of a script).
    SetCompletion,
    /// Pop, convert to string (may call user `toString`), push.
    ToStringOp,
    /// Pop `n` strings, push their concatenation.
    Concat(u32),
    /// Name an anonymous function/class sitting on top of the stack.
    NameAnon(StringId),

    // markers
    PopScope { prev: HeapId },
    ChainEnd { vals_len: u32 },
    LabelEnd { label: StringId, env: HeapId, vals_len: u32 },
    SwitchEnd { env: HeapId, vals_len: u32 },
    FinallyRejoin { pending: Box<Unwind>, env: HeapId, vals_len: u32 },
    Try(Box<TryStep>),
    Loop(Box<LoopStep>),

    // statements
    IfCond { cons: StmtId, alt: Option<StmtId> },
    /// Pop a value and initialize a lexical binding in the current scope.
    InitLexical { name: StringId, mutable: bool },
    ThrowVal,
    ReturnVal,
    ReturnUndef,
    SwitchCmp { stmt: StmtId, idx: u32 },
    SwitchDefault { stmt: StmtId },
    SwitchFall { stmt: StmtId, case: u32 },

    // identifiers
    LoadIdent { name: StringId },
    TypeofIdent { name: StringId },
    StoreIdent { name: StringId, push: bool },
    UpdateIdent { name: StringId, inc: bool, prefix: bool },

    // operators
    BinOp(BinOp),
    UnOp(UnaryOp),
    LogicalJump { op: LogicalOp, right: ExprId },
    LogicalAssignIdent { op: LogicalOp, name: StringId, value: ExprId },
    CondJump { cons: ExprId, alt: ExprId },

    // members
    GetMember { sel: MemberSel, optional: bool },
    /// Like `GetMember` but pushes `[this, func]` for a call.
    GetMethod { sel: MemberSel, optional: bool },
    /// Pops `[obj, (key,) value]`, stores, optionally pushes the value back.
    StoreMember { sel: MemberSel, push: bool },
    /// Pops `[obj(, key)]`, pushes `[obj, (key,) value]` for compound
    /// assignment and updates.
    GetMemberKeep { sel: MemberSel },
    LogicalMemberJump { op: LogicalOp, sel: MemberSel, value: ExprId, push: bool },
    DeleteMember { computed: bool, key: Option<Key> },
    UpdateMember { sel: MemberSel, inc: bool, prefix: bool },
    /// `#name in obj`: pops the object, pushes a boolean.
    PrivateInOp { name: PrivateId },

    // values from context
    ClassEval(Box<class::ClassStep>),
    ArrayLit(Box<expr::ArrayLitStep>),
    ObjectLit(Box<expr::ObjectLitStep>),
    SuperGetMethod { sel: MemberSel },
    SuperGetMember { sel: MemberSel },
    SuperStoreMember { sel: MemberSel, push: bool },

    // calls
    CallArgs(Box<call::CallStep>),
    /// After `super(...)` returns: bind `this`, install the derived class's
    /// instance fields, and leave the result as the expression value.
    SuperBind,

    // suspension
    YieldOp,
    Delegate(Box<iter::DelegateStep>),
    AwaitOp,
    DynamicImportOp,

    // patterns
    BindPat { pat: PatId, mode: BindMode },
    ObjPat(Box<pattern::ObjPatStep>),
    ArrPat(Box<pattern::ArrPatStep>),
}

/// An abrupt completion traveling down the control stack.
#[derive(Debug)]
pub(crate) enum Unwind {
    Throw(RunError),
    Return(Value),
    Break(Option<StringId>),
    Continue(Option<StringId>),
}

/// Why `run_machine` stopped.
#[derive(Debug)]
pub(crate) enum Exit {
    Done(Value),
    /// An `await` reached with the given awaited value (not yet a promise).
    Await(Value),
    /// A `yield` with the yielded value.
    Yield(Value),
}

/// What to inject when resuming a suspended machine.
#[derive(Debug)]
pub(crate) enum ResumeMode {
    Next(Value),
    Throw(Value),
    Return(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Script,
    Module,
    Call,
    /// `new F(...)`: `this` is the freshly created object.
    Construct { this: HeapId },
    /// Derived-class construct: `this` starts uninitialized.
    ConstructDerived,
}

/// One call activation on a machine.
#[derive(Debug)]
pub(crate) struct Frame {
    pub ctrl_base: usize,
    pub vals_base: usize,
    /// Environment to restore when this frame pops.
    pub caller_env: HeapId,
    /// The callee object (`None` for script/module frames).
    pub func: Option<HeapId>,
    pub strict: bool,
    pub kind: FrameKind,
    /// Location of the statement currently executing, for stack traces.
    pub loc: CodeLoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MachineKind {
    Script,
    Module,
    /// A generator or async-function body.
    Coroutine,
}

/// A resumable execution: control stack, operand stack, frames, current
/// scope.
#[derive(Debug)]
pub(crate) struct Machine {
    pub ctrl: Vec<Step>,
    pub vals: Vec<Value>,
    pub frames: Vec<Frame>,
    pub env: HeapId,
    pub kind: MachineKind,
    /// Completion value of the most recent expression statement (the eval
    /// result for scripts).
    pub completion: Value,
    /// The machine has run at least once (generator start-state checks).
    pub started: bool,
    /// Labels waiting to attach to the next loop statement.
    pub pending_labels: Vec<StringId>,
}

impl Machine {
    pub fn new(kind: MachineKind, env: HeapId, frame: Frame) -> Self {
        Self {
            ctrl: Vec::with_capacity(32),
            vals: Vec::with_capacity(16),
            frames: vec![frame],
            env,
            kind,
            completion: Value::Undefined,
            started: false,
            pending_labels: Vec::new(),
        }
    }

    /// A machine with no frame yet; the caller pushes the entry frame.
    pub fn empty(kind: MachineKind, env: HeapId) -> Self {
        Self {
            ctrl: Vec::with_capacity(32),
            vals: Vec::with_capacity(16),
            frames: Vec::new(),
            env,
            kind,
            completion: Value::Undefined,
            started: false,
            pending_labels: Vec::new(),
        }
    }

    pub fn push(&mut self, v: Value) {
        self.vals.push(v);
    }

    pub fn pop(&mut self) -> Value {
        self.vals.pop().expect("operand stack underflow")
    }

    pub fn peek_val(&self) -> Value {
        *self.vals.last().expect("operand stack underflow")
    }

    pub fn frame(&self) -> &Frame {
        self.frames.last().expect("machine has no frame")
    }

    pub fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("machine has no frame")
    }

    pub fn strict(&self) -> bool {
        self.frame().strict
    }
}

/// Result of processing one step.
pub(crate) enum Flow {
    More,
    Suspend(Exit),
}

/// The interpreter: one realm plus all execution state.
pub(crate) struct Interp {
    pub heap: Heap,
    pub interns: Interns,
    pub code: CodeStore,
    pub programs: Vec<ProgramInfo>,
    pub realm: Realm,
    pub jobs: VecDeque<Job>,
    pub timers: TimerQueue,
    pub modules: ModuleRegistry,
    pub coros: CoroStore,
    pub print: Box<dyn PrintWriter>,
    pub rng: rand_chacha::ChaCha8Rng,
    /// Host-recursion depth guard for nested machines (getters, callbacks).
    pub nested_depth: usize,
}

impl Interp {
    pub fn add_program(&mut self, info: ProgramInfo) -> ProgramId {
        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(info);
        id
    }

    /// Runs a machine until it completes or suspends. An uncaught throw (or
    /// resource error) is returned as `Err`.
    pub fn run_machine(&mut self, m: &mut Machine) -> RunResult<Exit> {
        m.started = true;
        loop {
            self.heap.tracker.on_step()?;
            // a frame whose control segment drained returned `undefined`
            while m.frames.len() > 1 && m.ctrl.len() == m.frame().ctrl_base {
                self.pop_frame_with(m, Value::Undefined)?;
            }
            let Some(step) = m.ctrl.pop() else {
                let v = match m.kind {
                    MachineKind::Coroutine => Value::Undefined,
                    _ => std::mem::replace(&mut m.completion, Value::Undefined),
                };
                return Ok(Exit::Done(v));
            };
            match self.dispatch(m, step) {
                Ok(Flow::More) => {}
                Ok(Flow::Suspend(exit)) => return Ok(exit),
                Err(err) => self.unwind_throw(m, err)?,
            }
        }
    }

    /// Resumes a machine suspended at an `await`/`yield` step.
    pub fn resume_machine(&mut self, m: &mut Machine, mode: ResumeMode) -> RunResult<Exit> {
        match mode {
            ResumeMode::Next(v) => {
                m.push(v);
                self.run_machine(m)
            }
            ResumeMode::Throw(v) => {
                match self.unwind_throw(m, RunError::Throw(v)) {
                    Ok(()) => self.run_machine(m),
                    Err(e) => Err(e),
                }
            }
            ResumeMode::Return(v) => match self.unwind_return(m, v)? {
                Some(exit) => Ok(exit),
                None => self.run_machine(m),
            },
        }
    }

    fn dispatch(&mut self, m: &mut Machine, step: Step) -> RunResult<Flow> {
        match step {
            Step::Eval(expr) => self.eval_expr(m, expr),
            Step::Exec(stmt) => self.exec_stmt(m, stmt),
            Step::Seq { list, idx } => self.exec_seq(m, list, idx),

            Step::Push(v) => {
                m.push(v);
                Ok(Flow::More)
            }
            Step::Drop => {
                m.pop();
                Ok(Flow::More)
            }
            Step::Dup => {
                let v = m.peek_val();
                m.push(v);
                Ok(Flow::More)
            }
            Step::SetCompletion => {
                m.completion = m.pop();
                Ok(Flow::More)
            }
            Step::ToStringOp => {
                let v = m.pop();
                let s = self.to_string_value(v)?;
                m.push(s);
                Ok(Flow::More)
            }
            Step::Concat(n) => {
                let mut parts = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    parts.push(m.pop());
                }
                parts.reverse();
                let mut out = String::new();
                for p in parts {
                    out.push_str(p.as_str(&self.heap, &self.interns).expect("concat operand is a string"));
                }
                let v = Value::string(&mut self.heap, out)?;
                m.push(v);
                Ok(Flow::More)
            }
            Step::NameAnon(name) => {
                let v = m.peek_val();
                if let Some(id) = v.object_id(&self.heap) {
                    let name_key = Key::Str(StaticStrings::Name.id());
                    let obj = self.heap.obj(id);
                    let unnamed = matches!(
                        obj.own(&name_key),
                        Some(Property::Data { value, .. })
                            if value.as_str(&self.heap, &self.interns) == Some("")
                    );
                    if unnamed {
                        let name_val = Value::InternString(name);
                        self.heap.obj_mut(id).define(name_key, Property::method_ro(name_val));
                    }
                }
                Ok(Flow::More)
            }

            Step::PopScope { prev } => {
                m.env = prev;
                Ok(Flow::More)
            }
            Step::ChainEnd { .. } | Step::LabelEnd { .. } | Step::SwitchEnd { .. } => Ok(Flow::More),
            Step::FinallyRejoin { pending, .. } => self.rejoin_after_finally(m, *pending),
            Step::Try(t) => self.step_try_normal(m, *t),
            Step::Loop(l) => self.step_loop(m, l),

            Step::IfCond { cons, alt } => {
                let test = m.pop();
                if test.to_boolean(&self.heap, &self.interns) {
                    m.ctrl.push(Step::Exec(cons));
                } else if let Some(alt) = alt {
                    m.ctrl.push(Step::Exec(alt));
                }
                Ok(Flow::More)
            }
            Step::InitLexical { name, mutable } => {
                let v = m.pop();
                self.init_lexical(m.env, name, v, mutable);
                Ok(Flow::More)
            }
            Step::ThrowVal => {
                let v = m.pop();
                Err(RunError::Throw(v))
            }
            Step::ReturnVal => {
                let v = m.pop();
                match self.unwind_return(m, v)? {
                    Some(exit) => Ok(Flow::Suspend(exit)),
                    None => Ok(Flow::More),
                }
            }
            Step::ReturnUndef => match self.unwind_return(m, Value::Undefined)? {
                Some(exit) => Ok(Flow::Suspend(exit)),
                None => Ok(Flow::More),
            },
            Step::SwitchCmp { stmt, idx } => self.step_switch_cmp(m, stmt, idx),
            Step::SwitchDefault { stmt } => self.step_switch_default(m, stmt),
            Step::SwitchFall { stmt, case } => self.step_switch_fall(m, stmt, case),

            Step::LoadIdent { name } => {
                let v = self.lookup_ident(m.env, name)?;
                m.push(v);
                Ok(Flow::More)
            }
            Step::TypeofIdent { name } => {
                let v = match self.try_lookup_ident(m.env, name)? {
                    Some(v) => {
                        let ty = v.type_of(&self.heap).to_owned();
                        Value::string(&mut self.heap, ty)?
                    }
                    None => Value::InternString(StaticStrings::Undefined.id()),
                };
                m.push(v);
                Ok(Flow::More)
            }
            Step::StoreIdent { name, push } => {
                let v = m.pop();
                self.assign_ident(m, name, v)?;
                if push {
                    m.push(v);
                }
                Ok(Flow::More)
            }
            Step::UpdateIdent { name, inc, prefix } => {
                let old = self.lookup_ident(m.env, name)?;
                let (old_num, new) = self.update_numeric(old, inc)?;
                self.assign_ident(m, name, new)?;
                m.push(if prefix { new } else { old_num });
                Ok(Flow::More)
            }

            Step::BinOp(op) => self.step_bin_op(m, op),
            Step::UnOp(op) => self.step_un_op(m, op),
            Step::LogicalJump { op, right } => {
                let left = m.pop();
                let take_right = match op {
                    LogicalOp::And => left.to_boolean(&self.heap, &self.interns),
                    LogicalOp::Or => !left.to_boolean(&self.heap, &self.interns),
                    LogicalOp::Nullish => left.is_nullish(),
                };
                if take_right {
                    m.ctrl.push(Step::Eval(right));
                } else {
                    m.push(left);
                }
                Ok(Flow::More)
            }
            Step::LogicalAssignIdent { op, name, value } => {
                let current = self.lookup_ident(m.env, name)?;
                let assign = match op {
                    LogicalOp::And => current.to_boolean(&self.heap, &self.interns),
                    LogicalOp::Or => !current.to_boolean(&self.heap, &self.interns),
                    LogicalOp::Nullish => current.is_nullish(),
                };
                if assign {
                    m.ctrl.push(Step::StoreIdent { name, push: true });
                    m.ctrl.push(Step::Eval(value));
                } else {
                    m.push(current);
                }
                Ok(Flow::More)
            }
            Step::CondJump { cons, alt } => {
                let test = m.pop();
                m.ctrl
                    .push(Step::Eval(if test.to_boolean(&self.heap, &self.interns) { cons } else { alt }));
                Ok(Flow::More)
            }

            Step::GetMember { sel, optional } => self.step_get_member(m, sel, optional),
            Step::GetMethod { sel, optional } => self.step_get_method(m, sel, optional),
            Step::StoreMember { sel, push } => self.step_store_member(m, sel, push),
            Step::GetMemberKeep { sel } => self.step_get_member_keep(m, sel),
            Step::LogicalMemberJump { op, sel, value, push } => self.step_logical_member(m, op, sel, value, push),
            Step::DeleteMember { computed, key } => self.step_delete_member(m, computed, key),
            Step::UpdateMember { sel, inc, prefix } => self.step_update_member(m, sel, inc, prefix),
            Step::PrivateInOp { name } => {
                let obj = m.pop();
                let has = obj
                    .object_id(&self.heap)
                    .is_some_and(|id| self.heap.obj(id).has_own(&Key::Private(name)));
                m.push(Value::Bool(has));
                Ok(Flow::More)
            }

            Step::ClassEval(step) => self.step_class(m, step),
            Step::ArrayLit(step) => self.step_array_lit(m, step),
            Step::ObjectLit(step) => self.step_object_lit(m, step),
            Step::SuperGetMethod { sel } => self.step_super_get(m, sel, true),
            Step::SuperGetMember { sel } => self.step_super_get(m, sel, false),
            Step::SuperStoreMember { sel, push } => self.step_super_store(m, sel, push),

            Step::CallArgs(step) => self.step_call_args(m, step),
            Step::SuperBind => self.step_super_bind(m),

            Step::YieldOp => {
                let v = m.pop();
                Ok(Flow::Suspend(Exit::Yield(v)))
            }
            Step::Delegate(step) => self.step_delegate(m, step),
            Step::AwaitOp => {
                let v = m.pop();
                Ok(Flow::Suspend(Exit::Await(v)))
            }
            Step::DynamicImportOp => {
                let spec = m.pop();
                let v = self.step_dynamic_import(m, spec)?;
                m.push(v);
                Ok(Flow::More)
            }

            Step::BindPat { pat, mode } => self.step_bind_pat(m, pat, mode),
            Step::ObjPat(step) => self.step_obj_pat(m, step),
            Step::ArrPat(step) => self.step_arr_pat(m, step),
        }
    }

    // === scope operations ===

    pub(crate) fn new_scope(&mut self, parent: HeapId, kind: ScopeKind) -> RunResult<HeapId> {
        self.heap.alloc(HeapData::Scope(Scope::new(Some(parent), kind)))
    }

    /// Declares the lexical names of a block scope (TDZ) plus its hoisted
    /// block functions.
    pub(crate) fn enter_block_scope(
        &mut self,
        m: &mut Machine,
        lex: &[crate::ast::LexDecl],
        funcs: &[(StringId, FuncId)],
    ) -> RunResult<()> {
        let scope = self.new_scope(m.env, ScopeKind::Block)?;
        m.ctrl.push(Step::PopScope { prev: m.env });
        m.env = scope;
        for decl in lex {
            let binding = if decl.is_const { Binding::uninit_const() } else { Binding::uninit_let() };
            self.heap.scope_mut(scope).bindings.insert(decl.name, binding);
        }
        for (name, func) in funcs {
            let closure = self.make_closure(*func, scope, Some(*name))?;
            self.heap.scope_mut(scope).bindings.insert(*name, Binding::var(closure));
            if !m.strict() {
                // annex B: block functions also assign the function-level var
                let _ = self.assign_var(m, *name, closure);
            }
        }
        Ok(())
    }

    /// Initializes a declared lexical binding in the current scope.
    pub(crate) fn init_lexical(&mut self, env: HeapId, name: StringId, value: Value, mutable: bool) {
        self.heap.scope_mut(env).bindings.insert(
            name,
            Binding::Slot {
                value,
                mutable,
                initialized: true,
            },
        );
    }

    /// Assigns a `var` binding: walks to the nearest var-hosting scope; at
    /// the global scope, writes the global object property.
    pub(crate) fn assign_var(&mut self, m: &mut Machine, name: StringId, value: Value) -> RunResult<()> {
        let mut env = m.env;
        loop {
            let scope = self.heap.scope(env);
            if let Some(Binding::Slot { .. }) = scope.bindings.get(&name) {
                if let Binding::Slot { value: slot, .. } =
                    self.heap.scope_mut(env).bindings.get_mut(&name).expect("binding checked")
                {
                    *slot = value;
                }
                return Ok(());
            }
            if scope.hosts_var() {
                if matches!(scope.kind, ScopeKind::Global(_)) {
                    let global = self.realm.global_obj;
                    self.set_prop(global, Key::Str(name), value, Value::Ref(global), false)?;
                } else {
                    self.heap.scope_mut(env).bindings.insert(name, Binding::var(value));
                }
                return Ok(());
            }
            env = scope.parent.expect("var-hosting scope above every block");
        }
    }

    /// Reads an identifier; `Err` on unresolved or TDZ access.
    pub(crate) fn lookup_ident(&mut self, env: HeapId, name: StringId) -> RunResult<Value> {
        match self.try_lookup_ident(env, name)? {
            Some(v) => Ok(v),
            None => Err(RunError::reference_err(format!("{} is not defined", self.interns.str(name)))),
        }
    }

    /// Reads an identifier, `Ok(None)` when unresolved (for `typeof`).
    pub(crate) fn try_lookup_ident(&mut self, env: HeapId, name: StringId) -> RunResult<Option<Value>> {
        let mut cur = Some(env);
        while let Some(id) = cur {
            let scope = self.heap.scope(id);
            if let Some(binding) = scope.bindings.get(&name) {
                return match binding {
                    Binding::Slot { initialized: false, .. } => Err(RunError::reference_err(format!(
                        "Cannot access '{}' before initialization",
                        self.interns.str(name)
                    ))),
                    Binding::Slot { value, .. } => Ok(Some(*value)),
                    Binding::Indirect { module, name } => {
                        let (module, name) = (*module, *name);
                        self.read_module_binding(module, name).map(Some)
                    }
                };
            }
            if matches!(scope.kind, ScopeKind::Global(_)) {
                let global = self.realm.global_obj;
                if self.has_prop(global, &Key::Str(name))? {
                    let v = self.get_prop(Value::Ref(global), &Key::Str(name))?;
                    return Ok(Some(v));
                }
            }
            cur = scope.parent;
        }
        Ok(None)
    }

    /// Assigns an identifier. Strict mode raises on unresolved names and
    /// `const` rebinds; sloppy mode creates a global property.
    pub(crate) fn assign_ident(&mut self, m: &mut Machine, name: StringId, value: Value) -> RunResult<()> {
        let mut cur = Some(m.env);
        while let Some(id) = cur {
            let scope = self.heap.scope(id);
            if let Some(binding) = scope.bindings.get(&name) {
                return match binding {
                    Binding::Slot { initialized: false, .. } => Err(RunError::reference_err(format!(
                        "Cannot access '{}' before initialization",
                        self.interns.str(name)
                    ))),
                    Binding::Slot { mutable: false, .. } => Err(RunError::type_err(format!(
                        "Assignment to constant variable '{}'",
                        self.interns.str(name)
                    ))),
                    Binding::Slot { .. } => {
                        if let Binding::Slot { value: slot, .. } =
                            self.heap.scope_mut(id).bindings.get_mut(&name).expect("binding checked")
                        {
                            *slot = value;
                        }
                        Ok(())
                    }
                    Binding::Indirect { .. } => {
                        Err(RunError::type_err("Assignment to constant variable (import binding)"))
                    }
                };
            }
            if matches!(scope.kind, ScopeKind::Global(_)) {
                let global = self.realm.global_obj;
                if self.has_prop(global, &Key::Str(name))? {
                    return self.set_prop(global, Key::Str(name), value, Value::Ref(global), m.strict());
                }
            }
            cur = scope.parent;
        }
        if m.strict() {
            Err(RunError::reference_err(format!("{} is not defined", self.interns.str(name))))
        } else {
            let global = self.realm.global_obj;
            self.set_prop(global, Key::Str(name), value, Value::Ref(global), false)
        }
    }

    /// `this` resolution: the nearest function-like frame. Derived
    /// constructors raise before `super()` has initialized it.
    pub(crate) fn resolve_this(&mut self, env: HeapId) -> RunResult<Value> {
        let mut cur = Some(env);
        while let Some(id) = cur {
            let scope = self.heap.scope(id);
            if let Some(data) = scope.fn_data() {
                return match &data.this {
                    crate::env::ThisState::Uninitialized => Err(RunError::reference_err(
                        "must call super constructor before accessing 'this'",
                    )),
                    crate::env::ThisState::Bound(v) => Ok(*v),
                };
            }
            cur = scope.parent;
        }
        Ok(Value::Ref(self.realm.global_obj))
    }

    pub(crate) fn resolve_new_target(&self, env: HeapId) -> Value {
        let mut cur = Some(env);
        while let Some(id) = cur {
            let scope = self.heap.scope(id);
            if let Some(data) = scope.fn_data() {
                return data.new_target;
            }
            cur = scope.parent;
        }
        Value::Undefined
    }

    /// The function-like scope frame governing `super`/`new.target`.
    pub(crate) fn fn_scope_of(&self, env: HeapId) -> Option<HeapId> {
        let mut cur = Some(env);
        while let Some(id) = cur {
            let scope = self.heap.scope(id);
            if scope.fn_data().is_some() {
                return Some(id);
            }
            cur = scope.parent;
        }
        None
    }

    // === unwinding ===

    /// Unwinds a thrown error to the nearest catch/finally; `Err` when
    /// nothing on this machine catches it (or it is a resource error).
    fn unwind_throw(&mut self, m: &mut Machine, err: RunError) -> RunResult<()> {
        if !err.is_catchable() {
            return Err(err);
        }
        let mut err = err;
        loop {
            // cross frame boundaries while their control segments are empty
            while m.frames.len() > 1 && m.ctrl.len() == m.frame().ctrl_base {
                let frame = m.frames.pop().expect("frames checked");
                m.vals.truncate(frame.vals_base);
                m.env = frame.caller_env;
            }
            let Some(step) = m.ctrl.pop() else {
                return Err(err);
            };
            if m.ctrl.len() < m.frame().ctrl_base {
                // stepped past the frame's base: restore and retry
                m.ctrl.push(step);
                if m.frames.len() == 1 {
                    return Err(err);
                }
                let frame = m.frames.pop().expect("frames checked");
                m.vals.truncate(frame.vals_base);
                m.env = frame.caller_env;
                continue;
            }
            match step {
                Step::PopScope { prev } => m.env = prev,
                Step::Try(mut t) => {
                    m.vals.truncate(t.vals_len as usize);
                    m.env = t.env;
                    if !t.in_catch && t.catch.is_some() {
                        let (param, body) = t.catch.take().expect("catch checked");
                        t.in_catch = true;
                        let has_finally = t.finally.is_some();
                        if has_finally {
                            m.ctrl.push(Step::Try(t));
                        }
                        self.enter_catch(m, param, body, err)?;
                        return Ok(());
                    }
                    if let Some(finally) = t.finally {
                        m.ctrl.push(Step::FinallyRejoin {
                            pending: Box::new(Unwind::Throw(err)),
                            env: m.env,
                            vals_len: m.vals.len() as u32,
                        });
                        m.ctrl.push(Step::Exec(finally));
                        return Ok(());
                    }
                }
                Step::Loop(l) => {
                    // iterator-bearing loops close their iterator on throw;
                    // a close error never masks the original throw
                    if let LoopKind::ForOf { iter, done: false, .. } = &l.kind {
                        let iter = iter.clone();
                        let _ = self.iter_close(&iter);
                    }
                    m.env = l.env;
                }
                Step::ArrPat(p) => {
                    if let Some(iter) = &p.iter
                        && !p.done
                    {
                        let iter = iter.clone();
                        let _ = self.iter_close(&iter);
                    }
                }
                Step::Delegate(d) => {
                    // a throw during delegation forwards to the inner
                    // iterator's throw() if present
                    match self.delegate_throw(m, d, err)? {
                        DelegateThrow::Handled => return Ok(()),
                        DelegateThrow::Rethrow(e) => err = e,
                    }
                }
                _ => {}
            }
        }
    }

    /// Unwinds a `return`; `Some(exit)` when the machine's entry frame
    /// returned (coroutine completion).
    fn unwind_return(&mut self, m: &mut Machine, value: Value) -> RunResult<Option<Exit>> {
        loop {
            if m.ctrl.len() == m.frame().ctrl_base {
                return Ok(self.pop_frame_with(m, value)?);
            }
            let step = m.ctrl.pop().expect("ctrl length checked");
            match step {
                Step::PopScope { prev } => m.env = prev,
                Step::Try(t) => {
                    m.vals.truncate(t.vals_len as usize);
                    m.env = t.env;
                    if let Some(finally) = t.finally {
                        m.ctrl.push(Step::FinallyRejoin {
                            pending: Box::new(Unwind::Return(value)),
                            env: m.env,
                            vals_len: m.vals.len() as u32,
                        });
                        m.ctrl.push(Step::Exec(finally));
                        return Ok(None);
                    }
                }
                Step::Loop(l) => {
                    if let LoopKind::ForOf { iter, done: false, .. } = &l.kind {
                        let iter = iter.clone();
                        self.iter_close(&iter)?;
                    }
                    m.env = l.env;
                }
                Step::ArrPat(p) => {
                    if let Some(iter) = &p.iter
                        && !p.done
                    {
                        let iter = iter.clone();
                        self.iter_close(&iter)?;
                    }
                }
                Step::Delegate(d) => self.delegate_return(&d)?,
                _ => {}
            }
        }
    }

    /// Unwinds `break`/`continue` to the targeted loop/switch/label.
    pub(crate) fn unwind_break_continue(&mut self, m: &mut Machine, u: Unwind) -> RunResult<()> {
        let (label, is_break) = match &u {
            Unwind::Break(l) => (*l, true),
            Unwind::Continue(l) => (*l, false),
            _ => unreachable!("only break/continue here"),
        };
        loop {
            let Some(step) = m.ctrl.pop() else {
                return Err(RunError::syntax_err("illegal break/continue"));
            };
            match step {
                Step::PopScope { prev } => m.env = prev,
                Step::Try(t) => {
                    m.vals.truncate(t.vals_len as usize);
                    m.env = t.env;
                    if let Some(finally) = t.finally {
                        m.ctrl.push(Step::FinallyRejoin {
                            pending: Box::new(u),
                            env: m.env,
                            vals_len: m.vals.len() as u32,
                        });
                        m.ctrl.push(Step::Exec(finally));
                        return Ok(());
                    }
                }
                Step::LabelEnd { label: l, env, vals_len } => {
                    if is_break && label == Some(l) {
                        m.env = env;
                        m.vals.truncate(vals_len as usize);
                        return Ok(());
                    }
                }
                Step::SwitchEnd { env, vals_len } => {
                    if is_break && label.is_none() {
                        m.env = env;
                        m.vals.truncate(vals_len as usize);
                        return Ok(());
                    }
                }
                Step::Loop(mut l) => {
                    let matches = match label {
                        None => true,
                        Some(lbl) => l.labels.contains(&lbl),
                    };
                    if !matches {
                        if let LoopKind::ForOf { iter, done: false, .. } = &l.kind {
                            let iter = iter.clone();
                            self.iter_close(&iter)?;
                        }
                        m.env = l.env;
                        continue;
                    }
                    m.vals.truncate(l.vals_len as usize);
                    if is_break {
                        if let LoopKind::ForOf { iter, done: false, .. } = &l.kind {
                            let iter = iter.clone();
                            self.iter_close(&iter)?;
                        }
                        m.env = l.env;
                        return Ok(());
                    }
                    // continue: restore the loop env and advance
                    m.env = l.env;
                    self.loop_continue(m, &mut l)?;
                    m.ctrl.push(Step::Loop(l));
                    return Ok(());
                }
                Step::ArrPat(p) => {
                    if let Some(iter) = &p.iter
                        && !p.done
                    {
                        let iter = iter.clone();
                        self.iter_close(&iter)?;
                    }
                }
                _ => {}
            }
        }
    }

    /// Runs after a `finally` block completes normally: re-raises the
    /// pending completion it interrupted.
    fn rejoin_after_finally(&mut self, m: &mut Machine, pending: Unwind) -> RunResult<Flow> {
        match pending {
            Unwind::Throw(err) => Err(err),
            Unwind::Return(v) => match self.unwind_return(m, v)? {
                Some(exit) => Ok(Flow::Suspend(exit)),
                None => Ok(Flow::More),
            },
            u @ (Unwind::Break(_) | Unwind::Continue(_)) => {
                self.unwind_break_continue(m, u)?;
                Ok(Flow::More)
            }
        }
    }

    /// Pops the current frame with a return value, handling constructor
    /// result replacement. `Some(exit)` when this was the entry frame.
    fn pop_frame_with(&mut self, m: &mut Machine, value: Value) -> RunResult<Option<Exit>> {
        let frame = m.frames.last().expect("machine has frames");
        let result = match frame.kind {
            FrameKind::Construct { this } => {
                if value.object_id(&self.heap).is_some() {
                    value
                } else {
                    Value::Ref(this)
                }
            }
            FrameKind::ConstructDerived => {
                if value.object_id(&self.heap).is_some() {
                    value
                } else if !value.is_nullish() {
                    return Err(RunError::type_err(
                        "derived constructors may only return an object or undefined",
                    ));
                } else {
                    // `this` must have been initialized by super()
                    let env = self.fn_scope_of(m.env).expect("constructor frame has fn scope");
                    match &self.heap.scope(env).fn_data().expect("fn scope").this {
                        crate::env::ThisState::Bound(v) => *v,
                        crate::env::ThisState::Uninitialized => {
                            return Err(RunError::reference_err(
                                "must call super constructor before returning from derived constructor",
                            ));
                        }
                    }
                }
            }
            _ => value,
        };
        if m.frames.len() == 1 {
            m.ctrl.clear();
            m.vals.clear();
            return Ok(Some(Exit::Done(result)));
        }
        let frame = m.frames.pop().expect("frames checked");
        m.ctrl.truncate(frame.ctrl_base);
        m.vals.truncate(frame.vals_base);
        m.env = frame.caller_env;
        m.push(result);
        Ok(None)
    }

    // === error materialization ===

    /// Converts an internal error into the JavaScript value a `catch` binding
    /// observes, materializing native errors as heap `Error` objects.
    pub(crate) fn exception_value(&mut self, err: RunError) -> RunResult<Value> {
        match err {
            RunError::Throw(v) => Ok(v),
            RunError::Simple(simple) => self.make_error(simple.kind, &simple.message),
            RunError::Resource(_) => Err(err),
        }
    }

    /// Allocates an `Error` object of the given kind.
    pub(crate) fn make_error(&mut self, kind: ExcKind, message: &str) -> RunResult<Value> {
        let proto = self.realm.error_proto(kind);
        let mut obj = crate::object::JsObject::new(Some(proto), ObjectKind::Error { kind });
        let msg = Value::string(&mut self.heap, message.to_owned())?;
        obj.define(Key::Str(StaticStrings::Message.id()), Property::method(msg));
        let stack = Value::InternString(StaticStrings::Empty.id());
        obj.define(Key::Str(StaticStrings::Stack.id()), Property::method(stack));
        Ok(Value::Ref(self.heap.alloc(HeapData::Object(obj))?))
    }

    pub(crate) fn throw_type(&self, message: impl Into<std::borrow::Cow<'static, str>>) -> RunError {
        RunError::Simple(SimpleException::new(ExcKind::TypeError, message))
    }
}

/// Outcome of forwarding a throw to a delegated iterator.
pub(crate) enum DelegateThrow {
    Handled,
    Rethrow(RunError),
}
