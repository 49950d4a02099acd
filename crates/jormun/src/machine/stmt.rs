//! Statement execution: sequencing, declarations, conditionals, the loop
//! family (with per-iteration bindings and iterator protocol), `switch`,
//! `try`/`catch`/`finally`, labels, and module-level declaration stubs.

use super::{
    BindMode, Flow, ForPhase, Interp, LoopKind, LoopPhase, LoopStep, Machine, Step, StmtListRef, TryStep, Unwind,
};
use crate::{
    ast::{DeclKind, Expr, ExprId, ForHead, ForInitStmt, FuncBody, LexDecl, Pat, PatId, Stmt, StmtId},
    env::{Binding, Scope, ScopeKind},
    error::{RunError, RunResult},
    heap::HeapData,
    intern::{StaticStrings, StringId},
    object::{Key, ObjectKind},
    value::Value,
};

impl Interp {
    pub(crate) fn exec_stmt(&mut self, m: &mut Machine, stmt: StmtId) -> RunResult<Flow> {
        m.frame_mut().loc = self.code.stmt_loc(stmt);
        // labels attach only through unbroken Labeled chains to a loop
        let mut labels = std::mem::take(&mut m.pending_labels);
        match self.code.stmt(stmt) {
            Stmt::Empty | Stmt::Debugger | Stmt::Func { .. } | Stmt::Import(_) | Stmt::ExportNamed { .. }
            | Stmt::ExportAll { .. } => Ok(Flow::More),
            Stmt::Expr(e) => {
                let e = *e;
                m.ctrl.push(Step::SetCompletion);
                m.ctrl.push(Step::Eval(e));
                Ok(Flow::More)
            }
            Stmt::VarDecl { kind, decls } => {
                let kind = *kind;
                let decls: Vec<(PatId, Option<ExprId>)> = decls.clone();
                self.exec_var_decl(m, kind, &decls);
                Ok(Flow::More)
            }
            Stmt::Class { name, class } => {
                let (name, class) = (*name, *class);
                m.ctrl.push(Step::InitLexical { name, mutable: true });
                self.begin_class_eval(m, class, Some(name))?;
                Ok(Flow::More)
            }
            Stmt::Return(arg) => {
                match arg {
                    Some(e) => {
                        let e = *e;
                        m.ctrl.push(Step::ReturnVal);
                        m.ctrl.push(Step::Eval(e));
                    }
                    None => m.ctrl.push(Step::ReturnUndef),
                }
                Ok(Flow::More)
            }
            Stmt::If { test, cons, alt } => {
                let (test, cons, alt) = (*test, *cons, *alt);
                m.ctrl.push(Step::IfCond { cons, alt });
                m.ctrl.push(Step::Eval(test));
                Ok(Flow::More)
            }
            Stmt::Block(data) => {
                let lex = data.scope.lex.clone();
                let funcs = data.scope.funcs.clone();
                self.enter_block_scope(m, &lex, &funcs)?;
                m.ctrl.push(Step::Seq { list: StmtListRef::Block(stmt), idx: 0 });
                Ok(Flow::More)
            }
            Stmt::While { test, body } => {
                let (test, body) = (*test, *body);
                let loop_step = LoopStep {
                    labels,
                    env: m.env,
                    vals_len: m.vals.len() as u32,
                    kind: LoopKind::While { test, body, phase: LoopPhase::Test },
                };
                self.step_loop(m, Box::new(loop_step))
            }
            Stmt::DoWhile { body, test } => {
                let (test, body) = (*test, *body);
                let loop_step = LoopStep {
                    labels,
                    env: m.env,
                    vals_len: m.vals.len() as u32,
                    kind: LoopKind::DoWhile { test, body, phase: LoopPhase::Body },
                };
                self.step_loop(m, Box::new(loop_step))
            }
            Stmt::For { init, test, update, body, scope } => {
                let (test, update, body) = (*test, *update, *body);
                let scope: Vec<LexDecl> = scope.clone();
                let init: Option<OwnedForInit> = init.as_ref().map(|init| match init {
                    ForInitStmt::Expr(e) => OwnedForInit::Expr(*e),
                    ForInitStmt::Decl { kind, decls } => OwnedForInit::Decl {
                        kind: *kind,
                        decls: decls.clone(),
                    },
                });
                let per_iter: Vec<StringId> =
                    scope.iter().filter(|d| !d.is_const).map(|d| d.name).collect();
                // the loop head's lexical scope
                let outer = m.env;
                if !scope.is_empty() {
                    let loop_scope = self.heap.alloc(HeapData::Scope(Scope::block(outer)))?;
                    for decl in &scope {
                        let binding =
                            if decl.is_const { Binding::uninit_const() } else { Binding::uninit_let() };
                        self.heap.scope_mut(loop_scope).bindings.insert(decl.name, binding);
                    }
                    m.ctrl.push(Step::PopScope { prev: outer });
                    m.env = loop_scope;
                }
                let loop_step = Box::new(LoopStep {
                    labels,
                    env: m.env,
                    vals_len: m.vals.len() as u32,
                    kind: LoopKind::For { test, update, body, per_iter, phase: ForPhase::Entry },
                });
                m.ctrl.push(Step::Loop(loop_step));
                // init steps run before the loop marker is first processed
                match init {
                    Some(OwnedForInit::Expr(e)) => {
                        m.ctrl.push(Step::Drop);
                        m.ctrl.push(Step::Eval(e));
                    }
                    Some(OwnedForInit::Decl { kind, decls }) => {
                        self.exec_var_decl(m, kind, &decls);
                    }
                    None => {}
                }
                Ok(Flow::More)
            }
            Stmt::ForIn { head, object, body, scope } => {
                let (head, object, body) = (*head, *object, *body);
                let scope_names: Vec<(StringId, bool)> = scope.iter().map(|d| (d.name, d.is_const)).collect();
                let (pat, mode) = for_head_parts(head);
                // evaluate the object, then seed the key list
                m.ctrl.push(Step::Loop(Box::new(LoopStep {
                    labels,
                    env: m.env,
                    vals_len: m.vals.len() as u32,
                    kind: LoopKind::ForIn {
                        obj: Value::Undefined,
                        keys: Vec::new(),
                        idx: usize::MAX, // sentinel: keys not collected yet
                        head: pat,
                        mode,
                        scope_names,
                        body,
                    },
                })));
                m.ctrl.push(Step::Eval(object));
                Ok(Flow::More)
            }
            Stmt::ForOf { head, iterable, body, scope, is_await } => {
                let (head, iterable, body, is_await) = (*head, *iterable, *body, *is_await);
                let scope_names: Vec<(StringId, bool)> = scope.iter().map(|d| (d.name, d.is_const)).collect();
                let (pat, mode) = for_head_parts(head);
                m.ctrl.push(Step::Loop(Box::new(LoopStep {
                    labels,
                    env: m.env,
                    vals_len: m.vals.len() as u32,
                    kind: LoopKind::ForOf {
                        iter: crate::machine::iter::IterRecord::empty(),
                        done: true, // flipped once the iterator is obtained
                        head: pat,
                        mode,
                        scope_names,
                        body,
                        is_await,
                        awaiting: false,
                    },
                })));
                m.ctrl.push(Step::Eval(iterable));
                Ok(Flow::More)
            }
            Stmt::Break(label) => {
                let label = *label;
                self.unwind_break_continue(m, Unwind::Break(label))?;
                Ok(Flow::More)
            }
            Stmt::Continue(label) => {
                let label = *label;
                self.unwind_break_continue(m, Unwind::Continue(label))?;
                Ok(Flow::More)
            }
            Stmt::Labeled { label, body } => {
                let (label, body) = (*label, *body);
                if stmt_is_loop(self.code.stmt(body)) {
                    labels.push(label);
                    m.pending_labels = labels;
                    m.ctrl.push(Step::Exec(body));
                } else {
                    m.ctrl.push(Step::LabelEnd { label, env: m.env, vals_len: m.vals.len() as u32 });
                    m.ctrl.push(Step::Exec(body));
                }
                Ok(Flow::More)
            }
            Stmt::Switch { disc, cases, .. } => {
                let disc = *disc;
                let first_test = cases.iter().position(|c| c.test.is_some());
                m.ctrl.push(Step::SwitchEnd { env: m.env, vals_len: m.vals.len() as u32 });
                match first_test {
                    Some(idx) => {
                        let test = self.switch_case_test(stmt, idx).expect("test position");
                        m.ctrl.push(Step::SwitchCmp { stmt, idx: idx as u32 });
                        m.ctrl.push(Step::Eval(test));
                    }
                    None => {
                        m.ctrl.push(Step::SwitchDefault { stmt });
                    }
                }
                m.ctrl.push(Step::Eval(disc));
                Ok(Flow::More)
            }
            Stmt::Throw(e) => {
                let e = *e;
                m.ctrl.push(Step::ThrowVal);
                m.ctrl.push(Step::Eval(e));
                Ok(Flow::More)
            }
            Stmt::Try { block, catch, finally } => {
                let block = *block;
                let catch = catch.as_ref().map(|c| (c.param, c.body));
                let finally = *finally;
                m.ctrl.push(Step::Try(Box::new(TryStep {
                    catch,
                    finally,
                    in_catch: false,
                    env: m.env,
                    vals_len: m.vals.len() as u32,
                })));
                m.ctrl.push(Step::Exec(block));
                Ok(Flow::More)
            }
            Stmt::ExportDecl(inner) => {
                let inner = *inner;
                m.ctrl.push(Step::Exec(inner));
                Ok(Flow::More)
            }
            Stmt::ExportDefault(e) => {
                let e = *e;
                m.ctrl.push(Step::InitLexical { name: StaticStrings::DefaultExport.id(), mutable: false });
                self.push_named_eval(m, e, StaticStrings::Default.id());
                Ok(Flow::More)
            }
        }
    }

    /// Pushes `Eval(e)` with anonymous function/class naming.
    fn push_named_eval(&mut self, m: &mut Machine, e: ExprId, name: StringId) {
        if self.expr_is_anonymous_fn(e) {
            m.ctrl.push(Step::NameAnon(name));
        }
        m.ctrl.push(Step::Eval(e));
    }

    pub(crate) fn expr_is_anonymous_fn(&self, e: ExprId) -> bool {
        match self.code.expr(e) {
            Expr::Function(f) => self.code.func(*f).name.is_none(),
            Expr::Class(c) => self.code.class(*c).name.is_none(),
            _ => false,
        }
    }

    fn exec_var_decl(&mut self, m: &mut Machine, kind: DeclKind, decls: &[(PatId, Option<ExprId>)]) {
        let mode = match kind {
            DeclKind::Var => BindMode::Var,
            DeclKind::Let => BindMode::DeclareLet,
            DeclKind::Const => BindMode::DeclareConst,
        };
        for &(pat, init) in decls.iter().rev() {
            match init {
                Some(init) => {
                    m.ctrl.push(Step::BindPat { pat, mode });
                    if let Pat::Ident(name) = self.code.pat(pat) {
                        let name = *name;
                        self.push_named_eval(m, init, name);
                    } else {
                        m.ctrl.push(Step::Eval(init));
                    }
                }
                None => {
                    // `var x;` keeps the hoisted value; `let x;` initializes
                    // to undefined
                    if kind == DeclKind::Let {
                        m.ctrl.push(Step::BindPat { pat, mode });
                        m.ctrl.push(Step::Push(Value::Undefined));
                    }
                }
            }
        }
    }

    pub(crate) fn exec_seq(&mut self, m: &mut Machine, list: StmtListRef, idx: u32) -> RunResult<Flow> {
        let stmt = self.stmt_list_get(list, idx as usize);
        if let Some(stmt) = stmt {
            m.ctrl.push(Step::Seq { list, idx: idx + 1 });
            m.ctrl.push(Step::Exec(stmt));
        }
        Ok(Flow::More)
    }

    fn stmt_list_get(&self, list: StmtListRef, idx: usize) -> Option<StmtId> {
        match list {
            StmtListRef::Block(id) => match self.code.stmt(id) {
                Stmt::Block(data) => data.stmts.get(idx).copied(),
                _ => unreachable!("block list on non-block"),
            },
            StmtListRef::FnBody(func) => match &self.code.func(func).body {
                FuncBody::Block(stmts) => stmts.get(idx).copied(),
                FuncBody::Expr(_) => unreachable!("expr body has no statement list"),
            },
            StmtListRef::SwitchCase(id, case) => match self.code.stmt(id) {
                Stmt::Switch { cases, .. } => cases[case as usize].body.get(idx).copied(),
                _ => unreachable!("switch case on non-switch"),
            },
            StmtListRef::Program(pid) => self.programs[pid.0 as usize].body.get(idx).copied(),
        }
    }

    fn switch_case_test(&self, stmt: StmtId, idx: usize) -> Option<ExprId> {
        match self.code.stmt(stmt) {
            Stmt::Switch { cases, .. } => cases.get(idx).and_then(|c| c.test),
            _ => unreachable!("switch test on non-switch"),
        }
    }

    // === switch steps ===

    pub(crate) fn step_switch_cmp(&mut self, m: &mut Machine, stmt: StmtId, idx: u32) -> RunResult<Flow> {
        let test = m.pop();
        let disc = m.peek_val();
        if crate::value::strict_eq(disc, test, &self.heap, &self.interns) {
            m.pop();
            self.enter_switch_scope(m, stmt)?;
            m.ctrl.push(Step::SwitchFall { stmt, case: idx });
            return Ok(Flow::More);
        }
        // find the next case clause with a test
        let next = match self.code.stmt(stmt) {
            Stmt::Switch { cases, .. } => cases
                .iter()
                .enumerate()
                .skip(idx as usize + 1)
                .find_map(|(i, c)| c.test.map(|t| (i, t))),
            _ => unreachable!("switch on non-switch"),
        };
        match next {
            Some((i, test_expr)) => {
                m.ctrl.push(Step::SwitchCmp { stmt, idx: i as u32 });
                m.ctrl.push(Step::Eval(test_expr));
            }
            None => m.ctrl.push(Step::SwitchDefault { stmt }),
        }
        Ok(Flow::More)
    }

    pub(crate) fn step_switch_default(&mut self, m: &mut Machine, stmt: StmtId) -> RunResult<Flow> {
        m.pop(); // discriminant
        let default_idx = match self.code.stmt(stmt) {
            Stmt::Switch { cases, .. } => cases.iter().position(|c| c.test.is_none()),
            _ => unreachable!("switch on non-switch"),
        };
        if let Some(idx) = default_idx {
            self.enter_switch_scope(m, stmt)?;
            m.ctrl.push(Step::SwitchFall { stmt, case: idx as u32 });
        }
        Ok(Flow::More)
    }

    fn enter_switch_scope(&mut self, m: &mut Machine, stmt: StmtId) -> RunResult<()> {
        let (lex, funcs) = match self.code.stmt(stmt) {
            Stmt::Switch { scope, .. } => (scope.lex.clone(), scope.funcs.clone()),
            _ => unreachable!("switch on non-switch"),
        };
        self.enter_block_scope(m, &lex, &funcs)
    }

    pub(crate) fn step_switch_fall(&mut self, m: &mut Machine, stmt: StmtId, case: u32) -> RunResult<Flow> {
        let case_count = match self.code.stmt(stmt) {
            Stmt::Switch { cases, .. } => cases.len() as u32,
            _ => unreachable!("switch on non-switch"),
        };
        if case < case_count {
            m.ctrl.push(Step::SwitchFall { stmt, case: case + 1 });
            m.ctrl.push(Step::Seq { list: StmtListRef::SwitchCase(stmt, case), idx: 0 });
        }
        Ok(Flow::More)
    }

    // === try ===

    /// The try marker reached through normal completion of the protected
    /// block (or the catch block).
    pub(crate) fn step_try_normal(&mut self, m: &mut Machine, t: TryStep) -> RunResult<Flow> {
        if let Some(finally) = t.finally {
            m.ctrl.push(Step::Exec(finally));
        }
        Ok(Flow::More)
    }

    /// Enters a catch clause with the thrown value.
    pub(crate) fn enter_catch(
        &mut self,
        m: &mut Machine,
        param: Option<PatId>,
        body: StmtId,
        err: RunError,
    ) -> RunResult<()> {
        let thrown = self.exception_value(err)?;
        let prev = m.env;
        let scope = self.heap.alloc(HeapData::Scope(Scope::new(Some(prev), ScopeKind::Catch)))?;
        m.env = scope;
        m.ctrl.push(Step::PopScope { prev });
        m.ctrl.push(Step::Exec(body));
        if let Some(param) = param {
            let mut names = Vec::new();
            crate::parser::collect_pat_names(&self.code, param, false, &mut names);
            for decl in names {
                self.heap.scope_mut(scope).bindings.insert(decl.name, Binding::uninit_let());
            }
            m.ctrl.push(Step::BindPat { pat: param, mode: BindMode::DeclareLet });
            m.ctrl.push(Step::Push(thrown));
        }
        Ok(())
    }

    // === loops ===

    /// Adjusts a loop marker for a `continue` targeting it.
    pub(crate) fn loop_continue(&mut self, _m: &mut Machine, l: &mut LoopStep) -> RunResult<()> {
        match &mut l.kind {
            LoopKind::While { phase, .. } | LoopKind::DoWhile { phase, .. } => *phase = LoopPhase::Test,
            LoopKind::For { phase, .. } => *phase = ForPhase::Update,
            LoopKind::ForIn { .. } => {}
            LoopKind::ForOf { awaiting, .. } => *awaiting = false,
        }
        Ok(())
    }

    pub(crate) fn step_loop(&mut self, m: &mut Machine, mut l: Box<LoopStep>) -> RunResult<Flow> {
        match &mut l.kind {
            LoopKind::While { test, body, phase } => match *phase {
                LoopPhase::Test => {
                    let test = *test;
                    *phase = LoopPhase::AfterTest;
                    m.ctrl.push(Step::Loop(l));
                    m.ctrl.push(Step::Eval(test));
                    Ok(Flow::More)
                }
                LoopPhase::AfterTest => {
                    let cond = m.pop();
                    if cond.to_boolean(&self.heap, &self.interns) {
                        let body = *body;
                        *phase = LoopPhase::Test;
                        m.ctrl.push(Step::Loop(l));
                        m.ctrl.push(Step::Exec(body));
                    }
                    Ok(Flow::More)
                }
                LoopPhase::Body => unreachable!("while has no body phase"),
            },
            LoopKind::DoWhile { test, body, phase } => match *phase {
                LoopPhase::Body => {
                    let body = *body;
                    *phase = LoopPhase::Test;
                    m.ctrl.push(Step::Loop(l));
                    m.ctrl.push(Step::Exec(body));
                    Ok(Flow::More)
                }
                LoopPhase::Test => {
                    let test = *test;
                    *phase = LoopPhase::AfterTest;
                    m.ctrl.push(Step::Loop(l));
                    m.ctrl.push(Step::Eval(test));
                    Ok(Flow::More)
                }
                LoopPhase::AfterTest => {
                    let cond = m.pop();
                    if cond.to_boolean(&self.heap, &self.interns) {
                        let body = *body;
                        *phase = LoopPhase::Body;
                        m.ctrl.push(Step::Loop(l));
                        m.ctrl.push(Step::Exec(body));
                    }
                    Ok(Flow::More)
                }
            },
            LoopKind::For { test, update, body, per_iter, phase } => match *phase {
                ForPhase::Entry => {
                    let per_iter = per_iter.clone();
                    self.per_iteration_copy(m, &per_iter)?;
                    *phase = ForPhase::Test;
                    m.ctrl.push(Step::Loop(l));
                    Ok(Flow::More)
                }
                ForPhase::Test => match *test {
                    Some(test) => {
                        *phase = ForPhase::AfterTest;
                        m.ctrl.push(Step::Loop(l));
                        m.ctrl.push(Step::Eval(test));
                        Ok(Flow::More)
                    }
                    None => {
                        let body = *body;
                        *phase = ForPhase::Update;
                        m.ctrl.push(Step::Loop(l));
                        m.ctrl.push(Step::Exec(body));
                        Ok(Flow::More)
                    }
                },
                ForPhase::AfterTest => {
                    let cond = m.pop();
                    if cond.to_boolean(&self.heap, &self.interns) {
                        let body = *body;
                        *phase = ForPhase::Update;
                        m.ctrl.push(Step::Loop(l));
                        m.ctrl.push(Step::Exec(body));
                    }
                    Ok(Flow::More)
                }
                ForPhase::Update => {
                    let per_iter = per_iter.clone();
                    self.per_iteration_copy(m, &per_iter)?;
                    let update = *update;
                    *phase = ForPhase::Test;
                    m.ctrl.push(Step::Loop(l));
                    if let Some(update) = update {
                        m.ctrl.push(Step::Drop);
                        m.ctrl.push(Step::Eval(update));
                    }
                    Ok(Flow::More)
                }
            },
            LoopKind::ForIn { obj, keys, idx, head, mode, scope_names, body } => {
                if *idx == usize::MAX {
                    // the evaluated object is on the stack
                    let value = m.pop();
                    if value.is_nullish() {
                        // for-in over null/undefined runs zero iterations
                        return Ok(Flow::More);
                    }
                    *obj = value;
                    *keys = self.enumerate_string_keys(value)?;
                    *idx = 0;
                    m.ctrl.push(Step::Loop(l));
                    return Ok(Flow::More);
                }
                loop {
                    if *idx >= keys.len() {
                        return Ok(Flow::More);
                    }
                    let key_val = keys[*idx];
                    *idx += 1;
                    // keys deleted mid-iteration are skipped
                    if let Some(obj_id) = obj.object_id(&self.heap) {
                        let s = self.to_string_rust(key_val)?;
                        let key = Key::from_str(&mut self.interns, &s);
                        if !self.has_prop(obj_id, &key)? {
                            continue;
                        }
                    }
                    let (head, mode, body) = (*head, *mode, *body);
                    let scope_names = scope_names.clone();
                    m.ctrl.push(Step::Loop(l));
                    self.push_iteration_body(m, head, mode, &scope_names, body, key_val)?;
                    return Ok(Flow::More);
                }
            }
            LoopKind::ForOf { iter, done, head, mode, scope_names, body, is_await, awaiting } => {
                if iter.is_empty() {
                    // the evaluated iterable is on the stack
                    let iterable = m.pop();
                    let record = self.get_iterator(iterable, *is_await)?;
                    *iter = record;
                    *done = false;
                    m.ctrl.push(Step::Loop(l));
                    return Ok(Flow::More);
                }
                if *awaiting {
                    // the settled iteration result is on the stack
                    *awaiting = false;
                    let result = m.pop();
                    let (value, is_done) = self.iter_result_parts(result)?;
                    if is_done {
                        *done = true;
                        return Ok(Flow::More);
                    }
                    let (head, mode, body) = (*head, *mode, *body);
                    let scope_names = scope_names.clone();
                    m.ctrl.push(Step::Loop(l));
                    self.push_iteration_body(m, head, mode, &scope_names, body, value)?;
                    return Ok(Flow::More);
                }
                if *is_await {
                    let record = iter.clone();
                    *awaiting = true;
                    let result = self.call_sync(record.next, record.iter, &[])?;
                    m.ctrl.push(Step::Loop(l));
                    m.ctrl.push(Step::AwaitOp);
                    m.ctrl.push(Step::Push(result));
                    return Ok(Flow::More);
                }
                let record = iter.clone();
                let result = self.call_sync(record.next, record.iter, &[])?;
                let (value, is_done) = self.iter_result_parts(result)?;
                if is_done {
                    *done = true;
                    return Ok(Flow::More);
                }
                let (head, mode, body) = (*head, *mode, *body);
                let scope_names = scope_names.clone();
                m.ctrl.push(Step::Loop(l));
                self.push_iteration_body(m, head, mode, &scope_names, body, value)?;
                Ok(Flow::More)
            }
        }
    }

    /// Seeds one for-in/for-of iteration: fresh scope, head binding, body.
    fn push_iteration_body(
        &mut self,
        m: &mut Machine,
        head: PatId,
        mode: BindMode,
        scope_names: &[(StringId, bool)],
        body: StmtId,
        value: Value,
    ) -> RunResult<()> {
        let prev = m.env;
        if !scope_names.is_empty() {
            let scope = self.heap.alloc(HeapData::Scope(Scope::block(prev)))?;
            for (name, is_const) in scope_names {
                let binding = if *is_const { Binding::uninit_const() } else { Binding::uninit_let() };
                self.heap.scope_mut(scope).bindings.insert(*name, binding);
            }
            m.env = scope;
            m.ctrl.push(Step::PopScope { prev });
        }
        m.ctrl.push(Step::Exec(body));
        m.ctrl.push(Step::BindPat { pat: head, mode });
        m.ctrl.push(Step::Push(value));
        Ok(())
    }

    /// Copies per-iteration `let` bindings into a fresh scope so closures
    /// created in the body capture this iteration's values.
    fn per_iteration_copy(&mut self, m: &mut Machine, names: &[StringId]) -> RunResult<()> {
        if names.is_empty() {
            return Ok(());
        }
        let cur = m.env;
        let parent = self.heap.scope(cur).parent;
        let mut scope = Scope::new(parent, ScopeKind::Block);
        for name in names {
            if let Some(binding) = self.heap.scope(cur).bindings.get(name) {
                scope.bindings.insert(*name, binding.clone());
            }
        }
        m.env = self.heap.alloc(HeapData::Scope(scope))?;
        Ok(())
    }

    /// Enumerable string keys for `for-in`: own then inherited, insertion
    /// order per object, shadowed names listed once.
    pub(crate) fn enumerate_string_keys(&mut self, value: Value) -> RunResult<Vec<Value>> {
        let mut seen = ahash::AHashSet::new();
        let mut out = Vec::new();
        // string primitives enumerate their indices
        if let Some(s) = value.as_str(&self.heap, &self.interns) {
            let len = crate::types::str::utf16_len(s);
            for i in 0..len {
                out.push(Value::Number(i as f64));
            }
            return Ok(out);
        }
        let Some(mut cur) = value.object_id(&self.heap) else {
            return Ok(out);
        };
        loop {
            let obj = self.heap.obj(cur);
            let mut keys = obj.own_keys();
            if let ObjectKind::TypedArray { length, .. } = &obj.kind {
                let length = *length;
                keys = (0..length as u32).map(Key::Index).chain(keys).collect();
            }
            for key in keys {
                let (render, enumerable) = match key {
                    Key::Sym(_) | Key::Private(_) => continue,
                    Key::Index(i) => (i.to_string(), self.heap.obj(cur).own(&key).is_none_or(|p| p.is_enumerable())),
                    Key::Str(id) => (
                        self.interns.str(id).to_owned(),
                        self.heap.obj(cur).own(&key).is_some_and(|p| p.is_enumerable()),
                    ),
                };
                if !seen.insert(render.clone()) {
                    continue;
                }
                if enumerable {
                    out.push(Value::string(&mut self.heap, render)?);
                }
            }
            match self.heap.obj(cur).proto {
                Some(p) => cur = p,
                None => break,
            }
        }
        Ok(out)
    }
}

fn for_head_parts(head: ForHead) -> (PatId, BindMode) {
    match head {
        ForHead::Decl { kind, pat } => {
            let mode = match kind {
                DeclKind::Var => BindMode::Var,
                DeclKind::Let => BindMode::DeclareLet,
                DeclKind::Const => BindMode::DeclareConst,
            };
            (pat, mode)
        }
        ForHead::Pat(pat) => (pat, BindMode::Assign),
    }
}

fn stmt_is_loop(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::While { .. }
            | Stmt::DoWhile { .. }
            | Stmt::For { .. }
            | Stmt::ForIn { .. }
            | Stmt::ForOf { .. }
            | Stmt::Labeled { .. }
    )
}

enum OwnedForInit {
    Expr(ExprId),
    Decl { kind: DeclKind, decls: Vec<(PatId, Option<ExprId>)> },
}
