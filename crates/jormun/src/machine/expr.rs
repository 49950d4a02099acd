//! Expression evaluation: dispatching AST nodes into machine steps, and the
//! stateful array/object literal builders.

use super::{BindMode, CallKind, Flow, Interp, Machine, MemberSel, Step, call::CallStep};
use crate::{
    ast::{Arg, ArrayElem, AssignOp, Expr, ExprId, MemberKey, Pat, PropDef, PropName, Quasi, UnaryOp},
    error::{RunError, RunResult},
    heap::{HeapData, HeapId},
    intern::StaticStrings,
    object::{Key, ObjectKind, Property},
    value::Value,
};

/// Array literal builder: evaluates elements in order, expanding spreads.
#[derive(Debug)]
pub(crate) struct ArrayLitStep {
    pub elems: Vec<ArrayElem>,
    pub idx: usize,
    pub array: HeapId,
    pub next_index: u32,
    pub waiting: bool,
}

/// Object literal builder.
#[derive(Debug)]
pub(crate) struct ObjectLitStep {
    pub props: Vec<PropDef>,
    pub idx: usize,
    pub obj: HeapId,
    /// Resolved key of the current computed-key property.
    pub pending_key: Option<Key>,
    pub waiting: Waiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Waiting {
    None,
    Key,
    Value,
}

impl Interp {
    pub(crate) fn eval_expr(&mut self, m: &mut Machine, expr: ExprId) -> RunResult<Flow> {
        match self.code.expr(expr) {
            Expr::Null => {
                m.push(Value::Null);
                Ok(Flow::More)
            }
            Expr::Bool(b) => {
                let b = *b;
                m.push(Value::Bool(b));
                Ok(Flow::More)
            }
            Expr::Num(n) => {
                let n = *n;
                m.push(Value::Number(n));
                Ok(Flow::More)
            }
            Expr::BigInt(b) => {
                let b = (**b).clone();
                let v = Value::bigint(&mut self.heap, b)?;
                m.push(v);
                Ok(Flow::More)
            }
            Expr::Str(id) => {
                let id = *id;
                m.push(Value::InternString(id));
                Ok(Flow::More)
            }
            Expr::Ident(name) => {
                let name = *name;
                let v = self.lookup_ident(m.env, name)?;
                m.push(v);
                Ok(Flow::More)
            }
            Expr::This => {
                let v = self.resolve_this(m.env)?;
                m.push(v);
                Ok(Flow::More)
            }
            Expr::NewTarget => {
                let v = self.resolve_new_target(m.env);
                m.push(v);
                Ok(Flow::More)
            }
            Expr::ImportMeta => {
                let v = self.resolve_import_meta(m)?;
                m.push(v);
                Ok(Flow::More)
            }
            Expr::Array(elems) => {
                let elems = elems.clone();
                let array = match self.make_array(Vec::new())? {
                    Value::Ref(id) => id,
                    _ => unreachable!("make_array returns a ref"),
                };
                self.step_array_lit(
                    m,
                    Box::new(ArrayLitStep { elems, idx: 0, array, next_index: 0, waiting: false }),
                )
            }
            Expr::Object(props) => {
                let props = props.clone();
                let obj = crate::object::JsObject::ordinary(self.realm.object_proto);
                let obj = self.heap.alloc(HeapData::Object(obj))?;
                self.step_object_lit(
                    m,
                    Box::new(ObjectLitStep { props, idx: 0, obj, pending_key: None, waiting: Waiting::None }),
                )
            }
            Expr::Function(func) => {
                let func = *func;
                let v = self.make_closure(func, m.env, None)?;
                m.push(v);
                Ok(Flow::More)
            }
            Expr::Class(class) => {
                let class = *class;
                self.begin_class_eval(m, class, None)?;
                Ok(Flow::More)
            }
            Expr::Template { quasis, exprs } => {
                let quasis: Vec<Quasi> = quasis.clone();
                let exprs: Vec<ExprId> = exprs.clone();
                if exprs.is_empty() {
                    let cooked = quasis[0].cooked.expect("untagged template is cooked");
                    m.push(Value::InternString(cooked));
                    return Ok(Flow::More);
                }
                let total = (quasis.len() + exprs.len()) as u32;
                m.ctrl.push(Step::Concat(total));
                // interleave quasi-strings and expressions, last first
                for i in (0..quasis.len()).rev() {
                    if i < exprs.len() {
                        m.ctrl.push(Step::ToStringOp);
                        m.ctrl.push(Step::Eval(exprs[i]));
                    }
                    let cooked = quasis[i].cooked.expect("untagged template is cooked");
                    m.ctrl.push(Step::Push(Value::InternString(cooked)));
                }
                Ok(Flow::More)
            }
            Expr::TaggedTemplate { tag, quasis, exprs } => {
                let tag = *tag;
                let quasis: Vec<Quasi> = quasis.clone();
                let exprs: Vec<ExprId> = exprs.clone();
                let strings = self.make_template_strings_object(&quasis)?;
                let args: Vec<Arg> = exprs.into_iter().map(Arg::Item).collect();
                let call = CallStep::with_prefix(vec![strings], args, CallKind::Call);
                m.ctrl.push(Step::CallArgs(Box::new(call)));
                self.push_callee_steps(m, tag)?;
                Ok(Flow::More)
            }
            Expr::Regex { .. } => {
                let v = self.make_regex_from_literal(expr)?;
                m.push(v);
                Ok(Flow::More)
            }
            Expr::Unary { op, expr: operand } => {
                let (op, operand) = (*op, *operand);
                self.eval_unary(m, op, operand)
            }
            Expr::Update { inc, prefix, target } => {
                let (inc, prefix, target) = (*inc, *prefix, *target);
                match self.code.expr(target) {
                    Expr::Ident(name) => {
                        let name = *name;
                        m.ctrl.push(Step::UpdateIdent { name, inc, prefix });
                    }
                    Expr::Member { obj, key, .. } => {
                        let (obj, key) = (*obj, *key);
                        let sel = self.member_sel(&key);
                        m.ctrl.push(Step::UpdateMember { sel, inc, prefix });
                        m.ctrl.push(Step::GetMemberKeep { sel });
                        if let MemberKey::Computed(k) = key {
                            m.ctrl.push(Step::Eval(k));
                        }
                        m.ctrl.push(Step::Eval(obj));
                    }
                    _ => return Err(RunError::syntax_err("invalid increment/decrement target")),
                }
                Ok(Flow::More)
            }
            Expr::Binary { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                m.ctrl.push(Step::BinOp(op));
                m.ctrl.push(Step::Eval(right));
                m.ctrl.push(Step::Eval(left));
                Ok(Flow::More)
            }
            Expr::Logical { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                m.ctrl.push(Step::LogicalJump { op, right });
                m.ctrl.push(Step::Eval(left));
                Ok(Flow::More)
            }
            Expr::Cond { test, cons, alt } => {
                let (test, cons, alt) = (*test, *cons, *alt);
                m.ctrl.push(Step::CondJump { cons, alt });
                m.ctrl.push(Step::Eval(test));
                Ok(Flow::More)
            }
            Expr::Assign { op, target, value } => {
                let (op, target, value) = (*op, *target, *value);
                self.eval_assign(m, op, target, value)
            }
            Expr::Seq(exprs) => {
                let exprs: Vec<ExprId> = exprs.clone();
                // intermediate values are dropped; the last is the result
                for (i, e) in exprs.iter().enumerate().rev() {
                    if i + 1 != exprs.len() {
                        m.ctrl.push(Step::Drop);
                    }
                    m.ctrl.push(Step::Eval(*e));
                }
                Ok(Flow::More)
            }
            Expr::Call { callee, args, optional, tail } => {
                let (callee, optional, tail) = (*callee, *optional, *tail);
                let args: Vec<Arg> = args.clone();
                m.ctrl.push(Step::CallArgs(Box::new(CallStep::new(args, CallKind::Call, optional, tail))));
                self.push_callee_steps(m, callee)?;
                Ok(Flow::More)
            }
            Expr::New { callee, args } => {
                let callee = *callee;
                let args: Vec<Arg> = args.clone();
                m.ctrl.push(Step::CallArgs(Box::new(CallStep::new(args, CallKind::New, false, false))));
                m.ctrl.push(Step::Eval(callee));
                Ok(Flow::More)
            }
            Expr::Member { obj, key, optional } => {
                let (obj, key, optional) = (*obj, *key, *optional);
                let sel = self.member_sel(&key);
                m.ctrl.push(Step::GetMember { sel, optional });
                if let MemberKey::Computed(k) = key {
                    m.ctrl.push(Step::Eval(k));
                }
                m.ctrl.push(Step::Eval(obj));
                Ok(Flow::More)
            }
            Expr::Chain(inner) => {
                let inner = *inner;
                m.ctrl.push(Step::ChainEnd { vals_len: m.vals.len() as u32 });
                // evaluated on top of the marker; optional links pop to it
                let flow = self.eval_expr(m, inner)?;
                debug_assert!(matches!(flow, Flow::More));
                Ok(Flow::More)
            }
            Expr::SuperCall(args) => {
                let args: Vec<Arg> = args.clone();
                m.ctrl.push(Step::CallArgs(Box::new(CallStep::new(args, CallKind::Super, false, false))));
                Ok(Flow::More)
            }
            Expr::SuperMember { key } => {
                let key = *key;
                let sel = self.member_sel(&key);
                m.ctrl.push(Step::SuperGetMember { sel });
                if let MemberKey::Computed(k) = key {
                    m.ctrl.push(Step::Eval(k));
                }
                Ok(Flow::More)
            }
            Expr::Yield { arg, delegate } => {
                let (arg, delegate) = (*arg, *delegate);
                if delegate {
                    let arg = arg.expect("yield* has an argument");
                    m.ctrl.push(Step::Delegate(Box::new(crate::machine::iter::DelegateStep::start())));
                    m.ctrl.push(Step::Eval(arg));
                } else {
                    m.ctrl.push(Step::YieldOp);
                    match arg {
                        Some(arg) => m.ctrl.push(Step::Eval(arg)),
                        None => m.ctrl.push(Step::Push(Value::Undefined)),
                    }
                }
                Ok(Flow::More)
            }
            Expr::Await(arg) => {
                let arg = *arg;
                m.ctrl.push(Step::AwaitOp);
                m.ctrl.push(Step::Eval(arg));
                Ok(Flow::More)
            }
            Expr::DynamicImport(arg) => {
                let arg = *arg;
                m.ctrl.push(Step::DynamicImportOp);
                m.ctrl.push(Step::Eval(arg));
                Ok(Flow::More)
            }
            Expr::PrivateIn { name, obj } => {
                let (name, obj) = (*name, *obj);
                m.ctrl.push(Step::PrivateInOp { name });
                m.ctrl.push(Step::Eval(obj));
                Ok(Flow::More)
            }
        }
    }

    /// Compiles the callee of a call: member callees carry their receiver.
    fn push_callee_steps(&mut self, m: &mut Machine, callee: ExprId) -> RunResult<()> {
        match self.code.expr(callee) {
            Expr::Member { obj, key, optional } => {
                let (obj, key, optional) = (*obj, *key, *optional);
                let sel = self.member_sel(&key);
                m.ctrl.push(Step::GetMethod { sel, optional });
                if let MemberKey::Computed(k) = key {
                    m.ctrl.push(Step::Eval(k));
                }
                m.ctrl.push(Step::Eval(obj));
            }
            Expr::SuperMember { key } => {
                let key = *key;
                let sel = self.member_sel(&key);
                m.ctrl.push(Step::SuperGetMethod { sel });
                if let MemberKey::Computed(k) = key {
                    m.ctrl.push(Step::Eval(k));
                }
            }
            _ => {
                m.ctrl.push(Step::Eval(callee));
                m.ctrl.push(Step::Push(Value::Undefined));
            }
        }
        Ok(())
    }

    fn member_sel(&mut self, key: &MemberKey) -> MemberSel {
        match key {
            MemberKey::Static(id) => MemberSel::Static(Key::from_string_id(&self.interns, *id)),
            MemberKey::Computed(_) => MemberSel::Computed,
            MemberKey::Private(id) => MemberSel::Private(*id),
        }
    }

    fn eval_unary(&mut self, m: &mut Machine, op: UnaryOp, operand: ExprId) -> RunResult<Flow> {
        match op {
            UnaryOp::Typeof => {
                if let Expr::Ident(name) = self.code.expr(operand) {
                    let name = *name;
                    m.ctrl.push(Step::TypeofIdent { name });
                    return Ok(Flow::More);
                }
            }
            UnaryOp::Delete => {
                // unwrap an optional-chain wrapper around the member
                let target = match self.code.expr(operand) {
                    Expr::Chain(inner) => *inner,
                    _ => operand,
                };
                if let Expr::Member { obj, key, .. } = self.code.expr(target) {
                    let (obj, key) = (*obj, *key);
                    match key {
                        MemberKey::Computed(k) => {
                            m.ctrl.push(Step::DeleteMember { computed: true, key: None });
                            m.ctrl.push(Step::Eval(k));
                        }
                        MemberKey::Static(id) => {
                            let key = Key::from_string_id(&self.interns, id);
                            m.ctrl.push(Step::DeleteMember { computed: false, key: Some(key) });
                        }
                        MemberKey::Private(_) => {
                            return Err(RunError::syntax_err("private fields cannot be deleted"));
                        }
                    }
                    m.ctrl.push(Step::Eval(obj));
                    return Ok(Flow::More);
                }
                if let Expr::Ident(name) = self.code.expr(operand) {
                    let name = *name;
                    let deleted = self.delete_unqualified(m, name)?;
                    m.push(Value::Bool(deleted));
                    return Ok(Flow::More);
                }
            }
            _ => {}
        }
        m.ctrl.push(Step::UnOp(op));
        m.ctrl.push(Step::Eval(operand));
        Ok(Flow::More)
    }

    /// Sloppy-mode `delete ident`: only deletable as a global object
    /// property.
    fn delete_unqualified(&mut self, m: &Machine, name: crate::intern::StringId) -> RunResult<bool> {
        let mut cur = Some(m.env);
        while let Some(id) = cur {
            let scope = self.heap.scope(id);
            if scope.bindings.contains_key(&name) {
                return Ok(false);
            }
            cur = scope.parent;
        }
        let global = self.realm.global_obj;
        if self.heap.obj(global).has_own(&Key::Str(name)) {
            return self.delete_prop(global, &Key::Str(name), false);
        }
        Ok(true)
    }

    fn eval_assign(
        &mut self,
        m: &mut Machine,
        op: AssignOp,
        target: crate::ast::PatId,
        value: ExprId,
    ) -> RunResult<Flow> {
        match op {
            AssignOp::Assign => match self.code.pat(target) {
                Pat::Ident(name) => {
                    let name = *name;
                    m.ctrl.push(Step::StoreIdent { name, push: true });
                    if self.expr_is_anonymous_fn(value) {
                        m.ctrl.push(Step::NameAnon(name));
                    }
                    m.ctrl.push(Step::Eval(value));
                    Ok(Flow::More)
                }
                Pat::Expr(member) => {
                    let member = *member;
                    self.push_member_store(m, member, value)?;
                    Ok(Flow::More)
                }
                _ => {
                    // destructuring assignment: value stays as the result
                    m.ctrl.push(Step::BindPat { pat: target, mode: BindMode::Assign });
                    m.ctrl.push(Step::Dup);
                    m.ctrl.push(Step::Eval(value));
                    Ok(Flow::More)
                }
            },
            AssignOp::Bin(bin) => match self.code.pat(target) {
                Pat::Ident(name) => {
                    let name = *name;
                    m.ctrl.push(Step::StoreIdent { name, push: true });
                    m.ctrl.push(Step::BinOp(bin));
                    m.ctrl.push(Step::Eval(value));
                    m.ctrl.push(Step::LoadIdent { name });
                    Ok(Flow::More)
                }
                Pat::Expr(member) => {
                    let member = *member;
                    match self.code.expr(member) {
                        Expr::Member { obj, key, .. } => {
                            let (obj, key) = (*obj, *key);
                            let sel = self.member_sel(&key);
                            m.ctrl.push(Step::StoreMember { sel, push: true });
                            m.ctrl.push(Step::BinOp(bin));
                            m.ctrl.push(Step::Eval(value));
                            m.ctrl.push(Step::GetMemberKeep { sel });
                            if let MemberKey::Computed(k) = key {
                                m.ctrl.push(Step::Eval(k));
                            }
                            m.ctrl.push(Step::Eval(obj));
                            Ok(Flow::More)
                        }
                        Expr::SuperMember { key } => {
                            let key = *key;
                            let MemberKey::Static(_) = key else {
                                return Err(RunError::syntax_err(
                                    "compound assignment to a computed super member is not supported",
                                ));
                            };
                            let sel = self.member_sel(&key);
                            m.ctrl.push(Step::SuperStoreMember { sel, push: true });
                            m.ctrl.push(Step::BinOp(bin));
                            m.ctrl.push(Step::Eval(value));
                            m.ctrl.push(Step::SuperGetMember { sel });
                            Ok(Flow::More)
                        }
                        _ => Err(RunError::syntax_err("invalid assignment target")),
                    }
                }
                _ => Err(RunError::syntax_err("invalid compound assignment target")),
            },
            AssignOp::Logical(op) => match self.code.pat(target) {
                Pat::Ident(name) => {
                    let name = *name;
                    m.ctrl.push(Step::LogicalAssignIdent { op, name, value });
                    Ok(Flow::More)
                }
                Pat::Expr(member) => match self.code.expr(*member) {
                    Expr::Member { obj, key, .. } => {
                        let (obj, key) = (*obj, *key);
                        let sel = self.member_sel(&key);
                        m.ctrl.push(Step::LogicalMemberJump { op, sel, value, push: true });
                        m.ctrl.push(Step::GetMemberKeep { sel });
                        if let MemberKey::Computed(k) = key {
                            m.ctrl.push(Step::Eval(k));
                        }
                        m.ctrl.push(Step::Eval(obj));
                        Ok(Flow::More)
                    }
                    _ => Err(RunError::syntax_err("invalid logical assignment target")),
                },
                _ => Err(RunError::syntax_err("invalid logical assignment target")),
            },
        }
    }

    /// `member = value` with spec evaluation order (receiver, key, value).
    fn push_member_store(&mut self, m: &mut Machine, member: ExprId, value: ExprId) -> RunResult<()> {
        match self.code.expr(member) {
            Expr::Member { obj, key, .. } => {
                let (obj, key) = (*obj, *key);
                let sel = self.member_sel(&key);
                m.ctrl.push(Step::StoreMember { sel, push: true });
                m.ctrl.push(Step::Eval(value));
                if let MemberKey::Computed(k) = key {
                    m.ctrl.push(Step::Eval(k));
                }
                m.ctrl.push(Step::Eval(obj));
                Ok(())
            }
            Expr::SuperMember { key } => {
                let key = *key;
                let sel = self.member_sel(&key);
                m.ctrl.push(Step::SuperStoreMember { sel, push: true });
                m.ctrl.push(Step::Eval(value));
                if let MemberKey::Computed(k) = key {
                    m.ctrl.push(Step::Eval(k));
                }
                Ok(())
            }
            _ => Err(RunError::syntax_err("invalid assignment target")),
        }
    }

    /// The frozen strings object of a tagged template.
    fn make_template_strings_object(&mut self, quasis: &[Quasi]) -> RunResult<Value> {
        let mut cooked = Vec::with_capacity(quasis.len());
        let mut raw = Vec::with_capacity(quasis.len());
        for q in quasis {
            cooked.push(match q.cooked {
                Some(id) => Value::InternString(id),
                None => Value::Undefined,
            });
            raw.push(Value::InternString(q.raw));
        }
        let strings = self.make_array(cooked)?;
        let raw_arr = self.make_array(raw)?;
        let strings_id = strings.object_id(&self.heap).expect("array");
        self.heap.obj_mut(strings_id).define(
            Key::Str(StaticStrings::Raw.id()),
            Property::method(raw_arr),
        );
        let obj = self.heap.obj_mut(strings_id);
        obj.frozen = true;
        obj.extensible = false;
        Ok(strings)
    }

    // === literal builder steps ===

    pub(crate) fn step_array_lit(&mut self, m: &mut Machine, mut step: Box<ArrayLitStep>) -> RunResult<Flow> {
        if step.waiting {
            step.waiting = false;
            let v = m.pop();
            match step.elems[step.idx - 1] {
                ArrayElem::Item(_) => {
                    self.heap
                        .obj_mut(step.array)
                        .define(Key::Index(step.next_index), Property::data(v));
                    step.next_index += 1;
                }
                ArrayElem::Spread(_) => {
                    let items = self.iter_collect(v)?;
                    for item in items {
                        self.heap
                            .obj_mut(step.array)
                            .define(Key::Index(step.next_index), Property::data(item));
                        step.next_index += 1;
                    }
                }
                ArrayElem::Hole => unreachable!("holes are not evaluated"),
            }
        }
        while step.idx < step.elems.len() {
            match step.elems[step.idx] {
                ArrayElem::Hole => {
                    step.idx += 1;
                    step.next_index += 1;
                }
                ArrayElem::Item(e) | ArrayElem::Spread(e) => {
                    step.idx += 1;
                    step.waiting = true;
                    m.ctrl.push(Step::ArrayLit(step));
                    m.ctrl.push(Step::Eval(e));
                    return Ok(Flow::More);
                }
            }
        }
        let array = step.array;
        if let ObjectKind::Array { length } = &mut self.heap.obj_mut(array).kind {
            *length = (*length).max(step.next_index);
        }
        m.push(Value::Ref(array));
        Ok(Flow::More)
    }

    pub(crate) fn step_object_lit(&mut self, m: &mut Machine, mut step: Box<ObjectLitStep>) -> RunResult<Flow> {
        match step.waiting {
            Waiting::None => {}
            Waiting::Key => {
                let key_val = m.pop();
                step.pending_key = Some(self.to_property_key(key_val)?);
                step.waiting = Waiting::None;
                // now evaluate the value for this property
                let prop = step.props[step.idx - 1];
                match prop {
                    PropDef::Init { value, .. } => {
                        step.waiting = Waiting::Value;
                        m.ctrl.push(Step::ObjectLit(step));
                        m.ctrl.push(Step::Eval(value));
                        return Ok(Flow::More);
                    }
                    PropDef::Method { func, .. } | PropDef::Get { func, .. } | PropDef::Set { func, .. } => {
                        let key = step.pending_key.take().expect("key just resolved");
                        self.install_literal_method(m, &mut step, key, prop, func)?;
                    }
                    PropDef::Spread(_) | PropDef::Proto(_) => unreachable!("no computed key"),
                }
            }
            Waiting::Value => {
                step.waiting = Waiting::None;
                let value = m.pop();
                let prop = step.props[step.idx - 1];
                match prop {
                    PropDef::Init { .. } => {
                        let key = step.pending_key.take().expect("pending key");
                        self.heap.obj_mut(step.obj).define(key, Property::data(value));
                    }
                    PropDef::Spread(_) => {
                        self.copy_data_properties(step.obj, value)?;
                    }
                    PropDef::Proto(_) => {
                        if let Some(id) = value.object_id(&self.heap) {
                            self.set_proto_checked(step.obj, Some(id))?;
                        } else if matches!(value, Value::Null) {
                            self.heap.obj_mut(step.obj).proto = None;
                        }
                        // other primitives are ignored
                    }
                    _ => unreachable!("only value-producing props wait on values"),
                }
            }
        }
        while step.idx < step.props.len() {
            let prop = step.props[step.idx];
            step.idx += 1;
            match prop {
                PropDef::Init { key, value } => match key {
                    PropName::Static(id) => {
                        step.pending_key = Some(Key::from_string_id(&self.interns, id));
                        step.waiting = Waiting::Value;
                        let anon = self.expr_is_anonymous_fn(value);
                        m.ctrl.push(Step::ObjectLit(step));
                        if anon {
                            m.ctrl.push(Step::NameAnon(id));
                        }
                        m.ctrl.push(Step::Eval(value));
                        return Ok(Flow::More);
                    }
                    PropName::Computed(k) => {
                        step.waiting = Waiting::Key;
                        m.ctrl.push(Step::ObjectLit(step));
                        m.ctrl.push(Step::Eval(k));
                        return Ok(Flow::More);
                    }
                },
                PropDef::Method { key, func } | PropDef::Get { key, func } | PropDef::Set { key, func } => {
                    match key {
                        PropName::Static(id) => {
                            let key = Key::from_string_id(&self.interns, id);
                            self.install_literal_method(m, &mut step, key, prop, func)?;
                        }
                        PropName::Computed(k) => {
                            step.waiting = Waiting::Key;
                            m.ctrl.push(Step::ObjectLit(step));
                            m.ctrl.push(Step::Eval(k));
                            return Ok(Flow::More);
                        }
                    }
                }
                PropDef::Spread(e) | PropDef::Proto(e) => {
                    step.waiting = Waiting::Value;
                    m.ctrl.push(Step::ObjectLit(step));
                    m.ctrl.push(Step::Eval(e));
                    return Ok(Flow::More);
                }
            }
        }
        let obj = step.obj;
        m.push(Value::Ref(obj));
        Ok(Flow::More)
    }

    /// Creates a literal method/accessor closure with its home object set.
    fn install_literal_method(
        &mut self,
        m: &Machine,
        step: &mut ObjectLitStep,
        key: Key,
        prop: PropDef,
        func: crate::intern::FuncId,
    ) -> RunResult<()> {
        let name_hint = match key {
            Key::Str(id) => Some(id),
            _ => None,
        };
        let closure = self.make_closure(func, m.env, name_hint)?;
        if let Some(cid) = closure.object_id(&self.heap)
            && let ObjectKind::Function(crate::object::FuncKind::User(user)) = &mut self.heap.obj_mut(cid).kind
        {
            user.home_object = Some(step.obj);
        }
        let obj = self.heap.obj_mut(step.obj);
        match prop {
            PropDef::Method { .. } => obj.define(key, Property::data(closure)),
            PropDef::Get { .. } => {
                let set = match obj.own(&key) {
                    Some(Property::Accessor { set, .. }) => *set,
                    _ => None,
                };
                obj.define(
                    key,
                    Property::Accessor { get: Some(closure), set, enumerable: true, configurable: true },
                );
            }
            PropDef::Set { .. } => {
                let get = match obj.own(&key) {
                    Some(Property::Accessor { get, .. }) => *get,
                    _ => None,
                };
                obj.define(
                    key,
                    Property::Accessor { get, set: Some(closure), enumerable: true, configurable: true },
                );
            }
            _ => unreachable!("method-family props only"),
        }
        Ok(())
    }

    /// `{...spread}`: copies own enumerable properties (values read through
    /// getters).
    pub(crate) fn copy_data_properties(&mut self, target: HeapId, source: Value) -> RunResult<()> {
        if source.is_nullish() {
            return Ok(());
        }
        // string primitives spread their indices
        if let Some(s) = source.as_str(&self.heap, &self.interns) {
            let chars: Vec<String> = s.chars().map(|c| c.to_string()).collect();
            let mut unit = 0u32;
            for c in chars {
                let w = crate::types::str::utf16_len(&c) as u32;
                let v = Value::string(&mut self.heap, c)?;
                self.heap.obj_mut(target).define(Key::Index(unit), Property::data(v));
                unit += w;
            }
            return Ok(());
        }
        let Some(src_id) = source.object_id(&self.heap) else {
            return Ok(());
        };
        let keys = self.own_enumerable_keys(src_id);
        for key in keys {
            let v = self.get_prop(source, &key)?;
            self.heap.obj_mut(target).define(key, Property::data(v));
        }
        Ok(())
    }

    /// Own enumerable keys, including exotic index coverage.
    pub(crate) fn own_enumerable_keys(&self, obj_id: HeapId) -> Vec<Key> {
        let obj = self.heap.obj(obj_id);
        let mut keys: Vec<Key> = Vec::new();
        if let ObjectKind::TypedArray { length, .. } = &obj.kind {
            keys.extend((0..*length as u32).map(Key::Index));
        }
        keys.extend(
            obj.own_keys()
                .into_iter()
                .filter(|k| !matches!(k, Key::Sym(_)))
                .filter(|k| obj.own(k).is_some_and(|p| p.is_enumerable())),
        );
        keys
    }

    /// `Object.setPrototypeOf`/`__proto__` with cycle rejection.
    pub(crate) fn set_proto_checked(&mut self, obj: HeapId, proto: Option<HeapId>) -> RunResult<()> {
        if let Some(mut cur) = proto {
            loop {
                if cur == obj {
                    return Err(self.throw_type("Cyclic __proto__ value"));
                }
                match self.heap.obj(cur).proto {
                    Some(next) => cur = next,
                    None => break,
                }
            }
        }
        if !self.heap.obj(obj).extensible {
            return Err(self.throw_type("#<Object> is not extensible"));
        }
        self.heap.obj_mut(obj).proto = proto;
        Ok(())
    }
}
