//! Destructuring: binding patterns for declarations, parameters, catch
//! clauses, assignment targets, and loop heads.
//!
//! Array patterns drive the iterator protocol (closing the iterator when the
//! pattern exhausts first); object patterns track consumed keys for rest
//! elements; defaults evaluate lazily as machine steps, so a `yield` inside
//! a destructuring default suspends like any other.

use super::{BindMode, Flow, Interp, Machine, MemberSel, Step, iter::IterRecord};
use crate::{
    ast::{Expr, MemberKey, Pat, PatId, PropName},
    error::{RunError, RunResult},
    intern::StringId,
    object::{Key, Property},
    value::Value,
};

/// Object-pattern progress.
#[derive(Debug)]
pub(crate) struct ObjPatStep {
    pub pat: PatId,
    pub idx: usize,
    pub value: Value,
    pub mode: BindMode,
    /// Keys consumed so far (excluded from a rest element).
    pub used: Vec<Key>,
    /// A computed key is pending on the operand stack.
    pub waiting_key: bool,
}

/// Array-pattern progress.
#[derive(Debug)]
pub(crate) struct ArrPatStep {
    pub pat: PatId,
    pub idx: usize,
    pub mode: BindMode,
    pub iter: Option<IterRecord>,
    pub done: bool,
}

impl Interp {
    /// Pops a value and binds it to a pattern.
    pub(crate) fn step_bind_pat(&mut self, m: &mut Machine, pat: PatId, mode: BindMode) -> RunResult<Flow> {
        let value = m.pop();
        match self.code.pat(pat) {
            Pat::Ident(name) => {
                let name = *name;
                self.bind_name(m, name, value, mode)?;
                Ok(Flow::More)
            }
            Pat::Expr(member) => {
                let member = *member;
                self.push_pattern_member_store(m, member, value)?;
                Ok(Flow::More)
            }
            Pat::Default { pat, init } => {
                let (pat, init) = (*pat, *init);
                m.ctrl.push(Step::BindPat { pat, mode });
                if matches!(value, Value::Undefined) {
                    let hint = match self.code.pat(pat) {
                        Pat::Ident(name) if self.expr_is_anonymous_fn(init) => Some(*name),
                        _ => None,
                    };
                    if let Some(name) = hint {
                        m.ctrl.push(Step::NameAnon(name));
                    }
                    m.ctrl.push(Step::Eval(init));
                } else {
                    m.ctrl.push(Step::Push(value));
                }
                Ok(Flow::More)
            }
            Pat::Object { .. } => {
                if value.is_nullish() {
                    return Err(self.throw_type(format!(
                        "Cannot destructure '{}' as it is {}",
                        if matches!(value, Value::Null) { "null" } else { "undefined" },
                        if matches!(value, Value::Null) { "null" } else { "undefined" },
                    )));
                }
                self.step_obj_pat(
                    m,
                    Box::new(ObjPatStep {
                        pat,
                        idx: 0,
                        value,
                        mode,
                        used: Vec::new(),
                        waiting_key: false,
                    }),
                )
            }
            Pat::Array { .. } => {
                let iter = self.get_iterator(value, false)?;
                self.step_arr_pat(
                    m,
                    Box::new(ArrPatStep {
                        pat,
                        idx: 0,
                        mode,
                        iter: Some(iter),
                        done: false,
                    }),
                )
            }
        }
    }

    fn bind_name(&mut self, m: &mut Machine, name: StringId, value: Value, mode: BindMode) -> RunResult<()> {
        match mode {
            BindMode::DeclareLet => {
                self.init_lexical(m.env, name, value, true);
                Ok(())
            }
            BindMode::DeclareConst => {
                self.init_lexical(m.env, name, value, false);
                Ok(())
            }
            BindMode::Var => self.assign_var(m, name, value),
            BindMode::Assign => self.assign_ident(m, name, value),
        }
    }

    /// Binds a member-expression target inside a destructuring pattern.
    fn push_pattern_member_store(&mut self, m: &mut Machine, member: crate::ast::ExprId, value: Value) -> RunResult<()> {
        match self.code.expr(member) {
            Expr::Member { obj, key, .. } => {
                let (obj, key) = (*obj, *key);
                let sel = match key {
                    MemberKey::Static(id) => MemberSel::Static(Key::from_string_id(&self.interns, id)),
                    MemberKey::Computed(_) => MemberSel::Computed,
                    MemberKey::Private(id) => MemberSel::Private(id),
                };
                m.ctrl.push(Step::StoreMember { sel, push: false });
                m.ctrl.push(Step::Push(value));
                if let MemberKey::Computed(k) = key {
                    m.ctrl.push(Step::Eval(k));
                }
                m.ctrl.push(Step::Eval(obj));
                Ok(())
            }
            Expr::SuperMember { key } => {
                let key = *key;
                let sel = match key {
                    MemberKey::Static(id) => MemberSel::Static(Key::from_string_id(&self.interns, id)),
                    MemberKey::Computed(_) => MemberSel::Computed,
                    MemberKey::Private(id) => MemberSel::Private(id),
                };
                m.ctrl.push(Step::SuperStoreMember { sel, push: false });
                m.ctrl.push(Step::Push(value));
                if let MemberKey::Computed(k) = key {
                    m.ctrl.push(Step::Eval(k));
                }
                Ok(())
            }
            _ => Err(RunError::syntax_err("invalid destructuring target")),
        }
    }

    pub(crate) fn step_obj_pat(&mut self, m: &mut Machine, mut step: Box<ObjPatStep>) -> RunResult<Flow> {
        if step.waiting_key {
            step.waiting_key = false;
            let key_val = m.pop();
            let key = self.to_property_key(key_val)?;
            return self.obj_pat_bind_prop(m, step, key);
        }
        let (props_len, rest) = match self.code.pat(step.pat) {
            Pat::Object { props, rest } => (props.len(), *rest),
            _ => unreachable!("object pattern step"),
        };
        if step.idx < props_len {
            let prop = match self.code.pat(step.pat) {
                Pat::Object { props, .. } => props[step.idx],
                _ => unreachable!("object pattern step"),
            };
            step.idx += 1;
            return match prop.key {
                PropName::Static(id) => {
                    let key = Key::from_string_id(&self.interns, id);
                    self.obj_pat_bind_prop(m, step, key)
                }
                PropName::Computed(k) => {
                    step.waiting_key = true;
                    m.ctrl.push(Step::ObjPat(step));
                    m.ctrl.push(Step::Eval(k));
                    Ok(Flow::More)
                }
            };
        }
        // rest element: remaining own enumerable properties
        if let Some(rest) = rest {
            let src = step.value;
            let obj = crate::object::JsObject::ordinary(self.realm.object_proto);
            let target = self.heap.alloc(crate::heap::HeapData::Object(obj))?;
            if let Some(src_id) = src.object_id(&self.heap) {
                let keys = self.own_enumerable_keys(src_id);
                for key in keys {
                    if step.used.contains(&key) {
                        continue;
                    }
                    let v = self.get_prop(src, &key)?;
                    self.heap.obj_mut(target).define(key, Property::data(v));
                }
            }
            let mode = step.mode;
            m.ctrl.push(Step::BindPat { pat: rest, mode });
            m.ctrl.push(Step::Push(Value::Ref(target)));
        }
        Ok(Flow::More)
    }

    fn obj_pat_bind_prop(&mut self, m: &mut Machine, mut step: Box<ObjPatStep>, key: Key) -> RunResult<Flow> {
        let sub_pat = match self.code.pat(step.pat) {
            Pat::Object { props, .. } => props[step.idx - 1].value,
            _ => unreachable!("object pattern step"),
        };
        step.used.push(key);
        let fetched = self.get_prop(step.value, &key)?;
        let mode = step.mode;
        m.ctrl.push(Step::ObjPat(step));
        m.ctrl.push(Step::BindPat { pat: sub_pat, mode });
        m.ctrl.push(Step::Push(fetched));
        Ok(Flow::More)
    }

    pub(crate) fn step_arr_pat(&mut self, m: &mut Machine, mut step: Box<ArrPatStep>) -> RunResult<Flow> {
        let (elems_len, rest) = match self.code.pat(step.pat) {
            Pat::Array { elems, rest } => (elems.len(), *rest),
            _ => unreachable!("array pattern step"),
        };
        while step.idx < elems_len {
            let elem = match self.code.pat(step.pat) {
                Pat::Array { elems, .. } => elems[step.idx],
                _ => unreachable!("array pattern step"),
            };
            step.idx += 1;
            let value = self.arr_pat_next(&mut step)?;
            match elem {
                None => {} // hole: value consumed and discarded
                Some(pat) => {
                    let mode = step.mode;
                    m.ctrl.push(Step::ArrPat(step));
                    m.ctrl.push(Step::BindPat { pat, mode });
                    m.ctrl.push(Step::Push(value));
                    return Ok(Flow::More);
                }
            }
        }
        if let Some(rest_pat) = rest {
            let mut items = Vec::new();
            while !step.done {
                let v = self.arr_pat_next(&mut step)?;
                if step.done {
                    break;
                }
                items.push(v);
            }
            let array = self.make_array(items)?;
            let mode = step.mode;
            m.ctrl.push(Step::BindPat { pat: rest_pat, mode });
            m.ctrl.push(Step::Push(array));
            return Ok(Flow::More);
        }
        // the pattern finished before the iterator: close it
        if !step.done
            && let Some(iter) = step.iter.take()
        {
            step.done = true;
            self.iter_close(&iter)?;
        }
        Ok(Flow::More)
    }

    /// One iterator step for an array pattern; `undefined` once exhausted.
    fn arr_pat_next(&mut self, step: &mut ArrPatStep) -> RunResult<Value> {
        if step.done {
            return Ok(Value::Undefined);
        }
        let iter = step.iter.clone().expect("live iterator");
        let result = self.call_sync(iter.next, iter.iter, &[])?;
        let (value, done) = self.iter_result_parts(result)?;
        if done {
            step.done = true;
            return Ok(Value::Undefined);
        }
        Ok(value)
    }
}
