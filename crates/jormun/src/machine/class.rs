//! Class evaluation: prototype wiring, method installation (with
//! `[[HomeObject]]` for `super`), computed member keys, instance fields,
//! private members, static members, and static initialization blocks.

use super::{Flow, Interp, Machine, Step};
use crate::{
    ast::{ClassId, ClassKey, ClassMemberKind, MethodKind},
    env::{Binding, Scope, ScopeKind},
    error::RunResult,
    heap::{HeapData, HeapId},
    intern::{StaticStrings, StringId},
    object::{
        ClassCtorData, CtorKind, FieldInit, FieldKind, FuncKind, JsObject, Key, ObjectKind, Property, ThisMode,
        UserFunc,
    },
    value::Value,
};

/// A static member evaluated after the class body is installed.
#[derive(Debug)]
pub(crate) enum StaticInit {
    Field { key: Key, init: Value },
    Block { func: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClassPhase {
    Start,
    WaitParent,
    Members,
}

/// Stateful class-evaluation step.
#[derive(Debug)]
pub(crate) struct ClassStep {
    pub class: ClassId,
    pub phase: ClassPhase,
    pub member_idx: usize,
    /// A computed member key is pending on the operand stack.
    pub waiting_key: bool,
    pub scope: HeapId,
    pub proto: HeapId,
    pub ctor_obj: HeapId,
    pub fields: Vec<FieldInit>,
    pub statics: Vec<StaticInit>,
    pub derived: bool,
}

impl Interp {
    /// Schedules evaluation of a class definition; the constructor function
    /// ends up on the operand stack.
    pub(crate) fn begin_class_eval(&mut self, m: &mut Machine, class: ClassId, _binding: Option<StringId>) -> RunResult<Flow> {
        // the class scope carries the (TDZ) class-name binding and is the
        // closure environment of every member
        let prev = m.env;
        let scope = self.heap.alloc(HeapData::Scope(Scope::new(Some(prev), ScopeKind::Block)))?;
        if let Some(name) = self.code.class(class).name {
            self.heap.scope_mut(scope).bindings.insert(name, Binding::uninit_const());
        }
        m.ctrl.push(Step::PopScope { prev });
        m.env = scope;
        let step = Box::new(ClassStep {
            class,
            phase: ClassPhase::Start,
            member_idx: 0,
            waiting_key: false,
            scope,
            proto: scope, // placeholder until Setup
            ctor_obj: scope,
            fields: Vec::new(),
            statics: Vec::new(),
            derived: false,
        });
        self.step_class(m, step)
    }

    pub(crate) fn step_class(&mut self, m: &mut Machine, mut step: Box<ClassStep>) -> RunResult<Flow> {
        match step.phase {
            ClassPhase::Start => {
                let parent = self.code.class(step.class).parent;
                match parent {
                    Some(parent) => {
                        step.phase = ClassPhase::WaitParent;
                        m.ctrl.push(Step::ClassEval(step));
                        m.ctrl.push(Step::Eval(parent));
                        Ok(Flow::More)
                    }
                    None => {
                        self.class_setup(&mut step, None)?;
                        step.phase = ClassPhase::Members;
                        self.step_class(m, step)
                    }
                }
            }
            ClassPhase::WaitParent => {
                let parent = m.pop();
                let heritage = match parent {
                    Value::Null => None,
                    _ => {
                        if !parent.is_callable(&self.heap) {
                            return Err(self.throw_type("Class extends value is not a constructor or null"));
                        }
                        Some(parent.object_id(&self.heap).expect("callable is an object"))
                    }
                };
                self.class_setup(&mut step, Some(heritage))?;
                step.phase = ClassPhase::Members;
                self.step_class(m, step)
            }
            ClassPhase::Members => self.class_members(m, step),
        }
    }

    /// Creates the prototype object and the constructor function.
    fn class_setup(&mut self, step: &mut ClassStep, heritage: Option<Option<HeapId>>) -> RunResult<()> {
        let def = self.code.class(step.class);
        let name = def.name;
        let ctor_id = def.ctor.expect("parser synthesizes a default constructor");
        let derived = def.parent.is_some();
        step.derived = derived;
        // prototype chain: proto -> parent.prototype (or Object.prototype);
        // constructor -> parent (or Function.prototype)
        let (proto_parent, ctor_parent) = match heritage {
            None => (Some(self.realm.object_proto), self.realm.function_proto),
            Some(None) => (None, self.realm.function_proto),
            Some(Some(parent)) => {
                let parent_proto = self.get_prop(Value::Ref(parent), &Key::Str(StaticStrings::Prototype.id()))?;
                let parent_proto = match parent_proto {
                    Value::Null => None,
                    other => Some(
                        other
                            .object_id(&self.heap)
                            .ok_or_else(|| self.throw_type("Class extends value has non-object prototype"))?,
                    ),
                };
                (parent_proto, parent)
            }
        };
        let proto = self
            .heap
            .alloc(HeapData::Object(JsObject::new(proto_parent, ObjectKind::Ordinary)))?;
        let user = UserFunc {
            func: ctor_id,
            env: step.scope,
            home_object: Some(proto),
            this_mode: ThisMode::Strict,
            ctor: if derived { CtorKind::Derived } else { CtorKind::Base },
            class_data: Some(Box::new(ClassCtorData::default())),
        };
        let mut ctor_obj = JsObject::new(
            Some(ctor_parent),
            ObjectKind::Function(FuncKind::User(Box::new(user))),
        );
        let name_val = match name {
            Some(id) => Value::InternString(id),
            None => Value::InternString(StaticStrings::Empty.id()),
        };
        ctor_obj.define(Key::Str(StaticStrings::Name.id()), Property::method_ro(name_val));
        let length = self.code.func(ctor_id).params.len();
        ctor_obj.define(
            Key::Str(StaticStrings::Length.id()),
            Property::method_ro(Value::Number(length as f64)),
        );
        ctor_obj.define(
            Key::Str(StaticStrings::Prototype.id()),
            Property::permanent(Value::Ref(proto)),
        );
        let ctor = self.heap.alloc(HeapData::Object(ctor_obj))?;
        self.heap.obj_mut(proto).define(
            Key::Str(StaticStrings::Constructor.id()),
            Property::method(Value::Ref(ctor)),
        );
        step.proto = proto;
        step.ctor_obj = ctor;
        Ok(())
    }

    fn class_members(&mut self, m: &mut Machine, mut step: Box<ClassStep>) -> RunResult<Flow> {
        if step.waiting_key {
            step.waiting_key = false;
            let key_val = m.pop();
            let key = self.to_property_key(key_val)?;
            let idx = step.member_idx - 1;
            self.install_member(&mut step, idx, key)?;
        }
        let member_count = self.code.class(step.class).members.len();
        while step.member_idx < member_count {
            let idx = step.member_idx;
            step.member_idx += 1;
            let key = match &self.code.class(step.class).members[idx].key {
                ClassKey::Static(id) => Some(Key::from_string_id(&self.interns, *id)),
                ClassKey::Private(id) => Some(Key::Private(*id)),
                ClassKey::Computed(expr) => {
                    let expr = *expr;
                    step.waiting_key = true;
                    m.ctrl.push(Step::ClassEval(step));
                    m.ctrl.push(Step::Eval(expr));
                    return Ok(Flow::More);
                }
            };
            self.install_member(&mut step, idx, key.expect("non-computed key"))?;
        }
        self.class_finish(m, step)
    }

    /// Installs one class member now that its key is resolved.
    fn install_member(&mut self, step: &mut ClassStep, idx: usize, key: Key) -> RunResult<()> {
        let member = &self.code.class(step.class).members[idx];
        let is_static = member.is_static;
        let target = if is_static { step.ctor_obj } else { step.proto };
        match &member.kind {
            ClassMemberKind::Method { func, kind } => {
                let (func, kind) = (*func, *kind);
                let name_hint = match key {
                    Key::Str(id) => Some(id),
                    _ => None,
                };
                let closure = self.make_closure(func, step.scope, name_hint)?;
                if let Some(cid) = closure.object_id(&self.heap) {
                    // methods are not constructors and have no `prototype`
                    self.heap.obj_mut(cid).remove(&Key::Str(StaticStrings::Prototype.id()));
                    if let ObjectKind::Function(FuncKind::User(user)) = &mut self.heap.obj_mut(cid).kind {
                        user.home_object = Some(target);
                    }
                }
                if matches!(key, Key::Private(_)) && !is_static && kind == MethodKind::Method {
                    // instance private methods live on the brand, installed
                    // per instance at construction
                    step.fields.push(FieldInit { key, kind: FieldKind::Value(closure) });
                    return Ok(());
                }
                let obj = self.heap.obj_mut(target);
                match kind {
                    MethodKind::Method => obj.define(key, Property::method(closure)),
                    MethodKind::Get => {
                        let set = match obj.own(&key) {
                            Some(Property::Accessor { set, .. }) => *set,
                            _ => None,
                        };
                        obj.define(key, Property::Accessor { get: Some(closure), set, enumerable: false, configurable: true });
                    }
                    MethodKind::Set => {
                        let get = match obj.own(&key) {
                            Some(Property::Accessor { get, .. }) => *get,
                            _ => None,
                        };
                        obj.define(key, Property::Accessor { get, set: Some(closure), enumerable: false, configurable: true });
                    }
                }
            }
            ClassMemberKind::Field { init } => {
                let init = *init;
                let home = target;
                let closure = match init {
                    Some(func) => {
                        let closure = self.make_closure(func, step.scope, None)?;
                        if let Some(cid) = closure.object_id(&self.heap)
                            && let ObjectKind::Function(FuncKind::User(user)) = &mut self.heap.obj_mut(cid).kind
                        {
                            user.home_object = Some(home);
                        }
                        Some(closure)
                    }
                    None => None,
                };
                if is_static {
                    step.statics.push(StaticInit::Field {
                        key,
                        init: closure.unwrap_or(Value::Undefined),
                    });
                } else {
                    step.fields.push(FieldInit {
                        key,
                        kind: match closure {
                            Some(c) => FieldKind::Init(c),
                            None => FieldKind::Undefined,
                        },
                    });
                }
            }
            ClassMemberKind::StaticBlock { func } => {
                let func = *func;
                let closure = self.make_closure(func, step.scope, None)?;
                if let Some(cid) = closure.object_id(&self.heap)
                    && let ObjectKind::Function(FuncKind::User(user)) = &mut self.heap.obj_mut(cid).kind
                {
                    user.home_object = Some(step.ctor_obj);
                }
                step.statics.push(StaticInit::Block { func: closure });
            }
        }
        Ok(())
    }

    /// Finalizes the class: stores instance fields on the constructor, binds
    /// the class name, runs static initializers in source order.
    fn class_finish(&mut self, m: &mut Machine, step: Box<ClassStep>) -> RunResult<Flow> {
        let ClassStep { class, scope, ctor_obj, fields, statics, .. } = *step;
        if let Some(FuncKind::User(_)) = self.heap.obj(ctor_obj).as_function() {
            if let ObjectKind::Function(FuncKind::User(user)) = &mut self.heap.obj_mut(ctor_obj).kind {
                user.class_data = Some(Box::new(ClassCtorData { fields }));
            }
        }
        // initialize the inner class-name binding before static members run
        if let Some(name) = self.code.class(class).name {
            self.heap.scope_mut(scope).bindings.insert(
                name,
                Binding::Slot { value: Value::Ref(ctor_obj), mutable: false, initialized: true },
            );
        }
        for static_init in statics {
            match static_init {
                StaticInit::Field { key, init } => {
                    let value = if init.is_callable(&self.heap) {
                        self.call_sync(init, Value::Ref(ctor_obj), &[])?
                    } else {
                        Value::Undefined
                    };
                    self.heap.obj_mut(ctor_obj).define(key, Property::data(value));
                }
                StaticInit::Block { func } => {
                    self.call_sync(func, Value::Ref(ctor_obj), &[])?;
                }
            }
        }
        m.push(Value::Ref(ctor_obj));
        Ok(Flow::More)
    }

    /// Installs instance fields (and private methods) on a new instance.
    pub(crate) fn install_instance_fields(&mut self, instance: Value, fields: &[FieldInit]) -> RunResult<()> {
        let Some(obj_id) = instance.object_id(&self.heap) else {
            return Ok(());
        };
        let fields: Vec<FieldInit> = fields.to_vec();
        for field in fields {
            let value = match field.kind {
                FieldKind::Init(closure) => self.call_sync(closure, instance, &[])?,
                FieldKind::Value(v) => v,
                FieldKind::Undefined => Value::Undefined,
            };
            let prop = match field.key {
                Key::Private(_) => Property::method(value),
                _ => Property::data(value),
            };
            self.heap.obj_mut(obj_id).define(field.key, prop);
        }
        Ok(())
    }
}
