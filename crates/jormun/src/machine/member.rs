//! Property access: prototype-chain reads, writes with accessor and
//! readonly handling, exotic-object hooks (arrays, string wrappers, typed
//! arrays, mapped `arguments`, module namespaces), `delete`, `in`,
//! `instanceof`, and the member-access steps.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::{Flow, Interp, Machine, MemberSel, Step};
use crate::{
    ast::LogicalOp,
    env::Binding,
    error::{RunError, RunResult},
    heap::{HeapData, HeapId},
    intern::{PrivateId, StaticStrings, WellKnown},
    object::{ElementKind, Key, ObjectKind, Property},
    types::{
        number::{to_int32, to_uint32},
        str::{char_at, utf16_len},
    },
    value::Value,
};

impl Interp {
    // === reads ===

    /// GetV: property read with a possibly-primitive receiver.
    pub(crate) fn get_prop(&mut self, receiver: Value, key: &Key) -> RunResult<Value> {
        match receiver {
            Value::Undefined | Value::Null => Err(self.throw_type(format!(
                "Cannot read properties of {} (reading '{}')",
                if matches!(receiver, Value::Null) { "null" } else { "undefined" },
                key.render(&self.interns)
            ))),
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Object(_) => self.get_prop_on(id, key, receiver),
                HeapData::Str(_) => self.get_string_prop(receiver, key),
                HeapData::BigInt(_) => self.get_proto_prop(self.realm.bigint_proto, key, receiver),
                HeapData::Scope(_) => unreachable!("scope frames are never values"),
            },
            Value::InternString(_) => self.get_string_prop(receiver, key),
            Value::Number(_) => self.get_proto_prop(self.realm.number_proto, key, receiver),
            Value::Bool(_) => self.get_proto_prop(self.realm.boolean_proto, key, receiver),
            Value::Symbol(sym) => {
                if *key == Key::Str(StaticStrings::Description.id()) {
                    let desc = self.interns.symbol(sym).description.clone();
                    return match desc {
                        Some(d) => Value::string(&mut self.heap, d),
                        None => Ok(Value::Undefined),
                    };
                }
                self.get_proto_prop(self.realm.symbol_proto, key, receiver)
            }
        }
    }

    /// String primitives: `length` and index reads resolve without boxing.
    fn get_string_prop(&mut self, receiver: Value, key: &Key) -> RunResult<Value> {
        match key {
            Key::Str(id) if *id == StaticStrings::Length.id() => {
                let s = receiver.as_str(&self.heap, &self.interns).expect("string receiver");
                Ok(Value::Number(utf16_len(s) as f64))
            }
            Key::Index(i) => {
                let s = receiver.as_str(&self.heap, &self.interns).expect("string receiver");
                match char_at(s, *i as usize) {
                    Some(c) => Value::string(&mut self.heap, c.to_string()),
                    None => Ok(Value::Undefined),
                }
            }
            _ => self.get_proto_prop(self.realm.string_proto, key, receiver),
        }
    }

    fn get_proto_prop(&mut self, proto: HeapId, key: &Key, receiver: Value) -> RunResult<Value> {
        self.get_prop_on(proto, key, receiver)
    }

    /// Ordinary get starting at `obj_id`, invoking getters with `receiver`.
    pub(crate) fn get_prop_on(&mut self, obj_id: HeapId, key: &Key, receiver: Value) -> RunResult<Value> {
        let mut cur = Some(obj_id);
        while let Some(id) = cur {
            if let Some(v) = self.exotic_get(id, key)? {
                return Ok(v);
            }
            let obj = self.heap.obj(id);
            if let Some(prop) = obj.own(key) {
                return match *prop {
                    Property::Data { value, .. } => Ok(value),
                    Property::Accessor { get, .. } => match get {
                        Some(getter) => self.call_sync(getter, receiver, &[]),
                        None => Ok(Value::Undefined),
                    },
                };
            }
            cur = obj.proto;
        }
        Ok(Value::Undefined)
    }

    /// Kind-specific own-property behavior on reads.
    fn exotic_get(&mut self, id: HeapId, key: &Key) -> RunResult<Option<Value>> {
        let obj = self.heap.obj(id);
        match &obj.kind {
            ObjectKind::Array { length } => {
                if *key == Key::Str(StaticStrings::Length.id()) {
                    return Ok(Some(Value::Number(f64::from(*length))));
                }
                Ok(None)
            }
            ObjectKind::Wrapper(v) if v.is_string(&self.heap) => {
                let v = *v;
                match key {
                    Key::Str(sid) if *sid == StaticStrings::Length.id() => {
                        let s = v.as_str(&self.heap, &self.interns).expect("string wrapper");
                        Ok(Some(Value::Number(utf16_len(s) as f64)))
                    }
                    Key::Index(i) => {
                        let i = *i as usize;
                        let s = v.as_str(&self.heap, &self.interns).expect("string wrapper");
                        match char_at(s, i) {
                            Some(c) => Ok(Some(Value::string(&mut self.heap, c.to_string())?)),
                            None => Ok(None),
                        }
                    }
                    _ => Ok(None),
                }
            }
            ObjectKind::TypedArray { length, .. } => match key {
                Key::Str(sid) if *sid == StaticStrings::Length.id() => {
                    Ok(Some(Value::Number(*length as f64)))
                }
                Key::Index(i) => {
                    let i = *i as usize;
                    Ok(self.typed_array_get(id, i)?)
                }
                _ => Ok(None),
            },
            ObjectKind::Arguments { env, mapped } => {
                if let Key::Index(i) = key
                    && let Some(Some(name)) = mapped.get(*i as usize)
                {
                    let (env, name) = (*env, *name);
                    if let Some(Binding::Slot { value, .. }) = self.heap.scope(env).bindings.get(&name) {
                        return Ok(Some(*value));
                    }
                }
                Ok(None)
            }
            ObjectKind::ModuleNamespace(module) => {
                let module = *module;
                if let Key::Str(name) = key {
                    return self.module_namespace_get(module, *name);
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// HasProperty (the `in` operator, `for-in` shadow checks).
    pub(crate) fn has_prop(&self, obj_id: HeapId, key: &Key) -> RunResult<bool> {
        let mut cur = Some(obj_id);
        while let Some(id) = cur {
            let obj = self.heap.obj(id);
            match (&obj.kind, key) {
                (ObjectKind::Array { .. }, Key::Str(sid)) if *sid == StaticStrings::Length.id() => return Ok(true),
                (ObjectKind::Array { length }, Key::Index(_)) => {
                    let _ = length;
                }
                (ObjectKind::TypedArray { length, .. }, Key::Index(i)) => {
                    return Ok((*i as usize) < *length);
                }
                (ObjectKind::Wrapper(v), Key::Index(i)) if v.is_string(&self.heap) => {
                    let s = v.as_str(&self.heap, &self.interns).expect("string wrapper");
                    if (*i as usize) < utf16_len(s) {
                        return Ok(true);
                    }
                }
                (ObjectKind::ModuleNamespace(module), Key::Str(name)) => {
                    return Ok(self.module_has_export(*module, *name));
                }
                _ => {}
            }
            if obj.has_own(key) {
                return Ok(true);
            }
            cur = obj.proto;
        }
        Ok(false)
    }

    // === writes ===

    /// OrdinarySet with exotic hooks. `receiver` is the original target for
    /// setter invocation and own-property creation.
    pub(crate) fn set_prop(
        &mut self,
        obj_id: HeapId,
        key: Key,
        value: Value,
        receiver: Value,
        strict: bool,
    ) -> RunResult<()> {
        // exotic writes short-circuit the ordinary algorithm
        if self.exotic_set(obj_id, &key, value, strict)? {
            return Ok(());
        }
        // walk the chain looking for an accessor or a readonly data prop
        let mut cur = Some(obj_id);
        while let Some(id) = cur {
            let obj = self.heap.obj(id);
            if let Some(prop) = obj.own(&key) {
                match *prop {
                    Property::Accessor { set, .. } => {
                        return match set {
                            Some(setter) => {
                                self.call_sync(setter, receiver, &[value])?;
                                Ok(())
                            }
                            None => {
                                if strict {
                                    Err(self.throw_type(format!(
                                        "Cannot set property '{}' which has only a getter",
                                        key.render(&self.interns)
                                    )))
                                } else {
                                    Ok(())
                                }
                            }
                        };
                    }
                    Property::Data { writable, .. } => {
                        if id == obj_id && receiver.object_id(&self.heap) == Some(obj_id) {
                            if !writable || obj.frozen {
                                return if strict {
                                    Err(self.throw_type(format!(
                                        "Cannot assign to read only property '{}'",
                                        key.render(&self.interns)
                                    )))
                                } else {
                                    Ok(())
                                };
                            }
                            let obj = self.heap.obj_mut(id);
                            if let Some(Property::Data { value: slot, .. }) = obj.own_mut(&key) {
                                *slot = value;
                            }
                            return Ok(());
                        }
                        if !writable {
                            return if strict {
                                Err(self.throw_type(format!(
                                    "Cannot assign to read only property '{}'",
                                    key.render(&self.interns)
                                )))
                            } else {
                                Ok(())
                            };
                        }
                        break;
                    }
                }
            }
            cur = obj.proto;
        }
        // create an own property on the receiver
        let Some(recv_id) = receiver.object_id(&self.heap) else {
            return if strict {
                Err(self.throw_type("Cannot create property on primitive value"))
            } else {
                Ok(())
            };
        };
        let recv = self.heap.obj(recv_id);
        if !recv.extensible || recv.frozen || recv.sealed {
            return if strict {
                Err(self.throw_type(format!(
                    "Cannot add property '{}', object is not extensible",
                    key.render(&self.interns)
                )))
            } else {
                Ok(())
            };
        }
        // array index writes extend `length`
        if let (ObjectKind::Array { length }, Key::Index(i)) = (&recv.kind, &key) {
            let new_len = i + 1;
            if new_len > *length {
                if let ObjectKind::Array { length } = &mut self.heap.obj_mut(recv_id).kind {
                    *length = new_len;
                }
            }
        }
        self.heap.obj_mut(recv_id).define(key, Property::data(value));
        Ok(())
    }

    /// Kind-specific writes; returns `true` when fully handled.
    fn exotic_set(&mut self, obj_id: HeapId, key: &Key, value: Value, strict: bool) -> RunResult<bool> {
        let obj = self.heap.obj(obj_id);
        match &obj.kind {
            ObjectKind::Array { length } => {
                if *key == Key::Str(StaticStrings::Length.id()) {
                    let length = *length;
                    let new_len = self.to_number(value)?;
                    let new_len_u = to_uint32(new_len);
                    if f64::from(new_len_u) != new_len {
                        return Err(RunError::range_err("Invalid array length"));
                    }
                    self.set_array_length(obj_id, length, new_len_u);
                    return Ok(true);
                }
                Ok(false)
            }
            ObjectKind::TypedArray { length, .. } => {
                if let Key::Index(i) = key {
                    let (i, length) = (*i as usize, *length);
                    let numeric = self.to_numeric(value)?;
                    if i < length {
                        self.typed_array_set(obj_id, i, numeric)?;
                    }
                    // out-of-range writes are dropped without creating props
                    return Ok(true);
                }
                Ok(false)
            }
            ObjectKind::Arguments { env, mapped } => {
                if let Key::Index(i) = key
                    && let Some(Some(name)) = mapped.get(*i as usize)
                {
                    let (env, name) = (*env, *name);
                    if let Some(Binding::Slot { value: slot, .. }) =
                        self.heap.scope_mut(env).bindings.get_mut(&name)
                    {
                        *slot = value;
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ObjectKind::ModuleNamespace(_) => {
                if strict {
                    Err(self.throw_type("Cannot assign to read only property of a module namespace"))
                } else {
                    Ok(true)
                }
            }
            _ => Ok(false),
        }
    }

    /// Shrinking an array's `length` deletes the truncated elements.
    fn set_array_length(&mut self, obj_id: HeapId, old_len: u32, new_len: u32) {
        if new_len < old_len {
            let doomed: Vec<Key> = self
                .heap
                .obj(obj_id)
                .props
                .keys()
                .filter(|k| matches!(k, Key::Index(i) if *i >= new_len))
                .copied()
                .collect();
            let obj = self.heap.obj_mut(obj_id);
            for key in doomed {
                obj.remove(&key);
            }
        }
        if let ObjectKind::Array { length } = &mut self.heap.obj_mut(obj_id).kind {
            *length = new_len;
        }
    }

    /// Deletes a property; `false` when it was non-configurable (throws in
    /// strict mode).
    pub(crate) fn delete_prop(&mut self, obj_id: HeapId, key: &Key, strict: bool) -> RunResult<bool> {
        let obj = self.heap.obj(obj_id);
        match obj.own(key) {
            None => Ok(true),
            Some(prop) => {
                if !prop.is_configurable() || obj.sealed || obj.frozen {
                    if strict {
                        return Err(self.throw_type(format!(
                            "Cannot delete property '{}'",
                            key.render(&self.interns)
                        )));
                    }
                    return Ok(false);
                }
                self.heap.obj_mut(obj_id).remove(key);
                Ok(true)
            }
        }
    }

    // === typed array elements ===

    pub(crate) fn typed_array_get(&mut self, id: HeapId, index: usize) -> RunResult<Option<Value>> {
        let ObjectKind::TypedArray { kind, buffer, byte_offset, length } = &self.heap.obj(id).kind else {
            panic!("typed_array_get on non typed array");
        };
        let (kind, buffer, byte_offset, length) = (*kind, *buffer, *byte_offset, *length);
        if index >= length {
            return Ok(None);
        }
        let HeapData::Object(buf_obj) = self.heap.get(buffer) else {
            panic!("typed array buffer");
        };
        let ObjectKind::ArrayBuffer(data) = &buf_obj.kind else {
            panic!("typed array buffer");
        };
        let at = byte_offset + index * kind.size();
        let bytes = &data[at..at + kind.size()];
        let value = match kind {
            ElementKind::Int8 => Value::Number(f64::from(bytes[0] as i8)),
            ElementKind::Uint8 | ElementKind::Uint8Clamped => Value::Number(f64::from(bytes[0])),
            ElementKind::Int16 => Value::Number(f64::from(i16::from_le_bytes([bytes[0], bytes[1]]))),
            ElementKind::Uint16 => Value::Number(f64::from(u16::from_le_bytes([bytes[0], bytes[1]]))),
            ElementKind::Int32 => {
                Value::Number(f64::from(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])))
            }
            ElementKind::Uint32 => {
                Value::Number(f64::from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])))
            }
            ElementKind::Float32 => {
                Value::Number(f64::from(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])))
            }
            ElementKind::Float64 => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(bytes);
                Value::Number(f64::from_le_bytes(arr))
            }
            ElementKind::BigInt64 => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(bytes);
                Value::bigint(&mut self.heap, BigInt::from(i64::from_le_bytes(arr)))?
            }
            ElementKind::BigUint64 => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(bytes);
                Value::bigint(&mut self.heap, BigInt::from(u64::from_le_bytes(arr)))?
            }
        };
        Ok(Some(value))
    }

    /// Stores a numeric value with per-kind clamping/wrapping.
    pub(crate) fn typed_array_set(&mut self, id: HeapId, index: usize, numeric: Value) -> RunResult<()> {
        let ObjectKind::TypedArray { kind, buffer, byte_offset, length } = &self.heap.obj(id).kind else {
            panic!("typed_array_set on non typed array");
        };
        let (kind, buffer, byte_offset, length) = (*kind, *buffer, *byte_offset, *length);
        if index >= length {
            return Ok(());
        }
        let bytes: Vec<u8> = if kind.is_bigint() {
            let Some(b) = numeric.as_bigint(&self.heap) else {
                return Err(self.throw_type("Cannot convert a non-BigInt value to a BigInt element"));
            };
            match kind {
                ElementKind::BigInt64 => wrap_bigint_i64(b).to_le_bytes().to_vec(),
                ElementKind::BigUint64 => wrap_bigint_u64(b).to_le_bytes().to_vec(),
                _ => unreachable!("bigint kinds"),
            }
        } else {
            let n = match numeric {
                Value::Number(n) => n,
                _ => return Err(self.throw_type("Cannot convert a BigInt value to a number element")),
            };
            match kind {
                ElementKind::Int8 => vec![to_int32(n) as i8 as u8],
                ElementKind::Uint8 => vec![to_uint32(n) as u8],
                ElementKind::Uint8Clamped => vec![clamp_u8(n)],
                ElementKind::Int16 => (to_int32(n) as i16).to_le_bytes().to_vec(),
                ElementKind::Uint16 => (to_uint32(n) as u16).to_le_bytes().to_vec(),
                ElementKind::Int32 => to_int32(n).to_le_bytes().to_vec(),
                ElementKind::Uint32 => to_uint32(n).to_le_bytes().to_vec(),
                ElementKind::Float32 => (n as f32).to_le_bytes().to_vec(),
                ElementKind::Float64 => n.to_le_bytes().to_vec(),
                ElementKind::BigInt64 | ElementKind::BigUint64 => unreachable!("handled above"),
            }
        };
        let HeapData::Object(buf_obj) = self.heap.get_mut(buffer) else {
            panic!("typed array buffer");
        };
        let ObjectKind::ArrayBuffer(data) = &mut buf_obj.kind else {
            panic!("typed array buffer");
        };
        let at = byte_offset + index * kind.size();
        data[at..at + bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }

    // === instanceof ===

    pub(crate) fn instance_of(&mut self, lhs: Value, rhs: Value) -> RunResult<Value> {
        let Some(rhs_id) = rhs.object_id(&self.heap) else {
            return Err(self.throw_type("Right-hand side of 'instanceof' is not an object"));
        };
        let has_instance = self.get_prop(rhs, &Key::Sym(WellKnown::HasInstance.id()))?;
        if !has_instance.is_nullish() {
            if !has_instance.is_callable(&self.heap) {
                return Err(self.throw_type("Symbol.hasInstance is not a function"));
            }
            let result = self.call_sync(has_instance, rhs, &[lhs])?;
            return Ok(Value::Bool(result.to_boolean(&self.heap, &self.interns)));
        }
        if !rhs.is_callable(&self.heap) {
            return Err(self.throw_type("Right-hand side of 'instanceof' is not callable"));
        }
        // bound functions check against their target
        let target = match &self.heap.obj(rhs_id).kind {
            ObjectKind::Function(crate::object::FuncKind::Bound(b)) => Value::Ref(b.target),
            _ => rhs,
        };
        let proto = self.get_prop(target, &Key::Str(StaticStrings::Prototype.id()))?;
        let Some(proto_id) = proto.object_id(&self.heap) else {
            return Err(self.throw_type("Function has non-object prototype in instanceof check"));
        };
        let Some(lhs_id) = lhs.object_id(&self.heap) else {
            return Ok(Value::Bool(false));
        };
        let mut cur = self.heap.obj(lhs_id).proto;
        while let Some(id) = cur {
            if id == proto_id {
                return Ok(Value::Bool(true));
            }
            cur = self.heap.obj(id).proto;
        }
        Ok(Value::Bool(false))
    }

    // === member steps ===

    /// Resolves a computed key from the stack, or uses the static one.
    fn take_key(&mut self, m: &mut Machine, sel: MemberSel) -> RunResult<SelKey> {
        Ok(match sel {
            MemberSel::Static(key) => SelKey::Key(key),
            MemberSel::Computed => {
                let v = m.pop();
                SelKey::Key(self.to_property_key(v)?)
            }
            MemberSel::Private(id) => SelKey::Private(id),
        })
    }

    fn private_get(&mut self, obj: Value, id: PrivateId) -> RunResult<Value> {
        let name = self.code.private_name(id).name;
        let Some(obj_id) = obj.object_id(&self.heap) else {
            return Err(self.throw_type(format!(
                "Cannot read private member #{} from an object whose class did not declare it",
                self.interns.str(name)
            )));
        };
        match self.heap.obj(obj_id).own(&Key::Private(id)) {
            Some(Property::Data { value, .. }) => Ok(*value),
            Some(Property::Accessor { get, .. }) => {
                let get = *get;
                match get {
                    Some(g) => self.call_sync(g, obj, &[]),
                    None => Err(self.throw_type("private accessor has no getter")),
                }
            }
            None => Err(self.throw_type(format!(
                "Cannot read private member #{} from an object whose class did not declare it",
                self.interns.str(name)
            ))),
        }
    }

    fn private_set(&mut self, obj: Value, id: PrivateId, value: Value) -> RunResult<()> {
        let name = self.code.private_name(id).name;
        let missing = || {
            format!(
                "Cannot write private member #{} to an object whose class did not declare it",
                self.interns.str(name)
            )
        };
        let Some(obj_id) = obj.object_id(&self.heap) else {
            return Err(self.throw_type(missing()));
        };
        match self.heap.obj_mut(obj_id).own_mut(&Key::Private(id)) {
            Some(Property::Data { value: slot, .. }) => {
                *slot = value;
                Ok(())
            }
            Some(Property::Accessor { set, .. }) => {
                let set = *set;
                match set {
                    Some(s) => {
                        self.call_sync(s, obj, &[value])?;
                        Ok(())
                    }
                    None => Err(self.throw_type("private accessor has no setter")),
                }
            }
            None => Err(self.throw_type(missing())),
        }
    }

    /// Pops the chain's pending steps after a nullish optional receiver.
    pub(super) fn chain_short_circuit(&mut self, m: &mut Machine) {
        while let Some(step) = m.ctrl.pop() {
            if let Step::ChainEnd { vals_len } = step {
                m.vals.truncate(vals_len as usize);
                m.push(Value::Undefined);
                return;
            }
        }
        unreachable!("optional member outside a chain");
    }

    pub(crate) fn step_get_member(&mut self, m: &mut Machine, sel: MemberSel, optional: bool) -> RunResult<Flow> {
        let key = self.take_key(m, sel)?;
        let obj = m.pop();
        if optional && obj.is_nullish() {
            self.chain_short_circuit(m);
            return Ok(Flow::More);
        }
        let value = match key {
            SelKey::Key(key) => self.get_prop(obj, &key)?,
            SelKey::Private(id) => self.private_get(obj, id)?,
        };
        m.push(value);
        Ok(Flow::More)
    }

    pub(crate) fn step_get_method(&mut self, m: &mut Machine, sel: MemberSel, optional: bool) -> RunResult<Flow> {
        let key = self.take_key(m, sel)?;
        let obj = m.pop();
        if optional && obj.is_nullish() {
            self.chain_short_circuit(m);
            return Ok(Flow::More);
        }
        let func = match key {
            SelKey::Key(key) => self.get_prop(obj, &key)?,
            SelKey::Private(id) => self.private_get(obj, id)?,
        };
        m.push(obj);
        m.push(func);
        Ok(Flow::More)
    }

    pub(crate) fn step_store_member(&mut self, m: &mut Machine, sel: MemberSel, push: bool) -> RunResult<Flow> {
        let value = m.pop();
        let key = self.take_key(m, sel)?;
        let obj = m.pop();
        match key {
            SelKey::Key(key) => {
                let Some(obj_id) = obj.object_id(&self.heap) else {
                    if obj.is_nullish() {
                        return Err(self.throw_type(format!(
                            "Cannot set properties of {} (setting '{}')",
                            if matches!(obj, Value::Null) { "null" } else { "undefined" },
                            key.render(&self.interns)
                        )));
                    }
                    // primitive receivers silently drop in sloppy mode
                    if m.strict() {
                        return Err(self.throw_type("Cannot create property on primitive value"));
                    }
                    if push {
                        m.push(value);
                    }
                    return Ok(Flow::More);
                };
                let strict = m.strict();
                self.set_prop(obj_id, key, value, obj, strict)?;
            }
            SelKey::Private(id) => self.private_set(obj, id, value)?,
        }
        if push {
            m.push(value);
        }
        Ok(Flow::More)
    }

    /// For compound assignment: pops `[obj(, key)]`, pushes
    /// `[obj, (key,) current]`.
    pub(crate) fn step_get_member_keep(&mut self, m: &mut Machine, sel: MemberSel) -> RunResult<Flow> {
        match sel {
            MemberSel::Computed => {
                let key_val = m.pop();
                let obj = m.pop();
                let key = self.to_property_key(key_val)?;
                let value = self.get_prop(obj, &key)?;
                m.push(obj);
                m.push(key_val);
                m.push(value);
            }
            MemberSel::Static(key) => {
                let obj = m.pop();
                let value = self.get_prop(obj, &key)?;
                m.push(obj);
                m.push(value);
            }
            MemberSel::Private(id) => {
                let obj = m.pop();
                let value = self.private_get(obj, id)?;
                m.push(obj);
                m.push(value);
            }
        }
        Ok(Flow::More)
    }

    pub(crate) fn step_logical_member(
        &mut self,
        m: &mut Machine,
        op: LogicalOp,
        sel: MemberSel,
        value: crate::ast::ExprId,
        push: bool,
    ) -> RunResult<Flow> {
        // stack: [obj, (key,) current]
        let current = m.pop();
        let assign = match op {
            LogicalOp::And => current.to_boolean(&self.heap, &self.interns),
            LogicalOp::Or => !current.to_boolean(&self.heap, &self.interns),
            LogicalOp::Nullish => current.is_nullish(),
        };
        if assign {
            m.ctrl.push(Step::StoreMember { sel, push });
            m.ctrl.push(Step::Eval(value));
        } else {
            // drop obj (and key) left for the store
            if matches!(sel, MemberSel::Computed) {
                m.pop();
            }
            m.pop();
            if push {
                m.push(current);
            }
        }
        Ok(Flow::More)
    }

    pub(crate) fn step_delete_member(&mut self, m: &mut Machine, computed: bool, key: Option<Key>) -> RunResult<Flow> {
        let key = if computed {
            let v = m.pop();
            self.to_property_key(v)?
        } else {
            key.expect("static delete key")
        };
        let obj = m.pop();
        if obj.is_nullish() {
            return Err(self.throw_type("Cannot convert undefined or null to object"));
        }
        let result = match obj.object_id(&self.heap) {
            Some(id) => {
                let strict = m.strict();
                self.delete_prop(id, &key, strict)?
            }
            None => true,
        };
        m.push(Value::Bool(result));
        Ok(Flow::More)
    }

    pub(crate) fn step_update_member(
        &mut self,
        m: &mut Machine,
        sel: MemberSel,
        inc: bool,
        prefix: bool,
    ) -> RunResult<Flow> {
        // stack: [obj, (key,) current] (from GetMemberKeep)
        let current = m.pop();
        let (old_num, new) = self.update_numeric(current, inc)?;
        let strict = m.strict();
        match sel {
            MemberSel::Computed => {
                let key_val = m.pop();
                let obj = m.pop();
                let key = self.to_property_key(key_val)?;
                let obj_id = obj
                    .object_id(&self.heap)
                    .ok_or_else(|| self.throw_type("Cannot update property on primitive value"))?;
                self.set_prop(obj_id, key, new, obj, strict)?;
            }
            MemberSel::Static(key) => {
                let obj = m.pop();
                let obj_id = obj
                    .object_id(&self.heap)
                    .ok_or_else(|| self.throw_type("Cannot update property on primitive value"))?;
                self.set_prop(obj_id, key, new, obj, strict)?;
            }
            MemberSel::Private(id) => {
                let obj = m.pop();
                self.private_set(obj, id, new)?;
            }
        }
        m.push(if prefix { new } else { old_num });
        Ok(Flow::More)
    }

    // === super ===

    /// Resolves `[[HomeObject]]` and the current `this` of the running
    /// method.
    fn super_base(&mut self, m: &Machine) -> RunResult<(HeapId, Value)> {
        let fn_scope = self
            .fn_scope_of(m.env)
            .ok_or_else(|| RunError::syntax_err("'super' outside of a method"))?;
        let data = self.heap.scope(fn_scope).fn_data().expect("fn scope");
        let home = data
            .home_object
            .ok_or_else(|| RunError::syntax_err("'super' outside of a method"))?;
        let this = match &data.this {
            crate::env::ThisState::Bound(v) => *v,
            crate::env::ThisState::Uninitialized => {
                return Err(RunError::reference_err("must call super constructor before accessing 'this'"));
            }
        };
        let proto = self
            .heap
            .obj(home)
            .proto
            .ok_or_else(|| self.throw_type("'super' has a null prototype"))?;
        Ok((proto, this))
    }

    pub(crate) fn step_super_get(&mut self, m: &mut Machine, sel: MemberSel, method: bool) -> RunResult<Flow> {
        let key = self.take_key(m, sel)?;
        let (proto, this) = self.super_base(m)?;
        let SelKey::Key(key) = key else {
            return Err(self.throw_type("private members cannot be accessed through 'super'"));
        };
        let value = self.get_prop_on(proto, &key, this)?;
        if method {
            m.push(this);
        }
        m.push(value);
        Ok(Flow::More)
    }

    pub(crate) fn step_super_store(&mut self, m: &mut Machine, sel: MemberSel, push: bool) -> RunResult<Flow> {
        let value = m.pop();
        let key = self.take_key(m, sel)?;
        let (proto, this) = self.super_base(m)?;
        let SelKey::Key(key) = key else {
            return Err(self.throw_type("private members cannot be accessed through 'super'"));
        };
        let strict = m.strict();
        self.set_prop(proto, key, value, this, strict)?;
        if push {
            m.push(value);
        }
        Ok(Flow::More)
    }
}

enum SelKey {
    Key(Key),
    Private(PrivateId),
}

fn clamp_u8(n: f64) -> u8 {
    if n.is_nan() {
        return 0;
    }
    // Uint8Clamped rounds half to even
    let clamped = n.clamp(0.0, 255.0);
    let rounded = clamped.round();
    if (rounded - clamped).abs() == 0.5 && rounded % 2.0 != 0.0 {
        (rounded - 1.0) as u8
    } else {
        rounded as u8
    }
}

fn wrap_bigint_i64(b: &BigInt) -> i64 {
    let mask = BigInt::from(u64::MAX) + 1;
    let r: BigInt = ((b % &mask) + &mask) % &mask;
    r.to_u64().expect("masked to u64 range") as i64
}

fn wrap_bigint_u64(b: &BigInt) -> u64 {
    let mask = BigInt::from(u64::MAX) + 1;
    let r: BigInt = ((b % &mask) + &mask) % &mask;
    r.to_u64().expect("masked to u64 range")
}
