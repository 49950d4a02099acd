//! The `Object` constructor, its statics, and `Object.prototype`.

use super::arg;
use crate::{
    error::RunResult,
    heap::{HeapData, HeapId},
    intern::{StaticStrings, WellKnown},
    machine::Interp,
    object::{JsObject, Key, ObjectKind, Property},
    value::{Value, same_value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObjectFn {
    Ctor,
    Keys,
    Values,
    Entries,
    Assign,
    Freeze,
    IsFrozen,
    Seal,
    IsSealed,
    PreventExtensions,
    IsExtensible,
    Create,
    GetPrototypeOf,
    SetPrototypeOf,
    DefineProperty,
    DefineProperties,
    GetOwnPropertyNames,
    GetOwnPropertyDescriptor,
    FromEntries,
    Is,
    HasOwn,
    ProtoHasOwnProperty,
    ProtoToString,
    ProtoToLocaleString,
    ProtoValueOf,
    ProtoIsPrototypeOf,
    ProtoPropertyIsEnumerable,
}

pub(crate) fn call(interp: &mut Interp, f: ObjectFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    let a1 = arg(args, 1);
    match f {
        ObjectFn::Ctor => construct(interp, args),
        ObjectFn::Keys => {
            let id = interp.require_object(a0)?;
            let keys = interp.own_enumerable_keys(id);
            let mut out = Vec::with_capacity(keys.len());
            for key in keys {
                let s = key.render(&interp.interns);
                out.push(Value::string(&mut interp.heap, s)?);
            }
            interp.make_array(out)
        }
        ObjectFn::Values => {
            let id = interp.require_object(a0)?;
            let keys = interp.own_enumerable_keys(id);
            let mut out = Vec::with_capacity(keys.len());
            for key in keys {
                out.push(interp.get_prop(a0, &key)?);
            }
            interp.make_array(out)
        }
        ObjectFn::Entries => {
            let id = interp.require_object(a0)?;
            let keys = interp.own_enumerable_keys(id);
            let mut out = Vec::with_capacity(keys.len());
            for key in keys {
                let k = key.render(&interp.interns);
                let k = Value::string(&mut interp.heap, k)?;
                let v = interp.get_prop(a0, &key)?;
                out.push(interp.make_array(vec![k, v])?);
            }
            interp.make_array(out)
        }
        ObjectFn::Assign => {
            let target = interp.require_object(a0)?;
            for source in args.iter().skip(1) {
                interp.copy_data_properties(target, *source)?;
            }
            Ok(a0)
        }
        ObjectFn::Freeze => {
            if let Some(id) = a0.object_id(&interp.heap) {
                let obj = interp.heap.obj_mut(id);
                obj.extensible = false;
                obj.sealed = true;
                obj.frozen = true;
                for prop in obj.props.values_mut() {
                    match prop {
                        Property::Data { writable, configurable, .. } => {
                            *writable = false;
                            *configurable = false;
                        }
                        Property::Accessor { configurable, .. } => *configurable = false,
                    }
                }
            }
            Ok(a0)
        }
        ObjectFn::IsFrozen => Ok(Value::Bool(match a0.object_id(&interp.heap) {
            Some(id) => interp.heap.obj(id).frozen,
            None => true,
        })),
        ObjectFn::Seal => {
            if let Some(id) = a0.object_id(&interp.heap) {
                let obj = interp.heap.obj_mut(id);
                obj.extensible = false;
                obj.sealed = true;
                for prop in obj.props.values_mut() {
                    match prop {
                        Property::Data { configurable, .. } | Property::Accessor { configurable, .. } => {
                            *configurable = false;
                        }
                    }
                }
            }
            Ok(a0)
        }
        ObjectFn::IsSealed => Ok(Value::Bool(match a0.object_id(&interp.heap) {
            Some(id) => interp.heap.obj(id).sealed,
            None => true,
        })),
        ObjectFn::PreventExtensions => {
            if let Some(id) = a0.object_id(&interp.heap) {
                interp.heap.obj_mut(id).extensible = false;
            }
            Ok(a0)
        }
        ObjectFn::IsExtensible => Ok(Value::Bool(
            a0.object_id(&interp.heap).is_some_and(|id| interp.heap.obj(id).extensible),
        )),
        ObjectFn::Create => {
            let proto = match a0 {
                Value::Null => None,
                other => Some(
                    other
                        .object_id(&interp.heap)
                        .ok_or_else(|| interp.throw_type("Object prototype may only be an Object or null"))?,
                ),
            };
            let obj = JsObject::new(proto, ObjectKind::Ordinary);
            let id = interp.heap.alloc(HeapData::Object(obj))?;
            if let Some(desc_id) = a1.object_id(&interp.heap) {
                define_properties_from(interp, id, a1, desc_id)?;
            }
            Ok(Value::Ref(id))
        }
        ObjectFn::GetPrototypeOf => {
            let obj = interp.to_object(a0)?;
            let id = obj.object_id(&interp.heap).expect("to_object");
            Ok(match interp.heap.obj(id).proto {
                Some(p) => Value::Ref(p),
                None => Value::Null,
            })
        }
        ObjectFn::SetPrototypeOf => {
            let id = interp.require_object(a0)?;
            let proto = match a1 {
                Value::Null => None,
                other => Some(
                    other
                        .object_id(&interp.heap)
                        .ok_or_else(|| interp.throw_type("Object prototype may only be an Object or null"))?,
                ),
            };
            interp.set_proto_checked(id, proto)?;
            Ok(a0)
        }
        ObjectFn::DefineProperty => {
            let id = interp.require_object(a0)?;
            let key_val = a1;
            let key = interp.to_property_key(key_val)?;
            let desc = arg(args, 2);
            define_one_property(interp, id, key, desc)?;
            Ok(a0)
        }
        ObjectFn::DefineProperties => {
            let id = interp.require_object(a0)?;
            let desc_id = interp.require_object(a1)?;
            define_properties_from(interp, id, a1, desc_id)?;
            Ok(a0)
        }
        ObjectFn::GetOwnPropertyNames => {
            let id = interp.require_object(a0)?;
            let obj = interp.heap.obj(id);
            let mut keys: Vec<Key> = obj.own_keys().into_iter().filter(|k| !matches!(k, Key::Sym(_))).collect();
            if let ObjectKind::Array { .. } = obj.kind {
                keys.push(Key::Str(StaticStrings::Length.id()));
            }
            let mut out = Vec::with_capacity(keys.len());
            for key in keys {
                let s = key.render(&interp.interns);
                out.push(Value::string(&mut interp.heap, s)?);
            }
            interp.make_array(out)
        }
        ObjectFn::GetOwnPropertyDescriptor => {
            let id = interp.require_object(a0)?;
            let key = interp.to_property_key(a1)?;
            let Some(prop) = interp.heap.obj(id).own(&key).copied() else {
                return Ok(Value::Undefined);
            };
            let mut desc = JsObject::ordinary(interp.realm.object_proto);
            match prop {
                Property::Data { value, writable, enumerable, configurable } => {
                    desc.define(Key::Str(StaticStrings::Value.id()), Property::data(value));
                    desc.define(Key::Str(StaticStrings::Writable.id()), Property::data(Value::Bool(writable)));
                    desc.define(Key::Str(StaticStrings::Enumerable.id()), Property::data(Value::Bool(enumerable)));
                    desc.define(
                        Key::Str(StaticStrings::Configurable.id()),
                        Property::data(Value::Bool(configurable)),
                    );
                }
                Property::Accessor { get, set, enumerable, configurable } => {
                    desc.define(Key::Str(StaticStrings::Get.id()), Property::data(get.unwrap_or(Value::Undefined)));
                    desc.define(Key::Str(StaticStrings::Set.id()), Property::data(set.unwrap_or(Value::Undefined)));
                    desc.define(Key::Str(StaticStrings::Enumerable.id()), Property::data(Value::Bool(enumerable)));
                    desc.define(
                        Key::Str(StaticStrings::Configurable.id()),
                        Property::data(Value::Bool(configurable)),
                    );
                }
            }
            Ok(Value::Ref(interp.heap.alloc(HeapData::Object(desc))?))
        }
        ObjectFn::FromEntries => {
            let entries = interp.iter_collect(a0)?;
            let obj = JsObject::ordinary(interp.realm.object_proto);
            let id = interp.heap.alloc(HeapData::Object(obj))?;
            for entry in entries {
                let k = interp.get_prop(entry, &Key::Index(0))?;
                let v = interp.get_prop(entry, &Key::Index(1))?;
                let key = interp.to_property_key(k)?;
                interp.heap.obj_mut(id).define(key, Property::data(v));
            }
            Ok(Value::Ref(id))
        }
        ObjectFn::Is => Ok(Value::Bool(same_value(a0, a1, &interp.heap, &interp.interns))),
        ObjectFn::HasOwn => {
            let obj = interp.to_object(a0)?;
            let id = obj.object_id(&interp.heap).expect("to_object");
            let key = interp.to_property_key(a1)?;
            Ok(Value::Bool(own_or_exotic(interp, id, &key)))
        }
        ObjectFn::ProtoHasOwnProperty => {
            let obj = interp.to_object(this)?;
            let id = obj.object_id(&interp.heap).expect("to_object");
            let key = interp.to_property_key(a0)?;
            Ok(Value::Bool(own_or_exotic(interp, id, &key)))
        }
        ObjectFn::ProtoToString => {
            let tag = match this {
                Value::Undefined => "Undefined".to_owned(),
                Value::Null => "Null".to_owned(),
                _ => {
                    let custom = match this.object_id(&interp.heap) {
                        Some(_) => interp.get_prop(this, &Key::Sym(WellKnown::ToStringTag.id()))?,
                        None => Value::Undefined,
                    };
                    if let Some(s) = custom.as_str(&interp.heap, &interp.interns) {
                        s.to_owned()
                    } else {
                        default_tag(interp, this).to_owned()
                    }
                }
            };
            Value::string(&mut interp.heap, format!("[object {tag}]"))
        }
        ObjectFn::ProtoToLocaleString => {
            let method = interp.get_prop(this, &Key::Str(StaticStrings::ToString.id()))?;
            interp.call_sync(method, this, &[])
        }
        ObjectFn::ProtoValueOf => interp.to_object(this),
        ObjectFn::ProtoIsPrototypeOf => {
            let Some(target) = a0.object_id(&interp.heap) else {
                return Ok(Value::Bool(false));
            };
            let this_obj = interp.to_object(this)?;
            let this_id = this_obj.object_id(&interp.heap).expect("to_object");
            let mut cur = interp.heap.obj(target).proto;
            while let Some(id) = cur {
                if id == this_id {
                    return Ok(Value::Bool(true));
                }
                cur = interp.heap.obj(id).proto;
            }
            Ok(Value::Bool(false))
        }
        ObjectFn::ProtoPropertyIsEnumerable => {
            let obj = interp.to_object(this)?;
            let id = obj.object_id(&interp.heap).expect("to_object");
            let key = interp.to_property_key(a0)?;
            Ok(Value::Bool(
                interp.heap.obj(id).own(&key).is_some_and(|p| p.is_enumerable()),
            ))
        }
    }
}

pub(crate) fn construct(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    if a0.is_nullish() {
        let obj = JsObject::ordinary(interp.realm.object_proto);
        return Ok(Value::Ref(interp.heap.alloc(HeapData::Object(obj))?));
    }
    interp.to_object(a0)
}

/// `Object.hasOwn` must see exotic own keys (array indices exist as props;
/// typed-array indices and string-wrapper indices do not).
fn own_or_exotic(interp: &Interp, id: HeapId, key: &Key) -> bool {
    let obj = interp.heap.obj(id);
    if obj.has_own(key) {
        return true;
    }
    match (&obj.kind, key) {
        (ObjectKind::Array { .. }, Key::Str(s)) if *s == StaticStrings::Length.id() => true,
        (ObjectKind::TypedArray { length, .. }, Key::Index(i)) => (*i as usize) < *length,
        (ObjectKind::Wrapper(v), Key::Index(i)) if v.is_string(&interp.heap) => {
            let s = v.as_str(&interp.heap, &interp.interns).expect("string wrapper");
            (*i as usize) < crate::types::str::utf16_len(s)
        }
        _ => false,
    }
}

fn default_tag(interp: &Interp, v: Value) -> &'static str {
    match v {
        Value::Bool(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::InternString(_) => "String",
        Value::Symbol(_) => "Symbol",
        Value::Ref(id) => match interp.heap.get(id) {
            HeapData::Str(_) => "String",
            HeapData::BigInt(_) => "BigInt",
            HeapData::Object(obj) => match &obj.kind {
                ObjectKind::Array { .. } => "Array",
                ObjectKind::Function(_) => "Function",
                ObjectKind::Error { .. } => "Error",
                ObjectKind::Date(_) => "Date",
                ObjectKind::Regex(_) => "RegExp",
                ObjectKind::Arguments { .. } => "Arguments",
                ObjectKind::Wrapper(v) => default_tag(interp, *v),
                _ => "Object",
            },
            HeapData::Scope(_) => "Object",
        },
        _ => "Object",
    }
}

/// Applies one property descriptor object.
fn define_one_property(interp: &mut Interp, target: HeapId, key: Key, desc: Value) -> RunResult<()> {
    if desc.object_id(&interp.heap).is_none() {
        return Err(interp.throw_type("Property description must be an object"));
    }
    let get = interp.get_prop(desc, &Key::Str(StaticStrings::Get.id()))?;
    let set = interp.get_prop(desc, &Key::Str(StaticStrings::Set.id()))?;
    let enumerable = interp.get_prop(desc, &Key::Str(StaticStrings::Enumerable.id()))?;
    let configurable = interp.get_prop(desc, &Key::Str(StaticStrings::Configurable.id()))?;
    let enumerable = enumerable.to_boolean(&interp.heap, &interp.interns);
    let configurable = configurable.to_boolean(&interp.heap, &interp.interns);
    let existing = interp.heap.obj(target).own(&key).copied();
    if let Some(existing) = &existing
        && !existing.is_configurable()
    {
        return Err(interp.throw_type(format!("Cannot redefine property: {}", key.render(&interp.interns))));
    }
    if !get.is_nullish() || !set.is_nullish() {
        let get = if get.is_nullish() { None } else { Some(get) };
        let set = if set.is_nullish() { None } else { Some(set) };
        interp
            .heap
            .obj_mut(target)
            .define(key, Property::Accessor { get, set, enumerable, configurable });
        return Ok(());
    }
    let value = interp.get_prop(desc, &Key::Str(StaticStrings::Value.id()))?;
    let writable = interp.get_prop(desc, &Key::Str(StaticStrings::Writable.id()))?;
    let writable = writable.to_boolean(&interp.heap, &interp.interns);
    interp
        .heap
        .obj_mut(target)
        .define(key, Property::Data { value, writable, enumerable, configurable });
    Ok(())
}

fn define_properties_from(interp: &mut Interp, target: HeapId, descs: Value, descs_id: HeapId) -> RunResult<()> {
    let keys = interp.own_enumerable_keys(descs_id);
    for key in keys {
        let desc = interp.get_prop(descs, &key)?;
        define_one_property(interp, target, key, desc)?;
    }
    Ok(())
}

impl Interp {
    pub(crate) fn require_object(&mut self, v: Value) -> RunResult<HeapId> {
        v.object_id(&self.heap)
            .ok_or_else(|| self.throw_type("called on non-object"))
    }
}
