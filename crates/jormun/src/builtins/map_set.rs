//! `Map`, `Set`, `WeakMap`, `WeakSet`.
//!
//! All four share tombstoned [`MapData`] storage keyed by SameValueZero.
//! Iteration reflects entries added after the current position and skips
//! entries deleted before they are visited; weak collections only restrict
//! their key types (weak retention is unobservable without GC).

use super::arg;
use crate::{
    error::RunResult,
    heap::{HeapData, HeapId},
    machine::Interp,
    object::{BuiltinIter, IterKind, JsObject, Key, MapData, MapEntry, ObjectKind, js_hash},
    value::{Value, same_value_zero},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollectionFn {
    MapCtor,
    SetCtor,
    WeakMapCtor,
    WeakSetCtor,
    Get,
    SetEntry,
    Add,
    Has,
    Delete,
    Clear,
    ForEach,
    Keys,
    Values,
    Entries,
    SizeGetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Map,
    Set,
    WeakMap,
    WeakSet,
}

fn family_of(interp: &Interp, this: Value) -> Option<(HeapId, Family)> {
    let id = this.object_id(&interp.heap)?;
    let family = match &interp.heap.obj(id).kind {
        ObjectKind::Map(_) => Family::Map,
        ObjectKind::Set(_) => Family::Set,
        ObjectKind::WeakMap(_) => Family::WeakMap,
        ObjectKind::WeakSet(_) => Family::WeakSet,
        _ => return None,
    };
    Some((id, family))
}

fn data_mut(interp: &mut Interp, id: HeapId) -> &mut MapData {
    match &mut interp.heap.obj_mut(id).kind {
        ObjectKind::Map(d) | ObjectKind::Set(d) | ObjectKind::WeakMap(d) | ObjectKind::WeakSet(d) => d,
        _ => panic!("collection access on non-collection"),
    }
}

/// Index of a live entry with the given key.
fn find_entry(interp: &Interp, id: HeapId, key: Value) -> Option<usize> {
    let hash = js_hash(key, &interp.heap, &interp.interns);
    let data = match &interp.heap.obj(id).kind {
        ObjectKind::Map(d) | ObjectKind::Set(d) | ObjectKind::WeakMap(d) | ObjectKind::WeakSet(d) => d,
        _ => return None,
    };
    data.entries.iter().position(|e| {
        e.as_ref()
            .is_some_and(|e| e.hash == hash && same_value_zero(e.key, key, &interp.heap, &interp.interns))
    })
}

fn require_weak_key(interp: &mut Interp, key: Value) -> RunResult<()> {
    if key.object_id(&interp.heap).is_none() {
        return Err(interp.throw_type("Invalid value used as weak map key"));
    }
    Ok(())
}

pub(crate) fn construct(interp: &mut Interp, f: CollectionFn, args: &[Value]) -> RunResult<Value> {
    let (proto, kind, family) = match f {
        CollectionFn::MapCtor => (interp.realm.map_proto, ObjectKind::Map(Box::default()), Family::Map),
        CollectionFn::SetCtor => (interp.realm.set_proto, ObjectKind::Set(Box::default()), Family::Set),
        CollectionFn::WeakMapCtor => {
            (interp.realm.weakmap_proto, ObjectKind::WeakMap(Box::default()), Family::WeakMap)
        }
        _ => (interp.realm.weakset_proto, ObjectKind::WeakSet(Box::default()), Family::WeakSet),
    };
    let obj = JsObject::new(Some(proto), kind);
    let id = interp.heap.alloc(HeapData::Object(obj))?;
    let this = Value::Ref(id);
    // optional iterable of entries/values
    let init = arg(args, 0);
    if !init.is_nullish() {
        let items = interp.iter_collect(init)?;
        for item in items {
            match family {
                Family::Map | Family::WeakMap => {
                    let k = interp.get_prop(item, &Key::Index(0))?;
                    let v = interp.get_prop(item, &Key::Index(1))?;
                    insert_entry(interp, id, family, k, v)?;
                }
                Family::Set | Family::WeakSet => {
                    insert_entry(interp, id, family, item, item)?;
                }
            }
        }
    }
    Ok(this)
}

fn insert_entry(interp: &mut Interp, id: HeapId, family: Family, key: Value, value: Value) -> RunResult<()> {
    if matches!(family, Family::WeakMap | Family::WeakSet) {
        require_weak_key(interp, key)?;
    }
    // -0 keys normalize to +0
    let key = match key {
        Value::Number(n) if n == 0.0 => Value::Number(0.0),
        other => other,
    };
    if let Some(i) = find_entry(interp, id, key) {
        data_mut(interp, id).entries[i].as_mut().expect("live entry").value = value;
        return Ok(());
    }
    let hash = js_hash(key, &interp.heap, &interp.interns);
    let data = data_mut(interp, id);
    data.entries.push(Some(MapEntry { hash, key, value }));
    data.size += 1;
    Ok(())
}

pub(crate) fn call(interp: &mut Interp, f: CollectionFn, this: Value, args: &[Value]) -> RunResult<Value> {
    if matches!(
        f,
        CollectionFn::MapCtor | CollectionFn::SetCtor | CollectionFn::WeakMapCtor | CollectionFn::WeakSetCtor
    ) {
        return Err(interp.throw_type("Constructor requires 'new'"));
    }
    let Some((id, family)) = family_of(interp, this) else {
        return Err(interp.throw_type("method called on incompatible receiver"));
    };
    let a0 = arg(args, 0);
    let a1 = arg(args, 1);
    match f {
        CollectionFn::Get => Ok(match find_entry(interp, id, a0) {
            Some(i) => data_mut(interp, id).entries[i].as_ref().expect("live entry").value,
            None => Value::Undefined,
        }),
        CollectionFn::SetEntry => {
            insert_entry(interp, id, family, a0, a1)?;
            Ok(this)
        }
        CollectionFn::Add => {
            insert_entry(interp, id, family, a0, a0)?;
            Ok(this)
        }
        CollectionFn::Has => Ok(Value::Bool(find_entry(interp, id, a0).is_some())),
        CollectionFn::Delete => match find_entry(interp, id, a0) {
            Some(i) => {
                let data = data_mut(interp, id);
                data.entries[i] = None;
                data.size -= 1;
                Ok(Value::Bool(true))
            }
            None => Ok(Value::Bool(false)),
        },
        CollectionFn::Clear => {
            let data = data_mut(interp, id);
            data.entries.clear();
            data.size = 0;
            Ok(Value::Undefined)
        }
        CollectionFn::ForEach => {
            if !a0.is_callable(&interp.heap) {
                return Err(interp.throw_type("callback is not a function"));
            }
            let mut i = 0;
            loop {
                let entry = {
                    let data = data_mut(interp, id);
                    if i >= data.entries.len() {
                        break;
                    }
                    data.entries[i].as_ref().map(|e| (e.key, e.value))
                };
                i += 1;
                if let Some((k, v)) = entry {
                    interp.call_sync(a0, a1, &[v, k, this])?;
                }
            }
            Ok(Value::Undefined)
        }
        CollectionFn::Keys | CollectionFn::Values | CollectionFn::Entries => {
            let kind = match (f, family) {
                (CollectionFn::Keys, _) => IterKind::Keys,
                (CollectionFn::Entries, _) => IterKind::Entries,
                (_, Family::Set | Family::WeakSet) => IterKind::Keys,
                _ => IterKind::Values,
            };
            interp.make_builtin_iter(BuiltinIter::Map { map: id, index: 0, kind })
        }
        CollectionFn::SizeGetter => {
            let data = data_mut(interp, id);
            Ok(Value::Number(data.size as f64))
        }
        _ => unreachable!("constructors handled above"),
    }
}
