//! The built-in dispatcher.
//!
//! Every host-implemented function is a variant of [`NativeFn`], grouped by
//! area into nested enums; function objects carry the variant and dispatch
//! lands in the matching module. `name`/`length` live as properties set at
//! registration time (see `realm.rs`), so the enums stay plain data.

pub(crate) mod array;
pub(crate) mod bigint;
pub(crate) mod boolean;
pub(crate) mod console;
pub(crate) mod date;
pub(crate) mod error;
pub(crate) mod function;
pub(crate) mod global_fns;
pub(crate) mod json;
pub(crate) mod map_set;
pub(crate) mod math;
pub(crate) mod number;
pub(crate) mod object;
pub(crate) mod promise;
pub(crate) mod regexp;
pub(crate) mod string;
pub(crate) mod symbol;
pub(crate) mod typed_array;

use crate::{
    error::RunResult,
    heap::HeapId,
    machine::{Interp, ResumeMode},
    object::{BuiltinIter, ElementKind, Key, ObjectKind},
    value::Value,
};

pub(crate) use array::ArrayFn;
pub(crate) use bigint::BigIntFn;
pub(crate) use boolean::BooleanFn;
pub(crate) use console::ConsoleFn;
pub(crate) use date::DateFn;
pub(crate) use error::ErrorFn;
pub(crate) use function::FunctionFn;
pub(crate) use global_fns::GlobalFn;
pub(crate) use json::JsonFn;
pub(crate) use map_set::CollectionFn;
pub(crate) use math::MathFn;
pub(crate) use number::NumberFn;
pub(crate) use object::ObjectFn;
pub(crate) use promise::PromiseFn;
pub(crate) use regexp::RegexFn;
pub(crate) use string::StringFn;
pub(crate) use symbol::SymbolFn;
pub(crate) use typed_array::TypedArrayFn;

/// Every native function the realm registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NativeFn {
    Global(GlobalFn),
    Console(ConsoleFn),
    Object(ObjectFn),
    Function(FunctionFn),
    Array(ArrayFn),
    Str(StringFn),
    Number(NumberFn),
    Boolean(BooleanFn),
    BigInt(BigIntFn),
    Symbol(SymbolFn),
    Math(MathFn),
    Json(JsonFn),
    Date(DateFn),
    Collection(CollectionFn),
    Promise(PromiseFn),
    Regex(RegexFn),
    TypedArray(TypedArrayFn),
    Error(ErrorFn),
    Iter(IterFn),
}

/// Iterator-protocol natives shared by the built-in iterator objects and
/// generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IterFn {
    /// `%IteratorPrototype%[Symbol.iterator]`: returns `this`.
    SelfIterator,
    BuiltinNext,
    GeneratorNext,
    GeneratorReturn,
    GeneratorThrow,
    AsyncGeneratorNext,
    AsyncGeneratorReturn,
    AsyncGeneratorThrow,
}

impl Interp {
    /// Calls a native function.
    pub(crate) fn call_native(&mut self, f: NativeFn, this: Value, args: &[Value]) -> RunResult<Value> {
        match f {
            NativeFn::Global(f) => global_fns::call(self, f, this, args),
            NativeFn::Console(f) => console::call(self, f, this, args),
            NativeFn::Object(f) => object::call(self, f, this, args),
            NativeFn::Function(f) => function::call(self, f, this, args),
            NativeFn::Array(f) => array::call(self, f, this, args),
            NativeFn::Str(f) => string::call(self, f, this, args),
            NativeFn::Number(f) => number::call(self, f, this, args),
            NativeFn::Boolean(f) => boolean::call(self, f, this, args),
            NativeFn::BigInt(f) => bigint::call(self, f, this, args),
            NativeFn::Symbol(f) => symbol::call(self, f, this, args),
            NativeFn::Math(f) => math::call(self, f, this, args),
            NativeFn::Json(f) => json::call(self, f, this, args),
            NativeFn::Date(f) => date::call(self, f, this, args),
            NativeFn::Collection(f) => map_set::call(self, f, this, args),
            NativeFn::Promise(f) => promise::call(self, f, this, args),
            NativeFn::Regex(f) => regexp::call(self, f, this, args),
            NativeFn::TypedArray(f) => typed_array::call(self, f, this, args),
            NativeFn::Error(f) => error::call(self, f, this, args),
            NativeFn::Iter(f) => self.call_iter_native(f, this, args),
        }
    }

    /// `new` on a native function; only the registered constructors accept
    /// construction.
    pub(crate) fn construct_native(&mut self, f: NativeFn, args: &[Value], new_target: Value) -> RunResult<Value> {
        match f {
            NativeFn::Object(ObjectFn::Ctor) => object::construct(self, args),
            NativeFn::Array(ArrayFn::Ctor) => array::construct(self, args),
            NativeFn::Str(StringFn::Ctor) => string::construct(self, args),
            NativeFn::Number(NumberFn::Ctor) => number::construct(self, args),
            NativeFn::Boolean(BooleanFn::Ctor) => boolean::construct(self, args),
            NativeFn::Date(DateFn::Ctor) => date::construct(self, args),
            NativeFn::Collection(
                f @ (CollectionFn::MapCtor | CollectionFn::SetCtor | CollectionFn::WeakMapCtor | CollectionFn::WeakSetCtor),
            ) => map_set::construct(self, f, args),
            NativeFn::Promise(PromiseFn::Ctor) => promise::construct(self, args),
            NativeFn::Regex(RegexFn::Ctor) => regexp::construct(self, args),
            NativeFn::TypedArray(TypedArrayFn::Ctor(kind)) => typed_array::construct(self, kind, args),
            NativeFn::TypedArray(TypedArrayFn::ArrayBufferCtor) => typed_array::construct_buffer(self, args),
            NativeFn::Error(ErrorFn::Ctor(kind)) => error::construct(self, kind, args, new_target),
            _ => Err(self.throw_type("not a constructor")),
        }
    }

    fn call_iter_native(&mut self, f: IterFn, this: Value, args: &[Value]) -> RunResult<Value> {
        let arg0 = args.first().copied().unwrap_or(Value::Undefined);
        match f {
            IterFn::SelfIterator => Ok(this),
            IterFn::BuiltinNext => self.builtin_iter_next(this),
            IterFn::GeneratorNext => {
                let r#gen = self.require_generator(this, false)?;
                let (value, done) = self.generator_resume(r#gen, ResumeMode::Next(arg0))?;
                self.make_iter_result(value, done)
            }
            IterFn::GeneratorReturn => {
                let r#gen = self.require_generator(this, false)?;
                let (value, done) = self.generator_resume(r#gen, ResumeMode::Return(arg0))?;
                self.make_iter_result(value, done)
            }
            IterFn::GeneratorThrow => {
                let r#gen = self.require_generator(this, false)?;
                let (value, done) = self.generator_resume(r#gen, ResumeMode::Throw(arg0))?;
                self.make_iter_result(value, done)
            }
            IterFn::AsyncGeneratorNext => {
                let r#gen = self.require_generator(this, true)?;
                self.async_generator_resume(r#gen, ResumeMode::Next(arg0))
            }
            IterFn::AsyncGeneratorReturn => {
                let r#gen = self.require_generator(this, true)?;
                self.async_generator_resume(r#gen, ResumeMode::Return(arg0))
            }
            IterFn::AsyncGeneratorThrow => {
                let r#gen = self.require_generator(this, true)?;
                self.async_generator_resume(r#gen, ResumeMode::Throw(arg0))
            }
        }
    }

    fn require_generator(&mut self, this: Value, want_async: bool) -> RunResult<HeapId> {
        if let Some(id) = this.object_id(&self.heap)
            && let ObjectKind::Generator(data) = &self.heap.obj(id).kind
            && data.is_async == want_async
        {
            return Ok(id);
        }
        Err(self.throw_type("Generator method called on incompatible receiver"))
    }

    /// `next()` of the built-in iterator objects (array, string, map/set,
    /// regexp-string).
    fn builtin_iter_next(&mut self, this: Value) -> RunResult<Value> {
        let Some(id) = this.object_id(&self.heap) else {
            return Err(self.throw_type("Iterator method called on incompatible receiver"));
        };
        let iter = match &self.heap.obj(id).kind {
            ObjectKind::BuiltinIter(iter) => (**iter).clone(),
            _ => return Err(self.throw_type("Iterator method called on incompatible receiver")),
        };
        match iter {
            BuiltinIter::Array { array, index, kind } => {
                // the live length is observed on every step, so elements
                // appended during iteration are visited
                let len_val = self.get_prop(Value::Ref(array), &Key::Str(crate::intern::StaticStrings::Length.id()))?;
                let len = crate::types::number::to_length(self.to_number(len_val)?);
                if u64::from(index) >= len {
                    self.finish_builtin_iter(id);
                    return self.make_iter_result(Value::Undefined, true);
                }
                self.advance_builtin_iter(id, u64::from(index) + 1);
                let value = match kind {
                    crate::object::IterKind::Keys => Value::Number(f64::from(index)),
                    crate::object::IterKind::Values => self.get_prop(Value::Ref(array), &Key::Index(index))?,
                    crate::object::IterKind::Entries => {
                        let v = self.get_prop(Value::Ref(array), &Key::Index(index))?;
                        self.make_array(vec![Value::Number(f64::from(index)), v])?
                    }
                };
                self.make_iter_result(value, false)
            }
            BuiltinIter::Str { string, index } => {
                let (next, value) = {
                    let s = string.as_str(&self.heap, &self.interns).expect("string iterator");
                    match crate::types::str::char_at(s, index) {
                        None => (None, None),
                        Some(c) => (Some(index + c.len_utf16()), Some(c.to_string())),
                    }
                };
                match value {
                    None => {
                        self.finish_builtin_iter(id);
                        self.make_iter_result(Value::Undefined, true)
                    }
                    Some(c) => {
                        self.advance_builtin_iter(id, next.expect("advanced index") as u64);
                        let v = Value::string(&mut self.heap, c)?;
                        self.make_iter_result(v, false)
                    }
                }
            }
            BuiltinIter::Map { map, index, kind } => {
                let entry = loop {
                    let data = match &self.heap.obj(map).kind {
                        ObjectKind::Map(d) | ObjectKind::Set(d) => d,
                        _ => return Err(self.throw_type("Iterator method called on incompatible receiver")),
                    };
                    let i = self.builtin_iter_index(id).max(index as u64) as usize;
                    if i >= data.entries.len() {
                        break None;
                    }
                    self.advance_builtin_iter(id, (i + 1) as u64);
                    let data = match &self.heap.obj(map).kind {
                        ObjectKind::Map(d) | ObjectKind::Set(d) => d,
                        _ => unreachable!("checked above"),
                    };
                    // tombstoned entries (deleted mid-iteration) are skipped
                    if let Some(entry) = &data.entries[i] {
                        break Some((entry.key, entry.value));
                    }
                };
                match entry {
                    None => {
                        self.finish_builtin_iter(id);
                        self.make_iter_result(Value::Undefined, true)
                    }
                    Some((k, v)) => {
                        let value = match kind {
                            crate::object::IterKind::Keys => k,
                            crate::object::IterKind::Values => v,
                            crate::object::IterKind::Entries => self.make_array(vec![k, v])?,
                        };
                        self.make_iter_result(value, false)
                    }
                }
            }
            BuiltinIter::RegExpString { regex, string, done } => {
                if done {
                    return self.make_iter_result(Value::Undefined, true);
                }
                match self.regexp_exec(regex, string)? {
                    Value::Null => {
                        self.finish_builtin_iter(id);
                        self.make_iter_result(Value::Undefined, true)
                    }
                    result => {
                        // non-global matchAll iterators yield exactly once
                        let global = match &self.heap.obj(regex).kind {
                            ObjectKind::Regex(data) => data.flags.global,
                            _ => false,
                        };
                        if !global {
                            self.finish_builtin_iter(id);
                        }
                        self.make_iter_result(result, false)
                    }
                }
            }
        }
    }

    fn advance_builtin_iter(&mut self, id: HeapId, to: u64) {
        if let ObjectKind::BuiltinIter(iter) = &mut self.heap.obj_mut(id).kind {
            match &mut **iter {
                BuiltinIter::Array { index, .. } => *index = to as u32,
                BuiltinIter::Str { index, .. } => *index = to as usize,
                BuiltinIter::Map { index, .. } => *index = to as usize,
                BuiltinIter::RegExpString { .. } => {}
            }
        }
    }

    fn builtin_iter_index(&self, id: HeapId) -> u64 {
        match &self.heap.obj(id).kind {
            ObjectKind::BuiltinIter(iter) => match &**iter {
                BuiltinIter::Array { index, .. } => u64::from(*index),
                BuiltinIter::Str { index, .. } | BuiltinIter::Map { index, .. } => *index as u64,
                BuiltinIter::RegExpString { .. } => 0,
            },
            _ => 0,
        }
    }

    fn finish_builtin_iter(&mut self, id: HeapId) {
        if let ObjectKind::BuiltinIter(iter) = &mut self.heap.obj_mut(id).kind
            && let BuiltinIter::RegExpString { done, .. } = &mut **iter
        {
            *done = true;
        }
    }

    /// Allocates a built-in iterator object on the matching prototype.
    pub(crate) fn make_builtin_iter(&mut self, iter: BuiltinIter) -> RunResult<Value> {
        let proto = match &iter {
            BuiltinIter::Array { .. } => self.realm.array_iter_proto,
            BuiltinIter::Str { .. } => self.realm.string_iter_proto,
            BuiltinIter::Map { .. } => self.realm.map_iter_proto,
            BuiltinIter::RegExpString { .. } => self.realm.regexp_string_iter_proto,
        };
        let obj = crate::object::JsObject::new(Some(proto), ObjectKind::BuiltinIter(Box::new(iter)));
        Ok(Value::Ref(self.heap.alloc(crate::heap::HeapData::Object(obj))?))
    }
}

/// Positional argument access with `undefined` defaulting.
pub(crate) fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).copied().unwrap_or(Value::Undefined)
}

/// Typed-array constructor payloads live on the variant.
pub(crate) fn typed_array_kinds() -> [ElementKind; 11] {
    [
        ElementKind::Int8,
        ElementKind::Uint8,
        ElementKind::Uint8Clamped,
        ElementKind::Int16,
        ElementKind::Uint16,
        ElementKind::Int32,
        ElementKind::Uint32,
        ElementKind::Float32,
        ElementKind::Float64,
        ElementKind::BigInt64,
        ElementKind::BigUint64,
    ]
}
