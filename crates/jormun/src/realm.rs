//! Realm construction: the intrinsic prototypes, the global object, and the
//! registration of every native function.

use crate::{
    builtins::{
        ArrayFn, BigIntFn, BooleanFn, CollectionFn, ConsoleFn, DateFn, ErrorFn, FunctionFn, GlobalFn, IterFn,
        JsonFn, MathFn, NativeFn, NumberFn, ObjectFn, PromiseFn, RegexFn, StringFn, SymbolFn, TypedArrayFn,
        typed_array_kinds,
    },
    env::{FnScopeData, Scope, ScopeKind, ThisState},
    error::{ExcKind, RunResult},
    heap::{Heap, HeapData, HeapId},
    intern::{Interns, StaticStrings, WellKnown},
    object::{ElementKind, FuncKind, JsObject, Key, ObjectKind, Property},
    value::Value,
};

/// The intrinsics of one realm.
#[derive(Debug)]
pub(crate) struct Realm {
    pub global_obj: HeapId,
    pub global_scope: HeapId,
    pub object_proto: HeapId,
    pub function_proto: HeapId,
    pub array_proto: HeapId,
    pub string_proto: HeapId,
    pub number_proto: HeapId,
    pub boolean_proto: HeapId,
    pub bigint_proto: HeapId,
    pub symbol_proto: HeapId,
    error_protos: [HeapId; 8],
    pub array_iter_proto: HeapId,
    pub string_iter_proto: HeapId,
    pub map_iter_proto: HeapId,
    pub regexp_string_iter_proto: HeapId,
    pub generator_proto: HeapId,
    pub async_generator_proto: HeapId,
    pub promise_proto: HeapId,
    pub regexp_proto: HeapId,
    pub date_proto: HeapId,
    pub map_proto: HeapId,
    pub set_proto: HeapId,
    pub weakmap_proto: HeapId,
    pub weakset_proto: HeapId,
    pub arraybuffer_proto: HeapId,
    typed_array_protos: [HeapId; 11],
    /// `Array.prototype.values`, shared with `arguments` objects.
    pub array_values_fn: Value,
}

const ERROR_KINDS: [ExcKind; 8] = [
    ExcKind::Error,
    ExcKind::TypeError,
    ExcKind::RangeError,
    ExcKind::ReferenceError,
    ExcKind::SyntaxError,
    ExcKind::EvalError,
    ExcKind::UriError,
    ExcKind::AggregateError,
];

fn error_index(kind: ExcKind) -> usize {
    ERROR_KINDS.iter().position(|k| *k == kind).expect("all kinds listed")
}

impl Realm {
    pub fn error_proto(&self, kind: ExcKind) -> HeapId {
        self.error_protos[error_index(kind)]
    }

    pub fn typed_array_proto(&self, kind: ElementKind) -> HeapId {
        let idx = typed_array_kinds().iter().position(|k| *k == kind).expect("all kinds listed");
        self.typed_array_protos[idx]
    }

    /// The wrapper prototype for boxing a primitive.
    pub fn wrapper_proto(&self, v: Value, heap: &Heap) -> HeapId {
        match v {
            Value::Bool(_) => self.boolean_proto,
            Value::Number(_) => self.number_proto,
            Value::Symbol(_) => self.symbol_proto,
            _ => {
                if v.is_string(heap) {
                    self.string_proto
                } else if v.as_bigint(heap).is_some() {
                    self.bigint_proto
                } else {
                    self.object_proto
                }
            }
        }
    }
}

struct Builder<'a> {
    heap: &'a mut Heap,
    interns: &'a mut Interns,
    function_proto: HeapId,
}

impl Builder<'_> {
    fn alloc(&mut self, obj: JsObject) -> RunResult<HeapId> {
        self.heap.alloc(HeapData::Object(obj))
    }

    /// A native function object with `name`/`length` properties.
    fn native(&mut self, f: NativeFn, name: &str, len: u32) -> RunResult<HeapId> {
        let mut obj = JsObject::new(Some(self.function_proto), ObjectKind::Function(FuncKind::Native(f)));
        let name_id = self.interns.intern(name);
        obj.define(Key::Str(StaticStrings::Name.id()), Property::method_ro(Value::InternString(name_id)));
        obj.define(
            Key::Str(StaticStrings::Length.id()),
            Property::method_ro(Value::Number(f64::from(len))),
        );
        self.alloc(obj)
    }

    fn method(&mut self, target: HeapId, name: &str, f: NativeFn, len: u32) -> RunResult<HeapId> {
        let func = self.native(f, name, len)?;
        let key = Key::from_str(self.interns, name);
        self.heap.obj_mut(target).define(key, Property::method(Value::Ref(func)));
        Ok(func)
    }

    fn method_sym(&mut self, target: HeapId, sym: WellKnown, name: &str, f: NativeFn) -> RunResult<HeapId> {
        let func = self.native(f, name, 0)?;
        self.heap
            .obj_mut(target)
            .define(Key::Sym(sym.id()), Property::method(Value::Ref(func)));
        Ok(func)
    }

    fn getter(&mut self, target: HeapId, name: &str, f: NativeFn) -> RunResult<()> {
        let func = self.native(f, name, 0)?;
        let key = Key::from_str(self.interns, name);
        self.heap
            .obj_mut(target)
            .define(key, Property::accessor(Some(Value::Ref(func)), None));
        Ok(())
    }

    fn value(&mut self, target: HeapId, name: &str, v: Value) -> RunResult<()> {
        let key = Key::from_str(self.interns, name);
        self.heap.obj_mut(target).define(key, Property::method(v));
        Ok(())
    }

    /// A constructor function wired to its prototype object.
    fn ctor(&mut self, global: HeapId, name: &str, f: NativeFn, len: u32, proto: HeapId) -> RunResult<HeapId> {
        let func = self.native(f, name, len)?;
        self.heap
            .obj_mut(func)
            .define(Key::Str(StaticStrings::Prototype.id()), Property::permanent(Value::Ref(proto)));
        self.heap
            .obj_mut(proto)
            .define(Key::Str(StaticStrings::Constructor.id()), Property::method(Value::Ref(func)));
        let key = Key::from_str(self.interns, name);
        self.heap.obj_mut(global).define(key, Property::method(Value::Ref(func)));
        Ok(func)
    }

    fn ordinary(&mut self, proto: HeapId) -> RunResult<HeapId> {
        self.alloc(JsObject::new(Some(proto), ObjectKind::Ordinary))
    }
}

/// Builds the realm: intrinsic objects first, then the registration table.
pub(crate) fn create(heap: &mut Heap, interns: &mut Interns) -> RunResult<Realm> {
    let object_proto = heap.alloc(HeapData::Object(JsObject::new(None, ObjectKind::Ordinary)))?;
    let function_proto = heap.alloc(HeapData::Object(JsObject::new(Some(object_proto), ObjectKind::Ordinary)))?;
    let mut b = Builder { heap, interns, function_proto };

    let array_proto = b.ordinary(object_proto)?;
    let string_proto = b.ordinary(object_proto)?;
    let number_proto = b.ordinary(object_proto)?;
    let boolean_proto = b.ordinary(object_proto)?;
    let bigint_proto = b.ordinary(object_proto)?;
    let symbol_proto = b.ordinary(object_proto)?;
    let mut error_protos = [object_proto; 8];
    let base_error_proto = b.ordinary(object_proto)?;
    error_protos[0] = base_error_proto;
    for (i, _) in ERROR_KINDS.iter().enumerate().skip(1) {
        error_protos[i] = b.ordinary(base_error_proto)?;
    }
    let iterator_proto = b.ordinary(object_proto)?;
    let array_iter_proto = b.ordinary(iterator_proto)?;
    let string_iter_proto = b.ordinary(iterator_proto)?;
    let map_iter_proto = b.ordinary(iterator_proto)?;
    let regexp_string_iter_proto = b.ordinary(iterator_proto)?;
    let generator_proto = b.ordinary(iterator_proto)?;
    let async_generator_proto = b.ordinary(object_proto)?;
    let promise_proto = b.ordinary(object_proto)?;
    let regexp_proto = b.ordinary(object_proto)?;
    let date_proto = b.ordinary(object_proto)?;
    let map_proto = b.ordinary(object_proto)?;
    let set_proto = b.ordinary(object_proto)?;
    let weakmap_proto = b.ordinary(object_proto)?;
    let weakset_proto = b.ordinary(object_proto)?;
    let arraybuffer_proto = b.ordinary(object_proto)?;
    let mut typed_array_protos = [object_proto; 11];
    for (i, _) in typed_array_kinds().iter().enumerate() {
        typed_array_protos[i] = b.ordinary(object_proto)?;
    }

    let global_obj = b.ordinary(object_proto)?;

    // === Object ===
    let object_ctor = b.ctor(global_obj, "Object", NativeFn::Object(ObjectFn::Ctor), 1, object_proto)?;
    for (name, f, len) in [
        ("keys", ObjectFn::Keys, 1),
        ("values", ObjectFn::Values, 1),
        ("entries", ObjectFn::Entries, 1),
        ("assign", ObjectFn::Assign, 2),
        ("freeze", ObjectFn::Freeze, 1),
        ("isFrozen", ObjectFn::IsFrozen, 1),
        ("seal", ObjectFn::Seal, 1),
        ("isSealed", ObjectFn::IsSealed, 1),
        ("preventExtensions", ObjectFn::PreventExtensions, 1),
        ("isExtensible", ObjectFn::IsExtensible, 1),
        ("create", ObjectFn::Create, 2),
        ("getPrototypeOf", ObjectFn::GetPrototypeOf, 1),
        ("setPrototypeOf", ObjectFn::SetPrototypeOf, 2),
        ("defineProperty", ObjectFn::DefineProperty, 3),
        ("defineProperties", ObjectFn::DefineProperties, 2),
        ("getOwnPropertyNames", ObjectFn::GetOwnPropertyNames, 1),
        ("getOwnPropertyDescriptor", ObjectFn::GetOwnPropertyDescriptor, 2),
        ("fromEntries", ObjectFn::FromEntries, 1),
        ("is", ObjectFn::Is, 2),
        ("hasOwn", ObjectFn::HasOwn, 2),
    ] {
        b.method(object_ctor, name, NativeFn::Object(f), len)?;
    }
    for (name, f, len) in [
        ("hasOwnProperty", ObjectFn::ProtoHasOwnProperty, 1),
        ("toString", ObjectFn::ProtoToString, 0),
        ("toLocaleString", ObjectFn::ProtoToLocaleString, 0),
        ("valueOf", ObjectFn::ProtoValueOf, 0),
        ("isPrototypeOf", ObjectFn::ProtoIsPrototypeOf, 1),
        ("propertyIsEnumerable", ObjectFn::ProtoPropertyIsEnumerable, 1),
    ] {
        b.method(object_proto, name, NativeFn::Object(f), len)?;
    }

    // === Function ===
    b.ctor(global_obj, "Function", NativeFn::Function(FunctionFn::Ctor), 1, function_proto)?;
    b.method(function_proto, "call", NativeFn::Function(FunctionFn::ProtoCall), 1)?;
    b.method(function_proto, "apply", NativeFn::Function(FunctionFn::ProtoApply), 2)?;
    b.method(function_proto, "bind", NativeFn::Function(FunctionFn::ProtoBind), 1)?;
    b.method(function_proto, "toString", NativeFn::Function(FunctionFn::ProtoToString), 0)?;

    // === Array ===
    let array_ctor = b.ctor(global_obj, "Array", NativeFn::Array(ArrayFn::Ctor), 1, array_proto)?;
    b.method(array_ctor, "isArray", NativeFn::Array(ArrayFn::IsArray), 1)?;
    b.method(array_ctor, "of", NativeFn::Array(ArrayFn::Of), 0)?;
    b.method(array_ctor, "from", NativeFn::Array(ArrayFn::From), 1)?;
    for (name, f, len) in [
        ("push", ArrayFn::Push, 1),
        ("pop", ArrayFn::Pop, 0),
        ("shift", ArrayFn::Shift, 0),
        ("unshift", ArrayFn::Unshift, 1),
        ("slice", ArrayFn::Slice, 2),
        ("splice", ArrayFn::Splice, 2),
        ("concat", ArrayFn::Concat, 1),
        ("join", ArrayFn::Join, 1),
        ("reverse", ArrayFn::Reverse, 0),
        ("indexOf", ArrayFn::IndexOf, 1),
        ("lastIndexOf", ArrayFn::LastIndexOf, 1),
        ("includes", ArrayFn::Includes, 1),
        ("find", ArrayFn::Find, 1),
        ("findIndex", ArrayFn::FindIndex, 1),
        ("findLast", ArrayFn::FindLast, 1),
        ("findLastIndex", ArrayFn::FindLastIndex, 1),
        ("filter", ArrayFn::Filter, 1),
        ("map", ArrayFn::Map, 1),
        ("forEach", ArrayFn::ForEach, 1),
        ("reduce", ArrayFn::Reduce, 1),
        ("reduceRight", ArrayFn::ReduceRight, 1),
        ("some", ArrayFn::Some, 1),
        ("every", ArrayFn::Every, 1),
        ("sort", ArrayFn::Sort, 1),
        ("flat", ArrayFn::Flat, 0),
        ("flatMap", ArrayFn::FlatMap, 1),
        ("fill", ArrayFn::Fill, 1),
        ("at", ArrayFn::At, 1),
        ("keys", ArrayFn::Keys, 0),
        ("entries", ArrayFn::Entries, 0),
        ("toString", ArrayFn::ToString, 0),
        ("toReversed", ArrayFn::ToReversed, 0),
        ("toSorted", ArrayFn::ToSorted, 1),
        ("toSpliced", ArrayFn::ToSpliced, 2),
        ("with", ArrayFn::With, 2),
    ] {
        b.method(array_proto, name, NativeFn::Array(f), len)?;
    }
    let array_values = b.method(array_proto, "values", NativeFn::Array(ArrayFn::Values), 0)?;
    let array_values_fn = Value::Ref(array_values);
    b.heap
        .obj_mut(array_proto)
        .define(Key::Sym(WellKnown::Iterator.id()), Property::method(array_values_fn));

    // === String ===
    let string_ctor = b.ctor(global_obj, "String", NativeFn::Str(StringFn::Ctor), 1, string_proto)?;
    b.method(string_ctor, "fromCharCode", NativeFn::Str(StringFn::FromCharCode), 1)?;
    b.method(string_ctor, "fromCodePoint", NativeFn::Str(StringFn::FromCodePoint), 1)?;
    b.method(string_ctor, "raw", NativeFn::Str(StringFn::Raw), 1)?;
    for (name, f, len) in [
        ("at", StringFn::At, 1),
        ("charAt", StringFn::CharAt, 1),
        ("charCodeAt", StringFn::CharCodeAt, 1),
        ("codePointAt", StringFn::CodePointAt, 1),
        ("concat", StringFn::Concat, 1),
        ("endsWith", StringFn::EndsWith, 1),
        ("startsWith", StringFn::StartsWith, 1),
        ("includes", StringFn::Includes, 1),
        ("indexOf", StringFn::IndexOf, 1),
        ("lastIndexOf", StringFn::LastIndexOf, 1),
        ("slice", StringFn::Slice, 2),
        ("substring", StringFn::Substring, 2),
        ("toUpperCase", StringFn::ToUpperCase, 0),
        ("toLowerCase", StringFn::ToLowerCase, 0),
        ("trim", StringFn::Trim, 0),
        ("trimStart", StringFn::TrimStart, 0),
        ("trimEnd", StringFn::TrimEnd, 0),
        ("padStart", StringFn::PadStart, 1),
        ("padEnd", StringFn::PadEnd, 1),
        ("repeat", StringFn::Repeat, 1),
        ("split", StringFn::Split, 2),
        ("replace", StringFn::Replace, 2),
        ("replaceAll", StringFn::ReplaceAll, 2),
        ("match", StringFn::Match, 1),
        ("matchAll", StringFn::MatchAll, 1),
        ("search", StringFn::Search, 1),
        ("localeCompare", StringFn::LocaleCompare, 1),
        ("valueOf", StringFn::ValueOf, 0),
        ("toString", StringFn::ToStringMethod, 0),
    ] {
        b.method(string_proto, name, NativeFn::Str(f), len)?;
    }
    b.method_sym(string_proto, WellKnown::Iterator, "[Symbol.iterator]", NativeFn::Str(StringFn::Iterator))?;

    // === Number / Boolean / BigInt / Symbol ===
    let number_ctor = b.ctor(global_obj, "Number", NativeFn::Number(NumberFn::Ctor), 1, number_proto)?;
    for (name, f, len) in [
        ("isInteger", NumberFn::IsInteger, 1),
        ("isFinite", NumberFn::IsFinite, 1),
        ("isNaN", NumberFn::IsNaN, 1),
        ("isSafeInteger", NumberFn::IsSafeInteger, 1),
    ] {
        b.method(number_ctor, name, NativeFn::Number(f), len)?;
    }
    b.method(number_ctor, "parseInt", NativeFn::Global(GlobalFn::ParseInt), 2)?;
    b.method(number_ctor, "parseFloat", NativeFn::Global(GlobalFn::ParseFloat), 1)?;
    for (name, v) in [
        ("MAX_SAFE_INTEGER", 9_007_199_254_740_991.0),
        ("MIN_SAFE_INTEGER", -9_007_199_254_740_991.0),
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", 5e-324),
        ("EPSILON", f64::EPSILON),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ("NaN", f64::NAN),
    ] {
        b.value(number_ctor, name, Value::Number(v))?;
    }
    b.method(number_proto, "toFixed", NativeFn::Number(NumberFn::ToFixed), 1)?;
    b.method(number_proto, "toPrecision", NativeFn::Number(NumberFn::ToPrecision), 1)?;
    b.method(number_proto, "toString", NativeFn::Number(NumberFn::ToStringRadix), 1)?;
    b.method(number_proto, "valueOf", NativeFn::Number(NumberFn::ValueOf), 0)?;

    b.ctor(global_obj, "Boolean", NativeFn::Boolean(BooleanFn::Ctor), 1, boolean_proto)?;
    b.method(boolean_proto, "toString", NativeFn::Boolean(BooleanFn::ToStringMethod), 0)?;
    b.method(boolean_proto, "valueOf", NativeFn::Boolean(BooleanFn::ValueOf), 0)?;

    b.ctor(global_obj, "BigInt", NativeFn::BigInt(BigIntFn::Ctor), 1, bigint_proto)?;
    b.method(bigint_proto, "toString", NativeFn::BigInt(BigIntFn::ToStringMethod), 0)?;
    b.method(bigint_proto, "valueOf", NativeFn::BigInt(BigIntFn::ValueOf), 0)?;

    let symbol_ctor = b.ctor(global_obj, "Symbol", NativeFn::Symbol(SymbolFn::Ctor), 0, symbol_proto)?;
    b.method(symbol_ctor, "for", NativeFn::Symbol(SymbolFn::For), 1)?;
    b.method(symbol_ctor, "keyFor", NativeFn::Symbol(SymbolFn::KeyFor), 1)?;
    for (name, sym) in [
        ("iterator", WellKnown::Iterator),
        ("asyncIterator", WellKnown::AsyncIterator),
        ("toPrimitive", WellKnown::ToPrimitive),
        ("toStringTag", WellKnown::ToStringTag),
        ("hasInstance", WellKnown::HasInstance),
        ("isConcatSpreadable", WellKnown::IsConcatSpreadable),
        ("species", WellKnown::Species),
        ("unscopables", WellKnown::Unscopables),
    ] {
        b.value(symbol_ctor, name, Value::Symbol(sym.id()))?;
    }
    b.method(symbol_proto, "toString", NativeFn::Symbol(SymbolFn::ToStringMethod), 0)?;

    // === errors ===
    for kind in ERROR_KINDS {
        let proto = error_protos[error_index(kind)];
        let name_id = b.interns.intern(kind.name());
        b.heap
            .obj_mut(proto)
            .define(Key::Str(StaticStrings::Name.id()), Property::method(Value::InternString(name_id)));
        b.heap.obj_mut(proto).define(
            Key::Str(StaticStrings::Message.id()),
            Property::method(Value::InternString(StaticStrings::Empty.id())),
        );
        let len = if kind == ExcKind::AggregateError { 2 } else { 1 };
        b.ctor(global_obj, kind.name(), NativeFn::Error(ErrorFn::Ctor(kind)), len, proto)?;
    }
    b.method(base_error_proto, "toString", NativeFn::Error(ErrorFn::ProtoToString), 0)?;

    // === Math / JSON ===
    let math = b.ordinary(object_proto)?;
    for (name, f, len) in [
        ("abs", MathFn::Abs, 1),
        ("floor", MathFn::Floor, 1),
        ("ceil", MathFn::Ceil, 1),
        ("round", MathFn::Round, 1),
        ("trunc", MathFn::Trunc, 1),
        ("sign", MathFn::Sign, 1),
        ("sqrt", MathFn::Sqrt, 1),
        ("cbrt", MathFn::Cbrt, 1),
        ("pow", MathFn::Pow, 2),
        ("exp", MathFn::Exp, 1),
        ("log", MathFn::Log, 1),
        ("log2", MathFn::Log2, 1),
        ("log10", MathFn::Log10, 1),
        ("min", MathFn::Min, 2),
        ("max", MathFn::Max, 2),
        ("random", MathFn::Random, 0),
        ("hypot", MathFn::Hypot, 2),
        ("atan2", MathFn::Atan2, 2),
        ("sin", MathFn::Sin, 1),
        ("cos", MathFn::Cos, 1),
        ("tan", MathFn::Tan, 1),
        ("asin", MathFn::Asin, 1),
        ("acos", MathFn::Acos, 1),
        ("atan", MathFn::Atan, 1),
        ("sinh", MathFn::Sinh, 1),
        ("cosh", MathFn::Cosh, 1),
        ("tanh", MathFn::Tanh, 1),
    ] {
        b.method(math, name, NativeFn::Math(f), len)?;
    }
    for (name, v) in [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ] {
        b.value(math, name, Value::Number(v))?;
    }
    b.value(global_obj, "Math", Value::Ref(math))?;

    let json = b.ordinary(object_proto)?;
    b.method(json, "parse", NativeFn::Json(JsonFn::Parse), 2)?;
    b.method(json, "stringify", NativeFn::Json(JsonFn::Stringify), 3)?;
    b.value(global_obj, "JSON", Value::Ref(json))?;

    // === Date / RegExp ===
    let date_ctor = b.ctor(global_obj, "Date", NativeFn::Date(DateFn::Ctor), 7, date_proto)?;
    b.method(date_ctor, "now", NativeFn::Date(DateFn::Now), 0)?;
    b.method(date_ctor, "parse", NativeFn::Date(DateFn::Parse), 1)?;
    for (name, f, len) in [
        ("getTime", DateFn::GetTime, 0),
        ("valueOf", DateFn::ValueOf, 0),
        ("getFullYear", DateFn::GetFullYear, 0),
        ("getMonth", DateFn::GetMonth, 0),
        ("getDate", DateFn::GetDate, 0),
        ("getDay", DateFn::GetDay, 0),
        ("getHours", DateFn::GetHours, 0),
        ("getMinutes", DateFn::GetMinutes, 0),
        ("getSeconds", DateFn::GetSeconds, 0),
        ("getMilliseconds", DateFn::GetMilliseconds, 0),
        ("toISOString", DateFn::ToISOString, 0),
        ("toString", DateFn::ToStringMethod, 0),
        ("toJSON", DateFn::ToJSON, 1),
    ] {
        b.method(date_proto, name, NativeFn::Date(f), len)?;
    }

    b.ctor(global_obj, "RegExp", NativeFn::Regex(RegexFn::Ctor), 2, regexp_proto)?;
    b.method(regexp_proto, "exec", NativeFn::Regex(RegexFn::Exec), 1)?;
    b.method(regexp_proto, "test", NativeFn::Regex(RegexFn::Test), 1)?;
    b.method(regexp_proto, "toString", NativeFn::Regex(RegexFn::ToStringMethod), 0)?;

    // === collections ===
    b.ctor(global_obj, "Map", NativeFn::Collection(CollectionFn::MapCtor), 0, map_proto)?;
    b.ctor(global_obj, "Set", NativeFn::Collection(CollectionFn::SetCtor), 0, set_proto)?;
    b.ctor(global_obj, "WeakMap", NativeFn::Collection(CollectionFn::WeakMapCtor), 0, weakmap_proto)?;
    b.ctor(global_obj, "WeakSet", NativeFn::Collection(CollectionFn::WeakSetCtor), 0, weakset_proto)?;
    for proto in [map_proto, weakmap_proto] {
        b.method(proto, "get", NativeFn::Collection(CollectionFn::Get), 1)?;
        b.method(proto, "set", NativeFn::Collection(CollectionFn::SetEntry), 2)?;
        b.method(proto, "has", NativeFn::Collection(CollectionFn::Has), 1)?;
        b.method(proto, "delete", NativeFn::Collection(CollectionFn::Delete), 1)?;
    }
    for proto in [set_proto, weakset_proto] {
        b.method(proto, "add", NativeFn::Collection(CollectionFn::Add), 1)?;
        b.method(proto, "has", NativeFn::Collection(CollectionFn::Has), 1)?;
        b.method(proto, "delete", NativeFn::Collection(CollectionFn::Delete), 1)?;
    }
    for proto in [map_proto, set_proto] {
        b.method(proto, "clear", NativeFn::Collection(CollectionFn::Clear), 0)?;
        b.method(proto, "forEach", NativeFn::Collection(CollectionFn::ForEach), 1)?;
        b.method(proto, "keys", NativeFn::Collection(CollectionFn::Keys), 0)?;
        b.method(proto, "values", NativeFn::Collection(CollectionFn::Values), 0)?;
        b.method(proto, "entries", NativeFn::Collection(CollectionFn::Entries), 0)?;
        b.getter(proto, "size", NativeFn::Collection(CollectionFn::SizeGetter))?;
    }
    let map_entries = b.native(NativeFn::Collection(CollectionFn::Entries), "entries", 0)?;
    b.heap
        .obj_mut(map_proto)
        .define(Key::Sym(WellKnown::Iterator.id()), Property::method(Value::Ref(map_entries)));
    let set_values = b.native(NativeFn::Collection(CollectionFn::Values), "values", 0)?;
    b.heap
        .obj_mut(set_proto)
        .define(Key::Sym(WellKnown::Iterator.id()), Property::method(Value::Ref(set_values)));

    // === Promise ===
    let promise_ctor = b.ctor(global_obj, "Promise", NativeFn::Promise(PromiseFn::Ctor), 1, promise_proto)?;
    for (name, f, len) in [
        ("resolve", PromiseFn::Resolve, 1),
        ("reject", PromiseFn::Reject, 1),
        ("all", PromiseFn::All, 1),
        ("allSettled", PromiseFn::AllSettled, 1),
        ("any", PromiseFn::Any, 1),
        ("race", PromiseFn::Race, 1),
    ] {
        b.method(promise_ctor, name, NativeFn::Promise(f), len)?;
    }
    b.method(promise_proto, "then", NativeFn::Promise(PromiseFn::Then), 2)?;
    b.method(promise_proto, "catch", NativeFn::Promise(PromiseFn::Catch), 1)?;
    b.method(promise_proto, "finally", NativeFn::Promise(PromiseFn::Finally), 1)?;

    // === typed arrays ===
    b.ctor(
        global_obj,
        "ArrayBuffer",
        NativeFn::TypedArray(TypedArrayFn::ArrayBufferCtor),
        1,
        arraybuffer_proto,
    )?;
    b.getter(arraybuffer_proto, "byteLength", NativeFn::TypedArray(TypedArrayFn::ByteLengthGetter))?;
    for (i, kind) in typed_array_kinds().into_iter().enumerate() {
        let proto = typed_array_protos[i];
        b.ctor(global_obj, kind.ctor_name(), NativeFn::TypedArray(TypedArrayFn::Ctor(kind)), 3, proto)?;
        b.method(proto, "fill", NativeFn::TypedArray(TypedArrayFn::Fill), 1)?;
        b.method(proto, "slice", NativeFn::TypedArray(TypedArrayFn::Slice), 2)?;
        b.method(proto, "set", NativeFn::TypedArray(TypedArrayFn::SetMethod), 1)?;
        b.method(proto, "at", NativeFn::TypedArray(TypedArrayFn::At), 1)?;
        b.heap
            .obj_mut(proto)
            .define(Key::Sym(WellKnown::Iterator.id()), Property::method(array_values_fn));
    }

    // === iterator protocols ===
    b.method_sym(iterator_proto, WellKnown::Iterator, "[Symbol.iterator]", NativeFn::Iter(IterFn::SelfIterator))?;
    for proto in [array_iter_proto, string_iter_proto, map_iter_proto, regexp_string_iter_proto] {
        b.method(proto, "next", NativeFn::Iter(IterFn::BuiltinNext), 0)?;
    }
    b.method(generator_proto, "next", NativeFn::Iter(IterFn::GeneratorNext), 1)?;
    b.method(generator_proto, "return", NativeFn::Iter(IterFn::GeneratorReturn), 1)?;
    b.method(generator_proto, "throw", NativeFn::Iter(IterFn::GeneratorThrow), 1)?;
    b.method(async_generator_proto, "next", NativeFn::Iter(IterFn::AsyncGeneratorNext), 1)?;
    b.method(async_generator_proto, "return", NativeFn::Iter(IterFn::AsyncGeneratorReturn), 1)?;
    b.method(async_generator_proto, "throw", NativeFn::Iter(IterFn::AsyncGeneratorThrow), 1)?;
    b.method_sym(
        async_generator_proto,
        WellKnown::AsyncIterator,
        "[Symbol.asyncIterator]",
        NativeFn::Iter(IterFn::SelfIterator),
    )?;

    // === global functions and values ===
    for (name, f, len) in [
        ("parseInt", GlobalFn::ParseInt, 2),
        ("parseFloat", GlobalFn::ParseFloat, 1),
        ("isNaN", GlobalFn::IsNaN, 1),
        ("isFinite", GlobalFn::IsFinite, 1),
        ("encodeURI", GlobalFn::EncodeURI, 1),
        ("encodeURIComponent", GlobalFn::EncodeURIComponent, 1),
        ("decodeURI", GlobalFn::DecodeURI, 1),
        ("decodeURIComponent", GlobalFn::DecodeURIComponent, 1),
        ("setTimeout", GlobalFn::SetTimeout, 2),
        ("clearTimeout", GlobalFn::ClearTimeout, 1),
        ("setInterval", GlobalFn::SetInterval, 2),
        ("clearInterval", GlobalFn::ClearInterval, 1),
        ("queueMicrotask", GlobalFn::QueueMicrotask, 1),
    ] {
        b.method(global_obj, name, NativeFn::Global(f), len)?;
    }
    let console = b.ordinary(object_proto)?;
    b.method(console, "log", NativeFn::Console(ConsoleFn::Log), 0)?;
    b.method(console, "warn", NativeFn::Console(ConsoleFn::Warn), 0)?;
    b.method(console, "error", NativeFn::Console(ConsoleFn::Error), 0)?;
    b.value(global_obj, "console", Value::Ref(console))?;

    b.heap.obj_mut(global_obj).define(
        Key::Str(StaticStrings::Undefined.id()),
        Property::permanent(Value::Undefined),
    );
    b.heap
        .obj_mut(global_obj)
        .define(Key::Str(StaticStrings::NaN.id()), Property::permanent(Value::Number(f64::NAN)));
    b.heap.obj_mut(global_obj).define(
        Key::Str(StaticStrings::Infinity.id()),
        Property::permanent(Value::Number(f64::INFINITY)),
    );
    b.heap.obj_mut(global_obj).define(
        Key::Str(StaticStrings::GlobalThis.id()),
        Property::method(Value::Ref(global_obj)),
    );

    let global_scope = b.heap.alloc(HeapData::Scope(Scope::new(
        None,
        ScopeKind::Global(FnScopeData::new(ThisState::Bound(Value::Ref(global_obj)), Value::Undefined)),
    )))?;

    Ok(Realm {
        global_obj,
        global_scope,
        object_proto,
        function_proto,
        array_proto,
        string_proto,
        number_proto,
        boolean_proto,
        bigint_proto,
        symbol_proto,
        error_protos,
        array_iter_proto,
        string_iter_proto,
        map_iter_proto,
        regexp_string_iter_proto,
        generator_proto,
        async_generator_proto,
        promise_proto,
        regexp_proto,
        date_proto,
        map_proto,
        set_proto,
        weakmap_proto,
        weakset_proto,
        arraybuffer_proto,
        typed_array_protos,
        array_values_fn,
    })
}
