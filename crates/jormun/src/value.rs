//! The runtime value type.
//!
//! `Value` uses a hybrid design: small immediate values (undefined, null,
//! booleans, numbers, interned strings, symbols) are stored inline, while
//! heap-allocated values (computed strings, BigInts, objects) are stored in
//! the arena and referenced via `Ref(HeapId)`.
//!
//! Operations that can run user code (`toPrimitive`, `toString` on objects,
//! abstract equality against objects) live on the interpreter in
//! `machine/ops.rs`; everything here is total over the variants given only
//! `&Heap`.

use num_bigint::BigInt;
use num_traits::Zero;

use crate::{
    error::RunResult,
    heap::{Heap, HeapData, HeapId},
    intern::{Interns, StaticStrings, StringId, SymbolId},
    object::ObjectKind,
};

/// Primary value type representing JavaScript values at runtime.
///
/// NOTE: it's important to keep this size small; the machine's operand stack
/// and every property table store these by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Value {
    Undefined,
    Null,
    Bool(bool),
    /// IEEE-754 double. `-0.0` and `NaN` behave per `===`/`Object.is` via the
    /// comparison helpers, not via this derived `PartialEq` (which is only
    /// used as a fast path on identical bit patterns through `Ref` ids).
    Number(f64),
    /// An interned string literal or identifier-derived string.
    InternString(StringId),
    /// A symbol; identity is the id.
    Symbol(SymbolId),
    /// Reference to heap data: a computed string, a BigInt, or an object.
    Ref(HeapId),
}

impl Value {
    /// `true`/`false` per ToBoolean.
    pub fn to_boolean(self, heap: &Heap, interns: &Interns) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => b,
            Self::Number(n) => !(n == 0.0 || n.is_nan()),
            Self::InternString(id) => !interns.str(id).is_empty(),
            Self::Symbol(_) => true,
            Self::Ref(id) => match heap.get(id) {
                HeapData::Str(s) => !s.is_empty(),
                HeapData::BigInt(b) => !b.is_zero(),
                _ => true,
            },
        }
    }

    /// The `typeof` operator, total over values.
    pub fn type_of(self, heap: &Heap) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "object",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::InternString(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Ref(id) => match heap.get(id) {
                HeapData::Str(_) => "string",
                HeapData::BigInt(_) => "bigint",
                HeapData::Object(o) => {
                    if matches!(o.kind, ObjectKind::Function(_)) {
                        "function"
                    } else {
                        "object"
                    }
                }
                HeapData::Scope(_) => unreachable!("scope frames are never values"),
            },
        }
    }

    #[inline]
    pub fn is_nullish(self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// String content when this value is a string (interned or heap).
    pub fn as_str<'a>(self, heap: &'a Heap, interns: &'a Interns) -> Option<&'a str> {
        match self {
            Self::InternString(id) => Some(interns.str(id)),
            Self::Ref(id) => match heap.get(id) {
                HeapData::Str(s) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_string(self, heap: &Heap) -> bool {
        match self {
            Self::InternString(_) => true,
            Self::Ref(id) => matches!(heap.get(id), HeapData::Str(_)),
            _ => false,
        }
    }

    /// BigInt payload when this value is a BigInt.
    pub fn as_bigint(self, heap: &Heap) -> Option<&BigInt> {
        match self {
            Self::Ref(id) => match heap.get(id) {
                HeapData::BigInt(b) => Some(b),
                _ => None,
            },
            _ => None,
        }
    }

    /// The heap id when this value is an object record (not a boxed string
    /// or BigInt).
    pub fn object_id(self, heap: &Heap) -> Option<HeapId> {
        match self {
            Self::Ref(id) => match heap.get(id) {
                HeapData::Object(_) => Some(id),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_callable(self, heap: &Heap) -> bool {
        self.object_id(heap)
            .is_some_and(|id| matches!(heap.obj(id).kind, ObjectKind::Function(_)))
    }

    /// Allocates a computed string value, avoiding the heap when the content
    /// is a single ASCII char or empty (those have fixed intern ids).
    pub fn string(heap: &mut Heap, s: String) -> RunResult<Self> {
        if s.is_empty() {
            return Ok(Self::InternString(StaticStrings::Empty.id()));
        }
        if s.len() == 1 && s.as_bytes()[0] < 128 {
            return Ok(Self::InternString(StringId::from_ascii(s.as_bytes()[0])));
        }
        Ok(Self::Ref(heap.alloc(HeapData::Str(s))?))
    }

    pub fn bigint(heap: &mut Heap, b: BigInt) -> RunResult<Self> {
        Ok(Self::Ref(heap.alloc(HeapData::BigInt(b))?))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

/// Strict equality (`===`): no coercion, `NaN !== NaN`, `+0 === -0`,
/// strings by code units, objects by identity.
pub(crate) fn strict_eq(a: Value, b: Value, heap: &Heap, interns: &Interns) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        _ => {
            if let (Some(x), Some(y)) = (a.as_str(heap, interns), b.as_str(heap, interns)) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (a.as_bigint(heap), b.as_bigint(heap)) {
                return x == y;
            }
            match (a, b) {
                // remaining Ref/Ref case: object identity
                (Value::Ref(x), Value::Ref(y)) => x == y,
                _ => false,
            }
        }
    }
}

/// SameValueZero: like `===` but `NaN` equals `NaN`. Used by `includes`,
/// `Map`/`Set` keys.
pub(crate) fn same_value_zero(a: Value, b: Value, heap: &Heap, interns: &Interns) -> bool {
    if let (Value::Number(x), Value::Number(y)) = (a, b)
        && x.is_nan()
        && y.is_nan()
    {
        return true;
    }
    strict_eq(a, b, heap, interns)
}

/// SameValue (`Object.is`): like SameValueZero but distinguishes `+0`/`-0`.
pub(crate) fn same_value(a: Value, b: Value, heap: &Heap, interns: &Interns) -> bool {
    if let (Value::Number(x), Value::Number(y)) = (a, b)
        && x == 0.0
        && y == 0.0
    {
        return x.is_sign_negative() == y.is_sign_negative();
    }
    same_value_zero(a, b, heap, interns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Tracker;

    fn setup() -> (Heap, Interns) {
        (Heap::new(Tracker::default()), Interns::new())
    }

    #[test]
    fn to_boolean_truth_table() {
        let (mut heap, mut interns) = setup();
        assert!(!Value::Undefined.to_boolean(&heap, &interns));
        assert!(!Value::Null.to_boolean(&heap, &interns));
        assert!(!Value::Number(0.0).to_boolean(&heap, &interns));
        assert!(!Value::Number(f64::NAN).to_boolean(&heap, &interns));
        assert!(Value::Number(-1.5).to_boolean(&heap, &interns));
        let empty = interns.intern("");
        assert!(!Value::InternString(empty).to_boolean(&heap, &interns));
        let s = Value::string(&mut heap, "x".to_owned()).unwrap();
        assert!(s.to_boolean(&heap, &interns));
    }

    #[test]
    fn strict_eq_cross_representation_strings() {
        let (mut heap, mut interns) = setup();
        let interned = Value::InternString(interns.intern("abc"));
        let heaped = Value::Ref(heap.alloc(HeapData::Str("abc".to_owned())).unwrap());
        assert!(strict_eq(interned, heaped, &heap, &interns));
        assert!(strict_eq(heaped, interned, &heap, &interns));
    }

    #[test]
    fn nan_and_zero_identities() {
        let (heap, interns) = setup();
        let nan = Value::Number(f64::NAN);
        assert!(!strict_eq(nan, nan, &heap, &interns));
        assert!(same_value_zero(nan, nan, &heap, &interns));
        let pz = Value::Number(0.0);
        let nz = Value::Number(-0.0);
        assert!(strict_eq(pz, nz, &heap, &interns));
        assert!(same_value_zero(pz, nz, &heap, &interns));
        assert!(!same_value(pz, nz, &heap, &interns));
    }
}
