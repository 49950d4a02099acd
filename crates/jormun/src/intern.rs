//! String and symbol interning for identifiers, property keys, and literals.
//!
//! The interner stores unique strings in a vector and returns [`StringId`]
//! indices for cheap storage and comparison. It is populated during lexing and
//! parsing and grows at runtime when computed property keys are first used.
//!
//! StringIds are laid out as follows:
//! * 0 to 127 - single character strings for all 128 ASCII characters
//! * 1000 to 1000+count(StaticStrings) - well-known names in [`StaticStrings`]
//! * 10_000+ - strings interned per interpreter
//!
//! Symbols live in a parallel table: well-known symbols occupy fixed low ids
//! (see [`WellKnown`]), followed by `Symbol(...)` and `Symbol.for(...)`
//! allocations.

use std::sync::LazyLock;

use ahash::AHashMap;
use strum::{EnumCount, FromRepr, IntoStaticStr};

/// Index into the string interner's storage.
///
/// Uses `u32` to save space; property tables and scope bindings store many of
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize)]
pub(crate) struct StringId(u32);

/// StringId offsets
const STATIC_STRING_ID_OFFSET: u32 = 1000;
const INTERN_STRING_ID_OFFSET: u32 = 10_000;

impl StringId {
    /// Returns the StringId for a single ASCII character.
    #[inline]
    pub fn from_ascii(byte: u8) -> Self {
        debug_assert!(byte < 128);
        Self(u32::from(byte))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Static strings for all 128 ASCII characters, built once on first access.
static ASCII_STRS: LazyLock<[&'static str; 128]> = LazyLock::new(|| {
    std::array::from_fn(|i| {
        let s = char::from(i as u8).to_string();
        // Leak to get 'static lifetime - intentional and bounded (128 bytes total)
        &*Box::leak(s.into_boxed_str())
    })
});

/// Names known at compile time that don't need to be interned dynamically.
///
/// The strum derives give us `&'static str` conversion in both directions;
/// the variant order is the id order, so adding names is append-only.
#[repr(u16)]
#[derive(Debug, Clone, Copy, FromRepr, EnumCount, IntoStaticStr, PartialEq, Eq, Hash)]
#[strum(serialize_all = "camelCase")]
pub(crate) enum StaticStrings {
    #[strum(serialize = "")]
    Empty,
    Length,
    Prototype,
    Constructor,
    Name,
    Message,
    Stack,
    Cause,
    Errors,
    Value,
    Done,
    Next,
    #[strum(serialize = "return")]
    Return,
    #[strum(serialize = "throw")]
    Throw,
    Then,
    ToString,
    ValueOf,
    ToJSON,
    #[strum(serialize = "default")]
    Default,
    Get,
    Set,
    Writable,
    Enumerable,
    Configurable,
    Index,
    Input,
    Groups,
    Indices,
    Raw,
    LastIndex,
    Source,
    Flags,
    Global,
    GlobalThis,
    Arguments,
    Callee,
    Caller,
    Undefined,
    #[strum(serialize = "NaN")]
    NaN,
    Infinity,
    Status,
    Reason,
    Fulfilled,
    Rejected,
    Url,
    #[strum(serialize = "__proto__")]
    DunderProto,
    #[strum(serialize = "*default*")]
    DefaultExport,
    #[strum(serialize = "*namespace*")]
    NamespaceExport,
    Size,
    Add,
    Has,
    Delete,
    Clear,
    Keys,
    Values,
    Entries,
    ForEach,
    Resolve,
    Reject,
    Async,
    Of,
    From,
    Static,
    As,
    Meta,
    Target,
    New,
    Byte,
    ByteLength,
    ByteOffset,
    Buffer,
    #[strum(serialize = "BYTES_PER_ELEMENT")]
    BytesPerElement,
    Description,
    Console,
    Log,
    Warn,
    Error,
}

impl StaticStrings {
    /// Converts this static string to its StringId.
    #[inline]
    pub fn id(self) -> StringId {
        StringId(STATIC_STRING_ID_OFFSET + self as u32)
    }

    /// The string content of this static string.
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl From<StaticStrings> for StringId {
    fn from(s: StaticStrings) -> Self {
        s.id()
    }
}

/// Index into the symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub(crate) struct SymbolId(u32);

impl SymbolId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The well-known symbols, at fixed ids matching their variant order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, EnumCount, IntoStaticStr)]
#[repr(u32)]
pub(crate) enum WellKnown {
    #[strum(serialize = "Symbol.iterator")]
    Iterator,
    #[strum(serialize = "Symbol.asyncIterator")]
    AsyncIterator,
    #[strum(serialize = "Symbol.toPrimitive")]
    ToPrimitive,
    #[strum(serialize = "Symbol.toStringTag")]
    ToStringTag,
    #[strum(serialize = "Symbol.hasInstance")]
    HasInstance,
    #[strum(serialize = "Symbol.isConcatSpreadable")]
    IsConcatSpreadable,
    #[strum(serialize = "Symbol.species")]
    Species,
    #[strum(serialize = "Symbol.unscopables")]
    Unscopables,
}

impl WellKnown {
    #[inline]
    pub fn id(self) -> SymbolId {
        SymbolId(self as u32)
    }

    pub fn description(self) -> &'static str {
        self.into()
    }
}

/// A runtime symbol: an opaque identity with an optional description.
#[derive(Debug, Clone)]
pub(crate) struct SymbolData {
    pub description: Option<String>,
    /// `Some(key)` when the symbol was created through `Symbol.for(key)`.
    pub registry_key: Option<String>,
    /// True for the fixed well-known symbols.
    pub well_known: bool,
}

/// Owns all interned strings and symbols for one interpreter.
#[derive(Debug)]
pub(crate) struct Interns {
    /// Dynamically interned strings, indexed by `id - INTERN_STRING_ID_OFFSET`.
    strings: Vec<Box<str>>,
    /// Reverse lookup for dynamic interning.
    lookup: hashbrown::HashMap<Box<str>, StringId, ahash::RandomState>,
    /// All symbols; the first `WellKnown::COUNT` entries are the well-knowns.
    symbols: Vec<SymbolData>,
    /// `Symbol.for` registry: key -> symbol.
    symbol_registry: AHashMap<String, SymbolId>,
}

impl Interns {
    pub fn new() -> Self {
        let symbols = (0..WellKnown::COUNT as u32)
            .map(|i| SymbolData {
                description: Some(WellKnown::from_repr(i).expect("well-known repr in range").description().to_owned()),
                registry_key: None,
                well_known: true,
            })
            .collect();
        Self {
            strings: Vec::new(),
            lookup: hashbrown::HashMap::default(),
            symbols,
            symbol_registry: AHashMap::new(),
        }
    }

    /// Interns a string, returning its id. Static and single-ASCII strings
    /// resolve to their fixed ids without touching the dynamic table.
    pub fn intern(&mut self, s: &str) -> StringId {
        if s.len() == 1 {
            let b = s.as_bytes()[0];
            if b < 128 {
                return StringId::from_ascii(b);
            }
        }
        if let Some(id) = lookup_static(s) {
            return id;
        }
        if let Some(id) = self.lookup.get(s) {
            return *id;
        }
        let id = StringId(INTERN_STRING_ID_OFFSET + self.strings.len() as u32);
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        self.lookup.insert(boxed, id);
        id
    }

    /// Returns the content of an interned string.
    pub fn str(&self, id: StringId) -> &str {
        if id.0 < 128 {
            ASCII_STRS[id.0 as usize]
        } else if id.0 < INTERN_STRING_ID_OFFSET {
            StaticStrings::from_repr((id.0 - STATIC_STRING_ID_OFFSET) as u16)
                .expect("invalid static string id")
                .as_str()
        } else {
            &self.strings[(id.0 - INTERN_STRING_ID_OFFSET) as usize]
        }
    }

    /// Number of dynamically interned strings (for heap stats).
    pub fn dynamic_count(&self) -> usize {
        self.strings.len()
    }

    /// Creates a fresh (non-registered) symbol.
    pub fn new_symbol(&mut self, description: Option<String>) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolData {
            description,
            registry_key: None,
            well_known: false,
        });
        id
    }

    /// `Symbol.for(key)`: returns the registered symbol for `key`, creating it
    /// on first use.
    pub fn symbol_for(&mut self, key: &str) -> SymbolId {
        if let Some(id) = self.symbol_registry.get(key) {
            return *id;
        }
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolData {
            description: Some(key.to_owned()),
            registry_key: Some(key.to_owned()),
            well_known: false,
        });
        self.symbol_registry.insert(key.to_owned(), id);
        id
    }

    /// `Symbol.keyFor(sym)`.
    pub fn symbol_key_for(&self, id: SymbolId) -> Option<&str> {
        self.symbols[id.index()].registry_key.as_deref()
    }

    pub fn symbol(&self, id: SymbolId) -> &SymbolData {
        &self.symbols[id.index()]
    }
}

/// Looks up a string in the static table without interning.
fn lookup_static(s: &str) -> Option<StringId> {
    static STATIC_LOOKUP: LazyLock<AHashMap<&'static str, StringId>> = LazyLock::new(|| {
        (0..StaticStrings::COUNT as u16)
            .map(|i| {
                let v = StaticStrings::from_repr(i).expect("static string repr in range");
                (v.as_str(), v.id())
            })
            .collect()
    });
    STATIC_LOOKUP.get(s).copied()
}

/// Identifies a parsed function body in the code store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub(crate) struct FuncId(pub u32);

impl FuncId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies a lexically resolved private name (`#x`) within its class body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub(crate) struct PrivateId(pub u32);

impl PrivateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_and_static_ids_are_stable() {
        let mut interns = Interns::new();
        assert_eq!(interns.intern("a"), StringId::from_ascii(b'a'));
        assert_eq!(interns.intern("length"), StaticStrings::Length.id());
        assert_eq!(interns.str(StaticStrings::Length.id()), "length");
        assert_eq!(interns.str(StaticStrings::Return.id()), "return");
    }

    #[test]
    fn dynamic_interning_dedupes() {
        let mut interns = Interns::new();
        let a = interns.intern("somewhatLongerName");
        let b = interns.intern("somewhatLongerName");
        assert_eq!(a, b);
        assert_eq!(interns.str(a), "somewhatLongerName");
        assert_eq!(interns.dynamic_count(), 1);
    }

    #[test]
    fn symbol_registry_round_trips() {
        let mut interns = Interns::new();
        let a = interns.symbol_for("app.key");
        let b = interns.symbol_for("app.key");
        assert_eq!(a, b);
        assert_eq!(interns.symbol_key_for(a), Some("app.key"));
        let fresh = interns.new_symbol(Some("desc".to_owned()));
        assert_eq!(interns.symbol_key_for(fresh), None);
        assert!(interns.symbol(WellKnown::Iterator.id()).well_known);
    }
}
