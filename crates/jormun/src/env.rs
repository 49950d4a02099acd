//! Lexical scope frames.
//!
//! Scopes are heap-allocated so closures, generators, and module records can
//! capture them by handle. Each frame owns its bindings; resolution walks
//! parent-ward. `initialized: false` models the temporal dead zone for
//! `let`/`const`/`class` bindings; module import bindings are indirections
//! into the exporting module's scope so exporter mutations stay visible.

use ahash::AHashMap;

use crate::{
    heap::HeapId,
    intern::StringId,
    module::ModuleId,
    value::Value,
};

/// One identifier binding.
#[derive(Debug, Clone)]
pub(crate) enum Binding {
    Slot {
        value: Value,
        /// `false` for `const` (and import) bindings after initialization.
        mutable: bool,
        /// `false` while in the temporal dead zone.
        initialized: bool,
    },
    /// A live re-export: reads are forwarded to `module`'s scope.
    Indirect { module: ModuleId, name: StringId },
}

impl Binding {
    /// An initialized mutable binding (`var`, parameters, function decls).
    pub fn var(value: Value) -> Self {
        Self::Slot {
            value,
            mutable: true,
            initialized: true,
        }
    }

    /// An uninitialized `let`/`class` binding (TDZ until first assignment).
    pub fn uninit_let() -> Self {
        Self::Slot {
            value: Value::Undefined,
            mutable: true,
            initialized: false,
        }
    }

    /// An uninitialized `const` binding.
    pub fn uninit_const() -> Self {
        Self::Slot {
            value: Value::Undefined,
            mutable: false,
            initialized: false,
        }
    }
}

/// `this` state of a function frame. Derived-class constructors start
/// uninitialized until `super(...)` runs.
#[derive(Debug, Clone)]
pub(crate) enum ThisState {
    Uninitialized,
    Bound(Value),
}

/// Extra slots carried by function (and module/global) frames.
#[derive(Debug, Clone)]
pub(crate) struct FnScopeData {
    pub this: ThisState,
    pub new_target: Value,
    /// `[[HomeObject]]` of the running method, for `super.x`.
    pub home_object: Option<HeapId>,
    /// The function object itself (for `super()` prototype walks).
    pub func_obj: Option<HeapId>,
    /// The `arguments` object, created lazily for non-arrow functions.
    pub arguments: Option<Value>,
}

impl FnScopeData {
    pub fn new(this: ThisState, new_target: Value) -> Self {
        Self {
            this,
            new_target,
            home_object: None,
            func_obj: None,
            arguments: None,
        }
    }
}

/// What kind of frame this is. Arrow functions do not create `Function`
/// frames — `this`/`arguments` resolution walks past blocks to the nearest
/// enclosing frame that carries [`FnScopeData`].
#[derive(Debug)]
pub(crate) enum ScopeKind {
    Global(FnScopeData),
    Function(FnScopeData),
    Module(ModuleId, FnScopeData),
    Block,
    Catch,
}

/// A lexical scope frame.
#[derive(Debug)]
pub(crate) struct Scope {
    pub parent: Option<HeapId>,
    pub kind: ScopeKind,
    pub bindings: AHashMap<StringId, Binding>,
}

impl Scope {
    pub fn new(parent: Option<HeapId>, kind: ScopeKind) -> Self {
        Self {
            parent,
            kind,
            bindings: AHashMap::new(),
        }
    }

    pub fn block(parent: HeapId) -> Self {
        Self::new(Some(parent), ScopeKind::Block)
    }

    /// The frame's function data, when it is a function-like frame.
    pub fn fn_data(&self) -> Option<&FnScopeData> {
        match &self.kind {
            ScopeKind::Global(d) | ScopeKind::Function(d) | ScopeKind::Module(_, d) => Some(d),
            ScopeKind::Block | ScopeKind::Catch => None,
        }
    }

    pub fn fn_data_mut(&mut self) -> Option<&mut FnScopeData> {
        match &mut self.kind {
            ScopeKind::Global(d) | ScopeKind::Function(d) | ScopeKind::Module(_, d) => Some(d),
            ScopeKind::Block | ScopeKind::Catch => None,
        }
    }

    /// True for frames that host `var` declarations (function, module,
    /// global). Blocks forward their `var`s upward.
    pub fn hosts_var(&self) -> bool {
        !matches!(self.kind, ScopeKind::Block | ScopeKind::Catch)
    }

    pub fn estimate_size(&self) -> usize {
        self.bindings.len() * (size_of::<StringId>() + size_of::<Binding>()) + size_of::<Self>()
    }
}
