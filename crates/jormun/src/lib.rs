#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts are intentional")]
#![expect(clippy::cast_possible_wrap, reason = "wrap behavior mirrors ECMAScript ToInt32/ToUint32")]
#![expect(clippy::unnecessary_wraps, reason = "dispatch signatures are uniform")]
#![expect(clippy::needless_pass_by_value, reason = "call APIs pass values consistently")]
#![expect(clippy::struct_excessive_bools, reason = "state mirrors ECMAScript flag fields")]
#![expect(clippy::too_many_arguments, reason = "spec parity requires wide signatures")]
#![expect(clippy::type_complexity, reason = "protocol tuples are intentionally rich")]
#![expect(clippy::float_cmp, reason = "spec semantics require exact float comparison")]

mod ast;
mod builtins;
mod coroutine;
mod env;
mod error;
mod heap;
mod intern;
mod io;
mod jobs;
mod lexer;
mod machine;
mod module;
mod object;
mod parser;
mod realm;
mod regexp;
mod resource;
mod run;
mod types;
mod value;

pub use crate::{
    error::{CodeLoc, ExcKind, Exception, StackFrame},
    heap::HeapStats,
    io::{CollectStringPrint, ConsoleStream, PrintWriter, StdPrint},
    resource::{DEFAULT_MAX_CALL_DEPTH, ResourceError, ResourceLimits},
    run::{Interpreter, JsValue, ModuleLoader, ModuleResolver},
};
