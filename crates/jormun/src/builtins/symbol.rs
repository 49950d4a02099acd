//! The `Symbol` function and prototype.

use super::arg;
use crate::{error::RunResult, machine::Interp, object::ObjectKind, value::Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SymbolFn {
    Ctor,
    For,
    KeyFor,
    ToStringMethod,
}

pub(crate) fn call(interp: &mut Interp, f: SymbolFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    match f {
        SymbolFn::Ctor => {
            let description = if matches!(a0, Value::Undefined) {
                None
            } else {
                Some(interp.to_string_rust(a0)?)
            };
            Ok(Value::Symbol(interp.interns.new_symbol(description)))
        }
        SymbolFn::For => {
            let key = interp.to_string_rust(a0)?;
            Ok(Value::Symbol(interp.interns.symbol_for(&key)))
        }
        SymbolFn::KeyFor => {
            let Value::Symbol(sym) = a0 else {
                return Err(interp.throw_type("Symbol.keyFor requires a symbol"));
            };
            match interp.interns.symbol_key_for(sym) {
                Some(key) => {
                    let key = key.to_owned();
                    Value::string(&mut interp.heap, key)
                }
                None => Ok(Value::Undefined),
            }
        }
        SymbolFn::ToStringMethod => {
            let sym = match this {
                Value::Symbol(sym) => sym,
                _ => {
                    if let Some(id) = this.object_id(&interp.heap)
                        && let ObjectKind::Wrapper(Value::Symbol(sym)) = interp.heap.obj(id).kind
                    {
                        sym
                    } else {
                        return Err(interp.throw_type("Symbol.prototype.toString requires a symbol"));
                    }
                }
            };
            let desc = interp.interns.symbol(sym).description.clone().unwrap_or_default();
            Value::string(&mut interp.heap, format!("Symbol({desc})"))
        }
    }
}
