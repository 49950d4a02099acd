//! `console.log`/`warn`/`error` through the registered [`PrintWriter`].

use crate::{
    error::RunResult,
    heap::HeapData,
    io::ConsoleStream,
    machine::Interp,
    object::ObjectKind,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConsoleFn {
    Log,
    Warn,
    Error,
}

pub(crate) fn call(interp: &mut Interp, f: ConsoleFn, _this: Value, args: &[Value]) -> RunResult<Value> {
    let mut parts = Vec::with_capacity(args.len());
    for a in args {
        parts.push(display_value(interp, *a, 0)?);
    }
    let line = parts.join(" ");
    let stream = match f {
        ConsoleFn::Log => ConsoleStream::Log,
        ConsoleFn::Warn => ConsoleStream::Warn,
        ConsoleFn::Error => ConsoleStream::Error,
    };
    interp.print.write_line(stream, &line);
    Ok(Value::Undefined)
}

/// Console rendering: strings bare at the top level, objects one level
/// deep, everything else through its string coercion.
fn display_value(interp: &mut Interp, v: Value, depth: usize) -> RunResult<String> {
    if let Some(s) = v.as_str(&interp.heap, &interp.interns) {
        return Ok(if depth == 0 { s.to_owned() } else { format!("'{s}'") });
    }
    if let Some(b) = v.as_bigint(&interp.heap) {
        return Ok(format!("{b}n"));
    }
    let Some(id) = v.object_id(&interp.heap) else {
        return interp.to_string_rust(v);
    };
    if depth >= 2 {
        return Ok("…".to_owned());
    }
    match &interp.heap.obj(id).kind {
        ObjectKind::Array { length } => {
            let length = *length;
            let mut parts = Vec::with_capacity(length as usize);
            for i in 0..length.min(32) {
                let item = interp.get_prop(v, &crate::object::Key::Index(i))?;
                parts.push(display_value(interp, item, depth + 1)?);
            }
            if length > 32 {
                parts.push(format!("… {} more", length - 32));
            }
            Ok(format!("[ {} ]", parts.join(", ")))
        }
        ObjectKind::Function(_) => {
            let name = interp.get_prop(v, &crate::object::Key::Str(crate::intern::StaticStrings::Name.id()))?;
            let name = interp.to_string_rust(name).unwrap_or_default();
            Ok(if name.is_empty() { "[Function (anonymous)]".to_owned() } else { format!("[Function: {name}]") })
        }
        ObjectKind::Error { .. } => interp.to_string_rust(v),
        _ => {
            let keys = interp.own_enumerable_keys(id);
            let mut parts = Vec::new();
            for key in keys.into_iter().take(32) {
                let name = key.render(&interp.interns);
                let item = interp.get_prop(v, &key)?;
                parts.push(format!("{name}: {}", display_value(interp, item, depth + 1)?));
            }
            if parts.is_empty() {
                // plain objects with a custom toString render through it
                if let HeapData::Object(_) = interp.heap.get(id) {
                    return Ok("{}".to_owned());
                }
            }
            Ok(format!("{{ {} }}", parts.join(", ")))
        }
    }
}
