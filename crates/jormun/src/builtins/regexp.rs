//! The `RegExp` constructor and prototype, match-result construction
//! (`index`/`input`/`groups`, `d`-flag indices), `lastIndex` bookkeeping,
//! and replacement-template expansion.

use super::arg;
use crate::{
    error::RunResult,
    heap::{HeapData, HeapId},
    intern::StaticStrings,
    machine::Interp,
    object::{JsObject, Key, ObjectKind, Property},
    regexp::{MatchResult, RegexData, RegexFlags},
    types::str::{byte_to_utf16, utf16_to_byte},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegexFn {
    Ctor,
    Exec,
    Test,
    ToStringMethod,
}

pub(crate) fn construct(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    let a1 = arg(args, 1);
    if let Some(id) = super::string::regex_of(interp, a0) {
        let (source, flags) = match &interp.heap.obj(id).kind {
            ObjectKind::Regex(data) => (data.source.clone(), data.flags),
            _ => unreachable!("regex checked"),
        };
        let flags_str = if matches!(a1, Value::Undefined) {
            flags.to_flag_string()
        } else {
            interp.to_string_rust(a1)?
        };
        let source_owned = source;
        return interp.make_regex(&source_owned, &flags_str);
    }
    let source = if matches!(a0, Value::Undefined) { String::new() } else { interp.to_string_rust(a0)? };
    let flags = if matches!(a1, Value::Undefined) { String::new() } else { interp.to_string_rust(a1)? };
    interp.make_regex(&source, &flags)
}

pub(crate) fn call(interp: &mut Interp, f: RegexFn, this: Value, args: &[Value]) -> RunResult<Value> {
    let a0 = arg(args, 0);
    match f {
        RegexFn::Ctor => construct(interp, args),
        RegexFn::Exec => {
            let Some(id) = super::string::regex_of(interp, this) else {
                return Err(interp.throw_type("RegExp.prototype.exec called on incompatible receiver"));
            };
            let subject = interp.to_string_value(a0)?;
            interp.regexp_exec(id, subject)
        }
        RegexFn::Test => {
            let Some(id) = super::string::regex_of(interp, this) else {
                return Err(interp.throw_type("RegExp.prototype.test called on incompatible receiver"));
            };
            let subject = interp.to_string_value(a0)?;
            let result = interp.regexp_exec(id, subject)?;
            Ok(Value::Bool(!matches!(result, Value::Null)))
        }
        RegexFn::ToStringMethod => {
            let Some(id) = super::string::regex_of(interp, this) else {
                return Err(interp.throw_type("RegExp.prototype.toString called on incompatible receiver"));
            };
            let (source, flags) = match &interp.heap.obj(id).kind {
                ObjectKind::Regex(data) => (data.source.clone(), data.flags.to_flag_string()),
                _ => unreachable!("regex checked"),
            };
            let source = if source.is_empty() { "(?:)".to_owned() } else { source };
            Value::string(&mut interp.heap, format!("/{source}/{flags}"))
        }
    }
}

impl Interp {
    /// Allocates a RegExp object; flags are validated here (SyntaxError on
    /// bad flag strings, matching literal parsing).
    pub(crate) fn make_regex(&mut self, source: &str, flags: &str) -> RunResult<Value> {
        let flags = RegexFlags::parse(flags).map_err(crate::error::RunError::syntax_err)?;
        self.make_regex_with_flags(source, flags)
    }

    pub(crate) fn make_regex_with_flags(&mut self, source: &str, flags: RegexFlags) -> RunResult<Value> {
        let data = RegexData::new(source.to_owned(), flags);
        let mut obj = JsObject::new(Some(self.realm.regexp_proto), ObjectKind::Regex(Box::new(data)));
        let source_val = Value::string(&mut self.heap, source.to_owned())?;
        obj.define(Key::Str(StaticStrings::Source.id()), Property::method_ro(source_val));
        let flags_val = Value::string(&mut self.heap, flags.to_flag_string())?;
        obj.define(Key::Str(StaticStrings::Flags.id()), Property::method_ro(flags_val));
        obj.define(Key::Str(StaticStrings::Global.id()), Property::method_ro(Value::Bool(flags.global)));
        obj.define(
            Key::Str(StaticStrings::LastIndex.id()),
            Property::Data { value: Value::Number(0.0), writable: true, enumerable: false, configurable: false },
        );
        Ok(Value::Ref(self.heap.alloc(HeapData::Object(obj))?))
    }

    /// The regex literal evaluator hook.
    pub(crate) fn make_regex_from_literal(&mut self, expr: crate::ast::ExprId) -> RunResult<Value> {
        let crate::ast::Expr::Regex { pattern, flags } = self.code.expr(expr) else {
            unreachable!("regex literal step on non-regex expr");
        };
        let (pattern, flags) = (pattern.to_string(), *flags);
        self.make_regex_with_flags(&pattern, flags)
    }

    pub(crate) fn reset_last_index(&mut self, regex: HeapId) -> RunResult<()> {
        self.set_prop(
            regex,
            Key::Str(StaticStrings::LastIndex.id()),
            Value::Number(0.0),
            Value::Ref(regex),
            true,
        )
    }

    /// `exec` semantics: honors and advances `lastIndex` for `g`/`y`.
    pub(crate) fn regexp_exec(&mut self, regex: HeapId, subject: Value) -> RunResult<Value> {
        let s = self.to_string_rust(subject)?;
        let flags = match &self.heap.obj(regex).kind {
            ObjectKind::Regex(data) => data.flags,
            _ => return Err(self.throw_type("exec called on incompatible receiver")),
        };
        let tracks_index = flags.global || flags.sticky;
        let start_units = if tracks_index {
            let li = self.get_prop(Value::Ref(regex), &Key::Str(StaticStrings::LastIndex.id()))?;
            crate::types::number::to_length(self.to_number(li)?) as usize
        } else {
            0
        };
        let Some(start_byte) = utf16_to_byte(&s, start_units) else {
            if tracks_index {
                self.reset_last_index(regex)?;
            }
            return Ok(Value::Null);
        };
        let m = {
            let ObjectKind::Regex(data) = &mut self.heap.obj_mut(regex).kind else {
                unreachable!("regex checked");
            };
            data.find_at(&s, start_byte)?
        };
        let Some(m) = m else {
            if tracks_index {
                self.reset_last_index(regex)?;
            }
            return Ok(Value::Null);
        };
        if tracks_index {
            let end_units = byte_to_utf16(&s, m.end);
            self.set_prop(
                regex,
                Key::Str(StaticStrings::LastIndex.id()),
                Value::Number(end_units as f64),
                Value::Ref(regex),
                true,
            )?;
        }
        self.build_match_result(&m, &s, flags)
    }

    /// `exec` without touching `lastIndex` (the `search` contract).
    pub(crate) fn regexp_exec_no_advance(&mut self, regex: HeapId, subject: Value) -> RunResult<Option<Value>> {
        let s = self.to_string_rust(subject)?;
        let flags = match &self.heap.obj(regex).kind {
            ObjectKind::Regex(data) => data.flags,
            _ => return Err(self.throw_type("search called on incompatible receiver")),
        };
        let m = {
            let ObjectKind::Regex(data) = &mut self.heap.obj_mut(regex).kind else {
                unreachable!("regex checked");
            };
            data.find_at(&s, 0)?
        };
        match m {
            None => Ok(None),
            Some(m) => Ok(Some(self.build_match_result(&m, &s, flags)?)),
        }
    }

    /// Builds the match array: `[full, group1, ...]` with `index`, `input`,
    /// `groups`, and (with `d`) `indices`.
    fn build_match_result(&mut self, m: &MatchResult, s: &str, flags: RegexFlags) -> RunResult<Value> {
        let mut items = Vec::with_capacity(m.groups.len() + 1);
        items.push(Value::string(&mut self.heap, s[m.start..m.end].to_owned())?);
        for group in &m.groups {
            items.push(match group {
                Some((gs, ge)) => Value::string(&mut self.heap, s[*gs..*ge].to_owned())?,
                None => Value::Undefined,
            });
        }
        let result = self.make_array(items)?;
        let result_id = result.object_id(&self.heap).expect("array");
        let index_units = byte_to_utf16(s, m.start);
        self.heap.obj_mut(result_id).define(
            Key::Str(StaticStrings::Index.id()),
            Property::data(Value::Number(index_units as f64)),
        );
        let input = Value::string(&mut self.heap, s.to_owned())?;
        self.heap
            .obj_mut(result_id)
            .define(Key::Str(StaticStrings::Input.id()), Property::data(input));
        // named groups object ('groups' is undefined without named groups)
        let groups_val = if m.names.is_empty() {
            Value::Undefined
        } else {
            let mut groups = JsObject::new(None, ObjectKind::Ordinary);
            for (name, idx) in &m.names {
                let v = match m.groups.get(idx - 1).copied().flatten() {
                    Some((gs, ge)) => Value::string(&mut self.heap, s[gs..ge].to_owned())?,
                    None => Value::Undefined,
                };
                let key = Key::from_str(&mut self.interns, name);
                groups.define(key, Property::data(v));
            }
            Value::Ref(self.heap.alloc(HeapData::Object(groups))?)
        };
        self.heap
            .obj_mut(result_id)
            .define(Key::Str(StaticStrings::Groups.id()), Property::data(groups_val));
        if flags.has_indices {
            let mut pairs = Vec::with_capacity(m.groups.len() + 1);
            let full = self.make_array(vec![
                Value::Number(index_units as f64),
                Value::Number(byte_to_utf16(s, m.end) as f64),
            ])?;
            pairs.push(full);
            for group in &m.groups {
                pairs.push(match group {
                    Some((gs, ge)) => self.make_array(vec![
                        Value::Number(byte_to_utf16(s, *gs) as f64),
                        Value::Number(byte_to_utf16(s, *ge) as f64),
                    ])?,
                    None => Value::Undefined,
                });
            }
            let indices = self.make_array(pairs)?;
            let indices_id = indices.object_id(&self.heap).expect("array");
            // named versions mirror onto indices.groups
            let groups_indices = if m.names.is_empty() {
                Value::Undefined
            } else {
                let mut groups = JsObject::new(None, ObjectKind::Ordinary);
                for (name, idx) in &m.names {
                    let v = match m.groups.get(idx - 1).copied().flatten() {
                        Some((gs, ge)) => self.make_array(vec![
                            Value::Number(byte_to_utf16(s, gs) as f64),
                            Value::Number(byte_to_utf16(s, ge) as f64),
                        ])?,
                        None => Value::Undefined,
                    };
                    let key = Key::from_str(&mut self.interns, name);
                    groups.define(key, Property::data(v));
                }
                Value::Ref(self.heap.alloc(HeapData::Object(groups))?)
            };
            self.heap
                .obj_mut(indices_id)
                .define(Key::Str(StaticStrings::Groups.id()), Property::data(groups_indices));
            self.heap
                .obj_mut(result_id)
                .define(Key::Str(StaticStrings::Indices.id()), Property::data(indices));
        }
        Ok(result)
    }

    /// Regex-driven `String.prototype.replace`/`replaceAll`.
    pub(crate) fn regexp_replace(&mut self, regex: HeapId, s: &str, replacement: Value, all: bool) -> RunResult<Value> {
        let func = replacement.is_callable(&self.heap);
        let template = if func { String::new() } else { self.to_string_rust(replacement)? };
        let mut out = String::new();
        let mut last = 0usize;
        let mut pos = 0usize;
        if all {
            self.reset_last_index(regex)?;
        }
        loop {
            let m = {
                let ObjectKind::Regex(data) = &mut self.heap.obj_mut(regex).kind else {
                    return Err(self.throw_type("replace called on incompatible receiver"));
                };
                data.find_at(s, pos)?
            };
            let Some(m) = m else { break };
            out.push_str(&s[last..m.start]);
            if func {
                // (match, p1..pN, offset, string, groups?)
                let mut call_args = Vec::with_capacity(m.groups.len() + 3);
                call_args.push(Value::string(&mut self.heap, s[m.start..m.end].to_owned())?);
                for group in &m.groups {
                    call_args.push(match group {
                        Some((gs, ge)) => Value::string(&mut self.heap, s[*gs..*ge].to_owned())?,
                        None => Value::Undefined,
                    });
                }
                call_args.push(Value::Number(byte_to_utf16(s, m.start) as f64));
                call_args.push(Value::string(&mut self.heap, s.to_owned())?);
                if !m.names.is_empty() {
                    let mut groups = JsObject::new(None, ObjectKind::Ordinary);
                    for (name, idx) in &m.names {
                        let v = match m.groups.get(idx - 1).copied().flatten() {
                            Some((gs, ge)) => Value::string(&mut self.heap, s[gs..ge].to_owned())?,
                            None => Value::Undefined,
                        };
                        let key = Key::from_str(&mut self.interns, name);
                        groups.define(key, Property::data(v));
                    }
                    call_args.push(Value::Ref(self.heap.alloc(HeapData::Object(groups))?));
                }
                let r = self.call_sync(replacement, Value::Undefined, &call_args)?;
                out.push_str(&self.to_string_rust(r)?);
            } else {
                out.push_str(&expand_replacement(&template, &m, s));
            }
            last = m.end;
            pos = if m.end == m.start {
                // zero-width match: step forward one char
                let mut next = m.end + 1;
                while next < s.len() && !s.is_char_boundary(next) {
                    next += 1;
                }
                next
            } else {
                m.end
            };
            if !all {
                break;
            }
            if pos > s.len() {
                break;
            }
        }
        out.push_str(&s[last.min(s.len())..]);
        if all {
            self.reset_last_index(regex)?;
        }
        Value::string(&mut self.heap, out)
    }
}

/// Expands `$&`, `` $` ``, `$'`, `$n`, `$<name>`, `$$` in a replacement
/// template.
pub(crate) fn expand_replacement(template: &str, m: &MatchResult, s: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c != '$' || i + 1 >= bytes.len() {
            out.push(c);
            i += 1;
            continue;
        }
        match bytes[i + 1] {
            '$' => {
                out.push('$');
                i += 2;
            }
            '&' => {
                out.push_str(&s[m.start..m.end]);
                i += 2;
            }
            '`' => {
                out.push_str(&s[..m.start]);
                i += 2;
            }
            '\'' => {
                out.push_str(&s[m.end..]);
                i += 2;
            }
            '<' => {
                let close = bytes[i + 2..].iter().position(|&c| c == '>');
                match close {
                    Some(rel) => {
                        let name: String = bytes[i + 2..i + 2 + rel].iter().collect();
                        if let Some((_, idx)) = m.names.iter().find(|(n, _)| *n == name)
                            && let Some(Some((gs, ge))) = m.groups.get(idx - 1)
                        {
                            out.push_str(&s[*gs..*ge]);
                        }
                        i += 3 + rel;
                    }
                    None => {
                        out.push('$');
                        i += 1;
                    }
                }
            }
            d if d.is_ascii_digit() => {
                // $n or $nn, 1-based
                let mut num = d.to_digit(10).expect("digit") as usize;
                let mut width = 1;
                if i + 2 < bytes.len()
                    && let Some(d2) = bytes[i + 2].to_digit(10)
                {
                    let two = num * 10 + d2 as usize;
                    if two <= m.groups.len() && two > 0 {
                        num = two;
                        width = 2;
                    }
                }
                if num > 0 && num <= m.groups.len() {
                    if let Some((gs, ge)) = m.groups[num - 1] {
                        out.push_str(&s[gs..ge]);
                    }
                    i += 1 + width;
                } else {
                    out.push('$');
                    i += 1;
                }
            }
            _ => {
                out.push('$');
                i += 1;
            }
        }
    }
    out
}

/// `$&`-family expansion for non-regex `replace` (only `$$`, `` $` ``,
/// `$'`, `$&` apply).
pub(crate) fn expand_plain_replacement(template: &str, matched: &str, s: &str, match_byte: usize) -> String {
    let m = MatchResult {
        start: match_byte,
        end: match_byte + matched.len(),
        groups: Vec::new(),
        names: Vec::new(),
    };
    expand_replacement(template, &m, s)
}
