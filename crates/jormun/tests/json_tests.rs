//! `JSON.stringify` / `JSON.parse` observable formats.

use jormun::{Interpreter, JsValue};
use pretty_assertions::assert_eq;

fn eval(src: &str) -> JsValue {
    Interpreter::new().eval(src).unwrap()
}

fn s(src: &str) -> String {
    match eval(src) {
        JsValue::String(s) => s,
        other => panic!("expected string from {src}, got {other:?}"),
    }
}

#[test]
fn stringify_primitives() {
    assert_eq!(s("JSON.stringify(1)"), "1");
    assert_eq!(s("JSON.stringify(1.5)"), "1.5");
    assert_eq!(s("JSON.stringify(2.0)"), "2", "integers render without a fraction");
    assert_eq!(s("JSON.stringify('x')"), r#""x""#);
    assert_eq!(s("JSON.stringify(true)"), "true");
    assert_eq!(s("JSON.stringify(null)"), "null");
    assert_eq!(s("JSON.stringify(NaN)"), "null");
    assert_eq!(s("JSON.stringify(Infinity)"), "null");
    assert_eq!(eval("JSON.stringify(undefined)"), JsValue::Undefined);
    assert_eq!(eval("JSON.stringify(() => 1)"), JsValue::Undefined);
}

#[test]
fn stringify_structures() {
    assert_eq!(s("JSON.stringify([1, 'a', false])"), r#"[1,"a",false]"#);
    assert_eq!(s("JSON.stringify({b: 2, a: 1})"), r#"{"b":2,"a":1}"#, "insertion order");
    assert_eq!(s("JSON.stringify({o: {n: [{}]}})"), r#"{"o":{"n":[{}]}}"#);
}

#[test]
fn undefined_and_functions_drop_differently_in_arrays_and_objects() {
    assert_eq!(s("JSON.stringify([1, undefined, () => 1, 2])"), "[1,null,null,2]");
    assert_eq!(s("JSON.stringify({a: 1, f: () => 1, u: undefined})"), r#"{"a":1}"#);
}

#[test]
fn string_escaping() {
    assert_eq!(s(r#"JSON.stringify('quo"te')"#), r#""quo\"te""#);
    assert_eq!(s(r"JSON.stringify('line\nfeed')"), r#""line\nfeed""#);
    assert_eq!(s(r"JSON.stringify('')"), r#""""#);
}

#[test]
fn indentation_parameter() {
    assert_eq!(s("JSON.stringify({a: 1}, null, 2)"), "{\n  \"a\": 1\n}");
    assert_eq!(s("JSON.stringify([1, 2], null, '\t')"), "[\n\t1,\n\t2\n]");
    assert_eq!(s("JSON.stringify({a: [1]}, null, 1)"), "{\n \"a\": [\n  1\n ]\n}");
}

#[test]
fn replacer_function_and_array() {
    assert_eq!(
        s("JSON.stringify({a: 1, b: 2}, (k, v) => typeof v === 'number' ? v * 10 : v)"),
        r#"{"a":10,"b":20}"#
    );
    assert_eq!(
        s("JSON.stringify({a: 1, secret: 2, b: 3}, ['a', 'b'])"),
        r#"{"a":1,"b":3}"#
    );
}

#[test]
fn to_json_is_consulted() {
    assert_eq!(s("JSON.stringify({toJSON() { return 'replaced' }})"), r#""replaced""#);
    assert_eq!(s("JSON.stringify(new Date(0))"), r#""1970-01-01T00:00:00.000Z""#);
}

#[test]
fn circular_structures_throw() {
    let err = Interpreter::new().eval("const o = {}; o.me = o; JSON.stringify(o)").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
    let err = Interpreter::new().eval("const a = []; a.push(a); JSON.stringify(a)").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
    // diamonds (shared, acyclic references) are fine
    assert_eq!(s("const shared = {v: 1}; JSON.stringify({a: shared, b: shared})"), r#"{"a":{"v":1},"b":{"v":1}}"#);
}

#[test]
fn parse_basics() {
    assert_eq!(eval("JSON.parse('42')"), JsValue::Number(42.0));
    assert_eq!(eval(r#"JSON.parse('{"k": [1, true, null]}').k[1]"#), JsValue::Bool(true));
    assert_eq!(eval(r#"JSON.parse('"s"')"#), JsValue::String("s".to_owned()));
    let err = Interpreter::new().eval("JSON.parse('{broken')").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::SyntaxError));
}

#[test]
fn parse_reviver_transforms_and_deletes() {
    assert_eq!(
        eval(r#"JSON.parse('{"a": 1, "b": 2}', (k, v) => typeof v === 'number' ? v + 1 : v).a"#),
        JsValue::Number(2.0)
    );
    // returning undefined removes the key
    assert_eq!(
        eval(r#"'b' in JSON.parse('{"a": 1, "b": 2}', (k, v) => k === 'b' ? undefined : v)"#),
        JsValue::Bool(false)
    );
}

#[test]
fn parse_preserves_key_order() {
    assert_eq!(
        s(r#"Object.keys(JSON.parse('{"z": 1, "a": 2, "m": 3}')).join(',')"#),
        "z,a,m"
    );
}
