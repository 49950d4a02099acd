//! String methods over UTF-16 code-unit semantics.

use jormun::{Interpreter, JsValue};
use pretty_assertions::assert_eq;

fn eval(src: &str) -> JsValue {
    Interpreter::new().eval(src).unwrap()
}

fn num(src: &str) -> f64 {
    match eval(src) {
        JsValue::Number(n) => n,
        other => panic!("expected number from {src}, got {other:?}"),
    }
}

fn s(src: &str) -> String {
    match eval(src) {
        JsValue::String(s) => s,
        other => panic!("expected string from {src}, got {other:?}"),
    }
}

#[test]
fn length_counts_utf16_units() {
    assert_eq!(num("'abc'.length"), 3.0);
    assert_eq!(num("'\u{1F600}'.length"), 2.0, "astral characters take two units");
    assert_eq!(num("'a\u{1F600}b'.length"), 4.0);
}

#[test]
fn indexing_and_char_access() {
    assert_eq!(s("'abc'[1]"), "b");
    assert_eq!(eval("'abc'[9]"), JsValue::Undefined);
    assert_eq!(s("'abc'.charAt(2)"), "c");
    assert_eq!(num("'A'.charCodeAt(0)"), 65.0);
    assert_eq!(num("'\u{1F600}'.charCodeAt(0)"), 55357.0, "lead surrogate");
    assert_eq!(num("'\u{1F600}'.codePointAt(0)"), 128512.0);
    assert_eq!(s("String.fromCharCode(72, 105)"), "Hi");
    assert_eq!(s("String.fromCodePoint(128512)"), "\u{1F600}");
}

#[test]
fn slicing_family() {
    assert_eq!(s("'hello world'.slice(6)"), "world");
    assert_eq!(s("'hello'.slice(1, -1)"), "ell");
    assert_eq!(s("'hello'.substring(3, 1)"), "el", "substring swaps its bounds");
    assert_eq!(s("'hello'.slice(3, 1)"), "", "slice does not");
}

#[test]
fn search_family() {
    assert_eq!(eval("'banana'.includes('nan')"), JsValue::Bool(true));
    assert_eq!(eval("'banana'.startsWith('ban')"), JsValue::Bool(true));
    assert_eq!(eval("'banana'.endsWith('na')"), JsValue::Bool(true));
    assert_eq!(eval("'banana'.startsWith('an', 1)"), JsValue::Bool(true));
    assert_eq!(num("'banana'.indexOf('an')"), 1.0);
    assert_eq!(num("'banana'.indexOf('an', 2)"), 3.0);
    assert_eq!(num("'banana'.lastIndexOf('an')"), 3.0);
}

#[test]
fn case_trim_pad_repeat() {
    assert_eq!(s("'MiXeD'.toLowerCase()"), "mixed");
    assert_eq!(s("'MiXeD'.toUpperCase()"), "MIXED");
    assert_eq!(s("'  pad  '.trim()"), "pad");
    assert_eq!(s("'  pad  '.trimStart()"), "pad  ");
    assert_eq!(s("'  pad  '.trimEnd()"), "  pad");
    assert_eq!(s("'5'.padStart(3, '0')"), "005");
    assert_eq!(s("'5'.padEnd(3)"), "5  ");
    assert_eq!(s("'ab'.repeat(3)"), "ababab");
    assert!(Interpreter::new().eval("'x'.repeat(-1)").is_err());
}

#[test]
fn split_plain_strings() {
    assert_eq!(s("'a,b,c'.split(',').join('|')"), "a|b|c");
    assert_eq!(num("'abc'.split('').length"), 3.0);
    assert_eq!(num("'abc'.split(undefined).length"), 1.0);
}

#[test]
fn concat_and_at() {
    assert_eq!(s("'a'.concat('b', 'c')"), "abc");
    assert_eq!(s("'hello'.at(0)"), "h");
    assert_eq!(s("'hello'.at(-2)"), "l");
    assert_eq!(eval("'hello'.at(99)"), JsValue::Undefined);
}

#[test]
fn strings_are_iterable_by_code_point() {
    assert_eq!(num("[...'a\u{1F600}b'].length"), 3.0, "iteration yields whole code points");
    assert_eq!(s("let out = ''; for (const c of 'xy') out = c + out; out"), "yx");
}

#[test]
fn methods_work_on_wrappers_and_literals() {
    assert_eq!(num("new String('abc').length"), 3.0);
    assert_eq!(s("new String('abc').slice(1)"), "bc");
    assert_eq!(s("String(123.5)"), "123.5");
    assert_eq!(s("String(null)"), "null");
    assert_eq!(s("String(Symbol('tag'))"), "Symbol(tag)");
}

#[test]
fn comparison_is_by_code_unit() {
    assert_eq!(eval("'a' < 'b'"), JsValue::Bool(true));
    assert_eq!(eval("'abc' < 'abd'"), JsValue::Bool(true));
    assert_eq!(eval("'Z' < 'a'"), JsValue::Bool(true), "uppercase sorts first");
    assert_eq!(eval("'10' < '9'"), JsValue::Bool(true), "string comparison, not numeric");
}
