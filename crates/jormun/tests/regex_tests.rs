//! Regular expressions: literals, exec/test, lastIndex, named groups,
//! `d` indices, and the string-side methods.

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
fn test_and_exec_basics() {
    assert_eq!(eval("/ab+c/.test('xabbbcx')"), JsValue::Bool(true));
    assert_eq!(eval("/ab+c/.test('acb')"), JsValue::Bool(false));
    assert_eq!(s("/l(o)l/.exec('trolol')[1]"), "o");
    assert_eq!(eval("/(a)(b)?/.exec('a')[2]"), JsValue::Undefined, "unmatched group");
    assert_eq!(eval("/nope/.exec('xyz')"), JsValue::Null);
    assert_eq!(eval("/b/.exec('abc').index"), JsValue::Number(1.0));
    assert_eq!(s("/b/.exec('abc').input"), "abc");
}

#[test]
fn global_flag_advances_last_index() {
    let src = r"
const re = /o/g;
const first = re.exec('foo').index;
const second = re.exec('foo').index;
const done = re.exec('foo');
first + ',' + second + ',' + (done === null) + ',' + re.lastIndex";
    assert_eq!(s(src), "1,2,true,0");
}

#[test]
fn sticky_flag_anchors_at_last_index() {
    // sticky only matches exactly at lastIndex
    assert_eq!(eval("const re = /b/y; re.lastIndex = 1; re.test('ab')"), JsValue::Bool(true));
    assert_eq!(eval("/b/y.test('ab')"), JsValue::Bool(false));
}

#[test]
fn named_groups_and_backreferences() {
    assert_eq!(s("/(?<year>\\d{4})-(?<month>\\d{2})/.exec('on 2024-07-01').groups.year"), "2024");
    assert_eq!(eval("/(ha)\\1/.test('hahaha')"), JsValue::Bool(true));
    assert_eq!(eval("/(?<q>['\"]).\\k<q>/.test(\"'x'\")"), JsValue::Bool(true));
}

#[test]
fn d_flag_produces_indices_with_named_entries() {
    let src = r"
const m = /c(?<mid>d)e/d.exec('abcdefg');
m.indices[0].join('-') + '|' + m.indices.groups.mid.join('-')";
    assert_eq!(s(src), "2-5|3-4");
}

#[test]
fn unicode_offsets_count_utf16_units() {
    assert_eq!(eval("/x/.exec('\u{1F600}x').index"), JsValue::Number(2.0), "astral chars take two units");
}

#[test]
fn string_match_and_search() {
    assert_eq!(s("'a1b2c3'.match(/\\d/g).join('')"), "123");
    assert_eq!(s("'a1b2'.match(/(\\w)(\\d)/)[2]"), "1");
    assert_eq!(eval("'abc'.match(/z/)"), JsValue::Null);
    assert_eq!(eval("'hello'.search(/l+/)"), JsValue::Number(2.0));
    assert_eq!(eval("'hello'.search(/z/)"), JsValue::Number(-1.0));
}

#[test]
fn match_all_requires_global() {
    assert_eq!(s("[...'a1b2'.matchAll(/\\w(\\d)/g)].map(m => m[1]).join(',')"), "1,2");
    let err = Interpreter::new().eval("'x'.matchAll(/x/)").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
}

#[test]
fn replace_with_tokens_and_functions() {
    assert_eq!(s("'john smith'.replace(/(\\w+) (\\w+)/, '$2 $1')"), "smith john");
    assert_eq!(s("'abc'.replace(/b/, '[$&]')"), "a[b]c");
    assert_eq!(s("'abc'.replace(/b/, \"<$`|$'>\")"), "a<a|c>c");
    assert_eq!(s("'cost: 5'.replace(/\\d/, '$$')"), "cost: $");
    assert_eq!(s("'2024-07'.replace(/(?<y>\\d+)-(?<m>\\d+)/, '$<m>/$<y>')"), "07/2024");
    assert_eq!(
        s("'a1b2'.replace(/\\d/g, (m, off) => `[${m}@${off}]`)"),
        "a[1@1]b[2@3]"
    );
}

#[test]
fn replace_all_demands_global_regex() {
    assert_eq!(s("'aaa'.replaceAll(/a/g, 'b')"), "bbb");
    let err = Interpreter::new().eval("'aaa'.replaceAll(/a/, 'b')").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
    // plain-string replaceAll needs no regex at all
    assert_eq!(s("'x.y.z'.replaceAll('.', '-')"), "x-y-z");
}

#[test]
fn split_with_regex_and_captures() {
    assert_eq!(s("'a1b22c'.split(/\\d+/).join('|')"), "a|b|c");
    assert_eq!(s("'a1b'.split(/(\\d)/).join('|')"), "a|1|b", "captures interleave");
    assert_eq!(eval("'a,b,c'.split(',', 2).length"), JsValue::Number(2.0));
}

#[test]
fn invalid_flags_are_syntax_errors() {
    assert!(Interpreter::new().eval("new RegExp('a', 'gg')").is_err());
    assert!(Interpreter::new().eval("new RegExp('a', 'q')").is_err());
}

#[test]
fn regexp_to_string_round_trip() {
    assert_eq!(s("/a(b)c/gi.toString()"), "/a(b)c/gi");
    assert_eq!(s("new RegExp('').toString()"), "/(?:)/");
    assert_eq!(s("String(/x/y)"), "/x/y");
}

#[test]
fn lookahead_and_lookbehind() {
    assert_eq!(s("'price: 42 units'.match(/\\d+(?= units)/)[0]"), "42");
    assert_eq!(s("'USD99'.match(/(?<=USD)\\d+/)[0]"), "99");
}
