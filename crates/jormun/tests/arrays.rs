//! Array behavior: mutation methods, the ES2023 non-mutating family,
//! callbacks, sorting, holes, and iteration under mutation.

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
fn push_pop_shift_unshift() {
    assert_eq!(s("const a = [2, 3]; a.push(4); a.unshift(1); a.join(',')"), "1,2,3,4");
    assert_eq!(num("const a = [1, 2, 3]; a.pop() + a.shift() * 10"), 13.0);
    assert_eq!(num("const a = []; a.push('x')"), 1.0, "push returns the new length");
}

#[test]
fn slice_splice_concat() {
    assert_eq!(s("[0, 1, 2, 3, 4].slice(1, -1).join('')"), "123");
    assert_eq!(s("const a = [1, 2, 3, 4]; const cut = a.splice(1, 2, 'x'); a.join(',') + '|' + cut.join(',')"), "1,x,4|2,3");
    assert_eq!(s("[1].concat([2, 3], 4).join('')"), "1234");
}

#[test]
fn index_of_and_membership() {
    assert_eq!(num("['a', 'b', 'a'].indexOf('a')"), 0.0);
    assert_eq!(num("['a', 'b', 'a'].lastIndexOf('a')"), 2.0);
    assert_eq!(num("[1, 2].indexOf(3)"), -1.0);
    assert_eq!(eval("[NaN].indexOf(NaN)"), JsValue::Number(-1.0), "indexOf uses ===");
    assert_eq!(eval("[NaN].includes(NaN)"), JsValue::Bool(true), "includes uses SameValueZero");
}

#[test]
fn callback_iteration_family() {
    assert_eq!(s("[1, 2, 3].map(x => x * 2).join(',')"), "2,4,6");
    assert_eq!(s("[1, 2, 3, 4].filter(x => x % 2 === 0).join(',')"), "2,4");
    assert_eq!(num("[1, 2, 3].reduce((a, b) => a + b)"), 6.0);
    assert_eq!(num("[1, 2, 3].reduce((a, b) => a + b, 10)"), 16.0);
    assert_eq!(s("['a', 'b'].reduceRight((a, b) => a + b)"), "ba");
    assert_eq!(eval("[1, 2, 3].some(x => x > 2)"), JsValue::Bool(true));
    assert_eq!(eval("[1, 2, 3].every(x => x > 2)"), JsValue::Bool(false));
    assert_eq!(num("[5, 12, 8].find(x => x > 6)"), 12.0);
    assert_eq!(num("[5, 12, 8].findIndex(x => x > 6)"), 1.0);
    assert_eq!(num("[5, 12, 8].findLast(x => x > 6)"), 8.0);
    assert_eq!(num("[5, 12, 8].findLastIndex(x => x > 6)"), 2.0);
    // map callback receives (value, index, array)
    assert_eq!(s("['a', 'b'].map((v, i, arr) => v + i + arr.length).join(',')"), "a02,b12");
}

#[test]
fn reduce_of_empty_without_initial_throws() {
    let err = Interpreter::new().eval("[].reduce((a, b) => a + b)").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::TypeError));
}

#[test]
fn sort_default_and_comparator() {
    assert_eq!(s("[3, 1, 2].sort().join(',')"), "1,2,3");
    assert_eq!(s("[10, 9].sort().join(',')"), "10,9", "default sort is lexicographic");
    assert_eq!(s("[10, 9, 30].sort((a, b) => a - b).join(',')"), "9,10,30");
    assert_eq!(s("[3, undefined, 1].sort().join(',')"), "1,3,", "undefined sorts last");
    // default order compares UTF-16 code units: the lead surrogate of an
    // astral character (0xD83D) sorts before U+FF21
    assert_eq!(
        s("['\u{FF21}', '\u{1F600}'].sort().join(',')"),
        "\u{1F600},\u{FF21}"
    );
}

#[test]
fn flat_and_flat_map() {
    assert_eq!(s("[1, [2, [3, [4]]]].flat().join(',')"), "1,2,3,4");
    assert_eq!(s("[1, [2, [3]]].flat(Infinity).join(',')"), "1,2,3");
    assert_eq!(s("[1, 2].flatMap(x => [x, x * 10]).join(',')"), "1,10,2,20");
}

#[test]
fn fill_reverse_join() {
    assert_eq!(s("[1, 2, 3, 4].fill(0, 1, 3).join('')"), "1004");
    assert_eq!(s("[1, 2, 3].reverse().join('')"), "321");
    assert_eq!(s("[1, null, undefined, 2].join('-')"), "1---2");
}

#[test]
fn es2023_non_mutating_family() {
    assert_eq!(s("const a = [3, 1, 2]; a.toSorted().join('') + '|' + a.join('')"), "123|312");
    assert_eq!(s("const a = [1, 2, 3]; a.with(1, 'x').join('') + '|' + a.join('')"), "1x3|123");
    assert_eq!(s("const a = [1, 2, 3, 4]; a.toSpliced(1, 2, 'y').join('') + '|' + a.length"), "1y4|4");
    let err = Interpreter::new().eval("[1, 2].with(5, 'x')").unwrap_err();
    assert_eq!(err.kind, Some(jormun::ExcKind::RangeError));
}

#[test]
fn at_supports_negative_indices() {
    assert_eq!(num("[1, 2, 3].at(-1)"), 3.0);
    assert_eq!(num("[1, 2, 3].at(0)"), 1.0);
    assert_eq!(eval("[1, 2, 3].at(5)"), JsValue::Undefined);
}

#[test]
fn array_from_iterables_and_array_likes() {
    assert_eq!(s("Array.from('abc').join(',')"), "a,b,c");
    assert_eq!(s("Array.from([1, 2], x => x * 3).join(',')"), "3,6");
    assert_eq!(s("Array.from({length: 3, 0: 'a', 2: 'c'}).join(',')"), "a,,c");
    // non-integer lengths truncate through ToLength
    assert_eq!(num("Array.from({length: 2.7}).length"), 2.0);
    assert_eq!(s("Array.of(7, 'x').join(',')"), "7,x");
    assert_eq!(eval("Array.isArray([]) && !Array.isArray({length: 0})"), JsValue::Bool(true));
}

#[test]
fn length_is_writable_and_truncates() {
    assert_eq!(s("const a = [1, 2, 3]; a.length = 1; a.join(',') + '|' + a.length"), "1|1");
    assert_eq!(num("const a = [1]; a.length = 4; a.length"), 4.0);
    assert_eq!(num("const a = []; a[4] = 'x'; a.length"), 5.0, "index writes extend length");
}

#[test]
fn holes_read_as_undefined() {
    assert_eq!(eval("[, 2][0]"), JsValue::Undefined);
    assert_eq!(num("[, , 3].length"), 3.0);
}

#[test]
fn iteration_observes_live_length() {
    let src = r"
const a = [1, 2];
const out = [];
for (const x of a) { out.push(x); if (a.length < 4) a.push(x * 10); }
out.join(',')";
    assert_eq!(s(src), "1,2,10,20");
}

#[test]
fn keys_values_entries_iterators() {
    assert_eq!(s("[...['a', 'b'].keys()].join(',')"), "0,1");
    assert_eq!(s("[...['a', 'b'].values()].join(',')"), "a,b");
    assert_eq!(s("[...['a', 'b'].entries()].map(e => e[0] + ':' + e[1]).join(',')"), "0:a,1:b");
}

#[test]
fn destructuring_interacts_with_arrays() {
    assert_eq!(num("const [a, ...rest] = [1, 2, 3]; a + rest.length"), 3.0);
    assert_eq!(s("const {0: first, length} = ['z', 'y']; first + length"), "z2");
}
