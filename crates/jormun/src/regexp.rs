//! The regular-expression facade.
//!
//! JavaScript patterns are translated to the Rust regex dialect and compiled
//! lazily. Patterns that need neither lookaround nor backreferences compile
//! on the plain `regex` engine; the rest go to `fancy-regex`. Matching
//! returns byte ranges which callers convert to UTF-16 offsets (the `d` flag
//! indices and `index`/`lastIndex` are in code units).

use crate::error::{RunError, RunResult};

/// The `gimsuyd` flag set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RegexFlags {
    pub global: bool,
    pub ignore_case: bool,
    pub multiline: bool,
    pub dot_all: bool,
    pub unicode: bool,
    pub sticky: bool,
    pub has_indices: bool,
}

impl RegexFlags {
    /// Validates and parses a flag string; duplicates and unknown letters are
    /// syntax errors.
    pub fn parse(s: &str) -> Result<Self, String> {
        let mut flags = Self::default();
        for c in s.chars() {
            let slot = match c {
                'g' => &mut flags.global,
                'i' => &mut flags.ignore_case,
                'm' => &mut flags.multiline,
                's' => &mut flags.dot_all,
                'u' => &mut flags.unicode,
                'y' => &mut flags.sticky,
                'd' => &mut flags.has_indices,
                _ => return Err(format!("invalid regular expression flag '{c}'")),
            };
            if *slot {
                return Err(format!("duplicate regular expression flag '{c}'"));
            }
            *slot = true;
        }
        Ok(flags)
    }

    /// Canonical flag string, in the order the `flags` getter specifies.
    pub fn to_flag_string(self) -> String {
        let mut s = String::new();
        if self.has_indices {
            s.push('d');
        }
        if self.global {
            s.push('g');
        }
        if self.ignore_case {
            s.push('i');
        }
        if self.multiline {
            s.push('m');
        }
        if self.dot_all {
            s.push('s');
        }
        if self.unicode {
            s.push('u');
        }
        if self.sticky {
            s.push('y');
        }
        s
    }
}

/// A compiled matcher: the fast engine when the pattern allows it.
#[derive(Debug)]
enum Compiled {
    Fast(regex::Regex),
    Fancy(Box<fancy_regex::Regex>),
}

/// One match: byte offsets into the haystack, all capture groups, and the
/// named-group table.
#[derive(Debug, Clone)]
pub(crate) struct MatchResult {
    /// Byte range of the full match.
    pub start: usize,
    pub end: usize,
    /// Byte ranges of groups 1..N (`None` for unmatched groups).
    pub groups: Vec<Option<(usize, usize)>>,
    /// `(name, group_index)` pairs for named groups, in group order.
    pub names: Vec<(String, usize)>,
}

/// The regex payload on a `RegExp` object. `lastIndex` is an ordinary own
/// property of the object, not part of this data.
#[derive(Debug)]
pub(crate) struct RegexData {
    pub source: String,
    pub flags: RegexFlags,
    compiled: Option<Compiled>,
    names: Vec<(String, usize)>,
}

impl RegexData {
    pub fn new(source: String, flags: RegexFlags) -> Self {
        Self {
            source,
            flags,
            compiled: None,
            names: Vec::new(),
        }
    }

    /// Number of capture groups (excluding group 0); compiles on demand.
    pub fn group_count(&mut self) -> RunResult<usize> {
        self.ensure_compiled()?;
        Ok(match self.compiled.as_ref().expect("compiled above") {
            Compiled::Fast(re) => re.captures_len() - 1,
            Compiled::Fancy(re) => re.capture_names().count().saturating_sub(1),
        })
    }

    /// `(name, index)` pairs for named capture groups.
    pub fn group_names(&mut self) -> RunResult<&[(String, usize)]> {
        self.ensure_compiled()?;
        Ok(&self.names)
    }

    fn ensure_compiled(&mut self) -> RunResult<()> {
        if self.compiled.is_some() {
            return Ok(());
        }
        let translated = translate_pattern(&self.source, self.flags)
            .map_err(|msg| RunError::syntax_err(format!("invalid regular expression: {msg}")))?;
        let compiled = if needs_fancy(&self.source) {
            let re = fancy_regex::Regex::new(&translated)
                .map_err(|e| RunError::syntax_err(format!("invalid regular expression: {e}")))?;
            Compiled::Fancy(Box::new(re))
        } else {
            match regex::Regex::new(&translated) {
                Ok(re) => Compiled::Fast(re),
                // the plain engine rejects some valid translations
                // (e.g. nested quantifier corner cases); retry on fancy
                Err(_) => {
                    let re = fancy_regex::Regex::new(&translated)
                        .map_err(|e| RunError::syntax_err(format!("invalid regular expression: {e}")))?;
                    Compiled::Fancy(Box::new(re))
                }
            }
        };
        self.names = match &compiled {
            Compiled::Fast(re) => re
                .capture_names()
                .enumerate()
                .filter_map(|(i, n)| n.map(|n| (n.to_owned(), i)))
                .collect(),
            Compiled::Fancy(re) => re
                .capture_names()
                .enumerate()
                .filter_map(|(i, n)| n.map(|n| (n.to_owned(), i)))
                .collect(),
        };
        self.compiled = Some(compiled);
        Ok(())
    }

    /// Finds the first match at or after `start` (a byte offset).
    pub fn find_at(&mut self, haystack: &str, start: usize) -> RunResult<Option<MatchResult>> {
        self.ensure_compiled()?;
        if start > haystack.len() {
            return Ok(None);
        }
        let result = match self.compiled.as_ref().expect("compiled above") {
            Compiled::Fast(re) => re.captures_at(haystack, start).map(|caps| MatchResult {
                start: caps.get(0).expect("group 0").start(),
                end: caps.get(0).expect("group 0").end(),
                groups: (1..caps.len()).map(|i| caps.get(i).map(|m| (m.start(), m.end()))).collect(),
                names: self.names.clone(),
            }),
            Compiled::Fancy(re) => re
                .captures_from_pos(haystack, start)
                .map_err(|e| RunError::syntax_err(format!("regular expression error: {e}")))?
                .map(|caps| MatchResult {
                    start: caps.get(0).expect("group 0").start(),
                    end: caps.get(0).expect("group 0").end(),
                    groups: (1..caps.len()).map(|i| caps.get(i).map(|m| (m.start(), m.end()))).collect(),
                    names: self.names.clone(),
                }),
        };
        // sticky matches must begin exactly at start
        if self.flags.sticky
            && let Some(m) = &result
            && m.start != start
        {
            return Ok(None);
        }
        Ok(result)
    }
}

/// Whether the pattern uses constructs only `fancy-regex` supports:
/// lookaround and backreferences.
fn needs_fancy(pattern: &str) -> bool {
    let bytes = pattern.as_bytes();
    let mut i = 0;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if i + 1 < bytes.len() {
                    let c = bytes[i + 1];
                    if !in_class && (c.is_ascii_digit() && c != b'0' || c == b'k') {
                        return true;
                    }
                    i += 1;
                }
            }
            b'[' if !in_class => in_class = true,
            b']' => in_class = false,
            b'(' if !in_class => {
                if bytes.get(i + 1) == Some(&b'?') {
                    match bytes.get(i + 2) {
                        Some(b'=' | b'!') => return true,
                        Some(b'<') if matches!(bytes.get(i + 3), Some(b'=' | b'!')) => return true,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    false
}

/// Translates a JavaScript pattern into the Rust regex dialect.
///
/// Handles inline flags, `\uXXXX`/`\u{...}` escapes, `\cX` controls, empty
/// and negated-empty character classes, and identity escapes the Rust
/// engines reject.
fn translate_pattern(source: &str, flags: RegexFlags) -> Result<String, String> {
    let mut out = String::with_capacity(source.len() + 8);
    if flags.ignore_case {
        out.push_str("(?i)");
    }
    if flags.multiline {
        out.push_str("(?m)");
    }
    if flags.dot_all {
        out.push_str("(?s)");
    }
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    let mut in_class = false;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                let Some(&next) = chars.get(i + 1) else {
                    return Err("pattern ends with a trailing backslash".to_owned());
                };
                match next {
                    'u' => {
                        i += 2;
                        if chars.get(i) == Some(&'{') {
                            // \u{XXXX} -> \x{XXXX}
                            out.push_str("\\x");
                            while i < chars.len() {
                                out.push(chars[i]);
                                if chars[i] == '}' {
                                    break;
                                }
                                i += 1;
                            }
                        } else {
                            let mut hex = String::new();
                            for _ in 0..4 {
                                match chars.get(i) {
                                    Some(h) if h.is_ascii_hexdigit() => {
                                        hex.push(*h);
                                        i += 1;
                                    }
                                    _ => break,
                                }
                            }
                            if hex.len() == 4 {
                                out.push_str("\\x{");
                                out.push_str(&hex);
                                out.push('}');
                                i -= 1;
                            } else {
                                // identity escape of 'u' plus the consumed text
                                out.push('u');
                                out.push_str(&hex);
                                i -= 1;
                            }
                        }
                    }
                    'c' => {
                        // \cX control escape
                        if let Some(letter) = chars.get(i + 2).copied().filter(char::is_ascii_alphabetic) {
                            let code = (letter.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
                            out.push_str(&format!("\\x{{{code:x}}}"));
                            i += 2;
                        } else {
                            out.push_str("\\\\c");
                            i += 1;
                        }
                    }
                    '0' if !chars.get(i + 2).is_some_and(|c| c.is_ascii_digit()) => {
                        out.push_str("\\x{0}");
                        i += 1;
                    }
                    '/' => {
                        out.push('/');
                        i += 1;
                    }
                    _ => {
                        out.push('\\');
                        out.push(next);
                        i += 1;
                    }
                }
                i += 1;
            }
            '[' if !in_class => {
                if chars.get(i + 1) == Some(&']') {
                    // empty class never matches
                    out.push_str("[^\\s\\S]");
                    i += 2;
                } else if chars.get(i + 1) == Some(&'^') && chars.get(i + 2) == Some(&']') {
                    // negated empty class matches everything including \n
                    out.push_str("[\\s\\S]");
                    i += 3;
                } else {
                    in_class = true;
                    out.push('[');
                    i += 1;
                }
            }
            ']' => {
                in_class = false;
                out.push(']');
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parsing() {
        let f = RegexFlags::parse("gid").unwrap();
        assert!(f.global && f.ignore_case && f.has_indices);
        assert!(!f.sticky);
        assert_eq!(f.to_flag_string(), "dgi");
        assert!(RegexFlags::parse("gg").is_err());
        assert!(RegexFlags::parse("x").is_err());
    }

    #[test]
    fn simple_match_on_fast_engine() {
        let mut re = RegexData::new("a(b+)c".to_owned(), RegexFlags::default());
        let m = re.find_at("zzabbbczz", 0).unwrap().unwrap();
        assert_eq!((m.start, m.end), (2, 7));
        assert_eq!(m.groups, vec![Some((3, 6))]);
    }

    #[test]
    fn named_groups() {
        let mut re = RegexData::new("a(?<mid>b)c".to_owned(), RegexFlags::default());
        let m = re.find_at("zabcz", 0).unwrap().unwrap();
        assert_eq!(m.names, vec![("mid".to_owned(), 1)]);
        assert_eq!(m.groups[0], Some((2, 3)));
    }

    #[test]
    fn backreference_needs_fancy() {
        assert!(needs_fancy(r"(a)\1"));
        assert!(needs_fancy(r"(?=x)"));
        assert!(needs_fancy(r"(?<!x)"));
        assert!(!needs_fancy(r"a[(?=]b"));
        assert!(!needs_fancy(r"\0"));
        let mut re = RegexData::new(r"(ab)\1".to_owned(), RegexFlags::default());
        let m = re.find_at("xababx", 0).unwrap().unwrap();
        assert_eq!((m.start, m.end), (1, 5));
    }

    #[test]
    fn sticky_anchors_at_start() {
        let flags = RegexFlags::parse("y").unwrap();
        let mut re = RegexData::new("b".to_owned(), flags);
        assert!(re.find_at("ab", 0).unwrap().is_none());
        assert!(re.find_at("ab", 1).unwrap().is_some());
    }

    #[test]
    fn unicode_escape_translation() {
        let mut re = RegexData::new(r"A+".to_owned(), RegexFlags::default());
        let m = re.find_at("zAAz", 0).unwrap().unwrap();
        assert_eq!((m.start, m.end), (1, 3));
    }

    #[test]
    fn invalid_pattern_is_error() {
        let mut re = RegexData::new("(".to_owned(), RegexFlags::default());
        assert!(re.find_at("x", 0).is_err());
    }
}
