//! The lexer: source text to a token stream.
//!
//! Tokens carry their start position and a `newline_before` flag consumed by
//! the parser's automatic-semicolon-insertion rule. The lexer itself resolves
//! the two context-sensitive parts of the ECMAScript grammar:
//!
//! * regex literal vs. division — decided from the previous significant
//!   token (a `/` after something that permits an expression starts a regex);
//! * template literal re-entry — after `${` the lexer returns to normal mode
//!   and a depth stack pairs the closing `}` back to template mode, so nested
//!   templates lex correctly.
//!
//! A `#!` sequence at byte 0 is treated as a line comment (hashbang).

use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::Num;

use crate::{
    error::ParseError,
    intern::{Interns, StringId},
};

/// Reserved words. Contextual keywords (`get`, `set`, `of`, `async`, `as`,
/// `from`, `static`, ...) lex as identifiers; the parser inspects their
/// interned content where the grammar gives them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Kw {
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    False,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    Instanceof,
    Let,
    New,
    Null,
    Return,
    Super,
    Switch,
    This,
    Throw,
    True,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
    Yield,
    Await,
}

/// Punctuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum P {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semi,
    Comma,
    Dot,
    DotDotDot,
    Arrow,
    Colon,
    Question,
    QuestionDot,
    QuestionQuestion,
    QuestionQuestionEq,
    Assign,
    Eq,
    StrictEq,
    NotEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    StarStarEq,
    SlashEq,
    PercentEq,
    Shl,
    Shr,
    UShr,
    ShlEq,
    ShrEq,
    UShrEq,
    Amp,
    Pipe,
    Caret,
    AmpEq,
    PipeEq,
    CaretEq,
    AmpAmp,
    PipePipe,
    AmpAmpEq,
    PipePipeEq,
    Bang,
    Tilde,
}

/// Pieces of a template literal. `cooked` is `None` when the segment contains
/// an invalid escape (legal in tagged templates, a syntax error otherwise).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TemplatePart {
    pub cooked: Option<StringId>,
    pub raw: StringId,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(StringId),
    /// `#name` inside class bodies.
    PrivateIdent(StringId),
    Kw(Kw),
    Num(f64),
    BigInt(Box<BigInt>),
    Str(StringId),
    /// `` `abc` `` — a template with no substitutions.
    Template(TemplatePart),
    /// `` `abc${ ``
    TemplateHead(TemplatePart),
    /// `}abc${`
    TemplateMiddle(TemplatePart),
    /// `` }abc` ``
    TemplateTail(TemplatePart),
    /// Raw regex literal; flags are validated by the parser.
    Regex { source: String, flags: String },
    Punct(P),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub col: u32,
    /// Byte offset of the token's first character in the source.
    pub byte: u32,
    /// Byte offset just past the token's last character.
    pub end_byte: u32,
    /// A line terminator (or a comment containing one) appeared before this
    /// token. Drives automatic semicolon insertion.
    pub newline_before: bool,
}

type LexResult<T> = Result<T, ParseError>;

/// Lexes `source` completely into a token vector ending with `Eof`.
pub(crate) fn lex(source: &str, interns: &mut Interns) -> LexResult<Vec<Token>> {
    Lexer::new(source, interns).run()
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    byte_pos: usize,
    line: u32,
    col: u32,
    newline_before: bool,
    /// For each open template: the count of unmatched `{` since its `${`.
    template_stack: Vec<u32>,
    /// Kind of the previous significant token (regex/division decision).
    prev: Option<TokenKind>,
    interns: &'a mut Interns,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &str, interns: &'a mut Interns) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            byte_pos: 0,
            line: 1,
            col: 1,
            newline_before: false,
            template_stack: Vec::new(),
            prev: None,
            interns,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> LexResult<Vec<Token>> {
        // Hashbang: only at byte 0.
        if self.peek() == Some('#') && self.peek_at(1) == Some('!') {
            while let Some(c) = self.peek() {
                if is_line_terminator(c) {
                    break;
                }
                self.bump();
            }
        }
        loop {
            self.skip_trivia()?;
            let (line, col, byte) = (self.line, self.col, self.byte_pos as u32);
            let Some(c) = self.peek() else {
                self.push_at(TokenKind::Eof, line, col, byte);
                break;
            };
            let kind = self.token(c)?;
            self.push_at(kind, line, col, byte);
        }
        Ok(self.tokens)
    }

    // === character primitives ===

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        self.byte_pos += c.len_utf8();
        if is_line_terminator(c) {
            // \r\n counts as one terminator
            if c == '\r' && self.peek() == Some('\n') {
                self.pos += 1;
                self.byte_pos += 1;
            }
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.line, self.col)
    }

    fn err_at(&self, message: impl Into<String>, line: u32, col: u32) -> ParseError {
        ParseError::new(message, line, col)
    }

    fn push_at(&mut self, kind: TokenKind, line: u32, col: u32, byte: u32) {
        self.prev = Some(kind.clone());
        self.tokens.push(Token {
            kind,
            line,
            col,
            byte,
            end_byte: self.byte_pos as u32,
            newline_before: self.newline_before,
        });
        self.newline_before = false;
    }

    fn skip_trivia(&mut self) -> LexResult<()> {
        loop {
            match self.peek() {
                Some(c) if is_line_terminator(c) => {
                    self.newline_before = true;
                    self.bump();
                }
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if is_line_terminator(c) {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let (line, col) = (self.line, self.col);
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => return Err(self.err_at("unterminated block comment", line, col)),
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(c) => {
                                if is_line_terminator(c) {
                                    self.newline_before = true;
                                }
                                self.bump();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    // === token dispatch ===

    fn token(&mut self, c: char) -> LexResult<TokenKind> {
        match c {
            '`' => {
                self.bump();
                self.template_segment(true)
            }
            '\'' | '"' => self.string_literal(c),
            '0'..='9' => self.number(),
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number(),
            '#' => {
                self.bump();
                let start = self.pos;
                if !self.peek().is_some_and(is_ident_start) {
                    return Err(self.err("expected identifier after '#'"));
                }
                while self.peek().is_some_and(is_ident_continue) {
                    self.bump();
                }
                let name: String = self.chars[start..self.pos].iter().collect();
                Ok(TokenKind::PrivateIdent(self.interns.intern(&name)))
            }
            '/' if !self.prev_permits_division() => self.regex_literal(),
            c if is_ident_start(c) => Ok(self.ident_or_keyword()),
            '}' if self.close_brace_resumes_template() => {
                // this `}` pairs with the `${` of the innermost template
                self.template_stack.pop();
                self.bump();
                self.template_segment(false)
            }
            _ => self.punct(),
        }
    }

    /// Whether the previous significant token permits division (as opposed to
    /// starting a regex literal).
    fn prev_permits_division(&self) -> bool {
        match &self.prev {
            Some(TokenKind::Ident(_) | TokenKind::PrivateIdent(_) | TokenKind::Num(_) | TokenKind::BigInt(_))
            | Some(TokenKind::Str(_) | TokenKind::Template(_) | TokenKind::TemplateTail(_))
            | Some(TokenKind::Regex { .. }) => true,
            Some(TokenKind::Kw(k)) => matches!(k, Kw::This | Kw::Super | Kw::True | Kw::False | Kw::Null),
            Some(TokenKind::Punct(p)) => {
                matches!(p, P::RParen | P::RBracket | P::PlusPlus | P::MinusMinus)
            }
            _ => false,
        }
    }

    fn close_brace_resumes_template(&self) -> bool {
        self.template_stack.last() == Some(&0)
    }

    fn ident_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        self.bump();
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match Kw::from_str(&word) {
            Ok(kw) => TokenKind::Kw(kw),
            Err(_) => TokenKind::Ident(self.interns.intern(&word)),
        }
    }

    // === literals ===

    fn string_literal(&mut self, quote: char) -> LexResult<TokenKind> {
        let (line, col) = (self.line, self.col);
        self.bump();
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.err_at("unterminated string literal", line, col)),
                Some(c) if is_line_terminator(c) => {
                    return Err(self.err_at("unterminated string literal", line, col));
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    if let Some(c) = self.escape_sequence(true)? {
                        out.push(c);
                    }
                }
                Some(c) => {
                    out.push(c);
                    self.bump();
                }
            }
        }
        Ok(TokenKind::Str(self.interns.intern(&out)))
    }

    /// Consumes one escape sequence after the backslash. Returns `None` for
    /// line continuations. With `strict_escapes`, invalid escapes error;
    /// template lexing passes `false` and reports invalidity via a `None`
    /// cooked string instead.
    fn escape_sequence(&mut self, strict_escapes: bool) -> LexResult<Option<char>> {
        let Some(c) = self.bump() else {
            return Err(self.err("unterminated escape sequence"));
        };
        let ch = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' if !self.peek().is_some_and(|c| c.is_ascii_digit()) => '\0',
            '0'..='9' => {
                if strict_escapes {
                    return Err(self.err("octal escape sequences are not allowed"));
                }
                return Ok(Some('\u{FFFD}'));
            }
            'x' => {
                let hi = self.hex_digit(strict_escapes)?;
                let lo = self.hex_digit(strict_escapes)?;
                match (hi, lo) {
                    (Some(hi), Some(lo)) => char::from(((hi << 4) | lo) as u8),
                    _ => return Ok(Some('\u{FFFD}')),
                }
            }
            'u' => return self.unicode_escape(strict_escapes),
            c if is_line_terminator(c) => return Ok(None),
            c => c,
        };
        Ok(Some(ch))
    }

    fn hex_digit(&mut self, strict: bool) -> LexResult<Option<u32>> {
        match self.peek().and_then(|c| c.to_digit(16)) {
            Some(d) => {
                self.bump();
                Ok(Some(d))
            }
            None if strict => Err(self.err("invalid hexadecimal escape sequence")),
            None => Ok(None),
        }
    }

    fn unicode_escape(&mut self, strict: bool) -> LexResult<Option<char>> {
        let invalid = |lexer: &Self| lexer.err("invalid Unicode escape sequence");
        if self.eat('{') {
            let mut v: u32 = 0;
            let mut any = false;
            while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
                self.bump();
                any = true;
                v = v.saturating_mul(16).saturating_add(d);
            }
            if !any || !self.eat('}') || v > 0x10_FFFF {
                return if strict { Err(invalid(self)) } else { Ok(Some('\u{FFFD}')) };
            }
            return Ok(Some(char::from_u32(v).unwrap_or('\u{FFFD}')));
        }
        let mut v: u32 = 0;
        for _ in 0..4 {
            match self.hex_digit(strict)? {
                Some(d) => v = (v << 4) | d,
                None => return Ok(Some('\u{FFFD}')),
            }
        }
        // A high surrogate may pair with a following \uXXXX low surrogate.
        if (0xD800..0xDC00).contains(&v) && self.peek() == Some('\\') && self.peek_at(1) == Some('u') {
            let save = (self.pos, self.line, self.col);
            self.bump();
            self.bump();
            let mut lo: u32 = 0;
            let mut ok = true;
            for _ in 0..4 {
                match self.peek().and_then(|c| c.to_digit(16)) {
                    Some(d) => {
                        self.bump();
                        lo = (lo << 4) | d;
                    }
                    None => {
                        ok = false;
                        break;
                    }
                }
            }
            if ok && (0xDC00..0xE000).contains(&lo) {
                let combined = 0x10000 + ((v - 0xD800) << 10) + (lo - 0xDC00);
                return Ok(Some(char::from_u32(combined).unwrap_or('\u{FFFD}')));
            }
            (self.pos, self.line, self.col) = save;
        }
        // Lone surrogates cannot be represented in a Rust string; substitute.
        Ok(Some(char::from_u32(v).unwrap_or('\u{FFFD}')))
    }

    /// Lexes one template segment starting after `` ` `` (when `head`) or
    /// after the `}` that closed a substitution.
    fn template_segment(&mut self, head: bool) -> LexResult<TokenKind> {
        let (line, col) = (self.line, self.col);
        let mut raw = String::new();
        let mut cooked = Some(String::new());
        loop {
            match self.peek() {
                None => return Err(self.err_at("unterminated template literal", line, col)),
                Some('`') => {
                    self.bump();
                    let part = self.template_part(&raw, cooked);
                    return Ok(if head {
                        TokenKind::Template(part)
                    } else {
                        TokenKind::TemplateTail(part)
                    });
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.bump();
                    self.bump();
                    self.template_stack.push(0);
                    let part = self.template_part(&raw, cooked);
                    return Ok(if head {
                        TokenKind::TemplateHead(part)
                    } else {
                        TokenKind::TemplateMiddle(part)
                    });
                }
                Some('\\') => {
                    raw.push('\\');
                    self.bump();
                    let before = self.pos;
                    match self.escape_sequence(false) {
                        Ok(Some(c)) => {
                            if c == '\u{FFFD}' && !self.chars[before..self.pos].contains(&'\u{FFFD}') {
                                // escape was invalid: raw is kept, cooked is poisoned
                                cooked = None;
                            } else if let Some(s) = &mut cooked {
                                s.push(c);
                            }
                        }
                        Ok(None) => {}
                        Err(_) => cooked = None,
                    }
                    raw.extend(&self.chars[before..self.pos]);
                }
                Some(c) => {
                    // raw strings normalize \r\n to \n
                    self.bump();
                    let c = if c == '\r' { '\n' } else { c };
                    raw.push(c);
                    if let Some(s) = &mut cooked {
                        s.push(c);
                    }
                }
            }
        }
    }

    fn template_part(&mut self, raw: &str, cooked: Option<String>) -> TemplatePart {
        TemplatePart {
            cooked: cooked.map(|c| self.interns.intern(&c)),
            raw: self.interns.intern(raw),
        }
    }

    fn regex_literal(&mut self) -> LexResult<TokenKind> {
        let (line, col) = (self.line, self.col);
        self.bump(); // '/'
        let mut source = String::new();
        let mut in_class = false;
        loop {
            match self.peek() {
                None => return Err(self.err_at("unterminated regular expression literal", line, col)),
                Some(c) if is_line_terminator(c) => {
                    return Err(self.err_at("unterminated regular expression literal", line, col));
                }
                Some('\\') => {
                    source.push('\\');
                    self.bump();
                    match self.peek() {
                        Some(c) if !is_line_terminator(c) => {
                            source.push(c);
                            self.bump();
                        }
                        _ => return Err(self.err_at("unterminated regular expression literal", line, col)),
                    }
                }
                Some('[') => {
                    in_class = true;
                    source.push('[');
                    self.bump();
                }
                Some(']') => {
                    in_class = false;
                    source.push(']');
                    self.bump();
                }
                Some('/') if !in_class => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    source.push(c);
                    self.bump();
                }
            }
        }
        let mut flags = String::new();
        while self.peek().is_some_and(is_ident_continue) {
            flags.push(self.bump().expect("peeked char"));
        }
        Ok(TokenKind::Regex { source, flags })
    }

    fn number(&mut self) -> LexResult<TokenKind> {
        let (line, col) = (self.line, self.col);
        // radix prefixes
        if self.peek() == Some('0') {
            match self.peek_at(1) {
                Some('x' | 'X') => return self.radix_number(16, line, col),
                Some('o' | 'O') => return self.radix_number(8, line, col),
                Some('b' | 'B') => return self.radix_number(2, line, col),
                Some(c) if c.is_ascii_digit() => {
                    return Err(self.err_at("legacy octal literals are not supported; use 0o", line, col));
                }
                _ => {}
            }
        }
        let mut digits = String::new();
        self.decimal_digits(&mut digits, line, col)?;
        let mut is_int = true;
        if self.peek() == Some('.') {
            is_int = false;
            digits.push('.');
            self.bump();
            if self.peek() == Some('_') {
                return Err(self.err_at("numeric separator not allowed here", line, col));
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.decimal_digits(&mut digits, line, col)?;
            }
        }
        if let Some('e' | 'E') = self.peek() {
            is_int = false;
            digits.push('e');
            self.bump();
            if let Some(c @ ('+' | '-')) = self.peek() {
                digits.push(c);
                self.bump();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.err_at("missing exponent digits", line, col));
            }
            self.decimal_digits(&mut digits, line, col)?;
        }
        if self.eat('n') {
            if !is_int {
                return Err(self.err_at("invalid BigInt literal", line, col));
            }
            let big = BigInt::from_str(&digits).map_err(|_| self.err_at("invalid BigInt literal", line, col))?;
            self.check_number_tail(line, col)?;
            return Ok(TokenKind::BigInt(Box::new(big)));
        }
        self.check_number_tail(line, col)?;
        let n: f64 = digits
            .parse()
            .map_err(|_| self.err_at("invalid numeric literal", line, col))?;
        Ok(TokenKind::Num(n))
    }

    /// Consumes decimal digits with `_` separators into `out` (separators
    /// dropped). Errors on leading/trailing/doubled separators.
    fn decimal_digits(&mut self, out: &mut String, line: u32, col: u32) -> LexResult<()> {
        if self.peek() == Some('_') {
            return Err(self.err_at("numeric separator not allowed here", line, col));
        }
        let mut prev_sep = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                out.push(c);
                self.bump();
                prev_sep = false;
            } else if c == '_' {
                if prev_sep {
                    return Err(self.err_at("numeric separator not allowed here", line, col));
                }
                prev_sep = true;
                self.bump();
            } else {
                break;
            }
        }
        if prev_sep {
            return Err(self.err_at("numeric separator not allowed here", line, col));
        }
        Ok(())
    }

    fn radix_number(&mut self, radix: u32, line: u32, col: u32) -> LexResult<TokenKind> {
        self.bump(); // 0
        self.bump(); // x/o/b
        let mut digits = String::new();
        let mut prev_sep = true; // separator directly after the prefix is an error
        while let Some(c) = self.peek() {
            if c.to_digit(radix).is_some() {
                digits.push(c);
                self.bump();
                prev_sep = false;
            } else if c == '_' {
                if prev_sep {
                    return Err(self.err_at("numeric separator not allowed here", line, col));
                }
                prev_sep = true;
                self.bump();
            } else {
                break;
            }
        }
        if digits.is_empty() || prev_sep {
            return Err(self.err_at("invalid numeric literal", line, col));
        }
        if self.eat('n') {
            let big = BigInt::from_str_radix(&digits, radix)
                .map_err(|_| self.err_at("invalid BigInt literal", line, col))?;
            self.check_number_tail(line, col)?;
            return Ok(TokenKind::BigInt(Box::new(big)));
        }
        self.check_number_tail(line, col)?;
        let mut value = 0f64;
        for c in digits.chars() {
            value = value * f64::from(radix) + f64::from(c.to_digit(radix).expect("digit checked"));
        }
        Ok(TokenKind::Num(value))
    }

    /// An identifier character directly after a numeric literal is an error
    /// (`3in`, `0x1z`).
    fn check_number_tail(&self, line: u32, col: u32) -> LexResult<()> {
        if self.peek().is_some_and(is_ident_start) {
            return Err(self.err_at("identifier starts immediately after numeric literal", line, col));
        }
        Ok(())
    }

    // === punctuators ===

    fn punct(&mut self) -> LexResult<TokenKind> {
        let c = self.bump().expect("caller peeked");
        let p = match c {
            '(' => P::LParen,
            ')' => P::RParen,
            '[' => P::LBracket,
            ']' => P::RBracket,
            '{' => {
                if let Some(depth) = self.template_stack.last_mut() {
                    *depth += 1;
                }
                P::LBrace
            }
            '}' => {
                if let Some(depth) = self.template_stack.last_mut() {
                    // depth 0 is handled by template re-entry before we get here
                    *depth = depth.saturating_sub(1);
                }
                P::RBrace
            }
            ';' => P::Semi,
            ',' => P::Comma,
            ':' => P::Colon,
            '~' => P::Tilde,
            '.' => {
                if self.peek() == Some('.') && self.peek_at(1) == Some('.') {
                    self.bump();
                    self.bump();
                    P::DotDotDot
                } else {
                    P::Dot
                }
            }
            '?' => {
                if self.eat('.') {
                    P::QuestionDot
                } else if self.eat('?') {
                    if self.eat('=') { P::QuestionQuestionEq } else { P::QuestionQuestion }
                } else {
                    P::Question
                }
            }
            '=' => {
                if self.eat('=') {
                    if self.eat('=') { P::StrictEq } else { P::Eq }
                } else if self.eat('>') {
                    P::Arrow
                } else {
                    P::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') { P::StrictNotEq } else { P::NotEq }
                } else {
                    P::Bang
                }
            }
            '<' => {
                if self.eat('<') {
                    if self.eat('=') { P::ShlEq } else { P::Shl }
                } else if self.eat('=') {
                    P::LtEq
                } else {
                    P::Lt
                }
            }
            '>' => {
                if self.eat('>') {
                    if self.eat('>') {
                        if self.eat('=') { P::UShrEq } else { P::UShr }
                    } else if self.eat('=') {
                        P::ShrEq
                    } else {
                        P::Shr
                    }
                } else if self.eat('=') {
                    P::GtEq
                } else {
                    P::Gt
                }
            }
            '+' => {
                if self.eat('+') {
                    P::PlusPlus
                } else if self.eat('=') {
                    P::PlusEq
                } else {
                    P::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    P::MinusMinus
                } else if self.eat('=') {
                    P::MinusEq
                } else {
                    P::Minus
                }
            }
            '*' => {
                if self.eat('*') {
                    if self.eat('=') { P::StarStarEq } else { P::StarStar }
                } else if self.eat('=') {
                    P::StarEq
                } else {
                    P::Star
                }
            }
            '/' => {
                if self.eat('=') { P::SlashEq } else { P::Slash }
            }
            '%' => {
                if self.eat('=') { P::PercentEq } else { P::Percent }
            }
            '&' => {
                if self.eat('&') {
                    if self.eat('=') { P::AmpAmpEq } else { P::AmpAmp }
                } else if self.eat('=') {
                    P::AmpEq
                } else {
                    P::Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    if self.eat('=') { P::PipePipeEq } else { P::PipePipe }
                } else if self.eat('=') {
                    P::PipeEq
                } else {
                    P::Pipe
                }
            }
            '^' => {
                if self.eat('=') { P::CaretEq } else { P::Caret }
            }
            _ => return Err(self.err(format!("unexpected character '{c}'"))),
        };
        Ok(TokenKind::Punct(p))
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Unicode ID_Start approximated by alphabetic; exact table deferred to the
/// point where a conformance suite needs it.
fn is_ident_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphanumeric() || c == '\u{200C}' || c == '\u{200D}'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut interns = Interns::new();
        lex(src, &mut interns).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn lex_err(src: &str) -> ParseError {
        let mut interns = Interns::new();
        lex(src, &mut interns).unwrap_err()
    }

    #[test]
    fn keywords_and_idents() {
        let toks = kinds("let x = functionx");
        assert_eq!(toks[0], TokenKind::Kw(Kw::Let));
        assert!(matches!(toks[1], TokenKind::Ident(_)));
        assert_eq!(toks[2], TokenKind::Punct(P::Assign));
        assert!(matches!(toks[3], TokenKind::Ident(_)), "functionx is not a keyword");
    }

    #[test]
    fn numeric_forms() {
        assert_eq!(kinds("0x10")[0], TokenKind::Num(16.0));
        assert_eq!(kinds("0o17")[0], TokenKind::Num(15.0));
        assert_eq!(kinds("0b101")[0], TokenKind::Num(5.0));
        assert_eq!(kinds("1_000_000")[0], TokenKind::Num(1_000_000.0));
        assert_eq!(kinds("1.5e3")[0], TokenKind::Num(1500.0));
        assert_eq!(kinds(".5")[0], TokenKind::Num(0.5));
        assert_eq!(kinds("10n")[0], TokenKind::BigInt(Box::new(BigInt::from(10))));
        assert_eq!(kinds("0xffn")[0], TokenKind::BigInt(Box::new(BigInt::from(255))));
    }

    #[test]
    fn numeric_separator_errors() {
        assert!(lex_err("1__2").message.contains("separator"));
        assert!(lex_err("1_").message.contains("separator"));
        assert!(lex_err("1._5").message.contains("separator"));
        assert!(lex_err("0x_1").message.contains("separator"));
    }

    #[test]
    fn bigint_rejects_fraction() {
        assert!(lex_err("1.5n").message.contains("BigInt"));
    }

    #[test]
    fn string_escapes() {
        let mut interns = Interns::new();
        let toks = lex(r#"'a\x41B\u{1F600}\n'"#, &mut interns).unwrap();
        let TokenKind::Str(id) = toks[0].kind else { panic!("not a string") };
        assert_eq!(interns.str(id), "aAB\u{1F600}\n");
    }

    #[test]
    fn surrogate_pair_escape_combines() {
        let mut interns = Interns::new();
        let toks = lex(r#""😀""#, &mut interns).unwrap();
        let TokenKind::Str(id) = toks[0].kind else { panic!("not a string") };
        assert_eq!(interns.str(id), "\u{1F600}");
    }

    #[test]
    fn line_continuation() {
        let mut interns = Interns::new();
        let toks = lex("'a\\\nb'", &mut interns).unwrap();
        let TokenKind::Str(id) = toks[0].kind else { panic!("not a string") };
        assert_eq!(interns.str(id), "ab");
    }

    #[test]
    fn unterminated_string_reports_start() {
        let err = lex_err("\n  'abc");
        assert_eq!(err.loc.line, 2);
        assert_eq!(err.loc.column, 3);
    }

    #[test]
    fn template_reentry_and_nesting() {
        let toks = kinds("`a${ `x${1}y` }b`");
        assert!(matches!(toks[0], TokenKind::TemplateHead(_)));
        assert!(matches!(toks[1], TokenKind::TemplateHead(_)), "nested template head");
        assert_eq!(toks[2], TokenKind::Num(1.0));
        assert!(matches!(toks[3], TokenKind::TemplateTail(_)));
        assert!(matches!(toks[4], TokenKind::TemplateTail(_)));
    }

    #[test]
    fn template_with_braces_in_substitution() {
        let toks = kinds("`${ {a: 1} }`");
        assert!(matches!(toks[0], TokenKind::TemplateHead(_)));
        assert_eq!(toks[1], TokenKind::Punct(P::LBrace));
        // the `}` closing the object literal must not end the substitution
        assert!(matches!(toks.iter().rev().nth(1), Some(TokenKind::TemplateTail(_))));
    }

    #[test]
    fn regex_vs_division() {
        let toks = kinds("a / b");
        assert_eq!(toks[1], TokenKind::Punct(P::Slash));
        let toks = kinds("x = /ab[/]c/g");
        assert_eq!(
            toks[2],
            TokenKind::Regex {
                source: "ab[/]c".to_owned(),
                flags: "g".to_owned()
            }
        );
        let toks = kinds("return /x/");
        assert!(matches!(toks[1], TokenKind::Regex { .. }));
        let toks = kinds("(1) / 2");
        assert_eq!(toks[3], TokenKind::Punct(P::Slash));
    }

    #[test]
    fn hashbang_skipped_only_at_start() {
        let toks = kinds("#!/usr/bin/env node\n1");
        assert_eq!(toks[0], TokenKind::Num(1.0));
        assert!(lex_err("1\n#!x").message.contains("identifier after '#'"));
    }

    #[test]
    fn newline_before_flag() {
        let mut interns = Interns::new();
        let toks = lex("a\nb c", &mut interns).unwrap();
        assert!(!toks[0].newline_before);
        assert!(toks[1].newline_before);
        assert!(!toks[2].newline_before);
    }

    #[test]
    fn private_names() {
        let toks = kinds("this.#count");
        assert!(matches!(toks[2], TokenKind::PrivateIdent(_)));
    }

    #[test]
    fn punctuator_maximal_munch() {
        assert_eq!(kinds("a ??= b")[1], TokenKind::Punct(P::QuestionQuestionEq));
        assert_eq!(kinds("a >>>= b")[1], TokenKind::Punct(P::UShrEq));
        assert_eq!(kinds("a ** b")[1], TokenKind::Punct(P::StarStar));
        assert_eq!(kinds("a?.b")[1], TokenKind::Punct(P::QuestionDot));
        assert_eq!(kinds("...a")[0], TokenKind::Punct(P::DotDotDot));
    }
}
