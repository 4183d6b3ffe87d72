//! Permissive parser for Python-style literal text.
//!
//! Session exports serialize the `Origin` column with Python's `repr`, so a
//! cell looks like `{'firstVisitedPage': '/pricing?ref=nav'}` or a list of
//! such mappings. This module decodes that grammar (strings with any quote
//! style and prefix, numbers, `True` / `False` / `None`, lists, tuples, sets
//! and dicts) into a [`Literal`] tree. It never evaluates anything and never
//! panics; every failure is a [`LiteralError`].

use thiserror::Error;

/// Most brackets that may be open at once; one more is rejected.
pub const MAX_DEPTH: usize = 200;

/// A decoded literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Bytes(Vec<u8>),
    /// Numeric literal, kept as written with any sign folded in
    /// (`-4`, `0x1f`, `1+2j`).
    Number(String),
    Bool(bool),
    None,
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Set(Vec<Literal>),
    /// Key / value pairs in source order; repeated keys are kept.
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    /// The text of a `Str` literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a string key in a `Dict`.
    ///
    /// When the key repeats, the last occurrence wins, matching how the
    /// mapping would behave once materialised.
    pub fn get(&self, key: &str) -> Option<&Literal> {
        match self {
            Literal::Dict(pairs) => pairs
                .iter()
                .rev()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn is_dict(&self) -> bool {
        matches!(self, Literal::Dict(_))
    }
}

/// Why a piece of text is not a literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),
    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),
    #[error("invalid number at offset {0}")]
    InvalidNumber(usize),
    #[error("unknown name {0:?}")]
    UnknownName(String),
    #[error("formatted strings are not literals")]
    FormattedString,
    #[error("cannot mix bytes and str literals")]
    MixedStringKinds,
    #[error("more than {MAX_DEPTH} nested brackets")]
    TooDeep,
    #[error("trailing input at offset {0}")]
    TrailingInput(usize),
}

/// Parse `text` as a single literal expression.
pub fn parse_literal(text: &str) -> Result<Literal, LiteralError> {
    let mut parser = Parser::new(text);
    parser.skip_trivia();
    let value = parser.parse_value(0)?;
    parser.skip_trivia();
    if parser.peek().is_some() {
        return Err(LiteralError::TrailingInput(parser.pos));
    }
    Ok(value)
}

// ── Parser ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct StringPrefix {
    len: usize,
    raw: bool,
    bytes: bool,
    formatted: bool,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expect(&mut self, wanted: char) -> Result<(), LiteralError> {
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(found) => Err(LiteralError::UnexpectedChar {
                found,
                offset: self.pos - 1,
            }),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    /// Skip whitespace, `#` comments and backslash line continuations.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\n' | '\r' | '\x0c') => self.pos += 1,
                Some('\\') if self.peek_at(1) == Some('\n') => self.pos += 2,
                Some('\\') if self.peek_at(1) == Some('\r') && self.peek_at(2) == Some('\n') => {
                    self.pos += 3
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        let c = self.peek().ok_or(LiteralError::UnexpectedEnd)?;
        if matches!(c, '{' | '[' | '(') && depth >= MAX_DEPTH {
            return Err(LiteralError::TooDeep);
        }
        match c {
            '{' => self.parse_brace(depth),
            '[' => {
                self.pos += 1;
                let items = self.parse_sequence_tail(']', depth, Vec::new())?;
                Ok(Literal::List(items))
            }
            '(' => self.parse_paren(depth),
            '\'' | '"' => self.parse_strings(),
            '+' | '-' => {
                let real = self.parse_signed_number()?;
                self.parse_complex_tail(real)
            }
            '0'..='9' => {
                let real = self.parse_number()?;
                self.parse_complex_tail(real)
            }
            '.' if matches!(self.peek_at(1), Some('0'..='9')) => {
                let real = self.parse_number()?;
                self.parse_complex_tail(real)
            }
            c if c.is_alphabetic() || c == '_' => {
                if self.string_prefix().is_some() {
                    self.parse_strings()
                } else {
                    self.parse_name()
                }
            }
            found => Err(LiteralError::UnexpectedChar {
                found,
                offset: self.pos,
            }),
        }
    }

    /// Parse comma-separated values up to `close`. The opening bracket (or a
    /// separating comma) has already been consumed.
    fn parse_sequence_tail(
        &mut self,
        close: char,
        depth: usize,
        mut items: Vec<Literal>,
    ) -> Result<Vec<Literal>, LiteralError> {
        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.parse_value(depth + 1)?);
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(items),
                Some(found) => {
                    return Err(LiteralError::UnexpectedChar {
                        found,
                        offset: self.pos - 1,
                    })
                }
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    fn parse_paren(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.pos += 1;
        self.skip_trivia();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(Literal::Tuple(Vec::new()));
        }
        let first = self.parse_value(depth + 1)?;
        self.skip_trivia();
        match self.bump() {
            // A parenthesised expression, not a tuple.
            Some(')') => Ok(first),
            Some(',') => {
                let items = self.parse_sequence_tail(')', depth, vec![first])?;
                Ok(Literal::Tuple(items))
            }
            Some(found) => Err(LiteralError::UnexpectedChar {
                found,
                offset: self.pos - 1,
            }),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    /// `{}` is an empty dict; `{a, b}` is a set; `{k: v, ...}` is a dict.
    fn parse_brace(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.pos += 1;
        self.skip_trivia();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(Literal::Dict(Vec::new()));
        }

        let first = self.parse_value(depth + 1)?;
        self.skip_trivia();
        match self.bump() {
            Some(':') => {}
            Some('}') => return Ok(Literal::Set(vec![first])),
            Some(',') => {
                let items = self.parse_sequence_tail('}', depth, vec![first])?;
                return Ok(Literal::Set(items));
            }
            Some(found) => {
                return Err(LiteralError::UnexpectedChar {
                    found,
                    offset: self.pos - 1,
                })
            }
            None => return Err(LiteralError::UnexpectedEnd),
        }

        let mut pairs = Vec::new();
        let mut key = first;
        loop {
            self.skip_trivia();
            let value = self.parse_value(depth + 1)?;
            pairs.push((key, value));

            self.skip_trivia();
            match self.bump() {
                Some('}') => return Ok(Literal::Dict(pairs)),
                Some(',') => {}
                Some(found) => {
                    return Err(LiteralError::UnexpectedChar {
                        found,
                        offset: self.pos - 1,
                    })
                }
                None => return Err(LiteralError::UnexpectedEnd),
            }

            self.skip_trivia();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Literal::Dict(pairs));
            }
            key = self.parse_value(depth + 1)?;
            self.skip_trivia();
            self.expect(':')?;
        }
    }

    fn parse_name(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        match name.as_str() {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            // `set()` is how an empty set is written.
            "set" => {
                self.skip_trivia();
                self.expect('(')?;
                self.skip_trivia();
                self.expect(')')?;
                Ok(Literal::Set(Vec::new()))
            }
            _ => Err(LiteralError::UnknownName(name)),
        }
    }

    // ── Strings ───────────────────────────────────────────────────────────────

    /// Detect a string start (optional prefix letters followed by a quote).
    fn string_prefix(&self) -> Option<StringPrefix> {
        let mut prefix = StringPrefix {
            len: 0,
            raw: false,
            bytes: false,
            formatted: false,
        };
        let mut unicode = false;
        loop {
            match self.peek_at(prefix.len)? {
                '\'' | '"' => break,
                'r' | 'R' if !prefix.raw => prefix.raw = true,
                'b' | 'B' if !prefix.bytes && !prefix.formatted && !unicode => prefix.bytes = true,
                'f' | 'F' if !prefix.formatted && !prefix.bytes && !unicode => {
                    prefix.formatted = true
                }
                'u' | 'U' if prefix.len == 0 => unicode = true,
                _ => return None,
            }
            prefix.len += 1;
            if prefix.len > 2 {
                return None;
            }
        }
        if unicode && prefix.len > 1 {
            return None;
        }
        Some(prefix)
    }

    /// Parse one string token and any adjacent tokens it concatenates with.
    fn parse_strings(&mut self) -> Result<Literal, LiteralError> {
        let first = self.string_prefix().ok_or(LiteralError::UnexpectedChar {
            found: self.peek().unwrap_or('\0'),
            offset: self.pos,
        })?;
        let bytes = first.bytes;
        let mut text = self.parse_string_token(first)?;

        loop {
            let resume = self.pos;
            self.skip_trivia();
            match self.string_prefix() {
                Some(next) => {
                    if next.bytes != bytes {
                        return Err(LiteralError::MixedStringKinds);
                    }
                    text.push_str(&self.parse_string_token(next)?);
                }
                None => {
                    self.pos = resume;
                    break;
                }
            }
        }

        if bytes {
            let raw: Option<Vec<u8>> = text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).ok())
                .collect();
            raw.map(Literal::Bytes)
                .ok_or(LiteralError::InvalidEscape(self.pos))
        } else {
            Ok(Literal::Str(text))
        }
    }

    fn parse_string_token(&mut self, prefix: StringPrefix) -> Result<String, LiteralError> {
        if prefix.formatted {
            return Err(LiteralError::FormattedString);
        }
        let start = self.pos;
        self.pos += prefix.len;
        let quote = self.bump().ok_or(LiteralError::UnexpectedEnd)?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let c = self
                .bump()
                .ok_or(LiteralError::UnterminatedString(start))?;
            match c {
                c if c == quote => {
                    if !triple {
                        return Ok(out);
                    }
                    if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                        self.pos += 2;
                        return Ok(out);
                    }
                    out.push(c);
                }
                '\n' | '\r' if !triple => return Err(LiteralError::UnterminatedString(start)),
                '\\' if prefix.raw => {
                    let next = self
                        .bump()
                        .ok_or(LiteralError::UnterminatedString(start))?;
                    out.push('\\');
                    out.push(next);
                }
                '\\' => self.parse_escape(&mut out, prefix.bytes, start)?,
                other => out.push(other),
            }
        }
    }

    fn parse_escape(
        &mut self,
        out: &mut String,
        bytes: bool,
        start: usize,
    ) -> Result<(), LiteralError> {
        let offset = self.pos - 1;
        let c = self
            .bump()
            .ok_or(LiteralError::UnterminatedString(start))?;
        match c {
            '\n' => {}
            '\r' => {
                if self.peek() == Some('\n') {
                    self.pos += 1;
                }
            }
            '\\' | '\'' | '"' => out.push(c),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).ok_or(LiteralError::InvalidEscape(offset))?);
            }
            'x' => out.push(self.hex_escape(2, offset)?),
            'u' if !bytes => out.push(self.hex_escape(4, offset)?),
            'U' if !bytes => out.push(self.hex_escape(8, offset)?),
            'N' if !bytes => out.push(self.named_escape(offset)?),
            // Unknown escapes keep their backslash.
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize, offset: usize) -> Result<char, LiteralError> {
        let mut value: u32 = 0;
        for _ in 0..digits {
            let d = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or(LiteralError::InvalidEscape(offset))?;
            value = value * 16 + d;
            self.pos += 1;
        }
        char::from_u32(value).ok_or(LiteralError::InvalidEscape(offset))
    }

    /// `\N{LATIN SMALL LETTER E WITH ACUTE}`; the name is matched
    /// case-insensitively.
    fn named_escape(&mut self, offset: usize) -> Result<char, LiteralError> {
        if self.bump() != Some('{') {
            return Err(LiteralError::InvalidEscape(offset));
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == ' ' || c == '-' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        if self.bump() != Some('}') || name.is_empty() {
            return Err(LiteralError::InvalidEscape(offset));
        }
        unicode_names2::character(&name.to_ascii_uppercase())
            .ok_or(LiteralError::InvalidEscape(offset))
    }

    // ── Numbers ───────────────────────────────────────────────────────────────

    fn parse_signed_number(&mut self) -> Result<Literal, LiteralError> {
        let offset = self.pos;
        let sign = self.bump().ok_or(LiteralError::UnexpectedEnd)?;
        self.skip_trivia();
        let starts_number = match self.peek() {
            Some('0'..='9') => true,
            Some('.') => matches!(self.peek_at(1), Some('0'..='9')),
            _ => false,
        };
        if !starts_number {
            return Err(LiteralError::InvalidNumber(offset));
        }
        match self.parse_number()? {
            Literal::Number(digits) => Ok(Literal::Number(format!("{sign}{digits}"))),
            _ => Err(LiteralError::InvalidNumber(offset)),
        }
    }

    /// `real + imaginary` (or `-`) forms one complex number. Anything else
    /// after a sign is not a literal.
    fn parse_complex_tail(&mut self, real: Literal) -> Result<Literal, LiteralError> {
        let real_text = match real {
            Literal::Number(text) if !text.ends_with(['j', 'J']) => text,
            other => return Ok(other),
        };
        let resume = self.pos;
        self.skip_trivia();
        if !matches!(self.peek(), Some('+' | '-')) {
            self.pos = resume;
            return Ok(Literal::Number(real_text));
        }
        let offset = self.pos;
        match self.parse_signed_number()? {
            Literal::Number(imag) if imag.ends_with(['j', 'J']) => {
                Ok(Literal::Number(format!("{real_text}{imag}")))
            }
            _ => Err(LiteralError::InvalidNumber(offset)),
        }
    }

    fn parse_number(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        let radix = if self.peek() == Some('0') {
            match self.peek_at(1) {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            }
        } else {
            None
        };

        if let Some(radix) = radix {
            self.pos += 2;
            let digits_start = self.pos;
            while let Some(c) = self.peek() {
                if c == '_' || c.is_digit(radix) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            if self.pos == digits_start {
                return Err(LiteralError::InvalidNumber(start));
            }
        } else {
            self.eat_digits();
            let mut integer = true;
            if self.peek() == Some('.') {
                integer = false;
                self.pos += 1;
                self.eat_digits();
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                integer = false;
                self.pos += 1;
                if matches!(self.peek(), Some('+' | '-')) {
                    self.pos += 1;
                }
                if self.eat_digits() == 0 {
                    return Err(LiteralError::InvalidNumber(start));
                }
            }
            if matches!(self.peek(), Some('j' | 'J')) {
                integer = false;
                self.pos += 1;
            }
            // `0`, `00` and `0_0` are fine; `01` is not a decimal integer.
            let digits = &self.chars[start..self.pos];
            let zero_padded = digits.first() == Some(&'0')
                && digits.iter().any(|c| c.is_ascii_digit() && *c != '0');
            if integer && zero_padded {
                return Err(LiteralError::InvalidNumber(start));
            }
        }

        // `1abc` and `1_` are not numbers.
        if matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            return Err(LiteralError::InvalidNumber(start));
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if text.ends_with('_') || text.contains("__") || text.contains("_.") || text.contains("._")
        {
            return Err(LiteralError::InvalidNumber(start));
        }
        Ok(Literal::Number(text))
    }

    fn eat_digits(&mut self) -> usize {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || (c == '_' && self.pos > start) {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.pos - start
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
