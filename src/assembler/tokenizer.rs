//! [Tokenizer]: lexes source lines into [Token]s and owns the constant and
//! register symbol tables, exposing typed lookahead/accept/expect helpers.
//!
//! Identifier validity is modeled on the original implementation's
//! `[a-zA-Z_][0-9a-zA-Z_-]*` rule rather than a looser "anything
//! non-whitespace" rule, so that operators like `:=` and `+=` are correctly
//! rejected as identifiers.

use std::collections::HashMap;

use super::error::ParseError;
use super::token::{Location, Token};

/// One frame of the token-source stack. The root frame holds the whole,
/// eagerly-lexed program; a macro invocation pushes a frame over its
/// (parameter-substituted) body and is popped transparently once exhausted.
struct SourceFrame {
    tokens: Vec<Token>,
    pos: usize,
    mapping: Option<HashMap<String, String>>,
}

pub struct Tokenizer {
    consts: HashMap<String, f64>,
    registers: HashMap<String, u8>,
    sources: Vec<SourceFrame>,
    calls: Vec<u64>,
    current: Option<Token>,
    replay: Option<Token>,
}

const KEY_ORDER: [&str; 16] = [
    "X", "1", "2", "3", "Q", "W", "E", "A", "S", "D", "Z", "C", "4", "R", "F", "V",
];

impl Tokenizer {
    pub fn new(source: &str) -> Tokenizer {
        let tokens = lex(source);
        let mut consts = HashMap::new();
        consts.insert("PI".to_string(), std::f64::consts::PI);
        consts.insert("E".to_string(), std::f64::consts::E);
        for (i, key) in KEY_ORDER.iter().enumerate() {
            consts.insert(format!("OCTO_KEY_{key}"), i as f64);
        }

        let mut registers = HashMap::new();
        for i in 0u8..16 {
            registers.insert(format!("v{:x}", i), i);
            registers.insert(format!("v{:X}", i), i);
        }

        Tokenizer {
            consts,
            registers,
            sources: vec![SourceFrame { tokens, pos: 0, mapping: None }],
            calls: Vec::new(),
            current: None,
            replay: None,
        }
    }

    /// A standalone tokenizer over a fixed token list (used to evaluate a
    /// brace-delimited expression in isolation), sharing `consts` with an
    /// enclosing tokenizer so named constants and `HERE` resolve the same
    /// way they would inline.
    pub fn over_tokens(tokens: Vec<Token>, consts: HashMap<String, f64>) -> Tokenizer {
        Tokenizer {
            consts,
            registers: HashMap::new(),
            sources: vec![SourceFrame { tokens, pos: 0, mapping: None }],
            calls: Vec::new(),
            current: None,
            replay: None,
        }
    }

    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Advance to the next token, transparently falling back through the
    /// macro-source stack when the top frame is exhausted.
    pub fn advance(&mut self) -> Option<Token> {
        if let Some(tok) = self.replay.take() {
            self.current = Some(tok.clone());
            return Some(tok);
        }
        let tok = self.pull();
        self.current = tok.clone();
        tok
    }

    /// Push the current token back so the next `advance()` yields it again.
    pub fn unadvance(&mut self) {
        self.replay = self.current.clone();
    }

    fn pull(&mut self) -> Option<Token> {
        loop {
            let frame = self.sources.last_mut()?;
            if frame.pos < frame.tokens.len() {
                let raw = frame.tokens[frame.pos].clone();
                frame.pos += 1;
                let tok = match &frame.mapping {
                    Some(mapping) => match mapping.get(&raw.text) {
                        Some(sub) => Token::new(sub.clone(), raw.line, raw.field),
                        None => raw,
                    },
                    None => raw,
                };
                return Some(tok);
            }
            let was_macro = frame.mapping.is_some();
            self.sources.pop();
            if was_macro {
                self.calls.pop();
            }
            if self.sources.is_empty() {
                return None;
            }
            // loop again: this transparently continues pulling from the
            // enclosing source, so the caller never observes the frame
            // boundary where one macro body ended.
        }
    }

    /// Splice a macro body onto the token stream, substituting `mapping`
    /// and pushing `calls` as the new top of the macro invocation-count
    /// stack (bound to the `CALLS` keyword inside the body).
    pub fn emit_macro(&mut self, calls: u64, body: Vec<Token>, mapping: HashMap<String, String>) {
        self.calls.push(calls);
        self.sources.push(SourceFrame { tokens: body, pos: 0, mapping: Some(mapping) });
    }

    pub fn current_calls(&self) -> Option<u64> {
        self.calls.last().copied()
    }

    pub fn define_const(&mut self, name: impl Into<String>, value: f64) {
        self.consts.insert(name.into(), value);
    }

    pub fn lookup_const(&self, name: &str) -> Option<f64> {
        self.consts.get(name).copied()
    }

    pub fn consts(&self) -> &HashMap<String, f64> {
        &self.consts
    }

    pub fn alias_register(&mut self, name: impl Into<String>, nybble: u8) {
        self.registers.insert(name.into(), nybble);
    }

    // -- identifiers -----------------------------------------------------

    pub fn expect_ident(&self) -> Result<Token, ParseError> {
        let tok = self.require_current()?;
        if is_valid_identifier(&tok.text) {
            Ok(tok)
        } else {
            Err(ParseError::new(format!("`{}` is not a valid identifier", tok.text), tok))
        }
    }

    // -- registers ---------------------------------------------------------

    pub fn accept_register(&self) -> Option<u8> {
        let tok = self.current.as_ref()?;
        self.registers.get(&tok.text).copied()
    }

    pub fn expect_register(&self) -> Result<u8, ParseError> {
        self.accept_register()
            .ok_or_else(|| self.err_on_current("expected a register"))
    }

    // -- numbers -----------------------------------------------------------

    /// Resolve `CALLS`, a named constant, or an auto-radix signed literal
    /// for the given token. Returns `Ok(None)` when the token is simply not
    /// a number (so the caller can try something else); raises when it is
    /// an empty `CALLS` reference, since that is always a hard error.
    fn raw_number(&self, tok: &Token) -> Result<Option<f64>, ParseError> {
        if tok.text == "CALLS" {
            return match self.calls.last() {
                Some(&n) => Ok(Some(n as f64)),
                None => Err(ParseError::new("CALLS used outside of a macro body", tok.clone())),
            };
        }
        if let Some(v) = self.consts.get(&tok.text) {
            return Ok(Some(*v));
        }
        Ok(parse_radix(&tok.text).map(|v| v as f64))
    }

    /// Parse the current token as a number with no range restriction,
    /// failing if it is not a number at all.
    pub fn expect_number(&self) -> Result<f64, ParseError> {
        let tok = self.require_current()?;
        self.raw_number(&tok)?.ok_or_else(|| self.err_on_current("expected a number"))
    }

    /// Like [`Tokenizer::expect_number`], but `Ok(None)` when the current
    /// token simply isn't a number rather than an error — used by the
    /// expression evaluator to tell "number" from "operator" tokens.
    pub fn accept_number(&self) -> Result<Option<f64>, ParseError> {
        match self.current.as_ref() {
            Some(tok) => self.raw_number(&tok.clone()),
            None => Ok(None),
        }
    }

    fn accept_ranged(&self, low: i64, high: i64, mask: i64) -> Result<Option<u32>, ParseError> {
        let tok = match self.current.as_ref() {
            Some(t) => t.clone(),
            None => return Ok(None),
        };
        match self.raw_number(&tok)? {
            None => Ok(None),
            Some(v) => {
                let iv = v.round() as i64;
                if iv < low || iv > high {
                    Err(ParseError::new(
                        format!("number {iv} out of range [{low}, {high}]"),
                        tok,
                    ))
                } else {
                    Ok(Some((iv & mask) as u32))
                }
            }
        }
    }

    fn expect_ranged(
        &self,
        low: i64,
        high: i64,
        mask: i64,
        what: &str,
    ) -> Result<u32, ParseError> {
        self.accept_ranged(low, high, mask)?
            .ok_or_else(|| self.err_on_current(format!("expected {what}")))
    }

    pub fn accept_nybble(&self) -> Result<Option<u8>, ParseError> {
        Ok(self.accept_ranged(-0x7, 0xF, 0xF)?.map(|v| v as u8))
    }
    pub fn expect_nybble(&self) -> Result<u8, ParseError> {
        Ok(self.expect_ranged(-0x7, 0xF, 0xF, "a nybble")? as u8)
    }

    pub fn accept_byte(&self) -> Result<Option<u8>, ParseError> {
        Ok(self.accept_ranged(-0x7F, 0xFF, 0xFF)?.map(|v| v as u8))
    }
    pub fn expect_byte(&self) -> Result<u8, ParseError> {
        Ok(self.expect_ranged(-0x7F, 0xFF, 0xFF, "a byte")? as u8)
    }

    pub fn accept_address(&self) -> Result<Option<u16>, ParseError> {
        Ok(self.accept_ranged(-0x7FF, 0xFFF, 0xFFF)?.map(|v| v as u16))
    }
    pub fn expect_address(&self) -> Result<u16, ParseError> {
        Ok(self.expect_ranged(-0x7FF, 0xFFF, 0xFFF, "an address")? as u16)
    }

    pub fn accept_long_address(&self) -> Result<Option<u16>, ParseError> {
        Ok(self.accept_ranged(-0x7FFF, 0xFFFF, 0xFFFF)?.map(|v| v as u16))
    }
    pub fn expect_long_address(&self) -> Result<u16, ParseError> {
        Ok(self.expect_ranged(-0x7FFF, 0xFFFF, 0xFFFF, "a long address")? as u16)
    }

    /// An address literal, or an identifier naming a (possibly forward)
    /// label.
    pub fn expect_location(&self) -> Result<Location, ParseError> {
        if let Some(addr) = self.accept_address()? {
            return Ok(Location::Address(addr));
        }
        Ok(Location::Label(self.expect_ident()?))
    }

    pub fn expect_long_location(&self) -> Result<Location, ParseError> {
        if let Some(addr) = self.accept_long_address()? {
            return Ok(Location::Address(addr));
        }
        Ok(Location::Label(self.expect_ident()?))
    }

    // -- "next_*" family: advance() then the matching expect_* -------------

    pub fn next_ident(&mut self) -> Result<Token, ParseError> {
        self.advance();
        self.expect_ident()
    }
    pub fn next_register(&mut self) -> Result<u8, ParseError> {
        self.advance();
        self.expect_register()
    }
    pub fn next_number(&mut self) -> Result<f64, ParseError> {
        self.advance();
        self.expect_number()
    }
    pub fn next_nybble(&mut self) -> Result<u8, ParseError> {
        self.advance();
        self.expect_nybble()
    }
    pub fn next_byte(&mut self) -> Result<u8, ParseError> {
        self.advance();
        self.expect_byte()
    }
    pub fn next_address(&mut self) -> Result<u16, ParseError> {
        self.advance();
        self.expect_address()
    }
    pub fn next_long_address(&mut self) -> Result<u16, ParseError> {
        self.advance();
        self.expect_long_address()
    }
    pub fn next_location(&mut self) -> Result<Location, ParseError> {
        self.advance();
        self.expect_location()
    }
    pub fn next_long_location(&mut self) -> Result<Location, ParseError> {
        self.advance();
        self.expect_long_location()
    }

    fn require_current(&self) -> Result<Token, ParseError> {
        self.current.clone().ok_or_else(|| {
            ParseError::new("unexpected end of input", Token::synthetic("<eof>"))
        })
    }

    fn err_on_current(&self, message: impl Into<String>) -> ParseError {
        let tok = self.current.clone().unwrap_or_else(|| Token::synthetic("<eof>"));
        ParseError::new(message, tok)
    }
}

fn is_valid_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Parse a signed integer in auto-radix: `0x`/`0X` hex, `0b`/`0B` binary,
/// `0o`/`0O` octal, else decimal (including leading-zero decimals, which
/// must never be treated as octal).
fn parse_radix(text: &str) -> Option<i64> {
    let (neg, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if let Some(oct) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).ok()?
    } else {
        rest.parse::<i64>().ok()?
    };
    Some(if neg { -value } else { value })
}

/// Split source lines on ASCII whitespace into tokens, dropping `#`-comment
/// tails. No string-literal or multi-character punctuation tokenization
/// beyond whitespace separation is performed.
fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (line_index, line) in source.lines().enumerate() {
        for (field_index, field) in line.split_whitespace().enumerate() {
            if field.starts_with('#') {
                break;
            }
            tokens.push(Token::new(field, line_index + 1, field_index + 1));
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_fidelity_excludes_comment_tail() {
        let tok = Tokenizer::new("  v0 := 1  # a comment v1 := 2\nv2 := 3");
        let mut t = tok;
        let texts: Vec<(String, usize, usize)> = {
            let mut out = Vec::new();
            while let Some(token) = t.advance() {
                out.push((token.text, token.line, token.field));
            }
            out
        };
        assert_eq!(
            texts,
            vec![
                ("v0".to_string(), 1, 1),
                (":=".to_string(), 1, 2),
                ("1".to_string(), 1, 3),
                ("v2".to_string(), 2, 1),
                (":=".to_string(), 2, 2),
                ("3".to_string(), 2, 3),
            ]
        );
    }

    #[test]
    fn auto_radix_numbers() {
        assert_eq!(parse_radix("0x1F"), Some(31));
        assert_eq!(parse_radix("0b101"), Some(5));
        assert_eq!(parse_radix("0o17"), Some(15));
        assert_eq!(parse_radix("010"), Some(10));
        assert_eq!(parse_radix("-5"), Some(-5));
        assert_eq!(parse_radix(":="), None);
    }

    #[test]
    fn operators_are_not_identifiers() {
        assert!(!is_valid_identifier(":="));
        assert!(!is_valid_identifier("+="));
        assert!(!is_valid_identifier("1foo"));
        assert!(is_valid_identifier("main"));
        assert!(is_valid_identifier("my-label_1"));
    }

    #[test]
    fn out_of_range_byte_is_an_error() {
        let mut t = Tokenizer::new("1000");
        t.advance();
        assert!(t.expect_byte().is_err());
    }

    #[test]
    fn macro_splice_falls_back_transparently() {
        let mut t = Tokenizer::new("a b");
        t.advance(); // "a"
        let body = vec![Token::new("x", 9, 1), Token::new("y", 9, 2)];
        t.emit_macro(0, body, HashMap::new());
        let mut seen = Vec::new();
        while let Some(tok) = t.advance() {
            seen.push(tok.text);
        }
        assert_eq!(seen, vec!["x", "y", "b"]);
    }
}
