//! Permissive literal parser for dict-like model output.
//!
//! Accepts the Python literal dialect models tend to emit instead of JSON:
//! single- or double-quoted strings, `True`/`False`/`None` (and their JSON
//! spellings), tuples, trailing commas and adjacent string concatenation.
//! Produces a `serde_json::Value`; non-string dict keys are rendered as their
//! JSON text.

use serde_json::{Map, Number, Value};

/// Containers nested deeper than this are rejected; same limit as serde_json.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: &'static str,
}

/// Parse a complete literal; trailing non-whitespace is an error.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(parser.error("trailing characters"));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn error(&self, message: &'static str) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, want: char, message: &'static str) -> Result<(), LiteralError> {
        self.skip_ws();
        if self.peek() == Some(want) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.nested(Self::dict),
            Some('[') => self.nested(|p| {
                p.sequence('[', ']').map(|(items, _)| Value::Array(items))
            }),
            Some('(') => self.nested(Self::tuple),
            Some('\'') | Some('"') => self.strings(),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.word(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Value, LiteralError>,
    ) -> Result<Value, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn dict(&mut self) -> Result<Value, LiteralError> {
        self.pos += 1;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Array(_) | Value::Object(_) => return Err(self.error("unhashable key")),
                other => other.to_string(),
            };
            self.expect(':', "expected ':' after key")?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    /// Comma-separated items up to `close`. Returns the items and whether a
    /// trailing comma was present.
    fn sequence(&mut self, open: char, close: char) -> Result<(Vec<Value>, bool), LiteralError> {
        debug_assert_eq!(self.peek(), Some(open));
        self.pos += 1;
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok((items, trailing_comma));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => trailing_comma = true,
                Some(c) if c == close => return Ok((items, false)),
                _ => return Err(self.error("expected ',' or closing bracket")),
            }
        }
    }

    fn tuple(&mut self) -> Result<Value, LiteralError> {
        let (mut items, trailing_comma) = self.sequence('(', ')')?;
        // `(x)` is just a parenthesized value; `(x,)` is a one-element tuple.
        if items.len() == 1 && !trailing_comma {
            return Ok(items.remove(0));
        }
        Ok(Value::Array(items))
    }

    fn strings(&mut self) -> Result<Value, LiteralError> {
        let mut out = self.string()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('\'') | Some('"') => out.push_str(&self.string()?),
                _ => return Ok(Value::String(out)),
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let quote = self.bump().ok_or_else(|| self.error("expected quote"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        match self.bump() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some('x') => out.push(self.hex_char(2)?),
            Some('u') => out.push(self.hex_char(4)?),
            // Unknown escapes keep the backslash.
            Some(c) => {
                out.push('\\');
                out.push(c);
            }
            None => return Err(self.error("unterminated escape")),
        }
        Ok(())
    }

    fn hex_char(&mut self, digits: usize) -> Result<char, LiteralError> {
        let end = self.pos + digits;
        if end > self.chars.len() {
            return Err(self.error("truncated hex escape"));
        }
        let hex: String = self.chars[self.pos..end].iter().collect();
        let code = u32::from_str_radix(&hex, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    if matches!(self.chars.get(self.pos + 1), Some('-') | Some('+')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        let text = text.strip_prefix('+').unwrap_or(&text);

        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::Number(i.into()));
            }
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or(LiteralError {
                offset: start,
                message: "invalid number",
            })
    }

    fn word(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => Err(LiteralError {
                offset: start,
                message: "bare identifier",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_quoted_dict() {
        assert_eq!(parse_literal("{'a': 1}").expect("parse"), json!({"a": 1}));
    }

    #[test]
    fn python_keywords_and_nesting() {
        let parsed = parse_literal("{'ok': True, 'missing': None, 'ids': [1, 2.5, -3], 'nested': {'x': False}}")
            .expect("parse");
        assert_eq!(
            parsed,
            json!({"ok": true, "missing": null, "ids": [1, 2.5, -3], "nested": {"x": false}})
        );
    }

    #[test]
    fn trailing_commas_are_tolerated() {
        assert_eq!(
            parse_literal("{\"a\": [1, 2,], \"b\": true,}").expect("parse"),
            json!({"a": [1, 2], "b": true})
        );
    }

    #[test]
    fn tuples_become_arrays() {
        assert_eq!(parse_literal("(1, 'x')").expect("parse"), json!([1, "x"]));
        assert_eq!(parse_literal("(1,)").expect("parse"), json!([1]));
        assert_eq!(parse_literal("(1)").expect("parse"), json!(1));
    }

    #[test]
    fn escapes_and_mixed_quotes() {
        assert_eq!(
            parse_literal(r#"{'msg': "it's \"fine\"\n", 'path': 'a\\b'}"#).expect("parse"),
            json!({"msg": "it's \"fine\"\n", "path": "a\\b"})
        );
    }

    #[test]
    fn non_string_keys_render_as_json_text() {
        assert_eq!(
            parse_literal("{1: 'one', True: 'yes'}").expect("parse"),
            json!({"1": "one", "true": "yes"})
        );
    }

    #[test]
    fn nesting_is_bounded() {
        let ok = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_literal(&ok).is_ok());

        let deep = format!("{}{}", "[".repeat(20_000), "]".repeat(20_000));
        let err = parse_literal(&deep).expect_err("too deep");
        assert_eq!(err.message, "nesting too deep");
        assert_eq!(err.offset, MAX_DEPTH);

        let mixed = "{'a': (".repeat(100) + &")}".repeat(100);
        assert_eq!(
            parse_literal(&mixed).expect_err("too deep").message,
            "nesting too deep"
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_literal("{'a': }").is_err());
        assert!(parse_literal("{'a' 1}").is_err());
        assert!(parse_literal("status: ok").is_err());
        assert!(parse_literal("{'a': 1} extra").is_err());
        assert!(parse_literal("'unterminated").is_err());
        assert!(parse_literal("").is_err());
    }
}
