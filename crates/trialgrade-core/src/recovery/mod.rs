//! Tool-call argument recovery.
//!
//! Models emit tool-call arguments as JSON strings, Python-style dict text,
//! bare `key: value` fragments, empty strings or nothing at all. Recovery turns
//! any of these into a key/value mapping and never fails; what it had to do to
//! get there is recorded in an [`ArgHealth`] ledger entry so that a silently
//! substituted `{}` is never mistaken for a clean call.
//!
//! Parsing is an ordered fallback chain of pure strategies (see
//! [`STRATEGIES`]); the first one that yields a value wins.

pub mod literal;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw excerpt length kept for unparseable payloads.
pub const DEFAULT_EXCERPT_CHARS: usize = 500;

/// Key used to wrap a parsed payload that is not an object.
pub const WRAPPED_ARGS_KEY: &str = "_args";

/// Parser strategies tried after the trivial cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    StrictJson,
    PythonLiteral,
    BareKeyValue,
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecoveryStrategy::StrictJson => "strict_json",
            RecoveryStrategy::PythonLiteral => "python_literal",
            RecoveryStrategy::BareKeyValue => "bare_key_value",
        };
        f.write_str(s)
    }
}

type ParseFn = fn(&str) -> Option<Value>;

/// The fallback chain, in order.
pub const STRATEGIES: [(RecoveryStrategy, ParseFn); 3] = [
    (RecoveryStrategy::StrictJson, parse_strict_json),
    (RecoveryStrategy::PythonLiteral, parse_python_literal),
    (RecoveryStrategy::BareKeyValue, parse_bare_key_value),
];

/// Health ledger entry for one tool call's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArgHealth {
    /// A native mapping or valid JSON.
    Clean,
    /// Recovered by a fallback parser.
    Repaired { strategy: RecoveryStrategy },
    /// Absent, empty, `null` or `none`; replaced by `{}`.
    RecoveredAsEmpty { reason: String },
    /// Nothing could parse it; replaced by `{}`.
    ParseFailed {
        tool_name: String,
        error: String,
        excerpt: String,
    },
}

impl ArgHealth {
    /// Whether this entry counts toward the schema-mismatch failure bucket.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ArgHealth::RecoveredAsEmpty { .. } | ArgHealth::ParseFailed { .. }
        )
    }

    /// Short reason for error entries.
    pub fn error_reason(&self) -> Option<&str> {
        match self {
            ArgHealth::RecoveredAsEmpty { reason } => Some(reason),
            ArgHealth::ParseFailed { error, .. } => Some(error),
            ArgHealth::Clean | ArgHealth::Repaired { .. } => None,
        }
    }
}

/// Recovered mapping plus its health entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveredArguments {
    pub arguments: Map<String, Value>,
    pub health: ArgHealth,
}

impl RecoveredArguments {
    fn new(arguments: Map<String, Value>, health: ArgHealth) -> Self {
        Self { arguments, health }
    }
}

/// Recover a mapping from any raw payload. Never fails; a mapping input is
/// returned unchanged.
pub fn recover_arguments(raw: &Value) -> Map<String, Value> {
    recover_tool_arguments(raw, "", DEFAULT_EXCERPT_CHARS).arguments
}

/// Recover a mapping and record how it was obtained.
///
/// `tool_name` is only used to label a [`ArgHealth::ParseFailed`] entry.
pub fn recover_tool_arguments(
    raw: &Value,
    tool_name: &str,
    excerpt_chars: usize,
) -> RecoveredArguments {
    let text = match raw {
        Value::Object(map) => return RecoveredArguments::new(map.clone(), ArgHealth::Clean),
        Value::Null => {
            return RecoveredArguments::new(
                Map::new(),
                ArgHealth::RecoveredAsEmpty {
                    reason: "arguments is None".to_string(),
                },
            )
        }
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };

    if text.is_empty() || text.eq_ignore_ascii_case("null") || text.eq_ignore_ascii_case("none")
    {
        return RecoveredArguments::new(
            Map::new(),
            ArgHealth::RecoveredAsEmpty {
                reason: "arguments empty".to_string(),
            },
        );
    }

    for (strategy, parse) in STRATEGIES {
        if let Some(value) = parse(&text) {
            let health = match strategy {
                RecoveryStrategy::StrictJson => ArgHealth::Clean,
                strategy => ArgHealth::Repaired { strategy },
            };
            return RecoveredArguments::new(into_mapping(value), health);
        }
    }

    let error = match serde_json::from_str::<Value>(&text) {
        Err(e) => format!("invalid JSON ({e})"),
        Ok(_) => "invalid JSON".to_string(),
    };
    RecoveredArguments::new(
        Map::new(),
        ArgHealth::ParseFailed {
            tool_name: tool_name.to_string(),
            error,
            excerpt: text.chars().take(excerpt_chars).collect(),
        },
    )
}

fn into_mapping(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert(WRAPPED_ARGS_KEY.to_string(), other);
            map
        }
    }
}

fn parse_strict_json(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

fn parse_python_literal(text: &str) -> Option<Value> {
    literal::parse_literal(text).ok()
}

/// `status: "ok", count: 2` → `{"status": "ok", "count": 2}`.
fn parse_bare_key_value(text: &str) -> Option<Value> {
    if text.starts_with('{') || !text.contains(':') {
        return None;
    }
    let candidate = format!("{{{}}}", quote_bare_keys(text));
    serde_json::from_str(&candidate).ok()
}

/// Quote identifier keys that directly follow the start of input or a comma
/// and are followed by `:`. String contents are left untouched.
fn quote_bare_keys(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut in_string: Option<char> = None;
    let mut expecting_key = true;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(quote) = in_string {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.get(i + 1) {
                    out.push(*next);
                    i += 1;
                }
            } else if c == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }

        if expecting_key && (c.is_alphabetic() || c == '_') {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '-')) {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if chars.get(j) == Some(&':') {
                out.push('"');
                out.push_str(&ident);
                out.push('"');
            } else {
                out.push_str(&ident);
            }
            expecting_key = false;
            continue;
        }

        match c {
            '"' | '\'' => {
                in_string = Some(c);
                expecting_key = false;
            }
            ',' | '{' => expecting_key = true,
            c if c.is_whitespace() => {}
            _ => expecting_key = false,
        }
        out.push(c);
        i += 1;
    }
    out
}
