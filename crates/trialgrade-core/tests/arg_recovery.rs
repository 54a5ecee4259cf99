//! Argument recovery over the kinds of payloads models actually emit.

use serde_json::{json, Map, Value};
use trialgrade_core::recovery::RecoveryStrategy;
use trialgrade_core::{recover_arguments, recover_tool_arguments, ArgHealth};

fn obj(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn never_panics_and_always_returns_a_mapping() {
    let inputs = [
        json!(null),
        json!(""),
        json!("   "),
        json!("null"),
        json!("None"),
        json!("{"),
        json!("}"),
        json!("[1, 2"),
        json!("[1, 2]"),
        json!("42"),
        json!("\"just a string\""),
        json!("{'a': }"),
        json!("a: b: c"),
        json!("{\"nested\": {\"deep\": [1, {\"x\": null}]}}"),
        json!("'unterminated"),
        json!("\\u12"),
        json!("{'k': '\\x4'}"),
        json!("é: 'ü'"),
        json!(7),
        json!(true),
        json!([1, 2]),
    ];
    for input in inputs {
        let recovered = recover_tool_arguments(&input, "tool", 16);
        if let ArgHealth::ParseFailed { excerpt, .. } = &recovered.health {
            assert!(excerpt.chars().count() <= 16);
            assert!(recovered.arguments.is_empty());
        }
    }
}

#[test]
fn mappings_are_returned_unchanged() {
    let raw = json!({"order_id": "#W1", "items": [1, 2], "note": null});
    let once = recover_arguments(&raw);
    assert_eq!(Value::Object(once.clone()), raw);
    let twice = recover_arguments(&Value::Object(once.clone()));
    assert_eq!(once, twice);
    assert_eq!(
        recover_tool_arguments(&raw, "x", 500).health,
        ArgHealth::Clean
    );
}

#[test]
fn python_dict_text_uses_literal_path() {
    let recovered = recover_tool_arguments(&json!("{'a': 1}"), "t", 500);
    assert_eq!(recovered.arguments, obj(json!({"a": 1})));
    assert_eq!(
        recovered.health,
        ArgHealth::Repaired {
            strategy: RecoveryStrategy::PythonLiteral
        }
    );
}

#[test]
fn bare_key_value_text_is_wrapped() {
    let recovered = recover_tool_arguments(&json!("status: \"ok\""), "t", 500);
    assert_eq!(recovered.arguments, obj(json!({"status": "ok"})));
    assert_eq!(
        recovered.health,
        ArgHealth::Repaired {
            strategy: RecoveryStrategy::BareKeyValue
        }
    );
}

#[test]
fn non_object_json_is_wrapped_under_args_key() {
    assert_eq!(
        recover_arguments(&json!("[1, 2]")),
        obj(json!({"_args": [1, 2]}))
    );
    assert_eq!(recover_arguments(&json!("3.5")), obj(json!({"_args": 3.5})));
}

#[test]
fn empty_payloads_are_recorded_not_hidden() {
    for raw in [json!(""), json!("NULL"), json!(" none ")] {
        let recovered = recover_tool_arguments(&raw, "lookup", 500);
        assert!(recovered.arguments.is_empty());
        assert!(recovered.health.is_error());
        assert_eq!(recovered.health.error_reason(), Some("arguments empty"));
    }
    let recovered = recover_tool_arguments(&Value::Null, "lookup", 500);
    assert_eq!(recovered.health.error_reason(), Some("arguments is None"));
}

#[test]
fn unrecoverable_text_keeps_tool_name_and_excerpt() {
    let raw = format!("{{oops {}", "x".repeat(1000));
    let recovered = recover_tool_arguments(&Value::String(raw.clone()), "cancel_order", 500);
    match recovered.health {
        ArgHealth::ParseFailed {
            tool_name,
            error,
            excerpt,
        } => {
            assert_eq!(tool_name, "cancel_order");
            assert!(error.starts_with("invalid JSON ("));
            assert_eq!(excerpt.chars().count(), 500);
            assert!(raw.starts_with(&excerpt));
        }
        other => panic!("expected parse failure, got {other:?}"),
    }
}

#[test]
fn deeply_nested_payload_degrades_to_parse_failure() {
    for open in ["[", "{'a': ", "("] {
        let close = match open {
            "[" => "]",
            "(" => ")",
            _ => "}",
        };
        let raw = format!("{}1{}", open.repeat(200_000), close.repeat(200_000));
        let recovered = recover_tool_arguments(&Value::String(raw), "search", 64);
        assert!(recovered.arguments.is_empty());
        match recovered.health {
            ArgHealth::ParseFailed {
                tool_name, excerpt, ..
            } => {
                assert_eq!(tool_name, "search");
                assert_eq!(excerpt.chars().count(), 64);
            }
            other => panic!("expected parse failure, got {other:?}"),
        }
    }
}
