//! Truthiness and scalar coercion for loosely typed DSL values.
//!
//! Attribute values arrive as whatever the author wrote: `true`, `1`,
//! `"y"`, `"TRUE"`. These helpers turn them into the booleans and strings the
//! model carries, with one fixed rule set shared by every builder.

use crate::parser::Value;

/// Strings (case-insensitive) that read as `true`.
const TRUE_WORDS: [&str; 3] = ["1", "y", "true"];

/// Interpret `value` as a boolean.
///
/// Rules, in order:
/// - missing or `null` → `default`
/// - booleans → themselves
/// - numbers → `false` for zero, `true` otherwise
/// - strings → `true` for `1`/`y`/`true` (any case), `false` for everything
///   else, including the empty string and unrecognised words
/// - lists → `false`
pub fn parse_truth(value: Option<&Value>, default: bool) -> bool {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::Bool(b)) => *b,
        Some(Value::Int(i)) => *i != 0,
        Some(Value::Float(x)) => *x != 0.0,
        Some(Value::String(s)) => TRUE_WORDS.iter().any(|w| s.eq_ignore_ascii_case(w)),
        Some(Value::List(_)) => false,
    }
}

/// Render a scalar as the string handed to the engine. `null` has no text.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Split a comma-separated list (`"a, b,,c"`) into trimmed, non-empty items.
/// A DSL list value is flattened the same way.
pub fn as_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::List(items) => items.iter().flat_map(as_list).collect(),
        other => other
            .to_string()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_null_and_missing_use_default() {
        assert!(parse_truth(None, true));
        assert!(!parse_truth(None, false));
        assert!(parse_truth(Some(&Value::Null), true));
        assert!(!parse_truth(Some(&Value::Null), false));
    }

    #[test]
    fn test_truth_table_true_values() {
        for v in [
            Value::Bool(true),
            Value::from("true"),
            Value::from("y"),
            Value::from("1"),
            Value::Int(1),
            Value::from("TRUE"),
            Value::from("Y"),
            Value::Int(-3),
            Value::Float(0.5),
        ] {
            assert!(parse_truth(Some(&v), false), "{:?} should be true", v);
        }
    }

    #[test]
    fn test_truth_table_false_values() {
        for v in [
            Value::Bool(false),
            Value::from("false"),
            Value::from("n"),
            Value::from("0"),
            Value::Int(0),
            Value::from(""),
            Value::from("asdf"),
            Value::Float(0.0),
            Value::List(vec![Value::Bool(true)]),
        ] {
            assert!(!parse_truth(Some(&v), true), "{:?} should be false", v);
        }
    }

    #[test]
    fn test_as_text() {
        assert_eq!(as_text(&Value::Int(42)), Some("42".to_string()));
        assert_eq!(as_text(&Value::Bool(false)), Some("false".to_string()));
        assert_eq!(as_text(&Value::Null), None);
    }

    #[test]
    fn test_as_list_splits_and_flattens() {
        assert_eq!(as_list(&Value::from("a, b,,c ")), vec!["a", "b", "c"]);
        let nested = Value::List(vec![Value::from("x"), Value::from("y,z")]);
        assert_eq!(as_list(&nested), vec!["x", "y", "z"]);
        assert!(as_list(&Value::Null).is_empty());
    }

    proptest! {
        #[test]
        fn prop_nonzero_integers_are_true(i in any::<i64>().prop_filter("nonzero", |i| *i != 0)) {
            prop_assert!(parse_truth(Some(&Value::Int(i)), false));
        }

        #[test]
        fn prop_unrecognised_strings_are_false(s in "[a-zA-Z0-9 ]{0,12}", default in any::<bool>()) {
            let lowered = s.to_ascii_lowercase();
            prop_assume!(!["1", "y", "true"].contains(&lowered.as_str()));
            prop_assert!(!parse_truth(Some(&Value::String(s)), default));
        }

        #[test]
        fn prop_null_always_yields_default(default in any::<bool>()) {
            prop_assert_eq!(parse_truth(Some(&Value::Null), default), default);
        }
    }
}
