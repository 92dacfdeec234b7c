//! Attribute allow-lists and enum-valued attribute parsing.

use crate::coerce::as_text;
use crate::input::ChangeLogParseError;
use crate::model::member_names;
use crate::parser::{Attributes, Node, Value};
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Fail on the first supplied key (in declaration order) that is not in
/// `allowed`. Runs before any value is read, so a rejected element leaves
/// nothing behind.
pub fn validate_attributes(
    element: &str,
    attributes: &Attributes,
    allowed: &[&str],
    context: &str,
) -> Result<(), ChangeLogParseError> {
    match attributes.keys().find(|key| !allowed.contains(key)) {
        Some(key) => Err(ChangeLogParseError::UnknownAttribute {
            element: element.to_string(),
            key: key.to_string(),
            context: context.to_string(),
        }),
        None => Ok(()),
    }
}

/// Reject an attribute the DSL used to accept under another name.
pub fn reject_renamed(
    element: &str,
    attributes: &Attributes,
    old: &str,
    replacement: &str,
    context: &str,
) -> Result<(), ChangeLogParseError> {
    if attributes.contains_key(old) {
        return Err(ChangeLogParseError::RenamedAttribute {
            element: element.to_string(),
            old: old.to_string(),
            replacement: replacement.to_string(),
            context: context.to_string(),
        });
    }
    Ok(())
}

/// Elements that only take named attributes.
pub fn reject_positional(node: &Node, context: &str) -> Result<(), ChangeLogParseError> {
    if node.args.is_empty() {
        return Ok(());
    }
    Err(ChangeLogParseError::InvalidValue {
        context: context.to_string(),
        message: format!("'{}' does not take positional values", node.name),
    })
}

/// Parse an enum member by its exact, case-sensitive engine name.
pub fn parse_enum<E>(attribute: &str, value: &Value, context: &str) -> Result<E, ChangeLogParseError>
where
    E: FromStr + IntoEnumIterator + Into<&'static str>,
{
    let raw = value.to_string();
    E::from_str(&raw).map_err(|_| ChangeLogParseError::InvalidEnumValue {
        attribute: attribute.to_string(),
        value: raw,
        valid: member_names::<E>(),
        context: context.to_string(),
    })
}

/// [`parse_enum`] for an attribute that may be absent or `null`.
pub fn optional_enum<E>(
    attributes: &Attributes,
    key: &str,
    context: &str,
) -> Result<Option<E>, ChangeLogParseError>
where
    E: FromStr + IntoEnumIterator + Into<&'static str>,
{
    match attributes.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_enum(key, value, context).map(Some),
    }
}

pub fn required_text(
    attributes: &Attributes,
    element: &str,
    key: &str,
    context: &str,
) -> Result<String, ChangeLogParseError> {
    attributes
        .get(key)
        .and_then(as_text)
        .ok_or_else(|| ChangeLogParseError::MissingAttribute {
            element: element.to_string(),
            attribute: key.to_string(),
            context: context.to_string(),
        })
}
