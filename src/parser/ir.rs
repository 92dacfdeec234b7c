//! Intermediate Representation (IR) for changelog DSL source
//!
//! The IR layer decouples the text grammar from the builders. A document is a
//! tree of [`Node`]s: a name, an ordered attribute map, positional arguments,
//! and nested child nodes. Rust callers can build the same tree directly with
//! the builder methods on [`Node`] instead of going through text.

use serde::Serialize;
use serde::ser::SerializeMap;
use std::fmt;

/// A loosely typed scalar (or list) value as written in the DSL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// Borrow the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

/// Ordered attribute map. Insertion order is the order the attributes were
/// written in, which keeps error messages pointing at the first offender.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, Value)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an earlier value in place if present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` into `self`; keys in `other` win.
    pub fn extend(&mut self, other: Attributes) {
        for (k, v) in other.entries {
            self.insert(k, v);
        }
    }
}

impl Serialize for Attributes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

/// One element of the DSL tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub attributes: Attributes,
    /// Positional (unnamed) arguments, e.g. the SQL text of `sql "..."`.
    pub args: Vec<Value>,
    pub children: Vec<Node>,
    /// 1-based source line, or 0 for nodes built in code.
    pub line: usize,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            args: Vec::new(),
            children: Vec::new(),
            line: 0,
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    /// Populate the child block through a closure, mirroring the nested
    /// block style of the text DSL.
    pub fn block(mut self, build: impl FnOnce(&mut Vec<Node>)) -> Self {
        build(&mut self.children);
        self
    }

    /// The first positional argument, if it is a string.
    pub fn text(&self) -> Option<&str> {
        self.args.first().and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_preserve_insertion_order() {
        let attrs: Attributes = [("b", 1), ("a", 2), ("c", 3)].into_iter().collect();
        let keys: Vec<&str> = attrs.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn attributes_insert_replaces_in_place() {
        let mut attrs = Attributes::new();
        attrs.insert("a", "one");
        attrs.insert("b", "two");
        attrs.insert("a", "three");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("a"), Some(&Value::from("three")));
        assert_eq!(attrs.keys().next(), Some("a"));
    }

    #[test]
    fn node_builder_collects_block_children() {
        let node = Node::new("changeSet")
            .attr("id", "cs1")
            .attr("author", "a")
            .block(|b| {
                b.push(
                    Node::new("renameTable")
                        .attr("oldTableName", "t1")
                        .attr("newTableName", "t2"),
                );
                b.push(Node::new("comment").arg("hello"));
            });
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[1].text(), Some("hello"));
    }

    #[test]
    fn value_display_renders_scalars_and_lists() {
        assert_eq!(Value::Int(5).to_string(), "5");
        assert_eq!(Value::from("x").to_string(), "x");
        let list = Value::List(vec![Value::Int(1), Value::from("a")]);
        assert_eq!(list.to_string(), "[1, a]");
    }

    #[test]
    fn attributes_serialize_as_ordered_json_object() {
        let attrs: Attributes = [("z", Value::from("1")), ("a", Value::Bool(true))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&attrs).expect("serialize");
        assert_eq!(json, r#"{"z":"1","a":true}"#);
    }
}
