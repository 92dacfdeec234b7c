//! Changelog properties and `${name}` token expansion.
//!
//! Properties are collected in declaration order into one table per parse
//! session. The first applicable definition of a name wins; applicability
//! depends on the binding's `global` flag and on its context/labels/dbms
//! scoping versus the runtime scope the parse was started with.

use crate::model::PropertyBinding;
use crate::parser::{Attributes, Value};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("token pattern is valid"));

/// The runtime selection a parse is performed for. Empty/unset members
/// match every binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeScope {
    pub contexts: Vec<String>,
    pub labels: Vec<String>,
    pub database: Option<String>,
}

impl RuntimeScope {
    pub fn matches(&self, binding: &PropertyBinding) -> bool {
        overlaps(binding.context.as_deref(), &self.contexts)
            && overlaps(binding.labels.as_deref(), &self.labels)
            && binding
                .dbms
                .as_deref()
                .is_none_or(|dbms| dbms_matches(dbms, self.database.as_deref()))
    }
}

fn split_items(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn overlaps(declared: Option<&str>, active: &[String]) -> bool {
    let Some(declared) = declared else {
        return true;
    };
    if active.is_empty() || split_items(declared).next().is_none() {
        return true;
    }
    split_items(declared).any(|d| active.iter().any(|a| a.eq_ignore_ascii_case(d)))
}

/// `dbms` lists accept `all`, and `!name` to exclude a database.
fn dbms_matches(declared: &str, database: Option<&str>) -> bool {
    let Some(database) = database else {
        return true;
    };
    let mut has_positive = false;
    for item in split_items(declared) {
        if let Some(negated) = item.strip_prefix('!') {
            if negated.trim().eq_ignore_ascii_case(database) {
                return false;
            }
        } else {
            has_positive = true;
            if item.eq_ignore_ascii_case(database) || item.eq_ignore_ascii_case("all") {
                return true;
            }
        }
    }
    !has_positive
}

/// Property bindings of one parse session, in definition order.
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    bindings: Vec<PropertyBinding>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, binding: PropertyBinding) {
        tracing::debug!(
            name = %binding.name,
            document = %binding.source_document,
            global = binding.global,
            "defined changelog property"
        );
        self.bindings.push(binding);
    }

    /// Value of `name` as seen from `document` under `scope`.
    pub fn lookup(&self, name: &str, document: &str, scope: &RuntimeScope) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| {
                b.name == name && (b.global || b.source_document == document) && scope.matches(b)
            })
            .map(|b| b.value.as_str())
    }

    /// Replace each `${name}` in `text` in a single left-to-right pass.
    /// Replacement text is not rescanned; unresolved tokens stay verbatim.
    pub fn expand(&self, text: &str, document: &str, scope: &RuntimeScope) -> String {
        if !text.contains("${") {
            return text.to_string();
        }
        TOKEN
            .replace_all(text, |caps: &Captures| {
                match self.lookup(&caps[1], document, scope) {
                    Some(value) => value.to_string(),
                    None => {
                        tracing::debug!(token = &caps[0], document, "unresolved property token");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    pub fn bindings(&self) -> &[PropertyBinding] {
        &self.bindings
    }

    pub fn into_bindings(self) -> Vec<PropertyBinding> {
        self.bindings
    }
}

/// Token expansion bound to one document and runtime scope.
#[derive(Clone, Copy)]
pub struct Expander<'a> {
    table: &'a PropertyTable,
    document: &'a str,
    scope: &'a RuntimeScope,
}

impl<'a> Expander<'a> {
    pub fn new(table: &'a PropertyTable, document: &'a str, scope: &'a RuntimeScope) -> Self {
        Self {
            table,
            document,
            scope,
        }
    }

    pub fn expand(&self, text: &str) -> String {
        self.table.expand(text, self.document, self.scope)
    }

    /// Expand string values (list members included); other scalars pass
    /// through untouched.
    pub fn value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.expand(s)),
            Value::List(items) => Value::List(items.iter().map(|v| self.value(v)).collect()),
            other => other.clone(),
        }
    }

    pub fn attributes(&self, attributes: &Attributes) -> Attributes {
        attributes
            .iter()
            .map(|(key, value)| (key, self.value(value)))
            .collect()
    }
}

/// Parse `.properties` text: `key=value`, `key: value` or `key value`
/// entries, `#`/`!` comment lines, trailing-backslash continuations.
/// A repeated key keeps its first position and takes the later value.
pub fn parse_properties(text: &str) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();
    let mut logical = String::new();

    for raw in text.lines() {
        let line = raw.trim_start();
        if logical.is_empty() && (line.is_empty() || line.starts_with(['#', '!'])) {
            continue;
        }
        match continued(line) {
            Some(head) => logical.push_str(head),
            None => {
                logical.push_str(line);
                upsert(&mut entries, split_entry(&logical));
                logical.clear();
            }
        }
    }
    if !logical.is_empty() {
        upsert(&mut entries, split_entry(&logical));
    }
    entries
}

/// The line minus its continuation backslash, if it has one. An escaped
/// backslash (`\\`) at the end does not continue the line.
fn continued(line: &str) -> Option<&str> {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    (trailing % 2 == 1).then(|| &line[..line.len() - 1])
}

/// Split at the first unescaped `=`, `:` or whitespace, then decode escapes
/// in both halves.
fn split_entry(line: &str) -> (String, String) {
    let mut escaped = false;
    let mut separator = None;
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || c.is_whitespace() {
            separator = Some(idx);
            break;
        }
    }
    match separator {
        Some(idx) => {
            let rest = line[idx..].trim_start();
            let rest = rest.strip_prefix(['=', ':']).unwrap_or(rest).trim_start();
            (unescape(&line[..idx]), unescape(rest))
        }
        None => (unescape(line), String::new()),
    }
}

/// Decode `\t`, `\n`, `\r`, `\f` and `\uXXXX`; any other escaped character
/// stands for itself. A malformed `\u` escape is kept as written.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    // UTF-16 units from consecutive `\u` escapes, so surrogate pairs decode.
    let mut units: Vec<u16> = Vec::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'u') {
            chars.next();
            let hex: String = chars.by_ref().take(4).collect();
            if hex.len() == 4 && hex.chars().all(|h| h.is_ascii_hexdigit()) {
                if let Ok(unit) = u16::from_str_radix(&hex, 16) {
                    units.push(unit);
                    continue;
                }
            }
            flush_units(&mut out, &mut units);
            out.push_str("\\u");
            out.push_str(&hex);
            continue;
        }
        flush_units(&mut out, &mut units);
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    flush_units(&mut out, &mut units);
    out
}

fn flush_units(out: &mut String, units: &mut Vec<u16>) {
    out.extend(
        char::decode_utf16(units.drain(..)).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}

fn upsert(entries: &mut Vec<(String, String)>, (key, value): (String, String)) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(name: &str, value: &str) -> PropertyBinding {
        PropertyBinding {
            name: name.to_string(),
            value: value.to_string(),
            context: None,
            labels: None,
            dbms: None,
            global: true,
            source_document: "main.changelog".to_string(),
        }
    }

    #[test]
    fn test_expand_replaces_known_tokens() {
        let mut table = PropertyTable::new();
        table.define(binding("env", "prod"));
        let scope = RuntimeScope::default();
        assert_eq!(table.expand("db-${env}", "main.changelog", &scope), "db-prod");
    }

    #[test]
    fn test_expand_leaves_unknown_tokens() {
        let table = PropertyTable::new();
        let scope = RuntimeScope::default();
        assert_eq!(
            table.expand("x ${missing} y", "main.changelog", &scope),
            "x ${missing} y"
        );
    }

    #[test]
    fn test_expand_is_single_pass() {
        let mut table = PropertyTable::new();
        table.define(binding("a", "${b}"));
        table.define(binding("b", "deep"));
        let scope = RuntimeScope::default();
        assert_eq!(table.expand("${a}", "main.changelog", &scope), "${b}");
    }

    #[test]
    fn test_first_definition_wins() {
        let mut table = PropertyTable::new();
        table.define(binding("env", "first"));
        table.define(binding("env", "second"));
        assert_eq!(
            table.lookup("env", "main.changelog", &RuntimeScope::default()),
            Some("first")
        );
    }

    #[test]
    fn test_local_binding_only_visible_in_its_document() {
        let mut table = PropertyTable::new();
        let mut local = binding("schema", "app");
        local.global = false;
        table.define(local);
        let scope = RuntimeScope::default();
        assert_eq!(table.lookup("schema", "main.changelog", &scope), Some("app"));
        assert_eq!(table.lookup("schema", "other.changelog", &scope), None);
    }

    #[test]
    fn test_scoped_bindings_follow_runtime_scope() {
        let mut table = PropertyTable::new();
        let mut pg = binding("type", "text");
        pg.dbms = Some("postgresql".to_string());
        let mut other = binding("type", "clob");
        other.dbms = Some("!postgresql".to_string());
        table.define(pg);
        table.define(other);

        let postgres = RuntimeScope {
            database: Some("postgresql".to_string()),
            ..RuntimeScope::default()
        };
        let oracle = RuntimeScope {
            database: Some("oracle".to_string()),
            ..RuntimeScope::default()
        };
        assert_eq!(table.lookup("type", "main.changelog", &postgres), Some("text"));
        assert_eq!(table.lookup("type", "main.changelog", &oracle), Some("clob"));
    }

    #[test]
    fn test_context_overlap_is_case_insensitive() {
        let mut b = binding("x", "1");
        b.context = Some("Dev, test".to_string());
        let scope = RuntimeScope {
            contexts: vec!["TEST".to_string()],
            ..RuntimeScope::default()
        };
        assert!(scope.matches(&b));
        let prod = RuntimeScope {
            contexts: vec!["prod".to_string()],
            ..RuntimeScope::default()
        };
        assert!(!prod.matches(&b));
    }

    #[test]
    fn test_dbms_all_matches_everything() {
        assert!(dbms_matches("all", Some("h2")));
        assert!(!dbms_matches("postgresql, oracle", Some("h2")));
        assert!(dbms_matches("postgresql", None));
    }

    #[test]
    fn test_expander_expands_nested_list_values() {
        let mut table = PropertyTable::new();
        table.define(binding("t", "users"));
        let scope = RuntimeScope::default();
        let expander = Expander::new(&table, "main.changelog", &scope);
        let value = Value::List(vec![Value::from("${t}"), Value::Int(3)]);
        assert_eq!(
            expander.value(&value),
            Value::List(vec![Value::from("users"), Value::Int(3)])
        );
    }

    #[test]
    fn test_parse_properties_formats() {
        let text = "# comment\n! also comment\n\na=1\nb: 2\nc 3\nd = four words\nlong = one \\\n    two\na=override\n";
        let entries = parse_properties(text);
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), "override".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
                ("d".to_string(), "four words".to_string()),
                ("long".to_string(), "one two".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_properties_escaped_backslash_does_not_continue() {
        let entries = parse_properties("path=C:\\\\\nnext=1\n");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, "C:\\");
    }

    #[test]
    fn test_parse_properties_decodes_escapes() {
        let text = "path=C:\\\\dir\nkey\\=x=1\nuni=caf\\u00e9\ntab=a\\tb\nspaced\\ key = v\nemoji=\\ud83d\\ude00\nbad=\\u12\n";
        let entries = parse_properties(text);
        assert_eq!(
            entries,
            vec![
                ("path".to_string(), "C:\\dir".to_string()),
                ("key=x".to_string(), "1".to_string()),
                ("uni".to_string(), "caf\u{e9}".to_string()),
                ("tab".to_string(), "a\tb".to_string()),
                ("spaced key".to_string(), "v".to_string()),
                ("emoji".to_string(), "\u{1f600}".to_string()),
                ("bad".to_string(), "\\u12".to_string()),
            ]
        );
    }
}
