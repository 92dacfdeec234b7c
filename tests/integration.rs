//! Integration tests: parse fixture changelogs from disk and check the
//! resulting document.

use changelog_dsl::input::{ChangeLogParser, FileSystemAccessor, ParserOptions, RuntimeScope};
use changelog_dsl::model::{
    ChangeKind, FailOption, ObjectQuotingStrategy, Precondition, PreconditionKind,
    SqlVisitorKind, ValidationFailOption,
};
use changelog_dsl::{ChangeLogDocument, ChangeLogParseError, Value};
use std::fs;
use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/changelogs")
}

fn parse_fixture(path: &str) -> Result<ChangeLogDocument, ChangeLogParseError> {
    ChangeLogParser::from_dir(fixtures_dir()).parse(path)
}

fn change_set_ids(document: &ChangeLogDocument) -> Vec<&str> {
    document.change_sets.iter().map(|cs| cs.id.as_str()).collect()
}

fn write(dir: &Path, path: &str, content: &str) {
    let full = dir.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture dir");
    }
    fs::write(full, content).expect("Failed to write fixture file");
}

// ---------------------------------------------------------------------------
// Basic document
// ---------------------------------------------------------------------------

#[test]
fn test_basic_changelog_end_to_end() {
    let document = parse_fixture("basic/main.changelog").expect("basic changelog parses");

    assert_eq!(document.physical_file_path, "basic/main.changelog");
    assert_eq!(document.logical_file_path, "db/main");
    assert_eq!(change_set_ids(&document), vec!["cs1", "cs2"]);

    let cs1 = &document.change_sets[0];
    assert_eq!(cs1.author, "a");
    assert_eq!(cs1.file_path, "db/main");
    assert!(cs1.run_on_change);
    assert!(!cs1.run_always);
    assert!(cs1.run_in_transaction);
    assert_eq!(cs1.comments.as_deref(), Some("rename the legacy table"));
    assert_eq!(cs1.changes.len(), 1);
    assert_eq!(cs1.changes[0].kind, ChangeKind::RenameTable);
    assert_eq!(cs1.changes[0].attribute("oldTableName"), Some("t1"));
    assert_eq!(cs1.changes[0].attribute("newTableName"), Some("db-prod"));
    assert_eq!(cs1.rollback.len(), 1);
    assert_eq!(cs1.rollback[0].attribute("oldTableName"), Some("db-prod"));

    assert_eq!(document.properties.len(), 1);
    assert_eq!(document.properties[0].name, "env");
}

#[test]
fn test_constraints_merge_and_text_bodies() {
    let document = parse_fixture("basic/main.changelog").expect("basic changelog parses");
    let cs2 = &document.change_sets[1];
    assert_eq!(cs2.labels, vec!["reporting", "nightly"]);

    let create = &cs2.changes[0];
    assert_eq!(create.kind, ChangeKind::CreateTable);
    assert_eq!(create.columns.len(), 2);
    let constraints = create.columns[0]
        .constraints
        .as_ref()
        .expect("id column has constraints");
    assert_eq!(constraints.attributes.get("nullable"), Some(&Value::Bool(false)));
    assert_eq!(constraints.attributes.get("primaryKey"), Some(&Value::Bool(true)));
    assert_eq!(
        constraints.attributes.get("primaryKeyName"),
        Some(&Value::from("pk_audit"))
    );
    assert!(create.columns[1].constraints.is_none());

    let sql = &cs2.changes[1];
    assert_eq!(sql.kind, ChangeKind::Sql);
    assert_eq!(
        sql.text.as_deref().map(str::trim),
        Some("insert into audit (id, payload) values (1, 'seed')")
    );
    assert_eq!(cs2.rollback[0].text.as_deref(), Some("drop table audit"));
}

#[test]
fn test_preconditions_and_change_set_options() {
    let document = parse_fixture("preconditions/main.changelog").expect("changelog parses");
    assert_eq!(
        document.object_quoting_strategy,
        Some(ObjectQuotingStrategy::QuoteOnlyReservedWords)
    );

    let cs = &document.change_sets[0];
    assert_eq!(cs.fail_on_error, Some(false));
    assert_eq!(cs.on_validation_fail, ValidationFailOption::MarkRan);
    assert_eq!(
        cs.object_quoting_strategy,
        Some(ObjectQuotingStrategy::QuoteOnlyReservedWords)
    );
    assert_eq!(cs.valid_checksums, vec!["ANY"]);

    let pre = cs.preconditions.as_ref().expect("change set preconditions");
    assert_eq!(pre.on_fail, Some(FailOption::MarkRan));
    assert_eq!(pre.on_error, Some(FailOption::Halt));
    assert_eq!(pre.on_fail_message.as_deref(), Some("table already gone"));
    let Precondition::And(and) = &pre.nested[0] else {
        panic!("expected and, got {:?}", pre.nested[0]);
    };
    assert_eq!(and.len(), 2);
    let Precondition::Not(not) = &and[1] else {
        panic!("expected not, got {:?}", and[1]);
    };
    let Precondition::Check(check) = &not[0] else {
        panic!("expected check, got {:?}", not[0]);
    };
    assert_eq!(check.kind, PreconditionKind::SqlCheck);
    assert_eq!(check.sql.as_deref(), Some("select count(*) from legacy"));
    assert_eq!(check.attributes.get("expectedResult"), Some(&Value::Int(0)));

    assert_eq!(
        cs.sql_visitors[0].kind,
        SqlVisitorKind::Append {
            value: " cascade".to_string()
        }
    );
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn test_property_file_and_first_definition_wins() {
    let document = parse_fixture("properties/main.changelog").expect("changelog parses");
    let cs = &document.change_sets[0];
    assert_eq!(cs.context.as_deref(), Some("staging"));

    let add = &cs.changes[0];
    assert_eq!(add.attribute("schemaName"), Some("app"));
    // Later duplicate inside the file overwrites; the changelog's own
    // definition comes after the file and loses.
    assert_eq!(add.attribute("tableName"), Some("final_users"));
    assert_eq!(add.columns[0].attributes.get("type"), Some(&Value::from("text")));

    // Unresolved tokens survive verbatim.
    assert_eq!(
        cs.changes[1].text.as_deref(),
        Some("select '${undefined.token}'")
    );
}

#[test]
fn test_dbms_scoped_property_follows_runtime_database() {
    let options = ParserOptions {
        scope: RuntimeScope {
            database: Some("oracle".to_string()),
            ..RuntimeScope::default()
        },
        ..ParserOptions::default()
    };
    let document = ChangeLogParser::from_dir(fixtures_dir())
        .with_options(options)
        .parse("properties/main.changelog")
        .expect("changelog parses");
    let column = &document.change_sets[0].changes[0].columns[0];
    assert_eq!(column.attributes.get("type"), Some(&Value::from("clob")));
}

#[test]
fn test_local_property_not_visible_in_included_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write(
        dir.path(),
        "main.changelog",
        r#"databaseChangeLog {
  property name: "local", value: "mine", global: false
  property name: "shared", value: "ours"
  include file: "child.changelog"
}"#,
    );
    write(
        dir.path(),
        "child.changelog",
        r#"databaseChangeLog {
  changeSet(id: "c", author: "x") {
    tagDatabase tag: "${shared}-${local}"
  }
}"#,
    );
    let document = ChangeLogParser::from_dir(dir.path())
        .parse("main.changelog")
        .expect("changelog parses");
    assert_eq!(
        document.change_sets[0].changes[0].attribute("tag"),
        Some("ours-${local}")
    );
}

// ---------------------------------------------------------------------------
// include / includeAll
// ---------------------------------------------------------------------------

#[test]
fn test_include_all_splices_sorted_files_in_place() {
    let document = parse_fixture("include_all/main.changelog").expect("changelog parses");
    assert_eq!(
        change_set_ids(&document),
        vec!["root-0", "a-1", "b-2", "root-9"]
    );
    assert_eq!(
        document.change_sets[1].file_path,
        "include_all/changes/a-1.changelog"
    );

    let pre = document
        .preconditions
        .as_ref()
        .expect("included preconditions spliced into root");
    assert_eq!(pre.nested.len(), 1);
    assert_eq!(pre.on_fail, None);
}

#[test]
fn test_include_all_order_ignores_creation_order() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let change = |id: &str| {
        format!(
            "databaseChangeLog {{\n  changeSet(id: \"{}\", author: \"x\") {{ empty }}\n}}\n",
            id
        )
    };
    // Created out of name order.
    write(dir.path(), "changes/b-2.changelog", &change("b-2"));
    write(dir.path(), "changes/a-1.changelog", &change("a-1"));
    write(dir.path(), "changes/B-0.changelog", &change("B-0"));
    write(
        dir.path(),
        "main.changelog",
        r#"databaseChangeLog { includeAll path: "changes" }"#,
    );

    let document = ChangeLogParser::from_dir(dir.path())
        .parse("main.changelog")
        .expect("changelog parses");
    assert_eq!(change_set_ids(&document), vec!["B-0", "a-1", "b-2"]);
}

#[test]
fn test_relative_include_and_optional_missing_file() {
    let document = parse_fixture("relative/main.changelog").expect("changelog parses");
    assert_eq!(change_set_ids(&document), vec!["child-1"]);
    assert_eq!(
        document.change_sets[0].file_path,
        "relative/sub/child.changelog"
    );
}

#[test]
fn test_missing_include_is_error_by_default() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write(
        dir.path(),
        "main.changelog",
        r#"databaseChangeLog { include file: "nope.changelog" }"#,
    );
    let err = ChangeLogParser::from_dir(dir.path())
        .parse("main.changelog")
        .unwrap_err();
    assert!(
        matches!(&err, ChangeLogParseError::Io { path, .. } if path == "nope.changelog"),
        "got: {:?}",
        err
    );
}

#[test]
fn test_include_path_attribute_points_to_include_all() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write(
        dir.path(),
        "main.changelog",
        r#"databaseChangeLog { include path: "changes" }"#,
    );
    let err = ChangeLogParser::from_dir(dir.path())
        .parse("main.changelog")
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"main.changelog: 'path' is no longer supported on 'include'; use 'includeAll' instead");
}

#[test]
fn test_include_all_empty_directory_policy() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::create_dir_all(dir.path().join("empty")).expect("Failed to create dir");
    write(dir.path(), "empty/notes.txt", "not a changelog");
    write(
        dir.path(),
        "strict.changelog",
        r#"databaseChangeLog { includeAll path: "empty" }"#,
    );
    write(
        dir.path(),
        "lenient.changelog",
        r#"databaseChangeLog { includeAll path: "empty", errorIfMissingOrEmpty: false }"#,
    );
    let parser = ChangeLogParser::from_dir(dir.path());

    let err = parser.parse("strict.changelog").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"includeAll path 'empty' contains no changelog files");

    let document = parser.parse("lenient.changelog").expect("lenient parse");
    assert!(document.change_sets.is_empty());
}

#[test]
fn test_include_all_missing_directory_policy() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write(
        dir.path(),
        "strict.changelog",
        r#"databaseChangeLog { includeAll path: "absent" }"#,
    );
    write(
        dir.path(),
        "lenient.changelog",
        r#"databaseChangeLog { includeAll path: "absent", errorIfMissingOrEmpty: "false" }"#,
    );
    let parser = ChangeLogParser::from_dir(dir.path());

    let err = parser.parse("strict.changelog").unwrap_err();
    assert!(
        matches!(err, ChangeLogParseError::MissingOrEmptyIncludePath { missing: true, .. }),
        "got: {:?}",
        err
    );
    assert!(parser.parse("lenient.changelog").is_ok());
}

#[test]
fn test_include_all_resource_filter() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let change = |id: &str| {
        format!(
            "databaseChangeLog {{\n  changeSet(id: \"{}\", author: \"x\") {{ empty }}\n}}\n",
            id
        )
    };
    write(dir.path(), "changes/001-keep.changelog", &change("keep"));
    write(dir.path(), "changes/002-draft.changelog", &change("draft"));
    write(
        dir.path(),
        "main.changelog",
        r#"databaseChangeLog { includeAll path: "changes", resourceFilter: "noDrafts" }"#,
    );

    let mut parser = ChangeLogParser::new(FileSystemAccessor::new(dir.path()));
    parser
        .filters_mut()
        .register("noDrafts", || |path: &str| !path.contains("draft"));
    let document = parser.parse("main.changelog").expect("changelog parses");
    assert_eq!(change_set_ids(&document), vec!["keep"]);

    write(
        dir.path(),
        "unknown.changelog",
        r#"databaseChangeLog { includeAll path: "changes", resourceFilter: "nope" }"#,
    );
    assert!(matches!(
        parser.parse("unknown.changelog"),
        Err(ChangeLogParseError::UnknownResourceFilter { .. })
    ));
}

#[test]
fn test_circular_include_detected() {
    let err = parse_fixture("cycle/a.changelog").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"circular include of 'cycle/a.changelog' (include chain: cycle/a.changelog -> cycle/b.changelog -> cycle/a.changelog)");
}

#[test]
fn test_include_all_of_own_directory_is_circular() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write(
        dir.path(),
        "db/main.changelog",
        r#"databaseChangeLog { includeAll path: ".", relativeToChangelogFile: true }"#,
    );
    let err = ChangeLogParser::from_dir(dir.path())
        .parse("db/main.changelog")
        .unwrap_err();
    assert!(matches!(err, ChangeLogParseError::CircularInclude { .. }));
}

// ---------------------------------------------------------------------------
// Error reporting
// ---------------------------------------------------------------------------

#[test]
fn test_always_run_hint() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write(
        dir.path(),
        "main.changelog",
        r#"databaseChangeLog {
  changeSet(id: "cs1", author: "a", alwaysRun: true) {
    empty
  }
}"#,
    );
    let err = ChangeLogParser::from_dir(dir.path())
        .parse("main.changelog")
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"main.changelog: changeSet 'cs1': 'alwaysRun' is no longer supported on 'changeSet'; use 'runAlways' instead");
}

#[test]
fn test_syntax_error_reports_line() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write(
        dir.path(),
        "main.changelog",
        "databaseChangeLog {\n  changeSet(id: \"1\", author: ) {\n  }\n}\n",
    );
    let err = ChangeLogParser::from_dir(dir.path())
        .parse("main.changelog")
        .unwrap_err();
    match err {
        ChangeLogParseError::Syntax { path, line, .. } => {
            assert_eq!(path, "main.changelog");
            assert_eq!(line, 2);
        }
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_rejected_element_leaves_no_partial_document() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write(
        dir.path(),
        "main.changelog",
        r#"databaseChangeLog {
  changeSet(id: "ok", author: "a") { empty }
  changeSet(id: "bad", author: "a") {
    dropTable tableName: "t", purge: true
  }
}"#,
    );
    let err = ChangeLogParser::from_dir(dir.path())
        .parse("main.changelog")
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"main.changelog: changeSet 'bad': 'purge' is not a valid attribute of 'dropTable'");
}

#[test]
fn test_parse_source_without_file() {
    let parser = ChangeLogParser::from_dir(fixtures_dir());
    let document = parser
        .parse_source(
            r#"databaseChangeLog {
  include file: "relative/sub/child.changelog"
  changeSet(id: "inline", author: "a") { stop "halt here" }
}"#,
            "inline.changelog",
        )
        .expect("inline changelog parses");
    assert_eq!(change_set_ids(&document), vec!["child-1", "inline"]);
    assert_eq!(
        document.change_sets[1].changes[0].text.as_deref(),
        Some("halt here")
    );
}
