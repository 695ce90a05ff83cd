//! Randomized inputs for identifier validation and statement classification.
//!
//! These tests throw random, malicious and edge-case strings at the two
//! gatekeepers that run before any SQL reaches the database.

mod common;

use common::{Gateway, read_only};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use sql_gateway_mcp::error::ErrorKind;
use sql_gateway_mcp::models::{Dialect, StatementIntent};
use sql_gateway_mcp::tools::format::OutputFormat;
use sql_gateway_mcp::tools::identifier::{MAX_IDENTIFIER_LEN, validate_identifier};
use sql_gateway_mcp::tools::{
    DescribeTableInput, ExecuteQueryInput, GetTableDataInput, KeywordClassifier,
    StatementClassifier,
};

const ITERATIONS: usize = 500;

/// Characters that must never survive into a quoted identifier.
const HOSTILE: &[char] = &[
    '\'', '"', '`', ';', '-', '/', '*', ' ', '\t', '\n', '\0', '\\', '(', ')', '[', ']', '=', '#',
];

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn random_printable(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            if rng.gen_bool(0.2) {
                *HOSTILE.choose(&mut rng).unwrap()
            } else {
                rng.gen_range(0x20u8..0x7f) as char
            }
        })
        .collect()
}

fn edge_case_strings() -> Vec<String> {
    vec![
        String::new(),
        " ".to_string(),
        "\n\r\t".to_string(),
        "\0".to_string(),
        "🚀".repeat(10),
        "'OR 1=1--".to_string(),
        "'; DROP TABLE users--".to_string(),
        "users/*".to_string(),
        "1' UNION SELECT NULL, NULL--".to_string(),
        "a".repeat(MAX_IDENTIFIER_LEN + 1),
        "a".repeat(100_000),
        "\u{0000}\u{FFFF}".to_string(),
        "..".to_string(),
        "schema.".to_string(),
    ]
}

fn is_plain_part(part: &str) -> bool {
    let mut chars = part.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && part.len() <= MAX_IDENTIFIER_LEN
}

#[test]
fn fuzz_identifier_acceptance_matches_grammar() {
    let mut rng = rand::thread_rng();
    for _ in 0..ITERATIONS {
        let len = rng.gen_range(0..40);
        let candidate = if rng.gen_bool(0.5) {
            random_string(len)
        } else {
            random_printable(len)
        };

        let expected = match candidate.split_once('.') {
            None => is_plain_part(&candidate),
            Some((schema, name)) => {
                !name.contains('.') && is_plain_part(schema) && is_plain_part(name)
            }
        };

        match validate_identifier(&candidate) {
            Ok(id) => {
                assert!(expected, "accepted {candidate:?}");
                let quoted = id.quoted(Dialect::PostgreSQL);
                assert!(!HOSTILE.iter().any(|c| *c != '"' && quoted.contains(*c)));
            }
            Err(e) => {
                assert!(!expected, "rejected {candidate:?}");
                assert_eq!(e.kind(), ErrorKind::InvalidIdentifier);
            }
        }
    }
}

#[test]
fn fuzz_identifier_edge_cases_rejected() {
    for candidate in edge_case_strings() {
        let err = validate_identifier(&candidate).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidIdentifier, "{candidate:?}");
    }
}

#[test]
fn fuzz_stacked_statements_always_counted() {
    let reads = ["SELECT 1", "SELECT * FROM t", "SHOW TABLES", "EXPLAIN SELECT 1"];
    let writes = ["DROP TABLE users", "DELETE FROM t", "INSERT INTO t VALUES (1)", "VACUUM"];
    let mut rng = rand::thread_rng();

    for dialect in [Dialect::PostgreSQL, Dialect::MySQL, Dialect::SQLite] {
        let classifier = KeywordClassifier::new(dialect);
        for _ in 0..ITERATIONS {
            let first = reads.choose(&mut rng).unwrap();
            let second = writes.choose(&mut rng).unwrap();
            let pad = " ".repeat(rng.gen_range(0..3));
            let sql = format!("{first}{pad};{pad}{second}{}", if rng.gen_bool(0.5) { ";" } else { "" });

            let stmt = classifier.classify(&sql);
            assert_eq!(stmt.statement_count, 2, "{sql:?}");
            assert_ne!(stmt.intent, StatementIntent::ReadOnly, "{sql:?}");
        }
    }
}

#[test]
fn fuzz_write_keyword_never_read_only() {
    let leads = ["INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE"];
    let mut rng = rand::thread_rng();
    let classifier = KeywordClassifier::new(Dialect::PostgreSQL);

    for _ in 0..ITERATIONS {
        let lead = leads.choose(&mut rng).unwrap();
        let lead = if rng.gen_bool(0.5) {
            lead.to_lowercase()
        } else {
            lead.to_string()
        };
        let prefix = ["", "  ", "\n", "/* hi */ ", "-- c\n"].choose(&mut rng).unwrap();
        let sql = format!("{prefix}{lead} {}", random_string(rng.gen_range(0..20)));
        let stmt = classifier.classify(&sql);
        assert_eq!(stmt.intent, StatementIntent::Mutating, "{sql:?}");
    }
}

#[test]
fn fuzz_classifier_never_panics() {
    let mut rng = rand::thread_rng();
    for dialect in [Dialect::PostgreSQL, Dialect::MySQL, Dialect::SQLite] {
        let classifier = KeywordClassifier::new(dialect);
        for _ in 0..ITERATIONS {
            let sql = random_printable(rng.gen_range(0..80));
            let stmt = classifier.classify(&sql);
            assert_eq!(stmt.sql, sql);
        }
        for sql in edge_case_strings() {
            classifier.classify(&sql);
        }
    }
}

#[tokio::test]
async fn fuzz_tools_reject_without_touching_data() {
    let gw = Gateway::shop(read_only()).await;
    let mut rng = rand::thread_rng();

    for _ in 0..50 {
        let name = random_printable(rng.gen_range(1..20));
        if validate_identifier(&name).is_ok() {
            continue;
        }
        let err = gw
            .data()
            .get_table_data(GetTableDataInput {
                table_name: name.clone(),
                schema: None,
                limit: Some(rng.gen_range(-10..1000)),
                format: OutputFormat::Json,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidIdentifier, "{name:?}");

        let err = gw
            .schema()
            .describe_table(DescribeTableInput {
                table_name: name.clone(),
                schema: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidIdentifier, "{name:?}");
    }

    for sql in edge_case_strings() {
        let result = gw
            .query()
            .execute_query(ExecuteQueryInput {
                sql,
                limit: None,
                format: OutputFormat::Json,
            })
            .await;
        if let Err(e) = result {
            assert_ne!(e.kind(), ErrorKind::ConnectionFailure);
        }
    }

    assert_eq!(gw.count("users").await, 5);
}
