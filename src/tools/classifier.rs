//! Statement classification for free-form SQL.
//!
//! The classifier decides whether a SQL string is read-only, mutating or
//! unknown by looking at keywords, not by parsing. It runs the text through
//! the [sqlparser](https://docs.rs/sqlparser/) tokenizer for the active
//! dialect so that keywords hidden in string literals, quoted identifiers and
//! comments are never matched, and so that semicolons inside literals do not
//! count as statement separators.
//!
//! Known edges:
//! - a statement led by `WITH`, `EXPLAIN`, `SHOW` or `DESCRIBE` is mutating if
//!   any write keyword appears later, even as part of `FOR UPDATE`;
//! - `INTO` anywhere after a read-only lead (`SELECT ... INTO`,
//!   `EXPLAIN ANALYZE SELECT ... INTO`) is mutating: it creates a table or a file;
//! - a MySQL executable comment (`/*! ... */`) makes the statement unknown.

use crate::models::{ClassifiedStatement, Dialect, StatementIntent};
use sqlparser::dialect::{
    Dialect as SqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};
use tracing::debug;

/// Leading keywords that start a read-only statement.
const READ_ONLY_KEYWORDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "EXPLAIN", "WITH"];

/// Leading keywords that start a mutating statement.
const MUTATING_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "MERGE", "UPSERT", "REPLACE", "DROP", "CREATE", "ALTER",
    "TRUNCATE", "GRANT", "REVOKE", "RENAME", "COMMENT",
];

/// Keywords that turn a read-only-looking statement into a write when they
/// appear after the leading keyword.
const EMBEDDED_WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "MERGE", "UPSERT", "DROP", "CREATE", "ALTER", "TRUNCATE",
    "GRANT", "REVOKE",
];

/// Leading keywords whose statement body is scanned for embedded writes.
const WRAPPING_KEYWORDS: &[&str] = &["WITH", "EXPLAIN", "SHOW", "DESCRIBE"];

/// Decides the intent of a raw SQL string.
///
/// Kept behind a trait so that a parser-backed implementation can replace
/// the keyword heuristic without touching the enforcer.
pub trait StatementClassifier: Send + Sync + std::fmt::Debug {
    fn classify(&self, sql: &str) -> ClassifiedStatement;
}

/// Keyword-prefix classifier using the dialect's lexical rules.
#[derive(Debug)]
pub struct KeywordClassifier {
    dialect: Dialect,
    lexer: Box<dyn SqlDialect + Send + Sync>,
}

impl KeywordClassifier {
    pub fn new(dialect: Dialect) -> Self {
        let lexer: Box<dyn SqlDialect + Send + Sync> = match dialect {
            Dialect::PostgreSQL => Box::new(PostgreSqlDialect {}),
            Dialect::MySQL => Box::new(MySqlDialect {}),
            Dialect::SQLite => Box::new(SQLiteDialect {}),
        };
        Self { dialect, lexer }
    }

    fn classify_tokens(&self, sql: &str, tokens: &[Token]) -> ClassifiedStatement {
        let mut statements: Vec<Verdict> = Vec::new();
        let mut current: Vec<&Token> = Vec::new();
        let mut executable_comment = false;

        for token in tokens.iter().chain(std::iter::once(&Token::SemiColon)) {
            match token {
                Token::SemiColon => {
                    if !current.is_empty() || executable_comment {
                        statements.push(classify_statement(&current, executable_comment));
                    }
                    current.clear();
                    executable_comment = false;
                }
                Token::Whitespace(Whitespace::MultiLineComment(body))
                    if self.dialect == Dialect::MySQL && body.starts_with('!') =>
                {
                    executable_comment = true;
                }
                Token::Whitespace(_) | Token::EOF => {}
                other => current.push(other),
            }
        }

        let statement_count = statements.len();
        let verdict = statements
            .into_iter()
            .reduce(|worst, next| if next.severity() > worst.severity() { next } else { worst })
            .unwrap_or(Verdict {
                intent: StatementIntent::Unknown,
                keyword: String::new(),
            });

        ClassifiedStatement {
            sql: sql.to_string(),
            intent: verdict.intent,
            keyword: verdict.keyword,
            statement_count,
        }
    }
}

impl StatementClassifier for KeywordClassifier {
    fn classify(&self, sql: &str) -> ClassifiedStatement {
        match Tokenizer::new(self.lexer.as_ref(), sql).tokenize() {
            Ok(tokens) => self.classify_tokens(sql, &tokens),
            Err(e) => {
                debug!(error = %e, "SQL tokenization failed, classifying as unknown");
                fallback_classification(sql)
            }
        }
    }
}

struct Verdict {
    intent: StatementIntent,
    keyword: String,
}

impl Verdict {
    fn severity(&self) -> u8 {
        match self.intent {
            StatementIntent::ReadOnly => 0,
            StatementIntent::Unknown => 1,
            StatementIntent::Mutating => 2,
        }
    }
}

/// Uppercased text of an unquoted word token.
fn bare_word(token: &Token) -> Option<String> {
    match token {
        Token::Word(word) if word.quote_style.is_none() => Some(word.value.to_ascii_uppercase()),
        _ => None,
    }
}

fn classify_statement(tokens: &[&Token], executable_comment: bool) -> Verdict {
    if executable_comment {
        return Verdict {
            intent: StatementIntent::Unknown,
            keyword: "/*!".to_string(),
        };
    }

    let Some(leading) = tokens.first().and_then(|t| bare_word(t)) else {
        let keyword = tokens.first().map(|t| t.to_string()).unwrap_or_default();
        return Verdict {
            intent: StatementIntent::Unknown,
            keyword,
        };
    };

    if MUTATING_KEYWORDS.contains(&leading.as_str()) {
        return Verdict {
            intent: StatementIntent::Mutating,
            keyword: leading,
        };
    }

    if !READ_ONLY_KEYWORDS.contains(&leading.as_str()) {
        return Verdict {
            intent: StatementIntent::Unknown,
            keyword: leading,
        };
    }

    let scans_body = WRAPPING_KEYWORDS.contains(&leading.as_str());
    for (pos, token) in tokens.iter().enumerate().skip(1) {
        let Some(word) = bare_word(token) else {
            continue;
        };
        // INTO after any read-only lead writes a table, file or variable
        if word == "INTO" {
            return Verdict {
                intent: StatementIntent::Mutating,
                keyword: format!("{leading} INTO"),
            };
        }
        if !scans_body || !EMBEDDED_WRITE_KEYWORDS.contains(&word.as_str()) {
            continue;
        }
        // SHOW CREATE TABLE only displays a definition
        if leading == "SHOW" && word == "CREATE" && pos == 1 {
            continue;
        }
        return Verdict {
            intent: StatementIntent::Mutating,
            keyword: word,
        };
    }

    Verdict {
        intent: StatementIntent::ReadOnly,
        keyword: leading,
    }
}

/// Classification when the text cannot be tokenized (e.g. an unterminated literal).
fn fallback_classification(sql: &str) -> ClassifiedStatement {
    let keyword = sql
        .split_whitespace()
        .next()
        .map(|w| w.to_ascii_uppercase())
        .unwrap_or_default();
    ClassifiedStatement {
        sql: sql.to_string(),
        intent: StatementIntent::Unknown,
        keyword,
        statement_count: sql.split(';').filter(|s| !s.trim().is_empty()).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(sql: &str) -> ClassifiedStatement {
        KeywordClassifier::new(Dialect::PostgreSQL).classify(sql)
    }

    fn intent(sql: &str) -> StatementIntent {
        classify(sql).intent
    }

    #[test]
    fn test_read_only_leading_keywords() {
        for sql in [
            "SELECT 1",
            "select * from users",
            "  \n\tSELECT id FROM t",
            "SHOW search_path",
            "DESCRIBE users",
            "EXPLAIN SELECT * FROM users",
            "WITH x AS (SELECT 1) SELECT * FROM x",
        ] {
            assert_eq!(intent(sql), StatementIntent::ReadOnly, "{sql}");
        }
    }

    #[test]
    fn test_mutating_leading_keywords() {
        for sql in [
            "INSERT INTO t VALUES (1)",
            "update t set a = 1",
            "DELETE FROM users",
            "DROP TABLE users",
            "CREATE TABLE x (id int)",
            "ALTER TABLE x ADD COLUMN y int",
            "TRUNCATE users",
            "GRANT SELECT ON t TO bob",
            "REVOKE ALL ON t FROM bob",
        ] {
            let c = classify(sql);
            assert_eq!(c.intent, StatementIntent::Mutating, "{sql}");
        }
    }

    #[test]
    fn test_unknown_leading_keyword() {
        let c = classify("VACUUM");
        assert_eq!(c.intent, StatementIntent::Unknown);
        assert_eq!(c.keyword, "VACUUM");
        assert_eq!(intent("CALL do_things()"), StatementIntent::Unknown);
        assert_eq!(intent("BEGIN"), StatementIntent::Unknown);
    }

    #[test]
    fn test_leading_comments_are_skipped() {
        assert_eq!(intent("-- note\nSELECT 1"), StatementIntent::ReadOnly);
        assert_eq!(intent("/* hi */ DELETE FROM t"), StatementIntent::Mutating);
    }

    #[test]
    fn test_cte_wrapping_write_is_mutating() {
        let c = classify("WITH x AS (SELECT 1) INSERT INTO t SELECT * FROM x");
        assert_eq!(c.intent, StatementIntent::Mutating);
        assert_eq!(c.keyword, "INSERT");
        assert_eq!(
            intent("WITH d AS (DELETE FROM t RETURNING *) SELECT * FROM d"),
            StatementIntent::Mutating
        );
    }

    #[test]
    fn test_explain_wrapping_write_is_mutating() {
        assert_eq!(intent("EXPLAIN DELETE FROM users"), StatementIntent::Mutating);
        assert_eq!(
            intent("EXPLAIN ANALYZE UPDATE users SET a = 1"),
            StatementIntent::Mutating
        );
    }

    #[test]
    fn test_explain_select_into_is_mutating() {
        let c = classify("EXPLAIN ANALYZE SELECT * INTO backup FROM users");
        assert_eq!(c.intent, StatementIntent::Mutating);
        assert_eq!(c.keyword, "EXPLAIN INTO");

        let mysql = KeywordClassifier::new(Dialect::MySQL);
        assert_eq!(
            mysql.classify("DESCRIBE SELECT id INTO OUTFILE '/tmp/x' FROM users").intent,
            StatementIntent::Mutating
        );
        let sqlite = KeywordClassifier::new(Dialect::SQLite);
        assert_eq!(
            sqlite
                .classify("WITH x AS (SELECT * FROM users) REPLACE INTO users SELECT * FROM x")
                .intent,
            StatementIntent::Mutating
        );
    }

    #[test]
    fn test_show_create_is_read_only() {
        let c = KeywordClassifier::new(Dialect::MySQL).classify("SHOW CREATE TABLE users");
        assert_eq!(c.intent, StatementIntent::ReadOnly);
    }

    #[test]
    fn test_select_into_is_mutating() {
        assert_eq!(intent("SELECT * INTO backup FROM users"), StatementIntent::Mutating);
    }

    #[test]
    fn test_keywords_inside_literals_are_ignored() {
        assert_eq!(
            intent("SELECT 'DELETE FROM users; DROP TABLE x' AS s"),
            StatementIntent::ReadOnly
        );
        assert_eq!(
            intent("WITH x AS (SELECT \"delete\" FROM t) SELECT * FROM x"),
            StatementIntent::ReadOnly
        );
        assert_eq!(
            intent("WITH x AS (SELECT 1 /* insert */) SELECT * FROM x"),
            StatementIntent::ReadOnly
        );
        let c = classify("SELECT 'a;b;c'");
        assert_eq!(c.statement_count, 1);
    }

    #[test]
    fn test_statement_counting() {
        assert_eq!(classify("SELECT 1").statement_count, 1);
        assert_eq!(classify("SELECT 1;").statement_count, 1);
        assert_eq!(classify("SELECT 1;;  ;").statement_count, 1);
        assert_eq!(classify("SELECT 1; DROP TABLE users;").statement_count, 2);
        assert_eq!(classify("").statement_count, 0);
        assert_eq!(classify("  -- only a comment").statement_count, 0);
    }

    #[test]
    fn test_stacked_statement_reports_worst_intent() {
        let c = classify("SELECT 1; DROP TABLE users;");
        assert!(c.is_stacked());
        assert_eq!(c.intent, StatementIntent::Mutating);
        assert_eq!(c.keyword, "DROP");
    }

    #[test]
    fn test_unterminated_literal_falls_back() {
        let c = classify("SELECT 'oops; DROP TABLE users");
        assert_eq!(c.intent, StatementIntent::Unknown);
        assert_eq!(c.statement_count, 2);
    }

    #[test]
    fn test_mysql_hash_comment() {
        let c = KeywordClassifier::new(Dialect::MySQL).classify("# DELETE\nSELECT 1");
        assert_eq!(c.intent, StatementIntent::ReadOnly);
    }

    #[test]
    fn test_sqlite_dialect() {
        let c = KeywordClassifier::new(Dialect::SQLite).classify("select * from [users]");
        assert_eq!(c.intent, StatementIntent::ReadOnly);
        assert_eq!(c.keyword, "SELECT");
    }
}
