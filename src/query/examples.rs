//! Example SQL built from the tables currently loaded.

/// Example queries referencing the given table names.
///
/// One table gets select / filter / group-by examples; two or more get join
/// examples over the first two.
pub fn example_queries<S: AsRef<str>>(table_names: &[S]) -> String {
    match table_names {
        [] => "SELECT * FROM table_name LIMIT 10;".to_string(),
        [only] => {
            let t = quote_if_needed(only.as_ref());
            format!(
                "-- All rows\n\
                 SELECT * FROM {t};\n\
                 \n\
                 -- Filter\n\
                 SELECT * FROM {t} WHERE column_name > 100;\n\
                 \n\
                 -- Group and aggregate\n\
                 SELECT column_name, COUNT(*), AVG(value)\n\
                 FROM {t}\n\
                 GROUP BY column_name;"
            )
        }
        [first, second, ..] => {
            let a = quote_if_needed(first.as_ref());
            let b = quote_if_needed(second.as_ref());
            format!(
                "-- Join two tables\n\
                 SELECT a.*, b.column_name\n\
                 FROM {a} a\n\
                 JOIN {b} b ON a.id = b.id;\n\
                 \n\
                 -- Join with grouping\n\
                 SELECT a.category, COUNT(*) AS count, AVG(b.value) AS avg_value\n\
                 FROM {a} a\n\
                 LEFT JOIN {b} b ON a.id = b.id\n\
                 GROUP BY a.category\n\
                 ORDER BY count DESC;"
            )
        }
    }
}

/// Starter query for the first loaded table, shown in the banner and `.tables`.
pub fn placeholder_query<S: AsRef<str>>(table_names: &[S]) -> String {
    let table = table_names
        .first()
        .map(|t| quote_if_needed(t.as_ref()))
        .unwrap_or_else(|| "table_name".to_string());
    format!("SELECT * FROM {table} LIMIT 10;")
}

/// One row of the Oracle to SQLite syntax reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxPair {
    pub feature: &'static str,
    pub oracle: &'static str,
    pub sqlite: &'static str,
}

const fn pair(feature: &'static str, oracle: &'static str, sqlite: &'static str) -> SyntaxPair {
    SyntaxPair {
        feature,
        oracle,
        sqlite,
    }
}

/// Oracle idioms and their SQLite spelling, grouped by topic.
pub const SQL_REFERENCE: &[(&str, &[SyntaxPair])] = &[
    (
        "Dates",
        &[
            pair("Current date", "SYSDATE", "DATE('now')"),
            pair(
                "Format a date",
                "TO_CHAR(SYSDATE, 'YYYY-MM-DD')",
                "STRFTIME('%Y-%m-%d', 'now')",
            ),
            pair("Add days", "SYSDATE + 7", "DATE('now', '+7 days')"),
            pair("Days between", "d1 - d2", "JULIANDAY(d1) - JULIANDAY(d2)"),
            pair("Year of a date", "EXTRACT(YEAR FROM d)", "STRFTIME('%Y', d)"),
            pair(
                "Start of month",
                "TRUNC(SYSDATE, 'MM')",
                "DATE('now', 'start of month')",
            ),
        ],
    ),
    (
        "Strings",
        &[
            pair("Concatenate", "a || b", "a || b"),
            pair("Upper / lower case", "UPPER(s) / LOWER(s)", "UPPER(s) / LOWER(s)"),
            pair("Substring", "SUBSTR(s, start, len)", "SUBSTR(s, start, len)"),
            pair("Replace", "REPLACE(s, old, new)", "REPLACE(s, old, new)"),
            pair("Null default", "NVL(col, fallback)", "IFNULL(col, fallback)"),
        ],
    ),
    (
        "Window functions (identical)",
        &[
            pair("Row number", "ROW_NUMBER() OVER (...)", "ROW_NUMBER() OVER (...)"),
            pair("Rank", "RANK() / DENSE_RANK()", "RANK() / DENSE_RANK()"),
            pair("Previous / next row", "LAG() / LEAD()", "LAG() / LEAD()"),
            pair(
                "Running total",
                "SUM(x) OVER (ORDER BY ...)",
                "SUM(x) OVER (ORDER BY ...)",
            ),
            pair("Buckets", "NTILE(n) OVER (...)", "NTILE(n) OVER (...)"),
        ],
    ),
    (
        "Other",
        &[
            pair("Conversion", "TO_CHAR() / TO_NUMBER()", "CAST(x AS TEXT / INTEGER)"),
            pair(
                "DECODE",
                "DECODE(col, 'a', 1, 0)",
                "CASE col WHEN 'a' THEN 1 ELSE 0 END",
            ),
            pair("First n rows", "WHERE ROWNUM <= 5", "LIMIT 5"),
            pair("Paging", "ROWNUM subquery", "LIMIT 10 OFFSET 10"),
            pair(
                "String aggregation",
                "LISTAGG(name, ', ') WITHIN GROUP (...)",
                "GROUP_CONCAT(name, ', ')",
            ),
            pair("No-table select", "SELECT SYSDATE FROM DUAL", "SELECT DATE('now')"),
        ],
    ),
];

/// Double-quote a table name unless it is a plain identifier.
fn quote_if_needed(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
