use crate::lexer::{split_row, RawField};
use crate::table::Table;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToonError {
    #[error("no table header found in input")]
    NoTables,
    #[error("line {line}: row outside any table")]
    RowOutsideTable { line: usize },
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("table '{name}': header declares {declared} rows, found {found}")]
    RowCountMismatch {
        name: String,
        declared: usize,
        found: usize,
    },
    #[error("line {line}: unexpected content")]
    UnexpectedLine { line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Strict,
    Lenient,
}

/// Strict decode: any malformed row or count mismatch fails the whole parse.
pub fn decode(text: &str) -> Result<Vec<Table>, ToonError> {
    decode_inner(text, Mode::Strict)
}

/// Lenient decode for malformed model output: rows with the wrong field
/// count are dropped individually, stray lines are skipped, and declared row
/// counts are not enforced.
pub fn decode_lenient(text: &str) -> Result<Vec<Table>, ToonError> {
    decode_inner(text, Mode::Lenient)
}

fn decode_inner(text: &str, mode: Mode) -> Result<Vec<Table>, ToonError> {
    // name[N]{f1,f2}: with an optional trailing space allowance
    let header_re = Regex::new(r"^([A-Za-z_][A-Za-z0-9_-]*)\[(\d+)\]\{([^}]*)\}:\s*$")
        .expect("header pattern is valid");

    let mut tables: Vec<(Table, usize)> = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        if let Some(caps) = header_re.captures(line) {
            let name = caps[1].to_string();
            let declared: usize = caps[2].parse().unwrap_or(0);
            let fields: Vec<String> = caps[3]
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
            tables.push((Table::new(name, fields), declared));
            continue;
        }

        if let Some(row_text) = line.strip_prefix("  ") {
            let Some((table, _)) = tables.last_mut() else {
                if mode == Mode::Lenient {
                    tracing::debug!(line = line_no, "skipping row outside any table");
                    continue;
                }
                return Err(ToonError::RowOutsideTable { line: line_no });
            };

            let raw = split_row(row_text);
            if raw.len() != table.fields.len() {
                if mode == Mode::Lenient {
                    tracing::debug!(
                        line = line_no,
                        expected = table.fields.len(),
                        found = raw.len(),
                        "dropping row with field count mismatch"
                    );
                    continue;
                }
                return Err(ToonError::FieldCountMismatch {
                    line: line_no,
                    expected: table.fields.len(),
                    found: raw.len(),
                });
            }
            table.rows.push(raw.into_iter().map(retype).collect());
            continue;
        }

        if mode == Mode::Lenient {
            tracing::debug!(line = line_no, "skipping unexpected line");
            continue;
        }
        return Err(ToonError::UnexpectedLine { line: line_no });
    }

    if tables.is_empty() {
        return Err(ToonError::NoTables);
    }

    if mode == Mode::Strict {
        for (table, declared) in &tables {
            if table.rows.len() != *declared {
                return Err(ToonError::RowCountMismatch {
                    name: table.name.clone(),
                    declared: *declared,
                    found: table.rows.len(),
                });
            }
        }
    }

    Ok(tables.into_iter().map(|(t, _)| t).collect())
}

/// Reconstruct typed scalars from a bare cell: numbers, booleans, empty as
/// null, everything else a string. Quoted cells always stay strings.
fn retype(field: RawField) -> Value {
    if field.quoted {
        return Value::String(field.text);
    }
    let text = field.text;
    if text.is_empty() {
        return Value::Null;
    }
    match text.as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if looks_numeric(&text) {
        if let Ok(i) = text.parse::<i64>() {
            return Value::Number(i.into());
        }
        if let Ok(f) = text.parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    }
    Value::String(text)
}

pub(crate) fn looks_numeric(s: &str) -> bool {
    let mut chars = s.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !(first.is_ascii_digit() || first == '-' || first == '+') {
        return false;
    }
    s.chars()
        .skip(1)
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use serde_json::json;

    #[test]
    fn decodes_basic_table() {
        let text = "reqs[2]{id,name,done}:\n  FR-001,Login,true\n  FR-002,Logout,false\n";
        let tables = decode(text).unwrap();
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.name, "reqs");
        assert_eq!(t.fields, vec!["id", "name", "done"]);
        assert_eq!(t.rows[0], vec![json!("FR-001"), json!("Login"), json!(true)]);
    }

    #[test]
    fn scalar_round_trip() {
        let mut table = Table::new(
            "items",
            vec!["id".into(), "count".into(), "ratio".into(), "flag".into(), "note".into()],
        );
        table.rows.push(vec![
            json!("FR-001"),
            json!(3),
            json!(0.5),
            json!(true),
            json!(null),
        ]);
        table.rows.push(vec![
            json!("FR-002"),
            json!(-7),
            json!(1.25),
            json!(false),
            json!("plain text"),
        ]);
        let decoded = decode(&encode(&table)).unwrap();
        assert_eq!(decoded, vec![table]);
    }

    #[test]
    fn scalar_lookalike_strings_round_trip_as_strings() {
        let mut table = Table::new("t", vec!["a".into(), "b".into(), "c".into()]);
        table
            .rows
            .push(vec![json!("true"), json!("42"), json!("")]);
        let decoded = decode(&encode(&table)).unwrap();
        assert_eq!(decoded, vec![table]);
    }

    #[test]
    fn quoted_comma_field_round_trips() {
        let mut table = Table::new("t", vec!["d".into()]);
        table.rows.push(vec![json!("hello, world")]);
        let text = encode(&table);
        let decoded = decode(&text).unwrap();
        assert_eq!(decoded[0].rows[0][0], json!("hello, world"));
    }

    #[test]
    fn multiple_tables_parse() {
        let text = "a[1]{x}:\n  1\nb[1]{y}:\n  2\n";
        let tables = decode(text).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].name, "b");
    }

    #[test]
    fn strict_rejects_field_count_mismatch() {
        let text = "a[1]{x,y}:\n  1\n";
        assert!(matches!(
            decode(text),
            Err(ToonError::FieldCountMismatch { .. })
        ));
    }

    #[test]
    fn lenient_drops_bad_rows_individually() {
        let text = "a[3]{x,y}:\n  1,2\n  only-one\n  3,4\n";
        let tables = decode_lenient(text).unwrap();
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[1], vec![json!(3), json!(4)]);
    }

    #[test]
    fn strict_enforces_declared_row_count() {
        let text = "a[2]{x}:\n  1\n";
        assert!(matches!(decode(text), Err(ToonError::RowCountMismatch { .. })));
    }

    #[test]
    fn empty_bare_cell_is_null_and_quoted_number_stays_string() {
        let text = "a[1]{x,y}:\n  ,\"42\"\n";
        let tables = decode(text).unwrap();
        assert_eq!(tables[0].rows[0], vec![json!(null), json!("42")]);
    }

    #[test]
    fn no_header_is_an_error() {
        assert!(matches!(decode("just some text"), Err(_)));
    }
}
