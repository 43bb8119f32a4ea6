use crate::table::Table;
use serde_json::Value;

/// Encode a table: `name[N]{f1,f2}:` header with the exact row count,
/// then one two-space-indented comma-joined row per record.
pub fn encode(table: &Table) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}[{}]{{{}}}:\n",
        table.name,
        table.rows.len(),
        table.fields.join(",")
    ));
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(encode_field).collect();
        out.push_str("  ");
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn encode_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            if needs_quoting(s) {
                quote(s)
            } else {
                s.clone()
            }
        }
        // Composite values are carried as a JSON string, always quoted.
        composite => quote(&composite.to_string()),
    }
}

/// A string field is quoted when its bare form would be ambiguous: structural
/// characters, edge whitespace, or text the decoder would re-type as another
/// scalar (empty cells read as null, `true`/`42` as bool/number).
fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s.contains(',')
        || s.contains('\n')
        || s.contains('"')
        || s.trim() != s
        || s == "true"
        || s == "false"
        || crate::decode::looks_numeric(s)
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_carries_exact_row_count() {
        let mut table = Table::new("reqs", vec!["id".into(), "name".into()]);
        table.rows.push(vec![json!("FR-001"), json!("Login")]);
        table.rows.push(vec![json!("FR-002"), json!("Logout")]);
        let text = encode(&table);
        assert!(text.starts_with("reqs[2]{id,name}:\n"));
        assert!(text.contains("  FR-001,Login\n"));
    }

    #[test]
    fn comma_field_is_quoted() {
        let mut table = Table::new("t", vec!["d".into()]);
        table.rows.push(vec![json!("a, b")]);
        assert!(encode(&table).contains("  \"a, b\"\n"));
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let mut table = Table::new("t", vec!["d".into()]);
        table.rows.push(vec![json!("say \"hi\"")]);
        assert!(encode(&table).contains("  \"say \"\"hi\"\"\"\n"));
    }

    #[test]
    fn leading_whitespace_forces_quoting() {
        let mut table = Table::new("t", vec!["d".into()]);
        table.rows.push(vec![json!(" padded")]);
        assert!(encode(&table).contains("  \" padded\"\n"));
    }

    #[test]
    fn scalar_lookalike_strings_are_quoted() {
        let mut table = Table::new("t", vec!["a".into(), "b".into(), "c".into()]);
        table
            .rows
            .push(vec![json!("true"), json!("42"), json!("")]);
        let text = encode(&table);
        // Bare, these would decode as bool / number / null.
        assert!(text.contains("  \"true\",\"42\",\"\"\n"));
    }

    #[test]
    fn scalars_and_composites_render() {
        let mut table = Table::new("t", vec!["a".into(), "b".into(), "c".into(), "d".into()]);
        table
            .rows
            .push(vec![json!(true), json!(42), json!(null), json!(["x", "y"])]);
        let text = encode(&table);
        assert!(text.contains("  true,42,,\"[\"\"x\"\",\"\"y\"\"]\"\n"));
    }
}
