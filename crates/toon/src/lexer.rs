/// A row cell along with whether it appeared quoted in the source. Quoted
/// cells stay strings during re-typing; bare cells are eligible for scalar
/// reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub text: String,
    pub quoted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Normal,
    InQuotes,
}

/// Quote-aware comma splitter: an explicit two-state scanner. A doubled
/// quote inside a quoted field is a literal quote character.
pub fn split_row(line: &str) -> Vec<RawField> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut state = State::Normal;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            State::Normal => match ch {
                ',' => {
                    fields.push(RawField {
                        text: std::mem::take(&mut current),
                        quoted,
                    });
                    quoted = false;
                }
                '"' if current.is_empty() && !quoted => {
                    state = State::InQuotes;
                    quoted = true;
                }
                _ => current.push(ch),
            },
            State::InQuotes => match ch {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        current.push('"');
                    } else {
                        state = State::Normal;
                    }
                }
                _ => current.push(ch),
            },
        }
    }

    fields.push(RawField {
        text: current,
        quoted,
    });
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &str) -> Vec<String> {
        split_row(line).into_iter().map(|f| f.text).collect()
    }

    #[test]
    fn splits_plain_fields() {
        assert_eq!(texts("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn comma_inside_quotes_is_literal() {
        assert_eq!(texts("\"a, b\",c"), vec!["a, b", "c"]);
    }

    #[test]
    fn doubled_quote_is_literal_quote() {
        assert_eq!(texts("\"say \"\"hi\"\"\",x"), vec!["say \"hi\"", "x"]);
    }

    #[test]
    fn empty_fields_survive() {
        assert_eq!(texts("a,,c,"), vec!["a", "", "c", ""]);
    }

    #[test]
    fn quoted_flag_is_tracked() {
        let fields = split_row("\"a\",b");
        assert!(fields[0].quoted);
        assert!(!fields[1].quoted);
    }
}
