/// Build the extraction prompt for one chunk. The expected output format is
/// TOON tables inside a fenced code block; a JSON array is accepted as a
/// fallback by the parser.
pub fn build_extraction_prompt(chunk_text: &str, chunk_index: usize, chunk_total: usize) -> String {
    let position = if chunk_total > 1 {
        format!(
            "This is part {} of {} of a larger document. Extract only requirements stated in this part.\n\n",
            chunk_index + 1,
            chunk_total
        )
    } else {
        String::new()
    };

    format!(
        r#"Extract software and business requirements from the following text.

INSTRUCTIONS:
1. Identify every distinct requirement (functional, non-functional, security, performance, business, usability)
2. Assign each a sequential identifier: FR-001, FR-002, ...
3. Priorities use MoSCoW: must, should, could, wont
4. Output ONLY a fenced code block containing TOON tables, nothing else

FORMAT EXAMPLE:
```toon
requirements[2]{{id,name,description,type,priority,category,tags,depends_on,conflicts,extends,related}}:
  FR-001,User login,Users authenticate with email and password,functional,must,Authentication,"[""auth"",""login""]",,,,
  SEC-001,Password storage,Passwords are stored hashed,security,must,Security,"[""auth""]",FR-001,,,
risks[1]{{requirement_id,description,severity}}:
  SEC-001,Weak hashing would expose credentials,high
constraints[0]{{requirement_id,description,constraint_type}}:
assumptions[0]{{requirement_id,description,confidence}}:
```

RULES:
- The number in brackets is the exact row count of each table
- depends_on/conflicts/extends/related hold identifiers separated by ';', or empty
- tags is a JSON string array
- Fields containing commas or quotes must be double-quoted, with inner quotes doubled
- Leave category empty only if genuinely unclear
- Do not invent requirements that are not in the text

{position}TEXT:
{chunk_text}

OUTPUT:"#
    )
}
