use crate::schema::{
    Assumption, Constraint, Dependencies, Priority, Requirement, RequirementType, Risk,
};
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("model response is empty")]
    EmptyResponse,
    #[error("response payload parsed by neither TOON nor JSON (toon: {toon}, json: {json})")]
    Unparseable { toon: String, json: String },
}

/// Extracts the structured payload out of free-form model output.
///
/// The model is asked for TOON tables inside a fenced code block, but no
/// model reliably honors its format instructions, so this tries in order:
/// the first fenced block as TOON (lenient), then as JSON, then the whole
/// response as either.
pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(response: &str) -> Result<Vec<Requirement>, ParseError> {
        if response.trim().is_empty() {
            return Err(ParseError::EmptyResponse);
        }

        let payload = extract_fenced_block(response).unwrap_or(response);

        let toon_err = match parse_toon(payload) {
            Ok(reqs) => return Ok(reqs),
            Err(e) => e.to_string(),
        };
        let json_err = match parse_json(payload) {
            Ok(reqs) => return Ok(reqs),
            Err(e) => e,
        };

        Err(ParseError::Unparseable {
            toon: toon_err,
            json: json_err,
        })
    }
}

/// First fenced code block, language tag ignored.
fn extract_fenced_block(text: &str) -> Option<&str> {
    let re = Regex::new(r"(?s)```[a-zA-Z0-9_-]*\r?\n(.*?)```").expect("fence pattern is valid");
    re.captures(text).map(|caps| caps.get(1).map_or("", |m| m.as_str()))
}

fn parse_toon(payload: &str) -> Result<Vec<Requirement>, toon::ToonError> {
    let tables = toon::decode_lenient(payload)?;

    let requirements_table = tables
        .iter()
        .find(|t| t.name == "requirements")
        .or_else(|| tables.first())
        .ok_or(toon::ToonError::NoTables)?;

    let mut requirements: Vec<Requirement> = requirements_table
        .to_records()
        .into_iter()
        .filter_map(|record| requirement_from_record(&record))
        .collect();

    // Companion tables attach sub-records by requirement_id.
    for table in &tables {
        match table.name.as_str() {
            "risks" => {
                for record in table.to_records() {
                    attach(&mut requirements, &record, |req, desc, attr| {
                        req.risks.push(Risk {
                            description: desc,
                            severity: attr,
                        })
                    });
                }
            }
            "constraints" => {
                for record in table.to_records() {
                    attach(&mut requirements, &record, |req, desc, attr| {
                        req.constraints.push(Constraint {
                            description: desc,
                            constraint_type: attr,
                        })
                    });
                }
            }
            "assumptions" => {
                for record in table.to_records() {
                    attach(&mut requirements, &record, |req, desc, attr| {
                        req.assumptions.push(Assumption {
                            description: desc,
                            confidence: attr,
                        })
                    });
                }
            }
            _ => {}
        }
    }

    Ok(requirements)
}

fn attach(
    requirements: &mut [Requirement],
    record: &Map<String, Value>,
    push: impl FnOnce(&mut Requirement, String, Option<String>),
) {
    let Some(req_id) = get_string(record, "requirement_id") else {
        return;
    };
    let Some(description) = get_string(record, "description") else {
        return;
    };
    let attr = get_string(record, "severity")
        .or_else(|| get_string(record, "constraint_type"))
        .or_else(|| get_string(record, "confidence"));

    match requirements.iter_mut().find(|r| r.id == req_id) {
        Some(req) => push(req, description, attr),
        None => tracing::debug!(requirement_id = %req_id, "sub-record references unknown requirement"),
    }
}

fn parse_json(payload: &str) -> Result<Vec<Requirement>, String> {
    let value: Value = serde_json::from_str(payload.trim()).map_err(|e| e.to_string())?;

    let items = match &value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get("requirements") {
            Some(Value::Array(items)) => items.clone(),
            _ => return Err("object has no 'requirements' array".to_string()),
        },
        _ => return Err("payload is neither an array nor an object".to_string()),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => requirement_from_record(&record),
            _ => None,
        })
        .collect())
}

/// Build a requirement from a loosely-typed record. This is the one place
/// generic maps cross into typed records; rows without an identifier are
/// dropped here.
fn requirement_from_record(record: &Map<String, Value>) -> Option<Requirement> {
    let id = get_string(record, "id").or_else(|| get_string(record, "identifier"))?;
    if id.trim().is_empty() {
        return None;
    }

    let requirement_type =
        RequirementType::parse_lenient(&get_string(record, "type").unwrap_or_default());
    let priority = Priority::parse_lenient(&get_string(record, "priority").unwrap_or_default());

    let mut requirement = Requirement {
        id: id.trim().to_string(),
        name: get_string(record, "name").unwrap_or_default(),
        description: get_string(record, "description").unwrap_or_default(),
        requirement_type,
        priority,
        category: get_string(record, "category").unwrap_or_default(),
        tags: get_string_list(record, "tags"),
        status: get_string(record, "status").unwrap_or_else(|| "draft".to_string()),
        version: 1,
        risks: get_sub_records(record, "risks", "severity")
            .into_iter()
            .map(|(description, severity)| Risk {
                description,
                severity,
            })
            .collect(),
        constraints: get_sub_records(record, "constraints", "constraint_type")
            .into_iter()
            .map(|(description, constraint_type)| Constraint {
                description,
                constraint_type,
            })
            .collect(),
        assumptions: get_sub_records(record, "assumptions", "confidence")
            .into_iter()
            .map(|(description, confidence)| Assumption {
                description,
                confidence,
            })
            .collect(),
        related_requirements: get_string_list(record, "related"),
        dependencies: Dependencies {
            depends_on: get_string_list(record, "depends_on"),
            conflicts: get_string_list(record, "conflicts"),
            extends: get_string_list(record, "extends"),
        },
        provenance: Default::default(),
    };
    if requirement.related_requirements.is_empty() {
        requirement.related_requirements = get_string_list(record, "related_requirements");
    }
    Some(requirement)
}

fn get_string(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Identifier/tag lists appear either as native JSON arrays, as a JSON
/// string, or as a ';'-separated TOON cell.
fn get_string_list(record: &Map<String, Value>, key: &str) -> Vec<String> {
    match record.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Vec::new();
            }
            if s.starts_with('[') {
                if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(s) {
                    return items
                        .iter()
                        .filter_map(|v| v.as_str())
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                        .collect();
                }
            }
            s.split(';')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()
        }
        _ => Vec::new(),
    }
}

fn get_sub_records(
    record: &Map<String, Value>,
    key: &str,
    attr_key: &str,
) -> Vec<(String, Option<String>)> {
    let Some(Value::Array(items)) = record.get(key) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let description = get_string(obj, "description")?;
            Some((description, get_string(obj, attr_key)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOON_RESPONSE: &str = r#"Here is the extraction:

```toon
requirements[2]{id,name,description,type,priority,category,tags,depends_on,conflicts,extends,related}:
  FR-001,User login,Users sign in with email,functional,must,Authentication,"[""auth""]",,,,
  FR-002,Session timeout,Sessions expire after 30 minutes,security,should,,"[]",FR-001,,,
risks[1]{requirement_id,description,severity}:
  FR-002,Stale sessions could be hijacked,high
```

Let me know if you need anything else."#;

    #[test]
    fn parses_toon_from_fenced_block() {
        let reqs = ResponseParser::parse(TOON_RESPONSE).unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].id, "FR-001");
        assert_eq!(reqs[0].tags, vec!["auth"]);
        assert_eq!(reqs[1].requirement_type, RequirementType::Security);
        assert_eq!(reqs[1].dependencies.depends_on, vec!["FR-001"]);
        assert_eq!(reqs[1].risks.len(), 1);
        assert_eq!(reqs[1].risks[0].severity.as_deref(), Some("high"));
    }

    #[test]
    fn falls_back_to_json_array() {
        let response = r#"```json
[
  {"id": "FR-001", "name": "Login", "description": "d", "type": "functional",
   "priority": "must", "category": "Auth", "tags": ["a"], "depends_on": ["FR-002"],
   "risks": [{"description": "r1", "severity": "low"}]}
]
```"#;
        let reqs = ResponseParser::parse(response).unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].dependencies.depends_on, vec!["FR-002"]);
        assert_eq!(reqs[0].risks[0].description, "r1");
    }

    #[test]
    fn json_object_with_requirements_key() {
        let response = r#"{"requirements": [{"id": "FR-001", "name": "n", "description": "d", "type": "business", "priority": "could"}]}"#;
        let reqs = ResponseParser::parse(response).unwrap();
        assert_eq!(reqs[0].requirement_type, RequirementType::Business);
        assert_eq!(reqs[0].priority, Priority::Could);
    }

    #[test]
    fn unparseable_output_is_a_parse_error() {
        let err = ResponseParser::parse("The document describes no requirements at all.")
            .unwrap_err();
        assert!(matches!(err, ParseError::Unparseable { .. }));
    }

    #[test]
    fn rows_without_identifier_are_dropped() {
        let response = "```\nrequirements[2]{id,name,description,type,priority,category,tags,depends_on,conflicts,extends,related}:\n  ,No id,oops,functional,must,,,,,,\n  FR-001,Valid,ok,functional,must,,,,,,\n```";
        let reqs = ResponseParser::parse(response).unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].id, "FR-001");
    }

    #[test]
    fn whole_response_used_when_no_fence() {
        let response = "requirements[1]{id,name,description,type,priority,category,tags,depends_on,conflicts,extends,related}:\n  FR-001,Bare,No fence needed,functional,must,,,,,,\n";
        let reqs = ResponseParser::parse(response).unwrap();
        assert_eq!(reqs.len(), 1);
    }
}
