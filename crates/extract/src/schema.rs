use serde::{Deserialize, Serialize};

/// IREB-style requirement taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequirementType {
    Functional,
    NonFunctional,
    Security,
    Performance,
    Business,
    Usability,
}

impl RequirementType {
    /// Lenient parse for model output. Unknown values fold to functional.
    pub fn parse_lenient(s: &str) -> RequirementType {
        match s.trim().to_lowercase().as_str() {
            "functional" => RequirementType::Functional,
            "non-functional" | "nonfunctional" | "non_functional" => {
                RequirementType::NonFunctional
            }
            "security" => RequirementType::Security,
            "performance" => RequirementType::Performance,
            "business" => RequirementType::Business,
            "usability" => RequirementType::Usability,
            _ => RequirementType::Functional,
        }
    }

    /// Canonical identifier prefix for this type.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            RequirementType::Functional => "FR",
            RequirementType::NonFunctional => "NFR",
            RequirementType::Security => "SEC",
            RequirementType::Performance => "PERF",
            RequirementType::Usability => "UX",
            RequirementType::Business => "BUS",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementType::Functional => "functional",
            RequirementType::NonFunctional => "non-functional",
            RequirementType::Security => "security",
            RequirementType::Performance => "performance",
            RequirementType::Business => "business",
            RequirementType::Usability => "usability",
        }
    }
}

/// MoSCoW prioritization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Must,
    Should,
    Could,
    Wont,
}

impl Priority {
    pub fn parse_lenient(s: &str) -> Priority {
        match s.trim().to_lowercase().as_str() {
            "must" | "must-have" | "high" => Priority::Must,
            "should" | "should-have" | "medium" => Priority::Should,
            "could" | "could-have" | "low" => Priority::Could,
            "wont" | "won't" | "wont-have" => Priority::Wont,
            _ => Priority::Should,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Must => "must",
            Priority::Should => "should",
            Priority::Could => "could",
            Priority::Wont => "wont",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub description: String,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub description: String,
    #[serde(default)]
    pub constraint_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumption {
    pub description: String,
    #[serde(default)]
    pub confidence: Option<String>,
}

/// Declared dependency identifiers, by IREB relation kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependencies {
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(default)]
    pub extends: Vec<String>,
}

impl Dependencies {
    pub fn is_empty(&self) -> bool {
        self.depends_on.is_empty() && self.conflicts.is_empty() && self.extends.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default)]
    pub source_document: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub stakeholders: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub requirement_type: RequirementType,
    pub priority: Priority,
    /// Never empty after validation; inferred when the model omits it.
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_version")]
    pub version: i64,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub assumptions: Vec<Assumption>,
    #[serde(default)]
    pub related_requirements: Vec<String>,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub provenance: Provenance,
}

fn default_status() -> String {
    "draft".to_string()
}

fn default_version() -> i64 {
    1
}

impl Requirement {
    /// Text used for embedding generation: the searchable surface of the
    /// requirement.
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}\nCategory: {}", self.name, self.description, self.category)
    }
}

/// The merged output of one extraction run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub requirements: Vec<Requirement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_type_parse_folds_unknowns() {
        assert_eq!(
            RequirementType::parse_lenient("Non-Functional"),
            RequirementType::NonFunctional
        );
        assert_eq!(
            RequirementType::parse_lenient("weird"),
            RequirementType::Functional
        );
    }

    #[test]
    fn type_serializes_to_wire_names() {
        let json = serde_json::to_string(&RequirementType::NonFunctional).unwrap();
        assert_eq!(json, "\"non-functional\"");
    }

    #[test]
    fn prefixes_match_taxonomy() {
        assert_eq!(RequirementType::Security.id_prefix(), "SEC");
        assert_eq!(RequirementType::Usability.id_prefix(), "UX");
    }
}
