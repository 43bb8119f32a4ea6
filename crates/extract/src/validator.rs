use crate::schema::{Requirement, RequirementType};
use std::collections::{HashMap, HashSet};

/// Priority-ordered keyword table for category inference. The first keyword
/// found in the requirement name wins.
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("password", "Security"),
    ("auth", "Security"),
    ("login", "Security"),
    ("encrypt", "Security"),
    ("security", "Security"),
    ("performance", "Performance"),
    ("latency", "Performance"),
    ("throughput", "Performance"),
    ("response time", "Performance"),
    ("usability", "Usability"),
    ("accessib", "Usability"),
    ("interface", "Usability"),
    ("payment", "Business"),
    ("billing", "Business"),
    ("report", "Reporting"),
    ("api", "Integration"),
    ("integrat", "Integration"),
    ("backup", "Data Management"),
    ("storage", "Data Management"),
    ("database", "Data Management"),
];

const DEFAULT_CATEGORY: &str = "General";

/// Post-parse validation: dedup by identifier, category backfill, identifier
/// normalization. Order matters: dedup sees raw model identifiers, and
/// normalization runs last over the retained set.
pub struct Validator;

impl Validator {
    pub fn validate(requirements: Vec<Requirement>) -> Vec<Requirement> {
        let mut requirements = Self::dedupe(requirements);
        Self::fill_categories(&mut requirements);
        Self::normalize_identifiers(&mut requirements);
        requirements
    }

    /// Collapse duplicate identifiers, first occurrence wins.
    pub fn dedupe(requirements: Vec<Requirement>) -> Vec<Requirement> {
        let mut seen = HashSet::new();
        let mut retained = Vec::with_capacity(requirements.len());
        for requirement in requirements {
            if seen.insert(requirement.id.clone()) {
                retained.push(requirement);
            } else {
                tracing::debug!(
                    id = %requirement.id,
                    name = %requirement.name,
                    "discarding duplicate requirement identifier"
                );
            }
        }
        retained
    }

    /// Category is never left blank: infer from name keywords first, then
    /// from the requirement type.
    pub fn fill_categories(requirements: &mut [Requirement]) {
        for requirement in requirements {
            if requirement.category.trim().is_empty() {
                requirement.category = infer_category(requirement);
            }
        }
    }

    /// Renumber identifiers against the type→prefix table. An identifier
    /// keeps its numeric suffix when the prefix already matches and the
    /// number is free; otherwise it gets the next free number for its
    /// prefix. References in dependency and related lists are remapped.
    pub fn normalize_identifiers(requirements: &mut [Requirement]) {
        let mut used: HashMap<&'static str, HashSet<u32>> = HashMap::new();
        let mut renames: HashMap<String, String> = HashMap::new();

        for requirement in requirements.iter_mut() {
            let prefix = requirement.requirement_type.id_prefix();
            let taken = used.entry(prefix).or_default();

            let current_suffix = parse_suffix(&requirement.id, prefix);
            let number = match current_suffix {
                Some(n) if !taken.contains(&n) => n,
                _ => next_free(taken),
            };
            taken.insert(number);

            let normalized = format!("{prefix}-{number:03}");
            if normalized != requirement.id {
                renames.insert(requirement.id.clone(), normalized.clone());
                requirement.id = normalized;
            }
        }

        if renames.is_empty() {
            return;
        }
        for requirement in requirements.iter_mut() {
            remap(&mut requirement.dependencies.depends_on, &renames);
            remap(&mut requirement.dependencies.conflicts, &renames);
            remap(&mut requirement.dependencies.extends, &renames);
            remap(&mut requirement.related_requirements, &renames);
        }
    }
}

fn infer_category(requirement: &Requirement) -> String {
    let name = requirement.name.to_lowercase();
    for (keyword, category) in CATEGORY_KEYWORDS {
        if name.contains(keyword) {
            return category.to_string();
        }
    }
    match requirement.requirement_type {
        RequirementType::Security => "Security".to_string(),
        RequirementType::Performance => "Performance".to_string(),
        RequirementType::Usability => "Usability".to_string(),
        RequirementType::Business => "Business".to_string(),
        RequirementType::NonFunctional => "Quality".to_string(),
        RequirementType::Functional => DEFAULT_CATEGORY.to_string(),
    }
}

/// Numeric suffix of `id`, but only when its prefix part already matches.
fn parse_suffix(id: &str, prefix: &str) -> Option<u32> {
    let rest = id.strip_prefix(prefix)?.strip_prefix('-')?;
    rest.parse().ok()
}

fn next_free(taken: &HashSet<u32>) -> u32 {
    let mut n = 1;
    while taken.contains(&n) {
        n += 1;
    }
    n
}

fn remap(ids: &mut [String], renames: &HashMap<String, String>) {
    for id in ids {
        if let Some(new_id) = renames.get(id.as_str()) {
            *id = new_id.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Dependencies, Priority};

    fn req(id: &str, name: &str, rtype: RequirementType) -> Requirement {
        Requirement {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{name} description"),
            requirement_type: rtype,
            priority: Priority::Should,
            category: String::new(),
            tags: Vec::new(),
            status: "draft".to_string(),
            version: 1,
            risks: Vec::new(),
            constraints: Vec::new(),
            assumptions: Vec::new(),
            related_requirements: Vec::new(),
            dependencies: Dependencies::default(),
            provenance: Default::default(),
        }
    }

    #[test]
    fn duplicate_identifiers_collapse_first_wins() {
        let mut first = req("FR-001", "First", RequirementType::Functional);
        first.description = "kept".to_string();
        let mut second = req("FR-001", "Second", RequirementType::Functional);
        second.description = "discarded".to_string();

        let retained = Validator::dedupe(vec![first, second]);
        assert_eq!(retained.len(), 1);
        assert_eq!(retained[0].description, "kept");
    }

    #[test]
    fn empty_category_inferred_from_name_keywords() {
        let mut reqs = vec![req("FR-001", "Password reset flow", RequirementType::Functional)];
        Validator::fill_categories(&mut reqs);
        assert_eq!(reqs[0].category, "Security");
    }

    #[test]
    fn keyword_table_is_priority_ordered() {
        // "login performance" hits the security block before performance.
        let mut reqs = vec![req("FR-001", "Login performance", RequirementType::Functional)];
        Validator::fill_categories(&mut reqs);
        assert_eq!(reqs[0].category, "Security");
    }

    #[test]
    fn category_falls_back_to_type_then_general() {
        let mut reqs = vec![
            req("REQ-1", "Data retention policy", RequirementType::Security),
            req("REQ-2", "Widget rendering", RequirementType::Functional),
        ];
        Validator::fill_categories(&mut reqs);
        assert_eq!(reqs[0].category, "Security");
        assert_eq!(reqs[1].category, "General");
    }

    #[test]
    fn security_requirement_renumbered_to_sec_prefix() {
        let mut reqs = vec![
            req("FR-001", "Login", RequirementType::Functional),
            req("FR-002", "Password hashing", RequirementType::Security),
        ];
        Validator::normalize_identifiers(&mut reqs);
        assert_eq!(reqs[0].id, "FR-001");
        assert_eq!(reqs[1].id, "SEC-001");
    }

    #[test]
    fn renumbering_remaps_dependency_references() {
        let security = req("FR-002", "Password hashing", RequirementType::Security);
        let mut dependent = req("FR-003", "Login", RequirementType::Functional);
        dependent.dependencies.depends_on = vec!["FR-002".to_string()];
        let mut reqs = vec![security, dependent];
        Validator::normalize_identifiers(&mut reqs);
        assert_eq!(reqs[0].id, "SEC-001");
        assert_eq!(reqs[1].dependencies.depends_on, vec!["SEC-001"]);
    }

    #[test]
    fn matching_prefix_keeps_its_number() {
        let mut reqs = vec![
            req("SEC-007", "Audit log", RequirementType::Security),
            req("FR-004", "Search", RequirementType::Functional),
        ];
        Validator::normalize_identifiers(&mut reqs);
        assert_eq!(reqs[0].id, "SEC-007");
        assert_eq!(reqs[1].id, "FR-004");
    }

    #[test]
    fn full_validate_pass() {
        let reqs = vec![
            req("FR-001", "Login", RequirementType::Functional),
            req("FR-001", "Duplicate login", RequirementType::Functional),
            req("FR-002", "Encrypt data at rest", RequirementType::Security),
        ];
        let validated = Validator::validate(reqs);
        assert_eq!(validated.len(), 2);
        assert!(validated.iter().all(|r| !r.category.is_empty()));
        assert_eq!(validated[1].id, "SEC-001");
    }
}
